//! Loan application types and the status state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decision::{Assessment, Decision};
use crate::error::{LendingError, Result};
use crate::ids::{ApplicationId, RepaymentId};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length of a customer number.
pub const MAX_CUSTOMER_NUMBER_LEN: usize = 50;

/// Decimal places allowed on monetary amounts.
pub const AMOUNT_DECIMAL_PLACES: u32 = 2;

/// Largest requestable amount (12 significant digits, 2 of them fractional).
#[must_use]
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, AMOUNT_DECIMAL_PLACES)
}

/// Statuses that count as an in-flight or currently-owed loan.
pub const ACTIVE_STATUSES: [LoanStatus; 4] = [
    LoanStatus::Pending,
    LoanStatus::Processing,
    LoanStatus::Approved,
    LoanStatus::Disbursed,
];

/// Status of a loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// Reserved for asynchronous intake; not produced by the current flow.
    Pending,
    /// Created and waiting on the scoring engine.
    Processing,
    /// Scoring passed the decision policy.
    Approved,
    /// Scoring failed the decision policy.
    Rejected,
    /// Funds were paid out.
    Disbursed,
    /// The approved amount has been paid back in full.
    Repaid,
    /// Scoring could not be completed.
    Failed,
}

impl LoanStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Processing,
        Self::Approved,
        Self::Rejected,
        Self::Disbursed,
        Self::Repaid,
        Self::Failed,
    ];

    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Disbursed => "DISBURSED",
            Self::Repaid => "REPAID",
            Self::Failed => "FAILED",
        }
    }

    /// Whether a loan in this status blocks a new application by the same customer.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Processing | Self::Approved | Self::Disbursed
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (
                    Self::Processing,
                    Self::Approved | Self::Rejected | Self::Failed
                )
                | (Self::Approved, Self::Disbursed)
                | (Self::Approved | Self::Disbursed, Self::Repaid)
        )
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LendingError::Storage(format!("unknown loan status: {s}")))
    }
}

/// A loan application as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    /// Public identifier returned to the caller.
    pub application_id: ApplicationId,
    /// CBS customer number of the applicant.
    pub customer_number: String,
    /// Amount asked for.
    pub requested_amount: Decimal,
    /// Amount granted; set only on approval.
    pub approved_amount: Option<Decimal>,
    /// Current lifecycle status.
    pub status: LoanStatus,
    /// Scoring engine token for this application's scoring run.
    pub scoring_token: Option<String>,
    /// Score reported by the scoring engine.
    pub score: Option<i64>,
    /// Credit limit reported by the scoring engine.
    pub credit_limit: Option<Decimal>,
    /// Exclusion text reported by the scoring engine.
    pub exclusion: Option<String>,
    /// Annual interest rate in percent; set only on approval.
    pub interest_rate: Option<Decimal>,
    /// Loan term; set only on approval.
    pub term_days: Option<u32>,
    /// Why the application was rejected or failed.
    pub rejection_reason: Option<String>,
    /// When the application was received.
    pub application_date: DateTime<Utc>,
    /// When funds were (or are scheduled to be) paid out.
    pub disbursement_date: Option<NaiveDate>,
    /// When repayment is due.
    pub due_date: Option<NaiveDate>,
    /// When the loan was fully repaid.
    pub repayment_date: Option<NaiveDate>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl LoanApplication {
    /// Create a freshly received application, already in `PROCESSING`.
    #[must_use]
    pub fn new(customer_number: impl Into<String>, requested_amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            application_id: ApplicationId::generate(),
            customer_number: customer_number.into(),
            requested_amount,
            approved_amount: None,
            status: LoanStatus::Processing,
            scoring_token: None,
            score: None,
            credit_limit: None,
            exclusion: None,
            interest_rate: None,
            term_days: None,
            rejection_reason: None,
            application_date: now,
            disbursement_date: None,
            due_date: None,
            repayment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, enforcing the state machine.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::InvalidTransition` if the move is not allowed.
    pub fn transition(&mut self, next: LoanStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(LendingError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark scoring as failed, recording why.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::InvalidTransition` unless the loan is `PROCESSING`.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(LoanStatus::Failed)?;
        self.rejection_reason = Some(reason.into());
        Ok(())
    }

    /// Record the scoring engine's figures and the resulting decision.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::InvalidTransition` unless the loan is `PROCESSING`.
    pub fn record_assessment(&mut self, assessment: &Assessment) -> Result<()> {
        let next = match &assessment.decision {
            Decision::Approved(_) => LoanStatus::Approved,
            Decision::Rejected { .. } => LoanStatus::Rejected,
        };
        self.transition(next)?;

        self.score = Some(assessment.score);
        self.credit_limit = Some(assessment.limit_amount);
        self.exclusion = Some(assessment.exclusion.clone());

        match &assessment.decision {
            Decision::Approved(terms) => {
                self.approved_amount = Some(terms.approved_amount);
                self.interest_rate = Some(terms.interest_rate);
                self.term_days = Some(terms.term_days);
                self.disbursement_date = Some(terms.disbursement_date);
                self.due_date = Some(terms.due_date);
            }
            Decision::Rejected { reason } => {
                self.rejection_reason = Some(reason.clone());
            }
        }
        Ok(())
    }
}

/// Public projection of a loan application.
///
/// The scoring token is deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanStatusView {
    /// Application identifier.
    pub application_id: ApplicationId,
    /// Applicant.
    pub customer_number: String,
    /// Amount asked for.
    pub requested_amount: Decimal,
    /// Amount granted.
    pub approved_amount: Option<Decimal>,
    /// Current status.
    pub status: LoanStatus,
    /// Score reported by the scoring engine.
    pub score: Option<i64>,
    /// Credit limit reported by the scoring engine.
    pub credit_limit: Option<Decimal>,
    /// Interest rate in percent.
    pub interest_rate: Option<Decimal>,
    /// Term in days.
    pub term_days: Option<u32>,
    /// Rejection or failure reason.
    pub rejection_reason: Option<String>,
    /// When the application was received.
    pub application_date: DateTime<Utc>,
    /// Disbursement date.
    pub disbursement_date: Option<NaiveDate>,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Repayment date.
    pub repayment_date: Option<NaiveDate>,
}

impl From<&LoanApplication> for LoanStatusView {
    fn from(loan: &LoanApplication) -> Self {
        Self {
            application_id: loan.application_id,
            customer_number: loan.customer_number.clone(),
            requested_amount: loan.requested_amount,
            approved_amount: loan.approved_amount,
            status: loan.status,
            score: loan.score,
            credit_limit: loan.credit_limit,
            interest_rate: loan.interest_rate,
            term_days: loan.term_days,
            rejection_reason: loan.rejection_reason.clone(),
            application_date: loan.application_date,
            disbursement_date: loan.disbursement_date,
            due_date: loan.due_date,
            repayment_date: loan.repayment_date,
        }
    }
}

/// A payment made against a loan. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRepayment {
    /// Repayment identifier.
    pub id: RepaymentId,
    /// Loan being repaid.
    pub application_id: ApplicationId,
    /// Amount paid.
    pub amount: Decimal,
    /// When the payment was made.
    pub paid_at: DateTime<Utc>,
    /// External payment reference.
    pub transaction_reference: String,
}

impl LoanRepayment {
    /// Create a repayment stamped with the current time.
    #[must_use]
    pub fn new(
        application_id: ApplicationId,
        amount: Decimal,
        transaction_reference: impl Into<String>,
    ) -> Self {
        Self {
            id: RepaymentId::generate(),
            application_id,
            amount,
            paid_at: Utc::now(),
            transaction_reference: transaction_reference.into(),
        }
    }
}

// ============================================================================
// Input validation
// ============================================================================

/// Validate a customer number.
///
/// # Errors
///
/// Returns `LendingError::Validation` when missing, blank or too long.
pub fn validate_customer_number(customer_number: Option<&str>) -> Result<String> {
    let customer_number = customer_number
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LendingError::Validation("customer_number is required".into()))?;

    if customer_number.chars().count() > MAX_CUSTOMER_NUMBER_LEN {
        return Err(LendingError::Validation(format!(
            "customer_number must be at most {MAX_CUSTOMER_NUMBER_LEN} characters"
        )));
    }

    Ok(customer_number.to_string())
}

/// Validate a monetary amount: positive, at most two decimal places, within range.
///
/// # Errors
///
/// Returns `LendingError::Validation` describing the first violated rule.
pub fn validate_amount(amount: Option<Decimal>) -> Result<Decimal> {
    let amount = amount.ok_or_else(|| LendingError::Validation("amount is required".into()))?;

    if amount <= Decimal::ZERO {
        return Err(LendingError::Validation("amount must be positive".into()));
    }
    if amount.normalize().scale() > AMOUNT_DECIMAL_PLACES {
        return Err(LendingError::Validation(format!(
            "amount must have at most {AMOUNT_DECIMAL_PLACES} decimal places"
        )));
    }
    let max = max_amount();
    if amount > max {
        return Err(LendingError::Validation(format!(
            "amount must not exceed {max}"
        )));
    }

    Ok(amount.round_dp(AMOUNT_DECIMAL_PLACES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn active_statuses_match_is_active() {
        for status in LoanStatus::ALL {
            assert_eq!(ACTIVE_STATUSES.contains(&status), status.is_active());
        }
    }

    #[test]
    fn status_string_roundtrip() {
        for status in LoanStatus::ALL {
            assert_eq!(status.as_str().parse::<LoanStatus>().unwrap(), status);
        }
        assert!("ACTIVE".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&LoanStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
    }

    #[test]
    fn terminal_statuses_have_no_exit() {
        for from in [LoanStatus::Rejected, LoanStatus::Failed, LoanStatus::Repaid] {
            for to in LoanStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn processing_resolves_to_decided_statuses_only() {
        let reachable: Vec<_> = LoanStatus::ALL
            .into_iter()
            .filter(|s| LoanStatus::Processing.can_transition_to(*s))
            .collect();
        assert_eq!(
            reachable,
            vec![LoanStatus::Approved, LoanStatus::Rejected, LoanStatus::Failed]
        );
        assert!(reachable.iter().all(|s| !s.can_transition_to(LoanStatus::Processing)));
    }

    #[test]
    fn new_application_is_processing() {
        let loan = LoanApplication::new("CUST-1", dec!(500));
        assert_eq!(loan.status, LoanStatus::Processing);
        assert!(loan.approved_amount.is_none());
        assert!(loan.scoring_token.is_none());
    }

    #[test]
    fn fail_records_reason_and_blocks_further_moves() {
        let mut loan = LoanApplication::new("CUST-1", dec!(500));
        loan.fail("scoring service unavailable").unwrap();
        assert_eq!(loan.status, LoanStatus::Failed);
        assert_eq!(
            loan.rejection_reason.as_deref(),
            Some("scoring service unavailable")
        );
        assert!(matches!(
            loan.fail("again"),
            Err(LendingError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn status_view_omits_scoring_token() {
        let mut loan = LoanApplication::new("CUST-1", dec!(500));
        loan.scoring_token = Some("secret-token".into());
        let view = LoanStatusView::from(&loan);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(!json.contains("scoring_token"));
    }

    #[test]
    fn customer_number_validation() {
        assert_eq!(
            validate_customer_number(Some("  234774784 ")).unwrap(),
            "234774784"
        );
        assert!(validate_customer_number(None).is_err());
        assert!(validate_customer_number(Some("   ")).is_err());
        assert!(validate_customer_number(Some("9".repeat(51).as_str())).is_err());
    }

    #[test]
    fn amount_validation() {
        assert_eq!(validate_amount(Some(dec!(500.00))).unwrap(), dec!(500));
        assert_eq!(validate_amount(Some(dec!(10.500))).unwrap(), dec!(10.50));
        assert!(validate_amount(None).is_err());
        assert!(validate_amount(Some(dec!(0))).is_err());
        assert!(validate_amount(Some(dec!(-5))).is_err());
        assert!(validate_amount(Some(dec!(1.234))).is_err());
        assert!(validate_amount(Some(dec!(9999999999.99))).is_ok());
        assert!(validate_amount(Some(dec!(10000000000))).is_err());
    }

    #[test]
    fn max_amount_has_twelve_digits() {
        assert_eq!(max_amount(), dec!(9999999999.99));
    }
}
