//! Loan decision policy.
//!
//! The policy is a pure function of the scoring engine's report, the
//! requested amount and the date of the decision:
//!
//! - **Approve** iff `score >= min_score`, `requested <= limitAmount` and the
//!   exclusion text equals `"No Exclusion"`.
//! - **Reject** otherwise, with a reason listing the figures that were compared.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Minimum score required for approval.
pub const DEFAULT_MIN_SCORE: i64 = 500;

/// Exclusion text meaning the customer is not excluded.
pub const NO_EXCLUSION: &str = "No Exclusion";

/// Default interest rate in percent (12.5%).
pub const DEFAULT_INTEREST_RATE: Decimal = Decimal::from_parts(125, 0, 0, false, 1);

/// Default loan term in days.
pub const DEFAULT_TERM_DAYS: u32 = 30;

/// Tunable policy constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionPolicy {
    /// Minimum score required for approval.
    pub min_score: i64,
    /// Exclusion text that must be reported for approval.
    pub required_exclusion: String,
    /// Interest rate applied to approved loans, in percent.
    pub interest_rate: Decimal,
    /// Term applied to approved loans.
    pub term_days: u32,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            required_exclusion: NO_EXCLUSION.to_string(),
            interest_rate: DEFAULT_INTEREST_RATE,
            term_days: DEFAULT_TERM_DAYS,
        }
    }
}

/// Scoring engine result for one scoring token.
///
/// Every field is optional on the wire; absent values fall back to zero or
/// an empty exclusion when the policy is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    /// Credit score.
    pub score: Option<i64>,
    /// Credit limit offered by the engine.
    pub limit_amount: Option<Decimal>,
    /// Exclusion category.
    pub exclusion: Option<String>,
    /// Free-text explanation of the exclusion.
    pub exclusion_reason: Option<String>,
}

/// Terms attached to an approved loan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalTerms {
    /// Amount granted (equal to the requested amount).
    pub approved_amount: Decimal,
    /// Interest rate in percent.
    pub interest_rate: Decimal,
    /// Term in days.
    pub term_days: u32,
    /// Disbursement date (the decision date).
    pub disbursement_date: NaiveDate,
    /// Disbursement date plus the term.
    pub due_date: NaiveDate,
}

/// Outcome of the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Loan granted on these terms.
    Approved(ApprovalTerms),
    /// Loan refused.
    Rejected {
        /// Summary of the figures behind the refusal.
        reason: String,
    },
}

/// The normalized figures the policy compared, with its decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// Score, defaulted to zero.
    pub score: i64,
    /// Limit, defaulted to zero.
    pub limit_amount: Decimal,
    /// Exclusion, defaulted to empty.
    pub exclusion: String,
    /// The decision.
    pub decision: Decision,
}

/// Apply the policy to a score report.
#[must_use]
pub fn decide(
    policy: &DecisionPolicy,
    requested: Decimal,
    report: &ScoreReport,
    today: NaiveDate,
) -> Assessment {
    let score = report.score.unwrap_or(0);
    let limit_amount = report.limit_amount.unwrap_or(Decimal::ZERO);
    let exclusion = report.exclusion.clone().unwrap_or_default();

    let approved = score >= policy.min_score
        && requested <= limit_amount
        && exclusion == policy.required_exclusion;

    let decision = if approved {
        Decision::Approved(ApprovalTerms {
            approved_amount: requested,
            interest_rate: policy.interest_rate,
            term_days: policy.term_days,
            disbursement_date: today,
            due_date: today
                .checked_add_days(Days::new(u64::from(policy.term_days)))
                .unwrap_or(NaiveDate::MAX),
        })
    } else {
        Decision::Rejected {
            reason: format!(
                "score={score} (min {}), limitAmount={limit_amount}, requestedAmount={requested}, exclusion={exclusion}",
                policy.min_score
            ),
        }
    };

    Assessment {
        score,
        limit_amount,
        exclusion,
        decision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn report(score: i64, limit: Decimal, exclusion: &str) -> ScoreReport {
        ScoreReport {
            score: Some(score),
            limit_amount: Some(limit),
            exclusion: Some(exclusion.to_string()),
            exclusion_reason: None,
        }
    }

    #[test]
    fn approves_good_score_within_limit() {
        let assessment = decide(
            &DecisionPolicy::default(),
            dec!(500),
            &report(600, dec!(1000), NO_EXCLUSION),
            today(),
        );

        let Decision::Approved(terms) = assessment.decision else {
            panic!("expected approval");
        };
        assert_eq!(terms.approved_amount, dec!(500));
        assert_eq!(terms.interest_rate, dec!(12.5));
        assert_eq!(terms.term_days, 30);
        assert_eq!(terms.disbursement_date, today());
        assert_eq!(
            terms.due_date,
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
        );
    }

    #[test]
    fn rejects_low_score_and_names_it() {
        let assessment = decide(
            &DecisionPolicy::default(),
            dec!(500),
            &report(400, dec!(1000), NO_EXCLUSION),
            today(),
        );

        let Decision::Rejected { reason } = assessment.decision else {
            panic!("expected rejection");
        };
        assert!(reason.contains("score=400"), "{reason}");
        assert!(reason.contains("limitAmount=1000"), "{reason}");
    }

    #[test]
    fn boundaries_are_inclusive() {
        let assessment = decide(
            &DecisionPolicy::default(),
            dec!(1000),
            &report(500, dec!(1000), NO_EXCLUSION),
            today(),
        );
        assert!(matches!(assessment.decision, Decision::Approved(_)));
    }

    #[test]
    fn rejects_amount_over_limit() {
        let assessment = decide(
            &DecisionPolicy::default(),
            dec!(1000.01),
            &report(900, dec!(1000), NO_EXCLUSION),
            today(),
        );
        assert!(matches!(assessment.decision, Decision::Rejected { .. }));
    }

    #[test]
    fn rejects_any_exclusion() {
        let assessment = decide(
            &DecisionPolicy::default(),
            dec!(100),
            &report(900, dec!(1000), "Court Judgement"),
            today(),
        );
        let Decision::Rejected { reason } = assessment.decision else {
            panic!("expected rejection");
        };
        assert!(reason.ends_with("exclusion=Court Judgement"), "{reason}");
    }

    #[test]
    fn missing_fields_default_to_zero_and_reject() {
        let assessment = decide(
            &DecisionPolicy::default(),
            dec!(1),
            &ScoreReport::default(),
            today(),
        );
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.limit_amount, Decimal::ZERO);
        assert_eq!(assessment.exclusion, "");
        assert!(matches!(assessment.decision, Decision::Rejected { .. }));
    }

    #[test]
    fn decision_is_deterministic() {
        let policy = DecisionPolicy::default();
        let input = report(650, dec!(2000), NO_EXCLUSION);
        let first = decide(&policy, dec!(1500), &input, today());
        for _ in 0..10 {
            assert_eq!(decide(&policy, dec!(1500), &input, today()), first);
        }
    }

    #[test]
    fn custom_policy_terms_are_applied() {
        let policy = DecisionPolicy {
            min_score: 700,
            interest_rate: dec!(9.75),
            term_days: 14,
            ..DecisionPolicy::default()
        };
        let rejected = decide(&policy, dec!(10), &report(650, dec!(100), NO_EXCLUSION), today());
        assert!(matches!(rejected.decision, Decision::Rejected { .. }));

        let approved = decide(&policy, dec!(10), &report(700, dec!(100), NO_EXCLUSION), today());
        let Decision::Approved(terms) = approved.decision else {
            panic!("expected approval");
        };
        assert_eq!(terms.interest_rate, dec!(9.75));
        assert_eq!(terms.due_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn score_report_reads_engine_payload() {
        let report: ScoreReport = serde_json::from_str(
            r#"{"id":1,"customerNumber":"234774784","score":564,"limitAmount":30000,"exclusion":"No Exclusion","exclusionReason":"No Exclusion"}"#,
        )
        .unwrap();
        assert_eq!(report.score, Some(564));
        assert_eq!(report.limit_amount, Some(dec!(30000)));
        assert_eq!(report.exclusion.as_deref(), Some(NO_EXCLUSION));
    }
}
