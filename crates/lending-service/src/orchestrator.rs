//! Loan orchestration: intake, scoring, decision.
//!
//! A request runs through three steps:
//!
//! 1. **Intake**: validate, then create the application in `PROCESSING`. The
//!    store rejects a second non-terminal loan for the same customer.
//! 2. **Scoring**: initiate a scoring run with the injected client
//!    registration, persist the scoring token, then poll for the result a
//!    bounded number of times under an overall deadline.
//! 3. **Decision**: apply the [`DecisionPolicy`] and persist the outcome with
//!    the status change.
//!
//! Scoring runs in its own task. The handler awaits it, but a client that
//! disconnects does not abort it, so the loan never stays in `PROCESSING`.
//! Adapter failures never escape: they become a retry or a `FAILED` loan.
//! A scoring result the store refuses is replaced by a `FAILED` row so the
//! customer is not locked out.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lending_core::{
    decide, validate_amount, validate_customer_number, ApplicationId, ClientRegistration,
    DecisionPolicy, LendingError, LoanApplication, LoanRepayment, LoanStatus, LoanStatusView,
    ScoreReport,
};
use lending_store::Store;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::cache::LookupCache;
use crate::config::ScoringConfig;
use crate::scoring::ScoringClient;

// ============================================================================
// Constants
// ============================================================================

/// Failure reason when no client registration or scoring client is available.
pub const REASON_NOT_CONFIGURED: &str = "scoring not configured";

/// Failure reason when the scoring engine would not start a run.
pub const REASON_INITIATION_FAILED: &str = "scoring initiation failed";

/// Failure reason when no score arrived within the retry budget.
pub const REASON_UNAVAILABLE: &str = "scoring service unavailable";

/// Failure reason when the scoring token or decision could not be stored.
pub const REASON_NOT_RECORDED: &str = "scoring result could not be recorded";

/// Maximum length of a repayment reference.
const MAX_REFERENCE_LEN: usize = 100;

/// Retry and deadline settings for the score poll.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of score queries.
    pub max_attempts: u32,
    /// Fixed delay between queries.
    pub delay: Duration,
    /// Bound on the whole poll loop.
    pub deadline: Duration,
}

impl From<&ScoringConfig> for RetryPolicy {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: config.retry_delay,
            deadline: config.deadline,
        }
    }
}

/// Drives loan applications from intake to decision.
#[derive(Clone)]
pub struct LoanOrchestrator {
    store: Arc<dyn Store>,
    scoring: Option<Arc<ScoringClient>>,
    registration: Option<ClientRegistration>,
    policy: DecisionPolicy,
    retry: RetryPolicy,
    cache: Arc<LookupCache>,
}

impl LoanOrchestrator {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        scoring: Option<Arc<ScoringClient>>,
        registration: Option<ClientRegistration>,
        policy: DecisionPolicy,
        retry: RetryPolicy,
        cache: Arc<LookupCache>,
    ) -> Self {
        Self {
            store,
            scoring,
            registration,
            policy,
            retry,
            cache,
        }
    }

    /// Whether both a scoring client and a client registration are present.
    #[must_use]
    pub fn is_scoring_configured(&self) -> bool {
        self.scoring.is_some() && self.registration.is_some()
    }

    // =========================================================================
    // Loan requests
    // =========================================================================

    /// Accept a loan request and drive it to `APPROVED`, `REJECTED` or `FAILED`.
    ///
    /// Scoring exhaustion is not an error: it yields a `FAILED` loan.
    ///
    /// # Errors
    ///
    /// - `LendingError::Validation` on bad input.
    /// - `LendingError::DuplicateActiveLoan` if the customer has a non-terminal loan.
    /// - `LendingError::ScoringNotConfigured` if there is no registration (the loan is `FAILED`).
    /// - `LendingError::ScoringInitiation` if the engine refused (the loan is `FAILED`).
    /// - `LendingError::Storage` on persistence failure.
    pub async fn submit(
        &self,
        customer_number: Option<&str>,
        amount: Option<Decimal>,
    ) -> Result<LoanApplication, LendingError> {
        let loan = self.intake(customer_number, amount).await?;
        let application_id = loan.application_id;

        let this = self.clone();
        let scoring = tokio::spawn(async move { this.score(loan).await });

        match scoring.await {
            Ok(result) => result,
            Err(e) => {
                error!(application_id = %application_id, error = %e, "Scoring task aborted");
                Err(LendingError::Storage(format!("scoring task aborted: {e}")))
            }
        }
    }

    /// Validate and create the application.
    ///
    /// # Errors
    ///
    /// - `LendingError::Validation` on bad input.
    /// - `LendingError::DuplicateActiveLoan` if the customer has a non-terminal loan.
    pub async fn intake(
        &self,
        customer_number: Option<&str>,
        amount: Option<Decimal>,
    ) -> Result<LoanApplication, LendingError> {
        let customer_number = validate_customer_number(customer_number)?;
        let amount = validate_amount(amount)?;

        let loan = LoanApplication::new(customer_number, amount);
        self.store.create_loan_application(&loan).await?;

        info!(
            application_id = %loan.application_id,
            customer_number = %loan.customer_number,
            amount = %loan.requested_amount,
            "Loan application created"
        );
        Ok(loan)
    }

    /// Run scoring and the decision for a `PROCESSING` loan.
    async fn score(&self, mut loan: LoanApplication) -> Result<LoanApplication, LendingError> {
        let Some((scoring, registration)) = self.scoring.as_deref().zip(self.registration.as_ref())
        else {
            warn!(application_id = %loan.application_id, "Scoring engine not configured");
            self.fail(&mut loan, REASON_NOT_CONFIGURED).await?;
            return Err(LendingError::ScoringNotConfigured);
        };

        let token = match scoring
            .initiate_scoring(&loan.customer_number, &registration.token)
            .await
        {
            Ok(Some(token)) => token,
            outcome => {
                match outcome {
                    Err(e) => warn!(application_id = %loan.application_id, error = %e, "Scoring initiation failed"),
                    _ => warn!(application_id = %loan.application_id, "Scoring engine returned no token"),
                }
                self.fail(&mut loan, REASON_INITIATION_FAILED).await?;
                return Err(LendingError::ScoringInitiation {
                    customer_number: loan.customer_number.clone(),
                });
            }
        };

        // Persist the token before polling so an interrupted run stays traceable.
        loan.scoring_token = Some(token.clone());
        loan.updated_at = Utc::now();
        self.save_or_fail(&loan).await?;

        let report = tokio::time::timeout(
            self.retry.deadline,
            self.poll_score(scoring, &token, &registration.token, loan.application_id),
        )
        .await
        .unwrap_or_else(|_| {
            warn!(application_id = %loan.application_id, "Scoring deadline exceeded");
            None
        });

        let Some(report) = report else {
            self.fail(&mut loan, REASON_UNAVAILABLE).await?;
            return Ok(loan);
        };

        let assessment = decide(
            &self.policy,
            loan.requested_amount,
            &report,
            Utc::now().date_naive(),
        );
        loan.record_assessment(&assessment)?;
        self.save_or_fail(&loan).await?;

        info!(
            application_id = %loan.application_id,
            status = %loan.status,
            score = assessment.score,
            "Loan decided"
        );
        Ok(loan)
    }

    /// Query the score up to `max_attempts` times, stopping at the first result.
    async fn poll_score(
        &self,
        scoring: &ScoringClient,
        token: &str,
        client_token: &str,
        application_id: ApplicationId,
    ) -> Option<ScoreReport> {
        let max_attempts = self.retry.max_attempts;

        for attempt in 1..=max_attempts {
            match scoring.query_score(token, client_token).await {
                Ok(Some(report)) => return Some(report),
                Ok(None) => debug!(
                    application_id = %application_id,
                    attempt = %attempt,
                    "Score not ready"
                ),
                Err(e) => warn!(
                    application_id = %application_id,
                    attempt = %attempt,
                    error = %e,
                    "Score query failed"
                ),
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.retry.delay).await;
            }
        }

        warn!(
            application_id = %application_id,
            attempts = %max_attempts,
            "Score query attempts exhausted"
        );
        None
    }

    /// Persist a scoring step. If the store refuses it, fail the stored row.
    async fn save_or_fail(&self, loan: &LoanApplication) -> Result<(), LendingError> {
        let Err(e) = self.store.update_loan_application(loan).await else {
            return Ok(());
        };
        error!(
            application_id = %loan.application_id,
            status = %loan.status,
            error = %e,
            "Failed to store scoring result"
        );

        if let Err(second) = self.fail_stored(&loan.application_id).await {
            error!(
                application_id = %loan.application_id,
                error = %second,
                "Loan left in PROCESSING"
            );
        }
        Err(LendingError::Storage(e.to_string()))
    }

    /// Reload the application and fail it if it is still `PROCESSING`.
    async fn fail_stored(&self, application_id: &ApplicationId) -> Result<(), LendingError> {
        let mut stored = self
            .store
            .get_loan_application(application_id)
            .await?
            .ok_or_else(|| LendingError::LoanNotFound {
                application_id: application_id.to_string(),
            })?;

        if stored.status == LoanStatus::Processing {
            self.fail(&mut stored, REASON_NOT_RECORDED).await?;
        }
        Ok(())
    }

    async fn fail(&self, loan: &mut LoanApplication, reason: &str) -> Result<(), LendingError> {
        loan.fail(reason)?;
        self.store.update_loan_application(loan).await?;
        info!(application_id = %loan.application_id, reason, "Loan failed");
        Ok(())
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Public status of an application, served from the cache when fresh.
    ///
    /// # Errors
    ///
    /// - `LendingError::LoanNotFound` if the identifier is unknown or malformed.
    /// - `LendingError::Storage` on persistence failure.
    pub async fn status(&self, application_id: &str) -> Result<LoanStatusView, LendingError> {
        let id = parse_application_id(application_id)?;

        if let Some(view) = self.cache.loan_status.get(&id).await {
            debug!(application_id = %id, "Loan status cache hit");
            return Ok(view);
        }

        let loan = self
            .store
            .get_loan_application(&id)
            .await?
            .ok_or_else(|| LendingError::LoanNotFound {
                application_id: id.to_string(),
            })?;

        let view = LoanStatusView::from(&loan);
        self.cache.loan_status.insert(id, view.clone()).await;
        Ok(view)
    }

    // =========================================================================
    // Repayments
    // =========================================================================

    /// Record a repayment; the loan becomes `REPAID` once fully paid.
    ///
    /// # Errors
    ///
    /// - `LendingError::Validation` on bad amount or reference.
    /// - `LendingError::LoanNotFound` if the identifier is unknown.
    /// - `LendingError::InvalidTransition` if the loan is not `APPROVED` or `DISBURSED`.
    pub async fn record_repayment(
        &self,
        application_id: &str,
        amount: Option<Decimal>,
        reference: Option<&str>,
    ) -> Result<(LoanApplication, LoanRepayment), LendingError> {
        let id = parse_application_id(application_id)?;
        let amount = validate_amount(amount)?;
        let reference = reference
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| LendingError::Validation("reference is required".into()))?;
        if reference.chars().count() > MAX_REFERENCE_LEN {
            return Err(LendingError::Validation(format!(
                "reference must be at most {MAX_REFERENCE_LEN} characters"
            )));
        }

        let repayment = LoanRepayment::new(id, amount, reference);
        let loan = self.store.record_repayment(&repayment).await?;

        info!(
            application_id = %id,
            amount = %amount,
            status = %loan.status,
            "Repayment recorded"
        );
        Ok((loan, repayment))
    }

    /// Repayments recorded against an application.
    ///
    /// # Errors
    ///
    /// - `LendingError::LoanNotFound` if the identifier is unknown.
    pub async fn repayments(
        &self,
        application_id: &str,
    ) -> Result<(LoanApplication, Vec<LoanRepayment>), LendingError> {
        let id = parse_application_id(application_id)?;
        let loan = self
            .store
            .get_loan_application(&id)
            .await?
            .ok_or_else(|| LendingError::LoanNotFound {
                application_id: id.to_string(),
            })?;
        let repayments = self.store.list_repayments(&id).await?;
        Ok((loan, repayments))
    }
}

fn parse_application_id(raw: &str) -> Result<ApplicationId, LendingError> {
    raw.trim()
        .parse()
        .map_err(|_| LendingError::LoanNotFound {
            application_id: raw.to_string(),
        })
}
