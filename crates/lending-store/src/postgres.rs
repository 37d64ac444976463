//! PostgreSQL storage implementation.
//!
//! Queries are checked at runtime (`sqlx::query_as`) so the crate builds
//! without a live database. Rows are read into `FromRow` structs and then
//! converted into domain types, which is where malformed data surfaces as
//! `StoreError::Serialization`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lending_core::{
    ApplicationId, ClientRegistration, CustomerSubscription, CustomerTransaction,
    LoanApplication, LoanRepayment, LoanStatus,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::schema::{entity, ACTIVE_LOAN_PER_CUSTOMER_INDEX};
use crate::{ensure_repayable, settle_if_repaid, Store};

const LOAN_COLUMNS: &str = "application_id, customer_number, requested_amount, approved_amount, \
     status, scoring_token, score, credit_limit, exclusion, interest_rate, term_days, \
     rejection_reason, application_date, disbursement_date, due_date, repayment_date, \
     created_at, updated_at";

/// Rows per transaction insert. Each row binds 5 parameters and Postgres
/// accepts at most 65 535 per statement.
pub const TRANSACTION_INSERT_BATCH: usize = 1000;

/// PostgreSQL-backed storage implementation.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        debug!("Database migrations applied");
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn not_found(application_id: &ApplicationId) -> StoreError {
    StoreError::NotFound {
        entity: entity::LOAN_APPLICATION,
        id: application_id.to_string(),
    }
}

fn is_active_loan_conflict(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.constraint() == Some(ACTIVE_LOAN_PER_CUSTOMER_INDEX)
    )
}

fn term_days_to_db(term_days: Option<u32>) -> Result<Option<i32>> {
    term_days
        .map(i32::try_from)
        .transpose()
        .map_err(|e| StoreError::Serialization(format!("term_days out of range: {e}")))
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct LoanRow {
    application_id: Uuid,
    customer_number: String,
    requested_amount: Decimal,
    approved_amount: Option<Decimal>,
    status: String,
    scoring_token: Option<String>,
    score: Option<i64>,
    credit_limit: Option<Decimal>,
    exclusion: Option<String>,
    interest_rate: Option<Decimal>,
    term_days: Option<i32>,
    rejection_reason: Option<String>,
    application_date: DateTime<Utc>,
    disbursement_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    repayment_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LoanRow> for LoanApplication {
    type Error = StoreError;

    fn try_from(row: LoanRow) -> Result<Self> {
        let status: LoanStatus = row
            .status
            .parse()
            .map_err(|e: lending_core::LendingError| StoreError::Serialization(e.to_string()))?;
        let term_days = row
            .term_days
            .map(u32::try_from)
            .transpose()
            .map_err(|e| StoreError::Serialization(format!("negative term_days: {e}")))?;

        Ok(Self {
            application_id: ApplicationId::from_uuid(row.application_id),
            customer_number: row.customer_number,
            requested_amount: row.requested_amount,
            approved_amount: row.approved_amount,
            status,
            scoring_token: row.scoring_token,
            score: row.score,
            credit_limit: row.credit_limit,
            exclusion: row.exclusion,
            interest_rate: row.interest_rate,
            term_days,
            rejection_reason: row.rejection_reason,
            application_date: row.application_date,
            disbursement_date: row.disbursement_date,
            due_date: row.due_date,
            repayment_date: row.repayment_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    customer_number: String,
    is_active: bool,
    subscribed_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl From<SubscriptionRow> for CustomerSubscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            customer_number: row.customer_number,
            is_active: row.is_active,
            subscribed_at: row.subscribed_at,
            last_updated: row.last_updated,
        }
    }
}

#[derive(Debug, FromRow)]
struct RegistrationRow {
    client_id: i64,
    url: String,
    name: String,
    username: String,
    password: String,
    token: String,
    created_at: DateTime<Utc>,
}

impl From<RegistrationRow> for ClientRegistration {
    fn from(row: RegistrationRow) -> Self {
        Self {
            client_id: row.client_id,
            url: row.url,
            name: row.name,
            username: row.username,
            password: row.password,
            token: row.token,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RepaymentRow {
    id: String,
    application_id: Uuid,
    amount: Decimal,
    paid_at: DateTime<Utc>,
    transaction_reference: String,
}

impl TryFrom<RepaymentRow> for LoanRepayment {
    type Error = StoreError;

    fn try_from(row: RepaymentRow) -> Result<Self> {
        Ok(Self {
            id: row
                .id
                .trim()
                .parse()
                .map_err(|e: lending_core::IdError| StoreError::Serialization(e.to_string()))?,
            application_id: ApplicationId::from_uuid(row.application_id),
            amount: row.amount,
            paid_at: row.paid_at,
            transaction_reference: row.transaction_reference,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    customer_number: String,
    account_number: String,
    occurred_at: DateTime<Utc>,
    amount: Decimal,
    transaction_type: String,
}

impl From<TransactionRow> for CustomerTransaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            customer_number: row.customer_number,
            account_number: row.account_number,
            timestamp: row.occurred_at,
            amount: row.amount,
            transaction_type: row.transaction_type,
        }
    }
}

// ============================================================================
// Store
// ============================================================================

#[async_trait]
impl Store for PgStore {
    async fn create_loan_application(&self, loan: &LoanApplication) -> Result<()> {
        let sql = format!(
            "INSERT INTO loan_applications ({LOAN_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        );

        let result = sqlx::query(&sql)
            .bind(loan.application_id.as_uuid())
            .bind(&loan.customer_number)
            .bind(loan.requested_amount)
            .bind(loan.approved_amount)
            .bind(loan.status.as_str())
            .bind(&loan.scoring_token)
            .bind(loan.score)
            .bind(loan.credit_limit)
            .bind(&loan.exclusion)
            .bind(loan.interest_rate)
            .bind(term_days_to_db(loan.term_days)?)
            .bind(&loan.rejection_reason)
            .bind(loan.application_date)
            .bind(loan.disbursement_date)
            .bind(loan.due_date)
            .bind(loan.repayment_date)
            .bind(loan.created_at)
            .bind(loan.updated_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_active_loan_conflict(&e) => Err(StoreError::DuplicateActiveLoan {
                customer_number: loan.customer_number.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_loan_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<LoanApplication>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loan_applications WHERE application_id = $1");
        sqlx::query_as::<_, LoanRow>(&sql)
            .bind(application_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(LoanApplication::try_from)
            .transpose()
    }

    async fn update_loan_application(&self, loan: &LoanApplication) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let stored: Option<String> = sqlx::query_scalar(
            "SELECT status FROM loan_applications WHERE application_id = $1 FOR UPDATE",
        )
        .bind(loan.application_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let stored: LoanStatus = stored
            .ok_or_else(|| not_found(&loan.application_id))?
            .parse()
            .map_err(|e: lending_core::LendingError| StoreError::Serialization(e.to_string()))?;

        if stored != loan.status && !stored.can_transition_to(loan.status) {
            return Err(StoreError::InvalidTransition {
                from: stored,
                to: loan.status,
            });
        }

        sqlx::query(
            "UPDATE loan_applications SET \
                approved_amount = $2, status = $3, scoring_token = $4, score = $5, \
                credit_limit = $6, exclusion = $7, interest_rate = $8, term_days = $9, \
                rejection_reason = $10, disbursement_date = $11, due_date = $12, \
                repayment_date = $13, updated_at = $14 \
             WHERE application_id = $1",
        )
        .bind(loan.application_id.as_uuid())
        .bind(loan.approved_amount)
        .bind(loan.status.as_str())
        .bind(&loan.scoring_token)
        .bind(loan.score)
        .bind(loan.credit_limit)
        .bind(&loan.exclusion)
        .bind(loan.interest_rate)
        .bind(term_days_to_db(loan.term_days)?)
        .bind(&loan.rejection_reason)
        .bind(loan.disbursement_date)
        .bind(loan.due_date)
        .bind(loan.repayment_date)
        .bind(loan.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn has_active_loan(&self, customer_number: &str) -> Result<bool> {
        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM loan_applications \
             WHERE customer_number = $1 \
               AND status IN ('PENDING', 'PROCESSING', 'APPROVED', 'DISBURSED'))",
        )
        .bind(customer_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(active)
    }

    async fn get_or_create_subscription(
        &self,
        customer_number: &str,
    ) -> Result<(CustomerSubscription, bool)> {
        let fresh = CustomerSubscription::new(customer_number);

        let inserted = sqlx::query_as::<_, SubscriptionRow>(
            "INSERT INTO customer_subscriptions \
                (customer_number, is_active, subscribed_at, last_updated) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (customer_number) DO NOTHING \
             RETURNING customer_number, is_active, subscribed_at, last_updated",
        )
        .bind(&fresh.customer_number)
        .bind(fresh.is_active)
        .bind(fresh.subscribed_at)
        .bind(fresh.last_updated)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.into(), true));
        }

        let existing = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT customer_number, is_active, subscribed_at, last_updated \
             FROM customer_subscriptions WHERE customer_number = $1",
        )
        .bind(customer_number)
        .fetch_one(&self.pool)
        .await?;
        Ok((existing.into(), false))
    }

    async fn get_client_registration(&self) -> Result<Option<ClientRegistration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            "SELECT client_id, url, name, username, password, token, created_at \
             FROM client_registrations WHERE singleton",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn put_client_registration(&self, registration: &ClientRegistration) -> Result<()> {
        sqlx::query(
            "INSERT INTO client_registrations \
                (singleton, client_id, url, name, username, password, token, created_at) \
             VALUES (TRUE, $1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (singleton) DO UPDATE SET \
                client_id = EXCLUDED.client_id, url = EXCLUDED.url, name = EXCLUDED.name, \
                username = EXCLUDED.username, password = EXCLUDED.password, \
                token = EXCLUDED.token, created_at = EXCLUDED.created_at",
        )
        .bind(registration.client_id)
        .bind(&registration.url)
        .bind(&registration.name)
        .bind(&registration.username)
        .bind(&registration.password)
        .bind(&registration.token)
        .bind(registration.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_repayment(&self, repayment: &LoanRepayment) -> Result<LoanApplication> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loan_applications WHERE application_id = $1 FOR UPDATE"
        );
        let mut loan: LoanApplication = sqlx::query_as::<_, LoanRow>(&sql)
            .bind(repayment.application_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found(&repayment.application_id))?
            .try_into()?;
        ensure_repayable(&loan)?;

        sqlx::query(
            "INSERT INTO loan_repayments \
                (id, application_id, amount, paid_at, transaction_reference) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(repayment.id.to_string())
        .bind(repayment.application_id.as_uuid())
        .bind(repayment.amount)
        .bind(repayment.paid_at)
        .bind(&repayment.transaction_reference)
        .execute(&mut *tx)
        .await?;

        let paid: Vec<Decimal> =
            sqlx::query_scalar("SELECT amount FROM loan_repayments WHERE application_id = $1")
                .bind(repayment.application_id.as_uuid())
                .fetch_all(&mut *tx)
                .await?;

        let before = loan.status;
        settle_if_repaid(&mut loan, paid)?;
        loan.updated_at = Utc::now();

        sqlx::query(
            "UPDATE loan_applications \
             SET status = $2, repayment_date = $3, updated_at = $4 \
             WHERE application_id = $1",
        )
        .bind(loan.application_id.as_uuid())
        .bind(loan.status.as_str())
        .bind(loan.repayment_date)
        .bind(loan.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if before != loan.status {
            info!(application_id = %loan.application_id, "Loan fully repaid");
        }
        Ok(loan)
    }

    async fn list_repayments(&self, application_id: &ApplicationId) -> Result<Vec<LoanRepayment>> {
        sqlx::query_as::<_, RepaymentRow>(
            "SELECT id, application_id, amount, paid_at, transaction_reference \
             FROM loan_repayments WHERE application_id = $1 ORDER BY paid_at, id",
        )
        .bind(application_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(LoanRepayment::try_from)
        .collect()
    }

    async fn replace_customer_transactions(
        &self,
        customer_number: &str,
        transactions: &[CustomerTransaction],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM customer_transactions WHERE customer_number = $1")
            .bind(customer_number)
            .execute(&mut *tx)
            .await?;

        for chunk in transactions.chunks(TRANSACTION_INSERT_BATCH) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO customer_transactions \
                    (customer_number, account_number, occurred_at, amount, transaction_type) ",
            );
            builder.push_values(chunk, |mut row, t| {
                row.push_bind(customer_number)
                    .push_bind(&t.account_number)
                    .push_bind(t.timestamp)
                    .push_bind(t.amount)
                    .push_bind(&t.transaction_type);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        debug!(customer_number, count = transactions.len(), "Transactions materialized");
        Ok(())
    }

    async fn list_customer_transactions(
        &self,
        customer_number: &str,
    ) -> Result<Vec<CustomerTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT customer_number, account_number, occurred_at, amount, transaction_type \
             FROM customer_transactions WHERE customer_number = $1 ORDER BY occurred_at, id",
        )
        .bind(customer_number)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
