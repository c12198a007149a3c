//! Request repository for database operations.

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::error::StoreError;
use domain::models::{IncomeStatementRequest, NewRequest, RequestStatus};
use domain::services::RequestStore;
use shared::ident::{CaseRef, OrganizationNumber};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{BenefitTypeDb, RequestEntity, RequestKindDb, RequestStatusDb};
use crate::metrics::QueryTimer;

const REQUEST_COLUMNS: &str = "id, uuid, status, kind, benefit_type, employer_org, actor_id, \
                               case_ref, income_basis_date, first_absence_date, \
                               notification_case_id, notification_task_id, dialog_id, \
                               created_at, updated_at";

/// Repository for request-related database operations.
#[derive(Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    /// Creates a new RequestRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_entity(&self, new: &NewRequest) -> Result<RequestEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_request");
        let result = sqlx::query_as::<_, RequestEntity>(&format!(
            r#"
            INSERT INTO requests (uuid, status, kind, benefit_type, employer_org, actor_id,
                                  case_ref, income_basis_date, first_absence_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(RequestStatusDb::UnderProcessing)
        .bind(RequestKindDb::from(new.kind))
        .bind(BenefitTypeDb::from(new.benefit_type))
        .bind(new.employer_org.as_str())
        .bind(new.actor_id.as_str())
        .bind(new.case_ref.as_ref().map(|c| c.as_str()))
        .bind(new.income_basis_date)
        .bind(new.first_absence_date)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    async fn fetch_by_uuid(&self, uuid: Uuid) -> Result<Option<RequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_request_by_uuid");
        let result = sqlx::query_as::<_, RequestEntity>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM requests
            WHERE uuid = $1
            "#
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    fn require_row(outcome: sqlx::postgres::PgQueryResult) -> Result<(), sqlx::Error> {
        if outcome.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }
}

fn map_store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            StoreError::Duplicate
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

#[async_trait]
impl RequestStore for RequestRepository {
    async fn insert(&self, new: NewRequest) -> Result<IncomeStatementRequest, StoreError> {
        self.insert_entity(&new)
            .await
            .map(Into::into)
            .map_err(map_store_error)
    }

    async fn remove(&self, uuid: Uuid) -> Result<(), StoreError> {
        let timer = QueryTimer::new("remove_request");
        let result = sqlx::query("DELETE FROM requests WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await;
        timer.record();
        let outcome = result.map_err(map_store_error)?;
        if outcome.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_by_uuid(
        &self,
        uuid: Uuid,
    ) -> Result<Option<IncomeStatementRequest>, StoreError> {
        self.fetch_by_uuid(uuid)
            .await
            .map(|entity| entity.map(Into::into))
            .map_err(map_store_error)
    }

    async fn find_matching(
        &self,
        case_ref: &CaseRef,
        employer_org: &OrganizationNumber,
        income_basis_date: NaiveDate,
        first_absence_date: NaiveDate,
    ) -> Result<Option<IncomeStatementRequest>, StoreError> {
        let timer = QueryTimer::new("find_matching_request");
        let result = sqlx::query_as::<_, RequestEntity>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM requests
            WHERE case_ref = $1
              AND employer_org = $2
              AND income_basis_date = $3
              AND first_absence_date = $4
            "#
        ))
        .bind(case_ref.as_str())
        .bind(employer_org.as_str())
        .bind(income_basis_date)
        .bind(first_absence_date)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map(|entity| entity.map(Into::into))
            .map_err(map_store_error)
    }

    async fn find_for_case(
        &self,
        case_ref: &CaseRef,
    ) -> Result<Vec<IncomeStatementRequest>, StoreError> {
        let timer = QueryTimer::new("find_requests_for_case");
        let result = sqlx::query_as::<_, RequestEntity>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM requests
            WHERE case_ref = $1
            ORDER BY id
            "#
        ))
        .bind(case_ref.as_str())
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
            .map(|entities| entities.into_iter().map(Into::into).collect())
            .map_err(map_store_error)
    }

    async fn find_open_for_case(
        &self,
        case_ref: &CaseRef,
        employer_org: &OrganizationNumber,
    ) -> Result<Option<IncomeStatementRequest>, StoreError> {
        let timer = QueryTimer::new("find_open_request_for_case");
        let result = sqlx::query_as::<_, RequestEntity>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM requests
            WHERE case_ref = $1
              AND employer_org = $2
              AND status = 'under_processing'
            "#
        ))
        .bind(case_ref.as_str())
        .bind(employer_org.as_str())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map(|entity| entity.map(Into::into))
            .map_err(map_store_error)
    }

    async fn set_notification_case_id(
        &self,
        uuid: Uuid,
        case_id: &str,
    ) -> Result<(), StoreError> {
        let timer = QueryTimer::new("set_notification_case_id");
        let result = sqlx::query(
            "UPDATE requests SET notification_case_id = $2, updated_at = NOW() WHERE uuid = $1",
        )
        .bind(uuid)
        .bind(case_id)
        .execute(&self.pool)
        .await;
        timer.record();
        result
            .and_then(Self::require_row)
            .map_err(map_store_error)
    }

    async fn set_notification_task_id(
        &self,
        uuid: Uuid,
        task_id: &str,
    ) -> Result<(), StoreError> {
        let timer = QueryTimer::new("set_notification_task_id");
        let result = sqlx::query(
            "UPDATE requests SET notification_task_id = $2, updated_at = NOW() WHERE uuid = $1",
        )
        .bind(uuid)
        .bind(task_id)
        .execute(&self.pool)
        .await;
        timer.record();
        result
            .and_then(Self::require_row)
            .map_err(map_store_error)
    }

    async fn set_dialog_id(&self, uuid: Uuid, dialog_id: Uuid) -> Result<(), StoreError> {
        let timer = QueryTimer::new("set_dialog_id");
        let result =
            sqlx::query("UPDATE requests SET dialog_id = $2, updated_at = NOW() WHERE uuid = $1")
                .bind(uuid)
                .bind(dialog_id)
                .execute(&self.pool)
                .await;
        timer.record();
        result
            .and_then(Self::require_row)
            .map_err(map_store_error)
    }

    async fn set_status(&self, uuid: Uuid, status: RequestStatus) -> Result<(), StoreError> {
        let timer = QueryTimer::new("set_request_status");
        let result =
            sqlx::query("UPDATE requests SET status = $2, updated_at = NOW() WHERE uuid = $1")
                .bind(uuid)
                .bind(RequestStatusDb::from(status))
                .execute(&self.pool)
                .await;
        timer.record();
        result
            .and_then(Self::require_row)
            .map_err(map_store_error)
    }

    async fn set_first_absence_date(
        &self,
        uuid: Uuid,
        first_absence_date: NaiveDate,
    ) -> Result<(), StoreError> {
        let timer = QueryTimer::new("set_first_absence_date");
        let result = sqlx::query(
            "UPDATE requests SET first_absence_date = $2, updated_at = NOW() WHERE uuid = $1",
        )
        .bind(uuid)
        .bind(first_absence_date)
        .execute(&self.pool)
        .await;
        timer.record();
        result
            .and_then(Self::require_row)
            .map_err(map_store_error)
    }
}
