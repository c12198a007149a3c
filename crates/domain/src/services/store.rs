//! Request store contract and in-memory implementation.
//!
//! The lifecycle manager only sees this trait; the sqlx-backed repository
//! lives in the persistence crate. The in-memory store backs unit tests and
//! local development.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use shared::ident::{CaseRef, OrganizationNumber};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::request::{IncomeStatementRequest, NewRequest, RequestStatus};

/// Persistence contract for request entities.
///
/// Every mutating call is one atomic store operation; a lifecycle operation
/// strings several together and compensates explicitly when an external call
/// in between fails.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Inserts a new request in `UnderProcessing`.
    ///
    /// Returns [`StoreError::Duplicate`] when a system-ordered request with
    /// the same (case ref, employer, income basis date, first absence date)
    /// already exists.
    async fn insert(&self, new: NewRequest) -> Result<IncomeStatementRequest, StoreError>;

    /// Removes a request row. Only used to roll back a creation whose
    /// external side effects failed.
    async fn remove(&self, uuid: Uuid) -> Result<(), StoreError>;

    async fn find_by_uuid(&self, uuid: Uuid)
        -> Result<Option<IncomeStatementRequest>, StoreError>;

    /// The request matching the exact dedup tuple, any status.
    async fn find_matching(
        &self,
        case_ref: &CaseRef,
        employer_org: &OrganizationNumber,
        income_basis_date: NaiveDate,
        first_absence_date: NaiveDate,
    ) -> Result<Option<IncomeStatementRequest>, StoreError>;

    /// All requests for a benefit case, regardless of employer or status.
    async fn find_for_case(
        &self,
        case_ref: &CaseRef,
    ) -> Result<Vec<IncomeStatementRequest>, StoreError>;

    /// The open (`UnderProcessing`) request for a case and employer, if any.
    async fn find_open_for_case(
        &self,
        case_ref: &CaseRef,
        employer_org: &OrganizationNumber,
    ) -> Result<Option<IncomeStatementRequest>, StoreError>;

    async fn set_notification_case_id(&self, uuid: Uuid, case_id: &str)
        -> Result<(), StoreError>;

    async fn set_notification_task_id(&self, uuid: Uuid, task_id: &str)
        -> Result<(), StoreError>;

    async fn set_dialog_id(&self, uuid: Uuid, dialog_id: Uuid) -> Result<(), StoreError>;

    async fn set_status(&self, uuid: Uuid, status: RequestStatus) -> Result<(), StoreError>;

    /// Updates the first absence date. Only the employer-initiated new-hire
    /// resubmission path may call this.
    async fn set_first_absence_date(
        &self,
        uuid: Uuid,
        first_absence_date: NaiveDate,
    ) -> Result<(), StoreError>;
}

#[derive(Default)]
struct InMemoryState {
    rows: Vec<IncomeStatementRequest>,
    next_id: i64,
}

/// In-memory request store for development and testing.
#[derive(Default)]
pub struct InMemoryRequestStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rows, for assertions.
    pub fn rows(&self) -> Vec<IncomeStatementRequest> {
        self.state.lock().unwrap().rows.clone()
    }

    fn update<F>(&self, uuid: Uuid, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut IncomeStatementRequest),
    {
        let mut state = self.state.lock().unwrap();
        let row = state
            .rows
            .iter_mut()
            .find(|row| row.uuid == uuid)
            .ok_or(StoreError::NotFound)?;
        apply(row);
        row.updated_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, new: NewRequest) -> Result<IncomeStatementRequest, StoreError> {
        let mut state = self.state.lock().unwrap();
        if let (Some(case_ref), Some(basis_date)) = (&new.case_ref, new.income_basis_date) {
            let duplicate = state.rows.iter().any(|row| {
                row.case_ref.as_ref() == Some(case_ref)
                    && row.employer_org == new.employer_org
                    && row.income_basis_date == Some(basis_date)
                    && row.first_absence_date == new.first_absence_date
            });
            if duplicate {
                return Err(StoreError::Duplicate);
            }
        }
        state.next_id += 1;
        let row = IncomeStatementRequest {
            id: state.next_id,
            uuid: Uuid::new_v4(),
            status: RequestStatus::UnderProcessing,
            kind: new.kind,
            benefit_type: new.benefit_type,
            employer_org: new.employer_org,
            actor_id: new.actor_id,
            case_ref: new.case_ref,
            income_basis_date: new.income_basis_date,
            first_absence_date: new.first_absence_date,
            notification_case_id: None,
            notification_task_id: None,
            dialog_id: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        state.rows.push(row.clone());
        Ok(row)
    }

    async fn remove(&self, uuid: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let before = state.rows.len();
        state.rows.retain(|row| row.uuid != uuid);
        if state.rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_by_uuid(
        &self,
        uuid: Uuid,
    ) -> Result<Option<IncomeStatementRequest>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.rows.iter().find(|row| row.uuid == uuid).cloned())
    }

    async fn find_matching(
        &self,
        case_ref: &CaseRef,
        employer_org: &OrganizationNumber,
        income_basis_date: NaiveDate,
        first_absence_date: NaiveDate,
    ) -> Result<Option<IncomeStatementRequest>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .rows
            .iter()
            .find(|row| {
                row.case_ref.as_ref() == Some(case_ref)
                    && row.employer_org == *employer_org
                    && row.income_basis_date == Some(income_basis_date)
                    && row.first_absence_date == first_absence_date
            })
            .cloned())
    }

    async fn find_for_case(
        &self,
        case_ref: &CaseRef,
    ) -> Result<Vec<IncomeStatementRequest>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .rows
            .iter()
            .filter(|row| row.case_ref.as_ref() == Some(case_ref))
            .cloned()
            .collect())
    }

    async fn find_open_for_case(
        &self,
        case_ref: &CaseRef,
        employer_org: &OrganizationNumber,
    ) -> Result<Option<IncomeStatementRequest>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .rows
            .iter()
            .find(|row| {
                row.case_ref.as_ref() == Some(case_ref)
                    && row.employer_org == *employer_org
                    && row.status == RequestStatus::UnderProcessing
            })
            .cloned())
    }

    async fn set_notification_case_id(
        &self,
        uuid: Uuid,
        case_id: &str,
    ) -> Result<(), StoreError> {
        self.update(uuid, |row| {
            row.notification_case_id = Some(case_id.to_string());
        })
    }

    async fn set_notification_task_id(
        &self,
        uuid: Uuid,
        task_id: &str,
    ) -> Result<(), StoreError> {
        self.update(uuid, |row| {
            row.notification_task_id = Some(task_id.to_string());
        })
    }

    async fn set_dialog_id(&self, uuid: Uuid, dialog_id: Uuid) -> Result<(), StoreError> {
        self.update(uuid, |row| {
            row.dialog_id = Some(dialog_id);
        })
    }

    async fn set_status(&self, uuid: Uuid, status: RequestStatus) -> Result<(), StoreError> {
        self.update(uuid, |row| {
            row.status = status;
        })
    }

    async fn set_first_absence_date(
        &self,
        uuid: Uuid,
        first_absence_date: NaiveDate,
    ) -> Result<(), StoreError> {
        self.update(uuid, |row| {
            row.first_absence_date = first_absence_date;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use shared::ident::ActorId;

    use crate::models::request::BenefitType;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn system_ordered(case_ref: &str, basis_day: u32) -> NewRequest {
        NewRequest::system_ordered(
            BenefitType::ParentalBenefit,
            ActorId::parse("9999999999999").unwrap(),
            OrganizationNumber::parse("111111111").unwrap(),
            CaseRef::parse(case_ref).unwrap(),
            date(2024, 10, basis_day),
            date(2024, 10, 15),
        )
    }

    #[tokio::test]
    async fn test_insert_assigns_identity_and_initial_status() {
        let store = InMemoryRequestStore::new();
        let row = store.insert(system_ordered("SAK001", 1)).await.unwrap();
        assert_eq!(row.status, RequestStatus::UnderProcessing);
        assert_eq!(row.id, 1);
        assert!(row.notification_case_id.is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_tuple() {
        let store = InMemoryRequestStore::new();
        store.insert(system_ordered("SAK001", 1)).await.unwrap();
        let err = store.insert(system_ordered("SAK001", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));

        // A different income basis date is a different request.
        assert!(store.insert(system_ordered("SAK001", 2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_find_matching_and_open_lookup() {
        let store = InMemoryRequestStore::new();
        let row = store.insert(system_ordered("SAK001", 1)).await.unwrap();

        let case_ref = CaseRef::parse("SAK001").unwrap();
        let org = OrganizationNumber::parse("111111111").unwrap();

        let found = store
            .find_matching(&case_ref, &org, date(2024, 10, 1), date(2024, 10, 15))
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.uuid), Some(row.uuid));

        let open = store.find_open_for_case(&case_ref, &org).await.unwrap();
        assert_eq!(open.map(|r| r.uuid), Some(row.uuid));

        store
            .set_status(row.uuid, RequestStatus::Done)
            .await
            .unwrap();
        assert!(store
            .find_open_for_case(&case_ref, &org)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_deletes_the_row() {
        let store = InMemoryRequestStore::new();
        let row = store.insert(system_ordered("SAK001", 1)).await.unwrap();
        store.remove(row.uuid).await.unwrap();
        assert!(store.find_by_uuid(row.uuid).await.unwrap().is_none());
        assert!(matches!(
            store.remove(row.uuid).await.unwrap_err(),
            StoreError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_mutators_touch_updated_at() {
        let store = InMemoryRequestStore::new();
        let row = store.insert(system_ordered("SAK001", 1)).await.unwrap();
        assert!(row.updated_at.is_none());

        store
            .set_notification_case_id(row.uuid, "case-1")
            .await
            .unwrap();
        let row = store.find_by_uuid(row.uuid).await.unwrap().unwrap();
        assert_eq!(row.notification_case_id.as_deref(), Some("case-1"));
        assert!(row.updated_at.is_some());
    }
}
