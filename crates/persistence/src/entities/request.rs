//! Request entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{BenefitType, IncomeStatementRequest, RequestKind, RequestStatus};
use shared::ident::{ActorId, CaseRef, OrganizationNumber};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
pub enum RequestStatusDb {
    UnderProcessing,
    Done,
    Expired,
}

impl From<RequestStatus> for RequestStatusDb {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::UnderProcessing => RequestStatusDb::UnderProcessing,
            RequestStatus::Done => RequestStatusDb::Done,
            RequestStatus::Expired => RequestStatusDb::Expired,
        }
    }
}

impl From<RequestStatusDb> for RequestStatus {
    fn from(status: RequestStatusDb) -> Self {
        match status {
            RequestStatusDb::UnderProcessing => RequestStatus::UnderProcessing,
            RequestStatusDb::Done => RequestStatus::Done,
            RequestStatusDb::Expired => RequestStatus::Expired,
        }
    }
}

/// Database enum for request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "request_kind", rename_all = "snake_case")]
pub enum RequestKindDb {
    SystemOrdered,
    EmployerInitiatedNewHire,
    EmployerInitiatedUnregistered,
}

impl From<RequestKind> for RequestKindDb {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::SystemOrdered => RequestKindDb::SystemOrdered,
            RequestKind::EmployerInitiatedNewHire => RequestKindDb::EmployerInitiatedNewHire,
            RequestKind::EmployerInitiatedUnregistered => {
                RequestKindDb::EmployerInitiatedUnregistered
            }
        }
    }
}

impl From<RequestKindDb> for RequestKind {
    fn from(kind: RequestKindDb) -> Self {
        match kind {
            RequestKindDb::SystemOrdered => RequestKind::SystemOrdered,
            RequestKindDb::EmployerInitiatedNewHire => RequestKind::EmployerInitiatedNewHire,
            RequestKindDb::EmployerInitiatedUnregistered => {
                RequestKind::EmployerInitiatedUnregistered
            }
        }
    }
}

/// Database enum for benefit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "benefit_type", rename_all = "snake_case")]
pub enum BenefitTypeDb {
    ParentalBenefit,
    PregnancyBenefit,
}

impl From<BenefitType> for BenefitTypeDb {
    fn from(benefit_type: BenefitType) -> Self {
        match benefit_type {
            BenefitType::ParentalBenefit => BenefitTypeDb::ParentalBenefit,
            BenefitType::PregnancyBenefit => BenefitTypeDb::PregnancyBenefit,
        }
    }
}

impl From<BenefitTypeDb> for BenefitType {
    fn from(benefit_type: BenefitTypeDb) -> Self {
        match benefit_type {
            BenefitTypeDb::ParentalBenefit => BenefitType::ParentalBenefit,
            BenefitTypeDb::PregnancyBenefit => BenefitType::PregnancyBenefit,
        }
    }
}

/// Database row mapping for the requests table.
#[derive(Debug, Clone, FromRow)]
pub struct RequestEntity {
    pub id: i64,
    pub uuid: Uuid,
    pub status: RequestStatusDb,
    pub kind: RequestKindDb,
    pub benefit_type: BenefitTypeDb,
    pub employer_org: String,
    pub actor_id: String,
    pub case_ref: Option<String>,
    pub income_basis_date: Option<NaiveDate>,
    pub first_absence_date: NaiveDate,
    pub notification_case_id: Option<String>,
    pub notification_task_id: Option<String>,
    pub dialog_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<RequestEntity> for IncomeStatementRequest {
    fn from(entity: RequestEntity) -> Self {
        IncomeStatementRequest {
            id: entity.id,
            uuid: entity.uuid,
            status: entity.status.into(),
            kind: entity.kind.into(),
            benefit_type: entity.benefit_type.into(),
            employer_org: OrganizationNumber::new_unchecked(entity.employer_org),
            actor_id: ActorId::new_unchecked(entity.actor_id),
            case_ref: entity.case_ref.map(CaseRef::new_unchecked),
            income_basis_date: entity.income_basis_date,
            first_absence_date: entity.first_absence_date,
            notification_case_id: entity.notification_case_id,
            notification_task_id: entity.notification_task_id,
            dialog_id: entity.dialog_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_entity_to_domain() {
        let entity = RequestEntity {
            id: 7,
            uuid: Uuid::new_v4(),
            status: RequestStatusDb::UnderProcessing,
            kind: RequestKindDb::SystemOrdered,
            benefit_type: BenefitTypeDb::ParentalBenefit,
            employer_org: "111111111".to_string(),
            actor_id: "9999999999999".to_string(),
            case_ref: Some("SAK001".to_string()),
            income_basis_date: NaiveDate::from_ymd_opt(2024, 10, 1),
            first_absence_date: NaiveDate::from_ymd_opt(2024, 10, 15).unwrap(),
            notification_case_id: Some("case-1".to_string()),
            notification_task_id: None,
            dialog_id: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        let request: IncomeStatementRequest = entity.clone().into();
        assert_eq!(request.id, 7);
        assert_eq!(request.status, RequestStatus::UnderProcessing);
        assert_eq!(request.kind, RequestKind::SystemOrdered);
        assert_eq!(request.employer_org.as_str(), "111111111");
        assert_eq!(request.case_ref.unwrap().as_str(), "SAK001");
        assert_eq!(request.income_basis_date, entity.income_basis_date);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            RequestStatus::UnderProcessing,
            RequestStatus::Done,
            RequestStatus::Expired,
        ] {
            let db: RequestStatusDb = status.into();
            let back: RequestStatus = db.into();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            RequestKind::SystemOrdered,
            RequestKind::EmployerInitiatedNewHire,
            RequestKind::EmployerInitiatedUnregistered,
        ] {
            let db: RequestKindDb = kind.into();
            let back: RequestKind = db.into();
            assert_eq!(back, kind);
        }
    }
}
