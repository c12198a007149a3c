//! Income statement request entity model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::ident::{ActorId, CaseRef, OrganizationNumber};
use uuid::Uuid;

/// Lifecycle status of a request.
///
/// `Done` and `Expired` are terminal with respect to status transitions;
/// a `Done` request may still receive newer statement submissions without
/// changing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    UnderProcessing,
    Done,
    Expired,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::UnderProcessing => write!(f, "under_processing"),
            RequestStatus::Done => write!(f, "done"),
            RequestStatus::Expired => write!(f, "expired"),
        }
    }
}

/// How the request came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Ordered by the benefit case system.
    SystemOrdered,
    /// Opened by the employer for a newly hired employee.
    EmployerInitiatedNewHire,
    /// Opened by the employer for an employment not yet registered upstream.
    EmployerInitiatedUnregistered,
}

impl RequestKind {
    pub fn is_employer_initiated(&self) -> bool {
        matches!(
            self,
            RequestKind::EmployerInitiatedNewHire | RequestKind::EmployerInitiatedUnregistered
        )
    }

    /// Employer-initiated requests have no to-do task in the notification
    /// system; the employer is already in the submission flow.
    pub fn requires_task(&self) -> bool {
        matches!(self, RequestKind::SystemOrdered)
    }
}

/// Benefit the income statement supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitType {
    ParentalBenefit,
    PregnancyBenefit,
}

impl BenefitType {
    pub fn display_name(&self) -> &'static str {
        match self {
            BenefitType::ParentalBenefit => "parental benefit",
            BenefitType::PregnancyBenefit => "pregnancy benefit",
        }
    }
}

impl std::fmt::Display for BenefitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Why a request is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureReason {
    /// Statement submitted through this application.
    OrdinarySubmission,
    /// Statement submitted through a payroll or HR system.
    ExternalSubmission,
    /// The statement is no longer needed.
    Expired,
}

/// A tracked ask for one employer income statement tied to one benefit case.
///
/// Identity facts (employer, actor, benefit type, kind) and the income basis
/// date never change after creation; the store only mutates status, external
/// ids and the first absence date (new-hire resubmission only).
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeStatementRequest {
    pub id: i64,
    pub uuid: Uuid,
    pub status: RequestStatus,
    pub kind: RequestKind,
    pub benefit_type: BenefitType,
    pub employer_org: OrganizationNumber,
    pub actor_id: ActorId,
    /// Benefit case reference; present only for system-ordered requests.
    pub case_ref: Option<CaseRef>,
    /// Reference date for the income lookback window. Absent for the
    /// employer-initiated new-hire kind.
    pub income_basis_date: Option<NaiveDate>,
    pub first_absence_date: NaiveDate,
    pub notification_case_id: Option<String>,
    /// Absent for employer-initiated requests, which have no task.
    pub notification_task_id: Option<String>,
    pub dialog_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IncomeStatementRequest {
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::UnderProcessing
    }

    pub fn requires_task(&self) -> bool {
        self.kind.requires_task()
    }
}

/// Facts for a request about to be created.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub kind: RequestKind,
    pub benefit_type: BenefitType,
    pub employer_org: OrganizationNumber,
    pub actor_id: ActorId,
    pub case_ref: Option<CaseRef>,
    pub income_basis_date: Option<NaiveDate>,
    pub first_absence_date: NaiveDate,
}

impl NewRequest {
    pub fn system_ordered(
        benefit_type: BenefitType,
        actor_id: ActorId,
        employer_org: OrganizationNumber,
        case_ref: CaseRef,
        income_basis_date: NaiveDate,
        first_absence_date: NaiveDate,
    ) -> Self {
        Self {
            kind: RequestKind::SystemOrdered,
            benefit_type,
            employer_org,
            actor_id,
            case_ref: Some(case_ref),
            income_basis_date: Some(income_basis_date),
            first_absence_date,
        }
    }

    pub fn employer_initiated_new_hire(
        benefit_type: BenefitType,
        actor_id: ActorId,
        employer_org: OrganizationNumber,
        first_absence_date: NaiveDate,
    ) -> Self {
        Self {
            kind: RequestKind::EmployerInitiatedNewHire,
            benefit_type,
            employer_org,
            actor_id,
            case_ref: None,
            income_basis_date: None,
            first_absence_date,
        }
    }

    pub fn employer_initiated_unregistered(
        benefit_type: BenefitType,
        actor_id: ActorId,
        employer_org: OrganizationNumber,
        income_basis_date: NaiveDate,
        first_absence_date: NaiveDate,
    ) -> Self {
        Self {
            kind: RequestKind::EmployerInitiatedUnregistered,
            benefit_type,
            employer_org,
            actor_id,
            case_ref: None,
            income_basis_date: Some(income_basis_date),
            first_absence_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_system_ordered_requires_task() {
        assert!(RequestKind::SystemOrdered.requires_task());
        assert!(!RequestKind::EmployerInitiatedNewHire.requires_task());
        assert!(!RequestKind::EmployerInitiatedUnregistered.requires_task());
    }

    #[test]
    fn test_employer_initiated_kinds() {
        assert!(!RequestKind::SystemOrdered.is_employer_initiated());
        assert!(RequestKind::EmployerInitiatedNewHire.is_employer_initiated());
        assert!(RequestKind::EmployerInitiatedUnregistered.is_employer_initiated());
    }

    #[test]
    fn test_new_hire_request_has_no_income_basis_date() {
        let new = NewRequest::employer_initiated_new_hire(
            BenefitType::ParentalBenefit,
            ActorId::parse("9999999999999").unwrap(),
            OrganizationNumber::parse("111111111").unwrap(),
            NaiveDate::from_ymd_opt(2024, 10, 15).unwrap(),
        );
        assert_eq!(new.income_basis_date, None);
        assert_eq!(new.case_ref, None);
    }

    #[test]
    fn test_system_ordered_request_sets_case_ref_and_basis_date() {
        let basis = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let new = NewRequest::system_ordered(
            BenefitType::PregnancyBenefit,
            ActorId::parse("9999999999999").unwrap(),
            OrganizationNumber::parse("111111111").unwrap(),
            CaseRef::parse("SAK001").unwrap(),
            basis,
            NaiveDate::from_ymd_opt(2024, 10, 15).unwrap(),
        );
        assert_eq!(new.income_basis_date, Some(basis));
        assert!(new.case_ref.is_some());
    }
}
