//! Statement intake.
//!
//! Routes an accepted statement submission into the request lifecycle:
//! first submissions finalize the request, resubmissions update the portals
//! without touching status, and employer-initiated submissions may have to
//! create their request on the spot.

use std::sync::Arc;

use chrono::NaiveDate;
use shared::ident::{ActorId, OrganizationNumber};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::request::{
    BenefitType, ClosureReason, IncomeStatementRequest, NewRequest, RequestStatus,
};
use crate::services::case_lookup::{validate_unregistered_submission, BenefitCaseLookup};
use crate::services::lifecycle::RequestLifecycleService;

/// An accepted statement submission from the employer form.
#[derive(Debug, Clone)]
pub struct StatementSubmission {
    /// Absent when an employer-initiated submission arrives before any
    /// request exists.
    pub request_uuid: Option<Uuid>,
    pub actor_id: ActorId,
    pub employer_org: OrganizationNumber,
    pub benefit_type: BenefitType,
    pub first_absence_date: NaiveDate,
    /// Reference to the stored filing, when one exists. Statements arriving
    /// through payroll systems have none.
    pub statement_ref: Option<Uuid>,
}

/// Why the employer opened a statement themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployerInitiatedReason {
    NewHire,
    Unregistered,
}

/// Receives accepted statements and drives the lifecycle accordingly.
pub struct StatementIntakeService {
    lifecycle: Arc<RequestLifecycleService>,
    case_lookup: Arc<dyn BenefitCaseLookup>,
}

impl StatementIntakeService {
    pub fn new(
        lifecycle: Arc<RequestLifecycleService>,
        case_lookup: Arc<dyn BenefitCaseLookup>,
    ) -> Self {
        Self {
            lifecycle,
            case_lookup,
        }
    }

    /// A statement submitted against an ordered request.
    pub async fn receive_statement(
        &self,
        submission: StatementSubmission,
    ) -> Result<IncomeStatementRequest, DomainError> {
        let request_uuid = submission.request_uuid.ok_or_else(|| {
            DomainError::invariant(
                "REQUEST_NOT_FOUND",
                "statement submitted without a request reference",
            )
        })?;
        let request = self.find_required(request_uuid).await?;

        match request.status {
            RequestStatus::Expired => Err(DomainError::functional(
                "REQUEST_EXPIRED",
                "expired requests accept no new income statements",
            )),
            RequestStatus::Done => {
                self.lifecycle
                    .update_after_resubmission(&request, submission.statement_ref)
                    .await?;
                Ok(request)
            }
            RequestStatus::UnderProcessing => {
                self.lifecycle
                    .finalize(
                        request_uuid,
                        &submission.actor_id,
                        &submission.employer_org,
                        submission.first_absence_date,
                        ClosureReason::OrdinarySubmission,
                        submission.statement_ref,
                    )
                    .await
            }
        }
    }

    /// A statement the employer opened themselves.
    ///
    /// Without an existing request one is created first and finalized right
    /// away; the employer is already submitting, so there is nothing left to
    /// ask for. For the unregistered kind the income basis date comes from
    /// the benefit case itself.
    pub async fn receive_employer_initiated(
        &self,
        submission: StatementSubmission,
        reason: EmployerInitiatedReason,
        today: NaiveDate,
    ) -> Result<IncomeStatementRequest, DomainError> {
        if let Some(request_uuid) = submission.request_uuid {
            let request = self.find_required(request_uuid).await?;
            if reason == EmployerInitiatedReason::NewHire
                && submission.first_absence_date != request.first_absence_date
            {
                self.lifecycle
                    .update_first_absence_date(request.uuid, submission.first_absence_date)
                    .await?;
            }
            let request = self.find_required(request_uuid).await?;
            self.lifecycle
                .update_after_resubmission(&request, submission.statement_ref)
                .await?;
            return Ok(request);
        }

        let new = match reason {
            EmployerInitiatedReason::NewHire => NewRequest::employer_initiated_new_hire(
                submission.benefit_type,
                submission.actor_id.clone(),
                submission.employer_org.clone(),
                submission.first_absence_date,
            ),
            EmployerInitiatedReason::Unregistered => {
                let info = self
                    .case_lookup
                    .fetch_case_info(&submission.actor_id, submission.benefit_type)
                    .await?;
                validate_unregistered_submission(
                    &info,
                    submission.benefit_type,
                    &submission.actor_id,
                    today,
                )?;
                let income_basis_date = info.income_basis_date.ok_or_else(|| {
                    DomainError::invariant(
                        "MISSING_BASIS_DATE",
                        "open benefit case carries no income basis date",
                    )
                })?;
                NewRequest::employer_initiated_unregistered(
                    submission.benefit_type,
                    submission.actor_id.clone(),
                    submission.employer_org.clone(),
                    income_basis_date,
                    submission.first_absence_date,
                )
            }
        };

        let request = self.lifecycle.create_employer_initiated(new).await?;
        self.lifecycle
            .finalize(
                request.uuid,
                &submission.actor_id,
                &submission.employer_org,
                submission.first_absence_date,
                ClosureReason::OrdinarySubmission,
                submission.statement_ref,
            )
            .await
    }

    async fn find_required(
        &self,
        request_uuid: Uuid,
    ) -> Result<IncomeStatementRequest, DomainError> {
        self.lifecycle.find_request(request_uuid).await?.ok_or_else(|| {
            DomainError::invariant(
                "REQUEST_NOT_FOUND",
                format!("no request found for statement, uuid {request_uuid}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use shared::ident::CaseRef;

    use crate::error::IntegrationError;
    use crate::models::request::RequestKind;
    use crate::services::case_lookup::{BenefitCaseStatus, CaseInfo};
    use crate::services::lifecycle::LifecycleConfig;
    use crate::services::notification::{MockDialogService, MockEmployerNotificationService};
    use crate::services::store::InMemoryRequestStore;

    struct FakeCaseLookup {
        info: CaseInfo,
    }

    #[async_trait]
    impl BenefitCaseLookup for FakeCaseLookup {
        async fn fetch_case_info(
            &self,
            _actor_id: &ActorId,
            _benefit_type: BenefitType,
        ) -> Result<CaseInfo, IntegrationError> {
            Ok(self.info.clone())
        }
    }

    struct Harness {
        store: Arc<InMemoryRequestStore>,
        lifecycle: Arc<RequestLifecycleService>,
        intake: StatementIntakeService,
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn harness_with_case(info: CaseInfo) -> Harness {
        let store = Arc::new(InMemoryRequestStore::new());
        let lifecycle = Arc::new(RequestLifecycleService::new(
            store.clone(),
            Arc::new(MockEmployerNotificationService::new()),
            Arc::new(MockDialogService::new()),
            LifecycleConfig {
                statement_form_url: "https://forms.example/statement".to_string(),
                production: false,
                dialog_enabled: false,
            },
        ));
        let intake = StatementIntakeService::new(
            lifecycle.clone(),
            Arc::new(FakeCaseLookup { info }),
        );
        Harness {
            store,
            lifecycle,
            intake,
        }
    }

    fn harness() -> Harness {
        harness_with_case(CaseInfo {
            status: BenefitCaseStatus::OpenForProcessing,
            first_absence_date: Some(date(2024, 10, 15)),
            income_basis_date: Some(date(2024, 10, 1)),
        })
    }

    fn actor() -> ActorId {
        ActorId::parse("9999999999999").unwrap()
    }

    fn org() -> OrganizationNumber {
        OrganizationNumber::parse("111111111").unwrap()
    }

    fn submission(request_uuid: Option<Uuid>) -> StatementSubmission {
        StatementSubmission {
            request_uuid,
            actor_id: actor(),
            employer_org: org(),
            benefit_type: BenefitType::ParentalBenefit,
            first_absence_date: date(2024, 10, 15),
            statement_ref: Some(Uuid::new_v4()),
        }
    }

    async fn seed_ordered_request(harness: &Harness) -> IncomeStatementRequest {
        harness
            .lifecycle
            .create_on_demand(
                date(2024, 10, 1),
                BenefitType::ParentalBenefit,
                actor(),
                org(),
                CaseRef::parse("SAK001").unwrap(),
                date(2024, 10, 15),
            )
            .await
            .unwrap();
        harness.store.rows().pop().unwrap()
    }

    #[tokio::test]
    async fn test_first_submission_finalizes_the_request() {
        let harness = harness();
        let request = seed_ordered_request(&harness).await;

        let result = harness
            .intake
            .receive_statement(submission(Some(request.uuid)))
            .await
            .unwrap();

        assert_eq!(result.status, RequestStatus::Done);
    }

    #[tokio::test]
    async fn test_resubmission_keeps_status_done() {
        let harness = harness();
        let request = seed_ordered_request(&harness).await;
        harness
            .intake
            .receive_statement(submission(Some(request.uuid)))
            .await
            .unwrap();

        let result = harness
            .intake
            .receive_statement(submission(Some(request.uuid)))
            .await
            .unwrap();

        assert_eq!(result.status, RequestStatus::Done);
    }

    #[tokio::test]
    async fn test_expired_request_rejects_new_statements() {
        let harness = harness();
        let request = seed_ordered_request(&harness).await;
        let stored = harness.store.rows().pop().unwrap();
        harness
            .lifecycle
            .expire(&stored, crate::services::lifecycle::ExpiryNotice::Notify)
            .await
            .unwrap();

        let err = harness
            .intake
            .receive_statement(submission(Some(request.uuid)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Functional { code, .. } if code == "REQUEST_EXPIRED"));
    }

    #[tokio::test]
    async fn test_unknown_request_is_an_invariant_error() {
        let harness = harness();
        let err = harness
            .intake
            .receive_statement(submission(Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Invariant { code, .. } if code == "REQUEST_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_unregistered_submission_creates_and_finalizes() {
        let harness = harness();

        let result = harness
            .intake
            .receive_employer_initiated(
                submission(None),
                EmployerInitiatedReason::Unregistered,
                date(2024, 10, 10),
            )
            .await
            .unwrap();

        assert_eq!(result.kind, RequestKind::EmployerInitiatedUnregistered);
        assert_eq!(result.status, RequestStatus::Done);
        assert_eq!(result.income_basis_date, Some(date(2024, 10, 1)));
        assert!(result.notification_task_id.is_none());
    }

    #[tokio::test]
    async fn test_unregistered_submission_too_early_creates_nothing() {
        let harness = harness_with_case(CaseInfo {
            status: BenefitCaseStatus::AppliedTooEarly,
            first_absence_date: None,
            income_basis_date: None,
        });

        let err = harness
            .intake
            .receive_employer_initiated(
                submission(None),
                EmployerInitiatedReason::Unregistered,
                date(2024, 10, 10),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Functional { code, .. } if code == "SUBMITTED_TOO_EARLY"));
        assert!(harness.store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_new_hire_submission_creates_without_basis_date() {
        let harness = harness();

        let result = harness
            .intake
            .receive_employer_initiated(
                submission(None),
                EmployerInitiatedReason::NewHire,
                date(2024, 10, 10),
            )
            .await
            .unwrap();

        assert_eq!(result.kind, RequestKind::EmployerInitiatedNewHire);
        assert_eq!(result.income_basis_date, None);
        assert_eq!(result.status, RequestStatus::Done);
    }

    #[tokio::test]
    async fn test_new_hire_resubmission_moves_first_absence_date() {
        let harness = harness();
        let first = harness
            .intake
            .receive_employer_initiated(
                submission(None),
                EmployerInitiatedReason::NewHire,
                date(2024, 10, 10),
            )
            .await
            .unwrap();

        let mut resubmission = submission(Some(first.uuid));
        resubmission.first_absence_date = date(2024, 11, 1);
        let updated = harness
            .intake
            .receive_employer_initiated(
                resubmission,
                EmployerInitiatedReason::NewHire,
                date(2024, 10, 20),
            )
            .await
            .unwrap();

        assert_eq!(updated.first_absence_date, date(2024, 11, 1));
        assert_eq!(updated.status, RequestStatus::Done);
    }
}
