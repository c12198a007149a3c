//! Request lifecycle orchestration.
//!
//! Handles every change to a request and keeps the internal store in step
//! with the employer notification and dialog systems. Each operation is one
//! sequential unit of work; external calls sit outside the store mutation
//! and the only compensation is the case/task pair in the coordinator.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use shared::ident::{ActorId, CaseRef, OrganizationNumber};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DomainError, StoreError};
use crate::models::request::{
    BenefitType, ClosureReason, IncomeStatementRequest, NewRequest, RequestStatus,
};
use crate::services::coordinator::CaseTaskCoordinator;
use crate::services::notification::{
    DialogCompletion, DialogService, EmployerNotificationService, NewCase, NewTask, ReceiptNotice,
    ReminderNotice,
};
use crate::services::store::RequestStore;
use crate::services::texts;

/// Environment-dependent settings for the lifecycle service.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Base URL of the employer-facing statement form.
    pub statement_form_url: String,
    /// Receipt notices are only sent outside production.
    pub production: bool,
    /// Whether the dialog integration is active.
    pub dialog_enabled: bool,
}

/// Result of a create-on-demand call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Result of a reminder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOutcome {
    Sent,
    NoOpenRequest,
}

/// Whether expiry is pushed to the task and case in the notification
/// system, or only reflected in the secondary text and dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryNotice {
    Notify,
    Silent,
}

/// Orchestrates all changes to a request across the internal store and the
/// external systems.
pub struct RequestLifecycleService {
    store: Arc<dyn RequestStore>,
    notifications: Arc<dyn EmployerNotificationService>,
    dialogs: Arc<dyn DialogService>,
    coordinator: CaseTaskCoordinator,
    config: LifecycleConfig,
}

impl RequestLifecycleService {
    pub fn new(
        store: Arc<dyn RequestStore>,
        notifications: Arc<dyn EmployerNotificationService>,
        dialogs: Arc<dyn DialogService>,
        config: LifecycleConfig,
    ) -> Self {
        let coordinator = CaseTaskCoordinator::new(notifications.clone());
        Self {
            store,
            notifications,
            dialogs,
            coordinator,
            config,
        }
    }

    /// Handles an incoming statement order from the benefit case system.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_on_demand(
        &self,
        income_basis_date: NaiveDate,
        benefit_type: BenefitType,
        actor_id: ActorId,
        employer_org: OrganizationNumber,
        case_ref: CaseRef,
        first_absence_date: NaiveDate,
    ) -> Result<CreateOutcome, DomainError> {
        let existing = self
            .store
            .find_matching(&case_ref, &employer_org, income_basis_date, first_absence_date)
            .await?;
        if existing.is_some() {
            info!(
                case_ref = %case_ref,
                employer_org = ?employer_org,
                %income_basis_date,
                %first_absence_date,
                "request already exists, nothing to create"
            );
            return Ok(CreateOutcome::AlreadyExists);
        }

        self.expire_superseded_requests(&case_ref, &employer_org, income_basis_date)
            .await?;

        let new = NewRequest::system_ordered(
            benefit_type,
            actor_id,
            employer_org,
            case_ref,
            income_basis_date,
            first_absence_date,
        );
        match self.create_request(new).await {
            Ok(_) => Ok(CreateOutcome::Created),
            // A concurrent caller got there first; the store's uniqueness
            // constraint turns the race into a conflict.
            Err(DomainError::Store(StoreError::Duplicate)) => Ok(CreateOutcome::AlreadyExists),
            Err(err) => Err(err),
        }
    }

    /// Creates a request opened by the employer rather than ordered by the
    /// case system. No dedup against a case reference, and no task.
    pub async fn create_employer_initiated(
        &self,
        new: NewRequest,
    ) -> Result<IncomeStatementRequest, DomainError> {
        info!(
            employer_org = ?new.employer_org,
            benefit_type = %new.benefit_type,
            kind = ?new.kind,
            "creating employer initiated request"
        );
        self.create_request(new).await
    }

    /// Marks a request done after an accepted statement.
    ///
    /// The submitter facts must match the stored request exactly; a mismatch
    /// means the upstream systems disagree about which request this is.
    pub async fn finalize(
        &self,
        request_uuid: Uuid,
        actor_id: &ActorId,
        employer_org: &OrganizationNumber,
        first_absence_date: NaiveDate,
        reason: ClosureReason,
        statement_ref: Option<Uuid>,
    ) -> Result<IncomeStatementRequest, DomainError> {
        let request = self.store.find_by_uuid(request_uuid).await?.ok_or_else(|| {
            DomainError::invariant(
                "REQUEST_NOT_FOUND",
                format!("no request found for statement, uuid {request_uuid}"),
            )
        })?;
        validate_submitter(&request, actor_id, employer_org, first_absence_date)?;

        let first_submission = request.status == RequestStatus::UnderProcessing;

        // Employer-initiated requests have no task.
        if let Some(task_id) = &request.notification_task_id {
            self.notifications.mark_task_done(task_id, Utc::now()).await?;
        }
        let employer_initiated = request.notification_task_id.is_none();
        let case_id = notification_case_id(&request)?;
        self.notifications
            .mark_case_done(case_id, employer_initiated)
            .await?;
        self.notifications
            .update_case_secondary_text(
                case_id,
                &texts::secondary_text(reason, request.first_absence_date),
            )
            .await?;

        self.store.set_status(request.uuid, RequestStatus::Done).await?;

        // Statements arriving through payroll systems have no stored filing
        // to link a receipt to.
        if !self.config.production {
            if let Some(statement_ref) = statement_ref {
                let text = if first_submission {
                    texts::receipt_first_submission_text()
                } else {
                    texts::receipt_updated_text()
                };
                self.notifications
                    .send_receipt_notice(ReceiptNotice {
                        grouping_id: request.uuid.to_string(),
                        employer_org: request.employer_org.clone(),
                        text,
                        receipt_url: self.receipt_url(statement_ref),
                    })
                    .await?;
            }
        }

        if let Some(dialog_id) = request.dialog_id {
            self.dialogs
                .complete_dialog(DialogCompletion {
                    dialog_id,
                    employer_org: employer_org.clone(),
                    title: texts::case_title(request.benefit_type),
                    benefit_type: request.benefit_type,
                    first_absence_date: request.first_absence_date,
                    statement_ref,
                    reason,
                })
                .await?;
        }

        info!(request_uuid = %request.uuid, "request finalized");
        let mut request = request;
        request.status = RequestStatus::Done;
        Ok(request)
    }

    /// Pushes an updated-statement notice for a request that is already
    /// done. Status does not change.
    pub async fn update_after_resubmission(
        &self,
        request: &IncomeStatementRequest,
        statement_ref: Option<Uuid>,
    ) -> Result<(), DomainError> {
        if !self.config.production {
            if let Some(statement_ref) = statement_ref {
                self.notifications
                    .send_receipt_notice(ReceiptNotice {
                        grouping_id: request.uuid.to_string(),
                        employer_org: request.employer_org.clone(),
                        text: texts::receipt_updated_text(),
                        receipt_url: self.receipt_url(statement_ref),
                    })
                    .await?;
            }
        }
        if let Some(dialog_id) = request.dialog_id {
            self.dialogs
                .notify_updated_statement(dialog_id, &request.employer_org, statement_ref)
                .await?;
        }
        Ok(())
    }

    /// Expires one request.
    ///
    /// [`ExpiryNotice::Notify`] also expires the task and closes the case;
    /// [`ExpiryNotice::Silent`] is used when the notification system was
    /// already updated, as in supersession.
    pub async fn expire(
        &self,
        request: &IncomeStatementRequest,
        notice: ExpiryNotice,
    ) -> Result<(), DomainError> {
        let case_id = notification_case_id(request)?;

        if notice == ExpiryNotice::Notify {
            if let Some(task_id) = &request.notification_task_id {
                self.notifications
                    .mark_task_expired(task_id, Utc::now())
                    .await?;
            }
            self.notifications.mark_case_done(case_id, false).await?;
        }

        self.notifications
            .update_case_secondary_text(
                case_id,
                &texts::secondary_text(ClosureReason::Expired, request.first_absence_date),
            )
            .await?;
        self.store
            .set_status(request.uuid, RequestStatus::Expired)
            .await?;

        if let Some(dialog_id) = request.dialog_id {
            self.dialogs
                .mark_dialog_not_applicable(dialog_id, &texts::case_title(request.benefit_type))
                .await?;
        }

        info!(
            request_uuid = %request.uuid,
            case_ref = ?request.case_ref,
            employer_org = ?request.employer_org,
            income_basis_date = ?request.income_basis_date,
            "request expired"
        );
        Ok(())
    }

    /// Expires every open request matching the filter, notifying the
    /// external systems.
    pub async fn expire_open_requests(
        &self,
        case_ref: &CaseRef,
        employer_org: Option<&OrganizationNumber>,
        income_basis_date: Option<NaiveDate>,
    ) -> Result<(), DomainError> {
        let requests = self
            .open_requests_matching(case_ref, employer_org, income_basis_date)
            .await?;
        for request in requests {
            self.expire(&request, ExpiryNotice::Notify).await?;
        }
        Ok(())
    }

    /// Closes open requests whose statement arrived through a payroll or HR
    /// system. Statements submitted through this application are already
    /// closed at intake.
    pub async fn close_on_external_submission(
        &self,
        case_ref: &CaseRef,
        employer_org: Option<&OrganizationNumber>,
        income_basis_date: Option<NaiveDate>,
    ) -> Result<(), DomainError> {
        let requests = self
            .open_requests_matching(case_ref, employer_org, income_basis_date)
            .await?;
        for request in requests {
            self.finalize(
                request.uuid,
                &request.actor_id,
                &request.employer_org,
                request.first_absence_date,
                ClosureReason::ExternalSubmission,
                None,
            )
            .await?;
        }
        Ok(())
    }

    /// Administrative deletion of a mistakenly ordered request.
    ///
    /// Requires the filter to single out exactly one open request; anything
    /// else indicates the caller and the store disagree, and nothing is
    /// touched.
    pub async fn delete(
        &self,
        case_ref: &CaseRef,
        employer_org: Option<&OrganizationNumber>,
        income_basis_date: Option<NaiveDate>,
    ) -> Result<(), DomainError> {
        let matches = self
            .open_requests_matching(case_ref, employer_org, income_basis_date)
            .await?;
        if matches.len() != 1 {
            return Err(DomainError::invariant(
                "DELETE_AMBIGUOUS",
                format!(
                    "expected exactly 1 open request to delete, found {}",
                    matches.len()
                ),
            ));
        }
        let request = &matches[0];
        let case_id = notification_case_id(request)?;
        self.notifications.delete_case(case_id).await?;
        self.store
            .set_status(request.uuid, RequestStatus::Expired)
            .await?;
        info!(request_uuid = %request.uuid, case_ref = %case_ref, "request deleted");
        Ok(())
    }

    /// Sends a caseworker-triggered reminder for the open request of a case
    /// and employer.
    pub async fn send_reminder(
        &self,
        case_ref: &CaseRef,
        employer_org: &OrganizationNumber,
    ) -> Result<ReminderOutcome, DomainError> {
        let Some(request) = self.store.find_open_for_case(case_ref, employer_org).await? else {
            return Ok(ReminderOutcome::NoOpenRequest);
        };
        self.notifications
            .send_reminder_notice(ReminderNotice {
                grouping_id: request.uuid.to_string(),
                employer_org: request.employer_org.clone(),
                notice_text: texts::reminder_notice_text(request.benefit_type),
                alert_text: texts::reminder_alert_text(
                    request.benefit_type,
                    &request.employer_org,
                ),
                form_url: self.statement_form_url(request.uuid),
            })
            .await?;
        info!(request_uuid = %request.uuid, "reminder notice sent");
        Ok(ReminderOutcome::Sent)
    }

    pub async fn find_request(
        &self,
        request_uuid: Uuid,
    ) -> Result<Option<IncomeStatementRequest>, DomainError> {
        Ok(self.store.find_by_uuid(request_uuid).await?)
    }

    /// Moves the first absence date of a new-hire request whose employer
    /// resubmitted with a different start date.
    pub async fn update_first_absence_date(
        &self,
        request_uuid: Uuid,
        first_absence_date: NaiveDate,
    ) -> Result<(), DomainError> {
        self.store
            .set_first_absence_date(request_uuid, first_absence_date)
            .await?;
        Ok(())
    }

    /// A new income basis date for the same case and employer supersedes
    /// earlier completed requests. Open requests were already closed by the
    /// case system and are left untouched.
    async fn expire_superseded_requests(
        &self,
        case_ref: &CaseRef,
        employer_org: &OrganizationNumber,
        income_basis_date: NaiveDate,
    ) -> Result<(), DomainError> {
        let requests = self.store.find_for_case(case_ref).await?;
        for request in requests {
            if request.employer_org == *employer_org
                && request.income_basis_date != Some(income_basis_date)
                && request.status == RequestStatus::Done
            {
                self.expire(&request, ExpiryNotice::Silent).await?;
            }
        }
        Ok(())
    }

    /// Inserts the request row and builds its external presence. When an
    /// external call fails the unit of work has failed; the row is taken
    /// back out before the error is surfaced.
    async fn create_request(
        &self,
        new: NewRequest,
    ) -> Result<IncomeStatementRequest, DomainError> {
        let request = self.store.insert(new).await?;
        match self.create_external_presence(&request).await {
            Ok(()) => self.store.find_by_uuid(request.uuid).await?.ok_or_else(|| {
                DomainError::invariant(
                    "REQUEST_NOT_FOUND",
                    format!("request {} vanished during creation", request.uuid),
                )
            }),
            Err(err) => {
                if let Err(remove_err) = self.store.remove(request.uuid).await {
                    warn!(
                        request_uuid = %request.uuid,
                        error = %remove_err,
                        "could not remove request after failed external creation"
                    );
                }
                Err(err)
            }
        }
    }

    async fn create_external_presence(
        &self,
        request: &IncomeStatementRequest,
    ) -> Result<(), DomainError> {
        let form_url = self.statement_form_url(request.uuid);
        let case = NewCase {
            grouping_id: request.uuid.to_string(),
            employer_org: request.employer_org.clone(),
            title: texts::case_title(request.benefit_type),
            form_url: form_url.clone(),
        };
        let secondary =
            texts::secondary_text(ClosureReason::OrdinarySubmission, request.first_absence_date);

        let handles = if request.requires_task() {
            let task = NewTask {
                grouping_id: request.uuid.to_string(),
                employer_org: request.employer_org.clone(),
                task_text: texts::task_text(request.benefit_type),
                alert_text: texts::task_alert_text(request.benefit_type, &request.employer_org),
                reminder_text: texts::task_alert_text(
                    request.benefit_type,
                    &request.employer_org,
                ),
                form_url,
            };
            self.coordinator
                .create_case_with_task(case, &secondary, task)
                .await?
        } else {
            self.coordinator.create_case(case, &secondary).await?
        };

        self.store
            .set_notification_case_id(request.uuid, &handles.case_id)
            .await?;
        if let Some(task_id) = &handles.task_id {
            self.store
                .set_notification_task_id(request.uuid, task_id)
                .await?;
        }

        if self.config.dialog_enabled {
            let dialog_id = self
                .dialogs
                .create_dialog(
                    request.uuid,
                    &request.employer_org,
                    &texts::case_title(request.benefit_type),
                    request.first_absence_date,
                    request.benefit_type,
                )
                .await?;
            self.store.set_dialog_id(request.uuid, dialog_id).await?;
        }
        Ok(())
    }

    async fn open_requests_matching(
        &self,
        case_ref: &CaseRef,
        employer_org: Option<&OrganizationNumber>,
        income_basis_date: Option<NaiveDate>,
    ) -> Result<Vec<IncomeStatementRequest>, DomainError> {
        Ok(self
            .store
            .find_for_case(case_ref)
            .await?
            .into_iter()
            .filter(|request| request.is_open())
            .filter(|request| employer_org.map_or(true, |org| request.employer_org == *org))
            .filter(|request| {
                income_basis_date.map_or(true, |date| request.income_basis_date == Some(date))
            })
            .collect())
    }

    fn statement_form_url(&self, request_uuid: Uuid) -> String {
        format!("{}/{}", self.config.statement_form_url, request_uuid)
    }

    fn receipt_url(&self, statement_ref: Uuid) -> String {
        format!("{}/receipt/{}", self.config.statement_form_url, statement_ref)
    }
}

fn validate_submitter(
    request: &IncomeStatementRequest,
    actor_id: &ActorId,
    employer_org: &OrganizationNumber,
    first_absence_date: NaiveDate,
) -> Result<(), DomainError> {
    if request.actor_id != *actor_id {
        return Err(DomainError::invariant(
            "IDENTITY_MISMATCH",
            "submitter actor id does not match the request",
        ));
    }
    if request.employer_org != *employer_org {
        return Err(DomainError::invariant(
            "IDENTITY_MISMATCH",
            "employer organization number does not match the request",
        ));
    }
    if request.first_absence_date != first_absence_date {
        return Err(DomainError::invariant(
            "IDENTITY_MISMATCH",
            "first absence date does not match the request",
        ));
    }
    Ok(())
}

fn notification_case_id(request: &IncomeStatementRequest) -> Result<&str, DomainError> {
    request.notification_case_id.as_deref().ok_or_else(|| {
        DomainError::invariant(
            "MISSING_CASE_ID",
            format!("request {} has no notification case id", request.uuid),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::services::notification::{
        DialogCall, MockDialogService, MockEmployerNotificationService, NotificationCall,
    };
    use crate::services::store::InMemoryRequestStore;

    const ORG: &str = "111111111";
    const OTHER_ORG: &str = "222222222";
    const ACTOR: &str = "9999999999999";

    struct Harness {
        store: Arc<InMemoryRequestStore>,
        notifications: Arc<MockEmployerNotificationService>,
        dialogs: Arc<MockDialogService>,
        service: RequestLifecycleService,
    }

    fn config() -> LifecycleConfig {
        LifecycleConfig {
            statement_form_url: "https://forms.example/statement".to_string(),
            production: false,
            dialog_enabled: false,
        }
    }

    fn harness_with(notifications: MockEmployerNotificationService, config: LifecycleConfig) -> Harness {
        let store = Arc::new(InMemoryRequestStore::new());
        let notifications = Arc::new(notifications);
        let dialogs = Arc::new(MockDialogService::new());
        let service = RequestLifecycleService::new(
            store.clone(),
            notifications.clone(),
            dialogs.clone(),
            config,
        );
        Harness {
            store,
            notifications,
            dialogs,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(MockEmployerNotificationService::new(), config())
    }

    fn org() -> OrganizationNumber {
        OrganizationNumber::parse(ORG).unwrap()
    }

    fn actor() -> ActorId {
        ActorId::parse(ACTOR).unwrap()
    }

    fn case_ref() -> CaseRef {
        CaseRef::parse("SAK001").unwrap()
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn basis_date() -> NaiveDate {
        date(2024, 10, 1)
    }

    fn absence_date() -> NaiveDate {
        date(2024, 10, 15)
    }

    async fn create_default(harness: &Harness) -> IncomeStatementRequest {
        let outcome = harness
            .service
            .create_on_demand(
                basis_date(),
                BenefitType::ParentalBenefit,
                actor(),
                org(),
                case_ref(),
                absence_date(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::Created);
        harness.store.rows().pop().unwrap()
    }

    #[tokio::test]
    async fn test_create_on_demand_persists_external_ids() {
        let harness = harness();
        let request = create_default(&harness).await;

        assert_eq!(request.status, RequestStatus::UnderProcessing);
        assert_eq!(
            request.notification_case_id,
            Some(format!("case-{}", request.uuid))
        );
        assert_eq!(
            request.notification_task_id,
            Some(format!("task-{}", request.uuid))
        );
        assert!(request.dialog_id.is_none());
    }

    #[tokio::test]
    async fn test_create_on_demand_duplicate_has_no_side_effects() {
        let harness = harness();
        create_default(&harness).await;
        let calls_after_first = harness.notifications.calls().len();

        let outcome = harness
            .service
            .create_on_demand(
                basis_date(),
                BenefitType::ParentalBenefit,
                actor(),
                org(),
                case_ref(),
                absence_date(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, CreateOutcome::AlreadyExists);
        assert_eq!(harness.notifications.calls().len(), calls_after_first);
        assert_eq!(harness.store.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_create_on_demand_supersedes_done_request_with_other_basis_date() {
        let harness = harness();
        let old = create_default(&harness).await;
        harness
            .service
            .finalize(
                old.uuid,
                &actor(),
                &org(),
                absence_date(),
                ClosureReason::OrdinarySubmission,
                None,
            )
            .await
            .unwrap();

        let outcome = harness
            .service
            .create_on_demand(
                date(2024, 12, 1),
                BenefitType::ParentalBenefit,
                actor(),
                org(),
                case_ref(),
                date(2024, 12, 15),
            )
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::Created);

        let rows = harness.store.rows();
        let old_row = rows.iter().find(|r| r.uuid == old.uuid).unwrap();
        assert_eq!(old_row.status, RequestStatus::Expired);

        // Supersession is silent: the old task is not marked expired.
        assert!(!harness
            .notifications
            .calls()
            .iter()
            .any(|call| matches!(call, NotificationCall::TaskExpired { .. })));
    }

    #[tokio::test]
    async fn test_create_on_demand_leaves_open_requests_alone() {
        let harness = harness();
        let open = create_default(&harness).await;

        harness
            .service
            .create_on_demand(
                date(2024, 12, 1),
                BenefitType::ParentalBenefit,
                actor(),
                org(),
                case_ref(),
                date(2024, 12, 15),
            )
            .await
            .unwrap();

        let rows = harness.store.rows();
        let open_row = rows.iter().find(|r| r.uuid == open.uuid).unwrap();
        assert_eq!(open_row.status, RequestStatus::UnderProcessing);
    }

    #[tokio::test]
    async fn test_failed_task_creation_rolls_back_row_and_case() {
        let harness = harness_with(
            MockEmployerNotificationService::failing_task_creation(),
            config(),
        );

        let err = harness
            .service
            .create_on_demand(
                basis_date(),
                BenefitType::ParentalBenefit,
                actor(),
                org(),
                case_ref(),
                absence_date(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Integration(_)));
        assert!(harness.store.rows().is_empty());
        assert!(harness
            .notifications
            .calls()
            .iter()
            .any(|call| matches!(call, NotificationCall::CaseDeleted { .. })));
    }

    #[tokio::test]
    async fn test_employer_initiated_request_gets_no_task() {
        let harness = harness();
        let request = harness
            .service
            .create_employer_initiated(NewRequest::employer_initiated_new_hire(
                BenefitType::ParentalBenefit,
                actor(),
                org(),
                absence_date(),
            ))
            .await
            .unwrap();

        assert!(request.notification_case_id.is_some());
        assert!(request.notification_task_id.is_none());
        assert!(!harness
            .notifications
            .calls()
            .iter()
            .any(|call| matches!(call, NotificationCall::TaskCreated { .. })));
    }

    #[tokio::test]
    async fn test_finalize_marks_task_case_and_sends_receipt() {
        let harness = harness();
        let request = create_default(&harness).await;
        let statement_ref = Uuid::new_v4();

        let finalized = harness
            .service
            .finalize(
                request.uuid,
                &actor(),
                &org(),
                absence_date(),
                ClosureReason::OrdinarySubmission,
                Some(statement_ref),
            )
            .await
            .unwrap();

        assert_eq!(finalized.status, RequestStatus::Done);
        let stored = harness
            .store
            .rows()
            .into_iter()
            .find(|r| r.uuid == request.uuid)
            .unwrap();
        assert_eq!(stored.status, RequestStatus::Done);

        let calls = harness.notifications.calls();
        let case_id = format!("case-{}", request.uuid);
        assert!(calls.contains(&NotificationCall::TaskDone {
            task_id: format!("task-{}", request.uuid)
        }));
        assert!(calls.contains(&NotificationCall::CaseDone {
            case_id: case_id.clone(),
            employer_initiated: false
        }));
        assert!(calls.contains(&NotificationCall::ReceiptSent {
            grouping_id: request.uuid.to_string(),
            text: "Income statement received".to_string()
        }));
    }

    #[tokio::test]
    async fn test_finalize_in_production_sends_no_receipt() {
        let mut prod_config = config();
        prod_config.production = true;
        let harness = harness_with(MockEmployerNotificationService::new(), prod_config);
        let request = create_default(&harness).await;

        harness
            .service
            .finalize(
                request.uuid,
                &actor(),
                &org(),
                absence_date(),
                ClosureReason::OrdinarySubmission,
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap();

        assert!(!harness
            .notifications
            .calls()
            .iter()
            .any(|call| matches!(call, NotificationCall::ReceiptSent { .. })));
    }

    #[tokio::test]
    async fn test_finalize_rejects_mismatched_first_absence_date() {
        let harness = harness();
        let request = create_default(&harness).await;

        let err = harness
            .service
            .finalize(
                request.uuid,
                &actor(),
                &org(),
                date(2024, 11, 1),
                ClosureReason::OrdinarySubmission,
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Invariant { code, .. } if code == "IDENTITY_MISMATCH"));
        let stored = harness
            .store
            .rows()
            .into_iter()
            .find(|r| r.uuid == request.uuid)
            .unwrap();
        assert_eq!(stored.status, RequestStatus::UnderProcessing);
        assert!(!harness
            .notifications
            .calls()
            .iter()
            .any(|call| matches!(call, NotificationCall::TaskDone { .. })));
    }

    #[tokio::test]
    async fn test_finalize_rejects_mismatched_employer() {
        let harness = harness();
        let request = create_default(&harness).await;

        let err = harness
            .service
            .finalize(
                request.uuid,
                &actor(),
                &OrganizationNumber::parse(OTHER_ORG).unwrap(),
                absence_date(),
                ClosureReason::OrdinarySubmission,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Invariant { code, .. } if code == "IDENTITY_MISMATCH"));
    }

    #[tokio::test]
    async fn test_finalize_missing_request_is_an_invariant_error() {
        let harness = harness();
        let err = harness
            .service
            .finalize(
                Uuid::new_v4(),
                &actor(),
                &org(),
                absence_date(),
                ClosureReason::OrdinarySubmission,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Invariant { code, .. } if code == "REQUEST_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_expire_with_notification() {
        let harness = harness();
        let request = create_default(&harness).await;
        let stored = harness.store.rows().pop().unwrap();

        harness
            .service
            .expire(&stored, ExpiryNotice::Notify)
            .await
            .unwrap();

        let calls = harness.notifications.calls();
        assert!(calls.contains(&NotificationCall::TaskExpired {
            task_id: format!("task-{}", request.uuid)
        }));
        assert!(calls.contains(&NotificationCall::CaseDone {
            case_id: format!("case-{}", request.uuid),
            employer_initiated: false
        }));
        let expired_text_updated = calls.iter().any(|call| {
            matches!(call, NotificationCall::SecondaryTextUpdated { text, .. }
                if text.starts_with("You no longer need"))
        });
        assert!(expired_text_updated);
        assert_eq!(
            harness.store.rows().pop().unwrap().status,
            RequestStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_expire_silently_skips_task_and_case_closure() {
        let harness = harness();
        create_default(&harness).await;
        let stored = harness.store.rows().pop().unwrap();

        harness
            .service
            .expire(&stored, ExpiryNotice::Silent)
            .await
            .unwrap();

        let calls = harness.notifications.calls();
        assert!(!calls
            .iter()
            .any(|call| matches!(call, NotificationCall::TaskExpired { .. })));
        assert!(!calls
            .iter()
            .any(|call| matches!(call, NotificationCall::CaseDone { .. })));
        assert_eq!(
            harness.store.rows().pop().unwrap().status,
            RequestStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_delete_requires_exactly_one_match() {
        let harness = harness();

        // No match.
        let err = harness
            .service
            .delete(&case_ref(), Some(&org()), Some(basis_date()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Invariant { code, .. } if code == "DELETE_AMBIGUOUS"));

        // Two open requests for the same case.
        create_default(&harness).await;
        harness
            .service
            .create_on_demand(
                date(2024, 12, 1),
                BenefitType::ParentalBenefit,
                actor(),
                org(),
                case_ref(),
                date(2024, 12, 15),
            )
            .await
            .unwrap();

        let err = harness
            .service
            .delete(&case_ref(), Some(&org()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Invariant { code, .. } if code == "DELETE_AMBIGUOUS"));
        assert!(harness
            .store
            .rows()
            .iter()
            .all(|r| r.status == RequestStatus::UnderProcessing));
    }

    #[tokio::test]
    async fn test_delete_expires_the_single_match() {
        let harness = harness();
        let request = create_default(&harness).await;

        harness
            .service
            .delete(&case_ref(), Some(&org()), Some(basis_date()))
            .await
            .unwrap();

        assert!(harness.notifications.calls().contains(&NotificationCall::CaseDeleted {
            case_id: format!("case-{}", request.uuid)
        }));
        assert_eq!(
            harness.store.rows().pop().unwrap().status,
            RequestStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_reminder_without_open_request() {
        let harness = harness();
        let outcome = harness
            .service
            .send_reminder(&case_ref(), &org())
            .await
            .unwrap();
        assert_eq!(outcome, ReminderOutcome::NoOpenRequest);
    }

    #[tokio::test]
    async fn test_reminder_for_open_request() {
        let harness = harness();
        let request = create_default(&harness).await;

        let outcome = harness
            .service
            .send_reminder(&case_ref(), &org())
            .await
            .unwrap();

        assert_eq!(outcome, ReminderOutcome::Sent);
        assert!(harness.notifications.calls().contains(&NotificationCall::ReminderSent {
            grouping_id: request.uuid.to_string()
        }));
    }

    #[tokio::test]
    async fn test_close_on_external_submission_finalizes_open_requests() {
        let harness = harness();
        let request = create_default(&harness).await;

        harness
            .service
            .close_on_external_submission(&case_ref(), Some(&org()), None)
            .await
            .unwrap();

        let stored = harness
            .store
            .rows()
            .into_iter()
            .find(|r| r.uuid == request.uuid)
            .unwrap();
        assert_eq!(stored.status, RequestStatus::Done);
        let externally_submitted = harness.notifications.calls().iter().any(|call| {
            matches!(call, NotificationCall::SecondaryTextUpdated { text, .. }
                if text.starts_with("Submitted through a payroll"))
        });
        assert!(externally_submitted);
    }

    #[tokio::test]
    async fn test_dialog_integration_follows_the_lifecycle() {
        let mut dialog_config = config();
        dialog_config.dialog_enabled = true;
        let harness = harness_with(MockEmployerNotificationService::new(), dialog_config);

        let request = create_default(&harness).await;
        assert!(request.dialog_id.is_some());
        assert!(harness
            .dialogs
            .calls()
            .iter()
            .any(|call| matches!(call, DialogCall::Created { .. })));

        harness
            .service
            .finalize(
                request.uuid,
                &actor(),
                &org(),
                absence_date(),
                ClosureReason::OrdinarySubmission,
                None,
            )
            .await
            .unwrap();
        assert!(harness
            .dialogs
            .calls()
            .iter()
            .any(|call| matches!(call, DialogCall::Completed { .. })));
    }

    #[tokio::test]
    async fn test_income_basis_date_survives_every_operation() {
        let harness = harness();
        let request = create_default(&harness).await;
        assert_eq!(request.income_basis_date, Some(basis_date()));

        harness
            .service
            .finalize(
                request.uuid,
                &actor(),
                &org(),
                absence_date(),
                ClosureReason::OrdinarySubmission,
                None,
            )
            .await
            .unwrap();
        let stored = harness.store.rows().pop().unwrap();
        assert_eq!(stored.income_basis_date, Some(basis_date()));

        harness
            .service
            .expire(&stored, ExpiryNotice::Notify)
            .await
            .unwrap();
        let stored = harness.store.rows().pop().unwrap();
        assert_eq!(stored.income_basis_date, Some(basis_date()));
    }
}
