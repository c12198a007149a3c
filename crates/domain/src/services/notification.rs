//! Contracts for the two external notification systems.
//!
//! The employer notification system carries a case (visible unit of work)
//! and an optional to-do task per request; the dialog system mirrors case
//! status into the government-wide business messaging inbox. Neither shares
//! a transaction with this application or with each other.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::ident::OrganizationNumber;
use tracing::info;
use uuid::Uuid;

use crate::error::IntegrationError;
use crate::models::request::{BenefitType, ClosureReason};

/// Parameters for a new case in the employer notification system.
#[derive(Debug, Clone)]
pub struct NewCase {
    /// Groups the case with its task and notices; the request uuid.
    pub grouping_id: String,
    pub employer_org: OrganizationNumber,
    pub title: String,
    pub form_url: String,
}

/// Parameters for the to-do task attached to a case.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub grouping_id: String,
    pub employer_org: OrganizationNumber,
    pub task_text: String,
    pub alert_text: String,
    pub reminder_text: String,
    pub form_url: String,
}

/// A receipt notice shown to the employer after a submission.
#[derive(Debug, Clone)]
pub struct ReceiptNotice {
    pub grouping_id: String,
    pub employer_org: OrganizationNumber,
    pub text: String,
    pub receipt_url: String,
}

/// A caseworker-triggered reminder with an external alert.
#[derive(Debug, Clone)]
pub struct ReminderNotice {
    pub grouping_id: String,
    pub employer_org: OrganizationNumber,
    pub notice_text: String,
    pub alert_text: String,
    pub form_url: String,
}

/// Employer notification system (cases, tasks, notices).
///
/// None of these operations are idempotent against retry; callers perform a
/// single attempt and surface the failure.
#[async_trait]
pub trait EmployerNotificationService: Send + Sync {
    async fn create_case(&self, case: NewCase) -> Result<String, IntegrationError>;

    async fn create_task(&self, task: NewTask) -> Result<String, IntegrationError>;

    async fn delete_case(&self, case_id: &str) -> Result<(), IntegrationError>;

    async fn mark_task_done(
        &self,
        task_id: &str,
        when: DateTime<Utc>,
    ) -> Result<(), IntegrationError>;

    async fn mark_task_expired(
        &self,
        task_id: &str,
        when: DateTime<Utc>,
    ) -> Result<(), IntegrationError>;

    /// Marks the case done. Employer-initiated cases get a different
    /// completion presentation.
    async fn mark_case_done(
        &self,
        case_id: &str,
        employer_initiated: bool,
    ) -> Result<(), IntegrationError>;

    async fn update_case_secondary_text(
        &self,
        case_id: &str,
        text: &str,
    ) -> Result<(), IntegrationError>;

    async fn send_receipt_notice(&self, notice: ReceiptNotice) -> Result<(), IntegrationError>;

    async fn send_reminder_notice(&self, notice: ReminderNotice)
        -> Result<(), IntegrationError>;
}

/// Completion details forwarded to the dialog system.
#[derive(Debug, Clone)]
pub struct DialogCompletion {
    pub dialog_id: Uuid,
    pub employer_org: OrganizationNumber,
    pub title: String,
    pub benefit_type: BenefitType,
    pub first_absence_date: NaiveDate,
    pub statement_ref: Option<Uuid>,
    pub reason: ClosureReason,
}

/// Government-wide business dialog system.
#[async_trait]
pub trait DialogService: Send + Sync {
    async fn create_dialog(
        &self,
        request_uuid: Uuid,
        employer_org: &OrganizationNumber,
        title: &str,
        first_absence_date: NaiveDate,
        benefit_type: BenefitType,
    ) -> Result<Uuid, IntegrationError>;

    async fn complete_dialog(&self, completion: DialogCompletion)
        -> Result<(), IntegrationError>;

    async fn mark_dialog_not_applicable(
        &self,
        dialog_id: Uuid,
        title: &str,
    ) -> Result<(), IntegrationError>;

    async fn notify_updated_statement(
        &self,
        dialog_id: Uuid,
        employer_org: &OrganizationNumber,
        statement_ref: Option<Uuid>,
    ) -> Result<(), IntegrationError>;
}

/// Recorded side effect in [`MockEmployerNotificationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationCall {
    CaseCreated { grouping_id: String },
    TaskCreated { grouping_id: String },
    CaseDeleted { case_id: String },
    TaskDone { task_id: String },
    TaskExpired { task_id: String },
    CaseDone { case_id: String, employer_initiated: bool },
    SecondaryTextUpdated { case_id: String, text: String },
    ReceiptSent { grouping_id: String, text: String },
    ReminderSent { grouping_id: String },
}

/// Mock employer notification service for development and testing.
///
/// Records every call and hands out deterministic ids. Task creation can be
/// made to fail to exercise the compensation path.
#[derive(Debug, Default)]
pub struct MockEmployerNotificationService {
    pub fail_task_creation: bool,
    calls: Mutex<Vec<NotificationCall>>,
}

impl MockEmployerNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_task_creation() -> Self {
        Self {
            fail_task_creation: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<NotificationCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: NotificationCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EmployerNotificationService for MockEmployerNotificationService {
    async fn create_case(&self, case: NewCase) -> Result<String, IntegrationError> {
        info!(grouping_id = %case.grouping_id, "mock: creating case");
        self.record(NotificationCall::CaseCreated {
            grouping_id: case.grouping_id.clone(),
        });
        Ok(format!("case-{}", case.grouping_id))
    }

    async fn create_task(&self, task: NewTask) -> Result<String, IntegrationError> {
        if self.fail_task_creation {
            return Err(IntegrationError::new(
                "employer-notification",
                "simulated task creation failure",
            ));
        }
        self.record(NotificationCall::TaskCreated {
            grouping_id: task.grouping_id.clone(),
        });
        Ok(format!("task-{}", task.grouping_id))
    }

    async fn delete_case(&self, case_id: &str) -> Result<(), IntegrationError> {
        self.record(NotificationCall::CaseDeleted {
            case_id: case_id.to_string(),
        });
        Ok(())
    }

    async fn mark_task_done(
        &self,
        task_id: &str,
        _when: DateTime<Utc>,
    ) -> Result<(), IntegrationError> {
        self.record(NotificationCall::TaskDone {
            task_id: task_id.to_string(),
        });
        Ok(())
    }

    async fn mark_task_expired(
        &self,
        task_id: &str,
        _when: DateTime<Utc>,
    ) -> Result<(), IntegrationError> {
        self.record(NotificationCall::TaskExpired {
            task_id: task_id.to_string(),
        });
        Ok(())
    }

    async fn mark_case_done(
        &self,
        case_id: &str,
        employer_initiated: bool,
    ) -> Result<(), IntegrationError> {
        self.record(NotificationCall::CaseDone {
            case_id: case_id.to_string(),
            employer_initiated,
        });
        Ok(())
    }

    async fn update_case_secondary_text(
        &self,
        case_id: &str,
        text: &str,
    ) -> Result<(), IntegrationError> {
        self.record(NotificationCall::SecondaryTextUpdated {
            case_id: case_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_receipt_notice(&self, notice: ReceiptNotice) -> Result<(), IntegrationError> {
        self.record(NotificationCall::ReceiptSent {
            grouping_id: notice.grouping_id,
            text: notice.text,
        });
        Ok(())
    }

    async fn send_reminder_notice(
        &self,
        notice: ReminderNotice,
    ) -> Result<(), IntegrationError> {
        self.record(NotificationCall::ReminderSent {
            grouping_id: notice.grouping_id,
        });
        Ok(())
    }
}

/// Recorded side effect in [`MockDialogService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogCall {
    Created { request_uuid: Uuid },
    Completed { dialog_id: Uuid },
    NotApplicable { dialog_id: Uuid },
    Updated { dialog_id: Uuid },
}

/// Mock dialog service for development and testing.
#[derive(Debug, Default)]
pub struct MockDialogService {
    calls: Mutex<Vec<DialogCall>>,
}

impl MockDialogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DialogCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: DialogCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DialogService for MockDialogService {
    async fn create_dialog(
        &self,
        request_uuid: Uuid,
        _employer_org: &OrganizationNumber,
        _title: &str,
        _first_absence_date: NaiveDate,
        _benefit_type: BenefitType,
    ) -> Result<Uuid, IntegrationError> {
        self.record(DialogCall::Created { request_uuid });
        Ok(Uuid::new_v4())
    }

    async fn complete_dialog(
        &self,
        completion: DialogCompletion,
    ) -> Result<(), IntegrationError> {
        self.record(DialogCall::Completed {
            dialog_id: completion.dialog_id,
        });
        Ok(())
    }

    async fn mark_dialog_not_applicable(
        &self,
        dialog_id: Uuid,
        _title: &str,
    ) -> Result<(), IntegrationError> {
        self.record(DialogCall::NotApplicable { dialog_id });
        Ok(())
    }

    async fn notify_updated_statement(
        &self,
        dialog_id: Uuid,
        _employer_org: &OrganizationNumber,
        _statement_ref: Option<Uuid>,
    ) -> Result<(), IntegrationError> {
        self.record(DialogCall::Updated { dialog_id });
        Ok(())
    }
}
