//! Two-step external case and task creation with compensation.
//!
//! The notification system has no transaction spanning case and task
//! creation. If the task call fails the case has already been created and
//! must be deleted again by hand; that delete is the only compensating
//! action in the system. No retries are attempted.

use std::sync::Arc;

use tracing::error;

use crate::error::IntegrationError;
use crate::services::notification::{EmployerNotificationService, NewCase, NewTask};

/// Ids assigned by the notification system during creation.
#[derive(Debug, Clone)]
pub struct CaseHandles {
    pub case_id: String,
    pub task_id: Option<String>,
}

/// Coordinates case and task creation in the employer notification system.
pub struct CaseTaskCoordinator {
    notifications: Arc<dyn EmployerNotificationService>,
}

impl CaseTaskCoordinator {
    pub fn new(notifications: Arc<dyn EmployerNotificationService>) -> Self {
        Self { notifications }
    }

    /// Creates the case alone. Employer-initiated requests have no task.
    pub async fn create_case(
        &self,
        case: NewCase,
        secondary_text: &str,
    ) -> Result<CaseHandles, IntegrationError> {
        let case_id = self.notifications.create_case(case).await?;
        self.notifications
            .update_case_secondary_text(&case_id, secondary_text)
            .await?;
        Ok(CaseHandles {
            case_id,
            task_id: None,
        })
    }

    /// Creates the case and its task.
    ///
    /// If the task call fails, the case just created is deleted again and
    /// the original failure is returned. A failed compensation is logged
    /// and does not mask the original failure.
    pub async fn create_case_with_task(
        &self,
        case: NewCase,
        secondary_text: &str,
        task: NewTask,
    ) -> Result<CaseHandles, IntegrationError> {
        let handles = self.create_case(case, secondary_text).await?;
        match self.notifications.create_task(task).await {
            Ok(task_id) => Ok(CaseHandles {
                task_id: Some(task_id),
                ..handles
            }),
            Err(task_error) => {
                if let Err(delete_error) = self.notifications.delete_case(&handles.case_id).await {
                    error!(
                        case_id = %handles.case_id,
                        error = %delete_error,
                        "could not delete case while rolling back failed task creation"
                    );
                }
                Err(task_error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use shared::ident::OrganizationNumber;

    use crate::services::notification::{MockEmployerNotificationService, NotificationCall};

    fn org() -> OrganizationNumber {
        OrganizationNumber::parse("111111111").unwrap()
    }

    fn new_case() -> NewCase {
        NewCase {
            grouping_id: "r1".to_string(),
            employer_org: org(),
            title: "Income statement for parental benefit".to_string(),
            form_url: "https://forms.example/r1".to_string(),
        }
    }

    fn new_task() -> NewTask {
        NewTask {
            grouping_id: "r1".to_string(),
            employer_org: org(),
            task_text: "Submit income statement".to_string(),
            alert_text: "alert".to_string(),
            reminder_text: "reminder".to_string(),
            form_url: "https://forms.example/r1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_creates_case_and_task() {
        let notifications = Arc::new(MockEmployerNotificationService::new());
        let coordinator = CaseTaskCoordinator::new(notifications.clone());

        let handles = coordinator
            .create_case_with_task(new_case(), "secondary", new_task())
            .await
            .unwrap();

        assert_eq!(handles.case_id, "case-r1");
        assert_eq!(handles.task_id.as_deref(), Some("task-r1"));
        assert_eq!(
            notifications.calls(),
            vec![
                NotificationCall::CaseCreated {
                    grouping_id: "r1".to_string()
                },
                NotificationCall::SecondaryTextUpdated {
                    case_id: "case-r1".to_string(),
                    text: "secondary".to_string()
                },
                NotificationCall::TaskCreated {
                    grouping_id: "r1".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_task_failure_deletes_case_and_returns_original_error() {
        let notifications = Arc::new(MockEmployerNotificationService::failing_task_creation());
        let coordinator = CaseTaskCoordinator::new(notifications.clone());

        let err = coordinator
            .create_case_with_task(new_case(), "secondary", new_task())
            .await
            .unwrap_err();

        assert!(err.message.contains("task creation failure"));
        assert!(notifications.calls().contains(&NotificationCall::CaseDeleted {
            case_id: "case-r1".to_string()
        }));
    }

    #[tokio::test]
    async fn test_case_only_creation_has_no_task() {
        let notifications = Arc::new(MockEmployerNotificationService::new());
        let coordinator = CaseTaskCoordinator::new(notifications.clone());

        let handles = coordinator.create_case(new_case(), "secondary").await.unwrap();

        assert_eq!(handles.case_id, "case-r1");
        assert!(handles.task_id.is_none());
        assert!(!notifications
            .calls()
            .iter()
            .any(|call| matches!(call, NotificationCall::TaskCreated { .. })));
    }
}
