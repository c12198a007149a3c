//! Employer notification system client.
//!
//! Implements the EmployerNotificationService contract over the notification
//! system's HTTP API: one case per request, an optional to-do task, and
//! notices shown in the employer portal.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::error::IntegrationError;
use domain::services::notification::{
    EmployerNotificationService, NewCase, NewTask, ReceiptNotice, ReminderNotice,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::EmployerNotificationConfig;

const SERVICE: &str = "employer-notification";

/// HTTP client for the employer notification system.
pub struct EmployerNotificationClient {
    client: Client,
    config: EmployerNotificationConfig,
}

#[derive(Debug, Serialize)]
struct CreateCaseBody {
    grouping_id: String,
    org_number: String,
    title: String,
    link: String,
}

#[derive(Debug, Serialize)]
struct CreateTaskBody {
    grouping_id: String,
    org_number: String,
    text: String,
    alert_text: String,
    reminder_text: String,
    link: String,
}

#[derive(Debug, Serialize)]
struct TaskStateBody {
    task_id: String,
    at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct CaseDoneBody {
    case_id: String,
    employer_initiated: bool,
}

#[derive(Debug, Serialize)]
struct SecondaryTextBody {
    case_id: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct NoticeBody {
    grouping_id: String,
    org_number: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    alert_text: Option<String>,
    link: String,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

impl EmployerNotificationClient {
    pub fn new(config: EmployerNotificationConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("client builds from static configuration");
        Self { client, config }
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, IntegrationError> {
        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| IntegrationError::new(SERVICE, err.to_string()))?;
        if !response.status().is_success() {
            return Err(IntegrationError::new(
                SERVICE,
                format!("{path} returned status {}", response.status()),
            ));
        }
        Ok(response)
    }

    async fn post_for_id<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, IntegrationError> {
        let response = self.post(path, body).await?;
        let parsed: IdResponse = response
            .json()
            .await
            .map_err(|err| IntegrationError::new(SERVICE, err.to_string()))?;
        Ok(parsed.id)
    }
}

#[async_trait]
impl EmployerNotificationService for EmployerNotificationClient {
    async fn create_case(&self, case: NewCase) -> Result<String, IntegrationError> {
        self.post_for_id(
            "/api/v1/cases",
            &CreateCaseBody {
                grouping_id: case.grouping_id,
                org_number: case.employer_org.to_string(),
                title: case.title,
                link: case.form_url,
            },
        )
        .await
    }

    async fn create_task(&self, task: NewTask) -> Result<String, IntegrationError> {
        self.post_for_id(
            "/api/v1/tasks",
            &CreateTaskBody {
                grouping_id: task.grouping_id,
                org_number: task.employer_org.to_string(),
                text: task.task_text,
                alert_text: task.alert_text,
                reminder_text: task.reminder_text,
                link: task.form_url,
            },
        )
        .await
    }

    async fn delete_case(&self, case_id: &str) -> Result<(), IntegrationError> {
        let url = format!("{}/api/v1/cases/{case_id}", self.config.base_url);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|err| IntegrationError::new(SERVICE, err.to_string()))?;
        if !response.status().is_success() {
            return Err(IntegrationError::new(
                SERVICE,
                format!("case deletion returned status {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn mark_task_done(
        &self,
        task_id: &str,
        when: DateTime<Utc>,
    ) -> Result<(), IntegrationError> {
        self.post(
            "/api/v1/tasks/done",
            &TaskStateBody {
                task_id: task_id.to_string(),
                at: when,
            },
        )
        .await
        .map(|_| ())
    }

    async fn mark_task_expired(
        &self,
        task_id: &str,
        when: DateTime<Utc>,
    ) -> Result<(), IntegrationError> {
        self.post(
            "/api/v1/tasks/expired",
            &TaskStateBody {
                task_id: task_id.to_string(),
                at: when,
            },
        )
        .await
        .map(|_| ())
    }

    async fn mark_case_done(
        &self,
        case_id: &str,
        employer_initiated: bool,
    ) -> Result<(), IntegrationError> {
        self.post(
            "/api/v1/cases/done",
            &CaseDoneBody {
                case_id: case_id.to_string(),
                employer_initiated,
            },
        )
        .await
        .map(|_| ())
    }

    async fn update_case_secondary_text(
        &self,
        case_id: &str,
        text: &str,
    ) -> Result<(), IntegrationError> {
        self.post(
            "/api/v1/cases/secondary-text",
            &SecondaryTextBody {
                case_id: case_id.to_string(),
                text: text.to_string(),
            },
        )
        .await
        .map(|_| ())
    }

    async fn send_receipt_notice(&self, notice: ReceiptNotice) -> Result<(), IntegrationError> {
        self.post(
            "/api/v1/notices",
            &NoticeBody {
                grouping_id: notice.grouping_id,
                org_number: notice.employer_org.to_string(),
                text: notice.text,
                alert_text: None,
                link: notice.receipt_url,
            },
        )
        .await
        .map(|_| ())
    }

    async fn send_reminder_notice(
        &self,
        notice: ReminderNotice,
    ) -> Result<(), IntegrationError> {
        self.post(
            "/api/v1/notices",
            &NoticeBody {
                grouping_id: notice.grouping_id,
                org_number: notice.employer_org.to_string(),
                text: notice.notice_text,
                alert_text: Some(notice.alert_text),
                link: notice.form_url,
            },
        )
        .await
        .map(|_| ())
    }
}
