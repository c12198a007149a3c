//! Dialog system client.
//!
//! Mirrors case status into the government-wide business messaging inbox.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::error::IntegrationError;
use domain::models::BenefitType;
use domain::services::notification::{DialogCompletion, DialogService};
use reqwest::Client;
use serde::Serialize;
use shared::ident::OrganizationNumber;
use tracing::info;
use uuid::Uuid;

use crate::config::DialogConfig;

const SERVICE: &str = "dialog";

/// HTTP client for the dialog system.
pub struct DialogClient {
    client: Client,
    config: DialogConfig,
}

#[derive(Debug, Serialize)]
struct CreateDialogBody {
    external_ref: Uuid,
    org_number: String,
    title: String,
    first_absence_date: NaiveDate,
    benefit_type: BenefitType,
}

#[derive(Debug, Serialize)]
struct CompleteDialogBody {
    org_number: String,
    title: String,
    benefit_type: BenefitType,
    first_absence_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    statement_ref: Option<Uuid>,
    reason: domain::models::ClosureReason,
}

#[derive(Debug, Serialize)]
struct NotApplicableBody {
    title: String,
}

#[derive(Debug, Serialize)]
struct UpdatedStatementBody {
    org_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    statement_ref: Option<Uuid>,
}

impl DialogClient {
    pub fn new(config: DialogConfig) -> Self {
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
}

#[async_trait]
impl DialogService for DialogClient {
    async fn create_dialog(
        &self,
        request_uuid: Uuid,
        employer_org: &OrganizationNumber,
        title: &str,
        first_absence_date: NaiveDate,
        benefit_type: BenefitType,
    ) -> Result<Uuid, IntegrationError> {
        let response = self
            .post(
                "/api/v1/dialogs",
                &CreateDialogBody {
                    external_ref: request_uuid,
                    org_number: employer_org.to_string(),
                    title: title.to_string(),
                    first_absence_date,
                    benefit_type,
                },
            )
            .await?;
        // The dialog system returns the id as a JSON-encoded string.
        let raw = response
            .text()
            .await
            .map_err(|err| IntegrationError::new(SERVICE, err.to_string()))?;
        let cleaned = raw.trim().trim_matches('"');
        let dialog_id = cleaned
            .parse::<Uuid>()
            .map_err(|_| IntegrationError::new(SERVICE, format!("unparseable dialog id {raw}")))?;
        info!(%dialog_id, "received dialog id");
        Ok(dialog_id)
    }

    async fn complete_dialog(
        &self,
        completion: DialogCompletion,
    ) -> Result<(), IntegrationError> {
        self.post(
            &format!("/api/v1/dialogs/{}/complete", completion.dialog_id),
            &CompleteDialogBody {
                org_number: completion.employer_org.to_string(),
                title: completion.title,
                benefit_type: completion.benefit_type,
                first_absence_date: completion.first_absence_date,
                statement_ref: completion.statement_ref,
                reason: completion.reason,
            },
        )
        .await
        .map(|_| ())
    }

    async fn mark_dialog_not_applicable(
        &self,
        dialog_id: Uuid,
        title: &str,
    ) -> Result<(), IntegrationError> {
        self.post(
            &format!("/api/v1/dialogs/{dialog_id}/not-applicable"),
            &NotApplicableBody {
                title: title.to_string(),
            },
        )
        .await
        .map(|_| ())
    }

    async fn notify_updated_statement(
        &self,
        dialog_id: Uuid,
        employer_org: &OrganizationNumber,
        statement_ref: Option<Uuid>,
    ) -> Result<(), IntegrationError> {
        self.post(
            &format!("/api/v1/dialogs/{dialog_id}/updated-statement"),
            &UpdatedStatementBody {
                org_number: employer_org.to_string(),
                statement_ref,
            },
        )
        .await
        .map(|_| ())
    }
}
