//! Statement-facing routes: income pre-fill and statement intake.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use domain::models::{BenefitType, IncomeSummary, RequestKind, RequestStatus};
use domain::services::{EmployerInitiatedReason, StatementSubmission};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct IncomeQueryDto {
    pub request_uuid: Uuid,
}

#[derive(Debug, Serialize)]
pub struct IncomeSummaryDto {
    pub request_uuid: Uuid,
    #[serde(flatten)]
    pub summary: IncomeSummary,
}

/// The computed income basis used to pre-fill the statement form.
///
/// GET /api/v1/statements/income
pub async fn income_summary(
    State(state): State<AppState>,
    Query(query): Query<IncomeQueryDto>,
) -> Result<Json<IncomeSummaryDto>, ApiError> {
    let request = state
        .lifecycle
        .find_request(query.request_uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound("No request for the given uuid".to_string()))?;

    // New hires have no income basis date; the absence start stands in, and
    // the average is taken over the months actually reported.
    let reference_date = request
        .income_basis_date
        .unwrap_or(request.first_absence_date);
    let continuously_employed = request.kind != RequestKind::EmployerInitiatedNewHire;

    let summary = state
        .income
        .income_summary(
            &request.actor_id,
            &request.employer_org,
            reference_date,
            Utc::now().date_naive(),
            continuously_employed,
        )
        .await?;

    Ok(Json(IncomeSummaryDto {
        request_uuid: request.uuid,
        summary,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitStatementDto {
    pub request_uuid: Option<Uuid>,
    #[validate(length(equal = 13, message = "actor id must be 13 digits"))]
    pub actor_id: String,
    #[validate(length(equal = 9, message = "organization number must be 9 digits"))]
    pub employer_org: String,
    pub benefit_type: BenefitType,
    pub first_absence_date: NaiveDate,
    pub statement_ref: Option<Uuid>,
    /// Present when the employer opened the statement themselves.
    pub employer_initiated_reason: Option<EmployerInitiatedReasonDto>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployerInitiatedReasonDto {
    NewHire,
    Unregistered,
}

#[derive(Debug, Serialize)]
pub struct SubmitStatementResponseDto {
    pub request_uuid: Uuid,
    pub status: RequestStatus,
}

/// Receive an accepted statement submission.
///
/// POST /api/v1/statements
pub async fn submit_statement(
    State(state): State<AppState>,
    Json(request): Json<SubmitStatementDto>,
) -> Result<(StatusCode, Json<SubmitStatementResponseDto>), ApiError> {
    request.validate()?;

    let submission = StatementSubmission {
        request_uuid: request.request_uuid,
        actor_id: shared::ident::ActorId::parse(&request.actor_id)
            .map_err(|err| ApiError::Validation(err.to_string()))?,
        employer_org: shared::ident::OrganizationNumber::parse(&request.employer_org)
            .map_err(|err| ApiError::Validation(err.to_string()))?,
        benefit_type: request.benefit_type,
        first_absence_date: request.first_absence_date,
        statement_ref: request.statement_ref,
    };

    let result = match request.employer_initiated_reason {
        Some(reason) => {
            let reason = match reason {
                EmployerInitiatedReasonDto::NewHire => EmployerInitiatedReason::NewHire,
                EmployerInitiatedReasonDto::Unregistered => EmployerInitiatedReason::Unregistered,
            };
            state
                .intake
                .receive_employer_initiated(submission, reason, Utc::now().date_naive())
                .await?
        }
        None => state.intake.receive_statement(submission).await?,
    };

    Ok((
        StatusCode::CREATED,
        Json(SubmitStatementResponseDto {
            request_uuid: result.uuid,
            status: result.status,
        }),
    ))
}
