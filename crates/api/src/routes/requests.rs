//! Request lifecycle routes for the benefit case system.

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use domain::models::BenefitType;
use domain::services::{CreateOutcome, ReminderOutcome};
use serde::{Deserialize, Serialize};
use shared::ident::{ActorId, CaseRef, OrganizationNumber};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestDto {
    #[validate(length(equal = 9, message = "organization number must be 9 digits"))]
    pub employer_org: String,
    #[validate(length(equal = 13, message = "actor id must be 13 digits"))]
    pub actor_id: String,
    #[validate(length(min = 1, max = 19))]
    pub case_ref: String,
    pub benefit_type: BenefitType,
    pub income_basis_date: NaiveDate,
    pub first_absence_date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateOutcomeDto {
    Created,
    AlreadyExists,
}

#[derive(Debug, Serialize)]
pub struct CreateResponseDto {
    pub outcome: CreateOutcomeDto,
}

/// Create a request on order from the benefit case system.
///
/// POST /api/v1/requests
pub async fn create_request(
    State(state): State<AppState>,
    Json(request): Json<CreateRequestDto>,
) -> Result<(StatusCode, Json<CreateResponseDto>), ApiError> {
    request.validate()?;

    let employer_org = parse_org(&request.employer_org)?;
    let actor_id = parse_actor(&request.actor_id)?;
    let case_ref = parse_case_ref(&request.case_ref)?;

    let outcome = state
        .lifecycle
        .create_on_demand(
            request.income_basis_date,
            request.benefit_type,
            actor_id,
            employer_org,
            case_ref,
            request.first_absence_date,
        )
        .await?;

    let (status, outcome) = match outcome {
        CreateOutcome::Created => (StatusCode::CREATED, CreateOutcomeDto::Created),
        CreateOutcome::AlreadyExists => (StatusCode::OK, CreateOutcomeDto::AlreadyExists),
    };
    Ok((status, Json(CreateResponseDto { outcome })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CaseScopedDto {
    #[validate(length(min = 1, max = 19))]
    pub case_ref: String,
    #[validate(length(equal = 9, message = "organization number must be 9 digits"))]
    pub employer_org: Option<String>,
    pub income_basis_date: Option<NaiveDate>,
}

/// Close open requests whose statement arrived through another channel.
///
/// POST /api/v1/requests/close
pub async fn close_requests(
    State(state): State<AppState>,
    Json(request): Json<CaseScopedDto>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;
    let case_ref = parse_case_ref(&request.case_ref)?;
    let employer_org = request.employer_org.as_deref().map(parse_org).transpose()?;

    state
        .lifecycle
        .close_on_external_submission(
            &case_ref,
            employer_org.as_ref(),
            request.income_basis_date,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Expire open requests that are no longer needed.
///
/// POST /api/v1/requests/expire
pub async fn expire_requests(
    State(state): State<AppState>,
    Json(request): Json<CaseScopedDto>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;
    let case_ref = parse_case_ref(&request.case_ref)?;
    let employer_org = request.employer_org.as_deref().map(parse_org).transpose()?;

    state
        .lifecycle
        .expire_open_requests(&case_ref, employer_org.as_ref(), request.income_basis_date)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a mistakenly ordered request.
///
/// POST /api/v1/requests/delete
pub async fn delete_request(
    State(state): State<AppState>,
    Json(request): Json<CaseScopedDto>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;
    let case_ref = parse_case_ref(&request.case_ref)?;
    let employer_org = request.employer_org.as_deref().map(parse_org).transpose()?;

    state
        .lifecycle
        .delete(&case_ref, employer_org.as_ref(), request.income_basis_date)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReminderDto {
    #[validate(length(min = 1, max = 19))]
    pub case_ref: String,
    #[validate(length(equal = 9, message = "organization number must be 9 digits"))]
    pub employer_org: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderOutcomeDto {
    Sent,
    NoOpenRequest,
}

#[derive(Debug, Serialize)]
pub struct ReminderResponseDto {
    pub outcome: ReminderOutcomeDto,
}

/// Send a reminder notice for the open request of a case and employer.
///
/// POST /api/v1/requests/reminder
pub async fn send_reminder(
    State(state): State<AppState>,
    Json(request): Json<ReminderDto>,
) -> Result<Json<ReminderResponseDto>, ApiError> {
    request.validate()?;
    let case_ref = parse_case_ref(&request.case_ref)?;
    let employer_org = parse_org(&request.employer_org)?;

    let outcome = state.lifecycle.send_reminder(&case_ref, &employer_org).await?;
    let outcome = match outcome {
        ReminderOutcome::Sent => ReminderOutcomeDto::Sent,
        ReminderOutcome::NoOpenRequest => ReminderOutcomeDto::NoOpenRequest,
    };
    Ok(Json(ReminderResponseDto { outcome }))
}

fn parse_org(value: &str) -> Result<OrganizationNumber, ApiError> {
    OrganizationNumber::parse(value).map_err(|err| ApiError::Validation(err.to_string()))
}

fn parse_actor(value: &str) -> Result<ActorId, ApiError> {
    ActorId::parse(value).map_err(|err| ApiError::Validation(err.to_string()))
}

fn parse_case_ref(value: &str) -> Result<CaseRef, ApiError> {
    CaseRef::parse(value).map_err(|err| ApiError::Validation(err.to_string()))
}
