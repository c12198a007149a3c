//! Benefit case lookup for employer-initiated requests.
//!
//! When an employer opens a statement for an employment the case system does
//! not know about yet, the income basis date must come from the benefit case
//! itself, and the case must actually be open for processing.

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use shared::ident::ActorId;

use crate::error::{DomainError, IntegrationError};
use crate::models::request::BenefitType;

/// Status of the benefit case with respect to receiving statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitCaseStatus {
    OpenForProcessing,
    AppliedTooEarly,
    NoOpenCase,
}

/// What the case system knows about the person's benefit case.
#[derive(Debug, Clone)]
pub struct CaseInfo {
    pub status: BenefitCaseStatus,
    pub first_absence_date: Option<NaiveDate>,
    pub income_basis_date: Option<NaiveDate>,
}

/// Upstream benefit case system.
#[async_trait]
pub trait BenefitCaseLookup: Send + Sync {
    async fn fetch_case_info(
        &self,
        actor_id: &ActorId,
        benefit_type: BenefitType,
    ) -> Result<CaseInfo, IntegrationError>;
}

/// Checks that a statement for an unregistered employment may be submitted.
///
/// Statements are accepted from one month before the absence starts; both
/// the case status and the case's own first absence date gate this.
pub fn validate_unregistered_submission(
    info: &CaseInfo,
    benefit_type: BenefitType,
    actor_id: &ActorId,
    today: NaiveDate,
) -> Result<(), DomainError> {
    match info.status {
        BenefitCaseStatus::AppliedTooEarly => Err(too_early(actor_id, benefit_type)),
        BenefitCaseStatus::NoOpenCase => Err(DomainError::functional(
            "NO_CASE_FOUND",
            format!(
                "an income statement for {} cannot be submitted for the person with actor id {:?}",
                benefit_type.display_name(),
                actor_id
            ),
        )),
        BenefitCaseStatus::OpenForProcessing => {
            let threshold = today
                .checked_add_months(Months::new(1))
                .unwrap_or(NaiveDate::MAX);
            match info.first_absence_date {
                Some(first_absence) if first_absence > threshold => {
                    Err(too_early(actor_id, benefit_type))
                }
                _ => Ok(()),
            }
        }
    }
}

fn too_early(actor_id: &ActorId, benefit_type: BenefitType) -> DomainError {
    DomainError::functional(
        "SUBMITTED_TOO_EARLY",
        format!(
            "an income statement cannot be submitted earlier than four weeks before the person with actor id {:?} starts {}",
            actor_id,
            benefit_type.display_name()
        ),
    )
}
