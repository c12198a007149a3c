//! Benefit case system lookup client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::error::IntegrationError;
use domain::models::BenefitType;
use domain::services::{BenefitCaseLookup, BenefitCaseStatus, CaseInfo};
use reqwest::Client;
use serde::Deserialize;
use shared::ident::ActorId;

use crate::config::BenefitCaseConfig;

const SERVICE: &str = "benefit-case";

/// HTTP client for the benefit case system.
pub struct BenefitCaseClient {
    client: Client,
    config: BenefitCaseConfig,
}

#[derive(Debug, Deserialize)]
struct CaseInfoDto {
    status: BenefitCaseStatus,
    first_absence_date: Option<NaiveDate>,
    income_basis_date: Option<NaiveDate>,
}

impl BenefitCaseClient {
    pub fn new(config: BenefitCaseConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("client builds from static configuration");
        Self { client, config }
    }
}

#[async_trait]
impl BenefitCaseLookup for BenefitCaseClient {
    async fn fetch_case_info(
        &self,
        actor_id: &ActorId,
        benefit_type: BenefitType,
    ) -> Result<CaseInfo, IntegrationError> {
        let url = format!("{}/api/v1/cases/info", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("actor_id", actor_id.as_str()),
                ("benefit_type", benefit_type_param(benefit_type)),
            ])
            .send()
            .await
            .map_err(|err| IntegrationError::new(SERVICE, err.to_string()))?;
        if !response.status().is_success() {
            return Err(IntegrationError::new(
                SERVICE,
                format!("case lookup returned status {}", response.status()),
            ));
        }
        let dto: CaseInfoDto = response
            .json()
            .await
            .map_err(|err| IntegrationError::new(SERVICE, err.to_string()))?;
        Ok(CaseInfo {
            status: dto.status,
            first_absence_date: dto.first_absence_date,
            income_basis_date: dto.income_basis_date,
        })
    }
}

fn benefit_type_param(benefit_type: BenefitType) -> &'static str {
    match benefit_type {
        BenefitType::ParentalBenefit => "parental_benefit",
        BenefitType::PregnancyBenefit => "pregnancy_benefit",
    }
}
