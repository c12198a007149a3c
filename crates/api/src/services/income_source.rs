//! Monthly income source client.

use std::time::Duration;

use async_trait::async_trait;
use domain::error::IntegrationError;
use domain::models::{IncomeType, RawIncomeRecord};
use domain::services::IncomeSource;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ident::{ActorId, OrganizationNumber};
use shared::month::CalendarMonth;

use crate::config::IncomeSourceConfig;

const SERVICE: &str = "income-source";

/// Income type label for wage income in the source system.
const WAGE_INCOME_TYPE: &str = "wage";

/// HTTP client for the monthly income source.
pub struct IncomeSourceClient {
    client: Client,
    config: IncomeSourceConfig,
}

#[derive(Debug, Serialize)]
struct IncomeQueryBody {
    actor_id: String,
    from_month: CalendarMonth,
    to_month: CalendarMonth,
}

#[derive(Debug, Deserialize)]
struct IncomeRecordDto {
    month: CalendarMonth,
    org_number: String,
    income_type: String,
    amount: Option<Decimal>,
}

impl IncomeSourceClient {
    pub fn new(config: IncomeSourceConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("client builds from static configuration");
        Self { client, config }
    }
}

#[async_trait]
impl IncomeSource for IncomeSourceClient {
    async fn fetch_monthly_income(
        &self,
        actor_id: &ActorId,
        start: CalendarMonth,
        end: CalendarMonth,
    ) -> Result<Vec<RawIncomeRecord>, IntegrationError> {
        let url = format!("{}/api/v1/income", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .json(&IncomeQueryBody {
                actor_id: actor_id.to_string(),
                from_month: start,
                to_month: end,
            })
            .send()
            .await
            .map_err(|err| IntegrationError::new(SERVICE, err.to_string()))?;
        if !response.status().is_success() {
            return Err(IntegrationError::new(
                SERVICE,
                format!("income query returned status {}", response.status()),
            ));
        }
        let records: Vec<IncomeRecordDto> = response
            .json()
            .await
            .map_err(|err| IntegrationError::new(SERVICE, err.to_string()))?;
        Ok(records.into_iter().map(Into::into).collect())
    }
}

impl From<IncomeRecordDto> for RawIncomeRecord {
    fn from(dto: IncomeRecordDto) -> Self {
        let income_type = if dto.income_type == WAGE_INCOME_TYPE {
            IncomeType::Wage
        } else {
            IncomeType::Other
        };
        RawIncomeRecord {
            month: dto.month,
            employer_org: OrganizationNumber::new_unchecked(dto.org_number),
            income_type,
            amount: dto.amount,
        }
    }
}
