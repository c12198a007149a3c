//! Income month models for the statement pre-fill.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ident::OrganizationNumber;
use shared::month::CalendarMonth;

/// Provenance of one month in the computed income basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyWageStatus {
    /// Reported by the employer and counted in the average.
    UsedInAverage,
    /// Not reported although the deadline has passed; counted as zero.
    NotReportedButUsedInAverage,
    /// Not reported and the reporting deadline has not passed yet.
    NotReportedDeadlineNotPassed,
    /// Not reported because the employment did not cover the month.
    NotReportedNewHire,
    /// The income source was unavailable; nothing is known about the month.
    SourceOutage,
}

/// Income type reported by the source system. Only wage income counts
/// towards the statement basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeType {
    Wage,
    Other,
}

/// One raw record from the income source: one income type in one month for
/// one employer. A month can have several records.
#[derive(Debug, Clone, PartialEq)]
pub struct RawIncomeRecord {
    pub month: CalendarMonth,
    pub employer_org: OrganizationNumber,
    pub income_type: IncomeType,
    pub amount: Option<Decimal>,
}

/// One month presented to the employer, with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeMonth {
    pub month: CalendarMonth,
    pub amount: Option<Decimal>,
    pub status: MonthlyWageStatus,
}

/// Result of the income computation: the tagged months and the rounded
/// monthly average. `average` is `None` only when the income source was
/// unavailable; a computed zero is `Some(0.00)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeSummary {
    pub average: Option<Decimal>,
    pub employer_org: OrganizationNumber,
    pub months: Vec<IncomeMonth>,
}
