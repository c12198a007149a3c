//! Income retrieval and three-month average computation.
//!
//! Merges the raw records from the income source into per-month totals,
//! fills months the employer has not reported, trims months the window
//! over-requested, tags every month with its provenance and computes the
//! rounded monthly average used to pre-fill the statement.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use shared::ident::{ActorId, OrganizationNumber};
use shared::month::CalendarMonth;
use tracing::warn;

use crate::error::{DomainError, IntegrationError};
use crate::models::income::{
    IncomeMonth, IncomeSummary, IncomeType, MonthlyWageStatus, RawIncomeRecord,
};
use crate::services::lookback::{reporting_deadline_passed, resolve_lookback};

/// Source of raw monthly income figures.
#[async_trait]
pub trait IncomeSource: Send + Sync {
    async fn fetch_monthly_income(
        &self,
        actor_id: &ActorId,
        start: CalendarMonth,
        end: CalendarMonth,
    ) -> Result<Vec<RawIncomeRecord>, IntegrationError>;
}

/// Computes the income basis shown to the employer.
pub struct IncomeService {
    source: Arc<dyn IncomeSource>,
}

impl IncomeService {
    pub fn new(source: Arc<dyn IncomeSource>) -> Self {
        Self { source }
    }

    /// The tagged month list and rounded average for one employment.
    ///
    /// `today` is passed in rather than read from the clock so deadline
    /// behavior is testable.
    pub async fn income_summary(
        &self,
        actor_id: &ActorId,
        employer_org: &OrganizationNumber,
        income_basis_date: NaiveDate,
        today: NaiveDate,
        continuously_employed: bool,
    ) -> Result<IncomeSummary, DomainError> {
        let window = resolve_lookback(income_basis_date, today, continuously_employed);
        let records = match self
            .source
            .fetch_monthly_income(actor_id, window.start, window.end)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                // Downtime in the income source is not a reason to block the
                // employer; show empty months and no average instead.
                warn!(error = %err, "income source unavailable, returning outage months");
                return Ok(outage_summary(income_basis_date, employer_org));
            }
        };

        let merged = merge_monthly_totals(records, employer_org);
        let filled = fill_missing_months(merged, window.start, window.end);
        let trimmed = trim_surplus_months(filled);
        let months = tag_months(trimmed, today, continuously_employed);
        let average = compute_average(&months, continuously_employed)?;

        Ok(IncomeSummary {
            average: Some(average),
            employer_org: employer_org.clone(),
            months,
        })
    }
}

/// Sums the qualifying wage records for the target employer into one total
/// per month. Months without any qualifying record are absent.
fn merge_monthly_totals(
    records: Vec<RawIncomeRecord>,
    employer_org: &OrganizationNumber,
) -> BTreeMap<CalendarMonth, Decimal> {
    let mut totals: BTreeMap<CalendarMonth, Decimal> = BTreeMap::new();
    for record in records {
        if record.employer_org != *employer_org || record.income_type != IncomeType::Wage {
            continue;
        }
        if let Some(amount) = record.amount {
            *totals.entry(record.month).or_insert(Decimal::ZERO) += amount;
        }
    }
    totals
}

/// Adds a null entry for every window month the employer has not reported.
fn fill_missing_months(
    totals: BTreeMap<CalendarMonth, Decimal>,
    start: CalendarMonth,
    end: CalendarMonth,
) -> Vec<(CalendarMonth, Option<Decimal>)> {
    let mut months: BTreeMap<CalendarMonth, Option<Decimal>> =
        totals.into_iter().map(|(month, sum)| (month, Some(sum))).collect();
    for month in start.through(end) {
        months.entry(month).or_insert(None);
    }
    months.into_iter().collect()
}

/// Drops months the window over-requested.
///
/// If the three most recent months are all reported, exactly those three
/// make up the basis. Otherwise, when more than three months carry income
/// the oldest surplus months are dropped; sparse data legitimately keeps
/// the full window.
fn trim_surplus_months(
    months: Vec<(CalendarMonth, Option<Decimal>)>,
) -> Vec<(CalendarMonth, Option<Decimal>)> {
    if months.len() >= 3 {
        let most_recent = &months[months.len() - 3..];
        if most_recent.iter().all(|(_, amount)| amount.is_some()) {
            return most_recent.to_vec();
        }
    }
    let reported = months.iter().filter(|(_, amount)| amount.is_some()).count();
    if reported > 3 {
        months[reported - 3..].to_vec()
    } else {
        months
    }
}

fn tag_months(
    months: Vec<(CalendarMonth, Option<Decimal>)>,
    today: NaiveDate,
    continuously_employed: bool,
) -> Vec<IncomeMonth> {
    months
        .into_iter()
        .map(|(month, amount)| {
            let status = match amount {
                Some(_) => MonthlyWageStatus::UsedInAverage,
                None if !continuously_employed => MonthlyWageStatus::NotReportedNewHire,
                None if reporting_deadline_passed(month, today) => {
                    MonthlyWageStatus::NotReportedButUsedInAverage
                }
                None => MonthlyWageStatus::NotReportedDeadlineNotPassed,
            };
            IncomeMonth {
                month,
                amount,
                status,
            }
        })
        .collect()
}

fn compute_average(
    months: &[IncomeMonth],
    continuously_employed: bool,
) -> Result<Decimal, DomainError> {
    let reported = months.iter().filter(|m| m.amount.is_some()).count();
    if reported > 3 {
        return Err(DomainError::invariant(
            "AVERAGED_MONTHS_EXCEEDED",
            format!("mapped {reported} reported months into the average, trimming must leave at most 3: {months:?}"),
        ));
    }

    let total: Decimal = months.iter().filter_map(|m| m.amount).sum();
    // A correction month can push the total below zero; the statement never
    // shows a negative wage.
    let total = total.max(Decimal::ZERO);

    // Someone employed for part of the period is averaged over the months
    // that were actually reported.
    let denominator = if continuously_employed { 3 } else { reported as u32 };
    if denominator == 0 {
        return Ok(Decimal::ZERO);
    }
    Ok((total / Decimal::from(denominator))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
}

/// The degraded result when the income source is down: the three months
/// before the basis date, nothing known about any of them.
fn outage_summary(income_basis_date: NaiveDate, employer_org: &OrganizationNumber) -> IncomeSummary {
    let reference = CalendarMonth::from_date(income_basis_date);
    let months = (1..=3)
        .rev()
        .map(|i| IncomeMonth {
            month: reference.minus_months(i),
            amount: None,
            status: MonthlyWageStatus::SourceOutage,
        })
        .collect();
    IncomeSummary {
        average: None,
        employer_org: employer_org.clone(),
        months,
    }
}
