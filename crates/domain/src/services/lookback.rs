//! Lookback window resolution for the income basis period.
//!
//! The statement basis is the average of three months of income preceding
//! the income basis date. Employers report a month's income by the 5th of
//! the following month, so months whose deadline has not passed cannot be
//! expected to be present; the window widens backwards to keep three usable
//! months available.

use chrono::{Datelike, NaiveDate};
use shared::month::CalendarMonth;

/// Day of the month on which the reporting deadline for the previous month
/// falls.
const REPORTING_DEADLINE_DAY: u32 = 5;

/// Months in the statement basis period.
const BASE_WINDOW_MONTHS: u32 = 3;

/// Resolved lookback window: how many months of raw income to request and
/// the inclusive month range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    pub months: u32,
    pub start: CalendarMonth,
    pub end: CalendarMonth,
}

/// True once the reporting deadline for `month` (the 5th of the following
/// month) lies strictly before `today`.
pub fn reporting_deadline_passed(month: CalendarMonth, today: NaiveDate) -> bool {
    let next = month.plus_months(1);
    let deadline = next
        .first_day()
        .with_day(REPORTING_DEADLINE_DAY)
        .expect("every month has a 5th day");
    today > deadline
}

/// Resolves the month range to request from the income source.
///
/// A person employed for only part of the basis period gets the unwidened
/// three months; the average is taken over the months that were actually
/// reported, so there is nothing to compensate for.
pub fn resolve_lookback(
    income_basis_date: NaiveDate,
    today: NaiveDate,
    continuously_employed: bool,
) -> LookbackWindow {
    let reference = CalendarMonth::from_date(income_basis_date);
    let months = if continuously_employed {
        widened_window(reference, today)
    } else {
        BASE_WINDOW_MONTHS
    };
    LookbackWindow {
        months,
        start: reference.minus_months(months),
        end: reference.minus_months(1),
    }
}

fn widened_window(reference: CalendarMonth, today: NaiveDate) -> u32 {
    let mut months = BASE_WINDOW_MONTHS;
    if !reporting_deadline_passed(reference.minus_months(1), today) {
        months += 1;
    }
    if !reporting_deadline_passed(reference.minus_months(2), today) {
        months += 1;
    }
    months
}
