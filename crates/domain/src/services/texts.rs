//! Texts shown in the employer notification and dialog systems.

use chrono::NaiveDate;
use shared::ident::OrganizationNumber;

use crate::models::request::{BenefitType, ClosureReason};

const DATE_FORMAT: &str = "%d.%m.%y";

/// Case and dialog title.
pub fn case_title(benefit_type: BenefitType) -> String {
    format!("Income statement for {}", benefit_type.display_name())
}

/// Secondary line under the case, reflecting why it is (being) closed.
pub fn secondary_text(reason: ClosureReason, first_absence_date: NaiveDate) -> String {
    let date = first_absence_date.format(DATE_FORMAT);
    match reason {
        ClosureReason::OrdinarySubmission => format!("For first absence date {date}"),
        ClosureReason::ExternalSubmission => format!(
            "Submitted through a payroll or HR system for first absence date {date}"
        ),
        ClosureReason::Expired => format!(
            "You no longer need to submit the income statement for first absence date {date}"
        ),
    }
}

/// The to-do line on the task itself.
pub fn task_text(benefit_type: BenefitType) -> String {
    format!("Submit income statement for {}", benefit_type.display_name())
}

/// External alert sent when the task is created, also used as its reminder.
pub fn task_alert_text(benefit_type: BenefitType, employer_org: &OrganizationNumber) -> String {
    format!(
        "Org no {}: One of your employees has applied for {} and an income statement is needed to process the application. Log in to the employer portal. If you submit through a payroll system you can continue doing so.",
        employer_org,
        benefit_type.display_name()
    )
}

/// Notice text for a caseworker-triggered reminder.
pub fn reminder_notice_text(benefit_type: BenefitType) -> String {
    format!(
        "We have not yet received the income statement. To process the application for {}, the income statement must be submitted as soon as possible.",
        benefit_type.display_name()
    )
}

/// External alert accompanying a caseworker-triggered reminder.
pub fn reminder_alert_text(benefit_type: BenefitType, employer_org: &OrganizationNumber) -> String {
    format!(
        "Org no {}: We have not yet received the income statement. To process the application for {}, the income statement must be submitted as soon as possible.",
        employer_org,
        benefit_type.display_name()
    )
}

pub fn receipt_first_submission_text() -> String {
    "Income statement received".to_string()
}

pub fn receipt_updated_text() -> String {
    "Updated income statement received".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_secondary_text_per_reason() {
        let first_absence = date(2024, 10, 15);
        assert_eq!(
            secondary_text(ClosureReason::OrdinarySubmission, first_absence),
            "For first absence date 15.10.24"
        );
        assert_eq!(
            secondary_text(ClosureReason::ExternalSubmission, first_absence),
            "Submitted through a payroll or HR system for first absence date 15.10.24"
        );
        assert_eq!(
            secondary_text(ClosureReason::Expired, first_absence),
            "You no longer need to submit the income statement for first absence date 15.10.24"
        );
    }

    #[test]
    fn test_date_format_uses_two_digit_year() {
        assert_eq!(
            secondary_text(ClosureReason::OrdinarySubmission, date(2025, 1, 2)),
            "For first absence date 02.01.25"
        );
    }

    #[test]
    fn test_case_title_names_the_benefit() {
        assert_eq!(
            case_title(BenefitType::ParentalBenefit),
            "Income statement for parental benefit"
        );
        assert_eq!(
            case_title(BenefitType::PregnancyBenefit),
            "Income statement for pregnancy benefit"
        );
    }

    #[test]
    fn test_task_alert_text_carries_org_number() {
        let org = OrganizationNumber::parse("111111111").unwrap();
        let text = task_alert_text(BenefitType::ParentalBenefit, &org);
        assert!(text.starts_with("Org no 111111111:"));
        assert!(text.contains("parental benefit"));
    }
}
