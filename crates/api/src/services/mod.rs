//! Clients for the external collaborators.
//!
//! Each client implements the corresponding domain contract over HTTP.

pub mod benefit_case;
pub mod dialog;
pub mod employer_portal;
pub mod income_source;

pub use benefit_case::BenefitCaseClient;
pub use dialog::DialogClient;
pub use employer_portal::EmployerNotificationClient;
pub use income_source::IncomeSourceClient;
