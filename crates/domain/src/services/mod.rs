//! Domain services.

pub mod case_lookup;
pub mod coordinator;
pub mod income;
pub mod intake;
pub mod lifecycle;
pub mod lookback;
pub mod notification;
pub mod store;
pub mod texts;

pub use case_lookup::{BenefitCaseLookup, BenefitCaseStatus, CaseInfo};
pub use coordinator::{CaseHandles, CaseTaskCoordinator};
pub use income::{IncomeService, IncomeSource};
pub use intake::{EmployerInitiatedReason, StatementIntakeService, StatementSubmission};
pub use lifecycle::{
    CreateOutcome, ExpiryNotice, LifecycleConfig, ReminderOutcome, RequestLifecycleService,
};
pub use lookback::{resolve_lookback, LookbackWindow};
pub use notification::{DialogService, EmployerNotificationService};
pub use store::{InMemoryRequestStore, RequestStore};
