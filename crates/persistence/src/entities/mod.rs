//! Database entity definitions.

pub mod request;

pub use request::{BenefitTypeDb, RequestEntity, RequestKindDb, RequestStatusDb};
