//! Shared value types for the income statement backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Identifier newtypes (organization number, actor id, case reference)
//! - Calendar month type with month arithmetic

pub mod ident;
pub mod month;
