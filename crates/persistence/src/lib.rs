//! Persistence layer for the income statement backend.
//!
//! This crate contains:
//! - Database connection management
//! - The request entity row mapping
//! - The sqlx-backed request repository implementing the domain store
//!   contract

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
