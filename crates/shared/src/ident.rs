//! Identifier newtypes with format validation and log masking.
//!
//! Organization numbers and actor ids are personal/business identifiers;
//! their `Debug` output is masked to the last four characters so entities
//! can be logged without leaking them. `Display` is the full value for
//! wire formats.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref ORGANIZATION_NUMBER_RE: Regex =
        Regex::new(r"^\d{9}$").expect("valid organization number regex");
    static ref ACTOR_ID_RE: Regex = Regex::new(r"^\d{13}$").expect("valid actor id regex");
    static ref CASE_REF_RE: Regex =
        Regex::new(r"^[A-Za-z0-9]{1,19}$").expect("valid case reference regex");
}

/// Invalid identifier format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentError {
    #[error("organization number must be exactly 9 digits")]
    InvalidOrganizationNumber,

    #[error("actor id must be exactly 13 digits")]
    InvalidActorId,

    #[error("case reference must be 1-19 alphanumeric characters")]
    InvalidCaseRef,
}

/// Masks an identifier to its last four characters.
pub fn mask(id: &str) -> String {
    let length = id.chars().count();
    if length <= 4 {
        return "*".repeat(length);
    }
    let masked: String = "*".repeat(length - 4);
    let tail: String = id.chars().skip(length - 4).collect();
    masked + &tail
}

/// A 9-digit employer organization number.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationNumber(String);

impl OrganizationNumber {
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentError> {
        let value = value.into();
        if ORGANIZATION_NUMBER_RE.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(IdentError::InvalidOrganizationNumber)
        }
    }

    /// Wraps an already-validated value, e.g. one read back from storage.
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for OrganizationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask(&self.0))
    }
}

/// A 13-digit person actor id.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentError> {
        let value = value.into();
        if ACTOR_ID_RE.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(IdentError::InvalidActorId)
        }
    }

    /// Wraps an already-validated value, e.g. one read back from storage.
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask(&self.0))
    }
}

/// Benefit case reference in the ordering case system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseRef(String);

impl CaseRef {
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentError> {
        let value = value.into();
        if CASE_REF_RE.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(IdentError::InvalidCaseRef)
        }
    }

    /// Wraps an already-validated value, e.g. one read back from storage.
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
