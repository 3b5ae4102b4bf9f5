//! Topology Probes common DTOs and errors.
//!
//! This crate provides the types shared by every probe crate:
//! - Account-definition metadata and credential maps
//! - Discovery, validation, and action responses
//! - The unified probe error type

pub mod account;
pub mod error;
pub mod response;

pub use account::{AccountDefinitionEntry, AccountValues, FieldKind};
pub use error::{Error, Result};
pub use response::{
    ActionResult, ActionState, DiscoveryResponse, ErrorSeverity, ProbeError, ValidationResponse,
};
