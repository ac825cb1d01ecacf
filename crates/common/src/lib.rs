//! Common types and utilities for Opflow
//!
//! This crate provides the value types that flow through the options
//! analytics pipeline, shared by every other crate in the workspace.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Shared domain types (Ticker, OptionSide, RawContract, etc.)

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
