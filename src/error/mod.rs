//! Error handling built on `thiserror` and `anyhow`.
//!
//! This module provides both domain-specific error types for precise error
//! handling and operational helpers for context and centralized reporting.

pub mod domain;
pub mod operational;

pub use {
    domain::{DeliveryError, PackageError, WatchError},
    operational::{ErrorReporter, ResultExt},
};
