//! mbdata-core - Core traits and types for vehicle telemetry providers
//!
//! This crate provides the provider-independent vehicle model (data snapshots,
//! capabilities), the error taxonomy shared by every provider, and the
//! [`VehicleApi`] trait that provider sessions implement.

pub mod error;
pub mod models;
pub mod vehicle;

pub use error::{ApiError, ApiResult, DispatchOutcome};
pub use models::*;
pub use vehicle::VehicleApi;
