//! Mercedes-Benz Vehicle Data Client Library
//!
//! Session layer for the Mercedes-Benz vehicle data API: OAuth2 refresh-token
//! lifecycle, request dispatch with the provider's status policy, and
//! discovery/extraction of the per-vehicle resource catalog.
//!
//! # Example
//!
//! ```rust,no_run
//! use mbdata_client::{ClientConfig, MercedesVehicle, VehicleApi};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut vehicle = MercedesVehicle::new(
//!         "my-client-id:my-client-secret",
//!         "initial-refresh-token",
//!         "WDD1234567890",
//!         ClientConfig::default(),
//!     )?;
//!
//!     vehicle.login().await?;
//!
//!     // The refresh token rotates; persist it before anything else
//!     if let Some(token) = vehicle.refresh_token() {
//!         std::fs::write("refresh_token", token)?;
//!     }
//!
//!     if vehicle.is_awake().await? {
//!         let data = vehicle.get_all_data().await?;
//!         println!("odo: {}", data.vehicle.odo);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module runs an in-process mock of the provider:
//!
//! ```rust,ignore
//! use mbdata_client::testing::MockProvider;
//!
//! let provider = MockProvider::start("VIN123", "initial-token").await?;
//! let mut vehicle = MercedesVehicle::new("account", "initial-token", "VIN123", provider.config())?;
//! ```

pub mod auth;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod endpoints;
mod json;
pub mod testing;
pub mod transport;
mod types;
mod vehicle;

pub use auth::AuthSession;
pub use catalog::{CatalogState, CatalogUpdate, ResourceCatalog};
pub use config::ClientConfig;
pub use dispatch::RequestDispatcher;
pub use endpoints::Endpoints;
pub use types::*;
pub use vehicle::MercedesVehicle;

// Re-export core types for convenience
pub use mbdata_core::{
    AllCarData, ApiError, ApiResult, Capabilities, CustomData, CustomDataRecord,
    DispatchOutcome, VehicleApi, VehicleConfig, VehicleData,
};
