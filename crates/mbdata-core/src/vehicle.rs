//! VehicleApi trait - the core abstraction for telemetry providers

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::models::{AllCarData, Capabilities, CustomData, VehicleConfig, VehicleData};

/// A provider session for one vehicle.
///
/// Implementations own their token and catalog state; every method takes
/// `&mut self`, so a session is driven by exactly one poller at a time.
/// Callers that need to share a session across tasks must wrap it in a mutex.
#[async_trait]
pub trait VehicleApi: Send {
    /// What this provider can report
    fn capabilities(&self) -> &Capabilities;

    /// Static vehicle configuration
    fn config(&self) -> &VehicleConfig;

    /// First authentication of the session
    async fn login(&mut self) -> ApiResult<()>;

    /// Rotate the session tokens
    async fn refresh_login(&mut self) -> ApiResult<()>;

    /// Check whether the vehicle can currently be queried.
    ///
    /// Providers without a real sleep state answer this by any cheap call
    /// that proves the session works.
    async fn is_awake(&mut self) -> ApiResult<bool>;

    /// Odometer and lock status
    async fn get_vehicle_data(&mut self) -> ApiResult<VehicleData>;

    /// Provider specific extra fields
    async fn get_custom_data(&mut self) -> ApiResult<CustomData>;

    /// Gather a full snapshot, stopping at the first failing part
    async fn get_all_data(&mut self) -> ApiResult<AllCarData> {
        let vehicle = self.get_vehicle_data().await?;
        let custom = self.get_custom_data().await?;
        Ok(AllCarData { vehicle, custom })
    }
}
