//! Mercedes-Benz vehicle session
//!
//! [`MercedesVehicle`] implements [`VehicleApi`] on top of the
//! [`RequestDispatcher`] and the [`ResourceCatalog`].
//!
//! The provider has no real sleep state. "Awake" means the resource listing
//! could be fetched and processed, which doubles as catalog discovery.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument};

use crate::auth::AuthSession;
use crate::catalog::ResourceCatalog;
use crate::config::ClientConfig;
use crate::dispatch::RequestDispatcher;
use crate::endpoints::{Endpoints, CONTAINER_LOCK_STATUS, CONTAINER_PAY_AS_YOU_DRIVE};
use crate::json;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{ApiRequest, Credentials, Dispatched};
use mbdata_core::{
    ApiError, ApiResult, Capabilities, CustomData, VehicleApi, VehicleConfig, VehicleData,
};

const FIELD_LOCK_STATUS: &str = "doorlockstatusvehicle";
const FIELD_ODOMETER: &str = "odo";

/// Lock status values meaning the vehicle is locked
const LOCKED_VALUES: [&str; 2] = ["1", "2"];

const MESSAGE_OPEN: &str = "Your Mercedes is open";
const MESSAGE_LOCKED: &str = "Your Mercedes is locked";

/// Session for one vehicle of a Mercedes-Benz developer account
pub struct MercedesVehicle {
    dispatcher: RequestDispatcher,
    catalog: ResourceCatalog,
    endpoints: Endpoints,
    config: ClientConfig,
    vehicle_config: VehicleConfig,
    capabilities: Capabilities,
}

impl MercedesVehicle {
    /// Create a session talking HTTP through reqwest.
    ///
    /// `account` is the developer account identifier used for basic
    /// authentication at the token endpoint; `refresh_token` is the initial
    /// refresh token obtained out of band.
    pub fn new(
        account: &str,
        refresh_token: &str,
        vin: &str,
        config: ClientConfig,
    ) -> ApiResult<Self> {
        let transport = ReqwestTransport::new(config.connect_timeout())?;
        Self::with_transport(account, refresh_token, vin, config, Arc::new(transport))
    }

    /// Create a session on top of an arbitrary transport
    pub fn with_transport(
        account: &str,
        refresh_token: &str,
        vin: &str,
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> ApiResult<Self> {
        let endpoints = Endpoints::from_config(&config, vin)?;
        let auth = AuthSession::new(Credentials::new(account, vin), refresh_token, endpoints.token());
        let dispatcher = RequestDispatcher::new(transport, auth, config.request_timeout());
        let catalog = ResourceCatalog::new(config.schema_version.clone());

        Ok(Self {
            dispatcher,
            catalog,
            endpoints,
            config,
            vehicle_config: VehicleConfig::default(),
            capabilities: Capabilities::status_only(),
        })
    }

    /// Replace the static vehicle configuration
    pub fn with_vehicle_config(mut self, vehicle_config: VehicleConfig) -> Self {
        self.vehicle_config = vehicle_config;
        self
    }

    pub fn vin(&self) -> &str {
        self.endpoints.vin()
    }

    /// Current refresh token. Rotates on every successful refresh and must
    /// be persisted by the caller.
    pub fn refresh_token(&self) -> Option<&str> {
        self.dispatcher.auth().refresh_token()
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn get_container(&mut self, container: &str) -> ApiResult<Dispatched> {
        let request = ApiRequest::get(self.endpoints.container(container));
        let reply = self.dispatcher.dispatch(request).await;
        if let Err(e) = &reply {
            error!(container, error = %e, "Failed to get data");
        }
        reply
    }
}

/// Walk a container array and fold its fields into `data`.
///
/// Returns false when the body is not an array.
fn apply_container(body: &Value, data: &mut VehicleData) -> bool {
    let Some(entries) = body.as_array() else {
        return false;
    };

    for (_, entry) in json::probe_entries(entries) {
        let Some(members) = entry.as_object() else {
            continue;
        };
        apply_fields(members, data);
    }
    true
}

fn apply_fields(members: &Map<String, Value>, data: &mut VehicleData) {
    for (id, field) in members {
        if field.is_null() {
            continue;
        }
        debug!(field = %id, "Found non empty field");

        let Some(value) = field.get("value").filter(|v| !json::is_empty(v)) else {
            continue;
        };
        let value = json::as_text(value);

        match id.as_str() {
            FIELD_LOCK_STATUS => {
                debug!(value = %value, "DoorLockStatusVehicle has value");
                data.car_open = !LOCKED_VALUES.contains(&value.as_str());
                data.car_open_message = if data.car_open {
                    MESSAGE_OPEN.to_string()
                } else {
                    MESSAGE_LOCKED.to_string()
                };
            }
            FIELD_ODOMETER => {
                debug!(value = %value, "Odo has value");
                data.odo = value.trim().parse().unwrap_or(0.0);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl VehicleApi for MercedesVehicle {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn config(&self) -> &VehicleConfig {
        &self.vehicle_config
    }

    #[instrument(skip(self), fields(vin = %self.endpoints.vin()))]
    async fn login(&mut self) -> ApiResult<()> {
        info!("Attempting login");
        self.dispatcher.refresh().await?;
        info!("Login successful");
        Ok(())
    }

    #[instrument(skip(self), fields(vin = %self.endpoints.vin()))]
    async fn refresh_login(&mut self) -> ApiResult<()> {
        self.dispatcher.refresh().await
    }

    #[instrument(skip(self), fields(vin = %self.endpoints.vin()))]
    async fn is_awake(&mut self) -> ApiResult<bool> {
        let listing = ResourceCatalog::fetch_listing(
            &mut self.dispatcher,
            &self.endpoints,
            self.config.awake_attempts,
            self.config.awake_timeout(),
        )
        .await?;

        match self.catalog.apply(&listing) {
            Ok(update) => {
                debug!(?update, "Vehicle is awake");
                Ok(true)
            }
            Err(e) => {
                debug!(error = %e, "Resource listing yielded no usable fields");
                Ok(false)
            }
        }
    }

    #[instrument(skip(self), fields(vin = %self.endpoints.vin()))]
    async fn get_vehicle_data(&mut self) -> ApiResult<VehicleData> {
        let mut data = VehicleData::default();
        let mut any_success = false;
        let mut last_error = None;

        for container in [CONTAINER_LOCK_STATUS, CONTAINER_PAY_AS_YOU_DRIVE] {
            match self.get_container(container).await {
                Ok(Dispatched::NoContent) => any_success = true,
                Ok(Dispatched::Body(body)) => {
                    if apply_container(&body, &mut data) {
                        any_success = true;
                    } else {
                        error!(container, "Received data is not an array");
                        last_error = Some(ApiError::MalformedResponse(format!(
                            "Container {} is not an array",
                            container
                        )));
                    }
                }
                Err(e) => last_error = Some(e),
            }
        }

        if any_success {
            return Ok(data);
        }
        Err(last_error.unwrap_or_else(|| {
            ApiError::MalformedResponse("No vehicle data received".to_string())
        }))
    }

    #[instrument(skip(self), fields(vin = %self.endpoints.vin()))]
    async fn get_custom_data(&mut self) -> ApiResult<CustomData> {
        if !self.capabilities.has_custom_data {
            return Ok(CustomData::default());
        }

        let records = self
            .catalog
            .extract_all(
                &mut self.dispatcher,
                &self.endpoints,
                self.config.resource_timeout(),
            )
            .await;
        Ok(CustomData::from(records))
    }
}
