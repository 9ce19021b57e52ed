//! Vehicle snapshot and capability models

use serde::{Deserialize, Serialize};

use super::CustomData;

/// Static per-vehicle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Display name of the car (may be empty)
    pub car_name: String,
    /// Report distances in miles instead of kilometres
    pub unit_miles: bool,
    /// Distance unit label ("km" or "mi")
    pub distance_unit: String,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            car_name: String::new(),
            unit_miles: false,
            distance_unit: "km".to_string(),
        }
    }
}

/// What a provider integration is able to report or control
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub has_battery_level: bool,
    pub has_charge_command: bool,
    pub has_climate_command: bool,
    pub has_defrost_command: bool,
    pub has_inside_temp: bool,
    pub has_outside_temp: bool,
    /// Odometer reading available
    pub has_odo: bool,
    /// Door lock status available
    pub has_lock_status: bool,
    pub has_charge_limit: bool,
    /// Provider exposes a discoverable set of extra fields
    pub has_custom_data: bool,
    /// Minimum seconds between polls while the car sleeps (0 = no sleep state)
    pub sleep_interval: u32,
}

impl Capabilities {
    /// Capabilities of a status-only provider: odometer, lock status and
    /// custom fields, nothing to command.
    pub fn status_only() -> Self {
        Self {
            has_odo: true,
            has_lock_status: true,
            has_custom_data: true,
            ..Default::default()
        }
    }
}

/// Odometer and lock state of a vehicle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleData {
    /// Odometer in the provider's distance unit
    pub odo: f64,
    /// Whether any door is unlocked/open
    pub car_open: bool,
    /// Human readable lock status
    pub car_open_message: String,
}

/// Everything gathered during one polling cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllCarData {
    pub vehicle: VehicleData,
    pub custom: CustomData,
}
