//! Login command - exchange and rotate the refresh token

use anyhow::Result;
use mbdata_client::MercedesVehicle;

use crate::output::OutputContext;

/// Report the session established by `main`
pub fn login(vehicle: &MercedesVehicle, ctx: &OutputContext) -> Result<()> {
    ctx.success(&format!("Logged in for vehicle {}", vehicle.vin()));
    ctx.print_kv(&[
        ("vin", vehicle.vin().to_string()),
        ("authenticated", vehicle.dispatcher().auth().is_authenticated().to_string()),
    ]);
    Ok(())
}
