//! Resources command - discover the vehicle's resource catalog

use anyhow::{bail, Result};
use mbdata_client::{MercedesVehicle, VehicleApi};

use crate::output::{FieldRow, OutputContext};

pub async fn resources(vehicle: &mut MercedesVehicle, ctx: &OutputContext) -> Result<()> {
    if !vehicle.is_awake().await? {
        bail!("No usable resources found for vehicle {}", vehicle.vin());
    }

    let rows: Vec<FieldRow> = vehicle
        .catalog()
        .fields()
        .iter()
        .enumerate()
        .map(|(index, name)| FieldRow {
            index,
            name: name.clone(),
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}
