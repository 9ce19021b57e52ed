//! Read command - one full polling cycle

use anyhow::Result;
use mbdata_client::{AllCarData, ApiResult, MercedesVehicle, VehicleApi};

use crate::output::{OutputContext, OutputFormat, RecordRow};

/// Result of one polling cycle
pub enum Cycle {
    /// Resource listing yielded nothing usable
    Asleep,
    Data(AllCarData),
}

/// Awake check followed by a full snapshot
pub async fn cycle(vehicle: &mut MercedesVehicle) -> ApiResult<Cycle> {
    if !vehicle.is_awake().await? {
        return Ok(Cycle::Asleep);
    }
    Ok(Cycle::Data(vehicle.get_all_data().await?))
}

pub async fn read(vehicle: &mut MercedesVehicle, ctx: &OutputContext) -> Result<()> {
    match cycle(vehicle).await? {
        Cycle::Asleep => ctx.warn(&format!("Vehicle {} reports no resources", vehicle.vin())),
        Cycle::Data(data) => print_data(vehicle, &data, ctx),
    }
    Ok(())
}

/// Print a snapshot in the configured format
pub fn print_data(vehicle: &MercedesVehicle, data: &AllCarData, ctx: &OutputContext) {
    if ctx.format == OutputFormat::Json {
        ctx.print_json(data);
        return;
    }

    let unit = &vehicle.config().distance_unit;
    ctx.print_kv(&[
        ("vin", vehicle.vin().to_string()),
        ("odometer", format!("{} {}", data.vehicle.odo, unit)),
        ("status", data.vehicle.car_open_message.clone()),
    ]);

    let rows: Vec<RecordRow> = data.custom.records.iter().map(RecordRow::from).collect();
    ctx.print(&rows);
}
