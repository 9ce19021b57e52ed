//! Poll command - repeated polling cycles

use anyhow::{bail, Result};
use mbdata_client::{ApiError, MercedesVehicle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::persist_token;
use super::read::{cycle, print_data, Cycle};
use crate::config::TokenFile;
use crate::output::OutputContext;

/// Granularity of the Ctrl+C check while sleeping
const TICK: Duration = Duration::from_millis(100);

/// Run polling cycles until Ctrl+C or `count` cycles are done.
///
/// A failed cycle is reported and polling continues. After a rate limited
/// cycle the next sleep is doubled.
pub async fn poll(
    vehicle: &mut MercedesVehicle,
    token_file: &mut TokenFile,
    interval: Duration,
    count: Option<u32>,
    ctx: &OutputContext,
) -> Result<()> {
    ctx.info(&format!(
        "Polling vehicle {} every {}s",
        vehicle.vin(),
        interval.as_secs()
    ));
    ctx.info("Press Ctrl+C to stop");

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut done = 0u32;
    while running.load(Ordering::SeqCst) {
        let result = cycle(vehicle).await;
        persist_token(vehicle, token_file)?;
        done += 1;

        let mut pause = interval;
        match result {
            Ok(Cycle::Data(data)) => print_data(vehicle, &data, ctx),
            Ok(Cycle::Asleep) => ctx.warn("Vehicle reports no resources"),
            Err(ApiError::RateLimited) => {
                pause = next_pause(interval, true);
                ctx.warn(&format!(
                    "Rate limited, backing off for {}s",
                    pause.as_secs()
                ));
            }
            Err(ApiError::NoCredentials) => {
                bail!("Session lost its credentials, login again with a fresh refresh token");
            }
            Err(e) => ctx.error(&format!("Cycle failed: {}", e)),
        }

        if count.is_some_and(|n| done >= n) {
            break;
        }
        sleep_while_running(pause, &running).await;
    }

    ctx.info(&format!("Stopped after {} cycle(s)", done));
    Ok(())
}

fn next_pause(interval: Duration, rate_limited: bool) -> Duration {
    if rate_limited {
        interval.saturating_mul(2)
    } else {
        interval
    }
}

async fn sleep_while_running(duration: Duration, running: &AtomicBool) {
    let deadline = tokio::time::Instant::now() + duration;
    while running.load(Ordering::SeqCst) && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(TICK).await;
    }
}
