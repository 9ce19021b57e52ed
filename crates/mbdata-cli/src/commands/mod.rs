//! Command implementations for mbdata

pub mod login;
pub mod poll;
pub mod read;
pub mod resources;

pub use login::login;
pub use poll::poll;
pub use read::read;
pub use resources::resources;

use anyhow::Result;
use mbdata_client::MercedesVehicle;

use crate::config::TokenFile;

/// Store the session's current refresh token.
///
/// A session whose tokens were cleared by a failed refresh keeps the file
/// untouched.
pub fn persist_token(vehicle: &MercedesVehicle, token_file: &mut TokenFile) -> Result<()> {
    match vehicle.refresh_token() {
        Some(token) => token_file.save(token),
        None => {
            tracing::warn!(
                path = %token_file.path().display(),
                "Session holds no refresh token, token file left unchanged"
            );
            Ok(())
        }
    }
}
