//! Provider endpoint construction
//!
//! Base URLs may carry a path prefix (e.g. a reverse proxy at
//! `https://host/mb`); endpoint paths are appended to it.

use url::Url;

use crate::config::ClientConfig;
use mbdata_core::{ApiError, ApiResult};

/// OAuth token exchange path
pub const TOKEN_PATH: &str = "/oidc10/auth/oauth/v2/token";
/// Vehicle data API root
pub const VEHICLES_PATH: &str = "/vehicledata/v1/vehicles";

/// Container with lock status values
pub const CONTAINER_LOCK_STATUS: &str = "vehiclelockstatus";
/// Container with odometer values
pub const CONTAINER_PAY_AS_YOU_DRIVE: &str = "payasyoudrive";

/// Endpoint URLs for one vehicle
#[derive(Debug, Clone)]
pub struct Endpoints {
    auth_base: Url,
    api_base: Url,
    vin: String,
}

impl Endpoints {
    pub fn new(auth_url: &str, api_url: &str, vin: &str) -> ApiResult<Self> {
        Ok(Self {
            auth_base: parse_base("auth", auth_url)?,
            api_base: parse_base("API", api_url)?,
            vin: vin.to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig, vin: &str) -> ApiResult<Self> {
        Self::new(&config.auth_url, &config.api_url, vin)
    }

    pub fn vin(&self) -> &str {
        &self.vin
    }

    /// `{auth}/oidc10/auth/oauth/v2/token`
    pub fn token(&self) -> Url {
        join(&self.auth_base, path_segments(TOKEN_PATH))
    }

    /// `{api}/vehicledata/v1/vehicles/{vin}/resources`
    pub fn resources(&self) -> Url {
        self.vehicle_url(&["resources"])
    }

    /// `{api}/vehicledata/v1/vehicles/{vin}/resources/{name}`
    pub fn resource(&self, name: &str) -> Url {
        self.vehicle_url(&["resources", name])
    }

    /// `{api}/vehicledata/v1/vehicles/{vin}/containers/{container}`
    pub fn container(&self, container: &str) -> Url {
        self.vehicle_url(&["containers", container])
    }

    fn vehicle_url(&self, tail: &[&str]) -> Url {
        let segments = path_segments(VEHICLES_PATH)
            .chain(std::iter::once(self.vin.as_str()))
            .chain(tail.iter().copied());
        join(&self.api_base, segments)
    }
}

fn parse_base(kind: &str, url: &str) -> ApiResult<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| ApiError::Config(format!("Invalid {} URL '{}': {}", kind, url, e)))?;
    if parsed.cannot_be_a_base() {
        return Err(ApiError::Config(format!(
            "Invalid {} URL '{}': not a base URL",
            kind, url
        )));
    }
    Ok(parsed)
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Append escaped segments to the base path, dropping query and fragment
fn join<'a>(base: &Url, segments: impl Iterator<Item = &'a str>) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    // parse_base rejects cannot-be-a-base URLs, so this always succeeds
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty();
        path.extend(segments);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::from_config(&ClientConfig::default(), "WDD1234567890").unwrap()
    }

    #[test]
    fn test_token_url() {
        assert_eq!(
            endpoints().token().as_str(),
            "https://api.secure.mercedes-benz.com/oidc10/auth/oauth/v2/token"
        );
    }

    #[test]
    fn test_vehicle_urls() {
        let e = endpoints();
        assert_eq!(
            e.resources().as_str(),
            "https://api.mercedes-benz.com/vehicledata/v1/vehicles/WDD1234567890/resources"
        );
        assert_eq!(
            e.resource("odo").as_str(),
            "https://api.mercedes-benz.com/vehicledata/v1/vehicles/WDD1234567890/resources/odo"
        );
        assert_eq!(
            e.container(CONTAINER_LOCK_STATUS).as_str(),
            "https://api.mercedes-benz.com/vehicledata/v1/vehicles/WDD1234567890/containers/vehiclelockstatus"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        for base in ["https://proxy.example.com/mb", "https://proxy.example.com/mb/"] {
            let e = Endpoints::new(base, base, "VIN").unwrap();
            assert_eq!(
                e.token().as_str(),
                "https://proxy.example.com/mb/oidc10/auth/oauth/v2/token"
            );
            assert_eq!(
                e.resources().as_str(),
                "https://proxy.example.com/mb/vehicledata/v1/vehicles/VIN/resources"
            );
        }
    }

    #[test]
    fn test_segment_is_escaped() {
        let e = endpoints();
        assert!(e.resource("a/b").as_str().ends_with("/resources/a%2Fb"));
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        assert!(matches!(
            Endpoints::new("not a url", "https://api.mercedes-benz.com", "VIN"),
            Err(ApiError::Config(_))
        ));
        assert!(matches!(
            Endpoints::new("https://api.secure.mercedes-benz.com", "mailto:x@example.com", "VIN"),
            Err(ApiError::Config(_))
        ));
    }
}
