//! Resource catalog discovery and field extraction
//!
//! The provider exposes a different set of resources per vehicle and
//! subscription. Discovery lists them, extraction fetches each one.
//!
//! Discovery is gated by a fingerprint of the listing: the number of
//! top-level entries. This is a cheap stand-in for a content hash and is
//! knowingly imprecise: two listings with the same number of entries are
//! treated as identical, so a renamed resource is only picked up once the
//! entry count changes too.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::dispatch::RequestDispatcher;
use crate::endpoints::Endpoints;
use crate::json;
use crate::types::{ApiRequest, Dispatched};
use mbdata_core::{ApiError, ApiResult, CustomDataRecord};

/// Persisted discovery result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    /// Fingerprint of the last processed listing; `None` before the first one
    pub fingerprint: Option<usize>,
    /// Resource names in listing order
    pub fields: Vec<String>,
}

impl CatalogState {
    /// Field names joined with commas
    pub fn field_list(&self) -> String {
        self.fields.join(",")
    }
}

/// What a successful discovery did to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogUpdate {
    /// Fingerprint matched; field list left untouched
    Unchanged,
    /// Field list replaced with this many names
    Replaced(usize),
}

/// Discovered resource fields of one vehicle
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    state: CatalogState,
    schema_version: String,
}

impl ResourceCatalog {
    /// `schema_version` is the resource `version` the parser expects;
    /// other versions are logged but still processed.
    pub fn new(schema_version: impl Into<String>) -> Self {
        Self {
            state: CatalogState::default(),
            schema_version: schema_version.into(),
        }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn fields(&self) -> &[String] {
        &self.state.fields
    }

    pub fn is_empty(&self) -> bool {
        self.state.fields.is_empty()
    }

    /// Number of top-level entries of a listing
    pub fn fingerprint(listing: &Value) -> usize {
        match listing {
            Value::Array(entries) => entries.len(),
            Value::Object(members) => members.len(),
            _ => 0,
        }
    }

    /// List the vehicle's resources, retrying failed dispatches, and
    /// process the listing.
    ///
    /// `attempts` is the total number of dispatches before giving up.
    pub async fn discover(
        &mut self,
        dispatcher: &mut RequestDispatcher,
        endpoints: &Endpoints,
        attempts: u32,
        timeout: Duration,
    ) -> ApiResult<CatalogUpdate> {
        let listing = Self::fetch_listing(dispatcher, endpoints, attempts, timeout).await?;
        self.apply(&listing)
    }

    /// Fetch the raw resource listing, retrying failed dispatches.
    ///
    /// Errors are dispatch errors only; the listing itself is not inspected.
    /// A 204 answer yields `Value::Null`.
    #[instrument(skip(dispatcher, endpoints), fields(vin = %endpoints.vin()))]
    pub async fn fetch_listing(
        dispatcher: &mut RequestDispatcher,
        endpoints: &Endpoints,
        attempts: u32,
        timeout: Duration,
    ) -> ApiResult<Value> {
        let attempts = attempts.max(1);
        let mut attempt = 0;

        let reply = loop {
            attempt += 1;
            let request = ApiRequest::get(endpoints.resources()).with_timeout(timeout);
            match dispatcher.dispatch(request).await {
                Ok(reply) => break reply,
                Err(e) if attempt >= attempts => {
                    error!(attempt, error = %e, "Failed to get available resources");
                    return Err(e);
                }
                Err(e) => debug!(attempt, error = %e, "Resource listing failed, retrying"),
            }
        };

        Ok(reply.into_value())
    }

    /// Process a resource listing.
    ///
    /// Field names are replaced only when the fingerprint differs and at
    /// least one entry carries a `name`. A failed processing leaves the
    /// previous state (fingerprint included) in place.
    pub fn apply(&mut self, listing: &Value) -> ApiResult<CatalogUpdate> {
        let fingerprint = Self::fingerprint(listing);
        if self.state.fingerprint == Some(fingerprint) {
            debug!(fingerprint, "Resource listing unchanged, skipping processing");
            return Ok(CatalogUpdate::Unchanged);
        }
        debug!(fingerprint, "Resource listing changed, start processing");

        let entries: &[Value] = match listing {
            Value::Array(entries) => entries,
            Value::Null => &[],
            other => {
                error!("Resource listing is not an array");
                return Err(ApiError::MalformedResponse(format!(
                    "Expected resource array, got {}",
                    kind(other)
                )));
            }
        };

        let mut fields = Vec::new();
        let mut visited = 0;
        for (index, entry) in json::probe_entries(entries) {
            visited += 1;
            let members = match entry {
                Value::Object(members) => members,
                Value::Null => continue,
                other => {
                    error!(index, "Crashed during processing of resources");
                    return Err(ApiError::MalformedResponse(format!(
                        "Resource entry {} is {}, expected an object",
                        index,
                        kind(other)
                    )));
                }
            };

            if let Some(name) = members.get("name").filter(|v| !v.is_null()) {
                let name = json::as_text(name);
                if !name.is_empty() {
                    fields.push(name);
                }
            }

            if let Some(version) = members.get("version").filter(|v| !v.is_null()) {
                let version = json::as_text(version);
                if version != self.schema_version {
                    info!(
                        index,
                        "Found resource with another version ({}) than expected {}! Continuing but results may be wrong",
                        version,
                        self.schema_version
                    );
                }
            }
        }

        if fields.is_empty() {
            debug!(visited, "Found resource entries but none called name");
            error!("Unable to process list of available resources");
            return Err(ApiError::EmptyCatalog);
        }

        let count = fields.len();
        self.state = CatalogState {
            fingerprint: Some(fingerprint),
            fields,
        };
        info!("Found resource fields: {}", self.state.field_list());

        Ok(CatalogUpdate::Replaced(count))
    }

    /// Fetch every catalog field and collect the ones that carry a value.
    ///
    /// Best effort: a failing field is logged and skipped, the sweep goes on.
    #[instrument(skip(self, dispatcher, endpoints), fields(fields = self.state.fields.len()))]
    pub async fn extract_all(
        &self,
        dispatcher: &mut RequestDispatcher,
        endpoints: &Endpoints,
        timeout: Duration,
    ) -> Vec<CustomDataRecord> {
        let mut records = Vec::new();

        for (index, name) in self.state.fields.iter().enumerate() {
            let request = ApiRequest::get(endpoints.resource(name)).with_timeout(timeout);
            match dispatcher.dispatch(request).await {
                Ok(Dispatched::Body(body)) => match Self::record_from(index, name, &body) {
                    Some(record) => {
                        debug!(index, resource = %name, value = %record.value, "Got data for resource");
                        records.push(record);
                    }
                    None => debug!(resource = %name, "Resource reply carries no value"),
                },
                Ok(Dispatched::NoContent) => {
                    debug!(resource = %name, "Got empty data for resource");
                }
                Err(e) => {
                    warn!(resource = %name, error = %e, "Failed to retrieve data for resource");
                }
            }
        }

        records
    }

    /// Build a record from a resource reply of the form
    /// `{"<name>": {"value": ..., "timestamp": ...}}`
    pub fn record_from(index: usize, name: &str, body: &Value) -> Option<CustomDataRecord> {
        let resource = body.get(name).filter(|v| !json::is_empty(v))?;
        let value = resource.get("value")?;
        Some(CustomDataRecord::new(index, name, json::as_text(value)))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
