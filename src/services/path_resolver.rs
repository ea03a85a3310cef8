//! Storage key derivation.
//!
//! Keys are partitioned by local date (`YYYYMMDD`). Uniqueness comes from the
//! clock reading only: epoch milliseconds for attribution data, a
//! second-resolution timestamp for events, a random UUID for raw uploads.
//! Two event calls for the same user within one second resolve to the same
//! key and the later write wins.

use crate::{
    models::{object_path::ObjectPath, request::Routing},
    services::clock::Stamp,
};

/// App id used when the caller sends none and no default is configured.
pub const UNKNOWN_APP_ID: &str = "unknown_app";

/// Deployment-level inputs of path resolution.
#[derive(Debug, Clone)]
pub struct ResolverDefaults {
    pub default_app_id: Option<String>,
    /// Top-level prefix of raw uploads.
    pub raw_prefix: String,
}

impl Default for ResolverDefaults {
    fn default() -> Self {
        Self {
            default_app_id: None,
            raw_prefix: "raw".into(),
        }
    }
}

/// Uppercase, then drop every `-`.
pub fn normalize_user_id(id: &str) -> String {
    id.to_uppercase().replace('-', "")
}

pub fn date_path(stamp: &Stamp) -> String {
    stamp.local.format("%Y%m%d").to_string()
}

/// Second-resolution token, `YYYYMMDDTHHMMSS`.
pub fn second_token(stamp: &Stamp) -> String {
    stamp.local.format("%Y%m%dT%H%M%S").to_string()
}

pub fn resolve_app_id(explicit: Option<&str>, defaults: &ResolverDefaults) -> String {
    explicit
        .filter(|id| !id.is_empty())
        .or(defaults.default_app_id.as_deref().filter(|id| !id.is_empty()))
        .unwrap_or(UNKNOWN_APP_ID)
        .to_string()
}

/// Compute the object key for a validated request.
pub fn resolve(routing: &Routing, stamp: &Stamp, defaults: &ResolverDefaults) -> ObjectPath {
    let date = date_path(stamp);
    match routing {
        Routing::Attribution {
            file_name,
            folder_prefix,
        } => ObjectPath::new(vec![
            folder_prefix.clone(),
            date,
            format!("{}_{}.json", file_name, stamp.epoch_millis),
        ]),
        Routing::Event {
            folder_prefix,
            user_pseudo_id,
            app_id,
        } => ObjectPath::new(vec![
            folder_prefix.clone(),
            date,
            resolve_app_id(app_id.as_deref(), defaults),
            format!("{}-{}.json", normalize_user_id(user_pseudo_id), second_token(stamp)),
        ]),
        Routing::Raw => ObjectPath::new(vec![
            defaults.raw_prefix.clone(),
            date,
            format!("{}.json", stamp.nonce),
        ]),
    }
}
