//! Key-by-key overlay of persisted values onto the default record.

use crate::{Config, ConfigError};
use log::debug;
use serde_json::{Map, Value};

/// Apply each known key of `persisted` over the defaults.
///
/// Unknown keys are ignored and a key whose value does not decode keeps its
/// default, so one bad field never discards the rest of the file.
pub(super) fn overlay_onto_defaults(persisted: &Map<String, Value>) -> Result<Config, ConfigError> {
    let mut merged = serde_json::to_value(Config::default())?;
    for (key, value) in persisted {
        let Value::Object(current) = &merged else {
            return Err(ConfigError::NotAnObject);
        };
        if !current.contains_key(key) {
            debug!("ignoring unknown settings key (key={})", key);
            continue;
        }
        let mut candidate = merged.clone();
        candidate[key.as_str()] = value.clone();
        if serde_json::from_value::<Config>(candidate.clone()).is_ok() {
            merged = candidate;
        } else {
            debug!("keeping default for undecodable settings key (key={})", key);
        }
    }
    Ok(serde_json::from_value(merged)?)
}
