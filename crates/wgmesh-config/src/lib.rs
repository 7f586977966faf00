//! Network definitions for wgmesh.
//!
//! A definition file is a JSON object mapping network names to a topology and
//! its members:
//!
//! ```json
//! {
//!   "home": {
//!     "type": "server-client",
//!     "server": { "identifier": "srv", "address": "10.0.0.1", "endpoint": "vpn.example.com:51820" },
//!     "clients": [ { "identifier": "laptop", "address": "10.0.0.2" } ]
//!   }
//! }
//! ```
//!
//! Every network must pass [`validate`] before keys or configurations are
//! generated for it.

#![forbid(unsafe_code)]

pub mod error;
mod types;
mod validation;

use std::path::Path;

pub use error::{ConfigError, ValidationError};
pub use types::{NetworkConfig, NetworkType, Networks, Peer};
pub use validation::{
    first_duplicate, is_unique, path_segment_problem, validate, validate_network_name,
};

/// Parses network definitions from a JSON string.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the input is not a JSON object of networks.
pub fn parse(json: &str) -> Result<Networks, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

/// Reads network definitions from a JSON file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not valid.
pub fn read(path: impl AsRef<Path>) -> Result<Networks, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let networks = parse(&contents)?;
    tracing::debug!(path = %path.display(), networks = networks.len(), "read network definitions");
    Ok(networks)
}
