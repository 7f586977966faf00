//! Error types for reading and validating network definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a definition file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("could not read {}", .path.display())]
    Io {
        /// Path of the definition file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid network definition.
    #[error("could not parse network definitions as JSON")]
    Parse(#[from] serde_json::Error),
}

/// Reasons a network definition is internally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The network type is neither `server-client` nor `full-mesh`.
    #[error("network configuration type must be \"server-client\" or \"full-mesh\", got {found:?}")]
    InvalidType {
        /// The type string found in the definition.
        found: String,
    },

    /// A server-client network lacks one of the server's required fields.
    #[error(
        "server-client configuration must have a server with identifier, address, and endpoint (missing {})",
        .missing.join(", ")
    )]
    IncompleteServer {
        /// Names of the empty fields.
        missing: Vec<&'static str>,
    },

    /// Two members share a tunnel address.
    #[error("addresses must be unique: {address} is used more than once")]
    DuplicateAddress {
        /// The repeated address.
        address: String,
    },

    /// Two members share an identifier.
    #[error("identifiers must be unique: {identifier:?} is used more than once")]
    DuplicateIdentifier {
        /// The repeated identifier.
        identifier: String,
    },

    /// A member identifier cannot be used as a file name.
    #[error("identifier {identifier:?} {reason}")]
    UnsafeIdentifier {
        /// The rejected identifier.
        identifier: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A network name cannot be used as a directory name.
    #[error("network name {name:?} {reason}")]
    UnsafeNetworkName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}
