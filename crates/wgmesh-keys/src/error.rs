//! Error types for key material.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors decoding a `WireGuard` key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyFormatError {
    /// Invalid base64 encoding.
    #[error("invalid base64 encoding: {0}")]
    InvalidBase64(String),

    /// Invalid key length.
    #[error("invalid key length: expected 32, got {0}")]
    InvalidKeyLength(usize),
}

/// Errors raised by a keypair primitive.
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// The external program could not be started.
    #[error("could not run {program}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The external program exited unsuccessfully.
    #[error("{program} {subcommand} exited with {}: {stderr}", .code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    NonZeroExit {
        /// Program that was invoked.
        program: String,
        /// Subcommand passed to the program.
        subcommand: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The external program did not finish in time and was killed.
    #[error("{program} {subcommand} did not finish within {timeout:?}")]
    TimedOut {
        /// Program that was invoked.
        program: String,
        /// Subcommand passed to the program.
        subcommand: String,
        /// The configured limit.
        timeout: Duration,
    },

    /// Exchanging data with the external program failed.
    #[error("I/O error talking to key generator: {0}")]
    Io(#[from] std::io::Error),

    /// The primitive produced or received malformed key material.
    #[error("malformed key material: {0}")]
    InvalidKey(#[from] KeyFormatError),
}

/// Stable classification of a [`KeyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyErrorKind {
    /// No key file exists for the identity.
    KeyNotFound,
    /// The keypair primitive failed.
    PrimitiveFailure,
    /// Reading or writing key files failed.
    PersistenceFailure,
    /// The network name or identifier cannot address a key location.
    InvalidIdentity,
}

/// Errors from the key store, always tagged with the identity involved.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No key file exists at the expected location.
    #[error("no key for {network} > {identifier} at {}", .path.display())]
    KeyNotFound {
        /// Network name.
        network: String,
        /// Member identifier.
        identifier: String,
        /// Expected key file.
        path: PathBuf,
    },

    /// The keypair primitive failed.
    #[error("could not generate keys for {network} > {identifier}")]
    PrimitiveFailure {
        /// Network name.
        network: String,
        /// Member identifier.
        identifier: String,
        /// Primitive error.
        #[source]
        source: PrimitiveError,
    },

    /// A key file or directory could not be read or written.
    #[error("could not persist keys for {network} > {identifier} at {}", .path.display())]
    PersistenceFailure {
        /// Network name.
        network: String,
        /// Member identifier.
        identifier: String,
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The identity cannot be used as a key location.
    #[error("invalid key identity {network} > {identifier}: {reason}")]
    InvalidIdentity {
        /// Network name.
        network: String,
        /// Member identifier.
        identifier: String,
        /// Why the identity was rejected.
        reason: &'static str,
    },
}

impl KeyError {
    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> KeyErrorKind {
        match self {
            Self::KeyNotFound { .. } => KeyErrorKind::KeyNotFound,
            Self::PrimitiveFailure { .. } => KeyErrorKind::PrimitiveFailure,
            Self::PersistenceFailure { .. } => KeyErrorKind::PersistenceFailure,
            Self::InvalidIdentity { .. } => KeyErrorKind::InvalidIdentity,
        }
    }

    /// Returns the `(network, identifier)` the error is about.
    #[must_use]
    pub fn identity(&self) -> (&str, &str) {
        match self {
            Self::KeyNotFound { network, identifier, .. }
            | Self::PrimitiveFailure { network, identifier, .. }
            | Self::PersistenceFailure { network, identifier, .. }
            | Self::InvalidIdentity { network, identifier, .. } => (network, identifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn non_zero_exit_display() {
        let err = PrimitiveError::NonZeroExit {
            program: "wg".into(),
            subcommand: "pubkey".into(),
            code: Some(1),
            stderr: "Key is not the correct length or format".into(),
        };
        assert_eq!(
            err.to_string(),
            "wg pubkey exited with code 1: Key is not the correct length or format"
        );
    }

    #[test]
    fn primitive_failure_keeps_source() {
        let err = KeyError::PrimitiveFailure {
            network: "home".into(),
            identifier: "laptop".into(),
            source: PrimitiveError::Io(std::io::Error::other("pipe closed")),
        };
        assert_eq!(err.kind(), KeyErrorKind::PrimitiveFailure);
        assert_eq!(err.identity(), ("home", "laptop"));
        assert!(err.to_string().contains("home > laptop"));
        assert!(err.source().is_some());
    }
}
