//! Error types for configuration generation.

use std::path::PathBuf;

use thiserror::Error;
use wgmesh_keys::KeyError;

/// Errors raised while rendering a template.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template file could not be read.
    #[error("could not read template {}", .path.display())]
    Io {
        /// Template path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The template refers to a variable that does not exist.
    #[error("unknown template variable {{{{{name}}}}}")]
    UnknownVariable {
        /// Variable name.
        name: String,
    },

    /// The template opens a section that does not exist.
    #[error("unknown template section {{{{#{name}}}}}")]
    UnknownSection {
        /// Section name.
        name: String,
    },

    /// A section is opened but never closed.
    #[error("template section {{{{#{name}}}}} is never closed")]
    UnclosedSection {
        /// Section name.
        name: String,
    },

    /// A section is closed without having been opened.
    #[error("template closes section {{{{/{name}}}}} that was never opened")]
    UnexpectedClose {
        /// Section name.
        name: String,
    },
}

/// Stable classification of a [`GenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenErrorKind {
    /// The network type cannot be generated.
    InvalidTopology,
    /// Allow-all routing was requested with a peer count other than one.
    InvalidAllowAllRouting,
    /// A key needed by an artifact is missing or unreadable.
    KeyLookup,
    /// The renderer failed.
    RenderFailure,
    /// The artifact could not be written.
    PersistenceFailure,
}

/// Errors from generating a network's artifacts.
#[derive(Debug, Error)]
pub enum GenError {
    /// The network type is neither server-client nor full-mesh.
    #[error("network {network} has unsupported type {found:?}")]
    InvalidTopology {
        /// Network name.
        network: String,
        /// Type string of the network.
        found: String,
    },

    /// Allow-all routing is only meaningful through exactly one peer.
    #[error("can not allow all IPs through {peers} peers ({network} > {identifier})")]
    InvalidAllowAllRouting {
        /// Network name.
        network: String,
        /// Member whose artifact was being built.
        identifier: String,
        /// Number of routing peers requested.
        peers: usize,
    },

    /// A key needed by the artifact could not be read.
    #[error("could not look up keys for {network} > {identifier}")]
    KeyLookup {
        /// Network name.
        network: String,
        /// Member whose artifact was being built.
        identifier: String,
        /// Key store error, naming the identity whose key is missing.
        #[source]
        source: KeyError,
    },

    /// The renderer rejected the context.
    #[error("could not render configuration for {network} > {identifier}")]
    RenderFailure {
        /// Network name.
        network: String,
        /// Member whose artifact was being built.
        identifier: String,
        /// Renderer error.
        #[source]
        source: RenderError,
    },

    /// The artifact could not be written.
    #[error("could not write configuration for {network} > {identifier}")]
    PersistenceFailure {
        /// Network name.
        network: String,
        /// Member whose artifact was being built.
        identifier: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl GenError {
    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> GenErrorKind {
        match self {
            Self::InvalidTopology { .. } => GenErrorKind::InvalidTopology,
            Self::InvalidAllowAllRouting { .. } => GenErrorKind::InvalidAllowAllRouting,
            Self::KeyLookup { .. } => GenErrorKind::KeyLookup,
            Self::RenderFailure { .. } => GenErrorKind::RenderFailure,
            Self::PersistenceFailure { .. } => GenErrorKind::PersistenceFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_shows_braces() {
        let err = RenderError::UnknownVariable {
            name: "nope".into(),
        };
        assert_eq!(err.to_string(), "unknown template variable {{nope}}");
    }

    #[test]
    fn allow_all_error_names_member() {
        let err = GenError::InvalidAllowAllRouting {
            network: "home".into(),
            identifier: "c1".into(),
            peers: 2,
        };
        assert_eq!(err.kind(), GenErrorKind::InvalidAllowAllRouting);
        assert_eq!(
            err.to_string(),
            "can not allow all IPs through 2 peers (home > c1)"
        );
    }
}
