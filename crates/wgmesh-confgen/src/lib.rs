//! `WireGuard` configuration generation for wgmesh networks.
//!
//! Generation runs in three steps per network:
//!
//! 1. [`plan`] decides, from the topology alone, which peers each member routes
//!    to and with which allowed IPs.
//! 2. [`ConfigGenerator`] resolves the keys of every plan into a
//!    [`GeneratedPeerContext`] and hands it to a [`Renderer`].
//! 3. The rendered text goes to an [`ArtifactSink`], normally
//!    [`FsArtifactWriter`].
//!
//! # Example
//!
//! ```rust,no_run
//! use wgmesh_config::{NetworkConfig, Peer};
//! use wgmesh_confgen::{ConfigGenerator, FsArtifactWriter, WgQuickRenderer};
//! use wgmesh_keys::{KeyStore, NativeKeys};
//!
//! let config = NetworkConfig::full_mesh(vec![
//!     Peer::new("a", "10.0.0.1", "h1:51820"),
//!     Peer::new("b", "10.0.0.2", "h2:51820"),
//! ]);
//!
//! let keys = KeyStore::new("/var/lib/wgmesh/keys", NativeKeys);
//! keys.ensure_keys("office", &config)?;
//!
//! let report = ConfigGenerator::new(
//!     &keys,
//!     WgQuickRenderer::new(),
//!     FsArtifactWriter::new("/etc/wgmesh"),
//! )
//! .generate("office", &config)?;
//! assert_eq!(report.artifacts.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

mod context;
pub mod error;
mod generator;
mod output;
mod plan;
mod render;

pub use context::{endpoint_port, GeneratedPeerContext, PeerEntry};
pub use error::{GenError, GenErrorKind, RenderError};
pub use generator::{ConfigGenerator, GenerationReport};
pub use output::{ArtifactSink, FsArtifactWriter, ARTIFACT_EXTENSION};
pub use plan::{plan, AllowedIps, MemberPlan, Route, ALLOW_ALL, HOST_MASK};
pub use render::{Renderer, TemplateRenderer, WgQuickRenderer, DEFAULT_EGRESS_INTERFACE};
