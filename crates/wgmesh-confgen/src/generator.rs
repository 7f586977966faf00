//! Per-network artifact generation.

use std::path::PathBuf;

use tracing::{debug, info};
use wgmesh_config::NetworkConfig;
use wgmesh_keys::{KeyError, KeyLookup};

use crate::context::{endpoint_port, GeneratedPeerContext, PeerEntry};
use crate::error::GenError;
use crate::output::ArtifactSink;
use crate::plan::{plan, MemberPlan};
use crate::render::Renderer;

/// Artifacts written for one network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Network name.
    pub network: String,
    /// Paths of the written artifacts, in generation order.
    pub artifacts: Vec<PathBuf>,
}

/// Renders and stores one artifact per network member.
///
/// Keys must already exist; run the key store first.
#[derive(Debug)]
pub struct ConfigGenerator<K, R, S> {
    keys: K,
    renderer: R,
    sink: S,
    dns_server: Option<String>,
}

impl<K, R, S> ConfigGenerator<K, R, S>
where
    K: KeyLookup,
    R: Renderer,
    S: ArtifactSink,
{
    /// Creates a generator reading keys from `keys`, rendering with `renderer`
    /// and storing artifacts in `sink`.
    #[must_use]
    pub fn new(keys: K, renderer: R, sink: S) -> Self {
        Self {
            keys,
            renderer,
            sink,
            dns_server: None,
        }
    }

    /// Sets the DNS server written into every artifact.
    #[must_use]
    pub fn with_dns_server(mut self, dns_server: impl Into<String>) -> Self {
        self.dns_server = Some(dns_server.into());
        self
    }

    /// Generates every artifact of `network`.
    ///
    /// The whole network is planned before any key is read, so routing errors
    /// leave no artifact behind. Artifacts written before a later failure are
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns a [`GenError`] naming the member whose artifact failed.
    pub fn generate(
        &self,
        network: &str,
        config: &NetworkConfig,
    ) -> Result<GenerationReport, GenError> {
        let plans = plan(network, config)?;
        debug!(
            network,
            topology = %config.network_type,
            artifacts = plans.len(),
            "planned configurations"
        );

        let mut artifacts = Vec::with_capacity(plans.len());
        for member_plan in &plans {
            let identifier = member_plan.member.identifier.as_str();
            let context = self.build_context(network, member_plan)?;

            let contents =
                self.renderer
                    .render(&context)
                    .map_err(|source| GenError::RenderFailure {
                        network: network.to_string(),
                        identifier: identifier.to_string(),
                        source,
                    })?;

            let path = self
                .sink
                .write(network, identifier, &contents)
                .map_err(|source| GenError::PersistenceFailure {
                    network: network.to_string(),
                    identifier: identifier.to_string(),
                    source,
                })?;
            debug!(network, identifier, peers = context.peers.len(), "generated configuration");
            artifacts.push(path);
        }

        info!(network, artifacts = artifacts.len(), "network configurations generated");
        Ok(GenerationReport {
            network: network.to_string(),
            artifacts,
        })
    }

    fn build_context(
        &self,
        network: &str,
        member_plan: &MemberPlan<'_>,
    ) -> Result<GeneratedPeerContext, GenError> {
        let member = member_plan.member;
        let lookup_failed = |source: KeyError| GenError::KeyLookup {
            network: network.to_string(),
            identifier: member.identifier.clone(),
            source,
        };

        let private_key = self
            .keys
            .get_private_key(network, &member.identifier)
            .map_err(lookup_failed)?;

        let peers = member_plan
            .routes
            .iter()
            .map(|route| -> Result<PeerEntry, GenError> {
                Ok(PeerEntry {
                    public_key: self
                        .keys
                        .get_public_key(network, &route.peer.identifier)
                        .map_err(lookup_failed)?,
                    allowed_ips: route.allowed_ips.to_string(),
                    identifier: route.peer.identifier.clone(),
                    endpoint: route.peer.endpoint.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut context =
            GeneratedPeerContext::new(network, &member.identifier, &member.address, private_key);
        context.dns_server.clone_from(&self.dns_server);
        context.requires_post_up_down = member_plan.requires_post_up_down;
        context.listen_port = endpoint_port(&member.endpoint);
        context.peers = peers;
        Ok(context)
    }
}
