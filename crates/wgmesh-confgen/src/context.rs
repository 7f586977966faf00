//! Data handed to a renderer for one artifact.

use std::fmt;

use crate::plan::HOST_MASK;

/// A routing peer as it appears in an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    /// Base64 public key of the peer.
    pub public_key: String,
    /// Rendered allowed-IPs value.
    pub allowed_ips: String,
    /// Identifier of the peer.
    pub identifier: String,
    /// Endpoint of the peer, empty when it has none.
    pub endpoint: String,
}

/// Everything a renderer needs to produce one member's configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedPeerContext {
    /// Network the artifact belongs to.
    pub network_name: String,
    /// Member the artifact is for.
    pub identifier: String,
    /// Tunnel address of the member.
    pub address: String,
    /// Prefix length applied to `address`.
    pub mask: String,
    /// Base64 private key of the member.
    pub private_key: String,
    /// DNS server pushed to the member.
    pub dns_server: Option<String>,
    /// Whether the member forwards traffic for others.
    pub requires_post_up_down: bool,
    /// Port the member listens on, taken from its own endpoint.
    pub listen_port: Option<u16>,
    /// Peers the member routes to.
    pub peers: Vec<PeerEntry>,
}

impl GeneratedPeerContext {
    /// Creates a context for a member with no peers yet.
    #[must_use]
    pub fn new(
        network_name: impl Into<String>,
        identifier: impl Into<String>,
        address: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            network_name: network_name.into(),
            identifier: identifier.into(),
            address: address.into(),
            mask: HOST_MASK.to_string(),
            private_key: private_key.into(),
            dns_server: None,
            requires_post_up_down: false,
            listen_port: None,
            peers: Vec::new(),
        }
    }
}

impl fmt::Debug for GeneratedPeerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedPeerContext")
            .field("network_name", &self.network_name)
            .field("identifier", &self.identifier)
            .field("address", &self.address)
            .field("mask", &self.mask)
            .field("private_key", &"[REDACTED]")
            .field("dns_server", &self.dns_server)
            .field("requires_post_up_down", &self.requires_post_up_down)
            .field("listen_port", &self.listen_port)
            .field("peers", &self.peers)
            .finish()
    }
}

/// Extracts the port of a `host:port` endpoint.
///
/// Bracketed IPv6 hosts (`[::1]:51820`) work because only the last colon is
/// considered. Returns `None` for empty endpoints or unparsable ports.
#[must_use]
pub fn endpoint_port(endpoint: &str) -> Option<u16> {
    let (_, port) = endpoint.rsplit_once(':')?;
    port.parse().ok()
}
