//! Network definition types.
//!
//! A definition file maps network names to a [`NetworkConfig`]. Each network owns
//! its peers; a peer has no existence outside the network that declares it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// All networks of a definition file, keyed (and therefore ordered) by name.
pub type Networks = BTreeMap<String, NetworkConfig>;

/// A member of a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Peer {
    /// Unique name of the member within its network.
    pub identifier: String,
    /// Tunnel address of the member (a single host, no mask).
    pub address: String,
    /// Publicly reachable `host:port`, empty when the member has no fixed endpoint.
    pub endpoint: String,
}

impl Peer {
    /// Creates a peer from its identifier, tunnel address and endpoint.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        address: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            address: address.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Routing shape of a network.
///
/// Unrecognized type strings are kept as [`NetworkType::Unknown`] so that the
/// validator, not the parser, reports them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkType {
    /// Star: one server routes for every client, clients tunnel everything through it.
    ServerClient,
    /// Every client routes directly to every other client.
    FullMesh,
    /// Anything else found in the definition file.
    Unknown(String),
}

impl NetworkType {
    /// Wire name of the server-client topology.
    pub const SERVER_CLIENT: &'static str = "server-client";
    /// Wire name of the full-mesh topology.
    pub const FULL_MESH: &'static str = "full-mesh";

    /// Returns the name used in definition files.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ServerClient => Self::SERVER_CLIENT,
            Self::FullMesh => Self::FULL_MESH,
            Self::Unknown(raw) => raw,
        }
    }
}

impl Default for NetworkType {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<String> for NetworkType {
    fn from(s: String) -> Self {
        match s.as_str() {
            Self::SERVER_CLIENT => Self::ServerClient,
            Self::FULL_MESH => Self::FullMesh,
            _ => Self::Unknown(s),
        }
    }
}

impl From<&str> for NetworkType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<NetworkType> for String {
    fn from(t: NetworkType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Definition of a single network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Topology of the network.
    #[serde(rename = "type", default)]
    pub network_type: NetworkType,
    /// The relay node. Only meaningful for [`NetworkType::ServerClient`].
    #[serde(default)]
    pub server: Peer,
    /// Ordered list of clients.
    #[serde(default)]
    pub clients: Vec<Peer>,
}

impl NetworkConfig {
    /// Creates a server-client network.
    #[must_use]
    pub fn server_client(server: Peer, clients: Vec<Peer>) -> Self {
        Self {
            network_type: NetworkType::ServerClient,
            server,
            clients,
        }
    }

    /// Creates a full-mesh network.
    #[must_use]
    pub fn full_mesh(clients: Vec<Peer>) -> Self {
        Self {
            network_type: NetworkType::FullMesh,
            server: Peer::default(),
            clients,
        }
    }

    /// Returns every member that takes part in the network.
    ///
    /// Server-client networks yield the clients followed by the server; every
    /// other type yields the clients only, ignoring the server slot. The
    /// returned list is freshly built, `clients` is left untouched.
    #[must_use]
    pub fn members(&self) -> Vec<&Peer> {
        let mut members: Vec<&Peer> = self.clients.iter().collect();
        if self.network_type == NetworkType::ServerClient {
            members.push(&self.server);
        }
        members
    }
}
