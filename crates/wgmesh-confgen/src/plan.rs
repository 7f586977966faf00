//! Routing decisions per network topology.
//!
//! [`plan`] turns a [`NetworkConfig`] into one [`MemberPlan`] per artifact
//! without touching keys or the filesystem.

use std::fmt;

use wgmesh_config::{NetworkConfig, NetworkType, Peer};

use crate::error::GenError;

/// Prefix length of every tunnel address and routed host.
pub const HOST_MASK: &str = "32";

/// Allowed-IPs value that routes every IPv4 and IPv6 address.
pub const ALLOW_ALL: &str = "0.0.0.0/0, ::/0";

/// Addresses a routing peer may claim as the source of its traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedIps {
    /// The peer's own tunnel address.
    Host(String),
    /// Everything; the member tunnels all outbound traffic through the peer.
    All,
}

impl AllowedIps {
    /// Returns `true` for [`AllowedIps::All`].
    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for AllowedIps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(address) => write!(f, "{address}/{HOST_MASK}"),
            Self::All => f.write_str(ALLOW_ALL),
        }
    }
}

/// A peer that a member routes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route<'a> {
    /// The routing peer.
    pub peer: &'a Peer,
    /// What the peer is allowed to send.
    pub allowed_ips: AllowedIps,
}

/// Everything needed to build one member's artifact, minus key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPlan<'a> {
    /// The member the artifact is for.
    pub member: &'a Peer,
    /// Peers the member routes to, in definition order.
    pub routes: Vec<Route<'a>>,
    /// Whether the member forwards traffic for others.
    pub requires_post_up_down: bool,
}

impl<'a> MemberPlan<'a> {
    /// Builds the plan for `member` routing to `peers`.
    ///
    /// With `allow_all` the member sends everything through its single peer and
    /// does not forward; otherwise each peer gets its host route and the member
    /// forwards.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidAllowAllRouting`] when `allow_all` is set and
    /// `peers` does not hold exactly one entry.
    pub fn new(
        network: &str,
        member: &'a Peer,
        peers: Vec<&'a Peer>,
        allow_all: bool,
    ) -> Result<Self, GenError> {
        if allow_all && peers.len() != 1 {
            return Err(GenError::InvalidAllowAllRouting {
                network: network.to_string(),
                identifier: member.identifier.clone(),
                peers: peers.len(),
            });
        }

        let routes = peers
            .into_iter()
            .map(|peer| Route {
                peer,
                allowed_ips: if allow_all {
                    AllowedIps::All
                } else {
                    AllowedIps::Host(peer.address.clone())
                },
            })
            .collect();

        Ok(Self {
            member,
            routes,
            requires_post_up_down: !allow_all,
        })
    }

    /// Returns `true` if the member tunnels all traffic through its peer.
    #[must_use]
    pub fn allows_all(&self) -> bool {
        self.routes.iter().any(|route| route.allowed_ips.is_all())
    }
}

/// Computes the artifacts of a network.
///
/// Server-client networks yield the server first, routing to every client,
/// followed by one plan per client routing everything through the server.
/// Full-mesh networks yield one plan per client routing to every other client.
///
/// # Errors
///
/// Returns [`GenError::InvalidTopology`] for unrecognized network types.
pub fn plan<'a>(network: &str, config: &'a NetworkConfig) -> Result<Vec<MemberPlan<'a>>, GenError> {
    match &config.network_type {
        NetworkType::ServerClient => {
            let server = &config.server;
            let mut plans = Vec::with_capacity(config.clients.len() + 1);
            plans.push(MemberPlan::new(
                network,
                server,
                config.clients.iter().collect(),
                false,
            )?);
            for client in &config.clients {
                plans.push(MemberPlan::new(network, client, vec![server], true)?);
            }
            Ok(plans)
        }
        NetworkType::FullMesh => config
            .clients
            .iter()
            .enumerate()
            .map(|(i, client)| {
                let others = config
                    .clients
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, peer)| peer)
                    .collect();
                MemberPlan::new(network, client, others, false)
            })
            .collect(),
        NetworkType::Unknown(found) => Err(GenError::InvalidTopology {
            network: network.to_string(),
            found: found.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenErrorKind;
    use proptest::prelude::*;

    fn clients(n: usize) -> Vec<Peer> {
        (0..n)
            .map(|i| Peer::new(format!("c{i}"), format!("10.0.0.{}", i + 2), ""))
            .collect()
    }

    fn ids<'a>(routes: &[Route<'a>]) -> Vec<&'a str> {
        routes.iter().map(|r| r.peer.identifier.as_str()).collect()
    }

    #[test]
    fn allowed_ips_display() {
        assert_eq!(AllowedIps::Host("10.0.0.2".into()).to_string(), "10.0.0.2/32");
        assert_eq!(AllowedIps::All.to_string(), "0.0.0.0/0, ::/0");
    }

    #[test]
    fn server_client_plans_server_first() {
        let config = NetworkConfig::server_client(
            Peer::new("srv", "10.0.0.1", "h:51820"),
            vec![Peer::new("c1", "10.0.0.2", "")],
        );

        let plans = plan("home", &config).expect("plan");
        assert_eq!(plans.len(), 2);

        assert_eq!(plans[0].member.identifier, "srv");
        assert_eq!(ids(&plans[0].routes), ["c1"]);
        assert_eq!(plans[0].routes[0].allowed_ips.to_string(), "10.0.0.2/32");
        assert!(plans[0].requires_post_up_down);

        assert_eq!(plans[1].member.identifier, "c1");
        assert_eq!(ids(&plans[1].routes), ["srv"]);
        assert_eq!(plans[1].routes[0].allowed_ips, AllowedIps::All);
        assert!(!plans[1].requires_post_up_down);
    }

    #[test]
    fn full_mesh_excludes_self() {
        let config = NetworkConfig::full_mesh(vec![
            Peer::new("a", "10.0.0.1", "h1:51820"),
            Peer::new("b", "10.0.0.2", "h2:51820"),
            Peer::new("c", "10.0.0.3", ""),
        ]);

        let plans = plan("mesh", &config).expect("plan");
        let got: Vec<(&str, Vec<&str>)> = plans
            .iter()
            .map(|p| (p.member.identifier.as_str(), ids(&p.routes)))
            .collect();
        assert_eq!(
            got,
            [("a", vec!["b", "c"]), ("b", vec!["a", "c"]), ("c", vec!["a", "b"])]
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let config = NetworkConfig {
            network_type: NetworkType::from("ring"),
            ..NetworkConfig::default()
        };
        let err = plan("x", &config).expect_err("unknown type");
        assert_eq!(err.kind(), GenErrorKind::InvalidTopology);
    }

    #[test]
    fn allow_all_requires_single_peer() {
        let member = Peer::new("c1", "10.0.0.2", "");
        let a = Peer::new("a", "10.0.0.3", "");
        let b = Peer::new("b", "10.0.0.4", "");

        let err = MemberPlan::new("net", &member, vec![&a, &b], true).expect_err("two peers");
        assert_eq!(err.kind(), GenErrorKind::InvalidAllowAllRouting);

        let err = MemberPlan::new("net", &member, Vec::new(), true).expect_err("no peers");
        assert_eq!(err.kind(), GenErrorKind::InvalidAllowAllRouting);

        let ok = MemberPlan::new("net", &member, vec![&a], true).expect("one peer");
        assert!(ok.allows_all());
    }

    #[test]
    fn server_client_without_clients_yields_server_only() {
        let config = NetworkConfig::server_client(Peer::new("srv", "10.0.0.1", "h:1"), Vec::new());
        let plans = plan("lonely", &config).expect("plan");
        assert_eq!(plans.len(), 1);
        assert!(plans[0].routes.is_empty());
    }

    proptest! {
        #[test]
        fn full_mesh_shape(n in 0usize..12) {
            let config = NetworkConfig::full_mesh(clients(n));
            let plans = plan("mesh", &config).expect("plan");

            prop_assert_eq!(plans.len(), n);
            for p in &plans {
                prop_assert_eq!(p.routes.len(), n.saturating_sub(1));
                prop_assert!(!p.allows_all());
                prop_assert!(p.requires_post_up_down);
                prop_assert!(p.routes.iter().all(|r| r.peer.identifier != p.member.identifier));
            }
        }

        #[test]
        fn server_client_shape(m in 0usize..12) {
            let config = NetworkConfig::server_client(Peer::new("srv", "10.0.0.1", "h:1"), clients(m));
            let plans = plan("star", &config).expect("plan");

            prop_assert_eq!(plans.len(), m + 1);
            prop_assert_eq!(plans[0].routes.len(), m);
            prop_assert!(plans[0]
                .routes
                .iter()
                .all(|r| r.allowed_ips.to_string().ends_with("/32")));
            for p in &plans[1..] {
                prop_assert_eq!(p.routes.len(), 1);
                prop_assert_eq!(p.routes[0].allowed_ips.to_string(), ALLOW_ALL);
                prop_assert!(!p.requires_post_up_down);
            }
        }
    }
}
