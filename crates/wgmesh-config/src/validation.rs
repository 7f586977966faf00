//! Topology validation.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::debug;

use crate::error::ValidationError;
use crate::types::{NetworkConfig, NetworkType};

/// Returns `true` when no value occurs twice.
///
/// Empty and single-element inputs are trivially unique.
pub fn is_unique<I>(values: I) -> bool
where
    I: IntoIterator,
    I::Item: Eq + Hash,
{
    first_duplicate(values).is_none()
}

/// Returns the first value seen for the second time, if any.
pub fn first_duplicate<I>(values: I) -> Option<I::Item>
where
    I: IntoIterator,
    I::Item: Eq + Hash,
{
    let mut seen = HashSet::new();
    for value in values {
        if seen.contains(&value) {
            return Some(value);
        }
        seen.insert(value);
    }
    None
}

/// Explains why `segment` cannot be used as a single file or directory name.
///
/// Network names and identifiers become path components of key and
/// configuration files, so they must be non-empty, must not be `.` or `..`, and
/// must not contain separators or NUL.
pub fn path_segment_problem(segment: &str) -> Option<&'static str> {
    if segment.is_empty() {
        Some("must not be empty")
    } else if segment == "." || segment == ".." {
        Some("must not be a relative path component")
    } else if segment.contains(['/', '\\', '\0']) {
        Some("must not contain path separators")
    } else {
        None
    }
}

/// Checks that a network name can name its key and configuration directories.
///
/// # Errors
///
/// Returns [`ValidationError::UnsafeNetworkName`] when it cannot.
pub fn validate_network_name(name: &str) -> Result<(), ValidationError> {
    match path_segment_problem(name) {
        Some(reason) => Err(ValidationError::UnsafeNetworkName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Checks a network definition for internal consistency.
///
/// # Errors
///
/// - [`ValidationError::InvalidType`] for an unrecognized network type
/// - [`ValidationError::IncompleteServer`] when a server-client server has an
///   empty identifier, address or endpoint
/// - [`ValidationError::UnsafeIdentifier`] when a member identifier cannot be
///   used as a file name
/// - [`ValidationError::DuplicateAddress`] / [`ValidationError::DuplicateIdentifier`]
///   when two members collide
pub fn validate(network: &NetworkConfig) -> Result<(), ValidationError> {
    match &network.network_type {
        NetworkType::ServerClient | NetworkType::FullMesh => {}
        NetworkType::Unknown(found) => {
            return Err(ValidationError::InvalidType {
                found: found.clone(),
            });
        }
    }

    if network.network_type == NetworkType::ServerClient {
        let server = &network.server;
        let missing: Vec<&'static str> = [
            ("identifier", &server.identifier),
            ("address", &server.address),
            ("endpoint", &server.endpoint),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ValidationError::IncompleteServer { missing });
        }
    }

    let members = network.members();

    for member in &members {
        if let Some(reason) = path_segment_problem(&member.identifier) {
            return Err(ValidationError::UnsafeIdentifier {
                identifier: member.identifier.clone(),
                reason,
            });
        }
    }

    if let Some(address) = first_duplicate(members.iter().map(|p| p.address.as_str())) {
        return Err(ValidationError::DuplicateAddress {
            address: address.to_string(),
        });
    }

    if let Some(identifier) = first_duplicate(members.iter().map(|p| p.identifier.as_str())) {
        return Err(ValidationError::DuplicateIdentifier {
            identifier: identifier.to_string(),
        });
    }

    debug!(
        network_type = %network.network_type,
        members = members.len(),
        "network definition is valid"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Peer;
    use test_case::test_case;

    fn server() -> Peer {
        Peer::new("srv", "10.0.0.1", "vpn.example.com:51820")
    }

    fn clients() -> Vec<Peer> {
        vec![
            Peer::new("laptop", "10.0.0.2", ""),
            Peer::new("phone", "10.0.0.3", ""),
        ]
    }

    #[test]
    fn is_unique_empty_and_singleton() {
        assert!(is_unique(Vec::<&str>::new()));
        assert!(is_unique(["only"]));
    }

    #[test]
    fn is_unique_detects_repeat() {
        assert!(!is_unique(["a", "b", "a"]));
        assert_eq!(first_duplicate(["a", "b", "b", "a"]), Some("b"));
    }

    #[test]
    fn valid_server_client() {
        assert!(validate(&NetworkConfig::server_client(server(), clients())).is_ok());
    }

    #[test]
    fn valid_full_mesh() {
        assert!(validate(&NetworkConfig::full_mesh(clients())).is_ok());
    }

    #[test]
    fn full_mesh_ignores_incomplete_server() {
        let mut config = NetworkConfig::full_mesh(clients());
        // Would collide with "laptop" if it were counted.
        config.server = Peer::new("", "10.0.0.2", "");
        assert!(validate(&config).is_ok());
    }

    #[test_case("" ; "empty type")]
    #[test_case("hub-spoke" ; "unknown type")]
    #[test_case("Server-Client" ; "wrong case")]
    fn invalid_type_rejected(raw: &str) {
        let config = NetworkConfig {
            network_type: NetworkType::from(raw),
            server: server(),
            clients: clients(),
        };
        assert_eq!(
            validate(&config),
            Err(ValidationError::InvalidType {
                found: raw.to_string()
            })
        );
    }

    #[test_case(Peer::new("", "10.0.0.1", "h:51820"), &["identifier"] ; "no identifier")]
    #[test_case(Peer::new("srv", "", "h:51820"), &["address"] ; "no address")]
    #[test_case(Peer::new("srv", "10.0.0.1", ""), &["endpoint"] ; "no endpoint")]
    #[test_case(Peer::default(), &["identifier", "address", "endpoint"] ; "no server")]
    fn incomplete_server_rejected(server: Peer, missing: &[&'static str]) {
        let config = NetworkConfig::server_client(server, clients());
        assert_eq!(
            validate(&config),
            Err(ValidationError::IncompleteServer {
                missing: missing.to_vec()
            })
        );
    }

    #[test]
    fn client_reusing_server_address_rejected() {
        let mut members = clients();
        members.push(Peer::new("tablet", "10.0.0.1", ""));
        let config = NetworkConfig::server_client(server(), members);
        assert_eq!(
            validate(&config),
            Err(ValidationError::DuplicateAddress {
                address: "10.0.0.1".into()
            })
        );
    }

    #[test]
    fn client_reusing_server_identifier_rejected() {
        let mut members = clients();
        members.push(Peer::new("srv", "10.0.0.4", ""));
        let config = NetworkConfig::server_client(server(), members);
        assert_eq!(
            validate(&config),
            Err(ValidationError::DuplicateIdentifier {
                identifier: "srv".into()
            })
        );
    }

    #[test]
    fn duplicate_address_reported_before_identifier() {
        let config = NetworkConfig::full_mesh(vec![
            Peer::new("a", "10.0.0.1", ""),
            Peer::new("a", "10.0.0.1", ""),
        ]);
        assert!(matches!(
            validate(&config),
            Err(ValidationError::DuplicateAddress { .. })
        ));
    }

    #[test_case("" ; "empty")]
    #[test_case(".." ; "parent dir")]
    #[test_case("." ; "current dir")]
    #[test_case("a/b" ; "separator")]
    #[test_case("..\\x" ; "backslash")]
    fn unsafe_client_identifier_rejected(identifier: &str) {
        let mut members = clients();
        members.push(Peer::new(identifier, "10.0.0.9", ""));

        for config in [
            NetworkConfig::full_mesh(members.clone()),
            NetworkConfig::server_client(server(), members),
        ] {
            assert!(matches!(
                validate(&config),
                Err(ValidationError::UnsafeIdentifier { identifier: found, .. }) if found == identifier
            ));
        }
    }

    #[test_case("home", true ; "plain")]
    #[test_case("wg-0.lan", true ; "dots and dashes")]
    #[test_case("", false ; "empty")]
    #[test_case("..", false ; "parent dir")]
    #[test_case("a/b", false ; "separator")]
    fn network_names(name: &str, accepted: bool) {
        assert_eq!(validate_network_name(name).is_ok(), accepted);
    }

    #[test]
    fn validate_does_not_mutate_clients() {
        let config = NetworkConfig::server_client(server(), clients());
        let before = config.clone();
        validate(&config).expect("valid");
        assert_eq!(config, before);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        proptest! {
            #[test]
            fn distinct_values_are_unique(values in prop::collection::btree_set("[a-z0-9]{0,8}", 0..32)) {
                let values: Vec<String> = values.into_iter().collect();
                prop_assert!(is_unique(&values));
            }

            #[test]
            fn repeated_value_is_not_unique(
                values in prop::collection::vec("[a-z0-9]{0,8}", 1..32),
                pick in any::<prop::sample::Index>(),
                at in any::<prop::sample::Index>(),
            ) {
                let mut values = values;
                let repeated = values[pick.index(values.len())].clone();
                let position = at.index(values.len() + 1);
                values.insert(position, repeated);
                prop_assert!(!is_unique(&values));
            }

            #[test]
            fn server_client_fails_iff_incomplete_or_colliding(
                addresses in prop::collection::vec(0u8..16, 1..8),
                identifiers in prop::collection::vec(0u8..16, 1..8),
                blank_endpoint in any::<bool>(),
            ) {
                let len = addresses.len().min(identifiers.len());
                let server = Peer::new(
                    format!("id{}", identifiers[0]),
                    format!("10.0.0.{}", addresses[0]),
                    if blank_endpoint { String::new() } else { "h:51820".to_string() },
                );
                let clients: Vec<Peer> = (1..len)
                    .map(|i| Peer::new(
                        format!("id{}", identifiers[i]),
                        format!("10.0.0.{}", addresses[i]),
                        "",
                    ))
                    .collect();

                let distinct_addresses: BTreeSet<_> = addresses[..len].iter().collect();
                let distinct_identifiers: BTreeSet<_> = identifiers[..len].iter().collect();
                let should_fail = blank_endpoint
                    || distinct_addresses.len() != len
                    || distinct_identifiers.len() != len;

                let result = validate(&NetworkConfig::server_client(server, clients));
                prop_assert_eq!(result.is_err(), should_fail);
            }
        }
    }
}
