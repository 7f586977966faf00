//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use wgmesh_confgen::DEFAULT_EGRESS_INTERFACE;

/// Provision `WireGuard` keys and peer configurations for every network of a
/// definition file.
#[derive(Parser, Debug, Clone)]
#[command(name = "wgmesh")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON file mapping network names to their definitions.
    #[arg(long, env = "WGMESH_CONFIGURATION_FILE")]
    pub configuration_file: PathBuf,

    /// Directory holding `<network>/<identifier>/{private,public}` key files.
    #[arg(long, env = "WGMESH_KEYS_BASE_DIR")]
    pub keys_base_dir: PathBuf,

    /// Directory receiving `<network>/<identifier>.conf` files.
    #[arg(long, env = "WGMESH_CONFS_BASE_DIR", required_unless_present = "check")]
    pub confs_base_dir: Option<PathBuf>,

    /// Template file used instead of the built-in wg-quick format.
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// DNS server written into every configuration.
    #[arg(long)]
    pub dns: Option<String>,

    /// Interface NAT traffic leaves through in PostUp/PostDown rules.
    #[arg(long, default_value = DEFAULT_EGRESS_INTERFACE)]
    pub egress_interface: String,

    /// How keypairs are generated.
    #[arg(long, value_enum, default_value_t = KeyBackend::Native)]
    pub key_backend: KeyBackend,

    /// `wg` executable used by the `wg` key backend.
    #[arg(long, default_value = "wg")]
    pub wg_binary: PathBuf,

    /// Seconds before a `wg` invocation is killed.
    #[arg(long)]
    pub keygen_timeout_secs: Option<u64>,

    /// Only parse and validate the definition file.
    #[arg(long)]
    pub check: bool,
}

/// Keypair generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KeyBackend {
    /// Curve25519 computed in-process.
    #[default]
    Native,
    /// `wg genkey` and `wg pubkey`.
    Wg,
}
