//! # wgmesh-cli
//!
//! Drives the wgmesh pipeline from the command line. For every network of the
//! definition file, in name order:
//!
//! ```text
//! validate ──► ensure keys ──► generate configurations
//! ```
//!
//! The run stops at the first network that fails; networks handled before it
//! keep their keys and configurations.

#![forbid(unsafe_code)]

pub mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use wgmesh_config::{NetworkConfig, Networks};
use wgmesh_confgen::{
    ConfigGenerator, FsArtifactWriter, GenerationReport, Renderer, TemplateRenderer,
    WgQuickRenderer,
};
use wgmesh_keys::{KeyStore, NativeKeys, WgCommand};

pub use cli::{Cli, KeyBackend};

/// Runs the command described by `cli`.
///
/// # Errors
///
/// Returns the first failure, with the network it happened in attached as
/// context.
pub fn run(cli: &Cli) -> Result<Vec<GenerationReport>> {
    let networks = wgmesh_config::read(&cli.configuration_file).with_context(|| {
        format!(
            "could not load network definitions from {}",
            cli.configuration_file.display()
        )
    })?;

    if cli.check {
        check(&networks)?;
        return Ok(Vec::new());
    }

    let confs_base_dir = cli
        .confs_base_dir
        .as_deref()
        .context("--confs-base-dir is required unless --check is given")?;

    let keys = key_store(cli);
    let renderer = renderer(cli)?;
    let mut generator =
        ConfigGenerator::new(&keys, renderer, FsArtifactWriter::new(confs_base_dir));
    if let Some(dns) = &cli.dns {
        generator = generator.with_dns_server(dns.clone());
    }

    let mut reports = Vec::with_capacity(networks.len());
    for (name, config) in &networks {
        validate(name, config)?;

        let created = keys
            .ensure_keys(name, config)
            .with_context(|| format!("could not provision keys for network {name}"))?;
        info!(network = %name, created, "keys ready");

        let report = generator
            .generate(name, config)
            .with_context(|| format!("could not generate configurations for network {name}"))?;
        reports.push(report);
    }

    Ok(reports)
}

fn check(networks: &Networks) -> Result<()> {
    for (name, config) in networks {
        validate(name, config)?;
    }
    info!(networks = networks.len(), "all networks are valid");
    Ok(())
}

fn validate(name: &str, config: &NetworkConfig) -> Result<()> {
    wgmesh_config::validate_network_name(name)
        .and_then(|()| wgmesh_config::validate(config))
        .with_context(|| format!("network {name} is invalid"))?;
    info!(
        network = %name,
        topology = %config.network_type,
        members = config.members().len(),
        "network valid"
    );
    Ok(())
}

fn key_store(cli: &Cli) -> KeyStore {
    match cli.key_backend {
        KeyBackend::Native => KeyStore::new(&cli.keys_base_dir, NativeKeys),
        KeyBackend::Wg => {
            let mut command = WgCommand::new().with_program(&cli.wg_binary);
            if let Some(secs) = cli.keygen_timeout_secs {
                command = command.with_timeout(Duration::from_secs(secs));
            }
            KeyStore::new(&cli.keys_base_dir, command)
        }
    }
}

fn renderer(cli: &Cli) -> Result<Box<dyn Renderer>> {
    match &cli.template {
        Some(path) => Ok(Box::new(load_template(path)?)),
        None => Ok(Box::new(
            WgQuickRenderer::new().with_egress_interface(&cli.egress_interface),
        )),
    }
}

fn load_template(path: &Path) -> Result<TemplateRenderer> {
    TemplateRenderer::from_file(path)
        .with_context(|| format!("could not load template {}", path.display()))
}
