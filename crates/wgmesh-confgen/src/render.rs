//! Turning a [`GeneratedPeerContext`] into configuration text.
//!
//! [`WgQuickRenderer`] writes the `wg-quick` INI format directly.
//! [`TemplateRenderer`] fills a caller-supplied template that uses `{{name}}`
//! variables and `{{#section}}...{{/section}}` blocks.

use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::{GeneratedPeerContext, PeerEntry};
use crate::error::RenderError;

/// Produces the text of one artifact.
pub trait Renderer {
    /// Renders the configuration for `context`.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] when the context cannot be rendered.
    fn render(&self, context: &GeneratedPeerContext) -> Result<String, RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&self, context: &GeneratedPeerContext) -> Result<String, RenderError> {
        (**self).render(context)
    }
}

impl<R: Renderer + ?Sized> Renderer for &R {
    fn render(&self, context: &GeneratedPeerContext) -> Result<String, RenderError> {
        (**self).render(context)
    }
}

/// Default interface NAT traffic leaves through.
pub const DEFAULT_EGRESS_INTERFACE: &str = "eth0";

/// Built-in `wg-quick` configuration format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WgQuickRenderer {
    egress_interface: String,
}

impl Default for WgQuickRenderer {
    fn default() -> Self {
        Self {
            egress_interface: DEFAULT_EGRESS_INTERFACE.to_string(),
        }
    }
}

impl WgQuickRenderer {
    /// Creates a renderer masquerading through [`DEFAULT_EGRESS_INTERFACE`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interface used by the `PostUp`/`PostDown` masquerade rule.
    #[must_use]
    pub fn with_egress_interface(mut self, interface: impl Into<String>) -> Self {
        self.egress_interface = interface.into();
        self
    }

    /// Returns the egress interface.
    #[must_use]
    pub fn egress_interface(&self) -> &str {
        &self.egress_interface
    }

    fn forwarding_rules(&self, action: char) -> String {
        format!(
            "iptables -{action} FORWARD -i %i -j ACCEPT; \
             iptables -{action} FORWARD -o %i -j ACCEPT; \
             iptables -t nat -{action} POSTROUTING -o {} -j MASQUERADE",
            self.egress_interface
        )
    }
}

impl Renderer for WgQuickRenderer {
    fn render(&self, context: &GeneratedPeerContext) -> Result<String, RenderError> {
        let mut output = String::new();

        let _ = writeln!(output, "# {} > {}", context.network_name, context.identifier);
        output.push_str("[Interface]\n");
        let _ = writeln!(output, "PrivateKey = {}", context.private_key);
        let _ = writeln!(output, "Address = {}/{}", context.address, context.mask);

        if let Some(port) = context.listen_port {
            let _ = writeln!(output, "ListenPort = {port}");
        }

        if let Some(dns) = &context.dns_server {
            let _ = writeln!(output, "DNS = {dns}");
        }

        if context.requires_post_up_down {
            let _ = writeln!(output, "PostUp = {}", self.forwarding_rules('A'));
            let _ = writeln!(output, "PostDown = {}", self.forwarding_rules('D'));
        }

        for peer in &context.peers {
            output.push('\n');
            output.push_str("[Peer]\n");
            let _ = writeln!(output, "# {}", peer.identifier);
            let _ = writeln!(output, "PublicKey = {}", peer.public_key);
            let _ = writeln!(output, "AllowedIPs = {}", peer.allowed_ips);

            if !peer.endpoint.is_empty() {
                let _ = writeln!(output, "Endpoint = {}", peer.endpoint);
            }
        }

        Ok(output)
    }
}

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([#/]?)\s*([^{}]*?)\s*\}\}").unwrap_or_else(|_| unreachable!())
});

const INTERFACE_VARS: &[&str] = &[
    "network_name",
    "identifier",
    "address",
    "mask",
    "private_key",
    "dns_server",
    "listen_port",
];
const INTERFACE_SECTIONS: &[&str] = &["dns_server", "listen_port", "post_up_down"];
const PEERS_SECTION: &str = "peers";
const PEER_VARS: &[&str] = &["public_key", "allowed_ips", "identifier", "endpoint"];
const PEER_SECTIONS: &[&str] = &["endpoint"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Var(String),
    Section { name: String, body: Vec<Node> },
}

/// Renders a user-supplied template.
///
/// Interface variables: `network_name`, `identifier`, `address`, `mask`,
/// `private_key`, `dns_server`, `listen_port`. Optional values render as an
/// empty string when absent.
///
/// Sections: `{{#dns_server}}`, `{{#listen_port}}` and `{{#post_up_down}}`
/// render their body once when the value is present or true. `{{#peers}}`
/// renders its body once per routing peer, with `public_key`, `allowed_ips`,
/// `identifier` and `endpoint` in scope, plus an `{{#endpoint}}` section for
/// peers that have one. Interface variables stay visible inside `peers`,
/// except `identifier`, which names the peer there.
///
/// A section tag alone on its line does not leave an empty line behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRenderer {
    nodes: Vec<Node>,
}

impl TemplateRenderer {
    /// Parses a template.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] for unbalanced sections or names that are not
    /// in scope where they are used.
    pub fn new(source: &str) -> Result<Self, RenderError> {
        let nodes = parse(source)?;
        check_names(&nodes, false)?;
        Ok(Self { nodes })
    }

    /// Reads and parses a template file.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Io`] when the file cannot be read, otherwise the
    /// same errors as [`TemplateRenderer::new`].
    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let source = fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(&source)
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, context: &GeneratedPeerContext) -> Result<String, RenderError> {
        let mut output = String::new();
        render_nodes(&self.nodes, context, None, &mut output)?;
        Ok(output)
    }
}

fn parse(source: &str) -> Result<Vec<Node>, RenderError> {
    let mut stack: Vec<(String, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut pos = 0;

    for caps in TAG_REGEX.captures_iter(source) {
        let Some(tag) = caps.get(0) else { continue };
        let sigil = caps.get(1).map_or("", |m| m.as_str());
        let name = caps.get(2).map_or("", |m| m.as_str()).to_string();

        let mut text_end = tag.start();
        let mut next = tag.end();
        if !sigil.is_empty() {
            let line_start = source[..tag.start()].rfind('\n').map_or(0, |i| i + 1);
            let line_end = source[tag.end()..]
                .find('\n')
                .map_or(source.len(), |i| tag.end() + i + 1);
            if line_start >= pos
                && source[line_start..tag.start()].trim().is_empty()
                && source[tag.end()..line_end].trim().is_empty()
            {
                text_end = line_start;
                next = line_end;
            }
        }

        push_text(&mut current, &source[pos..text_end]);
        pos = next;

        match sigil {
            "#" => stack.push((name, std::mem::take(&mut current))),
            "/" => match stack.pop() {
                Some((open, parent)) if open == name => {
                    let body = std::mem::replace(&mut current, parent);
                    current.push(Node::Section { name, body });
                }
                _ => return Err(RenderError::UnexpectedClose { name }),
            },
            _ => current.push(Node::Var(name)),
        }
    }

    push_text(&mut current, &source[pos..]);

    match stack.pop() {
        Some((name, _)) => Err(RenderError::UnclosedSection { name }),
        None => Ok(current),
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn check_names(nodes: &[Node], in_peer: bool) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Var(name) => {
                let known = INTERFACE_VARS.contains(&name.as_str())
                    || (in_peer && PEER_VARS.contains(&name.as_str()));
                if !known {
                    return Err(RenderError::UnknownVariable { name: name.clone() });
                }
            }
            Node::Section { name, body } => {
                let entering_peers = !in_peer && name == PEERS_SECTION;
                let known = entering_peers
                    || INTERFACE_SECTIONS.contains(&name.as_str())
                    || (in_peer && PEER_SECTIONS.contains(&name.as_str()));
                if !known {
                    return Err(RenderError::UnknownSection { name: name.clone() });
                }
                check_names(body, in_peer || entering_peers)?;
            }
        }
    }
    Ok(())
}

fn interface_var(context: &GeneratedPeerContext, name: &str) -> Option<String> {
    let value = match name {
        "network_name" => context.network_name.clone(),
        "identifier" => context.identifier.clone(),
        "address" => context.address.clone(),
        "mask" => context.mask.clone(),
        "private_key" => context.private_key.clone(),
        "dns_server" => context.dns_server.clone().unwrap_or_default(),
        "listen_port" => context
            .listen_port
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        _ => return None,
    };
    Some(value)
}

fn peer_var(peer: &PeerEntry, name: &str) -> Option<String> {
    let value = match name {
        "public_key" => &peer.public_key,
        "allowed_ips" => &peer.allowed_ips,
        "identifier" => &peer.identifier,
        "endpoint" => &peer.endpoint,
        _ => return None,
    };
    Some(value.clone())
}

fn render_nodes(
    nodes: &[Node],
    context: &GeneratedPeerContext,
    peer: Option<&PeerEntry>,
    output: &mut String,
) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Text(text) => output.push_str(text),
            Node::Var(name) => {
                let value = peer
                    .and_then(|p| peer_var(p, name))
                    .or_else(|| interface_var(context, name))
                    .ok_or_else(|| RenderError::UnknownVariable { name: name.clone() })?;
                output.push_str(&value);
            }
            Node::Section { name, body } => match (name.as_str(), peer) {
                (PEERS_SECTION, None) => {
                    for entry in &context.peers {
                        render_nodes(body, context, Some(entry), output)?;
                    }
                }
                ("endpoint", Some(p)) => {
                    if !p.endpoint.is_empty() {
                        render_nodes(body, context, peer, output)?;
                    }
                }
                ("dns_server", _) => {
                    if context.dns_server.is_some() {
                        render_nodes(body, context, peer, output)?;
                    }
                }
                ("listen_port", _) => {
                    if context.listen_port.is_some() {
                        render_nodes(body, context, peer, output)?;
                    }
                }
                ("post_up_down", _) => {
                    if context.requires_post_up_down {
                        render_nodes(body, context, peer, output)?;
                    }
                }
                _ => return Err(RenderError::UnknownSection { name: name.clone() }),
            },
        }
    }
    Ok(())
}
