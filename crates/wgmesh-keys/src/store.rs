//! On-disk key store.
//!
//! Keys live at `<base>/<network>/<identifier>/{private,public}`. A private key
//! is created once and never touched again: if the file exists, the member is
//! considered provisioned, whatever the state of its public key.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use wgmesh_config::{path_segment_problem, NetworkConfig};
use zeroize::Zeroizing;

use crate::error::KeyError;
use crate::primitive::KeyPrimitive;
use crate::secure_fs::{self, WriteMode};

/// File names used inside a member's key directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    /// Name of the private key file.
    pub private_file: String,
    /// Name of the public key file.
    pub public_file: String,
}

impl KeyLayout {
    /// Default private key file name.
    pub const PRIVATE_KEY_FILE: &'static str = "private";
    /// Default public key file name.
    pub const PUBLIC_KEY_FILE: &'static str = "public";
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self {
            private_file: Self::PRIVATE_KEY_FILE.to_string(),
            public_file: Self::PUBLIC_KEY_FILE.to_string(),
        }
    }
}

/// Read access to provisioned keys.
pub trait KeyLookup {
    /// Returns the base64 private key of a member.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyNotFound`] if the member has no key.
    fn get_private_key(&self, network: &str, identifier: &str) -> Result<String, KeyError>;

    /// Returns the base64 public key of a member.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyNotFound`] if the member has no key.
    fn get_public_key(&self, network: &str, identifier: &str) -> Result<String, KeyError>;
}

/// Idempotent keypair lifecycle keyed by `(network, identifier)`.
pub struct KeyStore {
    base: PathBuf,
    layout: KeyLayout,
    primitive: Box<dyn KeyPrimitive>,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("base", &self.base)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl KeyStore {
    /// Creates a store rooted at `base` that generates keys with `primitive`.
    pub fn new(base: impl Into<PathBuf>, primitive: impl KeyPrimitive + 'static) -> Self {
        Self {
            base: base.into(),
            layout: KeyLayout::default(),
            primitive: Box::new(primitive),
        }
    }

    /// Overrides the key file names.
    #[must_use]
    pub fn with_layout(mut self, layout: KeyLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the directory holding a member's keys.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidIdentity`] if either component cannot be used
    /// as a single path segment.
    pub fn member_dir(&self, network: &str, identifier: &str) -> Result<PathBuf, KeyError> {
        for component in [network, identifier] {
            if let Some(reason) = path_segment_problem(component) {
                return Err(KeyError::InvalidIdentity {
                    network: network.to_string(),
                    identifier: identifier.to_string(),
                    reason,
                });
            }
        }
        Ok(self.base.join(network).join(identifier))
    }

    /// Makes sure every member of `config` has a keypair on disk.
    ///
    /// Returns how many members got new keys. Members whose private key already
    /// exists are skipped. On error, members handled before the failing one keep
    /// their keys; running again resumes where it stopped.
    ///
    /// # Errors
    ///
    /// Returns the first [`KeyError`] encountered.
    pub fn ensure_keys(&self, network: &str, config: &NetworkConfig) -> Result<usize, KeyError> {
        let mut created = 0;
        for member in config.members() {
            if self.ensure_member(network, &member.identifier)? {
                created += 1;
            }
        }
        debug!(network, created, "keys ensured");
        Ok(created)
    }

    fn ensure_member(&self, network: &str, identifier: &str) -> Result<bool, KeyError> {
        let dir = self.member_dir(network, identifier)?;
        let private_path = dir.join(&self.layout.private_file);
        let persistence = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| KeyError::PersistenceFailure {
                network: network.to_string(),
                identifier: identifier.to_string(),
                path,
                source,
            }
        };
        let primitive = |source| KeyError::PrimitiveFailure {
            network: network.to_string(),
            identifier: identifier.to_string(),
            source,
        };

        if private_path.try_exists().map_err(persistence(&private_path))? {
            debug!(network, identifier, "private key exists, skipping");
            return Ok(false);
        }

        secure_fs::create_private_dir(&dir).map_err(persistence(&dir))?;

        let private = Zeroizing::new(self.primitive.generate_private().map_err(primitive)?);
        match secure_fs::write_private_file(&private_path, &private, WriteMode::CreateNew) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(network, identifier, "private key appeared concurrently, keeping it");
                return Ok(false);
            }
            Err(e) => return Err(persistence(&private_path)(e)),
        }
        info!(network, identifier, path = %private_path.display(), "wrote private key");

        let public = self.primitive.derive_public(&private).map_err(primitive)?;
        let public_path = dir.join(&self.layout.public_file);
        secure_fs::write_private_file(&public_path, &public, WriteMode::Truncate)
            .map_err(persistence(&public_path))?;
        info!(network, identifier, path = %public_path.display(), "wrote public key");

        Ok(true)
    }

    fn read_key(&self, network: &str, identifier: &str, file: &str) -> Result<String, KeyError> {
        let path = self.member_dir(network, identifier)?.join(file);
        match fs::read_to_string(&path) {
            Ok(mut contents) => {
                if contents.ends_with('\n') {
                    contents.pop();
                }
                Ok(contents)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(KeyError::KeyNotFound {
                network: network.to_string(),
                identifier: identifier.to_string(),
                path,
            }),
            Err(source) => Err(KeyError::PersistenceFailure {
                network: network.to_string(),
                identifier: identifier.to_string(),
                path,
                source,
            }),
        }
    }
}

impl KeyLookup for KeyStore {
    fn get_private_key(&self, network: &str, identifier: &str) -> Result<String, KeyError> {
        self.read_key(network, identifier, &self.layout.private_file)
    }

    fn get_public_key(&self, network: &str, identifier: &str) -> Result<String, KeyError> {
        self.read_key(network, identifier, &self.layout.public_file)
    }
}

impl<K: KeyLookup + ?Sized> KeyLookup for &K {
    fn get_private_key(&self, network: &str, identifier: &str) -> Result<String, KeyError> {
        (**self).get_private_key(network, identifier)
    }

    fn get_public_key(&self, network: &str, identifier: &str) -> Result<String, KeyError> {
        (**self).get_public_key(network, identifier)
    }
}
