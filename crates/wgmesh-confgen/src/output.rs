//! Where rendered artifacts go.

use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use wgmesh_keys::secure_fs::{self, WriteMode};

/// File extension of written artifacts.
pub const ARTIFACT_EXTENSION: &str = "conf";

/// Persists rendered artifacts.
pub trait ArtifactSink {
    /// Stores `contents` as the artifact of `identifier` in `network`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the artifact cannot be stored.
    fn write(&self, network: &str, identifier: &str, contents: &str) -> io::Result<PathBuf>;
}

impl<S: ArtifactSink + ?Sized> ArtifactSink for &S {
    fn write(&self, network: &str, identifier: &str, contents: &str) -> io::Result<PathBuf> {
        (**self).write(network, identifier, contents)
    }
}

/// Writes artifacts to `<base>/<network>/<identifier>.conf`.
///
/// Directories are created `0700` and files `0600`. Existing artifacts are
/// overwritten.
#[derive(Debug, Clone)]
pub struct FsArtifactWriter {
    base: PathBuf,
}

impl FsArtifactWriter {
    /// Creates a writer rooted at `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the path an artifact is written to.
    #[must_use]
    pub fn artifact_path(&self, network: &str, identifier: &str) -> PathBuf {
        self.base
            .join(network)
            .join(format!("{identifier}.{ARTIFACT_EXTENSION}"))
    }
}

impl ArtifactSink for FsArtifactWriter {
    fn write(&self, network: &str, identifier: &str, contents: &str) -> io::Result<PathBuf> {
        secure_fs::create_private_dir(&self.base.join(network))?;
        let path = self.artifact_path(network, identifier);
        secure_fs::write_private_file(&path, contents.as_bytes(), WriteMode::Truncate)?;
        info!(network, identifier, path = %path.display(), "wrote configuration");
        Ok(path)
    }
}
