//! Owner-only file and directory creation.
//!
//! Key material and generated configurations embed secrets, so directories are
//! created `0700` and files `0600` on Unix.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};

/// Permission bits for directories holding secrets.
pub const DIR_MODE: u32 = 0o700;

/// Permission bits for files holding secrets.
pub const FILE_MODE: u32 = 0o600;

/// What to do when the target file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with [`io::ErrorKind::AlreadyExists`].
    CreateNew,
    /// Replace the previous contents.
    Truncate,
}

/// Creates `path` and any missing parents with owner-only permissions.
///
/// Directories that already exist keep their permissions.
pub fn create_private_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder.create(path)
}

/// Writes `contents` to `path` with owner read/write permissions only.
///
/// The permissions are applied to the open file before any byte is written,
/// including when an existing file is truncated.
pub fn write_private_file(path: &Path, contents: &[u8], mode: WriteMode) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    match mode {
        WriteMode::CreateNew => options.create_new(true),
        WriteMode::Truncate => options.create(true).truncate(true),
    };
    #[cfg(unix)]
    options.mode(FILE_MODE);

    let mut file = options.open(path)?;
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(FILE_MODE))?;
    file.write_all(contents)?;
    file.sync_all()
}
