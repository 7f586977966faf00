//! Keypair generation primitives.
//!
//! A primitive hands out key material in the textual form `wg` uses: base64
//! followed by a newline. [`NativeKeys`] computes it in-process, [`WgCommand`]
//! shells out to the `wg` tool.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::PrimitiveError;
use crate::keys::PrivateKey;

/// How often a child process is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Source of `WireGuard` key material.
pub trait KeyPrimitive: Send + Sync {
    /// Generates a new private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying generator fails.
    fn generate_private(&self) -> Result<Vec<u8>, PrimitiveError>;

    /// Derives the public key belonging to `private`.
    ///
    /// # Errors
    ///
    /// Returns an error if `private` is malformed or the generator fails.
    fn derive_public(&self, private: &[u8]) -> Result<Vec<u8>, PrimitiveError>;
}

/// In-process Curve25519 key generation.
///
/// Output is byte-compatible with `wg genkey` / `wg pubkey`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeKeys;

impl KeyPrimitive for NativeKeys {
    fn generate_private(&self) -> Result<Vec<u8>, PrimitiveError> {
        Ok(format!("{}\n", PrivateKey::generate().to_base64()).into_bytes())
    }

    fn derive_public(&self, private: &[u8]) -> Result<Vec<u8>, PrimitiveError> {
        let encoded = std::str::from_utf8(private)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let private = PrivateKey::from_base64(encoded)?;
        Ok(format!("{}\n", private.public_key().to_base64()).into_bytes())
    }
}

/// Key generation through the `wg` command-line tool.
#[derive(Debug, Clone)]
pub struct WgCommand {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for WgCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl WgCommand {
    /// Uses `wg` from `PATH` with no timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("wg"),
            timeout: None,
        }
    }

    /// Uses a specific `wg` binary.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Fails any invocation that takes longer than `timeout`, killing the child.
    ///
    /// The bound covers reading the child's output as well, so a process it
    /// leaves behind holding the pipes cannot stretch the call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the configured program.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Runs `<program> <subcommand>`, feeding `input` to stdin if given.
    ///
    /// Stdin is written and stdout/stderr are drained on their own threads so a
    /// full pipe on either side cannot stall the other. With a timeout, both the
    /// child and the collection of its output are bounded by one deadline: a
    /// process the child leaves behind may keep the pipes open, and its
    /// collector threads are then abandoned rather than waited for.
    fn run(&self, subcommand: &str, input: Option<&[u8]>) -> Result<Vec<u8>, PrimitiveError> {
        let program = self.program.display().to_string();
        debug!(program = %program, subcommand, "running key generator");
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);

        let mut child = Command::new(&self.program)
            .arg(subcommand)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PrimitiveError::Spawn {
                program: program.clone(),
                source,
            })?;

        let writer = child.stdin.take().map(|mut pipe| {
            let input = Zeroizing::new(input.unwrap_or_default().to_vec());
            // The pipe is dropped, and therefore closed, as soon as it is written.
            spawn_collector(move || pipe.write_all(&input))
        });
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_reader = spawn_collector(move || read_pipe(stdout));
        let err_reader = spawn_collector(move || read_pipe(stderr));

        let status = self.wait(&mut child, deadline, &program, subcommand)?;

        let written = match writer {
            Some(writer) => self.collect(&writer, deadline, &program, subcommand)?,
            None => Ok(()),
        };
        let out = self.collect(&out_reader, deadline, &program, subcommand)?;
        let err = self.collect(&err_reader, deadline, &program, subcommand)?;

        if !status.success() {
            let stderr = err.unwrap_or_default();
            return Err(PrimitiveError::NonZeroExit {
                program,
                subcommand: subcommand.to_string(),
                code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        written?;
        out.map_err(PrimitiveError::from)
    }

    fn wait(
        &self,
        child: &mut Child,
        deadline: Option<Instant>,
        program: &str,
        subcommand: &str,
    ) -> Result<ExitStatus, PrimitiveError> {
        let Some(deadline) = deadline else {
            return Ok(child.wait()?);
        };

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                // The child may have exited between the poll and the kill.
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.timed_out(program, subcommand));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Waits for a collector thread, no longer than `deadline`.
    fn collect<T>(
        &self,
        results: &Receiver<io::Result<T>>,
        deadline: Option<Instant>,
        program: &str,
        subcommand: &str,
    ) -> Result<io::Result<T>, PrimitiveError> {
        let received = match deadline {
            Some(deadline) => {
                match results.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(result) => Some(result),
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(self.timed_out(program, subcommand));
                    }
                    Err(RecvTimeoutError::Disconnected) => None,
                }
            }
            None => results.recv().ok(),
        };
        Ok(received
            .unwrap_or_else(|| Err(io::Error::other("key generator pipe thread panicked"))))
    }

    fn timed_out(&self, program: &str, subcommand: &str) -> PrimitiveError {
        let timeout = self.timeout.unwrap_or_default();
        warn!(program, subcommand, ?timeout, "key generator timed out");
        PrimitiveError::TimedOut {
            program: program.to_string(),
            subcommand: subcommand.to_string(),
            timeout,
        }
    }
}

impl KeyPrimitive for WgCommand {
    fn generate_private(&self) -> Result<Vec<u8>, PrimitiveError> {
        self.run("genkey", None)
    }

    fn derive_public(&self, private: &[u8]) -> Result<Vec<u8>, PrimitiveError> {
        self.run("pubkey", Some(private))
    }
}

/// Runs `work` on a detached thread and hands back a channel for its result.
fn spawn_collector<T: Send + 'static>(
    work: impl FnOnce() -> io::Result<T> + Send + 'static,
) -> Receiver<io::Result<T>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone once the call timed out; nobody needs the result.
        let _ = sender.send(work());
    });
    receiver
}

fn read_pipe<R: Read>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::PublicKey;

    #[test]
    fn native_output_looks_like_wg() {
        let private = NativeKeys.generate_private().expect("generate");
        assert_eq!(private.len(), 45);
        assert_eq!(private.last(), Some(&b'\n'));

        let public = NativeKeys.derive_public(&private).expect("derive");
        assert_eq!(public.len(), 45);

        let text = String::from_utf8(public).expect("utf8");
        assert!(PublicKey::from_base64(&text).is_ok());
    }

    #[test]
    fn native_derivation_matches_key_types() {
        let private = PrivateKey::generate();
        let public = NativeKeys
            .derive_public(private.to_base64().as_bytes())
            .expect("derive");
        assert_eq!(
            String::from_utf8(public).expect("utf8"),
            format!("{}\n", private.public_key().to_base64())
        );
    }

    #[test]
    fn native_rejects_garbage() {
        let err = NativeKeys.derive_public(b"definitely not a key").expect_err("garbage");
        assert!(matches!(err, PrimitiveError::InvalidKey(_)));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let wg = WgCommand::new().with_program("/nonexistent/wg-for-tests");
        assert_eq!(wg.program(), Path::new("/nonexistent/wg-for-tests"));
        let err = wg.generate_private().expect_err("no such binary");
        assert!(matches!(err, PrimitiveError::Spawn { .. }));
    }

    // All fake-binary cases share one test so no other test thread forks while
    // the script is still open for writing.
    #[cfg(unix)]
    #[test]
    fn wg_command_against_fake_binary() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("wg");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             case \"$1\" in\n\
               genkey) echo PRIVATE ;;\n\
               pubkey) read key; echo \"public-of-$key\" ;;\n\
               slow) exec sleep 5 ;;\n\
               stalled) sleep 3; echo late ;;\n\
               detached) sleep 3 & echo PRIVATE ;;\n\
               *) echo \"unknown command $1\" >&2; exit 3 ;;\n\
             esac\n",
        )
        .expect("write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");

        let wg = WgCommand::new().with_program(&script);
        let private = wg.generate_private().expect("genkey");
        assert_eq!(private, b"PRIVATE\n");

        let public = wg.derive_public(&private).expect("pubkey");
        assert_eq!(public, b"public-of-PRIVATE\n");

        let err = wg.run("bogus", None).expect_err("bad subcommand");
        match err {
            PrimitiveError::NonZeroExit { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "unknown command bogus");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let wg = wg.with_timeout(Duration::from_millis(100));
        let started = Instant::now();
        let err = wg.run("slow", None).expect_err("timeout");
        assert!(matches!(err, PrimitiveError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));

        // `sh` forks `sleep`, which keeps the pipes open after the shell is killed.
        let started = Instant::now();
        let err = wg.run("stalled", None).expect_err("timeout with lingering child");
        assert!(matches!(err, PrimitiveError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));

        // The shell exits on its own but a background job still holds stdout.
        let started = Instant::now();
        let err = wg.run("detached", None).expect_err("timeout on held pipe");
        assert!(matches!(err, PrimitiveError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
