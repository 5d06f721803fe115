//! Trace Runner (§4.1, C1): spawns the target binary with a concrete
//! input and parses its basic-block trace from stderr.

use crate::address::Path;
use crate::error::FuzzError;
use std::io::Write;
use std::path::{Path as FsPath, PathBuf};
use std::process::{Command, Stdio};

/// The sentinel exit status signalling a found bug (§4.1, §6).
pub const BUG_FOUND_STATUS: i32 = 100;

/// Outcome of one concrete run of the target binary.
#[derive(Debug, Clone)]
pub struct TraceOutcome {
    pub path: Path,
    pub bug_found: bool,
}

/// Spawns `binary` with piped stdin/stderr for each mutant.
pub struct TraceRunner {
    binary: PathBuf,
}

impl TraceRunner {
    pub fn new(binary: impl AsRef<FsPath>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    /// Runs `input` through the target binary once, synchronously.
    /// Spawn failures and trace-length violations are the only errors
    /// this returns; both are non-fatal per §7 and are handled by the
    /// caller as a skipped iteration.
    pub fn trace(&self, input: &[u8]) -> Result<TraceOutcome, FuzzError> {
        let mut child = Command::new(&self.binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FuzzError::Spawn(e.to_string()))?;

        // Write the whole input then drop stdin so the child sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(input);
        }

        let output = child
            .wait_with_output()
            .map_err(|e| FuzzError::Spawn(e.to_string()))?;

        if output.stderr.len() % 8 != 0 {
            return Err(FuzzError::TraceLength(output.stderr.len()));
        }
        let path = Path::from_packed(&output.stderr)
            .ok_or(FuzzError::TraceLength(output.stderr.len()))?;
        let bug_found = output.status.code() == Some(BUG_FOUND_STATUS);
        Ok(TraceOutcome { path, bug_found })
    }
}
