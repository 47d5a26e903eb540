//! Changed-path lookup backed by the local git checkout.

use async_trait::async_trait;
use decision_core::ports::ChangedPaths;
use decision_core::{Error, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

pub struct GitChangedPaths {
    repo: PathBuf,
    timeout: Duration,
}

impl GitChangedPaths {
    pub fn new(repo: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            repo: repo.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ChangedPaths for GitChangedPaths {
    async fn changed_paths(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let range = format!("{}..{}", base, head);
        debug!(repo = %self.repo.display(), range = %range, "Running git diff");

        let child = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(["diff", "--no-renames", "--name-only", "-z", &range])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| Error::Git(format!("git diff {} timed out after {:?}", range, self.timeout)))?
            .map_err(|e| Error::Git(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Git(format!(
                "git diff {} failed ({}): {}",
                range,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_name_list(&output.stdout))
    }
}

/// Split NUL-separated `--name-only -z` output.
fn parse_name_list(stdout: &[u8]) -> Vec<String> {
    stdout
        .split(|&b| b == 0)
        .filter(|name| !name.is_empty())
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}
