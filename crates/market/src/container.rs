//! Container runner — executes a one-shot image and reads JSON from stdout.
//!
//! Collector images print their result as JSON, but may mix log lines into
//! stdout. When the whole output is not valid JSON, the trailing JSON value
//! is recovered: the latest `[` or `{` from which the rest of the output
//! parses as one value.

use dealwatch_core::error::CapabilityError;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs images through a container CLI (`docker run -e K=V <image>`).
#[derive(Debug, Clone)]
pub struct ContainerRunner {
    binary: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl ContainerRunner {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            extra_args: Vec::new(),
            timeout,
        }
    }

    /// Extra arguments placed between `run` and the environment flags.
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Build the argument list for one run.
    fn args(&self, image: &str, env: &[(&str, &str)]) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        args.extend(self.extra_args.iter().cloned());
        for (key, value) in env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        args.push(image.to_string());
        args
    }

    /// Run `image` with the given environment and parse its stdout as JSON.
    pub async fn run(
        &self,
        image: &str,
        env: &[(&str, &str)],
    ) -> Result<serde_json::Value, CapabilityError> {
        let args = self.args(image, env);
        debug!(binary = %self.binary, ?args, "Running container");

        let mut command = Command::new(&self.binary);
        command.args(&args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| CapabilityError::Timeout {
                capability: image.to_string(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| CapabilityError::ExecutionFailed {
                capability: image.to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(image, exit_code = code, stderr = %stderr.trim(), "Container exited with failure");
            return Err(CapabilityError::ExecutionFailed {
                capability: image.to_string(),
                reason: format!("exit code {code}"),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_stdout(&stdout).ok_or_else(|| CapabilityError::InvalidOutput {
            capability: image.to_string(),
            reason: "stdout did not contain JSON".into(),
        })
    }
}

/// Parse collector output, falling back to the trailing JSON value.
pub fn parse_stdout(raw: &str) -> Option<serde_json::Value> {
    let raw = raw.trim();
    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }

    // Openers nested inside the trailing value fail to parse on their own,
    // so keep walking back until a suffix parses.
    raw.rmatch_indices(['[', '{'])
        .find_map(|(start, _)| serde_json::from_str(&raw[start..]).ok())
}
