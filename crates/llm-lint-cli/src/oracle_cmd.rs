//! Oracle transport that delegates to an external command.
//!
//! The command receives the [`OracleRequest`] as JSON on stdin and must print
//! an [`OracleReply`] as JSON on stdout:
//!
//! ```text
//! stdin:  {"model": "...", "temperature": 0.0, "messages": [{"role": "system", "content": "..."}]}
//! stdout: {"text": "...", "usage": {"promptTokens": 1, "completionTokens": 2, "totalTokens": 3}, "cost": 0.0, "cached": false}
//! ```

use async_trait::async_trait;
use llm_lint_core::{Oracle, OracleError, OracleReply, OracleRequest};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs one process per oracle call.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandOracle {
    /// Builds the transport from `[llm].command`; `None` if it is empty.
    #[must_use]
    pub fn new(command: &[String], timeout_secs: u64) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        })
    }
}

#[async_trait]
impl Oracle for CommandOracle {
    async fn invoke(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| OracleError::Transport(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OracleError::Transport(format!("failed to spawn `{}`: {e}", self.program)))?;

        // Feed stdin alongside the wait so a child that never reads cannot
        // stall the call past its timeout.
        let stdin = child.stdin.take();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload).await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let Ok(waited) = tokio::time::timeout(self.timeout, child.wait_with_output()).await else {
            writer.abort();
            return Err(OracleError::Timeout {
                secs: self.timeout.as_secs(),
            });
        };
        let output = waited.map_err(|e| OracleError::Transport(e.to_string()))?;

        if !output.status.success() {
            writer.abort();
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OracleError::Transport(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(OracleError::Transport(format!("failed to write request: {e}")))
            }
            Err(e) => return Err(OracleError::Transport(e.to_string())),
        }

        tracing::debug!(
            "`{}` replied with {} byte(s)",
            self.program,
            output.stdout.len()
        );
        parse_reply(&output.stdout)
    }
}

fn parse_reply(stdout: &[u8]) -> Result<OracleReply, OracleError> {
    serde_json::from_slice(stdout)
        .map_err(|e| OracleError::Transport(format!("invalid reply JSON: {e}")))
}
