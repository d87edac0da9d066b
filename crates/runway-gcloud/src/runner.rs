//! External command execution
//!
//! Every cloud operation goes through a [`CommandRunner`]. The production
//! implementation spawns real processes; tests substitute a scripted runner.

use crate::error::{GcloudError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Argument prefixes whose values must never show up in a trace
const REDACTED_PREFIXES: &[&str] = &["--root-password=", "--password="];

/// Per-invocation options
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Trace the command at debug level only
    pub quiet: bool,
    /// Bytes written to the child's stdin, then stdin is closed
    pub stdin: Option<String>,
    /// Hand the terminal to the child (browser logins, OAuth flows)
    pub interactive: bool,
}

impl ExecOptions {
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    pub fn interactive() -> Self {
        Self {
            interactive: true,
            ..Self::default()
        }
    }

    pub fn with_stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }
}

/// Captured result of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: i32,
}

/// Runs external programs
///
/// Implementations return [`GcloudError::ExecutionFailed`] for a nonzero exit;
/// callers decide whether that is fatal.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], options: &ExecOptions)
    -> Result<CommandOutput>;
}

/// Spawns processes with `tokio::process`
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<CommandOutput> {
        let rendered = display_command(program, args);
        if options.quiet {
            tracing::debug!("Running: {}", rendered);
        } else {
            tracing::info!("Running: {}", rendered);
        }

        let mut cmd = Command::new(program);
        cmd.args(args);
        if options.interactive {
            cmd.stdin(Stdio::inherit());
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
            cmd.stdin(if options.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        }

        let mut child = cmd.spawn()?;

        if let Some(payload) = &options.stdin
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin.write_all(payload.as_bytes()).await?;
            // dropping closes the pipe so the child sees EOF
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        let exit_code = output.status.code().unwrap_or(-1);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GcloudError::ExecutionFailed {
                command: rendered,
                exit_code,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            exit_code,
        })
    }
}

/// Render a command line for logs and error messages, masking passwords
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.to_string());
    for arg in args {
        match REDACTED_PREFIXES.iter().find(|p| arg.starts_with(*p)) {
            Some(prefix) => parts.push(format!("{}****", prefix)),
            None => parts.push(arg.clone()),
        }
    }
    parts.join(" ")
}
