//! External report renderer.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ReportError, ReportResult};

/// Default renderer command line.
pub const DEFAULT_RENDERER: &str = "npx allure";

const STDERR_CAP: usize = 4096;

/// Turns a directory of raw results into a static report site.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Render `input` into `output`, replacing whatever `output` held.
    async fn render(&self, input: &Path, output: &Path) -> ReportResult<()>;
}

/// Runs `<program> [args..] generate <input> --clean -o <output>`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Split a command line such as `npx allure` into program and leading args.
    pub fn from_command_line(command: &str) -> ReportResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| ReportError::Config {
            message: "renderer command is empty".to_string(),
        })?;
        Ok(Self {
            program,
            args: parts.collect(),
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl ReportRenderer for CommandRenderer {
    async fn render(&self, input: &Path, output: &Path) -> ReportResult<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("generate")
            .arg(input)
            .arg("--clean")
            .arg("-o")
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program, input = %input.display(), output = %output.display(), "rendering report");

        let child = cmd.output();
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| ReportError::RendererTimeout(limit))?,
            None => child.await,
        };
        let out = result.map_err(|e| ReportError::Renderer {
            message: format!("failed to spawn {}: {}", self.program, e),
        })?;

        if !out.status.success() {
            let mut stderr = String::from_utf8_lossy(&out.stderr).into_owned();
            stderr.truncate(STDERR_CAP);
            return Err(ReportError::Renderer {
                message: format!("{} exited with {}: {}", self.program, out.status, stderr.trim()),
            });
        }
        Ok(())
    }
}
