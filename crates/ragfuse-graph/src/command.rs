use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use ragfuse_core::config::{expand_path, Settings};
use ragfuse_core::types::GraphItem;
use ragfuse_core::{Error, GraphIndex, Result};
use tokio::process::Command;

/// Graph index behind a query command.
///
/// Invoked as `<program> <args..> <query> --json [--global-only]` from the
/// project root; stdout must be a JSON array of tagged items. The child is
/// killed if the call is abandoned.
#[derive(Debug, Clone)]
pub struct CommandGraphIndex {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
}

impl CommandGraphIndex {
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: PathBuf) -> Self {
        Self { program: program.into(), args, cwd }
    }

    /// `None` when no graph command is configured.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let (program, args) = settings.paths.graph_command.split_first()?;
        let expand = |s: &String| expand_path(s).to_string_lossy().into_owned();
        Some(Self::new(expand(program), args.iter().map(expand).collect(), settings.paths.root()))
    }
}

/// Parse the command's stdout. Items that do not fit any known shape are
/// skipped; a payload that is not a JSON array is an error.
pub fn parse_items(stdout: &[u8]) -> Result<Vec<GraphItem>> {
    let raw: Vec<serde_json::Value> = serde_json::from_slice(stdout)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<GraphItem>(value) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed graph item");
                None
            }
        })
        .collect())
}

#[async_trait]
impl GraphIndex for CommandGraphIndex {
    async fn query_graph(&self, query: &str, global_only: bool) -> Result<Vec<GraphItem>> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(query).arg("--json");
        if global_only {
            cmd.arg("--global-only");
        }
        cmd.current_dir(&self.cwd).stdin(Stdio::null()).kill_on_drop(true);

        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(Error::backend("graph command", format!("exited with {}", output.status)));
        }
        parse_items(&output.stdout)
    }
}
