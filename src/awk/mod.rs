// src/awk/mod.rs
//! Delegation to an external Awk interpreter.

use anyhow::{anyhow, bail, Context, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Runs a line-processing script over some input and returns its stdout.
/// A non-zero exit, a timeout or a launch failure is an `Err`.
pub trait AwkInterpreter: Send + Sync {
    fn run(
        &self,
        script: &str,
        input: &str,
        field_separators: Option<&str>,
        timeout: Duration,
    ) -> Result<String>;
}

/// Spawns the configured `awk` binary. Blocking: call it from a plain thread
/// or the blocking pool, never from inside an async task.
#[derive(Debug, Clone)]
pub struct AwkCommand {
    program: String,
}

impl Default for AwkCommand {
    fn default() -> Self {
        Self::new("awk")
    }
}

impl AwkCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[instrument(level = "debug", skip(self, script, input), fields(program = %self.program, input_len = input.len()))]
    async fn run_async(
        &self,
        script: &str,
        input: &str,
        field_separators: Option<&str>,
        timeout: Duration,
    ) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        if let Some(fs) = field_separator_arg(field_separators) {
            cmd.arg("-F").arg(fs);
        }
        cmd.arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("launching {:?}", self.program))?;

        // 1) Feed stdin concurrently so a chatty script can't deadlock on a full pipe
        let mut stdin = child.stdin.take().context("awk stdin unavailable")?;
        let input = input.to_owned();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(input.as_bytes()).await;
            drop(stdin);
            result
        });

        // 2) Collect output, killing the child if it overruns
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| anyhow!("{} timed out after {:?}", self.program, timeout))?
            .with_context(|| format!("waiting for {:?}", self.program))?;

        if let Ok(Err(e)) = writer.await {
            // A script that stops reading early closes the pipe; not fatal
            debug!("run_async: stdin write ended early: {}", e);
        }

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl AwkInterpreter for AwkCommand {
    fn run(
        &self,
        script: &str,
        input: &str,
        field_separators: Option<&str>,
        timeout: Duration,
    ) -> Result<String> {
        let fut = self.run_async(script, input, field_separators, timeout);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(fut),
            Err(_) => tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("building awk runtime")?
                .block_on(fut),
        }
    }
}

/// `-F` argument for a set of single-character separators.
fn field_separator_arg(separators: Option<&str>) -> Option<String> {
    let separators = separators.filter(|s| !s.is_empty())?;
    let mut chars = separators.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c.to_string());
    }
    let mut class = String::from("[");
    for c in separators.chars() {
        if matches!(c, ']' | '\\' | '^' | '-') {
            class.push('\\');
        }
        class.push(c);
    }
    class.push(']');
    Some(class)
}
