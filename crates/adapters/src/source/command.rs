// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source backed by an external feed program: every stdout line is one record.

use super::{EventSink, Flow, SourceConfig, SourceError, StreamSource};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

pub struct CommandSource {
    terms: Vec<String>,
    command: Vec<String>,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
}

impl CommandSource {
    pub fn new(terms: Vec<String>) -> Self {
        Self { terms, command: Vec::new(), child: None, stdout: None }
    }

    fn build_command(&self) -> Result<Command, SourceError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| SourceError::NotConfigured("empty command".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg("--track")
            .arg(self.terms.join(","))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        Ok(cmd)
    }
}

#[async_trait]
impl StreamSource for CommandSource {
    fn configure(&mut self, config: &SourceConfig) -> Result<(), SourceError> {
        if config.command.is_empty() {
            return Err(SourceError::NotConfigured("source.command is empty".to_string()));
        }
        self.command = config.command.clone();
        Ok(())
    }

    async fn initialize(&mut self) -> Result<(), SourceError> {
        let mut child = self.build_command()?.spawn().map_err(SourceError::Spawn)?;
        let stdout = child.stdout.take().ok_or(SourceError::NotInitialized)?;
        tracing::info!(
            program = %self.command[0],
            pid = child.id().unwrap_or_default(),
            terms = self.terms.len(),
            "source connected"
        );
        self.stdout = Some(BufReader::new(stdout));
        self.child = Some(child);
        Ok(())
    }

    async fn run(
        &mut self,
        sink: &mut dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), SourceError> {
        let stdout = self.stdout.as_mut().ok_or(SourceError::NotInitialized)?;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("source run cancelled");
                    return Ok(());
                }
                read = stdout.read_until(b'\n', &mut buf) => {
                    if read? == 0 {
                        tracing::info!("source disconnected");
                        return Ok(());
                    }
                    if sink.on_event(&decode_record(&buf)) == Flow::Stop {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn shutdown(&mut self) -> Result<(), SourceError> {
        self.stdout = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        if child.try_wait()?.is_none() {
            child.start_kill()?;
        }
        let status = child.wait().await?;
        tracing::debug!(%status, "source process exited");
        Ok(())
    }
}

/// One raw line without its terminator. Invalid UTF-8 is replaced rather
/// than ending the stream.
fn decode_record(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    match String::from_utf8_lossy(line) {
        std::borrow::Cow::Borrowed(text) => text.to_string(),
        std::borrow::Cow::Owned(text) => {
            tracing::warn!(bytes = line.len(), "source record is not valid UTF-8, replacing bad bytes");
            text
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
