use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::athenian::sink::ReleaseSink;
use crate::error::{Error, Result};
use crate::models::Release;

/// Writes every batch as one line of JSON instead of sending it.
pub struct DryRunSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> DryRunSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.out.into_inner().map_err(|_| poisoned())
    }
}

impl DryRunSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

fn poisoned() -> Error {
    Error::Io(io::Error::other("dry-run output lock poisoned"))
}

#[async_trait]
impl<W: Write + Send + 'static> ReleaseSink for DryRunSink<W> {
    async fn submit(&self, batch: &[Release]) -> Result<()> {
        let data = serde_json::to_string(batch)?;
        let mut out = self.out.lock().map_err(|_| poisoned())?;
        writeln!(out, "{}", data)?;
        out.flush()?;
        Ok(())
    }
}
