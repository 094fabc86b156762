use crate::models::GameRecord;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

// ── Sink trait ────────────────────────────────────────────────────────────────

/// Downstream consumer of finished records.
pub trait RecordSink: Send {
    fn emit(&mut self, record: &GameRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ── JSON lines ────────────────────────────────────────────────────────────────

/// One compact JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    out: BufWriter<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
        }
    }
}

impl JsonLinesSink<File> {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        info!("Writing records to {:?}", path);
        Ok(Self::new(file))
    }
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &GameRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)
            .with_context(|| format!("serialize game {}", record.game_id))?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().context("flush record sink")
    }
}

// ── In-memory ─────────────────────────────────────────────────────────────────

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<GameRecord>,
}

#[cfg(test)]
impl RecordSink for MemorySink {
    fn emit(&mut self, record: &GameRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
