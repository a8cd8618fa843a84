//! File sink implementation
//!
//! Appends rendered lines to a file. `connect_and_start` opens the file
//! lazily and keeps it open across round-trips; `commit_and_close` flushes
//! the buffered writer so a committed batch is durable. Rotation and
//! compression are external concerns.

use crate::core::{LogEvent, PipelineError, Result, Sink};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_buffered(&self) -> bool {
        true
    }

    fn connect_and_start(&mut self) -> Result<()> {
        if self.writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| {
                    PipelineError::io_operation(
                        "opening log file",
                        self.path.display().to_string(),
                        e,
                    )
                })?;
            self.writer = Some(BufWriter::new(file));
        }
        Ok(())
    }

    fn write_internal(&mut self, event: &LogEvent) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| PipelineError::sink(&self.name, "file not open"))?;
        let mut line = super::render_line(event);
        line.push('\n');
        writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn commit_and_close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.commit_and_close()?;
        self.writer = None;
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // best-effort flush of anything not yet committed
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}
