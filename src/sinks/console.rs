//! Console sink implementation
//!
//! Writes rendered lines to stdout, routing `Error` and `Fatal` events to
//! stderr. Lines accumulate in an internal buffer between
//! `connect_and_start` and `commit_and_close`, so a batched commit is one
//! write syscall per stream.

use crate::core::{Level, LogEvent, Result, Sink};
use std::io::Write;

pub struct ConsoleSink {
    name: String,
    use_colors: bool,
    out_buf: String,
    err_buf: String,
}

impl ConsoleSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            use_colors: true,
            out_buf: String::new(),
            err_buf: String::new(),
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn render(&self, event: &LogEvent) -> String {
        let line = super::render_line(event);
        if self.use_colors {
            use colored::Colorize;
            line.color(event.level.color_code()).to_string()
        } else {
            line
        }
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_buffered(&self) -> bool {
        true
    }

    fn connect_and_start(&mut self) -> Result<()> {
        self.out_buf.clear();
        self.err_buf.clear();
        Ok(())
    }

    fn write_internal(&mut self, event: &LogEvent) -> Result<()> {
        let line = self.render(event);
        let buf = match event.level {
            Level::Error | Level::Fatal => &mut self.err_buf,
            _ => &mut self.out_buf,
        };
        buf.push_str(&line);
        buf.push('\n');
        Ok(())
    }

    fn commit_and_close(&mut self) -> Result<()> {
        if !self.out_buf.is_empty() {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(self.out_buf.as_bytes())?;
            stdout.flush()?;
            self.out_buf.clear();
        }
        if !self.err_buf.is_empty() {
            let mut stderr = std::io::stderr().lock();
            stderr.write_all(self.err_buf.as_bytes())?;
            stderr.flush()?;
            self.err_buf.clear();
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.commit_and_close()
    }
}
