use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::Mutex;

use log::{debug, warn};

use crate::trace::trace::{TraceEvent, TraceKind};

/// JSONL sink for selection runs.
///
/// Click events are buffered and written out together when the batch that
/// produced them ends, so a long paced batch does not touch the disk on every
/// tap. Selection and batch-done events flush immediately. A logger whose
/// file failed to open is a no-op.
pub struct TraceLogger {
    sink: Option<Mutex<TraceSink>>,
}

struct TraceSink {
    out: BufWriter<File>,
    pending: usize,
    written: usize,
}

impl TraceSink {
    fn flush(&mut self) {
        if self.pending == 0 {
            return;
        }
        match self.out.flush() {
            Ok(()) => {
                debug!("Trace: flushed {} event(s)", self.pending);
                self.written += self.pending;
            }
            Err(e) => warn!("failed to flush trace events: {}", e),
        }
        self.pending = 0;
    }
}

impl TraceLogger {
    pub fn new(path: &str) -> Self {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                sink: Some(Mutex::new(TraceSink {
                    out: BufWriter::new(file),
                    pending: 0,
                    written: 0,
                })),
            },
            Err(e) => {
                warn!("could not open trace file '{}': {}", path, e);
                Self { sink: None }
            }
        }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else {
            return;
        };

        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                warn!("failed to serialize trace event: {}", e);
                return;
            }
        };

        let Ok(mut sink) = sink.lock() else {
            warn!("trace logger lock poisoned");
            return;
        };

        if let Err(e) = writeln!(sink.out, "{}", json) {
            warn!("failed to write trace event: {}", e);
            return;
        }
        sink.pending += 1;

        if event.kind != TraceKind::Click {
            sink.flush();
        }
    }

    /// Write out buffered click events.
    pub fn flush(&self) {
        if let Some(Ok(mut sink)) = self.sink.as_ref().map(Mutex::lock) {
            sink.flush();
        }
    }

    /// Events that have reached the file.
    pub fn events_written(&self) -> usize {
        match self.sink.as_ref().map(Mutex::lock) {
            Some(Ok(sink)) => sink.written,
            _ => 0,
        }
    }
}

impl Drop for TraceLogger {
    fn drop(&mut self) {
        self.flush();
    }
}
