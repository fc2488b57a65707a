use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::warn;

use crate::geometry::Rejection;

/// One line of the debug log.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum Record<'a> {
    #[serde(rename = "geometry.rejected")]
    Rejected {
        source: &'a str,
        kind: &'a str,
        reason: String,
    },
    #[serde(rename = "debug.summary")]
    Summary {
        context: &'a str,
        counts: BTreeMap<String, u64>,
    },
}

/// JSONL sink for rejections and per-kind outcome counters. Clones share
/// the same file and counters.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    shared: Arc<Mutex<Sink>>,
}

struct Sink {
    out: BufWriter<File>,
    counts: BTreeMap<String, u64>,
}

impl Sink {
    fn write(&mut self, record: &Record<'_>) {
        let written = serde_json::to_writer(&mut self.out, record)
            .map_err(io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"));
        if let Err(err) = written {
            warn!(error = %err, "failed to write debug record");
        }
    }
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            shared: Arc::new(Mutex::new(Sink {
                out: BufWriter::new(file),
                counts: BTreeMap::new(),
            })),
        })
    }

    // A poisoned lock only means another worker panicked mid-write; the
    // counters are still usable.
    fn sink(&self) -> MutexGuard<'_, Sink> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn log_rejection(&self, rejection: &Rejection) {
        let mut sink = self.sink();
        sink.write(&Record::Rejected {
            source: rejection.id.as_str(),
            kind: rejection.kind,
            reason: rejection.reason.to_string(),
        });
        *sink
            .counts
            .entry(format!("rejected.{}", rejection.kind))
            .or_default() += 1;
    }

    pub fn count_accepted(&self, kind: &str) {
        *self
            .sink()
            .counts
            .entry(format!("accepted.{kind}"))
            .or_default() += 1;
    }

    /// Writes a summary of the counters gathered since the last summary and
    /// resets them.
    pub fn emit_summary(&self, context: &str) {
        let mut sink = self.sink();
        let counts = std::mem::take(&mut sink.counts);
        sink.write(&Record::Summary { context, counts });
        if let Err(err) = sink.out.flush() {
            warn!(error = %err, "failed to flush debug log");
        }
    }
}
