//! Single aggregating writer for the filtered triple stream.
//!
//! Shard workers never touch the output file. They hand whole batches to one
//! writer thread through a bounded channel; a full channel blocks the sending
//! worker, which is the only contention point between shards. Batch order
//! across shards is unspecified.
//!
//! The sinks also share an abort flag. Once one shard fails, every other
//! worker sees it on its next line and stops.

use crate::FilterError;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

pub type Batch = Vec<String>;

/// Cloneable handle used by shard workers to submit batches.
#[derive(Clone, Debug)]
pub struct OutputSink {
    tx: SyncSender<Batch>,
    aborted: Arc<AtomicBool>,
}

impl OutputSink {
    pub fn send(&self, batch: Batch) -> Result<(), FilterError> {
        if self.is_aborted() {
            return Err(FilterError::Aborted);
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.tx.send(batch).map_err(|_| FilterError::WriterClosed)
    }

    /// Ask every worker sharing this writer to stop.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }
}

pub struct AggregatingWriter {
    tx: SyncSender<Batch>,
    aborted: Arc<AtomicBool>,
    handle: JoinHandle<std::io::Result<u64>>,
    target: String,
}

impl AggregatingWriter {
    /// Append to `path` (created if missing).
    pub fn append_to(path: &Path, capacity: usize) -> Result<Self, FilterError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FilterError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| FilterError::io(path, e))?;
        Self::spawn(BufWriter::new(file), capacity, path.display().to_string())
    }

    pub fn spawn<W: Write + Send + 'static>(
        mut out: W,
        capacity: usize,
        target: String,
    ) -> Result<Self, FilterError> {
        let (tx, rx) = mpsc::sync_channel::<Batch>(capacity.max(1));
        let handle = std::thread::Builder::new()
            .name("kgprune_output_writer".to_string())
            .spawn(move || -> std::io::Result<u64> {
                let mut written = 0u64;
                for batch in rx {
                    for line in &batch {
                        out.write_all(line.as_bytes())?;
                        out.write_all(b"\n")?;
                    }
                    written += batch.len() as u64;
                }
                out.flush()?;
                Ok(written)
            })
            .map_err(|e| FilterError::Io {
                context: "spawning output writer".to_string(),
                source: e,
            })?;
        Ok(Self {
            tx,
            aborted: Arc::new(AtomicBool::new(false)),
            handle,
            target,
        })
    }

    pub fn sink(&self) -> OutputSink {
        OutputSink {
            tx: self.tx.clone(),
            aborted: Arc::clone(&self.aborted),
        }
    }

    /// Close the channel and wait for the writer to drain.
    ///
    /// Every [`OutputSink`] must be dropped first, otherwise this blocks.
    /// Returns the number of lines written.
    pub fn finish(self) -> Result<u64, FilterError> {
        let Self {
            tx,
            handle,
            target,
            ..
        } = self;
        drop(tx);
        match handle.join() {
            Ok(Ok(written)) => Ok(written),
            Ok(Err(e)) => Err(FilterError::Io {
                context: target,
                source: e,
            }),
            Err(_) => Err(FilterError::WriterPanicked),
        }
    }
}
