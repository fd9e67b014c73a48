//! Background index writer.
//!
//! A single worker thread drains a FIFO mailbox of completed builders and
//! serializes each to its destination file, so the producer can keep
//! filling the next segment while the previous one is compressed and
//! written.
//!
//! `submit` never waits for serialization. With an unbounded mailbox
//! (the default) a producer that outpaces the disk grows the queue without
//! limit; set `mailbox_capacity` to make `submit` block instead.
//!
//! Dropping the writer, or calling `shutdown`, sends `Stop` and joins the
//! worker after every job queued before it has been written.

use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::codec::Method;
use crate::error::{IndexError, Result};
use crate::index::builder::{AcceptStats, IndexBuilder};
use crate::index::file::write_index_file;

/// A completed builder of any key width.
#[derive(Debug)]
pub enum AnyBuilder {
    U16(IndexBuilder<u16>),
    U32(IndexBuilder<u32>),
    U64(IndexBuilder<u64>),
    U128(IndexBuilder<u128>),
}

impl AnyBuilder {
    pub fn is_empty(&self) -> bool {
        match self {
            AnyBuilder::U16(b) => b.is_empty(),
            AnyBuilder::U32(b) => b.is_empty(),
            AnyBuilder::U64(b) => b.is_empty(),
            AnyBuilder::U128(b) => b.is_empty(),
        }
    }

    fn write(self, job_path: &std::path::Path, method: Method, segment_offset: u64) -> Result<AcceptStats> {
        match self {
            AnyBuilder::U16(b) => write_index_file(job_path, b, method, segment_offset),
            AnyBuilder::U32(b) => write_index_file(job_path, b, method, segment_offset),
            AnyBuilder::U64(b) => write_index_file(job_path, b, method, segment_offset),
            AnyBuilder::U128(b) => write_index_file(job_path, b, method, segment_offset),
        }
    }
}

/// One index file to write.
#[derive(Debug)]
pub struct WriteJob {
    pub path: PathBuf,
    pub method: Method,
    pub segment_offset: u64,
    pub builder: AnyBuilder,
}

/// Totals reported when the worker exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub files_written: usize,
    pub bytes_written: u64,
    pub keys_written: usize,
    /// Jobs whose file could not be written (logged, not retried).
    pub failures: usize,
}

enum Message {
    Write(WriteJob),
    Stop,
}

pub struct IndexWriter {
    tx: Sender<Message>,
    handle: Option<JoinHandle<WriterStats>>,
}

impl IndexWriter {
    /// Start the worker. `mailbox_capacity` bounds the queue when set.
    pub fn spawn(mailbox_capacity: Option<usize>) -> Result<Self> {
        let (tx, rx) = match mailbox_capacity {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };
        let handle = thread::Builder::new()
            .name("pktidx-writer".into())
            .spawn(move || run_worker(rx))?;
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Queue a job. Blocks only when a bounded mailbox is full.
    pub fn submit(&self, job: WriteJob) -> Result<()> {
        self.tx
            .send(Message::Write(job))
            .map_err(|_| IndexError::WriterClosed)
    }

    /// Jobs waiting in the mailbox.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Drain the queue, stop the worker and return its totals.
    pub fn shutdown(mut self) -> Result<WriterStats> {
        self.stop()
    }

    fn stop(&mut self) -> Result<WriterStats> {
        let Some(handle) = self.handle.take() else {
            return Ok(WriterStats::default());
        };
        // the worker only exits on Stop, so a failed send means it panicked
        let _ = self.tx.send(Message::Stop);
        handle
            .join()
            .map_err(|_| IndexError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "index writer thread panicked",
            )))
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!("index writer shutdown failed: {}", e);
        }
    }
}

fn run_worker(rx: Receiver<Message>) -> WriterStats {
    let mut stats = WriterStats::default();
    for msg in rx.iter() {
        let job = match msg {
            Message::Write(job) => job,
            Message::Stop => break,
        };
        let started = Instant::now();
        match job.builder.write(&job.path, job.method, job.segment_offset) {
            Ok(accepted) => {
                stats.files_written += 1;
                stats.bytes_written += accepted.bytes_written;
                stats.keys_written += accepted.key_count;
                tracing::info!(
                    "wrote {} ({} keys, {} offsets, {} bytes) in {}ms",
                    job.path.display(),
                    accepted.key_count,
                    accepted.value_count,
                    accepted.bytes_written,
                    started.elapsed().as_millis()
                );
            }
            Err(e) => {
                stats.failures += 1;
                tracing::error!("failed to write {}: {}", job.path.display(), e);
            }
        }
    }
    stats
}

// ── Tests ──────────────────────────────────────────────────────────
