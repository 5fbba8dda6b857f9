// Durable append log.
//
// Every line is written straight to the sink when possible. A failed write
// parks the line in an in-memory backlog that is retried, oldest first, on
// every later append. Write failures never reach the caller and never go
// through any error-reporting path, so a broken sink cannot cause a report
// loop.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use scanlog_core::record;

// Append-only destination for formatted log lines.
pub trait AppendSink: Send + Sync {
    fn append(&self, text: &str) -> io::Result<()>;
    fn read_all(&self) -> io::Result<String>;
    fn clear(&self) -> io::Result<()>;
}

// UTF-8 log file, opened per write so another process holding it briefly
// only costs a retry.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AppendSink for FileSink {
    fn append(&self, text: &str) -> io::Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let start = f.metadata()?.len();
        write_or_rollback(&mut f, text.as_bytes(), |f| {
            let _ = f.set_len(start);
        })
    }

    fn read_all(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            r => r,
        }
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            r => r,
        }
    }
}

// A write that fails halfway (e.g. disk full) would leave a line prefix on
// disk, and the retry would then duplicate it. Cut back to where the line
// started. Assumes this process is the only writer of the file.
fn write_or_rollback<W: Write>(
    w: &mut W,
    text: &[u8],
    rollback: impl FnOnce(&mut W),
) -> io::Result<()> {
    match w.write_all(text) {
        Ok(()) => Ok(()),
        Err(e) => {
            rollback(w);
            Err(e)
        }
    }
}

pub struct AppendLog<S: AppendSink = FileSink> {
    sink: S,
    backlog: Mutex<Vec<String>>,
    retry_delay: Duration,
    echo: bool,
}

impl AppendLog<FileSink> {
    // File-backed log. Missing parent directories are created up front; if
    // that fails the log still works and buffers until the path is writable.
    pub fn open(path: impl Into<PathBuf>, retry_delay: Duration, echo: bool) -> Self {
        let sink = FileSink::new(path);
        if let Some(parent) = sink.path().parent() {
            let _ = fs::create_dir_all(parent);
        }
        Self::new(sink, retry_delay, echo)
    }
}

impl<S: AppendSink> AppendLog<S> {
    pub fn new(sink: S, retry_delay: Duration, echo: bool) -> Self {
        Self {
            sink,
            backlog: Mutex::new(Vec::new()),
            retry_delay,
            echo,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn lock_backlog(&self) -> MutexGuard<'_, Vec<String>> {
        // A panic mid-write leaves the backlog consistent: every entry is
        // still an unwritten line.
        self.backlog
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Stamp `content` with the current time of day and persist it, or park
    // it in the backlog if the sink refuses the write.
    pub fn append(&self, content: &str) {
        let mut backlog = self.lock_backlog();
        self.drain(&mut backlog);

        let text = record::stamp_now(content);
        if self.write_raw(&text).is_err() {
            backlog.push(text);
            thread::sleep(self.retry_delay);
            self.drain(&mut backlog);
        }
    }

    pub fn flush_backlog(&self) {
        let mut backlog = self.lock_backlog();
        self.drain(&mut backlog);
    }

    pub fn pending(&self) -> usize {
        self.lock_backlog().len()
    }

    pub fn backlog(&self) -> Vec<String> {
        self.lock_backlog().clone()
    }

    pub fn read_all(&self) -> Result<String> {
        self.sink.read_all().context("read log failed")
    }

    // Delete everything written so far. Lines still in the backlog are kept
    // and land in the fresh log on the next append.
    pub fn clear(&self) -> Result<()> {
        let _backlog = self.lock_backlog();
        self.sink.clear().context("clear log failed")
    }

    // Last flush; returns the lines that could not be written.
    pub fn shutdown(self) -> Vec<String> {
        let mut backlog = self
            .backlog
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !backlog.is_empty() {
            let pending = std::mem::take(&mut backlog);
            for text in pending {
                if Self::write_to(&self.sink, self.echo, &text).is_err() {
                    backlog.push(text);
                }
            }
        }
        backlog
    }

    fn drain(&self, backlog: &mut Vec<String>) {
        if backlog.is_empty() {
            return;
        }
        let pending = std::mem::take(backlog);
        for text in pending {
            if self.write_raw(&text).is_err() {
                backlog.push(text);
            }
        }
    }

    fn write_raw(&self, text: &str) -> io::Result<()> {
        Self::write_to(&self.sink, self.echo, text)
    }

    fn write_to(sink: &S, echo: bool, text: &str) -> io::Result<()> {
        if echo {
            crate::safe_eprint!("{text}");
        }
        sink.append(text)
    }
}
