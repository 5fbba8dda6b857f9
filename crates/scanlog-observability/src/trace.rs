use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::Error as AnyhowError;
use serde::Serialize;
use serde_json::Value;

const DEFAULT_TRACE_MAX_BYTES: u64 = 5_000_000; // 5MB
const DEFAULT_TRACE_MAX_FILES: usize = 3;
const DEFAULT_BACKTRACE_MAX_CHARS: usize = 12_000;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn env_bool_default_true(key: &str) -> bool {
    match std::env::var(key) {
        Ok(v) => {
            let t = v.trim().to_ascii_lowercase();
            !(t == "0" || t == "false" || t == "no" || t == "off")
        }
        Err(_) => true,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(v) => v.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

fn enabled() -> bool {
    env_bool_default_true("SCANLOG_TRACE_ENABLED")
}

fn backtrace_enabled() -> bool {
    env_bool_default_true("SCANLOG_TRACE_BACKTRACE")
}

fn max_bytes() -> u64 {
    env_parse("SCANLOG_TRACE_MAX_BYTES", DEFAULT_TRACE_MAX_BYTES)
}

fn max_files() -> usize {
    env_parse("SCANLOG_TRACE_MAX_FILES", DEFAULT_TRACE_MAX_FILES)
}

// One id per process so trace lines from different runs can be told apart.
pub fn session_id() -> &'static str {
    static SESSION_ID: OnceLock<String> = OnceLock::new();
    SESSION_ID.get_or_init(|| uuid::Uuid::new_v4().to_string())
}

pub fn trace_path(data_dir: &Path) -> PathBuf {
    data_dir.join("trace.jsonl")
}

fn rotate_if_needed_best_effort(data_dir: &Path) {
    let p = trace_path(data_dir);
    let max_f = max_files();
    if max_f == 0 {
        return;
    }
    let len = match std::fs::metadata(&p) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if len <= max_bytes() {
        return;
    }

    // Windows refuses to rename onto an existing file.
    let oldest = data_dir.join(format!("trace.jsonl.{max_f}"));
    if oldest.exists() {
        let _ = std::fs::remove_file(&oldest);
    }
    for i in (1..max_f).rev() {
        let src = data_dir.join(format!("trace.jsonl.{i}"));
        let dst = data_dir.join(format!("trace.jsonl.{}", i + 1));
        if src.exists() {
            let _ = std::fs::rename(&src, &dst);
        }
    }
    let _ = std::fs::rename(&p, data_dir.join("trace.jsonl.1"));
}

fn trace_write_lock() -> &'static Mutex<()> {
    static TRACE_WRITE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    TRACE_WRITE_LOCK.get_or_init(|| Mutex::new(()))
}

pub fn emit_best_effort(data_dir: &Path, ev: &TraceEvent) {
    if !enabled() {
        return;
    }
    let _guard = trace_write_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let _ = std::fs::create_dir_all(data_dir);
    rotate_if_needed_best_effort(data_dir);

    let p = trace_path(data_dir);
    let mut f = match OpenOptions::new().create(true).append(true).open(&p) {
        Ok(f) => f,
        Err(e) => {
            crate::safe_eprintln!("trace: open failed: {}: {e}", p.display());
            return;
        }
    };
    let mut line = match serde_json::to_string(ev) {
        Ok(s) => s,
        Err(e) => {
            crate::safe_eprintln!("trace: serialize failed: {e}");
            return;
        }
    };
    line.push('\n');
    if let Err(e) = f.write_all(line.as_bytes()) {
        crate::safe_eprintln!("trace: write failed: {e}");
    }
}

fn clamp_chars(s: &str, max_chars: usize) -> String {
    s.chars().filter(|ch| *ch != '\0').take(max_chars).collect()
}

// Scrub the user name out of home-directory paths (`/home/<x>/`,
// `C:\Users\<x>\`) so logs can be attached to public issues.
pub fn redact_user_paths(s: &str) -> String {
    fn scrub_after(hay: &str, marker: &str, sep: char) -> String {
        let mut out = String::with_capacity(hay.len());
        let mut i = 0;
        while let Some(pos) = hay[i..].find(marker) {
            let abs = i + pos;
            out.push_str(&hay[i..abs]);
            out.push_str(marker);
            let name_start = abs + marker.len();
            let name_len: usize = hay[name_start..]
                .chars()
                .take_while(|ch| *ch != sep)
                .map(char::len_utf8)
                .sum();
            out.push_str("<redacted>");
            i = name_start + name_len;
        }
        out.push_str(&hay[i..]);
        out
    }

    let mut t = s.to_string();
    t = scrub_after(&t, "\\Users\\", '\\');
    t = scrub_after(&t, "/Users/", '/');
    t = scrub_after(&t, "/home/", '/');
    t
}

// Backtrace of the current thread, redacted and clamped. Always captured,
// regardless of `RUST_BACKTRACE`.
pub fn captured_backtrace() -> String {
    let bt = std::backtrace::Backtrace::force_capture();
    clamp_chars(&redact_user_paths(&bt.to_string()), DEFAULT_BACKTRACE_MAX_CHARS)
}

// Error chain (when there is one) and a backtrace, for span end events.
fn error_ctx(err: Option<&AnyhowError>) -> Option<Value> {
    let mut m = serde_json::Map::new();
    if let Some(e) = err {
        let chain: Vec<String> = e.chain().map(|c| c.to_string()).collect();
        m.insert("err_chain".to_string(), serde_json::json!(chain));
    }
    if backtrace_enabled() {
        m.insert("backtrace".to_string(), serde_json::json!(captured_backtrace()));
    }
    (!m.is_empty()).then_some(Value::Object(m))
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceError {
    pub kind: String,    // io|encode|report|logic
    pub code: String,    // E_*
    pub message: String, // short
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub ts_ms: i64,
    pub session_id: String,
    pub stage: String,
    pub step_id: String,
    pub op: String,     // start|end|event
    pub status: String, // ok|err|aborted
    pub duration_ms: Option<u128>,
    pub error: Option<TraceError>,
    pub ctx: Option<Value>,
}

impl TraceEvent {
    fn new(stage: &str, step_id: &str, op: &str, status: &str) -> Self {
        Self {
            ts_ms: now_ms(),
            session_id: session_id().to_string(),
            stage: stage.to_string(),
            step_id: step_id.to_string(),
            op: op.to_string(),
            status: status.to_string(),
            duration_ms: None,
            error: None,
            ctx: None,
        }
    }
}

pub fn event(data_dir: &Path, stage: &str, step_id: &str, status: &str, ctx: Option<Value>) {
    let mut ev = TraceEvent::new(stage, step_id, "event", status);
    ev.ctx = ctx;
    emit_best_effort(data_dir, &ev);
}

pub struct Span {
    data_dir: PathBuf,
    stage: String,
    step_id: String,
    t0: Instant,
    finished: bool,
}

impl Span {
    pub fn start(data_dir: &Path, stage: &str, step_id: &str, ctx: Option<Value>) -> Self {
        let mut ev = TraceEvent::new(stage, step_id, "start", "ok");
        ev.ctx = ctx;
        emit_best_effort(data_dir, &ev);
        Self {
            data_dir: data_dir.to_path_buf(),
            stage: stage.to_string(),
            step_id: step_id.to_string(),
            t0: Instant::now(),
            finished: false,
        }
    }

    fn end(&mut self, status: &str, error: Option<TraceError>, ctx: Option<Value>) {
        self.finished = true;
        let mut ev = TraceEvent::new(&self.stage, &self.step_id, "end", status);
        ev.duration_ms = Some(self.t0.elapsed().as_millis());
        ev.error = error;
        ev.ctx = ctx;
        emit_best_effort(&self.data_dir, &ev);
    }

    pub fn ok(mut self, ctx: Option<Value>) {
        self.end("ok", None, ctx);
    }

    pub fn err_anyhow(mut self, kind: &str, code: &str, err: &AnyhowError) {
        let error = TraceError {
            kind: kind.to_string(),
            code: code.to_string(),
            message: err.to_string(),
        };
        self.end("err", Some(error), error_ctx(Some(err)));
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let error = TraceError {
            kind: "logic".to_string(),
            code: "ABORTED".to_string(),
            message: "span dropped without explicit ok/err".to_string(),
        };
        self.end("aborted", Some(error), error_ctx(None));
    }
}
