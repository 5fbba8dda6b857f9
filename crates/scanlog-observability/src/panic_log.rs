use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use scanlog_core::{record, Severity};

use crate::trace;

// Install a panic hook that records the panic in the log file instead of
// stderr.
//
// GUI builds may have no stderr; if printing fails inside the default hook the
// process can recurse into another panic and abort with no message at all.
// The hook writes straight to the file (bypassing `AppendLog`, whose mutex may
// be held by the panicking thread) and never panics itself.
pub fn install_best_effort(log_path: PathBuf) {
    std::panic::set_hook(Box::new(move |info| {
        let line = panic_line(&info.to_string(), &trace::captured_backtrace());
        append_best_effort(&log_path, &line);
    }));
}

fn panic_line(message: &str, backtrace: &str) -> String {
    record::stamp_now(&record::content_with_detail(
        Severity::Error,
        &format!("panic: {message}"),
        backtrace,
    ))
}

fn append_best_effort(path: &Path, line: &str) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = f.write_all(line.as_bytes());
    }
}
