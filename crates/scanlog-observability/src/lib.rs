pub mod append_log;
pub mod panic_log;
mod safe_print;
pub mod trace;

pub use append_log::{AppendLog, AppendSink, FileSink};
pub use trace::Span;
