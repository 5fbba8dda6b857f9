mod logger;
pub mod report;

pub use logger::Logger;
pub use report::FatalOutcome;
pub use scanlog_core::{LogConfig, Severity};
pub use scanlog_observability::{AppendLog, AppendSink, FileSink};
pub use scanlog_platform::{
    AlwaysConfirm, AlwaysDecline, ArtifactInfo, ArtifactKind, Confirm, Image, StdinConfirm,
    SystemOpener, UrlOpener,
};
