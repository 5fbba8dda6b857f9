pub mod artifact_name;
pub mod config;
pub mod record;

pub use config::LogConfig;
pub use record::Severity;
