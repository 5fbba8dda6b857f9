use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_LOG_FILE: &str = "Log.txt";
const DEFAULT_RETRY_DELAY_MS: u64 = 250;
const DEFAULT_ISSUE_BASE_URL: &str = "https://github.com/scanlog/scanlog";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub data_dir: PathBuf,
    // Resolved against `data_dir` unless absolute.
    pub log_file: PathBuf,
    // Defaults to `<data_dir>/Debug`.
    pub debug_dir: Option<PathBuf>,
    pub log_debug: bool,
    pub echo: bool,
    pub retry_delay_ms: u64,
    pub issue_base_url: String,
    pub app_name: String,
    pub app_version: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            debug_dir: None,
            log_debug: false,
            echo: cfg!(debug_assertions),
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            issue_base_url: DEFAULT_ISSUE_BASE_URL.to_string(),
            app_name: "scanlog".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl LogConfig {
    // Defaults overlaid with `SCANLOG_*` environment variables.
    pub fn from_env() -> Self {
        let mut c = Self::default();
        c.apply_env();
        c
    }

    // Read a JSON config file (missing file means defaults), then apply the
    // environment on top.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut c = if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("read config failed: {}", path.display()))?;
            serde_json::from_str::<LogConfig>(&s)
                .with_context(|| format!("parse config failed: {}", path.display()))?
        } else {
            Self::default()
        };
        c.apply_overrides(lookup);
        Ok(c)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok();
        }
        let s = serde_json::to_string_pretty(self).context("serialize config failed")?;
        fs::write(path, s).with_context(|| format!("write config failed: {}", path.display()))?;
        Ok(())
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    // Unparseable values are ignored and the current value kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SCANLOG_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SCANLOG_LOG_FILE") {
            self.log_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("SCANLOG_DEBUG_DIR") {
            self.debug_dir = Some(PathBuf::from(v));
        }
        if let Some(b) = lookup("SCANLOG_DEBUG").as_deref().and_then(parse_bool) {
            self.log_debug = b;
        }
        if let Some(b) = lookup("SCANLOG_ECHO").as_deref().and_then(parse_bool) {
            self.echo = b;
        }
        if let Some(ms) = lookup("SCANLOG_RETRY_DELAY_MS").and_then(|v| v.trim().parse().ok()) {
            self.retry_delay_ms = ms;
        }
        if let Some(v) = lookup("SCANLOG_ISSUE_BASE_URL") {
            let t = v.trim().trim_end_matches('/');
            if !t.is_empty() {
                self.issue_base_url = t.to_string();
            }
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file)
    }

    pub fn capture_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.debug_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("Debug"))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    // Dialog title, e.g. `scanlog 0.1.0`.
    pub fn title(&self) -> String {
        format!("{} {}", self.app_name, self.app_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_resolve_paths_under_data_dir() {
        let c = LogConfig::default();
        assert_eq!(c.log_path(), PathBuf::from("data").join("Log.txt"));
        assert_eq!(c.debug_dir(), PathBuf::from("data").join("Debug"));
        assert_eq!(c.retry_delay(), Duration::from_millis(250));
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SCANLOG_DATA_DIR", "/var/scan"),
            ("SCANLOG_DEBUG", "yes"),
            ("SCANLOG_ECHO", "maybe"),
            ("SCANLOG_RETRY_DELAY_MS", "oops"),
            ("SCANLOG_ISSUE_BASE_URL", "https://example.org/repo/"),
        ]);
        let mut c = LogConfig::default();
        let echo_before = c.echo;
        c.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.data_dir, PathBuf::from("/var/scan"));
        assert!(c.log_debug);
        assert_eq!(c.echo, echo_before);
        assert_eq!(c.retry_delay_ms, 250);
        assert_eq!(c.issue_base_url, "https://example.org/repo");
    }

    #[test]
    fn load_missing_file_gives_defaults_with_env_on_top() {
        let td = tempfile::tempdir().expect("tempdir");
        let p = td.path().join("absent.json");

        let c = LogConfig::load_with(&p, |_| None).expect("load");
        assert_eq!(c.log_path(), LogConfig::default().log_path());
        assert_eq!(c.retry_delay_ms, 250);

        let c = LogConfig::load_with(&p, |k| (k == "SCANLOG_DEBUG").then(|| "1".to_string()))
            .expect("load with env");
        assert!(c.log_debug);

        let c = LogConfig::load(&p).expect("load from process env");
        assert_eq!(c.app_name, "scanlog");
    }

    #[test]
    fn load_reads_file_then_env_wins() {
        let td = tempfile::tempdir().expect("tempdir");
        let p = td.path().join("scanlog.json");
        fs::write(
            &p,
            r#"{"log_debug": true, "retry_delay_ms": 10, "app_name": "scanner"}"#,
        )
        .expect("write");

        let c = LogConfig::load_with(&p, |_| None).expect("load");
        assert!(c.log_debug);
        assert_eq!(c.retry_delay_ms, 10);
        assert_eq!(c.app_name, "scanner");
        assert_eq!(c.log_file, PathBuf::from("Log.txt"));

        let c = LogConfig::load_with(&p, |k| {
            (k == "SCANLOG_RETRY_DELAY_MS").then(|| "40".to_string())
        })
        .expect("load with env");
        assert_eq!(c.retry_delay_ms, 40);
        assert!(c.log_debug);

        let c = LogConfig::load(&p).expect("load from process env");
        assert_eq!(c.app_name, "scanner");
    }

    #[test]
    fn save_then_load_roundtrip() {
        let td = tempfile::tempdir().expect("tempdir");
        let p = td.path().join("nested").join("scanlog.json");
        let mut c = LogConfig::default();
        c.app_name = "scanner".to_string();
        c.retry_delay_ms = 5;
        c.save(&p).expect("save");

        let back = LogConfig::load_with(&p, |_| None).expect("load");
        assert_eq!(back.app_name, "scanner");
        assert_eq!(back.retry_delay_ms, 5);
    }
}
