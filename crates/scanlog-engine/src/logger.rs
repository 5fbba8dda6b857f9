use anyhow::{Context, Result};
use scanlog_core::{record, LogConfig, Severity};
use scanlog_observability::{panic_log, trace, AppendLog, AppendSink, FileSink, Span};
use scanlog_platform::{
    ArtifactInfo, ArtifactKind, ArtifactStore, Confirm, Image, StdinConfirm, SystemOpener,
    UrlOpener,
};

use crate::report::{self, FatalOutcome};

// Application-facing logger: severity entry points over an `AppendLog`,
// image artifacts, and the fatal-error report flow.
pub struct Logger<S: AppendSink = FileSink> {
    config: LogConfig,
    log: AppendLog<S>,
    artifacts: ArtifactStore,
    confirm: Box<dyn Confirm>,
    opener: Box<dyn UrlOpener>,
}

impl Logger<FileSink> {
    pub fn new(config: LogConfig, confirm: Box<dyn Confirm>, opener: Box<dyn UrlOpener>) -> Self {
        let log = AppendLog::open(config.log_path(), config.retry_delay(), config.echo);
        Self::with_log(config, log, confirm, opener)
    }

    // Environment-configured logger that asks on the terminal and opens
    // reports in the system browser.
    pub fn from_env() -> Self {
        Self::new(
            LogConfig::from_env(),
            Box::new(StdinConfirm),
            Box::new(SystemOpener),
        )
    }

    pub fn install_panic_hook(&self) {
        panic_log::install_best_effort(self.config.log_path());
    }
}

impl<S: AppendSink> Logger<S> {
    pub fn with_sink(
        config: LogConfig,
        sink: S,
        confirm: Box<dyn Confirm>,
        opener: Box<dyn UrlOpener>,
    ) -> Self {
        let log = AppendLog::new(sink, config.retry_delay(), config.echo);
        Self::with_log(config, log, confirm, opener)
    }

    fn with_log(
        config: LogConfig,
        log: AppendLog<S>,
        confirm: Box<dyn Confirm>,
        opener: Box<dyn UrlOpener>,
    ) -> Self {
        let artifacts = ArtifactStore::from_config(&config);
        Self {
            config,
            log,
            artifacts,
            confirm,
            opener,
        }
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    pub fn info(&self, message: &str) {
        self.log.append(&record::content(Severity::Info, message));
    }

    pub fn debug(&self, message: &str) {
        if self.config.log_debug {
            self.log.append(&record::content(Severity::Debug, message));
        }
    }

    // Warning with the error chain, or the caller's backtrace when there is
    // no error.
    pub fn warning(&self, message: &str, err: Option<&anyhow::Error>) {
        let detail = error_detail(err);
        self.log.append(&record::content_with_detail(
            Severity::Warning,
            message,
            &detail,
        ));
    }

    // Record the error, ask the operator whether to file an issue, and open
    // the prefilled issue page if they agree. Does not exit.
    pub fn report_fatal(&self, message: &str, err: Option<&anyhow::Error>) -> Result<FatalOutcome> {
        let detail = error_detail(err);
        self.log.append(&record::content_with_detail(
            Severity::Error,
            message,
            &detail,
        ));

        let span = Span::start(
            &self.config.data_dir,
            "Report",
            "REPORT.fatal",
            Some(serde_json::json!({"has_error": err.is_some()})),
        );

        let title = self.config.title();
        if !self.confirm.confirm(&report::confirm_message(message), &title) {
            span.ok(Some(serde_json::json!({"outcome": "declined"})));
            return Ok(FatalOutcome::Declined);
        }

        match self.open_issue(message, err) {
            Ok(url) => {
                span.ok(Some(serde_json::json!({"outcome": "reported", "url_len": url.len()})));
                Ok(FatalOutcome::Reported { url })
            }
            Err(e) => {
                span.err_anyhow("report", "E_REPORT_OPEN", &e);
                Err(e)
            }
        }
    }

    fn open_issue(&self, message: &str, err: Option<&anyhow::Error>) -> Result<String> {
        let log = self.log.read_all()?;
        let error = err.map(|e| trace::redact_user_paths(&format!("{e:?}")));
        let url = report::issue_url(&self.config.issue_base_url, message, error.as_deref(), &log);
        self.opener
            .open(&url)
            .context("open issue page failed")?;
        Ok(url)
    }

    // Fatal application error: report, then terminate the process.
    pub fn error(&self, message: &str, err: Option<&anyhow::Error>) -> ! {
        if let Err(e) = self.report_fatal(message, err) {
            scanlog_observability::safe_eprintln!("scanlog: issue report failed: {e:#}");
        }
        self.log.flush_backlog();
        std::process::exit(0)
    }

    pub fn log_image(&self, image: &Image, name: &str) -> Result<ArtifactInfo> {
        self.artifacts.persist(image, ArtifactKind::Capture, name)
    }

    // Persisted only when debug logging is enabled.
    pub fn log_debug_image(&self, image: &Image, name: &str) -> Result<Option<ArtifactInfo>> {
        if !self.config.log_debug {
            return Ok(None);
        }
        self.artifacts
            .persist(image, ArtifactKind::Debug, name)
            .map(Some)
    }

    pub fn clear_images(&self, pattern: &str) -> Result<usize> {
        self.artifacts.clear(ArtifactKind::Capture, pattern)
    }

    pub fn clear_debug_images(&self) -> Result<usize> {
        self.artifacts.clear(ArtifactKind::Debug, "*.png")
    }

    pub fn clear(&self) -> Result<()> {
        let span = Span::start(&self.config.data_dir, "Log", "LOG.clear", None);
        match self.log.clear() {
            Ok(()) => {
                span.ok(None);
                Ok(())
            }
            Err(e) => {
                span.err_anyhow("io", "E_LOG_CLEAR", &e);
                Err(e)
            }
        }
    }

    pub fn read_all(&self) -> Result<String> {
        self.log.read_all()
    }

    pub fn flush(&self) {
        self.log.flush_backlog();
    }

    pub fn pending(&self) -> usize {
        self.log.pending()
    }

    // Final flush; returns lines that never reached the log.
    pub fn shutdown(self) -> Vec<String> {
        self.log.shutdown()
    }
}

fn error_detail(err: Option<&anyhow::Error>) -> String {
    match err {
        Some(e) => trace::redact_user_paths(&format!("{e:?}")),
        None => trace::captured_backtrace(),
    }
}
