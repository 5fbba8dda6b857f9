use chrono::{DateTime, Timelike, Utc};

const DIVIDER_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Debug,
}

impl Severity {
    // Fixed tag written in front of every record body. `Info` carries a
    // trailing space so bodies line up with `[Debug]`/`[Error]`.
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Info => "[Info] ",
            Severity::Warning => "[Warning]",
            Severity::Error => "[Error]",
            Severity::Debug => "[Debug]",
        }
    }
}

// Record content without timestamp: `<tag> <message>`.
pub fn content(severity: Severity, message: &str) -> String {
    format!("{} {message}", severity.tag())
}

// Record content followed by a divider and a detail block (error chain or
// stack trace) on the following lines.
pub fn content_with_detail(severity: Severity, message: &str, detail: &str) -> String {
    let divider = "-".repeat(DIVIDER_LEN);
    format!("{} {message}\n {divider} \n {detail}", severity.tag())
}

// UTC time of day with 100ns precision, e.g. `13:04:59.1234567`.
pub fn time_of_day(at: DateTime<Utc>) -> String {
    let ticks = at.nanosecond() % 1_000_000_000 / 100;
    format!("{}.{ticks:07}", at.format("%H:%M:%S"))
}

// Full log line: `[<time-of-day>] > <content>\n`.
pub fn stamp(at: DateTime<Utc>, content: &str) -> String {
    format!("[{}] > {content}\n", time_of_day(at))
}

pub fn stamp_now(content: &str) -> String {
    stamp(Utc::now(), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stamp_uses_time_of_day_and_arrow() {
        let at = Utc
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 3)
            .single()
            .expect("valid time")
            + chrono::Duration::nanoseconds(120_000_300);
        let line = stamp(at, &content(Severity::Info, "ready"));
        assert_eq!(line, "[07:05:03.1200003] > [Info]  ready\n");
    }

    #[test]
    fn detail_block_follows_divider() {
        let c = content_with_detail(Severity::Error, "boom", "caused by: disk");
        let mut lines = c.lines();
        assert_eq!(lines.next(), Some("[Error] boom"));
        assert_eq!(lines.next(), Some(" -------------------- "));
        assert_eq!(lines.next(), Some(" caused by: disk"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn tags_are_distinct() {
        assert_eq!(content(Severity::Debug, "x"), "[Debug] x");
        assert_eq!(content(Severity::Warning, "x"), "[Warning] x");
    }
}
