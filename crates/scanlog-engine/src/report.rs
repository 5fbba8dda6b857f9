// Issue-tracker report for fatal errors.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalOutcome {
    Declined,
    Reported { url: String },
}

const LABELS: &str = "bug";

pub fn confirm_message(message: &str) -> String {
    format!("{message}\n\nWould you like to report this on GitHub?")
}

// Markdown body: the message, the error (if any) in a code block, and the
// whole log folded into a `<details>` section.
pub fn issue_body(message: &str, error: Option<&str>, log: &str) -> String {
    let mut body = format!("**Error**\n{message}\n");
    if let Some(e) = error {
        body.push_str(&format!("```\n{e}\n```\n"));
    }
    body.push_str("<details>\n<summary>Log</summary>\n\n```\n");
    body.push_str(log);
    body.push_str("```\n</details>");
    body
}

// `<base>/issues/new?body=..&title=..&labels=bug`
pub fn issue_url(base_url: &str, message: &str, error: Option<&str>, log: &str) -> String {
    let body = issue_body(message, error, log);
    format!(
        "{}/issues/new?body={}&title={}&labels={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(&body),
        urlencoding::encode(message),
        urlencoding::encode(LABELS),
    )
}
