use std::{
    io::{self, BufRead, Write},
    process::{Command, Stdio},
};

use anyhow::{anyhow, Context, Result};

// Operator yes/no prompt shown before a bug report is filed.
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str, title: &str) -> bool;
}

// Hands a URL to whatever the platform uses to open links.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

impl Confirm for AlwaysDecline {
    fn confirm(&self, _message: &str, _title: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _message: &str, _title: &str) -> bool {
        true
    }
}

// Terminal prompt; anything other than `y`/`yes` declines, including a
// closed stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, message: &str, title: &str) -> bool {
        let mut err = io::stderr();
        let _ = write!(err, "{title}\n{message} [y/N] ");
        let _ = err.flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let (program, args) = open_argv(url);
        let status = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .context("spawn url opener failed")?;
        if !status.success() {
            return Err(anyhow!("url opener exit={status}"));
        }
        Ok(())
    }
}

// The URL must reach the handler as one argument. `cmd /C start` would split
// the query string at every `&`, so Windows goes through the URL protocol
// handler directly without a shell.
#[cfg(windows)]
fn open_argv(url: &str) -> (&'static str, Vec<String>) {
    (
        "rundll32",
        vec!["url.dll,FileProtocolHandler".to_string(), url.to_string()],
    )
}

#[cfg(target_os = "macos")]
fn open_argv(url: &str) -> (&'static str, Vec<String>) {
    ("open", vec![url.to_string()])
}

#[cfg(all(unix, not(target_os = "macos")))]
fn open_argv(url: &str) -> (&'static str, Vec<String>) {
    ("xdg-open", vec![url.to_string()])
}
