use studio_core::history::{HistoryEntry, ResultRef};
use studio_core::notify::{Notice, NoticeLevel, Notifier};

/// Prints session notices to stderr, the terminal stand-in for toasts.
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => eprintln!("\x1b[31;1m[error]\x1b[0m {}", notice.message),
            NoticeLevel::Success if !self.quiet => {
                eprintln!("\x1b[32m[done]\x1b[0m {}", notice.message)
            }
            NoticeLevel::Info if !self.quiet => eprintln!("\x1b[90m{}\x1b[0m", notice.message),
            _ => {}
        }
    }
}

/// Data URLs run to megabytes; show the media type and size instead.
pub fn display_ref(result: &ResultRef) -> String {
    let s = result.as_str();
    if !result.is_data_url() {
        return s.to_string();
    }
    let media = s
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .unwrap_or("image");
    format!("<inline {media}, {}>", format_bytes(s.len()))
}

pub fn format_entry(index: usize, entry: &HistoryEntry, current: bool) -> String {
    let marker = if current { "\x1b[33m*\x1b[0m" } else { " " };
    let backend = entry
        .backend
        .map(|b| format!(" \x1b[36m[{b}]\x1b[0m"))
        .unwrap_or_default();
    format!(
        "{marker} {index:>2}  \x1b[90m{}\x1b[0m  {}{backend}\n       {}",
        entry.created_at.format("%H:%M:%S"),
        entry.description,
        display_ref(&entry.result),
    )
}

fn format_bytes(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.1}MB", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}KB", n as f64 / 1_000.0)
    } else {
        format!("{n}B")
    }
}
