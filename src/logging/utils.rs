//! Log file location, ANSI stripping and timestamps.
use std::fs;
use std::path::PathBuf;

/// Remove terminal escape sequences so the log file stays plain text.
///
/// CSI sequences (`ESC [` ... final byte in `@`..=`~`) are dropped whole.
/// An unterminated sequence swallows the rest of the input.
pub(super) fn plain(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next_if_eq(&'[').is_some()
            && chars.by_ref().find(|c| ('@'..='~').contains(c)).is_none()
        {
            break;
        }
    }
    out
}

/// `$XDG_CACHE_HOME`, else `~/.cache`, else the working directory.
fn cache_root() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CACHE_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    ["HOME", "USERPROFILE"]
        .into_iter()
        .find_map(std::env::var_os)
        .map_or_else(|| PathBuf::from("."), |home| PathBuf::from(home).join(".cache"))
}

/// Path of the persistent log for `command`, creating its directory.
///
/// `None` when the directory cannot be created; logging then stays
/// console-only.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let dir = cache_root().join("infra");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Current UTC date and time, `YYYY-MM-DD HH:MM:SS`.
pub(super) fn datestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Current UTC time of day, `HH:MM:SS`.
pub(super) fn clock() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}
