//! Terminal status messages.
//!
//! Everything goes to stderr so stdout stays clean for piping.

use console::style;
use std::time::Duration;

/// Decide whether colors are used, honoring `--no-color`, `NO_COLOR` and
/// `FORCE_COLOR` before falling back to terminal detection.
pub fn should_use_color(no_color: bool) -> bool {
    if no_color || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}

pub fn init_colors(no_color: bool) {
    console::set_colors_enabled_stderr(should_use_color(no_color));
}

pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").for_stderr().green().bold(), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", style("ℹ").for_stderr().blue().bold(), message);
}

pub fn warning(message: &str) {
    eprintln!(
        "{} {}",
        style("⚠").for_stderr().yellow().bold(),
        style(message).for_stderr().yellow()
    );
}

pub fn error(message: &str) {
    eprintln!(
        "{} {}",
        style("✗").for_stderr().red().bold(),
        style(message).for_stderr().red()
    );
}

/// Human-readable byte size (`512 B`, `1.50 KB`, ...).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats_sizes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_formats_durations() {
        assert_eq!(format_duration(Duration::from_millis(42)), "42ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_no_color_flag_wins() {
        assert!(!should_use_color(true));
    }
}
