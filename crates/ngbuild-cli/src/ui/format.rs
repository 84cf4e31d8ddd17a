//! Formatting utilities for sizes, durations, and output summaries.

use console::Term;
use owo_colors::{OwoColorize, Stream::Stderr};
use std::time::Duration;

/// Format file size in human-readable format.
///
/// ```
/// use ngbuild_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format duration as `ms`, fractional seconds, or `Xm Ys`.
///
/// ```
/// use std::time::Duration;
/// use ngbuild_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print the files a build produced with their sizes, then the total.
pub fn print_output_summary(entries: &[(String, u64)], duration: Duration) {
    let width = (Term::stderr().size().1 as usize).clamp(20, 80);
    let rule = "─".repeat(width);

    eprintln!("\n{}", "Output".if_supports_color(Stderr, |s| s.bold()));
    eprintln!("{rule}");
    for (path, size) in entries {
        eprintln!(
            "  {} {} {}",
            "▸".if_supports_color(Stderr, |s| s.blue()),
            path,
            format_size(*size).if_supports_color(Stderr, |s| s.dimmed())
        );
    }
    eprintln!("{rule}");

    let total: u64 = entries.iter().map(|(_, size)| size).sum();
    eprintln!(
        "  {} {} files, {} in {}",
        "Total:".if_supports_color(Stderr, |s| s.bold()),
        entries.len(),
        format_size(total).if_supports_color(Stderr, |s| s.green()),
        format_duration(duration).if_supports_color(Stderr, |s| s.green())
    );
}
