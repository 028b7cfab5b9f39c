//! Terminal rendering for the domain-scan CLI.
//!
//! Status lines go to stdout; everything decorative is dimmed so the output
//! stays readable when piped.

use chrono::{DateTime, Utc};
use console::{pad_str, style, Alignment};
use domain_scan_lib::{CheckEvent, CheckStatus, ProxyKind, ScanState};

const DOMAIN_WIDTH: usize = 30;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a scan.
pub fn print_scan_header(state: &ScanState) {
    let pattern = state.pattern.as_deref().unwrap_or("-");
    let kind = if state.is_regex == Some(true) {
        "regex"
    } else {
        "pattern"
    };

    println!(
        "{} {} {}",
        style("domain-scan").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!("scanning {} '{}'", kind, pattern)).dim(),
    );

    let carried = state.checks.as_ref().map_or(0, |checks| checks.len());
    if carried > 0 {
        println!(
            "{}",
            style(format!("{} domains already checked, resuming", carried)).dim()
        );
    }
    println!();
}

// ── Result lines ─────────────────────────────────────────────────────────────

/// Print one finished check. Running and cleared statuses are not shown.
pub fn print_check(event: &CheckEvent) {
    if let Some(line) = check_line(event) {
        println!("{}", line);
    }
}

fn check_line(event: &CheckEvent) -> Option<String> {
    let padded = pad_str(&event.domain, DOMAIN_WIDTH, Alignment::Left, Some(".."));
    match event.status? {
        CheckStatus::Available => Some(format!(
            "  {}  {}",
            style(&padded).white(),
            style("AVAILABLE").green().bold(),
        )),
        CheckStatus::Taken => Some(format!(
            "  {}  {}",
            style(&padded).dim(),
            style("TAKEN").red(),
        )),
        CheckStatus::Running => None,
    }
}

// ── Status ───────────────────────────────────────────────────────────────────

/// Print the status view of a stored scan.
pub fn print_status(view: &ScanState) {
    for line in status_lines(view) {
        println!("{}", line);
    }
}

fn status_lines(view: &ScanState) -> Vec<String> {
    let mut lines = Vec::new();

    let running = if view.running {
        style("running").green().bold()
    } else {
        style("stopped").yellow()
    };
    lines.push(format!("Scan:    {}", running));

    match &view.pattern {
        Some(pattern) => {
            let regex = if view.is_regex == Some(true) {
                " (regex)"
            } else {
                ""
            };
            lines.push(format!("Pattern: {}{}", pattern, regex));
        }
        None => lines.push(format!("Pattern: {}", style("none").dim())),
    }

    let Some(checks) = view.checks.as_ref().filter(|checks| !checks.is_empty()) else {
        lines.push(style("No available domains yet").dim().to_string());
        return lines;
    };

    lines.push(String::new());
    for (domain, record) in checks {
        let padded = pad_str(domain, DOMAIN_WIDTH, Alignment::Left, Some(".."));
        let status = match record.status {
            CheckStatus::Available => style("AVAILABLE").green().bold(),
            CheckStatus::Running => style("CHECKING").cyan(),
            CheckStatus::Taken => style("TAKEN").red(),
        };
        lines.push(format!(
            "  {}  {}  {}",
            padded,
            status,
            style(format_timestamp(record.modified_at)).dim()
        ));
    }

    lines
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print totals after a scan ended or was stopped.
pub fn print_summary(state: &ScanState, interrupted: bool) {
    println!();
    println!("{}", summary_line(state, interrupted));
}

fn summary_line(state: &ScanState, interrupted: bool) -> String {
    let available = state.count(CheckStatus::Available);
    let taken = state.count(CheckStatus::Taken);
    let headline = if interrupted {
        style("Scan stopped").yellow().bold()
    } else {
        style("Scan finished").bold()
    };

    format!(
        "{}  {} available, {} taken",
        headline,
        style(available).green().bold(),
        taken
    )
}

/// Print how many proxies were dropped as failing during the scan.
pub fn print_proxy_failures(failed: &[(ProxyKind, usize)]) {
    if let Some(line) = proxy_failures_line(failed) {
        println!("{}", line);
    }
}

fn proxy_failures_line(failed: &[(ProxyKind, usize)]) -> Option<String> {
    let parts: Vec<String> = failed
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(kind, count)| format!("{} {}", count, kind))
        .collect();
    if parts.is_empty() {
        return None;
    }

    Some(
        style(format!("Dropped failing proxies: {}", parts.join(", ")))
            .dim()
            .to_string(),
    )
}

/// Print the result of a pattern validation.
pub fn print_validation(pattern: &str, count: u128) {
    println!(
        "{} '{}' expands to {} domain name{}",
        style("✓").green().bold(),
        pattern,
        count,
        if count == 1 { "" } else { "s" }
    );
}

/// Seconds-precision UTC timestamp, e.g. `2024-05-01 12:00:00 UTC`.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
