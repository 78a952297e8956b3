//! Text output formatting with status markers and colors.

use musicdl_core::{FetchReport, TargetReport, TargetStatus, TrackOutcome, TrackReport};
use musicdl_hosts::HostDescriptor;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

// Track status markers
const MARK_DOWNLOADED: &str = "✓";
const MARK_SKIPPED: &str = "–";
const MARK_FAILED: &str = "✗";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a whole fetch report: one block per target, then a summary.
    pub fn format_report(&self, report: &FetchReport) -> String {
        let mut blocks: Vec<String> = report
            .targets
            .iter()
            .map(|t| self.format_target(t))
            .collect();
        blocks.push(self.format_summary(report));
        blocks.join("\n\n")
    }

    /// Formats one target block.
    pub fn format_target(&self, target: &TargetReport) -> String {
        let mut lines = Vec::with_capacity(target.tracks.len() + 1);

        let host = target
            .host
            .as_deref()
            .map(|h| format!(" {}", self.dim(&format!("[{h}]"))))
            .unwrap_or_default();
        lines.push(format!("{}{}", self.bold(&target.target), host));

        if let TargetStatus::Failed { error } = &target.status {
            lines.push(format!("  {} {}", self.red(MARK_FAILED), self.red(&error.to_string())));
        }
        if target.tracks.is_empty() && matches!(target.status, TargetStatus::Resolved) {
            lines.push(format!("  {}", self.dim("No tracks")));
        }

        lines.extend(target.tracks.iter().map(|t| self.format_track(t)));
        lines.join("\n")
    }

    /// Formats one track line.
    pub fn format_track(&self, entry: &TrackReport) -> String {
        let name = entry.track.display_name();
        match &entry.outcome {
            TrackOutcome::Downloaded { path } => format!(
                "  {} {} {}",
                self.green(MARK_DOWNLOADED),
                name,
                self.dim(&format!("→ {}", path.display()))
            ),
            TrackOutcome::Skipped { path, reason } => format!(
                "  {} {} {}",
                self.yellow(MARK_SKIPPED),
                name,
                self.dim(&format!("({reason}: {})", path.display()))
            ),
            TrackOutcome::Failed { error } => format!(
                "  {} {} {}",
                self.red(MARK_FAILED),
                name,
                self.red(&format!("({error})"))
            ),
        }
    }

    /// Formats the closing summary line.
    pub fn format_summary(&self, report: &FetchReport) -> String {
        let s = report.summary();
        let seconds = report.duration().num_milliseconds() as f64 / 1000.0;

        let mut parts = vec![
            self.green(&format!("{} downloaded", s.downloaded)),
            self.yellow(&format!("{} skipped", s.skipped)),
            self.color_if(s.failed > 0, RED, &format!("{} failed", s.failed)),
        ];
        if s.failed_targets > 0 {
            parts.push(self.red(&format!("{} targets failed", s.failed_targets)));
        }
        if s.unsupported > 0 {
            parts.push(self.red(&format!("{} unsupported", s.unsupported)));
        }

        format!(
            "{} {} in {seconds:.1}s",
            self.bold(&format!("{} tracks from {} targets:", s.tracks, s.targets)),
            parts.join(", ")
        )
    }

    /// Formats package information and the supported host list.
    pub fn format_about_package(&self, hosts: &[HostDescriptor]) -> String {
        let mut lines = vec![
            format!(
                "{} {}",
                self.bold("downloader"),
                env!("CARGO_PKG_VERSION")
            ),
            env!("CARGO_PKG_DESCRIPTION").to_string(),
            String::new(),
            "Supported hosts:".to_string(),
        ];

        for desc in hosts {
            lines.push(format!(
                "  {} (domain {}, key {})",
                desc.display_name(),
                desc.domain(),
                desc.metadata.cookie_keys.join(", ")
            ));
        }

        lines.push(String::new());
        lines.push(self.dim("Run `downloader about <domain>` for details."));
        lines.join("\n")
    }

    /// The message for a domain no host serves.
    pub fn format_unsupported_domain(domain: &str) -> String {
        format!("{domain} domain is not supported.")
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn color_if(&self, cond: bool, code: &str, text: &str) -> String {
        if cond {
            self.paint(code, text)
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }
}

// ============================================================================
// Tests
// ============================================================================
