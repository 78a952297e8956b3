//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use musicdl_core::{FetchReport, ReportSummary, TargetReport};
use musicdl_hosts::HostDescriptor;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a fetch invocation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutput<'a> {
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub summary: ReportSummary,
    pub targets: &'a [TargetReport],
}

/// Host capability info.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostOutput {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub cookies: Vec<String>,
    pub urls: Vec<String>,
    pub description: String,
    pub homepage: String,
}

impl From<&HostDescriptor> for HostOutput {
    fn from(desc: &HostDescriptor) -> Self {
        let meta = &desc.metadata;
        Self {
            id: desc.id.id().to_string(),
            name: meta.display_name.to_string(),
            domain: meta.domain.to_string(),
            cookies: meta.cookie_keys.iter().map(ToString::to_string).collect(),
            urls: meta.url_examples.iter().map(ToString::to_string).collect(),
            description: meta.description.to_string(),
            homepage: meta.homepage.to_string(),
        }
    }
}

/// Package info.
#[derive(Debug, Serialize)]
pub struct PackageOutput {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub hosts: Vec<HostOutput>,
}

/// Answer for `about <domain>`.
#[derive(Debug, Serialize)]
pub struct DomainOutput {
    pub domain: String,
    pub supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<HostOutput>,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats data as JSON.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(data)?)
        } else {
            Ok(serde_json::to_string(data)?)
        }
    }

    /// Formats a fetch report.
    pub fn format_report(&self, report: &FetchReport) -> Result<String> {
        self.format(&ReportOutput {
            success: report.is_success(),
            started_at: report.started_at,
            finished_at: report.finished_at,
            duration_ms: report.duration().num_milliseconds(),
            summary: report.summary(),
            targets: &report.targets,
        })
    }

    /// Formats package information.
    pub fn format_about_package(&self, hosts: &[HostDescriptor]) -> Result<String> {
        self.format(&PackageOutput {
            name: "downloader",
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            hosts: hosts.iter().map(HostOutput::from).collect(),
        })
    }

    /// Formats the answer for one domain.
    pub fn format_about_domain(
        &self,
        domain: &str,
        host: Option<&HostDescriptor>,
    ) -> Result<String> {
        self.format(&DomainOutput {
            domain: domain.to_string(),
            supported: host.is_some(),
            host: host.map(HostOutput::from),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
