//! About command - package or host information.

use anyhow::Result;
use clap::Args;
use musicdl_hosts::HostCatalog;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the about command.
#[derive(Args, Debug)]
pub struct AboutArgs {
    /// Domain to describe (e.g. `yandex.ru`); omit for package info.
    #[arg(default_value = "")]
    pub domain: String,
}

/// Runs the about command.
///
/// Unknown domains are not an error: the command prints
/// `<domain> domain is not supported.` and succeeds.
pub fn run(args: &AboutArgs, cli: &Cli) -> Result<ExitCode> {
    let domain = args.domain.trim();
    let host = (!domain.is_empty())
        .then(|| HostCatalog::get_by_domain(domain))
        .flatten();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let text = match host {
                _ if domain.is_empty() => formatter.format_about_package(HostCatalog::all()),
                Some(desc) => desc.about(),
                None => TextFormatter::format_unsupported_domain(domain),
            };
            println!("{text}");
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let json = if domain.is_empty() {
                formatter.format_about_package(HostCatalog::all())?
            } else {
                formatter.format_about_domain(domain, host)?
            };
            println!("{json}");
        }
    }

    Ok(ExitCode::Success)
}
