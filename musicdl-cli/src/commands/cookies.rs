//! Cookies command - direct credential store access.

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use musicdl_core::{CookieRecord, Domain};
use musicdl_fetch::CredentialStore;
use musicdl_store::CookieStore;
use tracing::info;

use crate::{Cli, ExitCode};

/// Arguments for the cookies command.
#[derive(Args, Debug)]
pub struct CookiesArgs {
    /// Action to perform.
    #[arg(value_enum, ignore_case = true)]
    pub action: CookieAction,

    /// The domain of the cookie (e.g. `yandex.ru`).
    #[arg(long)]
    pub domain: String,

    /// The key of the cookie (e.g. `Session_id`).
    #[arg(long)]
    pub key: Option<String>,

    /// The value of the cookie; wrap it in double quotes if it has special characters.
    #[arg(long)]
    pub value: Option<String>,
}

/// Cookie store actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CookieAction {
    /// Print the value of `--key` (pipe-friendly).
    Get,
    /// Store `--value` under `--key`, replacing any existing value.
    Set,
    /// Remove `--key`, or every cookie of the domain when no key is given.
    Delete,
}

/// Runs the cookies command.
pub async fn run(args: &CookiesArgs, cli: &Cli) -> Result<ExitCode> {
    let store = CookieStore::open(cli.cookie_file()).await;
    if let Some(value) = execute(args, &store).await? {
        println!("{value}");
    }
    Ok(ExitCode::Success)
}

/// Performs the action; returns what `get` prints.
pub async fn execute(args: &CookiesArgs, store: &dyn CredentialStore) -> Result<Option<String>> {
    let domain = Domain::parse(&args.domain)?;

    match args.action {
        CookieAction::Get => {
            let Some(key) = &args.key else {
                bail!("GET requires --key");
            };
            match store.get(&domain, key).await? {
                Some(value) => Ok(Some(value)),
                None => bail!("Cookie {key} for {domain} is not set"),
            }
        }
        CookieAction::Set => {
            let (Some(key), Some(value)) = (&args.key, &args.value) else {
                bail!("SET requires --key and --value");
            };
            store
                .set(CookieRecord::new(domain.clone(), key.clone(), value.clone()))
                .await?;
            info!(domain = %domain, key = %key, "Cookie saved");
            Ok(None)
        }
        CookieAction::Delete => {
            let removed = store.delete(&domain, args.key.as_deref()).await?;
            info!(domain = %domain, key = ?args.key, removed, "Cookies removed");
            Ok(None)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
