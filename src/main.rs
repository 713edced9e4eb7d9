//! `church-analytics` - church dashboard metrics from the command line.
//!
//! Usage:
//!   church-analytics login
//!   church-analytics callback <code | callback URL>
//!   church-analytics status
//!   church-analytics token
//!   church-analytics logout
//!   church-analytics dashboard [--days 30] [--previous-subscribers N]

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use oauth2::url::Url;
use tracing_subscriber::EnvFilter;

use church_analytics::auth::{AuthState, Navigator, PrintNavigator};
use church_analytics::config::{parse_days_back, Config};
use church_analytics::dashboard::{build_authenticator, Dashboard};
use church_analytics::types::DateRange;

const USAGE: &str = "\
Usage: church-analytics <command>

Commands:
  login                         Print the Planning Center authorization URL
  callback <code|url>           Complete authorization with the returned code
  status                        Show the stored session state
  token                         Ensure a valid access token, refreshing if needed
  logout                        Forget stored credentials
  dashboard [--days N] [--previous-subscribers N]
                                Print a dashboard snapshot as JSON";

fn navigator() -> Arc<dyn Navigator> {
    Arc::new(PrintNavigator)
}

/// Value following `flag`, parsed.
fn flag_value<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

/// Accept either a bare code or the full callback URL the browser landed on.
fn extract_code(arg: &str) -> Result<String> {
    let Ok(url) = Url::parse(arg) else {
        return Ok(arg.to_string());
    };
    let mut code = None;
    for (key, value) in url.query_pairs() {
        match &*key {
            "code" => code = Some(value.into_owned()),
            "error" => bail!("Authentication was denied: {value}"),
            _ => {}
        }
    }
    code.context("No code or error found in callback URL")
}

fn require_planning_center(config: &Config) -> Result<()> {
    if !config.has_planning_center_credentials() {
        bail!("Planning Center not configured. Set PCO_APP_ID and PCO_SECRET environment variables");
    }
    Ok(())
}

async fn run(config: &Config, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("login") => {
            require_planning_center(config)?;
            build_authenticator(config, navigator())?.initiate_authorization()?;
        }
        Some("callback") => {
            require_planning_center(config)?;
            let arg = args.get(1).context("Usage: church-analytics callback <code|url>")?;
            let code = extract_code(arg)?;
            build_authenticator(config, navigator())?
                .exchange_authorization_code(&code)
                .await
                .context("Authentication failed")?;
            println!("Authenticated with Planning Center.");
        }
        Some("status") => {
            let auth = build_authenticator(config, navigator())?;
            let message = match auth.state()? {
                AuthState::Valid(_) => "Authenticated.",
                AuthState::ExpiredWithRefresh(_) => "Access token expired; it will be refreshed on next use.",
                AuthState::ExpiredWithoutRefresh => "Access token expired. Run `church-analytics login`.",
                AuthState::Unauthenticated => "Not authenticated. Run `church-analytics login`.",
            };
            println!("{message}");
        }
        Some("token") => {
            require_planning_center(config)?;
            build_authenticator(config, navigator())?.get_access_token().await?;
            println!("Access token is valid.");
        }
        Some("logout") => {
            build_authenticator(config, navigator())?.logout()?;
            println!("Logged out.");
        }
        Some("dashboard") => {
            let days = match flag_value::<String>(args, "--days") {
                Some(value) => parse_days_back(&value)?,
                None => config.days_back,
            };
            let range = DateRange::last_days(days)?;
            let previous_subscribers = flag_value(args, "--previous-subscribers");
            let dashboard = Dashboard::from_config(config, navigator())?;
            let snapshot = dashboard
                .snapshot(&range, previous_subscribers)
                .await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        _ => println!("{USAGE}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    run(&config, &args).await
}
