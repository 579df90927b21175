//! Checkgate server binary

use anyhow::Result;
use clap::Parser;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use checkgate_core::GateConfig;
use checkgate_github::GitHubClient;
use checkgate_web::{create_router, CheckGate, WebhookState};

/// Initialize logging with the specified verbosity level
fn init_logging(verbose: u8, quiet: bool, json: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter =
        EnvFilter::from_default_env().add_directive(format!("checkgate={}", level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 1)
        .with_file(verbose >= 2)
        .with_line_number(verbose >= 2);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "checkgate")]
#[command(about = "QE approval gate for GitHub pull requests")]
#[command(version)]
struct Cli {
    /// Address to bind the webhook server to
    #[arg(long, env = "CHECKGATE_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// GitHub API base URL
    #[arg(
        long,
        env = "CHECKGATE_GITHUB_API_URL",
        default_value = "https://api.github.com"
    )]
    github_api_url: String,

    /// Token used for check run and pull request API calls
    #[arg(long, env = "CHECKGATE_GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,

    /// GitHub App id owning the gate's check runs
    #[arg(long, env = "CHECKGATE_APP_ID")]
    app_id: u64,

    /// Login of the bot account whose own pull requests auto-pass
    #[arg(long, env = "CHECKGATE_BOT_LOGIN")]
    bot_login: String,

    /// Comma-separated reviewer logins authorized to approve for the QE gate
    #[arg(long, env = "CHECKGATE_QE_USERS", value_delimiter = ',', required = true)]
    qe_users: Vec<String>,

    /// Name given to created check runs
    #[arg(
        long,
        env = "CHECKGATE_CHECK_NAME",
        default_value = checkgate_core::DEFAULT_CHECK_NAME
    )]
    check_name: String,

    /// Webhook secret for signature verification; unset disables it
    #[arg(long, env = "CHECKGATE_WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: Option<String>,

    /// Increase verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,

    /// Output logs as JSON (for machine parsing)
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet, cli.log_json)?;

    let config = GateConfig::new(cli.app_id, cli.bot_login, cli.qe_users)
        .with_check_name(cli.check_name);
    info!(
        app_id = config.app_id,
        check_name = %config.check_name,
        qe_users = config.qe_users.len(),
        "Starting checkgate"
    );

    let client = GitHubClient::new(cli.github_api_url, SecretString::new(cli.github_token))?;
    let gate = CheckGate::new(config, Arc::new(client));
    let state = Arc::new(WebhookState::new(
        gate,
        cli.webhook_secret.map(SecretString::new),
    ));

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    info!(addr = %cli.bind, "Webhook server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
