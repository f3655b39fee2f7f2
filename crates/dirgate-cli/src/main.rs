//! Dirgate - Directory bind-authentication
//!
//! Command-line front end for one-shot authentication attempts and
//! for inspecting the DNs and filters a configuration derives.

use std::io::{BufRead, Write};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dirgate_core::AppConfig;
use dirgate_ldap::LdapAuthProvider;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirgate")]
#[command(version = dirgate_core::VERSION)]
#[command(about = "Directory bind-authentication and group resolution", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Directory server host
    #[arg(long, env = "DIRGATE_LDAP_HOST", global = true)]
    host: Option<String>,

    /// Search base DN
    #[arg(long, env = "DIRGATE_SEARCH_BASE", global = true)]
    search_base: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DIRGATE_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate a user against the directory
    Login {
        /// Username to authenticate
        username: String,

        /// Password; read from stdin when omitted
        #[arg(short, long, env = "DIRGATE_PASSWORD")]
        password: Option<String>,
    },

    /// Print the DNs and filters derived for a username
    Plan {
        /// Username to derive for
        username: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &cli.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()
    };

    // Override with CLI args
    if let Some(host) = cli.host {
        config.directory.host = host;
    }
    if let Some(search_base) = cli.search_base {
        config.directory.search_base = search_base;
    }

    match cli.command {
        Commands::Login { username, password } => login(config, &username, password).await,
        Commands::Plan { username } => plan(config, &username),
    }
}

async fn login(config: AppConfig, username: &str, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };

    let provider = LdapAuthProvider::from_config(config.directory)?;

    match provider.authenticate(username, &password).await {
        Some(user) => {
            println!("{}", serde_json::to_string_pretty(&user)?);
            Ok(())
        }
        None => {
            // Details are in the logs; the caller only learns "no identity".
            anyhow::bail!("authentication failed for {username}")
        }
    }
}

fn plan(config: AppConfig, username: &str) -> anyhow::Result<()> {
    let directory = &config.directory;
    directory.validate()?;

    println!("server url:          {}", directory.server_url());
    println!("connect url:         {}", directory.connect_url());
    println!("bind principal:      {}", directory.full_dn(username));
    println!("relative dn:         {}", directory.relative_dn(username));
    println!("group filter:        {}", directory.group_search_filter(username));
    println!("group query:         {}", directory.group_query(username));
    println!(
        "membership mode:     {}",
        if directory.rfc2307bis {
            "rfc2307bis (DN-valued)"
        } else {
            "rfc2307 (username-valued)"
        }
    );

    Ok(())
}

fn prompt_password() -> anyhow::Result<String> {
    eprint!("password: ");
    std::io::stderr().flush()?;

    let mut password = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut password)
        .context("failed to read password from stdin")?;

    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}
