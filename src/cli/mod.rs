//! # Command Line
//!
//! `navguard` with no subcommand runs as the browser's native messaging host.
//! The other subcommands talk to the scan service or edit the local store
//! directly, for debugging and for moving allowlists between machines.

use crate::abstractions::AllowlistStore;
use crate::config::GuardConfig;
use crate::domain::{ProxyConfig, Vote};
use crate::engine::proxy::build_rules;
use crate::engine::HttpScanClient;
use crate::error::{GuardError, Result};
use crate::host::{self, HostServices};
use crate::store::{Database, SettingsStore, SqliteAllowlist};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "navguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON config file (defaults to `{dataDir}/config.json`)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep all state in memory for this run
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run as the native messaging host on stdin/stdout (default)
    Serve {
        /// The extension was not granted proxy control
        #[arg(long)]
        no_proxy: bool,
    },

    /// Scan one URL and print the verdict
    Scan { url: String },

    /// Send a safe/unsafe vote for a URL
    Report {
        url: String,

        #[arg(long, value_enum, default_value = "safe")]
        vote: VoteArg,
    },

    /// Check the scan service's health endpoint
    Health,

    /// Inspect or edit the allowlist
    #[command(subcommand)]
    Allowlist(AllowlistCommands),

    /// Inspect or edit the stored VPN proxy settings
    #[command(subcommand)]
    Vpn(VpnCommands),
}

#[derive(Subcommand, Debug)]
pub enum AllowlistCommands {
    #[command(alias = "ls")]
    List,
    Add { url: String },
    /// Revoke an entry
    #[command(alias = "rm")]
    Remove { url: String },
    /// Import an `allowedUrls` JSON object (`{"<url>": true}`)
    Import { path: PathBuf },
    /// Export active entries; prints to stdout without `--output`
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete expired entries
    Purge,
}

#[derive(Subcommand, Debug)]
pub enum VpnCommands {
    Status,
    /// Turn the VPN on; the host applies it on its next start
    Enable,
    Disable,
    /// Save the proxy server used when the VPN is on
    Configure {
        host: String,
        port: String,
        #[arg(long)]
        protocol: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteArg {
    Safe,
    Unsafe,
}

impl From<VoteArg> for Vote {
    fn from(value: VoteArg) -> Self {
        match value {
            VoteArg::Safe => Vote::Safe,
            VoteArg::Unsafe => Vote::Unsafe,
        }
    }
}

fn open_database(config: &GuardConfig, ephemeral: bool) -> Result<Database> {
    if ephemeral {
        Database::open_in_memory()
    } else {
        Database::open(&config.database_path())
    }
}

fn scan_client(config: &GuardConfig) -> Result<HttpScanClient> {
    HttpScanClient::new(&config.api_url, config.scan_timeout())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(cli: Cli, config: GuardConfig) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Serve { no_proxy: false });
    match command {
        Commands::Serve { no_proxy } => {
            let db = open_database(&config, cli.ephemeral)?;
            let mut services = HostServices::from_config(&config, db)?;
            services.proxy_control = !no_proxy;
            host::serve(tokio::io::stdin(), tokio::io::stdout(), services).await
        }
        Commands::Scan { url } => {
            let verdict = scan_client(&config)?.scan_url(&url).await?;
            print_json(&verdict)
        }
        Commands::Report { url, vote } => {
            scan_client(&config)?.report_url(&url, vote.into()).await?;
            println!("reported {url}");
            Ok(())
        }
        Commands::Health => {
            let health = scan_client(&config)?.health().await?;
            print_json(&health)
        }
        Commands::Allowlist(command) => {
            let db = open_database(&config, cli.ephemeral)?;
            run_allowlist(SqliteAllowlist::new(db, config.allowlist_ttl()), command).await
        }
        Commands::Vpn(command) => {
            let db = open_database(&config, cli.ephemeral)?;
            run_vpn(SettingsStore::new(db), command).await
        }
    }
}

async fn run_allowlist(store: SqliteAllowlist, command: AllowlistCommands) -> Result<()> {
    match command {
        AllowlistCommands::List => {
            for entry in store.list().await? {
                let state = if entry.is_active() { "active" } else { "expired" };
                match entry.expires_at {
                    Some(expires_at) => println!("{}\t{state}\texpires_at={expires_at}", entry.url),
                    None => println!("{}\t{state}", entry.url),
                }
            }
        }
        AllowlistCommands::Add { url } => {
            store.allow(&url).await?;
            println!("allowed {url}");
        }
        AllowlistCommands::Remove { url } => {
            if !store.revoke(&url).await? {
                return Err(GuardError::InvalidInput(format!("`{url}` is not allowlisted")));
            }
            println!("revoked {url}");
        }
        AllowlistCommands::Import { path } => {
            let raw = read_input(&path)?;
            let count = store.import_json(&raw).await?;
            println!("imported {count} entries");
        }
        AllowlistCommands::Export { output } => {
            let json = store.export_json().await?;
            match output {
                Some(path) => fs::write(&path, json).map_err(|err| {
                    GuardError::Storage(format!("Failed to write `{}`: {err}", path.display()))
                })?,
                None => println!("{json}"),
            }
        }
        AllowlistCommands::Purge => {
            let removed = store.purge_expired().await?;
            println!("purged {removed} expired entries");
        }
    }
    Ok(())
}

async fn run_vpn(settings: SettingsStore, command: VpnCommands) -> Result<()> {
    match command {
        VpnCommands::Status => {
            let enabled = settings.vpn_enabled().await?;
            let config = settings.proxy_config_or_default().await?;
            print_json(&serde_json::json!({
                "vpnEnabled": enabled,
                "proxyConfig": config,
            }))?;
        }
        VpnCommands::Enable => {
            settings.set_vpn_enabled(true).await?;
            println!("VPN enabled");
        }
        VpnCommands::Disable => {
            settings.set_vpn_enabled(false).await?;
            println!("VPN disabled");
        }
        VpnCommands::Configure {
            host,
            port,
            protocol,
        } => {
            let config = ProxyConfig {
                host,
                port,
                protocol,
            };
            let rules = build_rules(&config)?;
            settings.set_proxy_config(&config).await?;
            let proxy = &rules.rules.single_proxy;
            println!("saved proxy {}://{}:{}", proxy.scheme, proxy.host, proxy.port);
        }
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|err| GuardError::InvalidInput(format!("Failed to read `{}`: {err}", path.display())))
}
