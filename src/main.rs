use std::path::PathBuf;

use clap::{Parser, Subcommand};
use leasehold::{Error, Result, cmd, config};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the leasehold application
#[derive(Parser)]
#[command(name = "leasehold")]
#[command(about = "Single-active-session leases over a shared store")]
#[command(version)]
struct Cli {
   #[arg(long, env = "LEASEHOLD_CONFIG", help = "Extra TOML config layered over the global one")]
   config: Option<PathBuf>,

   #[command(subcommand)]
   command: Cmd,
}

/// Available subcommands for leasehold
#[derive(Subcommand)]
enum Cmd {
   #[command(about = "Hold the lease while the location is in scope")]
   Hold {
      #[arg(long, help = "Location of this context (default: the protected prefix)")]
      path: Option<String>,

      #[arg(long, help = "Release after this many seconds instead of waiting for Ctrl-C")]
      seconds: Option<u64>,
   },

   #[command(about = "Show the current lease owner and heartbeat age")]
   Status {
      #[arg(long, help = "JSON output")]
      json: bool,
   },

   #[command(about = "Release the lease if held by the given owner")]
   Release {
      #[arg(long, help = "Owner token printed by 'hold' or 'status'")]
      owner: String,
   },
}

#[tokio::main]
async fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
      .init();

   let cli = Cli::parse();
   if let Err(err) = run(cli).await {
      if !matches!(err, Error::Reported { .. }) {
         eprintln!("{err}");
      }
      std::process::exit(err.exit_code());
   }
}

async fn run(cli: Cli) -> Result<()> {
   let cfg = config::init_from(cli.config.as_deref())?;

   match cli.command {
      Cmd::Hold { path, seconds } => {
         let path = path.unwrap_or_else(|| cfg.url_pattern.clone());
         cmd::hold::execute(cfg, path, seconds).await
      },
      Cmd::Status { json } => cmd::status::execute(cfg, json),
      Cmd::Release { owner } => cmd::release::execute(cfg, owner),
   }
}
