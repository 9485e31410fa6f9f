//! `igloo-server`: runs the server, or performs offline account chores
//! against the configured account file.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use igloo::prelude::*;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, default_value = "config/igloo.toml")]
    config: PathBuf,
    /// Replaces the bind address of the first listener
    #[arg(short, long, value_name = "ADDRESS")]
    bind: Option<String>,
    /// Log filter, e.g. `debug` or `igloo_room=trace`
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server (the default)
    Serve,
    /// Create an account. Run while the server is stopped.
    CreateAccount { username: String, password: String },
    /// Issue a one-shot Engine 1 login token. Run while the server is
    /// stopped.
    IssueToken { username: String },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    let mut config = IglooConfig::load_from_file(&args.config).await?;
    if let Some(bind) = args.bind {
        if let Some(listener) = config.server.listeners.first_mut() {
            listener.bind = bind;
        }
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    setup_logging(&config.logging, args.json_logs)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::CreateAccount { username, password } => {
            let mut world = World::new(config)?;
            if world.authority().account_exists(&username) {
                return Err(format!("account {username} already exists").into());
            }
            let id = world.authority_mut().create_account(&username, &password);
            println!("{id}");
            Ok(())
        }
        Command::IssueToken { username } => {
            let mut world = World::new(config)?;
            let token = world.authority_mut().issue_session_token(&username)?;
            println!("{}", token.value());
            Ok(())
        }
    }
}

async fn serve(config: IglooConfig) -> Result<(), BoxError> {
    let server = IglooServer::builder(config).build().await?;
    for addr in server.local_addrs()? {
        tracing::info!(%addr, "listening");
    }

    tokio::select! {
        result = server.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("shutdown signal received, stopping");
        }
    }
    Ok(())
}
