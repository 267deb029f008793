// MEKA command line client

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use meka_client::commands;
use meka_client::services::ApiClient;
use meka_client::utils::init_logging;
use meka_client::{ConfigService, QuerySessionController, SettingsUpdate};

#[derive(Parser)]
#[command(name = "meka")]
#[command(about = "MEKA - query the multi-agent knowledge assistant", long_about = None)]
struct Cli {
    /// Backend host (overrides MEKA_HOST and the config file)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Backend port (overrides MEKA_PORT and the config file)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question and stream the agents' progress
    Ask {
        /// The question to ask
        query: String,

        /// Allow the backend to use web search
        #[arg(long)]
        web: bool,

        /// Use the non-streaming /ask endpoint
        #[arg(long)]
        no_stream: bool,
    },
    /// List past queries, most recent first
    History,
    /// Delete one past query
    Delete {
        /// Identifier shown by `meka history`
        query_id: String,
    },
    /// Show or edit the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the stored configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Persist one or more settings
    Set {
        #[arg(long)]
        server_host: Option<String>,
        #[arg(long)]
        server_port: Option<u16>,
        #[arg(long)]
        use_tls: Option<bool>,
        #[arg(long)]
        web_search_default: Option<bool>,
        #[arg(long)]
        connect_timeout_secs: Option<u64>,
        #[arg(long)]
        stream_idle_timeout_secs: Option<u64>,
        #[arg(long)]
        request_timeout_secs: Option<u64>,
    },
    /// Restore the default settings
    Reset,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the command ran but did not succeed.
async fn run(cli: Cli) -> Result<bool> {
    let mut service = ConfigService::new().context("Failed to load configuration")?;
    let config = service
        .effective(SettingsUpdate {
            server_host: cli.host,
            server_port: cli.port,
            ..Default::default()
        })
        .context("Invalid configuration")?;

    match cli.command {
        Commands::Ask {
            query,
            web,
            no_stream,
        } => {
            let mut ctrl = QuerySessionController::from_config(&config)?;
            if web {
                ctrl.set_web_search(true);
            }
            let view = commands::ask(&mut ctrl, &query, !no_stream, |line| eprintln!("{}", line))
                .await?;
            match commands::query_outcome(&view) {
                Ok(()) => {
                    print!("{}", commands::render_view(&view));
                    Ok(true)
                }
                Err(e) => {
                    eprintln!("Error: {}", e.user_message());
                    Ok(false)
                }
            }
        }
        Commands::History => {
            let api = ApiClient::from_app_config(&config)?;
            let records = commands::list_history(&api).await?;
            print!("{}", commands::render_history(&records));
            Ok(true)
        }
        Commands::Delete { query_id } => {
            let api = ApiClient::from_app_config(&config)?;
            match commands::delete_history(&api, &query_id).await {
                Ok(()) => {
                    println!("Deleted {}", query_id);
                    Ok(true)
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    Ok(false)
                }
            }
        }
        Commands::Config { action } => run_config(&mut service, action),
    }
}

fn run_config(service: &mut ConfigService, action: ConfigAction) -> Result<bool> {
    match action {
        ConfigAction::Show => println!("{}", commands::show_config(service)?),
        ConfigAction::Path => println!("{}", service.path().display()),
        ConfigAction::Set {
            server_host,
            server_port,
            use_tls,
            web_search_default,
            connect_timeout_secs,
            stream_idle_timeout_secs,
            request_timeout_secs,
        } => {
            let update = SettingsUpdate {
                server_host,
                server_port,
                use_tls,
                web_search_default,
                connect_timeout_secs,
                stream_idle_timeout_secs,
                request_timeout_secs,
            };
            commands::update_config(service, update).context("Failed to save configuration")?;
            println!("Saved {}", service.path().display());
        }
        ConfigAction::Reset => {
            commands::reset_config(service).context("Failed to reset configuration")?;
            println!("Restored defaults in {}", service.path().display());
        }
    }
    Ok(true)
}
