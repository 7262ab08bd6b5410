use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use parenting_chat::constants::{self, API_KEY_NAME};
use parenting_chat::credentials::{CredentialSource, SecretStore};
use parenting_chat::llm_interaction::ClientSettings;
use parenting_chat::session::Session;
use parenting_chat::{chat, web_server};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[arg(long, global = true, help = "Groq model to chat with [default: $GROQ_MODEL or llama3-8b-8192]")]
    model: Option<String>,
    #[arg(long, global = true, help = "Base URL of the OpenAI-compatible API [default: $GROQ_API_BASE or Groq]")]
    api_base: Option<String>,
    #[arg(long, global = true, help = "TOML file checked for GROQ_API_KEY when the environment lacks it")]
    secrets_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the chatbot web server.
    Serve {
        #[arg(long, default_value_t = 8501, help = "Port for the web server.")]
        port: u16,
        #[arg(long, default_value = "templates", help = "Directory holding the page templates.")]
        templates: PathBuf,
        #[arg(long, default_value = "static", help = "Directory served under /static.")]
        static_dir: PathBuf,
    },
    /// Fill in the child info and chat in the terminal.
    Chat,
}

impl Cli {
    fn session(&self) -> Session {
        let settings = ClientSettings {
            api_base: self
                .api_base
                .clone()
                .unwrap_or_else(|| constants::GROQ_API_BASE.clone()),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| constants::DEFAULT_MODEL.clone()),
        };
        let secrets_path = self
            .secrets_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(constants::SECRETS_FILE.as_str()));
        let secrets = SecretStore::load_or_empty(&secrets_path);

        Session::new(settings, CredentialSource::new(API_KEY_NAME, secrets))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for environment variables like API keys)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,parenting_chat=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    info!("Starting with command: {:?}", cli.command);
    let mut session = cli.session();

    match cli.command {
        Commands::Serve {
            port,
            templates,
            static_dir,
        } => {
            let config = web_server::WebConfig {
                port,
                templates_dir: templates,
                static_dir,
            };
            let mut web_server_handle = tokio::spawn(async move {
                if let Err(e) = web_server::start_web_server(config, session).await {
                    error!("Web server failed: {:?}", e);
                }
            });

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received, shutting down...");
                    web_server_handle.abort();
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(_) => info!("Web server task completed."),
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }
            info!("Shutdown complete.");
        }
        Commands::Chat => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut output = std::io::stdout();
            chat::run_terminal_chat(&mut session, &mut input, &mut output)
                .await
                .context("Chat session failed")?;
            info!("Chat session finished.");
        }
    }

    Ok(())
}
