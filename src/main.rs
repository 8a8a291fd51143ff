use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use relay_core::Conversation;
use spotlight::{
    Config,
    cli::{AuthCommands, Cli, Commands, ConfigCommands, TaskCommands, auth, tasks},
    core::{CredentialStore, Services},
    overlay::Overlay,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command);
    }

    let config = Config::load()?;
    let store = CredentialStore::open(Config::credentials_path()?, config.storage.persist_timeout());
    let services = Services::build(config, store).await?;

    let Some(command) = cli.command else {
        let mut overlay = Overlay::new(
            services.relay.clone(),
            services.credentials.clone(),
            services.api_key.clone(),
        );
        let stdin = BufReader::new(tokio::io::stdin());
        return overlay.run(stdin, &mut std::io::stdout()).await;
    };

    match command {
        Commands::Ask { prompt, history } => {
            let history = match history {
                Some(path) => Conversation::load(&path)?,
                None => Conversation::new(),
            };

            let outcome = services.relay.process(&prompt, &history).await?;
            if let Some(name) = &outcome.function_called {
                tracing::info!(function = %name, "request used a task operation");
            }
            println!("{}", outcome.response);
        }

        Commands::Auth { command } => match command {
            AuthCommands::Token { value } => auth::auth_token(&services, &value).await?,
            AuthCommands::Key { key } => auth::auth_key(&services, key).await?,
            AuthCommands::Status => auth::auth_status(&services),
            AuthCommands::Logout => auth::auth_logout(&services).await?,
        },

        Commands::Tasks { command } => match command {
            TaskCommands::List { list, format } => tasks::list(&services, &list, format).await?,
            TaskCommands::Search { query, format } => {
                tasks::search(&services, &query, format).await?;
            }
        },

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config_command(command: &ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
