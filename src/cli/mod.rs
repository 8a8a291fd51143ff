//! CLI command parsing and execution.

pub mod auth;
pub mod tasks;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Spotlight - natural-language command palette for NirvanaHQ.
#[derive(Parser)]
#[command(name = "spotlight")]
#[command(about = "Natural-language command palette for NirvanaHQ")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Relay a single request and print the answer.
    #[command(visible_alias = "a")]
    Ask {
        /// What to do, in plain language.
        prompt: String,

        /// JSON file with prior conversation turns.
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Manage the Nirvana token and the model API key.
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Query tasks directly, without the model.
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store the Nirvana auth token.
    ///
    /// Accepts a copied `/api/everything` request URL or the bare token.
    Token {
        /// Request URL or token.
        value: String,
    },

    /// Store the OpenAI API key (prompts when omitted).
    Key {
        /// The API key.
        key: Option<String>,
    },

    /// Show which credentials are configured.
    Status,

    /// Forget the Nirvana auth token.
    Logout,
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// List tasks in one list.
    List {
        /// inbox, next (or active), waiting, scheduled, someday or trash.
        list: String,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Search task names and notes.
    Search {
        /// Text to look for.
        query: String,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration.
    Show,

    /// Show the configuration file path.
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_no_args() {
        let cli = Cli::parse_from(["spotlight"]);
        assert_eq!(cli.verbose, 0);
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_parses_verbose_flag() {
        let cli = Cli::parse_from(["spotlight", "-v"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["spotlight", "-vvv"]);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn cli_parses_ask_command() {
        let cli = Cli::parse_from(["spotlight", "ask", "add buy milk"]);
        match cli.command {
            Some(Commands::Ask { prompt, history }) => {
                assert_eq!(prompt, "add buy milk");
                assert!(history.is_none());
            }
            _ => panic!("expected Ask command"),
        }
    }

    #[test]
    fn cli_parses_ask_alias_with_history() {
        let cli = Cli::parse_from(["spotlight", "a", "and the next one", "--history", "h.json"]);
        match cli.command {
            Some(Commands::Ask { history, .. }) => {
                assert_eq!(history, Some(PathBuf::from("h.json")));
            }
            _ => panic!("expected Ask command"),
        }
    }

    #[test]
    fn cli_parses_auth_token() {
        let cli = Cli::parse_from(["spotlight", "auth", "token", "abc123"]);
        match cli.command {
            Some(Commands::Auth {
                command: AuthCommands::Token { value },
            }) => assert_eq!(value, "abc123"),
            _ => panic!("expected Auth Token command"),
        }
    }

    #[test]
    fn cli_parses_auth_key_without_value() {
        let cli = Cli::parse_from(["spotlight", "auth", "key"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Auth {
                command: AuthCommands::Key { key: None }
            })
        ));
    }

    #[test]
    fn cli_parses_tasks_list() {
        let cli = Cli::parse_from(["spotlight", "tasks", "list", "next", "-f", "json"]);
        match cli.command {
            Some(Commands::Tasks {
                command: TaskCommands::List { list, format },
            }) => {
                assert_eq!(list, "next");
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected Tasks List command"),
        }
    }

    #[test]
    fn cli_tasks_search_defaults_to_table() {
        let cli = Cli::parse_from(["spotlight", "tasks", "search", "milk"]);
        match cli.command {
            Some(Commands::Tasks {
                command: TaskCommands::Search { query, format },
            }) => {
                assert_eq!(query, "milk");
                assert_eq!(format, OutputFormat::Table);
            }
            _ => panic!("expected Tasks Search command"),
        }
    }

    #[test]
    fn cli_parses_config_path() {
        let cli = Cli::parse_from(["spotlight", "config", "path"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: ConfigCommands::Path
            })
        ));
    }

    #[test]
    fn cli_verbose_is_global() {
        let cli = Cli::parse_from(["spotlight", "auth", "status", "-v"]);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
