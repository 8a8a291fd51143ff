//! The spotlight overlay: a line-oriented command palette.
//!
//! Each line is either an in-band command (`/clear`, `/setkey`, `/quit`)
//! or a request relayed to the model. The conversation lives as long as
//! the overlay and is dropped when it is dismissed.

use std::io::Write;
use std::sync::Arc;

use relay_core::{Conversation, Relay, SharedSecret};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::core::CredentialStore;

const PROMPT: &str = "› ";

/// What the overlay shows in response to one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to show.
    Silent,
    /// Confirmation of an in-band command.
    Info(String),
    /// The model's answer and the last operation it used.
    Answer {
        text: String,
        function_called: Option<String>,
    },
    /// A failed request; the conversation is left as it was.
    Failure(String),
    /// Close the overlay.
    Dismiss,
}

pub struct Overlay {
    relay: Arc<Relay>,
    credentials: CredentialStore,
    api_key: SharedSecret,
    conversation: Conversation,
}

impl Overlay {
    #[must_use]
    pub fn new(relay: Arc<Relay>, credentials: CredentialStore, api_key: SharedSecret) -> Self {
        Self {
            relay,
            credentials,
            api_key,
            conversation: Conversation::new(),
        }
    }

    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Handle one line of input.
    pub async fn handle(&mut self, line: &str) -> Reply {
        let line = line.trim();
        if line.is_empty() {
            return Reply::Silent;
        }

        match line.split_once(char::is_whitespace).map_or((line, ""), |(c, r)| (c, r.trim())) {
            ("/quit" | "/exit", _) => {
                self.conversation.clear();
                Reply::Dismiss
            }
            ("/clear", _) => {
                self.conversation.clear();
                Reply::Info("Conversation cleared!".to_string())
            }
            ("/setkey", key) => self.set_key(key).await,
            _ => self.ask(line).await,
        }
    }

    async fn set_key(&self, key: &str) -> Reply {
        if key.is_empty() {
            return Reply::Failure("Usage: /setkey <your-openai-api-key>".to_string());
        }

        match self.credentials.set_api_key(key).await {
            Ok(()) => {
                self.api_key.set(key);
                Reply::Info("API key saved!".to_string())
            }
            Err(e) if e.is_environment_unavailable() => {
                tracing::warn!(error = %e, "API key not persisted");
                self.api_key.set(key);
                Reply::Info("API key set for this session (could not be saved).".to_string())
            }
            Err(e) => Reply::Failure(e.to_string()),
        }
    }

    async fn ask(&mut self, input: &str) -> Reply {
        match self.relay.process(input, &self.conversation).await {
            Ok(outcome) => {
                self.conversation.add_user_message(input);
                self.conversation.add_assistant_message(outcome.response.clone());
                Reply::Answer {
                    text: outcome.response,
                    function_called: outcome.function_called,
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "relay failed");
                Reply::Failure(e.to_string())
            }
        }
    }

    /// Read lines from `input` until `/quit` or end of input, writing replies to `output`.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(output, "Nirvana Spotlight. Ask for anything; /clear, /setkey <key>, /quit.")?;
        let mut lines = input.lines();

        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match self.handle(&line).await {
                Reply::Silent => {}
                Reply::Info(message) => writeln!(output, "{message}")?,
                Reply::Answer {
                    text,
                    function_called,
                } => {
                    writeln!(output, "{text}")?;
                    if let Some(name) = function_called {
                        writeln!(output, "[{name}]")?;
                    }
                    writeln!(output)?;
                }
                Reply::Failure(message) => writeln!(output, "Error: {message}")?,
                Reply::Dismiss => break,
            }
        }

        self.conversation.clear();
        writeln!(output)?;
        Ok(())
    }
}
