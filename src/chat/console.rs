//! Console chat adapter: reads chat lines from a stream (stdin in production).

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::command::parse_command;
use crate::speech::{DispatchState, SynthesisDispatcher};

/// Command name routed to the dispatcher.
pub const TTS_COMMAND: &str = "tts";

/// Routes chat lines to the dispatcher, one task per `tts` command.
pub struct ConsoleChat {
    dispatcher: Arc<SynthesisDispatcher>, // Shared by all command tasks
    prefix: String,                       // Command prefix, e.g. "!"
}

impl ConsoleChat {
    pub fn new(dispatcher: Arc<SynthesisDispatcher>, prefix: impl Into<String>) -> Self {
        Self { dispatcher, prefix: prefix.into() }
    }

    /// Read lines until end of input, then wait for in-flight commands.
    ///
    /// Commands are not serialized: a new line is read while earlier commands are still
    /// being synthesized.
    ///
    /// # Returns
    /// The number of `tts` commands dispatched.
    ///
    /// # Errors
    /// Returns an error if reading the input fails.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, reader: R) -> Result<usize> {
        info!("💬 Connected to console chat (prefix '{}')", self.prefix);

        let mut lines = reader.lines();
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line.context("Failed to read chat input")? {
                        Some(line) => {
                            if self.on_line(&line, &mut tasks) {
                                dispatched += 1;
                            }
                        }
                        None => break,
                    }
                }
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    log_finished(result);
                }
            }
        }

        info!("Chat input closed, waiting for {} command(s)", tasks.len());
        while let Some(result) = tasks.join_next().await {
            log_finished(result);
        }

        Ok(dispatched)
    }

    /// Handle one chat line; returns true if a `tts` command was dispatched.
    fn on_line(&self, line: &str, tasks: &mut JoinSet<DispatchState>) -> bool {
        let Some(command) = parse_command(line, &self.prefix) else {
            return false;
        };

        if command.name != TTS_COMMAND {
            debug!("Ignoring command '{}'", command.name);
            return false;
        }

        let dispatcher = self.dispatcher.clone();
        tasks.spawn(async move { dispatcher.handle(&command.arguments).await });
        true
    }
}

fn log_finished(result: Result<DispatchState, tokio::task::JoinError>) {
    match result {
        Ok(state) => debug!("Command finished: {:?}", state),
        Err(e) => warn!("Command task aborted: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeechSettings;
    use crate::speech::testing::{FakeBackend, RecordingSink, voice};

    async fn chat(backend: &Arc<FakeBackend>) -> ConsoleChat {
        let settings = SpeechSettings::for_region("westeurope", Some("secret".to_string()));
        let dispatcher = SynthesisDispatcher::start(&settings, backend.clone(), Arc::new(RecordingSink::new())).await.unwrap();
        ConsoleChat::new(Arc::new(dispatcher), "!")
    }

    #[tokio::test]
    async fn test_only_tts_commands_are_dispatched() {
        let backend = Arc::new(FakeBackend::with_voices(vec![voice("George", "en-GB-George", "en-GB")]));
        let chat = chat(&backend).await;

        let input: &[u8] = b"hello everyone\n!tts george good evening\n!dance\n!TTS chat is great\n!tts\n";
        let dispatched = chat.run(tokio::io::BufReader::new(input)).await.unwrap();

        assert_eq!(dispatched, 3);
        let mut texts: Vec<String> = backend.synthesis_calls().into_iter().map(|(request, _)| request.text).collect();
        texts.sort();
        assert_eq!(texts, vec!["chat is great", "good evening"]);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_chat() {
        let backend = Arc::new(FakeBackend::new());
        let chat = chat(&backend).await;
        backend.fail_all_synthesis(true);

        let input: &[u8] = b"!tts one\n!tts two\n";
        assert_eq!(chat.run(tokio::io::BufReader::new(input)).await.unwrap(), 2);
        assert_eq!(backend.synthesis_calls().len(), 2);
    }
}
