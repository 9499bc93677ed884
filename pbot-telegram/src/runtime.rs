//! Event loop: polls the update source, runs each message through the handler chain one at a time,
//! reconnects with bounded exponential backoff and stops on the shutdown signal.

use std::future::Future;
use std::time::Duration;

use handler_chain::HandlerChain;
use pbot_core::Message;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tracing::{debug, error, info, warn};

use crate::error::ConnectionError;
use crate::update_source::UpdateSource;

/// Reconnect policy.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Reconnect attempts after a failed poll before giving up. Reset by every successful poll.
    pub max_reconnect_attempts: usize,
    /// Backoff factor: delays are factor × 2^n milliseconds (with jitter).
    pub backoff_factor_ms: u64,
    pub max_backoff: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            backoff_factor_ms: 500,
            max_backoff: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Connected,
    Reconnecting { attempt: usize },
    ShutDown,
}

pub struct BotRuntime<S: UpdateSource> {
    source: S,
    chain: HandlerChain,
    options: RuntimeOptions,
    state: RuntimeState,
    processed: u64,
}

fn backoff(options: &RuntimeOptions) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(options.backoff_factor_ms)
        .max_delay(options.max_backoff)
        .map(jitter)
        .take(options.max_reconnect_attempts)
}

impl<S: UpdateSource> BotRuntime<S> {
    pub fn new(source: S, chain: HandlerChain, options: RuntimeOptions) -> Self {
        Self {
            source,
            chain,
            options,
            state: RuntimeState::Connected,
            processed: 0,
        }
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    /// Messages handed to the chain so far, including ones whose handlers failed.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Runs until `shutdown` resolves (Ok) or reconnecting fails `max_reconnect_attempts` times in a row (Err).
    /// The state is `ShutDown` when this returns.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), ConnectionError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut delays = backoff(&self.options);
        let mut failures = 0usize;
        self.state = RuntimeState::Connected;
        info!(
            max_reconnect_attempts = self.options.max_reconnect_attempts,
            "Runtime started"
        );

        loop {
            let polled = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, leaving event loop");
                    break;
                }
                polled = self.source.poll() => polled,
            };

            match polled {
                Ok(messages) => {
                    if failures > 0 {
                        info!(failed_polls = failures, "Reconnected");
                        failures = 0;
                        delays = backoff(&self.options);
                        self.state = RuntimeState::Connected;
                    }
                    for message in &messages {
                        self.dispatch(message).await;
                    }
                }
                Err(err) => {
                    failures += 1;
                    let Some(delay) = delays.next() else {
                        let attempts = failures - 1;
                        error!(attempts, error = %err, "Reconnect attempts exhausted");
                        self.state = RuntimeState::ShutDown;
                        return Err(ConnectionError::RetriesExhausted {
                            attempts,
                            last_error: err.to_string(),
                        });
                    };
                    self.state = RuntimeState::Reconnecting { attempt: failures };
                    warn!(
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Connection lost, reconnecting"
                    );
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => {
                            info!("Shutdown requested while reconnecting");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        self.state = RuntimeState::ShutDown;
        Ok(())
    }

    /// Handler failures are isolated to the message that caused them.
    async fn dispatch(&mut self, message: &Message) {
        self.processed += 1;
        match self.chain.handle(message).await {
            Ok(response) => {
                debug!(message_id = %message.id, response = ?response, "Message handled");
            }
            Err(e) => {
                error!(
                    error = %e,
                    user_id = message.user.id,
                    chat_id = message.chat.id,
                    message_id = %message.id,
                    "Handler chain failed"
                );
            }
        }
    }
}
