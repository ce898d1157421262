//! Turns a submitted transaction hash into a receipt.
//!
//! The poll loop is an explicit state machine: [`Synchronizer::transition`]
//! is a pure function from `(state, event, now)` to `(state, effect)`, and
//! [`wait_for_receipt`] executes the effects against a [`Provider`] and the
//! tokio timer. Polls for one transaction are strictly sequential.

use alloy::primitives::B256;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{provider::Provider, Receipt};
use crate::error::{BindingError, Result, TransportError};

/// Fixed delay between receipt polls. No backoff.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq)]
pub enum SyncState {
    Submitted,
    Polling { attempts: u32 },
    Confirmed(Receipt),
    TimedOut,
    TransportError(TransportError),
}

impl SyncState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncState::Confirmed(_) | SyncState::TimedOut | SyncState::TransportError(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The transport handed back a transaction hash.
    Started,
    /// A receipt lookup finished; `None` means not mined yet.
    ReceiptChecked(Option<Receipt>),
    /// A receipt lookup failed.
    CheckFailed(TransportError),
    /// The retry timer fired.
    TimerFired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEffect {
    FetchReceipt,
    Sleep(Duration),
    Done,
}

#[derive(Debug, Clone)]
pub struct Synchronizer {
    transaction_hash: B256,
    /// `None` waits forever.
    timeout: Option<Duration>,
    poll_interval: Duration,
    started_at: Instant,
}

impl Synchronizer {
    pub fn new(
        transaction_hash: B256,
        timeout: Option<Duration>,
        poll_interval: Duration,
        started_at: Instant,
    ) -> Self {
        Self {
            transaction_hash,
            timeout,
            poll_interval,
            started_at,
        }
    }

    pub fn transaction_hash(&self) -> B256 {
        self.transaction_hash
    }

    fn expired(&self, now: Instant) -> bool {
        self.timeout
            .is_some_and(|timeout| now.saturating_duration_since(self.started_at) > timeout)
    }

    pub fn transition(&self, state: SyncState, event: SyncEvent, now: Instant) -> (SyncState, SyncEffect) {
        match (state, event) {
            (state, _) if state.is_terminal() => (state, SyncEffect::Done),
            (SyncState::Submitted, SyncEvent::Started) => {
                (SyncState::Polling { attempts: 0 }, SyncEffect::FetchReceipt)
            }
            (SyncState::Polling { .. }, SyncEvent::ReceiptChecked(Some(receipt))) => {
                (SyncState::Confirmed(receipt), SyncEffect::Done)
            }
            (SyncState::Polling { attempts }, SyncEvent::ReceiptChecked(None)) => {
                if self.expired(now) {
                    (SyncState::TimedOut, SyncEffect::Done)
                } else {
                    (
                        SyncState::Polling {
                            attempts: attempts + 1,
                        },
                        SyncEffect::Sleep(self.poll_interval),
                    )
                }
            }
            (SyncState::Polling { .. }, SyncEvent::CheckFailed(err)) => {
                (SyncState::TransportError(err), SyncEffect::Done)
            }
            (state @ SyncState::Polling { .. }, SyncEvent::TimerFired) => {
                (state, SyncEffect::FetchReceipt)
            }
            // out-of-order events leave the machine where it was
            (state, _) => {
                let effect = match state {
                    SyncState::Submitted => SyncEffect::Done,
                    _ => SyncEffect::FetchReceipt,
                };
                (state, effect)
            }
        }
    }

    /// Map a terminal state to the caller-visible result.
    pub fn finish(&self, state: SyncState) -> Result<Receipt> {
        match state {
            SyncState::Confirmed(receipt) => Ok(receipt),
            SyncState::TransportError(err) => Err(err.into()),
            SyncState::TimedOut => Err(BindingError::TransactionTimeout {
                transaction_hash: self.transaction_hash,
                timeout: self.timeout.unwrap_or_default(),
            }),
            state => Err(TransportError::new(format!(
                "Synchronization of transaction {} stopped in state {:?}",
                self.transaction_hash, state
            ))
            .into()),
        }
    }
}

/// Poll for the receipt of `transaction_hash` every [`POLL_INTERVAL`] until
/// it appears, the transport fails, or `timeout` elapses.
pub async fn wait_for_receipt(
    provider: &Provider,
    transaction_hash: B256,
    timeout: Option<Duration>,
) -> Result<Receipt> {
    let sync = Synchronizer::new(transaction_hash, timeout, POLL_INTERVAL, Instant::now());
    let (mut state, mut effect) = sync.transition(SyncState::Submitted, SyncEvent::Started, Instant::now());

    loop {
        let event = match effect {
            SyncEffect::FetchReceipt => {
                debug!("Polling receipt for transaction {}", transaction_hash);
                match provider.transaction_receipt(transaction_hash).await {
                    Ok(receipt) => SyncEvent::ReceiptChecked(receipt),
                    Err(BindingError::Transport(err)) => SyncEvent::CheckFailed(err),
                    Err(other) => return Err(other),
                }
            }
            SyncEffect::Sleep(delay) => {
                tokio::time::sleep(delay).await;
                SyncEvent::TimerFired
            }
            SyncEffect::Done => break,
        };
        (state, effect) = sync.transition(state, event, Instant::now());
    }

    if let SyncState::Confirmed(receipt) = &state {
        info!(
            "Transaction {} confirmed in block {:?}",
            transaction_hash, receipt.block_number
        );
    }
    sync.finish(state)
}
