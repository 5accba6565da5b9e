use crate::domain::dispatch::{
    DispatchReport, DispatchResult, DispatchState, DispatchTarget, StateTransition,
};
use crate::domain::ports::MessageChannel;
use crate::error::{ArrearsError, ChannelError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Pacing for a dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Wait between consecutive sends, required by provider rate limits.
    pub delay: Duration,
    /// Upper bound for a single send; exceeding it counts as a failure.
    pub send_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl DispatchOptions {
    /// Builds options from signed millisecond values as found in config
    /// files and CLI flags, rejecting negative delays and non-positive
    /// timeouts.
    pub fn from_millis(delay_ms: i64, send_timeout_ms: i64) -> Result<Self> {
        if delay_ms < 0 {
            return Err(ArrearsError::InvalidInput(format!(
                "dispatch delay must not be negative, got {delay_ms}ms"
            )));
        }
        if send_timeout_ms <= 0 {
            return Err(ArrearsError::InvalidInput(format!(
                "send timeout must be positive, got {send_timeout_ms}ms"
            )));
        }
        Ok(Self {
            delay: Duration::from_millis(delay_ms as u64),
            send_timeout: Duration::from_millis(send_timeout_ms as u64),
        })
    }
}

/// Cooperative cancellation shared between the caller and the pipeline.
///
/// Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Sequential, throttled delivery of messages through one channel.
///
/// A single worker drains the queue in order with exactly one send in
/// flight. Every state change is appended to each subscriber's own
/// unbounded stream, so a slow observer never loses transitions and never
/// holds up the worker.
pub struct DispatchPipeline<'a> {
    channel: &'a dyn MessageChannel,
    options: DispatchOptions,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<StateTransition>>>,
}

impl<'a> DispatchPipeline<'a> {
    pub fn new(channel: &'a dyn MessageChannel, options: DispatchOptions) -> Self {
        Self {
            channel,
            options,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribes to state transitions emitted by subsequent runs.
    ///
    /// The stream ends when the pipeline is dropped.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StateTransition> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    fn emit(&self, target_id: &str, state: DispatchState, detail: Option<String>) {
        let transition = StateTransition {
            target_id: target_id.to_string(),
            state,
            detail,
        };
        // Receivers that were dropped are forgotten.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(transition.clone()).is_ok());
    }

    /// Sends every target's message in order.
    ///
    /// Targets without a phone are dropped before the first send and listed
    /// in `excluded`. A failed or timed out send marks that target `Error`
    /// and the run moves on. Cancellation is honoured between sends; targets
    /// not reached stay `Pending`.
    pub async fn run(
        &self,
        targets: &[DispatchTarget],
        cancel: &CancellationToken,
    ) -> Result<DispatchReport> {
        if targets.is_empty() {
            return Err(ArrearsError::InvalidInput(
                "no dispatch targets given".to_string(),
            ));
        }

        let mut excluded = Vec::new();
        let mut results = Vec::with_capacity(targets.len());
        let mut queue = VecDeque::with_capacity(targets.len());
        for target in targets {
            match target.resolved_phone() {
                Some(phone) => {
                    queue.push_back((results.len(), phone, target));
                    results.push(DispatchResult {
                        target_id: target.id.clone(),
                        state: DispatchState::Pending,
                    });
                    self.emit(&target.id, DispatchState::Pending, None);
                }
                None => {
                    log::warn!(
                        "target {} ({}) has no phone, excluded",
                        target.id,
                        target.display_name
                    );
                    excluded.push(target.id.clone());
                }
            }
        }

        log::info!(
            "dispatching {} messages via {} ({} excluded, {:?} apart)",
            queue.len(),
            self.channel.name(),
            excluded.len(),
            self.options.delay
        );

        let mut cancelled = false;
        while let Some((slot, phone, target)) = queue.pop_front() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let (state, detail) = match self.send_one(phone, &target.message).await {
                Ok(()) => {
                    log::debug!("target {}: sent", target.id);
                    (DispatchState::Success, None)
                }
                Err(e) => {
                    log::warn!("target {}: send failed: {e}", target.id);
                    (DispatchState::Error, Some(e.to_string()))
                }
            };
            results[slot].state = state;
            self.emit(&target.id, state, detail);

            if queue.is_empty() || self.options.delay.is_zero() {
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.options.delay) => {}
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
            }
        }

        let success_count = results
            .iter()
            .filter(|r| r.state == DispatchState::Success)
            .count();
        let error_count = results
            .iter()
            .filter(|r| r.state == DispatchState::Error)
            .count();
        let report = DispatchReport {
            results,
            success_count,
            error_count,
            excluded,
            cancelled,
        };
        log::info!("dispatch finished: {}", report.summary());
        Ok(report)
    }

    async fn send_one(&self, phone: &str, text: &str) -> std::result::Result<(), ChannelError> {
        let send = self.channel.send(phone, text);
        match tokio::time::timeout(self.options.send_timeout, send).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ChannelError::Timeout(self.options.send_timeout)),
        }
    }
}

/// Runs a one-off pipeline over `targets`.
pub async fn dispatch(
    targets: &[DispatchTarget],
    channel: &dyn MessageChannel,
    options: DispatchOptions,
    cancel: &CancellationToken,
) -> Result<DispatchReport> {
    DispatchPipeline::new(channel, options).run(targets, cancel).await
}
