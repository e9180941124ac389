//! Chat session plumbing shared by the Discord adapter and the event orchestrator.
//!
//! A message is only a text body plus a way to answer it, so the orchestrator
//! never sees Discord types. The lifecycle tracks whether the session is ready
//! and how many times in a row it has been rebuilt after losing the gateway.

use crate::error::BotResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Answers the message it was created for
#[async_trait]
pub trait Reply: Send + Sync {
    async fn reply(&self, text: &str) -> BotResult<()>;
}

/// A message seen by the chat session
#[derive(Clone)]
pub struct IncomingMessage {
    pub body: String,
    pub reply: Arc<dyn Reply>,
}

impl IncomingMessage {
    pub fn new(body: impl Into<String>, reply: Arc<dyn Reply>) -> Self {
        Self {
            body: body.into(),
            reply,
        }
    }
}

impl fmt::Debug for IncomingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingMessage")
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// Where the chat session is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    /// Connected but not linked anywhere yet; on Discord, waiting to be
    /// invited to a server
    AwaitingQrScan,
    Ready,
    /// Session lost; this is the n:th rebuild in a row
    Reconnecting { attempt: u32 },
    /// Shut down on purpose
    Disconnected,
    /// Gave up reconnecting
    Failed,
}

/// Bounded exponential backoff for rebuilding a lost session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the given attempt (1-based): base, 2x base, 4x base... capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// Shared session state, updated from gateway events and the reconnect loop
#[derive(Debug)]
pub struct SessionLifecycle {
    state: watch::Sender<SessionState>,
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self { state }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Messages are only handled once the session is ready
    pub fn accepts_messages(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// The session has to be linked before messages arrive; the link or
    /// code is logged, not rendered
    pub fn on_pairing_code(&self, code: &str) {
        info!("📲 Link the bot with: {}", code);
        self.state.send_replace(SessionState::AwaitingQrScan);
    }

    pub fn on_ready(&self) {
        if self.state.send_replace(SessionState::Ready) != SessionState::Ready {
            info!("✅ Chat session is ready");
        }
    }

    /// Record a lost session. Returns how long to wait before rebuilding it,
    /// or `None` once the policy is exhausted and the state is `Failed`.
    pub fn on_session_lost(&self, policy: &ReconnectPolicy) -> Option<Duration> {
        let attempt = match self.state() {
            SessionState::Reconnecting { attempt } => attempt + 1,
            SessionState::Failed => return None,
            _ => 1,
        };

        if attempt > policy.max_attempts() {
            warn!("Giving up on chat session after {} attempts", policy.max_attempts());
            self.state.send_replace(SessionState::Failed);
            return None;
        }

        self.state.send_replace(SessionState::Reconnecting { attempt });
        Some(policy.delay_for(attempt))
    }

    pub fn on_shutdown(&self) {
        self.state.send_replace(SessionState::Disconnected);
    }
}

/// Log every state change until the lifecycle is dropped
pub async fn log_state_changes(mut states: watch::Receiver<SessionState>) {
    while states.changed().await.is_ok() {
        let state = *states.borrow_and_update();
        match state {
            SessionState::Failed => warn!("Chat session state: {:?}", state),
            _ => debug!("Chat session state: {:?}", state),
        }
    }
}
