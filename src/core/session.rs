//! MQTT session state machine.
//!
//! [`SessionController`] tracks the client's connection state and the active
//! subscription, driving a [`Transport`] and narrating every step into the
//! message history. It never decides *when* to connect; the coordinator owns
//! timing (the post-start delay) and feeds transport events back in.
//!
//! ## Rules
//! - `Disconnected -> Connecting` on `connect`, `Connecting -> Connected`
//!   only when the broker's acceptance arrives, back to `Disconnected` on
//!   any teardown.
//! - The active filter is always unsubscribed before a new subscribe.
//! - Subscription failures are non-fatal: they leave the session connected
//!   but unsubscribed, reported through the history.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::client::{AT_MOST_ONCE, ClientEvent, ErrorCode, Transport};
use crate::records::HistoryStore;

/// Connection state of the MQTT client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClientState {
    Disconnected,
    Connecting,
    Connected,
}

/// Drives the transport and mirrors its lifecycle into the history.
pub(crate) struct SessionController {
    transport: Arc<dyn Transport>,
    state: ClientState,
    topic: String,
    subscribed: Option<String>,
    history: Arc<HistoryStore>,
    events_tx: mpsc::Sender<ClientEvent>,
}

impl SessionController {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        topic: impl Into<String>,
        history: Arc<HistoryStore>,
        events_tx: mpsc::Sender<ClientEvent>,
    ) -> Self {
        Self {
            transport,
            state: ClientState::Disconnected,
            topic: topic.into(),
            subscribed: None,
            history,
            events_tx,
        }
    }

    pub(crate) fn state(&self) -> ClientState {
        self.state
    }

    pub(crate) fn topic(&self) -> &str {
        &self.topic
    }

    /// Opens a session. Acceptance arrives later as [`ClientEvent::Connected`].
    pub(crate) async fn connect(&mut self) {
        self.history.trace("Connecting to MQTT broker").await;
        self.state = ClientState::Connecting;
        if let Err(err) = self.transport.connect(self.events_tx.clone()).await {
            self.history
                .trace(format!("Failed to connect to MQTT broker: {err}"))
                .await;
            self.state = ClientState::Disconnected;
        }
    }

    /// Tears the session down. Idempotent; safe to call in any state.
    ///
    /// The state flips to `Disconnected` when the transport confirms it via
    /// [`ClientEvent::Disconnected`], not here.
    pub(crate) async fn disconnect(&mut self) {
        self.history.trace("Disconnecting from MQTT...").await;
        self.unsubscribe_active().await;
        if self.state != ClientState::Disconnected {
            let _ = self.transport.disconnect().await;
        }
    }

    /// Handles broker acceptance. Returns `true` when the subscribe succeeded.
    pub(crate) async fn on_connected(&mut self) -> bool {
        self.state = ClientState::Connected;
        self.history.trace("MQTT client connected to broker").await;
        self.subscribe_current().await
    }

    /// Handles session loss, clean or not.
    pub(crate) async fn on_disconnected(&mut self) {
        self.subscribed = None;
        self.state = ClientState::Disconnected;
        self.history
            .trace("MQTT client disconnected from broker")
            .await;
    }

    /// Reports a client-side error into the history.
    pub(crate) async fn on_error(&self, code: ErrorCode) {
        self.history.trace(format!("MQTT Error: {code}")).await;
    }

    /// Changes the topic filter. Returns `true` when it actually changed.
    ///
    /// While connected, the live subscription moves to the new filter.
    pub(crate) async fn set_topic(&mut self, topic: &str) -> bool {
        if topic == self.topic {
            return false;
        }
        self.topic = topic.to_string();
        self.history
            .trace(format!("Subscription topic changed to: {topic}"))
            .await;
        if self.state == ClientState::Connected {
            self.update_subscription().await;
        }
        true
    }

    /// Re-points the live subscription at the current filter.
    async fn update_subscription(&mut self) {
        self.unsubscribe_active().await;
        if self.state == ClientState::Connected {
            self.subscribe_current().await;
        }
    }

    async fn subscribe_current(&mut self) -> bool {
        match self.transport.subscribe(&self.topic, AT_MOST_ONCE).await {
            Ok(()) => {
                self.history
                    .trace(format!("Subscribed to MQTT topic: {}", self.topic))
                    .await;
                self.subscribed = Some(self.topic.clone());
                true
            }
            Err(_) => {
                self.history
                    .trace(format!("Failed to subscribe to MQTT topic: {}", self.topic))
                    .await;
                self.subscribed = None;
                false
            }
        }
    }

    async fn unsubscribe_active(&mut self) {
        if let Some(filter) = self.subscribed.take() {
            let _ = self.transport.unsubscribe(&filter).await;
        }
    }
}
