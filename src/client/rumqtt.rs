//! [`Transport`] implementation backed by `rumqttc`.
//!
//! Each `connect` builds a fresh [`AsyncClient`]/[`EventLoop`] pair and spawns
//! a polling task that translates `rumqttc` events into [`ClientEvent`]s. The
//! polling task terminates on the first connection error; reconnecting is the
//! caller's decision, not the transport's.

use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS,
};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use super::transport::{ClientEvent, ErrorCode, Transport};
use crate::error::TransportError;

/// MQTT transport over TCP using `rumqttc`.
///
/// Holds at most one live session. Connecting while a session exists tears
/// the old one down first.
pub struct RumqttTransport {
    host: String,
    port: u16,
    username: String,
    password: String,
    session: Mutex<Option<Session>>,
}

struct Session {
    client: AsyncClient,
    stop: CancellationToken,
}

impl RumqttTransport {
    /// Creates a transport targeting `host:port` with the given credentials.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            session: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl Transport for RumqttTransport {
    async fn connect(&self, events: mpsc::Sender<ClientEvent>) -> Result<(), TransportError> {
        let mut guard = self.session.lock().await;
        if let Some(stale) = guard.take() {
            stale.stop.cancel();
            let _ = stale.client.disconnect().await;
        }

        let mut opts = MqttOptions::new(client_id(), self.host.clone(), self.port);
        opts.set_credentials(self.username.clone(), self.password.clone());
        opts.set_keep_alive(Duration::from_secs(30));

        let (client, eventloop) = AsyncClient::new(opts, 64);
        let stop = CancellationToken::new();
        tokio::spawn(poll_session(eventloop, events, stop.clone()));

        *guard = Some(Session { client, stop });
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let session = self.session.lock().await.take();
        let Some(session) = session else {
            return Ok(());
        };
        // Best-effort graceful DISCONNECT; the token is the backstop if the
        // polling task is stuck mid-connect and never drains the request.
        let _ = session.client.disconnect().await;
        session.stop.cancel();
        Ok(())
    }

    async fn subscribe(&self, filter: &str, qos: u8) -> Result<(), TransportError> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(TransportError::NoSession)?;
        session
            .client
            .subscribe(filter, qos_level(qos))
            .await
            .map_err(|e| TransportError::Client(e.to_string()))
    }

    async fn unsubscribe(&self, filter: &str) -> Result<(), TransportError> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(TransportError::NoSession)?;
        session
            .client
            .unsubscribe(filter)
            .await
            .map_err(|e| TransportError::Client(e.to_string()))
    }
}

/// Drains the rumqttc event loop until the session ends.
///
/// Exactly one [`ClientEvent::Disconnected`] is sent per session, whatever
/// the termination path (clean disconnect, cancellation, or error).
async fn poll_session(
    mut eventloop: EventLoop,
    events: mpsc::Sender<ClientEvent>,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                let _ = events.send(ClientEvent::Disconnected).await;
                return;
            }
            polled = eventloop.poll() => match polled {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    match connack_code(ack.code) {
                        ErrorCode::NoError => {
                            if events.send(ClientEvent::Connected).await.is_err() {
                                return;
                            }
                        }
                        code => {
                            let _ = events.send(ClientEvent::Error { code }).await;
                        }
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = ClientEvent::Message {
                        topic: publish.topic.clone(),
                        payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                    };
                    if events.send(message).await.is_err() {
                        return;
                    }
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    let _ = events.send(ClientEvent::Disconnected).await;
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    let code = classify_error(&err);
                    let _ = events.send(ClientEvent::Error { code }).await;
                    let _ = events.send(ClientEvent::Disconnected).await;
                    return;
                }
            }
        }
    }
}

fn client_id() -> String {
    format!("brokervisor-{}", std::process::id())
}

fn qos_level(qos: u8) -> QoS {
    match qos {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

fn connack_code(code: ConnectReturnCode) -> ErrorCode {
    match code {
        ConnectReturnCode::Success => ErrorCode::NoError,
        ConnectReturnCode::RefusedProtocolVersion => ErrorCode::InvalidProtocolVersion,
        ConnectReturnCode::BadClientId => ErrorCode::IdRejected,
        ConnectReturnCode::ServiceUnavailable => ErrorCode::ServerUnavailable,
        ConnectReturnCode::BadUserNamePassword => ErrorCode::BadUsernameOrPassword,
        ConnectReturnCode::NotAuthorized => ErrorCode::NotAuthorized,
    }
}

fn classify_error(err: &ConnectionError) -> ErrorCode {
    match err {
        ConnectionError::ConnectionRefused(code) => connack_code(*code),
        ConnectionError::Io(_) => ErrorCode::TransportInvalid,
        ConnectionError::NetworkTimeout | ConnectionError::FlushTimeout => {
            ErrorCode::TransportInvalid
        }
        ConnectionError::MqttState(_) => ErrorCode::ProtocolViolation,
        ConnectionError::NotConnAck(_) => ErrorCode::ProtocolViolation,
        _ => ErrorCode::UnknownError,
    }
}
