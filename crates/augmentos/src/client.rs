use crate::types;
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio_tungstenite::tungstenite::Message;

pub mod config;
mod consts;

pub type ClientTx = tokio::sync::mpsc::Sender<types::ClientEvent>;
type ServerTx = tokio::sync::broadcast::Sender<types::ServerEvent>;
pub type ServerRx = tokio::sync::broadcast::Receiver<types::ServerEvent>;

/// A connection to the AugmentOS cloud for one glasses session.
///
/// Client events are funneled through an mpsc channel to a writer task that
/// owns the socket's write half; server events are decoded by a reader task
/// and fanned out on a broadcast channel.
pub struct Client {
    capacity: usize,
    config: config::Config,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
}

impl Client {
    fn new(capacity: usize, config: config::Config) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            s_tx: None,
        }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.c_tx.is_some() {
            return Err(anyhow::anyhow!("already connected"));
        }

        let url = format!("{}{}", self.config.base_url(), consts::TPA_WS_PATH);
        let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel(self.capacity);
        let (s_tx, _) = tokio::sync::broadcast::channel(self.capacity);

        self.c_tx = Some(c_tx.clone());
        self.s_tx = Some(s_tx.clone());

        // Writer task: serialize client events onto the socket.
        tokio::spawn(async move {
            while let Some(event) = c_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                }
            }
        });

        // Reader task: decode server events and broadcast them. An event that
        // fails to decode is logged and skipped; it never tears the
        // connection down.
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => {
                        match serde_json::from_str::<types::ServerEvent>(&text) {
                            Ok(event) => {
                                if let Err(e) = s_tx.send(event) {
                                    tracing::error!("failed to send event: {}", e);
                                }
                            }
                            Err(e) => {
                                tracing::error!(
                                    "failed to deserialize event: {}, text=> {:?}",
                                    e,
                                    text
                                );
                            }
                        }
                    }
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {:?}", bin);
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        let close_event = types::ServerEvent::Close {
                            reason: reason.map(|v| format!("{:?}", v)),
                        };
                        if let Err(e) = s_tx.send(close_event) {
                            tracing::error!("failed to send close event: {}", e);
                        }
                        break;
                    }
                    _ => {}
                }
            }
            drop(c_tx);
            drop(s_tx);
        });
        Ok(())
    }

    /// Get a receiver for server events.
    pub async fn server_events(&mut self) -> Result<ServerRx> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    async fn send_client_event(&mut self, event: types::ClientEvent) -> Result<()> {
        match self.c_tx {
            Some(ref tx) => {
                tx.send(event).await?;
                Ok(())
            }
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    /// Authenticate this session with the cloud. Must be the first event
    /// sent on a fresh connection.
    pub async fn init_connection(&mut self, session_id: &str) -> Result<()> {
        let event = types::ClientEvent::ConnectionInit(types::ConnectionInitEvent {
            session_id: session_id.to_string(),
            package_name: self.config.package_name().to_string(),
            api_key: self.config.api_key().expose_secret().to_string(),
        });
        self.send_client_event(event).await
    }

    /// Replace the set of streams this TPA receives for the session.
    pub async fn update_subscriptions(
        &mut self,
        subscriptions: Vec<types::StreamType>,
    ) -> Result<()> {
        let event = types::ClientEvent::SubscriptionUpdate(types::SubscriptionUpdateEvent {
            package_name: self.config.package_name().to_string(),
            subscriptions,
        });
        self.send_client_event(event).await
    }

    /// Render a full-screen text message in the user's display.
    pub async fn show_text_wall(&mut self, text: &str) -> Result<()> {
        let event = types::ClientEvent::Display(types::DisplayEvent {
            package_name: self.config.package_name().to_string(),
            layout: types::Layout::TextWall {
                text: text.to_string(),
            },
        });
        self.send_client_event(event).await
    }
}

/// Create a client with a specific config and connect to the cloud.
pub async fn connect_with_config(capacity: usize, config: config::Config) -> Result<Client> {
    let mut client = Client::new(capacity, config);
    client.connect().await?;
    Ok(client)
}

/// Connect with the default channel capacity.
pub async fn connect(config: config::Config) -> Result<Client> {
    connect_with_config(256, config).await
}
