use serde::{Deserialize, Serialize};

/// Stream kinds a TPA can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    Transcription,
}

/// A speech-to-text result delivered on the `transcription` stream,
/// either partial (still being revised) or final.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionData {
    pub text: String,
    pub is_final: bool,
}

/// Display layouts the glasses can render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "layoutType", rename_all = "snake_case")]
pub enum Layout {
    /// A full-screen wall of text.
    TextWall { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "tpa_connection_init")]
    ConnectionInit(ConnectionInitEvent),
    #[serde(rename = "subscription_update")]
    SubscriptionUpdate(SubscriptionUpdateEvent),
    #[serde(rename = "display_event")]
    Display(DisplayEvent),
}

/// First message on a fresh socket; authenticates the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInitEvent {
    pub session_id: String,
    pub package_name: String,
    pub api_key: String,
}

/// Replaces the full set of streams this TPA wants to receive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUpdateEvent {
    pub package_name: String,
    pub subscriptions: Vec<StreamType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEvent {
    pub package_name: String,
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Synthesized locally when the socket closes; never arrives on the wire.
    #[serde(rename = "close")]
    Close { reason: Option<String> },
    #[serde(rename = "tpa_connection_ack")]
    ConnectionAck(ConnectionAckEvent),
    #[serde(rename = "tpa_connection_error")]
    ConnectionError(ConnectionErrorEvent),
    #[serde(rename = "data_stream")]
    DataStream(StreamData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAckEvent {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionErrorEvent {
    pub message: String,
}

/// Payload of a `data_stream` event, keyed by its stream type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "streamType", content = "data", rename_all = "snake_case")]
pub enum StreamData {
    Transcription(TranscriptionData),
}
