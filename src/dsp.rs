//! CamillaDSP websocket control client
//!
//! CamillaDSP accepts JSON text frames. A command without argument is sent as a
//! bare string (`"GetMute"`), a command with argument as a single-key object
//! (`{"SetVolume": -12.5}`). Every request gets exactly one reply of the form
//! `{"GetMute": {"result": "Ok", "value": false}}`.

use crate::error::{DspError, DspResult};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Volume and mute control of a DSP engine
pub trait DspControl {
    /// Whether a connection is currently open
    fn is_connected(&self) -> bool;
    /// Open the connection
    async fn connect(&mut self) -> DspResult<()>;
    /// Set the main volume in dB
    async fn set_volume(&mut self, db: f64) -> DspResult<()>;
    /// Query the main mute state
    async fn get_mute(&mut self) -> DspResult<bool>;
    /// Set the main mute state
    async fn set_mute(&mut self, mute: bool) -> DspResult<()>;
}

/// Commands understood by the CamillaDSP websocket server
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Command {
    GetVersion,
    GetMute,
    SetVolume(f64),
    SetMute(bool),
}

impl Command {
    /// Key CamillaDSP uses for the reply
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetVersion => "GetVersion",
            Command::GetMute => "GetMute",
            Command::SetVolume(_) => "SetVolume",
            Command::SetMute(_) => "SetMute",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReplyBody {
    result: String,
    #[serde(default)]
    value: Option<Value>,
}

/// Decode a reply to `command`, returning its value if any
pub fn parse_reply(command: &str, text: &str) -> DspResult<Option<Value>> {
    let reply: Value = serde_json::from_str(text)?;
    let object = reply
        .as_object()
        .ok_or_else(|| DspError::Protocol(format!("Expected an object, got {}", text)))?;

    if let Some(invalid) = object.get("Invalid") {
        let message = invalid
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("invalid request");
        return Err(DspError::Rejected {
            command: command.to_string(),
            message: message.to_string(),
        });
    }

    let body = object.get(command).ok_or_else(|| {
        DspError::Protocol(format!("Expected reply to {}, got {}", command, text))
    })?;
    let body: ReplyBody = serde_json::from_value(body.clone())?;

    match body.result.as_str() {
        "Ok" => Ok(body.value),
        _ => Err(DspError::Rejected {
            command: command.to_string(),
            message: match body.value {
                Some(Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => body.result,
            },
        }),
    }
}

/// Websocket client for a CamillaDSP instance
pub struct CamillaClient {
    url: String,
    timeout: Duration,
    socket: Option<Socket>,
}

impl CamillaClient {
    /// Create an unconnected client for `host:port`
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            url: format!("ws://{}:{}", host, port),
            timeout: Duration::from_millis(crate::constants::camilla::REQUEST_TIMEOUT_MS),
            socket: None,
        }
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Send one command and wait for its reply
    ///
    /// A dead or unresponsive socket is dropped so the next caller reconnects.
    async fn request(&mut self, command: Command) -> DspResult<Option<Value>> {
        let payload = serde_json::to_string(&command)?;
        let timeout = self.timeout;
        let timeout_ms = self.timeout_ms();
        let socket = self.socket.as_mut().ok_or(DspError::NotConnected)?;

        debug!(%payload, "camilladsp request");
        let reply = match tokio::time::timeout(timeout, exchange(socket, payload)).await {
            Ok(reply) => reply,
            Err(_) => Err(DspError::Timeout(timeout_ms)),
        };

        if let Err(DspError::Transport(_) | DspError::Timeout(_)) = reply {
            self.socket = None;
        }
        let text = reply?;
        debug!(%text, "camilladsp reply");

        parse_reply(command.name(), &text)
    }
}

async fn exchange(socket: &mut Socket, payload: String) -> DspResult<String> {
    socket.send(Message::Text(payload)).await?;
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text),
            Some(Ok(Message::Binary(_))) => {
                return Err(DspError::Protocol("Unexpected binary frame".to_string()));
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(DspError::Transport("Connection closed by CamillaDSP".to_string()));
            }
            // Ping/pong are answered by tungstenite itself
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

impl DspControl for CamillaClient {
    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    async fn connect(&mut self) -> DspResult<()> {
        let timeout_ms = self.timeout_ms();
        let (socket, _) = tokio::time::timeout(self.timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| DspError::Timeout(timeout_ms))?
            .map_err(|e| DspError::Connect(format!("{}: {}", self.url, e)))?;
        self.socket = Some(socket);

        // Only a completed handshake counts as connected
        let version = match self.request(Command::GetVersion).await {
            Ok(version) => version,
            Err(e) => {
                self.socket = None;
                return Err(e);
            }
        };
        let version = version
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(url = %self.url, version, "connected to CamillaDSP");
        Ok(())
    }

    async fn set_volume(&mut self, db: f64) -> DspResult<()> {
        self.request(Command::SetVolume(db)).await?;
        Ok(())
    }

    async fn get_mute(&mut self) -> DspResult<bool> {
        let value = self.request(Command::GetMute).await?;
        value
            .as_ref()
            .and_then(Value::as_bool)
            .ok_or_else(|| DspError::Protocol(format!("GetMute returned {:?}", value)))
    }

    async fn set_mute(&mut self, mute: bool) -> DspResult<()> {
        self.request(Command::SetMute(mute)).await?;
        Ok(())
    }
}
