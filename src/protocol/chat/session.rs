//! Chat server session.
//!
//! The stream is split in two: a `ChatSender` owns the write half behind a
//! lock and can be cloned into any task, while `ChatSession::receive_loop`
//! owns the read half. A frame is always encoded whole and flushed under the
//! lock, so concurrent commands never interleave on the wire.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::time::{timeout, Instant};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

use crate::common::error::{ConnectionError, ConnectionResult};
use crate::common::types::ChatMessage;
use crate::protocol::chat::codec::ChatCodec;
use crate::protocol::chat::opcodes::opcode_name;
use crate::protocol::chat::packets::{ChatPacket, MessagePayload};

pub const DEFAULT_HOST: &str = "game.star-thunder.com";
pub const DEFAULT_PORT: u16 = 2001;

/// Chat protocol version sent in Join and ChangeLanguage.
pub const PROTOCOL_VERSION: u32 = 1;

/// Idle time after which a status request is sent.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on a single wait for inbound data.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Language rooms known to the server.
pub mod languages {
    pub const RU: &str = "ru";
    pub const EN: &str = "en";
    pub const DE: &str = "de";
    pub const FR: &str = "fr";
    pub const PL: &str = "pl";
    pub const UA: &str = "ua";

    pub const ALL: [&str; 6] = [RU, EN, DE, FR, PL, UA];
}

/// Lifecycle of a chat connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Disconnected,
    Connected,
    Joined,
}

/// State shared between the sender handles and the receive loop.
#[derive(Debug)]
struct SessionStatus {
    open: AtomicBool,
    joined: AtomicBool,
    online_users: AtomicU32,
    auth_request_key: watch::Sender<Option<Bytes>>,
}

/// Cloneable handle for sending chat commands.
pub struct ChatSender<S> {
    sink: Arc<Mutex<FramedWrite<WriteHalf<S>, ChatCodec>>>,
    status: Arc<SessionStatus>,
}

impl<S> Clone for ChatSender<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            status: Arc::clone(&self.status),
        }
    }
}

impl<S> ChatSender<S> {
    /// Current connection state.
    pub fn state(&self) -> ChatState {
        if !self.status.open.load(Ordering::Acquire) {
            ChatState::Disconnected
        } else if self.status.joined.load(Ordering::Acquire) {
            ChatState::Joined
        } else {
            ChatState::Connected
        }
    }

    /// Last online-user count reported by the server.
    pub fn online_users(&self) -> u32 {
        self.status.online_users.load(Ordering::Acquire)
    }

    /// Key from the last key-exchange notice, if any.
    pub fn auth_request_key(&self) -> Option<Bytes> {
        self.status.auth_request_key.borrow().clone()
    }
}

impl<S: AsyncWrite> ChatSender<S> {
    /// Encode and flush one packet.
    pub async fn send(&self, packet: ChatPacket) -> ConnectionResult<()> {
        let opcode = packet.opcode();
        let mut sink = self.sink.lock().await;
        sink.send(packet)
            .await
            .map_err(ConnectionError::from_codec)?;
        trace!("Sent {}", opcode_name(opcode));
        Ok(())
    }

    /// Join the chat room for `language`.
    pub async fn join(&self, uid: u32, language: &str) -> ConnectionResult<()> {
        debug!("Joining chat as {} ({})", uid, language);
        self.send(ChatPacket::Join {
            version: PROTOCOL_VERSION,
            uid,
            language: language.to_string(),
        })
        .await?;
        self.status.joined.store(true, Ordering::Release);
        Ok(())
    }

    /// Join the clan chat.
    pub async fn join_clan(&self, clan_id: u32) -> ConnectionResult<()> {
        debug!("Joining clan chat {}", clan_id);
        self.send(ChatPacket::JoinClan { clan_id }).await
    }

    /// Move to another language room.
    pub async fn change_language(&self, uid: u32, language: &str) -> ConnectionResult<()> {
        debug!("Changing chat language to {}", language);
        self.send(ChatPacket::ChangeLanguage {
            version: PROTOCOL_VERSION,
            uid,
            language: language.to_string(),
        })
        .await
    }

    /// Say something in the current language room.
    pub async fn say(&self, text: &str) -> ConnectionResult<()> {
        self.send(ChatPacket::Message(MessagePayload::Say {
            text: text.to_string(),
        }))
        .await
    }

    /// Say something in clan chat.
    pub async fn clan_say(&self, text: &str) -> ConnectionResult<()> {
        self.send(ChatPacket::ClanMessage(MessagePayload::Say {
            text: text.to_string(),
        }))
        .await
    }

    /// Ask the server for a status update.
    pub async fn update_status(&self) -> ConnectionResult<()> {
        self.send(ChatPacket::StatusRequest).await
    }

    /// Send a key-exchange reply. The key must be computed by the caller.
    pub async fn auth_response(&self, key: Bytes) -> ConnectionResult<()> {
        self.send(ChatPacket::AuthResponse { key }).await
    }
}

/// A connected chat session.
pub struct ChatSession<S> {
    reader: FramedRead<ReadHalf<S>, ChatCodec>,
    sender: ChatSender<S>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ChatSession<TcpStream> {
    /// Open a TCP connection to the chat server.
    pub async fn connect(
        host: &str,
        port: u16,
        shutdown_rx: watch::Receiver<bool>,
    ) -> ConnectionResult<Self> {
        info!("Connecting to chat server at {}:{}", host, port);
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| ConnectionError::ConnectFailed {
                host: host.to_string(),
                port,
                source,
            })?;
        info!("Connected to chat server");
        Ok(Self::new(stream, shutdown_rx))
    }
}

impl<S: AsyncRead + AsyncWrite> ChatSession<S> {
    /// Wrap an already-open stream.
    ///
    /// The receive loop exits once `shutdown_rx` reads `true`.
    pub fn new(stream: S, shutdown_rx: watch::Receiver<bool>) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let status = Arc::new(SessionStatus {
            open: AtomicBool::new(true),
            joined: AtomicBool::new(false),
            online_users: AtomicU32::new(0),
            auth_request_key: watch::Sender::new(None),
        });

        Self {
            reader: FramedRead::new(read_half, ChatCodec::new()),
            sender: ChatSender {
                sink: Arc::new(Mutex::new(FramedWrite::new(write_half, ChatCodec::new()))),
                status,
            },
            shutdown_rx,
        }
    }

    /// A handle for sending from other tasks.
    pub fn sender(&self) -> ChatSender<S> {
        self.sender.clone()
    }

    pub async fn join(&self, uid: u32, language: &str) -> ConnectionResult<()> {
        self.sender.join(uid, language).await
    }

    pub async fn join_clan(&self, clan_id: u32) -> ConnectionResult<()> {
        self.sender.join_clan(clan_id).await
    }

    /// Read packets until the server disconnects, a stop is requested, or
    /// the stream can no longer be decoded.
    ///
    /// Chat lines are handed to `on_message` in arrival order on this task.
    /// A status request goes out whenever the line has been idle for the
    /// keepalive interval.
    pub async fn receive_loop<F>(&mut self, mut on_message: F) -> ConnectionResult<()>
    where
        F: FnMut(ChatMessage),
    {
        let result = self.run(&mut on_message).await;
        self.sender.status.open.store(false, Ordering::Release);

        match &result {
            Ok(()) => info!("Chat receive loop finished"),
            Err(e) => warn!("Chat receive loop terminated: {}", e),
        }
        result
    }

    async fn run<F>(&mut self, on_message: &mut F) -> ConnectionResult<()>
    where
        F: FnMut(ChatMessage),
    {
        let mut last_keepalive = Instant::now();

        loop {
            if *self.shutdown_rx.borrow() {
                info!("Stop requested, leaving chat receive loop");
                return Ok(());
            }

            match timeout(POLL_INTERVAL, self.reader.next()).await {
                Err(_) => {
                    if last_keepalive.elapsed() >= KEEPALIVE_INTERVAL {
                        debug!("Chat idle, sending status request");
                        match self.sender.update_status().await {
                            Ok(()) => last_keepalive = Instant::now(),
                            Err(ConnectionError::TransportClosed) => {
                                info!("Chat connection closed before keepalive");
                                return Ok(());
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }
                Ok(Some(Ok(packet))) => self.handle_packet(packet, on_message),
                Ok(Some(Err(e))) => {
                    return match ConnectionError::from_codec(e) {
                        ConnectionError::TransportClosed => {
                            info!("Chat connection reset by server");
                            Ok(())
                        }
                        other => Err(other),
                    };
                }
                Ok(None) => {
                    info!("Chat server closed the connection");
                    return Ok(());
                }
            }
        }
    }

    fn handle_packet<F>(&mut self, packet: ChatPacket, on_message: &mut F)
    where
        F: FnMut(ChatMessage),
    {
        match packet {
            ChatPacket::Message(MessagePayload::Broadcast(message))
            | ChatPacket::ClanMessage(MessagePayload::Broadcast(message)) => {
                trace!("Chat line from {} ({})", message.name, message.uid);
                on_message(message);
            }
            ChatPacket::StatusResponse { online_users } => {
                debug!("Server reports {} users online", online_users);
                self.sender
                    .status
                    .online_users
                    .store(online_users, Ordering::Release);
            }
            ChatPacket::AuthRequest { key } => {
                debug!("Received key exchange request ({} bytes)", key.len());
                self.sender.status.auth_request_key.send_replace(Some(key));
            }
            other => {
                debug!("Ignoring {} from server", opcode_name(other.opcode()));
            }
        }
    }
}
