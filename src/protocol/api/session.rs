//! Game API session: request/response pairing over an `HttpTransport`.

use tracing::{debug, info, warn};

use crate::common::error::{ApiError, ApiResult};
use crate::protocol::api::buffer::PacketReader;
use crate::protocol::api::packets::{
    AuthChallengeRequest, AuthChallengeResponse, AuthRequest, AuthResponse, RequestEncode,
    ResponseDecode, ServerTimeRequest, ServerTimeResponse,
};
use crate::protocol::api::transport::{HttpClient, HttpTransport};

pub const DEFAULT_HOST: &str = "game.star-thunder.com";
pub const DEFAULT_PORT: u16 = 1337;

pub const USER_AGENT: &str = "BestHTTP/2 v2.5.2";

// Header names are matched case-sensitively by the server.
pub const OS_HEADER: &str = "x-OS";
pub const DL_HEADER: &str = "x-DL";

/// Platform id sent in `x-OS`.
const OS_ID: &str = "2";

/// Authentication progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiState {
    Disconnected,
    AuthInProgress,
    Authenticated,
}

/// Client for the game HTTP API.
pub struct GameSession<T> {
    transport: T,
    version: String,
    state: ApiState,
}

impl GameSession<HttpClient> {
    /// Session over a plain HTTP client.
    pub fn with_http(host: &str, port: u16, version: impl Into<String>) -> Self {
        Self::new(HttpClient::new(host, port), version)
    }
}

impl<T: HttpTransport> GameSession<T> {
    pub fn new(transport: T, version: impl Into<String>) -> Self {
        Self {
            transport,
            version: version.into(),
            state: ApiState::Disconnected,
        }
    }

    pub fn state(&self) -> ApiState {
        self.state
    }

    /// Ask the server for its clock.
    pub async fn server_time(&self) -> ApiResult<ServerTimeResponse> {
        let request = ServerTimeRequest {
            version: self.version.clone(),
        };
        self.call(&request).await
    }

    /// Log in as `uid` and fetch the service directory.
    pub async fn auth_request(&mut self, uid: u32) -> ApiResult<AuthResponse> {
        let request = AuthRequest {
            uid,
            version: self.version.clone(),
        };

        self.state = ApiState::AuthInProgress;
        match self.call::<_, AuthResponse>(&request).await {
            Ok(response) => {
                info!(
                    "Authenticated as {} (game server {}, chat server {})",
                    uid, response.game_server, response.chat_server
                );
                self.state = ApiState::Authenticated;
                Ok(response)
            }
            Err(e) => {
                warn!("Auth request for {} failed: {}", uid, e);
                self.state = ApiState::Disconnected;
                Err(e)
            }
        }
    }

    /// Send the challenge step. The reply is returned undecoded.
    pub async fn auth_challenge_response(&self, uid: u32) -> ApiResult<AuthChallengeResponse> {
        let request = AuthChallengeRequest {
            uid,
            version: self.version.clone(),
        };
        self.call(&request).await
    }

    async fn call<Req, Resp>(&self, request: &Req) -> ApiResult<Resp>
    where
        Req: RequestEncode,
        Resp: ResponseDecode,
    {
        let packed = request.pack()?;

        let mut headers = vec![
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            (OS_HEADER.to_string(), OS_ID.to_string()),
        ];
        if Req::SENDS_DL {
            headers.push((DL_HEADER.to_string(), packed.dl.to_string()));
        }

        debug!("Calling {} ({} bytes, dl={})", Req::PATH, packed.body.len(), packed.dl);
        let body = self.transport.post(Req::PATH, &headers, packed.body).await?;
        if body.is_empty() {
            return Err(ApiError::EmptyResponse {
                path: Req::PATH.to_string(),
            });
        }

        Resp::decode(&mut PacketReader::new(body))
    }
}
