//! Game HTTP API: string framing, packets, transport and session.

pub mod buffer;
pub mod packets;
pub mod session;
pub mod transport;

pub use session::GameSession;
pub use transport::HttpClient;
