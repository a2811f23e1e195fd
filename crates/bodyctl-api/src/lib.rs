// bodyctl-api: Async Rust client for the body-control service (command API + push events)

pub mod error;
pub mod models;
pub mod request;
pub mod retry;
pub mod stream;
pub mod transport;

pub use error::{Error, RawResponse, RequestError};
pub use request::{Endpoint, RequestClient, Response};
pub use retry::RetryPolicy;
pub use stream::{
    ChannelTransport, ConnectionState, EventEnvelope, EventHandler, EventKind, EventStreamClient,
    HandlerResult, PushFrame, PushTransport, ReconnectConfig, SseTransport, StreamNotice,
};
pub use transport::{TlsMode, TransportConfig};
