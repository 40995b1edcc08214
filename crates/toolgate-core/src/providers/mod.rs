//! Provider routing
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   ProviderGateway                    │
//! │  validate → Dialect::encode_request → transport.send │
//! │           ← Dialect::decode_response ←               │
//! └───────────────────────┬──────────────────────────────┘
//!                         │ ProviderTransport
//!          ┌──────────────┴──────────────┐
//!          ▼                             ▼
//!    HttpTransport (reqwest)       MockTransport
//! ```

mod error;
mod gateway;
mod http;
mod mock;
mod traits;
pub mod wire;

pub use error::{GatewayError, GatewayResult, TransportError};
pub use gateway::{InvocationState, ProviderGateway};
pub use http::{HttpTransport, ANTHROPIC_VERSION};
pub use mock::{MockReply, MockTransport};
pub use traits::{ProviderResponse, ProviderTransport, SendOptions, StopReason, WireRequest};
pub use wire::{Dialect, ToolNameMap};
