//! Wire-level vocabulary for Loup-Garou.
//!
//! - **Identity** ([`SessionId`], [`ConnectionId`]) — who and what a
//!   message is about.
//! - **Addressing** ([`Audience`]) — who an outbound event goes to.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how messages become bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (ids, codec) → Session / Coordinator
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Audience, ConnectionId, SessionId};
