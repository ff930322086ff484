//! # Loup-Garou
//!
//! Server for the Loup-Garou (Werewolf) party game.
//!
//! Clients connect over WebSockets and exchange JSON: [`ClientRequest`]s in,
//! `ServerEvent`s out. One participant creates a session, others join, and
//! once enough have joined every participant is privately dealt a role and
//! the first night begins. The creator then drives the Night/Day cycle.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loupgarou::prelude::*;
//!
//! # async fn start() -> Result<(), LoupGarouError> {
//! let server = LoupGarouServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .game_config(GameConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;
mod wire;

pub use error::LoupGarouError;
pub use server::{
    LoupGarouServer, LoupGarouServerBuilder, DEFAULT_BIND_ADDR, DEFAULT_IDLE_TIMEOUT,
    OUTBOX_CAPACITY,
};
pub use wire::ClientRequest;

/// Everything needed to run a server or talk to one.
pub mod prelude {
    pub use crate::{
        ClientRequest, LoupGarouError, LoupGarouServer, LoupGarouServerBuilder,
    };
    #[cfg(feature = "ipify")]
    pub use loupgarou_coordinator::IpifyResolver;
    pub use loupgarou_coordinator::{
        AddressError, AddressResolver, NoDiscovery, ServerEvent,
    };
    pub use loupgarou_protocol::{ConnectionId, SessionId};
    pub use loupgarou_roles::{NightActionKind, Role, RoleCatalog};
    pub use loupgarou_session::{
        GameConfig, ParticipantView, Phase, RoleAssignment, SessionSummary,
    };
}
