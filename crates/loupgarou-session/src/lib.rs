//! Game sessions for Loup-Garou.
//!
//! - [`Session`] — one game: roster, [`Phase`], roles, night actions
//! - [`SessionRegistry`] — every live session, each behind its own lock
//! - [`GameConfig`] — thresholds and the role catalog
//! - [`resolve_night`] — turns a night's actions into deaths and reveals
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← orchestrates requests, emits outbound events
//!     ↕
//! Session layer (this crate)  ← state machine + registry
//!     ↕
//! Roles / Protocol (below)  ← Role, RoleCatalog, SessionId, ConnectionId
//! ```

mod config;
mod error;
mod night;
mod participant;
mod phase;
mod registry;
mod session;

pub use config::{GameConfig, DEFAULT_MAX_PLAYERS, DEFAULT_MIN_PLAYERS};
pub use error::SessionError;
pub use night::{resolve_night, NightAction, NightOutcome};
pub use participant::{
    Participant, ParticipantView, RoleAssignment, SessionSummary,
};
pub use phase::Phase;
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{
    validate_name, Elimination, NightReport, Revelation, Session,
};
