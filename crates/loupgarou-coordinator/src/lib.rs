//! Session coordination for Loup-Garou.
//!
//! [`Coordinator`] takes inbound requests (create, join, delete, night
//! action, phase advance, disconnect), runs them against the session
//! registry, and publishes the [`Outbound`] events each one produces to an
//! [`EventSink`]. It never talks to a connection itself.
//!
//! ```text
//! transport ──request──▶ Coordinator ──Vec<Outbound>──▶ EventSink (transport)
//!                            │
//!                            ▼
//!                     SessionRegistry (per-session locks)
//! ```

mod address;
mod coordinator;
mod events;
mod sink;

#[cfg(feature = "ipify")]
pub use address::IpifyResolver;
pub use address::{AddressError, AddressResolver, NoDiscovery};
pub use coordinator::{Coordinator, SessionCreated};
pub use events::{Outbound, ServerEvent};
pub use sink::EventSink;
