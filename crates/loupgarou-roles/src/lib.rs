//! Roles for Loup-Garou.
//!
//! - [`Role`] — the hidden labels, and which [`NightActionKind`]s they grant
//! - [`RoleCatalog`] — which roles a session deals and how many werewolves
//! - [`assign_roles`] — the dealer: shuffle, then cycle in join order
//!
//! Everything here is pure. Randomness is always passed in.

mod catalog;
mod error;
mod role;

pub use catalog::{assign_roles, RoleCatalog, DEFAULT_WEREWOLF_RATIO};
pub use error::RoleError;
pub use role::{NightActionKind, Role};
