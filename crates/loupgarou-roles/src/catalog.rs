//! The role catalog and the dealer that turns it into assignments.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Role;

/// Participants per werewolf when no other ratio is configured.
pub const DEFAULT_WEREWOLF_RATIO: usize = 4;

/// Static description of the roles a session deals.
///
/// Every deal contains each essential role once plus one werewolf per
/// `werewolf_ratio` participants (rounded down).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCatalog {
    /// Roles present in every deal, in catalog order.
    pub essential: Vec<Role>,

    /// Participants per werewolf. Values below 1 are treated as 1.
    pub werewolf_ratio: usize,
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self {
            essential: vec![
                Role::Raven,
                Role::Savior,
                Role::Seer,
                Role::Witch,
                Role::Elder,
                Role::Hunter,
                Role::Villager,
            ],
            werewolf_ratio: DEFAULT_WEREWOLF_RATIO,
        }
    }
}

impl RoleCatalog {
    /// `floor(participant_count / werewolf_ratio)`.
    pub fn werewolf_count(&self, participant_count: usize) -> usize {
        participant_count / self.werewolf_ratio.max(1)
    }

    /// Builds the unshuffled multiset of roles for a deal.
    ///
    /// Never empty: a catalog with no essential roles and no werewolves
    /// falls back to a single villager so dealing can cycle.
    pub fn deck(&self, participant_count: usize) -> Vec<Role> {
        let werewolves = self.werewolf_count(participant_count);
        let mut deck = Vec::with_capacity(self.essential.len() + werewolves);
        deck.extend_from_slice(&self.essential);
        deck.extend(std::iter::repeat_n(Role::Werewolf, werewolves));
        if deck.is_empty() {
            deck.push(Role::Villager);
        }
        deck
    }
}

/// Deals one role per participant, in join order.
///
/// The deck is shuffled with `rng`, then participant `i` receives
/// `deck[i % deck.len()]`. When there are more participants than cards the
/// deck cycles, so some roles are held by several participants.
///
/// Pass a seeded RNG (`StdRng::seed_from_u64`) for reproducible deals.
pub fn assign_roles<R: Rng + ?Sized>(
    participant_count: usize,
    catalog: &RoleCatalog,
    rng: &mut R,
) -> Vec<Role> {
    let mut deck = catalog.deck(participant_count);
    deck.shuffle(rng);

    tracing::debug!(
        participants = participant_count,
        werewolves = catalog.werewolf_count(participant_count),
        deck = deck.len(),
        "roles dealt"
    );

    (0..participant_count)
        .map(|i| deck[i % deck.len()])
        .collect()
}
