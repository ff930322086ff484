//! Night actions and their resolution.

use std::collections::HashSet;

use loupgarou_protocol::ConnectionId;
use loupgarou_roles::NightActionKind;
use serde::{Deserialize, Serialize};

/// One action submitted during a night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightAction {
    pub actor: ConnectionId,
    pub kind: NightActionKind,
    pub target: ConnectionId,
}

impl NightAction {
    /// Whether `id` performed this action or is its target.
    pub fn involves(&self, id: ConnectionId) -> bool {
        self.actor == id || self.target == id
    }
}

/// What a night's actions amount to once resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightOutcome {
    /// Participants who die, in resolution order, without duplicates.
    pub eliminated: Vec<ConnectionId>,

    /// `(seer, target)` pairs whose role must be revealed to the seer.
    pub inspections: Vec<(ConnectionId, ConnectionId)>,
}

/// Resolves a night's actions. Pure: applies nothing.
///
/// - The werewolves' victim is the target with the most `Kill` votes;
///   on a tie the target voted for first wins.
/// - A `Protect` or `Heal` on the victim cancels the kill.
/// - Every `Poison` target dies regardless.
/// - `Mark` has no effect at night.
pub fn resolve_night(actions: &[NightAction]) -> NightOutcome {
    let mut outcome = NightOutcome::default();

    // (target, votes) in first-vote order so ties keep the earliest.
    let mut tally: Vec<(ConnectionId, usize)> = Vec::new();
    let mut saved = HashSet::new();
    let mut poisoned = Vec::new();

    for action in actions {
        match action.kind {
            NightActionKind::Kill => {
                match tally.iter_mut().find(|(t, _)| *t == action.target) {
                    Some((_, votes)) => *votes += 1,
                    None => tally.push((action.target, 1)),
                }
            }
            NightActionKind::Protect | NightActionKind::Heal => {
                saved.insert(action.target);
            }
            NightActionKind::Poison => poisoned.push(action.target),
            NightActionKind::Inspect => {
                outcome.inspections.push((action.actor, action.target));
            }
            NightActionKind::Mark => {}
        }
    }

    let victim = tally
        .iter()
        .fold(None, |best: Option<(ConnectionId, usize)>, &(t, v)| {
            match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((t, v)),
            }
        })
        .map(|(target, _)| target);

    if let Some(victim) = victim {
        if !saved.contains(&victim) {
            outcome.eliminated.push(victim);
        }
    }
    for target in poisoned {
        if !outcome.eliminated.contains(&target) {
            outcome.eliminated.push(target);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn act(actor: u64, kind: NightActionKind, target: u64) -> NightAction {
        NightAction {
            actor: cid(actor),
            kind,
            target: cid(target),
        }
    }

    #[test]
    fn test_resolve_night_no_actions_no_deaths() {
        assert_eq!(resolve_night(&[]), NightOutcome::default());
    }

    #[test]
    fn test_resolve_night_majority_kill_wins() {
        let outcome = resolve_night(&[
            act(1, NightActionKind::Kill, 5),
            act(2, NightActionKind::Kill, 6),
            act(3, NightActionKind::Kill, 6),
        ]);
        assert_eq!(outcome.eliminated, vec![cid(6)]);
    }

    #[test]
    fn test_resolve_night_tie_goes_to_first_voted_target() {
        let outcome = resolve_night(&[
            act(1, NightActionKind::Kill, 5),
            act(2, NightActionKind::Kill, 6),
        ]);
        assert_eq!(outcome.eliminated, vec![cid(5)]);
    }

    #[test]
    fn test_resolve_night_protect_cancels_kill() {
        let outcome = resolve_night(&[
            act(1, NightActionKind::Kill, 5),
            act(7, NightActionKind::Protect, 5),
        ]);
        assert!(outcome.eliminated.is_empty());
    }

    #[test]
    fn test_resolve_night_heal_cancels_kill_but_not_poison() {
        let outcome = resolve_night(&[
            act(1, NightActionKind::Kill, 5),
            act(8, NightActionKind::Heal, 5),
            act(8, NightActionKind::Poison, 3),
        ]);
        assert_eq!(outcome.eliminated, vec![cid(3)]);
    }

    #[test]
    fn test_resolve_night_poisoning_the_victim_counts_once() {
        let outcome = resolve_night(&[
            act(1, NightActionKind::Kill, 5),
            act(8, NightActionKind::Poison, 5),
        ]);
        assert_eq!(outcome.eliminated, vec![cid(5)]);
    }

    #[test]
    fn test_resolve_night_collects_inspections_and_ignores_marks() {
        let outcome = resolve_night(&[
            act(4, NightActionKind::Inspect, 1),
            act(9, NightActionKind::Mark, 2),
        ]);
        assert_eq!(outcome.inspections, vec![(cid(4), cid(1))]);
        assert!(outcome.eliminated.is_empty());
    }
}
