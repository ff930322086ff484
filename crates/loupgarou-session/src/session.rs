//! One game instance: roster, phase, roles, and the night's actions.
//!
//! `Session` is plain data plus the state machine that guards it. It knows
//! nothing about locking or delivery: the registry serializes access and
//! the coordinator turns results into outbound events.

use loupgarou_protocol::{ConnectionId, SessionId};
use loupgarou_roles::{assign_roles, NightActionKind, Role, RoleCatalog};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::night::{resolve_night, NightAction};
use crate::{
    Participant, ParticipantView, Phase, RoleAssignment, SessionError,
    SessionSummary,
};

/// Trims a display name, rejecting it if nothing is left.
pub fn validate_name(name: &str) -> Result<String, SessionError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SessionError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// A participant who died during the night.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elimination {
    pub connection_id: ConnectionId,
    pub name: String,
}

/// A role the seer learned during the night.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revelation {
    pub seer: ConnectionId,
    pub target: ConnectionId,
    pub name: String,
    pub role: Role,
}

/// Everything that happened when a night ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightReport {
    pub eliminated: Vec<Elimination>,
    pub revelations: Vec<Revelation>,
}

/// A single game session.
///
/// Invariants held by every method:
/// - no two participants share a `connection_id`
/// - `roles_assigned` implies every participant has a role
/// - `phase` only moves along [`Phase::can_transition_to`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    session_id: SessionId,
    creator: ConnectionId,
    creator_name: String,
    /// Join order.
    participants: Vec<Participant>,
    phase: Phase,
    roles_assigned: bool,
    /// Nights started so far.
    round: u32,
    night_actions: Vec<NightAction>,
}

impl Session {
    /// Creates a session in Lobby with the creator as its only participant.
    pub fn new(
        session_id: SessionId,
        creator: ConnectionId,
        creator_name: String,
    ) -> Self {
        Self {
            session_id,
            creator,
            participants: vec![Participant::new(creator, creator_name.clone())],
            creator_name,
            phase: Phase::Lobby,
            roles_assigned: false,
            round: 0,
            night_actions: Vec::new(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn creator(&self) -> ConnectionId {
        self.creator
    }

    pub fn creator_name(&self) -> &str {
        &self.creator_name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn roles_assigned(&self) -> bool {
        self.roles_assigned
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn night_actions(&self) -> &[NightAction] {
        &self.night_actions
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    pub fn is_creator(&self, id: ConnectionId) -> bool {
        self.creator == id
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.participant(id).is_some()
    }

    pub fn participant(&self, id: ConnectionId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.connection_id == id)
    }

    /// Connection ids of every participant, in join order.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.participants.iter().map(|p| p.connection_id).collect()
    }

    /// Checks whether `id` could join right now, without changing anything.
    ///
    /// # Errors
    /// - [`SessionError::SessionNotFound`] — the session has ended
    /// - [`SessionError::AlreadyJoined`] — `id` is already on the roster
    /// - [`SessionError::InvalidPhase`] — roles were already dealt
    /// - [`SessionError::SessionFull`] — `max_players` reached
    pub fn check_join(
        &self,
        id: ConnectionId,
        max_players: usize,
    ) -> Result<(), SessionError> {
        if self.is_ended() {
            return Err(SessionError::SessionNotFound(self.session_id));
        }
        if self.contains(id) {
            return Err(SessionError::AlreadyJoined(id, self.session_id));
        }
        if !self.phase.is_joinable() {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        if self.participants.len() >= max_players {
            return Err(SessionError::SessionFull(self.session_id));
        }
        Ok(())
    }

    /// Appends a participant. Fails exactly when [`Session::check_join`]
    /// does.
    pub fn add_participant(
        &mut self,
        id: ConnectionId,
        name: String,
        max_players: usize,
    ) -> Result<(), SessionError> {
        self.check_join(id, max_players)?;
        self.participants.push(Participant::new(id, name));
        Ok(())
    }

    /// Removes a participant and any night action by or against them.
    ///
    /// Returns `None` if `id` was not on the roster.
    pub fn remove_participant(&mut self, id: ConnectionId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.connection_id == id)?;
        self.night_actions.retain(|a| !a.involves(id));
        Some(self.participants.remove(index))
    }

    /// Returns `true` if the roster has reached `min_players` and roles
    /// have never been dealt.
    pub fn ready_to_start(&self, min_players: usize) -> bool {
        self.phase == Phase::Lobby
            && !self.roles_assigned
            && self.participants.len() >= min_players
    }

    /// Deals roles in join order and starts the first night.
    ///
    /// One-shot: once roles are dealt this always fails, so a second
    /// threshold crossing can never re-deal.
    ///
    /// # Errors
    /// [`SessionError::InvalidPhase`] if roles were already dealt or the
    /// session is not in Lobby.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        catalog: &RoleCatalog,
        rng: &mut R,
    ) -> Result<Vec<RoleAssignment>, SessionError> {
        if self.roles_assigned || !self.phase.can_transition_to(Phase::Night) {
            return Err(SessionError::InvalidPhase(self.phase));
        }

        let roles = assign_roles(self.participants.len(), catalog, rng);
        for (participant, role) in self.participants.iter_mut().zip(roles) {
            participant.role = Some(role);
        }
        self.roles_assigned = true;
        self.phase = Phase::Night;
        self.round = 1;

        Ok(self.role_assignments())
    }

    /// Records a night action, replacing the actor's earlier action of the
    /// same kind this night.
    ///
    /// # Errors
    /// - [`SessionError::SessionNotFound`] — the session has ended
    /// - [`SessionError::InvalidPhase`] — not night
    /// - [`SessionError::Unauthorized`] — actor absent, dead, or their role
    ///   does not grant `kind`
    /// - [`SessionError::NoTarget`] / [`SessionError::TargetNotFound`]
    pub fn record_night_action(
        &mut self,
        actor: ConnectionId,
        kind: NightActionKind,
        target: Option<ConnectionId>,
    ) -> Result<(), SessionError> {
        if self.is_ended() {
            return Err(SessionError::SessionNotFound(self.session_id));
        }
        if self.phase != Phase::Night {
            return Err(SessionError::InvalidPhase(self.phase));
        }

        let acting = self.participant(actor).ok_or_else(|| {
            SessionError::Unauthorized(format!(
                "{actor} is not in session {}",
                self.session_id
            ))
        })?;
        if !acting.alive {
            return Err(SessionError::Unauthorized(
                "eliminated participants cannot act".into(),
            ));
        }
        match acting.role {
            Some(role) if role.grants(kind) => {}
            _ => {
                return Err(SessionError::Unauthorized(format!(
                    "your role cannot {kind}"
                )));
            }
        }

        let target = target.ok_or(SessionError::NoTarget)?;
        match self.participant(target) {
            Some(p) if p.alive => {}
            _ => return Err(SessionError::TargetNotFound(target)),
        }

        self.night_actions
            .retain(|a| !(a.actor == actor && a.kind == kind));
        self.night_actions.push(NightAction {
            actor,
            kind,
            target,
        });
        Ok(())
    }

    /// Resolves the night's actions exactly once and moves to Day.
    ///
    /// # Errors
    /// [`SessionError::InvalidPhase`] unless the session is in Night.
    pub fn end_night(&mut self) -> Result<NightReport, SessionError> {
        if self.phase != Phase::Night {
            return Err(SessionError::InvalidPhase(self.phase));
        }

        let actions = std::mem::take(&mut self.night_actions);
        let outcome = resolve_night(&actions);
        let mut report = NightReport::default();

        for id in outcome.eliminated {
            if let Some(p) = self
                .participants
                .iter_mut()
                .find(|p| p.connection_id == id && p.alive)
            {
                p.alive = false;
                report.eliminated.push(Elimination {
                    connection_id: id,
                    name: p.name.clone(),
                });
            }
        }

        for (seer, target) in outcome.inspections {
            if let Some(Participant {
                name,
                role: Some(role),
                ..
            }) = self.participant(target)
            {
                report.revelations.push(Revelation {
                    seer,
                    target,
                    name: name.clone(),
                    role: *role,
                });
            }
        }

        self.phase = Phase::Day;
        Ok(report)
    }

    /// Moves from Day to the next Night.
    ///
    /// # Errors
    /// [`SessionError::InvalidPhase`] unless the session is in Day.
    pub fn begin_night(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Day {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        self.phase = Phase::Night;
        self.round += 1;
        Ok(())
    }

    /// Moves to the terminal phase. Idempotent.
    pub fn end(&mut self) {
        self.phase = Phase::Ended;
        self.night_actions.clear();
    }

    /// The roster as `viewer` may see it: roles are only visible to the
    /// participant holding them and to the creator.
    pub fn roster_for(&self, viewer: ConnectionId) -> Vec<ParticipantView> {
        let sees_all = self.is_creator(viewer);
        self.participants
            .iter()
            .map(|p| ParticipantView {
                connection_id: p.connection_id,
                name: p.name.clone(),
                alive: p.alive,
                role: if sees_all || p.connection_id == viewer {
                    p.role
                } else {
                    None
                },
            })
            .collect()
    }

    /// The full role mapping, in join order.
    pub fn role_assignments(&self) -> Vec<RoleAssignment> {
        self.participants
            .iter()
            .filter_map(|p| {
                p.role.map(|role| RoleAssignment {
                    connection_id: p.connection_id,
                    name: p.name.clone(),
                    role,
                })
            })
            .collect()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            creator_name: self.creator_name.clone(),
            player_count: self.participants.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    /// A session with `n` participants (creator is `cid(1)`).
    fn session_with(n: u64) -> Session {
        let mut session = Session::new(SessionId(1), cid(1), "Alice".into());
        for i in 2..=n {
            session
                .add_participant(cid(i), format!("P{i}"), 64)
                .expect("join");
        }
        session
    }

    fn started(n: u64) -> Session {
        let mut session = session_with(n);
        session
            .start(&RoleCatalog::default(), &mut StdRng::seed_from_u64(5))
            .expect("start");
        session
    }

    fn holder(session: &Session, role: Role) -> ConnectionId {
        session
            .participants()
            .iter()
            .find(|p| p.role == Some(role))
            .map(|p| p.connection_id)
            .expect("role dealt")
    }

    // =====================================================================
    // validate_name() / new()
    // =====================================================================

    #[test]
    fn test_validate_name_trims_and_rejects_blank() {
        assert_eq!(validate_name("  Bob "), Ok("Bob".to_string()));
        assert_eq!(validate_name("   "), Err(SessionError::EmptyName));
        assert_eq!(validate_name(""), Err(SessionError::EmptyName));
    }

    #[test]
    fn test_new_session_has_creator_as_sole_participant() {
        let session = Session::new(SessionId(3), cid(9), "Alice".into());
        assert_eq!(session.phase(), Phase::Lobby);
        assert!(!session.roles_assigned());
        assert_eq!(session.connection_ids(), vec![cid(9)]);
        assert!(session.is_creator(cid(9)));
        assert_eq!(session.creator_name(), "Alice");
    }

    // =====================================================================
    // add_participant() / remove_participant()
    // =====================================================================

    #[test]
    fn test_add_participant_keeps_join_order() {
        let session = session_with(4);
        assert_eq!(
            session.connection_ids(),
            vec![cid(1), cid(2), cid(3), cid(4)]
        );
    }

    #[test]
    fn test_add_participant_duplicate_returns_already_joined() {
        let mut session = session_with(2);
        let result = session.add_participant(cid(2), "again".into(), 64);
        assert_eq!(result, Err(SessionError::AlreadyJoined(cid(2), SessionId(1))));
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_add_participant_allows_duplicate_display_names() {
        let mut session = session_with(1);
        session.add_participant(cid(2), "Alice".into(), 64).unwrap();
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_add_participant_full_returns_session_full() {
        let mut session = session_with(3);
        let result = session.add_participant(cid(4), "late".into(), 3);
        assert_eq!(result, Err(SessionError::SessionFull(SessionId(1))));
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_add_participant_after_start_returns_invalid_phase() {
        let mut session = started(9);
        let result = session.add_participant(cid(50), "late".into(), 64);
        assert_eq!(result, Err(SessionError::InvalidPhase(Phase::Night)));
    }

    #[test]
    fn test_add_participant_ended_returns_not_found() {
        let mut session = session_with(2);
        session.end();
        let result = session.add_participant(cid(3), "x".into(), 64);
        assert_eq!(result, Err(SessionError::SessionNotFound(SessionId(1))));
    }

    #[test]
    fn test_check_join_reports_without_mutating() {
        let session = session_with(3);
        assert_eq!(session.check_join(cid(4), 64), Ok(()));
        assert_eq!(
            session.check_join(cid(4), 3),
            Err(SessionError::SessionFull(SessionId(1)))
        );
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_remove_participant_twice_second_is_none() {
        let mut session = session_with(3);
        assert!(session.remove_participant(cid(2)).is_some());
        assert!(session.remove_participant(cid(2)).is_none());
        assert_eq!(session.connection_ids(), vec![cid(1), cid(3)]);
    }

    #[test]
    fn test_remove_participant_drops_actions_against_them() {
        let mut session = started(9);
        let wolf = holder(&session, Role::Werewolf);
        let seer = holder(&session, Role::Seer);
        session
            .record_night_action(wolf, NightActionKind::Kill, Some(seer))
            .unwrap();
        session
            .record_night_action(seer, NightActionKind::Inspect, Some(wolf))
            .unwrap();

        session.remove_participant(seer);

        assert!(session.night_actions().is_empty());
    }

    // =====================================================================
    // ready_to_start() / start()
    // =====================================================================

    #[test]
    fn test_ready_to_start_below_threshold_stays_in_lobby() {
        let session = session_with(3);
        assert!(!session.ready_to_start(9));
        assert_eq!(session.phase(), Phase::Lobby);
        assert!(!session.roles_assigned());
    }

    #[test]
    fn test_start_deals_every_participant_and_enters_night() {
        let session = started(9);

        assert!(session.roles_assigned());
        assert_eq!(session.phase(), Phase::Night);
        assert_eq!(session.round(), 1);
        assert!(session.participants().iter().all(|p| p.role.is_some()));
        let wolves = session
            .participants()
            .iter()
            .filter(|p| p.role == Some(Role::Werewolf))
            .count();
        assert_eq!(wolves, 2);
    }

    #[test]
    fn test_start_is_one_shot() {
        let mut session = started(9);
        let before = session.clone();

        let again =
            session.start(&RoleCatalog::default(), &mut StdRng::seed_from_u64(99));

        assert_eq!(again, Err(SessionError::InvalidPhase(Phase::Night)));
        assert_eq!(session, before, "a second deal must change nothing");
        assert!(!session.ready_to_start(1));
    }

    // =====================================================================
    // record_night_action()
    // =====================================================================

    #[test]
    fn test_record_night_action_outside_night_returns_invalid_phase() {
        let mut lobby = session_with(2);
        let result =
            lobby.record_night_action(cid(1), NightActionKind::Kill, Some(cid(2)));
        assert_eq!(result, Err(SessionError::InvalidPhase(Phase::Lobby)));
    }

    #[test]
    fn test_record_night_action_wrong_role_returns_unauthorized() {
        let mut session = started(9);
        let villager = holder(&session, Role::Villager);

        let result = session.record_night_action(
            villager,
            NightActionKind::Kill,
            Some(cid(1)),
        );

        assert!(matches!(result, Err(SessionError::Unauthorized(_))));
        assert!(session.night_actions().is_empty());
    }

    #[test]
    fn test_record_night_action_missing_target_returns_no_target() {
        let mut session = started(9);
        let wolf = holder(&session, Role::Werewolf);
        let result = session.record_night_action(wolf, NightActionKind::Kill, None);
        assert_eq!(result, Err(SessionError::NoTarget));
    }

    #[test]
    fn test_record_night_action_unknown_target_returns_target_not_found() {
        let mut session = started(9);
        let wolf = holder(&session, Role::Werewolf);
        let result =
            session.record_night_action(wolf, NightActionKind::Kill, Some(cid(77)));
        assert_eq!(result, Err(SessionError::TargetNotFound(cid(77))));
    }

    #[test]
    fn test_record_night_action_resubmission_replaces_previous() {
        let mut session = started(9);
        let wolf = holder(&session, Role::Werewolf);
        let seer = holder(&session, Role::Seer);
        let witch = holder(&session, Role::Witch);

        session
            .record_night_action(wolf, NightActionKind::Kill, Some(seer))
            .unwrap();
        session
            .record_night_action(wolf, NightActionKind::Kill, Some(witch))
            .unwrap();

        assert_eq!(session.night_actions().len(), 1);
        assert_eq!(session.night_actions()[0].target, witch);
    }

    // =====================================================================
    // end_night() / begin_night()
    // =====================================================================

    #[test]
    fn test_end_night_applies_kill_and_moves_to_day() {
        let mut session = started(9);
        let wolf = holder(&session, Role::Werewolf);
        let seer = holder(&session, Role::Seer);
        session
            .record_night_action(wolf, NightActionKind::Kill, Some(seer))
            .unwrap();

        let report = session.end_night().expect("night ends");

        assert_eq!(session.phase(), Phase::Day);
        assert_eq!(report.eliminated.len(), 1);
        assert_eq!(report.eliminated[0].connection_id, seer);
        assert!(!session.participant(seer).unwrap().alive);
        assert!(session.night_actions().is_empty());
    }

    #[test]
    fn test_end_night_applies_actions_exactly_once() {
        let mut session = started(9);
        let wolf = holder(&session, Role::Werewolf);
        let elder = holder(&session, Role::Elder);
        session
            .record_night_action(wolf, NightActionKind::Kill, Some(elder))
            .unwrap();
        session.end_night().unwrap();

        session.begin_night().unwrap();
        let second = session.end_night().unwrap();

        assert!(second.eliminated.is_empty());
        assert_eq!(session.round(), 2);
    }

    #[test]
    fn test_end_night_reveals_inspected_role_to_seer() {
        let mut session = started(9);
        let seer = holder(&session, Role::Seer);
        let wolf = holder(&session, Role::Werewolf);
        session
            .record_night_action(seer, NightActionKind::Inspect, Some(wolf))
            .unwrap();

        let report = session.end_night().unwrap();

        assert_eq!(report.revelations.len(), 1);
        assert_eq!(report.revelations[0].seer, seer);
        assert_eq!(report.revelations[0].role, Role::Werewolf);
    }

    #[test]
    fn test_end_night_in_day_returns_invalid_phase() {
        let mut session = started(9);
        session.end_night().unwrap();
        assert_eq!(session.end_night(), Err(SessionError::InvalidPhase(Phase::Day)));
    }

    #[test]
    fn test_eliminated_participant_cannot_act() {
        let mut session = started(9);
        let wolf = holder(&session, Role::Werewolf);
        let witch = holder(&session, Role::Witch);
        session
            .record_night_action(wolf, NightActionKind::Kill, Some(witch))
            .unwrap();
        session.end_night().unwrap();
        session.begin_night().unwrap();

        let result =
            session.record_night_action(witch, NightActionKind::Poison, Some(wolf));
        assert!(matches!(result, Err(SessionError::Unauthorized(_))));
    }

    // =====================================================================
    // roster_for()
    // =====================================================================

    #[test]
    fn test_roster_for_hides_other_roles_from_participants() {
        let session = started(9);
        let roster = session.roster_for(cid(2));

        for view in &roster {
            if view.connection_id == cid(2) {
                assert!(view.role.is_some(), "own role is visible");
            } else {
                assert!(view.role.is_none(), "other roles are hidden");
            }
        }
    }

    #[test]
    fn test_roster_for_creator_sees_every_role() {
        let session = started(9);
        assert!(session.roster_for(cid(1)).iter().all(|v| v.role.is_some()));
    }

    // =====================================================================
    // serde
    // =====================================================================

    #[test]
    fn test_session_serde_restores_identical_structure() {
        let mut session = started(9);
        let wolf = holder(&session, Role::Werewolf);
        session
            .record_night_action(wolf, NightActionKind::Kill, Some(cid(1)))
            .unwrap();

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, session);
    }
}
