//! The session coordinator.
//!
//! Every inbound request lands here. Each operation:
//!
//! 1. validates its input (before touching any session)
//! 2. runs its read-then-write work under the target session's lock
//! 3. publishes the resulting [`Outbound`] events to the [`EventSink`]
//!    before that lock is released
//!
//! Nothing here sends anything. Delivery belongs to whoever implements the
//! sink.
//!
//! # Locking
//!
//! The availability list (`AvailabilityChanged`) locks every session in
//! turn, so it is always computed after the operation's own session guard
//! has been dropped. Snapshots are taken and published under a single
//! `availability` lock, which is never acquired while a session is held.
//! Address discovery runs before any lock is taken.

use std::collections::HashSet;
use std::sync::{Mutex as StdMutex, PoisonError};

use loupgarou_protocol::{Audience, ConnectionId, SessionId};
use loupgarou_roles::NightActionKind;
use loupgarou_session::{
    validate_name, GameConfig, Phase, RoleAssignment, Session, SessionError,
    SessionRegistry, SessionSummary,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;

use crate::address::{AddressResolver, NoDiscovery};
use crate::events::{
    availability_event, deleted_event, phase_event, roster_events, start_events,
    Outbound, ServerEvent,
};
use crate::sink::EventSink;

/// Reply value for a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCreated {
    pub session_id: SessionId,
    pub public_address: Option<String>,
}

/// Owns the session registry and runs every game operation against it.
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct Coordinator<S: EventSink, A: AddressResolver = NoDiscovery> {
    registry: SessionRegistry,
    config: GameConfig,
    /// Only locked inside synchronous helpers, never across an await.
    rng: StdMutex<StdRng>,
    resolver: A,
    sink: S,
    availability: Mutex<()>,
}

impl<S: EventSink> Coordinator<S> {
    /// Creates a coordinator without address discovery.
    pub fn new(config: GameConfig, sink: S) -> Self {
        Self {
            registry: SessionRegistry::new(),
            config: config.validated(),
            rng: StdMutex::new(StdRng::from_os_rng()),
            resolver: NoDiscovery,
            sink,
            availability: Mutex::new(()),
        }
    }
}

impl<S: EventSink, A: AddressResolver> Coordinator<S, A> {
    /// Sets how a new session's public address is discovered.
    pub fn with_resolver<R: AddressResolver>(self, resolver: R) -> Coordinator<S, R> {
        Coordinator {
            registry: self.registry,
            config: self.config,
            rng: self.rng,
            resolver,
            sink: self.sink,
            availability: self.availability,
        }
    }

    /// Replaces the dealing RNG. Use a seeded one for reproducible deals.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = StdMutex::new(rng);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Greets a connection the sink has just started tracking with its id
    /// and the sessions open right now.
    ///
    /// Taken under the availability lock, so no later availability
    /// snapshot can be overtaken by this one.
    pub async fn welcome(&self, id: ConnectionId) {
        let _order = self.availability.lock().await;
        let sessions = self.registry.joinable().await;
        self.publish(vec![Outbound::to(
            id,
            ServerEvent::Welcome {
                connection_id: id,
                sessions,
            },
        )])
        .await;
    }

    /// Creates a session with `creator` as its first participant.
    ///
    /// # Errors
    /// - [`SessionError::EmptyName`]
    /// - [`SessionError::DuplicateCreation`] if `creator` already belongs
    ///   to a live session
    pub async fn create_session(
        &self,
        creator: ConnectionId,
        name: &str,
    ) -> Result<SessionCreated, SessionError> {
        let name = validate_name(name)?;
        if let Some(existing) = self.registry.membership(creator).await {
            return Err(SessionError::DuplicateCreation(creator, existing));
        }

        let public_address = match self.resolver.public_address().await {
            Ok(address) => address,
            Err(e) => {
                tracing::warn!(%creator, error = %e, "address discovery failed");
                None
            }
        };

        let session_id = self.registry.allocate_id();
        self.registry
            .claim(creator, session_id)
            .await
            .map_err(|existing| SessionError::DuplicateCreation(creator, existing))?;

        {
            let mut session = self
                .registry
                .insert(Session::new(session_id, creator, name))
                .await;
            let mut events = vec![Outbound::to(
                creator,
                ServerEvent::SessionCreated {
                    session_id,
                    public_address: public_address.clone(),
                },
            )];
            events.extend(roster_events(&session));
            // Only reachable with min_players = 1.
            if session.ready_to_start(self.config.min_players) {
                let assignments = self.deal(&mut session)?;
                events.extend(start_events(&session, assignments));
            }
            self.publish(events).await;
        }
        self.publish_availability().await;

        tracing::info!(%session_id, %creator, "session created");

        Ok(SessionCreated {
            session_id,
            public_address,
        })
    }

    /// Adds `id` to a session. Deals roles and starts the first night if
    /// this join reaches `min_players`.
    ///
    /// # Errors
    /// - [`SessionError::EmptyName`]
    /// - [`SessionError::SessionNotFound`]
    /// - [`SessionError::AlreadyJoined`] if `id` is already in this session
    /// - [`SessionError::AlreadyInSession`] if `id` is in another session
    /// - [`SessionError::InvalidPhase`] once roles are dealt
    /// - [`SessionError::SessionFull`]
    pub async fn join_session(
        &self,
        session_id: SessionId,
        id: ConnectionId,
        name: &str,
    ) -> Result<(), SessionError> {
        let name = validate_name(name)?;
        let handle = self
            .registry
            .get(session_id)
            .await
            .ok_or(SessionError::SessionNotFound(session_id))?;

        {
            let mut session = handle.lock().await;
            session.check_join(id, self.config.max_players)?;

            self.registry
                .claim(id, session_id)
                .await
                .map_err(|existing| SessionError::AlreadyInSession(id, existing))?;

            if let Err(e) = session.add_participant(id, name, self.config.max_players) {
                self.registry.release(id).await;
                return Err(e);
            }

            tracing::info!(
                %session_id,
                connection_id = %id,
                players = session.len(),
                "participant joined"
            );

            let mut events = vec![Outbound::to(id, ServerEvent::SessionJoined { session_id })];
            if session.ready_to_start(self.config.min_players) {
                let assignments = self.deal(&mut session)?;
                events.extend(start_events(&session, assignments));
            } else {
                events.extend(roster_events(&session));
            }
            self.publish(events).await;
        }
        self.publish_availability().await;

        Ok(())
    }

    /// Ends and removes a session. Creator only.
    ///
    /// # Errors
    /// - [`SessionError::SessionNotFound`]
    /// - [`SessionError::Unauthorized`] if `requester` is not the creator
    pub async fn delete_session(
        &self,
        session_id: SessionId,
        requester: ConnectionId,
    ) -> Result<(), SessionError> {
        let handle = self
            .registry
            .get(session_id)
            .await
            .ok_or(SessionError::SessionNotFound(session_id))?;

        {
            let mut session = handle.lock().await;
            if session.is_ended() {
                return Err(SessionError::SessionNotFound(session_id));
            }
            if !session.is_creator(requester) {
                return Err(SessionError::Unauthorized(
                    "only the creator can delete a session".into(),
                ));
            }
            self.destroy(&mut session).await;
            self.publish(vec![deleted_event(session_id)]).await;
        }

        tracing::info!(%session_id, %requester, "session deleted");
        self.publish_availability().await;
        Ok(())
    }

    /// Removes `id` from whatever session it belongs to.
    ///
    /// If `id` was the creator, or the session is now empty, the session
    /// ends. Otherwise the remaining participants get a new roster.
    ///
    /// Idempotent: returns `true` only for the call that actually removed
    /// the connection. Repeats publish nothing.
    pub async fn leave_or_disconnect(&self, id: ConnectionId) -> bool {
        let Some(session_id) = self.registry.release(id).await else {
            return false;
        };
        let Some(handle) = self.registry.get(session_id).await else {
            return false;
        };

        let refresh = {
            let mut session = handle.lock().await;
            if session.is_ended() || session.remove_participant(id).is_none() {
                return false;
            }

            tracing::info!(
                %session_id,
                connection_id = %id,
                players = session.len(),
                "participant left"
            );

            if session.is_creator(id) || session.is_empty() {
                self.destroy(&mut session).await;
                self.publish(vec![deleted_event(session_id)]).await;
                tracing::info!(%session_id, "session ended");
                true
            } else {
                self.publish(roster_events(&session)).await;
                session.phase() == Phase::Lobby
            }
        };

        if refresh {
            self.publish_availability().await;
        }
        true
    }

    // ---------------------------------------------------------------
    // Play
    // ---------------------------------------------------------------

    /// Records a night action for `actor`.
    ///
    /// # Errors
    /// - [`SessionError::SessionNotFound`]
    /// - [`SessionError::InvalidPhase`] outside Night
    /// - [`SessionError::Unauthorized`] if the actor's role does not grant
    ///   `kind` or the actor is dead
    /// - [`SessionError::NoTarget`] / [`SessionError::TargetNotFound`]
    pub async fn submit_night_action(
        &self,
        session_id: SessionId,
        actor: ConnectionId,
        kind: NightActionKind,
        target: Option<ConnectionId>,
    ) -> Result<(), SessionError> {
        let handle = self
            .registry
            .get(session_id)
            .await
            .ok_or(SessionError::SessionNotFound(session_id))?;

        let mut session = handle.lock().await;
        session.record_night_action(actor, kind, target)?;
        tracing::debug!(%session_id, %actor, action = %kind, "night action recorded");

        if let Some(target) = target {
            self.publish(vec![Outbound::to(
                actor,
                ServerEvent::NightActionRecorded {
                    session_id,
                    action: kind,
                    target,
                },
            )])
            .await;
        }
        Ok(())
    }

    /// Moves a running session to its next phase. Creator only.
    ///
    /// Night → Day resolves the night: eliminations go to every
    /// participant, inspections only to the seer who made them.
    /// Day → Night starts the next round.
    ///
    /// # Errors
    /// - [`SessionError::SessionNotFound`]
    /// - [`SessionError::Unauthorized`] if `requester` is not the creator
    /// - [`SessionError::InvalidPhase`] in Lobby
    pub async fn advance_phase(
        &self,
        session_id: SessionId,
        requester: ConnectionId,
    ) -> Result<Phase, SessionError> {
        let handle = self
            .registry
            .get(session_id)
            .await
            .ok_or(SessionError::SessionNotFound(session_id))?;

        let mut session = handle.lock().await;
        if session.is_ended() {
            return Err(SessionError::SessionNotFound(session_id));
        }
        if !session.is_creator(requester) {
            return Err(SessionError::Unauthorized(
                "only the creator can advance the phase".into(),
            ));
        }

        let mut events = Vec::new();
        match session.phase() {
            Phase::Night => {
                let report = session.end_night()?;
                let everyone = session.connection_ids();
                for revelation in report.revelations {
                    events.push(Outbound::to(
                        revelation.seer,
                        ServerEvent::RoleRevealed {
                            session_id,
                            connection_id: revelation.target,
                            name: revelation.name,
                            role: revelation.role,
                        },
                    ));
                }
                let died = !report.eliminated.is_empty();
                for elimination in report.eliminated {
                    tracing::info!(
                        %session_id,
                        connection_id = %elimination.connection_id,
                        "participant eliminated"
                    );
                    events.push(Outbound::to_all(
                        everyone.clone(),
                        ServerEvent::Eliminated {
                            session_id,
                            connection_id: elimination.connection_id,
                            name: elimination.name,
                        },
                    ));
                }
                if died {
                    events.extend(roster_events(&session));
                }
            }
            Phase::Day => session.begin_night()?,
            phase => return Err(SessionError::InvalidPhase(phase)),
        }

        events.push(phase_event(&session));
        tracing::info!(
            %session_id,
            phase = %session.phase(),
            round = session.round(),
            "phase advanced"
        );
        self.publish(events).await;

        Ok(session.phase())
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Sessions still in Lobby, oldest first.
    pub async fn available_sessions(&self) -> Vec<SessionSummary> {
        self.registry.joinable().await
    }

    /// A copy of a live session's full state.
    pub async fn session_snapshot(&self, session_id: SessionId) -> Option<Session> {
        let handle = self.registry.get(session_id).await?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Whether `id` belongs to a live session.
    pub async fn is_in_session(&self, id: ConnectionId) -> bool {
        self.registry.membership(id).await.is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.registry.len().await
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    /// Hands a batch to the sink, resolving membership if any event goes
    /// to connections outside a session.
    async fn publish(&self, events: Vec<Outbound>) {
        if events.is_empty() {
            return;
        }
        let members = if events.iter().any(|o| o.audience == Audience::Unjoined) {
            self.registry.members().await
        } else {
            HashSet::new()
        };
        self.sink.publish(events, &members);
    }

    /// Publishes the current availability list. Never called with a
    /// session guard held.
    async fn publish_availability(&self) {
        let _order = self.availability.lock().await;
        let sessions = self.registry.joinable().await;
        self.publish(vec![availability_event(sessions)]).await;
    }

    /// Deals roles under the caller's session guard.
    fn deal(&self, session: &mut Session) -> Result<Vec<RoleAssignment>, SessionError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let assignments = session.start(&self.config.catalog, &mut *rng)?;
        tracing::info!(
            session_id = %session.session_id(),
            players = assignments.len(),
            "roles assigned, first night begins"
        );
        Ok(assignments)
    }

    /// Ends a session, unregisters it, and frees its members. The caller
    /// holds the session guard.
    async fn destroy(&self, session: &mut Session) {
        let session_id = session.session_id();
        let members = session.connection_ids();
        session.end();
        self.registry.remove(session_id).await;
        self.registry.release_all(&members, session_id).await;
    }
}
