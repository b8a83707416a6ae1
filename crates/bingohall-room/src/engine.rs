//! The game engine: room lifecycle, cards, marking and turns.

use std::sync::{Arc, Weak};

use bingohall_grid::{
    GridDims, MAX_PLAYERS, MIN_PLAYERS, grid_size_for_players, has_won,
    next_turn, suggest_board, validate_board,
};
use bingohall_protocol::{
    Player, PlayerSlot, Room, RoomCode, RoomEvent, RoomId, RoomStatus,
};
use bingohall_store::{
    NewPlayer, NewRoom, PlayerPatch, RoomPatch, Store, StoreError,
};
use bingohall_timer::{Clock, Scheduler, TokioScheduler};
use rand::Rng;
use tokio::sync::{broadcast, mpsc};

use crate::events::EventBus;
use crate::locks::RoomLocks;
use crate::{EngineConfig, EngineError};

/// Avatar given to players who don't pick one.
pub const DEFAULT_AVATAR: &str = "👤";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Payload of an armed turn timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTimeout {
    pub room_id: RoomId,
    /// The player whose turn the timer was armed for.
    pub slot: PlayerSlot,
    /// The deadline written to the room when the timer was armed.
    pub expires_at: u64,
}

/// A room together with one of its players, as returned by create and join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub room: Room,
    pub player: Player,
}

/// What a successful [`GameEngine::mark`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkOutcome {
    /// The number read from the caller's card.
    pub number: u32,
    /// Every `(slot, position)` crossed off by this call, in join order.
    pub crossed: Vec<(PlayerSlot, usize)>,
    /// Set when the call ended the game.
    pub winner: Option<PlayerSlot>,
    /// The room after the call.
    pub room: Room,
}

impl MarkOutcome {
    pub fn won(&self) -> bool {
        self.winner.is_some()
    }
}

/// What a fired turn timer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPass {
    /// The turn moved on and a new timer was armed.
    Advanced {
        from: PlayerSlot,
        to: PlayerSlot,
        expires_at: u64,
    },
    /// Something else already moved the game on. Nothing changed.
    Stale,
}

/// Result of [`GameEngine::exit_room`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The player left; the room lives on.
    Left(Room),
    /// The last player left and the room was deleted.
    RoomClosed,
}

// ---------------------------------------------------------------------------
// GameEngine
// ---------------------------------------------------------------------------

/// Owns the room state machine.
///
/// ```text
/// waiting ──(all cards in)──► playing ──(winner)──► finished
///    ▲                          │  ▲                   │
///    └──── rematch(reconfigure) ┘  └─── rematch ───────┘
/// ```
///
/// Every mutating call takes the room's lock for its whole duration, so
/// exactly one mark wins each turn and the playing transition fires once.
/// Turn timers are never cancelled: a newer deadline supersedes an older
/// one and [`handle_timeout`](Self::handle_timeout) ignores stale ones.
pub struct GameEngine<S, T = TokioScheduler<TurnTimeout>> {
    store: S,
    scheduler: T,
    clock: Clock,
    config: EngineConfig,
    locks: RoomLocks,
    events: EventBus,
}

impl<S: Store> GameEngine<S> {
    /// Creates an engine whose turn timers run on Tokio, plus the task
    /// that feeds fired timers back into it.
    ///
    /// The task holds only a weak reference and ends once the engine is
    /// dropped. Must be called inside a Tokio runtime.
    pub fn spawn(store: S, config: EngineConfig) -> Arc<Self> {
        let (scheduler, fired) = TokioScheduler::new();
        let engine = Arc::new(Self::new(store, scheduler, config, Clock::new()));
        tokio::spawn(run_auto_pass(Arc::downgrade(&engine), fired));
        engine
    }
}

async fn run_auto_pass<S: Store, T: Scheduler<TurnTimeout>>(
    engine: Weak<GameEngine<S, T>>,
    mut fired: mpsc::UnboundedReceiver<TurnTimeout>,
) {
    while let Some(timeout) = fired.recv().await {
        let Some(engine) = engine.upgrade() else {
            break;
        };
        if let Err(e) = engine.handle_timeout(timeout).await {
            tracing::warn!(
                room_id = %timeout.room_id,
                slot = %timeout.slot,
                error = %e,
                "auto-pass failed"
            );
        }
    }
    tracing::debug!("auto-pass task stopped");
}

impl<S: Store, T: Scheduler<TurnTimeout>> GameEngine<S, T> {
    /// Creates an engine with an explicit scheduler and clock.
    ///
    /// Whoever owns the scheduler's output must call
    /// [`handle_timeout`](Self::handle_timeout) for each fired payload.
    pub fn new(store: S, scheduler: T, config: EngineConfig, clock: Clock) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            store,
            scheduler,
            clock,
            config,
            locks: RoomLocks::default(),
            events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Opens a room with `max_players` seats (default 2) and seats the
    /// creator in slot 1.
    pub async fn create_room(
        &self,
        player_name: &str,
        player_avatar: Option<String>,
        max_players: Option<u8>,
    ) -> Result<Seat, EngineError> {
        let name = clean_name(player_name)?;
        let max_players = max_players.unwrap_or(MIN_PLAYERS);
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&max_players) {
            return Err(EngineError::InvalidRequest(format!(
                "max_players must be between {MIN_PLAYERS} and {MAX_PLAYERS}, got {max_players}"
            )));
        }

        let dims = grid_size_for_players(max_players);
        let now = self.clock.now_millis();
        let expires_at = now + self.config.room_ttl.as_millis() as u64;

        let mut room = None;
        for _ in 0..self.config.code_attempts {
            let new_room = NewRoom {
                code: random_code()?,
                status: RoomStatus::Waiting,
                max_players,
                player_count: 1,
                grid_size: dims.grid_size,
                total_numbers: dims.total_numbers,
                expires_at,
                created_at: now,
            };
            match self.store.insert_room(new_room).await {
                Ok(inserted) => {
                    room = Some(inserted);
                    break;
                }
                Err(StoreError::DuplicateRoomCode(code)) => {
                    tracing::debug!(%code, "room code taken, drawing another");
                }
                Err(e) => return Err(e.into()),
            }
        }
        let room = room
            .ok_or(EngineError::CodeGenerationFailed(self.config.code_attempts))?;

        let player = self
            .store
            .insert_player(NewPlayer {
                room_id: room.id,
                slot: PlayerSlot::FIRST,
                name,
                avatar: avatar_or_default(player_avatar),
            })
            .await?;

        tracing::info!(
            room_id = %room.id,
            code = %room.code,
            max_players,
            grid_size = room.grid_size,
            "room created"
        );
        Ok(Seat { room, player })
    }

    /// Seats a new player in the lowest free slot of a waiting room.
    ///
    /// A slot vacated by [`exit_room`](Self::exit_room) is handed out again,
    /// so slots stay within `1..=max_players` and `join_order` still equals
    /// the slot number. Without a departure this is `player_count + 1`.
    ///
    /// Joining never starts the game; the newcomer still has to submit a
    /// card.
    pub async fn join_room(
        &self,
        room_code: &str,
        player_name: &str,
        player_avatar: Option<String>,
    ) -> Result<Seat, EngineError> {
        let code = RoomCode::parse(room_code)?;
        let name = clean_name(player_name)?;
        let room_id = self
            .store
            .room_by_code(&code)
            .await?
            .ok_or(EngineError::RoomCodeNotFound(code))?
            .id;

        let _guard = self.locks.lock(room_id).await;
        let room = self.load_room(room_id).await?;
        if room.status != RoomStatus::Waiting {
            return Err(EngineError::GameAlreadyStarted(room_id));
        }
        let full = EngineError::RoomFull {
            room_id,
            max: room.max_players,
        };
        if room.is_full() {
            return Err(full);
        }

        let players = self.store.players_in_room(room_id).await?;
        let slot = (1..=room.max_players)
            .filter_map(PlayerSlot::new)
            .find(|slot| players.iter().all(|p| p.slot != *slot))
            .ok_or(full)?;

        let player = self
            .store
            .insert_player(NewPlayer {
                room_id,
                slot,
                name,
                avatar: avatar_or_default(player_avatar),
            })
            .await?;
        self.events
            .publish(RoomEvent::PlayerUpdated {
                player: player.clone(),
            })
            .await;

        let room = self
            .patch_room(
                room_id,
                RoomPatch {
                    player_count: Some(players.len() as u8 + 1),
                    ..RoomPatch::default()
                },
            )
            .await?;

        tracing::info!(
            %room_id,
            %slot,
            player_count = room.player_count,
            "player joined"
        );
        Ok(Seat { room, player })
    }

    /// Removes a player. The last one out deletes the room.
    ///
    /// If the leaver held the turn in a running game, the turn moves to
    /// the next occupied slot with a fresh timer.
    pub async fn exit_room(
        &self,
        room_id: RoomId,
        slot: PlayerSlot,
    ) -> Result<ExitOutcome, EngineError> {
        let _guard = self.locks.lock(room_id).await;
        let room = self.load_room(room_id).await?;
        let player = self.load_player(room_id, slot).await?;

        self.store.delete_player(player.id).await?;
        self.events
            .publish(RoomEvent::PlayerLeft { room_id, slot })
            .await;

        let remaining = self.sorted_players(room_id).await?;
        if remaining.is_empty() {
            self.store.delete_room(room_id).await?;
            self.events.publish(RoomEvent::RoomClosed { room_id }).await;
            self.events.close(room_id).await;
            self.locks.forget(room_id).await;
            tracing::info!(%room_id, %slot, "last player left, room closed");
            return Ok(ExitOutcome::RoomClosed);
        }

        let mut patch = RoomPatch {
            player_count: Some(remaining.len() as u8),
            ..RoomPatch::default()
        };
        let mut rearm = None;
        if room.status.is_active() && room.current_turn == Some(slot) {
            let next = next_occupied(slot, room.max_players, &remaining);
            let expires_at = self.turn_deadline();
            patch.current_turn = Some(Some(next));
            patch.turn_expires_at = Some(Some(expires_at));
            rearm = Some((next, expires_at));
        }

        let room = self.patch_room(room_id, patch).await?;
        if let Some((next, expires_at)) = rearm {
            self.arm_turn(room_id, next, expires_at);
            tracing::info!(%room_id, from = %slot, to = %next, "turn holder left, turn passed");
        }

        tracing::info!(
            %room_id,
            %slot,
            player_count = room.player_count,
            "player left"
        );
        Ok(ExitOutcome::Left(room))
    }

    // -----------------------------------------------------------------------
    // Game
    // -----------------------------------------------------------------------

    /// Stores a player's card, replacing any earlier one.
    ///
    /// When this completes the last missing card of a full room, the game
    /// starts: slot 1 gets the turn and the first timer is armed.
    pub async fn configure_board(
        &self,
        room_id: RoomId,
        slot: PlayerSlot,
        board: &[i64],
    ) -> Result<Room, EngineError> {
        let _guard = self.locks.lock(room_id).await;
        let room = self.load_room(room_id).await?;
        let board = validate_board(board, dims_of(&room))?;
        let player = self.load_player(room_id, slot).await?;
        if room.status != RoomStatus::Waiting {
            return Err(EngineError::BoardLocked(room.status));
        }

        self.patch_player(
            player.id,
            PlayerPatch {
                board: Some(board),
                ..PlayerPatch::default()
            },
        )
        .await?;
        tracing::info!(%room_id, %slot, "board configured");

        let players = self.store.players_in_room(room_id).await?;
        let ready = players.len() == room.max_players as usize
            && players.iter().all(|p| p.has_board(room.board_len()));
        if !ready {
            return Ok(room);
        }

        let expires_at = self.turn_deadline();
        let room = self
            .patch_room(
                room_id,
                RoomPatch {
                    status: Some(RoomStatus::Playing),
                    current_turn: Some(Some(PlayerSlot::FIRST)),
                    winner: Some(None),
                    turn_expires_at: Some(Some(expires_at)),
                    ..RoomPatch::default()
                },
            )
            .await?;
        self.arm_turn(room_id, PlayerSlot::FIRST, expires_at);

        tracing::info!(
            %room_id,
            players = players.len(),
            expires_at,
            "all boards in, game started"
        );
        Ok(room)
    }

    /// Announces the number at `position` on the caller's card and crosses
    /// it off every card that has it.
    ///
    /// Cards are processed in join order. The first player whose card
    /// reaches `grid_size` completed lines wins, and nobody after them is
    /// processed. Without a winner the turn moves on.
    pub async fn mark(
        &self,
        room_id: RoomId,
        slot: PlayerSlot,
        position: usize,
    ) -> Result<MarkOutcome, EngineError> {
        let _guard = self.locks.lock(room_id).await;
        let room = self.load_room(room_id).await?;
        if room.current_turn != Some(slot) {
            return Err(EngineError::WrongTurn {
                expected: room.current_turn,
                actual: slot,
            });
        }
        if !room.status.is_active() {
            return Err(EngineError::GameNotActive(room.status));
        }

        let caller = self.load_player(room_id, slot).await?;
        if caller.is_marked(position) {
            return Err(EngineError::AlreadyMarked(position));
        }
        let number = *caller.board.get(position).ok_or(
            EngineError::InvalidPosition {
                position,
                len: caller.board.len(),
            },
        )?;

        let players = self.sorted_players(room_id).await?;
        let mut crossed = Vec::new();
        let mut winner = None;
        for player in &players {
            let Some(at) = player.position_of(number) else {
                continue;
            };
            if player.is_marked(at) {
                continue;
            }
            let mut marked = player.marked_positions.clone();
            marked.insert(at);
            let updated = self
                .patch_player(
                    player.id,
                    PlayerPatch {
                        marked_positions: Some(marked),
                        ..PlayerPatch::default()
                    },
                )
                .await?;
            crossed.push((player.slot, at));

            if has_won(&updated.marked_positions, room.grid_size) {
                winner = Some(player.slot);
                break;
            }
        }

        tracing::debug!(
            %room_id,
            %slot,
            position,
            number,
            crossed = crossed.len(),
            "number announced"
        );

        let room = match winner {
            Some(won_by) => {
                let room = self
                    .patch_room(
                        room_id,
                        RoomPatch {
                            status: Some(RoomStatus::Finished),
                            winner: Some(Some(won_by)),
                            current_turn: Some(None),
                            turn_expires_at: Some(None),
                            ..RoomPatch::default()
                        },
                    )
                    .await?;
                tracing::info!(%room_id, winner = %won_by, number, "winner found");
                room
            }
            None => {
                let next = next_occupied(slot, room.max_players, &players);
                let expires_at = self.turn_deadline();
                let room = self
                    .patch_room(
                        room_id,
                        RoomPatch {
                            current_turn: Some(Some(next)),
                            turn_expires_at: Some(Some(expires_at)),
                            ..RoomPatch::default()
                        },
                    )
                    .await?;
                self.arm_turn(room_id, next, expires_at);
                room
            }
        };

        Ok(MarkOutcome {
            number,
            crossed,
            winner,
            room,
        })
    }

    /// Starts another game with the same players.
    ///
    /// Marks are always cleared. With `reconfigure_board` the cards are
    /// cleared too and the room goes back to waiting; otherwise play
    /// resumes at once from the first seat.
    pub async fn rematch(
        &self,
        room_id: RoomId,
        reconfigure_board: bool,
    ) -> Result<Room, EngineError> {
        let _guard = self.locks.lock(room_id).await;
        let room = self.load_room(room_id).await?;
        // Only a started game can be reset to configuration.
        if !room.status.can_transition_to(RoomStatus::Waiting) {
            return Err(EngineError::GameNotActive(room.status));
        }

        let players = self.sorted_players(room_id).await?;
        for player in &players {
            self.patch_player(
                player.id,
                PlayerPatch {
                    board: reconfigure_board.then(Vec::new),
                    marked_positions: Some(Default::default()),
                },
            )
            .await?;
        }

        let room = if reconfigure_board {
            self.patch_room(
                room_id,
                RoomPatch {
                    status: Some(RoomStatus::Waiting),
                    current_turn: Some(None),
                    winner: Some(None),
                    turn_expires_at: Some(None),
                    ..RoomPatch::default()
                },
            )
            .await?
        } else {
            let first = players.first().map_or(PlayerSlot::FIRST, |p| p.slot);
            let expires_at = self.turn_deadline();
            let room = self
                .patch_room(
                    room_id,
                    RoomPatch {
                        status: Some(RoomStatus::Playing),
                        current_turn: Some(Some(first)),
                        winner: Some(None),
                        turn_expires_at: Some(Some(expires_at)),
                        ..RoomPatch::default()
                    },
                )
                .await?;
            self.arm_turn(room_id, first, expires_at);
            room
        };

        tracing::info!(%room_id, reconfigure_board, status = %room.status, "rematch");
        Ok(room)
    }

    /// Acts on a fired turn timer.
    ///
    /// The turn is passed only if the room is still playing, the timer's
    /// player still holds the turn, the stored deadline is the one this
    /// timer was armed with and it is not later than now plus the
    /// configured tolerance. Anything else means a mark or a newer timer
    /// got there first, and the call changes nothing.
    pub async fn handle_timeout(
        &self,
        timeout: TurnTimeout,
    ) -> Result<AutoPass, EngineError> {
        let room_id = timeout.room_id;
        let _guard = self.locks.lock(room_id).await;
        let Some(room) = self.store.room(room_id).await? else {
            tracing::debug!(%room_id, "turn timer fired for a deleted room");
            return Ok(AutoPass::Stale);
        };

        let horizon = self.clock.now_millis()
            + self.config.expiry_tolerance.as_millis() as u64;
        let current = room.status.is_active()
            && room.current_turn == Some(timeout.slot)
            && room.turn_expires_at == Some(timeout.expires_at)
            && timeout.expires_at <= horizon;
        if !current {
            tracing::debug!(
                %room_id,
                slot = %timeout.slot,
                status = %room.status,
                "stale turn timer ignored"
            );
            return Ok(AutoPass::Stale);
        }

        let players = self.sorted_players(room_id).await?;
        let next = next_occupied(timeout.slot, room.max_players, &players);
        let expires_at = self.turn_deadline();
        self.patch_room(
            room_id,
            RoomPatch {
                current_turn: Some(Some(next)),
                turn_expires_at: Some(Some(expires_at)),
                ..RoomPatch::default()
            },
        )
        .await?;
        self.arm_turn(room_id, next, expires_at);
        self.events
            .publish(RoomEvent::TurnTimedOut {
                room_id,
                from: timeout.slot,
                to: next,
            })
            .await;

        tracing::info!(%room_id, from = %timeout.slot, to = %next, "turn timed out, auto-passed");
        Ok(AutoPass::Advanced {
            from: timeout.slot,
            to: next,
            expires_at,
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn room(&self, room_id: RoomId) -> Result<Room, EngineError> {
        self.load_room(room_id).await
    }

    /// Looks a room up by its share code (case-insensitive).
    pub async fn room_by_code(&self, room_code: &str) -> Result<Room, EngineError> {
        let code = RoomCode::parse(room_code)?;
        self.store
            .room_by_code(&code)
            .await?
            .ok_or(EngineError::RoomCodeNotFound(code))
    }

    /// A room's players in join order.
    pub async fn players_by_room(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<Player>, EngineError> {
        self.load_room(room_id).await?;
        self.sorted_players(room_id).await
    }

    /// A random card that fits the room's grid.
    pub async fn suggest_board(&self, room_id: RoomId) -> Result<Vec<u32>, EngineError> {
        let room = self.load_room(room_id).await?;
        Ok(suggest_board(dims_of(&room), &mut rand::rng()))
    }

    /// Live updates for one room.
    pub async fn subscribe(
        &self,
        room_id: RoomId,
    ) -> Result<broadcast::Receiver<RoomEvent>, EngineError> {
        self.load_room(room_id).await?;
        Ok(self.events.subscribe(room_id).await)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn load_room(&self, room_id: RoomId) -> Result<Room, EngineError> {
        self.store
            .room(room_id)
            .await?
            .ok_or(EngineError::RoomNotFound(room_id))
    }

    async fn load_player(
        &self,
        room_id: RoomId,
        slot: PlayerSlot,
    ) -> Result<Player, EngineError> {
        self.store
            .player(room_id, slot)
            .await?
            .ok_or(EngineError::PlayerNotFound(room_id, slot))
    }

    async fn sorted_players(&self, room_id: RoomId) -> Result<Vec<Player>, EngineError> {
        let mut players = self.store.players_in_room(room_id).await?;
        players.sort_by_key(|p| p.join_order);
        Ok(players)
    }

    async fn patch_room(
        &self,
        room_id: RoomId,
        patch: RoomPatch,
    ) -> Result<Room, EngineError> {
        let room = self.store.patch_room(room_id, patch).await?;
        self.events
            .publish(RoomEvent::RoomUpdated { room: room.clone() })
            .await;
        Ok(room)
    }

    async fn patch_player(
        &self,
        player_id: bingohall_protocol::PlayerId,
        patch: PlayerPatch,
    ) -> Result<Player, EngineError> {
        let player = self.store.patch_player(player_id, patch).await?;
        self.events
            .publish(RoomEvent::PlayerUpdated {
                player: player.clone(),
            })
            .await;
        Ok(player)
    }

    fn turn_deadline(&self) -> u64 {
        self.clock.deadline_after(self.config.turn_duration)
    }

    fn arm_turn(&self, room_id: RoomId, slot: PlayerSlot, expires_at: u64) {
        self.scheduler.schedule(
            self.config.turn_duration,
            TurnTimeout {
                room_id,
                slot,
                expires_at,
            },
        );
        tracing::trace!(%room_id, %slot, expires_at, "turn timer armed");
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

fn dims_of(room: &Room) -> GridDims {
    GridDims {
        grid_size: room.grid_size,
        total_numbers: room.total_numbers,
    }
}

/// The next slot after `current` that somebody sits in. Vacant slots only
/// exist after an exit; in a full room this is plain [`next_turn`].
fn next_occupied(current: PlayerSlot, seats: u8, players: &[Player]) -> PlayerSlot {
    let mut slot = current;
    for _ in 0..seats {
        slot = next_turn(slot, seats);
        if players.iter().any(|p| p.slot == slot) {
            return slot;
        }
    }
    current
}

fn clean_name(raw: &str) -> Result<String, EngineError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(EngineError::InvalidRequest(
            "player name must not be empty".into(),
        ));
    }
    Ok(name.to_string())
}

fn avatar_or_default(avatar: Option<String>) -> String {
    avatar
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_AVATAR.to_string())
}

fn random_code() -> Result<RoomCode, EngineError> {
    let mut rng = rand::rng();
    let raw: String = (0..RoomCode::LEN)
        .map(|_| {
            let i = rng.random_range(0..RoomCode::ALPHABET.len());
            char::from(RoomCode::ALPHABET[i])
        })
        .collect();
    Ok(RoomCode::parse(&raw)?)
}
