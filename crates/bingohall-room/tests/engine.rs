//! Integration tests for the game engine.
//!
//! Most tests use a `ManualScheduler` so turn timers are delivered by
//! hand; the auto-pass tests use the real Tokio scheduler under paused
//! time.

use std::sync::Arc;
use std::time::Duration;

use bingohall_protocol::{ErrorKind, PlayerSlot, Room, RoomEvent, RoomId, RoomStatus};
use bingohall_room::{
    AutoPass, DEFAULT_AVATAR, EngineConfig, EngineError, ExitOutcome, GameEngine,
    TurnTimeout,
};
use bingohall_store::MemoryStore;
use bingohall_timer::{Clock, ManualScheduler};

// =========================================================================
// Helpers
// =========================================================================

type ManualEngine = GameEngine<MemoryStore, ManualScheduler<TurnTimeout>>;

const START: u64 = 1_000_000;

fn manual_engine() -> ManualEngine {
    GameEngine::new(
        MemoryStore::new(),
        ManualScheduler::new(),
        EngineConfig::default(),
        Clock::starting_at(START),
    )
}

fn slot(n: u8) -> PlayerSlot {
    PlayerSlot::new(n).unwrap()
}

fn identity_card(cells: i64) -> Vec<i64> {
    (1..=cells).collect()
}

fn reversed_card(cells: i64) -> Vec<i64> {
    (1..=cells).rev().collect()
}

/// Creates a room with `seats` seats and fills every one of them.
async fn full_room<T>(engine: &GameEngine<MemoryStore, T>, seats: u8) -> Room
where
    T: bingohall_timer::Scheduler<TurnTimeout>,
{
    let created = engine.create_room("p1", None, Some(seats)).await.unwrap();
    let mut room = created.room;
    for n in 2..=seats {
        room = engine
            .join_room(room.code.as_str(), &format!("p{n}"), None)
            .await
            .unwrap()
            .room;
    }
    room
}

/// A full two-seat room with both cards in, so the game is running.
async fn playing_room<T>(
    engine: &GameEngine<MemoryStore, T>,
    card1: Vec<i64>,
    card2: Vec<i64>,
) -> Room
where
    T: bingohall_timer::Scheduler<TurnTimeout>,
{
    let room = full_room(engine, 2).await;
    engine.configure_board(room.id, slot(1), &card1).await.unwrap();
    engine.configure_board(room.id, slot(2), &card2).await.unwrap()
}

fn kind(err: EngineError) -> ErrorKind {
    err.kind()
}

// =========================================================================
// Create / join
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_create_room_defaults() {
    let engine = manual_engine();
    let seat = engine.create_room("  Ada  ", None, None).await.unwrap();

    assert_eq!(seat.room.status, RoomStatus::Waiting);
    assert_eq!(seat.room.max_players, 2);
    assert_eq!(seat.room.player_count, 1);
    assert_eq!(seat.room.grid_size, 5);
    assert_eq!(seat.room.total_numbers, 25);
    assert_eq!(seat.room.current_turn, None);
    assert_eq!(seat.room.created_at, START);
    assert_eq!(seat.room.expires_at, START + 24 * 60 * 60 * 1000);
    assert_eq!(seat.room.code.as_str().len(), 6);

    assert_eq!(seat.player.slot, PlayerSlot::FIRST);
    assert_eq!(seat.player.join_order, 1);
    assert_eq!(seat.player.name, "Ada");
    assert_eq!(seat.player.avatar, DEFAULT_AVATAR);
    assert!(seat.player.board.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_create_room_grid_follows_seats() {
    let engine = manual_engine();
    let seat = engine.create_room("Ada", Some("🐱".into()), Some(6)).await.unwrap();
    assert_eq!(seat.room.grid_size, 9);
    assert_eq!(seat.room.total_numbers, 81);
    assert_eq!(seat.player.avatar, "🐱");
}

#[tokio::test(start_paused = true)]
async fn test_create_room_rejects_bad_input() {
    let engine = manual_engine();
    for (name, seats) in [("", None), ("   ", None), ("Ada", Some(1)), ("Ada", Some(7))] {
        let err = engine.create_room(name, None, seats).await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::InvalidRequest);
    }
    assert_eq!(engine.store().room_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_join_takes_next_slot() {
    let engine = manual_engine();
    let created = engine.create_room("Ada", None, Some(3)).await.unwrap();

    let lower = created.room.code.as_str().to_lowercase();
    let joined = engine.join_room(&lower, "Bob", None).await.unwrap();
    assert_eq!(joined.player.slot, slot(2));
    assert_eq!(joined.player.join_order, 2);
    assert_eq!(joined.room.player_count, 2);
    // Joining never starts the game.
    assert_eq!(joined.room.status, RoomStatus::Waiting);
}

#[tokio::test(start_paused = true)]
async fn test_join_full_room_fails() {
    let engine = manual_engine();
    let room = full_room(&engine, 2).await;
    let err = engine.join_room(room.code.as_str(), "Cy", None).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::RoomFull);
}

#[tokio::test(start_paused = true)]
async fn test_join_unknown_or_malformed_code() {
    let engine = manual_engine();
    let err = engine.join_room("ZZZZZZ", "Bob", None).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::NotFound);

    let err = engine.join_room("ab", "Bob", None).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::InvalidRequest);
}

#[tokio::test(start_paused = true)]
async fn test_join_started_game_fails() {
    let engine = manual_engine();
    let created = engine.create_room("Ada", None, Some(3)).await.unwrap();
    let code = created.room.code.clone();
    engine.join_room(code.as_str(), "Bob", None).await.unwrap();
    engine.join_room(code.as_str(), "Cy", None).await.unwrap();
    for n in 1..=3 {
        engine
            .configure_board(created.room.id, slot(n), &identity_card(36))
            .await
            .unwrap();
    }

    // Someone leaves mid-game; the seat is free but the game is running.
    engine.exit_room(created.room.id, slot(3)).await.unwrap();
    let err = engine.join_room(code.as_str(), "Dee", None).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::GameAlreadyStarted);
}

// =========================================================================
// configure_board
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_game_starts_when_last_card_arrives() {
    let engine = manual_engine();
    let room = full_room(&engine, 2).await;

    let after_first = engine
        .configure_board(room.id, slot(1), &identity_card(25))
        .await
        .unwrap();
    assert_eq!(after_first.status, RoomStatus::Waiting);
    assert!(engine.scheduler().is_empty());

    let after_second = engine
        .configure_board(room.id, slot(2), &reversed_card(25))
        .await
        .unwrap();
    assert_eq!(after_second.status, RoomStatus::Playing);
    assert_eq!(after_second.current_turn, Some(PlayerSlot::FIRST));
    assert_eq!(after_second.winner, None);
    assert_eq!(after_second.turn_expires_at, Some(START + 60_000));

    let armed = engine.scheduler().take();
    assert_eq!(armed.len(), 1);
    assert_eq!(armed[0].delay, Duration::from_secs(60));
    assert_eq!(
        armed[0].payload,
        TurnTimeout {
            room_id: room.id,
            slot: PlayerSlot::FIRST,
            expires_at: START + 60_000,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_configuration_order_does_not_matter() {
    let engine = manual_engine();
    let room = full_room(&engine, 2).await;
    engine
        .configure_board(room.id, slot(2), &identity_card(25))
        .await
        .unwrap();
    let room = engine
        .configure_board(room.id, slot(1), &identity_card(25))
        .await
        .unwrap();
    assert_eq!(room.status, RoomStatus::Playing);
    assert_eq!(room.current_turn, Some(PlayerSlot::FIRST));
}

#[tokio::test(start_paused = true)]
async fn test_single_player_cannot_start_two_seat_room() {
    let engine = manual_engine();
    let seat = engine.create_room("Ada", None, None).await.unwrap();
    let room = engine
        .configure_board(seat.room.id, slot(1), &identity_card(25))
        .await
        .unwrap();
    assert_eq!(room.status, RoomStatus::Waiting);
}

#[tokio::test(start_paused = true)]
async fn test_resubmitting_a_card_overwrites_it() {
    let engine = manual_engine();
    let room = full_room(&engine, 2).await;
    engine
        .configure_board(room.id, slot(1), &identity_card(25))
        .await
        .unwrap();
    engine
        .configure_board(room.id, slot(1), &reversed_card(25))
        .await
        .unwrap();

    let players = engine.players_by_room(room.id).await.unwrap();
    assert_eq!(players[0].board[0], 25);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_cards_rejected() {
    let engine = manual_engine();
    let room = full_room(&engine, 2).await;

    let err = engine
        .configure_board(room.id, slot(1), &identity_card(24))
        .await
        .unwrap_err();
    assert_eq!(kind(err), ErrorKind::InvalidLength);

    let mut card = identity_card(25);
    card[0] = 26;
    let err = engine.configure_board(room.id, slot(1), &card).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::OutOfRange);

    let mut card = identity_card(25);
    card[0] = 2;
    let err = engine.configure_board(room.id, slot(1), &card).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::Duplicate);

    // Nothing was stored.
    let players = engine.players_by_room(room.id).await.unwrap();
    assert!(players.iter().all(|p| p.board.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn test_configure_unknown_room_or_slot() {
    let engine = manual_engine();
    let err = engine
        .configure_board(RoomId(99), slot(1), &identity_card(25))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RoomNotFound(RoomId(99))));

    let room = full_room(&engine, 2).await;
    let err = engine
        .configure_board(room.id, slot(3), &identity_card(25))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PlayerNotFound(_, _)));
}

#[tokio::test(start_paused = true)]
async fn test_cards_locked_during_play() {
    let engine = manual_engine();
    let room = playing_room(&engine, identity_card(25), identity_card(25)).await;
    let err = engine
        .configure_board(room.id, slot(1), &reversed_card(25))
        .await
        .unwrap_err();
    assert_eq!(kind(err), ErrorKind::BoardLocked);
}

// =========================================================================
// mark
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_mark_crosses_number_on_every_card() {
    let engine = manual_engine();
    let room = playing_room(&engine, identity_card(25), reversed_card(25)).await;

    // Position 6 holds 7 on player1's card; on player2's reversed card 7
    // sits at position 18.
    let outcome = engine.mark(room.id, slot(1), 6).await.unwrap();
    assert_eq!(outcome.number, 7);
    assert_eq!(outcome.crossed, vec![(slot(1), 6), (slot(2), 18)]);
    assert!(!outcome.won());
    assert_eq!(outcome.room.current_turn, Some(slot(2)));

    let players = engine.players_by_room(room.id).await.unwrap();
    assert!(players[0].is_marked(6));
    assert!(players[1].is_marked(18));
    assert_eq!(players[1].marked_positions.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_mark_rearms_turn_timer() {
    let engine = manual_engine();
    let room = playing_room(&engine, identity_card(25), identity_card(25)).await;
    engine.scheduler().take();

    tokio::time::advance(Duration::from_secs(10)).await;
    let outcome = engine.mark(room.id, slot(1), 0).await.unwrap();
    assert_eq!(outcome.room.turn_expires_at, Some(START + 70_000));

    let armed = engine.scheduler().take();
    assert_eq!(armed.len(), 1);
    assert_eq!(armed[0].payload.slot, slot(2));
    assert_eq!(armed[0].payload.expires_at, START + 70_000);
}

#[tokio::test(start_paused = true)]
async fn test_mark_out_of_turn_rejected() {
    let engine = manual_engine();
    let room = playing_room(&engine, identity_card(25), identity_card(25)).await;
    let err = engine.mark(room.id, slot(2), 0).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::WrongTurn {
            expected: Some(PlayerSlot::FIRST),
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_mark_before_start_rejected() {
    let engine = manual_engine();
    let room = full_room(&engine, 2).await;
    let err = engine.mark(room.id, slot(1), 0).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::WrongTurn);

    let err = engine.mark(RoomId(77), slot(1), 0).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::NotFound);
}

#[tokio::test(start_paused = true)]
async fn test_already_marked_and_bad_positions() {
    let engine = manual_engine();
    let room = playing_room(&engine, identity_card(25), identity_card(25)).await;

    engine.mark(room.id, slot(1), 0).await.unwrap();
    // player2 announces 6, which crosses position 5 on player1's card.
    engine.mark(room.id, slot(2), 5).await.unwrap();

    for taken in [0, 5] {
        let err = engine.mark(room.id, slot(1), taken).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyMarked(p) if p == taken));
    }

    let err = engine.mark(room.id, slot(1), 25).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidPosition {
            position: 25,
            len: 25
        }
    ));

    // Rejections don't cost the turn.
    let outcome = engine.mark(room.id, slot(1), 1).await.unwrap();
    assert_eq!(outcome.number, 2);
}

#[tokio::test(start_paused = true)]
async fn test_first_in_join_order_wins_a_tie() {
    let engine = manual_engine();
    // Identical cards: every announcement crosses the same cell on both,
    // so both players complete their fifth line on the same call.
    let room = playing_room(&engine, identity_card(25), identity_card(25)).await;

    // Rows 0-3, alternating callers. Four lines each: not yet a win.
    for position in 0..20 {
        let caller = slot(position as u8 % 2 + 1);
        let outcome = engine.mark(room.id, caller, position).await.unwrap();
        assert!(!outcome.won(), "no winner expected at position {position}");
        assert_eq!(outcome.crossed.len(), 2);
    }
    let room = engine.room(room.id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Playing);
    assert_eq!(room.current_turn, Some(slot(1)));

    // Position 22 completes column 2: five lines for both players.
    let outcome = engine.mark(room.id, slot(1), 22).await.unwrap();
    assert_eq!(outcome.winner, Some(slot(1)));
    assert_eq!(outcome.crossed, vec![(slot(1), 22)]);
    assert_eq!(outcome.room.status, RoomStatus::Finished);
    assert_eq!(outcome.room.winner, Some(slot(1)));
    assert_eq!(outcome.room.current_turn, None);
    assert_eq!(outcome.room.turn_expires_at, None);

    // player2 was never processed for the winning number.
    let players = engine.players_by_room(room.id).await.unwrap();
    assert_eq!(players[0].marked_positions.len(), 21);
    assert_eq!(players[1].marked_positions.len(), 20);
    assert!(!players[1].is_marked(22));

    // The game is over.
    let err = engine.mark(room.id, slot(2), 23).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::WrongTurn);
}

// =========================================================================
// Turn timers
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_superseded_timers_are_stale() {
    let engine = manual_engine();
    let room = playing_room(&engine, identity_card(25), identity_card(25)).await;
    let first = engine.scheduler().take().remove(0).payload;

    tokio::time::advance(Duration::from_secs(30)).await;
    engine.mark(room.id, slot(1), 0).await.unwrap();
    engine.mark(room.id, slot(2), 1).await.unwrap();
    let mut armed = engine.scheduler().take();
    let for_player2 = armed.remove(0).payload;
    let for_player1 = armed.remove(0).payload;

    // At player1's original deadline the turn is player1's again, but the
    // stored deadline has moved 30 seconds further out.
    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(engine.handle_timeout(first).await.unwrap(), AutoPass::Stale);
    // player2 no longer holds the turn.
    assert_eq!(
        engine.handle_timeout(for_player2).await.unwrap(),
        AutoPass::Stale
    );
    let unchanged = engine.room(room.id).await.unwrap();
    assert_eq!(unchanged.current_turn, Some(slot(1)));
    assert_eq!(unchanged.turn_expires_at, Some(START + 90_000));
    assert!(engine.scheduler().is_empty());

    tokio::time::advance(Duration::from_secs(30)).await;
    let passed = engine.handle_timeout(for_player1).await.unwrap();
    assert_eq!(
        passed,
        AutoPass::Advanced {
            from: slot(1),
            to: slot(2),
            expires_at: START + 150_000,
        }
    );
    assert_eq!(engine.scheduler().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_within_tolerance_acts() {
    let engine = manual_engine();
    let room = playing_room(&engine, identity_card(25), identity_card(25)).await;
    let timeout = engine.scheduler().take().remove(0).payload;

    // Fired half a second early: inside the one-second tolerance.
    tokio::time::advance(Duration::from_millis(59_500)).await;
    let passed = engine.handle_timeout(timeout).await.unwrap();
    assert!(matches!(passed, AutoPass::Advanced { to, .. } if to == slot(2)));

    let room = engine.room(room.id).await.unwrap();
    assert_eq!(room.current_turn, Some(slot(2)));
}

#[tokio::test(start_paused = true)]
async fn test_old_timer_for_same_slot_is_stale() {
    let engine = manual_engine();
    let room = playing_room(&engine, identity_card(25), reversed_card(25)).await;
    let first = engine.scheduler().take().remove(0).payload;

    // The turn comes back to player1 well inside the tolerance window of
    // the first timer, with a deadline 400ms later than the first one.
    tokio::time::advance(Duration::from_millis(200)).await;
    engine.mark(room.id, slot(1), 0).await.unwrap();
    tokio::time::advance(Duration::from_millis(200)).await;
    engine.mark(room.id, slot(2), 1).await.unwrap();
    let current = engine.scheduler().take().remove(1).payload;
    assert_eq!(current.slot, slot(1));
    assert_eq!(current.expires_at, START + 60_400);

    tokio::time::advance(Duration::from_millis(59_600)).await;
    assert_eq!(engine.handle_timeout(first).await.unwrap(), AutoPass::Stale);
    let unchanged = engine.room(room.id).await.unwrap();
    assert_eq!(unchanged.current_turn, Some(slot(1)));
    assert_eq!(unchanged.turn_expires_at, Some(START + 60_400));

    tokio::time::advance(Duration::from_millis(400)).await;
    let passed = engine.handle_timeout(current).await.unwrap();
    assert!(matches!(passed, AutoPass::Advanced { to, .. } if to == slot(2)));
}

#[tokio::test(start_paused = true)]
async fn test_timer_after_game_end_is_stale() {
    let engine = manual_engine();
    let room = playing_room(&engine, identity_card(25), identity_card(25)).await;
    let timeout = engine.scheduler().take().remove(0).payload;

    engine.exit_room(room.id, slot(2)).await.unwrap();
    engine.exit_room(room.id, slot(1)).await.unwrap();
    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(engine.handle_timeout(timeout).await.unwrap(), AutoPass::Stale);
}

#[tokio::test(start_paused = true)]
async fn test_idle_turn_is_auto_passed() {
    let engine = GameEngine::spawn(MemoryStore::new(), EngineConfig::default());
    let room = playing_room(&*engine, identity_card(25), identity_card(25)).await;
    let first_deadline = room.turn_expires_at.unwrap();
    let mut events = engine.subscribe(room.id).await.unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;
    let room = engine.room(room.id).await.unwrap();
    assert_eq!(room.current_turn, Some(slot(2)));
    assert_eq!(room.turn_expires_at, Some(first_deadline + 60_000));

    let mut timed_out = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let RoomEvent::TurnTimedOut { from, to, .. } = event {
            timed_out.push((from, to));
        }
    }
    assert_eq!(timed_out, vec![(slot(1), slot(2))]);

    // And it keeps going round.
    tokio::time::sleep(Duration::from_secs(60)).await;
    let room = engine.room(room.id).await.unwrap();
    assert_eq!(room.current_turn, Some(slot(1)));
}

#[tokio::test(start_paused = true)]
async fn test_mark_beats_the_timer() {
    let engine = GameEngine::spawn(MemoryStore::new(), EngineConfig::default());
    let room = playing_room(&*engine, identity_card(25), identity_card(25)).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    let marked = engine.mark(room.id, slot(1), 0).await.unwrap();
    let deadline = marked.room.turn_expires_at;

    // player1's original timer fires at 60s and must change nothing.
    tokio::time::sleep(Duration::from_secs(31)).await;
    let room_now = engine.room(room.id).await.unwrap();
    assert_eq!(room_now.current_turn, Some(slot(2)));
    assert_eq!(room_now.turn_expires_at, deadline);

    // player2's own timer fires at 90s.
    tokio::time::sleep(Duration::from_secs(30)).await;
    let room_now = engine.room(room.id).await.unwrap();
    assert_eq!(room_now.current_turn, Some(slot(1)));
}

// =========================================================================
// rematch
// =========================================================================

async fn finished_room(engine: &ManualEngine) -> Room {
    let room = playing_room(engine, identity_card(25), identity_card(25)).await;
    for position in 0..20 {
        engine
            .mark(room.id, slot(position as u8 % 2 + 1), position)
            .await
            .unwrap();
    }
    let outcome = engine.mark(room.id, slot(1), 22).await.unwrap();
    assert!(outcome.won());
    engine.scheduler().take();
    outcome.room
}

#[tokio::test(start_paused = true)]
async fn test_rematch_keeping_cards() {
    let engine = manual_engine();
    let room = finished_room(&engine).await;

    let room = engine.rematch(room.id, false).await.unwrap();
    assert_eq!(room.status, RoomStatus::Playing);
    assert_eq!(room.current_turn, Some(PlayerSlot::FIRST));
    assert_eq!(room.winner, None);
    assert_eq!(room.turn_expires_at, Some(START + 60_000));
    assert_eq!(engine.scheduler().len(), 1);

    let players = engine.players_by_room(room.id).await.unwrap();
    for player in &players {
        assert!(player.marked_positions.is_empty());
        assert_eq!(player.board.len(), 25);
    }

    // Play resumes straight away.
    engine.mark(room.id, slot(1), 0).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_rematch_with_new_cards() {
    let engine = manual_engine();
    let room = finished_room(&engine).await;

    let room = engine.rematch(room.id, true).await.unwrap();
    assert_eq!(room.status, RoomStatus::Waiting);
    assert_eq!(room.current_turn, None);
    assert_eq!(room.winner, None);
    assert_eq!(room.turn_expires_at, None);
    assert!(engine.scheduler().is_empty());

    let players = engine.players_by_room(room.id).await.unwrap();
    for player in &players {
        assert!(player.marked_positions.is_empty());
        assert!(player.board.is_empty());
    }

    // A fresh configuration phase starts the game again.
    engine
        .configure_board(room.id, slot(1), &reversed_card(25))
        .await
        .unwrap();
    let room = engine
        .configure_board(room.id, slot(2), &reversed_card(25))
        .await
        .unwrap();
    assert_eq!(room.status, RoomStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_rematch_mid_game_resets_marks() {
    let engine = manual_engine();
    let room = playing_room(&engine, identity_card(25), identity_card(25)).await;
    engine.mark(room.id, slot(1), 0).await.unwrap();

    let room = engine.rematch(room.id, false).await.unwrap();
    assert_eq!(room.current_turn, Some(PlayerSlot::FIRST));
    let players = engine.players_by_room(room.id).await.unwrap();
    assert!(players.iter().all(|p| p.marked_positions.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn test_rematch_while_waiting_rejected() {
    let engine = manual_engine();
    let room = full_room(&engine, 2).await;
    let err = engine.rematch(room.id, false).await.unwrap_err();
    assert!(matches!(err, EngineError::GameNotActive(RoomStatus::Waiting)));
}

// =========================================================================
// exit_room
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_exit_frees_the_slot() {
    let engine = manual_engine();
    let room = full_room(&engine, 2).await;

    let ExitOutcome::Left(after) = engine.exit_room(room.id, slot(2)).await.unwrap()
    else {
        panic!("room should survive");
    };
    assert_eq!(after.player_count, 1);

    let rejoined = engine.join_room(room.code.as_str(), "Eve", None).await.unwrap();
    assert_eq!(rejoined.player.slot, slot(2));
    assert_eq!(rejoined.room.player_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_last_exit_closes_room() {
    let engine = manual_engine();
    let seat = engine.create_room("Ada", None, None).await.unwrap();
    let mut events = engine.subscribe(seat.room.id).await.unwrap();

    let outcome = engine.exit_room(seat.room.id, slot(1)).await.unwrap();
    assert_eq!(outcome, ExitOutcome::RoomClosed);
    assert_eq!(engine.store().room_count().await, 0);
    assert_eq!(engine.store().player_count().await, 0);

    let err = engine.room_by_code(seat.room.code.as_str()).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::NotFound);

    assert_eq!(
        events.recv().await.unwrap(),
        RoomEvent::PlayerLeft {
            room_id: seat.room.id,
            slot: slot(1)
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        RoomEvent::RoomClosed {
            room_id: seat.room.id
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_exit_unknown_player() {
    let engine = manual_engine();
    let room = full_room(&engine, 2).await;
    let err = engine.exit_room(room.id, slot(5)).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::NotFound);
}

#[tokio::test(start_paused = true)]
async fn test_turn_holder_leaving_passes_the_turn() {
    let engine = manual_engine();
    let room = full_room(&engine, 3).await;
    for n in 1..=3 {
        engine
            .configure_board(room.id, slot(n), &identity_card(36))
            .await
            .unwrap();
    }
    engine.scheduler().take();

    let ExitOutcome::Left(room) = engine.exit_room(room.id, slot(1)).await.unwrap() else {
        panic!("room should survive");
    };
    assert_eq!(room.player_count, 2);
    assert_eq!(room.current_turn, Some(slot(2)));
    assert_eq!(engine.scheduler().take()[0].payload.slot, slot(2));

    // The empty seat is skipped from now on.
    let outcome = engine.mark(room.id, slot(2), 0).await.unwrap();
    assert_eq!(outcome.room.current_turn, Some(slot(3)));
    let outcome = engine.mark(room.id, slot(3), 1).await.unwrap();
    assert_eq!(outcome.room.current_turn, Some(slot(2)));
}

// =========================================================================
// Queries and events
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_players_listed_in_join_order() {
    let engine = manual_engine();
    let room = full_room(&engine, 4).await;
    let slots: Vec<_> = engine
        .players_by_room(room.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.slot)
        .collect();
    assert_eq!(slots, vec![slot(1), slot(2), slot(3), slot(4)]);

    let err = engine.players_by_room(RoomId(404)).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::NotFound);
}

#[tokio::test(start_paused = true)]
async fn test_room_by_code_is_case_insensitive() {
    let engine = manual_engine();
    let seat = engine.create_room("Ada", None, None).await.unwrap();
    let code = format!(" {} ", seat.room.code.as_str().to_lowercase());
    let found = engine.room_by_code(&code).await.unwrap();
    assert_eq!(found.id, seat.room.id);
}

#[tokio::test(start_paused = true)]
async fn test_suggested_board_is_accepted() {
    let engine = manual_engine();
    let room = full_room(&engine, 3).await;
    let board = engine.suggest_board(room.id).await.unwrap();
    assert_eq!(board.len(), 36);

    let as_i64: Vec<i64> = board.iter().map(|&v| v as i64).collect();
    engine.configure_board(room.id, slot(1), &as_i64).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_the_game_start() {
    let engine = manual_engine();
    let room = full_room(&engine, 2).await;
    engine
        .configure_board(room.id, slot(1), &identity_card(25))
        .await
        .unwrap();

    let mut events = engine.subscribe(room.id).await.unwrap();
    engine
        .configure_board(room.id, slot(2), &identity_card(25))
        .await
        .unwrap();

    let RoomEvent::PlayerUpdated { player } = events.recv().await.unwrap() else {
        panic!("expected the card update first");
    };
    assert_eq!(player.slot, slot(2));
    assert_eq!(player.board.len(), 25);

    let RoomEvent::RoomUpdated { room } = events.recv().await.unwrap() else {
        panic!("expected the room update second");
    };
    assert_eq!(room.status, RoomStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_to_missing_room_fails() {
    let engine = manual_engine();
    let err = engine.subscribe(RoomId(5)).await.unwrap_err();
    assert_eq!(kind(err), ErrorKind::NotFound);
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_marks_only_one_takes_the_turn() {
    let engine = GameEngine::spawn(MemoryStore::new(), EngineConfig::default());
    let room = playing_room(&*engine, identity_card(25), reversed_card(25)).await;
    let room_id = room.id;

    let tasks: Vec<_> = (0..8)
        .map(|position| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.mark(room_id, slot(1), position).await })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(outcome) => {
                accepted += 1;
                assert!(!outcome.won());
            }
            Err(err) => assert_eq!(kind(err), ErrorKind::WrongTurn),
        }
    }
    assert_eq!(accepted, 1);

    let room = engine.room(room_id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Playing);
    assert_eq!(room.current_turn, Some(slot(2)));
    let players = engine.players_by_room(room_id).await.unwrap();
    assert_eq!(players[0].marked_positions.len(), 1);
    assert_eq!(players[1].marked_positions.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_racing_last_cards_start_the_game_once() {
    let engine = Arc::new(manual_engine());
    let room_id = full_room(&*engine, 2).await.id;
    let mut events = engine.subscribe(room_id).await.unwrap();

    let configure = |n: u8, card: Vec<i64>| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.configure_board(room_id, slot(n), &card).await })
    };
    let (first, second) = tokio::join!(
        configure(1, identity_card(25)),
        configure(2, reversed_card(25)),
    );
    let statuses = [first.unwrap().unwrap().status, second.unwrap().unwrap().status];
    assert_eq!(
        statuses.iter().filter(|s| **s == RoomStatus::Playing).count(),
        1
    );
    assert!(statuses.contains(&RoomStatus::Waiting));

    assert_eq!(engine.scheduler().len(), 1);
    let room = engine.room(room_id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Playing);
    assert_eq!(room.current_turn, Some(slot(1)));

    let mut started = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, RoomEvent::RoomUpdated { ref room } if room.status == RoomStatus::Playing) {
            started += 1;
        }
    }
    assert_eq!(started, 1);
}
