//! Per-connection handler: request dispatch and event forwarding.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Split the socket; a writer task owns the sending half and stamps
//!      every outgoing envelope with the next sequence number.
//!   2. Loop: receive envelopes → dispatch requests to the engine → queue
//!      exactly one reply per request.
//!   3. Each `Subscribe` spawns a forwarder that copies room events into
//!      the same outgoing queue. Forwarders die with the connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bingohall_protocol::{
    ClientRequest, Codec, Envelope, ErrorKind, Payload, Reply, RoomEvent,
    RoomId, ServerResponse,
};
use bingohall_room::{EngineError, ExitOutcome, GameEngine};
use bingohall_store::Store;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::server::ServerState;
use crate::transport::{FrameWriter, WebSocketConnection};
use crate::BingoError;

/// Outgoing envelopes queued per connection before senders wait.
const OUTBOUND_BUFFER: usize = 64;

/// Event forwarders for one connection, keyed by room.
///
/// Dropping the set aborts every forwarder, so subscriptions end with the
/// connection even if the handler exits early.
#[derive(Default)]
struct Subscriptions {
    forwarders: HashMap<RoomId, JoinHandle<()>>,
}

impl Subscriptions {
    fn insert(&mut self, room_id: RoomId, forwarder: JoinHandle<()>) {
        if let Some(previous) = self.forwarders.insert(room_id, forwarder) {
            previous.abort();
        }
    }

    fn remove(&mut self, room_id: RoomId) {
        if let Some(forwarder) = self.forwarders.remove(&room_id) {
            forwarder.abort();
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for forwarder in self.forwarders.values() {
            forwarder.abort();
        }
    }
}

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), BingoError>
where
    S: Store,
    C: Codec,
{
    let conn_id = conn.id();
    let (writer, mut reader) = conn.split();
    let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let writer_task = tokio::spawn(write_frames(
        writer,
        outbound_rx,
        Arc::clone(&state),
        Instant::now(),
    ));

    let mut subscriptions = Subscriptions::default();

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, reader.recv())
            .await
        {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, closing");
                break;
            }
        };

        let reply = match state.codec.decode::<Envelope>(&data) {
            Ok(Envelope {
                seq,
                payload: Payload::Request(request),
                ..
            }) => {
                tracing::debug!(%conn_id, seq, ?request, "request");
                let response = match dispatch(
                    &state.engine,
                    &mut subscriptions,
                    &outbound,
                    request,
                )
                .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::debug!(%conn_id, seq, error = %e, "request failed");
                        error_response(e.code(), e.kind(), e.to_string())
                    }
                };
                Reply {
                    request_seq: seq,
                    response,
                }
            }
            Ok(Envelope { seq, .. }) => Reply {
                request_seq: seq,
                response: error_response(
                    400,
                    ErrorKind::InvalidRequest,
                    "clients may only send requests".into(),
                ),
            },
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                Reply {
                    request_seq: 0,
                    response: error_response(
                        400,
                        ErrorKind::InvalidRequest,
                        e.to_string(),
                    ),
                }
            }
        };

        if outbound.send(Payload::Reply(reply)).await.is_err() {
            tracing::debug!(%conn_id, "writer gone");
            break;
        }
    }

    // Forwarders hold clones of the outbound sender; the writer finishes
    // once they and `outbound` are gone.
    drop(subscriptions);
    drop(outbound);
    let _ = writer_task.await;
    Ok(())
}

/// Runs one request against the engine.
async fn dispatch<S: Store>(
    engine: &GameEngine<S>,
    subscriptions: &mut Subscriptions,
    outbound: &mpsc::Sender<Payload>,
    request: ClientRequest,
) -> Result<ServerResponse, EngineError> {
    let response = match request {
        ClientRequest::CreateRoom {
            player_name,
            player_avatar,
            max_players,
        } => {
            let seat = engine
                .create_room(&player_name, player_avatar, max_players)
                .await?;
            ServerResponse::RoomCreated {
                room: seat.room,
                player: seat.player,
            }
        }

        ClientRequest::JoinRoom {
            room_code,
            player_name,
            player_avatar,
        } => {
            let seat = engine
                .join_room(&room_code, &player_name, player_avatar)
                .await?;
            ServerResponse::RoomJoined {
                room: seat.room,
                player: seat.player,
            }
        }

        ClientRequest::ConfigureBoard {
            room_id,
            slot,
            board,
        } => ServerResponse::BoardConfigured {
            room: engine.configure_board(room_id, slot, &board).await?,
        },

        ClientRequest::SuggestBoard { room_id } => ServerResponse::SuggestedBoard {
            board: engine.suggest_board(room_id).await?,
        },

        ClientRequest::Mark {
            room_id,
            slot,
            position,
        } => {
            let outcome = engine.mark(room_id, slot, position).await?;
            ServerResponse::Marked {
                number: outcome.number,
                won: outcome.won(),
                winner: outcome.winner,
            }
        }

        ClientRequest::Rematch {
            room_id,
            reconfigure_board,
        } => ServerResponse::RematchStarted {
            room: engine.rematch(room_id, reconfigure_board).await?,
        },

        ClientRequest::ExitRoom { room_id, slot } => {
            let outcome = engine.exit_room(room_id, slot).await?;
            ServerResponse::Exited {
                room_closed: outcome == ExitOutcome::RoomClosed,
            }
        }

        ClientRequest::GetRoom { room_code } => ServerResponse::RoomFound {
            room: engine.room_by_code(&room_code).await?,
        },

        ClientRequest::GetPlayers { room_id } => ServerResponse::Players {
            players: engine.players_by_room(room_id).await?,
        },

        ClientRequest::Subscribe { room_id } => {
            let events = engine.subscribe(room_id).await?;
            let forwarder =
                tokio::spawn(forward_events(room_id, events, outbound.clone()));
            subscriptions.insert(room_id, forwarder);
            ServerResponse::Subscribed { room_id }
        }

        ClientRequest::Unsubscribe { room_id } => {
            subscriptions.remove(room_id);
            ServerResponse::Unsubscribed { room_id }
        }

        ClientRequest::Ping => ServerResponse::Pong,
    };
    Ok(response)
}

/// Copies one room's events into a connection's outgoing queue.
async fn forward_events(
    room_id: RoomId,
    mut events: broadcast::Receiver<RoomEvent>,
    outbound: mpsc::Sender<Payload>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if outbound.send(Payload::Event(event)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(%room_id, skipped, "subscriber lagged, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Drains the outgoing queue onto the socket.
async fn write_frames<S: Store, C: Codec>(
    mut writer: FrameWriter,
    mut outbound: mpsc::Receiver<Payload>,
    state: Arc<ServerState<S, C>>,
    start: Instant,
) {
    let mut seq: u64 = 1;
    while let Some(payload) = outbound.recv().await {
        let envelope = Envelope {
            seq: next_seq(&mut seq),
            timestamp: start.elapsed().as_millis() as u64,
            payload,
        };
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode envelope");
                continue;
            }
        };
        if let Err(e) = writer.send(bytes).await {
            tracing::debug!(error = %e, "send failed, dropping connection");
            return;
        }
    }
    let _ = writer.close().await;
}

fn error_response(code: u16, kind: ErrorKind, message: String) -> ServerResponse {
    ServerResponse::Error {
        code,
        kind,
        message,
    }
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
