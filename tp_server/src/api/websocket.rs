//! WebSocket gateway for the game protocol.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws`
//! 2. The connection gets a fresh `ConnectionId` and an outbox. A send task
//!    forwards everything put in the outbox to the socket as JSON text
//! 3. Client intents are parsed as [`ClientMessage`] and routed to the room
//!    directory or the room the connection is seated in
//! 4. On close, the room is told the connection went away. The seat stays
//!    reclaimable through `rejoin` until the hand is over. Whatever is still
//!    queued in the outbox is flushed before the socket goes
//!
//! Rejected intents are answered with an `error` message to the sender only.
//!
//! # Reconnecting
//!
//! `room_created`, `room_joined` and `reconnected` carry a `token` that only
//! the seated connection ever sees. `rejoin` needs the player id and that
//! token, and answers with a fresh token. Once a seat moves to a new
//! connection, intents from the old one are rejected.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws');
//!
//! ws.onopen = () => ws.send(JSON.stringify({
//!   type: "create_room",
//!   player_name: "alice"
//! }));
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === "room_created" || data.type === "reconnected") {
//!     roomId = data.room_id;
//!     playerId = data.player_id;
//!     token = data.token;
//!   }
//! };
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use teen_patti::{
    ClientMessage, ConnectionId, PlayerId, RoomError, RoomHandle, RoomId, ServerMessage,
    UserError,
    room::{Outbox, PlayerAction, Seat},
};
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};

use super::{AppState, rate_limiter::ConnectionLimits};
use crate::{logging, metrics};

/// How long a closing connection may take to flush its outbox.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Upgrade an HTTP connection to the game WebSocket.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection until it closes.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut connection = Connection::new(outbox);
    let connection_id = connection.id();

    metrics::websocket_connection_opened();
    info!("WebSocket connected: {connection_id}");

    let send_task = tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize message for {connection_id}: {e}");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            metrics::websocket_messages_sent();
        }
    });

    let mut limits = ConnectionLimits::new();
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                metrics::websocket_messages_received();

                if let Err(limiter) = limits.check() {
                    warn!("{limiter} rate limit exceeded for {connection_id}. Blocking message.");
                    metrics::rate_limit_hits_total(limiter);
                    connection.reply(ServerMessage::error(
                        "Rate limit exceeded. Please slow down.",
                    ));
                    continue;
                }

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => {
                        let kind = intent_kind(&message);
                        if let Err(err) = connection.handle(message, &state).await {
                            metrics::intents_rejected_total(kind);
                            logging::log_rejected_intent(
                                &connection_id.to_string(),
                                kind,
                                &err.to_string(),
                            );
                            connection.reply(ServerMessage::error(err));
                        }
                    }
                    Err(e) => {
                        debug!("Failed to parse message from {connection_id}: {e}");
                        connection.reply(ServerMessage::error("Invalid message format"));
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!("WebSocket error on {connection_id}: {e}");
                break;
            }
            _ => {}
        }
    }

    // Dropping the connection drops its outbox, so the send task stops once
    // the room lets go of its copy.
    connection.close(&state).await;
    flush(send_task).await;
    metrics::websocket_connection_closed();
    info!("WebSocket disconnected: {connection_id}");
}

/// Wait for the send task to drain the outbox, giving up after
/// [`FLUSH_TIMEOUT`].
async fn flush(mut send_task: JoinHandle<()>) {
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        debug!("Outbox not drained in time, dropping the rest");
        send_task.abort();
    }
}

/// Label used for rejected intent metrics.
fn intent_kind(message: &ClientMessage) -> &'static str {
    match message {
        ClientMessage::CreateRoom { .. } => "create_room",
        ClientMessage::JoinRoom { .. } => "join_room",
        ClientMessage::QuickJoin { .. } => "quick_join",
        ClientMessage::Rejoin { .. } => "rejoin",
        ClientMessage::StartGame { .. } => "start_game",
        ClientMessage::PlaceBet { .. } => "place_bet",
        ClientMessage::Check { .. } => "check",
        ClientMessage::Fold { .. } => "fold",
        ClientMessage::Reveal { .. } => "reveal",
        ClientMessage::ChatMessage { .. } => "chat_message",
        ClientMessage::LeaveRoom { .. } => "leave_room",
    }
}

/// One client connection and the seat it's bound to.
pub struct Connection {
    id: ConnectionId,
    outbox: Outbox,
    seat: Option<(RoomId, PlayerId)>,
}

impl Connection {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            id: ConnectionId::new(),
            outbox,
            seat: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Room and player this connection speaks for.
    pub fn seat(&self) -> Option<&(RoomId, PlayerId)> {
        self.seat.as_ref()
    }

    fn reply(&self, message: ServerMessage) {
        let _ = self.outbox.send(message);
    }

    /// Route one intent. Accepted intents are answered by the room itself
    /// through the outbox; the returned error goes back to this client only.
    pub async fn handle(
        &mut self,
        message: ClientMessage,
        state: &AppState,
    ) -> Result<(), RoomError> {
        let manager = &state.room_manager;
        match message {
            ClientMessage::CreateRoom {
                player_name,
                balance,
            } => {
                self.ensure_unseated()?;
                let seat = manager
                    .create_and_join(player_name, balance, self.id, self.outbox.clone())
                    .await?;
                self.bind(seat);
                metrics::active_rooms(manager.active_room_count().await);
            }

            ClientMessage::JoinRoom {
                room_id,
                player_name,
                balance,
            } => {
                self.ensure_unseated()?;
                let seat = manager
                    .join_room(&room_id, player_name, balance, self.id, self.outbox.clone())
                    .await?;
                self.bind(seat);
            }

            ClientMessage::QuickJoin {
                player_name,
                balance,
            } => {
                self.ensure_unseated()?;
                let seat = manager
                    .quick_join(player_name, balance, self.id, self.outbox.clone())
                    .await?;
                self.bind(seat);
                metrics::active_rooms(manager.active_room_count().await);
            }

            ClientMessage::Rejoin {
                room_id,
                player_id,
                token,
            } => {
                self.ensure_unseated()?;
                let seat = manager
                    .rejoin(&room_id, player_id, token, self.id, self.outbox.clone())
                    .await?;
                self.bind(seat);
            }

            ClientMessage::StartGame { room_id } => {
                let (room, player_id) = self.room(&room_id, state).await?;
                room.start_game(player_id, self.id).await?;
            }

            ClientMessage::PlaceBet { room_id, amount } => {
                let (room, player_id) = self.room(&room_id, state).await?;
                room.act(player_id, self.id, PlayerAction::Bet(amount)).await?;
            }

            ClientMessage::Check { room_id } => {
                let (room, player_id) = self.room(&room_id, state).await?;
                room.act(player_id, self.id, PlayerAction::Check).await?;
            }

            ClientMessage::Fold { room_id } => {
                let (room, player_id) = self.room(&room_id, state).await?;
                room.act(player_id, self.id, PlayerAction::Fold).await?;
            }

            ClientMessage::Reveal { room_id } => {
                let (room, player_id) = self.room(&room_id, state).await?;
                room.act(player_id, self.id, PlayerAction::Reveal).await?;
            }

            ClientMessage::ChatMessage { room_id, text } => {
                let (room, player_id) = self.room(&room_id, state).await?;
                room.chat(player_id, self.id, text).await?;
            }

            ClientMessage::LeaveRoom { room_id } => {
                let player_id = self.seated_in(&room_id)?;
                // The binding goes even when the room is already gone.
                self.seat = None;
                let result = manager.leave_room(&room_id, player_id, self.id).await;
                metrics::active_rooms(manager.active_room_count().await);
                result?;
            }
        }
        Ok(())
    }

    fn bind(&mut self, seat: Seat) {
        debug!(
            "Connection {} bound to {} in room {}",
            self.id, seat.player_id, seat.room_id
        );
        self.seat = Some((seat.room_id, seat.player_id));
    }

    fn ensure_unseated(&self) -> Result<(), RoomError> {
        match self.seat {
            Some(_) => Err(UserError::AlreadyInRoom.into()),
            None => Ok(()),
        }
    }

    fn seated_in(&self, room_id: &RoomId) -> Result<PlayerId, RoomError> {
        match &self.seat {
            Some((seated, player_id)) if seated == room_id => Ok(*player_id),
            _ => Err(UserError::NotInRoom.into()),
        }
    }

    async fn room(
        &self,
        room_id: &RoomId,
        state: &AppState,
    ) -> Result<(RoomHandle, PlayerId), RoomError> {
        let player_id = self.seated_in(room_id)?;
        let room = state
            .room_manager
            .get_room(room_id)
            .await
            .ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))?;
        Ok((room, player_id))
    }

    /// Tell the bound room this connection is gone.
    pub async fn close(self, state: &AppState) {
        let Some((room_id, player_id)) = self.seat else {
            return;
        };
        state
            .room_manager
            .disconnect(&room_id, player_id, self.id)
            .await;
        metrics::active_rooms(state.room_manager.active_room_count().await);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use teen_patti::{ReconnectToken, RoomConfig, SessionEvent};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn state() -> AppState {
        AppState::new(ServerConfig {
            room: RoomConfig {
                shuffle_turn_order: false,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn connect() -> (Connection, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(tx), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn parse(json: serde_json::Value) -> ClientMessage {
        serde_json::from_value(json).unwrap()
    }

    async fn create(state: &AppState) -> (Connection, UnboundedReceiver<ServerMessage>, RoomId) {
        let (mut conn, rx) = connect();
        conn.handle(
            parse(serde_json::json!({"type": "create_room", "player_name": "alice"})),
            state,
        )
        .await
        .unwrap();
        let room_id = conn.seat().unwrap().0.clone();
        (conn, rx, room_id)
    }

    async fn join(
        state: &AppState,
        room_id: &RoomId,
        name: &str,
    ) -> (Connection, UnboundedReceiver<ServerMessage>) {
        let (mut conn, rx) = connect();
        conn.handle(
            ClientMessage::JoinRoom {
                room_id: room_id.clone(),
                player_name: name.to_string(),
                balance: Some(500),
            },
            state,
        )
        .await
        .unwrap();
        (conn, rx)
    }

    #[tokio::test]
    async fn test_create_room_binds_connection() {
        let state = state();
        let (mut conn, mut rx, room_id) = create(&state).await;

        let messages = drain(&mut rx);
        assert!(matches!(
            &messages[0],
            ServerMessage::RoomCreated { room_id: created, .. } if *created == room_id
        ));
        assert_eq!(state.room_manager.active_room_count().await, 1);

        let err = conn
            .handle(
                parse(serde_json::json!({"type": "quick_join", "player_name": "alice"})),
                &state,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::User(UserError::AlreadyInRoom)));
    }

    #[tokio::test]
    async fn test_intents_for_other_rooms_are_rejected() {
        let state = state();
        let (mut conn, _rx, _) = create(&state).await;

        let err = conn
            .handle(
                ClientMessage::StartGame {
                    room_id: RoomId::from("ZZZZZZ"),
                },
                &state,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::User(UserError::NotInRoom)));

        let (mut stranger, _rx) = connect();
        let err = stranger
            .handle(
                ClientMessage::Fold {
                    room_id: RoomId::from("ZZZZZZ"),
                },
                &state,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::User(UserError::NotInRoom)));
    }

    #[tokio::test]
    async fn test_hand_played_over_connections() {
        let state = state();
        let (mut alice, mut alice_rx, room_id) = create(&state).await;
        let (mut bob, mut bob_rx) = join(&state, &room_id, "bob").await;

        alice
            .handle(ClientMessage::StartGame { room_id: room_id.clone() }, &state)
            .await
            .unwrap();
        alice
            .handle(
                ClientMessage::PlaceBet {
                    room_id: room_id.clone(),
                    amount: 40,
                },
                &state,
            )
            .await
            .unwrap();

        let err = alice
            .handle(ClientMessage::Check { room_id: room_id.clone() }, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::User(UserError::NotYourTurn)));

        bob.handle(ClientMessage::Fold { room_id: room_id.clone() }, &state)
            .await
            .unwrap();

        let alice_id = alice.seat().unwrap().1;
        for rx in [&mut alice_rx, &mut bob_rx] {
            assert!(drain(rx).iter().any(|m| matches!(
                m,
                ServerMessage::Event(SessionEvent::WinnerDeclared { winner, pot: 40, .. })
                    if winner.id == alice_id
            )));
        }
    }

    #[tokio::test]
    async fn test_leave_unbinds_connection() {
        let state = state();
        let (mut alice, _alice_rx, room_id) = create(&state).await;
        let (mut bob, _bob_rx) = join(&state, &room_id, "bob").await;

        bob.handle(ClientMessage::LeaveRoom { room_id: room_id.clone() }, &state)
            .await
            .unwrap();
        assert!(bob.seat().is_none());

        alice
            .handle(ClientMessage::LeaveRoom { room_id }, &state)
            .await
            .unwrap();
        assert_eq!(state.room_manager.active_room_count().await, 0);
    }

    fn token_of(messages: &[ServerMessage]) -> ReconnectToken {
        messages
            .iter()
            .find_map(|m| match m {
                ServerMessage::RoomCreated { token, .. }
                | ServerMessage::RoomJoined { token, .. }
                | ServerMessage::Reconnected { token, .. } => Some(*token),
                _ => None,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_close_reports_disconnect_and_rejoin_restores_seat() {
        let state = state();
        let (mut alice, mut alice_rx, room_id) = create(&state).await;
        let (bob, mut bob_rx) = join(&state, &room_id, "bob").await;
        let (_carol, _carol_rx) = join(&state, &room_id, "carol").await;
        let bob_id = bob.seat().unwrap().1;
        let bob_token = token_of(&drain(&mut bob_rx));
        alice
            .handle(ClientMessage::StartGame { room_id: room_id.clone() }, &state)
            .await
            .unwrap();

        // Mid-hand the seat is kept for a rejoin.
        bob.close(&state).await;
        let room = state.room_manager.get_room(&room_id).await.unwrap();
        assert_eq!(room.summary().player_count, 3);

        let (mut again, mut again_rx) = connect();
        again
            .handle(
                ClientMessage::Rejoin {
                    room_id: room_id.clone(),
                    player_id: bob_id,
                    token: bob_token,
                },
                &state,
            )
            .await
            .unwrap();
        assert_eq!(again.seat(), Some(&(room_id.clone(), bob_id)));
        assert_ne!(token_of(&drain(&mut again_rx)), bob_token);
        assert!(drain(&mut alice_rx).iter().any(|m| matches!(
            m,
            ServerMessage::Event(SessionEvent::PlayerReconnected { player }) if player.id == bob_id
        )));
    }

    #[tokio::test]
    async fn test_seat_cannot_be_claimed_with_a_public_id() {
        let state = state();
        let (mut alice, mut alice_rx, room_id) = create(&state).await;
        let (_bob, mut bob_rx) = join(&state, &room_id, "bob").await;
        alice
            .handle(ClientMessage::StartGame { room_id: room_id.clone() }, &state)
            .await
            .unwrap();
        let alice_id = alice.seat().unwrap().1;
        let bob_token = token_of(&drain(&mut bob_rx));
        drain(&mut alice_rx);

        // Everything a bystander sees: alice's id, and their own token.
        let (mut mallory, mut mallory_rx) = connect();
        let err = mallory
            .handle(
                ClientMessage::Rejoin {
                    room_id: room_id.clone(),
                    player_id: alice_id,
                    token: bob_token,
                },
                &state,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RoomError::User(UserError::InvalidReconnectToken)
        ));
        assert!(mallory.seat().is_none());

        let err = mallory
            .handle(ClientMessage::Fold { room_id: room_id.clone() }, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::User(UserError::NotInRoom)));
        assert!(drain(&mut mallory_rx).is_empty());

        // Alice's seat and connection are untouched.
        assert!(drain(&mut alice_rx).is_empty());
        alice
            .handle(ClientMessage::Check { room_id: room_id.clone() }, &state)
            .await
            .unwrap();
        assert!(drain(&mut alice_rx).iter().any(|m| matches!(
            m,
            ServerMessage::Event(SessionEvent::PlayerChecked { player, .. }) if player.id == alice_id
        )));
    }

    #[tokio::test]
    async fn test_old_connection_is_shut_out_after_rejoin() {
        let state = state();
        let (mut alice, mut alice_rx, room_id) = create(&state).await;
        let (_bob, _bob_rx) = join(&state, &room_id, "bob").await;
        let alice_id = alice.seat().unwrap().1;
        let token = token_of(&drain(&mut alice_rx));

        // A second tab holding the token takes the seat over.
        let (mut tab, mut tab_rx) = connect();
        tab.handle(
            ClientMessage::Rejoin {
                room_id: room_id.clone(),
                player_id: alice_id,
                token,
            },
            &state,
        )
        .await
        .unwrap();
        assert!(matches!(
            drain(&mut tab_rx).first(),
            Some(ServerMessage::Reconnected { .. })
        ));
        assert!(drain(&mut alice_rx).contains(&ServerMessage::error(UserError::SeatTakenOver)));

        let err = alice
            .handle(ClientMessage::StartGame { room_id: room_id.clone() }, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::User(UserError::SeatTakenOver)));

        // Closing the old socket doesn't disturb the new one.
        alice.close(&state).await;
        tab.handle(ClientMessage::StartGame { room_id }, &state)
            .await
            .unwrap();
        assert!(drain(&mut tab_rx).iter().any(|m| matches!(
            m,
            ServerMessage::Event(SessionEvent::GameStarted { .. })
        )));
    }

    #[tokio::test]
    async fn test_waiting_room_close_gives_up_the_seat() {
        let state = state();
        let (alice, _alice_rx, room_id) = create(&state).await;
        let (bob, mut bob_rx) = join(&state, &room_id, "bob").await;
        let bob_id = bob.seat().unwrap().1;
        let token = token_of(&drain(&mut bob_rx));

        bob.close(&state).await;
        let room = state.room_manager.get_room(&room_id).await.unwrap();
        assert_eq!(room.summary().player_count, 1);

        let (mut again, _rx) = connect();
        let err = again
            .handle(
                ClientMessage::Rejoin {
                    room_id: room_id.clone(),
                    player_id: bob_id,
                    token,
                },
                &state,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::User(UserError::NotInRoom)));

        alice.close(&state).await;
        assert_eq!(state.room_manager.active_room_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_delivers_queued_messages() {
        let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();
        let (socket, mut socket_rx) = mpsc::unbounded_channel();
        let send_task = tokio::spawn(async move {
            while let Some(message) = outbox_rx.recv().await {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let _ = socket.send(message);
            }
        });

        for _ in 0..3 {
            outbox.send(ServerMessage::error("bye")).unwrap();
        }
        drop(outbox);
        flush(send_task).await;

        assert_eq!(drain(&mut socket_rx).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_gives_up_on_a_stuck_socket() {
        let send_task = tokio::spawn(std::future::pending::<()>());
        let start = tokio::time::Instant::now();
        flush(send_task).await;
        assert!(start.elapsed() >= FLUSH_TIMEOUT);
    }

    #[test]
    fn test_intent_kind_matches_wire_tag() {
        let message = ClientMessage::ChatMessage {
            room_id: RoomId::from("ABC123"),
            text: "hi".to_string(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], intent_kind(&message));
    }
}
