//! Room actor implementation with async message handling.

use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot, watch};

use super::{
    config::RoomConfig,
    messages::{Outbox, PlayerAction, RoomError, RoomMessage, RoomResponse, Seat},
    timer::{self, Countdown, CountdownKind},
};
use crate::game::{
    entities::{
        Chips, ConnectionId, PlayerId, ReconnectToken, RoomId, RoomSummary, RoomView,
        SessionStatus,
    },
    errors::{SessionError, UserError},
    events::SessionEvent,
    session::Session,
};
use crate::net::messages::ServerMessage;

/// Inbox capacity per room.
const INBOX_SIZE: usize = 100;

/// Room actor handle for sending messages
#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    room_id: RoomId,
    summary: watch::Receiver<RoomSummary>,
}

impl RoomHandle {
    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Latest summary published by the room.
    #[must_use]
    pub fn summary(&self) -> RoomSummary {
        self.summary.borrow().clone()
    }

    /// The actor has stopped and won't take more messages.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the room
    pub async fn send(&self, message: RoomMessage) -> RoomResponse<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoomError::RoomClosed)
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> RoomResponse<T> {
        let (tx, rx) = oneshot::channel();
        self.send(message(tx)).await?;
        rx.await.map_err(|_| RoomError::ResponseDropped)
    }

    pub async fn join(
        &self,
        name: String,
        balance: Option<Chips>,
        connection: ConnectionId,
        outbox: Outbox,
        creator: bool,
    ) -> RoomResponse<Seat> {
        self.request(|response| RoomMessage::Join {
            name,
            balance,
            connection,
            outbox,
            creator,
            response,
        })
        .await?
    }

    pub async fn rejoin(
        &self,
        player_id: PlayerId,
        token: ReconnectToken,
        connection: ConnectionId,
        outbox: Outbox,
    ) -> RoomResponse<Seat> {
        self.request(|response| RoomMessage::Rejoin {
            player_id,
            token,
            connection,
            outbox,
            response,
        })
        .await?
    }

    pub async fn start_game(
        &self,
        player_id: PlayerId,
        connection: ConnectionId,
    ) -> RoomResponse<()> {
        self.request(|response| RoomMessage::StartGame {
            player_id,
            connection,
            response,
        })
        .await?
    }

    pub async fn act(
        &self,
        player_id: PlayerId,
        connection: ConnectionId,
        action: PlayerAction,
    ) -> RoomResponse<()> {
        self.request(|response| RoomMessage::Action {
            player_id,
            connection,
            action,
            response,
        })
        .await?
    }

    pub async fn chat(
        &self,
        player_id: PlayerId,
        connection: ConnectionId,
        text: String,
    ) -> RoomResponse<()> {
        self.request(|response| RoomMessage::Chat {
            player_id,
            connection,
            text,
            response,
        })
        .await?
    }

    pub async fn leave(&self, player_id: PlayerId, connection: ConnectionId) -> RoomResponse<()> {
        self.request(|response| RoomMessage::Leave {
            player_id,
            connection,
            response,
        })
        .await?
    }

    pub async fn disconnect(
        &self,
        player_id: PlayerId,
        connection: ConnectionId,
    ) -> RoomResponse<()> {
        self.request(|response| RoomMessage::Disconnect {
            player_id,
            connection,
            response,
        })
        .await
    }

    pub async fn state(&self, viewer: Option<PlayerId>) -> RoomResponse<RoomView> {
        self.request(|response| RoomMessage::GetState { viewer, response })
            .await
    }
}

/// Room actor owning a single session, its countdown, and the outboxes of
/// the players seated in it.
pub struct RoomActor {
    session: Session,

    /// Message inbox
    inbox: mpsc::Receiver<RoomMessage>,

    /// Pending turn or reset countdown
    countdown: Option<Countdown>,

    /// Notification channels of seated players
    outboxes: HashMap<PlayerId, Outbox>,

    /// Summary published for the directory
    summary: watch::Sender<RoomSummary>,

    /// Someone has asked for a seat at least once
    claimed: bool,
}

impl RoomActor {
    /// Create a new room actor and the handle used to talk to it.
    #[must_use]
    pub fn new(room_id: RoomId, config: RoomConfig) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_SIZE);
        let session = Session::new(room_id.clone(), config);
        let (summary, summary_rx) = watch::channel(session.summary());

        let actor = Self {
            session,
            inbox,
            countdown: None,
            outboxes: HashMap::new(),
            summary,
            claimed: false,
        };
        let handle = RoomHandle {
            sender,
            room_id,
            summary: summary_rx,
        };

        (actor, handle)
    }

    /// Run the room actor event loop until the room empties or every handle
    /// is dropped.
    pub async fn run(mut self) {
        log::info!("Room {} open", self.session.id());

        loop {
            tokio::select! {
                biased;

                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => break,
                },

                () = timer::wait(self.countdown) => self.on_countdown(),
            }

            // Closes after the last player goes, and after a rejected first join.
            if self.claimed && self.session.is_empty() {
                break;
            }
        }

        log::info!("Room {} closed", self.session.id());
    }

    fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join {
                name,
                balance,
                connection,
                outbox,
                creator,
                response,
            } => {
                let result = self.handle_join(&name, balance, connection, outbox, creator);
                let _ = response.send(result);
            }

            RoomMessage::Rejoin {
                player_id,
                token,
                connection,
                outbox,
                response,
            } => {
                let result = self.handle_rejoin(player_id, token, connection, outbox);
                let _ = response.send(result);
            }

            RoomMessage::StartGame {
                player_id,
                connection,
                response,
            } => {
                let result = self.handle_start(player_id, connection);
                let _ = response.send(result);
            }

            RoomMessage::Action {
                player_id,
                connection,
                action,
                response,
            } => {
                let result = self
                    .session
                    .authorize(player_id, connection)
                    .and_then(|()| match action {
                        PlayerAction::Bet(amount) => self.session.bet(player_id, amount),
                        PlayerAction::Check => self.session.check(player_id),
                        PlayerAction::Fold => self.session.fold(player_id),
                        PlayerAction::Reveal => self.session.reveal(player_id),
                    });
                let _ = response.send(self.accept(result));
            }

            RoomMessage::Chat {
                player_id,
                connection,
                text,
                response,
            } => {
                let result = self
                    .session
                    .authorize(player_id, connection)
                    .and_then(|()| self.session.chat(player_id, &text));
                let _ = response.send(self.accept(result));
            }

            RoomMessage::Leave {
                player_id,
                connection,
                response,
            } => {
                let result = self
                    .session
                    .authorize(player_id, connection)
                    .and_then(|()| self.session.leave(player_id));
                let accepted = self.accept(result);
                if accepted.is_ok() {
                    self.outboxes.remove(&player_id);
                }
                let _ = response.send(accepted);
            }

            RoomMessage::Disconnect {
                player_id,
                connection,
                response,
            } => {
                let events = self.session.disconnect(player_id, connection);
                if !events.is_empty() {
                    self.outboxes.remove(&player_id);
                    self.publish(events);
                }
                let _ = response.send(());
            }

            RoomMessage::GetState { viewer, response } => {
                let _ = response.send(self.session.view_for(viewer));
            }
        }
    }

    fn handle_join(
        &mut self,
        name: &str,
        balance: Option<Chips>,
        connection: ConnectionId,
        outbox: Outbox,
        creator: bool,
    ) -> RoomResponse<Seat> {
        self.claimed = true;
        let (player_id, events) = self.session.join(name, balance, connection)?;

        let seat = self.seat(player_id)?;
        let greeting = if creator {
            ServerMessage::RoomCreated {
                room_id: seat.room_id.clone(),
                player_id,
                token: seat.token,
                state: seat.state.clone(),
            }
        } else {
            ServerMessage::RoomJoined {
                room_id: seat.room_id.clone(),
                player_id,
                token: seat.token,
                state: seat.state.clone(),
            }
        };
        let _ = outbox.send(greeting);
        self.outboxes.insert(player_id, outbox);

        self.publish(events);
        Ok(seat)
    }

    fn handle_rejoin(
        &mut self,
        player_id: PlayerId,
        token: ReconnectToken,
        connection: ConnectionId,
        outbox: Outbox,
    ) -> RoomResponse<Seat> {
        let events = self.session.rejoin(player_id, token, connection)?;

        let seat = self.seat(player_id)?;
        let _ = outbox.send(ServerMessage::Reconnected {
            room_id: seat.room_id.clone(),
            player_id,
            token: seat.token,
            state: seat.state.clone(),
        });
        if let Some(previous) = self.outboxes.insert(player_id, outbox) {
            let _ = previous.send(ServerMessage::error(UserError::SeatTakenOver));
        }

        self.publish(events);
        Ok(seat)
    }

    fn handle_start(&mut self, player_id: PlayerId, connection: ConnectionId) -> RoomResponse<()> {
        self.session.authorize(player_id, connection)?;
        match self.session.start_game(player_id) {
            Ok(events) => {
                self.publish(events);
                Ok(())
            }
            Err(SessionError::User(err)) => Err(err.into()),
            Err(SessionError::Invariant(err)) => {
                let events = self.session.recover(&err);
                self.publish(events);
                Err(err.into())
            }
        }
    }

    fn seat(&self, player_id: PlayerId) -> RoomResponse<Seat> {
        let token = self
            .session
            .reconnect_token(player_id)
            .ok_or(UserError::NotInRoom)?;
        Ok(Seat {
            room_id: self.session.id().clone(),
            player_id,
            token,
            state: self.session.view_for(Some(player_id)),
        })
    }

    /// Publish the events of an accepted intent. Rejections leave the room
    /// untouched and only go back to the caller.
    fn accept(&mut self, result: Result<Vec<SessionEvent>, UserError>) -> RoomResponse<()> {
        let events = result?;
        self.publish(events);
        Ok(())
    }

    fn on_countdown(&mut self) {
        let Some(countdown) = self.countdown.take() else {
            return;
        };
        let events = match countdown.kind() {
            CountdownKind::Turn(turn) => self.session.expire_turn(turn),
            CountdownKind::Reset => self.session.reset_for_next_round(),
        };
        self.publish(events);
    }

    /// Broadcast events in order, then every player's view of the new state.
    fn publish(&mut self, mut events: Vec<SessionEvent>) {
        if let Err(err) = self.session.check_invariants() {
            events.extend(self.session.recover(&err));
        }

        for event in events {
            if event.is_settlement() {
                log::info!(
                    "Room {}: hand {} settled",
                    self.session.id(),
                    self.session.round()
                );
            }
            self.broadcast(&ServerMessage::from(event));
        }

        // Players purged at reset have no seat left.
        let session = &self.session;
        self.outboxes
            .retain(|id, _| session.player(*id).is_some_and(|p| p.is_connected()));
        self.broadcast_state();
        self.sync_countdown();
        self.summary.send_replace(self.session.summary());
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        let room_id = self.session.id();
        self.outboxes.retain(|player_id, outbox| {
            let delivered = outbox.send(message.clone()).is_ok();
            if !delivered {
                log::debug!("Room {room_id}: outbox of {player_id} closed");
            }
            delivered
        });
    }

    fn broadcast_state(&mut self) {
        let session = &self.session;
        self.outboxes.retain(|player_id, outbox| {
            let state = session.view_for(Some(*player_id));
            outbox.send(ServerMessage::GameState { state }).is_ok()
        });
    }

    /// Make the countdown match the session: one per turn while betting,
    /// one cool-down while settling, none otherwise.
    fn sync_countdown(&mut self) {
        let config = self.session.config();
        let current = self.countdown.map(|countdown| countdown.kind());
        self.countdown = match self.session.status() {
            SessionStatus::Betting => {
                let turn = self.session.turn_seq();
                match current {
                    Some(CountdownKind::Turn(pending)) if pending == turn => self.countdown,
                    _ => Some(Countdown::turn(turn, config.turn_timeout())),
                }
            }
            SessionStatus::Settling => match current {
                Some(CountdownKind::Reset) => self.countdown,
                _ => Some(Countdown::reset(config.settle_delay())),
            },
            SessionStatus::Waiting | SessionStatus::Dealing | SessionStatus::Showdown => None,
        };
    }
}
