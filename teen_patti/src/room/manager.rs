//! Room directory for spawning and finding room actors.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use super::{
    actor::{RoomActor, RoomHandle},
    config::RoomConfig,
    messages::{Outbox, RoomError, RoomResponse, Seat},
};
use crate::game::{
    entities::{Chips, ConnectionId, PlayerId, ReconnectToken, RoomId, RoomSummary},
    errors::UserError,
};

/// How many rooms quick join tries before giving up.
const QUICK_JOIN_ATTEMPTS: usize = 3;

/// Directory of active rooms. Only the id to handle map is shared; each
/// room's state is owned by its actor.
#[derive(Clone)]
pub struct RoomManager {
    /// Config for rooms opened through the convenience flows
    config: RoomConfig,

    /// Active room handles
    rooms: Arc<RwLock<HashMap<RoomId, RoomHandle>>>,
}

impl RoomManager {
    #[must_use]
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Create and spawn a new room under a fresh id.
    pub async fn create_room(&self, config: RoomConfig) -> RoomResponse<RoomHandle> {
        config.validate().map_err(RoomError::InvalidConfig)?;

        let mut rooms = self.rooms.write().await;
        let room_id = {
            let mut rng = rand::rng();
            loop {
                let candidate = RoomId::generate(&mut rng);
                if !rooms.contains_key(&candidate) {
                    break candidate;
                }
            }
        };

        let (actor, handle) = RoomActor::new(room_id.clone(), config);
        rooms.insert(room_id.clone(), handle.clone());
        drop(rooms);

        tokio::spawn(actor.run());
        log::info!("Created room {room_id}");

        Ok(handle)
    }

    /// First waiting room with a free seat, or a new room.
    pub async fn find_or_create(&self) -> RoomResponse<RoomHandle> {
        self.sweep().await;
        let open = {
            let rooms = self.rooms.read().await;
            rooms
                .values()
                .find(|handle| handle.summary().is_joinable())
                .cloned()
        };
        match open {
            Some(handle) => Ok(handle),
            None => self.create_room(self.config.clone()).await,
        }
    }

    /// Get a room handle
    pub async fn get_room(&self, room_id: &RoomId) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// List all active rooms
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        self.sweep().await;
        let rooms = self.rooms.read().await;
        let mut summaries: Vec<RoomSummary> = rooms.values().map(RoomHandle::summary).collect();
        summaries.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        summaries
    }

    /// Get active room count
    pub async fn active_room_count(&self) -> usize {
        self.sweep().await;
        let rooms = self.rooms.read().await;
        rooms.len()
    }

    /// Drop a room from the directory. Its actor stops once every handle is
    /// gone or its roster empties.
    pub async fn remove(&self, room_id: &RoomId) -> bool {
        let mut rooms = self.rooms.write().await;
        let removed = rooms.remove(room_id).is_some();
        if removed {
            log::info!("Removed room {room_id}");
        }
        removed
    }

    /// Forget rooms whose actors have stopped.
    async fn sweep(&self) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|room_id, handle| {
            let open = !handle.is_closed();
            if !open {
                log::debug!("Sweeping closed room {room_id}");
            }
            open
        });
    }

    async fn room(&self, room_id: &RoomId) -> RoomResponse<RoomHandle> {
        self.get_room(room_id)
            .await
            .ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))
    }

    /// Remove the room when nobody is left in it.
    async fn remove_if_empty(&self, handle: &RoomHandle) {
        if handle.is_closed() || handle.summary().player_count == 0 {
            self.remove(handle.room_id()).await;
        }
    }

    /// Open a new room with the directory's config and seat its creator.
    pub async fn create_and_join(
        &self,
        name: String,
        balance: Option<Chips>,
        connection: ConnectionId,
        outbox: Outbox,
    ) -> RoomResponse<Seat> {
        let handle = self.create_room(self.config.clone()).await?;
        let result = handle.join(name, balance, connection, outbox, true).await;
        if result.is_err() {
            // A rejected creator leaves an empty room behind.
            self.remove(handle.room_id()).await;
        }
        result
    }

    pub async fn join_room(
        &self,
        room_id: &RoomId,
        name: String,
        balance: Option<Chips>,
        connection: ConnectionId,
        outbox: Outbox,
    ) -> RoomResponse<Seat> {
        self.room(room_id)
            .await?
            .join(name, balance, connection, outbox, false)
            .await
    }

    /// Join any open room. Retries when the chosen room filled up or started
    /// before the join landed.
    pub async fn quick_join(
        &self,
        name: String,
        balance: Option<Chips>,
        connection: ConnectionId,
        outbox: Outbox,
    ) -> RoomResponse<Seat> {
        for _ in 0..QUICK_JOIN_ATTEMPTS {
            let handle = self.find_or_create().await?;
            match handle
                .join(name.clone(), balance, connection, outbox.clone(), false)
                .await
            {
                Err(
                    RoomError::User(UserError::RoomFull | UserError::GameAlreadyInProgress)
                    | RoomError::RoomClosed
                    | RoomError::ResponseDropped,
                ) => {
                    log::debug!("Room {} no longer open, retrying", handle.room_id());
                }
                result => {
                    if result.is_err() && handle.is_closed() {
                        // Nobody else got in before the rejected join closed it.
                        self.remove(handle.room_id()).await;
                    }
                    return result;
                }
            }
        }
        Err(UserError::NoRoomsAvailable.into())
    }

    /// Reclaim a seat with the token its previous connection was given.
    pub async fn rejoin(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        token: ReconnectToken,
        connection: ConnectionId,
        outbox: Outbox,
    ) -> RoomResponse<Seat> {
        self.room(room_id)
            .await?
            .rejoin(player_id, token, connection, outbox)
            .await
    }

    pub async fn leave_room(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        connection: ConnectionId,
    ) -> RoomResponse<()> {
        let handle = self.room(room_id).await?;
        let result = handle.leave(player_id, connection).await;
        self.remove_if_empty(&handle).await;
        result
    }

    /// Report a closed connection. Never fails: a missing room has nothing
    /// left to clean up.
    pub async fn disconnect(&self, room_id: &RoomId, player_id: PlayerId, connection: ConnectionId) {
        let Ok(handle) = self.room(room_id).await else {
            return;
        };
        if let Err(err) = handle.disconnect(player_id, connection).await {
            log::debug!("Disconnect from room {room_id}: {err}");
        }
        self.remove_if_empty(&handle).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn manager() -> RoomManager {
        RoomManager::new(RoomConfig {
            max_players: 2,
            ..Default::default()
        })
    }

    fn outbox() -> Outbox {
        mpsc::unbounded_channel().0
    }

    #[tokio::test]
    async fn test_create_room_ids_are_unique() {
        let manager = manager();
        let a = manager.create_room(RoomConfig::default()).await.unwrap();
        let b = manager.create_room(RoomConfig::default()).await.unwrap();
        assert_ne!(a.room_id(), b.room_id());
        assert!(manager.get_room(a.room_id()).await.is_some());
    }

    #[tokio::test]
    async fn test_create_room_rejects_invalid_config() {
        let manager = manager();
        let config = RoomConfig {
            max_players: 40,
            ..Default::default()
        };
        assert!(matches!(
            manager.create_room(config).await,
            Err(RoomError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_quick_join_fills_then_creates() {
        let manager = manager();
        let first = manager
            .quick_join("a".to_string(), None, ConnectionId::new(), outbox())
            .await
            .unwrap();
        let second = manager
            .quick_join("b".to_string(), None, ConnectionId::new(), outbox())
            .await
            .unwrap();
        let third = manager
            .quick_join("c".to_string(), None, ConnectionId::new(), outbox())
            .await
            .unwrap();

        assert_eq!(first.room_id, second.room_id);
        assert_ne!(first.room_id, third.room_id);
        assert_eq!(manager.active_room_count().await, 2);
    }

    #[tokio::test]
    async fn test_join_missing_room() {
        let manager = manager();
        let result = manager
            .join_room(
                &RoomId::from("NOPE00"),
                "a".to_string(),
                None,
                ConnectionId::new(),
                outbox(),
            )
            .await;
        assert!(matches!(result, Err(RoomError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_last_disconnect_removes_room() {
        let manager = manager();
        let connection = ConnectionId::new();
        let seat = manager
            .create_and_join("a".to_string(), None, connection, outbox())
            .await
            .unwrap();
        assert_eq!(manager.active_room_count().await, 1);

        manager
            .disconnect(&seat.room_id, seat.player_id, connection)
            .await;
        assert_eq!(manager.active_room_count().await, 0);
        assert!(manager.list_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_quick_join_leaves_no_room() {
        let manager = manager();
        let result = manager
            .quick_join("   ".to_string(), None, ConnectionId::new(), outbox())
            .await;
        assert!(matches!(
            result,
            Err(RoomError::User(UserError::InvalidName { .. }))
        ));
        assert_eq!(manager.active_room_count().await, 0);

        // The next quick join opens a fresh room rather than a dead one.
        let seat = manager
            .quick_join("a".to_string(), None, ConnectionId::new(), outbox())
            .await
            .unwrap();
        assert!(manager.get_room(&seat.room_id).await.is_some());
        assert_eq!(manager.active_room_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejoin_through_directory_needs_token() {
        let manager = manager();
        let connection = ConnectionId::new();
        let seat = manager
            .create_and_join("a".to_string(), None, connection, outbox())
            .await
            .unwrap();

        let result = manager
            .rejoin(
                &seat.room_id,
                seat.player_id,
                ReconnectToken::new(),
                ConnectionId::new(),
                outbox(),
            )
            .await;
        assert!(matches!(
            result,
            Err(RoomError::User(UserError::InvalidReconnectToken))
        ));

        let result = manager
            .leave_room(&seat.room_id, seat.player_id, ConnectionId::new())
            .await;
        assert!(matches!(
            result,
            Err(RoomError::User(UserError::SeatTakenOver))
        ));
        assert_eq!(manager.active_room_count().await, 1);

        manager
            .leave_room(&seat.room_id, seat.player_id, connection)
            .await
            .unwrap();
        assert_eq!(manager.active_room_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_room() {
        let manager = manager();
        let result = manager
            .create_and_join(String::new(), None, ConnectionId::new(), outbox())
            .await;
        assert!(matches!(
            result,
            Err(RoomError::User(UserError::InvalidName { .. }))
        ));
        assert_eq!(manager.active_room_count().await, 0);
    }
}
