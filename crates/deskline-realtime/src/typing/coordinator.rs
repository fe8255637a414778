//! Typing coordinator: who is typing in which room, with expiry.
//!
//! Each (room, user) pair moves `Absent → Typing → Absent`. A typing
//! signal inserts or refreshes the entry and re-arms its expiry timer; an
//! explicit stop or the timer removes it. Every signal stamps the entry
//! with a fresh epoch and the timer carries the epoch it was armed with,
//! so a timer that lost a race with a stop or a refresh removes nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, trace};

use deskline_core::types::{RoomId, UserId};

use crate::message::types::TypingPayload;
use crate::update::{SessionUpdate, UpdateHub};

use super::timer::ExpiryTimer;

/// One user's typing claim in a room.
#[derive(Debug)]
struct TypingEntry {
    user_id: UserId,
    user_name: String,
    epoch: u64,
    timer: ExpiryTimer,
}

/// Snapshot row returned to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUser {
    /// The typing user.
    pub user_id: UserId,
    /// Display name.
    pub user_name: String,
}

#[derive(Debug)]
struct TypingState {
    /// Room ID → entries in arrival order
    rooms: DashMap<RoomId, Vec<TypingEntry>>,
    /// Source of entry epochs; never reset, so epochs stay unique across clears
    epochs: AtomicU64,
    expiry: Duration,
    updates: UpdateHub,
}

/// Maintains and expires typing indicators for other users.
#[derive(Debug, Clone)]
pub struct TypingCoordinator {
    state: Arc<TypingState>,
}

impl TypingCoordinator {
    /// Creates a coordinator whose entries expire `expiry` after their last signal.
    pub fn new(expiry: Duration, updates: UpdateHub) -> Self {
        Self {
            state: Arc::new(TypingState {
                rooms: DashMap::new(),
                epochs: AtomicU64::new(1),
                expiry,
                updates,
            }),
        }
    }

    /// Handle a `user-typing` event.
    ///
    /// Inserts the entry or refreshes it in place (keeping its position),
    /// superseding any pending timer. Returns true for a new entry.
    /// Publishes an update when the entry is new or its display name changed.
    pub fn on_user_typing(&self, payload: TypingPayload) -> bool {
        let TypingPayload {
            chat_room_id,
            user_id,
            user_name,
        } = payload;

        let epoch = self.state.epochs.fetch_add(1, Ordering::Relaxed);
        let timer = self.arm(chat_room_id.clone(), user_id.clone(), epoch);

        let (inserted, renamed) = {
            let mut entries = self.state.rooms.entry(chat_room_id.clone()).or_default();
            match entries.iter_mut().find(|e| e.user_id == user_id) {
                Some(entry) => {
                    let renamed = entry.user_name != user_name;
                    entry.user_name = user_name;
                    entry.epoch = epoch;
                    // Replacing drops the old timer, which cancels it.
                    entry.timer = timer;
                    (false, renamed)
                }
                None => {
                    entries.push(TypingEntry {
                        user_id: user_id.clone(),
                        user_name,
                        epoch,
                        timer,
                    });
                    (true, false)
                }
            }
        };

        trace!(room_id = %chat_room_id, user_id = %user_id, epoch, inserted, renamed, "Typing signal");

        // A plain refresh leaves the visible list unchanged.
        if inserted || renamed {
            self.state.updates.publish(SessionUpdate::Typing {
                room_id: chat_room_id,
            });
        }
        inserted
    }

    /// Handle a `user-stopped-typing` event. Removing an absent entry is a no-op.
    pub fn on_user_stopped_typing(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        remove_entry(&self.state, room_id, user_id, None)
    }

    /// Users typing in `room_id`, in the order they started.
    pub fn typing_users_for(&self, room_id: &str) -> Vec<TypingUser> {
        self.state
            .rooms
            .get(room_id)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| TypingUser {
                        user_id: e.user_id.clone(),
                        user_name: e.user_name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `user_id` is currently typing in `room_id`.
    pub fn is_typing(&self, room_id: &str, user_id: &str) -> bool {
        self.state
            .rooms
            .get(room_id)
            .is_some_and(|entries| entries.iter().any(|e| e.user_id.as_str() == user_id))
    }

    /// Number of expiry timers still armed.
    pub fn pending_timers(&self) -> usize {
        self.state
            .rooms
            .iter()
            .map(|r| r.value().iter().filter(|e| e.timer.is_armed()).count())
            .sum()
    }

    /// Total number of typing entries across all rooms.
    pub fn entry_count(&self) -> usize {
        self.state.rooms.iter().map(|r| r.value().len()).sum()
    }

    /// Cancel every timer and drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = self.entry_count();
        // Dropping the entries drops their timers, cancelling them.
        self.state.rooms.clear();
        if removed > 0 {
            debug!(removed, "Typing state cleared");
            self.state.updates.publish(SessionUpdate::TypingCleared);
        }
        removed
    }

    fn arm(&self, room_id: RoomId, user_id: UserId, epoch: u64) -> ExpiryTimer {
        let state: Weak<TypingState> = Arc::downgrade(&self.state);
        ExpiryTimer::arm(self.state.expiry, move || {
            if let Some(state) = state.upgrade() {
                if remove_entry(&state, &room_id, &user_id, Some(epoch)) {
                    debug!(room_id = %room_id, user_id = %user_id, epoch, "Typing indicator expired");
                }
            }
        })
    }
}

/// Removes the (room, user) entry. With `epoch` set, only an entry stamped
/// with that epoch is removed.
fn remove_entry(
    state: &TypingState,
    room_id: &RoomId,
    user_id: &UserId,
    epoch: Option<u64>,
) -> bool {
    let removed = match state.rooms.get_mut(room_id) {
        Some(mut entries) => {
            let position = entries
                .iter()
                .position(|e| e.user_id == *user_id && epoch.is_none_or(|ep| e.epoch == ep));
            match position {
                Some(index) => {
                    let entry = entries.remove(index);
                    entry.timer.cancel();
                    true
                }
                None => false,
            }
        }
        None => false,
    };

    if removed {
        state.rooms.remove_if(room_id, |_, entries| entries.is_empty());
        state.updates.publish(SessionUpdate::Typing {
            room_id: room_id.clone(),
        });
    }
    removed
}
