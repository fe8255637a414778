//! Presence tracker: mirrors the server's set of online users.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;

use deskline_core::types::UserId;

use crate::message::types::PresencePayload;
use crate::update::{SessionUpdate, UpdateHub};

/// Tracks which users are currently online.
///
/// Membership is the online flag: a user is online exactly when present
/// in the set, and appears at most once.
#[derive(Debug)]
pub struct PresenceTracker {
    /// User ID → online entry
    online: DashMap<UserId, OnlineUser>,
    /// Arrival counter, used to keep snapshots in event order
    arrivals: AtomicU64,
    updates: UpdateHub,
}

impl PresenceTracker {
    /// Create a new presence tracker
    pub fn new(updates: UpdateHub) -> Self {
        Self {
            online: DashMap::new(),
            arrivals: AtomicU64::new(0),
            updates,
        }
    }

    /// Handle a `user-online` event. Returns false if the user was already online.
    pub fn on_user_online(&self, payload: PresencePayload) -> bool {
        let inserted = match self.online.entry(payload.user_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(OnlineUser {
                    user_id: payload.user_id.clone(),
                    user_name: payload.user_name,
                    since: Utc::now(),
                    arrival: self.arrivals.fetch_add(1, Ordering::Relaxed),
                });
                true
            }
        };

        if inserted {
            self.updates.publish(SessionUpdate::Presence {
                user_id: payload.user_id,
                online: true,
            });
        }
        inserted
    }

    /// Handle a `user-offline` event. Returns false if the user was not online.
    pub fn on_user_offline(&self, user_id: &UserId) -> bool {
        let removed = self.online.remove(user_id).is_some();
        if removed {
            self.updates.publish(SessionUpdate::Presence {
                user_id: user_id.clone(),
                online: false,
            });
        }
        removed
    }

    /// Check if a user is online
    pub fn is_online(&self, user_id: &str) -> bool {
        self.online.contains_key(user_id)
    }

    /// All online users in the order they came online
    pub fn online_users(&self) -> Vec<OnlineUser> {
        let mut users: Vec<OnlineUser> = self.online.iter().map(|r| r.value().clone()).collect();
        users.sort_by_key(|u| u.arrival);
        users
    }

    /// Get online user count
    pub fn online_count(&self) -> usize {
        self.online.len()
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let count = self.online.len();
        self.online.clear();
        if count > 0 {
            self.updates.publish(SessionUpdate::PresenceCleared);
        }
        count
    }
}

/// Online user info
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnlineUser {
    /// User ID
    pub user_id: UserId,
    /// Display name, if the server sent one
    pub user_name: Option<String>,
    /// When this session first saw the user online
    pub since: DateTime<Utc>,
    #[serde(skip)]
    arrival: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn online(id: &str) -> PresencePayload {
        PresencePayload {
            user_id: UserId::from(id),
            user_name: None,
        }
    }

    fn tracker() -> PresenceTracker {
        PresenceTracker::new(UpdateHub::new(16))
    }

    #[test]
    fn test_online_is_idempotent() {
        let presence = tracker();
        assert!(presence.on_user_online(online("u1")));
        assert!(!presence.on_user_online(online("u1")));
        assert_eq!(presence.online_count(), 1);
        assert!(presence.is_online("u1"));
    }

    #[test]
    fn test_offline_absent_is_noop() {
        let presence = tracker();
        assert!(!presence.on_user_offline(&UserId::from("ghost")));
        assert_eq!(presence.online_count(), 0);
    }

    #[test]
    fn test_net_effect_of_sequence() {
        let presence = tracker();
        presence.on_user_online(online("u1"));
        presence.on_user_online(online("u2"));
        presence.on_user_offline(&UserId::from("u1"));
        presence.on_user_online(online("u3"));
        presence.on_user_online(online("u1"));
        presence.on_user_online(online("u2"));

        let ids: Vec<String> = presence
            .online_users()
            .into_iter()
            .map(|u| u.user_id.into_inner())
            .collect();
        assert_eq!(ids, vec!["u2", "u3", "u1"]);
    }

    #[test]
    fn test_clear_publishes_once() {
        let hub = UpdateHub::new(16);
        let presence = PresenceTracker::new(hub.clone());
        presence.on_user_online(online("u1"));
        let mut rx = hub.subscribe();

        assert_eq!(presence.clear(), 1);
        assert_eq!(presence.clear(), 0);
        assert_eq!(rx.try_recv().unwrap(), SessionUpdate::PresenceCleared);
        assert!(rx.try_recv().is_err());
        assert!(!presence.is_online("u1"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn online_set_matches_net_effect_of_events(
                ops in proptest::collection::vec((any::<bool>(), 0u8..5), 1..64)
            ) {
                let presence = tracker();
                let mut model: Vec<String> = Vec::new();

                for (goes_online, user) in ops {
                    let id = format!("u{user}");
                    if goes_online {
                        let fresh = !model.contains(&id);
                        prop_assert_eq!(presence.on_user_online(online(&id)), fresh);
                        if fresh {
                            model.push(id);
                        }
                    } else {
                        let known = model.contains(&id);
                        prop_assert_eq!(presence.on_user_offline(&UserId::from(id.as_str())), known);
                        model.retain(|m| m != &id);
                    }
                }

                let ids: Vec<String> = presence
                    .online_users()
                    .into_iter()
                    .map(|u| u.user_id.into_inner())
                    .collect();
                let unique: std::collections::HashSet<&String> = ids.iter().collect();
                prop_assert_eq!(unique.len(), ids.len());
                prop_assert_eq!(&ids, &model);
                prop_assert_eq!(presence.online_count(), model.len());
                for user in 0u8..5 {
                    let id = format!("u{user}");
                    prop_assert_eq!(presence.is_online(&id), model.contains(&id));
                }
            }
        }
    }
}
