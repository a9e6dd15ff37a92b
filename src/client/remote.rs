//! Tracking of non-local players: never predicted, just snapped to the
//! latest snapshot.

use std::collections::HashMap;

use crate::player::PlayerId;
use crate::wire::binary::Snapshot;

/// A remote player's last-known authoritative state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteState {
    pub pos: [f32; 3],
    pub vel: [f32; 3],
    pub yaw: f32,
    pub is_grounded: bool,
    pub is_flying: bool,
}

/// Remote players seen locally are removed once they've been missing from
/// this many consecutive snapshots — one send interval is one snapshot.
const MISSING_INTERVALS_BEFORE_REMOVE: u32 = 1;

/// Tracks every non-local player the client currently believes is present.
#[derive(Default)]
pub struct RemoteRoster {
    players: HashMap<PlayerId, RemoteState>,
    missing_streak: HashMap<PlayerId, u32>,
}

/// What changed as a result of applying one snapshot.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RosterDelta {
    pub spawned: Vec<PlayerId>,
    pub removed: Vec<PlayerId>,
}

impl RemoteRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&RemoteState> {
        self.players.get(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Applies one snapshot, excluding `local_id`. Every player present in
    /// the snapshot is snapped to its reported state (spawning it if new);
    /// every previously-known player absent from the snapshot accrues one
    /// missing tick and is dropped once it crosses the threshold.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot, local_id: &str) -> RosterDelta {
        let mut delta = RosterDelta::default();
        let mut seen = std::collections::HashSet::new();

        for player in &snapshot.players {
            if player.id == local_id {
                continue;
            }
            seen.insert(player.id.clone());
            self.missing_streak.remove(&player.id);
            let state = RemoteState {
                pos: player.pos,
                vel: player.vel,
                yaw: player.yaw,
                is_grounded: player.is_grounded,
                is_flying: player.is_flying,
            };
            if self.players.insert(player.id.clone(), state).is_none() {
                delta.spawned.push(player.id.clone());
            }
        }

        let known: Vec<PlayerId> = self.players.keys().cloned().collect();
        for id in known {
            if seen.contains(&id) {
                continue;
            }
            let streak = self.missing_streak.entry(id.clone()).or_insert(0);
            *streak += 1;
            if *streak >= MISSING_INTERVALS_BEFORE_REMOVE {
                self.players.remove(&id);
                self.missing_streak.remove(&id);
                delta.removed.push(id);
            }
        }

        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::binary::PlayerState;

    fn player(id: &str) -> PlayerState {
        PlayerState {
            id: id.to_string(),
            pos: [0.0, 64.0, 0.0],
            vel: [0.0, 0.0, 0.0],
            yaw: 0.0,
            is_grounded: true,
            is_flying: false,
            last_ack: 0,
        }
    }

    #[test]
    fn new_player_is_spawned() {
        let mut roster = RemoteRoster::new();
        let snapshot = Snapshot { tick: 1, players: vec![player("a")] };
        let delta = roster.apply_snapshot(&snapshot, "local");
        assert_eq!(delta.spawned, vec!["a".to_string()]);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn local_player_is_excluded_from_roster() {
        let mut roster = RemoteRoster::new();
        let snapshot = Snapshot { tick: 1, players: vec![player("local")] };
        let delta = roster.apply_snapshot(&snapshot, "local");
        assert!(delta.spawned.is_empty());
        assert!(roster.is_empty());
    }

    #[test]
    fn missing_for_one_interval_is_removed() {
        let mut roster = RemoteRoster::new();
        roster.apply_snapshot(&Snapshot { tick: 1, players: vec![player("a")] }, "local");
        assert_eq!(roster.len(), 1);

        let delta = roster.apply_snapshot(&Snapshot { tick: 2, players: vec![] }, "local");
        assert_eq!(delta.removed, vec!["a".to_string()]);
        assert!(roster.is_empty());
    }

    #[test]
    fn reappearing_player_resets_missing_streak() {
        let mut roster = RemoteRoster::new();
        roster.apply_snapshot(&Snapshot { tick: 1, players: vec![player("a")] }, "local");
        roster.apply_snapshot(&Snapshot { tick: 2, players: vec![player("a")] }, "local");
        assert_eq!(roster.len(), 1);
        assert!(roster.get("a").is_some());
    }
}
