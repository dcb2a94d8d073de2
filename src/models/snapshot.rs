use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

// On-disk form of the backup document. Identities are kept sorted and usage
// keys stringified so that load -> save -> load round-trips byte-identical.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub authorized_users: Vec<i64>,
    pub user_usage: BTreeMap<String, u32>,
}

/// In-memory mirror of the snapshot: the authorized-user set and the per-user
/// daily query counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistryState {
    pub authorized: HashSet<i64>,
    pub usage: HashMap<i64, u32>,
}

impl RegistryState {
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let authorized = snapshot.authorized_users.into_iter().collect();
        let usage = snapshot
            .user_usage
            .into_iter()
            .filter_map(|(id, count)| id.parse::<i64>().ok().map(|id| (id, count)))
            .collect();
        Self { authorized, usage }
    }

    pub fn to_snapshot(&self) -> Snapshot {
        let mut authorized_users: Vec<i64> = self.authorized.iter().copied().collect();
        authorized_users.sort_unstable();
        let user_usage = self
            .usage
            .iter()
            .map(|(id, count)| (id.to_string(), *count))
            .collect();
        Snapshot {
            authorized_users,
            user_usage,
        }
    }
}
