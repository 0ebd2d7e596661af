// ── Stream registry ──
//
// One record per live stream id. All operations are idempotent and never
// fail: unknown ids are reported back, not raised.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use aether_api::StreamState;

use crate::model::StreamRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenResult {
    Inserted,
    Refreshed,
    Unchanged,
}

#[derive(Debug, Default)]
pub(crate) struct StreamRegistry {
    records: HashMap<String, StreamRecord>,
}

impl StreamRegistry {
    pub(crate) fn open(
        &mut self,
        id: String,
        target_host: String,
        target_port: u16,
        opened_at: DateTime<Utc>,
    ) -> OpenResult {
        if let Some(existing) = self.records.get_mut(&id) {
            if existing.target_host == target_host && existing.target_port == target_port {
                return OpenResult::Unchanged;
            }
            existing.target_host = target_host;
            existing.target_port = target_port;
            return OpenResult::Refreshed;
        }

        let record = StreamRecord::new(id.clone(), target_host, target_port, opened_at);
        self.records.insert(id, record);
        OpenResult::Inserted
    }

    /// Returns `false` if `id` is unknown.
    pub(crate) fn update(
        &mut self,
        id: &str,
        bytes_sent: Option<u64>,
        bytes_received: Option<u64>,
        state: Option<StreamState>,
    ) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };

        // counters are cumulative; a smaller value is a stale delivery
        if let Some(sent) = bytes_sent {
            record.bytes_sent = record.bytes_sent.max(sent);
        }
        if let Some(received) = bytes_received {
            record.bytes_received = record.bytes_received.max(received);
        }

        match state {
            Some(state) => record.state = state,
            None if record.state == StreamState::Opening => record.state = StreamState::Active,
            None => {}
        }
        true
    }

    /// Returns `false` if `id` was not present.
    pub(crate) fn close(&mut self, id: &str) -> bool {
        self.records.remove(id).is_some()
    }

    /// Replace every record not in `protected` with the snapshot's view.
    ///
    /// Ids in `protected` keep their event-derived state (including being
    /// absent). Everything else not listed in `snapshot` is dropped.
    pub(crate) fn merge_snapshot(
        &mut self,
        snapshot: Vec<StreamRecord>,
        protected: &HashSet<String>,
    ) {
        let listed: HashSet<String> = snapshot.iter().map(|r| r.id.clone()).collect();
        self.records
            .retain(|id, _| protected.contains(id) || listed.contains(id));

        for incoming in snapshot {
            if protected.contains(&incoming.id) {
                continue;
            }
            match self.records.get_mut(&incoming.id) {
                Some(existing) => {
                    let bytes_sent = existing.bytes_sent.max(incoming.bytes_sent);
                    let bytes_received = existing.bytes_received.max(incoming.bytes_received);
                    *existing = StreamRecord {
                        bytes_sent,
                        bytes_received,
                        ..incoming
                    };
                }
                None => {
                    self.records.insert(incoming.id.clone(), incoming);
                }
            }
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&StreamRecord> {
        self.records.get(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Ordered by open time, then id, so snapshots compare stably.
    pub(crate) fn to_vec(&self) -> Vec<StreamRecord> {
        let mut records: Vec<StreamRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then_with(|| a.id.cmp(&b.id)));
        records
    }
}
