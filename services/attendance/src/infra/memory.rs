//! Single-node in-memory stores.
//!
//! Each store guards its map with one mutex held only for the synchronous
//! read-modify-write, so operations on the same key are serialized and never
//! observed half-applied.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};

use rollcall_domain::attendance::DateRange;
use rollcall_domain::id::{ParticipantId, SessionId};

use crate::domain::repository::{
    AttendanceRepository, ChallengeRepository, SessionCodeRepository,
};
use crate::domain::types::{
    AttendanceKey, AttendanceRecord, SessionCode, UpsertOutcome, VerificationChallenge,
};
use crate::error::AttendanceServiceError;

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, AttendanceServiceError> {
    m.lock()
        .map_err(|_| AttendanceServiceError::Storage(anyhow!("in-memory store lock poisoned")))
}

// ── Challenges ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryChallengeStore {
    inner: Arc<Mutex<HashMap<String, VerificationChallenge>>>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChallengeRepository for MemoryChallengeStore {
    async fn put(&self, challenge: VerificationChallenge) -> Result<(), AttendanceServiceError> {
        lock(&self.inner)?.insert(challenge.address.clone(), challenge);
        Ok(())
    }

    async fn find(
        &self,
        address: &str,
    ) -> Result<Option<VerificationChallenge>, AttendanceServiceError> {
        Ok(lock(&self.inner)?.get(address).cloned())
    }

    async fn update<F, T>(&self, address: &str, f: F) -> Result<T, AttendanceServiceError>
    where
        F: FnOnce(&mut Option<VerificationChallenge>) -> T + Send,
        T: Send,
    {
        let mut map = lock(&self.inner)?;
        let mut slot = map.remove(address);
        let out = f(&mut slot);
        if let Some(challenge) = slot {
            map.insert(address.to_owned(), challenge);
        }
        Ok(out)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AttendanceServiceError> {
        let mut map = lock(&self.inner)?;
        let before = map.len();
        map.retain(|_, c| !c.is_expired(now));
        Ok((before - map.len()) as u64)
    }

    async fn count(&self) -> Result<u64, AttendanceServiceError> {
        Ok(lock(&self.inner)?.len() as u64)
    }
}

// ── Session codes ────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemorySessionCodeStore {
    inner: Arc<Mutex<HashMap<String, SessionCode>>>,
}

impl MemorySessionCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCodeRepository for MemorySessionCodeStore {
    async fn insert_if_absent(&self, code: &SessionCode) -> Result<bool, AttendanceServiceError> {
        match lock(&self.inner)?.entry(code.code.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(code.clone());
                Ok(true)
            }
        }
    }

    async fn find(&self, code: &str) -> Result<Option<SessionCode>, AttendanceServiceError> {
        Ok(lock(&self.inner)?.get(code).cloned())
    }

    async fn deactivate(&self, code: &str) -> Result<bool, AttendanceServiceError> {
        let mut map = lock(&self.inner)?;
        Ok(match map.get_mut(code) {
            Some(stored) if stored.active => {
                stored.active = false;
                true
            }
            _ => false,
        })
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, AttendanceServiceError> {
        let mut map = lock(&self.inner)?;
        let mut flipped = 0;
        for stored in map.values_mut() {
            if stored.active && stored.is_expired(now) {
                stored.active = false;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn has_presentable(
        &self,
        session: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<bool, AttendanceServiceError> {
        Ok(lock(&self.inner)?
            .values()
            .any(|c| &c.session_id == session && c.is_presentable(now)))
    }

    async fn count_active(&self) -> Result<u64, AttendanceServiceError> {
        Ok(lock(&self.inner)?.values().filter(|c| c.active).count() as u64)
    }
}

// ── Ledger ───────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<HashMap<AttendanceKey, AttendanceRecord>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Most recent date first, then session id.
fn sort_for_query(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
}

impl AttendanceRepository for MemoryLedger {
    async fn upsert(
        &self,
        record: &AttendanceRecord,
    ) -> Result<UpsertOutcome, AttendanceServiceError> {
        let previous = lock(&self.inner)?.insert(record.key(), record.clone());
        Ok(match previous {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Created,
        })
    }

    async fn find(
        &self,
        key: &AttendanceKey,
    ) -> Result<Option<AttendanceRecord>, AttendanceServiceError> {
        Ok(lock(&self.inner)?.get(key).cloned())
    }

    async fn list_for_participant(
        &self,
        participant: &ParticipantId,
        session: Option<&SessionId>,
        range: DateRange,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        let mut records: Vec<_> = lock(&self.inner)?
            .values()
            .filter(|r| &r.participant_id == participant)
            .filter(|r| session.is_none_or(|s| &r.session_id == s))
            .filter(|r| range.contains(r.date))
            .cloned()
            .collect();
        sort_for_query(&mut records);
        Ok(records)
    }

    async fn list_for_session(
        &self,
        session: &SessionId,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        let mut records: Vec<_> = lock(&self.inner)?
            .values()
            .filter(|r| &r.session_id == session && r.date == date)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        Ok(records)
    }

    async fn count(&self) -> Result<u64, AttendanceServiceError> {
        Ok(lock(&self.inner)?.len() as u64)
    }
}
