//! Backend selection for the persistent stores.
//!
//! Session codes and the ledger live in Postgres when a database is configured
//! and in memory otherwise. Challenges are always in memory.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;

use rollcall_domain::attendance::DateRange;
use rollcall_domain::id::{ParticipantId, SessionId};

use crate::domain::repository::{AttendanceRepository, SessionCodeRepository};
use crate::domain::types::{AttendanceKey, AttendanceRecord, SessionCode, UpsertOutcome};
use crate::error::AttendanceServiceError;
use crate::infra::db::{DbAttendanceRepository, DbSessionCodeRepository};
use crate::infra::memory::{MemoryLedger, MemorySessionCodeStore};

// ── Session codes ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum SessionCodeStore {
    Memory(MemorySessionCodeStore),
    Db(DbSessionCodeRepository),
}

impl SessionCodeStore {
    pub fn memory() -> Self {
        Self::Memory(MemorySessionCodeStore::new())
    }

    pub fn db(db: DatabaseConnection) -> Self {
        Self::Db(DbSessionCodeRepository { db })
    }
}

impl SessionCodeRepository for SessionCodeStore {
    async fn insert_if_absent(&self, code: &SessionCode) -> Result<bool, AttendanceServiceError> {
        match self {
            Self::Memory(s) => s.insert_if_absent(code).await,
            Self::Db(s) => s.insert_if_absent(code).await,
        }
    }

    async fn find(&self, code: &str) -> Result<Option<SessionCode>, AttendanceServiceError> {
        match self {
            Self::Memory(s) => s.find(code).await,
            Self::Db(s) => s.find(code).await,
        }
    }

    async fn deactivate(&self, code: &str) -> Result<bool, AttendanceServiceError> {
        match self {
            Self::Memory(s) => s.deactivate(code).await,
            Self::Db(s) => s.deactivate(code).await,
        }
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, AttendanceServiceError> {
        match self {
            Self::Memory(s) => s.deactivate_expired(now).await,
            Self::Db(s) => s.deactivate_expired(now).await,
        }
    }

    async fn has_presentable(
        &self,
        session: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<bool, AttendanceServiceError> {
        match self {
            Self::Memory(s) => s.has_presentable(session, now).await,
            Self::Db(s) => s.has_presentable(session, now).await,
        }
    }

    async fn count_active(&self) -> Result<u64, AttendanceServiceError> {
        match self {
            Self::Memory(s) => s.count_active().await,
            Self::Db(s) => s.count_active().await,
        }
    }
}

// ── Ledger ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum LedgerStore {
    Memory(MemoryLedger),
    Db(DbAttendanceRepository),
}

impl LedgerStore {
    pub fn memory() -> Self {
        Self::Memory(MemoryLedger::new())
    }

    pub fn db(db: DatabaseConnection) -> Self {
        Self::Db(DbAttendanceRepository { db })
    }
}

impl AttendanceRepository for LedgerStore {
    async fn upsert(
        &self,
        record: &AttendanceRecord,
    ) -> Result<UpsertOutcome, AttendanceServiceError> {
        match self {
            Self::Memory(l) => l.upsert(record).await,
            Self::Db(l) => l.upsert(record).await,
        }
    }

    async fn find(
        &self,
        key: &AttendanceKey,
    ) -> Result<Option<AttendanceRecord>, AttendanceServiceError> {
        match self {
            Self::Memory(l) => l.find(key).await,
            Self::Db(l) => l.find(key).await,
        }
    }

    async fn list_for_participant(
        &self,
        participant: &ParticipantId,
        session: Option<&SessionId>,
        range: DateRange,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        match self {
            Self::Memory(l) => l.list_for_participant(participant, session, range).await,
            Self::Db(l) => l.list_for_participant(participant, session, range).await,
        }
    }

    async fn list_for_session(
        &self,
        session: &SessionId,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        match self {
            Self::Memory(l) => l.list_for_session(session, date).await,
            Self::Db(l) => l.list_for_session(session, date).await,
        }
    }

    async fn count(&self) -> Result<u64, AttendanceServiceError> {
        match self {
            Self::Memory(l) => l.count().await,
            Self::Db(l) => l.count().await,
        }
    }
}
