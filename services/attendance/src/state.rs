use axum::extract::FromRef;
use sea_orm::DatabaseConnection;

use rollcall_auth_types::identity::TokenSecret;
use rollcall_core::clock::SharedClock;

use crate::config::Tunables;
use crate::infra::memory::MemoryChallengeStore;
use crate::infra::outbox::OutboxNotifier;
use crate::infra::store::{LedgerStore, SessionCodeStore};
use crate::usecase::sweep::SweepUseCase;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub challenges: MemoryChallengeStore,
    pub session_codes: SessionCodeStore,
    pub ledger: LedgerStore,
    pub notifier: OutboxNotifier,
    pub clock: SharedClock,
    pub tunables: Tunables,
    pub jwt_secret: TokenSecret,
    pub cookie_domain: String,
}

impl AppState {
    /// State backed entirely by in-memory stores.
    pub fn in_memory(
        notifier: OutboxNotifier,
        clock: SharedClock,
        tunables: Tunables,
        jwt_secret: TokenSecret,
        cookie_domain: String,
    ) -> Self {
        Self {
            challenges: MemoryChallengeStore::new(),
            session_codes: SessionCodeStore::memory(),
            ledger: LedgerStore::memory(),
            notifier,
            clock,
            tunables,
            jwt_secret,
            cookie_domain,
        }
    }

    /// Same as [`AppState::in_memory`] but with session codes and the ledger in Postgres.
    pub fn with_database(
        db: DatabaseConnection,
        notifier: OutboxNotifier,
        clock: SharedClock,
        tunables: Tunables,
        jwt_secret: TokenSecret,
        cookie_domain: String,
    ) -> Self {
        Self {
            session_codes: SessionCodeStore::db(db.clone()),
            ledger: LedgerStore::db(db),
            ..Self::in_memory(notifier, clock, tunables, jwt_secret, cookie_domain)
        }
    }

    pub fn challenge_repo(&self) -> MemoryChallengeStore {
        self.challenges.clone()
    }

    pub fn session_code_repo(&self) -> SessionCodeStore {
        self.session_codes.clone()
    }

    pub fn ledger_repo(&self) -> LedgerStore {
        self.ledger.clone()
    }

    pub fn sweep_usecase(&self) -> SweepUseCase<MemoryChallengeStore, SessionCodeStore> {
        SweepUseCase {
            challenges: self.challenge_repo(),
            codes: self.session_code_repo(),
            clock: self.clock.clone(),
        }
    }
}

impl FromRef<AppState> for TokenSecret {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_secret.clone()
    }
}
