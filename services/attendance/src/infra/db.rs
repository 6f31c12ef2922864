use anyhow::{Context as _, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, Statement, sea_query::Expr,
    sea_query::OnConflict,
};

use rollcall_attendance_schema::{attendance_records, session_codes};
use rollcall_domain::attendance::{AttendanceStatus, DateRange, GeoPoint};
use rollcall_domain::id::{IssuerId, ParticipantId, SessionId};

use crate::domain::repository::{AttendanceRepository, SessionCodeRepository};
use crate::domain::types::{AttendanceKey, AttendanceRecord, SessionCode, UpsertOutcome};
use crate::error::AttendanceServiceError;

// ── Session code repository ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionCodeRepository {
    pub db: DatabaseConnection,
}

impl SessionCodeRepository for DbSessionCodeRepository {
    async fn insert_if_absent(&self, code: &SessionCode) -> Result<bool, AttendanceServiceError> {
        let model = session_codes::ActiveModel {
            code: Set(code.code.clone()),
            session_id: Set(code.session_id.to_string()),
            issuer_id: Set(code.issuer_id.to_string()),
            issued_at: Set(code.issued_at),
            expires_at: Set(code.expires_at),
            active: Set(code.active),
        };
        let inserted = session_codes::Entity::insert(model)
            .on_conflict(
                OnConflict::column(session_codes::Column::Code)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;
        match inserted {
            Ok(rows) => Ok(rows == 1),
            // sea-orm reports a fully skipped insert as RecordNotInserted.
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) => Err(anyhow::Error::new(e).context("insert session code").into()),
        }
    }

    async fn find(&self, code: &str) -> Result<Option<SessionCode>, AttendanceServiceError> {
        let model = session_codes::Entity::find_by_id(code.to_owned())
            .one(&self.db)
            .await
            .context("find session code")?;
        model.map(session_code_from_model).transpose()
    }

    async fn deactivate(&self, code: &str) -> Result<bool, AttendanceServiceError> {
        let result = session_codes::Entity::update_many()
            .col_expr(session_codes::Column::Active, Expr::value(false))
            .filter(session_codes::Column::Code.eq(code))
            .filter(session_codes::Column::Active.eq(true))
            .exec(&self.db)
            .await
            .context("deactivate session code")?;
        Ok(result.rows_affected > 0)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, AttendanceServiceError> {
        let result = session_codes::Entity::update_many()
            .col_expr(session_codes::Column::Active, Expr::value(false))
            .filter(session_codes::Column::Active.eq(true))
            .filter(session_codes::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .context("deactivate expired session codes")?;
        Ok(result.rows_affected)
    }

    async fn has_presentable(
        &self,
        session: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<bool, AttendanceServiceError> {
        let count = session_codes::Entity::find()
            .filter(session_codes::Column::SessionId.eq(session.as_str()))
            .filter(session_codes::Column::Active.eq(true))
            .filter(session_codes::Column::ExpiresAt.gt(now))
            .count(&self.db)
            .await
            .context("count presentable session codes")?;
        Ok(count > 0)
    }

    async fn count_active(&self) -> Result<u64, AttendanceServiceError> {
        let count = session_codes::Entity::find()
            .filter(session_codes::Column::Active.eq(true))
            .count(&self.db)
            .await
            .context("count active session codes")?;
        Ok(count)
    }
}

fn session_code_from_model(
    model: session_codes::Model,
) -> Result<SessionCode, AttendanceServiceError> {
    Ok(SessionCode {
        session_id: SessionId::new(model.session_id).context("stored session id")?,
        issuer_id: IssuerId::new(model.issuer_id).context("stored issuer id")?,
        code: model.code,
        issued_at: model.issued_at,
        expires_at: model.expires_at,
        active: model.active,
    })
}

// ── Attendance repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAttendanceRepository {
    pub db: DatabaseConnection,
}

impl AttendanceRepository for DbAttendanceRepository {
    async fn upsert(
        &self,
        record: &AttendanceRecord,
    ) -> Result<UpsertOutcome, AttendanceServiceError> {
        #[derive(Debug, FromQueryResult)]
        struct UpsertRow {
            inserted: bool,
        }

        let row = UpsertRow::find_by_statement(upsert_statement(record))
            .one(&self.db)
            .await
            .context("upsert attendance record")?
            .ok_or_else(|| anyhow!("attendance upsert returned no row"))?;

        Ok(if row.inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn find(
        &self,
        key: &AttendanceKey,
    ) -> Result<Option<AttendanceRecord>, AttendanceServiceError> {
        let model = attendance_records::Entity::find_by_id((
            key.participant_id.to_string(),
            key.session_id.to_string(),
            key.date,
        ))
        .one(&self.db)
        .await
        .context("find attendance record")?;
        model.map(record_from_model).transpose()
    }

    async fn list_for_participant(
        &self,
        participant: &ParticipantId,
        session: Option<&SessionId>,
        range: DateRange,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        let mut query = attendance_records::Entity::find()
            .filter(attendance_records::Column::ParticipantId.eq(participant.as_str()));
        if let Some(session) = session {
            query = query.filter(attendance_records::Column::SessionId.eq(session.as_str()));
        }
        if let Some(start) = range.start() {
            query = query.filter(attendance_records::Column::Date.gte(start));
        }
        if let Some(end) = range.end() {
            query = query.filter(attendance_records::Column::Date.lte(end));
        }
        let models = query
            .order_by_desc(attendance_records::Column::Date)
            .order_by_asc(attendance_records::Column::SessionId)
            .all(&self.db)
            .await
            .context("list attendance for participant")?;
        models.into_iter().map(record_from_model).collect()
    }

    async fn list_for_session(
        &self,
        session: &SessionId,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        let models = attendance_records::Entity::find()
            .filter(attendance_records::Column::SessionId.eq(session.as_str()))
            .filter(attendance_records::Column::Date.eq(date))
            .order_by_asc(attendance_records::Column::ParticipantId)
            .all(&self.db)
            .await
            .context("list attendance for session")?;
        models.into_iter().map(record_from_model).collect()
    }

    async fn count(&self) -> Result<u64, AttendanceServiceError> {
        let count = attendance_records::Entity::find()
            .count(&self.db)
            .await
            .context("count attendance records")?;
        Ok(count)
    }
}

// `xmax = 0` holds only for a row version this statement inserted, so the
// outcome comes from the write itself and concurrent first writes agree.
const UPSERT_ATTENDANCE_SQL: &str = r#"
    INSERT INTO attendance_records
        (participant_id, session_id, date, status, recorded_at, recorded_by, latitude, longitude)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (participant_id, session_id, date) DO UPDATE SET
        status = EXCLUDED.status,
        recorded_at = EXCLUDED.recorded_at,
        recorded_by = EXCLUDED.recorded_by,
        latitude = EXCLUDED.latitude,
        longitude = EXCLUDED.longitude
    RETURNING (xmax = 0) AS inserted
"#;

fn upsert_statement(record: &AttendanceRecord) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        UPSERT_ATTENDANCE_SQL,
        [
            record.participant_id.to_string().into(),
            record.session_id.to_string().into(),
            record.date.into(),
            record.status.as_str().into(),
            record.recorded_at.into(),
            record.recorded_by.to_string().into(),
            record.location.map(|g| g.latitude).into(),
            record.location.map(|g| g.longitude).into(),
        ],
    )
}

fn record_from_model(
    model: attendance_records::Model,
) -> Result<AttendanceRecord, AttendanceServiceError> {
    let location = match (model.latitude, model.longitude) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon).context("stored geolocation")?),
        (None, None) => None,
        _ => return Err(anyhow!("stored geolocation has only one coordinate").into()),
    };
    Ok(AttendanceRecord {
        participant_id: ParticipantId::new(model.participant_id).context("stored participant id")?,
        session_id: SessionId::new(model.session_id).context("stored session id")?,
        date: model.date,
        status: model.status.parse::<AttendanceStatus>().context("stored attendance status")?,
        recorded_at: model.recorded_at,
        recorded_by: model.recorded_by.into(),
        location,
    })
}
