use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle of an appointment. SCHEDULED is the initial state; CANCELLED is
/// a retained soft-delete; COMPLETED is set by the completion operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
}

/// Appointment record: a patient, a doctor, and a single instant in time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_time: OffsetDateTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: OffsetDateTime,
}

impl Appointment {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Appointment>> {
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, patient_id, doctor_id, appointment_time, reason, status, created_at
            FROM appointments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, patient_id, doctor_id, appointment_time, reason, status, created_at
            FROM appointments
            ORDER BY appointment_time
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_patient(db: &PgPool, patient_id: Uuid) -> anyhow::Result<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, patient_id, doctor_id, appointment_time, reason, status, created_at
            FROM appointments
            WHERE patient_id = $1
            ORDER BY appointment_time
            "#,
        )
        .bind(patient_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_doctor(db: &PgPool, doctor_id: Uuid) -> anyhow::Result<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, patient_id, doctor_id, appointment_time, reason, status, created_at
            FROM appointments
            WHERE doctor_id = $1
            ORDER BY appointment_time
            "#,
        )
        .bind(doctor_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Non-cancelled appointments of a doctor at exactly this instant.
    /// Equality on the timestamp, not interval overlap.
    pub async fn conflicts_by_doctor<'e>(
        exec: impl PgExecutor<'e>,
        doctor_id: Uuid,
        time: OffsetDateTime,
    ) -> anyhow::Result<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, patient_id, doctor_id, appointment_time, reason, status, created_at
            FROM appointments
            WHERE doctor_id = $1 AND appointment_time = $2 AND status <> 'CANCELLED'
            "#,
        )
        .bind(doctor_id)
        .bind(time)
        .fetch_all(exec)
        .await?;
        Ok(rows)
    }

    /// Non-cancelled appointments of a patient at exactly this instant.
    pub async fn conflicts_by_patient<'e>(
        exec: impl PgExecutor<'e>,
        patient_id: Uuid,
        time: OffsetDateTime,
    ) -> anyhow::Result<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, patient_id, doctor_id, appointment_time, reason, status, created_at
            FROM appointments
            WHERE patient_id = $1 AND appointment_time = $2 AND status <> 'CANCELLED'
            "#,
        )
        .bind(patient_id)
        .bind(time)
        .fetch_all(exec)
        .await?;
        Ok(rows)
    }

    pub async fn insert<'e>(
        exec: impl PgExecutor<'e>,
        patient_id: Uuid,
        doctor_id: Uuid,
        time: OffsetDateTime,
        reason: Option<&str>,
    ) -> anyhow::Result<Appointment> {
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (patient_id, doctor_id, appointment_time, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING id, patient_id, doctor_id, appointment_time, reason, status, created_at
            "#,
        )
        .bind(patient_id)
        .bind(doctor_id)
        .bind(time)
        .bind(reason)
        .fetch_one(exec)
        .await?;
        Ok(row)
    }

    pub async fn update<'e>(
        exec: impl PgExecutor<'e>,
        id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        time: OffsetDateTime,
        reason: Option<&str>,
    ) -> anyhow::Result<Appointment> {
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET patient_id = $2, doctor_id = $3, appointment_time = $4, reason = $5
            WHERE id = $1
            RETURNING id, patient_id, doctor_id, appointment_time, reason, status, created_at
            "#,
        )
        .bind(id)
        .bind(patient_id)
        .bind(doctor_id)
        .bind(time)
        .bind(reason)
        .fetch_one(exec)
        .await?;
        Ok(row)
    }

    pub async fn set_status(
        db: &PgPool,
        id: Uuid,
        status: AppointmentStatus,
    ) -> anyhow::Result<Appointment> {
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET status = $2
            WHERE id = $1
            RETURNING id, patient_id, doctor_id, appointment_time, reason, status, created_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(db)
        .await?;
        Ok(row)
    }
}
