use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Medical profile of a patient. Optional one-to-one extension of a user row;
/// may not exist yet, which is not an error.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PatientProfile {
    pub patient_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub symptom: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub current_medications: Option<String>,
    pub triage_priority: Option<String>,
}

/// Administrative profile of an admin user. Stored alongside the other two
/// profile tables; no appointment projection reads it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminProfile {
    pub admin_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub audit_logs: Option<String>,
    pub permissions: Option<String>,
}

/// Professional profile of a doctor. Same optional one-to-one shape.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorProfile {
    pub doctor_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub work_time: Option<String>,
}

impl PatientProfile {
    pub async fn find_by_patient_id(db: &PgPool, patient_id: Uuid) -> anyhow::Result<Option<Self>> {
        let profile = sqlx::query_as::<_, PatientProfile>(
            r#"
            SELECT patient_id, first_name, last_name, age, gender, symptom,
                   medical_history, allergies, current_medications, triage_priority
            FROM patient_profiles
            WHERE patient_id = $1
            "#,
        )
        .bind(patient_id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }
}

impl AdminProfile {
    pub async fn find_by_admin_id(db: &PgPool, admin_id: Uuid) -> anyhow::Result<Option<Self>> {
        let profile = sqlx::query_as::<_, AdminProfile>(
            r#"
            SELECT admin_id, first_name, last_name, audit_logs, permissions
            FROM admin_profiles
            WHERE admin_id = $1
            "#,
        )
        .bind(admin_id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }
}

impl DoctorProfile {
    pub async fn find_by_doctor_id(db: &PgPool, doctor_id: Uuid) -> anyhow::Result<Option<Self>> {
        let profile = sqlx::query_as::<_, DoctorProfile>(
            r#"
            SELECT doctor_id, first_name, last_name, specialty, license_number, work_time
            FROM doctor_profiles
            WHERE doctor_id = $1
            "#,
        )
        .bind(doctor_id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }
}
