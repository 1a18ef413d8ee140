use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::appointments::repo::AppointmentStatus;

/// Request body for creating or updating an appointment.
#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub appointment_time: OffsetDateTime,
    pub reason: Option<String>,
}

/// Full medical view of the patient, shown to ADMIN and DOCTOR callers.
/// A missing profile row degrades to a struct of `None`s.
#[derive(Debug, Serialize)]
pub struct PatientInfo {
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

/// Full professional view of the doctor, shown to ADMIN and DOCTOR callers.
#[derive(Debug, Serialize)]
pub struct DoctorInfo {
    pub doctor_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub work_time: Option<String>,
}

/// What a PATIENT caller may see of the doctor: name and specialty only.
#[derive(Debug, Serialize)]
pub struct LimitedDoctorInfo {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty: Option<String>,
}

/// Role-projected appointment view. Exactly one of the profile sections is
/// populated depending on the caller's role.
#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub appointment_time: OffsetDateTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_info: Option<PatientInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_info: Option<DoctorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limited_doctor_info: Option<LimitedDoctorInfo>,
}
