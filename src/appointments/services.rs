use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::appointments::dto::{
    AppointmentRequest, AppointmentResponse, DoctorInfo, LimitedDoctorInfo, PatientInfo,
};
use crate::appointments::repo::{Appointment, AppointmentStatus};
use crate::auth::jwt::CurrentUser;
use crate::auth::repo::{User, UserRole};
use crate::error::ApiError;
use crate::profiles::repo::{DoctorProfile, PatientProfile};

// ------------- create -------------- //

/// Create a new appointment on behalf of the caller.
///
/// Patients may only book for themselves, doctors only for their own
/// schedule, admins for anyone. Both referenced users must exist with the
/// matching role, the time must be in the future, and neither party may
/// already hold a non-cancelled appointment at that exact instant.
pub async fn create_appointment(
    db: &PgPool,
    req: &AppointmentRequest,
    caller: CurrentUser,
) -> Result<AppointmentResponse, ApiError> {
    let caller_user = User::find_by_id(db, caller.id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    match caller_user.role {
        UserRole::Patient => {
            if req.patient_id != caller_user.id {
                return Err(ApiError::Forbidden(
                    "Patients can only create appointments for themselves".into(),
                ));
            }
        }
        UserRole::Doctor => {
            if req.doctor_id != caller_user.id {
                return Err(ApiError::Forbidden(
                    "Doctors can only create appointments for themselves".into(),
                ));
            }
        }
        UserRole::Admin => {}
    }

    resolve_patient(db, req.patient_id).await?;
    resolve_doctor(db, req.doctor_id).await?;

    ensure_future(req.appointment_time)?;

    // Conflict check and insert share one transaction so a conflicting row
    // committed in between is at least bounded by the store's isolation.
    let mut tx = db.begin().await.map_err(ApiError::from)?;
    check_time_conflicts(&mut tx, req.appointment_time, req.doctor_id, req.patient_id, None)
        .await?;
    let appointment = Appointment::insert(
        &mut *tx,
        req.patient_id,
        req.doctor_id,
        req.appointment_time,
        req.reason.as_deref(),
    )
    .await?;
    tx.commit().await.map_err(ApiError::from)?;

    info!(
        appointment_id = %appointment.id,
        patient_id = %appointment.patient_id,
        doctor_id = %appointment.doctor_id,
        "appointment created"
    );
    respond(db, appointment, caller_user.role).await
}

// ------------- read -------------- //

/// All appointments visible to the caller: own bookings for patients, own
/// schedule for doctors, everything for admins.
pub async fn get_appointments(
    db: &PgPool,
    caller: CurrentUser,
) -> Result<Vec<AppointmentResponse>, ApiError> {
    let caller_user = User::find_by_id(db, caller.id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    let appointments = match caller_user.role {
        UserRole::Patient => Appointment::list_by_patient(db, caller_user.id).await?,
        UserRole::Doctor => Appointment::list_by_doctor(db, caller_user.id).await?,
        UserRole::Admin => Appointment::list_all(db).await?,
    };

    let mut views = Vec::with_capacity(appointments.len());
    for appointment in appointments {
        views.push(respond(db, appointment, caller_user.role).await?);
    }
    Ok(views)
}

pub async fn get_appointment_by_id(
    db: &PgPool,
    appointment_id: Uuid,
    caller: CurrentUser,
) -> Result<AppointmentResponse, ApiError> {
    let appointment = Appointment::find_by_id(db, appointment_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !has_access(&appointment, caller.role, caller.id) {
        return Err(ApiError::Forbidden(
            "You do not have permission to view this appointment".into(),
        ));
    }

    respond(db, appointment, caller.role).await
}

// ------------- update -------------- //

/// Update an appointment's time and reason, and (admins only) reassign the
/// doctor or patient. Terminal appointments reject updates.
pub async fn update_appointment(
    db: &PgPool,
    appointment_id: Uuid,
    req: &AppointmentRequest,
    caller: CurrentUser,
) -> Result<AppointmentResponse, ApiError> {
    let appointment = Appointment::find_by_id(db, appointment_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !has_access(&appointment, caller.role, caller.id) {
        return Err(ApiError::Forbidden(
            "You do not have permission to update this appointment".into(),
        ));
    }

    if is_terminal(appointment.status) {
        return Err(ApiError::InvalidState(
            "Cannot update cancelled or completed appointments".into(),
        ));
    }

    let doctor_changed = req.doctor_id != appointment.doctor_id;
    let patient_changed = req.patient_id != appointment.patient_id;

    if caller.role != UserRole::Admin {
        if doctor_changed {
            return Err(ApiError::Forbidden(
                "You do not have permission to change the doctor for this appointment".into(),
            ));
        }
        if patient_changed {
            return Err(ApiError::Forbidden(
                "You do not have permission to change the patient for this appointment".into(),
            ));
        }
    }

    // Admin reassignment re-validates the new parties exactly as on create.
    if doctor_changed {
        resolve_doctor(db, req.doctor_id).await?;
    }
    if patient_changed {
        resolve_patient(db, req.patient_id).await?;
    }

    ensure_future(req.appointment_time)?;

    // Conflict check against the final doctor/patient, ignoring this
    // appointment's own slot.
    let mut tx = db.begin().await.map_err(ApiError::from)?;
    check_time_conflicts(
        &mut tx,
        req.appointment_time,
        req.doctor_id,
        req.patient_id,
        Some(appointment_id),
    )
    .await?;
    let updated = Appointment::update(
        &mut *tx,
        appointment_id,
        req.patient_id,
        req.doctor_id,
        req.appointment_time,
        req.reason.as_deref(),
    )
    .await?;
    tx.commit().await.map_err(ApiError::from)?;

    info!(appointment_id = %updated.id, "appointment updated");
    respond(db, updated, caller.role).await
}

// ------------- cancel / complete -------------- //

/// Soft-delete: sets status CANCELLED unconditionally, record retained.
pub async fn cancel_appointment(
    db: &PgPool,
    appointment_id: Uuid,
    caller: CurrentUser,
) -> Result<AppointmentResponse, ApiError> {
    let appointment = Appointment::find_by_id(db, appointment_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !has_access(&appointment, caller.role, caller.id) {
        return Err(ApiError::Forbidden(
            "You do not have permission to cancel this appointment".into(),
        ));
    }

    let cancelled = Appointment::set_status(db, appointment_id, AppointmentStatus::Cancelled).await?;
    info!(appointment_id = %cancelled.id, "appointment cancelled");
    respond(db, cancelled, caller.role).await
}

/// Close out a visit. Only the appointment's doctor or an admin may complete,
/// and only from SCHEDULED.
pub async fn complete_appointment(
    db: &PgPool,
    appointment_id: Uuid,
    caller: CurrentUser,
) -> Result<AppointmentResponse, ApiError> {
    let appointment = Appointment::find_by_id(db, appointment_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !has_access(&appointment, caller.role, caller.id) {
        return Err(ApiError::Forbidden(
            "You do not have permission to complete this appointment".into(),
        ));
    }
    if caller.role == UserRole::Patient {
        return Err(ApiError::Forbidden(
            "Only the doctor or an admin can complete an appointment".into(),
        ));
    }
    if appointment.status != AppointmentStatus::Scheduled {
        return Err(ApiError::InvalidState(
            "Only scheduled appointments can be completed".into(),
        ));
    }

    let completed = Appointment::set_status(db, appointment_id, AppointmentStatus::Completed).await?;
    info!(appointment_id = %completed.id, "appointment completed");
    respond(db, completed, caller.role).await
}

// ------------- helpers -------------- //

/// ADMIN sees everything; DOCTOR and PATIENT only their own appointments.
fn has_access(appointment: &Appointment, role: UserRole, current_user_id: Uuid) -> bool {
    match role {
        UserRole::Admin => true,
        UserRole::Doctor => appointment.doctor_id == current_user_id,
        UserRole::Patient => appointment.patient_id == current_user_id,
    }
}

/// CANCELLED and COMPLETED both reject further updates.
fn is_terminal(status: AppointmentStatus) -> bool {
    matches!(
        status,
        AppointmentStatus::Cancelled | AppointmentStatus::Completed
    )
}

/// The appointment time must be strictly after the current instant. Single
/// authoritative check; handlers do not duplicate it.
fn ensure_future(time: OffsetDateTime) -> Result<(), ApiError> {
    if time <= OffsetDateTime::now_utc() {
        return Err(ApiError::InvalidTime);
    }
    Ok(())
}

/// Drop the appointment being updated from its own conflict set.
fn without_excluded(conflicts: Vec<Appointment>, exclude_id: Option<Uuid>) -> Vec<Appointment> {
    match exclude_id {
        Some(id) => conflicts.into_iter().filter(|a| a.id != id).collect(),
        None => conflicts,
    }
}

/// Exact-equality slot check for both parties: any surviving non-cancelled
/// appointment at the same instant rejects the booking. No interval or
/// duration concept exists.
async fn check_time_conflicts(
    tx: &mut Transaction<'_, Postgres>,
    time: OffsetDateTime,
    doctor_id: Uuid,
    patient_id: Uuid,
    exclude_id: Option<Uuid>,
) -> Result<(), ApiError> {
    let doctor_conflicts =
        without_excluded(Appointment::conflicts_by_doctor(&mut **tx, doctor_id, time).await?, exclude_id);
    if !doctor_conflicts.is_empty() {
        return Err(ApiError::SchedulingConflict(
            "Doctor already has an appointment at this time".into(),
        ));
    }

    let patient_conflicts = without_excluded(
        Appointment::conflicts_by_patient(&mut **tx, patient_id, time).await?,
        exclude_id,
    );
    if !patient_conflicts.is_empty() {
        return Err(ApiError::SchedulingConflict(
            "Patient already has an appointment at this time".into(),
        ));
    }
    Ok(())
}

async fn resolve_patient(db: &PgPool, patient_id: Uuid) -> Result<User, ApiError> {
    let user = User::find_by_id(db, patient_id).await?.ok_or_else(|| {
        ApiError::InvalidReference(format!("patient not found with id: {patient_id}"))
    })?;
    if user.role != UserRole::Patient {
        return Err(ApiError::InvalidReference(format!(
            "user {patient_id} is not a patient"
        )));
    }
    Ok(user)
}

async fn resolve_doctor(db: &PgPool, doctor_id: Uuid) -> Result<User, ApiError> {
    let user = User::find_by_id(db, doctor_id).await?.ok_or_else(|| {
        ApiError::InvalidReference(format!("doctor not found with id: {doctor_id}"))
    })?;
    if user.role != UserRole::Doctor {
        return Err(ApiError::InvalidReference(format!(
            "user {doctor_id} is not a doctor"
        )));
    }
    Ok(user)
}

// ------------- projection -------------- //

/// Role-based projection of a stored appointment. Pure: missing profile rows
/// degrade to null-filled sections rather than failing.
pub(crate) fn project(
    appointment: Appointment,
    role: UserRole,
    patient_profile: Option<PatientProfile>,
    doctor_profile: Option<DoctorProfile>,
) -> AppointmentResponse {
    let mut view = AppointmentResponse {
        appointment_id: appointment.id,
        patient_id: appointment.patient_id,
        doctor_id: appointment.doctor_id,
        appointment_time: appointment.appointment_time,
        reason: appointment.reason,
        status: appointment.status,
        created_at: appointment.created_at,
        patient_info: None,
        doctor_info: None,
        limited_doctor_info: None,
    };

    match role {
        UserRole::Admin | UserRole::Doctor => {
            view.patient_info = Some(match patient_profile {
                Some(p) => PatientInfo {
                    patient_id: p.patient_id,
                    first_name: p.first_name,
                    last_name: p.last_name,
                    age: p.age,
                    gender: p.gender,
                    symptom: p.symptom,
                    medical_history: p.medical_history,
                    allergies: p.allergies,
                    current_medications: p.current_medications,
                    triage_priority: p.triage_priority,
                },
                None => PatientInfo {
                    patient_id: view.patient_id,
                    first_name: None,
                    last_name: None,
                    age: None,
                    gender: None,
                    symptom: None,
                    medical_history: None,
                    allergies: None,
                    current_medications: None,
                    triage_priority: None,
                },
            });
            view.doctor_info = Some(match doctor_profile {
                Some(d) => DoctorInfo {
                    doctor_id: d.doctor_id,
                    first_name: d.first_name,
                    last_name: d.last_name,
                    specialty: d.specialty,
                    license_number: d.license_number,
                    work_time: d.work_time,
                },
                None => DoctorInfo {
                    doctor_id: view.doctor_id,
                    first_name: None,
                    last_name: None,
                    specialty: None,
                    license_number: None,
                    work_time: None,
                },
            });
        }
        UserRole::Patient => {
            view.limited_doctor_info = Some(match doctor_profile {
                Some(d) => LimitedDoctorInfo {
                    first_name: d.first_name,
                    last_name: d.last_name,
                    specialty: d.specialty,
                },
                None => LimitedDoctorInfo {
                    first_name: None,
                    last_name: None,
                    specialty: None,
                },
            });
        }
    }

    view
}

async fn respond(
    db: &PgPool,
    appointment: Appointment,
    role: UserRole,
) -> Result<AppointmentResponse, ApiError> {
    let patient_profile = PatientProfile::find_by_patient_id(db, appointment.patient_id).await?;
    let doctor_profile = DoctorProfile::find_by_doctor_id(db, appointment.doctor_id).await?;
    Ok(project(appointment, role, patient_profile, doctor_profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn appointment(patient_id: Uuid, doctor_id: Uuid) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            appointment_time: OffsetDateTime::now_utc() + Duration::days(1),
            reason: Some("checkup".into()),
            status: AppointmentStatus::Scheduled,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn doctor_profile(doctor_id: Uuid) -> DoctorProfile {
        DoctorProfile {
            doctor_id,
            first_name: Some("Bob".into()),
            last_name: Some("Lee".into()),
            specialty: Some("cardiology".into()),
            license_number: Some("LIC-42".into()),
            work_time: Some("mon-fri 9-17".into()),
        }
    }

    fn patient_profile(patient_id: Uuid) -> PatientProfile {
        PatientProfile {
            patient_id,
            first_name: Some("Alice".into()),
            last_name: Some("Ng".into()),
            age: Some(34),
            gender: Some("F".into()),
            symptom: Some("chest pain".into()),
            medical_history: Some("asthma".into()),
            allergies: Some("penicillin".into()),
            current_medications: None,
            triage_priority: Some("HIGH".into()),
        }
    }

    #[test]
    fn admin_always_has_access() {
        let a = appointment(Uuid::new_v4(), Uuid::new_v4());
        assert!(has_access(&a, UserRole::Admin, Uuid::new_v4()));
    }

    #[test]
    fn doctor_has_access_only_to_own_appointments() {
        let doctor_id = Uuid::new_v4();
        let a = appointment(Uuid::new_v4(), doctor_id);
        assert!(has_access(&a, UserRole::Doctor, doctor_id));
        assert!(!has_access(&a, UserRole::Doctor, Uuid::new_v4()));
        // being the patient of the record does not help a doctor caller
        assert!(!has_access(&a, UserRole::Doctor, a.patient_id));
    }

    #[test]
    fn patient_has_access_only_to_own_appointments() {
        let patient_id = Uuid::new_v4();
        let a = appointment(patient_id, Uuid::new_v4());
        assert!(has_access(&a, UserRole::Patient, patient_id));
        assert!(!has_access(&a, UserRole::Patient, Uuid::new_v4()));
        assert!(!has_access(&a, UserRole::Patient, a.doctor_id));
    }

    #[test]
    fn cancelled_and_completed_are_terminal() {
        assert!(is_terminal(AppointmentStatus::Cancelled));
        assert!(is_terminal(AppointmentStatus::Completed));
        assert!(!is_terminal(AppointmentStatus::Scheduled));
    }

    #[test]
    fn future_check_rejects_past_and_present() {
        assert!(ensure_future(OffsetDateTime::now_utc() + Duration::days(1)).is_ok());
        let err = ensure_future(OffsetDateTime::now_utc() - Duration::minutes(1)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidTime));
    }

    #[test]
    fn excluded_appointment_is_dropped_from_conflicts() {
        let a = appointment(Uuid::new_v4(), Uuid::new_v4());
        let b = appointment(Uuid::new_v4(), Uuid::new_v4());
        let a_id = a.id;

        let remaining = without_excluded(vec![a, b], Some(a_id));
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id, a_id);

        let untouched = without_excluded(
            vec![appointment(Uuid::new_v4(), Uuid::new_v4())],
            None,
        );
        assert_eq!(untouched.len(), 1);
    }

    #[test]
    fn admin_and_doctor_see_full_profiles() {
        for role in [UserRole::Admin, UserRole::Doctor] {
            let a = appointment(Uuid::new_v4(), Uuid::new_v4());
            let view = project(
                a.clone(),
                role,
                Some(patient_profile(a.patient_id)),
                Some(doctor_profile(a.doctor_id)),
            );
            let patient = view.patient_info.expect("patient info present");
            assert_eq!(patient.medical_history.as_deref(), Some("asthma"));
            let doctor = view.doctor_info.expect("doctor info present");
            assert_eq!(doctor.license_number.as_deref(), Some("LIC-42"));
            assert!(view.limited_doctor_info.is_none());
        }
    }

    #[test]
    fn patient_sees_only_limited_doctor_info() {
        let a = appointment(Uuid::new_v4(), Uuid::new_v4());
        let view = project(
            a.clone(),
            UserRole::Patient,
            Some(patient_profile(a.patient_id)),
            Some(doctor_profile(a.doctor_id)),
        );
        assert!(view.patient_info.is_none());
        assert!(view.doctor_info.is_none());
        let limited = view.limited_doctor_info.expect("limited doctor info");
        assert_eq!(limited.specialty.as_deref(), Some("cardiology"));
    }

    #[test]
    fn patient_projection_never_leaks_sensitive_fields() {
        let a = appointment(Uuid::new_v4(), Uuid::new_v4());
        let view = project(
            a.clone(),
            UserRole::Patient,
            Some(patient_profile(a.patient_id)),
            Some(doctor_profile(a.doctor_id)),
        );
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("license_number"));
        assert!(!json.contains("work_time"));
        assert!(!json.contains("medical_history"));
        assert!(!json.contains("triage_priority"));
    }

    #[test]
    fn missing_profiles_degrade_to_nulls() {
        let a = appointment(Uuid::new_v4(), Uuid::new_v4());

        let admin_view = project(a.clone(), UserRole::Admin, None, None);
        let patient = admin_view.patient_info.expect("fallback patient info");
        assert_eq!(patient.patient_id, a.patient_id);
        assert!(patient.first_name.is_none());
        assert!(patient.age.is_none());
        let doctor = admin_view.doctor_info.expect("fallback doctor info");
        assert_eq!(doctor.doctor_id, a.doctor_id);
        assert!(doctor.license_number.is_none());

        let patient_view = project(a, UserRole::Patient, None, None);
        let limited = patient_view.limited_doctor_info.expect("fallback limited info");
        assert!(limited.first_name.is_none());
        assert!(limited.specialty.is_none());
    }
}
