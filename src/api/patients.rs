//! Patient record endpoints - CRUD, diagnoses, FHIR export

use std::sync::Arc;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::fhir::Bundle;
use crate::patients::{Diagnosis, NewDiagnosis, NewPatient, PatientRecord, PatientStore, StoreError};
use crate::validation::{validate_object, FieldValidator, ValidationResult};

pub fn routes() -> Router {
    Router::new()
        .route("/", get(list_patients).post(create_patient))
        .route("/:id", get(get_patient).delete(delete_patient))
        .route("/:id/diagnoses", post(add_diagnosis))
        .route("/:id/fhir", get(export_fhir))
}

fn bad_request(result: ValidationResult) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "Invalid request",
            "details": result.errors,
        })),
    )
}

fn create_patient_rules() -> Vec<FieldValidator> {
    vec![
        FieldValidator::new("firstName").required().min_length(1).max_length(100),
        FieldValidator::new("lastName").required().min_length(1).max_length(100),
        FieldValidator::new("gender").one_of(vec!["male", "female", "other"]),
        FieldValidator::new("birthDate").max_length(10),
    ]
}

fn add_diagnosis_rules() -> Vec<FieldValidator> {
    vec![
        FieldValidator::new("code").required().min_length(1),
        FieldValidator::new("icd11Code").required().min_length(1),
        FieldValidator::new("description").required().min_length(1),
    ]
}

async fn create_patient(
    Extension(store): Extension<Arc<PatientStore>>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<PatientRecord>), (StatusCode, Json<serde_json::Value>)> {
    let result = validate_object(&body, &create_patient_rules());
    if !result.valid {
        return Err(bad_request(result));
    }

    let new: NewPatient = serde_json::from_value(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": format!("Invalid patient data: {}", e) })),
        )
    })?;

    let record = store.create(new).await;
    tracing::info!("Created patient {}", record.id);
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Serialize)]
struct PatientListResponse {
    patients: Vec<PatientRecord>,
    total: usize,
}

async fn list_patients(Extension(store): Extension<Arc<PatientStore>>) -> Json<PatientListResponse> {
    let patients = store.list().await;
    Json(PatientListResponse {
        total: patients.len(),
        patients,
    })
}

async fn get_patient(
    Path(id): Path<String>,
    Extension(store): Extension<Arc<PatientStore>>,
) -> Result<Json<PatientRecord>, (StatusCode, String)> {
    store
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Patient not found".to_string()))
}

async fn delete_patient(
    Path(id): Path<String>,
    Extension(store): Extension<Arc<PatientStore>>,
) -> Result<StatusCode, (StatusCode, String)> {
    match store.remove(&id).await {
        Ok(_) => {
            tracing::info!("Deleted patient {}", id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(StoreError::PatientNotFound(_)) => {
            Err((StatusCode::NOT_FOUND, "Patient not found".to_string()))
        }
    }
}

async fn add_diagnosis(
    Path(id): Path<String>,
    Extension(store): Extension<Arc<PatientStore>>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<Diagnosis>), (StatusCode, Json<serde_json::Value>)> {
    let result = validate_object(&body, &add_diagnosis_rules());
    if !result.valid {
        return Err(bad_request(result));
    }

    let new: NewDiagnosis = serde_json::from_value(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": format!("Invalid diagnosis data: {}", e) })),
        )
    })?;

    match store.add_diagnosis(&id, new).await {
        Ok(diagnosis) => Ok((StatusCode::CREATED, Json(diagnosis))),
        Err(StoreError::PatientNotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Patient not found" })),
        )),
    }
}

async fn export_fhir(
    Path(id): Path<String>,
    Extension(store): Extension<Arc<PatientStore>>,
) -> Result<Json<Bundle>, (StatusCode, String)> {
    match store.export_bundle(&id).await {
        Ok(bundle) => {
            tracing::info!("Exported FHIR bundle for patient {} ({} entries)", id, bundle.entry.len());
            Ok(Json(bundle))
        }
        Err(StoreError::PatientNotFound(_)) => {
            Err((StatusCode::NOT_FOUND, "Patient not found".to_string()))
        }
    }
}
