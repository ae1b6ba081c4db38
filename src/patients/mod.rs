//! Patients Module - Patient records with attached diagnoses
//!
//! Records embed their FHIR Patient resource directly; diagnoses live only
//! inside their parent record and are exported through the FHIR Bundle
//! transformation.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::fhir::{self, Bundle, Condition};

/// Administrative gender accepted on intake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

/// A diagnosis attached to a patient record.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub code: String,
    pub icd11_code: String,
    pub description: String,
    pub recorded_date: String,
}

/// A stored patient record.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub id: String,
    pub patient: fhir::Patient,
    pub diagnoses: Vec<Diagnosis>,
    pub created_at: String,
    pub updated_at: String,
}

/// Intake fields for a new patient.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub gender: Option<Gender>,
}

/// Fields for attaching a diagnosis.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDiagnosis {
    pub code: String,
    pub icd11_code: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreError {
    PatientNotFound(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::PatientNotFound(id) => write!(f, "Patient not found: {}", id),
        }
    }
}

impl std::error::Error for StoreError {}

/// In-process patient store.
pub struct PatientStore {
    records: RwLock<HashMap<String, PatientRecord>>,
}

impl PatientStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Store pre-loaded with the demo record P001.
    pub async fn with_seed_data() -> Self {
        let store = Self::new();
        let mut patient = fhir::Patient::new("P001", "John", "Doe");
        patient.birth_date = Some("1980-01-15".to_string());
        patient.gender = Some("male".to_string());

        let record = PatientRecord {
            id: "P001".to_string(),
            patient,
            diagnoses: vec![Diagnosis {
                code: "AYR-001".to_string(),
                icd11_code: "BA25.1".to_string(),
                description: "Vata Vyadhi (Wind Disorder)".to_string(),
                recorded_date: "2024-01-10".to_string(),
            }],
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-10T00:00:00Z".to_string(),
        };

        store.records.write().await.insert(record.id.clone(), record);
        store
    }

    /// Create a record from intake fields. Ids follow the `P{millis}`
    /// scheme; collisions bump until free.
    pub async fn create(&self, new: NewPatient) -> PatientRecord {
        let mut records = self.records.write().await;

        let mut millis = chrono::Utc::now().timestamp_millis();
        let mut id = format!("P{}", millis);
        while records.contains_key(&id) {
            millis += 1;
            id = format!("P{}", millis);
        }

        let mut patient = fhir::Patient::new(&id, &new.first_name, &new.last_name);
        patient.birth_date = new.birth_date;
        patient.gender = new.gender.map(|g| g.as_str().to_string());

        let now = chrono::Utc::now().to_rfc3339();
        let record = PatientRecord {
            id: id.clone(),
            patient,
            diagnoses: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };

        records.insert(id, record.clone());
        record
    }

    pub async fn get(&self, id: &str) -> Option<PatientRecord> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<PatientRecord> {
        let records = self.records.read().await;
        let mut all: Vec<PatientRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }

    pub async fn remove(&self, id: &str) -> Result<PatientRecord, StoreError> {
        let mut records = self.records.write().await;
        records
            .remove(id)
            .ok_or_else(|| StoreError::PatientNotFound(id.to_string()))
    }

    /// Attach a diagnosis to a record and bump its updated_at.
    pub async fn add_diagnosis(&self, id: &str, new: NewDiagnosis) -> Result<Diagnosis, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::PatientNotFound(id.to_string()))?;

        let diagnosis = Diagnosis {
            code: new.code,
            icd11_code: new.icd11_code,
            description: new.description,
            recorded_date: chrono::Utc::now().format("%Y-%m-%d").to_string(),
        };

        record.diagnoses.push(diagnosis.clone());
        record.updated_at = chrono::Utc::now().to_rfc3339();

        Ok(diagnosis)
    }

    /// Export a record as a FHIR document Bundle.
    pub async fn export_bundle(&self, id: &str) -> Result<Bundle, StoreError> {
        let records = self.records.read().await;
        let record = records
            .get(id)
            .ok_or_else(|| StoreError::PatientNotFound(id.to_string()))?;

        let conditions: Vec<Condition> = record
            .diagnoses
            .iter()
            .map(|dx| {
                Condition::for_diagnosis(&record.id, &dx.icd11_code, &dx.description, &dx.recorded_date)
            })
            .collect();

        Ok(Bundle::document(record.patient.clone(), conditions))
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for PatientStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intake(first: &str, last: &str) -> NewPatient {
        NewPatient {
            first_name: first.to_string(),
            last_name: last.to_string(),
            birth_date: Some("1990-03-02".to_string()),
            gender: Some(Gender::Female),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_roundtrip() {
        let store = PatientStore::new();
        let created = store.create(intake("Asha", "Rao")).await;

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched.patient.name[0].given, vec!["Asha".to_string()]);
        assert_eq!(fetched.patient.name[0].family, "Rao");
        assert_eq!(fetched.patient.gender.as_deref(), Some("female"));
        assert_eq!(fetched.patient.birth_date.as_deref(), Some("1990-03-02"));
        assert!(fetched.diagnoses.is_empty());
    }

    #[tokio::test]
    async fn test_add_diagnosis_bumps_updated_at() {
        let store = PatientStore::new();
        let created = store.create(intake("Ravi", "Kumar")).await;

        let dx = store
            .add_diagnosis(
                &created.id,
                NewDiagnosis {
                    code: "AYR-023".to_string(),
                    icd11_code: "DB20".to_string(),
                    description: "Kapha Vyadhi (Phlegm Disorder)".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(dx.icd11_code, "DB20");
        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched.diagnoses.len(), 1);
        assert!(fetched.updated_at >= fetched.created_at);
    }

    #[tokio::test]
    async fn test_add_diagnosis_unknown_patient() {
        let store = PatientStore::new();
        let err = store
            .add_diagnosis(
                "P404",
                NewDiagnosis {
                    code: "AYR-001".to_string(),
                    icd11_code: "BA25.1".to_string(),
                    description: "Vata Vyadhi".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::PatientNotFound("P404".to_string()));
    }

    #[tokio::test]
    async fn test_export_bundle_entry_count() {
        let store = PatientStore::with_seed_data().await;

        // Seed record has one diagnosis: Patient + 1 Condition
        let bundle = store.export_bundle("P001").await.unwrap();
        assert_eq!(bundle.entry.len(), 2);

        store
            .add_diagnosis(
                "P001",
                NewDiagnosis {
                    code: "SID-045".to_string(),
                    icd11_code: "DA90".to_string(),
                    description: "Pitta Roga (Pitta Disease)".to_string(),
                },
            )
            .await
            .unwrap();

        let bundle = store.export_bundle("P001").await.unwrap();
        assert_eq!(bundle.entry.len(), 3);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = PatientStore::with_seed_data().await;
        assert!(store.remove("P001").await.is_ok());
        assert!(store.get("P001").await.is_none());
        assert!(store.remove("P001").await.is_err());
    }
}
