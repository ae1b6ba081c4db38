//! FHIR Module - FHIR R4 resource types and the Bundle export transformation
//!
//! Internal patient records are flattened into a FHIR `document` Bundle:
//! one `Patient` resource followed by one `Condition` per attached
//! diagnosis, each coded against the ICD-11 MMS code system.

use serde::{Deserialize, Serialize};

/// Coding system URI for ICD-11 MMS (WHO release).
pub const ICD11_SYSTEM: &str = "http://id.who.int/icd/release/11/mms";

/// FHIR Coding
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// FHIR CodeableConcept
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeableConcept {
    pub coding: Vec<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Concept with a single ICD-11 coding.
    pub fn icd11(code: &str, display: &str) -> Self {
        Self {
            coding: vec![Coding {
                system: Some(ICD11_SYSTEM.to_string()),
                code: Some(code.to_string()),
                display: Some(display.to_string()),
            }],
            text: None,
        }
    }
}

/// FHIR Reference
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reference {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn patient(id: &str) -> Self {
        Self {
            reference: format!("Patient/{}", id),
            display: None,
        }
    }
}

/// FHIR HumanName
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HumanName {
    #[serde(rename = "use")]
    pub use_: String,
    pub given: Vec<String>,
    pub family: String,
}

impl HumanName {
    pub fn official(given: &str, family: &str) -> Self {
        Self {
            use_: "official".to_string(),
            given: vec![given.to_string()],
            family: family.to_string(),
        }
    }
}

/// FHIR ContactPoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContactPoint {
    pub system: String,
    pub value: String,
}

/// FHIR Patient resource
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub resource_type: String,
    pub id: String,
    pub name: Vec<HumanName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Vec<ContactPoint>>,
}

impl Patient {
    pub fn new(id: &str, given: &str, family: &str) -> Self {
        Self {
            resource_type: "Patient".to_string(),
            id: id.to_string(),
            name: vec![HumanName::official(given, family)],
            birth_date: None,
            gender: None,
            contact: None,
        }
    }
}

/// FHIR Condition resource
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub resource_type: String,
    pub id: String,
    pub code: CodeableConcept,
    pub subject: Reference,
    pub recorded_date: String,
}

impl Condition {
    /// Build a Condition for a diagnosis recorded on a patient.
    pub fn for_diagnosis(patient_id: &str, icd11_code: &str, display: &str, recorded_date: &str) -> Self {
        Self {
            resource_type: "Condition".to_string(),
            id: format!("C{}", uuid::Uuid::new_v4().simple()),
            code: CodeableConcept::icd11(icd11_code, display),
            subject: Reference::patient(patient_id),
            recorded_date: recorded_date.to_string(),
        }
    }
}

/// Any resource carried in a Bundle entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resource {
    Patient(Patient),
    Condition(Condition),
}

/// FHIR Bundle entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BundleEntry {
    pub resource: Resource,
}

/// FHIR Bundle (document type)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,
    #[serde(rename = "type")]
    pub bundle_type: String,
    pub timestamp: String,
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    /// Assemble a document Bundle: the patient resource first, then one
    /// Condition per diagnosis.
    pub fn document(patient: Patient, conditions: Vec<Condition>) -> Self {
        let mut entry = Vec::with_capacity(conditions.len() + 1);
        entry.push(BundleEntry {
            resource: Resource::Patient(patient),
        });
        entry.extend(conditions.into_iter().map(|c| BundleEntry {
            resource: Resource::Condition(c),
        }));

        Self {
            resource_type: "Bundle".to_string(),
            bundle_type: "document".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            entry,
        }
    }
}
