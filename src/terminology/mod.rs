//! Terminology Module - NAMASTE to ICD-11 code registry
//!
//! Holds the curated mapping table between traditional-medicine diagnosis
//! codes (NAMASTE: Ayurveda, Siddha, Unani) and ICD-11 MMS codes, with
//! substring search and category filtering.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Traditional-medicine system a NAMASTE code belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Ayurveda,
    Siddha,
    Unani,
}

impl Category {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Ayurveda" => Some(Category::Ayurveda),
            "Siddha" => Some(Category::Siddha),
            "Unani" => Some(Category::Unani),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ayurveda => "Ayurveda",
            Category::Siddha => "Siddha",
            Category::Unani => "Unani",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the mapping table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMapping {
    pub namaste_code: String,
    pub namaste_description: String,
    pub icd11_code: String,
    pub icd11_description: String,
    pub confidence: f64,
    pub category: Category,
}

/// Search options for the registry.
#[derive(Clone, Debug, Default)]
pub struct SearchOptions {
    pub query: Option<String>,
    pub category: Option<Category>,
    pub limit: usize,
    pub offset: usize,
}

impl SearchOptions {
    pub const DEFAULT_LIMIT: usize = 10;
}

/// In-process registry of NAMASTE to ICD-11 mappings.
pub struct CodeRegistry {
    mappings: RwLock<Vec<CodeMapping>>,
}

impl CodeRegistry {
    pub fn new() -> Self {
        Self {
            mappings: RwLock::new(Vec::new()),
        }
    }

    /// Registry pre-loaded with the curated seed set.
    pub fn with_seed_data() -> Self {
        Self {
            mappings: RwLock::new(seed_mappings()),
        }
    }

    /// Insert or replace a mapping, keyed by NAMASTE code.
    pub async fn insert(&self, mapping: CodeMapping) {
        let mut mappings = self.mappings.write().await;
        if let Some(existing) = mappings
            .iter_mut()
            .find(|m| m.namaste_code == mapping.namaste_code)
        {
            *existing = mapping;
        } else {
            mappings.push(mapping);
        }
    }

    /// Remove a mapping by NAMASTE code. Returns the removed row.
    pub async fn remove(&self, namaste_code: &str) -> Option<CodeMapping> {
        let mut mappings = self.mappings.write().await;
        let idx = mappings.iter().position(|m| m.namaste_code == namaste_code)?;
        Some(mappings.remove(idx))
    }

    /// Exact lookup by NAMASTE code.
    pub async fn get(&self, namaste_code: &str) -> Option<CodeMapping> {
        let mappings = self.mappings.read().await;
        mappings.iter().find(|m| m.namaste_code == namaste_code).cloned()
    }

    /// Case-insensitive substring search across all code and description
    /// fields, with optional category filter and limit/offset truncation.
    pub async fn search(&self, opts: &SearchOptions) -> Vec<CodeMapping> {
        let mappings = self.mappings.read().await;

        let term = opts.query.as_deref().map(|q| q.to_lowercase());

        mappings
            .iter()
            .filter(|m| match term.as_deref() {
                Some(t) => {
                    m.namaste_code.to_lowercase().contains(t)
                        || m.namaste_description.to_lowercase().contains(t)
                        || m.icd11_code.to_lowercase().contains(t)
                        || m.icd11_description.to_lowercase().contains(t)
                }
                None => true,
            })
            .filter(|m| opts.category.map_or(true, |c| m.category == c))
            .skip(opts.offset)
            .take(opts.limit)
            .cloned()
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.mappings.read().await.len()
    }

    /// Mapping counts per traditional-medicine system.
    pub async fn counts_by_category(&self) -> HashMap<Category, usize> {
        let mappings = self.mappings.read().await;
        let mut counts = HashMap::new();
        for m in mappings.iter() {
            *counts.entry(m.category).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for CodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn mapping(
    namaste_code: &str,
    namaste_description: &str,
    icd11_code: &str,
    icd11_description: &str,
    confidence: f64,
    category: Category,
) -> CodeMapping {
    CodeMapping {
        namaste_code: namaste_code.to_string(),
        namaste_description: namaste_description.to_string(),
        icd11_code: icd11_code.to_string(),
        icd11_description: icd11_description.to_string(),
        confidence,
        category,
    }
}

/// Curated seed mappings loaded at startup.
pub fn seed_mappings() -> Vec<CodeMapping> {
    vec![
        mapping(
            "AYR-001",
            "Vata Vyadhi (Wind Disorder)",
            "BA25.1",
            "Disorders of the nervous system and sense organs",
            0.94,
            Category::Ayurveda,
        ),
        mapping(
            "SID-045",
            "Pitta Roga (Pitta Disease)",
            "DA90",
            "Diabetes mellitus",
            0.87,
            Category::Siddha,
        ),
        mapping(
            "UNA-012",
            "Humoral Imbalance",
            "QD82",
            "Symptoms and signs",
            0.76,
            Category::Unani,
        ),
        mapping(
            "AYR-023",
            "Kapha Vyadhi (Phlegm Disorder)",
            "DB20",
            "Asthma",
            0.92,
            Category::Ayurveda,
        ),
        mapping(
            "SID-089",
            "Iyya Pitta (Bodily Humours)",
            "EA03",
            "Hypertension",
            0.65,
            Category::Siddha,
        ),
        mapping(
            "AYR-047",
            "Amavata (Rheumatic Disorder)",
            "FA20",
            "Rheumatoid arthritis",
            0.89,
            Category::Ayurveda,
        ),
        mapping(
            "UNA-033",
            "Suda (Headache Disorders)",
            "8A80",
            "Migraine",
            0.81,
            Category::Unani,
        ),
        mapping(
            "SID-102",
            "Kazhichal (Digestive Flux)",
            "DD91",
            "Irritable bowel syndrome",
            0.72,
            Category::Siddha,
        ),
    ]
}
