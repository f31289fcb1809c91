//! Medication mention extraction.
//!
//! Curated brand/generic families are matched first. A capitalized name
//! followed by a dose (`Pantop 40 mg`) catches drugs outside those families.
//! Every name is canonicalized through the vocabulary alias map.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::types::RecognizedEntity;
use crate::config::DOSE_LOOKAHEAD_CHARS;
use crate::models::enums::EntityCategory;
use crate::models::MedicationMention;
use crate::pipeline::fuzzy::{FuzzyIndex, NormalizationCache};
use crate::vocabulary::VocabularyStore;

static MEDICATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(paracetamol|acetaminophen|dolo|crocin|tylenol)\b",
        r"(?i)\b(metformin|glucophage|glycomet)\b",
        r"(?i)\b(amlodipine|amlodep|norvasc)\b",
        r"(?i)\b(atorvastatin|atorva|lipitor)\b",
        r"(?i)\b(pantoprazole|pantaprazole|pantodac)\b",
        r"(?i)\b(azithromycin|azithral|zithromax)\b",
        r"(?i)\b(amoxicillin|amoxil|augmentin)\b",
        r"(?i)\b(levipil|levepil|levetiracetam|keppra)\b",
        r"(?i)\b(insulin|humalog|lantus|novolog|humulin)\b",
        r"(?i)\b(aspirin|ecosprin|disprin)\b",
        r"(?i)\b(ibuprofen|brufen|advil|motrin)\b",
        r"(?i)\b(omeprazole|omez|prilosec)\b",
        r"(?i)\b(losartan|cozaar)\b",
        r"(?i)\b(ramipril|altace)\b",
        r"(?i)\b(telmisartan|micardis|telma)\b",
        r"(?i)\b(levothyroxine|eltroxin|thyronorm|synthroid)\b",
        r"(?i)\b(prednisolone|prednisone|deltasone)\b",
        r"(?i)\b(dexamethasone|decadron|dexona)\b",
        r"(?i)\b(warfarin|coumadin)\b",
        r"(?i)\b(clopidogrel|plavix)\b",
        r"(?i)\b(salbutamol|ventolin|albuterol)\b",
        r"(?i)\b(montelukast|singulair|montair)\b",
        r"(?i)\b(cetirizine|zyrtec)\b",
        r"(?i)\b(furosemide|lasix|frusemide)\b",
        r"(?i)\b(cefixime|suprax)\b",
        r"(?i)\b(ceftriaxone|rocephin)\b",
        r"(?i)\b(doxycycline|vibramycin)\b",
        r"(?i)\b(fluconazole|diflucan)\b",
        r"(?i)\b(acyclovir|zovirax)\b",
        r"(?i)\b(sertraline|zoloft)\b",
        r"(?i)\b(fluoxetine|prozac)\b",
        r"(?i)\b(sildenafil|viagra)\b",
        r"(?i)\b(tadalafil|cialis)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid medication regex pattern"))
    .collect()
});

static DOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?\s*(?:mg|mcg|ml|g|units?))\b").expect("Invalid dose regex pattern")
});

/// `Name 40 mg` with the unit not followed by `/` or `%` (that is a lab concentration).
static NAME_WITH_DOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?: [A-Z][a-z]+)*)\s+(\d+(?:\.\d+)?\s*(?:mg|mcg|ml))\b(?:[^/%]|$)")
        .expect("Invalid medication fallback regex pattern")
});

/// Dosage-form words stripped from the front of a fallback name.
const DOSAGE_FORMS: &[&str] = &[
    "tablet",
    "tablets",
    "capsule",
    "capsules",
    "syrup",
    "injection",
    "ointment",
    "drops",
    "solution",
    "suspension",
];

/// Vocabulary resolution of one medication name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMedication {
    pub canonical: String,
    /// Empty when the name is not in the vocabulary.
    pub generic: String,
    pub purpose: String,
}

/// Raw medication name → canonical record via the alias map.
/// Exact alias first, then fuzzy alias match at or above the threshold.
#[derive(Debug)]
pub struct MedicationNormalizer {
    vocabulary: Arc<VocabularyStore>,
    index: FuzzyIndex,
    cache: NormalizationCache<CanonicalMedication>,
    threshold: f64,
}

impl MedicationNormalizer {
    pub fn new(vocabulary: Arc<VocabularyStore>, threshold: f64) -> Self {
        let index = FuzzyIndex::new(vocabulary.medications().iter().map(|m| m.alias.as_str()));
        Self {
            vocabulary,
            index,
            cache: NormalizationCache::new(),
            threshold,
        }
    }

    pub fn normalize(&self, raw: &str) -> CanonicalMedication {
        let key = NormalizationCache::<CanonicalMedication>::key(raw);
        let lookup_key = key.clone();
        self.cache
            .get_or_insert_with(key, || self.lookup(&lookup_key))
    }

    fn lookup(&self, key: &str) -> CanonicalMedication {
        let entry = self.vocabulary.medication(key).or_else(|| {
            self.index
                .best_match(key, self.threshold)
                .map(|hit| &self.vocabulary.medications()[hit.index])
        });
        match entry {
            Some(entry) => CanonicalMedication {
                canonical: entry.canonical_name().to_string(),
                generic: entry.generic.clone(),
                purpose: entry.purpose.clone(),
            },
            None => CanonicalMedication {
                canonical: key.to_string(),
                generic: String::new(),
                purpose: String::new(),
            },
        }
    }
}

#[derive(Debug)]
struct MedicationHit {
    start: usize,
    end: usize,
    name: String,
    dose: String,
}

/// Medication mentions in text order, one per canonical name. A repeated
/// mention only contributes its dose when the first had none.
pub fn extract_medications(
    text: &str,
    normalizer: &MedicationNormalizer,
    recognized: &[RecognizedEntity],
) -> Vec<MedicationMention> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut hits = curated_hits(text);
    let fallback = fallback_hits(text, &hits, &normalizer.vocabulary);
    hits.extend(fallback);
    hits.extend(recognizer_hits(recognized));
    hits.sort_by_key(|h| (h.start, h.end));

    let mut mentions: Vec<MedicationMention> = Vec::new();
    let mut by_canonical: HashMap<String, usize> = HashMap::new();

    for hit in hits {
        let resolved = normalizer.normalize(&hit.name);
        if resolved.canonical.is_empty() {
            continue;
        }
        let key = resolved.canonical.to_lowercase();
        if let Some(&i) = by_canonical.get(&key) {
            if mentions[i].dose.is_empty() && !hit.dose.is_empty() {
                mentions[i].dose = hit.dose;
            }
            continue;
        }
        by_canonical.insert(key, mentions.len());
        mentions.push(MedicationMention {
            original_text: hit.name,
            canonical: resolved.canonical,
            generic: resolved.generic,
            purpose: resolved.purpose,
            dose: hit.dose,
        });
    }

    tracing::debug!(medications = mentions.len(), "Medication extraction complete");
    mentions
}

fn curated_hits(text: &str) -> Vec<MedicationHit> {
    MEDICATION_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(text))
        .filter_map(|caps| {
            let m = caps.get(1)?;
            Some(MedicationHit {
                start: m.start(),
                end: m.end(),
                name: m.as_str().to_string(),
                dose: dose_after(text, m.end()),
            })
        })
        .collect()
}

fn fallback_hits(
    text: &str,
    curated: &[MedicationHit],
    vocabulary: &VocabularyStore,
) -> Vec<MedicationHit> {
    NAME_WITH_DOSE
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?;
            let dose = caps.get(2)?;
            let (start, end) = (name.start(), dose.end());
            if curated.iter().any(|h| h.start < end && start < h.end) {
                return None;
            }
            let name = strip_dosage_form(name.as_str());
            // "Creatinine 1 mg" is a lab line with a truncated unit.
            if name.is_empty() || vocabulary.reference_range(name).is_some() {
                return None;
            }
            Some(MedicationHit {
                start,
                end,
                name: name.to_string(),
                dose: dose.as_str().to_string(),
            })
        })
        .collect()
}

/// Recognizer spans such as `"metoprolol 25 mg"` split into name and dose.
/// They carry no text position and sort after positioned hits.
fn recognizer_hits(recognized: &[RecognizedEntity]) -> Vec<MedicationHit> {
    recognized
        .iter()
        .filter(|e| e.category == EntityCategory::Medication)
        .filter_map(|e| {
            let span = e.text.trim();
            let (name, dose) = match DOSE.find(span) {
                Some(m) => (span[..m.start()].trim(), m.as_str().to_string()),
                None => (span, String::new()),
            };
            let name = strip_dosage_form(name);
            if name.is_empty() {
                return None;
            }
            Some(MedicationHit {
                start: usize::MAX,
                end: usize::MAX,
                name: name.to_string(),
                dose,
            })
        })
        .collect()
}

/// First dose fragment within the lookahead window after `end`, on the same line.
fn dose_after(text: &str, end: usize) -> String {
    let tail = &text[end..];
    let window_end = tail
        .char_indices()
        .nth(DOSE_LOOKAHEAD_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(tail.len());
    let window = &tail[..window_end];
    let window = window.split('\n').next().unwrap_or(window);
    DOSE.captures(window)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn strip_dosage_form(name: &str) -> &str {
    let mut rest = name.trim();
    while let Some((first, tail)) = rest.split_once(' ') {
        if DOSAGE_FORMS.contains(&first.to_lowercase().as_str()) {
            rest = tail.trim_start();
        } else {
            break;
        }
    }
    if DOSAGE_FORMS.contains(&rest.to_lowercase().as_str()) {
        return "";
    }
    rest
}
