use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::de::DeserializeOwned;

use super::types::{
    Bounds, ConditionAdviceEntry, Icd10Entry, InteractionEntry, MedicationEntry, ReferenceRange,
    SpecialistRule, VersionedTable,
};
use super::VocabularyError;

const REFERENCE_RANGES_FILE: &str = "reference_ranges.json";
const DISEASES_FILE: &str = "diseases.json";
const MEDICATIONS_FILE: &str = "medications.json";
const SPECIALISTS_FILE: &str = "specialists.json";
const ICD10_FILE: &str = "icd10.json";
const CONDITION_ADVICE_FILE: &str = "condition_advice.json";
const DRUG_INTERACTIONS_FILE: &str = "drug_interactions.json";

/// Specialist keywords this short must match a whole word.
const SHORT_KEYWORD_CHARS: usize = 3;

/// A specialist rule with its keyword compiled to a regex anchored at a word start.
#[derive(Debug, Clone)]
pub struct CompiledSpecialistRule {
    pub keyword: String,
    pub specialist: String,
    pub regex: Regex,
}

/// Version string of each loaded table, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableVersions {
    pub reference_ranges: String,
    pub diseases: String,
    pub medications: String,
    pub specialists: String,
    pub icd10: String,
    pub condition_advice: String,
    pub drug_interactions: String,
}

/// Raw JSON text of every table, before parsing.
struct TableSources {
    reference_ranges: String,
    diseases: String,
    medications: String,
    specialists: String,
    icd10: String,
    condition_advice: String,
    drug_interactions: String,
}

impl TableSources {
    fn embedded() -> Self {
        Self {
            reference_ranges: include_str!("../../resources/vocabulary/reference_ranges.json")
                .to_string(),
            diseases: include_str!("../../resources/vocabulary/diseases.json").to_string(),
            medications: include_str!("../../resources/vocabulary/medications.json").to_string(),
            specialists: include_str!("../../resources/vocabulary/specialists.json").to_string(),
            icd10: include_str!("../../resources/vocabulary/icd10.json").to_string(),
            condition_advice: include_str!("../../resources/vocabulary/condition_advice.json")
                .to_string(),
            drug_interactions: include_str!("../../resources/vocabulary/drug_interactions.json")
                .to_string(),
        }
    }

    fn read_dir(dir: &Path) -> Result<Self, VocabularyError> {
        let read = |file: &str| {
            let path = dir.join(file);
            std::fs::read_to_string(&path)
                .map_err(|e| VocabularyError::Load(path.display().to_string(), e.to_string()))
        };

        Ok(Self {
            reference_ranges: read(REFERENCE_RANGES_FILE)?,
            diseases: read(DISEASES_FILE)?,
            medications: read(MEDICATIONS_FILE)?,
            specialists: read(SPECIALISTS_FILE)?,
            icd10: read(ICD10_FILE)?,
            condition_advice: read(CONDITION_ADVICE_FILE)?,
            drug_interactions: read(DRUG_INTERACTIONS_FILE)?,
        })
    }
}

fn parse_table<T: DeserializeOwned>(
    file: &str,
    json: &str,
) -> Result<VersionedTable<T>, VocabularyError> {
    serde_json::from_str(json).map_err(|e| VocabularyError::Parse(file.into(), e.to_string()))
}

/// Read-only clinical vocabularies, built once at startup and shared by handle.
/// All lookups are case-insensitive.
#[derive(Debug)]
pub struct VocabularyStore {
    ranges: Vec<ReferenceRange>,
    range_index: HashMap<String, usize>,
    diseases: Vec<String>,
    disease_index: HashMap<String, usize>,
    medications: Vec<MedicationEntry>,
    medication_index: HashMap<String, usize>,
    specialist_rules: Vec<CompiledSpecialistRule>,
    icd10: HashMap<String, String>,
    advice: Vec<ConditionAdviceEntry>,
    advice_index: HashMap<String, usize>,
    interactions: Vec<InteractionEntry>,
    versions: TableVersions,
}

impl VocabularyStore {
    /// Build the store from the tables compiled into the binary.
    pub fn embedded() -> Result<Self, VocabularyError> {
        Self::from_sources(TableSources::embedded())
    }

    /// Load every table from `dir` (same file names as the embedded set).
    pub fn load(dir: &Path) -> Result<Self, VocabularyError> {
        let store = Self::from_sources(TableSources::read_dir(dir)?)?;
        tracing::info!(dir = %dir.display(), "Loaded vocabulary tables from directory");
        Ok(store)
    }

    fn from_sources(sources: TableSources) -> Result<Self, VocabularyError> {
        let ranges: VersionedTable<ReferenceRange> =
            parse_table(REFERENCE_RANGES_FILE, &sources.reference_ranges)?;
        let diseases: VersionedTable<String> = parse_table(DISEASES_FILE, &sources.diseases)?;
        let medications: VersionedTable<MedicationEntry> =
            parse_table(MEDICATIONS_FILE, &sources.medications)?;
        let specialists: VersionedTable<SpecialistRule> =
            parse_table(SPECIALISTS_FILE, &sources.specialists)?;
        let icd10: VersionedTable<Icd10Entry> = parse_table(ICD10_FILE, &sources.icd10)?;
        let advice: VersionedTable<ConditionAdviceEntry> =
            parse_table(CONDITION_ADVICE_FILE, &sources.condition_advice)?;
        let interactions: VersionedTable<InteractionEntry> =
            parse_table(DRUG_INTERACTIONS_FILE, &sources.drug_interactions)?;

        for range in &ranges.entries {
            validate_range(range)?;
        }

        let specialist_rules = specialists
            .entries
            .into_iter()
            .map(compile_specialist_rule)
            .collect::<Result<Vec<_>, _>>()?;

        let versions = TableVersions {
            reference_ranges: ranges.version,
            diseases: diseases.version,
            medications: medications.version,
            specialists: specialists.version,
            icd10: icd10.version,
            condition_advice: advice.version,
            drug_interactions: interactions.version,
        };

        let mut range_index = HashMap::new();
        for (i, range) in ranges.entries.iter().enumerate() {
            for name in std::iter::once(&range.test_name).chain(range.aliases.iter()) {
                range_index.entry(index_key(name)).or_insert(i);
            }
        }

        let disease_index = first_wins_index(diseases.entries.iter().map(String::as_str));
        let medication_index =
            first_wins_index(medications.entries.iter().map(|m| m.alias.as_str()));
        let advice_index = first_wins_index(advice.entries.iter().map(|a| a.condition.as_str()));

        let icd10 = icd10
            .entries
            .into_iter()
            .map(|e| (index_key(&e.disease), e.code))
            .collect();

        let store = Self {
            ranges: ranges.entries,
            range_index,
            diseases: diseases.entries,
            disease_index,
            medications: medications.entries,
            medication_index,
            specialist_rules,
            icd10,
            advice: advice.entries,
            advice_index,
            interactions: interactions.entries,
            versions,
        };

        tracing::debug!(
            ranges = store.ranges.len(),
            diseases = store.diseases.len(),
            medications = store.medications.len(),
            specialist_rules = store.specialist_rules.len(),
            "Vocabulary store initialized"
        );

        Ok(store)
    }

    // ── Reference ranges ────────────────────────────────────────────────

    pub fn reference_ranges(&self) -> &[ReferenceRange] {
        &self.ranges
    }

    /// Range for a test by display name or alias.
    pub fn reference_range(&self, test_name: &str) -> Option<&ReferenceRange> {
        self.range_index
            .get(&index_key(test_name))
            .map(|&i| &self.ranges[i])
    }

    /// Canonical test name for a name or alias (`"Hb"` → `"Hemoglobin"`).
    pub fn canonical_test_name(&self, name: &str) -> Option<&str> {
        self.reference_range(name).map(|r| r.test_name.as_str())
    }

    // ── Diseases ────────────────────────────────────────────────────────

    pub fn diseases(&self) -> &[String] {
        &self.diseases
    }

    /// Exact case-insensitive vocabulary hit, returning the display form.
    pub fn disease_exact(&self, raw: &str) -> Option<&str> {
        self.disease_index
            .get(&index_key(raw))
            .map(|&i| self.diseases[i].as_str())
    }

    // ── Medications ─────────────────────────────────────────────────────

    pub fn medications(&self) -> &[MedicationEntry] {
        &self.medications
    }

    pub fn medication(&self, alias: &str) -> Option<&MedicationEntry> {
        self.medication_index
            .get(&index_key(alias))
            .map(|&i| &self.medications[i])
    }

    // ── Inference tables ────────────────────────────────────────────────

    pub fn specialist_rules(&self) -> &[CompiledSpecialistRule] {
        &self.specialist_rules
    }

    pub fn icd10_code(&self, disease: &str) -> Option<&str> {
        self.icd10.get(&index_key(disease)).map(String::as_str)
    }

    pub fn advice_for(&self, condition: &str) -> Option<&[String]> {
        self.advice_index
            .get(&index_key(condition))
            .map(|&i| self.advice[i].advice.as_slice())
    }

    pub fn interactions(&self) -> &[InteractionEntry] {
        &self.interactions
    }

    pub fn versions(&self) -> &TableVersions {
        &self.versions
    }
}

fn index_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn first_wins_index<'a>(names: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, name) in names.enumerate() {
        index.entry(index_key(name)).or_insert(i);
    }
    index
}

fn validate_range(range: &ReferenceRange) -> Result<(), VocabularyError> {
    let check = |bounds: Bounds| {
        if bounds.is_valid() {
            Ok(())
        } else {
            Err(VocabularyError::InvalidRange {
                test: range.test_name.clone(),
                min: bounds.min,
                max: bounds.max,
            })
        }
    };

    check(range.generic())?;

    match (range.gender_specific, range.male_range, range.female_range) {
        (true, Some(male), Some(female)) => {
            check(male)?;
            check(female)
        }
        (false, None, None) => Ok(()),
        _ => Err(VocabularyError::InconsistentRange(range.test_name.clone())),
    }
}

fn compile_specialist_rule(rule: SpecialistRule) -> Result<CompiledSpecialistRule, VocabularyError> {
    let keyword = index_key(&rule.keyword);
    // Longer keywords also match plurals and derived forms ("lesions", "colonoscopy").
    // Abbreviations of three letters or fewer must stand alone ("flu" is not "fluid").
    let tail = if keyword.chars().count() <= SHORT_KEYWORD_CHARS {
        r"\b"
    } else {
        ""
    };
    let pattern = format!(r"\b{}{}", regex::escape(&keyword), tail);
    let regex = Regex::new(&pattern).map_err(|e| VocabularyError::InvalidPattern {
        pattern: pattern.clone(),
        reason: e.to_string(),
    })?;

    Ok(CompiledSpecialistRule {
        keyword,
        specialist: rule.specialist,
        regex,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VocabularyStore {
        VocabularyStore::embedded().unwrap()
    }

    #[test]
    fn embedded_tables_load() {
        let store = store();
        assert!(store.reference_ranges().len() >= 40);
        assert!(store.diseases().len() > 400);
        assert!(store.medications().len() > 200);
        assert!(!store.specialist_rules().is_empty());
        assert!(!store.interactions().is_empty());
        assert_eq!(store.versions().reference_ranges, "2024.1");
    }

    #[test]
    fn every_range_has_min_not_above_max() {
        for range in store().reference_ranges() {
            assert!(range.min <= range.max, "{}", range.test_name);
            for sub in [range.male_range, range.female_range].into_iter().flatten() {
                assert!(sub.min <= sub.max, "{}", range.test_name);
            }
        }
    }

    #[test]
    fn range_lookup_accepts_aliases_in_any_case() {
        let store = store();
        assert_eq!(store.canonical_test_name("hb"), Some("Hemoglobin"));
        assert_eq!(store.canonical_test_name("WBC"), Some("Total Leukocyte Count"));
        assert_eq!(store.canonical_test_name(" glucose "), Some("Glucose"));
        assert!(store.reference_range("Ferritin").is_none());
    }

    #[test]
    fn hdl_is_higher_is_better() {
        assert!(store().reference_range("HDL Cholesterol").unwrap().higher_is_better);
    }

    #[test]
    fn disease_exact_returns_display_form() {
        let store = store();
        assert_eq!(store.disease_exact("type 2 diabetes"), Some("Type 2 Diabetes"));
        assert_eq!(store.disease_exact("HYPERTENSION"), Some("Hypertension"));
        assert!(store.disease_exact("hearing aids").is_none());
    }

    #[test]
    fn medication_alias_maps_brand_to_generic() {
        let store = store();
        let dolo = store.medication("Dolo").unwrap();
        assert_eq!(dolo.canonical_name(), "Paracetamol");
        assert_eq!(dolo.purpose, "Pain relief / Fever");
        let augmentin = store.medication("augmentin").unwrap();
        assert_eq!(augmentin.canonical_name(), "Augmentin");
        assert_eq!(augmentin.generic, "Amoxicillin + Clavulanic acid");
    }

    #[test]
    fn icd10_and_advice_lookups_are_case_insensitive() {
        let store = store();
        assert_eq!(store.icd10_code("Hypertension"), Some("I10"));
        assert!(store.icd10_code("unknown condition").is_none());
        assert!(store.advice_for("fever").is_some());
    }

    #[test]
    fn specialist_rules_keep_table_order() {
        let rules = store();
        let rules = rules.specialist_rules();
        assert_eq!(rules[0].keyword, "breast");
        assert_eq!(rules[0].specialist, "Oncologist");
        assert!(rules[0].regex.is_match("left breast lump"));
        assert!(!rules[0].regex.is_match("abreast of the lesion"));
    }

    #[test]
    fn specialist_keywords_match_derived_forms() {
        let store = store();
        let rule = |keyword: &str| {
            store
                .specialist_rules()
                .iter()
                .find(|r| r.keyword == keyword)
                .unwrap()
                .regex
                .clone()
        };
        assert!(rule("lesion").is_match("multiple lesions noted"));
        assert!(rule("cancer").is_match("cancerous growth"));
        assert!(rule("colon").is_match("colonoscopy advised"));
        assert!(!rule("heart").is_match("sweetheart"));
        assert!(rule("flu").is_match("seasonal flu"));
        assert!(!rule("flu").is_match("free fluid in pelvis"));
        assert!(!rule("uti").is_match("utilization review"));
    }

    #[test]
    fn rejects_inverted_range() {
        let range = ReferenceRange {
            test_name: "Broken".into(),
            aliases: vec![],
            min: 10.0,
            max: 1.0,
            unit: "mg/dL".into(),
            gender_specific: false,
            male_range: None,
            female_range: None,
            higher_is_better: false,
        };
        let err = validate_range(&range).unwrap_err();
        assert!(matches!(err, VocabularyError::InvalidRange { .. }));
    }

    #[test]
    fn rejects_gender_flag_without_sub_ranges() {
        let range = ReferenceRange {
            test_name: "Half".into(),
            aliases: vec![],
            min: 1.0,
            max: 2.0,
            unit: "".into(),
            gender_specific: true,
            male_range: Some(Bounds { min: 1.0, max: 2.0 }),
            female_range: None,
            higher_is_better: false,
        };
        assert!(matches!(
            validate_range(&range),
            Err(VocabularyError::InconsistentRange(_))
        ));
    }

    #[test]
    fn load_from_directory_round_trips_embedded_tables() {
        let dir = tempfile::tempdir().unwrap();
        let sources = TableSources::embedded();
        for (file, body) in [
            (REFERENCE_RANGES_FILE, &sources.reference_ranges),
            (DISEASES_FILE, &sources.diseases),
            (MEDICATIONS_FILE, &sources.medications),
            (SPECIALISTS_FILE, &sources.specialists),
            (ICD10_FILE, &sources.icd10),
            (CONDITION_ADVICE_FILE, &sources.condition_advice),
            (DRUG_INTERACTIONS_FILE, &sources.drug_interactions),
        ] {
            std::fs::write(dir.path().join(file), body).unwrap();
        }

        let loaded = VocabularyStore::load(dir.path()).unwrap();
        assert_eq!(
            loaded.reference_ranges().len(),
            store().reference_ranges().len()
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = VocabularyStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, VocabularyError::Load(..)));
        assert!(err.to_string().contains(REFERENCE_RANGES_FILE));
    }

    #[test]
    fn load_reports_malformed_table() {
        let dir = tempfile::tempdir().unwrap();
        let sources = TableSources::embedded();
        std::fs::write(dir.path().join(REFERENCE_RANGES_FILE), "{not json").unwrap();
        for (file, body) in [
            (DISEASES_FILE, &sources.diseases),
            (MEDICATIONS_FILE, &sources.medications),
            (SPECIALISTS_FILE, &sources.specialists),
            (ICD10_FILE, &sources.icd10),
            (CONDITION_ADVICE_FILE, &sources.condition_advice),
            (DRUG_INTERACTIONS_FILE, &sources.drug_interactions),
        ] {
            std::fs::write(dir.path().join(file), body).unwrap();
        }
        let err = VocabularyStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, VocabularyError::Parse(ref f, _) if f == REFERENCE_RANGES_FILE));
    }
}
