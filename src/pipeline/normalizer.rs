//! Post-OCR text cleanup.
//!
//! Two passes: a table of known OCR misreads and abbreviations rewritten in
//! place, then fuzzy correction of leftover words against a reference-term list.
//! Only corrects when the best reference term is unique and scores at or above
//! the configured threshold. Output is stable under re-normalization.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::fuzzy::FuzzyIndex;

/// Words shorter than this are never fuzzy-corrected.
const MIN_FUZZY_WORD_CHARS: usize = 4;

/// A single rule can re-match text it exposed (`xx xx`), so rules run to a fixpoint.
const MAX_FIX_PASSES: usize = 4;

struct FixRule {
    regex: Regex,
    replacement: String,
}

/// Build a case-insensitive whole-token rule. Hyphens count as part of a token
/// so `hs-CRP` and `CA-125` are never split apart by abbreviation rules.
fn fix(body: &str, replacement: &str) -> FixRule {
    FixRule {
        regex: Regex::new(&format!(r"(?i)(^|[^\w-])(?:{body})([^\w-]|$)"))
            .expect("Invalid OCR fix regex pattern"),
        replacement: format!("${{1}}{replacement}${{2}}"),
    }
}

/// Known OCR misreads and shorthand, applied in order.
static FIX_RULES: LazyLock<Vec<FixRule>> = LazyLock::new(|| {
    vec![
        // Neurology / oncology medicines
        fix(r"Leven?fil|Levepil|Levitol|Levipl|Levapil|Lupinil", "Levipil"),
        fix(r"Trexayey|Taxzol|Taxoil|xpodary|Taxoll?|Tacsul", "Taxol"),
        fix(r"Pactol", "Paclitaxel"),
        fix(r"Docetxel|Docetazol", "Docetaxel"),
        fix(r"T\s*Komin\s*D3|Tpomin(?:\s+D3?)?", "Homium D"),
        fix(r"Tiloba|Flova|Flooba", "Floba"),
        fix(r"xx", ""),
        // Cardio / metabolic medicines
        fix(r"Amlo|Amlof", "Amlodipine"),
        fix(r"Ator|Atrovast|Atrosat", "Atorvastatin"),
        fix(r"Ecospriin?", "Ecosprin"),
        fix(r"Aspiriin|Asporin", "Aspirin"),
        fix(r"Clopidogrll?|Clopidogil|Clopidoral", "Clopidogrel"),
        fix(r"Metfor|Metforin|Metmorf", "Metformin"),
        // GI medicines
        fix(r"Pantaprazole|Pantaprozole|Pantazol", "Pantoprazole"),
        fix(r"Omiz|Omizol", "Omeprazole"),
        fix(r"Rabeprazol|Rabezole", "Rabeprazole"),
        // Pain / antibiotics
        fix(r"Paracetmol|Paracetemol|Paracitamol|Paracitamyl", "Paracetamol"),
        fix(r"Augmantin|Amoxyclav", "Augmentin"),
        fix(r"Amoxycilin|Amoxillin", "Amoxicillin"),
        fix(r"Azit|Azitromicin|Azitral", "Azithromycin"),
        fix(r"Cefix|Cefixim|Cefiximee|Cefexim", "Cefixime"),
        fix(r"Ceftriaxon|Ceftriax", "Ceftriaxone"),
        // Conditions
        fix(r"Paraphysical", "Pharyngeal"),
        fix(r"Carcinomaa", "Carcinoma"),
        fix(r"Metts|Metases", "Metastases"),
        fix(r"Nafecal\s+Sign|Nofocal", "No Focal Sign"),
        fix(r"Diabities|Diabetees", "Diabetes"),
        fix(r"Hypertention|Hypertenion", "Hypertension"),
        fix(r"Tuberclosis|Tuberculasis", "Tuberculosis"),
        fix(r"Asthama|Asthamaic|Asthamma", "Asthma"),
        // Tests / procedures
        fix(r"E\.E\.G|EEGG", "EEG"),
        fix(r"E\.M\.G|EMGG", "EMG"),
        fix(r"NCVV", "NCV"),
        fix(r"V\.E\.P", "VEP"),
        fix(r"B\.E\.R\.A", "BERA"),
        fix(r"N\.T\.R\.E", "NTRE"),
        fix(r"PETCT|Pet\s+Scan", "PET-CT"),
        fix(r"CT\s+Scan|C\.T\.\s+Scan", "CT-Scan"),
        fix(r"MRI\s+Scan|MR\s+I", "MRI"),
        fix(r"Xray|X\s+Ray", "X-Ray"),
        fix(r"Sonograpy", "Sonography"),
        fix(r"Ultrasond|Ultrasonik", "Ultrasound"),
        // Prescription shorthand
        fix(r"Rx", "Prescription"),
        fix(r"Syp", "Syrup"),
        fix(r"Tab", "Tablet"),
        fix(r"Cap", "Capsule"),
        fix(r"Inj", "Injection"),
        fix(r"Oint", "Ointment"),
        fix(r"Drp", "Drops"),
        fix(r"Soln", "Solution"),
        fix(r"Susp", "Suspension"),
        // Dose units
        fix(r"mgm|MGS", "mg"),
        fix(r"mc\s+gm|micc?g|mcgm", "mcg"),
        fix(r"mlt", "ml"),
        fix(r"grms?", "g"),
        // Frequency and timing
        fix(r"BD", "2 times daily"),
        fix(r"TDS", "3 times daily"),
        fix(r"QID", "4 times daily"),
        fix(r"OD", "once daily"),
        fix(r"QHS", "at night"),
        fix(r"HS", "at bedtime"),
        fix(r"SOS", "if needed"),
        fix(r"STAT", "immediately"),
        fix(r"QOD", "every other day"),
        fix(r"QWK", "once weekly"),
        // Disease short forms
        fix(r"HTN", "Hypertension"),
        fix(r"DM", "Diabetes Mellitus"),
        fix(r"COPD", "Chronic Obstructive Pulmonary Disease"),
        fix(r"CKD", "Chronic Kidney Disease"),
        fix(r"CLD", "Chronic Liver Disease"),
        fix(r"RA", "Rheumatoid Arthritis"),
        fix(r"OA", "Osteoarthritis"),
        fix(r"TB", "Tuberculosis"),
        fix(r"AML", "Acute Myeloid Leukemia"),
        // Test names
        fix(r"HB1C|HBAIC", "HbA1c"),
        fix(r"Thyroid\s+Proflie", "Thyroid Profile"),
        fix(r"LFTS", "LFT"),
        fix(r"KFTS", "KFT"),
        fix(r"RFTS", "RFT"),
        fix(r"Echocardiagram", "Echocardiogram"),
        fix(r"Doplr", "Doppler"),
        fix(r"Urin", "Urine"),
        // Vitals
        fix(r"Bp", "BP"),
        fix(r"PR", "Pulse Rate"),
        fix(r"Temp", "Temperature"),
        fix(r"Wt", "Weight"),
        fix(r"Ht", "Height"),
        fix(r"SpO|SPO2", "SpO2"),
        fix(r"IU", "IU"),
        fix(r"ECHO", "Echo"),
    ]
});

/// Canonical spellings that noisy words may be corrected to.
const REFERENCE_TERMS: &[&str] = &[
    // Medicines
    "Levipil", "Taxol", "Floba", "Paracetamol", "Amlodipine", "Atorvastatin", "Metformin",
    "Pantoprazole", "Omeprazole", "Rabeprazole", "Azithromycin", "Cefixime", "Ceftriaxone",
    "Augmentin", "Amoxicillin", "Clopidogrel", "Ecosprin", "Aspirin", "Insulin", "Metoprolol",
    "Losartan", "Telmisartan", "Ramipril", "Levothyroxine", "Prednisolone",
    "Hydroxychloroquine", "Chloroquine", "Remdesivir", "Favipiravir", "Dexamethasone",
    "Hydrocortisone", "Methylprednisolone", "Cetirizine", "Levocetirizine", "Fexofenadine",
    "Montelukast", "Salbutamol", "Budesonide", "Formoterol", "Tiotropium", "Theophylline",
    "Glibenclamide", "Glimepiride", "Gliclazide", "Sitagliptin", "Vildagliptin", "Linagliptin",
    "Pioglitazone", "Canagliflozin", "Dapagliflozin", "Empagliflozin", "Rosuvastatin",
    "Simvastatin", "Ezetimibe", "Fenofibrate", "Gemfibrozil", "Atenolol", "Bisoprolol",
    "Propranolol", "Carvedilol", "Nebivolol", "Digoxin", "Furosemide", "Spironolactone",
    "Amiodarone", "Warfarin", "Heparin", "Enoxaparin", "Apixaban", "Rivaroxaban", "Dabigatran",
    "Nitroglycerin", "Ranolazine", "Ivabradine", "Amoxiclav", "Ciprofloxacin", "Ofloxacin",
    "Levofloxacin", "Moxifloxacin", "Doxycycline", "Tetracycline", "Minocycline", "Linezolid",
    "Vancomycin", "Teicoplanin", "Meropenem", "Imipenem", "Cefuroxime", "Clarithromycin",
    "Erythromycin", "Metronidazole", "Tinidazole", "Albendazole", "Ivermectin", "Praziquantel",
    "Artemisinin", "Artemether", "Lumefantrine", "Quinine", "Chloramphenicol", "Paclitaxel",
    "Docetaxel",
    // Conditions
    "Metastases", "Carcinoma", "Diabetes", "Hypertension", "Tuberculosis", "Asthma",
    "Osteoarthritis", "Migraine", "Epilepsy", "Stroke", "Depression", "Leukemia", "Lymphoma",
    "GERD", "Cirrhosis", "Pneumonia", "Bronchitis", "Sinusitis", "Tonsillitis", "Anemia",
    "Thalassemia", "Hemophilia", "Gout", "Psoriasis", "Eczema", "Vitiligo",
    // Tests and procedures
    "EEG", "EMG", "NCV", "VEP", "BERA", "NTRE", "MRI", "Sonography", "Ultrasound",
    "Echocardiogram", "Doppler", "HbA1c", "LFT", "KFT", "RFT", "CBC", "Temperature", "SpO2",
    "ECG", "Echo", "Angiography", "Angioplasty", "Biopsy", "FNAC", "Mammogram", "Colonoscopy",
    "Endoscopy", "Gastroscopy", "Bronchoscopy", "Laparoscopy", "Hysteroscopy", "Uroflowmetry",
    "CRP", "ESR",
    // General terms
    "Prescription", "Tablet", "Capsule", "Syrup", "Injection", "Ointment", "Drops", "Solution",
    "Suspension", "Dose", "oral", "topical", "intravenous", "subcutaneous", "intramuscular",
    "infusion", "Allergy", "Contraindication", "Referral", "Specialist", "Neurologist",
    "Oncologist", "Cardiologist", "Endocrinologist", "Nephrologist", "Hepatologist",
    "Pulmonologist", "Orthopedic", "Dermatologist", "Psychiatrist", "Physiotherapist",
];

/// Apply the OCR-fix table to `text`, each rule to a fixpoint.
pub fn apply_ocr_fixes(text: &str) -> String {
    let mut current = text.replace("\r\n", "\n");
    for rule in FIX_RULES.iter() {
        for _ in 0..MAX_FIX_PASSES {
            let next = match rule.regex.replace_all(&current, rule.replacement.as_str()) {
                Cow::Owned(next) => next,
                Cow::Borrowed(_) => break,
            };
            if next == current {
                break;
            }
            current = next;
        }
    }
    current
}

/// OCR-error correction plus fuzzy cleanup against reference terms.
#[derive(Debug)]
pub struct TextNormalizer {
    terms: Vec<&'static str>,
    term_keys: HashSet<String>,
    index: FuzzyIndex,
    threshold: f64,
}

impl TextNormalizer {
    pub fn new(threshold: f64) -> Self {
        // Terms that a fix rule would rewrite are never fuzzy targets,
        // otherwise a second pass could undo the first.
        let terms: Vec<&'static str> = REFERENCE_TERMS
            .iter()
            .copied()
            .filter(|t| t.chars().all(char::is_alphanumeric))
            .filter(|t| !FIX_RULES.iter().any(|rule| rule.regex.is_match(t)))
            .collect();
        let term_keys = terms.iter().map(|t| t.to_lowercase()).collect();
        let index = FuzzyIndex::new(terms.iter().copied());

        Self {
            terms,
            term_keys,
            index,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Full normalization: fix table, then fuzzy word correction.
    /// Whitespace and line structure are preserved.
    pub fn normalize(&self, text: &str) -> String {
        let fixed = apply_ocr_fixes(text);
        self.correct_words(&fixed)
    }

    fn correct_words(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut word_buf = String::new();

        for ch in text.chars() {
            if ch.is_alphanumeric() {
                word_buf.push(ch);
            } else {
                if !word_buf.is_empty() {
                    result.push_str(self.try_correct_word(&word_buf));
                    word_buf.clear();
                }
                result.push(ch);
            }
        }

        if !word_buf.is_empty() {
            result.push_str(self.try_correct_word(&word_buf));
        }

        result
    }

    /// Unique best reference term for `word`, or the word unchanged.
    fn try_correct_word<'a>(&'a self, word: &'a str) -> &'a str {
        if word.chars().count() < MIN_FUZZY_WORD_CHARS || !word.chars().all(char::is_alphabetic) {
            return word;
        }

        if self.term_keys.contains(&word.to_lowercase()) {
            return word;
        }

        match self.index.best_match(word, self.threshold) {
            Some(hit) if !hit.ambiguous => self.terms[hit.index],
            _ => word,
        }
    }
}
