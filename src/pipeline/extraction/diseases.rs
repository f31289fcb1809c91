//! Disease mention extraction and canonicalization.
//!
//! Hits come from three passes: vocabulary phrases found verbatim in the text,
//! curated disease-family regexes, and condition spans from the optional
//! entity recognizer. Every hit is canonicalized through [`DiseaseNormalizer`]
//! and tagged with its section and any negation, uncertainty or history cue
//! earlier in the same sentence.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::sections::SectionMap;
use super::types::RecognizedEntity;
use crate::models::enums::EntityCategory;
use crate::models::DiseaseMention;
use crate::pipeline::fuzzy::{FuzzyIndex, NormalizationCache};
use crate::vocabulary::VocabularyStore;

/// Longest vocabulary phrase tried by the verbatim pass, in words.
const MAX_PHRASE_WORDS: usize = 4;
const MIN_PHRASE_CHARS: usize = 4;
/// Raw strings shorter than this are returned lowercased without lookup.
const MIN_NORMALIZE_CHARS: usize = 3;
/// How far back in the sentence a context cue may sit.
const CUE_WINDOW_CHARS: usize = 60;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9][A-Za-z0-9'\-]*").expect("Invalid token regex pattern")
});

/// Disease families, longest alternative first.
static DISEASE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(type 1 diabetes|type 2 diabetes|diabetes mellitus|diabetes|dm)\b",
        r"(?i)\b(high blood pressure|hypertension|htn)\b",
        r"(?i)\b(pneumonia|bronchitis|bronchiolitis|pneumonitis)\b",
        r"(?i)\b(chronic obstructive pulmonary disease|asthma|copd)\b",
        r"(?i)\b(pulmonary tb|tuberculosis|tb)\b",
        r"(?i)\b(covid-19|covid|coronavirus|sars-cov-2)\b",
        r"(?i)\b(cancer|carcinoma|tumou?r|malignancy|neoplasm)\b",
        r"(?i)\b(myocardial infarction|heart attack|cardiac arrest|mi)\b",
        r"(?i)\b(cerebrovascular accident|brain attack|stroke|cva)\b",
        r"(?i)\b(epilepsy|seizures?|convulsions?|fits)\b",
        r"(?i)\b(parkinson's disease|parkinson|alzheimer's disease|alzheimer|dementia|memory loss)\b",
        r"(?i)\b(rheumatoid arthritis|osteoarthritis|arthritis)\b",
        r"(?i)\b(chronic kidney disease|kidney disease|renal failure|ckd)\b",
        r"(?i)\b(liver disease|fatty liver|hepatitis|cirrhosis)\b",
        r"(?i)\b(hypothyroidism|hyperthyroidism|goiter|goitre)\b",
        r"(?i)\b(iron deficiency anemia|iron deficiency|vitamin deficiency|anaemia|anemia)\b",
        r"(?i)\b(depression|anxiety|ptsd|bipolar disorder|bipolar|schizophrenia)\b",
        r"(?i)\b(urinary tract infection|uti|cystitis)\b",
        r"(?i)\b(peptic ulcer|gastritis|gerd|ibd)\b",
        r"(?i)\b(cluster headache|migraine|headache)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid disease regex pattern"))
    .collect()
});

static NEGATION_CUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:no|not|denies|denied|negative\s+for|without|free\s+of|absence\s+of|ruled\s+out)\b")
        .expect("Invalid negation cue regex pattern")
});

/// "Pneumonia ruled out" puts the cue after the term.
static TRAILING_NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s,:]*(?:is\s+|was\s+|has\s+been\s+)?(?:ruled\s+out|excluded|absent)\b")
        .expect("Invalid trailing negation regex pattern")
});

static UNCERTAINTY_CUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:possible|possibly|probable|suspected|suspicious\s+for|likely|rule\s+out|r/o|may\s+have)\b|\?)")
        .expect("Invalid uncertainty cue regex pattern")
});

static HISTORY_CUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:history\s+of|hx\s+of|past\s+history|previous|prior)\b|\bh/o\b)")
        .expect("Invalid history cue regex pattern")
});

/// Raw disease string → canonical vocabulary name.
///
/// Exact case-insensitive lookup first, then token-sort fuzzy match at or above
/// the threshold; below it the lowercased raw string is returned. Results are
/// memoized, so the normalizer can be shared across concurrent extractions.
#[derive(Debug)]
pub struct DiseaseNormalizer {
    vocabulary: Arc<VocabularyStore>,
    index: FuzzyIndex,
    cache: NormalizationCache<String>,
    threshold: f64,
}

impl DiseaseNormalizer {
    pub fn new(vocabulary: Arc<VocabularyStore>, threshold: f64) -> Self {
        let index = FuzzyIndex::new(vocabulary.diseases().iter().map(String::as_str));
        Self {
            vocabulary,
            index,
            cache: NormalizationCache::new(),
            threshold,
        }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let key = NormalizationCache::<String>::key(raw);
        if key.chars().count() < MIN_NORMALIZE_CHARS {
            return key;
        }
        let lookup_key = key.clone();
        self.cache
            .get_or_insert_with(key, || self.lookup(&lookup_key))
    }

    fn lookup(&self, key: &str) -> String {
        if let Some(name) = self.vocabulary.disease_exact(key) {
            return name.to_string();
        }
        match self.index.best_match(key, self.threshold) {
            Some(hit) => self.vocabulary.diseases()[hit.index].clone(),
            None => key.to_string(),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

/// A raw hit before canonicalization. `span` is `None` for recognizer
/// spans that could not be located in the text.
#[derive(Debug, Clone)]
struct RawHit {
    surface: String,
    span: Option<(usize, usize)>,
}

/// All disease mentions in `text`, in text order. Negated mentions are kept
/// so callers can report them; they are never merged with affirmed ones.
pub fn extract_diseases(
    text: &str,
    normalizer: &DiseaseNormalizer,
    recognized: &[RecognizedEntity],
) -> Vec<DiseaseMention> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut hits = vocabulary_phrase_hits(text, &normalizer.vocabulary);
    hits.extend(pattern_hits(text));
    let mut positioned = drop_nested(hits);
    positioned.extend(recognizer_hits(text, recognized));

    let sections = SectionMap::build(text);
    let mut seen: HashSet<(String, Option<String>, bool)> = HashSet::new();
    let mut mentions = Vec::new();

    for hit in positioned {
        let canonical = normalizer.normalize(&hit.surface);
        if canonical.is_empty() {
            continue;
        }
        let mention = annotate(text, &sections, hit, canonical);
        let key = (
            mention.canonical.to_lowercase(),
            mention.section.clone(),
            mention.negated,
        );
        if seen.insert(key) {
            mentions.push(mention);
        }
    }

    tracing::debug!(
        mentions = mentions.len(),
        cached = normalizer.cached_entries(),
        "Disease extraction complete"
    );
    mentions
}

/// Greedy longest-phrase scan: at each word, try the longest run of up to
/// four same-line words that is a vocabulary entry.
fn vocabulary_phrase_hits(text: &str, vocabulary: &VocabularyStore) -> Vec<RawHit> {
    let tokens: Vec<(usize, usize)> = TOKEN
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    let joined_by_spaces = |a: usize, b: usize| {
        text[tokens[a].1..tokens[b].0]
            .chars()
            .all(|c| c == ' ' || c == '\t')
    };

    let mut hits = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let mut matched = 0;
        for n in (1..=MAX_PHRASE_WORDS).rev() {
            let last = i + n - 1;
            if last >= tokens.len() {
                continue;
            }
            if (i..last).any(|k| !joined_by_spaces(k, k + 1)) {
                continue;
            }
            let phrase = (i..=last)
                .map(|k| &text[tokens[k].0..tokens[k].1])
                .collect::<Vec<_>>()
                .join(" ");
            if phrase.chars().count() < MIN_PHRASE_CHARS {
                continue;
            }
            if vocabulary.disease_exact(&phrase).is_some() {
                hits.push(RawHit {
                    surface: phrase,
                    span: Some((tokens[i].0, tokens[last].1)),
                });
                matched = n;
                break;
            }
        }
        i += matched.max(1);
    }
    hits
}

fn pattern_hits(text: &str) -> Vec<RawHit> {
    DISEASE_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(text))
        .filter_map(|caps| {
            let m = caps.get(1)?;
            Some(RawHit {
                surface: m.as_str().to_lowercase(),
                span: Some((m.start(), m.end())),
            })
        })
        .collect()
}

fn recognizer_hits(text: &str, recognized: &[RecognizedEntity]) -> Vec<RawHit> {
    recognized
        .iter()
        .filter(|e| e.category == EntityCategory::Condition)
        .filter(|e| e.text.trim().chars().count() >= MIN_NORMALIZE_CHARS)
        .map(|e| {
            let surface = e.text.trim().to_string();
            let span = Regex::new(&format!("(?i){}", regex::escape(&surface)))
                .ok()
                .and_then(|re| re.find(text))
                .map(|m| (m.start(), m.end()));
            RawHit { surface, span }
        })
        .collect()
}

/// Sort by position and drop hits that sit inside a longer hit
/// ("cancer" inside "Breast Cancer").
fn drop_nested(mut hits: Vec<RawHit>) -> Vec<RawHit> {
    hits.sort_by_key(|h| match h.span {
        Some((start, end)) => (start, usize::MAX - end),
        None => (usize::MAX, 0),
    });

    let mut kept: Vec<RawHit> = Vec::new();
    for hit in hits {
        let nested = match hit.span {
            Some((start, end)) => kept.iter().any(|k| {
                k.span
                    .is_some_and(|(ks, ke)| ks <= start && end <= ke && (ks, ke) != (start, end))
            }),
            None => false,
        };
        if !nested {
            kept.push(hit);
        }
    }
    kept
}

fn annotate(text: &str, sections: &SectionMap, hit: RawHit, canonical: String) -> DiseaseMention {
    let Some((start, end)) = hit.span else {
        return DiseaseMention {
            text: hit.surface,
            canonical,
            negated: false,
            uncertain: false,
            historical: false,
            section: None,
        };
    };

    let before = sentence_prefix(text, start);
    let after = sentence_suffix(text, end);
    let section = sections.section_at(start).map(str::to_string);

    let negated = NEGATION_CUES.is_match(before) || TRAILING_NEGATION.is_match(after);
    let uncertain = UNCERTAINTY_CUES.is_match(before);
    let historical =
        HISTORY_CUES.is_match(before) || section.as_deref().is_some_and(SectionMap::is_history);

    DiseaseMention {
        text: text[start..end].to_string(),
        canonical,
        negated,
        uncertain,
        historical,
        section,
    }
}

fn is_sentence_break(c: char) -> bool {
    matches!(c, '.' | '!' | ';' | '\n')
}

/// Up to [`CUE_WINDOW_CHARS`] characters before `start`, within the same sentence.
fn sentence_prefix(text: &str, start: usize) -> &str {
    let head = &text[..start];
    let sentence_start = head
        .char_indices()
        .rev()
        .find(|(_, c)| is_sentence_break(*c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let sentence = &head[sentence_start..];
    match sentence.char_indices().rev().nth(CUE_WINDOW_CHARS - 1) {
        Some((i, _)) => &sentence[i..],
        None => sentence,
    }
}

fn sentence_suffix(text: &str, end: usize) -> &str {
    let tail = &text[end..];
    let sentence_end = tail
        .char_indices()
        .find(|(_, c)| is_sentence_break(*c))
        .map(|(i, _)| i)
        .unwrap_or(tail.len());
    &tail[..sentence_end]
}
