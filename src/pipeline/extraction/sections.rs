//! Report sections: heading positions, the findings paragraph, and
//! recommendation sentences.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(past\s+medical\s+history|family\s+history|chief\s+complaints?|history|impression|findings|conclusion|opinion|diagnosis|assessment|plan|recommendations?|advice|medications?|examination|investigations)[ \t]*(?::|$)",
    )
    .expect("Invalid section heading regex pattern")
});

static FINDINGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\b(?:IMPRESSION|FINDINGS|CONCLUSION|OPINION)[:\s]*(.*?)(?:\n[ \t]*\n|\z)")
        .expect("Invalid findings regex pattern")
});

/// Keyword-led clauses; group 1 runs to the next period.
static RECOMMENDATION_CLAUSES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:recommend|recommendation|suggest|suggestion|advise|advice|prescribe|prescription)\s+([^.]+)",
        r"(?i)\b(?:should|must|need to|required to|advised to)\s+([^.]+)",
        r"(?i)\b(?:follow|continue|maintain|keep|take|use|apply)\s+([^.]+)",
        r"(?i)\b(?:follow.?up|re.?visit|return|next appointment|schedule|book)\s+([^.]+)",
        r"(?i)\b(?:avoid|do not|don't|refrain from|stop|discontinue|cease)\s+([^.]+)",
        r"(?i)\b(?:monitor|check|test|measure|track|watch)\s+([^.]+)",
        r"(?i)\b(?:increase|decrease|reduce|limit|restrict|modify)\s+([^.]+)",
        r"(?i)\b(?:exercise|physical activity|workout|fitness|yoga|walking)\s+([^.]+)",
        r"(?i)\b(?:diet|nutrition|food|meal|eat|consume|intake)\s+([^.]+)",
        r"(?i)\b(?:rest|sleep|hydration|water|fluids|drink)\s+([^.]+)",
        r"(?i)\b(?:consult|see|visit|meet|contact|call|refer)\s+([^.]+)",
        r"(?i)\b(?:emergency|urgent|immediate|asap|right away)\s+([^.]+)",
        r"(?i)\b(?:prevent|prevention|protect|protection)\s+([^.]+)",
        r"(?i)\b(?:treatment|therapy|medication|medicine|drug)\s+([^.]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid recommendation regex pattern"))
    .collect()
});

static RECOMMENDATION_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:recommend|suggest|advise|prescribe|should|must|need to|follow|continue|maintain|keep|take|use|apply|avoid|do not|don't|refrain|stop|discontinue|monitor|check|test|measure|track|watch|increase|decrease|reduce|limit|restrict|modify|exercise|physical activity|workout|fitness|yoga|walking|diet|nutrition|food|meal|eat|consume|intake|rest|sleep|hydration|water|fluids|drink|consult|see|visit|meet|contact|call|refer|emergency|urgent|immediate|asap|right away|prevent|protect|treatment|therapy|medication|medicine|drug|follow-up|followup|re-visit|return|next appointment|schedule|book|appointment)",
    )
    .expect("Invalid recommendation keyword regex pattern")
});

static ADVICE_SECTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)\b(?:recommendations?|advice|suggestions?|follow.?up)[:\s]+(.*?)(?:\n[ \t]*\n|\z)",
        r"(?is)\b(?:treatment\s+plan|plan|management)[:\s]+(.*?)(?:\n[ \t]*\n|\z)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid advice section regex pattern"))
    .collect()
});

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.!?]\s+|\n").expect("Invalid sentence break regex pattern")
});

/// Heading names treated as history context for disease mentions.
const HISTORY_SECTIONS: &[&str] = &["history", "past medical history", "family history"];

/// Byte offsets of recognized section headings, in text order.
#[derive(Debug, Clone, Default)]
pub struct SectionMap {
    headings: Vec<(usize, String)>,
}

impl SectionMap {
    pub fn build(text: &str) -> Self {
        let headings = SECTION_HEADING
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                Some((whole.start(), canonical_heading(name.as_str())))
            })
            .collect();
        Self { headings }
    }

    /// The most recent heading at or before `offset`.
    pub fn section_at(&self, offset: usize) -> Option<&str> {
        self.headings
            .iter()
            .take_while(|(start, _)| *start <= offset)
            .last()
            .map(|(_, name)| name.as_str())
    }

    pub fn is_history(section: &str) -> bool {
        HISTORY_SECTIONS.contains(&section)
    }

    pub fn len(&self) -> usize {
        self.headings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }
}

fn canonical_heading(raw: &str) -> String {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    match name.as_str() {
        "recommendations" => "recommendation".to_string(),
        "medication" => "medications".to_string(),
        "chief complaints" => "chief complaint".to_string(),
        _ => name,
    }
}

/// Content of the first IMPRESSION / FINDINGS / CONCLUSION / OPINION heading,
/// up to the next blank line. Empty when absent.
pub fn extract_findings(text: &str) -> String {
    FINDINGS
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Deduplicated, sorted recommendation sentences.
pub fn extract_recommendations(text: &str) -> Vec<String> {
    let mut found = BTreeSet::new();

    for pattern in RECOMMENDATION_CLAUSES.iter() {
        for caps in pattern.captures_iter(text) {
            let Some(clause) = caps.get(1) else { continue };
            let clause = clause.as_str().trim();
            let len = clause.chars().count();
            if len > 10 && len < 200 {
                found.insert(clause.to_string());
            }
        }
    }

    for sentence in SENTENCE_BREAK.split(text) {
        let sentence = sentence.trim();
        let len = sentence.chars().count();
        if len > 15 && len < 300 && RECOMMENDATION_KEYWORDS.is_match(sentence) {
            found.insert(sentence.to_string());
        }
    }

    for pattern in ADVICE_SECTIONS.iter() {
        let Some(content) = pattern.captures(text).and_then(|caps| caps.get(1)) else {
            continue;
        };
        for sentence in SENTENCE_BREAK.split(content.as_str()) {
            let sentence = sentence.trim();
            if sentence.chars().count() > 15 {
                found.insert(sentence.to_string());
            }
        }
    }

    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn findings_stop_at_blank_line() {
        let text = "History: fever\n\nIMPRESSION: Mild cardiomegaly.\nNo effusion.\n\nAdvice: review";
        assert_eq!(extract_findings(text), "Mild cardiomegaly.\nNo effusion.");
    }

    #[test]
    fn findings_run_to_end_of_text() {
        assert_eq!(extract_findings("Conclusion:\n  Normal study"), "Normal study");
    }

    #[test]
    fn no_findings_heading_is_empty() {
        assert_eq!(extract_findings("Hemoglobin: 10.5 g/dL"), "");
    }

    #[test]
    fn recommendations_are_sorted_and_deduplicated() {
        let text = "Advice: Avoid fried and oily food. Walk for thirty minutes daily.\n\n\
                    Patient should avoid fried and oily food.";
        let recs = extract_recommendations(text);
        let mut sorted = recs.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(recs, sorted);
        assert!(recs.contains(&"Avoid fried and oily food".to_string()));
        assert!(recs.contains(&"Walk for thirty minutes daily.".to_string()));
    }

    #[test]
    fn short_clauses_are_dropped() {
        let recs = extract_recommendations("Take rest.");
        assert!(recs.is_empty());
    }

    #[test]
    fn keyword_needs_word_start() {
        let recs = extract_recommendations("Findings are noted because of mass effect");
        assert!(recs.is_empty());
    }

    #[test]
    fn empty_text_has_no_recommendations() {
        assert!(extract_recommendations("").is_empty());
    }

    #[test]
    fn section_map_tracks_latest_heading() {
        let text = "PAST MEDICAL HISTORY:\nDiabetes\nIMPRESSION:\nPneumonia";
        let map = SectionMap::build(text);
        assert_eq!(map.len(), 2);
        assert_eq!(map.section_at(text.find("Diabetes").unwrap()), Some("past medical history"));
        assert_eq!(map.section_at(text.find("Pneumonia").unwrap()), Some("impression"));
        assert_eq!(map.section_at(0), Some("past medical history"));
        assert!(SectionMap::is_history("past medical history"));
    }

    #[test]
    fn text_before_any_heading_has_no_section() {
        let text = "Fever for 3 days\nDiagnosis: Dengue";
        let map = SectionMap::build(text);
        assert_eq!(map.section_at(2), None);
        assert_eq!(map.section_at(text.find("Dengue").unwrap()), Some("diagnosis"));
    }
}
