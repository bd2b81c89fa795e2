use serde::{Deserialize, Serialize};

fn d_true() -> bool {
    true
}
fn d_recency_turns() -> usize {
    3
}
fn d_fuzzy_threshold() -> f32 {
    0.6
}

fn d_ordinal_words() -> Vec<String> {
    ["ראשון", "שני", "שלישי", "רביעי", "חמישי", "אחרון"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn d_demonstrative_words() -> Vec<String> {
    ["זה", "זאת", "ההוא", "ההיא", "אותו", "אותה"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn d_back_reference_words() -> Vec<String> {
    ["הקודם", "הקודמת", "האחרון", "האחרונה"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn d_decision_patterns() -> Vec<String> {
    [
        r"(?:החלטה|החלטת)\s*(?:מספר\s*)?(\d+)",
        r"החלטה\s+(\d+)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn d_government_patterns() -> Vec<String> {
    [
        r"ממשלה\s*(?:מספר\s*)?(\d+)",
        r"של\s*ממשלה\s*(\d+)",
        r"ממשלת\s*(\d+)",
        r"(?:עבור|בממשלה)\s*(\d+)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn d_date_range_patterns() -> Vec<String> {
    [
        r"בין\s*(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4})\s*[-–—]\s*(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4})",
        r"מ[־\-]?(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4})\s*עד\s*(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4})",
        r"(?:מתאריך|מיום)\s*(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4})\s*(?:עד|ל)\s*(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4})",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Closed Hebrew vocabulary for reference-token and entity scanning,
/// exposed in config for locale tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceVocabulary {
    #[serde(default = "d_ordinal_words")]
    pub ordinal_words: Vec<String>,
    #[serde(default = "d_demonstrative_words")]
    pub demonstrative_words: Vec<String>,
    #[serde(default = "d_back_reference_words")]
    pub back_reference_words: Vec<String>,
    #[serde(default = "d_decision_patterns")]
    pub decision_patterns: Vec<String>,
    #[serde(default = "d_government_patterns")]
    pub government_patterns: Vec<String>,
    #[serde(default = "d_date_range_patterns")]
    pub date_range_patterns: Vec<String>,
}

impl Default for ReferenceVocabulary {
    fn default() -> Self {
        Self {
            ordinal_words: d_ordinal_words(),
            demonstrative_words: d_demonstrative_words(),
            back_reference_words: d_back_reference_words(),
            decision_patterns: d_decision_patterns(),
            government_patterns: d_government_patterns(),
            date_range_patterns: d_date_range_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    #[serde(default = "d_true")]
    pub reference_resolution_enabled: bool,
    #[serde(default = "d_recency_turns")]
    pub recency_emphasis_turns: usize,
    #[serde(default = "d_fuzzy_threshold")]
    pub fuzzy_threshold: f32,
    pub reference_vocabulary: ReferenceVocabulary,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            reference_resolution_enabled: true,
            recency_emphasis_turns: d_recency_turns(),
            fuzzy_threshold: d_fuzzy_threshold(),
            reference_vocabulary: ReferenceVocabulary::default(),
        }
    }
}
