use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

/// Progressive disclosure tiers. Variant order is the disclosure order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HintLevel {
    Concept,
    ToolArea,
    SyntaxPath,
    FullSolution,
}

impl HintLevel {
    pub const ALL: [HintLevel; 4] = [
        HintLevel::Concept,
        HintLevel::ToolArea,
        HintLevel::SyntaxPath,
        HintLevel::FullSolution,
    ];

    pub const MAX: HintLevel = HintLevel::FullSolution;

    pub fn number(self) -> u8 {
        match self {
            HintLevel::Concept => 1,
            HintLevel::ToolArea => 2,
            HintLevel::SyntaxPath => 3,
            HintLevel::FullSolution => 4,
        }
    }

    /// Maps any integer onto a level; values outside 1..=4 are clamped.
    pub fn clamped(raw: i64) -> Self {
        match raw {
            i64::MIN..=1 => HintLevel::Concept,
            2 => HintLevel::ToolArea,
            3 => HintLevel::SyntaxPath,
            _ => HintLevel::FullSolution,
        }
    }

    pub fn next(self) -> Self {
        Self::clamped(i64::from(self.number()) + 1)
    }

    pub fn remaining(self) -> u8 {
        Self::MAX.number() - self.number()
    }

    pub fn name(self) -> &'static str {
        match self {
            HintLevel::Concept => "Concept",
            HintLevel::ToolArea => "Tool/Area",
            HintLevel::SyntaxPath => "Syntax/Path",
            HintLevel::FullSolution => "Full Solution",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            HintLevel::Concept => "General concept and theory",
            HintLevel::ToolArea => "Which tool or configuration area",
            HintLevel::SyntaxPath => "Concrete command or menu path",
            HintLevel::FullSolution => "Complete solution",
        }
    }

    /// Instruction handed to the generation model for this level.
    pub fn prompt_instruction(self) -> &'static str {
        match self {
            HintLevel::Concept => {
                "Explain only the basic concept or theory behind the question. \
                 Do NOT name any concrete commands or tools. Keep the answer short (2-3 sentences)."
            }
            HintLevel::ToolArea => {
                "Name the relevant tool, program or configuration area. \
                 Do NOT give concrete commands or syntax yet. \
                 Example: 'You need the services manager' or 'Look at the firewall settings'."
            }
            HintLevel::SyntaxPath => {
                "Give the concrete command, menu path or syntax. \
                 The student should be able to run it on their own. Briefly explain the parameters."
            }
            HintLevel::FullSolution => {
                "Give the complete solution with all steps and explain what each step does.\n\
                 - Walk through EVERY single step that appears in the context\n\
                 - Use EXACTLY the IPs, gateways and values from the context\n\
                 - Do NOT invent details that are not in the context\n\
                 - If something is unclear, say so\n\
                 - Format clearly with numbered steps"
            }
        }
    }
}

impl From<HintLevel> for u8 {
    fn from(level: HintLevel) -> Self {
        level.number()
    }
}

impl TryFrom<u8> for HintLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=4 => Ok(HintLevel::clamped(i64::from(value))),
            other => Err(format!("hint level must be between 1 and 4, got {}", other)),
        }
    }
}

impl std::fmt::Display for HintLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.number(), self.name())
    }
}

/// Picks the level to disclose next for one (student, question) pair.
///
/// With no explicit request the student advances one step, saturating at
/// [`HintLevel::MAX`]. An explicit request may repeat the last disclosed level
/// or take the next one; anything outside that window is clamped into it, so
/// the history never moves backwards and never skips a level.
pub fn select_next_level(history: &[HintLevel], requested: Option<i64>) -> HintLevel {
    let last = history.last().copied();
    let ceiling = last.map(HintLevel::next).unwrap_or(HintLevel::Concept);

    match requested {
        None => ceiling,
        Some(raw) => {
            let floor = last.unwrap_or(HintLevel::Concept);
            HintLevel::clamped(raw).clamp(floor, ceiling)
        }
    }
}

/// Identity of a hint history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HintKey {
    pub student_id: String,
    pub question_id: String,
}

impl HintKey {
    pub fn new(student_id: impl Into<String>, question_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            question_id: question_id.into(),
        }
    }
}

/// Stable id for a free-text question: whitespace-collapsed, lowercased, SHA-256.
pub fn question_id_for(question: &str) -> String {
    let normalized = question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintAdvance {
    pub level: HintLevel,
    pub history_len: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HintRequest {
    #[validate(length(min = 1, max = 4000))]
    pub question: String,
    /// Blank ids fall back to the hash of the question text.
    #[serde(default)]
    #[validate(length(max = 128))]
    pub question_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub lab_context: Option<String>,
    /// Level the client asks for; clamped into the allowed window.
    #[serde(default)]
    pub hint_level: Option<i64>,
}

impl HintRequest {
    pub fn resolved_question_id(&self) -> String {
        match &self.question_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => question_id_for(&self.question),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetHintRequest {
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub question: Option<String>,
    #[serde(default)]
    #[validate(length(max = 128))]
    pub question_id: Option<String>,
}

impl ResetHintRequest {
    pub fn resolved_question_id(&self) -> Option<String> {
        match (&self.question_id, &self.question) {
            (Some(id), _) if !id.trim().is_empty() => Some(id.trim().to_string()),
            (_, Some(question)) if !question.trim().is_empty() => Some(question_id_for(question)),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResetHintResponse {
    pub question_id: String,
    pub cleared: bool,
    pub next_level: HintLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePassage {
    pub content: String,
    pub source: Option<String>,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct HintResponse {
    pub hint: String,
    pub hint_level: HintLevel,
    pub hint_level_name: &'static str,
    pub remaining_levels: u8,
    pub question_id: String,
    pub source_passages: Vec<SourcePassage>,
}

#[derive(Debug, Serialize)]
pub struct HintLevelInfo {
    pub level: HintLevel,
    pub name: &'static str,
    pub description: &'static str,
}

impl From<HintLevel> for HintLevelInfo {
    fn from(level: HintLevel) -> Self {
        Self {
            level,
            name: level.name(),
            description: level.description(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(requests: usize) -> Vec<HintLevel> {
        let mut history = Vec::new();
        for _ in 0..requests {
            let level = select_next_level(&history, None);
            history.push(level);
        }
        history
    }

    #[test]
    fn test_fresh_question_starts_at_concept() {
        assert_eq!(select_next_level(&[], None), HintLevel::Concept);
    }

    #[test]
    fn test_levels_advance_and_saturate() {
        let levels: Vec<u8> = run(6).into_iter().map(HintLevel::number).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 4, 4]);
    }

    #[test]
    fn test_sequence_is_non_decreasing_and_bounded() {
        for n in 1..20 {
            let history = run(n);
            assert!(history.windows(2).all(|w| w[0] <= w[1]));
            assert!(history.iter().all(|l| *l <= HintLevel::MAX));
        }
    }

    #[test]
    fn test_requested_level_is_clamped_into_window() {
        let history = vec![HintLevel::Concept, HintLevel::ToolArea];

        // repeat the current level
        assert_eq!(select_next_level(&history, Some(2)), HintLevel::ToolArea);
        // next level
        assert_eq!(select_next_level(&history, Some(3)), HintLevel::SyntaxPath);
        // no skipping
        assert_eq!(select_next_level(&history, Some(4)), HintLevel::SyntaxPath);
        assert_eq!(select_next_level(&history, Some(99)), HintLevel::SyntaxPath);
        // no going back
        assert_eq!(select_next_level(&history, Some(1)), HintLevel::ToolArea);
        assert_eq!(select_next_level(&history, Some(-5)), HintLevel::ToolArea);
    }

    #[test]
    fn test_requested_level_on_fresh_question() {
        assert_eq!(select_next_level(&[], Some(4)), HintLevel::Concept);
        assert_eq!(select_next_level(&[], Some(0)), HintLevel::Concept);
    }

    #[test]
    fn test_beyond_max_is_clamped_not_rejected() {
        let history = vec![HintLevel::FullSolution];
        assert_eq!(select_next_level(&history, Some(5)), HintLevel::FullSolution);
        assert_eq!(select_next_level(&history, None), HintLevel::FullSolution);
    }

    #[test]
    fn test_remaining_levels() {
        assert_eq!(HintLevel::Concept.remaining(), 3);
        assert_eq!(HintLevel::FullSolution.remaining(), 0);
    }

    #[test]
    fn test_level_serializes_as_number() {
        let json = serde_json::to_string(&HintLevel::SyntaxPath).unwrap();
        assert_eq!(json, "3");
        let parsed: HintLevel = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, HintLevel::ToolArea);
        assert!(serde_json::from_str::<HintLevel>("7").is_err());
    }

    #[test]
    fn test_question_id_ignores_case_and_spacing() {
        let a = question_id_for("How do I configure   the Firewall?");
        let b = question_id_for("  how do i configure the firewall?\n");
        let c = question_id_for("How do I configure the router?");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_explicit_question_id_wins() {
        let req = HintRequest {
            question: "firewall configuration".to_string(),
            question_id: Some(" lab-7 ".to_string()),
            lab_context: None,
            hint_level: None,
        };
        assert_eq!(req.resolved_question_id(), "lab-7");
    }

    #[test]
    fn test_blank_question_id_falls_back_to_text_hash() {
        let req = HintRequest {
            question: "firewall configuration".to_string(),
            question_id: Some("  ".to_string()),
            lab_context: None,
            hint_level: None,
        };
        assert!(req.validate().is_ok());
        assert_eq!(
            req.resolved_question_id(),
            question_id_for("firewall configuration")
        );

        let reset = ResetHintRequest {
            question: Some("Firewall   configuration".to_string()),
            question_id: Some(String::new()),
        };
        assert!(reset.validate().is_ok());
        assert_eq!(
            reset.resolved_question_id(),
            Some(question_id_for("firewall configuration"))
        );
    }
}
