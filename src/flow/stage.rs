//! Conversation stage machine.

use serde::{Deserialize, Serialize};

/// The stages of the intake conversation.
///
/// Progresses linearly: GeneratingQuestions → ProblemQuestions → Signup →
/// FirmographicQuestions → GeneratingSummary → Summary. The only backward
/// edge is the explicit, user-initiated Summary → ProblemQuestions ("edit
/// answers") regression; the stage never moves backward on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    GeneratingQuestions,
    ProblemQuestions,
    Signup,
    FirmographicQuestions,
    GeneratingSummary,
    Summary,
}

impl Stage {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, target),
            (GeneratingQuestions, ProblemQuestions)
                | (ProblemQuestions, Signup)
                | (Signup, FirmographicQuestions)
                | (FirmographicQuestions, GeneratingSummary)
                | (GeneratingSummary, Summary)
                // user-initiated "edit answers"
                | (Summary, ProblemQuestions)
        )
    }

    /// Get the next stage in the forward progression, if any.
    pub fn next(&self) -> Option<Stage> {
        use Stage::*;
        match self {
            GeneratingQuestions => Some(ProblemQuestions),
            ProblemQuestions => Some(Signup),
            Signup => Some(FirmographicQuestions),
            FirmographicQuestions => Some(GeneratingSummary),
            GeneratingSummary => Some(Summary),
            Summary => None,
        }
    }

    /// Whether this is the entry stage of a fresh flow.
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::GeneratingQuestions)
    }

    /// Parse the persisted wire name.
    pub fn parse(s: &str) -> Option<Stage> {
        use Stage::*;
        match s {
            "generating-questions" => Some(GeneratingQuestions),
            "problem-questions" => Some(ProblemQuestions),
            "signup" => Some(Signup),
            "firmographic-questions" => Some(FirmographicQuestions),
            "generating-summary" => Some(GeneratingSummary),
            "summary" => Some(Summary),
            _ => None,
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::GeneratingQuestions
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::GeneratingQuestions => "generating-questions",
            Self::ProblemQuestions => "problem-questions",
            Self::Signup => "signup",
            Self::FirmographicQuestions => "firmographic-questions",
            Self::GeneratingSummary => "generating-summary",
            Self::Summary => "summary",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Stage; 6] = [
        Stage::GeneratingQuestions,
        Stage::ProblemQuestions,
        Stage::Signup,
        Stage::FirmographicQuestions,
        Stage::GeneratingSummary,
        Stage::Summary,
    ];

    #[test]
    fn forward_transitions_are_valid() {
        for window in ALL.windows(2) {
            assert!(
                window[0].can_transition_to(window[1]),
                "{} should transition to {}",
                window[0],
                window[1]
            );
        }
    }

    #[test]
    fn edit_answers_regression_is_valid() {
        assert!(Stage::Summary.can_transition_to(Stage::ProblemQuestions));
    }

    #[test]
    fn invalid_transitions() {
        use Stage::*;
        // Skip stages
        assert!(!GeneratingQuestions.can_transition_to(Signup));
        assert!(!ProblemQuestions.can_transition_to(FirmographicQuestions));
        // Go backward (other than the edit regression)
        assert!(!Signup.can_transition_to(ProblemQuestions));
        assert!(!Summary.can_transition_to(FirmographicQuestions));
        // Self-transition
        assert!(!Signup.can_transition_to(Signup));
    }

    #[test]
    fn next_walks_the_full_order() {
        let mut current = Stage::GeneratingQuestions;
        for expected in &ALL[1..] {
            let next = current.next().unwrap();
            assert_eq!(next, *expected);
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn ordering_matches_progression() {
        assert!(Stage::FirmographicQuestions >= Stage::FirmographicQuestions);
        assert!(Stage::Summary >= Stage::FirmographicQuestions);
        assert!(Stage::Signup < Stage::FirmographicQuestions);
    }

    #[test]
    fn display_parse_and_serde_agree() {
        for stage in ALL {
            let wire = stage.to_string();
            assert_eq!(Stage::parse(&wire), Some(stage));
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{wire}\""));
        }
        assert_eq!(Stage::parse("loading"), None);
    }
}
