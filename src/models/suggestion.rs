//! Suggested questions shown on the chat page

use serde::Serialize;

/// What selecting a suggestion does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    /// Copy the text into the composer; never submits
    PrefillComposer,
}

/// A shortcut shown above the chat composer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuggestedQuestion {
    pub text: &'static str,
    pub action: SuggestionAction,
}

pub static SUGGESTED_QUESTIONS: [SuggestedQuestion; 4] = [
    SuggestedQuestion {
        text: "Any Ayurvedic solutions to keep my blood sugar...",
        action: SuggestionAction::PrefillComposer,
    },
    SuggestedQuestion {
        text: "Do you have any recommendations for anxiety relief?",
        action: SuggestionAction::PrefillComposer,
    },
    SuggestedQuestion {
        text: "What are some Ayurvedic remedies for colds?",
        action: SuggestionAction::PrefillComposer,
    },
    SuggestedQuestion {
        text: "Explain the concept of Doshas in Ayurveda.",
        action: SuggestionAction::PrefillComposer,
    },
];

/// Suggestion at `index`, if any
pub fn suggestion(index: usize) -> Option<&'static SuggestedQuestion> {
    SUGGESTED_QUESTIONS.get(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestions_in_order() {
        let texts: Vec<_> = SUGGESTED_QUESTIONS.iter().map(|q| q.text).collect();
        assert_eq!(
            texts,
            vec![
                "Any Ayurvedic solutions to keep my blood sugar...",
                "Do you have any recommendations for anxiety relief?",
                "What are some Ayurvedic remedies for colds?",
                "Explain the concept of Doshas in Ayurveda.",
            ]
        );
    }

    #[test]
    fn test_suggestion_lookup() {
        assert_eq!(suggestion(1).map(|q| q.text), Some(SUGGESTED_QUESTIONS[1].text));
        assert!(suggestion(4).is_none());
        assert!(SUGGESTED_QUESTIONS
            .iter()
            .all(|q| q.action == SuggestionAction::PrefillComposer));
    }
}
