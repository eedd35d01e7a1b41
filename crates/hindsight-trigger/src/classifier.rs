// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt classification against a rule set.
//!
//! Pure and synchronous: no I/O, no state.

use hindsight_config::model::TriggerConfig;
use hindsight_core::HindsightError;

use crate::rules::{RuleMatch, RuleSet};

/// Outcome of classifying one prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Shorter than the global minimum; not evaluated.
    TooShort,
    /// Long enough, but no rule fired.
    NoMatch,
    Matched(RuleMatch),
}

pub struct TriggerClassifier {
    rules: RuleSet,
    min_prompt_chars: usize,
}

impl TriggerClassifier {
    pub fn new(rules: RuleSet, min_prompt_chars: usize) -> Self {
        Self {
            rules,
            min_prompt_chars,
        }
    }

    pub fn from_config(config: &TriggerConfig) -> Result<Self, HindsightError> {
        Ok(Self::new(
            RuleSet::from_config(config)?,
            config.min_prompt_chars,
        ))
    }

    pub fn classify(&self, prompt: &str) -> Classification {
        let prompt = prompt.trim();
        if prompt.chars().count() < self.min_prompt_chars {
            return Classification::TooShort;
        }
        match self.rules.first_match(prompt) {
            Some(m) => Classification::Matched(m),
            None => Classification::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::TriggerCategory;

    fn classifier() -> TriggerClassifier {
        TriggerClassifier::from_config(&TriggerConfig::default()).unwrap()
    }

    #[test]
    fn short_prompts_are_not_evaluated() {
        assert_eq!(classifier().classify("fix bug"), Classification::TooShort);
        assert_eq!(
            classifier().classify("   fix bug          "),
            Classification::TooShort
        );
    }

    #[test]
    fn long_enough_prompt_is_matched() {
        match classifier().classify("why did we pick sqlite over postgres?") {
            Classification::Matched(m) => {
                assert_eq!(m.category, TriggerCategory::DecisionLookup)
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_prompt() {
        assert_eq!(
            classifier().classify("tell me a joke about compilers"),
            Classification::NoMatch
        );
    }
}
