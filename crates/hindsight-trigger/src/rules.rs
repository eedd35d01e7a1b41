// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-driven trigger rules.
//!
//! A rule fires on any keyword (case-insensitive substring) or any pattern
//! (case-insensitive regex). Priority and cooldown are plain data so rule
//! sets can be loaded from configuration and tested on their own.

use std::str::FromStr;
use std::time::Duration;

use hindsight_config::model::{TriggerConfig, TriggerRuleConfig};
use hindsight_core::HindsightError;
use hindsight_memory::MemoryCategory;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// What a prompt is about, as far as memory is concerned.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TriggerCategory {
    PastWork,
    DecisionLookup,
    BugLookup,
    TechnicalTopic,
    Decision,
    Preference,
    Setup,
}

/// Whether a category reads from memory or asks the caller to write to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Read,
    Write,
}

impl TriggerCategory {
    pub fn intent(self) -> Intent {
        match self {
            TriggerCategory::PastWork
            | TriggerCategory::DecisionLookup
            | TriggerCategory::BugLookup
            | TriggerCategory::TechnicalTopic => Intent::Read,
            TriggerCategory::Decision | TriggerCategory::Preference | TriggerCategory::Setup => {
                Intent::Write
            }
        }
    }

    /// Memory category a write-intent reminder suggests saving under.
    pub fn memory_category(self) -> Option<MemoryCategory> {
        match self {
            TriggerCategory::Decision => Some(MemoryCategory::Decision),
            TriggerCategory::Preference => Some(MemoryCategory::Preference),
            TriggerCategory::Setup => Some(MemoryCategory::Context),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Rule priority. `Critical` outranks everything.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Minimum spacing between two firings of the same category in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    Turns(u32),
    Duration(Duration),
}

/// One compiled trigger rule.
#[derive(Debug, Clone)]
pub struct TriggerRule {
    pub category: TriggerCategory,
    keywords: Vec<String>,
    patterns: Vec<Regex>,
    pub priority: Priority,
    pub cooldown: Option<Cooldown>,
    pub min_chars: Option<usize>,
}

impl TriggerRule {
    pub fn new(
        category: TriggerCategory,
        keywords: &[&str],
        patterns: &[&str],
        priority: Priority,
    ) -> Result<Self, HindsightError> {
        Ok(Self {
            category,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            patterns: compile_patterns(patterns.iter().copied())?,
            priority,
            cooldown: None,
            min_chars: None,
        })
    }

    pub fn with_cooldown(mut self, cooldown: Cooldown) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = Some(min_chars);
        self
    }

    /// Whether the rule fires on `prompt`. `lower` is `prompt` lowercased.
    fn fires(&self, prompt: &str, lower: &str) -> bool {
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
            || self.patterns.iter().any(|p| p.is_match(prompt))
    }

    fn from_config(config: &TriggerRuleConfig) -> Result<Self, HindsightError> {
        let category = TriggerCategory::from_str(&config.category).map_err(|_| {
            HindsightError::Config(format!("unknown trigger category `{}`", config.category))
        })?;
        let priority = Priority::from_str(&config.priority).map_err(|_| {
            HindsightError::Config(format!("unknown trigger priority `{}`", config.priority))
        })?;
        let cooldown = match (config.cooldown_secs, config.cooldown_turns) {
            (Some(secs), _) => Some(Cooldown::Duration(Duration::from_secs(secs))),
            (None, Some(turns)) => Some(Cooldown::Turns(turns)),
            (None, None) => None,
        };
        Ok(Self {
            category,
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
            patterns: compile_patterns(config.patterns.iter().map(String::as_str))?,
            priority,
            cooldown,
            min_chars: config.min_chars,
        })
    }
}

fn compile_patterns<'a>(
    patterns: impl Iterator<Item = &'a str>,
) -> Result<Vec<Regex>, HindsightError> {
    patterns
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| HindsightError::Config(format!("invalid trigger pattern `{p}`: {e}")))
        })
        .collect()
}

/// A rule that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    pub category: TriggerCategory,
    pub priority: Priority,
    pub cooldown: Option<Cooldown>,
    /// Position of the rule in its set.
    pub index: usize,
}

/// Ordered list of rules evaluated by one matcher.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<TriggerRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<TriggerRule>) -> Self {
        Self { rules }
    }

    /// Rules from `[[trigger.rules]]`, or the built-in set when none are given.
    pub fn from_config(config: &TriggerConfig) -> Result<Self, HindsightError> {
        if config.rules.is_empty() {
            return Self::builtin();
        }
        let rules = config
            .rules
            .iter()
            .map(TriggerRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// The default rules.
    pub fn builtin() -> Result<Self, HindsightError> {
        use TriggerCategory::*;

        let rules = vec![
            TriggerRule::new(
                BugLookup,
                &["traceback", "stack trace", "exception", "segfault", "regression"],
                &[
                    r"\b(error|bug|crash(es|ed)?|panic(s|ked)?|broken|failing|fails)\b",
                    r"\b(fix|debug)(ing|ed)?\b",
                ],
                Priority::Critical,
            )?
            .with_cooldown(Cooldown::Turns(2)),
            TriggerRule::new(
                DecisionLookup,
                &["what did we decide", "which approach", "why did we", "why do we"],
                &[r"\bwhy (are|is) we (using|on)\b", r"\b(decision|rationale) (for|on|about)\b"],
                Priority::High,
            )?
            .with_cooldown(Cooldown::Turns(3)),
            TriggerRule::new(
                PastWork,
                &[
                    "last time",
                    "previously",
                    "remember when",
                    "did we",
                    "have we",
                    "we already",
                    "earlier we",
                ],
                &[r"\bhow did (we|i)\b", r"\b(last|previous) (session|week|sprint)\b"],
                Priority::High,
            )?
            .with_cooldown(Cooldown::Turns(3)),
            TriggerRule::new(
                Decision,
                &[
                    "we decided",
                    "decided to",
                    "let's go with",
                    "lets go with",
                    "going with",
                    "we'll use",
                    "let's use",
                    "the decision is",
                ],
                &[r"\bwe (will|should) (use|switch to|adopt)\b"],
                Priority::Medium,
            )?
            .with_cooldown(Cooldown::Turns(2)),
            TriggerRule::new(
                Preference,
                &[
                    "i prefer",
                    "i'd rather",
                    "i don't like",
                    "always use",
                    "never use",
                    "from now on",
                ],
                &[r"\bplease (always|never)\b"],
                Priority::Medium,
            )?
            .with_cooldown(Cooldown::Turns(2)),
            TriggerRule::new(
                Setup,
                &["set up", "installed", "environment variable", "runs on port"],
                &[r"\b(configured|setup) (the|a|our)\b", r"\bthe (port|path|url) is\b"],
                Priority::Low,
            )?
            .with_cooldown(Cooldown::Turns(3)),
            TriggerRule::new(
                TechnicalTopic,
                &[],
                &[
                    r"\b(database|schema|migrations?|endpoint|api|architecture|performance)\b",
                    r"\b(auth\w*|deploy\w*|cach\w+|config\w*)\b",
                ],
                Priority::Low,
            )?
            .with_cooldown(Cooldown::Turns(5))
            .with_min_chars(25),
        ];
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// Highest-priority rule firing on `prompt`; declaration order breaks ties.
    ///
    /// Rules whose `min_chars` exceeds the prompt length are skipped.
    pub fn first_match(&self, prompt: &str) -> Option<RuleMatch> {
        let lower = prompt.to_lowercase();
        let chars = prompt.chars().count();
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.min_chars.is_none_or(|min| chars >= min))
            .filter(|(_, r)| r.fires(prompt, &lower))
            .min_by_key(|(i, r)| (std::cmp::Reverse(r.priority), *i))
            .map(|(index, r)| RuleMatch {
                category: r.category,
                priority: r.priority,
                cooldown: r.cooldown,
                index,
            })
    }
}
