//! Intent classification module.
//!
//! Classifies a normalized query into an operation and a time frame using
//! pre-compiled regular expressions. Each table is an ordered priority list:
//! the first entry whose pattern matches wins, so classification never depends
//! on map iteration order.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Kind of series an intent targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    /// Point-in-time values
    Instant,
    /// Monotonic counters, read through a rate
    Counter,
}

/// Operation requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Rate,
    Avg,
    Sum,
    Count,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Count => "count",
        }
    }
}

/// Relative time frame named in the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFrame {
    LastHour,
    LastDay,
    LastWeek,
}

impl TimeFrame {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastHour => "last_hour",
            Self::LastDay => "last_day",
            Self::LastWeek => "last_week",
        }
    }

    /// Range selector text equivalent to this frame.
    pub fn window(&self) -> &'static str {
        match self {
            Self::LastHour => "1h",
            Self::LastDay => "24h",
            Self::LastWeek => "7d",
        }
    }
}

/// Modifier key holding the label named in a `by <label>` clause.
pub const GROUP_BY_MODIFIER: &str = "group_by";

/// Classified intent of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub intent_type: IntentType,
    pub operation: Option<Operation>,
    pub time_frame: Option<TimeFrame>,
    pub modifiers: BTreeMap<String, String>,
}

impl Intent {
    /// Intent with no operation and no time frame.
    pub fn instant() -> Self {
        Self {
            intent_type: IntentType::Instant,
            operation: None,
            time_frame: None,
            modifiers: BTreeMap::new(),
        }
    }

    pub fn is_counter(&self) -> bool {
        self.intent_type == IntentType::Counter
    }

    pub fn group_by(&self) -> Option<&str> {
        self.modifiers.get(GROUP_BY_MODIFIER).map(String::as_str)
    }
}

lazy_static! {
    /// Time frames in priority order.
    static ref TIME_FRAME_PATTERNS: Vec<(Regex, TimeFrame)> = vec![
        (Regex::new(r"\b(last hour|past hour|1h)\b").unwrap(), TimeFrame::LastHour),
        (Regex::new(r"\b(last day|past day|24h)\b").unwrap(), TimeFrame::LastDay),
        (Regex::new(r"\b(last week|past week|7d)\b").unwrap(), TimeFrame::LastWeek),
    ];

    /// Operations in priority order.
    static ref OPERATION_PATTERNS: Vec<(Regex, Operation)> = vec![
        (Regex::new(r"\b(rate|per second|velocity)\b").unwrap(), Operation::Rate),
        (Regex::new(r"\b(average|mean|avg)\b").unwrap(), Operation::Avg),
        (Regex::new(r"\b(sum|total)\b").unwrap(), Operation::Sum),
        (Regex::new(r"\b(count|number of)\b").unwrap(), Operation::Count),
    ];

    static ref GROUP_BY_PATTERN: Regex = Regex::new(r"\bby ([a-z_][a-z0-9_]*)\b").unwrap();
}

/// Words that follow `by` without naming a label.
const GROUP_BY_STOPWORDS: &[&str] = &[
    "the", "a", "an", "ms", "s", "sec", "second", "m", "min", "minute", "h", "hr", "hour", "d",
    "day", "w", "week", "month", "year",
];

/// Rule-based intent parser.
#[derive(Debug, Clone, Default)]
pub struct IntentParser;

impl IntentParser {
    pub fn new() -> Self {
        Self
    }

    /// Classifies a normalized query.
    ///
    /// The first matching time frame and the first matching operation are
    /// taken from their priority lists. `rate` upgrades the intent type to
    /// [`IntentType::Counter`].
    pub fn parse(&self, query: &str) -> Intent {
        trace!("Classifying intent for query: {}", query);
        let query = query.to_lowercase();

        let time_frame = TIME_FRAME_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(&query))
            .map(|(_, frame)| *frame);

        let operation = OPERATION_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(&query))
            .map(|(_, op)| *op);

        let mut modifiers = BTreeMap::new();
        if let Some(label) = GROUP_BY_PATTERN
            .captures_iter(&query)
            .map(|caps| caps[1].to_string())
            .find(|label| !GROUP_BY_STOPWORDS.contains(&label.as_str()))
        {
            modifiers.insert(GROUP_BY_MODIFIER.to_string(), label);
        }

        let intent_type = if operation == Some(Operation::Rate) {
            IntentType::Counter
        } else {
            IntentType::Instant
        };

        debug!(
            ?intent_type,
            ?operation,
            ?time_frame,
            "classified intent"
        );

        Intent {
            intent_type,
            operation,
            time_frame,
            modifiers,
        }
    }
}
