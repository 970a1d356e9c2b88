//! In-band entity selection
//!
//! Clients attach the user's office selection to the message text, e.g.
//! `Considera las oficinas ['001 - Huerfanos', '003 - Cauquenes'] dame el SLA`. The phrase is
//! parsed into a list, stripped from the message, and compared as a set against the thread's
//! current selection to decide whether the derived context must be recomputed.

use crate::error::{PrebuiltError, Result};
use parley_core::state::ConversationState;
use regex::Regex;
use std::sync::LazyLock;

/// Pattern used when none is configured
pub const DEFAULT_SELECTION_PATTERN: &str = r"Considera las oficinas \[(.*?)\]";

static DEFAULT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_SELECTION_PATTERN).unwrap());

/// Compiled selection pattern. Group 1 captures the comma-separated list.
#[derive(Debug, Clone)]
pub struct SelectionPattern {
    regex: Regex,
}

/// A selection found in a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Entities in the order written, quotes and whitespace removed
    pub entities: Vec<String>,
    /// Message text with the selection phrase removed
    pub cleaned: String,
}

impl SelectionPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        if regex.captures_len() < 2 {
            return Err(PrebuiltError::InvalidPattern(format!(
                "'{}' has no capture group for the entity list",
                pattern
            )));
        }
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Parse the selection phrase out of `text`.
    ///
    /// Returns `None` when the phrase is absent or lists no entities.
    pub fn extract(&self, text: &str) -> Option<Selection> {
        let captures = self.regex.captures(text)?;
        let list = captures.get(1)?.as_str();

        let entities: Vec<String> = list
            .split(',')
            .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').trim())
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect();
        if entities.is_empty() {
            return None;
        }

        let cleaned = self.regex.replace_all(text, "").trim().to_string();
        Some(Selection { entities, cleaned })
    }
}

impl Default for SelectionPattern {
    fn default() -> Self {
        Self {
            regex: DEFAULT_REGEX.clone(),
        }
    }
}

/// What the selection router decided for this turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionDecision {
    /// Selection changed: recompute the derived context alongside guidance
    Recompute {
        message_id: String,
        selection: Selection,
    },
    /// Same set as before: keep the derived context
    Reuse {
        message_id: String,
        selection: Selection,
    },
    /// No usable selection: ask the user to pick entities
    Clarify,
}

impl SelectionDecision {
    pub fn needs_recompute(&self) -> bool {
        matches!(self, Self::Recompute { .. })
    }
}

/// Decide the selection route from the last human message.
///
/// The candidate is compared with the set the derived context was computed for, not the
/// last recorded selection.
pub fn route_selection(state: &ConversationState, pattern: &SelectionPattern) -> SelectionDecision {
    let Some(message) = state.last_human() else {
        return SelectionDecision::Clarify;
    };
    let Some(selection) = pattern.extract(message.content()) else {
        return SelectionDecision::Clarify;
    };

    let message_id = message.id().to_string();
    if state.selection_differs(&selection.entities) {
        SelectionDecision::Recompute {
            message_id,
            selection,
        }
    } else {
        SelectionDecision::Reuse {
            message_id,
            selection,
        }
    }
}
