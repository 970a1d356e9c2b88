//! Conversation state and state deltas
//!
//! The engine is generic over a [`GraphState`]: a serializable snapshot plus an `Update`
//! type nodes return. Updates are applied in a fixed order, so the same sequence of node
//! outputs always yields the same state.
//!
//! [`ConversationState`] is the state the prebuilt agents run on:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `messages` | Message log, edited only through [`MessageOp`]s |
//! | `selected_entities` | Entities (offices) the user picked in-band |
//! | `derived_context` | Summary recomputed whenever the selection set changes |
//! | `context_entities` | Selection `derived_context` was last computed for |
//! | `guidance` | Instruction text handed from the guidance stage to the analyst |
//!
//! Selections compare as sets: `["A", "B"]` and `["B", "A"]` are the same selection.
//! Change detection compares against `context_entities`, which is only written together
//! with `derived_context`. A turn that records a new selection but fails before the context
//! is rebuilt therefore still counts as a change on the next turn.

use crate::error::Result;
use crate::messages::{apply_ops, last_human, Message, MessageOp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;

/// State a graph runs over
pub trait GraphState:
    Clone + Default + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Delta produced by one node
    type Update: Clone + Default + Debug + Serialize + Send + Sync + 'static;

    /// Fold one delta into the state
    fn apply(&mut self, update: Self::Update) -> Result<()>;
}

/// State of one conversation thread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    pub messages: Vec<Message>,

    #[serde(default)]
    pub selected_entities: Vec<String>,

    #[serde(default)]
    pub derived_context: String,

    #[serde(default)]
    pub context_entities: Vec<String>,

    #[serde(default)]
    pub guidance: String,
}

impl ConversationState {
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn last_human(&self) -> Option<&Message> {
        last_human(&self.messages)
    }

    /// Whether `candidate` names a different set of entities than the one the derived
    /// context was computed for
    pub fn selection_differs(&self, candidate: &[String]) -> bool {
        !same_selection(&self.context_entities, candidate)
    }
}

impl GraphState for ConversationState {
    type Update = StateDelta;

    fn apply(&mut self, update: StateDelta) -> Result<()> {
        apply_ops(&mut self.messages, update.messages);

        if let Some(entities) = update.selected_entities {
            self.selected_entities = entities;
        }
        if let Some(context) = update.derived_context {
            self.derived_context = context;
        }
        if let Some(entities) = update.context_entities {
            self.context_entities = entities;
        }
        if let Some(guidance) = update.guidance {
            self.guidance = guidance;
        }
        Ok(())
    }
}

/// Changes a node makes to a [`ConversationState`].
///
/// `None` leaves a field untouched; `Some` replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<MessageOp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_entities: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_entities: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delta appending a single message
    pub fn append(message: Message) -> Self {
        Self::new().with_message(message)
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(MessageOp::Append(message));
        self
    }

    pub fn with_removal(mut self, id: impl Into<String>) -> Self {
        self.messages.push(MessageOp::RemoveById(id.into()));
        self
    }

    pub fn with_selected_entities(mut self, entities: Vec<String>) -> Self {
        self.selected_entities = Some(entities);
        self
    }

    pub fn with_derived_context(mut self, context: impl Into<String>) -> Self {
        self.derived_context = Some(context.into());
        self
    }

    /// Derived context together with the selection it was computed for
    pub fn with_context_for(mut self, entities: Vec<String>, context: impl Into<String>) -> Self {
        self.context_entities = Some(entities);
        self.with_derived_context(context)
    }

    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    /// Clear selection, derived context and guidance
    pub fn reset_context(self) -> Self {
        self.with_selected_entities(Vec::new())
            .with_context_for(Vec::new(), "")
            .with_guidance("")
    }

    /// Messages appended by this delta, in order
    pub fn appended(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter_map(|op| match op {
            MessageOp::Append(message) => Some(message),
            MessageOp::RemoveById(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.selected_entities.is_none()
            && self.derived_context.is_none()
            && self.context_entities.is_none()
            && self.guidance.is_none()
    }
}

/// Set equality over entity identifiers
pub fn same_selection(a: &[String], b: &[String]) -> bool {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

/// Sorted, de-duplicated copy of a selection
pub fn normalize_selection(entities: &[String]) -> Vec<String> {
    entities
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
