//! Ranking events by importance.

use crate::{Error, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;

/// The part of an event the model needs to rank it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventSummary {
    /// Event identifier.
    pub id: CompactString,
    /// Event title.
    pub title: String,
}

impl EventSummary {
    /// Create a summary.
    pub fn new(id: impl Into<CompactString>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Instruction asking the model to order `events` by importance.
pub(crate) fn prompt(events: &[EventSummary]) -> String {
    let mut prompt = String::from(
        "Given the following events with IDs and titles, rank them by importance from \
         highest to lowest and return only a JSON array of IDs:\n",
    );
    for (i, event) in events.iter().enumerate() {
        if i > 0 {
            prompt.push('\n');
        }
        let _ = write!(prompt, "- ID: {}, Title: {}", event.id, event.title);
    }
    prompt
}

/// Parse the model's reply into event ids.
///
/// Accepts a bare JSON array or one wrapped in a markdown code fence. Numeric
/// ids are accepted and rendered as strings.
pub(crate) fn parse(reply: &str) -> Result<Vec<CompactString>> {
    let body = strip_fence(reply.trim());
    if body.is_empty() {
        return Err(Error::ModelInference("empty ranking reply".into()));
    }
    let values: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| Error::ModelInference(format!("ranking reply is not a JSON array: {e}")))?;
    values
        .into_iter()
        .map(|value| match value {
            Value::String(id) => Ok(CompactString::from(id)),
            Value::Number(id) => Ok(CompactString::from(id.to_string())),
            other => Err(Error::ModelInference(format!(
                "unexpected id in ranking reply: {other}"
            ))),
        })
        .collect()
}

fn strip_fence(reply: &str) -> &str {
    let Some(rest) = reply.strip_prefix("```") else {
        return reply;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
