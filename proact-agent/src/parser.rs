//! Response parser.
//!
//! Turns the model's final text into mission nodes. Decoding happens in two
//! passes: the text is first read as a generic JSON value, then the value is
//! walked into typed nodes. Text that is not JSON at all is the only
//! failure worth asking the model again for.

use mission::{MissionError, MissionFields, MissionLevel, MissionNode, MissionPeriodType};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Errors from parsing a model reply.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The text is not valid JSON
    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// Valid JSON that does not follow the mission-array contract
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// The described missions cannot be built
    #[error("Invalid mission: {0}")]
    InvalidMission(#[from] MissionError),
}

impl ParseError {
    /// Whether regenerating the reply may help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }
}

/// Remove a surrounding markdown code fence, if any.
///
/// Handles a leading ```` ```json ```` or bare ```` ``` ```` and a trailing
/// ```` ``` ````. Text without a fence is only trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Parse a reply into mission nodes of the given period type, each with its
/// steps attached.
pub fn parse_missions(
    raw: &str,
    period: MissionPeriodType,
) -> Result<Vec<MissionNode>, ParseError> {
    let text = strip_code_fence(raw);

    let value: Value = serde_json::from_str(text).map_err(|e| {
        debug!(raw = %raw, "Undecodable model answer");
        ParseError::MalformedResponse {
            reason: e.to_string(),
        }
    })?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ParseError::UnexpectedShape(format!(
                "expected an array of missions, got {}",
                json_type_name(&other)
            )))
        }
    };

    let missions = items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_mission(index, item, period))
        .collect::<Result<Vec<_>, _>>()?;

    if missions.is_empty() {
        warn!("Model answered with an empty mission array");
    }
    debug!(count = missions.len(), "Parsed missions");

    Ok(missions)
}

fn parse_mission(
    index: usize,
    item: &Value,
    period: MissionPeriodType,
) -> Result<MissionNode, ParseError> {
    let object = item.as_object().ok_or_else(|| {
        ParseError::UnexpectedShape(format!(
            "mission {index} is {}, expected an object",
            json_type_name(item)
        ))
    })?;

    let title = required_str(object, "title").ok_or_else(|| {
        ParseError::UnexpectedShape(format!("mission {index} has no string `title`"))
    })?;
    let description = optional_str(object, "description", index)?;

    let mut mapping = Map::new();
    mapping.insert("title".to_string(), json!(title));
    mapping.insert("description".to_string(), json!(description));
    mapping.insert("level".to_string(), json!(MissionLevel::Mission.as_str()));
    mapping.insert("type".to_string(), json!(period.as_str()));
    let mut mission = MissionNode::from_mapping(mapping)?;

    let steps = match lookup(object, "steps") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(steps)) => steps.as_slice(),
        Some(other) => {
            return Err(ParseError::UnexpectedShape(format!(
                "mission {index} has {} `steps`, expected an array",
                json_type_name(other)
            )))
        }
    };

    for step in steps {
        mission.attach_child(parse_step(index, step, period)?)?;
    }

    Ok(mission)
}

fn parse_step(
    index: usize,
    item: &Value,
    period: MissionPeriodType,
) -> Result<MissionNode, ParseError> {
    let fields = match item {
        Value::String(title) => MissionFields::titled(title.trim()),
        Value::Object(object) => {
            let title = required_str(object, "title").ok_or_else(|| {
                ParseError::UnexpectedShape(format!(
                    "a step of mission {index} has no string `title`"
                ))
            })?;
            MissionFields::titled(title).with_description(optional_str(object, "description", index)?)
        }
        other => {
            return Err(ParseError::UnexpectedShape(format!(
                "a step of mission {index} is {}, expected a string",
                json_type_name(other)
            )))
        }
    };

    Ok(MissionNode::create(MissionLevel::Step, Some(period), fields)?)
}

/// Field lookup that also accepts the capitalised key (`Title`, `Steps`).
fn lookup<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        let mut chars = key.chars();
        let capitalised: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => return None,
        };
        object.get(&capitalised)
    })
}

fn required_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    lookup(object, key).and_then(Value::as_str).map(str::trim)
}

fn optional_str(
    object: &Map<String, Value>,
    key: &str,
    index: usize,
) -> Result<String, ParseError> {
    match lookup(object, key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.trim().to_string()),
        Some(other) => Err(ParseError::UnexpectedShape(format!(
            "mission {index} has {} `{key}`, expected a string",
            json_type_name(other)
        ))),
    }
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
