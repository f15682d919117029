//! Output parsers: turn a model's raw text reply into a typed value.
//!
//! - [`TextOutputParser`] — the trimmed reply
//! - [`JsonOutputParser`] — any JSON value found in the reply
//! - [`StructuredOutputParser`] — a schema-validated value of a Rust type
//!
//! Parsers never retry. A reply that cannot be decoded fails with
//! [`RagError::OutputParse`]; re-prompting is left to the caller.

use std::marker::PhantomData;
use std::ops::Range;

use jsonschema::Validator;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{FieldViolation, RagError, Result};

/// Decodes a model reply.
pub trait OutputParser: Send + Sync {
    /// The decoded value.
    type Output: Send;

    /// Decode `text`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::OutputParse`] when the reply cannot be decoded.
    fn parse(&self, text: &str) -> Result<Self::Output>;

    /// Instructions telling the model how to format its reply.
    ///
    /// Inserted verbatim into the prompt's `{format_instructions}` slot.
    fn format_instructions(&self) -> String {
        String::new()
    }
}

/// Returns the reply with surrounding whitespace removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOutputParser;

impl OutputParser for TextOutputParser {
    type Output = String;

    fn parse(&self, text: &str) -> Result<String> {
        Ok(text.trim().to_string())
    }
}

/// Returns the first JSON value found in the reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOutputParser;

impl OutputParser for JsonOutputParser {
    type Output = Value;

    fn parse(&self, text: &str) -> Result<Value> {
        json_candidates(text).next().ok_or_else(no_json)
    }

    fn format_instructions(&self) -> String {
        "Respond with valid JSON only. Do not add commentary before or after it.".to_string()
    }
}

/// Parses replies into `T`, validating them against `T`'s JSON Schema first.
///
/// The schema is derived from `T` once, at construction. Validation reports
/// every field-level problem (missing required field, wrong type) as a
/// [`FieldViolation`] before any deserialization is attempted.
///
/// Unknown fields are ignored unless [`deny_unknown_fields`](Self::deny_unknown_fields)
/// is called.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::{OutputParser, StructuredAnswer, StructuredOutputParser};
///
/// let parser = StructuredOutputParser::<StructuredAnswer>::new()?;
/// let answer = parser.parse(r#"{"summary": "x", "sources": ["a"]}"#)?;
/// ```
pub struct StructuredOutputParser<T> {
    schema: Value,
    validator: Validator,
    _output: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned + JsonSchema> StructuredOutputParser<T> {
    /// Derive `T`'s schema and compile a validator for it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the derived schema does not compile.
    pub fn new() -> Result<Self> {
        let schema = serde_json::to_value(schemars::schema_for!(T))
            .map_err(|e| RagError::Config(format!("cannot serialize output schema: {e}")))?;
        Self::from_schema(schema)
    }

    /// Treat fields not declared by `T` as violations.
    pub fn deny_unknown_fields(self) -> Result<Self> {
        let mut schema = self.schema;
        close_objects(&mut schema);
        Self::from_schema(schema)
    }

    /// The JSON Schema replies are validated against.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    fn from_schema(schema: Value) -> Result<Self> {
        let validator = Validator::new(&schema)
            .map_err(|e| RagError::Config(format!("invalid output schema: {e}")))?;
        Ok(Self { schema, validator, _output: PhantomData })
    }

    fn violations(&self, value: &Value) -> Vec<FieldViolation> {
        self.validator
            .iter_errors(value)
            .map(|e| FieldViolation { path: e.instance_path.to_string(), message: e.to_string() })
            .collect()
    }
}

impl<T: DeserializeOwned + JsonSchema + Send> OutputParser for StructuredOutputParser<T> {
    type Output = T;

    fn parse(&self, text: &str) -> Result<T> {
        let mut first_violations = None;
        for candidate in json_candidates(text) {
            let violations = self.violations(&candidate);
            if violations.is_empty() {
                return serde_json::from_value(candidate).map_err(|e| RagError::OutputParse {
                    message: format!("cannot decode reply: {e}"),
                    violations: Vec::new(),
                });
            }
            first_violations.get_or_insert(violations);
        }

        match first_violations {
            Some(violations) => {
                warn!(violations = violations.len(), "model reply does not match the output schema");
                Err(RagError::OutputParse {
                    message: "reply does not match the output schema".to_string(),
                    violations,
                })
            }
            None => Err(no_json()),
        }
    }

    fn format_instructions(&self) -> String {
        let schema = serde_json::to_string_pretty(&self.schema).unwrap_or_default();
        format!(
            "Respond with a single JSON object that conforms to the JSON schema below. \
             Do not add commentary before or after it.\n\n\
             Here is the output schema:\n```json\n{schema}\n```"
        )
    }
}

/// A short answer plus the sources it was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredAnswer {
    /// A concise answer to the question.
    pub summary: String,
    /// Identifiers of the context passages the answer relies on.
    pub sources: Vec<String>,
}

fn no_json() -> RagError {
    RagError::OutputParse {
        message: "reply contains no decodable JSON".to_string(),
        violations: Vec::new(),
    }
}

/// Every JSON value embedded in `text`, in preference order: fenced code
/// blocks, then the whole reply, then balanced `{...}` / `[...]` spans by
/// start position. Each candidate is decoded only when the iterator reaches it.
fn json_candidates(text: &str) -> impl Iterator<Item = Value> + '_ {
    fenced_blocks(text)
        .into_iter()
        .chain(std::iter::once(text))
        .chain(std::iter::once_with(move || balanced_spans(text)).flatten().map(move |span| &text[span]))
        .filter_map(|s| serde_json::from_str::<Value>(s.trim()).ok())
}

/// Contents of ```` ``` ```` fenced blocks, with the info string (`json`) removed.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let Some(newline) = after.find('\n') else { break };
        let body = &after[newline + 1..];
        let Some(close) = body.find("```") else { break };
        blocks.push(&body[..close]);
        rest = &body[close + 3..];
    }
    blocks
}

/// Byte ranges of every matched bracket pair in `text`, ordered by start.
/// Quotes delimit strings only between brackets; outside them they are prose.
fn balanced_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if !open.is_empty() => in_string = true,
            '{' | '[' => open.push(i),
            '}' | ']' => {
                if let Some(start) = open.pop() {
                    spans.push(start..i + 1);
                }
            }
            _ => {}
        }
    }
    spans.sort_by_key(|span| span.start);
    spans
}

/// Set `additionalProperties: false` on every object schema that declares
/// `properties` and says nothing about extra keys.
fn close_objects(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            if map.contains_key("properties") && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for value in map.values_mut() {
                close_objects(value);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}
