//! Prompt templates with `{name}` placeholders.
//!
//! Three layers, each built on the previous one:
//!
//! - [`PromptTemplate`] — a single string with named slots
//! - [`ChatPromptTemplate`] — an ordered list of role-tagged message templates
//! - [`FewShotChatTemplate`] — example conversations rendered through a chat template
//!
//! Literal braces are written `{{` and `}}`. There is no expression language:
//! a slot is a bare name and is replaced by the value verbatim.

use std::collections::{HashMap, HashSet};

use crate::error::{ModelError, Result};
use crate::message::{Message, Role};

/// Values substituted into template slots, keyed by slot name.
pub type PromptValues = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// A text template with named `{slot}` placeholders.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_model::PromptTemplate;
///
/// let prompt = PromptTemplate::new("Tell me a fact about {topic} for a {level} student")?;
/// let text = prompt.format(&HashMap::from([
///     ("topic".to_string(), "Jupiter".to_string()),
///     ("level".to_string(), "Graduate".to_string()),
/// ]))?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
    segments: Vec<Segment>,
    partials: PromptValues,
}

impl PromptTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Template`] on an unclosed `{`, an unmatched `}`,
    /// or a slot whose name is empty or contains whitespace.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let segments = parse_segments(&template)?;
        Ok(Self { template, segments, partials: PromptValues::new() })
    }

    /// The raw template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Slot names still expecting a value, in order of first appearance.
    pub fn input_variables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Slot(name) if !self.partials.contains_key(name) => Some(name.as_str()),
                _ => None,
            })
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Whether `name` appears as a slot (filled or not).
    pub fn has_slot(&self, name: &str) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Slot(n) if n == name))
    }

    /// Pre-fill a slot; the value is used whenever `format` is not given one.
    pub fn partial(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.partials.insert(name.into(), value.into());
        self
    }

    /// Render the template. Values not referenced by any slot are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Template`] naming the first slot that has neither
    /// a value nor a partial.
    pub fn format(&self, values: &PromptValues) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(name) => {
                    let value = values.get(name).or_else(|| self.partials.get(name)).ok_or_else(
                        || ModelError::Template(format!("missing value for variable '{name}'")),
                    )?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn parse_segments(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                literal.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, nc) in chars.by_ref() {
                    if nc == '}' {
                        closed = true;
                        break;
                    }
                    name.push(nc);
                }
                if !closed {
                    return Err(ModelError::Template(format!("unclosed '{{' at byte {pos}")));
                }
                if name.is_empty() || name.chars().any(|ch| ch.is_whitespace() || ch == '{') {
                    return Err(ModelError::Template(format!(
                        "invalid variable name '{name}' at byte {pos}"
                    )));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Slot(name));
            }
            '}' => {
                return Err(ModelError::Template(format!("unmatched '}}' at byte {pos}")));
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

#[derive(Debug, Clone, PartialEq)]
enum ChatPart {
    Message { role: Role, template: PromptTemplate },
    FewShot(FewShotChatTemplate),
}

/// An ordered list of role-tagged message templates.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_model::ChatPromptTemplate;
///
/// let prompt = ChatPromptTemplate::from_messages([
///     ("system", "You are a recipe assistant specializing in {dietary_preference} dishes."),
///     ("human", "{recipe_request}"),
/// ])?;
/// let messages = prompt.format_messages(&values)?;
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatPromptTemplate {
    parts: Vec<ChatPart>,
}

impl ChatPromptTemplate {
    /// Create a new [`ChatPromptTemplateBuilder`].
    pub fn builder() -> ChatPromptTemplateBuilder {
        ChatPromptTemplateBuilder::default()
    }

    /// Build from `(role, template)` pairs; roles accept `system`, `human`/`user`, `ai`/`assistant`.
    pub fn from_messages<I, R, T>(messages: I) -> Result<Self>
    where
        I: IntoIterator<Item = (R, T)>,
        R: AsRef<str>,
        T: Into<String>,
    {
        let parts = messages
            .into_iter()
            .map(|(role, template)| {
                Ok(ChatPart::Message {
                    role: role.as_ref().parse()?,
                    template: PromptTemplate::new(template)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { parts })
    }

    /// A template with a single human message.
    pub fn from_template(template: impl Into<String>) -> Result<Self> {
        Ok(Self {
            parts: vec![ChatPart::Message { role: Role::User, template: PromptTemplate::new(template)? }],
        })
    }

    /// Slot names still expecting a value across all messages, in order of first appearance.
    ///
    /// Slots of few-shot examples are filled by their examples and are not listed.
    pub fn input_variables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.parts
            .iter()
            .filter_map(|p| match p {
                ChatPart::Message { template, .. } => Some(template.input_variables()),
                ChatPart::FewShot(_) => None,
            })
            .flatten()
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Whether any message template declares the slot `name`.
    pub fn has_slot(&self, name: &str) -> bool {
        self.parts.iter().any(|p| match p {
            ChatPart::Message { template, .. } => template.has_slot(name),
            ChatPart::FewShot(_) => false,
        })
    }

    /// Pre-fill a slot in every message template.
    pub fn partial(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        self.parts = self
            .parts
            .into_iter()
            .map(|p| match p {
                ChatPart::Message { role, template } => ChatPart::Message {
                    role,
                    template: template.partial(name.clone(), value.clone()),
                },
                few_shot => few_shot,
            })
            .collect();
        self
    }

    /// Render every part into concrete messages, in order.
    pub fn format_messages(&self, values: &PromptValues) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for part in &self.parts {
            match part {
                ChatPart::Message { role, template } => {
                    messages.push(Message::new(*role, template.format(values)?));
                }
                ChatPart::FewShot(few_shot) => messages.extend(few_shot.format_messages()?),
            }
        }
        Ok(messages)
    }
}

/// Builder for a [`ChatPromptTemplate`]; templates are parsed in [`build()`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct ChatPromptTemplateBuilder {
    parts: Vec<PendingPart>,
}

#[derive(Debug, Clone)]
enum PendingPart {
    Message(Role, String),
    FewShot(FewShotChatTemplate),
}

impl ChatPromptTemplateBuilder {
    /// Append a message template with an explicit role.
    pub fn message(mut self, role: Role, template: impl Into<String>) -> Self {
        self.parts.push(PendingPart::Message(role, template.into()));
        self
    }

    /// Append a system message template.
    pub fn system(self, template: impl Into<String>) -> Self {
        self.message(Role::System, template)
    }

    /// Append a human (user) message template.
    pub fn human(self, template: impl Into<String>) -> Self {
        self.message(Role::User, template)
    }

    /// Append an AI (assistant) message template.
    pub fn ai(self, template: impl Into<String>) -> Self {
        self.message(Role::Assistant, template)
    }

    /// Append few-shot examples at this position.
    pub fn few_shot(mut self, few_shot: FewShotChatTemplate) -> Self {
        self.parts.push(PendingPart::FewShot(few_shot));
        self
    }

    /// Parse all templates and build the [`ChatPromptTemplate`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Template`] if any template is malformed.
    pub fn build(self) -> Result<ChatPromptTemplate> {
        let parts = self
            .parts
            .into_iter()
            .map(|p| match p {
                PendingPart::Message(role, text) => {
                    Ok(ChatPart::Message { role, template: PromptTemplate::new(text)? })
                }
                PendingPart::FewShot(few_shot) => Ok(ChatPart::FewShot(few_shot)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ChatPromptTemplate { parts })
    }
}

/// Example conversations rendered through an example template, in order.
///
/// With no examples the template renders nothing, which turns a few-shot
/// prompt into its zero-shot form.
#[derive(Debug, Clone, PartialEq)]
pub struct FewShotChatTemplate {
    examples: Vec<PromptValues>,
    example_prompt: ChatPromptTemplate,
}

impl FewShotChatTemplate {
    /// Create a few-shot block from examples and the template used to render each one.
    pub fn new(examples: Vec<PromptValues>, example_prompt: ChatPromptTemplate) -> Self {
        Self { examples, example_prompt }
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether there are no examples.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Render all examples.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Template`] if an example lacks a value the example template needs.
    pub fn format_messages(&self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for example in &self.examples {
            messages.extend(self.example_prompt.format_messages(example)?);
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> PromptValues {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn formats_multiple_slots() {
        let prompt = PromptTemplate::new("Tell me a fact about {topic} for a {level} student").unwrap();
        assert_eq!(prompt.input_variables(), vec!["topic", "level"]);

        let text = prompt.format(&values(&[("topic", "Jupiter"), ("level", "Graduate")])).unwrap();
        assert_eq!(text, "Tell me a fact about Jupiter for a Graduate student");
    }

    #[test]
    fn escaped_braces_are_literal() {
        let prompt = PromptTemplate::new("{{\"name\": {name}}}").unwrap();
        assert_eq!(prompt.input_variables(), vec!["name"]);
        assert_eq!(prompt.format(&values(&[("name", "\"Amey\"")])).unwrap(), "{\"name\": \"Amey\"}");
    }

    #[test]
    fn repeated_slot_listed_once() {
        let prompt = PromptTemplate::new("{a} and {a} and {b}").unwrap();
        assert_eq!(prompt.input_variables(), vec!["a", "b"]);
    }

    #[test]
    fn rejects_malformed_templates() {
        assert!(PromptTemplate::new("open {brace").is_err());
        assert!(PromptTemplate::new("stray } brace").is_err());
        assert!(PromptTemplate::new("empty {} slot").is_err());
        assert!(PromptTemplate::new("spaced {two words} slot").is_err());
    }

    #[test]
    fn missing_value_is_an_error() {
        let prompt = PromptTemplate::new("Hello {name}").unwrap();
        let err = prompt.format(&PromptValues::new()).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn partial_fills_and_hides_slot() {
        let prompt = PromptTemplate::new("{format_instructions}\n{question}")
            .unwrap()
            .partial("format_instructions", "Reply in JSON.");
        assert_eq!(prompt.input_variables(), vec!["question"]);
        assert_eq!(prompt.format(&values(&[("question", "why?")])).unwrap(), "Reply in JSON.\nwhy?");
    }

    #[test]
    fn chat_template_renders_roles_in_order() {
        let prompt = ChatPromptTemplate::from_messages([
            ("system", "You specialize in {dietary_preference} dishes made in {cooking_time}."),
            ("human", "{recipe_request}"),
        ])
        .unwrap();

        assert_eq!(
            prompt.input_variables(),
            vec!["dietary_preference", "cooking_time", "recipe_request"]
        );

        let messages = prompt
            .format_messages(&values(&[
                ("cooking_time", "15 min"),
                ("dietary_preference", "Vegan"),
                ("recipe_request", "Quick Snack"),
            ]))
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "You specialize in Vegan dishes made in 15 min.");
        assert_eq!(messages[1], Message::user("Quick Snack"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(ChatPromptTemplate::from_messages([("narrator", "x")]).is_err());
    }

    #[test]
    fn few_shot_examples_precede_the_question() {
        let example_prompt =
            ChatPromptTemplate::from_messages([("human", "{input}"), ("ai", "{output}")]).unwrap();
        let few_shot = FewShotChatTemplate::new(
            vec![
                values(&[("input", "I love the new design!"), ("output", "Positive")]),
                values(&[("input", "The app keeps crashing."), ("output", "Negative")]),
            ],
            example_prompt,
        );

        let prompt = ChatPromptTemplate::builder()
            .system("Classify the sentiment as Positive, Negative, or Neutral.")
            .few_shot(few_shot)
            .human("{text}")
            .build()
            .unwrap();

        assert_eq!(prompt.input_variables(), vec!["text"]);

        let messages = prompt.format_messages(&values(&[("text", "Delivery was late.")])).unwrap();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[2].content, "Positive");
        assert_eq!(messages[5].content, "Delivery was late.");
    }

    #[test]
    fn zero_shot_is_few_shot_without_examples() {
        let example_prompt = ChatPromptTemplate::from_template("{input}").unwrap();
        let few_shot = FewShotChatTemplate::new(Vec::new(), example_prompt);
        assert!(few_shot.is_empty());

        let prompt = ChatPromptTemplate::builder().few_shot(few_shot).human("{text}").build().unwrap();
        let messages = prompt.format_messages(&values(&[("text", "hi")])).unwrap();
        assert_eq!(messages, vec![Message::user("hi")]);
    }

    #[test]
    fn chat_partial_applies_to_all_messages() {
        let prompt = ChatPromptTemplate::builder()
            .system("{format_instructions}")
            .human("{question} ({format_instructions})")
            .build()
            .unwrap()
            .partial("format_instructions", "JSON only");

        assert_eq!(prompt.input_variables(), vec!["question"]);
        assert!(prompt.has_slot("format_instructions"));
        let messages = prompt.format_messages(&values(&[("question", "q")])).unwrap();
        assert_eq!(messages[1].content, "q (JSON only)");
    }
}
