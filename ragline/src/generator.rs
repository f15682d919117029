//! Answer generation over retrieved context.
//!
//! A [`Generator`] retrieves context for a question through a
//! [`RagPipeline`], renders a chat prompt with `{context}`, `{question}` and
//! `{format_instructions}` slots, calls a [`ChatModel`], and decodes the
//! reply with an [`OutputParser`].

use std::sync::Arc;

use ragline_model::{ChatModel, ChatPromptTemplate, ChatRequest, PromptValues};
use tracing::{debug, error, info, warn};

use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::output::{OutputParser, TextOutputParser};
use crate::pipeline::RagPipeline;

const CONTEXT_SLOT: &str = "context";
const QUESTION_SLOT: &str = "question";
const FORMAT_INSTRUCTIONS_SLOT: &str = "format_instructions";

const DEFAULT_SYSTEM_PROMPT: &str = "Answer the question using only the context provided. \
If the context does not contain the answer, say \"I don't know\".\n\n{format_instructions}";

const DEFAULT_HUMAN_PROMPT: &str = "Context:\n{context}\n\nQuestion:\n{question}";

/// The default prompt: a system message with the answering rules and
/// format instructions, and a human message with the context and question.
pub fn default_prompt() -> Result<ChatPromptTemplate> {
    Ok(ChatPromptTemplate::builder()
        .system(DEFAULT_SYSTEM_PROMPT)
        .human(DEFAULT_HUMAN_PROMPT)
        .build()?)
}

/// A parsed answer together with the context it was generated from.
#[derive(Debug, Clone)]
pub struct GeneratedAnswer<T> {
    /// The parser's output.
    pub output: T,
    /// Retrieved records, nearest first. Empty when the store was empty.
    pub context: Vec<SearchResult>,
}

/// Retrieval-augmented answer generator.
///
/// Construct one via [`Generator::builder()`].
///
/// # Example
///
/// ```rust,ignore
/// use ragline::{Generator, StructuredAnswer, StructuredOutputParser};
///
/// let generator = Generator::builder()
///     .pipeline(pipeline)
///     .model(Arc::new(model))
///     .parser(StructuredOutputParser::<StructuredAnswer>::new()?)
///     .build()?;
///
/// let answer = generator.answer("What is attention?").await?;
/// ```
pub struct Generator<P> {
    pipeline: Arc<RagPipeline>,
    model: Arc<dyn ChatModel>,
    parser: P,
    prompt: ChatPromptTemplate,
    temperature: Option<f32>,
}

impl Generator<TextOutputParser> {
    /// Create a new [`GeneratorBuilder`] that starts with a [`TextOutputParser`].
    pub fn builder() -> GeneratorBuilder<TextOutputParser> {
        GeneratorBuilder {
            pipeline: None,
            model: None,
            parser: TextOutputParser,
            prompt: None,
            temperature: None,
        }
    }
}

impl<P: OutputParser> Generator<P> {
    /// The prompt with format instructions already filled in.
    pub fn prompt(&self) -> &ChatPromptTemplate {
        &self.prompt
    }

    /// The output parser.
    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Answer `question` and return only the parsed output.
    ///
    /// # Errors
    ///
    /// See [`answer_with_context`](Self::answer_with_context).
    pub async fn answer(&self, question: &str) -> Result<P::Output> {
        Ok(self.answer_with_context(question).await?.output)
    }

    /// Answer `question`, returning the parsed output and the retrieved context.
    ///
    /// An empty store is not an error here: the model is asked with empty
    /// context. Every other failure aborts the call.
    ///
    /// # Errors
    ///
    /// - Embedding or store errors from retrieval.
    /// - [`RagError::Model`] if prompt rendering or the model call fails.
    /// - [`RagError::OutputParse`] if the reply cannot be decoded.
    pub async fn answer_with_context(&self, question: &str) -> Result<GeneratedAnswer<P::Output>> {
        let context = match self.pipeline.retrieve(question).await {
            Ok(results) => results,
            Err(RagError::EmptyStore) => {
                warn!("vector store is empty; answering without context");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let context_text = context.iter().map(SearchResult::text).collect::<Vec<_>>().join("\n\n");
        let values = PromptValues::from([
            (CONTEXT_SLOT.to_string(), context_text),
            (QUESTION_SLOT.to_string(), question.to_string()),
        ]);
        let messages = self.prompt.format_messages(&values)?;

        let mut request = ChatRequest::new(messages);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        debug!(model = self.model.name(), context_records = context.len(), "calling chat model");
        let response = self.model.generate(request).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "chat model call failed");
            RagError::from(e)
        })?;

        let output = self.parser.parse(&response.content).map_err(|e| {
            error!(model = %response.model, error = %e, "failed to parse model reply");
            e
        })?;

        info!(model = %response.model, context_records = context.len(), "answer generated");
        Ok(GeneratedAnswer { output, context })
    }
}

/// Builder for constructing a [`Generator`].
///
/// `pipeline` and `model` are required. The parser defaults to
/// [`TextOutputParser`] and the prompt to [`default_prompt()`].
pub struct GeneratorBuilder<P> {
    pipeline: Option<Arc<RagPipeline>>,
    model: Option<Arc<dyn ChatModel>>,
    parser: P,
    prompt: Option<ChatPromptTemplate>,
    temperature: Option<f32>,
}

impl<P: OutputParser> GeneratorBuilder<P> {
    /// Set the retrieval pipeline.
    pub fn pipeline(mut self, pipeline: Arc<RagPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the chat model.
    pub fn model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the output parser.
    pub fn parser<Q: OutputParser>(self, parser: Q) -> GeneratorBuilder<Q> {
        GeneratorBuilder {
            pipeline: self.pipeline,
            model: self.model,
            parser,
            prompt: self.prompt,
            temperature: self.temperature,
        }
    }

    /// Replace the default prompt. It must declare `{context}` and `{question}`.
    pub fn prompt(mut self, prompt: ChatPromptTemplate) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Sampling temperature sent with every request.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the [`Generator`], filling `{format_instructions}` from the parser.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing, or if the
    /// prompt lacks `{context}` or `{question}` or declares any other unfilled slot.
    pub fn build(self) -> Result<Generator<P>> {
        let pipeline =
            self.pipeline.ok_or_else(|| RagError::Config("pipeline is required".to_string()))?;
        let model = self.model.ok_or_else(|| RagError::Config("model is required".to_string()))?;
        let prompt = match self.prompt {
            Some(prompt) => prompt,
            None => default_prompt()?,
        };

        for slot in [CONTEXT_SLOT, QUESTION_SLOT] {
            if !prompt.has_slot(slot) {
                return Err(RagError::Config(format!("prompt must declare a {{{slot}}} slot")));
            }
        }

        let instructions = self.parser.format_instructions();
        if !instructions.is_empty() && !prompt.has_slot(FORMAT_INSTRUCTIONS_SLOT) {
            warn!("prompt has no {{format_instructions}} slot; parser instructions are not sent");
        }
        let prompt = prompt.partial(FORMAT_INSTRUCTIONS_SLOT, instructions);

        let unfilled: Vec<&str> = prompt
            .input_variables()
            .into_iter()
            .filter(|v| *v != CONTEXT_SLOT && *v != QUESTION_SLOT)
            .collect();
        if !unfilled.is_empty() {
            return Err(RagError::Config(format!(
                "prompt declares slots that are never filled: {}",
                unfilled.join(", ")
            )));
        }

        Ok(Generator { pipeline, model, parser: self.parser, prompt, temperature: self.temperature })
    }
}
