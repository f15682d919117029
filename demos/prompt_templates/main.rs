//! # Prompt Templates Example
//!
//! Formats a plain template, a chat template with a partial, and a few-shot
//! chat template, then sends the few-shot prompt to a scripted model.
//!
//! Run: `cargo run -p ragline-demos --example prompt_templates`

use std::sync::Arc;

use ragline_model::{
    ChatModel, ChatPromptTemplate, FewShotChatTemplate, MockChatModel, PromptTemplate,
    PromptValues,
};

fn values<const N: usize>(pairs: [(&str, &str); N]) -> PromptValues {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    // -- 1. Plain template ------------------------------------------------
    let fact = PromptTemplate::new("Tell me a fact about {topic} for a {level} student")?;
    println!("Slots: {:?}", fact.input_variables());
    println!("{}\n", fact.format(&values([("topic", "Jupiter"), ("level", "Graduate")]))?);

    // -- 2. Chat template with a partial ----------------------------------
    let chat = ChatPromptTemplate::from_messages([
        ("system", "You are a {persona}. Answer in one sentence."),
        ("human", "{question}"),
    ])?
    .partial("persona", "patient astronomy tutor");
    for message in chat.format_messages(&values([("question", "Why is Mars red?")]))? {
        println!("[{}] {}", message.role.as_str(), message.content);
    }
    println!();

    // -- 3. Few-shot chat template ----------------------------------------
    let example_prompt = ChatPromptTemplate::from_messages([("human", "{text}"), ("ai", "{label}")])?;
    let examples = vec![
        values([("text", "I loved every minute of it."), ("label", "Positive")]),
        values([("text", "The food was cold and bland."), ("label", "Negative")]),
    ];
    let classifier = ChatPromptTemplate::builder()
        .system("Classify the sentiment of the text as Positive or Negative.")
        .few_shot(FewShotChatTemplate::new(examples, example_prompt))
        .human("{text}")
        .build()?;

    let messages = classifier.format_messages(&values([("text", "What a wonderful view!")]))?;
    for message in &messages {
        println!("[{}] {}", message.role.as_str(), message.content);
    }

    let model: Arc<dyn ChatModel> = Arc::new(MockChatModel::new(["Positive"]));
    println!("\nModel says: {}", model.invoke(messages).await?);
    Ok(())
}
