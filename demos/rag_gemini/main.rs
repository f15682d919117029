//! # RAG with Gemini Example
//!
//! Asks Gemini a question directly, then again with context retrieved from
//! the given sources. Embeddings and chat both go through Gemini, each
//! wrapped in the default retry policy.
//!
//! Requires `GOOGLE_API_KEY` (or `GEMINI_API_KEY`).
//!
//! Run: `cargo run -p ragline-demos --example rag_gemini --features gemini -- \
//!       "What is Olympus Mons?" notes.txt`

use std::sync::Arc;

use ragline::{
    DistanceMetric, GeminiEmbeddingProvider, Generator, InMemoryVectorStore, RagConfig,
    RagPipeline, RetryingEmbeddingProvider, loader_for,
};
use ragline_model::{ChatModel, GeminiChatModel, Message, RetryConfig, RetryingChatModel};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let question = args.next().unwrap_or_else(|| "What is retrieval-augmented generation?".to_string());
    let sources: Vec<String> = args.collect();

    let model: Arc<dyn ChatModel> =
        Arc::new(RetryingChatModel::new(GeminiChatModel::from_env()?, RetryConfig::default()));

    // -- 1. Plain chat ----------------------------------------------------
    let direct = model.invoke(vec![Message::user(question.as_str())]).await?;
    println!("Without context:\n{direct}\n");

    if sources.is_empty() {
        return Ok(());
    }

    // -- 2. Index the sources ---------------------------------------------
    let embedder = GeminiEmbeddingProvider::from_env()?.with_output_dimensionality(768);
    let pipeline = Arc::new(
        RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(RetryingEmbeddingProvider::new(embedder, RetryConfig::default())))
            .vector_store(Arc::new(InMemoryVectorStore::new(DistanceMetric::Cosine)))
            .build()?,
    );
    for source in &sources {
        let report = pipeline.index(loader_for(source)?.as_ref()).await?;
        println!("{source}: {} chunk(s)", report.chunks);
    }

    // -- 3. Answer with retrieved context ---------------------------------
    let generator = Generator::builder().pipeline(pipeline).model(model).temperature(0.0).build()?;
    let answer = generator.answer_with_context(&question).await?;
    println!("\nWith context ({} passage(s)):\n{}", answer.context.len(), answer.output);
    Ok(())
}
