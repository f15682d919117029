//! # RAG with OpenAI Example
//!
//! Indexes the given sources into a persistent file-backed store, then
//! answers a question with OpenAI embeddings and chat completions. Both
//! clients are wrapped in the default retry policy.
//!
//! Requires `OPENAI_API_KEY`.
//!
//! Run: `cargo run -p ragline-demos --example rag_openai --features openai -- \
//!       "What is Olympus Mons?" notes.txt data.csv`

use std::sync::Arc;

use ragline::{
    DistanceMetric, FileVectorStore, Generator, OpenAIEmbeddingProvider, RagConfig, RagPipeline,
    RetryingEmbeddingProvider, StructuredAnswer, StructuredOutputParser, loader_for,
};
use ragline_model::{OpenAIChatModel, RetryConfig, RetryingChatModel};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let question = args.next().unwrap_or_else(|| "What do my notes say about Mars?".to_string());
    let sources: Vec<String> = args.collect();

    let embedder = RetryingEmbeddingProvider::new(OpenAIEmbeddingProvider::from_env()?, RetryConfig::default());
    let model = RetryingChatModel::new(OpenAIChatModel::from_env()?, RetryConfig::default());

    let index_path = std::env::temp_dir().join("ragline-demo").join("index.json");
    let store = FileVectorStore::open(&index_path, DistanceMetric::Cosine).await?;
    info!(path = %index_path.display(), "opened vector store");

    let pipeline = Arc::new(
        RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(embedder))
            .vector_store(Arc::new(store))
            .build()?,
    );

    for source in &sources {
        let loader = loader_for(source)?;
        let report = pipeline.index(loader.as_ref()).await?;
        println!("{source}: {} document(s), {} chunk(s)", report.documents, report.chunks);
    }
    println!("Store holds {} chunk(s)\n", pipeline.count().await?);

    let generator = Generator::builder()
        .pipeline(pipeline)
        .model(Arc::new(model))
        .parser(StructuredOutputParser::<StructuredAnswer>::new()?)
        .temperature(0.0)
        .build()?;

    let answer = generator.answer_with_context(&question).await?;
    println!("Q: {question}");
    println!("A: {}", answer.output.summary);
    for result in &answer.context {
        let cited = answer.output.sources.contains(&result.record.id);
        println!("  [{:.3}]{} {}", result.distance, if cited { " *" } else { "" }, result.record.id);
    }
    Ok(())
}
