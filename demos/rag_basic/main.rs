//! # RAG Basic Example
//!
//! Indexes a small text file, retrieves context for a question and asks a
//! scripted chat model for a structured answer.
//!
//! Uses `InMemoryVectorStore`, the default `RecursiveChunker`, a bag-of-words
//! `WordHashEmbedder` and `MockChatModel`, so it runs with **zero API keys**.
//!
//! Run: `cargo run -p ragline-demos --example rag_basic`

use std::sync::Arc;

use ragline::{
    DistanceMetric, EmbeddingProvider, Generator, InMemoryVectorStore, RagConfig, RagPipeline,
    StructuredAnswer, StructuredOutputParser, loader_for,
};
use ragline_model::MockChatModel;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// WordHashEmbedder: deterministic bag-of-words vectors for offline demos
// ---------------------------------------------------------------------------

struct WordHashEmbedder {
    dimensions: usize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for WordHashEmbedder {
    async fn embed(&self, text: &str) -> ragline::Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "word-hash"
    }
}

const NOTES: &str = "\
Mars is the fourth planet from the Sun. Its surface is covered in iron oxide dust, \
which gives it a reddish colour.

Olympus Mons on Mars is the tallest volcano in the solar system, about three times \
the height of Mount Everest.

Jupiter is the largest planet. Its Great Red Spot is a storm larger than Earth.
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // -- 1. Write a source file and pick a loader for it ------------------
    let dir = std::env::temp_dir().join("ragline-demo");
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join("planets.txt");
    tokio::fs::write(&path, NOTES).await?;
    let loader = loader_for(&path.to_string_lossy())?;

    // -- 2. Build the pipeline --------------------------------------------
    let config = RagConfig::builder().chunk_size(160).chunk_overlap(30).top_k(2).build()?;
    let pipeline = Arc::new(
        RagPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(WordHashEmbedder { dimensions: 64 }))
            .vector_store(Arc::new(InMemoryVectorStore::new(DistanceMetric::Cosine)))
            .build()?,
    );

    // -- 3. Index ---------------------------------------------------------
    let report = pipeline.index(loader.as_ref()).await?;
    println!("Indexed {} document(s) into {} chunk(s)", report.documents, report.chunks);

    // -- 4. Retrieve ------------------------------------------------------
    let question = "How tall is the volcano on Mars?";
    println!("\nQuestion: {question}");
    let results = pipeline.retrieve(question).await?;
    for (i, result) in results.iter().enumerate() {
        println!("  {}. [distance={:.4}] {}", i + 1, result.distance, result.record.id);
    }

    // -- 5. Generate ------------------------------------------------------
    // The scripted reply stands in for a real model.
    let reply = serde_json::json!({
        "summary": "Olympus Mons is about three times the height of Mount Everest.",
        "sources": results.iter().take(1).map(|r| r.record.id.as_str()).collect::<Vec<_>>(),
    });
    let model = Arc::new(MockChatModel::new([format!("```json\n{reply:#}\n```")]));
    let generator = Generator::builder()
        .pipeline(pipeline)
        .model(model)
        .parser(StructuredOutputParser::<StructuredAnswer>::new()?)
        .temperature(0.0)
        .build()?;

    let answer = generator.answer_with_context(question).await?;
    println!("\nAnswer: {}", answer.output.summary);
    println!("Sources: {:?}", answer.output.sources);
    println!("Context passages: {}", answer.context.len());
    Ok(())
}
