//! # Output Parsing Example
//!
//! Decodes model replies with the three built-in parsers and shows how a
//! schema violation is reported field by field.
//!
//! Run: `cargo run -p ragline-demos --example output_parsing`

use ragline::{
    JsonOutputParser, OutputParser, RagError, StructuredOutputParser, TextOutputParser,
};
use schemars::JsonSchema;
use serde::Deserialize;

/// Facts about a planet extracted from free text.
#[derive(Debug, Deserialize, JsonSchema)]
struct PlanetFacts {
    /// Planet name.
    name: String,
    /// Number of known moons.
    moons: u32,
    /// Notable surface features.
    #[serde(default)]
    features: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    // -- 1. Plain text ----------------------------------------------------
    let text = TextOutputParser.parse("  Mars is red because of iron oxide.\n")?;
    println!("text: {text:?}");

    // -- 2. Any JSON value ------------------------------------------------
    let value = JsonOutputParser.parse("Sure! Here you go: {\"planet\": \"Mars\", \"moons\": 2}")?;
    println!("json: {value}");

    // -- 3. Typed and validated -------------------------------------------
    let parser = StructuredOutputParser::<PlanetFacts>::new()?;
    println!("\nformat instructions sent to the model:\n{}\n", parser.format_instructions());

    let reply = "```json\n{\"name\": \"Mars\", \"moons\": 2, \"features\": [\"Olympus Mons\"]}\n```";
    let facts = parser.parse(reply)?;
    println!("structured: {facts:?}");

    // -- 4. A reply that does not match the schema ------------------------
    let strict = StructuredOutputParser::<PlanetFacts>::new()?.deny_unknown_fields()?;
    match strict.parse(r#"{"name": "Mars", "moons": "two", "colour": "red"}"#) {
        Err(RagError::OutputParse { message, violations }) => {
            println!("\nrejected: {message}");
            for violation in violations {
                println!("  at '{}': {}", violation.path, violation.message);
            }
        }
        other => println!("\nunexpected: {other:?}"),
    }
    Ok(())
}
