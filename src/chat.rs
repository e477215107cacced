//! Interactive chat front-end.
//!
//! A thin view over the pipeline: reads questions from stdin, calls
//! `ask()`, and prints answers with source citations. The chat loop owns
//! the conversation history; the pipeline itself holds no session state.

use anyhow::Result;
use chrono::Utc;
use std::io::{BufRead, Write};

use crate::config::Config;
use crate::models::{ConversationTurn, Response};
use crate::pipeline::RagPipeline;
use crate::registry;

/// Display cap on citations per answer. The assembler emits one citation
/// per retrieved chunk; deduplication and capping are presentation policy.
const MAX_DISPLAY_SOURCES: usize = 5;

const EXAMPLE_QUESTIONS: &[&str] = &[
    "How do I create a blueprint in Scrypto?",
    "What is a component in RadixDLT?",
    "Show me how to create a token in Scrypto",
    "How does the Radix Engine work?",
    "What are badges in RadixDLT?",
    "How do I implement access control in Scrypto?",
    "What is a resource in RadixDLT?",
    "How do I deploy a blueprint to RadixDLT?",
];

pub async fn run_chat(config: Config) -> Result<()> {
    let mut pipeline = RagPipeline::new(config)?;
    pipeline.init().await?;

    println!("scrypto-sage interactive Q&A (model: {})", pipeline.model_id());
    if let Some(count) = pipeline.chunk_count().await {
        println!("Knowledge base: {count} indexed chunks");
    }
    println!("Type 'exit' to quit, 'help' for example questions, 'models' for the model list, 'stats' for session stats.");
    println!("{}", "-".repeat(70));

    let stdin = std::io::stdin();
    let mut history: Vec<ConversationTurn> = Vec::new();

    loop {
        print!("\n? ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let question = line.trim();

        match question.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" | "q" => break,
            "help" => {
                print_help();
                continue;
            }
            "models" => {
                registry::print_models();
                continue;
            }
            "stats" => {
                print_session_stats(&history);
                continue;
            }
            _ => {}
        }

        match pipeline.ask(question).await {
            Ok(response) => {
                print_response(&response);
                history.push(ConversationTurn {
                    question: response.question.clone(),
                    answer: response.answer.clone(),
                    sources: response.sources.clone(),
                    asked_at: Utc::now(),
                });
            }
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    println!("Goodbye.");
    Ok(())
}

fn print_response(response: &Response) {
    println!();
    println!("{}", "=".repeat(70));
    println!("{}", response.answer);

    let display = display_sources(response, MAX_DISPLAY_SOURCES);
    if display.is_empty() {
        println!();
        println!("(no relevant knowledge-base sources found)");
    } else {
        println!();
        println!("Sources:");
        for (i, (filename, category, snippet)) in display.iter().enumerate() {
            println!("  {}. {} ({})", i + 1, filename, category);
            println!("     {}", snippet.replace('\n', " "));
        }
    }
    println!("{}", "=".repeat(70));
}

/// Deduplicate citations by filename, preserving retrieval order, and cap
/// the list for display.
fn display_sources(response: &Response, cap: usize) -> Vec<(String, String, String)> {
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for source in &response.sources {
        if seen.contains(&source.filename) {
            continue;
        }
        seen.push(source.filename.clone());
        out.push((
            source.filename.clone(),
            source.category.to_string(),
            source.snippet.clone(),
        ));
        if out.len() == cap {
            break;
        }
    }
    out
}

fn print_help() {
    println!("\nExample questions:");
    for question in EXAMPLE_QUESTIONS {
        println!("  - {question}");
    }
}

fn print_session_stats(history: &[ConversationTurn]) {
    println!("\nSession stats");
    println!("  questions asked: {}", history.len());
    if !history.is_empty() {
        let total_sources: usize = history.iter().map(|t| t.sources.len()).sum();
        println!(
            "  avg sources per answer: {:.1}",
            total_sources as f64 / history.len() as f64
        );
    }
}
