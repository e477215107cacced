//! Index statistics overview.
//!
//! Summarizes what's indexed: chunk and document counts, a per-category
//! breakdown, and the database size. Used by `sage stats` to give
//! confidence that the index matches the knowledge base.

use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::config::Config;
use crate::index::VectorIndex;

pub async fn run_stats(config: &Config) -> Result<()> {
    let path = &config.index.path;
    if !VectorIndex::exists(path) {
        println!("No index found at {}. Run `sage index` first.", path.display());
        return Ok(());
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?;
    let pool = SqlitePool::connect_with(options).await?;

    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&pool)
        .await?;
    let total_docs: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT source_path) FROM chunks")
        .fetch_one(&pool)
        .await?;
    let model: Option<String> =
        sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'embedding_model'")
            .fetch_optional(&pool)
            .await?;

    let db_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    println!("scrypto-sage index stats");
    println!("==========================");
    println!();
    println!("  Index:      {}", path.display());
    println!("  Size:       {}", format_bytes(db_size));
    println!("  Embedding:  {}", model.as_deref().unwrap_or("(unknown)"));
    println!();
    println!("  Documents:  {total_docs}");
    println!("  Chunks:     {total_chunks}");

    let category_rows = sqlx::query(
        r#"
        SELECT category, COUNT(*) AS chunk_count, COUNT(DISTINCT source_path) AS doc_count
        FROM chunks
        GROUP BY category
        ORDER BY chunk_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !category_rows.is_empty() {
        println!();
        println!("  By category:");
        println!("  {:<16} {:>6} {:>8}", "CATEGORY", "DOCS", "CHUNKS");
        println!("  {}", "-".repeat(32));
        for row in &category_rows {
            let category: String = row.get("category");
            let doc_count: i64 = row.get("doc_count");
            let chunk_count: i64 = row.get("chunk_count");
            println!("  {category:<16} {doc_count:>6} {chunk_count:>8}");
        }
    }

    println!();
    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
