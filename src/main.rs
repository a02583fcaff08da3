use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::time::Instant;
use uuid::Uuid;

use matcher_lib::ai::validator::{AiValidator, ValidatorConfig};
use matcher_lib::matching::chunk::{count_source_accounts, process_chunk};
use matcher_lib::models::core::FieldMapping;
use matcher_lib::models::stats::ChunkStats;
use matcher_lib::utils::db_connect::connect;
use matcher_lib::utils::env::load_env;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct MatchArgs {
    /// Source records per chunk
    #[arg(long, default_value_t = 100)]
    page_size: i64,

    /// Starting offset into the source table (resume point)
    #[arg(long, default_value_t = 0)]
    offset: i64,

    /// Stop after this many chunks
    #[arg(long)]
    limit_chunks: Option<u64>,

    /// Skip AI validation; ambiguous-band matches resolve to REVIEW
    #[arg(long)]
    no_ai: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting account cross-reference matching run");
    load_env();

    let args = MatchArgs::parse();

    let validator_config = ValidatorConfig::from_env();
    info!(
        "AI validation: enabled={}, backend={}, model={}, sub_batch={}, in_flight={}",
        !args.no_ai,
        validator_config.base_url,
        validator_config.model,
        validator_config.sub_batch_size,
        validator_config.max_in_flight
    );
    let validator = AiValidator::new(validator_config);

    let pool = connect().await.context("Failed to connect to database")?;
    info!("Successfully connected to the database");

    let mapping = FieldMapping::default_source_mapping();
    let run_id = Uuid::new_v4().to_string();
    let run_started_at = Utc::now();
    let run_start = Instant::now();

    let total = count_source_accounts(&pool)
        .await
        .context("Failed to count source accounts")?;
    info!(
        "Run {}: {} source accounts, page size {}, starting offset {}",
        run_id, total, args.page_size, args.offset
    );

    let pb = ProgressBar::new(total.max(0) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    pb.set_position(args.offset.max(0) as u64);
    pb.set_message("Matching accounts...");

    let mut offset = args.offset;
    let mut chunks_done: u64 = 0;
    let mut stats = ChunkStats::default();

    loop {
        let result = process_chunk(&pool, &validator, &mapping, args.page_size, offset, !args.no_ai)
            .await
            .with_context(|| format!("Chunk at offset {} failed", offset))?;

        stats.merge(&result.stats);
        offset += result.processed_count as i64;
        chunks_done += 1;
        pb.inc(result.processed_count as u64);
        pb.set_message(format!(
            "chunk {}: both={} dim={} sf={} new={}",
            chunks_done, stats.both, stats.dim_only, stats.sf_only, stats.new
        ));

        if !result.has_more || result.processed_count == 0 {
            break;
        }
        if let Some(limit) = args.limit_chunks {
            if chunks_done >= limit {
                info!("Chunk limit {} reached; stopping before exhaustion", limit);
                break;
            }
        }
    }
    pb.finish_with_message("Matching complete");

    let elapsed = run_start.elapsed();
    let processed = offset - args.offset;
    info!("=== Matching Summary ===");
    info!("Run ID: {} (started {})", run_id, run_started_at);
    info!("Accounts processed: {} of {}", processed, total);
    info!("In both systems: {}", stats.both);
    info!("Dimensions only: {}", stats.dim_only);
    info!("Salesforce only: {}", stats.sf_only);
    info!("New accounts: {}", stats.new);
    info!("AI-validated pairs: {}", stats.ai_validated);
    info!("Total execution time: {:.2?}", elapsed);

    Ok(())
}
