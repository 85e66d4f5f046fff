//! Per-source pipeline orchestration
//!
//! Each source runs as its own task: fetch the playlist, run every model's
//! parse/filter/write pass concurrently, then, if a guide is configured,
//! fetch it, re-derive the allow-list from the first model's filtered
//! entries, and filter the guide. The driver awaits all source tasks and
//! returns a run summary; a failing source never blocks or fails a sibling.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{error, info, warn};

use crate::config::{Config, SourceConfig};
use crate::errors::SourceResult;
use crate::fetch::Fetcher;
use crate::guide::filter_guide;
use crate::models::TVG_ID;
use crate::playlist::{PlaylistParser, write_playlist};
use crate::rules::ModelEngine;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Process every configured source concurrently and await all of them
pub async fn run(config: Config) -> RunSummary {
    let config = Arc::new(config);
    let mut handles = Vec::with_capacity(config.sources.len());

    for source in config.sources.clone() {
        let config = Arc::clone(&config);
        let name = source.name.clone();
        let handle = tokio::spawn(async move { process_source(&config, &source).await });
        handles.push((name, handle));
    }

    let mut summary = RunSummary::default();
    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(())) => summary.succeeded += 1,
            Ok(Err(e)) => {
                error!("Source '{name}' failed: {e}");
                summary.failed += 1;
            }
            Err(e) => {
                error!("Source '{name}' task panicked: {e}");
                summary.failed += 1;
            }
        }
    }
    summary
}

async fn process_source(config: &Config, source: &SourceConfig) -> SourceResult<()> {
    info!("Processing source '{}'", source.name);
    let fetcher = Fetcher::new();

    let playlist_path = config.import_folder.join(format!("{}.m3u", source.name));
    fetcher.fetch_to_file(&source.playlist, &playlist_path).await?;
    let content: Arc<str> = tokio::fs::read_to_string(&playlist_path).await?.into();

    tokio::fs::create_dir_all(&config.export_folder).await?;

    // A bad pattern is a configuration error: compile every model up front
    // so the source aborts before any output is written.
    let engines = source
        .models
        .iter()
        .map(ModelEngine::compile)
        .collect::<SourceResult<Vec<_>>>()?;

    let jobs = source
        .models
        .iter()
        .zip(engines)
        .map(|(model, engine)| {
            let content = Arc::clone(&content);
            let out_path = config
                .export_folder
                .join(format!("{}{}.m3u", source.name, model.name));
            let source_name = source.name.clone();
            let model_name = model.name.clone();
            async move {
                // Each model performs its own full parse pass; the parser's
                // accumulator is owned by this pass alone.
                let playlist = PlaylistParser::new().parse(&content, &engine);
                let entry_count = playlist.entries.len();
                tokio::fs::write(&out_path, write_playlist(&playlist)).await?;
                info!(
                    "Wrote {entry_count} entries for '{source_name}{model_name}' to {}",
                    out_path.display()
                );
                Ok::<(), crate::errors::SourceError>(())
            }
        })
        .collect::<Vec<_>>();
    try_join_all(jobs).await?;

    if let Some(guide_url) = &source.guide {
        process_guide(config, source, guide_url, &fetcher, &content).await?;
    }

    info!("Source '{}' complete", source.name);
    Ok(())
}

async fn process_guide(
    config: &Config,
    source: &SourceConfig,
    guide_url: &str,
    fetcher: &Fetcher,
    playlist_content: &str,
) -> SourceResult<()> {
    let Some(first_model) = source.models.first() else {
        warn!(
            "Source '{}' has a guide but no models; skipping guide filtering",
            source.name
        );
        return Ok(());
    };

    let guide_in = config.import_folder.join(format!("{}.xml", source.name));
    fetcher.fetch_to_file(guide_url, &guide_in).await?;

    // The allow-list comes from the first declared model's filtered entries,
    // re-derived with a fresh parse pass of its own.
    let engine = ModelEngine::compile(first_model)?;
    let playlist = PlaylistParser::new().parse(playlist_content, &engine);
    let allowed: HashSet<String> = playlist
        .entries
        .iter()
        .filter_map(|entry| entry.get(TVG_ID))
        .map(str::to_string)
        .collect();

    let guide_content = tokio::fs::read_to_string(&guide_in).await?;
    let filtered = filter_guide(&guide_content, &allowed, Utc::now())?;

    let guide_out = config.export_folder.join(format!("{}.xml", source.name));
    tokio::fs::write(&guide_out, filtered).await?;
    info!(
        "Wrote filtered guide for '{}' ({} allowed channels) to {}",
        source.name,
        allowed.len(),
        guide_out.display()
    );
    Ok(())
}
