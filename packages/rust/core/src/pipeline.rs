//! End-to-end `process` pipeline: registry → read/parse → dedup → enrich → artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use vrac_artifacts::{ArtifactMeta, StagedFile};
use vrac_dialects::{ParseOutcome, parse_with_outcome};
use vrac_shared::{
    AppConfig, HealthIndexPoint, OutputDocument, ParseOptions, PeriodRecord, Result, VracError,
};
use vrac_sources::{SourceCandidate, SourceRegistry};

use crate::dedup::deduplicate;
use crate::enrichment::{
    EnrichedPeriod, EnrichmentRegistry, RegionalSummary, health_index_points, summarize_by_region,
};

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the export file tree.
    pub input_root: PathBuf,
    /// Destination of the JSON output document.
    pub output_path: PathBuf,
    /// Run the enrichment stages after deduplication.
    pub enrich: bool,
    /// Maximum number of files read and parsed at once.
    pub concurrency: usize,
    pub parse: ParseOptions,
    pub sources: SourceRegistry,
    /// Optional health-index CSV written next to the artifact.
    pub health_csv: Option<PathBuf>,
}

impl PipelineConfig {
    /// Build a run configuration from the loaded app config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            input_root: PathBuf::from(&config.defaults.input_root),
            output_path: PathBuf::from(&config.defaults.output_path),
            enrich: config.defaults.enrich,
            concurrency: config.defaults.concurrency as usize,
            parse: ParseOptions::from(config),
            sources: SourceRegistry::from_config(&config.sources)?,
            health_csv: None,
        })
    }
}

/// Counters for conditions the pipeline absorbs instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Registry candidates considered.
    pub candidates: usize,
    /// Candidates with no existing file at any of their paths.
    pub missing: usize,
    /// Existing files that could not be read or were not valid UTF-8.
    pub unreadable: usize,
    /// Files read but yielding no record (unknown pharmacy, no valid rows).
    pub discarded: usize,
    /// Files that produced a record.
    pub parsed: usize,
    /// Rows skipped as malformed, across all parsed files.
    pub rows_skipped: usize,
    /// Well-formed rows filtered out (zero quantity, outside rank window).
    pub rows_rejected: usize,
    /// Records dropped by deduplication.
    pub superseded: usize,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Canonical records, as written to the artifact.
    pub periods: Vec<PeriodRecord>,
    /// Enriched records; empty when enrichment was not requested.
    pub enriched: Vec<EnrichedPeriod>,
    /// Region-keyed summary; empty when enrichment was not requested.
    pub regional: Vec<RegionalSummary>,
    pub stats: RunStats,
    pub artifact: ArtifactMeta,
    pub health_csv: Option<ArtifactMeta>,
    /// SHA-256 of the `periods` array alone.
    pub periods_digest: String,
    pub processed_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Health-index points from the enrichment layers, in period order.
    pub fn health_index(&self) -> Vec<&HealthIndexPoint> {
        self.enriched
            .iter()
            .filter_map(EnrichedPeriod::health_index)
            .collect()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each candidate's parse result is collected.
    fn candidate_done(&self, key: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn candidate_done(&self, _key: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Outcome of reading one resolved candidate file.
enum CandidateRead {
    Parsed(ParseOutcome),
    Unreadable(String),
}

/// Run the full pipeline.
///
/// 1. Check the input root (fatal if missing or unreadable)
/// 2. Resolve registry candidates to existing files
/// 3. Read and parse concurrently, collecting results in registry order
/// 4. Deduplicate per (pharmacy, year)
/// 5. Enrich (optional)
/// 6. Write the output document atomically
#[instrument(skip_all, fields(run_id = tracing::field::Empty, root = %config.input_root.display()))]
pub async fn run_pipeline(
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();
    tracing::Span::current().record("run_id", tracing::field::display(&run_id));

    progress.phase("Checking input root");
    check_input_root(&config.input_root)?;

    // --- Resolve candidates ---
    progress.phase("Resolving source files");
    let candidates = config.sources.candidates(&config.input_root);
    let mut stats = RunStats {
        candidates: candidates.len(),
        ..RunStats::default()
    };

    let mut resolved: Vec<(SourceCandidate, PathBuf)> = Vec::new();
    for candidate in candidates {
        match candidate.paths.iter().find(|p| p.is_file()).cloned() {
            Some(path) => resolved.push((candidate, path)),
            None => {
                debug!(key = %candidate.key, dialect = %candidate.dialect, "no source file found");
                stats.missing += 1;
            }
        }
    }

    info!(
        candidates = stats.candidates,
        resolved = resolved.len(),
        missing = stats.missing,
        concurrency = config.concurrency,
        "starting run"
    );

    // --- Read + parse ---
    progress.phase("Parsing source files");
    let records = parse_candidates(config, resolved, &mut stats, progress).await;

    // --- Deduplicate ---
    progress.phase("Deduplicating");
    let parsed = records.len();
    let periods = deduplicate(records);
    stats.superseded = parsed - periods.len();

    // --- Enrich ---
    let (enriched, regional) = if config.enrich {
        progress.phase("Enriching");
        let registry = EnrichmentRegistry::with_builtin_stages()?;
        let enriched = registry.enrich_all(&periods)?;
        let regional = summarize_by_region(&enriched)?;
        (enriched, regional)
    } else {
        (Vec::new(), Vec::new())
    };

    let health_csv_content = match &config.health_csv {
        Some(_) if config.enrich => Some(vrac_artifacts::render_health_index_csv(
            &enriched
                .iter()
                .filter_map(|e| e.health_index().cloned())
                .collect::<Vec<_>>(),
        )?),
        Some(_) => Some(vrac_artifacts::render_health_index_csv(
            &health_index_points(&periods)?,
        )?),
        None => None,
    };

    // --- Write artifact ---
    progress.phase("Writing output");
    let processed_at = Utc::now();
    let doc = OutputDocument {
        periods,
        processed_at,
    };
    let periods_digest = vrac_artifacts::periods_digest(&doc.periods)?;

    // Both files are staged before either is renamed into place.
    let staged_csv = match (&config.health_csv, health_csv_content) {
        (Some(path), Some(content)) => Some(vrac_artifacts::stage_text(path, &content)?),
        _ => None,
    };
    let staged_output = vrac_artifacts::stage_output(&config.output_path, &doc)?;
    let (artifact, health_csv) = commit_outputs(staged_output, staged_csv)?;

    let report = RunReport {
        run_id,
        periods: doc.periods,
        enriched,
        regional,
        stats,
        artifact,
        health_csv,
        periods_digest,
        processed_at,
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        periods = report.periods.len(),
        parsed = report.stats.parsed,
        missing = report.stats.missing,
        discarded = report.stats.discarded,
        unreadable = report.stats.unreadable,
        superseded = report.stats.superseded,
        rows_skipped = report.stats.rows_skipped,
        digest = %report.periods_digest,
        elapsed_ms = report.elapsed.as_millis(),
        "run complete"
    );

    Ok(report)
}

/// Fail unless `root` is an existing, listable directory.
fn check_input_root(root: &Path) -> Result<()> {
    let meta = std::fs::metadata(root).map_err(|e| VracError::input_root(root, e.to_string()))?;
    if !meta.is_dir() {
        return Err(VracError::input_root(root, "not a directory"));
    }
    std::fs::read_dir(root).map_err(|e| VracError::input_root(root, e.to_string()))?;
    Ok(())
}

/// Rename the staged CSV and artifact into place.
///
/// If the artifact rename fails after the CSV was committed, the CSV is
/// removed again so a failed run leaves neither file.
fn commit_outputs(
    output: StagedFile,
    csv: Option<StagedFile>,
) -> Result<(ArtifactMeta, Option<ArtifactMeta>)> {
    let csv_meta = csv.map(StagedFile::commit).transpose()?;
    match output.commit() {
        Ok(meta) => {
            info!(
                size_bytes = meta.size_bytes,
                sha256 = %meta.sha256,
                "output artifact written"
            );
            Ok((meta, csv_meta))
        }
        Err(e) => {
            if let Some(csv) = &csv_meta {
                if let Err(remove) = std::fs::remove_file(&csv.path) {
                    warn!(path = %csv.path.display(), error = %remove, "failed to roll back health csv");
                }
            }
            Err(e)
        }
    }
}

/// Read and parse every resolved candidate with bounded concurrency.
///
/// Tasks are awaited in candidate order, so the returned records keep the
/// registry order regardless of completion order.
async fn parse_candidates(
    config: &PipelineConfig,
    resolved: Vec<(SourceCandidate, PathBuf)>,
    stats: &mut RunStats,
    progress: &dyn ProgressReporter,
) -> Vec<PeriodRecord> {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let total = resolved.len();
    let mut handles = Vec::with_capacity(total);

    for (candidate, path) in resolved {
        let sem = semaphore.clone();
        let opts = config.parse;
        let task_path = path.clone();
        let dialect = candidate.dialect;
        let hints = candidate.hints.clone();

        let handle = tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return CandidateRead::Unreadable("semaphore closed".into());
            };
            read_and_parse(&task_path, dialect, &hints, &opts).await
        });
        handles.push((candidate, path, handle));
    }

    let mut records = Vec::new();
    for (i, (candidate, path, handle)) in handles.into_iter().enumerate() {
        let key = candidate.key.to_string();
        match handle.await {
            Ok(CandidateRead::Parsed(outcome)) => {
                stats.rows_skipped += outcome.rows_malformed;
                stats.rows_rejected += outcome.rows_rejected;
                match outcome.record {
                    Some(record) => {
                        debug!(
                            %key,
                            path = %path.display(),
                            products = record.products.len(),
                            total = record.total_quantity,
                            "parsed candidate"
                        );
                        stats.parsed += 1;
                        records.push(record);
                    }
                    None => {
                        let reason = outcome
                            .rejection
                            .map(|r| r.as_str())
                            .unwrap_or("no record");
                        debug!(%key, path = %path.display(), %reason, "candidate discarded");
                        stats.discarded += 1;
                    }
                }
            }
            Ok(CandidateRead::Unreadable(reason)) => {
                warn!(%key, path = %path.display(), %reason, "unreadable source file");
                stats.unreadable += 1;
            }
            Err(e) => {
                warn!(%key, path = %path.display(), error = %e, "parse task failed");
                stats.unreadable += 1;
            }
        }
        progress.candidate_done(&key, i + 1, total);
    }

    records
}

async fn read_and_parse(
    path: &Path,
    dialect: vrac_shared::Dialect,
    hints: &vrac_shared::MappingHints,
    opts: &ParseOptions,
) -> CandidateRead {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => return CandidateRead::Unreadable(e.to_string()),
    };
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => return CandidateRead::Unreadable(format!("invalid UTF-8: {e}")),
    };
    CandidateRead::Parsed(parse_with_outcome(dialect, &text, Some(hints), opts))
}
