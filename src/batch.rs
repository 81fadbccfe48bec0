//! Batch processing over many files
//!
//! Images are independent, so each one runs on the blocking pool with at most
//! `jobs` in flight. A failing file is reported and skipped; the rest continue.

use crate::codec::{self, EncodeOptions};
use crate::config::{Config, FileJob};
use crate::enhance::{EnhanceResult, Pipeline};
use crate::error::{EnhanceError, ErrorReport};
use anyhow::Context;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Outcome for one input file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<EnhanceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl FileReport {
    fn new(job: FileJob, outcome: Result<EnhanceResult, EnhanceError>) -> Self {
        match outcome {
            Ok(result) => Self {
                input: job.input,
                output: job.output,
                status: "done".to_string(),
                result: Some(result),
                error: None,
            },
            Err(err) => Self {
                input: job.input,
                output: job.output,
                status: "failed".to_string(),
                result: None,
                error: Some(ErrorReport::from(&err)),
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Totals for a whole run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_time_ms: u64,
    pub files: Vec<FileReport>,
}

/// Decode, enhance and encode a single file
pub fn process_file(
    pipeline: &Pipeline,
    job: &FileJob,
    quality: u8,
) -> Result<EnhanceResult, EnhanceError> {
    let decoded = codec::decode(&job.input)?;
    tracing::debug!(
        "Decoded {} as {:?} ({:?})",
        job.input.display(),
        decoded.image.shape(),
        decoded.bit_depth
    );

    let result = pipeline.process(decoded.image)?;

    let options = EncodeOptions {
        quality,
        bit_depth: decoded.bit_depth,
    };
    codec::encode(&result.image, &job.output, &options)?;
    Ok(result)
}

/// Process every configured file and print a completion line for each success
pub async fn run(config: Config) -> anyhow::Result<BatchSummary> {
    let start = Instant::now();
    let pipeline = Arc::new(Pipeline::new(config.pipeline.clone())?);
    let quality = config.quality;
    let total = config.files.len();

    let mut reports: Vec<(usize, FileReport)> = stream::iter(config.files.into_iter().enumerate())
        .map(|(index, job)| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                let task_job = job.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    process_file(&pipeline, &task_job, quality)
                })
                .await
                .unwrap_or_else(|e| Err(EnhanceError::Internal(format!("Worker failed: {}", e))));
                (index, FileReport::new(job, outcome))
            }
        })
        .buffer_unordered(config.jobs)
        .inspect(|(_, report)| announce(report))
        .collect()
        .await;

    // Completion order is arbitrary; the report follows input order
    reports.sort_by_key(|(index, _)| *index);
    let files: Vec<FileReport> = reports.into_iter().map(|(_, report)| report).collect();
    let succeeded = files.iter().filter(|r| r.succeeded()).count();

    let summary = BatchSummary {
        total,
        succeeded,
        failed: total - succeeded,
        total_time_ms: start.elapsed().as_millis() as u64,
        files,
    };

    tracing::info!(
        "Processed {} file(s) in {}ms: {} done, {} failed",
        summary.total,
        summary.total_time_ms,
        summary.succeeded,
        summary.failed
    );

    if let Some(path) = &config.report {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    Ok(summary)
}

fn announce(report: &FileReport) {
    match (&report.result, &report.error) {
        (Some(result), _) => {
            for warning in &result.warnings {
                tracing::warn!("{}: {}", report.input.display(), warning);
            }
            tracing::info!(
                "{} -> {} in {}ms",
                report.input.display(),
                report.output.display(),
                result.total_time_ms
            );
            println!("{}: done", report.input.display());
        }
        (None, Some(error)) => {
            tracing::warn!("{}: {} [{}]", report.input.display(), error.error, error.code);
        }
        (None, None) => {}
    }
}
