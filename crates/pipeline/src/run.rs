//! The sequential run loop.
//!
//! Each record passes through `Fetching → Building → Encoding → Uploading`
//! and ends in `Done` or `Failed` before the next record starts. Nothing is
//! retried and nothing is cached between records or runs.

use tracing::{debug, error, info, info_span, Instrument};

use crate::report::{self, ReportOptions};
use crate::{
    multipart, CollectedDate, EvidenceSink, PipelineError, RecordSource, RunId, UploadResult,
};

/// Per-record state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStage {
    Fetching,
    Building,
    Encoding,
    Uploading,
    Done,
    Failed,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fetching => "fetching",
            Self::Building => "building",
            Self::Encoding => "encoding",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What to do when a record fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and move on to the next record.
    #[default]
    ContinueWithNext,
    /// Return the first failure to the caller.
    StopOnFirst,
}

/// Settings for one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub report: ReportOptions,
    pub on_failure: FailurePolicy,
}

/// A record that was uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedRecord {
    pub label: String,
    pub result: UploadResult,
}

/// A record that failed, and where.
#[derive(Debug)]
pub struct FailedRecord {
    pub label: String,
    pub stage: RunStage,
    pub error: PipelineError,
}

/// Outcome of a run over the discovered records.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: RunId,
    pub uploaded: Vec<UploadedRecord>,
    pub failed: Vec<FailedRecord>,
    /// Set when [`FailurePolicy::StopOnFirst`] ended the run before every
    /// record was processed. The failure that stopped it is the last entry
    /// of `failed`.
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Discovers records and processes them one after another.
///
/// A discovery failure is returned immediately. Record failures land in the
/// summary; with [`FailurePolicy::StopOnFirst`] the loop ends at the first
/// one, keeping the records uploaded before it.
pub async fn run<S, K>(source: &S, sink: &K, options: &RunOptions) -> Result<RunSummary, PipelineError>
where
    S: RecordSource,
    K: EvidenceSink,
{
    let run_id = RunId::new_random();
    let span = info_span!("evidence_run", %run_id);

    async move {
        let handles = source.discover().await?;
        info!(records = handles.len(), "Records discovered");

        let mut summary = RunSummary {
            run_id,
            uploaded: Vec::new(),
            failed: Vec::new(),
            stopped_early: false,
        };

        for handle in &handles {
            let label = source.describe(handle);
            let outcome = process_record(source, sink, handle, options)
                .instrument(info_span!("record", record = %label))
                .await;

            match outcome {
                Ok(result) => {
                    info!(record = %label, upload_id = %result.id, "Evidence uploaded");
                    summary.uploaded.push(UploadedRecord { label, result });
                }
                Err(err) => {
                    let stage = err.stage();
                    error!(record = %label, stage = %RunStage::Failed, failed_at = %stage, error = %err, "Record failed");
                    summary.failed.push(FailedRecord {
                        label,
                        stage,
                        error: err,
                    });
                    if options.on_failure == FailurePolicy::StopOnFirst {
                        summary.stopped_early = true;
                        break;
                    }
                }
            }
        }

        Ok(summary)
    }
    .instrument(span)
    .await
}

/// Runs one record through every stage.
pub async fn process_record<S, K>(
    source: &S,
    sink: &K,
    handle: &S::Handle,
    options: &RunOptions,
) -> Result<UploadResult, PipelineError>
where
    S: RecordSource,
    K: EvidenceSink,
{
    debug!(stage = %RunStage::Fetching, "Stage entered");
    let record = source.fetch(handle).await?;

    debug!(stage = %RunStage::Building, "Stage entered");
    let document = report::build_document(&record, &options.report)?;
    drop(record);

    debug!(stage = %RunStage::Encoding, "Stage entered");
    let body = multipart::encode(CollectedDate::today(), &document)?;
    drop(document);

    debug!(stage = %RunStage::Uploading, bytes = body.len(), "Stage entered");
    let result = sink.upload(body).await?;

    debug!(stage = %RunStage::Done, "Stage entered");
    Ok(result)
}
