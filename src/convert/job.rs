//! Job plumbing: completion notification in, artifacts and webhook out.
//!
//! An analysis service announces a finished job with a notification. The
//! [`JobRunner`] fetches the job's blocks from a [`BlockSource`], writes
//! both artifacts through an [`ArtifactSink`] and reports the outcome to a
//! [`Notifier`]. The three collaborators are traits so the runner can be
//! driven against local files as well as remote services.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DocumentProcessor;
use crate::error::{Error, Result};
use crate::model::BlockGraph;
use crate::render::JsonFormat;

/// Status reported by the analysis service for a successful job.
pub const SUCCEEDED: &str = "SUCCEEDED";

/// Default output key prefix.
pub const DEFAULT_OUTPUT_PREFIX: &str = "processed";

/// Upload prefix removed from source keys when deriving output keys.
pub const UPLOAD_PREFIX: &str = "uploads/";

/// Where the analyzed document was stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentLocation {
    #[serde(rename = "S3ObjectName", default)]
    pub object_name: Option<String>,

    #[serde(rename = "S3Bucket", default)]
    pub bucket: Option<String>,
}

/// A job completion notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobNotification {
    pub job_id: String,
    pub status: String,

    #[serde(default)]
    pub status_message: Option<String>,

    #[serde(default)]
    pub job_tag: Option<String>,

    #[serde(default)]
    pub document_location: Option<DocumentLocation>,
}

impl JobNotification {
    /// Parse a notification event.
    ///
    /// Accepts a pub/sub envelope whose `Records[0].Sns.Message` holds the
    /// notification as a JSON string, or the bare notification object.
    pub fn from_event(json: &str) -> Result<Self> {
        let event: Value = serde_json::from_str(json)
            .map_err(|e| Error::InvalidNotification(format!("event is not JSON: {}", e)))?;

        let message = match event.get("Records") {
            Some(records) => {
                let text = records
                    .get(0)
                    .and_then(|r| r.get("Sns"))
                    .and_then(|s| s.get("Message"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::InvalidNotification("missing Records[0].Sns.Message".to_string())
                    })?;
                serde_json::from_str(text).map_err(|e| {
                    Error::InvalidNotification(format!("message is not JSON: {}", e))
                })?
            }
            None => event,
        };

        serde_json::from_value(message).map_err(|e| Error::InvalidNotification(e.to_string()))
    }

    /// Whether the analysis job succeeded.
    pub fn succeeded(&self) -> bool {
        self.status == SUCCEEDED
    }

    /// Key of the analyzed document.
    ///
    /// The stored object name is preferred over the job tag, which may be
    /// truncated.
    pub fn source_key(&self) -> String {
        let object_name = self
            .document_location
            .as_ref()
            .and_then(|l| l.object_name.as_deref());

        match object_name.or(self.job_tag.as_deref()) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                log::warn!("Job {}: source key not found, using placeholder", self.job_id);
                format!("unknown_source_file_for_job_{}", self.job_id)
            }
        }
    }
}

/// Output key layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    prefix: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_PREFIX)
    }
}

impl OutputLayout {
    /// Create a layout; surrounding slashes of the prefix are ignored.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: prefix.as_ref().trim_matches('/').to_string(),
        }
    }

    /// Get the output prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Output key for an artifact derived from `source_key`.
    ///
    /// `uploads/carrier/doc.pdf` becomes `{prefix}/carrier/doc.{extension}`.
    pub fn artifact_key(&self, source_key: &str, extension: &str) -> String {
        let clean = source_key.strip_prefix(UPLOAD_PREFIX).unwrap_or(source_key);
        format!("{}/{}.{}", self.prefix, strip_extension(clean), extension)
    }
}

/// Remove the extension of the last path segment.
///
/// Leading dots of the segment do not start an extension.
fn strip_extension(key: &str) -> &str {
    let name_start = key.rfind('/').map_or(0, |i| i + 1);
    let name = &key[name_start..];
    let stem_start = name.len() - name.trim_start_matches('.').len();

    match name[stem_start..].rfind('.') {
        Some(dot) => &key[..name_start + stem_start + dot],
        None => key,
    }
}

/// Public URL of an object in a storage bucket.
pub fn bucket_url(bucket: &str, key: &str) -> String {
    format!("https://{}.s3.amazonaws.com/{}", bucket, key)
}

/// Outcome status carried by a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadStatus {
    Processed,
    Failed,
}

/// The webhook body announcing a job's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub s3_key: String,
    pub textract_job_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PayloadStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_s3_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_s3_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl WebhookPayload {
    /// Create a payload with no outcome yet.
    pub fn new(source_key: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            s3_key: source_key.into(),
            textract_job_id: job_id.into(),
            status: None,
            json_s3_key: None,
            json_url: None,
            csv_s3_key: None,
            csv_url: None,
            error_message: None,
        }
    }

    /// Mark the payload failed.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = Some(PayloadStatus::Failed);
        self.error_message = Some(message.into());
    }
}

/// Supplies the blocks of a finished analysis job.
pub trait BlockSource: Send + Sync {
    /// Fetch every block of the job, across all result pages.
    fn fetch_blocks(&self, job_id: &str) -> Result<BlockGraph>;
}

/// Stores artifacts.
pub trait ArtifactSink: Send + Sync {
    /// Store `body` under `key` and return where it can be fetched.
    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<String>;
}

/// Receives job outcomes.
pub trait Notifier: Send + Sync {
    /// Deliver a payload.
    fn notify(&self, payload: &WebhookPayload) -> Result<()>;
}

/// Reads `{dir}/{job_id}.json` block files.
#[derive(Debug, Clone)]
pub struct FileBlockSource {
    dir: PathBuf,
}

impl FileBlockSource {
    /// Create a source reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the block file for a job.
    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", job_id))
    }
}

impl BlockSource for FileBlockSource {
    fn fetch_blocks(&self, job_id: &str) -> Result<BlockGraph> {
        let path = self.path_for(job_id);
        log::debug!("Reading blocks for job {} from {}", job_id, path.display());
        let json = fs::read_to_string(&path)?;
        BlockGraph::from_json(&json)
    }
}

/// Writes artifacts below a root directory.
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    root: PathBuf,
    bucket: Option<String>,
}

impl FsArtifactSink {
    /// Create a sink writing below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bucket: None,
        }
    }

    /// Report bucket URLs instead of local file URLs.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for FsArtifactSink {
    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
        log::info!("Saved {} ({}, {} bytes)", path.display(), content_type, body.len());

        Ok(match &self.bucket {
            Some(bucket) => bucket_url(bucket, key),
            None => format!("file://{}", path.display()),
        })
    }
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Both artifacts were written
    Processed,
    /// The analysis service reported a failure
    AnalysisFailed,
    /// The job returned no blocks
    NoContent,
    /// Fetching, processing or storing failed
    ProcessingFailed,
}

/// Result of running one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub status: JobStatus,
    pub payload: WebhookPayload,
}

impl JobOutcome {
    /// Whether the job produced its artifacts.
    pub fn is_processed(&self) -> bool {
        self.status == JobStatus::Processed
    }
}

/// Runs jobs end to end.
#[derive(Clone)]
pub struct JobRunner {
    source: Arc<dyn BlockSource>,
    sink: Arc<dyn ArtifactSink>,
    notifier: Option<Arc<dyn Notifier>>,
    processor: DocumentProcessor,
    layout: OutputLayout,
}

impl JobRunner {
    /// Create a runner with default processing and layout.
    pub fn new(source: Arc<dyn BlockSource>, sink: Arc<dyn ArtifactSink>) -> Self {
        Self {
            source,
            sink,
            notifier: None,
            processor: DocumentProcessor::new(),
            layout: OutputLayout::default(),
        }
    }

    /// Report outcomes to a notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the document processor.
    pub fn with_processor(mut self, processor: DocumentProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Set the output layout.
    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Parse a notification event and run its job.
    pub fn handle_event(&self, event: &str) -> Result<JobOutcome> {
        let notification = JobNotification::from_event(event)?;
        Ok(self.run(&notification))
    }

    /// Run one job. Every outcome is reported to the notifier.
    pub fn run(&self, notification: &JobNotification) -> JobOutcome {
        let job_id = notification.job_id.as_str();
        let source_key = notification.source_key();
        let mut payload = WebhookPayload::new(&source_key, job_id);
        log::info!(
            "Job {}: status {}, source {}",
            job_id,
            notification.status,
            source_key
        );

        let status = if !notification.succeeded() {
            let message = notification
                .status_message
                .clone()
                .unwrap_or_else(|| "Analysis job failed (reason not specified).".to_string());
            log::warn!("Job {}: analysis did not succeed: {}", job_id, message);
            payload.fail(message);
            JobStatus::AnalysisFailed
        } else {
            match self.produce(job_id, &source_key, &mut payload) {
                Ok(()) => {
                    payload.status = Some(PayloadStatus::Processed);
                    JobStatus::Processed
                }
                Err(Error::EmptyDocument(_)) => {
                    let message = format!("No blocks returned from Textract for job {}", job_id);
                    log::warn!("{}", message);
                    payload.fail(message);
                    JobStatus::NoContent
                }
                Err(e) => {
                    let message = format!("Error processing job {}: {}", job_id, e);
                    log::error!("{}", message);
                    payload.fail(message);
                    JobStatus::ProcessingFailed
                }
            }
        };

        self.send(&payload);
        JobOutcome { status, payload }
    }

    fn produce(&self, job_id: &str, source_key: &str, payload: &mut WebhookPayload) -> Result<()> {
        let graph = self.source.fetch_blocks(job_id)?;
        let processed = self.processor.process(&graph, source_key, job_id)?;

        // Render both bodies before storing either
        let csv = if processed.has_rows() {
            Some(processed.csv()?)
        } else {
            log::info!("Job {}: no tabular data generated", job_id);
            None
        };
        let json = processed.json(JsonFormat::Pretty)?;

        let csv_artifact = match csv {
            Some(body) => {
                let key = self.layout.artifact_key(source_key, "csv");
                let url = self.sink.put(&key, body.as_bytes(), "text/csv")?;
                Some((key, url))
            }
            None => None,
        };

        let json_key = self.layout.artifact_key(source_key, "json");
        let json_url = self.sink.put(&json_key, json.as_bytes(), "application/json")?;

        if let Some((key, url)) = csv_artifact {
            payload.csv_s3_key = Some(key);
            payload.csv_url = Some(url);
        }
        payload.json_s3_key = Some(json_key);
        payload.json_url = Some(json_url);

        Ok(())
    }

    fn send(&self, payload: &WebhookPayload) {
        let Some(notifier) = &self.notifier else {
            log::debug!("No notifier configured, skipping webhook");
            return;
        };
        if let Err(e) = notifier.notify(payload) {
            log::error!(
                "Webhook for job {} failed: {}",
                payload.textract_job_id,
                e
            );
        }
    }
}
