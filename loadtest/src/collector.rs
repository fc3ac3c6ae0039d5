//! Serializes per-call observations into a single CSV log.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tonic::Code;

/// Column order of the result log.
///
/// `latency_ms` is historical; the value written there is nanoseconds.
const CSV_HEADERS: [&str; 14] = [
    "timestamp",
    "function_id",
    "image_tag",
    "latency_ms",
    "status",
    "error",
    "request_size_bytes",
    "response_size_bytes",
    "call_queued_timestamp",
    "got_response_timestamp",
    "instance_id",
    "leaf_got_request_timestamp",
    "leaf_scheduled_call_timestamp",
    "function_processing_time_ns",
];

/// Everything observed about a single call.
#[derive(Debug, Clone)]
pub struct CallResult {
    /// Wall-clock time the call was sent.
    pub timestamp: DateTime<Utc>,
    /// Target function.
    pub function_id: String,
    /// Target image.
    pub image_tag: String,
    /// Client-measured wall time of the call.
    pub latency: Duration,
    /// gRPC status code of the outcome.
    pub status: Code,
    /// Error text; empty on success.
    pub error: String,
    /// Request body size in bytes.
    pub request_size: u64,
    /// Response body size in bytes; zero on failure.
    pub response_size: u64,
    /// When the scheduler queued the call, echoed through trailers.
    pub call_queued: String,
    /// When the scheduler saw the function's response.
    pub got_response: String,
    /// Which function instance served the call.
    pub instance_id: String,
    /// When the Leaf received the request.
    pub leaf_got_request: String,
    /// When the Leaf dispatched the call.
    pub leaf_scheduled_call: String,
    /// Function processing time in nanoseconds.
    pub function_processing_time: String,
}

impl CallResult {
    /// An OK result with empty trailers, to be filled in as the call
    /// progresses.
    pub fn pending(function_id: &str, image_tag: &str, request_size: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            function_id: function_id.to_owned(),
            image_tag: image_tag.to_owned(),
            latency: Duration::ZERO,
            status: Code::Ok,
            error: String::new(),
            request_size,
            response_size: 0,
            call_queued: String::new(),
            got_response: String::new(),
            instance_id: String::new(),
            leaf_got_request: String::new(),
            leaf_scheduled_call: String::new(),
            function_processing_time: String::new(),
        }
    }

    fn record(&self) -> [String; 14] {
        [
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.function_id.clone(),
            self.image_tag.clone(),
            self.latency.as_nanos().to_string(),
            format!("{:?}", self.status),
            self.error.clone(),
            self.request_size.to_string(),
            self.response_size.to_string(),
            self.call_queued.clone(),
            self.got_response.clone(),
            self.instance_id.clone(),
            self.leaf_got_request.clone(),
            self.leaf_scheduled_call.clone(),
            self.function_processing_time.clone(),
        ]
    }
}

/// Fans call results from any number of tasks into one CSV file.
///
/// Producers contend on a single writer mutex; rows appear in lock
/// acquisition order. A 1 Hz flusher pushes buffered rows to disk while the
/// run is in flight, and [`close`](Self::close) performs the final flush.
#[derive(Debug)]
pub struct Collector {
    writer: Mutex<csv::Writer<File>>,
}

impl Collector {
    /// Creates the output file and writes the header row.
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create results file {}", path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(CSV_HEADERS)
            .context("failed to write results header")?;
        writer.flush().context("failed to flush results header")?;

        Ok(Self {
            writer: Mutex::new(writer),
        })
    }

    /// Appends one row.
    ///
    /// I/O trouble is logged and swallowed; the run keeps going and the rows
    /// around a failed one stay intact.
    pub fn collect(&self, result: CallResult) {
        let mut writer = self.writer.lock().unwrap();
        if let Err(error) = writer.write_record(result.record()) {
            tracing::error!(%error, "failed to record call result");
        }
    }

    /// Flushes buffered rows once per second until the task is dropped.
    pub async fn run_flusher(&self) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            self.flush();
        }
    }

    /// Final flush; the collector must not be handed more results afterwards.
    pub fn close(&self) {
        self.flush();
    }

    fn flush(&self) {
        if let Err(error) = self.writer.lock().unwrap().flush() {
            tracing::error!(%error, "failed to flush results");
        }
    }
}
