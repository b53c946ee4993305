//! Core types for playlist-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Unique identifier for a batch
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct BatchId(pub i64);

impl BatchId {
    /// Create a new BatchId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for BatchId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<BatchId> for i64 {
    fn from(id: BatchId) -> Self {
        id.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BatchId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl sqlx::Type<sqlx::Sqlite> for BatchId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for BatchId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for BatchId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Opaque key distinguishing one task from another within a batch
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of work in a batch
///
/// Created when a batch is submitted and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadTask {
    /// Key of this task, expected to be unique within its batch
    pub id: TaskId,
    /// Human-readable label shown while the task is in flight
    pub display_name: String,
    /// Locator handed to the fetch collaborator (e.g. a track permalink)
    pub source_reference: String,
}

impl DownloadTask {
    /// Create a new task
    pub fn new(
        id: impl Into<TaskId>,
        display_name: impl Into<String>,
        source_reference: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            source_reference: source_reference.into(),
        }
    }
}

/// Format requested from the download endpoint
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG-1 Layer III
    #[default]
    Mp3,
    /// AAC in an MPEG-4 container
    M4a,
    /// Opus in an Ogg container
    Opus,
    /// Uncompressed PCM
    Wav,
}

impl AudioFormat {
    /// File extension (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" | "aac" => Ok(AudioFormat::M4a),
            "opus" | "ogg" => Ok(AudioFormat::Opus),
            "wav" => Ok(AudioFormat::Wav),
            other => Err(format!("unsupported audio format: {}", other)),
        }
    }
}

/// Batch lifecycle state
///
/// `Idle -> Running -> {Completed, Failed}`. A terminal state only moves back
/// to `Running` when a new batch starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    /// No batch has started yet
    #[default]
    Idle,
    /// A batch is being processed
    Running,
    /// Every task of the last batch succeeded
    Completed,
    /// At least one task of the last batch failed
    Failed,
}

impl BatchState {
    /// True for `Completed` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Failed)
    }

    /// Convert integer state code to BatchState
    pub fn from_i32(state: i32) -> Self {
        match state {
            0 => BatchState::Idle,
            1 => BatchState::Running,
            2 => BatchState::Completed,
            _ => BatchState::Failed,
        }
    }

    /// Convert BatchState to integer state code
    pub fn to_i32(&self) -> i32 {
        match self {
            BatchState::Idle => 0,
            BatchState::Running => 1,
            BatchState::Completed => 2,
            BatchState::Failed => 3,
        }
    }
}

/// Progress readout of the current (or last) batch
///
/// `completed_count` is the number of tasks already attempted, so while task
/// N+1 is in flight the readout is "N of total". Invariant:
/// `completed_count <= total_count`, and a terminal `state` implies
/// `completed_count == total_count`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchProgress {
    /// Tasks attempted so far (success or failure)
    pub completed_count: usize,
    /// Tasks in the batch
    pub total_count: usize,
    /// Label of the task in flight, empty when idle or finished
    pub current_task_label: String,
    /// Lifecycle state
    pub state: BatchState,
}

impl BatchProgress {
    /// Fresh progress for a batch of `total` tasks
    pub fn running(total: usize) -> Self {
        Self {
            completed_count: 0,
            total_count: total,
            current_task_label: String::new(),
            state: BatchState::Running,
        }
    }

    /// Percentage of attempted tasks (0.0 to 100.0)
    pub fn percent(&self) -> f32 {
        if self.total_count == 0 {
            return 0.0;
        }
        (self.completed_count as f32 / self.total_count as f32) * 100.0
    }
}

/// Raw bytes returned by the fetch collaborator
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    /// Payload body
    pub bytes: Vec<u8>,
    /// Content-Type reported by the remote, if any
    pub content_type: Option<String>,
}

impl Payload {
    /// Size of the body in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the body is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Result of one task's single attempt
///
/// Created once at the end of the attempt and never modified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadOutcome {
    /// The task this outcome belongs to
    pub task: DownloadTask,
    /// Whether the payload was fetched and saved
    pub succeeded: bool,
    /// Size of the saved payload (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<u64>,
    /// Why the attempt failed (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Where the payload was saved (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub file_path: Option<PathBuf>,
}

impl DownloadOutcome {
    /// Successful outcome
    pub fn success(task: DownloadTask, byte_size: u64, file_path: PathBuf) -> Self {
        Self {
            task,
            succeeded: true,
            byte_size: Some(byte_size),
            error_detail: None,
            file_path: Some(file_path),
        }
    }

    /// Failed outcome
    pub fn failure(task: DownloadTask, error_detail: impl Into<String>) -> Self {
        Self {
            task,
            succeeded: false,
            byte_size: None,
            error_detail: Some(error_detail.into()),
            file_path: None,
        }
    }
}

/// Aggregate result of a finished batch
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchSummary {
    /// Batch id
    pub batch_id: BatchId,
    /// Terminal state (`Completed` or `Failed`)
    pub state: BatchState,
    /// One outcome per task, in input order
    pub outcomes: Vec<DownloadOutcome>,
    /// Number of successful outcomes
    pub succeeded: usize,
    /// Number of failed outcomes
    pub failed: usize,
    /// When the batch started
    pub started_at: DateTime<Utc>,
    /// When the last task finished
    pub finished_at: DateTime<Utc>,
}

/// Event emitted while a batch runs
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Batch accepted and progress reset
    BatchStarted {
        /// Batch id
        batch_id: BatchId,
        /// Number of tasks
        total: usize,
    },

    /// A task is about to be attempted
    TaskStarted {
        /// Batch id
        batch_id: BatchId,
        /// Zero-based position of the task
        index: usize,
        /// Task key
        task_id: TaskId,
        /// Display name of the task
        label: String,
        /// Tasks already attempted
        completed: usize,
        /// Tasks in the batch
        total: usize,
    },

    /// A task's payload was fetched and saved
    TaskSucceeded {
        /// Batch id
        batch_id: BatchId,
        /// Zero-based position of the task
        index: usize,
        /// Task key
        task_id: TaskId,
        /// Saved size in bytes
        byte_size: u64,
        /// Saved file
        #[schema(value_type = String)]
        path: PathBuf,
    },

    /// A task's attempt failed
    TaskFailed {
        /// Batch id
        batch_id: BatchId,
        /// Zero-based position of the task
        index: usize,
        /// Task key
        task_id: TaskId,
        /// Error message
        error: String,
    },

    /// Every task has been attempted
    BatchFinished {
        /// Batch id
        batch_id: BatchId,
        /// Terminal state
        state: BatchState,
        /// Successful tasks
        succeeded: usize,
        /// Failed tasks
        failed: usize,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

/// Track returned by the playlist resolver
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Track {
    /// Remote track id
    pub id: String,
    /// Track title
    pub title: String,
    /// Uploader or artist name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// Permalink passed to the download endpoint
    pub url: String,
}

impl Track {
    /// Label shown while the track downloads ("artist - title")
    pub fn display_name(&self) -> String {
        match self.artist.as_deref().map(str::trim) {
            Some(artist) if !artist.is_empty() => format!("{} - {}", artist, self.title),
            _ => self.title.clone(),
        }
    }
}

impl From<Track> for DownloadTask {
    fn from(track: Track) -> Self {
        let display_name = track.display_name();
        DownloadTask::new(track.id, display_name, track.url)
    }
}

/// Resolved playlist
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Playlist {
    /// Playlist title
    #[serde(default)]
    pub title: String,
    /// Tracks in playlist order
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Playlist {
    /// Turn the tracks into download tasks, keeping playlist order
    pub fn into_tasks(self) -> Vec<DownloadTask> {
        self.tracks.into_iter().map(DownloadTask::from).collect()
    }
}

/// A persisted batch
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchRecord {
    /// Batch id
    pub id: BatchId,
    /// Format requested
    pub format: AudioFormat,
    /// Number of tasks
    pub total: usize,
    /// Last known state (`Running` for a batch still in flight)
    pub state: BatchState,
    /// Successful tasks
    pub succeeded: usize,
    /// Failed tasks
    pub failed: usize,
    /// Unix timestamp when the batch started
    pub started_at: i64,
    /// Unix timestamp when the batch finished
    pub finished_at: Option<i64>,
}

/// A persisted outcome
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OutcomeRecord {
    /// Zero-based position of the task in its batch
    pub position: usize,
    /// Recorded outcome
    #[serde(flatten)]
    pub outcome: DownloadOutcome,
    /// Unix timestamp of the attempt's end
    pub recorded_at: i64,
}
