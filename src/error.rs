//! Error types and handling for the queue

/// Result type alias for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors reported by the queue core
///
/// Each variant surfaces as a distinct negative code through [`QueueError::code`],
/// mirroring the C-style API of the queue tooling. [`error_str`] maps a code back
/// to a human-readable description.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Index file could not be opened or created
    #[error("index file open failed: {source}")]
    IndexOpen {
        #[source]
        source: std::io::Error,
    },

    /// Data file could not be opened or created
    #[error("data file open failed: {source}")]
    DataOpen {
        #[source]
        source: std::io::Error,
    },

    /// Control file could not be opened or created
    #[error("control file open failed: {source}")]
    ControlOpen {
        #[source]
        source: std::io::Error,
    },

    /// Index header magic/version/align mismatch on attach
    #[error("index header mismatch: {detail}")]
    IndexSanity { detail: &'static str },

    /// Data header magic/version/align mismatch on attach
    #[error("data header mismatch: {detail}")]
    DataSanity { detail: &'static str },

    /// Control header magic/version/align mismatch on attach
    #[error("control header mismatch: {detail}")]
    ControlSanity { detail: &'static str },

    /// Named semaphore could not be created or opened
    #[error("semaphore '{name}' open failed: {source}")]
    SemaphoreOpen {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Failure acquiring the registry lock
    #[error("registry lock failed: {source}")]
    RegistryLock {
        #[source]
        source: std::io::Error,
    },

    /// No inactive consumer slot available at registration
    #[error("consumer slots full")]
    ConsumerSlotsFull,

    /// Grow-in-place of the index file failed
    #[error("index extend failed: {source}")]
    IndexExtend {
        #[source]
        source: std::io::Error,
    },

    /// Grow-in-place of the data file failed
    #[error("data extend failed: {source}")]
    DataExtend {
        #[source]
        source: std::io::Error,
    },

    /// Timed wait expired without a wakeup token
    #[error("timed out")]
    TimedOut,

    /// Blocking wait on the notify semaphore failed
    #[error("notify wait failed: {source}")]
    NotifyWait {
        #[source]
        source: std::io::Error,
    },

    /// Slot index did not come from a successful registration
    #[error("invalid consumer slot {slot}")]
    InvalidSlot { slot: u32 },
}

impl QueueError {
    /// Stable negative code for this error kind
    pub fn code(&self) -> i32 {
        match self {
            QueueError::IndexOpen { .. } => -1,
            QueueError::DataOpen { .. } => -2,
            QueueError::ControlOpen { .. } => -3,
            QueueError::IndexSanity { .. } => -4,
            QueueError::DataSanity { .. } => -5,
            QueueError::ControlSanity { .. } => -6,
            QueueError::SemaphoreOpen { .. } => -7,
            QueueError::RegistryLock { .. } => -8,
            QueueError::ConsumerSlotsFull => -9,
            QueueError::IndexExtend { .. } => -10,
            QueueError::DataExtend { .. } => -11,
            QueueError::TimedOut => -12,
            QueueError::NotifyWait { .. } => -13,
            QueueError::InvalidSlot { .. } => -14,
        }
    }
}

/// Human-readable description for an error code returned by [`QueueError::code`]
pub fn error_str(code: i32) -> &'static str {
    match code {
        -1 => "index file open failed",
        -2 => "data file open failed",
        -3 => "control file open failed",
        -4 => "index header mismatch",
        -5 => "data header mismatch",
        -6 => "control header mismatch",
        -7 => "semaphore open failed",
        -8 => "registry lock failed",
        -9 => "consumer slots full",
        -10 => "index extend failed",
        -11 => "data extend failed",
        -12 => "timed out",
        -13 => "notify wait failed",
        -14 => "invalid consumer slot",
        _ => "unknown error",
    }
}
