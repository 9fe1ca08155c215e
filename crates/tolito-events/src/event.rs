use crate::OperationId;

/// Everything tolito operations report while they run.
#[derive(Debug, Clone)]
pub enum TolitoEvent {
    /// A mirror answered (or failed to answer) a latency probe.
    MirrorProbed {
        repo_name: String,
        url: String,
        latency_ms: Option<u64>,
    },
    /// Repository database fetch progress.
    SyncProgress { repo_name: String, stage: SyncStage },
    /// Download is starting. `total` is 0 when the server sent no length.
    DownloadStarting {
        op_id: OperationId,
        pkg_name: String,
        total: u64,
    },
    /// Periodic download sample.
    DownloadProgress {
        op_id: OperationId,
        pkg_name: String,
        current: u64,
        total: u64,
        /// Bytes per second over the last sample window.
        speed: u64,
    },
    DownloadComplete {
        op_id: OperationId,
        pkg_name: String,
        total: u64,
    },
    /// One server failed; the next one will be tried.
    DownloadAborted {
        op_id: OperationId,
        pkg_name: String,
        reason: String,
    },
    /// The resolver settled on a source for a package.
    SourceSelected { pkg_name: String, source: String },
    /// Source build stage.
    Building {
        op_id: OperationId,
        pkg_name: String,
        stage: BuildStage,
    },
    /// Handing an artifact to the system package manager.
    Installing {
        op_id: OperationId,
        pkg_name: String,
        stage: InstallStage,
    },
    Removing {
        op_id: OperationId,
        pkg_name: String,
        stage: RemoveStage,
    },
    UpdateCheck {
        pkg_name: String,
        status: UpdateCheckStatus,
    },
    OperationComplete {
        op_id: OperationId,
        pkg_name: String,
    },
    OperationFailed {
        op_id: OperationId,
        pkg_name: String,
        error: String,
    },
    /// Batch operation overall progress.
    BatchProgress {
        completed: u32,
        total: u32,
        failed: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStage {
    /// Downloading the index from a server.
    Fetching { server: String },
    /// Unpacking the downloaded index.
    Extracting,
    /// Served from this run's memo.
    Cached,
    Complete { package_count: usize },
    /// Every server failed.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStage {
    /// Updating the sparse checkout of the curated repository.
    SparseCheckout,
    Cloning { url: String },
    /// A built artifact is already present; clone and build are skipped.
    ReusingArtifact,
    Building { attempt: u32 },
    /// Fetching and locally signing a PGP key the build asked for.
    ImportingKey { key_id: String },
    Failed { exit_code: Option<i32> },
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStage {
    /// Reusing a previously downloaded artifact.
    CachedArtifact,
    Committing,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveStage {
    Committing,
    ForgettingSource,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheckStatus {
    Available {
        current_version: String,
        new_version: String,
        source: String,
    },
    UpToDate { version: String },
    Skipped { reason: String },
}
