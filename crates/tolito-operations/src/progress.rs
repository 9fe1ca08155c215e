use std::sync::atomic::{AtomicU64, Ordering};

use tolito_dl::types::Progress;
use tolito_events::{EventSinkHandle, OperationId, TolitoEvent};

/// Creates a transfer progress callback that re-emits samples as [`TolitoEvent`]s.
pub fn create_progress_bridge(
    events: EventSinkHandle,
    op_id: OperationId,
    pkg_name: String,
) -> impl Fn(Progress) + Send + Sync + 'static {
    move |progress| {
        let event = match progress {
            Progress::Starting { total } => {
                TolitoEvent::DownloadStarting {
                    op_id,
                    pkg_name: pkg_name.clone(),
                    total,
                }
            }
            Progress::Chunk {
                current,
                total,
                speed,
            } => {
                TolitoEvent::DownloadProgress {
                    op_id,
                    pkg_name: pkg_name.clone(),
                    current,
                    total,
                    speed,
                }
            }
            Progress::Complete { total } => {
                TolitoEvent::DownloadComplete {
                    op_id,
                    pkg_name: pkg_name.clone(),
                    total,
                }
            }
        };
        events.emit(event);
    }
}

/// Generates a unique operation ID.
pub fn next_op_id() -> OperationId {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
