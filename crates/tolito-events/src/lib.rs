//! Progress and lifecycle events shared between tolito operations and frontends.

mod event;
mod sink;

use std::sync::Arc;

pub use event::*;
pub use sink::*;

/// Unique identifier for a running operation.
pub type OperationId = u64;

/// Shared handle to an event sink.
pub type EventSinkHandle = Arc<dyn EventSink>;

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn building(op_id: OperationId, stage: BuildStage) -> TolitoEvent {
        TolitoEvent::Building {
            op_id,
            pkg_name: "yay".to_string(),
            stage,
        }
    }

    #[test]
    fn test_channel_sink_preserves_order_across_threads() {
        let (sink, rx) = ChannelSink::new();
        let sink: EventSinkHandle = Arc::new(sink);

        let worker = {
            let sink = sink.clone();
            thread::spawn(move || {
                sink.emit(building(7, BuildStage::Cloning {
                    url: "https://aur.archlinux.org/yay.git".to_string(),
                }));
                sink.emit(building(7, BuildStage::Building { attempt: 1 }));
                sink.emit(building(7, BuildStage::Complete));
            })
        };
        worker.join().unwrap();
        drop(sink);

        let stages: Vec<_> = rx
            .iter()
            .filter_map(|event| {
                match event {
                    TolitoEvent::Building { stage, .. } => Some(stage),
                    _ => None,
                }
            })
            .collect();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[1], BuildStage::Building { attempt: 1 });
        assert_eq!(stages[2], BuildStage::Complete);
    }

    #[test]
    fn test_channel_sink_receiver_dropped() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(building(1, BuildStage::SparseCheckout));
    }

    #[test]
    fn test_collector_sink() {
        let collector = Arc::new(CollectorSink::default());
        let sink: EventSinkHandle = collector.clone();
        assert!(collector.is_empty());

        sink.emit(TolitoEvent::SyncProgress {
            repo_name: "chaotic-aur".to_string(),
            stage: SyncStage::Fetching {
                server: "https://cdn.example/chaotic-aur/x86_64".to_string(),
            },
        });
        sink.emit(TolitoEvent::SyncProgress {
            repo_name: "chaotic-aur".to_string(),
            stage: SyncStage::Complete { package_count: 100 },
        });
        NullSink.emit(building(2, BuildStage::ReusingArtifact));

        assert_eq!(collector.len(), 2);
        assert!(matches!(
            &collector.events()[1],
            TolitoEvent::SyncProgress {
                stage: SyncStage::Complete { package_count: 100 },
                ..
            }
        ));
    }

    #[test]
    fn test_event_sink_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullSink>();
        assert_send_sync::<ChannelSink>();
        assert_send_sync::<CollectorSink>();
    }
}
