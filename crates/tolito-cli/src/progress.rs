use std::{
    collections::HashMap,
    sync::{mpsc::Receiver, Arc, LazyLock},
    time::{Duration, Instant},
};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nu_ansi_term::Color::Cyan;
use tolito_config::display::{DisplaySettings, ProgressStyle as Style};
use tolito_dl::types::{eta, percent};
use tolito_events::{
    BuildStage, InstallStage, OperationId, RemoveStage, SyncStage, TolitoEvent,
};
use tolito_utils::bytes::{format_bytes, format_eta};
use tracing::{debug, info};

use crate::utils::Colored;

/// Shared MultiProgress instance for suspend/stop from other modules.
static MULTI: LazyLock<Arc<MultiProgress>> = LazyLock::new(|| Arc::new(MultiProgress::new()));

const TEXT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Pause progress display, run the closure, then resume.
pub fn suspend<F: FnOnce()>(f: F) {
    MULTI.suspend(f);
}

/// Stop and clear all progress bars.
pub fn stop() {
    MULTI.clear().ok();
}

/// Owns the background thread rendering events.
///
/// The [`OperationContext`](tolito_operations::OperationContext) holding the channel sender
/// must be dropped before [`finish`](ProgressGuard::finish), or the join never returns.
pub struct ProgressGuard {
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ProgressGuard {
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn download_style(candy: bool) -> ProgressStyle {
    let style = ProgressStyle::with_template(
        "{prefix}  {wide_bar:.cyan/dim}  {bytes}/{total_bytes}  {bytes_per_sec}  {eta}  {percent:>3}%",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    if candy {
        style.progress_chars("-Co")
    } else {
        style.progress_chars("━━─")
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// One-line transfer report used by the text progress style.
pub fn text_report(pkg_name: &str, current: u64, total: u64, speed: u64) -> String {
    let mut line = format!("{pkg_name}:");
    if let Some(percent) = percent(current, total) {
        line.push_str(&format!(" {percent:.0}%"));
    }
    line.push_str(&format!(" {}", format_bytes(current, 1)));
    if total > 0 {
        line.push_str(&format!("/{}", format_bytes(total, 1)));
    }
    line.push_str(&format!(" {}/s", format_bytes(speed, 1)));
    if let Some(remaining) = eta(current, total, speed) {
        line.push_str(&format!(" ETA {}", format_eta(remaining.as_secs())));
    }
    line
}

struct Renderer {
    display: DisplaySettings,
    downloads: HashMap<OperationId, ProgressBar>,
    last_report: HashMap<OperationId, Instant>,
    syncs: HashMap<String, ProgressBar>,
}

impl Renderer {
    fn new(display: DisplaySettings) -> Self {
        Self {
            display,
            downloads: HashMap::new(),
            last_report: HashMap::new(),
            syncs: HashMap::new(),
        }
    }

    fn bars(&self) -> bool {
        self.display.progress_style() == Style::Bar
    }

    fn sync_spinner(&mut self, repo_name: &str) -> &ProgressBar {
        self.syncs.entry(repo_name.to_string()).or_insert_with(|| {
            let pb = MULTI.add(ProgressBar::new_spinner());
            pb.set_style(spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        })
    }

    fn finish_sync(&mut self, repo_name: &str) {
        if let Some(pb) = self.syncs.remove(repo_name) {
            pb.finish_and_clear();
        }
    }

    fn finish_download(&mut self, op_id: OperationId) {
        self.last_report.remove(&op_id);
        if let Some(pb) = self.downloads.remove(&op_id) {
            pb.finish_and_clear();
        }
    }

    /// Clears everything before an external tool takes over the terminal.
    fn clear_all(&mut self) {
        let downloads = self.downloads.drain().map(|(_, pb)| pb);
        for pb in downloads.chain(self.syncs.drain().map(|(_, pb)| pb)) {
            pb.finish_and_clear();
        }
        self.last_report.clear();
    }

    fn handle(&mut self, event: TolitoEvent) {
        match event {
            TolitoEvent::MirrorProbed {
                repo_name,
                url,
                latency_ms,
            } => {
                debug!("{url}: {latency_ms:?} ms");
                if self.bars() {
                    let message = format!("Ranking mirrors for {repo_name}");
                    self.sync_spinner(&repo_name).set_message(message);
                }
            }
            TolitoEvent::SyncProgress { repo_name, stage } => {
                match stage {
                    SyncStage::Fetching { server } => {
                        if self.bars() {
                            let message = format!("Syncing {repo_name} from {server}");
                            self.sync_spinner(&repo_name).set_message(message);
                        } else {
                            info!("Syncing {repo_name} from {server}");
                        }
                    }
                    SyncStage::Extracting => {
                        if self.bars() {
                            let message = format!("Extracting {repo_name}");
                            self.sync_spinner(&repo_name).set_message(message);
                        }
                    }
                    SyncStage::Cached => {}
                    SyncStage::Complete { package_count } => {
                        self.finish_sync(&repo_name);
                        debug!("{repo_name}: {package_count} packages");
                    }
                    SyncStage::Unavailable => self.finish_sync(&repo_name),
                }
            }
            TolitoEvent::DownloadStarting {
                op_id,
                pkg_name,
                total,
            } => {
                if self.bars() {
                    let pb = MULTI.add(ProgressBar::new(total));
                    pb.set_style(download_style(self.display.candy_bar()));
                    pb.set_prefix(Colored(Cyan, &pkg_name).to_string());
                    pb.enable_steady_tick(Duration::from_millis(100));
                    self.downloads.insert(op_id, pb);
                } else {
                    info!("Downloading {pkg_name} ({})", format_bytes(total, 1));
                    self.last_report.insert(op_id, Instant::now());
                }
            }
            TolitoEvent::DownloadProgress {
                op_id,
                pkg_name,
                current,
                total,
                speed,
            } => {
                if let Some(pb) = self.downloads.get(&op_id) {
                    pb.set_position(current);
                } else if !self.bars() {
                    let due = self
                        .last_report
                        .get(&op_id)
                        .is_none_or(|last| last.elapsed() >= TEXT_REPORT_INTERVAL);
                    if due {
                        info!("{}", text_report(&pkg_name, current, total, speed));
                        self.last_report.insert(op_id, Instant::now());
                    }
                }
            }
            TolitoEvent::DownloadComplete {
                op_id,
                pkg_name,
                total,
            } => {
                if !self.bars() {
                    info!("{pkg_name}: downloaded {}", format_bytes(total, 1));
                }
                self.finish_download(op_id);
            }
            TolitoEvent::DownloadAborted { op_id, .. } => self.finish_download(op_id),
            TolitoEvent::SourceSelected { pkg_name, source } => {
                debug!("{pkg_name}: selected {source}");
            }
            TolitoEvent::Building {
                stage: BuildStage::Building { .. },
                ..
            }
            | TolitoEvent::Installing {
                stage: InstallStage::Committing,
                ..
            }
            | TolitoEvent::Removing {
                stage: RemoveStage::Committing,
                ..
            } => self.clear_all(),
            TolitoEvent::BatchProgress {
                completed,
                total,
                failed,
            } => {
                if total > 1 {
                    info!(
                        ":: {completed}/{total} done{}",
                        if failed > 0 {
                            format!(", {failed} failed")
                        } else {
                            String::new()
                        }
                    );
                }
            }
            _ => {}
        }
    }
}

/// Spawns the thread that turns [`TolitoEvent`]s into progress output.
pub fn spawn_event_handler(
    receiver: Receiver<TolitoEvent>,
    display: DisplaySettings,
) -> ProgressGuard {
    let handle = std::thread::spawn(move || {
        let mut renderer = Renderer::new(display);
        while let Ok(event) = receiver.recv() {
            renderer.handle(event);
        }
        renderer.clear_all();
    });

    ProgressGuard {
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_report() {
        let line = text_report("bar", 512 * 1024, 1024 * 1024, 256 * 1024);
        assert!(line.starts_with("bar: 50%"));
        assert!(line.contains("ETA"));

        let unknown = text_report("bar", 2048, 0, 1024);
        assert!(!unknown.contains('%'));
        assert!(!unknown.contains("ETA"));
    }
}
