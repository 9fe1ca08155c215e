//! Mirror latency probing and ranking.

use std::{sync::Arc, time::Duration};

use rayon::{prelude::*, ThreadPoolBuilder};
use tolito_config::repository::substitute_template;
use tolito_dl::http::Http;
use tolito_events::{EventSinkHandle, TolitoEvent};
use tracing::{debug, trace};

/// Measures how long a server takes to answer.
pub trait Probe: Send + Sync {
    /// Round-trip time to `url`, or `None` if it could not be reached.
    fn probe(&self, url: &str) -> Option<Duration>;
}

/// Probes with a HEAD request over the shared HTTP agent.
pub struct HttpProbe;

impl Probe for HttpProbe {
    fn probe(&self, url: &str) -> Option<Duration> {
        match Http::probe(url) {
            Ok(elapsed) => Some(elapsed),
            Err(err) => {
                trace!(url, "probe failed: {err}");
                None
            }
        }
    }
}

/// Orders servers by ascending latency; unreachable servers go last.
///
/// The sort is stable, so ties (and all unreachable servers) keep their input order.
pub fn rank_by_latency(mut measured: Vec<(String, Option<Duration>)>) -> Vec<String> {
    measured.sort_by_key(|(_, latency)| (latency.is_none(), *latency));
    measured.into_iter().map(|(server, _)| server).collect()
}

/// Ranks the mirrors of a repository by probing each one concurrently.
pub struct MirrorSelector {
    probe: Arc<dyn Probe>,
    workers: usize,
    arch: String,
    events: EventSinkHandle,
}

impl MirrorSelector {
    pub fn new(
        probe: Arc<dyn Probe>,
        workers: usize,
        arch: impl Into<String>,
        events: EventSinkHandle,
    ) -> Self {
        Self {
            probe,
            workers: workers.max(1),
            arch: arch.into(),
            events,
        }
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Substitutes `$repo`/`$arch` into every template and returns the resulting server
    /// URLs fastest first. Every input appears exactly once in the output.
    pub fn rank_mirrors(&self, templates: &[String], repo_name: &str) -> Vec<String> {
        let servers: Vec<String> = templates
            .iter()
            .map(|template| substitute_template(template, repo_name, &self.arch))
            .collect();

        if servers.len() <= 1 {
            return servers;
        }

        let measure = |server: &String| {
            let url = format!("{server}/{repo_name}.db");
            let latency = self.probe.probe(&url);
            self.events.emit(TolitoEvent::MirrorProbed {
                repo_name: repo_name.to_string(),
                url: server.clone(),
                latency_ms: latency.map(|d| d.as_millis() as u64),
            });
            (server.clone(), latency)
        };

        let measured: Vec<(String, Option<Duration>)> =
            match ThreadPoolBuilder::new().num_threads(self.workers).build() {
                Ok(pool) => pool.install(|| servers.par_iter().map(measure).collect()),
                Err(err) => {
                    debug!("probe pool unavailable ({err}), probing sequentially");
                    servers.iter().map(measure).collect()
                }
            };

        let ranked = rank_by_latency(measured);
        debug!(repo = repo_name, ?ranked, "ranked mirrors");
        ranked
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tolito_events::CollectorSink;

    use super::*;

    struct FakeProbe(HashMap<String, Option<u64>>);

    impl Probe for FakeProbe {
        fn probe(&self, url: &str) -> Option<Duration> {
            self.0
                .get(url)
                .copied()
                .flatten()
                .map(Duration::from_millis)
        }
    }

    fn ms(v: u64) -> Option<Duration> {
        Some(Duration::from_millis(v))
    }

    #[test]
    fn test_rank_by_latency_orders_and_keeps_unreachable_last() {
        let ranked = rank_by_latency(vec![
            ("a".into(), None),
            ("b".into(), ms(120)),
            ("c".into(), ms(30)),
            ("d".into(), None),
            ("e".into(), ms(120)),
        ]);
        assert_eq!(ranked, vec!["c", "b", "e", "a", "d"]);
    }

    #[test]
    fn test_rank_by_latency_all_unreachable_keeps_order() {
        let ranked = rank_by_latency(vec![("x".into(), None), ("y".into(), None)]);
        assert_eq!(ranked, vec!["x", "y"]);
    }

    #[test]
    fn test_rank_mirrors_substitutes_and_probes_db_url() {
        let probe = FakeProbe(HashMap::from([
            ("https://slow/chaotic-aur/x86_64/chaotic-aur.db".to_string(), Some(400)),
            ("https://fast/chaotic-aur/x86_64/chaotic-aur.db".to_string(), Some(20)),
        ]));
        let sink = Arc::new(CollectorSink::default());
        let selector = MirrorSelector::new(Arc::new(probe), 4, "x86_64", sink.clone());

        let templates = vec![
            "https://down/$repo/$arch".to_string(),
            "https://slow/$repo/$arch/".to_string(),
            "https://fast/$repo/$arch".to_string(),
        ];
        let ranked = selector.rank_mirrors(&templates, "chaotic-aur");

        assert_eq!(
            ranked,
            vec![
                "https://fast/chaotic-aur/x86_64",
                "https://slow/chaotic-aur/x86_64",
                "https://down/chaotic-aur/x86_64",
            ]
        );
        assert_eq!(sink.len(), 3);
        assert!(sink.events().iter().any(|e| matches!(
            e,
            TolitoEvent::MirrorProbed { url, latency_ms: None, .. } if url == "https://down/chaotic-aur/x86_64"
        )));
    }

    #[test]
    fn test_rank_mirrors_is_permutation_with_one_worker() {
        let probe = FakeProbe(HashMap::new());
        let selector = MirrorSelector::new(
            Arc::new(probe),
            0,
            "aarch64",
            Arc::new(tolito_events::NullSink),
        );
        let templates: Vec<String> = (0..10).map(|i| format!("https://m{i}/$arch")).collect();

        let mut ranked = selector.rank_mirrors(&templates, "core");
        ranked.sort();
        let mut expected: Vec<String> = (0..10).map(|i| format!("https://m{i}/aarch64")).collect();
        expected.sort();
        assert_eq!(ranked, expected);
    }

    #[test]
    fn test_single_server_is_not_probed() {
        let sink = Arc::new(CollectorSink::default());
        let selector =
            MirrorSelector::new(Arc::new(FakeProbe(HashMap::new())), 8, "x86_64", sink.clone());
        let ranked = selector.rank_mirrors(&["https://only/$repo".to_string()], "extra");
        assert_eq!(ranked, vec!["https://only/extra"]);
        assert!(sink.is_empty());
    }
}
