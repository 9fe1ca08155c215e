use std::{
    sync::{Arc, LazyLock, RwLock},
    time::Duration,
};

use ureq::{
    http::HeaderMap,
    typestate::WithoutBody,
    Agent, RequestBuilder,
};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings used to build the shared HTTP agents.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub headers: Option<HeaderMap>,
    /// Limit for establishing a connection.
    pub connect_timeout: Option<Duration>,
    /// Limit for a whole transfer. `None` removes it.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: Some(format!("tolito/{}", env!("CARGO_PKG_VERSION"))),
            headers: None,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            timeout: Some(DEFAULT_TRANSFER_TIMEOUT),
        }
    }
}

impl ClientConfig {
    pub fn build(&self) -> Agent {
        self.agent_with(self.connect_timeout, self.timeout)
    }

    /// Agent used for mirror latency probes: the same identity with short limits.
    fn build_probe(&self) -> Agent {
        self.agent_with(Some(DEFAULT_CONNECT_TIMEOUT), Some(PROBE_TIMEOUT))
    }

    fn agent_with(&self, connect: Option<Duration>, global: Option<Duration>) -> Agent {
        let mut config = Agent::config_builder()
            .timeout_connect(connect)
            .timeout_global(global);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

struct SharedClientState {
    agent: Agent,
    probe_agent: Agent,
    config: ClientConfig,
}

static SHARED_CLIENT_STATE: LazyLock<Arc<RwLock<SharedClientState>>> = LazyLock::new(|| {
    let config = ClientConfig::default();
    Arc::new(RwLock::new(SharedClientState {
        agent: config.build(),
        probe_agent: config.build_probe(),
        config,
    }))
});

#[derive(Clone, Copy)]
pub struct SharedAgent;

impl SharedAgent {
    fn read_state<R>(f: impl FnOnce(&SharedClientState) -> R) -> R {
        let state = SHARED_CLIENT_STATE
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&state)
    }

    fn apply_defaults<B>(mut req: RequestBuilder<B>, config: &ClientConfig) -> RequestBuilder<B> {
        if let Some(headers) = &config.headers {
            for (key, value) in headers.iter() {
                req = req.header(key, value);
            }
        }
        req
    }

    pub fn get(&self, url: &str) -> RequestBuilder<WithoutBody> {
        Self::read_state(|state| Self::apply_defaults(state.agent.get(url), &state.config))
    }

    pub fn head(&self, url: &str) -> RequestBuilder<WithoutBody> {
        Self::read_state(|state| Self::apply_defaults(state.agent.head(url), &state.config))
    }

    /// HEAD request on the short-timeout probe agent.
    pub fn probe_head(&self, url: &str) -> RequestBuilder<WithoutBody> {
        Self::read_state(|state| {
            Self::apply_defaults(state.probe_agent.head(url), &state.config)
        })
    }
}

pub static SHARED_AGENT: SharedAgent = SharedAgent;

/// Rebuilds the shared agents after applying `updater` to the current settings.
pub fn configure_http_client<F>(updater: F)
where
    F: FnOnce(&mut ClientConfig),
{
    let mut state = SHARED_CLIENT_STATE
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut config = state.config.clone();
    updater(&mut config);

    state.agent = config.build();
    state.probe_agent = config.build_probe();
    state.config = config;
}

/// Current settings of the shared agent.
pub fn client_config() -> ClientConfig {
    SharedAgent::read_state(|state| state.config.clone())
}
