//! AUR RPC client.

use serde::Deserialize;
use tolito_dl::http::{encode_query_value, Http};
use tracing::debug;

/// Looks up the latest published version of a community package.
pub trait AurClient: Send + Sync {
    fn version(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
pub struct AurRpcResponse {
    #[serde(default)]
    pub resultcount: u32,
    #[serde(default)]
    pub results: Vec<AurPackage>,
}

#[derive(Debug, Deserialize)]
pub struct AurPackage {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version")]
    pub version: String,
}

impl AurRpcResponse {
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.results
            .iter()
            .find(|pkg| pkg.name == name)
            .map(|pkg| pkg.version.as_str())
    }
}

/// Queries `<base>/rpc/?v=5&type=info&arg=<name>` over HTTP.
pub struct AurRpc {
    base_url: String,
}

impl AurRpc {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn info_url(&self, name: &str) -> String {
        format!(
            "{}/rpc/?v=5&type=info&arg={}",
            self.base_url,
            encode_query_value(name)
        )
    }
}

impl AurClient for AurRpc {
    fn version(&self, name: &str) -> Option<String> {
        let url = self.info_url(name);
        match Http::json::<AurRpcResponse>(&url) {
            Ok(response) => response.version_of(name).map(str::to_string),
            Err(err) => {
                debug!("AUR lookup of {name} failed: {err}");
                None
            }
        }
    }
}
