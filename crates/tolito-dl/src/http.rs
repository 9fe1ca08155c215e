use std::time::{Duration, Instant};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::trace;
use ureq::{http::Response, Body};

use crate::{
    error::{DownloadError, Result},
    http_client::SHARED_AGENT,
};

/// Characters left intact when encoding a query value.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub struct Http;

impl Http {
    pub fn fetch(url: &str) -> Result<Response<Body>> {
        SHARED_AGENT
            .get(url)
            .call()
            .map_err(|err| classify(err, url))
    }

    pub fn json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T> {
        Self::fetch(url)?
            .body_mut()
            .read_json()
            .map_err(|_| DownloadError::InvalidResponse)
    }

    /// Sends a HEAD request with short timeouts and returns how long the server took
    /// to answer. Any status below 400 counts as reachable.
    pub fn probe(url: &str) -> Result<Duration> {
        let started = Instant::now();
        let response = SHARED_AGENT
            .probe_head(url)
            .call()
            .map_err(|err| classify(err, url))?;
        let elapsed = started.elapsed();
        trace!(url, status = response.status().as_u16(), ?elapsed, "probe answered");
        Ok(elapsed)
    }
}

fn classify(err: ureq::Error, url: &str) -> DownloadError {
    match err {
        ureq::Error::StatusCode(status) => {
            DownloadError::HttpError {
                status,
                url: url.to_string(),
            }
        }
        other => other.into(),
    }
}

/// Percent-encodes a single query-string value.
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}
