//! Public-web discovery via the DuckDuckGo instant-answer API.
//!
//! Best-effort only: any failure degrades to an empty hit list, never an
//! error. The hits feed the matching engine, which decides whether anything
//! found actually belongs to the person being searched.

use crate::circuit_breaker::{create_provider_circuit_breaker, ProviderCircuit};
use crate::providers::{send_with_retry, RetryPolicy, PROVIDER_TIMEOUT, USER_AGENT};
use async_trait::async_trait;
use failsafe::futures::CircuitBreaker;
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;

const DUCKDUCKGO_BASE_URL: &str = "https://api.duckduckgo.com";

/// One search-engine result: a URL and its display text.
#[derive(Debug, Clone)]
pub struct DiscoveryHit {
    pub url: String,
    pub text: String,
}

/// A source of public-web search results.
#[async_trait]
pub trait DiscoveryEngine: Send + Sync {
    async fn search(&self, query: &str) -> Vec<DiscoveryHit>;
}

pub struct DuckDuckGoDiscovery {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
    circuit: ProviderCircuit,
}

impl Default for DuckDuckGoDiscovery {
    fn default() -> Self {
        Self::with_base_url(DUCKDUCKGO_BASE_URL.to_string(), RetryPolicy::default())
    }
}

impl DuckDuckGoDiscovery {
    /// Test constructor: point the engine at a mock server and shrink the
    /// retry delays.
    pub fn with_base_url(base_url: String, retry: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            base_url,
            retry,
            circuit: create_provider_circuit_breaker(),
        }
    }
}

#[async_trait]
impl DiscoveryEngine for DuckDuckGoDiscovery {
    async fn search(&self, query: &str) -> Vec<DiscoveryHit> {
        let url = match reqwest::Url::parse_with_params(
            &format!("{}/", self.base_url),
            &[("q", query), ("format", "json"), ("no_html", "1")],
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("DuckDuckGo: failed to build URL: {}", e);
                return Vec::new();
            }
        };

        let request = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .timeout(PROVIDER_TIMEOUT);

        let call = async {
            let response = send_with_retry(&request, &self.retry).await?;
            if !response.status().is_success() {
                return Err(crate::providers::CallError::Status(response.status()));
            }
            let body: serde_json::Value = response
                .json()
                .await
                .map_err(crate::providers::CallError::Decode)?;
            Ok(body)
        };

        let body = match self.circuit.call(call).await {
            Ok(body) => body,
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("DuckDuckGo circuit breaker open, skipping search");
                return Vec::new();
            }
            Err(failsafe::Error::Inner(e)) => {
                tracing::warn!("DuckDuckGo search failed: {}", e);
                return Vec::new();
            }
        };

        body.get("Results")
            .and_then(|r| r.as_array())
            .map(|results| {
                results
                    .iter()
                    .filter_map(|entry| {
                        let url = entry.get("FirstURL")?.as_str()?.to_string();
                        let text = entry
                            .get("Text")
                            .and_then(|t| t.as_str())
                            .unwrap_or_default()
                            .to_string();
                        Some(DiscoveryHit { url, text })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn instagram_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"instagram\.com/([^/?#]+)").unwrap())
}

fn linkedin_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"linkedin\.com/in/([^/?#]+)").unwrap())
}

/// Extracts the Instagram handle from a profile URL, if the URL is one.
pub fn instagram_handle(url: &str) -> Option<String> {
    instagram_regex()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|h| !h.is_empty() && h != "p" && h != "explore")
}

/// Extracts the profile slug from a LinkedIn `/in/` URL.
pub fn linkedin_slug(url: &str) -> Option<String> {
    linkedin_regex()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}
