use crate::circuit_breaker::{create_provider_circuit_breaker, ProviderCircuit};
use crate::config::Config;
use crate::discovery::{self, DiscoveryEngine};
use crate::matching;
use crate::models::PartialPersonData;
use async_trait::async_trait;
use failsafe::futures::CircuitBreaker;
use metrics::counter;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Bounded timeout applied to every outbound provider call.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

pub const USER_AGENT: &str = "PersonFinder/1.0";

const CLEARBIT_PERSON_BASE_URL: &str = "https://person.clearbit.com";
const CLEARBIT_COMPANY_BASE_URL: &str = "https://company.clearbit.com";
const HUNTER_BASE_URL: &str = "https://api.hunter.io/v2";

/// Uniform contract over one external data source.
///
/// Adapters never surface errors for expected failure modes (not-found,
/// rate-limited, upstream outage): they return empty results and log. Only
/// the absence of data crosses this boundary.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search_by_email(&self, email: &str) -> Option<PartialPersonData>;

    async fn search_by_company(&self, company_name: &str) -> Vec<PartialPersonData>;

    async fn search_by_name(&self, name: &str) -> Vec<PartialPersonData>;
}

/// Retry configuration for transient provider failures.
///
/// `delay_unit` is scaled by `2^attempt` between attempts; tests shrink it
/// to milliseconds so backoff paths run fast.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_unit: Duration::from_secs(1),
        }
    }
}

/// Provider-internal call failure. Never crosses the adapter boundary;
/// it exists to feed the circuit breaker and the logs.
#[derive(Debug)]
pub enum CallError {
    Transport(reqwest::Error),
    Status(StatusCode),
    Decode(reqwest::Error),
    Build(String),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Transport(e) => write!(f, "transport error: {}", e),
            CallError::Status(s) => write!(f, "upstream returned status {}", s),
            CallError::Decode(e) => write!(f, "failed to decode response: {}", e),
            CallError::Build(msg) => write!(f, "failed to build request: {}", msg),
        }
    }
}

/// Sends a request, retrying transport errors and 5xx responses with
/// exponential backoff (`delay_unit * 2^attempt`). Non-5xx responses,
/// including 404 and 429, are returned to the caller for interpretation.
pub async fn send_with_retry(
    builder: &reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, CallError> {
    let mut attempt: u32 = 0;
    loop {
        let request = builder
            .try_clone()
            .ok_or_else(|| CallError::Build("request is not cloneable".to_string()))?;

        let error = match request.send().await {
            Ok(response) if !response.status().is_server_error() => return Ok(response),
            Ok(response) => CallError::Status(response.status()),
            Err(e) => CallError::Transport(e),
        };

        if attempt >= policy.max_retries {
            return Err(error);
        }
        attempt += 1;
        let delay = policy.delay_unit * 2u32.saturating_pow(attempt);
        tracing::debug!(
            "transient provider failure ({}), retry {}/{} in {:?}",
            error,
            attempt,
            policy.max_retries,
            delay
        );
        tokio::time::sleep(delay).await;
    }
}

fn record_circuit_skip(provider: &'static str) {
    counter!("provider_circuit_skips_total", "provider" => provider).increment(1);
    tracing::warn!("{} circuit breaker open, skipping call", provider);
}

fn record_failure(provider: &'static str, error: &CallError) {
    counter!("provider_failures_total", "provider" => provider).increment(1);
    tracing::error!("{} search failed: {}", provider, error);
}

// ============ Clearbit ============

#[derive(Debug, Deserialize)]
struct ClearbitCombined {
    person: Option<ClearbitPerson>,
    company: Option<ClearbitCompany>,
}

#[derive(Debug, Deserialize)]
struct ClearbitPerson {
    name: Option<ClearbitName>,
    email: Option<String>,
    phone: Option<String>,
    linkedin: Option<ClearbitHandle>,
    twitter: Option<ClearbitHandle>,
}

#[derive(Debug, Deserialize)]
struct ClearbitName {
    #[serde(rename = "fullName")]
    full_name: Option<String>,
    #[serde(rename = "givenName")]
    given_name: Option<String>,
    #[serde(rename = "familyName")]
    family_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClearbitHandle {
    handle: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClearbitCompany {
    name: Option<String>,
    domain: Option<String>,
}

/// Clearbit combined-lookup adapter. Strong on full profiles for an email;
/// cannot enumerate employees of a company.
pub struct ClearbitProvider {
    client: Client,
    person_base_url: String,
    company_base_url: String,
    api_key: String,
    retry: RetryPolicy,
    circuit: ProviderCircuit,
}

impl ClearbitProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_urls(
            api_key,
            CLEARBIT_PERSON_BASE_URL.to_string(),
            CLEARBIT_COMPANY_BASE_URL.to_string(),
            RetryPolicy::default(),
        )
    }

    /// Test constructor: point the adapter at a mock server and shrink the
    /// retry delays.
    pub fn with_base_urls(
        api_key: String,
        person_base_url: String,
        company_base_url: String,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client: Client::new(),
            person_base_url,
            company_base_url,
            api_key,
            retry,
            circuit: create_provider_circuit_breaker(),
        }
    }

    fn map_combined(&self, body: ClearbitCombined) -> Option<PartialPersonData> {
        let person = body.person?;

        let name = person.name.as_ref().and_then(|n| {
            n.full_name.clone().or_else(|| {
                match (n.given_name.as_deref(), n.family_name.as_deref()) {
                    (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
                    (Some(given), None) => Some(given.to_string()),
                    (None, Some(family)) => Some(family.to_string()),
                    (None, None) => None,
                }
            })
        });

        Some(PartialPersonData {
            name,
            email: person.email,
            company: body.company.and_then(|c| c.name),
            linked_in: person
                .linkedin
                .and_then(|l| l.handle)
                .map(|h| format!("https://linkedin.com/in/{}", h)),
            twitter: person
                .twitter
                .and_then(|t| t.handle)
                .map(|h| format!("https://twitter.com/{}", h)),
            phone: person.phone,
            ..Default::default()
        })
    }
}

#[async_trait]
impl SearchProvider for ClearbitProvider {
    fn name(&self) -> &'static str {
        "clearbit"
    }

    async fn search_by_email(&self, email: &str) -> Option<PartialPersonData> {
        let url = match reqwest::Url::parse_with_params(
            &format!("{}/v2/combined/find", self.person_base_url),
            &[("email", email)],
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Clearbit: failed to build URL: {}", e);
                return None;
            }
        };

        let request = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .header("User-Agent", USER_AGENT)
            .timeout(PROVIDER_TIMEOUT);

        let call = async {
            let response = send_with_retry(&request, &self.retry).await?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                StatusCode::TOO_MANY_REQUESTS => {
                    tracing::warn!("Clearbit rate limit hit, returning empty result");
                    Ok(None)
                }
                status if status.is_success() => {
                    let body: ClearbitCombined =
                        response.json().await.map_err(CallError::Decode)?;
                    Ok(Some(body))
                }
                status => Err(CallError::Status(status)),
            }
        };

        match self.circuit.call(call).await {
            Ok(Some(body)) => self.map_combined(body),
            Ok(None) => None,
            Err(failsafe::Error::Rejected) => {
                record_circuit_skip(self.name());
                None
            }
            Err(failsafe::Error::Inner(e)) => {
                record_failure(self.name(), &e);
                None
            }
        }
    }

    async fn search_by_company(&self, company_name: &str) -> Vec<PartialPersonData> {
        let url = match reqwest::Url::parse_with_params(
            &format!("{}/v2/companies/find", self.company_base_url),
            &[("name", company_name)],
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Clearbit: failed to build URL: {}", e);
                return Vec::new();
            }
        };

        let request = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .header("User-Agent", USER_AGENT)
            .timeout(PROVIDER_TIMEOUT);

        let call = async {
            let response = send_with_retry(&request, &self.retry).await?;
            match response.status() {
                StatusCode::NOT_FOUND | StatusCode::TOO_MANY_REQUESTS => Ok(None),
                status if status.is_success() => {
                    let body: ClearbitCompany =
                        response.json().await.map_err(CallError::Decode)?;
                    Ok(Some(body))
                }
                status => Err(CallError::Status(status)),
            }
        };

        match self.circuit.call(call).await {
            Ok(Some(company)) => {
                // Clearbit has no employee-listing endpoint; confirming the
                // company exists is all it can contribute here.
                tracing::debug!(
                    "Clearbit resolved company '{}' to domain {:?}",
                    company_name,
                    company.domain
                );
                Vec::new()
            }
            Ok(None) => Vec::new(),
            Err(failsafe::Error::Rejected) => {
                record_circuit_skip(self.name());
                Vec::new()
            }
            Err(failsafe::Error::Inner(e)) => {
                record_failure(self.name(), &e);
                Vec::new()
            }
        }
    }

    async fn search_by_name(&self, _name: &str) -> Vec<PartialPersonData> {
        // Clearbit does not support name search
        Vec::new()
    }
}

// ============ Hunter.io ============

#[derive(Debug, Deserialize)]
struct HunterVerifierResponse {
    data: HunterVerifierData,
}

#[derive(Debug, Deserialize)]
struct HunterVerifierData {
    result: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HunterDomainResponse {
    data: HunterDomainData,
}

#[derive(Debug, Deserialize)]
struct HunterDomainData {
    #[serde(default)]
    emails: Vec<HunterEmailEntry>,
}

#[derive(Debug, Deserialize)]
struct HunterEmailEntry {
    value: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// Hunter.io adapter. Verifies email deliverability and enumerates known
/// addresses for a company domain.
pub struct HunterProvider {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
    circuit: ProviderCircuit,
}

impl HunterProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, HUNTER_BASE_URL.to_string(), RetryPolicy::default())
    }

    /// Test constructor: point the adapter at a mock server and shrink the
    /// retry delays.
    pub fn with_base_url(api_key: String, base_url: String, retry: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            retry,
            circuit: create_provider_circuit_breaker(),
        }
    }
}

#[async_trait]
impl SearchProvider for HunterProvider {
    fn name(&self) -> &'static str {
        "hunter"
    }

    async fn search_by_email(&self, email: &str) -> Option<PartialPersonData> {
        let url = match reqwest::Url::parse_with_params(
            &format!("{}/email-verifier", self.base_url),
            &[("email", email), ("api_key", self.api_key.as_str())],
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Hunter: failed to build URL: {}", e);
                return None;
            }
        };

        let request = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .timeout(PROVIDER_TIMEOUT);

        let call = async {
            let response = send_with_retry(&request, &self.retry).await?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                StatusCode::TOO_MANY_REQUESTS => {
                    tracing::warn!("Hunter rate limit hit, returning empty result");
                    Ok(None)
                }
                status if status.is_success() => {
                    let body: HunterVerifierResponse =
                        response.json().await.map_err(CallError::Decode)?;
                    Ok(Some(body))
                }
                status => Err(CallError::Status(status)),
            }
        };

        match self.circuit.call(call).await {
            Ok(Some(body)) => {
                let data = body.data;
                if data.result.as_deref() != Some("deliverable") {
                    return None;
                }
                let name = match (data.first_name.as_deref(), data.last_name.as_deref()) {
                    (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
                    _ => None,
                };
                Some(PartialPersonData {
                    name,
                    email: data.email,
                    ..Default::default()
                })
            }
            Ok(None) => None,
            Err(failsafe::Error::Rejected) => {
                record_circuit_skip(self.name());
                None
            }
            Err(failsafe::Error::Inner(e)) => {
                record_failure(self.name(), &e);
                None
            }
        }
    }

    async fn search_by_company(&self, company_name: &str) -> Vec<PartialPersonData> {
        let url = match reqwest::Url::parse_with_params(
            &format!("{}/domain-search", self.base_url),
            &[
                ("company", company_name),
                ("api_key", self.api_key.as_str()),
                ("limit", "10"),
            ],
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Hunter: failed to build URL: {}", e);
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
            match response.status() {
                StatusCode::NOT_FOUND | StatusCode::TOO_MANY_REQUESTS => Ok(None),
                status if status.is_success() => {
                    let body: HunterDomainResponse =
                        response.json().await.map_err(CallError::Decode)?;
                    Ok(Some(body))
                }
                status => Err(CallError::Status(status)),
            }
        };

        match self.circuit.call(call).await {
            Ok(Some(body)) => body
                .data
                .emails
                .into_iter()
                .filter_map(|entry| {
                    let first = entry.first_name?;
                    let last = entry.last_name?;
                    Some(PartialPersonData {
                        name: Some(format!("{} {}", first, last)),
                        email: entry.value,
                        company: Some(company_name.to_string()),
                        ..Default::default()
                    })
                })
                .collect(),
            Ok(None) => Vec::new(),
            Err(failsafe::Error::Rejected) => {
                record_circuit_skip(self.name());
                Vec::new()
            }
            Err(failsafe::Error::Inner(e)) => {
                record_failure(self.name(), &e);
                Vec::new()
            }
        }
    }

    async fn search_by_name(&self, _name: &str) -> Vec<PartialPersonData> {
        // Hunter does not support name search
        Vec::new()
    }
}

// ============ Basic (key-less fallback) ============

/// Fallback adapter that works without any API key.
///
/// Derives a display name from the email local part and a company guess from
/// the domain, then asks the discovery engine for social handles that the
/// matching engine accepts for that name.
pub struct BasicProvider {
    discovery: Arc<dyn DiscoveryEngine>,
}

impl BasicProvider {
    pub fn new(discovery: Arc<dyn DiscoveryEngine>) -> Self {
        Self { discovery }
    }

    /// "joao.santos" -> "Joao Santos"
    fn humanize_local_part(local: &str) -> String {
        local
            .split(['.', '_', '-'])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn company_from_domain(domain: &str) -> Option<String> {
        let main = domain.split('.').next().filter(|s| !s.is_empty())?;
        let mut chars = main.chars();
        chars
            .next()
            .map(|first| first.to_uppercase().collect::<String>() + chars.as_str())
    }

    /// Queries the discovery engine for social profiles and keeps the first
    /// candidate per network that the matching engine accepts for `name`.
    async fn find_social_profiles(&self, name: &str) -> (Option<String>, Option<String>) {
        let query = format!("\"{}\" instagram OR linkedin", name);
        let hits = self.discovery.search(&query).await;

        let mut instagram = None;
        let mut linked_in = None;

        for hit in hits {
            if instagram.is_none() {
                if let Some(handle) = discovery::instagram_handle(&hit.url) {
                    if matching::is_person_match(&handle, name) {
                        tracing::debug!("Instagram found via discovery: @{}", handle);
                        instagram = Some(format!("@{}", handle));
                    }
                }
            }
            if linked_in.is_none() {
                if let Some(slug) = discovery::linkedin_slug(&hit.url) {
                    if matching::is_person_match(&slug, name) {
                        tracing::debug!("LinkedIn found via discovery: {}", slug);
                        linked_in = Some(format!("https://linkedin.com/in/{}", slug));
                    }
                }
            }
            if instagram.is_some() && linked_in.is_some() {
                break;
            }
        }

        (instagram, linked_in)
    }
}

#[async_trait]
impl SearchProvider for BasicProvider {
    fn name(&self) -> &'static str {
        "basic"
    }

    async fn search_by_email(&self, email: &str) -> Option<PartialPersonData> {
        let (local, domain) = email.split_once('@')?;
        if local.is_empty() || domain.is_empty() {
            return None;
        }

        let name = Self::humanize_local_part(local);
        if name.is_empty() {
            return None;
        }
        let company = Self::company_from_domain(domain);
        let (instagram, linked_in) = self.find_social_profiles(&name).await;

        Some(PartialPersonData {
            name: Some(name),
            email: Some(email.to_string()),
            company,
            instagram,
            linked_in,
            ..Default::default()
        })
    }

    async fn search_by_company(&self, company_name: &str) -> Vec<PartialPersonData> {
        // Without an API key the best this adapter can offer are the
        // company's generic contact points on a guessed domain.
        let cleaned = matching::strip_legal_suffixes(company_name).replace(' ', "");
        if cleaned.is_empty() {
            return Vec::new();
        }
        let domain = format!("{}.com", cleaned);

        let common_roles = ["contact", "info", "sales", "support"];
        common_roles
            .iter()
            .take(3)
            .map(|role| PartialPersonData {
                name: Some(format!(
                    "{} - {}",
                    Self::humanize_local_part(role),
                    company_name
                )),
                email: Some(format!("{}@{}", role, domain)),
                company: Some(company_name.to_string()),
                ..Default::default()
            })
            .collect()
    }

    async fn search_by_name(&self, name: &str) -> Vec<PartialPersonData> {
        let (instagram, linked_in) = self.find_social_profiles(name).await;
        if instagram.is_none() && linked_in.is_none() {
            return Vec::new();
        }
        vec![PartialPersonData {
            name: Some(name.to_string()),
            instagram,
            linked_in,
            ..Default::default()
        }]
    }
}

// ============ Provider factory ============

/// Builds the provider list from available credentials.
///
/// Registration order is merge priority: commercial sources first, the
/// key-less fallback last. Missing keys never block startup; the system
/// degrades to whatever adapters are available.
pub fn build_providers(
    config: &Config,
    discovery: Arc<dyn DiscoveryEngine>,
) -> Vec<Arc<dyn SearchProvider>> {
    let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();

    if let Some(ref key) = config.clearbit_api_key {
        tracing::info!("Registering Clearbit provider");
        providers.push(Arc::new(ClearbitProvider::new(key.clone())));
    }

    if let Some(ref key) = config.hunter_api_key {
        tracing::info!("Registering Hunter provider");
        providers.push(Arc::new(HunterProvider::new(key.clone())));
    }

    tracing::info!("Registering basic provider (no API key required)");
    providers.push(Arc::new(BasicProvider::new(discovery)));

    if providers.len() == 1 {
        tracing::info!(
            "Only the basic provider is active; set CLEARBIT_API_KEY or HUNTER_API_KEY for better results"
        );
    }

    providers
}
