use async_trait::async_trait;
use person_finder_api::discovery::{
    DiscoveryEngine, DiscoveryHit, DuckDuckGoDiscovery,
};
use person_finder_api::providers::{
    BasicProvider, ClearbitProvider, HunterProvider, RetryPolicy, SearchProvider,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        delay_unit: Duration::from_millis(1),
    }
}

fn clearbit_against(server: &MockServer) -> ClearbitProvider {
    ClearbitProvider::with_base_urls(
        "test-key".to_string(),
        server.uri(),
        server.uri(),
        fast_retry(),
    )
}

fn hunter_against(server: &MockServer) -> HunterProvider {
    HunterProvider::with_base_url("test-key".to_string(), server.uri(), fast_retry())
}

#[tokio::test]
async fn clearbit_maps_combined_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/combined/find"))
        .and(query_param("email", "joao@techcorp.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "person": {
                "name": { "fullName": "Joao Santos" },
                "email": "joao@techcorp.com",
                "phone": "+55 11 98765-4321",
                "linkedin": { "handle": "joao-santos" },
                "twitter": { "handle": "joaosantos" }
            },
            "company": { "name": "TechCorp", "domain": "techcorp.com" }
        })))
        .mount(&server)
        .await;

    let provider = clearbit_against(&server);
    let result = provider.search_by_email("joao@techcorp.com").await.unwrap();

    assert_eq!(result.name.as_deref(), Some("Joao Santos"));
    assert_eq!(result.email.as_deref(), Some("joao@techcorp.com"));
    assert_eq!(result.company.as_deref(), Some("TechCorp"));
    assert_eq!(
        result.linked_in.as_deref(),
        Some("https://linkedin.com/in/joao-santos")
    );
    assert_eq!(
        result.twitter.as_deref(),
        Some("https://twitter.com/joaosantos")
    );
}

#[tokio::test]
async fn clearbit_falls_back_to_given_and_family_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/combined/find"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "person": {
                "name": { "givenName": "Ana", "familyName": "Lima" }
            },
            "company": null
        })))
        .mount(&server)
        .await;

    let provider = clearbit_against(&server);
    let result = provider.search_by_email("ana@example.com").await.unwrap();
    assert_eq!(result.name.as_deref(), Some("Ana Lima"));
}

#[tokio::test]
async fn not_found_yields_empty_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/combined/find"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = clearbit_against(&server);
    assert!(provider.search_by_email("nobody@example.com").await.is_none());

    // 404 is a definitive answer: exactly one request, no retries
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn rate_limit_yields_empty_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/combined/find"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let provider = clearbit_against(&server);
    assert!(provider.search_by_email("joao@techcorp.com").await.is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn server_errors_are_retried_with_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/combined/find"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = clearbit_against(&server);
    assert!(provider.search_by_email("joao@techcorp.com").await.is_none());

    // Initial attempt plus three retries
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn circuit_opens_after_repeated_failures_and_skips_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/combined/find"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = clearbit_against(&server);

    // Each exhausted retry run counts as one circuit failure
    for _ in 0..5 {
        assert!(provider.search_by_email("joao@techcorp.com").await.is_none());
    }
    let after_failures = server.received_requests().await.unwrap().len();
    assert_eq!(after_failures, 20);

    // Circuit is open now: the next call is rejected before any request
    assert!(provider.search_by_email("joao@techcorp.com").await.is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), after_failures);
}

#[tokio::test]
async fn not_found_does_not_trip_the_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/combined/find"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = clearbit_against(&server);
    for _ in 0..10 {
        assert!(provider.search_by_email("nobody@example.com").await.is_none());
    }

    // Every call reached the server: 404s never open the circuit
    assert_eq!(server.received_requests().await.unwrap().len(), 10);
}

#[tokio::test]
async fn duckduckgo_parses_instant_answer_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Results": [
                { "FirstURL": "https://instagram.com/pedro.brito", "Text": "Pedro Brito (@pedro.brito)" },
                { "FirstURL": "https://linkedin.com/in/pedro-brito", "Text": "Pedro Brito - LinkedIn" }
            ]
        })))
        .mount(&server)
        .await;

    let engine = DuckDuckGoDiscovery::with_base_url(server.uri(), fast_retry());
    let hits = engine.search("\"Pedro Brito\" instagram OR linkedin").await;

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, "https://instagram.com/pedro.brito");
}

#[tokio::test]
async fn duckduckgo_failure_degrades_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let engine = DuckDuckGoDiscovery::with_base_url(server.uri(), fast_retry());
    assert!(engine.search("anything").await.is_empty());
}

struct FixedDiscovery {
    hits: Vec<DiscoveryHit>,
}

#[async_trait]
impl DiscoveryEngine for FixedDiscovery {
    async fn search(&self, _query: &str) -> Vec<DiscoveryHit> {
        self.hits.clone()
    }
}

#[tokio::test]
async fn basic_provider_derives_identity_from_email() {
    let discovery = Arc::new(FixedDiscovery {
        hits: vec![
            // Belongs to somebody else: must be filtered out
            DiscoveryHit {
                url: "https://instagram.com/maria.silva".to_string(),
                text: "Maria Silva".to_string(),
            },
            DiscoveryHit {
                url: "https://instagram.com/joao.santos".to_string(),
                text: "Joao Santos".to_string(),
            },
            DiscoveryHit {
                url: "https://linkedin.com/in/joao-santos".to_string(),
                text: "Joao Santos - LinkedIn".to_string(),
            },
        ],
    });

    let provider = BasicProvider::new(discovery);
    let result = provider.search_by_email("joao.santos@techcorp.com").await.unwrap();

    assert_eq!(result.name.as_deref(), Some("Joao Santos"));
    assert_eq!(result.company.as_deref(), Some("Techcorp"));
    assert_eq!(result.instagram.as_deref(), Some("@joao.santos"));
    assert_eq!(
        result.linked_in.as_deref(),
        Some("https://linkedin.com/in/joao-santos")
    );
}

#[tokio::test]
async fn basic_provider_guesses_company_contact_points() {
    let provider = BasicProvider::new(Arc::new(FixedDiscovery { hits: Vec::new() }));
    let results = provider.search_by_company("TechCorp Ltda").await;

    assert_eq!(results.len(), 3);
    assert!(results
        .iter()
        .all(|r| r.company.as_deref() == Some("TechCorp Ltda")));
    assert_eq!(results[0].email.as_deref(), Some("contact@techcorp.com"));
}

#[tokio::test]
async fn hunter_requires_deliverable_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/email-verifier"))
        .and(query_param("email", "joao@techcorp.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "result": "deliverable",
                "email": "joao@techcorp.com",
                "first_name": "Joao",
                "last_name": "Santos"
            }
        })))
        .mount(&server)
        .await;

    let provider = hunter_against(&server);
    let result = provider.search_by_email("joao@techcorp.com").await.unwrap();
    assert_eq!(result.name.as_deref(), Some("Joao Santos"));
    assert_eq!(result.email.as_deref(), Some("joao@techcorp.com"));
}

#[tokio::test]
async fn hunter_rejects_undeliverable_emails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/email-verifier"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "result": "undeliverable",
                "email": "ghost@techcorp.com",
                "first_name": "Ghost",
                "last_name": "User"
            }
        })))
        .mount(&server)
        .await;

    let provider = hunter_against(&server);
    assert!(provider.search_by_email("ghost@techcorp.com").await.is_none());
}

#[tokio::test]
async fn hunter_lists_company_contacts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/domain-search"))
        .and(query_param("company", "TechCorp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "emails": [
                    { "value": "joao@techcorp.com", "first_name": "Joao", "last_name": "Santos" },
                    { "value": "ana@techcorp.com", "first_name": "Ana", "last_name": "Lima" },
                    { "value": "noreply@techcorp.com", "first_name": null, "last_name": null }
                ]
            }
        })))
        .mount(&server)
        .await;

    let provider = hunter_against(&server);
    let results = provider.search_by_company("TechCorp").await;

    // The nameless entry is dropped
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].name.as_deref(), Some("Joao Santos"));
    assert_eq!(results[0].company.as_deref(), Some("TechCorp"));
    assert_eq!(results[1].email.as_deref(), Some("ana@techcorp.com"));
}
