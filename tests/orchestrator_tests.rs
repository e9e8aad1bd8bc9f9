use async_trait::async_trait;
use chrono::{Duration, Utc};
use person_finder_api::aggregator::PersonSearchService;
use person_finder_api::models::{PartialPersonData, PersonRecord, SearchData, SearchRequest};
use person_finder_api::orchestrator::SearchUseCase;
use person_finder_api::providers::SearchProvider;
use person_finder_api::store::SearchCache;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

struct CountingProvider {
    calls: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SearchProvider for CountingProvider {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn search_by_email(&self, email: &str) -> Option<PartialPersonData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(PartialPersonData {
            name: Some("Joao Santos".to_string()),
            email: Some(email.to_string()),
            company: Some("TechCorp".to_string()),
            ..Default::default()
        })
    }

    async fn search_by_company(&self, company_name: &str) -> Vec<PartialPersonData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        vec![PartialPersonData {
            name: Some("Joao Santos".to_string()),
            email: Some("joao@techcorp.com".to_string()),
            company: Some(company_name.to_string()),
            ..Default::default()
        }]
    }

    async fn search_by_name(&self, _name: &str) -> Vec<PartialPersonData> {
        Vec::new()
    }
}

fn request(query: &str, search_type: &str) -> SearchRequest {
    SearchRequest {
        query: query.to_string(),
        search_type: search_type.to_string(),
    }
}

fn use_case_with(provider: Arc<CountingProvider>, cache: SearchCache) -> SearchUseCase {
    let providers: Vec<Arc<dyn SearchProvider>> = vec![provider];
    SearchUseCase::new(PersonSearchService::new(providers), cache)
}

#[tokio::test]
async fn repeated_email_search_is_served_from_cache() {
    let provider = CountingProvider::new();
    let probe = Arc::clone(&provider);
    let use_case = use_case_with(provider, SearchCache::new());

    let first = use_case
        .execute(&request("joao@techcorp.com", "email"))
        .await;
    assert!(first.success);
    assert_eq!(first.cached, Some(false));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

    let second = use_case
        .execute(&request("joao@techcorp.com", "email"))
        .await;
    assert!(second.success);
    assert_eq!(second.cached, Some(true));
    // Cache hit: the provider was not consulted again
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

    match (first.data, second.data) {
        (Some(SearchData::Person(a)), Some(SearchData::Person(b))) => {
            assert_eq!(a.id, b.id);
            assert_eq!(a.name, b.name);
        }
        _ => panic!("expected person results"),
    }
}

#[tokio::test]
async fn cache_keys_are_case_insensitive() {
    let provider = CountingProvider::new();
    let probe = Arc::clone(&provider);
    let use_case = use_case_with(provider, SearchCache::new());

    use_case
        .execute(&request("joao@techcorp.com", "email"))
        .await;
    let second = use_case
        .execute(&request("  JOAO@TechCorp.COM ", "email"))
        .await;

    assert_eq!(second.cached, Some(true));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_cached_record_triggers_reaggregation() {
    let provider = CountingProvider::new();
    let probe = Arc::clone(&provider);
    let cache = SearchCache::new();
    let use_case = use_case_with(provider, cache.clone());

    let stale = PersonRecord {
        id: Uuid::new_v4(),
        name: "Joao Santos".to_string(),
        email: Some("joao@techcorp.com".to_string()),
        company: None,
        instagram: None,
        whatsapp: None,
        linked_in: None,
        twitter: None,
        phone: None,
        created_at: Utc::now() - Duration::minutes(31),
        updated_at: Utc::now() - Duration::minutes(31),
    };
    cache
        .put_person(SearchCache::email_key("joao@techcorp.com"), stale)
        .await;

    let response = use_case
        .execute(&request("joao@techcorp.com", "email"))
        .await;

    assert!(response.success);
    assert_eq!(response.cached, Some(false));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn company_search_caches_result_lists() {
    let provider = CountingProvider::new();
    let probe = Arc::clone(&provider);
    let use_case = use_case_with(provider, SearchCache::new());

    let first = use_case.execute(&request("TechCorp", "company")).await;
    assert!(first.success);
    assert_eq!(first.cached, Some(false));

    let second = use_case.execute(&request("techcorp", "company")).await;
    assert_eq!(second.cached, Some(true));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

    match second.data {
        Some(SearchData::Persons(persons)) => assert_eq!(persons.len(), 1),
        _ => panic!("expected a person list"),
    }
}

#[tokio::test]
async fn blank_query_fails_without_touching_providers() {
    let provider = CountingProvider::new();
    let probe = Arc::clone(&provider);
    let use_case = use_case_with(provider, SearchCache::new());

    let response = use_case.execute(&request("   ", "email")).await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("search query is required"));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_search_type_fails() {
    let use_case = use_case_with(CountingProvider::new(), SearchCache::new());
    let response = use_case.execute(&request("whatever", "phone")).await;
    assert!(!response.success);
    assert!(response.error.unwrap().contains("email"));
}

#[tokio::test]
async fn malformed_email_fails_without_touching_cache_or_providers() {
    let provider = CountingProvider::new();
    let probe = Arc::clone(&provider);
    let use_case = use_case_with(provider, SearchCache::new());

    let response = use_case.execute(&request("not-an-email", "email")).await;
    assert!(!response.success);
    assert!(response.error.unwrap().contains("invalid email format"));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
}
