//! Search use case: validation, cache lookups, aggregation and the
//! translation of all outcomes into the wire-level response envelope.
//!
//! Everything past syntactic request validation is expressed as a
//! `SearchResponse`; provider trouble never becomes an HTTP error.

use crate::aggregator::PersonSearchService;
use crate::errors::AppError;
use crate::models::{is_valid_email, SearchData, SearchRequest, SearchResponse};
use crate::store::{is_fresh, SearchCache};
use chrono::Utc;
use metrics::counter;

pub struct SearchUseCase {
    service: PersonSearchService,
    cache: SearchCache,
}

impl SearchUseCase {
    pub fn new(service: PersonSearchService, cache: SearchCache) -> Self {
        Self { service, cache }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.service.provider_names()
    }

    pub async fn execute(&self, request: &SearchRequest) -> SearchResponse {
        let query = request.query.trim();
        if query.is_empty() {
            counter!("search_requests_invalid").increment(1);
            return SearchResponse::failure("search query is required");
        }

        let response = match request.search_type.as_str() {
            "email" => self.search_email(query).await,
            "company" => self.search_company(query).await,
            _ => {
                counter!("search_requests_invalid").increment(1);
                return SearchResponse::failure(
                    "search type must be \"email\" or \"company\"",
                );
            }
        };

        if response.success {
            counter!("search_requests_successful").increment(1);
        } else {
            counter!("search_requests_failed").increment(1);
        }
        response
    }

    async fn search_email(&self, query: &str) -> SearchResponse {
        // Validation happens before the cache is consulted, so malformed
        // input can never be served a cached result.
        if !is_valid_email(query) {
            return SearchResponse::failure(format!("invalid email format: {}", query));
        }

        let key = SearchCache::email_key(query);
        if let Some(record) = self.cache.get_person(&key).await {
            if is_fresh(record.updated_at, Utc::now()) {
                counter!("search_cache_hits").increment(1);
                tracing::info!("Serving email search from cache");
                return SearchResponse::found(SearchData::Person(record), true);
            }
            tracing::debug!("Cached email result is stale, re-aggregating");
        }
        counter!("search_cache_misses").increment(1);

        match self.service.search_by_email(query).await {
            Ok(Some(record)) => {
                self.cache.put_person(key, record.clone()).await;
                SearchResponse::found(SearchData::Person(record), false)
            }
            Ok(None) => SearchResponse::failure("no information found for this email"),
            Err(AppError::BadRequest(msg)) => SearchResponse::failure(msg),
            Err(e) => {
                tracing::error!("email search failed: {}", e);
                SearchResponse::failure("search failed, please try again later")
            }
        }
    }

    async fn search_company(&self, query: &str) -> SearchResponse {
        let key = SearchCache::company_key(query);
        if let Some(cached) = self.cache.get_company(&key).await {
            if is_fresh(cached.updated_at, Utc::now()) {
                counter!("search_cache_hits").increment(1);
                tracing::info!("Serving company search from cache");
                return SearchResponse::found(SearchData::Persons(cached.persons), true);
            }
            tracing::debug!("Cached company result is stale, re-aggregating");
        }
        counter!("search_cache_misses").increment(1);

        match self.service.search_by_company(query).await {
            Ok(persons) if persons.is_empty() => {
                SearchResponse::failure("no contacts found for this company")
            }
            Ok(persons) => {
                self.cache.put_company(key, persons.clone()).await;
                SearchResponse::found(SearchData::Persons(persons), false)
            }
            Err(AppError::BadRequest(msg)) => SearchResponse::failure(msg),
            Err(e) => {
                tracing::error!("company search failed: {}", e);
                SearchResponse::failure("search failed, please try again later")
            }
        }
    }
}
