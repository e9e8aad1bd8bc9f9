//! Fan-out aggregation across the registered providers.
//!
//! All providers are queried concurrently and every task is awaited to
//! completion; one provider failing (or panicking) never hides another's
//! results. Merge priority is provider registration order.

use crate::errors::AppError;
use crate::models::{is_valid_email, is_valid_phone, PartialPersonData, PersonRecord};
use crate::providers::SearchProvider;
use std::sync::Arc;

pub struct PersonSearchService {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl PersonSearchService {
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Searches every provider for `email` and merges the partial results
    /// field-by-field, earlier-registered providers winning.
    ///
    /// Returns `Ok(None)` when no provider produced a usable name: a record
    /// without a name is worse than no record.
    pub async fn search_by_email(&self, email: &str) -> Result<Option<PersonRecord>, AppError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AppError::BadRequest(format!(
                "invalid email format: {}",
                email
            )));
        }

        tracing::info!("Aggregating email search across {} providers", self.providers.len());

        let mut handles = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let email = email.to_string();
            handles.push(tokio::spawn(async move {
                provider.search_by_email(&email).await
            }));
        }

        // Await in registration order so merge priority is deterministic
        let mut merged = PartialPersonData::default();
        for handle in handles {
            match handle.await {
                Ok(Some(partial)) => merged.merge_missing_from(&partial),
                Ok(None) => {}
                Err(e) => tracing::warn!("provider task failed: {}", e),
            }
        }

        let name = match merged.name.take() {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                tracing::info!("No provider produced a name for the queried email");
                return Ok(None);
            }
        };

        Self::sanitize(&mut merged);
        if merged.email.is_none() {
            merged.email = Some(email.to_string());
        }

        PersonRecord::create(&name, merged).map(Some)
    }

    /// Searches every provider for people associated with a company and
    /// flattens the results. Candidates without a name, or whose contact
    /// fields fail validation beyond repair, are skipped rather than
    /// failing the batch.
    pub async fn search_by_company(&self, company_name: &str) -> Result<Vec<PersonRecord>, AppError> {
        let company_name = company_name.trim();
        if company_name.is_empty() {
            return Err(AppError::BadRequest(
                "company name is required".to_string(),
            ));
        }

        tracing::info!(
            "Aggregating company search across {} providers",
            self.providers.len()
        );

        let mut handles = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let company = company_name.to_string();
            handles.push(tokio::spawn(async move {
                provider.search_by_company(&company).await
            }));
        }

        let mut persons = Vec::new();
        for handle in handles {
            let partials = match handle.await {
                Ok(partials) => partials,
                Err(e) => {
                    tracing::warn!("provider task failed: {}", e);
                    continue;
                }
            };
            for mut partial in partials {
                let name = match partial.name.take() {
                    Some(name) if !name.trim().is_empty() => name,
                    _ => continue,
                };
                Self::sanitize(&mut partial);
                if partial.company.is_none() {
                    partial.company = Some(company_name.to_string());
                }
                match PersonRecord::create(&name, partial) {
                    Ok(record) => persons.push(record),
                    Err(e) => tracing::warn!("skipping invalid company candidate: {}", e),
                }
            }
        }

        Ok(persons)
    }

    /// Searches every provider by free-form name. Most commercial sources
    /// cannot serve this, so results typically come from discovery alone.
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<PersonRecord>, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".to_string()));
        }

        let mut handles = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let name = name.to_string();
            handles.push(tokio::spawn(
                async move { provider.search_by_name(&name).await },
            ));
        }

        let mut persons = Vec::new();
        for handle in handles {
            let partials = match handle.await {
                Ok(partials) => partials,
                Err(e) => {
                    tracing::warn!("provider task failed: {}", e);
                    continue;
                }
            };
            for mut partial in partials {
                let candidate_name = match partial.name.take() {
                    Some(n) if !n.trim().is_empty() => n,
                    _ => continue,
                };
                Self::sanitize(&mut partial);
                match PersonRecord::create(&candidate_name, partial) {
                    Ok(record) => persons.push(record),
                    Err(e) => tracing::warn!("skipping invalid name candidate: {}", e),
                }
            }
        }

        Ok(persons)
    }

    /// Drops merged fields that would fail record validation. A provider
    /// returning a bad phone number must not sink an otherwise good result.
    fn sanitize(data: &mut PartialPersonData) {
        if let Some(email) = data.email.as_deref() {
            if !is_valid_email(email) {
                tracing::warn!("dropping invalid merged email: {}", email);
                data.email = None;
            }
        }
        if let Some(phone) = data.phone.as_deref() {
            if !is_valid_phone(phone) {
                tracing::warn!("dropping invalid merged phone: {}", phone);
                data.phone = None;
            }
        }
    }
}
