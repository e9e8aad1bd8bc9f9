//! Person Finder API Library
//!
//! This library provides the core functionality for the Person Finder API:
//! resilient aggregation of identity and contact information from multiple
//! external data sources, heuristic identity matching, and cache-aware
//! orchestration.
//!
//! # Modules
//!
//! - `aggregator`: Concurrent fan-out over providers and result merging.
//! - `circuit_breaker`: Per-provider circuit breaker construction.
//! - `config`: Configuration management.
//! - `discovery`: Pluggable search-engine discovery capability.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `matching`: Heuristic identity matching engine.
//! - `models`: Core data models and validation.
//! - `orchestrator`: Cache-aware search use case.
//! - `providers`: External search provider adapters.
//! - `store`: Keyed result cache.

pub mod aggregator;
pub mod circuit_breaker;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod handlers;
pub mod matching;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod store;
