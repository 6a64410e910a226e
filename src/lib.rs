//! # SoloQ Tracker
//!
//! Read-path aggregation engine for a League esports statistics service.
//! Turns per-account daily rank snapshots into ranked, paginated,
//! delta-annotated leaderboards served over HTTP.
//!
//! ## Architecture
//!
//! - **models**: Core domain vocabulary (tiers, roles, leagues)
//! - **query**: SQL fragment generation, filter allow-listing, period windows,
//!   and the query timeout guard
//! - **cache**: TTL cache-aside layer and deterministic cache key builder
//! - **dashboard**: Leaderboard, top-mover, and history assemblers
//! - **db**: Postgres pool construction
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod query;
