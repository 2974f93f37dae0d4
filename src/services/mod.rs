/// Answer ingestion: validation, authoritative scoring, early-conclude trigger.
pub mod answer_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// The phase driver: owns every write to the game state row.
pub mod driver_service;
/// Health check service.
pub mod health_service;
/// Score formula and per-team aggregation.
pub mod scoring;
/// Session bootstrap, joining, and catch-up snapshots.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// In-process client synchronizer (catch-up + subscribe + reducer).
pub mod sync_service;
