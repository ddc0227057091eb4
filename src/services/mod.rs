/// OpenAPI documentation generation.
pub mod documentation;
/// Liveness and storage reachability.
pub mod health_service;
/// Player roster.
pub mod player_service;
/// Ledger versus aggregate validation and repair.
pub mod reconciliation_service;
/// Scoring rules turning a match result into points.
pub mod scoring;
/// Point awarding and reversal.
pub mod seeding_service;
/// Storage connection lifecycle and degraded mode.
pub mod storage_supervisor;
/// Tournament record management.
pub mod tournament_service;
