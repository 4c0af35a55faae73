/// Product catalog management and seeding.
pub mod catalog_service;
/// Point-of-sale checkout.
pub mod checkout_service;
/// Operations dashboard counters.
pub mod dashboard_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Wristband time balances and the play clock.
pub mod ledger;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
