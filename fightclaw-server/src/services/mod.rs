pub mod elo;
pub mod idempotency;
pub mod sse;
