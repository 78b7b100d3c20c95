mod common;

mod forfeit;
mod idempotency;
mod queue_and_move;
mod version_mismatch;
