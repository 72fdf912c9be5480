pub mod backfill;
pub mod processor;
