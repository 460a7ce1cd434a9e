/// Mosaic assembly state machine
pub mod executor;
/// Tile pool with reuse and diversity bookkeeping
pub mod pool;
/// Candidate ranking and seeded random choice
pub mod selection;
