pub mod ai;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod utils;

pub use matching::chunk::process_chunk;
pub use models::core::{Account, FieldMapping, TargetSystem};
pub use models::stats::ChunkResult;
