pub mod candidates;
pub mod chunk;
pub mod scoring;
pub mod status;
