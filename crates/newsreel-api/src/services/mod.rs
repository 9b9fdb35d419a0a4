pub mod assembler;
pub mod keys;

pub use assembler::{ChunkAssembler, ChunkIntake, ChunkOutcome};
