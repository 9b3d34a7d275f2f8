pub mod assembler;
pub mod generator;
pub mod seed;
pub mod types;

pub use assembler::AssemblyOptions;
pub use generator::{default_playlist_name, GeneratorOptions, PlaylistGenerator};
pub use types::*;
