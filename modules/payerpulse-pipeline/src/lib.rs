pub mod assemble;
pub mod extract;
pub mod influence;
pub mod normalize;
pub mod reader;
pub mod runner;
pub mod sentiment;
pub mod testing;

pub use assemble::Assembler;
pub use reader::RawStoreReader;
pub use runner::{BatchReport, PipelineRunner};
