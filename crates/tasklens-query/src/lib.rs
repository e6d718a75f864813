pub mod engine;
pub mod expansion;
pub mod filter;
pub mod parser;
pub mod quality;
pub mod scoring;
pub mod semantic;
pub mod sort;
pub mod timectx;
pub mod tokenize;

pub use engine::{QueryOptions, QueryResponse, run_query};
