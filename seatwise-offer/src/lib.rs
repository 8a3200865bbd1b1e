pub mod search;

pub use search::SearchEngine;
