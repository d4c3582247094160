//! Library crate for dirfuzz-rs exposing the fuzzing engine and its collaborators.
pub mod aggregator;
pub mod candidates;
pub mod config;
pub mod error;
pub mod filter;
pub mod output;
pub mod queue;
pub mod recursion;
pub mod scanner;
pub mod types;
pub mod wordlist;
