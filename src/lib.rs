//! Token estimation and LLM API cost comparison.
//!
//! Content units from an extractor are estimated per unit ([`estimate`]),
//! folded into per-file totals, priced against a versioned registry
//! ([`pricing`]) and ranked by projected cost ([`compare`]). [`analysis`]
//! runs the whole pipeline for one request.

pub mod analysis;
pub mod compare;
pub mod config;
pub mod content;
pub mod error;
pub mod estimate;
pub mod extract;
pub mod formatter;
pub mod pricing;
pub mod strategy;
pub mod tiling;
pub mod tokenizer;
