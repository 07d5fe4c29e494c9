//! dep-judge library — grading language-model dependency reasoning against
//! static-analysis ground truth.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod errors;
