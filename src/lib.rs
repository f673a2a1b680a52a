pub mod api;
pub mod cli;
pub mod config;
pub mod data_models;
pub mod error;
pub mod extractor;
pub mod gemini;
pub mod query_parser;
pub mod report;
pub mod session;
pub mod state;
