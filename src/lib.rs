pub mod api;
pub mod classifier;
pub mod color;
pub mod config;
pub mod data_models;
pub mod error;
pub mod fallback;
pub mod normalizer;
pub mod pipeline;
pub mod query;
pub mod retry;
pub mod rng;
pub mod search;
pub mod upload;
pub mod vision;
