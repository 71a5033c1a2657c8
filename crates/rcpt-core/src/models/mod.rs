//! Data models for the receipt pipeline.

pub mod config;
pub mod receipt;
