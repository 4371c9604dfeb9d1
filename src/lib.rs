//! Batch image enhancement through the Gemini Batch API
//!
//! Inputs are uploaded concurrently and submitted as one batch job. Finished
//! jobs are retrieved by streaming the response file to disk under a
//! crash-recovery marker and extracting images one record at a time.

pub mod app_state;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod services;
