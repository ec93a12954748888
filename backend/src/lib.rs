//! Depot Backend - Library
//!
//! Metadata backbone of the artifact depot: resolves which versions of a
//! project exist, ingests them version by version, and maintains each
//! version's transitive dependency closure.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod formats;
pub mod models;
pub mod services;
pub mod storage;
pub mod telemetry;
pub mod validation;

pub use config::Config;
pub use error::{AppError, Result};
