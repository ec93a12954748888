//! Repository format parsing.

pub mod maven;
