//! Domain models.

pub mod artifact;
pub mod coordinate;
pub mod project;
pub mod refresh;
