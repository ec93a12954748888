//! Business logic services.

pub mod dependency_manager;
pub mod event_bus;
pub mod project_service;
pub mod reconciliation;
pub mod refresh_handler;
pub mod refresh_service;
pub mod repository_client;
