//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod circuit_breaker;
pub mod clock;
pub mod config_watcher;
pub mod directory;
pub mod gateway;
pub mod gateway_config;
pub mod match_service;
pub mod ports;
pub mod settings;
