//! Utility and rent bill generation for multi-unit rental properties.

pub mod billing;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
