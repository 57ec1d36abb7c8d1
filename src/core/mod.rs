//! Core types shared by every stage: configuration and errors

pub mod config;
pub mod error;
