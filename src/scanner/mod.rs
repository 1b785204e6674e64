//! Corruption scanner: artifact model, validators, parallel scan engine, cleanup.

pub mod archive;
pub mod artifact;
pub mod cleanup;
pub mod content;
pub mod engine;
