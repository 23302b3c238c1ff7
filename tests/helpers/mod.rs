#![allow(dead_code)]
//! Shared helpers for the integration tests.

pub mod app;
pub mod fake_source;
pub mod fixtures;
