// src/core/mod.rs

//! The scan engine: session state machine, progress sources, classification
//! and aggregation. Nothing in here knows about the terminal.

/// Data structures shared across the engine and the UI.
pub mod models;

pub mod error;

/// Scan configuration checks run before a session is created.
pub mod validation;

/// Attack profiles and the local vulnerability catalog.
pub mod knowledge_base;

pub mod backend;
pub mod classifier;
pub mod aggregator;

/// Simulated and backend-driven progress, plus the display stages.
pub mod progress;

/// Owns scan sessions and their lifecycle.
pub mod orchestrator;

pub mod targets;
pub mod report;
