//! Trader Load Harness
//!
//! Simulates many independent traders against a remote matching server.
//! Each trader connects, registers, submits randomized limit orders at a
//! fixed interval for a bounded window and disconnects. The orchestrator
//! keeps a bounded number of sessions active and folds their outcomes into
//! an order-independent report.
//!
//! # Modules
//! - `codec`: Line protocol encoders and the registration ack check
//! - `catalog`: Tradable symbols and reference prices
//! - `generator`: Seeded random order generation
//! - `transport`: Connector abstraction and TCP implementation
//! - `session`: Per-trader session worker and its state machine
//! - `orchestrator`: Bounded-concurrency dispatch and outcome collection
//! - `metrics`: Round-trip latency histogram
//! - `report`: Outcome fold and summary rendering
//! - `export`: JSON export of a run
//! - `script`: Scripted single-trader submission
//! - `config`: TOML configuration with CLI overrides

pub mod codec;
pub mod catalog;
pub mod generator;
pub mod transport;
pub mod session;
pub mod orchestrator;
pub mod metrics;
pub mod report;
pub mod export;
pub mod script;
pub mod config;

/// Crate version constant
pub const VERSION: &str = "1.0.0";
