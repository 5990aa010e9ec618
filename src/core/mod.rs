//! core
//!
//! Core domain types, schemas, and primitives for orgtree.
//!
//! # Modules
//!
//! - [`types`] - Strong types: NodeId, Username, Password, Role
//! - [`node`] - Node records and their on-disk schema
//! - [`graph`] - Org graph over a snapshot of nodes
//! - [`verify`] - Verification of hierarchy invariants
//! - [`ops`] - Data directory and per-node locking
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for the data directory
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - All verification is deterministic

pub mod config;
pub mod graph;
pub mod node;
pub mod ops;
pub mod paths;
pub mod types;
pub mod verify;
