//! gallery-store - document mapping and blob lifecycle for chat-group galleries
//!
//! This crate persists galleries, their files and registered users with:
//! - A typed field/entity layer over schema-less JSON tables
//! - Swappable table drivers (local JSON files, object storage)
//! - Swappable blob backends (local filesystem, GCS) for file content and
//!   metadata sidecars
//! - Idempotent creation and cascading delete for the gallery aggregates

pub mod config;
pub mod model;
pub mod object_store;
pub mod storage;
#[cfg(test)]
pub mod testutil;
