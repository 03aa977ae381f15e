#![doc = "pkg-catalog-core: core logic library for pkg-catalog."]

//! This crate holds the discovery and aggregation pipeline behind the published package catalog:
//! a registry of tools, a walker over the bucket namespace, a reducer over per-build metadata,
//! the catalog assembler and the markdown renderer for the documentation pages.
//!
//! Transport lives behind the [`contract::ObjectStore`] trait; concrete backends are provided by
//! the CLI crate.

pub mod catalog;
pub mod config;
pub mod contract;
pub mod error;
pub mod reducer;
pub mod registry;
pub mod render;
pub mod walker;
