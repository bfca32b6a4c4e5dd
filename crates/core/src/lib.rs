//! Core domain types and storage trait surface for the algoprep platform.
//!
//! This crate is intentionally free of any storage SDK: the HTTP layer and the
//! background task runner depend on the traits defined in [`storage`], while
//! `algoprep_storage` provides the single-table DynamoDB implementation.

pub mod model;
pub mod storage;
