//! DCIM Core — domain models, error taxonomy, delete-policy table and
//! repository trait definitions for the data-center inventory tracker.
//!
//! This crate has no database dependency. Everything that can be
//! expressed without storage (entity structs, the cascade policy
//! relationship table, pagination/sort normalization) lives and is
//! tested here.

pub mod error;
pub mod models;
pub mod policy;
pub mod query;
pub mod repository;
