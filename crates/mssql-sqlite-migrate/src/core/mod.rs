//! Core types shared by every stage of the pipeline.
//!
//! - [`schema`]: table, column, and foreign key descriptors
//! - [`value`]: cell values read from the source
//! - [`identifier`]: identifier validation and quoting for both engines

pub mod identifier;
pub mod schema;
pub mod value;

pub use schema::{Column, ForeignKey, QualifiedName, Table};
pub use value::SqlValue;
