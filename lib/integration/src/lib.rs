//! Connector catalog for the loanshark workflow builder.
//!
//! This crate provides:
//!
//! - **Connector definitions**: triggers and actions exposed by an integration,
//!   with the input and output field schemas the builder renders
//! - **Catalog**: a keyed, validated table of connectors, loaded from JSON
//!   (either the embedded built-in catalog or an external file)

pub mod catalog;
pub mod connector;
pub mod error;

pub use catalog::ConnectorCatalog;
pub use connector::{
    Connector, ConnectorAuthentication, FieldDef, FieldType, OperationDef, OperationDisplay, OperationKind, OperationSpec,
    OperationType,
};
pub use error::CatalogError;
