//! Validated table of connectors keyed by connector key.
//!
//! The catalog is loaded once at startup, either from the embedded built-in
//! definitions or from an external JSON file, and is immutable afterwards.

use crate::connector::{Connector, OperationDef, OperationKind};
use crate::error::CatalogError;
use rootcause::Report;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Connector definitions shipped with the builder.
const BUILTIN_CATALOG: &str = include_str!("../catalog/connectors.json");

/// An immutable, validated set of connectors.
#[derive(Debug, Clone, Default)]
pub struct ConnectorCatalog {
    connectors: Vec<Connector>,
}

impl ConnectorCatalog {
    /// Loads the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded definitions fail validation.
    pub fn builtin() -> Result<Self, Report<CatalogError>> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parses and validates a catalog from a JSON array of connectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the connector schema or
    /// fails validation.
    pub fn from_json(json: &str) -> Result<Self, Report<CatalogError>> {
        let connectors: Vec<Connector> =
            serde_json::from_str(json).map_err(|e| CatalogError::ParseFailed {
                reason: e.to_string(),
            })?;
        Self::from_connectors(connectors)
    }

    /// Reads, parses and validates a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its content is invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Report<CatalogError>> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| CatalogError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Validates connectors and builds a catalog from them.
    ///
    /// # Errors
    ///
    /// Returns an error for empty or duplicate connector, operation or field keys.
    pub fn from_connectors(connectors: Vec<Connector>) -> Result<Self, Report<CatalogError>> {
        let mut seen = HashSet::new();
        for (index, connector) in connectors.iter().enumerate() {
            if connector.key.is_empty() {
                return Err(CatalogError::EmptyConnectorKey { index }.into());
            }
            if !seen.insert(connector.key.as_str()) {
                return Err(CatalogError::DuplicateConnector {
                    key: connector.key.clone(),
                }
                .into());
            }
            validate_operations(connector, OperationKind::Trigger)?;
            validate_operations(connector, OperationKind::Action)?;
        }

        debug!(connectors = connectors.len(), "connector catalog loaded");
        Ok(Self { connectors })
    }

    /// Looks up a connector by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.key == key)
    }

    /// Iterates over connectors in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.iter()
    }

    /// Returns the number of connectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    /// Returns true if the catalog has no connectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

fn validate_operations(
    connector: &Connector,
    kind: OperationKind,
) -> Result<(), Report<CatalogError>> {
    let mut seen = HashSet::new();
    for op in connector.operations(kind) {
        if op.key.is_empty() {
            return Err(CatalogError::EmptyOperationKey {
                connector: connector.key.clone(),
            }
            .into());
        }
        if !seen.insert(op.key.as_str()) {
            return Err(CatalogError::DuplicateOperation {
                connector: connector.key.clone(),
                kind: kind.to_string(),
                key: op.key.clone(),
            }
            .into());
        }
        validate_fields(connector, op)?;
    }
    Ok(())
}

fn validate_fields(connector: &Connector, op: &OperationDef) -> Result<(), Report<CatalogError>> {
    let invalid = |field: &str, reason: &str| CatalogError::InvalidField {
        connector: connector.key.clone(),
        operation: op.key.clone(),
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let mut seen = HashSet::new();
    for field in op.input_fields() {
        if field.key.is_empty() {
            return Err(invalid("", "empty key").into());
        }
        if !seen.insert(field.key.as_str()) {
            return Err(invalid(&field.key, "duplicate input field").into());
        }
    }

    let mut seen = HashSet::new();
    for field in op.output_fields() {
        if field.key.is_empty() {
            return Err(invalid("", "empty key").into());
        }
        if !seen.insert(field.key.as_str()) {
            return Err(invalid(&field.key, "duplicate output field").into());
        }
    }
    Ok(())
}
