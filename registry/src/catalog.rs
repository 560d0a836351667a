//! The embedded plugin catalog.
//!
//! The catalog is a curated directory of known plugins shipped inside the
//! binary at compile time, so `costforge plugin install aws` works with no
//! network access until the actual download step. It is decoded once and
//! cached for the process lifetime.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

const CATALOG_JSON: &str = include_str!("../assets/catalog.json");
const ALLOWED_SECURITY_LEVELS: &[&str] = &["official", "community", "experimental"];

/// Optional hints for resolving a release asset's filename.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AssetHints {
    /// Overrides the plugin name used to build candidate asset filenames.
    #[serde(default)]
    pub asset_prefix: Option<String>,
    /// A region suffix token some plugins bake into their asset names.
    #[serde(default)]
    pub default_region: Option<String>,
    /// Whether the asset filename's version token includes a leading `v`.
    #[serde(default)]
    pub version_prefix: bool,
}

/// A single catalog entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub repository: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub supported_providers: HashSet<String>,
    #[serde(default)]
    pub capabilities: HashSet<String>,
    #[serde(default)]
    pub security_level: String,
    #[serde(default)]
    pub min_spec_version: String,
    #[serde(default)]
    pub asset_hints: Option<AssetHints>,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[allow(dead_code)]
    schema_version: String,
    plugins: HashMap<String, CatalogEntry>,
}

/// Validate a catalog entry against the invariants every entry must satisfy.
pub fn validate_entry(entry: &CatalogEntry) -> Result<()> {
    if entry.name.trim().is_empty() {
        return Err(RegistryError::InvalidCatalogEntry {
            name: entry.name.clone(),
            reason: "name must not be empty".to_string(),
        });
    }
    if entry.repository.trim().is_empty() {
        return Err(RegistryError::InvalidCatalogEntry {
            name: entry.name.clone(),
            reason: "repository must not be empty".to_string(),
        });
    }
    let parts: Vec<&str> = entry.repository.split('/').collect();
    if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
        return Err(RegistryError::InvalidCatalogEntry {
            name: entry.name.clone(),
            reason: format!("repository '{}' must match owner/repo", entry.repository),
        });
    }
    if !entry.security_level.is_empty() && !ALLOWED_SECURITY_LEVELS.contains(&entry.security_level.as_str()) {
        return Err(RegistryError::InvalidCatalogEntry {
            name: entry.name.clone(),
            reason: format!(
                "security_level '{}' must be one of {:?}",
                entry.security_level, ALLOWED_SECURITY_LEVELS
            ),
        });
    }
    Ok(())
}

fn decode_catalog() -> HashMap<String, CatalogEntry> {
    let raw: RawCatalog =
        serde_json::from_str(CATALOG_JSON).expect("embedded catalog.json must be valid JSON");
    raw.plugins
}

fn catalog() -> &'static HashMap<String, CatalogEntry> {
    static CATALOG: OnceLock<HashMap<String, CatalogEntry>> = OnceLock::new();
    CATALOG.get_or_init(decode_catalog)
}

/// Look up a catalog entry by name.
pub fn get(name: &str) -> Result<&'static CatalogEntry> {
    catalog()
        .get(name)
        .ok_or_else(|| RegistryError::NotInCatalog {
            name: name.to_string(),
        })
}

/// All plugin names the catalog knows about.
pub fn list_names() -> Vec<&'static str> {
    catalog().keys().map(String::as_str).collect()
}

/// All catalog entries.
pub fn list_entries() -> Vec<&'static CatalogEntry> {
    catalog().values().collect()
}
