//! Parsing for the strings users type to identify a plugin to install or
//! update: either a catalog name or a direct `host/owner/repo` reference,
//! each with an optional `@version` suffix.

use crate::error::{RegistryError, Result};

const SUPPORTED_HOST: &str = "github.com";
const PLUGIN_NAME_PREFIX: &str = "costforge-plugin-";

/// A parsed install/update target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSpecifier {
    pub name: String,
    pub version: String,
    pub is_url: bool,
    pub owner: Option<String>,
    pub repo: Option<String>,
}

/// Parse a specifier string.
///
/// Accepts `name`, `name@version`, `github.com/owner/repo`, and
/// `github.com/owner/repo@version`.
pub fn parse(input: &str) -> Result<PluginSpecifier> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::InvalidSpecifier {
            input: input.to_string(),
            reason: "specifier must not be empty".to_string(),
        });
    }

    let (body, version) = match trimmed.split_once('@') {
        Some((b, v)) => (b, v.trim()),
        None => (trimmed, ""),
    };

    if body.contains('/') {
        parse_url(body, version, input)
    } else {
        Ok(PluginSpecifier {
            name: body.to_string(),
            version: version.to_string(),
            is_url: false,
            owner: None,
            repo: None,
        })
    }
}

fn parse_url(body: &str, version: &str, original: &str) -> Result<PluginSpecifier> {
    let parts: Vec<&str> = body.split('/').collect();
    if parts.len() != 3 {
        return Err(RegistryError::InvalidSpecifier {
            input: original.to_string(),
            reason: "expected host/owner/repo".to_string(),
        });
    }
    let (host, owner, repo) = (parts[0], parts[1], parts[2]);
    if host != SUPPORTED_HOST {
        return Err(RegistryError::InvalidSpecifier {
            input: original.to_string(),
            reason: format!("unsupported host '{host}'; only {SUPPORTED_HOST} is recognized"),
        });
    }
    if owner.is_empty() || repo.is_empty() {
        return Err(RegistryError::InvalidSpecifier {
            input: original.to_string(),
            reason: "owner and repo must not be empty".to_string(),
        });
    }

    let name = repo
        .strip_prefix(PLUGIN_NAME_PREFIX)
        .unwrap_or(repo)
        .to_string();

    Ok(PluginSpecifier {
        name,
        version: version.to_string(),
        is_url: true,
        owner: Some(owner.to_string()),
        repo: Some(repo.to_string()),
    })
}
