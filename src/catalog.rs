use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// One named reference query from a catalog file.
///
/// `isa` targets are keys of queries this one specializes; `has` targets are
/// keys of sub-features implied by a match. `aliases` lists keys of other
/// records that are alternative spellings of this one and should be merged
/// into it.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRecord {
    pub key: String,
    pub name: String,
    pub query: String,
    pub source: String,
    #[serde(default)]
    pub isa: Vec<String>,
    #[serde(default)]
    pub has: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read catalog file: {e}"),
            Self::Json(e) => write!(f, "failed to parse catalog file: {e}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Reads a catalog file: a JSON array of records.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<CatalogRecord>, CatalogError> {
    let text = fs::read_to_string(path)?;
    let records = serde_json::from_str(&text)?;
    Ok(records)
}
