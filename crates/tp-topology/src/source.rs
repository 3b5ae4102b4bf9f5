//! Topology file parsing.
//!
//! A topology document holds one or more markets; only markets flagged as
//! the main market are scanned. Service-entity records carry a namespaced
//! type string, a uuid, optional display names, sold commodities, and
//! bought commodities referencing the provider commodity they consume.
//!
//! Supported formats: TOML, YAML, and JSON, selected by file extension.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Namespace prefixes stripped from type strings before kind resolution.
const TYPE_PREFIXES: [&str; 2] = ["Abstraction:", "Networking:"];

/// Supported topology file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Toml,
    Yaml,
    Json,
}

impl SourceFormat {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to read topology file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported topology format: {extension}")]
    UnsupportedFormat { extension: String },
    #[error("failed to parse {format} topology: {message}")]
    Parse { format: String, message: String },
}

/// A numeric attribute that may arrive as a number or a string.
///
/// Source documents are attribute-oriented, so numerics frequently arrive
/// quoted; a malformed value falls back per-field instead of failing the
/// whole document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// Parse the value, logging and returning `None` when malformed.
    pub fn parse(&self, field: &str, entity: &str) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!(entity, field, value = %s, "malformed numeric attribute, using default");
                    None
                }
            },
        }
    }
}

/// A sold-commodity record.
#[derive(Debug, Clone, Deserialize)]
pub struct SoldRecord {
    #[serde(rename = "type")]
    pub commodity_type: String,
    pub uuid: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub capacity: Option<RawNumber>,
    #[serde(default)]
    pub used: Option<RawNumber>,
}

/// A bought-commodity record; `consumes` references the provider
/// commodity's uuid.
#[derive(Debug, Clone, Deserialize)]
pub struct BoughtRecord {
    #[serde(rename = "type")]
    pub commodity_type: String,
    pub consumes: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub capacity: Option<RawNumber>,
    #[serde(default)]
    pub used: Option<RawNumber>,
}

/// A service-entity record.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityRecord {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub uuid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sold: Vec<SoldRecord>,
    #[serde(default)]
    pub bought: Vec<BoughtRecord>,
}

impl EntityRecord {
    /// Display name falls back to `name`, then to empty. Never absent.
    pub fn resolved_display_name(&self) -> String {
        self.display_name
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }
}

/// One market in the document.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketRecord {
    #[serde(default)]
    pub main_market: bool,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

/// A parsed topology document.
#[derive(Debug, Clone, Deserialize)]
pub struct TopologyFile {
    #[serde(default)]
    pub markets: Vec<MarketRecord>,
}

impl TopologyFile {
    /// Entity records of main markets, in document order.
    pub fn main_market_entities(&self) -> impl Iterator<Item = &EntityRecord> {
        self.markets
            .iter()
            .filter(|m| m.main_market)
            .flat_map(|m| m.entities.iter())
    }
}

/// Strip the namespace prefix from a source type string.
pub fn strip_namespace(type_name: &str) -> &str {
    for prefix in TYPE_PREFIXES {
        if let Some(stripped) = type_name.strip_prefix(prefix) {
            return stripped;
        }
    }
    type_name
}

/// Load a topology document from a file path.
pub fn load_topology_from_path(path: &Path) -> Result<TopologyFile, TopologyError> {
    let content = fs::read_to_string(path).map_err(|source| TopologyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = detect_format(path)?;
    parse_topology_str(&content, format)
}

fn detect_format(path: &Path) -> Result<SourceFormat, TopologyError> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "toml" => Ok(SourceFormat::Toml),
        "yaml" | "yml" => Ok(SourceFormat::Yaml),
        "json" => Ok(SourceFormat::Json),
        _ => Err(TopologyError::UnsupportedFormat { extension: ext }),
    }
}

/// Parse a topology document from a string.
pub fn parse_topology_str(
    content: &str,
    format: SourceFormat,
) -> Result<TopologyFile, TopologyError> {
    match format {
        SourceFormat::Toml => toml::from_str(content).map_err(|e| TopologyError::Parse {
            format: format.as_str().to_string(),
            message: e.to_string(),
        }),
        SourceFormat::Yaml => serde_yaml::from_str(content).map_err(|e| TopologyError::Parse {
            format: format.as_str().to_string(),
            message: e.to_string(),
        }),
        SourceFormat::Json => serde_json::from_str(content).map_err(|e| TopologyError::Parse {
            format: format.as_str().to_string(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml_document() {
        let input = r#"
[[markets]]
main_market = true

[[markets.entities]]
type = "Abstraction:PhysicalMachine"
uuid = "pm-1"
display_name = "host one"

[[markets.entities.sold]]
type = "Abstraction:CPU"
uuid = "comm-cpu-1"
capacity = "2600"
used = 120.5
"#;
        let doc = parse_topology_str(input, SourceFormat::Toml).unwrap();
        let entities: Vec<_> = doc.main_market_entities().collect();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].uuid, "pm-1");
        assert_eq!(entities[0].sold.len(), 1);
        let capacity = entities[0].sold[0]
            .capacity
            .as_ref()
            .and_then(|v| v.parse("capacity", "pm-1"));
        assert_eq!(capacity, Some(2600.0));
    }

    #[test]
    fn parse_yaml_document() {
        let input = r#"
markets:
  - main_market: true
    entities:
      - type: "Abstraction:Storage"
        uuid: st-1
        name: datastore-a
"#;
        let doc = parse_topology_str(input, SourceFormat::Yaml).unwrap();
        let entities: Vec<_> = doc.main_market_entities().collect();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].resolved_display_name(), "datastore-a");
    }

    #[test]
    fn parse_json_document() {
        let input = r#"
{
  "markets": [
    { "main_market": false, "entities": [ { "type": "VirtualMachine", "uuid": "vm-x" } ] },
    { "main_market": true, "entities": [ { "type": "VirtualMachine", "uuid": "vm-1" } ] }
  ]
}
"#;
        let doc = parse_topology_str(input, SourceFormat::Json).unwrap();
        let entities: Vec<_> = doc.main_market_entities().collect();
        assert_eq!(entities.len(), 1, "non-main markets are skipped");
        assert_eq!(entities[0].uuid, "vm-1");
    }

    #[test]
    fn malformed_numeric_parses_to_none() {
        let raw = RawNumber::Text("12x4".to_string());
        assert_eq!(raw.parse("capacity", "pm-1"), None);
        let ok = RawNumber::Text(" 42 ".to_string());
        assert_eq!(ok.parse("capacity", "pm-1"), Some(42.0));
    }

    #[test]
    fn display_name_fallback_chain() {
        let record = EntityRecord {
            entity_type: "Storage".into(),
            uuid: "st-1".into(),
            display_name: Some(String::new()),
            name: Some("fallback".into()),
            sold: vec![],
            bought: vec![],
        };
        assert_eq!(record.resolved_display_name(), "fallback");

        let bare = EntityRecord {
            entity_type: "Storage".into(),
            uuid: "st-2".into(),
            display_name: None,
            name: None,
            sold: vec![],
            bought: vec![],
        };
        assert_eq!(bare.resolved_display_name(), "");
    }

    #[test]
    fn namespace_prefixes_are_stripped() {
        assert_eq!(strip_namespace("Abstraction:PhysicalMachine"), "PhysicalMachine");
        assert_eq!(strip_namespace("Networking:Network"), "Network");
        assert_eq!(strip_namespace("DataCenter"), "DataCenter");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = detect_format(Path::new("topology.xml")).unwrap_err();
        match err {
            TopologyError::UnsupportedFormat { extension } => assert_eq!(extension, "xml"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_topology_from_path(Path::new("/nonexistent/topology.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/topology.toml"));
    }
}
