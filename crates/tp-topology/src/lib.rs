//! Entity/commodity data model and topology graph construction.
//!
//! A discovery scan turns a raw topology source (a parsed topology file or
//! live property tables) into a closed buyer/seller graph: entities selling
//! commodities and buying commodities from specific providers. Supply-chain
//! templates declare, per entity kind, what is sold and bought from whom.

pub mod builder;
pub mod entity;
pub mod source;
pub mod supply_chain;

pub use builder::{build_topology, BuildReport};
pub use entity::{Commodity, CommodityKind, Entity, EntityBuilder, EntityKind, FALLBACK_KEY};
pub use source::{
    load_topology_from_path, parse_topology_str, SourceFormat, TopologyError, TopologyFile,
};
pub use supply_chain::{
    ExternalLink, ProviderKind, ProviderLink, SupplyChainTemplate, TemplateBuilder,
};
