//! Entities and the commodities they exchange.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Default capacity applied to keyed commodities with no explicit value.
pub const KEYED_DEFAULT_CAPACITY: f64 = 100.0;
/// Default used value applied to keyed commodities with no explicit value.
pub const KEYED_DEFAULT_USED: f64 = 1.0;
/// Key synthesized for keyed commodities that arrive without one.
pub const FALLBACK_KEY: &str = "foo";

/// Kinds of entities a probe can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Application,
    VirtualMachine,
    PhysicalMachine,
    DataCenter,
    Storage,
    DiskArray,
    StorageController,
    Network,
    DistributedVirtualPortgroup,
    ActionManager,
    Unknown,
}

impl EntityKind {
    /// Resolve a source type string to a kind.
    ///
    /// Unresolved names map to [`EntityKind::Unknown`]; resolution is never
    /// an error.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Application" => Self::Application,
            "VirtualMachine" => Self::VirtualMachine,
            "PhysicalMachine" => Self::PhysicalMachine,
            "DataCenter" => Self::DataCenter,
            "Storage" => Self::Storage,
            "DiskArray" => Self::DiskArray,
            "StorageController" => Self::StorageController,
            "Network" => Self::Network,
            "DistributedVirtualPortgroup" => Self::DistributedVirtualPortgroup,
            "ActionManager" => Self::ActionManager,
            _ => Self::Unknown,
        }
    }

    /// The canonical name used in topology sources.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Application => "Application",
            Self::VirtualMachine => "VirtualMachine",
            Self::PhysicalMachine => "PhysicalMachine",
            Self::DataCenter => "DataCenter",
            Self::Storage => "Storage",
            Self::DiskArray => "DiskArray",
            Self::StorageController => "StorageController",
            Self::Network => "Network",
            Self::DistributedVirtualPortgroup => "DistributedVirtualPortgroup",
            Self::ActionManager => "ActionManager",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Kinds of commodities exchanged between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommodityKind {
    Cpu,
    Mem,
    Vcpu,
    Vmem,
    StorageAmount,
    StorageAccess,
    StorageProvisioned,
    StorageLatency,
    Extent,
    Space,
    Power,
    Cooling,
    IoThroughput,
    NetThroughput,
    Q1Vcpu,
    StorageCluster,
    Datastore,
    DspmAccess,
    Cluster,
    Network,
    DataCenter,
    Application,
    Unknown,
}

impl CommodityKind {
    /// Resolve a source type string to a kind; unresolved names map to
    /// [`CommodityKind::Unknown`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "CPU" => Self::Cpu,
            "Mem" => Self::Mem,
            "VCPU" => Self::Vcpu,
            "VMem" => Self::Vmem,
            "StorageAmount" => Self::StorageAmount,
            "StorageAccess" => Self::StorageAccess,
            "StorageProvisioned" => Self::StorageProvisioned,
            "StorageLatency" => Self::StorageLatency,
            "Extent" => Self::Extent,
            "Space" => Self::Space,
            "Power" => Self::Power,
            "Cooling" => Self::Cooling,
            "IOThroughput" => Self::IoThroughput,
            "NetThroughput" => Self::NetThroughput,
            "Q1VCPU" => Self::Q1Vcpu,
            "StorageClusterCommodity" => Self::StorageCluster,
            "DatastoreCommodity" => Self::Datastore,
            "DSPMAccessCommodity" => Self::DspmAccess,
            "ClusterCommodity" => Self::Cluster,
            "NetworkCommodity" => Self::Network,
            "DataCenterCommodity" => Self::DataCenter,
            "ApplicationCommodity" => Self::Application,
            _ => Self::Unknown,
        }
    }

    /// The canonical name used in topology sources.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Mem => "Mem",
            Self::Vcpu => "VCPU",
            Self::Vmem => "VMem",
            Self::StorageAmount => "StorageAmount",
            Self::StorageAccess => "StorageAccess",
            Self::StorageProvisioned => "StorageProvisioned",
            Self::StorageLatency => "StorageLatency",
            Self::Extent => "Extent",
            Self::Space => "Space",
            Self::Power => "Power",
            Self::Cooling => "Cooling",
            Self::IoThroughput => "IOThroughput",
            Self::NetThroughput => "NetThroughput",
            Self::Q1Vcpu => "Q1VCPU",
            Self::StorageCluster => "StorageClusterCommodity",
            Self::Datastore => "DatastoreCommodity",
            Self::DspmAccess => "DSPMAccessCommodity",
            Self::Cluster => "ClusterCommodity",
            Self::Network => "NetworkCommodity",
            Self::DataCenter => "DataCenterCommodity",
            Self::Application => "ApplicationCommodity",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether commodities of this kind require a non-empty key.
    pub fn requires_key(&self) -> bool {
        matches!(
            self,
            Self::StorageCluster
                | Self::Datastore
                | Self::DspmAccess
                | Self::Extent
                | Self::Cluster
                | Self::Network
                | Self::DataCenter
                | Self::Application
        )
    }
}

impl std::fmt::Display for CommodityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// A measured resource sold or bought by an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commodity {
    pub kind: CommodityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub used: f64,
    #[serde(default)]
    pub capacity: f64,
}

impl Commodity {
    /// A commodity with no key and zero used/capacity.
    pub fn new(kind: CommodityKind) -> Self {
        Self {
            kind,
            key: None,
            used: 0.0,
            capacity: 0.0,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_used(mut self, used: f64) -> Self {
        self.used = used;
        self
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Build a commodity from raw source attributes, applying the keyed-kind
    /// fallbacks: a missing key on a keyed kind is synthesized, missing
    /// numerics default to 100/1 for keyed kinds and stay zero otherwise.
    pub fn from_attributes(
        kind: CommodityKind,
        key: Option<&str>,
        used: Option<f64>,
        capacity: Option<f64>,
    ) -> Self {
        let keyed = kind.requires_key();
        let key = match key {
            Some(k) if !k.is_empty() => Some(k.to_string()),
            _ if keyed => Some(FALLBACK_KEY.to_string()),
            _ => None,
        };
        let capacity = capacity.unwrap_or(if keyed { KEYED_DEFAULT_CAPACITY } else { 0.0 });
        let used = used.unwrap_or(if keyed { KEYED_DEFAULT_USED } else { 0.0 });
        Self {
            kind,
            key,
            used,
            capacity,
        }
    }
}

/// A node in the topology graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique within a discovery scan; stable across scans for an unchanged
    /// resource.
    pub id: String,
    /// Falls back to the source `name` attribute, then to empty. Never absent.
    #[serde(default)]
    pub display_name: String,
    pub kind: EntityKind,
    /// Commodities this entity offers, in source order.
    #[serde(default)]
    pub sold: Vec<Commodity>,
    /// Commodities consumed, grouped by provider entity id.
    #[serde(default)]
    pub bought: BTreeMap<String, Vec<Commodity>>,
    /// Entity ids this entity aggregates.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub consists_of: BTreeSet<String>,
    /// Entity ids this entity is layered over.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub underlying: BTreeSet<String>,
}

impl Entity {
    pub fn builder(kind: EntityKind, id: impl Into<String>) -> EntityBuilder {
        EntityBuilder::new(kind, id)
    }

    /// Provider entity ids referenced by this entity's bought map.
    pub fn provider_ids(&self) -> impl Iterator<Item = &str> {
        self.bought.keys().map(String::as_str)
    }
}

/// Builder producing an immutable [`Entity`] with one terminal [`build`].
///
/// [`build`]: EntityBuilder::build
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    entity: Entity,
}

impl EntityBuilder {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            entity: Entity {
                id: id.into(),
                display_name: String::new(),
                kind,
                sold: Vec::new(),
                bought: BTreeMap::new(),
                consists_of: BTreeSet::new(),
                underlying: BTreeSet::new(),
            },
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.entity.display_name = name.into();
        self
    }

    /// Append a sold commodity, preserving insertion order.
    pub fn sells(mut self, commodity: Commodity) -> Self {
        self.entity.sold.push(commodity);
        self
    }

    /// Append a bought commodity under the given provider entity id.
    pub fn buys_from(mut self, provider_id: impl Into<String>, commodity: Commodity) -> Self {
        self.entity
            .bought
            .entry(provider_id.into())
            .or_default()
            .push(commodity);
        self
    }

    pub fn consists_of(mut self, id: impl Into<String>) -> Self {
        self.entity.consists_of.insert(id.into());
        self
    }

    pub fn layered_over(mut self, id: impl Into<String>) -> Self {
        self.entity.underlying.insert(id.into());
        self
    }

    pub fn build(self) -> Entity {
        self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_lookup_strips_nothing_and_defaults_to_unknown() {
        assert_eq!(
            EntityKind::from_name("PhysicalMachine"),
            EntityKind::PhysicalMachine
        );
        assert_eq!(EntityKind::from_name("FloppyDrive"), EntityKind::Unknown);
        assert_eq!(CommodityKind::from_name("Q1VCPU"), CommodityKind::Q1Vcpu);
        assert_eq!(CommodityKind::from_name("Bogus"), CommodityKind::Unknown);
    }

    #[test]
    fn canonical_names_round_trip() {
        for kind in [
            EntityKind::Application,
            EntityKind::VirtualMachine,
            EntityKind::DistributedVirtualPortgroup,
            EntityKind::ActionManager,
        ] {
            assert_eq!(EntityKind::from_name(kind.canonical_name()), kind);
        }
        for kind in [
            CommodityKind::Cpu,
            CommodityKind::DspmAccess,
            CommodityKind::Application,
            CommodityKind::NetThroughput,
        ] {
            assert_eq!(CommodityKind::from_name(kind.canonical_name()), kind);
        }
    }

    #[test]
    fn keyed_kind_synthesizes_key_and_defaults() {
        let commodity =
            Commodity::from_attributes(CommodityKind::Cluster, None, None, None);
        assert_eq!(commodity.key.as_deref(), Some(FALLBACK_KEY));
        assert_eq!(commodity.capacity, KEYED_DEFAULT_CAPACITY);
        assert_eq!(commodity.used, KEYED_DEFAULT_USED);
    }

    #[test]
    fn keyed_kind_keeps_explicit_values() {
        let commodity = Commodity::from_attributes(
            CommodityKind::Datastore,
            Some("ds-7"),
            Some(42.0),
            Some(512.0),
        );
        assert_eq!(commodity.key.as_deref(), Some("ds-7"));
        assert_eq!(commodity.used, 42.0);
        assert_eq!(commodity.capacity, 512.0);
    }

    #[test]
    fn unkeyed_kind_leaves_absent_numerics_at_zero() {
        let commodity = Commodity::from_attributes(CommodityKind::Cpu, None, None, None);
        assert_eq!(commodity.key, None);
        assert_eq!(commodity.used, 0.0);
        assert_eq!(commodity.capacity, 0.0);
    }

    #[test]
    fn empty_key_on_keyed_kind_is_replaced() {
        let commodity =
            Commodity::from_attributes(CommodityKind::Extent, Some(""), None, None);
        assert_eq!(commodity.key.as_deref(), Some(FALLBACK_KEY));
    }

    #[test]
    fn builder_groups_bought_by_provider() {
        let entity = Entity::builder(EntityKind::VirtualMachine, "vm-1")
            .display_name("vm one")
            .sells(Commodity::new(CommodityKind::Vcpu).with_capacity(2600.0))
            .buys_from("pm-1", Commodity::new(CommodityKind::Cpu))
            .buys_from("pm-1", Commodity::new(CommodityKind::Mem))
            .buys_from("st-1", Commodity::new(CommodityKind::StorageAmount))
            .build();
        assert_eq!(entity.bought["pm-1"].len(), 2);
        assert_eq!(entity.bought["st-1"].len(), 1);
        assert_eq!(entity.provider_ids().count(), 2);
    }
}
