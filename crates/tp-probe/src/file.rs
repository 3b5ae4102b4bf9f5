//! A probe whose target is a topology file on disk.
//!
//! The target identifier credential names the file; discovery parses it
//! and runs the two-pass graph build. The supply chain covers the full
//! hypervisor stack the file format can describe, from applications at
//! the top down to disk arrays.

use std::path::Path;

use tracing::info;

use crate::probe::Probe;
use tp_common::account::{self, AccountDefinitionEntry, AccountValues};
use tp_common::response::{DiscoveryResponse, ProbeError, ValidationResponse};
use tp_topology::{
    build_topology, load_topology_from_path, CommodityKind, Entity, EntityKind, ProviderLink,
    SupplyChainTemplate, FALLBACK_KEY,
};

/// See [module docs](self).
#[derive(Debug, Default, Clone, Copy)]
pub struct FileProbe;

impl FileProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Probe for FileProbe {
    fn name(&self) -> &'static str {
        "file"
    }

    fn account_definition(&self) -> Vec<AccountDefinitionEntry> {
        vec![AccountDefinitionEntry::mandatory(
            account::TARGET_IDENTIFIER,
            "Name",
            "path of the topology file to parse",
        )]
    }

    fn supply_chain(&self) -> Vec<SupplyChainTemplate> {
        let key = FALLBACK_KEY;
        vec![
            SupplyChainTemplate::builder(EntityKind::Application)
                .buys(ProviderLink::hosting(
                    EntityKind::VirtualMachine,
                    vec![
                        CommodityKind::Vcpu,
                        CommodityKind::Vmem,
                        CommodityKind::Application,
                    ],
                ))
                .build(),
            SupplyChainTemplate::builder(EntityKind::VirtualMachine)
                .selling(CommodityKind::Vcpu)
                .selling(CommodityKind::Vmem)
                .selling_keyed(CommodityKind::Application, key)
                .buys(ProviderLink::hosting(
                    EntityKind::PhysicalMachine,
                    vec![CommodityKind::Cpu, CommodityKind::Mem],
                ))
                .buys(ProviderLink::layered_over(
                    EntityKind::Storage,
                    vec![
                        CommodityKind::StorageAmount,
                        CommodityKind::StorageProvisioned,
                    ],
                ))
                .build(),
            SupplyChainTemplate::builder(EntityKind::PhysicalMachine)
                .selling(CommodityKind::Cpu)
                .selling(CommodityKind::Mem)
                .selling(CommodityKind::IoThroughput)
                .selling(CommodityKind::NetThroughput)
                .selling(CommodityKind::Q1Vcpu)
                .selling_keyed(CommodityKind::Datastore, key)
                .selling_keyed(CommodityKind::DataCenter, key)
                .selling_keyed(CommodityKind::Cluster, key)
                .buys(ProviderLink::hosting(
                    EntityKind::DataCenter,
                    vec![
                        CommodityKind::Power,
                        CommodityKind::Space,
                        CommodityKind::Cooling,
                    ],
                ))
                .buys(ProviderLink::layered_over(
                    EntityKind::Storage,
                    vec![
                        CommodityKind::StorageAccess,
                        CommodityKind::StorageLatency,
                    ],
                ))
                .build(),
            SupplyChainTemplate::builder(EntityKind::DataCenter)
                .selling(CommodityKind::Space)
                .selling(CommodityKind::Power)
                .selling(CommodityKind::Cooling)
                .build(),
            SupplyChainTemplate::builder(EntityKind::Network).build(),
            SupplyChainTemplate::builder(EntityKind::DistributedVirtualPortgroup).build(),
            SupplyChainTemplate::builder(EntityKind::Storage)
                .selling(CommodityKind::StorageAmount)
                .selling(CommodityKind::StorageAccess)
                .selling(CommodityKind::StorageProvisioned)
                .selling(CommodityKind::StorageLatency)
                .buys(ProviderLink::hosting(
                    EntityKind::DiskArray,
                    vec![
                        CommodityKind::StorageAccess,
                        CommodityKind::StorageLatency,
                    ],
                ))
                .build(),
            SupplyChainTemplate::builder(EntityKind::DiskArray)
                .selling(CommodityKind::StorageAccess)
                .selling(CommodityKind::StorageLatency)
                .selling_keyed(CommodityKind::Extent, key)
                .build(),
        ]
    }

    fn discover(&self, values: &AccountValues) -> DiscoveryResponse<Entity> {
        let path = match account::require_field(values, account::TARGET_IDENTIFIER) {
            Ok(path) => path,
            Err(err) => return DiscoveryResponse::failed(err.to_string()),
        };
        info!(path, "discovering topology file target");
        let doc = match load_topology_from_path(Path::new(path)) {
            Ok(doc) => doc,
            Err(err) => return DiscoveryResponse::failed(err.to_string()),
        };
        let report = build_topology(&doc);
        let mut response = DiscoveryResponse::with_entities(report.entities);
        if report.dropped_references > 0 {
            response.errors.push(ProbeError::warning(format!(
                "{} bought commodity entries referenced providers outside the graph",
                report.dropped_references
            )));
        }
        response
    }

    fn validate(&self, values: &AccountValues) -> ValidationResponse {
        let path = match account::require_field(values, account::TARGET_IDENTIFIER) {
            Ok(path) => path,
            Err(err) => return ValidationResponse::failed(err.to_string()),
        };
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                ValidationResponse::ok(format!("topology file {path} is readable"))
            }
            Ok(_) => ValidationResponse::failed(format!("{path} is not a file")),
            Err(err) => ValidationResponse::failed(format!("cannot read {path}: {err}")),
        }
    }
}
