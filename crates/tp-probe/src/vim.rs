//! A hypervisor probe over property tables fetched from a VIM-style
//! endpoint.
//!
//! The endpoint is abstracted behind [`VimInventory`] so discovery
//! logic is testable against a canned snapshot. Host core frequency is
//! needed to size VM processor capacity, so hosts are indexed in a
//! per-call map while the snapshot is converted; the map never outlives
//! the discovery.

use std::collections::HashMap;

use tracing::info;

use crate::probe::Probe;
use tp_common::account::{self, AccountDefinitionEntry, AccountValues};
use tp_common::response::{DiscoveryResponse, ProbeError, ValidationResponse};
use tp_common::{Error, Result};
use tp_topology::{
    Commodity, CommodityKind, Entity, EntityKind, ProviderLink, SupplyChainTemplate,
};

const DC_ID: &str = "Datacenter-VC-ID";
const DC_DISPLAY_NAME: &str = "Datacenter-VC";

/// One host's property table.
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub name: String,
    pub cpu_mhz: u32,
    pub num_cpu_threads: u32,
    pub memory_bytes: u64,
    pub cpu_used_mhz: f64,
    pub mem_used_kb: f64,
}

/// One virtual machine's property table.
#[derive(Debug, Clone)]
pub struct VmInfo {
    pub name: String,
    /// Name of the host this machine runs on.
    pub host_name: String,
    pub num_cpus: u32,
    pub memory_mb: u32,
    pub cpu_used_mhz: f64,
    pub mem_used_kb: f64,
}

/// Everything one discovery needs from the endpoint.
#[derive(Debug, Clone, Default)]
pub struct VimSnapshot {
    pub hosts: Vec<HostInfo>,
    pub vms: Vec<VmInfo>,
}

/// Fetches property tables from the endpoint described by the
/// credential map.
pub trait VimInventory {
    fn fetch(&self, values: &AccountValues) -> Result<VimSnapshot>;
}

/// Serves a fixed snapshot; the standard test double.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    snapshot: VimSnapshot,
    fail_with: Option<String>,
}

impl StaticInventory {
    pub fn new(snapshot: VimSnapshot) -> Self {
        Self {
            snapshot,
            fail_with: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            snapshot: VimSnapshot::default(),
            fail_with: Some(message.into()),
        }
    }
}

impl VimInventory for StaticInventory {
    fn fetch(&self, _values: &AccountValues) -> Result<VimSnapshot> {
        if let Some(message) = &self.fail_with {
            return Err(Error::Discovery(message.clone()));
        }
        Ok(self.snapshot.clone())
    }
}

/// See [module docs](self).
#[derive(Debug)]
pub struct VimProbe<I: VimInventory> {
    inventory: I,
}

impl<I: VimInventory> VimProbe<I> {
    pub fn new(inventory: I) -> Self {
        Self { inventory }
    }

    fn datacenter() -> Entity {
        Entity::builder(EntityKind::DataCenter, DC_ID)
            .display_name(DC_DISPLAY_NAME)
            .sells(infrastructure_commodity(CommodityKind::Space))
            .sells(infrastructure_commodity(CommodityKind::Power))
            .sells(infrastructure_commodity(CommodityKind::Cooling))
            .build()
    }

    fn host_entity(host: &HostInfo) -> Entity {
        let cpu_capacity = f64::from(host.cpu_mhz) * f64::from(host.num_cpu_threads);
        let mem_capacity = host.memory_bytes as f64 / 1024.0 / 1024.0;
        Entity::builder(EntityKind::PhysicalMachine, host.name.clone())
            .display_name(host.name.clone())
            .sells(
                Commodity::new(CommodityKind::Cpu)
                    .with_used(host.cpu_used_mhz)
                    .with_capacity(cpu_capacity),
            )
            .sells(
                Commodity::new(CommodityKind::Mem)
                    .with_used(host.mem_used_kb / 1024.0)
                    .with_capacity(mem_capacity),
            )
            .buys_from(DC_ID, infrastructure_commodity(CommodityKind::Space))
            .buys_from(DC_ID, infrastructure_commodity(CommodityKind::Power))
            .buys_from(DC_ID, infrastructure_commodity(CommodityKind::Cooling))
            .build()
    }

    fn vm_entity(vm: &VmInfo, host_cpu_mhz: u32) -> Entity {
        let cpu_capacity = f64::from(host_cpu_mhz) * f64::from(vm.num_cpus);
        let mem_capacity = f64::from(vm.memory_mb);
        let cpu_used = vm.cpu_used_mhz;
        let mem_used = vm.mem_used_kb / 1024.0;
        Entity::builder(EntityKind::VirtualMachine, vm.name.clone())
            .display_name(vm.name.clone())
            .sells(
                Commodity::new(CommodityKind::Vcpu)
                    .with_used(cpu_used)
                    .with_capacity(cpu_capacity),
            )
            .sells(
                Commodity::new(CommodityKind::Vmem)
                    .with_used(mem_used)
                    .with_capacity(mem_capacity),
            )
            .buys_from(
                vm.host_name.clone(),
                Commodity::new(CommodityKind::Cpu)
                    .with_used(cpu_used)
                    .with_capacity(cpu_capacity),
            )
            .buys_from(
                vm.host_name.clone(),
                Commodity::new(CommodityKind::Mem)
                    .with_used(mem_used)
                    .with_capacity(mem_capacity),
            )
            .build()
    }
}

fn infrastructure_commodity(kind: CommodityKind) -> Commodity {
    Commodity::new(kind).with_used(1.0).with_capacity(100.0)
}

impl<I: VimInventory> Probe for VimProbe<I> {
    fn name(&self) -> &'static str {
        "vim"
    }

    fn account_definition(&self) -> Vec<AccountDefinitionEntry> {
        vec![
            AccountDefinitionEntry::mandatory(
                account::NAME_OR_ADDRESS,
                "Address",
                "address of the endpoint",
            ),
            AccountDefinitionEntry::mandatory(
                account::USERNAME,
                "User",
                "username to login to the endpoint",
            ),
            AccountDefinitionEntry::mandatory(
                account::PASSWORD,
                "Password",
                "password for the account",
            ),
        ]
    }

    fn supply_chain(&self) -> Vec<SupplyChainTemplate> {
        vec![
            SupplyChainTemplate::builder(EntityKind::DataCenter)
                .selling(CommodityKind::Power)
                .selling(CommodityKind::Space)
                .selling(CommodityKind::Cooling)
                .build(),
            SupplyChainTemplate::builder(EntityKind::PhysicalMachine)
                .selling(CommodityKind::Cpu)
                .selling(CommodityKind::Mem)
                .buys(ProviderLink::hosting(
                    EntityKind::DataCenter,
                    vec![
                        CommodityKind::Power,
                        CommodityKind::Space,
                        CommodityKind::Cooling,
                    ],
                ))
                .build(),
            SupplyChainTemplate::builder(EntityKind::VirtualMachine)
                .selling(CommodityKind::Vcpu)
                .selling(CommodityKind::Vmem)
                .buys(ProviderLink::hosting(
                    EntityKind::PhysicalMachine,
                    vec![CommodityKind::Cpu, CommodityKind::Mem],
                ))
                .build(),
        ]
    }

    fn discover(&self, values: &AccountValues) -> DiscoveryResponse<Entity> {
        let snapshot = match self.inventory.fetch(values) {
            Ok(snapshot) => snapshot,
            Err(err) => return DiscoveryResponse::failed(err.to_string()),
        };
        info!(
            hosts = snapshot.hosts.len(),
            vms = snapshot.vms.len(),
            "discovered endpoint inventory"
        );

        let mut entities = vec![Self::datacenter()];
        let mut errors = Vec::new();

        // Host core frequency, indexed for VM capacity sizing below.
        let mut host_cpu_mhz: HashMap<&str, u32> = HashMap::new();
        for host in &snapshot.hosts {
            host_cpu_mhz.insert(host.name.as_str(), host.cpu_mhz);
            entities.push(Self::host_entity(host));
        }
        for vm in &snapshot.vms {
            match host_cpu_mhz.get(vm.host_name.as_str()) {
                Some(cpu_mhz) => entities.push(Self::vm_entity(vm, *cpu_mhz)),
                None => errors.push(ProbeError::warning(format!(
                    "virtual machine {} references unknown host {}",
                    vm.name, vm.host_name
                ))),
            }
        }

        let mut response = DiscoveryResponse::with_entities(entities);
        response.errors = errors;
        response
    }

    fn validate(&self, values: &AccountValues) -> ValidationResponse {
        match self.inventory.fetch(values) {
            Ok(_) => ValidationResponse::ok("endpoint connection succeeded"),
            Err(err) => ValidationResponse::failed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> VimSnapshot {
        VimSnapshot {
            hosts: vec![HostInfo {
                name: "host-1".into(),
                cpu_mhz: 2600,
                num_cpu_threads: 16,
                memory_bytes: 64 * 1024 * 1024 * 1024,
                cpu_used_mhz: 1300.0,
                mem_used_kb: 8.0 * 1024.0 * 1024.0,
            }],
            vms: vec![VmInfo {
                name: "vm-1".into(),
                host_name: "host-1".into(),
                num_cpus: 4,
                memory_mb: 8192,
                cpu_used_mhz: 400.0,
                mem_used_kb: 2.0 * 1024.0 * 1024.0,
            }],
        }
    }

    fn commodity(entity: &Entity, kind: CommodityKind) -> &Commodity {
        entity.sold.iter().find(|c| c.kind == kind).unwrap()
    }

    #[test]
    fn vm_processor_capacity_scales_with_host_frequency() {
        let probe = VimProbe::new(StaticInventory::new(snapshot()));
        let response = probe.discover(&AccountValues::new());
        assert!(response.is_ok());
        let vm = response.entities.iter().find(|e| e.id == "vm-1").unwrap();
        assert_eq!(commodity(vm, CommodityKind::Vcpu).capacity, 2600.0 * 4.0);
        assert_eq!(commodity(vm, CommodityKind::Vmem).capacity, 8192.0);
        assert!(vm.bought.contains_key("host-1"));
    }

    #[test]
    fn host_capacities_derive_from_hardware() {
        let probe = VimProbe::new(StaticInventory::new(snapshot()));
        let response = probe.discover(&AccountValues::new());
        let host = response.entities.iter().find(|e| e.id == "host-1").unwrap();
        assert_eq!(commodity(host, CommodityKind::Cpu).capacity, 2600.0 * 16.0);
        assert_eq!(commodity(host, CommodityKind::Mem).capacity, 65536.0);
        assert!(host.bought.contains_key(DC_ID));
    }

    #[test]
    fn synthetic_datacenter_is_always_first() {
        let probe = VimProbe::new(StaticInventory::new(VimSnapshot::default()));
        let response = probe.discover(&AccountValues::new());
        assert_eq!(response.entities.len(), 1);
        assert_eq!(response.entities[0].id, DC_ID);
    }

    #[test]
    fn orphan_vm_becomes_a_warning() {
        let mut snap = snapshot();
        snap.vms[0].host_name = "missing-host".into();
        let probe = VimProbe::new(StaticInventory::new(snap));
        let response = probe.discover(&AccountValues::new());
        assert!(response.is_ok());
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.entities.len(), 2);
    }

    #[test]
    fn validation_reflects_connectivity() {
        let good = VimProbe::new(StaticInventory::new(VimSnapshot::default()));
        assert!(good.validate(&AccountValues::new()).ok);
        let bad = VimProbe::new(StaticInventory::failing("login rejected"));
        let response = bad.validate(&AccountValues::new());
        assert!(!response.ok);
        assert!(response.explanation.contains("login rejected"));
    }
}
