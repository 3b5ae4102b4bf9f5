//! The smallest useful probe: a fixed five-entity inline topology.

use tracing::info;

use crate::probe::Probe;
use tp_common::account::{self, AccountDefinitionEntry, AccountValues};
use tp_common::response::{DiscoveryResponse, ValidationResponse};
use tp_topology::{
    Commodity, CommodityKind, Entity, EntityKind, ProviderLink, SupplyChainTemplate,
};

const DC1_ID: &str = "dc1-id";
const PM1_ID: &str = "pm1-id";
const DA1_ID: &str = "da1-id";
const ST1_ID: &str = "st1-id";
const VM1_ID: &str = "vm1-id";

fn commodity(kind: CommodityKind) -> Commodity {
    Commodity::new(kind).with_used(1.0).with_capacity(100.0)
}

/// Serves one data center hosting one machine, one disk array behind
/// one storage, and one virtual machine on top. Useful for exercising
/// the full mediation path without any target at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleProbe;

impl SimpleProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Probe for SimpleProbe {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn account_definition(&self) -> Vec<AccountDefinitionEntry> {
        vec![
            AccountDefinitionEntry::mandatory(
                account::TARGET_IDENTIFIER,
                "Name",
                "name of the target",
            ),
            AccountDefinitionEntry::mandatory(
                account::USERNAME,
                "User",
                "username to login to the target",
            ),
            AccountDefinitionEntry::mandatory(
                account::PASSWORD,
                "Password",
                "password for the account",
            ),
            AccountDefinitionEntry::optional(account::VERSION, "Version", "target version"),
        ]
    }

    fn supply_chain(&self) -> Vec<SupplyChainTemplate> {
        vec![
            SupplyChainTemplate::builder(EntityKind::DataCenter)
                .selling(CommodityKind::Space)
                .build(),
            SupplyChainTemplate::builder(EntityKind::PhysicalMachine)
                .selling(CommodityKind::Cpu)
                .buys(ProviderLink::hosting(
                    EntityKind::DataCenter,
                    vec![CommodityKind::Space],
                ))
                .build(),
            SupplyChainTemplate::builder(EntityKind::DiskArray)
                .selling(CommodityKind::StorageAmount)
                .build(),
            SupplyChainTemplate::builder(EntityKind::Storage)
                .selling(CommodityKind::StorageAmount)
                .buys(ProviderLink::hosting(
                    EntityKind::DiskArray,
                    vec![CommodityKind::StorageAmount],
                ))
                .build(),
            SupplyChainTemplate::builder(EntityKind::VirtualMachine)
                .selling(CommodityKind::Vcpu)
                .buys(ProviderLink::hosting(
                    EntityKind::PhysicalMachine,
                    vec![CommodityKind::Cpu],
                ))
                .buys(
                    ProviderLink::layered_over(
                        EntityKind::Storage,
                        vec![CommodityKind::StorageAmount],
                    )
                    .with_cardinality(1, Some(1)),
                )
                .build(),
        ]
    }

    fn discover(&self, _values: &AccountValues) -> DiscoveryResponse<Entity> {
        info!("discovering fixed inline topology");
        let dc = Entity::builder(EntityKind::DataCenter, DC1_ID)
            .display_name("dc1")
            .sells(commodity(CommodityKind::Space))
            .consists_of(PM1_ID)
            .build();
        let pm = Entity::builder(EntityKind::PhysicalMachine, PM1_ID)
            .display_name("pm1")
            .sells(commodity(CommodityKind::Cpu))
            .buys_from(DC1_ID, commodity(CommodityKind::Space))
            .layered_over(ST1_ID)
            .build();
        let da = Entity::builder(EntityKind::DiskArray, DA1_ID)
            .display_name("da1")
            .sells(commodity(CommodityKind::StorageAmount))
            .build();
        let st = Entity::builder(EntityKind::Storage, ST1_ID)
            .display_name("st1")
            .sells(commodity(CommodityKind::StorageAmount))
            .buys_from(DA1_ID, commodity(CommodityKind::StorageAmount))
            .build();
        let vm = Entity::builder(EntityKind::VirtualMachine, VM1_ID)
            .display_name("vm1")
            .sells(commodity(CommodityKind::Vcpu))
            .buys_from(PM1_ID, commodity(CommodityKind::Cpu))
            .buys_from(ST1_ID, commodity(CommodityKind::StorageAmount))
            .build();
        DiscoveryResponse::with_entities(vec![dc, pm, da, st, vm])
    }

    fn validate(&self, _values: &AccountValues) -> ValidationResponse {
        ValidationResponse::ok("simple probe validated")
    }
}
