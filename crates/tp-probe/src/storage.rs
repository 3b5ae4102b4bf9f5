//! A probe serving a disk array and its storage controller.
//!
//! The disk array carries a LUN uuid used to stitch it to Storage
//! entities discovered by a hypervisor probe. The uuid can be
//! overridden per target through a small TOML properties file named
//! after the target identifier.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, warn};

use crate::probe::Probe;
use tp_common::account::{self, AccountDefinitionEntry, AccountValues};
use tp_common::response::{DiscoveryResponse, ValidationResponse};
use tp_topology::{
    Commodity, CommodityKind, Entity, EntityKind, ExternalLink, ProviderKind, ProviderLink,
    SupplyChainTemplate,
};

const DA1_ID: &str = "da1-id";
const DA1_NAME: &str = "da1-name";
const SC_ID: &str = "SC-ID-VAL";
const DEFAULT_LUN_UUID: &str = "00000000";

/// Per-target overrides loaded from `<target>.toml`.
#[derive(Debug, Default, Deserialize)]
struct StorageProperties {
    lun_uuid: Option<String>,
}

/// See [module docs](self).
#[derive(Debug, Default, Clone)]
pub struct StorageProbe {
    properties_dir: Option<PathBuf>,
}

impl StorageProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory searched for per-target properties files.
    pub fn with_properties_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.properties_dir = Some(dir.into());
        self
    }

    fn load_properties(&self, target: &str) -> StorageProperties {
        let Some(dir) = &self.properties_dir else {
            return StorageProperties::default();
        };
        let path = dir.join(format!("{}.toml", target.trim()));
        let Ok(contents) = std::fs::read_to_string(&path) else {
            info!(path = %path.display(), "no per-target properties file, using defaults");
            return StorageProperties::default();
        };
        match toml::from_str(&contents) {
            Ok(props) => props,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "malformed properties file, using defaults");
                StorageProperties::default()
            }
        }
    }
}

impl Probe for StorageProbe {
    fn name(&self) -> &'static str {
        "storage"
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
        ]
    }

    fn supply_chain(&self) -> Vec<SupplyChainTemplate> {
        vec![
            SupplyChainTemplate::builder(EntityKind::DiskArray)
                .selling(CommodityKind::StorageAmount)
                .selling(CommodityKind::StorageLatency)
                .selling(CommodityKind::StorageProvisioned)
                .selling(CommodityKind::Extent)
                .buys(ProviderLink::hosting(
                    EntityKind::StorageController,
                    vec![CommodityKind::Cpu, CommodityKind::StorageAmount],
                ))
                .stitches(ExternalLink {
                    provider: EntityKind::Storage,
                    relation: ProviderKind::Hosting,
                    commodities: vec![
                        CommodityKind::StorageProvisioned,
                        CommodityKind::StorageAmount,
                        CommodityKind::StorageAccess,
                        CommodityKind::StorageLatency,
                        CommodityKind::Extent,
                    ],
                    probe_property: "LunUUID".to_owned(),
                    external_property: "LunUUID".to_owned(),
                })
                .build(),
            SupplyChainTemplate::builder(EntityKind::StorageController)
                .selling(CommodityKind::StorageAmount)
                .selling(CommodityKind::Cpu)
                .build(),
        ]
    }

    fn discover(&self, values: &AccountValues) -> DiscoveryResponse<Entity> {
        let target = match account::require_field(values, account::TARGET_IDENTIFIER) {
            Ok(target) => target,
            Err(err) => return DiscoveryResponse::failed(err.to_string()),
        };
        let props = self.load_properties(target);
        let lun_uuid = props
            .lun_uuid
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_LUN_UUID);
        info!(target, lun_uuid, "discovering storage target");

        let da = Entity::builder(EntityKind::DiskArray, DA1_ID)
            .display_name(DA1_NAME)
            .sells(Commodity::new(CommodityKind::StorageAccess).with_capacity(100.0))
            .sells(Commodity::new(CommodityKind::StorageAmount).with_capacity(100.0))
            .sells(Commodity::new(CommodityKind::StorageProvisioned).with_capacity(100.0))
            .sells(Commodity::new(CommodityKind::StorageLatency).with_capacity(100.0))
            .sells(
                Commodity::new(CommodityKind::Extent)
                    .with_key(lun_uuid)
                    .with_capacity(100.0),
            )
            .buys_from(
                SC_ID,
                Commodity::new(CommodityKind::StorageAmount)
                    .with_used(1.0)
                    .with_capacity(100.0),
            )
            .buys_from(
                SC_ID,
                Commodity::new(CommodityKind::Cpu)
                    .with_used(1.0)
                    .with_capacity(100.0),
            )
            .build();
        let sc = Entity::builder(EntityKind::StorageController, SC_ID)
            .display_name(SC_ID)
            .sells(Commodity::new(CommodityKind::Cpu).with_capacity(100.0))
            .sells(Commodity::new(CommodityKind::StorageAmount).with_capacity(100.0))
            .build();
        DiscoveryResponse::with_entities(vec![da, sc])
    }

    fn validate(&self, _values: &AccountValues) -> ValidationResponse {
        ValidationResponse::ok("storage probe validated")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn values_for(target: &str) -> AccountValues {
        let mut values = AccountValues::new();
        values.insert(account::TARGET_IDENTIFIER.to_owned(), target.to_owned());
        values
    }

    fn extent_key(response: &DiscoveryResponse<Entity>) -> String {
        response
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::DiskArray)
            .unwrap()
            .sold
            .iter()
            .find(|c| c.kind == CommodityKind::Extent)
            .unwrap()
            .key
            .clone()
            .unwrap()
    }

    #[test]
    fn default_lun_uuid_without_properties_file() {
        let response = StorageProbe::new().discover(&values_for("array-9"));
        assert!(response.is_ok());
        assert_eq!(extent_key(&response), DEFAULT_LUN_UUID);
    }

    #[test]
    fn properties_file_overrides_lun_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("array-9.toml")).unwrap();
        writeln!(file, r#"lun_uuid = "cafebabe""#).unwrap();
        let probe = StorageProbe::new().with_properties_dir(dir.path());
        let response = probe.discover(&values_for("array-9"));
        assert_eq!(extent_key(&response), "cafebabe");
    }

    #[test]
    fn malformed_properties_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("array-9.toml"), "lun_uuid = [").unwrap();
        let probe = StorageProbe::new().with_properties_dir(dir.path());
        let response = probe.discover(&values_for("array-9"));
        assert_eq!(extent_key(&response), DEFAULT_LUN_UUID);
    }

    #[test]
    fn disk_array_buys_from_the_controller() {
        let response = StorageProbe::new().discover(&values_for("array-9"));
        let da = response
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::DiskArray)
            .unwrap();
        assert_eq!(da.bought[SC_ID].len(), 2);
    }
}
