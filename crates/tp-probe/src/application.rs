//! A probe serving application entities stitched to hypervisor VMs by
//! IP address.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, warn};

use crate::probe::Probe;
use tp_common::account::{self, AccountDefinitionEntry, AccountValues};
use tp_common::response::{DiscoveryResponse, ValidationResponse};
use tp_topology::{
    Commodity, CommodityKind, Entity, EntityKind, ExternalLink, ProviderKind, SupplyChainTemplate,
};

const DEFAULT_IP_ADDRESS: &str = "10.0.0.0";

/// Per-target overrides loaded from `<target>.toml`.
#[derive(Debug, Default, Deserialize)]
struct ApplicationProperties {
    ip_address: Option<String>,
}

/// Serves one application entity per target. The application carries
/// the IP address of the virtual machine hosting it; a hypervisor
/// probe's VM with the same address becomes its provider.
#[derive(Debug, Default, Clone)]
pub struct ApplicationProbe {
    properties_dir: Option<PathBuf>,
}

impl ApplicationProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory searched for per-target properties files.
    pub fn with_properties_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.properties_dir = Some(dir.into());
        self
    }

    fn load_properties(&self, target: &str) -> ApplicationProperties {
        let Some(dir) = &self.properties_dir else {
            return ApplicationProperties::default();
        };
        let path = dir.join(format!("{}.toml", target.trim()));
        let Ok(contents) = std::fs::read_to_string(&path) else {
            info!(path = %path.display(), "no per-target properties file, using defaults");
            return ApplicationProperties::default();
        };
        match toml::from_str(&contents) {
            Ok(props) => props,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "malformed properties file, using defaults");
                ApplicationProperties::default()
            }
        }
    }
}

impl Probe for ApplicationProbe {
    fn name(&self) -> &'static str {
        "application"
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
        vec![SupplyChainTemplate::builder(EntityKind::Application)
            .stitches(ExternalLink {
                provider: EntityKind::VirtualMachine,
                relation: ProviderKind::Hosting,
                commodities: vec![CommodityKind::Vcpu, CommodityKind::Vmem],
                probe_property: "IPAddress".to_owned(),
                external_property: "IPAddress".to_owned(),
            })
            .build()]
    }

    fn discover(&self, values: &AccountValues) -> DiscoveryResponse<Entity> {
        let target = match account::require_field(values, account::TARGET_IDENTIFIER) {
            Ok(target) => target,
            Err(err) => return DiscoveryResponse::failed(err.to_string()),
        };
        let props = self.load_properties(target);
        let ip_address = props
            .ip_address
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_IP_ADDRESS);
        let app_id = format!("app-{target}");
        info!(target, ip_address, "discovering application target");
        let app = Entity::builder(EntityKind::Application, app_id.clone())
            .display_name(app_id)
            .sells(Commodity::new(CommodityKind::Application).with_key(ip_address))
            .build();
        DiscoveryResponse::with_entities(vec![app])
    }

    fn validate(&self, _values: &AccountValues) -> ValidationResponse {
        ValidationResponse::ok("application probe validated")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values_for(target: &str) -> AccountValues {
        let mut values = AccountValues::new();
        values.insert(account::TARGET_IDENTIFIER.to_owned(), target.to_owned());
        values
    }

    fn app_key(response: &DiscoveryResponse<Entity>) -> String {
        response.entities[0].sold[0].key.clone().unwrap()
    }

    #[test]
    fn application_id_follows_the_target() {
        let response = ApplicationProbe::new().discover(&values_for("crm"));
        assert_eq!(response.entities[0].id, "app-crm");
        assert_eq!(app_key(&response), DEFAULT_IP_ADDRESS);
    }

    #[test]
    fn properties_file_overrides_ip_address() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("crm.toml"), r#"ip_address = "10.1.2.3""#).unwrap();
        let probe = ApplicationProbe::new().with_properties_dir(dir.path());
        let response = probe.discover(&values_for("crm"));
        assert_eq!(app_key(&response), "10.1.2.3");
    }

    #[test]
    fn supply_chain_stitches_by_ip() {
        let templates = ApplicationProbe::new().supply_chain();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].external[0].provider, EntityKind::VirtualMachine);
    }
}
