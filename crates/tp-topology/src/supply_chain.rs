//! Supply-chain templates.
//!
//! A template is a static, per-entity-kind declaration of what that kind
//! sells, what it buys from which provider kind, and how many providers the
//! relationship tolerates. Templates are assembled once at probe
//! construction and consumed read-only by the mediation layer; they are
//! never reprocessed per scan.

use crate::entity::{CommodityKind, EntityKind};
use serde::{Deserialize, Serialize};

/// How an entity relates to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Strict hosting: the consumer runs on the provider.
    Hosting,
    /// The consumer is layered over the provider (storage, networks).
    LayeredOver,
}

/// A commodity a template kind sells, optionally keyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCommodity {
    pub kind: CommodityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// A buying relationship to a provider kind, with cardinality bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLink {
    pub provider: EntityKind,
    pub relation: ProviderKind,
    pub commodities: Vec<CommodityKind>,
    pub min_providers: u32,
    /// `None` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_providers: Option<u32>,
}

impl ProviderLink {
    /// A strict hosting relationship with exactly one provider.
    pub fn hosting(provider: EntityKind, commodities: Vec<CommodityKind>) -> Self {
        Self {
            provider,
            relation: ProviderKind::Hosting,
            commodities,
            min_providers: 1,
            max_providers: Some(1),
        }
    }

    /// A layered-over relationship with any number of providers.
    pub fn layered_over(provider: EntityKind, commodities: Vec<CommodityKind>) -> Self {
        Self {
            provider,
            relation: ProviderKind::LayeredOver,
            commodities,
            min_providers: 0,
            max_providers: None,
        }
    }

    pub fn with_cardinality(mut self, min: u32, max: Option<u32>) -> Self {
        self.min_providers = min;
        self.max_providers = max;
        self
    }
}

/// Stitching metadata for a provider this probe does not itself discover.
///
/// The probe-side property (name and value source) is matched against the
/// named property of entities discovered by another probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLink {
    pub provider: EntityKind,
    pub relation: ProviderKind,
    pub commodities: Vec<CommodityKind>,
    /// Property on entities of this probe used for stitching.
    pub probe_property: String,
    /// Property on the externally discovered entity to match against.
    pub external_property: String,
}

/// Declarative per-kind supply-chain rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyChainTemplate {
    pub kind: EntityKind,
    pub sold: Vec<TemplateCommodity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external: Vec<ExternalLink>,
}

impl SupplyChainTemplate {
    pub fn builder(kind: EntityKind) -> TemplateBuilder {
        TemplateBuilder::new(kind)
    }
}

/// Builder for [`SupplyChainTemplate`] with a single terminal [`build`].
///
/// [`build`]: TemplateBuilder::build
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    template: SupplyChainTemplate,
}

impl TemplateBuilder {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            template: SupplyChainTemplate {
                kind,
                sold: Vec::new(),
                providers: Vec::new(),
                external: Vec::new(),
            },
        }
    }

    pub fn selling(mut self, kind: CommodityKind) -> Self {
        self.template.sold.push(TemplateCommodity { kind, key: None });
        self
    }

    pub fn selling_keyed(mut self, kind: CommodityKind, key: impl Into<String>) -> Self {
        self.template.sold.push(TemplateCommodity {
            kind,
            key: Some(key.into()),
        });
        self
    }

    pub fn buys(mut self, link: ProviderLink) -> Self {
        self.template.providers.push(link);
        self
    }

    pub fn stitches(mut self, link: ExternalLink) -> Self {
        self.template.external.push(link);
        self
    }

    pub fn build(self) -> SupplyChainTemplate {
        self.template
    }
}
