//! Two-pass topology graph construction.
//!
//! Bought relationships in the source reference the *commodity instance*
//! being consumed, not the provider entity, so the build runs in two
//! passes: pass 1 extracts entities and sold commodities while recording
//! which entity owns each commodity uuid; pass 2 resolves every `consumes`
//! reference through that table and groups bought commodities by provider.
//!
//! The lookup tables live in a per-call context so nothing leaks between
//! scans; a stale table would let commodity uuids from a prior scan resolve
//! into the wrong graph.

use crate::entity::{Commodity, CommodityKind, Entity, EntityKind};
use crate::source::{strip_namespace, EntityRecord, TopologyFile};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Entity kinds excluded from the emitted graph.
const EXCLUDED_KINDS: [EntityKind; 2] = [EntityKind::ActionManager, EntityKind::Application];

/// Result of one graph build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Entities in source insertion order.
    pub entities: Vec<Entity>,
    /// Bought entries dropped because their provider could not be resolved
    /// to a retained entity (unknown commodity uuid or excluded kind).
    pub dropped_references: usize,
}

/// Per-call lookup state for the two-pass build. Constructed fresh on every
/// invocation; never reused across scans.
#[derive(Default)]
struct BuildContext {
    /// commodity uuid -> owning entity id.
    commodity_owner: HashMap<String, String>,
    /// entity id -> (consumed commodity uuid, bought commodity), in order.
    bought: HashMap<String, Vec<(String, Commodity)>>,
}

/// Build the closed entity graph for the main markets of a topology
/// document.
pub fn build_topology(doc: &TopologyFile) -> BuildReport {
    let mut context = BuildContext::default();
    let mut entities: Vec<Entity> = Vec::new();

    // Pass 1: entities, sold commodities, and the lookup tables.
    for record in doc.main_market_entities() {
        let entity = extract_entity(record, &mut context);
        if EXCLUDED_KINDS.contains(&entity.kind) {
            debug!(id = %entity.id, kind = %entity.kind, "skipping excluded entity kind");
            continue;
        }
        entities.push(entity);
    }

    let retained: HashSet<String> = entities.iter().map(|e| e.id.clone()).collect();

    // Pass 2: resolve consumes references into per-provider bought maps.
    let mut dropped_references = 0;
    for entity in &mut entities {
        let Some(pairs) = context.bought.remove(&entity.id) else {
            continue;
        };
        for (consumed_uuid, commodity) in pairs {
            let provider = context
                .commodity_owner
                .get(&consumed_uuid)
                .filter(|id| retained.contains(*id));
            match provider {
                Some(provider_id) => {
                    entity
                        .bought
                        .entry(provider_id.clone())
                        .or_default()
                        .push(commodity);
                }
                None => {
                    warn!(
                        entity = %entity.id,
                        consumes = %consumed_uuid,
                        "dropping bought commodity with unresolvable provider"
                    );
                    dropped_references += 1;
                }
            }
        }
    }

    wire_structural_relationships(&mut entities);

    BuildReport {
        entities,
        dropped_references,
    }
}

/// Pass-1 extraction of one entity record.
fn extract_entity(record: &EntityRecord, context: &mut BuildContext) -> Entity {
    let kind = EntityKind::from_name(strip_namespace(&record.entity_type));
    let mut builder = Entity::builder(kind, record.uuid.clone())
        .display_name(record.resolved_display_name());

    for sold in &record.sold {
        let commodity_kind = CommodityKind::from_name(strip_namespace(&sold.commodity_type));
        let commodity = Commodity::from_attributes(
            commodity_kind,
            sold.key.as_deref(),
            sold.used.as_ref().and_then(|v| v.parse("used", &record.uuid)),
            sold.capacity
                .as_ref()
                .and_then(|v| v.parse("capacity", &record.uuid)),
        );
        builder = builder.sells(commodity);
        context
            .commodity_owner
            .insert(sold.uuid.clone(), record.uuid.clone());
    }

    let mut pairs = Vec::with_capacity(record.bought.len());
    for bought in &record.bought {
        let commodity_kind = CommodityKind::from_name(strip_namespace(&bought.commodity_type));
        let commodity = Commodity::from_attributes(
            commodity_kind,
            bought.key.as_deref(),
            bought
                .used
                .as_ref()
                .and_then(|v| v.parse("used", &record.uuid)),
            bought
                .capacity
                .as_ref()
                .and_then(|v| v.parse("capacity", &record.uuid)),
        );
        pairs.push((bought.consumes.clone(), commodity));
    }
    if !pairs.is_empty() {
        context.bought.insert(record.uuid.clone(), pairs);
    }

    builder.build()
}

/// Relationship edges not expressed as commodity purchases: every
/// PhysicalMachine records every Storage in `underlying` (a full cross
/// product over the scan), and the first-seen DataCenter records every
/// PhysicalMachine in `consists_of`. Both run only after the full entity
/// set is known.
fn wire_structural_relationships(entities: &mut [Entity]) {
    let pm_ids: Vec<String> = entities
        .iter()
        .filter(|e| e.kind == EntityKind::PhysicalMachine)
        .map(|e| e.id.clone())
        .collect();
    let storage_ids: Vec<String> = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Storage)
        .map(|e| e.id.clone())
        .collect();
    let first_dc = entities
        .iter()
        .position(|e| e.kind == EntityKind::DataCenter);

    for entity in entities.iter_mut() {
        if entity.kind == EntityKind::PhysicalMachine {
            entity.underlying.extend(storage_ids.iter().cloned());
        }
    }
    if let Some(dc_index) = first_dc {
        entities[dc_index]
            .consists_of
            .extend(pm_ids.iter().cloned());
    }
}
