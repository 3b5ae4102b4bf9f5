//! Action items handed to an action executor by the mediation layer.

use serde::{Deserialize, Serialize};
use tp_topology::{CommodityKind, EntityKind};
use uuid::Uuid;

/// Kind of remedial work requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Start,
    Move,
    Reconfigure,
    RightSize,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "Start",
            Self::Move => "Move",
            Self::Reconfigure => "Reconfigure",
            Self::RightSize => "RightSize",
        };
        f.write_str(name)
    }
}

/// Which commodity attribute a resize targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeAttribute {
    Capacity,
    Limit,
}

/// The resize target for reconfigure/right-size actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityResize {
    pub kind: CommodityKind,
    pub attribute: ResizeAttribute,
    pub capacity: f64,
}

/// Minimal reference to an entity involved in an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub display_name: String,
    pub kind: EntityKind,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
        }
    }
}

/// One unit of remedial work requested of a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: Uuid,
    pub target: EntityRef,
    pub action_type: ActionType,
    /// Progress percentage already accumulated by earlier steps of the
    /// overall action.
    pub progress: u32,
    /// The entity currently hosting the target (start actions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_by: Option<EntityRef>,
    /// Migration destination (move actions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_entity: Option<EntityRef>,
    /// Resize target (reconfigure/right-size actions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_commodity: Option<CommodityResize>,
}

impl ActionItem {
    pub fn new(target: EntityRef, action_type: ActionType) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            action_type,
            progress: 0,
            hosted_by: None,
            new_entity: None,
            new_commodity: None,
        }
    }

    pub fn with_progress(mut self, progress: u32) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_hosted_by(mut self, host: EntityRef) -> Self {
        self.hosted_by = Some(host);
        self
    }

    pub fn with_new_entity(mut self, destination: EntityRef) -> Self {
        self.new_entity = Some(destination);
        self
    }

    pub fn with_new_commodity(mut self, resize: CommodityResize) -> Self {
        self.new_commodity = Some(resize);
        self
    }
}
