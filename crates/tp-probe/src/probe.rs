//! The probe contract.

use tp_actions::{ActionItem, Connector, ProgressSink, Sleep, VmActionExecutor};
use tp_common::account::{AccountDefinitionEntry, AccountValues};
use tp_common::response::{ActionResult, DiscoveryResponse, ValidationResponse};
use tp_topology::{Entity, SupplyChainTemplate};

/// A mediation probe for one kind of target.
///
/// `discover` and `validate` take the credential map on every call and
/// hold no session state between calls.
pub trait Probe {
    /// Short name used to select the probe on the command line.
    fn name(&self) -> &'static str;

    /// The credential fields this probe needs, in display order.
    fn account_definition(&self) -> Vec<AccountDefinitionEntry>;

    /// The entity kinds this probe discovers and how they relate.
    fn supply_chain(&self) -> Vec<SupplyChainTemplate>;

    /// Scan the target and return its current entity graph.
    fn discover(&self, values: &AccountValues) -> DiscoveryResponse<Entity>;

    /// Check that the credentials reach the target.
    fn validate(&self, values: &AccountValues) -> ValidationResponse;
}

/// Executes remedial actions against a probe's target.
pub trait ActionExecutor {
    fn execute_action(
        &self,
        item: &ActionItem,
        values: &AccountValues,
        sink: &mut dyn ProgressSink,
    ) -> ActionResult;
}

impl<C: Connector, S: Sleep> ActionExecutor for VmActionExecutor<C, S> {
    fn execute_action(
        &self,
        item: &ActionItem,
        values: &AccountValues,
        sink: &mut dyn ProgressSink,
    ) -> ActionResult {
        VmActionExecutor::execute_action(self, item, values, sink)
    }
}
