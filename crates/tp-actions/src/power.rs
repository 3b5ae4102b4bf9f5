//! Waiting for a virtual machine to reach a power state.

use std::time::Duration;

use tracing::debug;

use crate::hypervisor::{Hypervisor, HypervisorError, PowerState, VmHandle};
use crate::monitor::Sleep;
use crate::progress::ProgressSink;
use tp_common::response::ActionState;

#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub interval: Duration,
    pub max_ticks: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_ticks: 120,
        }
    }
}

/// Block until `vm` reaches `target`, emitting a steady progress
/// update each tick. A machine already at the target returns without
/// emitting anything.
pub fn wait_for_power_state<H: Hypervisor>(
    hypervisor: &H,
    vm: &VmHandle,
    target: PowerState,
    progress: u32,
    config: &WaitConfig,
    sleep: &dyn Sleep,
    sink: &mut dyn ProgressSink,
) -> Result<(), HypervisorError> {
    for tick in 0..config.max_ticks {
        let current = hypervisor.power_state(vm)?;
        if current == target {
            debug!(vm = %vm.0, state = %current, tick, "reached target power state");
            return Ok(());
        }
        sink.update(
            ActionState::InProgress,
            progress,
            &format!("Action in progress - {progress}%"),
        );
        sleep.sleep(config.interval);
    }
    Err(HypervisorError::Timeout {
        ticks: config.max_ticks,
    })
}
