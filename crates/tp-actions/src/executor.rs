//! Executes virtual machine actions against a hypervisor session.
//!
//! Supported actions are start, move, reconfigure, and capacity
//! right-size. Everything else is answered with a not-implemented
//! failure rather than an error, since the mediation layer treats the
//! result description as user-facing text.

use tracing::info;

use crate::hypervisor::{
    ConnectSettings, Connector, Hypervisor, HostHandle, PowerState, ReconfigSpec, VmHandle,
};
use crate::item::{ActionItem, ActionType, ResizeAttribute};
use crate::monitor::{monitor_task, MonitorConfig, Sleep, TaskContext, ThreadSleep};
use crate::power::{wait_for_power_state, WaitConfig};
use crate::progress::ProgressSink;
use crate::retry::{initiate_with_retry, Initiation, RetryPolicy};
use tp_common::account::AccountValues;
use tp_common::response::ActionResult;
use tp_topology::EntityKind;

/// Result description for actions the executor does not handle.
pub const NOT_IMPLEMENTED: &str = "NOT IMPLEMENTED";

/// Overall progress once the guest has shut down for a resize.
const SHUTDOWN_PROGRESS: u32 = 20;
/// Share of overall progress owned by the reconfigure task.
const RECONFIG_PROGRESS_RANGE: u32 = 50;
/// Share of overall progress owned by the restart after a resize.
const START_PROGRESS_RANGE: u32 = 30;

/// Drives virtual machine actions over any [`Connector`].
pub struct VmActionExecutor<C: Connector, S: Sleep = ThreadSleep> {
    connector: C,
    sleep: S,
    connect: ConnectSettings,
    monitor: MonitorConfig,
    retry: RetryPolicy,
    wait: WaitConfig,
}

impl<C: Connector> VmActionExecutor<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            sleep: ThreadSleep,
            connect: ConnectSettings::default(),
            monitor: MonitorConfig::default(),
            retry: RetryPolicy::default(),
            wait: WaitConfig::default(),
        }
    }
}

impl<C: Connector, S: Sleep> VmActionExecutor<C, S> {
    pub fn with_sleep<S2: Sleep>(self, sleep: S2) -> VmActionExecutor<C, S2> {
        VmActionExecutor {
            connector: self.connector,
            sleep,
            connect: self.connect,
            monitor: self.monitor,
            retry: self.retry,
            wait: self.wait,
        }
    }

    pub fn with_connect_settings(mut self, connect: ConnectSettings) -> Self {
        self.connect = connect;
        self
    }

    pub fn with_monitor_config(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Execute one action item against the target described by
    /// `values`. The session is released on every exit path.
    pub fn execute_action(
        &self,
        item: &ActionItem,
        values: &AccountValues,
        sink: &mut dyn ProgressSink,
    ) -> ActionResult {
        if item.target.kind != EntityKind::VirtualMachine {
            return ActionResult::failed(NOT_IMPLEMENTED);
        }
        let session = match self.connector.connect(values, &self.connect) {
            Ok(session) => session,
            Err(err) => return ActionResult::failed(err.to_string()),
        };
        info!(action = %item.action_type, target = %item.target.display_name, "executing action");
        let result = self.run_vm_action(&session, item, sink);
        session.logout();
        result
    }

    fn run_vm_action(
        &self,
        session: &C::Session,
        item: &ActionItem,
        sink: &mut dyn ProgressSink,
    ) -> ActionResult {
        let name = &item.target.display_name;
        let vm = match session.find_vm(name) {
            Ok(Some(vm)) => vm,
            Ok(None) => {
                return ActionResult::failed(format!("virtual machine not found: {name}"))
            }
            Err(err) => return ActionResult::failed(err.to_string()),
        };
        let action = item.action_type.to_string();
        match item.action_type {
            ActionType::Start => {
                self.start_vm(session, item, &vm, &action, item.progress, sink)
            }
            ActionType::Move => self.move_vm(session, item, &vm, &action, sink),
            ActionType::Reconfigure => self.resize_vm(session, item, &vm, &action, sink),
            ActionType::RightSize => match &item.new_commodity {
                Some(resize) if resize.attribute == ResizeAttribute::Capacity => {
                    self.resize_vm(session, item, &vm, &action, sink)
                }
                _ => ActionResult::failed(NOT_IMPLEMENTED),
            },
        }
    }

    /// Power the machine on, retrying while the endpoint reports it in
    /// an invalid state. `start_progress` is where this step picks up
    /// within the overall action.
    fn start_vm(
        &self,
        session: &C::Session,
        item: &ActionItem,
        vm: &VmHandle,
        action: &str,
        start_progress: u32,
        sink: &mut dyn ProgressSink,
    ) -> ActionResult {
        let name = &item.target.display_name;
        let host = match self.resolve_host(session, item.hosted_by.as_ref(), name) {
            Ok(host) => host,
            Err(result) => return result,
        };
        let initiation = initiate_with_retry(
            &self.retry,
            &self.sleep,
            || Ok(session.power_state(vm)? == PowerState::PoweredOn),
            || session.power_on(vm, &host),
        );
        match initiation {
            Ok(Initiation::AlreadyDone) => {
                ActionResult::succeeded(format!("{name} is already powered on"))
            }
            Ok(Initiation::Task(task)) => {
                let ctx = TaskContext {
                    target_name: name,
                    action,
                    start_progress,
                    progress_range: remaining_range(start_progress),
                };
                monitor_task(&task, &ctx, &self.monitor, &self.sleep, sink)
            }
            Err(err) => ActionResult::failed(err.to_string()),
        }
    }

    fn move_vm(
        &self,
        session: &C::Session,
        item: &ActionItem,
        vm: &VmHandle,
        action: &str,
        sink: &mut dyn ProgressSink,
    ) -> ActionResult {
        let name = &item.target.display_name;
        match session.is_template(vm) {
            Ok(true) => {
                return ActionResult::failed(format!("{name} is a template and cannot be moved"))
            }
            Ok(false) => {}
            Err(err) => return ActionResult::failed(err.to_string()),
        }
        let host = match self.resolve_host(session, item.new_entity.as_ref(), name) {
            Ok(host) => host,
            Err(result) => return result,
        };
        let task = match session.migrate(vm, &host) {
            Ok(task) => task,
            Err(err) => return ActionResult::failed(err.to_string()),
        };
        let ctx = TaskContext {
            target_name: name,
            action,
            start_progress: item.progress,
            progress_range: remaining_range(item.progress),
        };
        monitor_task(&task, &ctx, &self.monitor, &self.sleep, sink)
    }

    /// Shut the guest down, apply the new hardware configuration, and
    /// start it again, with each phase owning a fixed slice of the
    /// overall progress.
    fn resize_vm(
        &self,
        session: &C::Session,
        item: &ActionItem,
        vm: &VmHandle,
        action: &str,
        sink: &mut dyn ProgressSink,
    ) -> ActionResult {
        let name = &item.target.display_name;
        let resize = match &item.new_commodity {
            Some(resize) => resize,
            None => return ActionResult::failed(NOT_IMPLEMENTED),
        };
        match session.power_state(vm) {
            Ok(PowerState::PoweredOff) => {}
            Ok(_) => {
                if let Err(err) = session.shutdown_guest(vm) {
                    return ActionResult::failed(err.to_string());
                }
            }
            Err(err) => return ActionResult::failed(err.to_string()),
        }
        if let Err(err) = wait_for_power_state(
            session,
            vm,
            PowerState::PoweredOff,
            SHUTDOWN_PROGRESS,
            &self.wait,
            &self.sleep,
            sink,
        ) {
            return ActionResult::failed(err.to_string());
        }
        let spec = ReconfigSpec {
            num_cpus: resize.capacity.max(1.0) as u32,
        };
        let task = match session.reconfigure(vm, &spec) {
            Ok(task) => task,
            Err(err) => return ActionResult::failed(err.to_string()),
        };
        let ctx = TaskContext {
            target_name: name,
            action,
            start_progress: SHUTDOWN_PROGRESS,
            progress_range: RECONFIG_PROGRESS_RANGE,
        };
        let result = monitor_task(&task, &ctx, &self.monitor, &self.sleep, sink);
        if result.is_failed() {
            return result;
        }
        self.start_vm(
            session,
            item,
            vm,
            action,
            SHUTDOWN_PROGRESS + RECONFIG_PROGRESS_RANGE,
            sink,
        )
    }

    fn resolve_host(
        &self,
        session: &C::Session,
        host_ref: Option<&crate::item::EntityRef>,
        vm_name: &str,
    ) -> Result<HostHandle, ActionResult> {
        let host_ref = host_ref
            .ok_or_else(|| ActionResult::failed(format!("no host specified for {vm_name}")))?;
        match session.find_host(&host_ref.display_name) {
            Ok(Some(host)) => Ok(host),
            Ok(None) => Err(ActionResult::failed(format!(
                "host not found: {}",
                host_ref.display_name
            ))),
            Err(err) => Err(ActionResult::failed(err.to_string())),
        }
    }
}

/// Progress points left for the final monitored task of an action. An
/// action that starts at zero still gets the full scale.
fn remaining_range(start_progress: u32) -> u32 {
    let range = 100u32.saturating_sub(start_progress);
    if range == 0 {
        100
    } else {
        range
    }
}
