//! Scripted in-memory doubles for the hypervisor traits.
//!
//! Exported so downstream crates can exercise executors without a live
//! endpoint. Queued responses are sticky: once a queue is down to its
//! last entry that entry repeats forever, which models a task that
//! stays in its final state however often it is polled.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use crate::hypervisor::{
    ConnectSettings, Connector, HostHandle, Hypervisor, HypervisorError, PowerState, ReconfigSpec,
    RemoteTask, TaskState, VmHandle,
};
use crate::monitor::Sleep;
use tp_common::account::AccountValues;

fn next_sticky<T: Clone>(queue: &RefCell<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.borrow_mut();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

/// A remote task that replays scripted state and progress readings.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTask {
    states: Rc<RefCell<VecDeque<Result<TaskState, HypervisorError>>>>,
    progress: Rc<RefCell<VecDeque<Result<u32, HypervisorError>>>>,
}

impl ScriptedTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_state(self, state: Result<TaskState, HypervisorError>) -> Self {
        self.states.borrow_mut().push_back(state);
        self
    }

    pub fn then_progress(self, progress: Result<u32, HypervisorError>) -> Self {
        self.progress.borrow_mut().push_back(progress);
        self
    }

    /// A task that reports the given states in order and a fixed
    /// percent progress whenever asked.
    pub fn running_to_success(percents: impl IntoIterator<Item = u32>) -> Self {
        let mut task = Self::new();
        for percent in percents {
            task = task
                .then_state(Ok(TaskState::Running))
                .then_progress(Ok(percent));
        }
        task.then_state(Ok(TaskState::Success))
    }
}

impl RemoteTask for ScriptedTask {
    fn state(&self) -> Result<TaskState, HypervisorError> {
        next_sticky(&self.states)
            .unwrap_or_else(|| Err(HypervisorError::Remote("no scripted state".into())))
    }

    fn progress(&self) -> Result<u32, HypervisorError> {
        next_sticky(&self.progress).unwrap_or(Ok(0))
    }
}

/// A virtual machine with a scripted power state history.
#[derive(Debug, Default)]
pub struct FakeVm {
    power_states: RefCell<VecDeque<PowerState>>,
    template: bool,
}

impl FakeVm {
    /// A machine pinned to one power state.
    pub fn powered(state: PowerState) -> Self {
        Self::with_power_states([state])
    }

    /// A machine whose power state changes over successive reads,
    /// holding the last state forever.
    pub fn with_power_states(states: impl IntoIterator<Item = PowerState>) -> Self {
        Self {
            power_states: RefCell::new(states.into_iter().collect()),
            template: false,
        }
    }

    pub fn template(state: PowerState) -> Self {
        let mut vm = Self::powered(state);
        vm.template = true;
        vm
    }

    fn next_power_state(&self) -> PowerState {
        next_sticky(&self.power_states).unwrap_or(PowerState::PoweredOff)
    }
}

/// An in-memory endpoint with scripted inventory, tasks, and failures.
#[derive(Debug, Default)]
pub struct FakeHypervisor {
    vms: HashMap<String, FakeVm>,
    hosts: Vec<String>,
    tasks: RefCell<VecDeque<Result<ScriptedTask, HypervisorError>>>,
    /// Initial operation attempts refused with an invalid-state error.
    invalid_state_failures: Cell<u32>,
    pub shutdowns: RefCell<Vec<String>>,
    pub logged_out: Cell<bool>,
}

impl FakeHypervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vm(mut self, name: impl Into<String>, vm: FakeVm) -> Self {
        self.vms.insert(name.into(), vm);
        self
    }

    pub fn with_host(mut self, name: impl Into<String>) -> Self {
        self.hosts.push(name.into());
        self
    }

    pub fn with_task(self, task: ScriptedTask) -> Self {
        self.tasks.borrow_mut().push_back(Ok(task));
        self
    }

    pub fn with_task_error(self, error: HypervisorError) -> Self {
        self.tasks.borrow_mut().push_back(Err(error));
        self
    }

    pub fn with_invalid_state_failures(self, count: u32) -> Self {
        self.invalid_state_failures.set(count);
        self
    }

    fn vm(&self, handle: &VmHandle) -> Result<&FakeVm, HypervisorError> {
        self.vms.get(&handle.0).ok_or_else(|| HypervisorError::NotFound {
            kind: "virtual machine",
            name: handle.0.clone(),
        })
    }

    fn next_task(&self) -> Result<ScriptedTask, HypervisorError> {
        if self.invalid_state_failures.get() > 0 {
            self.invalid_state_failures
                .set(self.invalid_state_failures.get() - 1);
            return Err(HypervisorError::InvalidState(
                "operation not allowed in current state".into(),
            ));
        }
        self.tasks
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(HypervisorError::Remote("no scripted task".into())))
    }
}

impl Hypervisor for FakeHypervisor {
    type Task = ScriptedTask;

    fn find_vm(&self, name: &str) -> Result<Option<VmHandle>, HypervisorError> {
        Ok(self
            .vms
            .contains_key(name)
            .then(|| VmHandle(name.to_owned())))
    }

    fn find_host(&self, name: &str) -> Result<Option<HostHandle>, HypervisorError> {
        Ok(self
            .hosts
            .iter()
            .any(|h| h == name)
            .then(|| HostHandle(name.to_owned())))
    }

    fn power_state(&self, vm: &VmHandle) -> Result<PowerState, HypervisorError> {
        Ok(self.vm(vm)?.next_power_state())
    }

    fn is_template(&self, vm: &VmHandle) -> Result<bool, HypervisorError> {
        Ok(self.vm(vm)?.template)
    }

    fn power_on(&self, vm: &VmHandle, _host: &HostHandle) -> Result<Self::Task, HypervisorError> {
        self.vm(vm)?;
        self.next_task()
    }

    fn migrate(&self, vm: &VmHandle, _host: &HostHandle) -> Result<Self::Task, HypervisorError> {
        self.vm(vm)?;
        self.next_task()
    }

    fn reconfigure(
        &self,
        vm: &VmHandle,
        _spec: &ReconfigSpec,
    ) -> Result<Self::Task, HypervisorError> {
        self.vm(vm)?;
        self.next_task()
    }

    fn shutdown_guest(&self, vm: &VmHandle) -> Result<(), HypervisorError> {
        self.vm(vm)?;
        self.shutdowns.borrow_mut().push(vm.0.clone());
        Ok(())
    }

    fn logout(&self) {
        self.logged_out.set(true);
    }
}

/// Session wrapper so tests can keep their own handle on the endpoint
/// after the executor has consumed the session.
#[derive(Debug, Clone)]
pub struct FakeSession(pub Rc<FakeHypervisor>);

impl Hypervisor for FakeSession {
    type Task = ScriptedTask;

    fn find_vm(&self, name: &str) -> Result<Option<VmHandle>, HypervisorError> {
        self.0.find_vm(name)
    }

    fn find_host(&self, name: &str) -> Result<Option<HostHandle>, HypervisorError> {
        self.0.find_host(name)
    }

    fn power_state(&self, vm: &VmHandle) -> Result<PowerState, HypervisorError> {
        self.0.power_state(vm)
    }

    fn is_template(&self, vm: &VmHandle) -> Result<bool, HypervisorError> {
        self.0.is_template(vm)
    }

    fn power_on(&self, vm: &VmHandle, host: &HostHandle) -> Result<Self::Task, HypervisorError> {
        self.0.power_on(vm, host)
    }

    fn migrate(&self, vm: &VmHandle, host: &HostHandle) -> Result<Self::Task, HypervisorError> {
        self.0.migrate(vm, host)
    }

    fn reconfigure(
        &self,
        vm: &VmHandle,
        spec: &ReconfigSpec,
    ) -> Result<Self::Task, HypervisorError> {
        self.0.reconfigure(vm, spec)
    }

    fn shutdown_guest(&self, vm: &VmHandle) -> Result<(), HypervisorError> {
        self.0.shutdown_guest(vm)
    }

    fn logout(&self) {
        self.0.logout();
    }
}

/// Hands out sessions over a shared endpoint, or refuses to connect.
#[derive(Debug, Default)]
pub struct FakeConnector {
    hypervisor: Rc<FakeHypervisor>,
    fail_with: Option<String>,
}

impl FakeConnector {
    pub fn new(hypervisor: Rc<FakeHypervisor>) -> Self {
        Self {
            hypervisor,
            fail_with: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            hypervisor: Rc::new(FakeHypervisor::new()),
            fail_with: Some(message.into()),
        }
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    fn connect(
        &self,
        _values: &AccountValues,
        _settings: &ConnectSettings,
    ) -> Result<Self::Session, HypervisorError> {
        if let Some(message) = &self.fail_with {
            return Err(HypervisorError::Connection(message.clone()));
        }
        Ok(FakeSession(Rc::clone(&self.hypervisor)))
    }
}

/// Records requested sleeps instead of blocking. Clones share the
/// recording, so a test can keep a handle after handing one to an
/// executor.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleep {
    pub sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl Sleep for RecordingSleep {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_queues_repeat_their_last_entry() {
        let task = ScriptedTask::new()
            .then_state(Ok(TaskState::Running))
            .then_state(Ok(TaskState::Success));
        assert_eq!(task.state().unwrap(), TaskState::Running);
        assert_eq!(task.state().unwrap(), TaskState::Success);
        assert_eq!(task.state().unwrap(), TaskState::Success);
    }

    #[test]
    fn invalid_state_failures_run_out() {
        let hv = FakeHypervisor::new()
            .with_vm("vm-1", FakeVm::powered(PowerState::PoweredOff))
            .with_host("host-1")
            .with_task(ScriptedTask::running_to_success([50]))
            .with_invalid_state_failures(1);
        let vm = VmHandle("vm-1".into());
        let host = HostHandle("host-1".into());
        assert!(matches!(
            hv.power_on(&vm, &host),
            Err(HypervisorError::InvalidState(_))
        ));
        assert!(hv.power_on(&vm, &host).is_ok());
    }
}
