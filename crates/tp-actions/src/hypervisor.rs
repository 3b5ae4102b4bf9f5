//! Traits abstracting the remote virtualization endpoint.
//!
//! Executors speak to these traits only, so tests can substitute the
//! scripted doubles in [`crate::fake`] for a live connection.

use std::time::Duration;

use thiserror::Error;
use tp_common::account::AccountValues;

/// Errors surfaced by a hypervisor session.
///
/// Variants carry owned strings so scripted test doubles can clone
/// pre-built errors out of their queues.
#[derive(Debug, Clone, Error)]
pub enum HypervisorError {
    /// The entity is in a state that does not allow the operation yet.
    /// Initiation retries on this variant and nothing else.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The remote endpoint rejected or failed the request.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("timed out after {ticks} poll intervals")]
    Timeout { ticks: u32 },
}

impl HypervisorError {
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }
}

/// Lifecycle states reported by a remote task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Error,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Power state of a virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PoweredOn => "powered on",
            Self::PoweredOff => "powered off",
            Self::Suspended => "suspended",
        };
        f.write_str(name)
    }
}

/// Opaque handle to a virtual machine within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmHandle(pub String);

/// Opaque handle to a host within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostHandle(pub String);

/// Hardware change applied by a reconfigure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconfigSpec {
    pub num_cpus: u32,
}

/// Connection parameters independent of credentials.
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    pub connect_timeout: Duration,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
        }
    }
}

/// A long-running operation on the remote endpoint, polled for state
/// and percent progress.
pub trait RemoteTask {
    fn state(&self) -> Result<TaskState, HypervisorError>;

    /// Percent complete as reported by the endpoint, 0 to 100.
    fn progress(&self) -> Result<u32, HypervisorError>;
}

/// An authenticated session with a virtualization endpoint.
pub trait Hypervisor {
    type Task: RemoteTask;

    /// Look up a virtual machine by display name.
    fn find_vm(&self, name: &str) -> Result<Option<VmHandle>, HypervisorError>;

    /// Look up a host by display name.
    fn find_host(&self, name: &str) -> Result<Option<HostHandle>, HypervisorError>;

    fn power_state(&self, vm: &VmHandle) -> Result<PowerState, HypervisorError>;

    fn is_template(&self, vm: &VmHandle) -> Result<bool, HypervisorError>;

    fn power_on(&self, vm: &VmHandle, host: &HostHandle) -> Result<Self::Task, HypervisorError>;

    fn migrate(&self, vm: &VmHandle, host: &HostHandle) -> Result<Self::Task, HypervisorError>;

    fn reconfigure(&self, vm: &VmHandle, spec: &ReconfigSpec)
        -> Result<Self::Task, HypervisorError>;

    /// Ask the guest OS to shut down. Returns once the request is
    /// accepted, not once the guest is off.
    fn shutdown_guest(&self, vm: &VmHandle) -> Result<(), HypervisorError>;

    /// Release the session. Safe to call on any exit path.
    fn logout(&self);
}

/// Opens sessions against a target described by account values.
pub trait Connector {
    type Session: Hypervisor;

    fn connect(
        &self,
        values: &AccountValues,
        settings: &ConnectSettings,
    ) -> Result<Self::Session, HypervisorError>;
}
