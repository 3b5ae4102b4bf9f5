//! Action execution against a remote hypervisor.
//!
//! One action call drives exactly one remote operation synchronously: the
//! executor initiates the operation through a [`Hypervisor`] seam, then the
//! task monitor polls the returned task handle to completion, translating
//! remote states into progress updates and a single terminal outcome.
//!
//! Remote calls, sleeping, and progress reporting all go through traits so
//! tests never touch a network or a wall clock.

pub mod executor;
pub mod fake;
pub mod hypervisor;
pub mod item;
pub mod monitor;
pub mod power;
pub mod progress;
pub mod retry;

pub use executor::{VmActionExecutor, NOT_IMPLEMENTED};
pub use hypervisor::{
    ConnectSettings, Connector, HostHandle, Hypervisor, HypervisorError, PowerState, ReconfigSpec,
    RemoteTask, TaskState, VmHandle,
};
pub use item::{ActionItem, ActionType, CommodityResize, EntityRef, ResizeAttribute};
pub use monitor::{monitor_task, MonitorConfig, Sleep, TaskContext, ThreadSleep};
pub use power::{wait_for_power_state, WaitConfig};
pub use progress::{NullSink, ProgressSink, ProgressUpdate, RecordingSink};
pub use retry::{initiate_with_retry, Initiation, RetryPolicy};
