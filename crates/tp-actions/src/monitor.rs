//! Remote task polling with a bounded tick budget.
//!
//! A monitored task is polled once per interval. Remote percent
//! progress is scaled into the slice of the overall action the task
//! represents, so a reconfigure that owns 50 points of a 100-point
//! action reports 20..=70 while the endpoint reports 0..=100.

use std::time::Duration;

use tracing::{debug, warn};

use crate::hypervisor::{RemoteTask, TaskState};
use crate::progress::ProgressSink;
use tp_common::response::{ActionResult, ActionState};

/// Clock seam so tests run without real delays.
pub trait Sleep {
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Polling parameters.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Delay between polls.
    pub interval: Duration,
    /// Total polls before the task is declared lost.
    pub max_ticks: u32,
    /// Consecutive read failures tolerated before giving up. The
    /// counter resets on any successful poll.
    pub max_poll_failures: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_ticks: 60,
            max_poll_failures: 3,
        }
    }
}

/// Describes the slice of the overall action this task covers.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    pub target_name: &'a str,
    pub action: &'a str,
    /// Progress already accumulated before this task started.
    pub start_progress: u32,
    /// Points this task contributes when it completes.
    pub progress_range: u32,
}

impl TaskContext<'_> {
    fn scaled(&self, remote_percent: u32) -> u32 {
        let span = u64::from(self.progress_range) * u64::from(remote_percent.min(100)) / 100;
        self.start_progress + span as u32
    }
}

/// Poll `task` until it reaches a terminal state or the tick budget
/// runs out. Emits scaled progress through `sink` on each poll.
pub fn monitor_task<T: RemoteTask>(
    task: &T,
    ctx: &TaskContext<'_>,
    config: &MonitorConfig,
    sleep: &dyn Sleep,
    sink: &mut dyn ProgressSink,
) -> ActionResult {
    let mut failures = 0u32;
    for tick in 0..config.max_ticks {
        sleep.sleep(config.interval);
        match poll_once(task, ctx, sink) {
            Ok(Some(result)) => return result,
            Ok(None) => failures = 0,
            Err(err) => {
                failures += 1;
                warn!(
                    target = ctx.target_name,
                    action = ctx.action,
                    tick,
                    failures,
                    error = %err,
                    "task poll failed"
                );
                if failures >= config.max_poll_failures {
                    return ActionResult::failed(err.to_string());
                }
            }
        }
    }
    ActionResult::failed("cannot find a valid task")
}

fn poll_once<T: RemoteTask>(
    task: &T,
    ctx: &TaskContext<'_>,
    sink: &mut dyn ProgressSink,
) -> Result<Option<ActionResult>, crate::hypervisor::HypervisorError> {
    let state = task.state()?;
    match state {
        TaskState::Queued => {
            sink.update(
                ActionState::Queued,
                ctx.start_progress,
                &format!("{} of {} is queued", ctx.action, ctx.target_name),
            );
            Ok(None)
        }
        TaskState::Running => {
            let remote = task.progress()?;
            let scaled = ctx.scaled(remote);
            debug!(
                target = ctx.target_name,
                action = ctx.action,
                remote,
                scaled,
                "task in progress"
            );
            sink.update(
                ActionState::InProgress,
                scaled,
                &format!("Action in progress - {scaled}%"),
            );
            Ok(None)
        }
        TaskState::Success => {
            let final_progress = ctx.start_progress + ctx.progress_range;
            sink.update(
                ActionState::InProgress,
                final_progress,
                &format!("Action in progress - {final_progress}%"),
            );
            Ok(Some(ActionResult::succeeded(format!(
                "{} of {} completed - 100%",
                ctx.action, ctx.target_name
            ))))
        }
        TaskState::Error => Ok(Some(ActionResult::failed(format!(
            "{} of {} failed",
            ctx.action, ctx.target_name
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{RecordingSleep, ScriptedTask};
    use crate::hypervisor::HypervisorError;
    use crate::progress::RecordingSink;

    fn ctx<'a>() -> TaskContext<'a> {
        TaskContext {
            target_name: "vm-1",
            action: "Start",
            start_progress: 20,
            progress_range: 40,
        }
    }

    fn fast_config(max_ticks: u32) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_millis(1),
            max_ticks,
            max_poll_failures: 3,
        }
    }

    #[test]
    fn scales_remote_progress_into_slice() {
        // Queued twice, running at 50 percent, then success. With a
        // start of 20 and a range of 40 the sink must see 20 20 40 60.
        let task = ScriptedTask::new()
            .then_state(Ok(TaskState::Queued))
            .then_state(Ok(TaskState::Queued))
            .then_state(Ok(TaskState::Running))
            .then_state(Ok(TaskState::Success))
            .then_progress(Ok(50));
        let mut sink = RecordingSink::new();
        let result = monitor_task(
            &task,
            &ctx(),
            &fast_config(60),
            &RecordingSleep::default(),
            &mut sink,
        );
        assert!(!result.is_failed());
        assert_eq!(sink.progress_values(), vec![20, 20, 40, 60]);
        assert_eq!(sink.updates[0].state, ActionState::Queued);
        assert_eq!(sink.updates[3].state, ActionState::InProgress);
    }

    #[test]
    fn tick_budget_exhaustion_fails() {
        // A task that never leaves Running burns the whole budget.
        let task = ScriptedTask::new().then_state(Ok(TaskState::Running)).then_progress(Ok(10));
        let sleep = RecordingSleep::default();
        let mut sink = RecordingSink::new();
        let result = monitor_task(&task, &ctx(), &fast_config(3), &sleep, &mut sink);
        assert!(result.is_failed());
        assert_eq!(result.description, "cannot find a valid task");
        assert_eq!(sleep.sleeps.borrow().len(), 3);
        assert_eq!(sink.updates.len(), 3);
    }

    #[test]
    fn consecutive_read_failures_abort() {
        let task = ScriptedTask::new()
            .then_state(Err(HypervisorError::Remote("flaky".into())));
        let mut sink = RecordingSink::new();
        let result = monitor_task(
            &task,
            &ctx(),
            &fast_config(60),
            &RecordingSleep::default(),
            &mut sink,
        );
        assert!(result.is_failed());
        assert!(result.description.contains("flaky"));
        assert!(sink.updates.is_empty());
    }

    #[test]
    fn failure_counter_resets_on_successful_poll() {
        // Two failures, one good poll, two more failures, then
        // success. The bound of three is never reached because the
        // good poll resets the counter.
        let task = ScriptedTask::new()
            .then_state(Err(HypervisorError::Remote("blip".into())))
            .then_state(Err(HypervisorError::Remote("blip".into())))
            .then_state(Ok(TaskState::Queued))
            .then_state(Err(HypervisorError::Remote("blip".into())))
            .then_state(Err(HypervisorError::Remote("blip".into())))
            .then_state(Ok(TaskState::Success));
        let mut sink = RecordingSink::new();
        let result = monitor_task(
            &task,
            &ctx(),
            &fast_config(60),
            &RecordingSleep::default(),
            &mut sink,
        );
        assert!(!result.is_failed());
    }
}
