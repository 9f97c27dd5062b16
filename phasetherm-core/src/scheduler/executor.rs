//! Deadline table for the control tasks

use crate::config::SchedulerConfig;
use crate::Instant;

/// Number of scheduled tasks
pub const TASK_COUNT: usize = 5;

/// Scheduled tasks, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskId {
    /// Edge observation and pulse timing
    ZeroCross,
    /// Temperature read and PID tick
    Maintain,
    /// Tuning sample, only during a session
    Autotune,
    /// Drain one pending command
    CommandIntake,
    /// Push buffered journal records to the sink
    JournalFlush,
}

impl TaskId {
    /// All tasks in priority order
    pub const ALL: [TaskId; TASK_COUNT] = [
        TaskId::ZeroCross,
        TaskId::Maintain,
        TaskId::Autotune,
        TaskId::CommandIntake,
        TaskId::JournalFlush,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct TaskSlot {
    interval_us: u64,
    next_due: Instant,
    active: bool,
}

/// Per-task deadlines with fixed-delay rescheduling
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    slots: [TaskSlot; TASK_COUNT],
}

impl TaskScheduler {
    /// Create the table with every task but auto-tune due at `now`
    pub fn new(config: &SchedulerConfig, now: Instant) -> Self {
        let ms = |v: u32| u64::from(v) * 1_000;
        let slot = |interval_us: u64, active: bool| TaskSlot {
            interval_us,
            next_due: now,
            active,
        };
        Self {
            slots: [
                slot(u64::from(config.zero_cross_poll_us), true),
                slot(ms(config.maintain_interval_ms), true),
                slot(ms(config.autotune_interval_ms), false),
                slot(ms(config.command_interval_ms), true),
                slot(ms(config.flush_interval_ms), true),
            ],
        }
    }

    /// Check if a task is active and due
    pub fn is_due(&self, id: TaskId, now: Instant) -> bool {
        let slot = &self.slots[id.index()];
        slot.active && slot.next_due <= now
    }

    /// Mark a task run finished; it is due again one interval later
    pub fn complete(&mut self, id: TaskId, now: Instant) {
        let slot = &mut self.slots[id.index()];
        slot.next_due = now.saturating_add(slot.interval_us);
    }

    /// Postpone a task to an explicit time
    pub fn defer(&mut self, id: TaskId, until: Instant) {
        self.slots[id.index()].next_due = until;
    }

    /// Enable a task, first due at `due`
    pub fn activate(&mut self, id: TaskId, due: Instant) {
        let slot = &mut self.slots[id.index()];
        slot.active = true;
        slot.next_due = due;
    }

    /// Disable a task
    pub fn deactivate(&mut self, id: TaskId) {
        self.slots[id.index()].active = false;
    }

    /// Disable every task
    pub fn deactivate_all(&mut self) {
        for slot in &mut self.slots {
            slot.active = false;
        }
    }

    /// Check if a task is enabled
    pub fn is_active(&self, id: TaskId) -> bool {
        self.slots[id.index()].active
    }

    /// Earliest deadline among active tasks
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots
            .iter()
            .filter(|slot| slot.active)
            .map(|slot| slot.next_due)
            .min()
    }
}
