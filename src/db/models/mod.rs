pub mod session;
pub mod task;

pub use session::{PomodoroSession, Round, RoundUpdate, SessionUpdate};
pub use task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatistics};
