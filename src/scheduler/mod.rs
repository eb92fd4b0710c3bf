//! Scheduled execution of detection runs.

pub mod cron;
pub mod engine;
pub mod history;

pub use self::cron::DailyTrigger;
pub use self::engine::run_scheduler_loop;
pub use self::history::RunHistory;
