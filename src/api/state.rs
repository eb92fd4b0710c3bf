use crate::scheduler::{DailyTrigger, RunHistory};

#[derive(Clone)]
pub struct AppState {
    pub history: RunHistory,
    pub trigger: DailyTrigger,
}
