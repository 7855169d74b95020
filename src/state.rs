use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    engine::{ComposerPolicy, CurriculumPattern, ExamComposer},
    services::drafts::DraftRegistry,
    store::{ExamStore, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub exams: Arc<dyn ExamStore>,
    pub pattern: Arc<CurriculumPattern>,
    pub drafts: Arc<DraftRegistry>,
    pub config: Config,
}

impl AppState {
    /// A fresh composer wired to the configured pattern and policy.
    pub fn new_composer(&self) -> ExamComposer {
        ExamComposer::new(self.pattern.clone(), self.policy())
    }

    pub fn policy(&self) -> ComposerPolicy {
        self.config.composer_policy
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<CurriculumPattern> {
    fn from_ref(state: &AppState) -> Self {
        state.pattern.clone()
    }
}

impl FromRef<AppState> for Arc<dyn UserStore> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ExamStore> {
    fn from_ref(state: &AppState) -> Self {
        state.exams.clone()
    }
}

impl FromRef<AppState> for Arc<DraftRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.drafts.clone()
    }
}
