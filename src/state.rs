// src/state.rs

use std::sync::Arc;

use crate::{auth::CredentialVerifier, config::Config, store::QuestionStore};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub store: QuestionStore,
    pub config: Config,
    pub verifier: Arc<dyn CredentialVerifier>,
}

impl FromRef<AppState> for QuestionStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn CredentialVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
