//! Application state: the process-wide gateway and the in-memory session store.
//!
//! This module owns:
//!   - the AI gateway (one model client built at startup, never torn down)
//!   - sessions created over HTTP, keyed by id
//!
//! WebSocket connections build their own private session and never register it here.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{load_tutor_config_from_env, Prompts};
use crate::gateway::{ContentModel, Gateway};
use crate::gemini::GeminiClient;
use crate::workflow::Session;

pub struct AppState<M> {
    pub gateway: Arc<Gateway<M>>,
    pub sessions: RwLock<HashMap<Uuid, Arc<Session<M>>>>,
}

impl AppState<GeminiClient> {
    /// Build state from env: load prompt overrides and init the Gemini client.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let prompts = load_tutor_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let gemini = GeminiClient::from_env()?;
        if gemini.is_configured() {
            info!(target: "dl_tutor_backend", base_url = %gemini.base_url, model = %gemini.model, "Gemini enabled.");
        } else {
            info!(target: "dl_tutor_backend", model = %gemini.model, "GEMINI_API_KEY not set; generation requests will report a missing key.");
        }

        Ok(Self::new(gemini, prompts))
    }
}

impl<M: ContentModel> AppState<M> {
    pub fn new(model: M, prompts: Prompts) -> Self {
        Self {
            gateway: Arc::new(Gateway::new(model, prompts)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// A fresh session sharing the process-wide gateway.
    pub fn new_session(&self) -> Arc<Session<M>> {
        Arc::new(Session::new(self.gateway.clone()))
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&self) -> (Uuid, Arc<Session<M>>) {
        let id = Uuid::new_v4();
        let session = self.new_session();
        self.sessions.write().await.insert(id, session.clone());
        info!(target: "tutor", session_id = %id, "Session created");
        (id, session)
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_session(&self, id: Uuid) -> Option<Arc<Session<M>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Drop a session. Any call it has in flight still runs to completion.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_session(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(target: "tutor", session_id = %id, "Session removed");
        }
        removed
    }
}
