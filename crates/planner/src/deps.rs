//! Composition root for the planner's collaborators: constructed once at
//! startup and passed by reference into the Pipeline Planner; tests
//! substitute stubs here.

use std::sync::Arc;

use ceci_cache::ResponseCache;
use ceci_dispatch::StageDispatcher;
use ceci_domain::config::Config;
use ceci_store::ConversationStore;

#[derive(Clone)]
pub struct PlannerDeps {
    pub config: Arc<Config>,
    pub store: Arc<ConversationStore>,
    pub cache: Arc<ResponseCache>,
    pub dispatcher: Arc<StageDispatcher>,
}
