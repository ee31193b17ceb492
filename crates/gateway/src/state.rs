use std::sync::Arc;

use dn_classifier::ClassifierClient;
use dn_domain::config::Config;
use dn_store::Store;

use crate::identity::IdentityService;
use crate::pipeline::IngestPipeline;

/// Shared application state passed to all API handlers.
///
/// Everything is constructed once at startup and injected; handlers never
/// reach for globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub classifier: Arc<ClassifierClient>,
    pub identity: Arc<IdentityService>,
    pub pipeline: Arc<IngestPipeline>,
}
