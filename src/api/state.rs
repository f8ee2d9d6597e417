use std::sync::Arc;

use crate::cache::StatCache;
use crate::source::MatchSource;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<StatCache>,
    /// Live lookups for per-player reports, bypassing the cache
    pub source: Arc<dyn MatchSource>,
}
