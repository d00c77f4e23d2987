use crate::advisory::AdvisoryProvider;
use crate::storage::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub advisory: Arc<dyn AdvisoryProvider>,
}

impl AppState {
    pub fn new(store: Store, advisory: Arc<dyn AdvisoryProvider>) -> Self {
        Self { store, advisory }
    }
}
