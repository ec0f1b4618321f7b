use crate::recognition::DecodeInjector;
use crate::session::ScanController;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Controller for the scan session served by this process
    pub controller: ScanController,

    /// Present when the recognition source accepts injected events
    pub injector: Option<DecodeInjector>,
}

impl AppState {
    pub fn new(controller: ScanController, injector: Option<DecodeInjector>) -> Self {
        Self {
            controller,
            injector,
        }
    }
}
