pub mod config;
pub mod error;
pub mod http;
pub mod permission;
pub mod recognition;
pub mod session;

pub use config::Config;
pub use error::{DeviceError, ScanError};
pub use http::{create_router, AppState};
pub use permission::{PermissionConfig, PermissionProvider, PermissionStatus, StaticPermissions};
pub use recognition::{
    DecodeEvent, DecodeInjector, ManualSource, RecognitionSource, ReplayEntry, ReplaySource,
    SourceConfig, SourceFactory, SourceKind, Symbology, UnavailableSource,
};
pub use session::{
    DebouncePolicy, FailureReason, IgnoreReason, IntentOutcome, ScanController, ScanResult,
    SessionConfig, SessionSnapshot, SessionState, SessionStats,
};
