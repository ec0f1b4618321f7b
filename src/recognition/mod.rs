pub mod backend;
pub mod manual;
pub mod replay;
pub mod unavailable;

pub use backend::{
    DecodeEvent, RecognitionSource, SourceConfig, SourceFactory, SourceKind, Symbology,
};
pub use manual::{DecodeInjector, ManualSource};
pub use replay::{ReplayEntry, ReplaySource};
pub use unavailable::UnavailableSource;
