pub mod catalog;
pub mod domain;
pub mod export;
pub mod import;
pub mod ports;
pub mod store;
pub mod tracker;

pub use domain::{
    Goals, Milestone, MilestoneDraft, Profile, ProfileDraft, Role, Session, SessionDraft, SmartGoal,
};
pub use export::{build_export_document, export_filename, ExportDocument, EXPORT_VERSION};
pub use import::{
    apply_import, inspect, parse_import, validate, ImportError, ImportPolicy, ImportPreview,
    ImportSummary, ValidationReport,
};
pub use ports::{LocalStore, PortError, PortResult, RecordKey, StoreOp};
pub use store::{MemoryStore, RecordStore};
pub use tracker::{Limits, ProfileContext, TrackerError, TrackerResult};
