// Before-write persistence hooks, invoked synchronously by the repository
// inside the surrounding transaction.

pub mod preset;
pub mod version_lock;

pub use preset::{default_preset_fields, ApplyOn, ContextKey, PresetField, WriteEvent};
pub use version_lock::VersionConflict;
