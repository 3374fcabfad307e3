pub mod diagnose;
pub mod redact;

pub use diagnose::{diagnose, Diagnosis, RolePreset};
pub use redact::log_excerpt;
