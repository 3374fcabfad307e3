pub mod flags;
pub mod resume;
pub mod suggestion;
