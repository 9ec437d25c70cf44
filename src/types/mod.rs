// ABOUTME: Validated domain types for applications and releases.
// ABOUTME: Newtypes prevent raw strings from leaking into filesystem paths.

mod app_name;
mod release_id;

pub use app_name::{AppName, AppNameError};
pub use release_id::{ReleaseId, ReleaseIdError};
