//! # voicedeploy-store
//!
//! Typed documents that a deployment keeps in its working directory.
//!
//! Every step of a deployment hands its results to the next one through
//! small JSON files (plus a CSV agent roster). This crate owns their shapes
//! and the load/save rules for them.
//!
//! ## Key Types
//!
//! - [`ConfigStore`] - Load and save documents rooted at a working directory
//! - [`Document`] - Trait tying a struct to its file name and required fields
//! - [`TenantConfig`], [`InstanceReference`], [`SecurityProfileReference`],
//!   [`HoursOfOperation`], [`IvrMessages`], [`SurveyMessages`] - The documents
//! - [`AgentRoster`] - The `agents.csv` roster
//! - [`DeployParameters`] - Values handed to the infrastructure tool
//!
//! ## Loading
//!
//! Documents are checked for their required top-level fields before they are
//! deserialized, so a hand-edited file with a missing key fails at load time
//! with [`StoreError::MissingField`] naming the key.

mod clean;
mod document;
mod error;
mod naming;
mod params;
mod roster;
mod store;

pub use clean::{
    clean, clear_form_files, remove_listed, CleanReport, FORM_CLEAR_FILES, GENERATED_FILES,
};
pub use document::{
    arn_prefix, Document, HoursOfOperation, InstanceReference, IvrMessages,
    SecurityProfileReference, SurveyMessages, TenantConfig, TimeSlice,
};
pub use error::StoreError;
pub use naming::{is_valid_stack_name, sanitize_stack_name, stack_name_for, DEFAULT_STACK_NAME};
pub use params::{DeployParameters, PLACEHOLDER_VOICE};
pub use roster::{AgentRecord, AgentRoster, ROSTER_FILE};
pub use store::{load_from, save_to, ConfigStore};
