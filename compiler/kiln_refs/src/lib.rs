//! Kiln Refs - reference artifacts for the Kiln evaluator.
//!
//! An evaluation session needs two views of every dependency:
//!
//! - *execution artifacts*: implementation modules the engine runs
//! - *analysis artifacts*: reference modules editor queries read
//!
//! This crate discovers the installed shared frameworks that seed both views
//! and keeps them consistent as the session observes new modules.
//!
//! # Architecture
//!
//! ```text
//! FrameworkRequest ──► framework::discover() ──► SharedFrameworkDescriptor
//!                                                  │ (layers, base first)
//!                                                  ▼
//! execution artifacts ──► ReferenceService::reconcile() ──► analysis artifacts
//!                           │
//!                           └── cache: ArtifactPath → Reconciled
//! ```

pub mod artifact;
pub mod error;
pub mod framework;
pub mod identity;
pub mod reconcile;
pub mod version;

#[cfg(test)]
mod fixture;

pub use artifact::{ArtifactPath, ArtifactRole, ArtifactSet, ReferenceArtifact};
pub use error::ResolutionError;
pub use framework::{
    FrameworkRequest, FrameworkSearchPaths, SharedFrameworkDescriptor, BASE_FRAMEWORK,
};
pub use identity::{ModuleIdentity, MODULE_EXTENSION};
pub use reconcile::{Reconciled, ReferenceService};
pub use version::{select_version, FrameworkVersion};
