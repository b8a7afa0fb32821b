// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the scene importer.

use crate::scene::SceneError;
use ifc_scene_core::EntityId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Import error types.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Source model error: {0}")]
    Source(#[from] ifc_scene_core::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] ifc_scene_geometry::Error),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed diff snapshot {path}: {source}")]
    MalformedDiff {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed schema metadata: {0}")]
    MalformedSchema(#[source] serde_json::Error),

    #[error("No input file configured")]
    MissingInput,

    #[error("Source model has no IfcProject")]
    MissingProject,

    #[error("Spatial name {name} used by #{first} and #{duplicate}")]
    DuplicateSpatialName {
        name: String,
        first: EntityId,
        duplicate: EntityId,
    },
}
