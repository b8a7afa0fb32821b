// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::EntityId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for source model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading or querying an IFC source model
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error at byte {position}: {message}")]
    ParseError { position: usize, message: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing DATA section")]
    MissingDataSection,

    #[error("Entity #{0} not found")]
    EntityNotFound(EntityId),

    #[error("Entity #{id}: expected {expected}, got {actual}")]
    UnexpectedType {
        id: EntityId,
        expected: &'static str,
        actual: String,
    },

    #[error("Invalid unit assignment: {0}")]
    InvalidUnits(String),
}

impl Error {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            position,
            message: message.into(),
        }
    }

    pub fn units(message: impl Into<String>) -> Self {
        Self::InvalidUnits(message.into())
    }
}
