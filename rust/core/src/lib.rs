// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Scene Core
//!
//! STEP/IFC source model built with [nom](https://docs.rs/nom).
//!
//! ## Overview
//!
//! - **STEP Tokenization**: zero-copy parsing of the `DATA;` section
//! - **Entity Model**: decoded entities indexed by id, in file order, with the
//!   inverse relations the scene importer walks
//! - **Units**: length unit scale from the file's unit assignment
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_scene_core::{IfcModel, IfcType, extract_length_unit_scale};
//!
//! let model = IfcModel::open("building.ifc")?;
//! let scale = extract_length_unit_scale(&model)?;
//!
//! for wall in model.by_type(IfcType::IfcWall) {
//!     println!("#{} {:?}", wall.id, wall.name());
//! }
//! ```

pub mod entity;
pub mod error;
pub mod model;
pub mod parser;
pub mod schema;
pub mod units;

/// STEP instance name (`#123`)
pub type EntityId = u64;

pub use entity::{AttributeValue, DecodedEntity};
pub use error::{Error, Result};
pub use model::IfcModel;
pub use parser::{parse_entity, EntityScanner, Token};
pub use schema::IfcType;
pub use units::{extract_length_unit_scale, get_si_prefix_multiplier};
