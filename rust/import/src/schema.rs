// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema metadata
//!
//! Per entity type, the ordered list of attribute names (inherited attributes
//! first), matching the positional attributes of a STEP instance. Used to turn
//! an entity into a flat name → scalar mapping on the scene object.
//!
//! JSON format:
//!
//! ```json
//! {"IfcWall": {"attributes": [{"name": "GlobalId"}, {"name": "OwnerHistory"}]}}
//! ```

use crate::error::{ImportError, Result};
use ifc_scene_core::{AttributeValue, DecodedEntity, IfcType};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AttributeSchema {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EntitySchema {
    attributes: Vec<AttributeSchema>,
}

/// A scalar attribute value recorded on a scene object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
}

impl ScalarValue {
    /// Scalar view of an attribute; references, lists and nulls have none
    pub fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::String(s) => Some(Self::Text(s.clone())),
            AttributeValue::Integer(i) => Some(Self::Integer(*i)),
            AttributeValue::Float(f) => Some(Self::Real(*f)),
            AttributeValue::Enum(e) => Some(match e.as_str() {
                "T" | "TRUE" => Self::Boolean(true),
                "F" | "FALSE" => Self::Boolean(false),
                _ => Self::Text(e.clone()),
            }),
            AttributeValue::Typed(_, inner) => Self::from_attribute(inner),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Ordered attribute names per entity type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaCatalog {
    entities: FxHashMap<String, Vec<String>>,
}

const ROOT: &[&str] = &["GlobalId", "OwnerHistory", "Name", "Description"];
const PRODUCT: &[&str] = &["ObjectType", "ObjectPlacement", "Representation"];
const ELEMENT: &[&str] = &["Tag"];
const SPATIAL: &[&str] = &["LongName", "CompositionType"];

/// IFC4 element types whose only own attribute is `PredefinedType`
const TYPED_ELEMENTS: &[&str] = &[
    "IfcWall",
    "IfcSlab",
    "IfcBeam",
    "IfcColumn",
    "IfcRoof",
    "IfcStair",
    "IfcRamp",
    "IfcRampFlight",
    "IfcRailing",
    "IfcCurtainWall",
    "IfcPlate",
    "IfcMember",
    "IfcFooting",
    "IfcCovering",
    "IfcChimney",
    "IfcShadingDevice",
    "IfcBuildingElementProxy",
    "IfcBuildingElementPart",
    "IfcDiscreteAccessory",
    "IfcFastener",
    "IfcVibrationIsolator",
    "IfcOpeningElement",
    "IfcVoidingFeature",
    "IfcProjectionElement",
    "IfcSurfaceFeature",
    "IfcFurniture",
    "IfcSystemFurnitureElement",
    "IfcGeographicElement",
    "IfcTransportElement",
    "IfcActuator",
    "IfcAlarm",
    "IfcController",
    "IfcFlowInstrument",
    "IfcProtectiveDeviceTrippingUnit",
    "IfcSensor",
    "IfcUnitaryControlElement",
    "IfcDistributionChamberElement",
    "IfcAirToAirHeatRecovery",
    "IfcBoiler",
    "IfcBurner",
    "IfcChiller",
    "IfcCoil",
    "IfcCondenser",
    "IfcCooledBeam",
    "IfcCoolingTower",
    "IfcElectricGenerator",
    "IfcElectricMotor",
    "IfcEngine",
    "IfcEvaporativeCooler",
    "IfcEvaporator",
    "IfcHeatExchanger",
    "IfcHumidifier",
    "IfcMotorConnection",
    "IfcSolarDevice",
    "IfcTransformer",
    "IfcTubeBundle",
    "IfcUnitaryEquipment",
    "IfcAirTerminalBox",
    "IfcDamper",
    "IfcElectricDistributionBoard",
    "IfcElectricTimeControl",
    "IfcFlowMeter",
    "IfcProtectiveDevice",
    "IfcSwitchingDevice",
    "IfcValve",
    "IfcCableCarrierFitting",
    "IfcCableFitting",
    "IfcDuctFitting",
    "IfcJunctionBox",
    "IfcPipeFitting",
    "IfcCompressor",
    "IfcFan",
    "IfcPump",
    "IfcCableCarrierSegment",
    "IfcCableSegment",
    "IfcDuctSegment",
    "IfcPipeSegment",
    "IfcElectricFlowStorageDevice",
    "IfcTank",
    "IfcAirTerminal",
    "IfcAudioVisualAppliance",
    "IfcCommunicationsAppliance",
    "IfcElectricAppliance",
    "IfcFireSuppressionTerminal",
    "IfcLamp",
    "IfcLightFixture",
    "IfcMedicalDevice",
    "IfcOutlet",
    "IfcSanitaryTerminal",
    "IfcSpaceHeater",
    "IfcStackTerminal",
    "IfcWasteTerminal",
    "IfcDuctSilencer",
    "IfcFilter",
    "IfcInterceptor",
];

/// IFC4 element supertypes and elements without own attributes
const PLAIN_ELEMENTS: &[&str] = &[
    "IfcElement",
    "IfcBuildingElement",
    "IfcCivilElement",
    "IfcVirtualElement",
    "IfcElementComponent",
    "IfcFeatureElement",
    "IfcFeatureElementAddition",
    "IfcFeatureElementSubtraction",
    "IfcFurnishingElement",
    "IfcDistributionElement",
    "IfcDistributionControlElement",
    "IfcDistributionFlowElement",
    "IfcEnergyConversionDevice",
    "IfcFlowController",
    "IfcFlowFitting",
    "IfcFlowMovingDevice",
    "IfcFlowSegment",
    "IfcFlowStorageDevice",
    "IfcFlowTerminal",
    "IfcFlowTreatmentDevice",
];

impl SchemaCatalog {
    /// Built-in IFC4 catalog of the `IfcElement` tree and `IfcSpace`
    ///
    /// Subtypes adding no attributes of their own (the `StandardCase` types,
    /// for instance) are left out and resolve through their supertype.
    pub fn ifc4() -> Self {
        let element = |own: &[&str]| -> Vec<String> {
            [ROOT, PRODUCT, ELEMENT, own]
                .concat()
                .into_iter()
                .map(String::from)
                .collect()
        };

        let mut entities = FxHashMap::default();
        for name in TYPED_ELEMENTS {
            entities.insert(name.to_string(), element(&["PredefinedType"]));
        }
        for name in PLAIN_ELEMENTS {
            entities.insert(name.to_string(), element(&[]));
        }
        entities.insert(
            "IfcPile".to_string(),
            element(&["PredefinedType", "ConstructionType"]),
        );
        entities.insert(
            "IfcStairFlight".to_string(),
            element(&[
                "NumberOfRisers",
                "NumberOfTreads",
                "RiserHeight",
                "TreadLength",
                "PredefinedType",
            ]),
        );
        entities.insert(
            "IfcDoor".to_string(),
            element(&[
                "OverallHeight",
                "OverallWidth",
                "PredefinedType",
                "OperationType",
                "UserDefinedOperationType",
            ]),
        );
        entities.insert(
            "IfcWindow".to_string(),
            element(&[
                "OverallHeight",
                "OverallWidth",
                "PredefinedType",
                "PartitioningType",
                "UserDefinedPartitioningType",
            ]),
        );
        entities.insert(
            "IfcElementAssembly".to_string(),
            element(&["AssemblyPlace", "PredefinedType"]),
        );
        entities.insert(
            "IfcMechanicalFastener".to_string(),
            element(&["NominalDiameter", "NominalLength", "PredefinedType"]),
        );
        entities.insert("IfcReinforcingElement".to_string(), element(&["SteelGrade"]));
        entities.insert(
            "IfcTendonAnchor".to_string(),
            element(&["SteelGrade", "PredefinedType"]),
        );
        entities.insert(
            "IfcReinforcingBar".to_string(),
            element(&[
                "SteelGrade",
                "NominalDiameter",
                "CrossSectionArea",
                "BarLength",
                "PredefinedType",
                "BarSurface",
            ]),
        );
        entities.insert(
            "IfcReinforcingMesh".to_string(),
            element(&[
                "SteelGrade",
                "MeshLength",
                "MeshWidth",
                "LongitudinalBarNominalDiameter",
                "TransverseBarNominalDiameter",
                "LongitudinalBarCrossSectionArea",
                "TransverseBarCrossSectionArea",
                "LongitudinalBarSpacing",
                "TransverseBarSpacing",
                "PredefinedType",
            ]),
        );
        entities.insert(
            "IfcTendon".to_string(),
            element(&[
                "SteelGrade",
                "PredefinedType",
                "NominalDiameter",
                "CrossSectionArea",
                "TensionForce",
                "PreStress",
                "FrictionCoefficient",
                "AnchorageSlip",
                "MinCurvatureRadius",
            ]),
        );
        entities.insert(
            "IfcSpace".to_string(),
            [ROOT, PRODUCT, SPATIAL, &["PredefinedType", "ElevationWithFlooring"]]
                .concat()
                .into_iter()
                .map(String::from)
                .collect(),
        );

        Self { entities }
    }

    /// Parse a JSON catalog
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: FxHashMap<String, EntitySchema> =
            serde_json::from_str(json).map_err(ImportError::MalformedSchema)?;
        let entities = raw
            .into_iter()
            .map(|(name, schema)| {
                let attributes = schema.attributes.into_iter().map(|a| a.name).collect();
                (name, attributes)
            })
            .collect();
        Ok(Self { entities })
    }

    /// Read a JSON catalog from disk
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Number of entity types described
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Ordered attribute names of `type_name` (e.g. `IfcWall`)
    pub fn attributes(&self, type_name: &str) -> Option<&[String]> {
        self.entities.get(type_name).map(Vec::as_slice)
    }

    /// Attribute names for `ifc_type`, or for its nearest catalogued supertype
    ///
    /// Inherited attributes come first in STEP order, so a supertype's list
    /// still names the leading attributes of a subtype.
    pub fn resolve(&self, ifc_type: IfcType) -> Option<&[String]> {
        ifc_type.ancestry().find_map(|t| self.attributes(t.name()))
    }

    /// Scalar attributes of `entity` declared by its schema, in schema order
    ///
    /// Null, reference and list values are left out; types with no catalogued
    /// supertype yield nothing.
    pub fn scalar_attributes(&self, entity: &DecodedEntity) -> Vec<(String, ScalarValue)> {
        let Some(names) = self.resolve(entity.ifc_type) else {
            tracing::debug!(entity = entity.id, ifc_type = %entity.ifc_type, "No schema for entity type");
            return Vec::new();
        };
        names
            .iter()
            .zip(&entity.attributes)
            .filter_map(|(name, value)| {
                ScalarValue::from_attribute(value).map(|scalar| (name.clone(), scalar))
            })
            .collect()
    }
}
