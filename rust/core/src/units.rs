// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit extraction and conversion for IFC files
//!
//! Derives the factor converting model length values to metres from the
//! file's `IfcUnitAssignment`, following conversion-based units down to
//! their SI base unit.

use crate::entity::DecodedEntity;
use crate::error::{Error, Result};
use crate::model::IfcModel;
use crate::schema::IfcType;

/// Maximum number of conversion hops before the chain is considered cyclic
const MAX_CONVERSION_DEPTH: usize = 16;

/// SI Prefix multipliers as defined in IFC specification
/// Maps IfcSIPrefix enum values to their numeric multipliers
#[inline]
pub fn get_si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "ATTO" => 1e-18,
        "FEMTO" => 1e-15,
        "PICO" => 1e-12,
        "NANO" => 1e-9,
        "MICRO" => 1e-6,
        "MILLI" => 1e-3,
        "CENTI" => 1e-2,
        "DECI" => 1e-1,
        "DECA" => 1e1,
        "HECTO" => 1e2,
        "KILO" => 1e3,
        "MEGA" => 1e6,
        "GIGA" => 1e9,
        "TERA" => 1e12,
        "PETA" => 1e15,
        "EXA" => 1e18,
        _ => 1.0,
    }
}

/// Extract the length unit scale factor of a model
///
/// Follows the chain: IFCUNITASSIGNMENT → (IFCCONVERSIONBASEDUNIT →
/// IFCMEASUREWITHUNIT)* → IFCSIUNIT, multiplying conversion factors and the
/// final SI prefix. Returns 1.0 when no length unit is declared.
///
/// # Errors
/// Fails when the model has no unit assignment or the conversion chain is
/// malformed.
pub fn extract_length_unit_scale(model: &IfcModel) -> Result<f64> {
    let assignment = model
        .by_type(IfcType::IfcUnitAssignment)
        .next()
        .ok_or_else(|| Error::units("model declares no IfcUnitAssignment"))?;

    // IFCUNITASSIGNMENT: 0 Units
    for unit_id in assignment.get_ref_list(0) {
        let unit = model.entity(unit_id)?;
        // Named units: 1 UnitType
        if unit.get_enum(1) == Some("LENGTHUNIT") {
            return length_unit_scale(model, unit);
        }
    }

    Ok(1.0)
}

fn length_unit_scale(model: &IfcModel, unit: &DecodedEntity) -> Result<f64> {
    let mut scale = 1.0;
    let mut current = unit;

    for _ in 0..MAX_CONVERSION_DEPTH {
        match current.ifc_type {
            // IFCSIUNIT: 0 Dimensions, 1 UnitType, 2 Prefix, 3 Name
            IfcType::IfcSIUnit => {
                let prefix = current.get_enum(2).map_or(1.0, get_si_prefix_multiplier);
                return Ok(scale * prefix);
            }
            // IFCCONVERSIONBASEDUNIT: 0 Dimensions, 1 UnitType, 2 Name, 3 ConversionFactor
            IfcType::IfcConversionBasedUnit => {
                let factor_id = current.get_ref(3).ok_or_else(|| {
                    Error::units(format!("#{} has no ConversionFactor", current.id))
                })?;
                let factor = model.entity(factor_id)?;
                if factor.ifc_type != IfcType::IfcMeasureWithUnit {
                    return Err(Error::UnexpectedType {
                        id: factor.id,
                        expected: "IfcMeasureWithUnit",
                        actual: factor.ifc_type.to_string(),
                    });
                }
                // IFCMEASUREWITHUNIT: 0 ValueComponent, 1 UnitComponent
                let value = factor.get_float(0).ok_or_else(|| {
                    Error::units(format!("#{} has no numeric ValueComponent", factor.id))
                })?;
                let next = factor.get_ref(1).ok_or_else(|| {
                    Error::units(format!("#{} has no UnitComponent", factor.id))
                })?;
                scale *= value;
                current = model.entity(next)?;
            }
            other => {
                return Err(Error::UnexpectedType {
                    id: current.id,
                    expected: "IfcSIUnit or IfcConversionBasedUnit",
                    actual: other.to_string(),
                })
            }
        }
    }

    Err(Error::units(format!(
        "conversion chain of #{} exceeds {} levels",
        unit.id, MAX_CONVERSION_DEPTH
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(data: &str) -> IfcModel {
        IfcModel::parse(&format!("DATA;\n{}\nENDSEC;", data)).unwrap()
    }

    #[test]
    fn test_si_prefix_multipliers() {
        assert_eq!(get_si_prefix_multiplier("MILLI"), 0.001);
        assert_eq!(get_si_prefix_multiplier("CENTI"), 0.01);
        assert_eq!(get_si_prefix_multiplier("DECI"), 0.1);
        assert_eq!(get_si_prefix_multiplier("KILO"), 1000.0);
        assert_eq!(get_si_prefix_multiplier(""), 1.0);
        assert_eq!(get_si_prefix_multiplier("UNKNOWN"), 1.0);
    }

    #[test]
    fn test_millimetre_si_unit() {
        let m = model(
            "#1=IFCSIUNIT(*,.AREAUNIT.,$,.SQUARE_METRE.);\n\
             #2=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);\n\
             #3=IFCUNITASSIGNMENT((#1,#2));",
        );
        assert_eq!(extract_length_unit_scale(&m).unwrap(), 0.001);
    }

    #[test]
    fn test_conversion_based_foot() {
        let m = model(
            "#1=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);\n\
             #2=IFCMEASUREWITHUNIT(IFCLENGTHMEASURE(0.3048),#1);\n\
             #3=IFCDIMENSIONALEXPONENTS(1,0,0,0,0,0,0);\n\
             #4=IFCCONVERSIONBASEDUNIT(#3,.LENGTHUNIT.,'FOOT',#2);\n\
             #5=IFCUNITASSIGNMENT((#4));",
        );
        assert!((extract_length_unit_scale(&m).unwrap() - 0.3048).abs() < 1e-12);
    }

    #[test]
    fn test_conversion_into_prefixed_unit() {
        let m = model(
            "#1=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);\n\
             #2=IFCMEASUREWITHUNIT(IFCLENGTHMEASURE(1000.),#1);\n\
             #4=IFCCONVERSIONBASEDUNIT(*,.LENGTHUNIT.,'METRE',#2);\n\
             #5=IFCUNITASSIGNMENT((#4));",
        );
        assert!((extract_length_unit_scale(&m).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_length_unit_defaults_to_metres() {
        let m = model(
            "#1=IFCSIUNIT(*,.PLANEANGLEUNIT.,$,.RADIAN.);\n\
             #2=IFCUNITASSIGNMENT((#1));",
        );
        assert_eq!(extract_length_unit_scale(&m).unwrap(), 1.0);
    }

    #[test]
    fn test_missing_assignment_is_error() {
        let m = model("#1=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);");
        assert!(matches!(
            extract_length_unit_scale(&m),
            Err(Error::InvalidUnits(_))
        ));
    }

    #[test]
    fn test_cyclic_conversion_is_error() {
        let m = model(
            "#1=IFCCONVERSIONBASEDUNIT(*,.LENGTHUNIT.,'LOOP',#2);\n\
             #2=IFCMEASUREWITHUNIT(IFCLENGTHMEASURE(2.),#1);\n\
             #3=IFCUNITASSIGNMENT((#1));",
        );
        assert!(extract_length_unit_scale(&m).is_err());
    }
}
