// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Schema Types
//!
//! Fast type checking using an enum instead of string comparison. The whole
//! `IfcElement` tree is named, along with the spatial, relationship,
//! presentation and geometry types the scene importer inspects. Everything
//! else decodes to [`IfcType::Unknown`].

use std::fmt;

macro_rules! ifc_types {
    ($($variant:ident => $step:literal,)*) => {
        /// IFC entity types known to the importer
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum IfcType {
            $($variant,)*
            /// Fallback for unknown types (hash of the STEP name)
            Unknown(u16),
        }

        impl IfcType {
            /// Parse IFC type from its upper-case STEP name
            pub fn from_step_name(s: &str) -> Self {
                match s {
                    $($step => Self::$variant,)*
                    _ => {
                        let upper = s.to_ascii_uppercase();
                        match upper.as_str() {
                            $($step => Self::$variant,)*
                            _ => Self::Unknown(simple_hash(&upper)),
                        }
                    }
                }
            }

            /// Upper-case STEP name (`IFCWALL`)
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $step,)*
                    Self::Unknown(_) => "UNKNOWN",
                }
            }

            /// Schema name (`IfcWall`), as used in qualified names and schema metadata
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                    Self::Unknown(_) => "IfcUnknown",
                }
            }
        }
    };
}

ifc_types! {
    // Project & spatial structure
    IfcProject => "IFCPROJECT",
    IfcSite => "IFCSITE",
    IfcBuilding => "IFCBUILDING",
    IfcBuildingStorey => "IFCBUILDINGSTOREY",
    IfcSpace => "IFCSPACE",

    // Element roots
    IfcElement => "IFCELEMENT",
    IfcBuildingElement => "IFCBUILDINGELEMENT",
    IfcBuiltElement => "IFCBUILTELEMENT",
    IfcCivilElement => "IFCCIVILELEMENT",
    IfcElementAssembly => "IFCELEMENTASSEMBLY",
    IfcGeographicElement => "IFCGEOGRAPHICELEMENT",
    IfcTransportElement => "IFCTRANSPORTELEMENT",
    IfcVirtualElement => "IFCVIRTUALELEMENT",
    IfcElectricalElement => "IFCELECTRICALELEMENT",
    IfcEquipmentElement => "IFCEQUIPMENTELEMENT",

    // Building elements
    IfcWall => "IFCWALL",
    IfcWallStandardCase => "IFCWALLSTANDARDCASE",
    IfcWallElementedCase => "IFCWALLELEMENTEDCASE",
    IfcSlab => "IFCSLAB",
    IfcSlabStandardCase => "IFCSLABSTANDARDCASE",
    IfcSlabElementedCase => "IFCSLABELEMENTEDCASE",
    IfcBeam => "IFCBEAM",
    IfcBeamStandardCase => "IFCBEAMSTANDARDCASE",
    IfcColumn => "IFCCOLUMN",
    IfcColumnStandardCase => "IFCCOLUMNSTANDARDCASE",
    IfcRoof => "IFCROOF",
    IfcStair => "IFCSTAIR",
    IfcStairFlight => "IFCSTAIRFLIGHT",
    IfcRamp => "IFCRAMP",
    IfcRampFlight => "IFCRAMPFLIGHT",
    IfcRailing => "IFCRAILING",
    IfcCurtainWall => "IFCCURTAINWALL",
    IfcPlate => "IFCPLATE",
    IfcPlateStandardCase => "IFCPLATESTANDARDCASE",
    IfcMember => "IFCMEMBER",
    IfcMemberStandardCase => "IFCMEMBERSTANDARDCASE",
    IfcFooting => "IFCFOOTING",
    IfcPile => "IFCPILE",
    IfcCovering => "IFCCOVERING",
    IfcChimney => "IFCCHIMNEY",
    IfcShadingDevice => "IFCSHADINGDEVICE",
    IfcDoor => "IFCDOOR",
    IfcDoorStandardCase => "IFCDOORSTANDARDCASE",
    IfcWindow => "IFCWINDOW",
    IfcWindowStandardCase => "IFCWINDOWSTANDARDCASE",
    IfcBuildingElementProxy => "IFCBUILDINGELEMENTPROXY",
    IfcBuildingElementComponent => "IFCBUILDINGELEMENTCOMPONENT",

    // Infrastructure elements
    IfcBearing => "IFCBEARING",
    IfcCourse => "IFCCOURSE",
    IfcKerb => "IFCKERB",
    IfcPavement => "IFCPAVEMENT",
    IfcRail => "IFCRAIL",
    IfcTrackElement => "IFCTRACKELEMENT",
    IfcEarthworksElement => "IFCEARTHWORKSELEMENT",
    IfcEarthworksFill => "IFCEARTHWORKSFILL",
    IfcReinforcedSoil => "IFCREINFORCEDSOIL",

    // Element components
    IfcElementComponent => "IFCELEMENTCOMPONENT",
    IfcBuildingElementPart => "IFCBUILDINGELEMENTPART",
    IfcDiscreteAccessory => "IFCDISCRETEACCESSORY",
    IfcFastener => "IFCFASTENER",
    IfcMechanicalFastener => "IFCMECHANICALFASTENER",
    IfcVibrationIsolator => "IFCVIBRATIONISOLATOR",
    IfcReinforcingElement => "IFCREINFORCINGELEMENT",
    IfcReinforcingBar => "IFCREINFORCINGBAR",
    IfcReinforcingMesh => "IFCREINFORCINGMESH",
    IfcTendon => "IFCTENDON",
    IfcTendonAnchor => "IFCTENDONANCHOR",

    // Features
    IfcFeatureElement => "IFCFEATUREELEMENT",
    IfcFeatureElementAddition => "IFCFEATUREELEMENTADDITION",
    IfcProjectionElement => "IFCPROJECTIONELEMENT",
    IfcFeatureElementSubtraction => "IFCFEATUREELEMENTSUBTRACTION",
    IfcOpeningElement => "IFCOPENINGELEMENT",
    IfcOpeningStandardCase => "IFCOPENINGSTANDARDCASE",
    IfcVoidingFeature => "IFCVOIDINGFEATURE",
    IfcEdgeFeature => "IFCEDGEFEATURE",
    IfcSurfaceFeature => "IFCSURFACEFEATURE",

    // Furnishing
    IfcFurnishingElement => "IFCFURNISHINGELEMENT",
    IfcFurniture => "IFCFURNITURE",
    IfcSystemFurnitureElement => "IFCSYSTEMFURNITUREELEMENT",

    // Distribution
    IfcDistributionElement => "IFCDISTRIBUTIONELEMENT",
    IfcDistributionControlElement => "IFCDISTRIBUTIONCONTROLELEMENT",
    IfcActuator => "IFCACTUATOR",
    IfcAlarm => "IFCALARM",
    IfcController => "IFCCONTROLLER",
    IfcFlowInstrument => "IFCFLOWINSTRUMENT",
    IfcProtectiveDeviceTrippingUnit => "IFCPROTECTIVEDEVICETRIPPINGUNIT",
    IfcSensor => "IFCSENSOR",
    IfcUnitaryControlElement => "IFCUNITARYCONTROLELEMENT",
    IfcDistributionFlowElement => "IFCDISTRIBUTIONFLOWELEMENT",
    IfcDistributionChamberElement => "IFCDISTRIBUTIONCHAMBERELEMENT",
    IfcEnergyConversionDevice => "IFCENERGYCONVERSIONDEVICE",
    IfcAirToAirHeatRecovery => "IFCAIRTOAIRHEATRECOVERY",
    IfcBoiler => "IFCBOILER",
    IfcBurner => "IFCBURNER",
    IfcChiller => "IFCCHILLER",
    IfcCoil => "IFCCOIL",
    IfcCondenser => "IFCCONDENSER",
    IfcCooledBeam => "IFCCOOLEDBEAM",
    IfcCoolingTower => "IFCCOOLINGTOWER",
    IfcElectricGenerator => "IFCELECTRICGENERATOR",
    IfcElectricMotor => "IFCELECTRICMOTOR",
    IfcEngine => "IFCENGINE",
    IfcEvaporativeCooler => "IFCEVAPORATIVECOOLER",
    IfcEvaporator => "IFCEVAPORATOR",
    IfcHeatExchanger => "IFCHEATEXCHANGER",
    IfcHumidifier => "IFCHUMIDIFIER",
    IfcMotorConnection => "IFCMOTORCONNECTION",
    IfcSolarDevice => "IFCSOLARDEVICE",
    IfcTransformer => "IFCTRANSFORMER",
    IfcTubeBundle => "IFCTUBEBUNDLE",
    IfcUnitaryEquipment => "IFCUNITARYEQUIPMENT",
    IfcFlowController => "IFCFLOWCONTROLLER",
    IfcAirTerminalBox => "IFCAIRTERMINALBOX",
    IfcDamper => "IFCDAMPER",
    IfcElectricDistributionBoard => "IFCELECTRICDISTRIBUTIONBOARD",
    IfcElectricTimeControl => "IFCELECTRICTIMECONTROL",
    IfcFlowMeter => "IFCFLOWMETER",
    IfcProtectiveDevice => "IFCPROTECTIVEDEVICE",
    IfcSwitchingDevice => "IFCSWITCHINGDEVICE",
    IfcValve => "IFCVALVE",
    IfcFlowFitting => "IFCFLOWFITTING",
    IfcCableCarrierFitting => "IFCCABLECARRIERFITTING",
    IfcCableFitting => "IFCCABLEFITTING",
    IfcDuctFitting => "IFCDUCTFITTING",
    IfcJunctionBox => "IFCJUNCTIONBOX",
    IfcPipeFitting => "IFCPIPEFITTING",
    IfcFlowMovingDevice => "IFCFLOWMOVINGDEVICE",
    IfcCompressor => "IFCCOMPRESSOR",
    IfcFan => "IFCFAN",
    IfcPump => "IFCPUMP",
    IfcFlowSegment => "IFCFLOWSEGMENT",
    IfcCableCarrierSegment => "IFCCABLECARRIERSEGMENT",
    IfcCableSegment => "IFCCABLESEGMENT",
    IfcDuctSegment => "IFCDUCTSEGMENT",
    IfcPipeSegment => "IFCPIPESEGMENT",
    IfcFlowStorageDevice => "IFCFLOWSTORAGEDEVICE",
    IfcElectricFlowStorageDevice => "IFCELECTRICFLOWSTORAGEDEVICE",
    IfcTank => "IFCTANK",
    IfcFlowTerminal => "IFCFLOWTERMINAL",
    IfcAirTerminal => "IFCAIRTERMINAL",
    IfcAudioVisualAppliance => "IFCAUDIOVISUALAPPLIANCE",
    IfcCommunicationsAppliance => "IFCCOMMUNICATIONSAPPLIANCE",
    IfcElectricAppliance => "IFCELECTRICAPPLIANCE",
    IfcFireSuppressionTerminal => "IFCFIRESUPPRESSIONTERMINAL",
    IfcLamp => "IFCLAMP",
    IfcLightFixture => "IFCLIGHTFIXTURE",
    IfcMedicalDevice => "IFCMEDICALDEVICE",
    IfcOutlet => "IFCOUTLET",
    IfcSanitaryTerminal => "IFCSANITARYTERMINAL",
    IfcSpaceHeater => "IFCSPACEHEATER",
    IfcStackTerminal => "IFCSTACKTERMINAL",
    IfcWasteTerminal => "IFCWASTETERMINAL",
    IfcFlowTreatmentDevice => "IFCFLOWTREATMENTDEVICE",
    IfcDuctSilencer => "IFCDUCTSILENCER",
    IfcFilter => "IFCFILTER",
    IfcInterceptor => "IFCINTERCEPTOR",

    // Relationships
    IfcRelAggregates => "IFCRELAGGREGATES",
    IfcRelContainedInSpatialStructure => "IFCRELCONTAINEDINSPATIALSTRUCTURE",
    IfcRelAssociatesMaterial => "IFCRELASSOCIATESMATERIAL",

    // Materials & presentation
    IfcMaterial => "IFCMATERIAL",
    IfcMaterialLayerSet => "IFCMATERIALLAYERSET",
    IfcMaterialLayerSetUsage => "IFCMATERIALLAYERSETUSAGE",
    IfcMaterialDefinitionRepresentation => "IFCMATERIALDEFINITIONREPRESENTATION",
    IfcStyledRepresentation => "IFCSTYLEDREPRESENTATION",
    IfcStyledItem => "IFCSTYLEDITEM",
    IfcPresentationStyleAssignment => "IFCPRESENTATIONSTYLEASSIGNMENT",
    IfcSurfaceStyle => "IFCSURFACESTYLE",
    IfcSurfaceStyleShading => "IFCSURFACESTYLESHADING",
    IfcSurfaceStyleRendering => "IFCSURFACESTYLERENDERING",
    IfcExternallyDefinedSurfaceStyle => "IFCEXTERNALLYDEFINEDSURFACESTYLE",
    IfcColourRgb => "IFCCOLOURRGB",

    // Placement
    IfcLocalPlacement => "IFCLOCALPLACEMENT",
    IfcAxis2Placement3D => "IFCAXIS2PLACEMENT3D",
    IfcAxis2Placement2D => "IFCAXIS2PLACEMENT2D",
    IfcCartesianPoint => "IFCCARTESIANPOINT",
    IfcDirection => "IFCDIRECTION",
    IfcCartesianTransformationOperator3D => "IFCCARTESIANTRANSFORMATIONOPERATOR3D",
    IfcCartesianTransformationOperator3DnonUniform => "IFCCARTESIANTRANSFORMATIONOPERATOR3DNONUNIFORM",

    // Representation
    IfcGeometricRepresentationContext => "IFCGEOMETRICREPRESENTATIONCONTEXT",
    IfcProductDefinitionShape => "IFCPRODUCTDEFINITIONSHAPE",
    IfcShapeRepresentation => "IFCSHAPEREPRESENTATION",
    IfcRepresentationMap => "IFCREPRESENTATIONMAP",
    IfcMappedItem => "IFCMAPPEDITEM",
    IfcExtrudedAreaSolid => "IFCEXTRUDEDAREASOLID",
    IfcRectangleProfileDef => "IFCRECTANGLEPROFILEDEF",
    IfcArbitraryClosedProfileDef => "IFCARBITRARYCLOSEDPROFILEDEF",
    IfcPolyline => "IFCPOLYLINE",
    IfcTriangulatedFaceSet => "IFCTRIANGULATEDFACESET",
    IfcCartesianPointList3D => "IFCCARTESIANPOINTLIST3D",

    // Units
    IfcUnitAssignment => "IFCUNITASSIGNMENT",
    IfcSIUnit => "IFCSIUNIT",
    IfcConversionBasedUnit => "IFCCONVERSIONBASEDUNIT",
    IfcMeasureWithUnit => "IFCMEASUREWITHUNIT",
    IfcDimensionalExponents => "IFCDIMENSIONALEXPONENTS",

    // Other common types
    IfcOwnerHistory => "IFCOWNERHISTORY",
}

impl IfcType {
    /// Site, building or storey: the containers rebuilt into the scene hierarchy
    pub fn is_spatial_structure(&self) -> bool {
        matches!(self, Self::IfcSite | Self::IfcBuilding | Self::IfcBuildingStorey)
    }

    /// Direct supertype within the `IfcElement` tree
    ///
    /// Covers the IFC4 element hierarchy plus the IFC2X3 and IFC4X3 types that
    /// have no IFC4 counterpart. Types outside that tree have no supertype here.
    pub fn supertype(&self) -> Option<Self> {
        let parent = match self {
            Self::IfcBuildingElement
            | Self::IfcBuiltElement
            | Self::IfcCivilElement
            | Self::IfcDistributionElement
            | Self::IfcElementAssembly
            | Self::IfcElementComponent
            | Self::IfcFeatureElement
            | Self::IfcFurnishingElement
            | Self::IfcGeographicElement
            | Self::IfcTransportElement
            | Self::IfcVirtualElement
            | Self::IfcElectricalElement
            | Self::IfcEquipmentElement => Self::IfcElement,

            Self::IfcWall
            | Self::IfcSlab
            | Self::IfcBeam
            | Self::IfcColumn
            | Self::IfcRoof
            | Self::IfcStair
            | Self::IfcStairFlight
            | Self::IfcRamp
            | Self::IfcRampFlight
            | Self::IfcRailing
            | Self::IfcCurtainWall
            | Self::IfcPlate
            | Self::IfcMember
            | Self::IfcFooting
            | Self::IfcPile
            | Self::IfcCovering
            | Self::IfcChimney
            | Self::IfcShadingDevice
            | Self::IfcDoor
            | Self::IfcWindow
            | Self::IfcBuildingElementProxy
            | Self::IfcBuildingElementComponent => Self::IfcBuildingElement,

            Self::IfcWallStandardCase | Self::IfcWallElementedCase => Self::IfcWall,
            Self::IfcSlabStandardCase | Self::IfcSlabElementedCase => Self::IfcSlab,
            Self::IfcBeamStandardCase => Self::IfcBeam,
            Self::IfcColumnStandardCase => Self::IfcColumn,
            Self::IfcPlateStandardCase => Self::IfcPlate,
            Self::IfcMemberStandardCase => Self::IfcMember,
            Self::IfcDoorStandardCase => Self::IfcDoor,
            Self::IfcWindowStandardCase => Self::IfcWindow,

            Self::IfcBearing
            | Self::IfcCourse
            | Self::IfcKerb
            | Self::IfcPavement
            | Self::IfcRail
            | Self::IfcTrackElement
            | Self::IfcEarthworksElement => Self::IfcBuiltElement,
            Self::IfcEarthworksFill | Self::IfcReinforcedSoil => Self::IfcEarthworksElement,

            Self::IfcBuildingElementPart
            | Self::IfcDiscreteAccessory
            | Self::IfcFastener
            | Self::IfcMechanicalFastener
            | Self::IfcVibrationIsolator
            | Self::IfcReinforcingElement => Self::IfcElementComponent,
            Self::IfcReinforcingBar
            | Self::IfcReinforcingMesh
            | Self::IfcTendon
            | Self::IfcTendonAnchor => Self::IfcReinforcingElement,

            Self::IfcFeatureElementAddition
            | Self::IfcFeatureElementSubtraction
            | Self::IfcSurfaceFeature => Self::IfcFeatureElement,
            Self::IfcProjectionElement => Self::IfcFeatureElementAddition,
            Self::IfcOpeningElement | Self::IfcVoidingFeature | Self::IfcEdgeFeature => {
                Self::IfcFeatureElementSubtraction
            }
            Self::IfcOpeningStandardCase => Self::IfcOpeningElement,

            Self::IfcFurniture | Self::IfcSystemFurnitureElement => Self::IfcFurnishingElement,

            Self::IfcDistributionControlElement | Self::IfcDistributionFlowElement => {
                Self::IfcDistributionElement
            }
            Self::IfcActuator
            | Self::IfcAlarm
            | Self::IfcController
            | Self::IfcFlowInstrument
            | Self::IfcProtectiveDeviceTrippingUnit
            | Self::IfcSensor
            | Self::IfcUnitaryControlElement => Self::IfcDistributionControlElement,
            Self::IfcDistributionChamberElement
            | Self::IfcEnergyConversionDevice
            | Self::IfcFlowController
            | Self::IfcFlowFitting
            | Self::IfcFlowMovingDevice
            | Self::IfcFlowSegment
            | Self::IfcFlowStorageDevice
            | Self::IfcFlowTerminal
            | Self::IfcFlowTreatmentDevice => Self::IfcDistributionFlowElement,
            Self::IfcAirToAirHeatRecovery
            | Self::IfcBoiler
            | Self::IfcBurner
            | Self::IfcChiller
            | Self::IfcCoil
            | Self::IfcCondenser
            | Self::IfcCooledBeam
            | Self::IfcCoolingTower
            | Self::IfcElectricGenerator
            | Self::IfcElectricMotor
            | Self::IfcEngine
            | Self::IfcEvaporativeCooler
            | Self::IfcEvaporator
            | Self::IfcHeatExchanger
            | Self::IfcHumidifier
            | Self::IfcMotorConnection
            | Self::IfcSolarDevice
            | Self::IfcTransformer
            | Self::IfcTubeBundle
            | Self::IfcUnitaryEquipment => Self::IfcEnergyConversionDevice,
            Self::IfcAirTerminalBox
            | Self::IfcDamper
            | Self::IfcElectricDistributionBoard
            | Self::IfcElectricTimeControl
            | Self::IfcFlowMeter
            | Self::IfcProtectiveDevice
            | Self::IfcSwitchingDevice
            | Self::IfcValve => Self::IfcFlowController,
            Self::IfcCableCarrierFitting
            | Self::IfcCableFitting
            | Self::IfcDuctFitting
            | Self::IfcJunctionBox
            | Self::IfcPipeFitting => Self::IfcFlowFitting,
            Self::IfcCompressor | Self::IfcFan | Self::IfcPump => Self::IfcFlowMovingDevice,
            Self::IfcCableCarrierSegment
            | Self::IfcCableSegment
            | Self::IfcDuctSegment
            | Self::IfcPipeSegment => Self::IfcFlowSegment,
            Self::IfcElectricFlowStorageDevice | Self::IfcTank => Self::IfcFlowStorageDevice,
            Self::IfcAirTerminal
            | Self::IfcAudioVisualAppliance
            | Self::IfcCommunicationsAppliance
            | Self::IfcElectricAppliance
            | Self::IfcFireSuppressionTerminal
            | Self::IfcLamp
            | Self::IfcLightFixture
            | Self::IfcMedicalDevice
            | Self::IfcOutlet
            | Self::IfcSanitaryTerminal
            | Self::IfcSpaceHeater
            | Self::IfcStackTerminal
            | Self::IfcWasteTerminal => Self::IfcFlowTerminal,
            Self::IfcDuctSilencer | Self::IfcFilter | Self::IfcInterceptor => {
                Self::IfcFlowTreatmentDevice
            }

            _ => return None,
        };
        Some(parent)
    }

    /// `self` and its supertypes, most specific first
    pub fn ancestry(&self) -> impl Iterator<Item = IfcType> {
        std::iter::successors(Some(*self), IfcType::supertype)
    }

    /// Whether `self` is `ancestor` or one of its subtypes
    pub fn is_subtype_of(&self, ancestor: IfcType) -> bool {
        self.ancestry().any(|t| t == ancestor)
    }

    /// `IfcElement` or any of its subtypes
    pub fn is_element(&self) -> bool {
        self.is_subtype_of(Self::IfcElement)
    }

    /// `IfcSurfaceStyleShading` or its subtype `IfcSurfaceStyleRendering`
    pub fn is_surface_style_shading(&self) -> bool {
        matches!(
            self,
            Self::IfcSurfaceStyleShading | Self::IfcSurfaceStyleRendering
        )
    }

    /// Cartesian transformation operator used as a `MappingTarget`
    pub fn is_cartesian_transformation_operator(&self) -> bool {
        matches!(
            self,
            Self::IfcCartesianTransformationOperator3D
                | Self::IfcCartesianTransformationOperator3DnonUniform
        )
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Simple hash function for unknown IFC types
fn simple_hash(s: &str) -> u16 {
    let mut hash: u32 = 5381;
    for byte in s.bytes() {
        hash = ((hash << 5).wrapping_add(hash)).wrapping_add(byte as u32);
    }
    (hash & 0xFFFF) as u16
}
