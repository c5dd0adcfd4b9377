//! The tag registry: compile-time mapping from column tags to element type,
//! default unit, role, and (for some coordinates) a bound dimension.
//!
//! Tags partition into three contiguous 16-bit id ranges: coordinates, data,
//! attributes. A coordinate tag that binds to a dimension (for example
//! `SpectrumNumber` to `Dim::Spectrum`) is the *dimension-coordinate* of that
//! dimension; a dataset holds at most one per dimension.

use crate::element::DType;
use crate::{Dim, Unit};

/// Role of a tag within a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRole {
    /// Axis labels. Coordinate variables are unnamed.
    Coord,
    /// Measured values. Keyed by `(tag, name)`.
    Data,
    /// Global annotations.
    Attr,
}

/// Coordinate tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CoordTag {
    X,
    Y,
    Z,
    Tof,
    MonitorTof,
    DetectorId,
    SpectrumNumber,
    DetectorIsMonitor,
    DetectorMask,
    DetectorRotation,
    DetectorPosition,
    DetectorGrouping,
    SpectrumPosition,
    RowLabel,
    Polarization,
    Temperature,
    FuzzyTemperature,
    Time,
    TimeInterval,
    Mask,
    ComponentRotation,
    ComponentPosition,
    ComponentParent,
    ComponentChildren,
    ComponentScale,
    ComponentShape,
    ComponentName,
    ComponentSubtree,
    DetectorSubtree,
    ComponentSubtreeRange,
    DetectorSubtreeRange,
    DetectorParent,
    DetectorScale,
    DetectorShape,
}

/// Data tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum DataTag {
    Tof,
    PulseTime,
    Value,
    Variance,
    StdDev,
    Int,
    DimensionSize,
    String,
    History,
    Events,
    Table,
}

/// Attribute tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AttrTag {
    ExperimentLog,
}

const COORD_COUNT: u16 = 34;
const DATA_COUNT: u16 = 11;

/// A column tag: one of the coordinate, data, or attribute tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Coord(CoordTag),
    Data(DataTag),
    Attr(AttrTag),
}

impl From<CoordTag> for Tag {
    fn from(tag: CoordTag) -> Self {
        Tag::Coord(tag)
    }
}

impl From<DataTag> for Tag {
    fn from(tag: DataTag) -> Self {
        Tag::Data(tag)
    }
}

impl From<AttrTag> for Tag {
    fn from(tag: AttrTag) -> Self {
        Tag::Attr(tag)
    }
}

impl Tag {
    /// The 16-bit id; coordinate ids precede data ids precede attribute ids.
    pub fn id(self) -> u16 {
        match self {
            Tag::Coord(t) => t as u16,
            Tag::Data(t) => COORD_COUNT + t as u16,
            Tag::Attr(t) => COORD_COUNT + DATA_COUNT + t as u16,
        }
    }

    pub fn role(self) -> TagRole {
        match self {
            Tag::Coord(_) => TagRole::Coord,
            Tag::Data(_) => TagRole::Data,
            Tag::Attr(_) => TagRole::Attr,
        }
    }

    pub fn is_coord(self) -> bool {
        matches!(self, Tag::Coord(_))
    }

    /// Element type of this tag's variables.
    pub fn dtype(self) -> DType {
        match self {
            Tag::Coord(t) => t.dtype(),
            Tag::Data(t) => t.dtype(),
            Tag::Attr(AttrTag::ExperimentLog) => DType::Dataset,
        }
    }

    /// Unit assigned to freshly created variables of this tag.
    pub fn default_unit(self) -> Unit {
        match self {
            Tag::Coord(t) => t.default_unit(),
            Tag::Data(_) | Tag::Attr(_) => Unit::Dimensionless,
        }
    }

    /// The dimension this tag is the dimension-coordinate of, if any.
    pub fn coord_dim(self) -> Option<Dim> {
        match self {
            Tag::Coord(t) => t.coord_dim(),
            _ => None,
        }
    }

    pub fn is_dimension_coord(self) -> bool {
        self.coord_dim().is_some()
    }
}

impl CoordTag {
    pub fn dtype(self) -> DType {
        use CoordTag::*;
        match self {
            X | Y | Z | Tof | MonitorTof | DetectorPosition | SpectrumPosition | Temperature => {
                DType::F64
            }
            DetectorId | SpectrumNumber => DType::I32,
            Time | ComponentParent | DetectorParent => DType::I64,
            DetectorIsMonitor | DetectorMask | Mask => DType::Bool,
            RowLabel | Polarization | ComponentName => DType::Str,
            DetectorGrouping | ComponentChildren | ComponentSubtree | DetectorSubtree => {
                DType::IndexList
            }
            TimeInterval | ComponentSubtreeRange | DetectorSubtreeRange => DType::IndexPair,
            ComponentPosition | ComponentScale | DetectorScale => DType::F64Triple,
            DetectorRotation | ComponentRotation => DType::F64Quad,
            ComponentShape | DetectorShape => DType::SharedF64List,
            FuzzyTemperature => DType::FuzzyF64,
        }
    }

    pub fn default_unit(self) -> Unit {
        use CoordTag::*;
        match self {
            X | Y | Z | DetectorPosition | ComponentPosition => Unit::Length,
            _ => Unit::Dimensionless,
        }
    }

    pub fn coord_dim(self) -> Option<Dim> {
        use CoordTag::*;
        match self {
            X => Some(Dim::X),
            Y => Some(Dim::Y),
            Z => Some(Dim::Z),
            Tof => Some(Dim::Tof),
            SpectrumNumber => Some(Dim::Spectrum),
            RowLabel => Some(Dim::Row),
            _ => None,
        }
    }
}

impl DataTag {
    pub fn dtype(self) -> DType {
        use DataTag::*;
        match self {
            Tof | PulseTime | Value | Variance | StdDev => DType::F64,
            Int | DimensionSize => DType::I64,
            String => DType::Str,
            History => DType::StrList,
            Events | Table => DType::Dataset,
        }
    }
}

/// A value with an absolute tolerance.
///
/// Two values compare equal when they differ by less than the larger of the
/// two tolerances.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueWithDelta<T> {
    pub value: T,
    pub delta: T,
}

impl<T> ValueWithDelta<T> {
    pub fn new(value: T, delta: T) -> Self {
        Self { value, delta }
    }
}

impl PartialEq for ValueWithDelta<f64> {
    fn eq(&self, other: &Self) -> bool {
        (self.value - other.value).abs() < self.delta.max(other.delta)
    }
}
