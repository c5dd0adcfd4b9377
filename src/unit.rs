//! Physical units as a small closed algebra.

use crate::{Error, Result};

/// Physical unit of a variable's elements.
///
/// `Dimensionless` is the multiplicative identity. Products and quotients
/// outside the supported table fail with [`Error::Unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    Dimensionless,
    Length,
    Area,
    Volume,
    InverseLength,
    Counts,
    CountsVariance,
}

impl Unit {
    /// Unit of the product of two quantities.
    pub fn multiply(self, other: Unit) -> Result<Unit> {
        use Unit::*;
        match (self, other) {
            (Dimensionless, u) | (u, Dimensionless) => Ok(u),
            (Length, Length) => Ok(Area),
            (Length, Area) | (Area, Length) => Ok(Volume),
            (Length, InverseLength) | (InverseLength, Length) => Ok(Dimensionless),
            (Counts, Counts) => Ok(CountsVariance),
            (left, right) => Err(Error::Unit {
                left,
                right,
                op: "multiply",
            }),
        }
    }

    /// Unit of the quotient of two quantities.
    pub fn divide(self, other: Unit) -> Result<Unit> {
        use Unit::*;
        match (self, other) {
            (u, Dimensionless) => Ok(u),
            (left, right) if left == right => Ok(Dimensionless),
            (Area, Length) => Ok(Length),
            (Volume, Length) => Ok(Area),
            (Volume, Area) => Ok(Length),
            (Dimensionless, Length) => Ok(InverseLength),
            (CountsVariance, Counts) => Ok(Counts),
            (left, right) => Err(Error::Unit {
                left,
                right,
                op: "divide",
            }),
        }
    }
}
