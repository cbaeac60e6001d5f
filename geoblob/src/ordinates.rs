use crate::result::{Error, Result};
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// A set of ordinates a coordinate can carry.
///
/// X and Y are always part of the set, Z and M are optional. The same type describes
/// both what a geometry has and what a codec is configured to handle; the
/// intersection of the two is what ends up in a blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ordinates(u8);

impl Ordinates {
    const X_BIT: u8 = 0b0001;
    const Y_BIT: u8 = 0b0010;
    const Z_BIT: u8 = 0b0100;
    const M_BIT: u8 = 0b1000;

    pub const XY: Ordinates = Ordinates(Self::X_BIT | Self::Y_BIT);
    pub const XYZ: Ordinates = Ordinates(Self::X_BIT | Self::Y_BIT | Self::Z_BIT);
    pub const XYM: Ordinates = Ordinates(Self::X_BIT | Self::Y_BIT | Self::M_BIT);
    pub const XYZM: Ordinates =
        Ordinates(Self::X_BIT | Self::Y_BIT | Self::Z_BIT | Self::M_BIT);

    /// Builds a set from raw bits (X=1, Y=2, Z=4, M=8).
    ///
    /// Fails when unknown bits are set or when X or Y is missing.
    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits & !Self::XYZM.0 != 0 || bits & Self::XY.0 != Self::XY.0 {
            return Err(Error::InvalidOrdinates(bits));
        }
        Ok(Ordinates(bits))
    }

    pub fn from_flags(has_z: bool, has_m: bool) -> Self {
        match (has_z, has_m) {
            (false, false) => Self::XY,
            (true, false) => Self::XYZ,
            (false, true) => Self::XYM,
            (true, true) => Self::XYZM,
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn has_z(self) -> bool {
        self.0 & Self::Z_BIT != 0
    }

    pub fn has_m(self) -> bool {
        self.0 & Self::M_BIT != 0
    }

    /// Number of ordinates per coordinate, 2 to 4.
    pub fn dimension(self) -> usize {
        2 + self.has_z() as usize + self.has_m() as usize
    }

    /// Restricts `requested` to what `allowed` permits, forcing X and Y on.
    pub fn clamp(requested: Ordinates, allowed: Ordinates) -> Ordinates {
        Self::XY | (allowed & requested)
    }
}

impl Default for Ordinates {
    fn default() -> Self {
        Self::XY
    }
}

impl BitAnd for Ordinates {
    type Output = Ordinates;

    fn bitand(self, rhs: Self) -> Self::Output {
        // X and Y are in both operands, so the invariant holds
        Ordinates(self.0 & rhs.0)
    }
}

impl BitOr for Ordinates {
    type Output = Ordinates;

    fn bitor(self, rhs: Self) -> Self::Output {
        Ordinates(self.0 | rhs.0)
    }
}

impl fmt::Debug for Ordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Ordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("XY")?;
        if self.has_z() {
            f.write_str("Z")?;
        }
        if self.has_m() {
            f.write_str("M")?;
        }
        Ok(())
    }
}
