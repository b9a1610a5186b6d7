use super::ids::AtomId;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Integer bond order of a covalent bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single = 1,
    Double = 2,
    Triple = 3,
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// An unordered atom-id pair with a bond order.
///
/// Bonds are stored once in the owning molecule's bond list and mirrored as
/// an edge in its connectivity graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1_id: AtomId,
    pub atom2_id: AtomId,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Self {
        Self {
            atom1_id,
            atom2_id,
            order,
        }
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.atom1_id == atom_id || self.atom2_id == atom_id
    }

    /// Returns the other endpoint of the bond, if `atom_id` is one of them.
    pub fn partner(&self, atom_id: AtomId) -> Option<AtomId> {
        if self.atom1_id == atom_id {
            Some(self.atom2_id)
        } else if self.atom2_id == atom_id {
            Some(self.atom1_id)
        } else {
            None
        }
    }
}
