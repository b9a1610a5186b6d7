use phf::{Map, phf_map};

/// Single-bond covalent radii in Angstroms, used when inferring whether two
/// atoms are close enough to be considered covalently bonded.
pub static COVALENT_RADII: Map<&'static str, f64> = phf_map! {
    "H" => 0.31,
    "B" => 0.84,
    "C" => 0.76,
    "N" => 0.71,
    "O" => 0.66,
    "F" => 0.57,
    "NA" => 1.66,
    "MG" => 1.41,
    "SI" => 1.11,
    "P" => 1.07,
    "S" => 1.05,
    "CL" => 1.02,
    "K" => 2.03,
    "CA" => 1.76,
    "FE" => 1.32,
    "ZN" => 1.22,
    "SE" => 1.20,
    "BR" => 1.20,
    "I" => 1.39,
};

/// Non-bonded contact radii in Angstroms, used by the clash objective of the
/// built-in rotation optimizer.
pub static CONTACT_RADII: Map<&'static str, f64> = phf_map! {
    "H" => 1.10,
    "B" => 1.92,
    "C" => 1.70,
    "N" => 1.55,
    "O" => 1.52,
    "F" => 1.47,
    "NA" => 2.27,
    "MG" => 1.73,
    "SI" => 2.10,
    "P" => 1.80,
    "S" => 1.80,
    "CL" => 1.75,
    "K" => 2.75,
    "CA" => 2.31,
    "FE" => 2.05,
    "ZN" => 2.10,
    "SE" => 1.90,
    "BR" => 1.85,
    "I" => 1.98,
};

const DEFAULT_COVALENT_RADIUS: f64 = 0.77;
const DEFAULT_CONTACT_RADIUS: f64 = 1.70;

/// Looks up the covalent radius for an element symbol (case-insensitive),
/// falling back to a carbon-like default for unknown elements.
pub fn covalent_radius(element: &str) -> f64 {
    COVALENT_RADII
        .get(element.to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_COVALENT_RADIUS)
}

/// Looks up the non-bonded contact radius for an element symbol
/// (case-insensitive), falling back to a carbon-like default.
pub fn contact_radius(element: &str) -> f64 {
    CONTACT_RADII
        .get(element.to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_CONTACT_RADIUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_elements_resolve_case_insensitively() {
        assert_eq!(covalent_radius("C"), 0.76);
        assert_eq!(covalent_radius("c"), 0.76);
        assert_eq!(contact_radius("cl"), 1.75);
        assert_eq!(contact_radius("Br"), 1.85);
    }

    #[test]
    fn unknown_elements_fall_back_to_defaults() {
        assert_eq!(covalent_radius("Xx"), DEFAULT_COVALENT_RADIUS);
        assert_eq!(contact_radius(""), DEFAULT_CONTACT_RADIUS);
    }

    #[test]
    fn contact_radius_is_never_smaller_than_covalent_radius() {
        for (symbol, covalent) in COVALENT_RADII.entries() {
            let contact = CONTACT_RADII.get(symbol).copied().unwrap();
            assert!(
                contact > *covalent,
                "element {} has contact radius {} <= covalent radius {}",
                symbol,
                contact,
                covalent
            );
        }
    }
}
