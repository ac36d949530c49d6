//! Proof-of-work algorithm registry.
//!
//! Six algorithms are supported; the identifier of the algorithm that mined
//! a block is carried in the `ALGO_VERSION_MASK` range of the header
//! version. The efficiency and cost-factor tables below are consensus
//! constants: changing a value is a consensus change.

use serde::{Deserialize, Serialize};

use crate::constants::{ALGO_COUNT, ALGO_VERSION_MASK, COST_FACTOR_TOTAL};

/// A supported PoW algorithm.
///
/// The discriminant is the raw identifier; shifted into the
/// `ALGO_VERSION_MASK` range it forms the version-field encoding. An
/// unrecognized masked value decodes to `None` (the NULL sentinel).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Algo {
    Sha256d = 0,
    Scrypt = 1,
    Nist5 = 2,
    Lyra2z = 3,
    X11 = 4,
    X16r = 5,
}

/// Bit offset of the algorithm id within the header version.
const ALGO_VERSION_SHIFT: u32 = ALGO_VERSION_MASK.trailing_zeros();

impl Algo {
    /// All supported algorithms, in identifier order.
    pub const ALL: [Algo; ALGO_COUNT] = [
        Algo::Sha256d,
        Algo::Scrypt,
        Algo::Nist5,
        Algo::Lyra2z,
        Algo::X11,
        Algo::X16r,
    ];

    /// Extract the algorithm from a header version field.
    ///
    /// Pure bit operation on `version & ALGO_VERSION_MASK`; returns `None`
    /// for values outside the closed set.
    pub fn from_version(version: i32) -> Option<Algo> {
        let id = ((version as u32) & ALGO_VERSION_MASK) >> ALGO_VERSION_SHIFT;
        match id {
            0 => Some(Algo::Sha256d),
            1 => Some(Algo::Scrypt),
            2 => Some(Algo::Nist5),
            3 => Some(Algo::Lyra2z),
            4 => Some(Algo::X11),
            5 => Some(Algo::X16r),
            _ => None,
        }
    }

    /// The version-field bits encoding this algorithm.
    pub fn version_bits(self) -> u32 {
        (self as u32) << ALGO_VERSION_SHIFT
    }

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Algo::Sha256d => "sha256d",
            Algo::Scrypt => "scrypt",
            Algo::Nist5 => "nist5",
            Algo::Lyra2z => "lyra2z",
            Algo::X11 => "x11",
            Algo::X16r => "x16r",
        }
    }

    /// Look up an algorithm by name (case-insensitive). `None` plays the
    /// role of the NULL sentinel for unrecognized names.
    pub fn from_name(name: &str) -> Option<Algo> {
        match name.to_ascii_lowercase().as_str() {
            "sha256d" => Some(Algo::Sha256d),
            "scrypt" => Some(Algo::Scrypt),
            "nist5" => Some(Algo::Nist5),
            "lyra2z" => Some(Algo::Lyra2z),
            "x11" => Some(Algo::X11),
            "x16r" => Some(Algo::X16r),
            _ => None,
        }
    }

    /// Relative hashes-per-unit-of-work weight used by the consensus
    /// work-weight calculation.
    pub fn efficiency(self) -> u64 {
        match self {
            Algo::Sha256d => 1,
            Algo::Scrypt => 12_984,
            Algo::Nist5 => 513,
            Algo::Lyra2z => 1_973_648,
            Algo::X11 => 513,
            Algo::X16r => 257_849,
        }
    }

    /// Reward-weighting multiplier used by subsidy policy.
    ///
    /// Normalized so the mean factor across the six algorithms equals 1.
    pub fn cost_factor(self) -> f64 {
        let factor = match self {
            Algo::Sha256d => 10.00,
            Algo::Scrypt => 3.00,
            Algo::Nist5 => 1.00,
            Algo::Lyra2z => 0.50,
            Algo::X11 => 1.25,
            Algo::X16r => 1.50,
        };
        factor / (COST_FACTOR_TOTAL / ALGO_COUNT as f64)
    }
}

impl std::fmt::Display for Algo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::VERSIONBITS_TOP_BITS;

    // ------------------------------------------------------------------
    // Version encoding
    // ------------------------------------------------------------------

    #[test]
    fn version_bits_roundtrip_for_all() {
        for algo in Algo::ALL {
            let version = (VERSIONBITS_TOP_BITS | algo.version_bits()) as i32;
            assert_eq!(Algo::from_version(version), Some(algo), "{algo}");
        }
    }

    #[test]
    fn version_bits_fit_inside_mask() {
        for algo in Algo::ALL {
            assert_eq!(algo.version_bits() & !ALGO_VERSION_MASK, 0);
        }
    }

    #[test]
    fn unrecognized_id_is_null() {
        let version = (VERSIONBITS_TOP_BITS | (6 << ALGO_VERSION_MASK.trailing_zeros())) as i32;
        assert_eq!(Algo::from_version(version), None);
    }

    #[test]
    fn extraction_ignores_unrelated_bits() {
        let version = (VERSIONBITS_TOP_BITS | Algo::X11.version_bits() | 0x1F) as i32;
        assert_eq!(Algo::from_version(version), Some(Algo::X11));
    }

    #[test]
    fn legacy_version_two_is_sha256d_field() {
        // Pre-versionbits headers carry no algo bits; the masked field
        // reads as zero. The scrypt fallback happens in the hasher, not here.
        assert_eq!(Algo::from_version(0x00000002), Some(Algo::Sha256d));
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    #[test]
    fn names_roundtrip() {
        for algo in Algo::ALL {
            assert_eq!(Algo::from_name(algo.name()), Some(algo));
        }
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        assert_eq!(Algo::from_name("X16R"), Some(Algo::X16r));
        assert_eq!(Algo::from_name("Lyra2Z"), Some(Algo::Lyra2z));
    }

    #[test]
    fn unknown_name_is_null() {
        assert_eq!(Algo::from_name("equihash"), None);
        assert_eq!(Algo::from_name(""), None);
    }

    // ------------------------------------------------------------------
    // Consensus tables
    // ------------------------------------------------------------------

    #[test]
    fn efficiency_table_values() {
        assert_eq!(Algo::Sha256d.efficiency(), 1);
        assert_eq!(Algo::Scrypt.efficiency(), 12_984);
        assert_eq!(Algo::Nist5.efficiency(), 513);
        assert_eq!(Algo::Lyra2z.efficiency(), 1_973_648);
        assert_eq!(Algo::X11.efficiency(), 513);
        assert_eq!(Algo::X16r.efficiency(), 257_849);
    }

    #[test]
    fn cost_factors_average_to_one() {
        let mean: f64 =
            Algo::ALL.iter().map(|a| a.cost_factor()).sum::<f64>() / ALGO_COUNT as f64;
        assert!((mean - 1.0).abs() < 1e-9, "mean cost factor {mean}");
    }

    #[test]
    fn sha256d_carries_highest_cost_factor() {
        let max = Algo::ALL
            .iter()
            .map(|a| a.cost_factor())
            .fold(f64::MIN, f64::max);
        assert_eq!(max, Algo::Sha256d.cost_factor());
    }

    #[test]
    fn serde_names_match_registry() {
        for algo in Algo::ALL {
            let json = serde_json::to_string(&algo).unwrap();
            assert_eq!(json, format!("\"{}\"", algo.name()));
        }
    }
}
