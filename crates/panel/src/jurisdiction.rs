//! State FIPS codes and the jurisdiction filter shared by every wide source.

use crate::config::JurisdictionConfig;

/// Lowest and highest state-level FIPS codes. Anything outside is a regional
/// or national aggregate.
pub const MIN_STATE_CODE: u8 = 1;
pub const MAX_STATE_CODE: u8 = 56;

pub const ALASKA: u8 = 2;
pub const DISTRICT_OF_COLUMBIA: u8 = 11;
pub const HAWAII: u8 = 15;

/// FIPS codes assigned to the 50 states and the District of Columbia.
/// Codes 3, 7, 14, 43 and 52 are reserved and never assigned.
const STATE_FIPS: [(u8, &str); 51] = [
    (1, "Alabama"),
    (2, "Alaska"),
    (4, "Arizona"),
    (5, "Arkansas"),
    (6, "California"),
    (8, "Colorado"),
    (9, "Connecticut"),
    (10, "Delaware"),
    (11, "District of Columbia"),
    (12, "Florida"),
    (13, "Georgia"),
    (15, "Hawaii"),
    (16, "Idaho"),
    (17, "Illinois"),
    (18, "Indiana"),
    (19, "Iowa"),
    (20, "Kansas"),
    (21, "Kentucky"),
    (22, "Louisiana"),
    (23, "Maine"),
    (24, "Maryland"),
    (25, "Massachusetts"),
    (26, "Michigan"),
    (27, "Minnesota"),
    (28, "Mississippi"),
    (29, "Missouri"),
    (30, "Montana"),
    (31, "Nebraska"),
    (32, "Nevada"),
    (33, "New Hampshire"),
    (34, "New Jersey"),
    (35, "New Mexico"),
    (36, "New York"),
    (37, "North Carolina"),
    (38, "North Dakota"),
    (39, "Ohio"),
    (40, "Oklahoma"),
    (41, "Oregon"),
    (42, "Pennsylvania"),
    (44, "Rhode Island"),
    (45, "South Carolina"),
    (46, "South Dakota"),
    (47, "Tennessee"),
    (48, "Texas"),
    (49, "Utah"),
    (50, "Vermont"),
    (51, "Virginia"),
    (53, "Washington"),
    (54, "West Virginia"),
    (55, "Wisconsin"),
    (56, "Wyoming"),
];

/// Canonical name for an assigned state FIPS code.
pub fn state_name(code: u8) -> Option<&'static str> {
    STATE_FIPS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Every assigned code with its canonical name, ascending by code.
pub fn all_states() -> impl Iterator<Item = (u8, &'static str)> {
    STATE_FIPS.iter().copied()
}

/// Coerce a raw code cell to an integer FIPS code.
///
/// Accepts zero-padded text ("01"), quoted text and integral decimals ("1.0").
/// Returns `None` for anything else, including out-of-range integers.
pub fn parse_code(raw: &str) -> Option<u8> {
    let cleaned = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(n) = cleaned.parse::<i64>() {
        return u8::try_from(n).ok();
    }
    let f: f64 = cleaned.parse().ok()?;
    if f.fract() != 0.0 || !(0.0..=255.0).contains(&f) {
        return None;
    }
    Some(f as u8)
}

/// Why a source row was left out of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Code missing, non-numeric, or outside [1, 56].
    InvalidCode,
    /// Code in range but never assigned to a state.
    UnassignedCode,
    /// The whole-country aggregate row.
    NationalAggregate,
    /// One of the configured excluded codes (Alaska, DC, Hawaii).
    Excluded,
}

/// Decide whether a (name, raw code) pair is one of the panel's states.
pub fn admit(name: &str, raw_code: &str, config: &JurisdictionConfig) -> Result<u8, Exclusion> {
    if name.trim().eq_ignore_ascii_case(config.aggregate_name.trim()) {
        return Err(Exclusion::NationalAggregate);
    }
    let code = parse_code(raw_code).ok_or(Exclusion::InvalidCode)?;
    if !(MIN_STATE_CODE..=MAX_STATE_CODE).contains(&code) {
        return Err(Exclusion::InvalidCode);
    }
    if config.excluded_codes.contains(&code) {
        return Err(Exclusion::Excluded);
    }
    if state_name(code).is_none() {
        return Err(Exclusion::UnassignedCode);
    }
    Ok(code)
}
