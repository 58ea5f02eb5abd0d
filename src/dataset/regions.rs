//! US Census Bureau regions keyed by state abbreviation.

use std::fmt;

/// One of the four census regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    West,
    Midwest,
    South,
    Northeast,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::West => "west",
            Region::Midwest => "midwest",
            Region::South => "south",
            Region::Northeast => "northeast",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Region of a two-letter state code. DC counts as south.
pub fn region_for(state: &str) -> Option<Region> {
    let region = match state.trim().to_ascii_uppercase().as_str() {
        "AK" | "HI" | "WA" | "OR" | "CA" | "ID" | "MT" | "WY" | "NV" | "UT" | "CO" | "AZ"
        | "NM" => Region::West,
        "ND" | "SD" | "NE" | "KS" | "MN" | "IA" | "MO" | "WI" | "IL" | "MI" | "IN" | "OH" => {
            Region::Midwest
        }
        "TX" | "OK" | "AR" | "LA" | "MS" | "TN" | "AL" | "KY" | "GA" | "FL" | "SC" | "NC"
        | "VA" | "DC" | "WV" | "MD" | "DE" => Region::South,
        "PA" | "NJ" | "NY" | "VT" | "NH" | "ME" | "MA" | "CT" | "RI" => Region::Northeast,
        _ => return None,
    };
    Some(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [&str; 51] = [
        "AK", "AL", "AR", "AZ", "CA", "CO", "CT", "DC", "DE", "FL", "GA", "HI", "IA", "ID", "IL",
        "IN", "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MS", "MT", "NC", "ND", "NE",
        "NH", "NJ", "NM", "NV", "NY", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
        "VA", "VT", "WA", "WI", "WV", "WY",
    ];

    #[test]
    fn test_every_state_has_a_region() {
        for state in STATES {
            assert!(region_for(state).is_some(), "no region for {}", state);
        }
    }

    #[test]
    fn test_region_sizes() {
        let count = |region| STATES.iter().filter(|s| region_for(s) == Some(region)).count();
        assert_eq!(count(Region::West), 13);
        assert_eq!(count(Region::Midwest), 12);
        assert_eq!(count(Region::South), 17);
        assert_eq!(count(Region::Northeast), 9);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(region_for("NJ"), Some(Region::Northeast));
        assert_eq!(region_for("dc"), Some(Region::South));
        assert_eq!(region_for("PR"), None);
        assert_eq!(Region::Midwest.to_string(), "midwest");
    }
}
