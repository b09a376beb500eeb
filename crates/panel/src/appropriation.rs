//! National hospital-construction appropriations, fiscal 1947-1964.

/// (fiscal year, appropriation in dollars). One entry per year, ascending.
pub const APPROPRIATIONS: [(i32, f64); 18] = [
    (1947, 75_000_000.0),
    (1948, 75_000_000.0),
    (1949, 75_000_000.0),
    (1950, 150_000_000.0),
    (1951, 150_000_000.0),
    (1952, 82_500_000.0),
    (1953, 75_000_000.0),
    (1954, 65_000_000.0),
    (1955, 75_000_000.0),
    (1956, 101_200_000.0),
    (1957, 123_800_000.0),
    (1958, 120_000_000.0),
    (1959, 120_000_000.0),
    (1960, 120_000_000.0),
    (1961, 125_000_000.0),
    (1962, 150_000_000.0),
    (1963, 150_000_000.0),
    (1964, 150_000_000.0),
];

pub fn appropriation_for(year: i32) -> Option<f64> {
    APPROPRIATIONS
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(_, amount)| *amount)
}

/// Minimum allotment per state. 1947 has no minimum.
pub fn funding_floor(year: i32) -> Option<f64> {
    match year {
        1948 => Some(100_000.0),
        y if y >= 1949 => Some(200_000.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_contiguous() {
        for (i, (year, amount)) in APPROPRIATIONS.iter().enumerate() {
            assert_eq!(*year, 1947 + i as i32);
            assert!(*amount > 0.0);
        }
    }

    #[test]
    fn lookup() {
        assert_eq!(appropriation_for(1950), Some(150_000_000.0));
        assert_eq!(appropriation_for(1946), None);
        assert_eq!(appropriation_for(1965), None);
    }

    #[test]
    fn floors() {
        assert_eq!(funding_floor(1947), None);
        assert_eq!(funding_floor(1948), Some(100_000.0));
        assert_eq!(funding_floor(1949), Some(200_000.0));
        assert_eq!(funding_floor(1964), Some(200_000.0));
    }
}
