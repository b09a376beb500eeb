//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `hbpanel` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                  |
//! |---------|------------|----------------------------------------------|
//! | 0       | Universal  | Success                                      |
//! | 1       | Universal  | General error (unspecified)                  |
//! | 2       | Universal  | CLI usage error (bad args)                   |
//! | 3-9     | io/config  | Cannot read/write files, bad config, bad CSV |
//! | 10-19   | integrity  | Structural failures of the panel pipeline    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `panel_exit_code` or the command's error handling

use hillburton_panel::PanelError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - panel built and all artifacts written.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments. clap exits with this on its own.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// IO / config (3-9)
// =============================================================================

/// Cannot read an input file or write an artifact.
pub const EXIT_IO: u8 = 3;

/// Config file does not parse or fails validation.
pub const EXIT_CONFIG: u8 = 4;

/// Malformed delimited input (unterminated quote, invalid UTF-8).
pub const EXIT_CSV: u8 = 5;

// =============================================================================
// Integrity (10-19)
// =============================================================================

/// A required identity or year column cannot be resolved.
pub const EXIT_COLUMN_RESOLUTION: u8 = 10;

/// An inner join that must be total has unmatched keys.
pub const EXIT_MERGE_INTEGRITY: u8 = 11;

/// Final panel row count, per-year count, uniqueness or completeness failed.
pub const EXIT_BALANCE_VIOLATION: u8 = 12;

/// Map an engine error to its exit code.
pub fn panel_exit_code(err: &PanelError) -> u8 {
    match err {
        PanelError::ConfigParse(_) | PanelError::ConfigValidation(_) => EXIT_CONFIG,
        PanelError::ColumnResolution { .. } => EXIT_COLUMN_RESOLUTION,
        PanelError::MergeIntegrity(_) => EXIT_MERGE_INTEGRITY,
        PanelError::BalanceViolation(_) => EXIT_BALANCE_VIOLATION,
        PanelError::Csv { .. } => EXIT_CSV,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_IO,
            EXIT_CONFIG,
            EXIT_CSV,
            EXIT_COLUMN_RESOLUTION,
            EXIT_MERGE_INTEGRITY,
            EXIT_BALANCE_VIOLATION,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn column_error_maps_to_its_code() {
        let err = PanelError::ColumnResolution {
            source: "income".into(),
            detail: "missing column 'state'".into(),
        };
        assert_eq!(panel_exit_code(&err), EXIT_COLUMN_RESOLUTION);
        assert_eq!(panel_exit_code(&PanelError::ConfigParse("x".into())), EXIT_CONFIG);
    }
}
