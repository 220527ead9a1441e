//! CLI exit code registry.
//!
//! This is the single source of truth for gcalc exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | Success                                         |
//! | 1    | General error (unused; prefer a specific code)  |
//! | 2    | Usage error (reported by clap)                  |
//! | 3    | Formula rejected (syntax, circular, compute)    |
//! | 4    | Store failure (SQLite)                          |
//! | 5    | Load failed replaying a stored formula          |

use gridcalc_store::persistent::SheetError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// The engine rejected the formula or cell identifier.
pub const EXIT_FORMULA: u8 = 3;

/// The persistence layer failed; in-memory work is not rolled back.
pub const EXIT_STORE: u8 = 4;

/// A stored formula failed to parse or cycle-check during load.
pub const EXIT_REPLAY: u8 = 5;

/// Map a facade error to its exit code.
pub fn sheet_exit_code(err: &SheetError) -> u8 {
    match err {
        SheetError::Eval(_) => EXIT_FORMULA,
        SheetError::Store(_) => EXIT_STORE,
        SheetError::Replay { .. } => EXIT_REPLAY,
    }
}
