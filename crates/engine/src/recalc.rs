//! Recalculation types and reporting.
//!
//! Defines the result report for committed formula updates and the
//! error types surfaced by parsing, cycle detection, and evaluation.

use rustc_hash::FxHashMap;

use crate::cell_ref::CellRef;

/// Values recomputed by one commit, keyed by cell.
pub type Updates = FxHashMap<CellRef, f64>;

/// Report from a committed formula update.
///
/// `updates` holds every cell whose value was recomputed by the call,
/// including the cell that triggered it. Dependents whose
/// recomputation failed keep their previous value and are listed in
/// `failed` instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecalcReport {
    /// New values, keyed by cell.
    pub updates: Updates,

    /// Dependent cells that failed to recompute during propagation.
    pub failed: Vec<RecalcError>,
}

impl RecalcReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value recomputed for `cell` in this call, if any.
    pub fn value(&self, cell: CellRef) -> Option<f64> {
        self.updates.get(&cell).copied()
    }
}

/// A per-cell failure during the propagation sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct RecalcError {
    /// The cell where the error occurred.
    pub cell: CellRef,

    /// Description of the error.
    pub error: String,
}

impl RecalcError {
    /// Create a new recalc error.
    pub fn new(cell: CellRef, error: impl Into<String>) -> Self {
        Self {
            cell,
            error: error.into(),
        }
    }
}

/// Report when cycle detection finds a circular reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Cells along the cycle path, starting and ending at the cell
    /// whose update was rejected.
    pub cells: Vec<CellRef>,

    /// Human-readable description of the cycle.
    pub message: String,
}

impl CycleReport {
    /// Create a new cycle report.
    pub fn new(cells: Vec<CellRef>, message: impl Into<String>) -> Self {
        Self {
            cells,
            message: message.into(),
        }
    }

    /// Create a cycle report for a self-referencing cell.
    pub fn self_reference(cell: CellRef) -> Self {
        Self {
            cells: vec![cell],
            message: format!("Cell {} references itself", cell),
        }
    }

    /// Create a cycle report for a multi-cell cycle path.
    pub fn cycle(cells: Vec<CellRef>) -> Self {
        let cell_list: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        let message = format!("Circular reference: {}", cell_list.join(" → "));
        Self { cells, message }
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CycleReport {}

/// Why a formula update was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Malformed formula text or cell identifier.
    Syntax(String),
    /// The update would close a dependency cycle.
    Circular(CycleReport),
    /// The formula parsed but could not be computed.
    Compute(String),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::Syntax(msg) => write!(f, "syntax error: {}", msg),
            EvalError::Circular(report) => write!(f, "{}", report),
            EvalError::Compute(msg) => write!(f, "compute error: {}", msg),
        }
    }
}

impl std::error::Error for EvalError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: usize, col: usize) -> CellRef {
        CellRef::new(row, col)
    }

    #[test]
    fn test_recalc_report_default() {
        let report = RecalcReport::default();
        assert!(report.updates.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(report.value(cell(0, 0)), None);
    }

    #[test]
    fn test_recalc_report_value() {
        let mut report = RecalcReport::new();
        report.updates.insert(cell(0, 0), 42.0);
        assert_eq!(report.value(cell(0, 0)), Some(42.0));
        assert_eq!(report.value(cell(1, 0)), None);
    }

    #[test]
    fn test_self_reference_message() {
        let report = CycleReport::self_reference(cell(1, 0));
        assert_eq!(report.message, "Cell a2 references itself");
        assert_eq!(report.cells.len(), 1);
    }

    #[test]
    fn test_cycle_message_names_path() {
        // a2 → a1 → a2
        let report = CycleReport::cycle(vec![cell(1, 0), cell(0, 0), cell(1, 0)]);
        assert_eq!(report.message, "Circular reference: a2 → a1 → a2");
    }

    #[test]
    fn test_eval_error_display() {
        let syntax = EvalError::Syntax("Empty formula".to_string());
        assert_eq!(syntax.to_string(), "syntax error: Empty formula");

        let compute = EvalError::Compute("Division by zero".to_string());
        assert_eq!(compute.to_string(), "compute error: Division by zero");

        let circular = EvalError::Circular(CycleReport::self_reference(cell(0, 0)));
        assert_eq!(circular.to_string(), "Cell a1 references itself");
    }
}
