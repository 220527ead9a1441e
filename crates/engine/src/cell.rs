use rustc_hash::FxHashSet;

use super::cell_ref::CellRef;
use super::formula::parser::Expr;

/// Per-cell record: committed formula state plus reverse dependency edges.
///
/// `dependents` holds the cells whose committed formulas reference this
/// cell. It is maintained by the spreadsheet, not derived from `ast`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellInfo {
    /// Result of the last successful evaluation; 0 for a cell with no formula
    pub value: f64,
    /// Raw formula text as committed; empty string means no formula set
    pub expr: String,
    /// Parsed form of `expr`, absent when `expr` is empty
    pub ast: Option<Expr>,
    /// Cells whose committed formulas reference this cell
    pub dependents: FxHashSet<CellRef>,
}

impl CellInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the formula and value, keeping inbound dependents intact.
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.expr.clear();
        self.ast = None;
    }

    pub fn add_dependent(&mut self, cell: CellRef) {
        self.dependents.insert(cell);
    }

    pub fn rm_dependent(&mut self, cell: CellRef) {
        self.dependents.remove(&cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_dependents() {
        let mut info = CellInfo::new();
        info.value = 5.0;
        info.expr = "=a1+1".to_string();
        info.add_dependent(CellRef::new(2, 0));

        info.reset();

        assert_eq!(info.value, 0.0);
        assert!(info.expr.is_empty());
        assert!(info.ast.is_none());
        assert_eq!(info.dependents.len(), 1);
    }

    #[test]
    fn test_add_rm_dependent() {
        let mut info = CellInfo::new();
        let b1 = CellRef::new(0, 1);
        info.add_dependent(b1);
        info.add_dependent(b1);
        assert_eq!(info.dependents.len(), 1);
        info.rm_dependent(b1);
        assert!(info.dependents.is_empty());
    }
}
