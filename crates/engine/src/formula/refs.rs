//! Reference extraction from formula AST.
//!
//! Extracts the cells a formula reads, for dependency graph
//! construction and cycle reporting.

use rustc_hash::FxHashSet;

use crate::cell_ref::CellRef;

use super::parser::Expr;

/// Extract all cell references from an expression.
///
/// Returns a deduplicated list in first-appearance order, so cycle
/// searches and their reports walk references in the order the
/// formula names them.
pub fn extract_refs(expr: &Expr) -> Vec<CellRef> {
    let mut refs = Vec::new();
    let mut seen = FxHashSet::default();
    collect_refs(expr, &mut refs, &mut seen);
    refs
}

/// Recursively collect cell references from an expression.
fn collect_refs(expr: &Expr, refs: &mut Vec<CellRef>, seen: &mut FxHashSet<CellRef>) {
    match expr {
        Expr::Number(_) => {
            // Literals have no dependencies
        }

        Expr::CellRef(cell) => {
            if seen.insert(*cell) {
                refs.push(*cell);
            }
        }

        Expr::Range { start, end } => {
            // Expand range to individual cells, corners normalized
            let start_row = start.row.min(end.row);
            let end_row = start.row.max(end.row);
            let start_col = start.col.min(end.col);
            let end_col = start.col.max(end.col);
            for row in start_row..=end_row {
                for col in start_col..=end_col {
                    let cell = CellRef::new(row, col);
                    if seen.insert(cell) {
                        refs.push(cell);
                    }
                }
            }
        }

        Expr::Function { args, .. } => {
            for arg in args {
                collect_refs(arg, refs, seen);
            }
        }

        Expr::BinaryOp { left, right, .. } => {
            collect_refs(left, refs, seen);
            collect_refs(right, refs, seen);
        }
    }
}
