//! Cell registry and recalculation engine.
//!
//! `Spreadsheet` owns every cell record and keeps the dependency graph
//! consistent across formula commits, removals, and replay. All
//! mutating operations are atomic: a rejected update touches nothing,
//! and cycle checks run before any state changes.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::CellInfo;
use crate::cell_ref::{CellRef, Limits};
use crate::formula::eval::{self, CellLookup};
use crate::formula::parser::{self, Expr};
use crate::formula::refs::extract_refs;
use crate::recalc::{CycleReport, EvalError, RecalcError, RecalcReport};

#[derive(Debug, Clone, PartialEq)]
pub struct Spreadsheet {
    name: String,
    limits: Limits,
    cells: FxHashMap<CellRef, CellInfo>,
}

/// Read-only view of the registry for formula evaluation.
struct RegistryLookup<'a> {
    cells: &'a FxHashMap<CellRef, CellInfo>,
}

impl CellLookup for RegistryLookup<'_> {
    fn value(&self, cell: CellRef) -> f64 {
        self.cells.get(&cell).map(|info| info.value).unwrap_or(0.0)
    }
}

impl Spreadsheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_limits(name, Limits::default())
    }

    pub fn with_limits(name: impl Into<String>, limits: Limits) -> Self {
        Self {
            name: name.into(),
            limits,
            cells: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Parse a textual cell identifier against this sheet's bounds.
    pub fn cell_ref(&self, id: &str) -> Result<CellRef, EvalError> {
        CellRef::parse(id, &self.limits).map_err(EvalError::Syntax)
    }

    /// Commit a formula to a cell and recompute every affected cell.
    ///
    /// On success the report maps each recomputed cell, including the
    /// one named here, to its new value. Dependents that fail to
    /// recompute keep their previous value and are listed in the
    /// report's `failed` instead. On error nothing is mutated.
    pub fn eval(&mut self, id: &str, expr: &str) -> Result<RecalcReport, EvalError> {
        let cell = self.cell_ref(id)?;
        self.eval_at(cell, expr)
    }

    /// Typed-key variant of [`eval`](Self::eval).
    pub fn eval_at(&mut self, cell: CellRef, expr: &str) -> Result<RecalcReport, EvalError> {
        self.apply(cell, expr, false)
    }

    /// Replay variant of [`eval`](Self::eval) for loading stored
    /// formulas. A compute failure on the named cell still commits the
    /// formula and its edges, leaving the value at its previous state
    /// and recording the failure in the report. A stored sheet can
    /// legitimately hold formulas that no longer evaluate, so replay
    /// must not reject them.
    pub fn restore(&mut self, id: &str, expr: &str) -> Result<RecalcReport, EvalError> {
        let cell = self.cell_ref(id)?;
        self.apply(cell, expr, true)
    }

    fn apply(
        &mut self,
        cell: CellRef,
        expr: &str,
        keep_on_compute_error: bool,
    ) -> Result<RecalcReport, EvalError> {
        let ast = parser::parse(expr, &self.limits).map_err(EvalError::Syntax)?;
        let refs = extract_refs(&ast);

        if let Some(report) = self.find_cycle(cell, &refs) {
            return Err(EvalError::Circular(report));
        }

        let mut report = RecalcReport::new();

        let lookup = RegistryLookup { cells: &self.cells };
        let value = match eval::evaluate(&ast, &lookup) {
            Ok(v) => Some(v),
            Err(e) => {
                if keep_on_compute_error {
                    report.failed.push(RecalcError::new(cell, e));
                    None
                } else {
                    return Err(EvalError::Compute(e));
                }
            }
        };

        self.commit(cell, expr, ast, &refs, value);
        if let Some(v) = value {
            report.updates.insert(cell, v);
        }
        self.propagate(cell, &mut report);
        Ok(report)
    }

    /// Clear a cell's formula and value.
    ///
    /// Inbound dependents are kept: other formulas may still reference
    /// this cell and will read it as 0 on their next recomputation.
    /// Nothing is propagated here.
    pub fn remove(&mut self, id: &str) -> Result<(), EvalError> {
        let cell = self.cell_ref(id)?;
        self.remove_at(cell);
        Ok(())
    }

    /// Typed-key variant of [`remove`](Self::remove).
    pub fn remove_at(&mut self, cell: CellRef) {
        self.detach(cell);
        if let Some(info) = self.cells.get_mut(&cell) {
            info.reset();
        }
    }

    /// Reset the whole registry.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Current value of a cell named by a textual identifier.
    pub fn query_value(&self, id: &str) -> Result<f64, EvalError> {
        let cell = self.cell_ref(id)?;
        Ok(self.value(cell))
    }

    /// Current value of a cell; unset cells read 0.
    pub fn value(&self, cell: CellRef) -> f64 {
        self.cells.get(&cell).map(|info| info.value).unwrap_or(0.0)
    }

    /// Committed formula text for a cell; empty string when unset.
    pub fn expr_at(&self, cell: CellRef) -> &str {
        self.cells
            .get(&cell)
            .map(|info| info.expr.as_str())
            .unwrap_or("")
    }

    /// All cells with a committed formula, in row-major order.
    pub fn all_exprs(&self) -> Vec<(CellRef, String)> {
        let mut exprs: Vec<(CellRef, String)> = self
            .cells
            .iter()
            .filter(|(_, info)| !info.expr.is_empty())
            .map(|(cell, info)| (*cell, info.expr.clone()))
            .collect();
        exprs.sort_by_key(|(cell, _)| *cell);
        exprs
    }

    /// Evaluate a formula against committed values without committing.
    pub fn preview(&self, expr: &str) -> Result<f64, EvalError> {
        let ast = parser::parse(expr, &self.limits).map_err(EvalError::Syntax)?;
        let lookup = RegistryLookup { cells: &self.cells };
        eval::evaluate(&ast, &lookup).map_err(EvalError::Compute)
    }

    // =========================================================================
    // Dependency graph
    // =========================================================================

    /// Check whether committing `refs` as `target`'s references would
    /// close a cycle. Runs before any mutation: depth-first search
    /// along committed formula references from each newly referenced
    /// cell, looking for a path back to `target`.
    fn find_cycle(&self, target: CellRef, refs: &[CellRef]) -> Option<CycleReport> {
        for &start in refs {
            if start == target {
                return Some(CycleReport::self_reference(target));
            }
            let mut visited = FxHashSet::default();
            let mut path = Vec::new();
            if self.path_to(start, target, &mut visited, &mut path) {
                // path runs start .. target; report target → start .. target
                let mut cells = Vec::with_capacity(path.len() + 1);
                cells.push(target);
                cells.extend(path);
                return Some(CycleReport::cycle(cells));
            }
        }
        None
    }

    /// DFS along committed references from `from`, recording the path
    /// when `target` is reachable.
    fn path_to(
        &self,
        from: CellRef,
        target: CellRef,
        visited: &mut FxHashSet<CellRef>,
        path: &mut Vec<CellRef>,
    ) -> bool {
        if !visited.insert(from) {
            return false;
        }
        path.push(from);
        if from == target {
            return true;
        }
        if let Some(ast) = self.cells.get(&from).and_then(|info| info.ast.as_ref()) {
            for next in extract_refs(ast) {
                if self.path_to(next, target, visited, path) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }

    /// Swap the committed state of `cell`: detach edges derived from
    /// its previous AST, attach edges for `refs` (lazily creating
    /// registry entries), store the new expr/ast, and the new value
    /// when evaluation produced one.
    fn commit(&mut self, cell: CellRef, expr: &str, ast: Expr, refs: &[CellRef], value: Option<f64>) {
        self.detach(cell);
        for &referenced in refs {
            self.cells.entry(referenced).or_default().add_dependent(cell);
        }
        let info = self.cells.entry(cell).or_default();
        info.expr = expr.to_string();
        info.ast = Some(ast);
        if let Some(v) = value {
            info.value = v;
        }
    }

    /// Remove `cell` from the dependents of everything its previous
    /// AST referenced.
    fn detach(&mut self, cell: CellRef) {
        let old_refs = match self.cells.get(&cell).and_then(|info| info.ast.as_ref()) {
            Some(ast) => extract_refs(ast),
            None => return,
        };
        for referenced in old_refs {
            if let Some(info) = self.cells.get_mut(&referenced) {
                info.rm_dependent(cell);
            }
        }
    }

    // =========================================================================
    // Recalculation
    // =========================================================================

    /// Recompute every cell transitively dependent on `start`, each
    /// exactly once, dependencies before dependents.
    fn propagate(&mut self, start: CellRef, report: &mut RecalcReport) {
        // Affected set: everything reachable through dependents edges,
        // excluding the start cell itself.
        let mut seen = FxHashSet::default();
        seen.insert(start);
        let mut affected = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(cell) = queue.pop_front() {
            if let Some(info) = self.cells.get(&cell) {
                for &dep in &info.dependents {
                    if seen.insert(dep) {
                        affected.push(dep);
                        queue.push_back(dep);
                    }
                }
            }
        }

        if affected.is_empty() {
            return;
        }

        // Kahn's algorithm over the affected subgraph: a cell's
        // indegree counts only its references within the affected set.
        let affected_set: FxHashSet<CellRef> = affected.iter().copied().collect();
        let mut indegree: FxHashMap<CellRef, usize> = FxHashMap::default();
        for &cell in &affected {
            let count = self
                .cells
                .get(&cell)
                .and_then(|info| info.ast.as_ref())
                .map(|ast| {
                    extract_refs(ast)
                        .iter()
                        .filter(|r| affected_set.contains(r))
                        .count()
                })
                .unwrap_or(0);
            indegree.insert(cell, count);
        }

        let mut ready: VecDeque<CellRef> = affected
            .iter()
            .copied()
            .filter(|cell| indegree[cell] == 0)
            .collect();

        while let Some(cell) = ready.pop_front() {
            match self.recompute_cell(cell) {
                Ok(Some(value)) => {
                    report.updates.insert(cell, value);
                }
                Ok(None) => {}
                Err(e) => {
                    // Keep the previous value; downstream cells still run
                    report.failed.push(RecalcError::new(cell, e));
                }
            }

            let dependents: Vec<CellRef> = self
                .cells
                .get(&cell)
                .map(|info| info.dependents.iter().copied().collect())
                .unwrap_or_default();
            for dep in dependents {
                if let Some(count) = indegree.get_mut(&dep) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(dep);
                    }
                }
            }
        }
    }

    /// Re-evaluate one cell's committed AST against current values.
    /// Cells with no formula recompute to nothing.
    fn recompute_cell(&mut self, cell: CellRef) -> Result<Option<f64>, String> {
        let value = {
            let info = match self.cells.get(&cell) {
                Some(info) => info,
                None => return Ok(None),
            };
            let ast = match &info.ast {
                Some(ast) => ast,
                None => return Ok(None),
            };
            let lookup = RegistryLookup { cells: &self.cells };
            eval::evaluate(ast, &lookup)?
        };
        if let Some(info) = self.cells.get_mut(&cell) {
            info.value = value;
        }
        Ok(Some(value))
    }
}
