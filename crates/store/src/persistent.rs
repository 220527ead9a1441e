//! Durable spreadsheet facade.
//!
//! `PersistentSheet` pairs the in-memory engine with an on-disk
//! expression store. Every committed edit is written through to the
//! store; opening a file rebuilds the sheet by replaying the stored
//! expressions. Values are never persisted, only formula text.

use std::path::Path;

use gridcalc_engine::cell_ref::Limits;
use gridcalc_engine::recalc::{EvalError, RecalcReport};
use gridcalc_engine::spreadsheet::Spreadsheet;

use crate::sqlite::{ExprStore, StoreError};

/// Error surface of the persistent facade.
#[derive(Debug)]
pub enum SheetError {
    /// The formula was rejected by the engine. Nothing was stored.
    Eval(EvalError),
    /// The in-memory commit succeeded but writing it to disk failed.
    /// The in-memory state is not rolled back.
    Store(StoreError),
    /// A stored expression failed to parse or cycle-check during load.
    Replay { cell_id: String, error: EvalError },
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::Eval(e) => write!(f, "{}", e),
            SheetError::Store(e) => write!(f, "store error: {}", e),
            SheetError::Replay { cell_id, error } => {
                write!(f, "stored formula for {} failed to replay: {}", cell_id, error)
            }
        }
    }
}

impl std::error::Error for SheetError {}

impl From<EvalError> for SheetError {
    fn from(e: EvalError) -> Self {
        SheetError::Eval(e)
    }
}

impl From<StoreError> for SheetError {
    fn from(e: StoreError) -> Self {
        SheetError::Store(e)
    }
}

/// An in-memory spreadsheet backed by a `.sheet` file.
pub struct PersistentSheet {
    sheet: Spreadsheet,
    store: ExprStore,
}

impl PersistentSheet {
    /// Open a sheet file with default limits, creating it if absent.
    pub fn open(path: &Path) -> Result<Self, SheetError> {
        Self::open_with_limits(path, Limits::default())
    }

    /// Open a sheet file and rebuild the in-memory state by replaying
    /// every stored expression. The sheet name comes from the file's
    /// metadata, falling back to the file stem.
    ///
    /// A stored formula that no longer computes (say, it divides by a
    /// cell that is now empty) is tolerated: the cell keeps its
    /// formula and reads as zero until an edit refreshes it. Formulas
    /// that fail to parse or form a cycle abort the load, naming the
    /// offending cell.
    pub fn open_with_limits(path: &Path, limits: Limits) -> Result<Self, SheetError> {
        let store = ExprStore::open(path)?;
        let name = store.name().unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("sheet")
                .to_string()
        });
        let mut sheet = Spreadsheet::with_limits(name, limits);
        for (cell_id, expr) in store.all_pairs()? {
            if let Err(error) = sheet.restore(&cell_id, &expr) {
                return Err(SheetError::Replay { cell_id, error });
            }
        }
        Ok(Self { sheet, store })
    }

    /// Commit a formula in memory, then write it through to the store.
    /// A store failure leaves the in-memory commit in place and is
    /// reported as `SheetError::Store`.
    pub fn eval(&mut self, cell_id: &str, expr: &str) -> Result<RecalcReport, SheetError> {
        let cell = self.sheet.cell_ref(cell_id)?;
        let report = self.sheet.eval_at(cell, expr)?;
        self.store.set_expr(&cell.to_string(), expr)?;
        Ok(report)
    }

    /// Evaluate a formula against current values without committing
    /// anything, in memory or on disk.
    pub fn preview(&self, expr: &str) -> Result<f64, SheetError> {
        Ok(self.sheet.preview(expr)?)
    }

    /// Detach a cell and delete its stored expression. Cells that
    /// reference it are left alone and read it as zero.
    pub fn remove(&mut self, cell_id: &str) -> Result<(), SheetError> {
        let cell = self.sheet.cell_ref(cell_id)?;
        self.sheet.remove_at(cell);
        self.store.remove_cell(&cell.to_string())?;
        Ok(())
    }

    /// Drop every cell, in memory and on disk.
    pub fn clear(&mut self) -> Result<(), SheetError> {
        self.sheet.clear();
        self.store.clear_all()?;
        Ok(())
    }

    pub fn sheet(&self) -> &Spreadsheet {
        &self.sheet
    }

    pub fn name(&self) -> &str {
        self.sheet.name()
    }

    /// Close the underlying store, surfacing flush failures.
    pub fn close(self) -> Result<(), SheetError> {
        self.store.close()?;
        Ok(())
    }
}
