// Formula evaluator - computes numeric values from parsed expressions

use super::parser::{Expr, Op};
use crate::cell_ref::CellRef;

/// Source of committed cell values during evaluation.
pub trait CellLookup {
    /// Current value of a cell; a cell never assigned reads as 0.
    fn value(&self, cell: CellRef) -> f64;
}

/// Evaluate an expression against committed cell values.
///
/// Evaluation never mutates cells. Division by zero, a range outside a
/// function argument, and an unknown function name are errors.
pub fn evaluate<L: CellLookup>(expr: &Expr, lookup: &L) -> Result<f64, String> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::CellRef(cell) => Ok(lookup.value(*cell)),
        Expr::Range { .. } => Err("Range must be used in a function".to_string()),
        Expr::Function { name, args } => evaluate_function(name, args, lookup),
        Expr::BinaryOp { op, left, right } => {
            let left_val = evaluate(left, lookup)?;
            let right_val = evaluate(right, lookup)?;
            match op {
                Op::Add => Ok(left_val + right_val),
                Op::Sub => Ok(left_val - right_val),
                Op::Mul => Ok(left_val * right_val),
                Op::Div => {
                    if right_val == 0.0 {
                        return Err("Division by zero".to_string());
                    }
                    Ok(left_val / right_val)
                }
            }
        }
    }
}

fn evaluate_function<L: CellLookup>(
    name: &str,
    args: &[Expr],
    lookup: &L,
) -> Result<f64, String> {
    match name {
        "SUM" => {
            let values = collect_numbers(args, lookup)?;
            Ok(values.iter().sum())
        }
        "AVERAGE" | "AVG" => {
            let values = collect_numbers(args, lookup)?;
            if values.is_empty() {
                Err("AVERAGE requires at least one value".to_string())
            } else {
                Ok(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        "MIN" => {
            let values = collect_numbers(args, lookup)?;
            if values.is_empty() {
                Ok(0.0)
            } else {
                Ok(values.iter().cloned().fold(f64::INFINITY, f64::min))
            }
        }
        "MAX" => {
            let values = collect_numbers(args, lookup)?;
            if values.is_empty() {
                Ok(0.0)
            } else {
                Ok(values.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
            }
        }
        _ => Err(format!("Unknown function: {}", name)),
    }
}

/// Flatten argument values; a range contributes every covered cell,
/// with missing cells counting as 0.
fn collect_numbers<L: CellLookup>(args: &[Expr], lookup: &L) -> Result<Vec<f64>, String> {
    let mut values = Vec::new();
    for arg in args {
        match arg {
            Expr::Range { start, end } => {
                let start_row = start.row.min(end.row);
                let end_row = start.row.max(end.row);
                let start_col = start.col.min(end.col);
                let end_col = start.col.max(end.col);
                for row in start_row..=end_row {
                    for col in start_col..=end_col {
                        values.push(lookup.value(CellRef::new(row, col)));
                    }
                }
            }
            _ => values.push(evaluate(arg, lookup)?),
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell_ref::Limits;
    use crate::formula::parser::parse;
    use rustc_hash::FxHashMap;

    struct MapLookup(FxHashMap<CellRef, f64>);

    impl CellLookup for MapLookup {
        fn value(&self, cell: CellRef) -> f64 {
            self.0.get(&cell).copied().unwrap_or(0.0)
        }
    }

    fn lookup(pairs: &[(&str, f64)]) -> MapLookup {
        let limits = Limits::default();
        let mut map = FxHashMap::default();
        for (spec, value) in pairs {
            map.insert(CellRef::parse(spec, &limits).unwrap(), *value);
        }
        MapLookup(map)
    }

    fn eval_str(formula: &str, lookup: &MapLookup) -> Result<f64, String> {
        let expr = parse(formula, &Limits::default()).unwrap();
        evaluate(&expr, lookup)
    }

    #[test]
    fn test_arithmetic() {
        let empty = lookup(&[]);
        assert_eq!(eval_str("1+2*3", &empty), Ok(7.0));
        assert_eq!(eval_str("(1+2)*3", &empty), Ok(9.0));
        assert_eq!(eval_str("10-2-3", &empty), Ok(5.0));
        assert_eq!(eval_str("7/2", &empty), Ok(3.5));
        assert_eq!(eval_str("-4+1", &empty), Ok(-3.0));
    }

    #[test]
    fn test_cell_reference_resolution() {
        let cells = lookup(&[("a1", 10.0), ("b2", 2.5)]);
        assert_eq!(eval_str("a1*b2", &cells), Ok(25.0));
    }

    #[test]
    fn test_missing_cell_reads_zero() {
        let empty = lookup(&[]);
        assert_eq!(eval_str("z99+5", &empty), Ok(5.0));
    }

    #[test]
    fn test_division_by_zero() {
        let cells = lookup(&[("a1", 0.0)]);
        assert_eq!(eval_str("1/0", &cells), Err("Division by zero".to_string()));
        assert_eq!(eval_str("1/a1", &cells), Err("Division by zero".to_string()));
    }

    #[test]
    fn test_sum_over_range() {
        let cells = lookup(&[("a1", 1.0), ("a2", 2.0), ("a3", 3.0)]);
        assert_eq!(eval_str("sum(a1:a3)", &cells), Ok(6.0));
        // missing cells in the rectangle count as 0
        assert_eq!(eval_str("sum(a1:b3)", &cells), Ok(6.0));
    }

    #[test]
    fn test_range_corner_order_normalized() {
        let cells = lookup(&[("a1", 1.0), ("b2", 2.0)]);
        assert_eq!(eval_str("sum(b2:a1)", &cells), Ok(3.0));
    }

    #[test]
    fn test_sum_mixed_args() {
        let cells = lookup(&[("a1", 1.0), ("a2", 2.0)]);
        assert_eq!(eval_str("sum(a1:a2, 10, a1*2)", &cells), Ok(15.0));
    }

    #[test]
    fn test_sum_empty_is_zero() {
        let empty = lookup(&[]);
        assert_eq!(eval_str("sum()", &empty), Ok(0.0));
    }

    #[test]
    fn test_average_counts_every_range_cell() {
        // a1..a4 rectangle has 4 cells, two of them unset
        let cells = lookup(&[("a1", 4.0), ("a2", 8.0)]);
        assert_eq!(eval_str("average(a1:a4)", &cells), Ok(3.0));
        assert_eq!(eval_str("avg(a1:a2)", &cells), Ok(6.0));
    }

    #[test]
    fn test_average_empty_is_error() {
        let empty = lookup(&[]);
        assert_eq!(
            eval_str("average()", &empty),
            Err("AVERAGE requires at least one value".to_string())
        );
    }

    #[test]
    fn test_min_max() {
        let cells = lookup(&[("a1", 3.0), ("a2", -1.0), ("a3", 7.0)]);
        assert_eq!(eval_str("min(a1:a3)", &cells), Ok(-1.0));
        assert_eq!(eval_str("max(a1:a3)", &cells), Ok(7.0));
        assert_eq!(eval_str("min()", &cells), Ok(0.0));
        assert_eq!(eval_str("max()", &cells), Ok(0.0));
    }

    #[test]
    fn test_unknown_function() {
        let empty = lookup(&[]);
        assert_eq!(
            eval_str("median(1,2)", &empty),
            Err("Unknown function: MEDIAN".to_string())
        );
    }

    #[test]
    fn test_bare_range_is_error() {
        let empty = lookup(&[]);
        assert_eq!(
            eval_str("a1:a3", &empty),
            Err("Range must be used in a function".to_string())
        );
        assert_eq!(
            eval_str("a1:a3+1", &empty),
            Err("Range must be used in a function".to_string())
        );
    }

    #[test]
    fn test_nested_function_args() {
        let cells = lookup(&[("a1", 2.0), ("a2", 4.0)]);
        assert_eq!(eval_str("sum(min(a1, a2), max(a1, a2))", &cells), Ok(6.0));
    }
}
