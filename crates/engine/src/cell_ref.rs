//! Cell coordinates and grid bounds.
//!
//! A `CellRef` identifies a cell by zero-based row/column indices. The
//! text form is column letters followed by a 1-based row number
//! (`a1`, `aa10`), case-insensitive on input, lowercase canonical.

/// Grid bounds enforced when parsing cell references.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Number of addressable rows (1-based row numbers run 1..=max_rows)
    pub max_rows: usize,
    /// Number of addressable columns
    pub max_cols: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_rows: 65536,
            max_cols: 256,
        }
    }
}

/// Coordinates of a single cell.
///
/// Ordering is row-major (row first, then column), which gives
/// `a1 < b1 < a2` the expected reading order when sorted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
}

impl CellRef {
    /// Create a new CellRef.
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse a textual cell reference against the given bounds.
    ///
    /// Accepts any mix of letter case; rejects empty column/row parts,
    /// row number 0, and coordinates outside `limits`.
    pub fn parse(spec: &str, limits: &Limits) -> Result<Self, String> {
        let s = spec.trim();
        let letters: String = s.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        let digits = &s[letters.len()..];
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(format!("Invalid cell reference: {}", spec));
        }
        let col = letters_to_col(&letters)
            .ok_or_else(|| format!("Invalid cell reference: {}", spec))?;
        let row: usize = digits
            .parse()
            .map_err(|_| format!("Invalid cell reference: {}", spec))?;
        if row == 0 {
            return Err(format!("Invalid cell reference: {}", spec));
        }
        if row > limits.max_rows {
            return Err(format!("Row {} out of range (limit {})", row, limits.max_rows));
        }
        if col >= limits.max_cols {
            return Err(format!(
                "Column {} out of range (limit {})",
                letters.to_ascii_lowercase(),
                limits.max_cols
            ));
        }
        Ok(Self { row: row - 1, col })
    }
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", col_to_letters(self.col), self.row + 1)
    }
}

impl serde::Serialize for CellRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Convert letter(s) to a 0-based column index, rejecting overflow.
fn letters_to_col(letters: &str) -> Option<usize> {
    let mut acc: usize = 0;
    for c in letters.chars() {
        let d = (c.to_ascii_uppercase() as u8 - b'A') as usize;
        acc = acc.checked_mul(26)?.checked_add(d + 1)?;
    }
    Some(acc - 1)
}

/// Convert 0-based column index to letter(s): 0=a, 1=b, ..., 25=z, 26=aa.
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'a' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}
