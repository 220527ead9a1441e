// Formula parser - converts formula strings into AST
// Supports: numbers, cell refs (a1), ranges (a1:b3), functions (sum, min, max, average),
// basic math (+, -, *, /) with unary minus/plus, and an optional leading '='

use crate::cell_ref::{CellRef, Limits};

/// Expression AST produced by `parse`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    CellRef(CellRef),
    /// Rectangular range; corners stored as written, normalized at use
    Range {
        start: CellRef,
        end: CellRef,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

/// Parse a formula string into an AST.
///
/// A leading `=` is accepted and skipped, so `"a1+1"` and `"=a1+1"`
/// parse identically. Cell references are validated against `limits`.
pub fn parse(formula: &str, limits: &Limits) -> Result<Expr, String> {
    let formula = formula.trim();
    let input = formula.strip_prefix('=').unwrap_or(formula);

    let tokens = tokenize(input, limits)?;
    if tokens.is_empty() {
        return Err("Empty formula".to_string());
    }
    let (expr, pos) = parse_add_sub(&tokens, 0)?;
    if pos < tokens.len() {
        return Err(format!("Unexpected token after expression at position {}", pos));
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
enum Token {
    Number(f64),
    CellRef(CellRef),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Colon,
    Comma,
}

fn tokenize(input: &str, limits: &Limits) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            ':' => { tokens.push(Token::Colon); chars.next(); }
            ',' => { tokens.push(Token::Comma); chars.next(); }
            'A'..='Z' | 'a'..='z' => {
                // Could be a cell reference (a1) or a function name (sum)
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }

                if looks_like_cell_ref(&ident) {
                    // Out-of-range references are rejected here, not silently clamped
                    let cell = CellRef::parse(&ident, limits)?;
                    tokens.push(Token::CellRef(cell));
                } else {
                    tokens.push(Token::Ident(ident.to_uppercase()));
                }
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {}", num_str))?;
                tokens.push(Token::Number(num));
            }
            _ => return Err(format!("Unexpected character: {}", c)),
        }
    }

    Ok(tokens)
}

/// Letters followed by digits, nothing else (a1, aa10).
fn looks_like_cell_ref(ident: &str) -> bool {
    let letters = ident.bytes().take_while(|b| b.is_ascii_alphabetic()).count();
    letters > 0 && letters < ident.len() && ident.bytes().skip(letters).all(|b| b.is_ascii_digit())
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_primary(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_primary(tokens, pos + 1)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    if pos >= tokens.len() {
        return Err("Unexpected end of expression".to_string());
    }

    match &tokens[pos] {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        Token::CellRef(cell) => {
            // Check if this is a range (a1:b5)
            if pos + 2 < tokens.len() {
                if let Token::Colon = &tokens[pos + 1] {
                    if let Token::CellRef(end) = &tokens[pos + 2] {
                        return Ok((
                            Expr::Range {
                                start: *cell,
                                end: *end,
                            },
                            pos + 3,
                        ));
                    }
                }
            }
            Ok((Expr::CellRef(*cell), pos + 1))
        }
        Token::Ident(name) => {
            // Function call
            if pos + 1 < tokens.len() {
                if let Token::LParen = &tokens[pos + 1] {
                    let (args, new_pos) = parse_function_args(tokens, pos + 2)?;
                    return Ok((
                        Expr::Function {
                            name: name.clone(),
                            args,
                        },
                        new_pos,
                    ));
                }
            }
            Err(format!("Unknown identifier: {}", name))
        }
        Token::LParen => {
            let (expr, pos) = parse_add_sub(tokens, pos + 1)?;
            if pos >= tokens.len() {
                return Err("Missing closing parenthesis".to_string());
            }
            match &tokens[pos] {
                Token::RParen => Ok((expr, pos + 1)),
                _ => Err("Expected closing parenthesis".to_string()),
            }
        }
        Token::Plus => {
            // Unary plus (no-op, just parse the next expression)
            parse_primary(tokens, pos + 1)
        }
        Token::Minus => {
            // Unary minus
            let (expr, pos) = parse_primary(tokens, pos + 1)?;
            Ok((
                Expr::BinaryOp {
                    op: Op::Sub,
                    left: Box::new(Expr::Number(0.0)),
                    right: Box::new(expr),
                },
                pos,
            ))
        }
        _ => Err(format!("Unexpected token at position {}", pos)),
    }
}

fn parse_function_args(tokens: &[Token], pos: usize) -> Result<(Vec<Expr>, usize), String> {
    let mut args = Vec::new();
    let mut pos = pos;

    // Handle empty function call SUM()
    if pos < tokens.len() {
        if let Token::RParen = &tokens[pos] {
            return Ok((args, pos + 1));
        }
    }

    loop {
        let (arg, new_pos) = parse_add_sub(tokens, pos)?;
        args.push(arg);
        pos = new_pos;

        if pos >= tokens.len() {
            return Err("Missing closing parenthesis in function call".to_string());
        }

        match &tokens[pos] {
            Token::RParen => return Ok((args, pos + 1)),
            Token::Comma => pos += 1,
            _ => return Err("Expected comma or closing parenthesis".to_string()),
        }
    }
}
