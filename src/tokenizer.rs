/**************************************************************************/
/*  This file is part of POPCON.                                          */
/*                                                                        */
/*  Copyright (C) 2025                                                    */
/*    CEA (Commissariat à l'énergie atomique et aux énergies              */
/*         alternatives)                                                  */
/*                                                                        */
/*  you can redistribute it and/or modify it under the terms of the GNU   */
/*  Lesser General Public License as published by the Free Software       */
/*  Foundation, version 2.1.                                              */
/*                                                                        */
/*  It is distributed in the hope that it will be useful,                 */
/*  but WITHOUT ANY WARRANTY; without even the implied warranty of        */
/*  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the         */
/*  GNU Lesser General Public License for more details.                   */
/*                                                                        */
/*  See the GNU Lesser General Public License version 2.1                 */
/*  for more details (enclosed in the file licenses/LGPLv2.1).            */
/*                                                                        */
/**************************************************************************/

//! Lexical primitives for DIMACS files

use crate::input::{ByteSource, RandomAccess};

/// Malformed input. Conversion must stop when this happens.
///
/// Callers recover it from an `anyhow::Error` with `downcast_ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// A digit or a `p cnf` header was expected. `found` is `None` at end of input.
    UnexpectedChar {
        /// the offending byte
        found: Option<u8>,
        /// 1-based line
        line: usize,
    },
    /// A `c ind` directive lists something which is not a variable
    NonPositiveIndependent {
        /// the offending value
        value: i64,
        /// 1-based line
        line: usize,
    },
    /// A `p cnf` header declares a negative number of variables or clauses
    NegativeCount {
        /// the offending value
        value: i64,
        /// 1-based line
        line: usize,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            ParseError::UnexpectedChar {
                found: Some(c),
                line,
            } => write!(
                f,
                "unexpected char '{}' at line {}",
                std::ascii::escape_default(c),
                line
            ),
            ParseError::UnexpectedChar { found: None, line } => {
                write!(f, "unexpected end of input at line {}", line)
            }
            ParseError::NonPositiveIndependent { value, line } => write!(
                f,
                "non positive variable {} in independent support at line {}",
                value, line
            ),
            ParseError::NegativeCount { value, line } => {
                write!(f, "negative count {} in header at line {}", value, line)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    /// An `UnexpectedChar` error at the current position of `source`
    pub fn unexpected<S: ByteSource>(source: &S) -> ParseError {
        ParseError::UnexpectedChar {
            found: source.peek(),
            line: source.line(),
        }
    }
}

/// Tab, newline, vertical tab, form feed, carriage return and space.
pub fn is_whitespace(c: u8) -> bool {
    (9..=13).contains(&c) || c == b' '
}

/// Consumes all whitespace at the current position.
pub fn skip_whitespace<S: ByteSource>(source: &mut S) -> anyhow::Result<()> {
    while let Some(c) = source.peek() {
        if !is_whitespace(c) {
            break;
        }
        source.advance()?;
    }
    Ok(())
}

/// Consumes everything up to and including the next newline.
pub fn skip_line<S: ByteSource>(source: &mut S) -> anyhow::Result<()> {
    while let Some(c) = source.peek() {
        source.advance()?;
        if c == b'\n' {
            break;
        }
    }
    Ok(())
}

/// Parses an optionally signed decimal integer, after leading whitespace.
///
/// Overflow wraps around silently.
/// # Example
/// ```
/// use dep2gcnf::input::SliceSource;
/// use dep2gcnf::tokenizer::parse_int;
/// let mut source = SliceSource::new(b"  -12 +3 x");
/// assert_eq!(parse_int(&mut source).unwrap(), -12);
/// assert_eq!(parse_int(&mut source).unwrap(), 3);
/// assert!(parse_int(&mut source).is_err());
/// ```
pub fn parse_int<S: ByteSource>(source: &mut S) -> anyhow::Result<i64> {
    skip_whitespace(source)?;
    let negative = match source.peek() {
        Some(b'-') => {
            source.advance()?;
            true
        }
        Some(b'+') => {
            source.advance()?;
            false
        }
        _ => false,
    };
    match source.peek() {
        Some(c) if c.is_ascii_digit() => {}
        _ => return Err(ParseError::unexpected(source).into()),
    }
    let mut value: i64 = 0;
    while let Some(c) = source.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        value = value.wrapping_mul(10).wrapping_add((c - b'0') as i64);
        source.advance()?;
    }
    Ok(if negative { value.wrapping_neg() } else { value })
}

/// If the input starts with `literal`, consumes it and returns true. Otherwise nothing is
/// consumed.
pub fn match_literal<S: RandomAccess>(source: &mut S, literal: &[u8]) -> anyhow::Result<bool> {
    for (offset, &expected) in literal.iter().enumerate() {
        if source.peek_at(offset) != Some(expected) {
            return Ok(false);
        }
    }
    source.advance_by(literal.len())?;
    Ok(true)
}

/// Consumes `literal` byte by byte, and returns false on the first byte which differs.
///
/// The bytes matched before the mismatch stay consumed: the mismatching byte becomes the
/// current one. The dispatch on header and comment lines relies on this position.
pub fn eager_match<S: ByteSource>(source: &mut S, literal: &[u8]) -> anyhow::Result<bool> {
    for &expected in literal {
        if source.peek() != Some(expected) {
            return Ok(false);
        }
        source.advance()?;
    }
    Ok(true)
}

/// Reads integers into `lits` until a 0, which is consumed but not stored.
pub fn read_clause<S: ByteSource>(source: &mut S, lits: &mut Vec<i64>) -> anyhow::Result<()> {
    lits.clear();
    loop {
        let lit = parse_int(source)?;
        if lit == 0 {
            return Ok(());
        }
        lits.push(lit);
    }
}
