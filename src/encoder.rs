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

//! Encoding of variable dependencies of a CNF formula as a group MUS problem.
//!
//! For a formula `F` on variables `x_1..x_n`, each `x_i` gets a shadow `y_i`, an activation
//! variable `a_i` and a flag `b_i`. The output contains in group 0:
//! - `F(x_1, ..., x_n)` and `F(y_1, ..., y_n)`
//! - `a_i -> (x_i = y_i)` for each i
//! - `(x_i = y_i) -> b_i` for each i
//! - `-b_1 | ... | -b_n`
//!
//! and in group i the unit clause `a_i`. A set of groups is unsatisfiable together with group
//! 0 exactly when the corresponding variables determine all the others, so a GMUS is a
//! minimal independent support.

use crate::gcnf::{GcnfHeader, GcnfWriter};
use crate::input::ByteSource;
use crate::support::IndependentSupport;
use crate::tokenizer::{
    eager_match, parse_int, read_clause, skip_line, skip_whitespace, ParseError,
};
use anyhow::Context;
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info, trace, warn};

/// Counts declared by a `p cnf` line. Variables of the output are numbered relative to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    /// number of variables
    pub vars: i64,
    /// number of clauses
    pub clauses: i64,
}

impl Header {
    /// The copy of `lit` on the shadow variables, same sign.
    /// # Example
    /// ```
    /// use dep2gcnf::Header;
    /// let h = Header { vars: 2, clauses: 1 };
    /// assert_eq!(h.shadow(1), 3);
    /// assert_eq!(h.shadow(-2), -4);
    /// ```
    pub fn shadow(&self, lit: i64) -> i64 {
        if lit > 0 {
            lit.wrapping_add(self.vars)
        } else {
            lit.wrapping_sub(self.vars)
        }
    }

    /// Variable enabling `x = y(x)`
    pub fn activation(&self, var: i64) -> i64 {
        var.wrapping_add(self.vars.wrapping_mul(2))
    }

    /// Variable forced true when `x = y(x)`
    pub fn flag(&self, var: i64) -> i64 {
        var.wrapping_add(self.vars.wrapping_mul(3))
    }

    /// Header of the output: 4 variables and 5 gadget clauses per variable, 2 copies of each
    /// clause, and the clause on flags.
    pub fn gcnf_header(&self) -> GcnfHeader {
        GcnfHeader {
            var_count: self.vars.wrapping_mul(4),
            clause_count: self
                .clauses
                .wrapping_mul(2)
                .wrapping_add(self.vars.wrapping_mul(5))
                .wrapping_add(1),
            group_count: self.vars,
        }
    }
}

/// What happened during a conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    /// variables declared by the last `p cnf` line
    pub var_count: i64,
    /// clauses declared by the last `p cnf` line
    pub clause_count: i64,
    /// header of the output, None if the input had no `p cnf` line
    pub declared: Option<GcnfHeader>,
    /// clauses read from the input
    pub clauses_read: usize,
    /// clauses written to the output, all groups included
    pub clauses_written: usize,
    /// non zero groups written to the output
    pub groups_written: usize,
    /// whether `c ind` directives restricted the groups
    pub use_ind: bool,
    /// true when no `c ind` directive declared any variable
    pub include_all: bool,
    /// variables declared by `c ind` directives, in increasing order
    pub independent_support: Vec<usize>,
}

/// Converts one CNF formula to GCNF in a single pass.
///
/// Clauses are written as soon as they are read, the gadget and the groups once the input is
/// exhausted.
pub struct Encoder<W: Write> {
    out: GcnfWriter<W>,
    /// when true, only variables in `c ind` directives get a group, if any
    use_ind: bool,
    /// counts of the last `p cnf` line
    header: Header,
    /// output header, set by the first `p cnf` line
    declared: Option<GcnfHeader>,
    support: IndependentSupport,
    clauses_read: usize,
    /// reused buffer
    lits: Vec<i64>,
}

impl<W: Write> Encoder<W> {
    /// Creates an encoder writing to `out`.
    pub fn new(out: W, use_ind: bool) -> Self {
        Self {
            out: GcnfWriter::new(out),
            use_ind,
            header: Header::default(),
            declared: None,
            support: IndependentSupport::new(),
            clauses_read: 0,
            lits: Vec::new(),
        }
    }

    /// Reads the whole input and writes the complete GCNF formula.
    ///
    /// On error, the output contains an unspecified prefix of the GCNF formula.
    pub fn run<S: ByteSource>(mut self, source: &mut S) -> anyhow::Result<ConversionSummary> {
        loop {
            skip_whitespace(source).context("reading input")?;
            match source.peek() {
                None => break,
                Some(b'p') => self.read_header(source)?,
                Some(b'c') => self.read_comment(source)?,
                Some(_) => self.read_original_clause(source)?,
            }
        }
        self.finish()
    }

    fn read_header<S: ByteSource>(&mut self, source: &mut S) -> anyhow::Result<()> {
        let line = source.line();
        if !eager_match(source, b"p cnf")? {
            return Err(ParseError::unexpected(source).into());
        }
        let vars = parse_int(source)?;
        let clauses = parse_int(source)?;
        for &value in &[vars, clauses] {
            if value < 0 {
                return Err(ParseError::NegativeCount { value, line }.into());
            }
        }
        self.header = Header { vars, clauses };
        match self.declared {
            None => {
                debug!(vars, clauses, "read CNF header");
                let declared = self.header.gcnf_header();
                self.out
                    .write_header(declared)
                    .context("writing GCNF header")?;
                self.support.reserve(vars as usize);
                self.declared = Some(declared);
            }
            Some(_) => {
                // some benchmarks repeat the header, only the first one is written
                warn!(vars, clauses, line, "ignoring repeated CNF header");
            }
        }
        Ok(())
    }

    fn read_comment<S: ByteSource>(&mut self, source: &mut S) -> anyhow::Result<()> {
        if eager_match(source, b"c ind")? {
            let line = source.line();
            read_clause(source, &mut self.lits)?;
            trace!(line, ids = ?self.lits, "independent support directive");
            self.support.declare(&self.lits, line)?;
        }
        skip_line(source)
    }

    fn read_original_clause<S: ByteSource>(&mut self, source: &mut S) -> anyhow::Result<()> {
        read_clause(source, &mut self.lits)?;
        let header = self.header;
        let lits = &self.lits;
        self.out
            .write_clause(0, lits.iter().copied())
            .context("writing clause")?;
        self.out
            .write_clause(0, lits.iter().map(|&lit| header.shadow(lit)))
            .context("writing shadow clause")?;
        self.clauses_read += 1;
        Ok(())
    }

    /// Writes the gadget and the groups.
    fn finish(self) -> anyhow::Result<ConversionSummary> {
        let Encoder {
            mut out,
            use_ind,
            header,
            declared,
            support,
            clauses_read,
            ..
        } = self;
        if declared.is_none() {
            warn!("no `p cnf` header in input, output has no header either");
        }
        let policy = support.finish();
        let n = header.vars;
        for i in 1..=n {
            let (a, b, y) = (header.activation(i), header.flag(i), header.shadow(i));
            // a_i -> (x_i = y_i)
            out.write_clause(0, [-a, -i, y].iter().copied())?;
            out.write_clause(0, [-a, i, -y].iter().copied())?;
            // (x_i = y_i) -> b_i
            out.write_clause(0, [b, i, y].iter().copied())?;
            out.write_clause(0, [b, -i, -y].iter().copied())?;
        }
        out.write_clause(0, (1..=n).map(|i| -header.flag(i)))?;
        let mut groups_written = 0;
        for i in 1..=n {
            if !use_ind || policy.contains(i as usize) {
                out.write_clause(i, std::iter::once(header.activation(i)))?;
                groups_written += 1;
            }
        }
        out.flush().context("flushing GCNF output")?;
        let summary = ConversionSummary {
            var_count: header.vars,
            clause_count: header.clauses,
            declared,
            clauses_read,
            clauses_written: out.clauses_written(),
            groups_written,
            use_ind,
            include_all: policy.include_all(),
            independent_support: policy.declared(),
        };
        info!(
            vars = summary.var_count,
            clauses = summary.clauses_read,
            written = summary.clauses_written,
            groups = summary.groups_written,
            "GCNF conversion done"
        );
        Ok(summary)
    }
}

/// Converts the CNF formula in `source` to GCNF in `out`.
///
/// When `use_ind` is true and the input declares variables with `c ind` lines, only those
/// variables get a group.
/// # Example
/// ```
/// use dep2gcnf::input::SliceSource;
/// let mut out = Vec::new();
/// dep2gcnf::convert(&mut SliceSource::new(b"p cnf 1 1\n1 0\n"), &mut out, false).unwrap();
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "p gcnf 4 8 1\n{0} 1 0\n{0} 2 0\n{0} -3 -1 2 0\n{0} -3 1 -2 0\n{0} 4 1 2 0\n{0} 4 -1 -2 0\n{0} -4 0\n{1} 3 0\n"
/// );
/// ```
pub fn convert<S: ByteSource, W: Write>(
    source: &mut S,
    out: W,
    use_ind: bool,
) -> anyhow::Result<ConversionSummary> {
    Encoder::new(out, use_ind).run(source)
}
