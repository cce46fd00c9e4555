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

//! Group CNF files: a clause per line, each one tagged with a group `{g}`. Group 0 is hard.

use nom::bytes::complete::tag;
use nom::character::complete::{char, i64 as integer, line_ending, space0, space1};
use nom::combinator::{eof, map, verify};
use nom::multi::{many0, many1};
use nom::sequence::{delimited, preceded, terminated, tuple};
use nom::IResult;
use serde::Serialize;
use std::io::Write;

/// The `p gcnf` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GcnfHeader {
    /// number of variables
    pub var_count: i64,
    /// number of clauses, all groups included
    pub clause_count: i64,
    /// upper bound on the non zero groups
    pub group_count: i64,
}

/// Writes GCNF lines to a `Write`.
pub struct GcnfWriter<W: Write> {
    out: W,
    clauses_written: usize,
}

impl<W: Write> GcnfWriter<W> {
    /// Wraps `out`. Nothing is written yet.
    pub fn new(out: W) -> Self {
        Self {
            out,
            clauses_written: 0,
        }
    }

    /// Writes `p gcnf <vars> <clauses> <groups>`
    pub fn write_header(&mut self, header: GcnfHeader) -> std::io::Result<()> {
        writeln!(
            self.out,
            "p gcnf {} {} {}",
            header.var_count, header.clause_count, header.group_count
        )
    }

    /// Writes `{group} lit1 lit2 ... 0`
    pub fn write_clause(
        &mut self,
        group: i64,
        lits: impl IntoIterator<Item = i64>,
    ) -> std::io::Result<()> {
        write!(self.out, "{{{}}} ", group)?;
        for lit in lits {
            write!(self.out, "{} ", lit)?;
        }
        writeln!(self.out, "0")?;
        self.clauses_written += 1;
        Ok(())
    }

    /// Number of calls to `write_clause` so far
    pub fn clauses_written(&self) -> usize {
        self.clauses_written
    }

    /// Flushes the underlying writer
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

/// A clause and its group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcnfClause {
    /// group, 0 for hard clauses
    pub group: i64,
    /// literals, without the final 0
    pub lits: Vec<i64>,
}

/// A whole GCNF formula in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcnfFormula {
    /// the header line
    pub header: GcnfHeader,
    /// clauses in file order
    pub clauses: Vec<GcnfClause>,
}

impl GcnfFormula {
    /// Clauses of the specified group, in file order
    pub fn group(&self, group: i64) -> impl Iterator<Item = &[i64]> + '_ {
        self.clauses
            .iter()
            .filter(move |c| c.group == group)
            .map(|c| &c.lits[..])
    }

    /// Non zero groups which have at least a clause, in file order, without duplicates
    pub fn groups(&self) -> Vec<i64> {
        let mut res: Vec<i64> = Vec::new();
        for c in &self.clauses {
            if c.group != 0 && !res.contains(&c.group) {
                res.push(c.group);
            }
        }
        res
    }
}

/// space separated integers, the last one 0 and only the last one
pub(crate) fn zero_terminated(s: &[u8]) -> IResult<&[u8], Vec<i64>> {
    map(
        verify(many1(preceded(space1, integer)), |ints: &Vec<i64>| {
            matches!(ints.split_last(), Some((&0, lits)) if lits.iter().all(|&l| l != 0))
        }),
        |mut ints| {
            ints.pop();
            ints
        },
    )(s)
}

fn header(s: &[u8]) -> IResult<&[u8], GcnfHeader> {
    map(
        tuple((
            tag("p gcnf"),
            preceded(space1, integer),
            preceded(space1, integer),
            preceded(space1, integer),
            space0,
        )),
        |(_, var_count, clause_count, group_count, _)| GcnfHeader {
            var_count,
            clause_count,
            group_count,
        },
    )(s)
}

fn clause(s: &[u8]) -> IResult<&[u8], GcnfClause> {
    map(
        tuple((
            delimited(char('{'), integer, char('}')),
            zero_terminated,
            space0,
        )),
        |(group, lits, _)| GcnfClause { group, lits },
    )(s)
}

/// Parses a GCNF file as written by `GcnfWriter`. Comments are not supported.
/// # Example
/// ```
/// use dep2gcnf::gcnf::parse_gcnf;
/// let f = parse_gcnf(b"p gcnf 2 2 1\n{0} 1 -2 0\n{1} 2 0\n").unwrap();
/// assert_eq!(f.header.var_count, 2);
/// assert_eq!(f.group(1).collect::<Vec<_>>(), vec![&[2][..]]);
/// ```
pub fn parse_gcnf(input: &[u8]) -> anyhow::Result<GcnfFormula> {
    let res = tuple((
        terminated(header, line_ending),
        many0(terminated(clause, line_ending)),
        eof,
    ))(input);
    match res {
        Ok((_, (header, clauses, _))) => Ok(GcnfFormula { header, clauses }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let remainder = String::from_utf8_lossy(&e.input[0..(std::cmp::min(20, e.input.len()))]);
            let line = 1 + input[..(input.len() - e.input.len())]
                .iter()
                .filter(|&&c| c == b'\n')
                .count();
            anyhow::bail!(
                "Could not parse {:?} (line {}) as GCNF: {:?}",
                remainder,
                line,
                e.code
            )
        }
        Err(nom::Err::Incomplete(_)) => anyhow::bail!("truncated GCNF"),
    }
}
