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

//! Reading back the result of a group MUS extractor run on our output

use crate::gcnf::zero_terminated;
use nom::character::complete::{char, space0};
use nom::combinator::eof;
use nom::sequence::{preceded, terminated};
use std::io::Write;

/// Returns the groups listed on the first `v` line of the output of a GMUS extractor.
///
/// Group i of the GCNF corresponds to variable i of the CNF formula, so this is a minimal
/// independent support.
/// # Example
/// ```
/// use dep2gcnf::gmus::parse_extractor_output;
/// let out = b"c some stats\ns UNSATISFIABLE\nv 1 4 0\n";
/// assert_eq!(parse_extractor_output(out).unwrap(), vec![1, 4]);
/// ```
pub fn parse_extractor_output(output: &[u8]) -> anyhow::Result<Vec<usize>> {
    let line = output
        .split(|&c| c == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .map(|line| match line.iter().position(|c| !c.is_ascii_whitespace()) {
            Some(start) => &line[start..],
            None => &line[line.len()..],
        })
        .find(|line| line.first() == Some(&b'v'));
    let line = match line {
        Some(l) => l,
        None => anyhow::bail!("no `v` line in extractor output"),
    };
    let res: nom::IResult<&[u8], Vec<i64>> =
        terminated(preceded(char('v'), zero_terminated), terminated(space0, eof))(line);
    let groups = match res {
        Ok((_, groups)) => groups,
        Err(_) => anyhow::bail!(
            "could not parse extractor result {:?}",
            String::from_utf8_lossy(line)
        ),
    };
    groups
        .into_iter()
        .map(|g| {
            anyhow::ensure!(g > 0, "group {} in extractor result is not a variable", g);
            Ok(g as usize)
        })
        .collect()
}

/// Writes `c ind <ids> 0`, the way independent supports are declared in CNF files.
pub fn write_ind_directive<W: Write>(mut out: W, ids: &[usize]) -> std::io::Result<()> {
    write!(out, "c ind")?;
    for id in ids {
        write!(out, " {}", id)?;
    }
    writeln!(out, " 0")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn finds_result_line() -> anyhow::Result<()> {
        let out = b"c muser2\r\nc groups: 3\r\nv 3 1 0 \r\nv 2 0\n";
        assert_eq!(parse_extractor_output(out)?, vec![3, 1]);
        assert_eq!(parse_extractor_output(b"v 0")?, Vec::<usize>::new());
        Ok(())
    }

    #[test]
    fn indented_result_line() -> anyhow::Result<()> {
        let out = b"c done\n  \t\n\t  v 2 5 0\r\n";
        assert_eq!(parse_extractor_output(out)?, vec![2, 5]);
        assert!(parse_extractor_output(b"   \n c v 1 0\n").is_err());
        Ok(())
    }

    #[test]
    fn bad_outputs() {
        assert!(parse_extractor_output(b"s UNKNOWN\n").is_err());
        assert!(parse_extractor_output(b"v 1 2\n").is_err());
        assert!(parse_extractor_output(b"v 1 -2 0\n").is_err());
        assert!(parse_extractor_output(b"v 1 0 x\n").is_err());
    }

    #[test]
    fn directive_round_trip() -> anyhow::Result<()> {
        let mut buf = Vec::new();
        write_ind_directive(&mut buf, &[1, 7])?;
        assert_eq!(buf, b"c ind 1 7 0\n");
        let mut buf = Vec::new();
        write_ind_directive(&mut buf, &[])?;
        assert_eq!(buf, b"c ind 0\n");
        // the encoder reads it back
        let mut source = crate::input::SliceSource::new(b"p cnf 3 0\nc ind 1 3 0\n");
        let summary = crate::encoder::convert(&mut source, std::io::sink(), true)?;
        assert_eq!(summary.independent_support, vec![1, 3]);
        Ok(())
    }
}
