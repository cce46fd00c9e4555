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

//! CNF formulas in memory

use crate::encoder::{convert, ConversionSummary};
use crate::input::SliceSource;
use anyhow::Context;
use std::io::Write;
pub use varisat_dimacs::write_dimacs;
pub use varisat_formula::{CnfFormula, ExtendFormula, Lit, Var};

/// Converts a string to dimacs in a string, for debugging.
pub fn to_dimacs_string(f: &CnfFormula) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    write_dimacs(&mut buf, f)?;
    Ok(String::from_utf8(buf)?)
}

/// Converts an in-memory formula to GCNF, as `convert` does for a file.
///
/// No variable is declared independent: with or without `use_ind`, all variables get a group.
pub fn convert_formula<W: Write>(
    f: &CnfFormula,
    out: W,
    use_ind: bool,
) -> anyhow::Result<ConversionSummary> {
    let mut buf = Vec::new();
    write_dimacs(&mut buf, f).context("writing formula to buffer")?;
    convert(&mut SliceSource::new(&buf), out, use_ind)
        .context("converting in-memory formula to GCNF")
}

/// returns a random 3sat cnf formula with specified number of variables and clauses
#[cfg(test)]
pub fn generate_random_3sat(nvars: usize, nclauses: usize) -> CnfFormula {
    use std::iter::FromIterator;
    let mut f = CnfFormula::new();
    let mut rng = rand::thread_rng();
    f.set_var_count(nvars);
    for _ in 0..nclauses {
        let chosen = rand::seq::index::sample(&mut rng, nvars, 3);
        let clause = Vec::from_iter(chosen.iter().map(|v| {
            let v = Var::from_index(v);
            Lit::from_var(v, rand::random())
        }));
        f.add_clause(&clause);
    }
    f
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gcnf::{parse_gcnf, GcnfFormula};

    fn to_gcnf(f: &CnfFormula) -> GcnfFormula {
        let mut out = Vec::new();
        convert_formula(f, &mut out, false).expect("conversion");
        parse_gcnf(&out).expect("parsing output")
    }

    fn dimacs_clause(clause: &[Lit]) -> Vec<i64> {
        clause.iter().map(|l| l.to_dimacs() as i64).collect()
    }

    /// whether some assignment of variables 1..=nvars satisfies all clauses
    fn brute_force_sat<'a>(clauses: impl Iterator<Item = &'a [i64]> + Clone, nvars: usize) -> bool {
        assert!(nvars < 25);
        'models: for model in 0u32..(1 << nvars) {
            for clause in clauses.clone() {
                let satisfied = clause.iter().any(|&lit| {
                    let value = model & (1 << (lit.abs() - 1)) != 0;
                    value == (lit > 0)
                });
                if !satisfied {
                    continue 'models;
                }
            }
            return true;
        }
        false
    }

    /// whether group 0 and the groups of `vars` are satisfiable together
    fn selected_sat(g: &GcnfFormula, vars: &[i64]) -> bool {
        let clauses = g
            .clauses
            .iter()
            .filter(|c| c.group == 0 || vars.contains(&c.group))
            .map(|c| &c.lits[..]);
        brute_force_sat(clauses, g.header.var_count as usize)
    }

    #[test]
    fn random_formula_is_copied_twice() -> anyhow::Result<()> {
        let f = generate_random_3sat(20, 50);
        let g = to_gcnf(&f);
        let n = 20;
        assert_eq!(g.header.var_count, 4 * n);
        assert_eq!(g.header.group_count, n);
        assert_eq!(g.header.clause_count as usize, g.clauses.len());
        let hard: Vec<&[i64]> = g.group(0).collect();
        for (i, clause) in f.iter().enumerate() {
            let original = dimacs_clause(clause);
            let shadow: Vec<i64> = original
                .iter()
                .map(|&l| if l > 0 { l + n } else { l - n })
                .collect();
            assert_eq!(hard[2 * i], &original[..]);
            assert_eq!(hard[2 * i + 1], &shadow[..]);
        }
        for i in 1..=n {
            let (a, b, y) = (i + 2 * n, i + 3 * n, i + n);
            for gadget in &[[-a, -i, y], [-a, i, -y], [b, i, y], [b, -i, -y]] {
                assert!(hard.contains(&&gadget[..]), "missing {:?}", gadget);
            }
            assert_eq!(g.group(i).collect::<Vec<_>>(), vec![&[a][..]]);
        }
        let flags: Vec<i64> = (1..=n).map(|i| -(i + 3 * n)).collect();
        assert_eq!(hard.iter().filter(|c| **c == &flags[..]).count(), 1);
        Ok(())
    }

    #[test]
    fn in_memory_matches_text() -> anyhow::Result<()> {
        let f = generate_random_3sat(5, 8);
        let mut from_formula = Vec::new();
        convert_formula(&f, &mut from_formula, true)?;
        let text = to_dimacs_string(&f)?;
        let mut from_text = Vec::new();
        convert(&mut SliceSource::new(text.as_bytes()), &mut from_text, true)?;
        assert_eq!(from_formula, from_text);
        Ok(())
    }

    /// x3 = x1 & x2
    fn and_gate() -> CnfFormula {
        let mut f = CnfFormula::new();
        f.set_var_count(3);
        for clause in &[&[-3, 1][..], &[-3, 2], &[3, -1, -2]] {
            let lits: Vec<Lit> = clause.iter().map(|&l| Lit::from_dimacs(l)).collect();
            f.add_clause(&lits);
        }
        f
    }

    #[test]
    fn groups_unsat_iff_independent_support() {
        let g = to_gcnf(&and_gate());
        // inputs of the gate determine its output
        assert!(!selected_sat(&g, &[1, 2]));
        assert!(!selected_sat(&g, &[1, 2, 3]));
        // x1 = 0, x3 = 0 leaves x2 free
        assert!(selected_sat(&g, &[1, 3]));
        assert!(selected_sat(&g, &[2, 3]));
        assert!(selected_sat(&g, &[1]));
        assert!(selected_sat(&g, &[]));
    }

    #[test]
    fn unconstrained_variable_is_needed() {
        // x2 is not constrained by anything
        let mut f = CnfFormula::new();
        f.set_var_count(2);
        f.add_clause(&[Lit::from_dimacs(1)]);
        let g = to_gcnf(&f);
        assert!(selected_sat(&g, &[1]));
        assert!(!selected_sat(&g, &[2]));
    }
}
