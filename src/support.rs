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

//! Independent support declared in the input with `c ind` lines

use crate::tokenizer::ParseError;
use fixedbitset::FixedBitSet;
use std::collections::BTreeSet;

/// Variables below this index are stored in a bitset, the others in a `BTreeSet`.
///
/// Ids come straight from the input, so the bitset must not be sized by them.
const DENSE_LIMIT: usize = 1 << 24;

/// Accumulates the variables of all `c ind` directives of a formula.
#[derive(Debug, Clone, Default)]
pub struct IndependentSupport {
    /// index i is set when variable i was declared, for i < DENSE_LIMIT
    dense: FixedBitSet,
    /// declared variables from DENSE_LIMIT on
    sparse: BTreeSet<usize>,
}

impl IndependentSupport {
    /// Creates an empty support
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes room for variables `0..=vars`, up to a bounded size
    pub fn reserve(&mut self, vars: usize) {
        self.dense.grow(vars.min(DENSE_LIMIT - 1) + 1);
    }

    /// Marks all `ids` as independent. They must be positive.
    pub fn declare(&mut self, ids: &[i64], line: usize) -> Result<(), ParseError> {
        for &value in ids {
            if value <= 0 {
                return Err(ParseError::NonPositiveIndependent { value, line });
            }
            let index = value as usize;
            if index >= DENSE_LIMIT {
                self.sparse.insert(index);
                continue;
            }
            if index >= self.dense.len() {
                self.dense.grow(index + 1);
            }
            self.dense.insert(index);
        }
        Ok(())
    }

    /// To call once the whole input was read.
    pub fn finish(self) -> SupportPolicy {
        if self.dense.count_ones(..) == 0 && self.sparse.is_empty() {
            SupportPolicy::IncludeAll
        } else {
            SupportPolicy::Only {
                dense: self.dense,
                sparse: self.sparse,
            }
        }
    }
}

/// What variables get a group in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportPolicy {
    /// No variable was declared independent: all of them are candidates
    IncludeAll,
    /// Only the declared variables are candidates
    Only {
        /// declared variables below `DENSE_LIMIT`
        dense: FixedBitSet,
        /// the other declared variables
        sparse: BTreeSet<usize>,
    },
}

impl SupportPolicy {
    /// true when no `c ind` directive declared any variable
    pub fn include_all(&self) -> bool {
        matches!(self, SupportPolicy::IncludeAll)
    }

    /// Whether variable `var` is a candidate.
    pub fn contains(&self, var: usize) -> bool {
        match self {
            SupportPolicy::IncludeAll => true,
            SupportPolicy::Only { dense, sparse } => dense.contains(var) || sparse.contains(&var),
        }
    }

    /// The declared variables in increasing order, empty for `IncludeAll`
    pub fn declared(&self) -> Vec<usize> {
        match self {
            SupportPolicy::IncludeAll => Vec::new(),
            SupportPolicy::Only { dense, sparse } => {
                dense.ones().chain(sparse.iter().copied()).collect()
            }
        }
    }
}
