//! Per-atom symmetry bookkeeping
//!
//! [`SymmetryBits`] records which operations (and which cell/operation slots)
//! produced an atom. [`SymOp`] is the PDB-style `op_cell` label of a single copy.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Set of operation and (cell, operation) slots that generated an atom
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymmetryBits {
    bits: BitVec<u64, Lsb0>,
}

impl SymmetryBits {
    /// An empty set able to hold `len` slots without growing
    pub fn with_len(len: usize) -> Self {
        Self {
            bits: bitvec![u64, Lsb0; 0; len],
        }
    }

    /// Set a slot, growing the set when needed
    pub fn set(&mut self, index: usize) {
        if index >= self.bits.len() {
            self.bits.resize(index + 1, false);
        }
        self.bits.set(index, true);
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.bits.get(index).map(|b| *b).unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    pub fn clear(&mut self) {
        self.bits.fill(false);
    }
}

/// Operation and cell translation of one symmetry copy, written `2_655`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SymOp {
    /// Operation index (1-based, 0 = untouched base atom)
    pub op: u16,
    pub tx: i8,
    pub ty: i8,
    pub tz: i8,
}

impl SymOp {
    /// Base atom, no symmetry applied
    pub const IDENTITY: SymOp = SymOp {
        op: 0,
        tx: 0,
        ty: 0,
        tz: 0,
    };

    pub fn new(op: u16, cell: [i32; 3]) -> Self {
        let [tx, ty, tz] = cell.map(|t| t.clamp(i8::MIN as i32, i8::MAX as i32) as i8);
        SymOp { op, tx, ty, tz }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.op == 0 && self.tx == 0 && self.ty == 0 && self.tz == 0
    }

    pub fn cell(&self) -> [i32; 3] {
        [self.tx as i32, self.ty as i32, self.tz as i32]
    }

    /// Parse a PDB-style label such as `1_555`
    pub fn from_pdb_string(s: &str) -> Option<Self> {
        let (op, trans) = s.split_once('_')?;
        let op = op.parse::<u16>().ok()?;
        if trans.len() != 3 {
            return None;
        }
        let mut digits = trans.chars().map(|c| c.to_digit(10).map(|d| d as i8 - 5));
        let tx = digits.next()??;
        let ty = digits.next()??;
        let tz = digits.next()??;
        Some(SymOp { op, tx, ty, tz })
    }

    /// PDB-style label
    pub fn to_pdb_string(&self) -> String {
        format!(
            "{}_{}{}{}",
            self.op,
            self.tx as i32 + 5,
            self.ty as i32 + 5,
            self.tz as i32 + 5
        )
    }
}
