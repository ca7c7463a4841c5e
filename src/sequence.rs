// Copyright 2026 The haplotype-network developers.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Nucleotides and IUPAC ambiguity codes.
//!
//! A set of allowed bases is a 4-bit [`BaseMask`] over A, C, G and T.
//!
//! ```
//! use haplotype_network::sequence::{iupac_mask, Nucleotide};
//!
//! let r = iupac_mask(b'R').unwrap();
//! assert!(r.contains(Nucleotide::A) && r.contains(Nucleotide::G));
//! assert_eq!(r.len(), 2);
//! assert_eq!(Nucleotide::G.to_string(), "G");
//! ```

use strum_macros::{AsRefStr, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A DNA base
pub type Base = u8;
/// A biological sequence
pub type Sequence = Vec<u8>;

/// An unambiguous nucleotide.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr, Display)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
}

impl Nucleotide {
    pub const ALL: [Nucleotide; 4] = [Nucleotide::A, Nucleotide::C, Nucleotide::G, Nucleotide::T];

    /// Position of this base in a [`BaseMask`].
    pub fn bit(self) -> u8 {
        match self {
            Nucleotide::A => 1,
            Nucleotide::C => 2,
            Nucleotide::G => 4,
            Nucleotide::T => 8,
        }
    }

    pub fn to_base(self) -> Base {
        match self {
            Nucleotide::A => b'A',
            Nucleotide::C => b'C',
            Nucleotide::G => b'G',
            Nucleotide::T => b'T',
        }
    }
}

/// A set of nucleotides.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BaseMask(pub u8);

impl BaseMask {
    pub const EMPTY: BaseMask = BaseMask(0);
    pub const ANY: BaseMask = BaseMask(0b1111);

    pub fn contains(self, n: Nucleotide) -> bool {
        self.0 & n.bit() != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: BaseMask) -> BaseMask {
        BaseMask(self.0 | other.0)
    }

    pub fn intersection(self, other: BaseMask) -> BaseMask {
        BaseMask(self.0 & other.0)
    }

    /// Members of the set, in the given preference order.
    pub fn iter_in(self, order: &[Nucleotide]) -> impl Iterator<Item = Nucleotide> + '_ {
        order.iter().copied().filter(move |&n| self.contains(n))
    }

    /// First member of the set in the given preference order.
    pub fn first_in(self, order: &[Nucleotide]) -> Option<Nucleotide> {
        self.iter_in(order).next()
    }

    /// Canonical upper-case IUPAC symbol of the set, `None` if it is empty.
    pub fn to_iupac(self) -> Option<Base> {
        const SYMBOLS: &[u8; 16] = b"\0ACMGRSVTWYHKDBN";
        match self.0 & 0b1111 {
            0 => None,
            bits => Some(SYMBOLS[bits as usize]),
        }
    }
}

impl From<Nucleotide> for BaseMask {
    fn from(n: Nucleotide) -> Self {
        BaseMask(n.bit())
    }
}

lazy_static! {
    static ref IUPAC: [Option<BaseMask>; 256] = {
        const A: u8 = 1;
        const C: u8 = 2;
        const G: u8 = 4;
        const T: u8 = 8;
        let codes: [(u8, u8); 19] = [
            (b'A', A),
            (b'C', C),
            (b'G', G),
            (b'T', T),
            (b'U', T),
            (b'R', A | G),
            (b'Y', C | T),
            (b'S', C | G),
            (b'W', A | T),
            (b'K', G | T),
            (b'M', A | C),
            (b'B', C | G | T),
            (b'D', A | G | T),
            (b'H', A | C | T),
            (b'V', A | C | G),
            (b'N', A | C | G | T),
            (b'X', A | C | G | T),
            (b'?', A | C | G | T),
            (b'-', A | C | G | T),
        ];
        let mut table = [None; 256];
        for &(symbol, bits) in codes.iter() {
            table[symbol as usize] = Some(BaseMask(bits));
            table[symbol.to_ascii_lowercase() as usize] = Some(BaseMask(bits));
        }
        table
    };
}

/// Allowed bases for an IUPAC symbol (case-insensitive). Gaps, `N` and `?`
/// allow every base. Returns `None` for unknown symbols.
pub fn iupac_mask(symbol: Base) -> Option<BaseMask> {
    IUPAC[symbol as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unambiguous_codes_have_one_bit() {
        for n in Nucleotide::ALL.iter() {
            assert_eq!(iupac_mask(n.to_base()), Some(BaseMask::from(*n)));
        }
        assert_eq!(iupac_mask(b'u'), Some(BaseMask::from(Nucleotide::T)));
    }

    #[test]
    fn ambiguity_codes() {
        assert_eq!(iupac_mask(b'Y').unwrap().len(), 2);
        assert_eq!(iupac_mask(b'b').unwrap().len(), 3);
        assert_eq!(iupac_mask(b'-'), Some(BaseMask::ANY));
        assert_eq!(iupac_mask(b'?'), Some(BaseMask::ANY));
        assert_eq!(iupac_mask(b'Z'), None);
    }

    #[test]
    fn symbols_of_masks() {
        for &symbol in b"ACGTRYSWKMBDHVN" {
            assert_eq!(iupac_mask(symbol).unwrap().to_iupac(), Some(symbol));
        }
        let r = iupac_mask(b'r').unwrap();
        assert_eq!(r.intersection(iupac_mask(b'W').unwrap()).to_iupac(), Some(b'A'));
        assert_eq!(iupac_mask(b'-').unwrap().to_iupac(), Some(b'N'));
        assert_eq!(BaseMask::EMPTY.to_iupac(), None);
    }

    #[test]
    fn preference_order() {
        let m = iupac_mask(b'S').unwrap();
        assert_eq!(m.first_in(&Nucleotide::ALL), Some(Nucleotide::C));
        let reversed = [Nucleotide::T, Nucleotide::G, Nucleotide::C, Nucleotide::A];
        assert_eq!(m.first_in(&reversed), Some(Nucleotide::G));
        assert_eq!(BaseMask::EMPTY.first_in(&reversed), None);
    }

    #[test]
    fn nucleotides_display() {
        assert_eq!(Nucleotide::T.as_ref(), "T");
        assert_eq!(format!("{}", Nucleotide::C), "C");
    }
}
