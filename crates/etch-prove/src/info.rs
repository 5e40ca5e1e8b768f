//! The abstract value domain the prover tracks per variable (spec.md §4.4):
//! a known-constant flag, a saturating `[minv, maxv]` interval, a coarse
//! disjunctive-interval hint, and the boolean flags `nonZero`/`nonNil`/
//! `isBool`/`initialized`/`used`, plus enough array/string shape to bound
//! index and slice operations.
//!
//! `meet` narrows at a condition (intersection); `union` merges at a
//! control-flow join (the precise lattice join, not a widening operator —
//! loop fixed points are capped by iteration count instead, see
//! `interp::check_while`).

#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    pub known: bool,
    pub cval: i64,
    pub minv: i64,
    pub maxv: i64,
    /// Disjoint sub-ranges this value could occupy, when precision allows
    /// tracking more than one bucket. `None` means "just use `[minv, maxv]`" —
    /// most operations collapse straight back to `None` rather than grow
    /// the set, which is a deliberate precision/complexity trade-off.
    pub disjuncts: Option<Vec<(i64, i64)>>,
    pub non_zero: bool,
    pub non_nil: bool,
    pub is_bool: bool,
    pub initialized: bool,
    pub used: bool,
    pub is_array: bool,
    pub is_string: bool,
    pub array_size: Option<i64>,
}

impl Info {
    pub fn unknown() -> Info {
        Info {
            known: false,
            cval: 0,
            minv: i64::MIN,
            maxv: i64::MAX,
            disjuncts: None,
            non_zero: false,
            non_nil: false,
            is_bool: false,
            initialized: true,
            used: false,
            is_array: false,
            is_string: false,
            array_size: None,
        }
    }

    pub fn uninitialized() -> Info {
        Info {
            initialized: false,
            ..Info::unknown()
        }
    }

    pub fn constant(v: i64) -> Info {
        Info {
            known: true,
            cval: v,
            minv: v,
            maxv: v,
            non_zero: v != 0,
            ..Info::unknown()
        }
    }

    pub fn bool_const(b: bool) -> Info {
        Info {
            is_bool: true,
            ..Info::constant(b as i64)
        }
    }

    pub fn array(size: Option<i64>) -> Info {
        Info {
            is_array: true,
            array_size: size,
            non_nil: true,
            ..Info::unknown()
        }
    }

    pub fn string_value() -> Info {
        Info {
            is_string: true,
            non_nil: true,
            ..Info::unknown()
        }
    }

    pub fn non_nil_ref() -> Info {
        Info {
            non_nil: true,
            ..Info::unknown()
        }
    }

    pub fn nilable_ref() -> Info {
        Info {
            non_nil: false,
            ..Info::unknown()
        }
    }

    /// True when a `/` or `%` by this value cannot be ruled safe.
    pub fn could_be_zero(&self) -> bool {
        if self.non_zero {
            return false;
        }
        if self.known {
            return self.cval == 0;
        }
        self.minv <= 0 && self.maxv >= 0
    }

    /// Full, unconstrained `[i64::MIN, i64::MAX]` range — the default for
    /// any value the prover has no narrower information about.
    pub fn is_unconstrained_range(&self) -> bool {
        self.minv == i64::MIN && self.maxv == i64::MAX
    }

    /// Intersection: what both of two facts about the same value agree on.
    pub fn meet(&self, other: &Info) -> Info {
        let known = self.known && other.known && self.cval == other.cval;
        Info {
            known,
            cval: if known { self.cval } else { 0 },
            minv: self.minv.max(other.minv),
            maxv: self.maxv.min(other.maxv),
            disjuncts: None,
            non_zero: self.non_zero || other.non_zero,
            non_nil: self.non_nil || other.non_nil,
            is_bool: self.is_bool && other.is_bool,
            initialized: self.initialized || other.initialized,
            used: self.used || other.used,
            is_array: self.is_array && other.is_array,
            is_string: self.is_string && other.is_string,
            array_size: same_or_none(self.array_size, other.array_size),
        }
    }

    /// Join: what must hold regardless of which of two paths was taken.
    pub fn union(&self, other: &Info) -> Info {
        let known = self.known && other.known && self.cval == other.cval;
        Info {
            known,
            cval: if known { self.cval } else { 0 },
            minv: self.minv.min(other.minv),
            maxv: self.maxv.max(other.maxv),
            disjuncts: None,
            non_zero: self.non_zero && other.non_zero,
            non_nil: self.non_nil && other.non_nil,
            is_bool: self.is_bool && other.is_bool,
            initialized: self.initialized && other.initialized,
            used: self.used || other.used,
            is_array: self.is_array && other.is_array,
            is_string: self.is_string && other.is_string,
            array_size: same_or_none(self.array_size, other.array_size),
        }
    }

    /// The conservative fallback once a loop's fixed point didn't stabilize
    /// within the iteration cap: keep the shape flags, drop everything else.
    pub fn topify(&self) -> Info {
        Info {
            initialized: self.initialized,
            used: self.used,
            is_array: self.is_array,
            is_string: self.is_string,
            array_size: None,
            non_nil: self.is_array || self.is_string,
            ..Info::unknown()
        }
    }
}

fn same_or_none(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(x), Some(y)) if x == y => Some(x),
        _ => None,
    }
}
