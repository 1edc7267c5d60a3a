//! Expression substitution maps.

use super::Expr;

/// An ordered mapping from expressions to their replacements.
///
/// Plan nodes use these to translate expressions written against a child's
/// output into expressions written against their own output, or against the
/// base tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExprSubstitutionMap {
    lhs: Vec<Expr>,
    rhs: Vec<Expr>,
}

impl ExprSubstitutionMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map from parallel lists.
    ///
    /// # Panics
    ///
    /// Panics if the lists have different lengths.
    pub fn from_pairs(lhs: Vec<Expr>, rhs: Vec<Expr>) -> Self {
        assert_eq!(
            lhs.len(),
            rhs.len(),
            "substitution map sides must have equal length"
        );
        Self { lhs, rhs }
    }

    /// Adds a mapping. A later mapping for an existing lhs is ignored.
    pub fn put(&mut self, lhs: Expr, rhs: Expr) {
        if !self.lhs.contains(&lhs) {
            self.lhs.push(lhs);
            self.rhs.push(rhs);
        }
    }

    /// Returns the replacement for `lhs`.
    pub fn get(&self, lhs: &Expr) -> Option<&Expr> {
        self.lhs
            .iter()
            .position(|e| e == lhs)
            .map(|i| &self.rhs[i])
    }

    /// Returns true if `lhs` has a replacement.
    pub fn contains(&self, lhs: &Expr) -> bool {
        self.lhs.contains(lhs)
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.lhs.len()
    }

    /// Returns true if there are no mappings.
    pub fn is_empty(&self) -> bool {
        self.lhs.is_empty()
    }

    /// Iterates over `(lhs, rhs)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Expr, &Expr)> {
        self.lhs.iter().zip(self.rhs.iter())
    }

    /// Substitutes every expression of a list.
    pub fn substitute_list(&self, exprs: &[Expr]) -> Vec<Expr> {
        exprs.iter().map(|e| e.substitute(self)).collect()
    }

    /// Returns the map that applies `f` and then `g`.
    ///
    /// Every rhs of `f` is rewritten through `g`. Mappings of `g` whose lhs
    /// is not already covered are appended, so expressions that only `g`
    /// knows about still translate.
    pub fn compose(f: &ExprSubstitutionMap, g: &ExprSubstitutionMap) -> ExprSubstitutionMap {
        if g.is_empty() {
            return f.clone();
        }
        if f.is_empty() {
            return g.clone();
        }
        let mut result = ExprSubstitutionMap::new();
        for (lhs, rhs) in f.iter() {
            result.put(lhs.clone(), rhs.substitute(g));
        }
        for (lhs, rhs) in g.iter() {
            result.put(lhs.clone(), rhs.clone());
        }
        result
    }

    /// Returns the union of two maps with disjoint left-hand sides.
    pub fn combine(f: &ExprSubstitutionMap, g: &ExprSubstitutionMap) -> ExprSubstitutionMap {
        let mut result = f.clone();
        for (lhs, rhs) in g.iter() {
            result.put(lhs.clone(), rhs.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOp;
    use meridian_common::types::SlotId;

    fn slot(id: u32, label: &str) -> Expr {
        Expr::slot_ref(SlotId::new(id), label)
    }

    #[test]
    fn test_put_and_get() {
        let mut smap = ExprSubstitutionMap::new();
        assert!(smap.is_empty());
        smap.put(slot(0, "a"), slot(5, "x"));
        smap.put(slot(0, "a"), slot(6, "y"));
        assert_eq!(smap.len(), 1);
        assert_eq!(smap.get(&slot(0, "a")), Some(&slot(5, "x")));
        assert_eq!(smap.get(&slot(1, "b")), None);
    }

    #[test]
    fn test_substitute_rewrites_nested() {
        let smap = ExprSubstitutionMap::from_pairs(vec![slot(0, "a")], vec![slot(9, "t.a")]);
        let e = Expr::binary(slot(0, "a"), BinaryOp::Lt, Expr::lit_i64(3));
        assert_eq!(e.substitute(&smap).to_sql(), "t.a < 3");
        assert_eq!(
            smap.substitute_list(&[slot(1, "b"), slot(0, "a")]),
            vec![slot(1, "b"), slot(9, "t.a")]
        );
    }

    #[test]
    fn test_compose() {
        // sort slot -> scan slot -> base column
        let f = ExprSubstitutionMap::from_pairs(vec![slot(10, "s")], vec![slot(1, "c")]);
        let g = ExprSubstitutionMap::from_pairs(
            vec![slot(1, "c"), slot(2, "d")],
            vec![slot(100, "t.c"), slot(101, "t.d")],
        );
        let composed = ExprSubstitutionMap::compose(&f, &g);
        assert_eq!(composed.get(&slot(10, "s")), Some(&slot(100, "t.c")));
        assert_eq!(composed.get(&slot(2, "d")), Some(&slot(101, "t.d")));
        assert_eq!(composed.len(), 3);

        assert_eq!(ExprSubstitutionMap::compose(&f, &ExprSubstitutionMap::new()), f);
        assert_eq!(ExprSubstitutionMap::compose(&ExprSubstitutionMap::new(), &g), g);
    }

    #[test]
    fn test_combine() {
        let f = ExprSubstitutionMap::from_pairs(vec![slot(0, "a")], vec![slot(5, "x")]);
        let g = ExprSubstitutionMap::from_pairs(vec![slot(1, "b")], vec![slot(6, "y")]);
        let combined = ExprSubstitutionMap::combine(&f, &g);
        assert_eq!(combined.len(), 2);
        let pairs: Vec<_> = combined.iter().map(|(l, _)| l.to_sql()).collect();
        assert_eq!(pairs, vec!["a", "b"]);
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn test_from_pairs_length_mismatch() {
        let _ = ExprSubstitutionMap::from_pairs(vec![slot(0, "a")], vec![]);
    }
}
