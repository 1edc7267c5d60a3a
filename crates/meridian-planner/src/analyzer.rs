//! Analysis context consumed by plan nodes.
//!
//! The analyzer owns the conjuncts of a query's WHERE clause and hands each
//! one to the lowest plan node whose output tuples bind it. It also holds the
//! frozen descriptor snapshot every node reads its schema from.

use std::sync::Arc;

use meridian_common::error::{PlannerError, PlannerResult};
use meridian_common::types::TupleId;

use crate::descriptor::DescriptorTable;
use crate::expr::Expr;

/// Conjunct registry and descriptor handle for one query.
#[derive(Debug)]
pub struct Analyzer {
    /// Frozen descriptors.
    desc_tbl: Arc<DescriptorTable>,
    /// Registered conjuncts in registration order.
    conjuncts: Vec<Expr>,
    /// Parallel to `conjuncts`.
    assigned: Vec<bool>,
}

impl Analyzer {
    /// Creates an analyzer over a descriptor snapshot.
    pub fn new(desc_tbl: Arc<DescriptorTable>) -> Self {
        Self {
            desc_tbl,
            conjuncts: Vec::new(),
            assigned: Vec::new(),
        }
    }

    /// Returns the descriptor snapshot.
    pub fn desc_tbl(&self) -> &Arc<DescriptorTable> {
        &self.desc_tbl
    }

    /// Registers a WHERE-clause conjunct.
    ///
    /// Fails if the conjunct reads a slot the descriptor table does not know.
    pub fn register_conjunct(&mut self, conjunct: Expr) -> PlannerResult<()> {
        for slot_id in conjunct.slot_ids() {
            self.desc_tbl.slot(slot_id)?;
        }
        self.conjuncts.push(conjunct);
        self.assigned.push(false);
        Ok(())
    }

    /// Returns the number of registered conjuncts.
    pub fn num_conjuncts(&self) -> usize {
        self.conjuncts.len()
    }

    /// Takes every unassigned conjunct bound by `tuple_ids` and marks it
    /// assigned.
    pub fn assign_conjuncts(&mut self, tuple_ids: &[TupleId]) -> PlannerResult<Vec<Expr>> {
        let mut bound = Vec::new();
        for (conjunct, assigned) in self.conjuncts.iter().zip(self.assigned.iter_mut()) {
            if *assigned {
                continue;
            }
            if conjunct.is_bound_by(tuple_ids, &self.desc_tbl)? {
                *assigned = true;
                bound.push(conjunct.clone());
            }
        }
        Ok(bound)
    }

    /// Returns the conjuncts no node has taken yet.
    pub fn unassigned_conjuncts(&self) -> impl Iterator<Item = &Expr> {
        self.conjuncts
            .iter()
            .zip(self.assigned.iter())
            .filter(|(_, assigned)| !**assigned)
            .map(|(c, _)| c)
    }

    /// Fails if any conjunct was left unassigned after planning.
    pub fn check_all_assigned(&self) -> PlannerResult<()> {
        match self.unassigned_conjuncts().next() {
            Some(conjunct) => Err(PlannerError::UnresolvedConjunct {
                conjunct: conjunct.to_sql(),
                reason: "no plan node produces all referenced tuples".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColumnType, DescriptorTableBuilder, SlotSpec};
    use crate::expr::BinaryOp;
    use meridian_common::error::ErrorCode;
    use meridian_common::types::SlotId;

    fn two_tuples() -> (Analyzer, TupleId, TupleId, Expr, Expr) {
        let mut builder = DescriptorTableBuilder::new();
        let t0 = builder.add_tuple(None);
        let t1 = builder.add_tuple(None);
        let a = builder
            .add_slot(t0, SlotSpec::computed("a", ColumnType::Int))
            .unwrap();
        let b = builder
            .add_slot(t1, SlotSpec::computed("b", ColumnType::Int))
            .unwrap();
        let analyzer = Analyzer::new(builder.build());
        let on_a = Expr::binary(Expr::slot_ref(a, "a"), BinaryOp::Gt, Expr::lit_i64(1));
        let on_both = Expr::binary(Expr::slot_ref(a, "a"), BinaryOp::Eq, Expr::slot_ref(b, "b"));
        (analyzer, t0, t1, on_a, on_both)
    }

    #[test]
    fn test_assign_once() {
        let (mut analyzer, t0, t1, on_a, on_both) = two_tuples();
        analyzer.register_conjunct(on_a.clone()).unwrap();
        analyzer.register_conjunct(on_both.clone()).unwrap();
        assert_eq!(analyzer.num_conjuncts(), 2);

        assert_eq!(analyzer.assign_conjuncts(&[t0]).unwrap(), vec![on_a]);
        assert!(analyzer.assign_conjuncts(&[t0]).unwrap().is_empty());
        assert_eq!(analyzer.assign_conjuncts(&[t0, t1]).unwrap(), vec![on_both]);
        analyzer.check_all_assigned().unwrap();
    }

    #[test]
    fn test_unassigned_conjunct_fails_check() {
        let (mut analyzer, t0, _, _, on_both) = two_tuples();
        analyzer.register_conjunct(on_both).unwrap();
        assert!(analyzer.assign_conjuncts(&[t0]).unwrap().is_empty());

        let err = analyzer.check_all_assigned().unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnresolvedConjunct);
        assert!(err.to_string().contains("a = b"));
    }

    #[test]
    fn test_register_unknown_slot() {
        let (mut analyzer, ..) = two_tuples();
        let err = analyzer
            .register_conjunct(Expr::is_null(Expr::slot_ref(SlotId::new(42), "z"), false))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SlotNotFound);
        assert_eq!(analyzer.num_conjuncts(), 0);
    }
}
