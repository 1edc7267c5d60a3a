//! Resolved expressions.
//!
//! Expressions arrive from analysis already resolved: column references
//! point at slots of the descriptor table. The planner needs their SQL text
//! for explain output, the slots they read for conjunct binding, and
//! substitution against [`ExprSubstitutionMap`]s.

mod smap;

use std::fmt;

use serde::{Deserialize, Serialize};

use meridian_common::error::PlannerResult;
use meridian_common::types::{SlotId, TupleId};

use crate::descriptor::{ColumnType, DescriptorTable};

pub use smap::ExprSubstitutionMap;

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// NULL.
    Null,
    /// Boolean.
    Boolean(bool),
    /// Integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// String.
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Comparison
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,

    // Arithmetic
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,

    // Logical
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl BinaryOp {
    /// Returns the SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A resolved expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a slot.
    SlotRef {
        /// Referenced slot.
        slot_id: SlotId,
        /// Text printed for the reference.
        label: String,
    },

    /// Literal value.
    Literal(Literal),

    /// Binary operation.
    BinaryExpr {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },

    /// `IS [NOT] NULL` check.
    IsNull {
        /// Checked expression.
        expr: Box<Expr>,
        /// True for `IS NOT NULL`.
        negated: bool,
    },

    /// CAST expression.
    Cast {
        /// Expression to cast.
        expr: Box<Expr>,
        /// Target type.
        ty: ColumnType,
    },

    /// Scalar function call.
    FunctionCall {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Creates a slot reference.
    pub fn slot_ref(slot_id: SlotId, label: impl Into<String>) -> Self {
        Expr::SlotRef {
            slot_id,
            label: label.into(),
        }
    }

    /// Creates a literal integer.
    pub fn lit_i64(value: i64) -> Self {
        Expr::Literal(Literal::Integer(value))
    }

    /// Creates a literal string.
    pub fn lit_str(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    /// Creates a binary expression.
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::BinaryExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Creates an `IS NULL` / `IS NOT NULL` check.
    pub fn is_null(expr: Expr, negated: bool) -> Self {
        Expr::IsNull {
            expr: Box::new(expr),
            negated,
        }
    }

    /// Creates a cast.
    pub fn cast(expr: Expr, ty: ColumnType) -> Self {
        Expr::Cast {
            expr: Box::new(expr),
            ty,
        }
    }

    /// Creates a function call.
    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::FunctionCall {
            name: name.into(),
            args,
        }
    }

    /// Returns the direct children of this expression.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::SlotRef { .. } | Expr::Literal(_) => vec![],
            Expr::BinaryExpr { left, right, .. } => vec![left, right],
            Expr::IsNull { expr, .. } | Expr::Cast { expr, .. } => vec![expr],
            Expr::FunctionCall { args, .. } => args.iter().collect(),
        }
    }

    /// Returns the SQL text of this expression.
    pub fn to_sql(&self) -> String {
        match self {
            Expr::SlotRef { label, .. } => label.clone(),
            Expr::Literal(lit) => lit.to_string(),
            Expr::BinaryExpr { left, op, right } => {
                format!("{} {} {}", left.to_sql(), op, right.to_sql())
            }
            Expr::IsNull { expr, negated } => format!(
                "{} IS {}NULL",
                expr.to_sql(),
                if *negated { "NOT " } else { "" }
            ),
            Expr::Cast { expr, ty } => format!("CAST({} AS {})", expr.to_sql(), ty),
            Expr::FunctionCall { name, args } => {
                let args: Vec<String> = args.iter().map(Expr::to_sql).collect();
                format!("{}({})", name, args.join(", "))
            }
        }
    }

    /// Collects the ids of every slot this expression reads.
    pub fn collect_slot_ids(&self, out: &mut Vec<SlotId>) {
        if let Expr::SlotRef { slot_id, .. } = self {
            if !out.contains(slot_id) {
                out.push(*slot_id);
            }
        }
        for child in self.children() {
            child.collect_slot_ids(out);
        }
    }

    /// Returns the slots this expression reads, in first-seen order.
    pub fn slot_ids(&self) -> Vec<SlotId> {
        let mut out = Vec::new();
        self.collect_slot_ids(&mut out);
        out
    }

    /// Returns true if every slot this expression reads belongs to one of
    /// `tuple_ids`. Fails if a slot is unknown to the descriptor table.
    pub fn is_bound_by(&self, tuple_ids: &[TupleId], desc_tbl: &DescriptorTable) -> PlannerResult<bool> {
        for slot_id in self.slot_ids() {
            if !tuple_ids.contains(&desc_tbl.slot_parent(slot_id)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Returns a copy with every sub-expression found in `smap` replaced.
    pub fn substitute(&self, smap: &ExprSubstitutionMap) -> Expr {
        if let Some(rhs) = smap.get(self) {
            return rhs.clone();
        }
        match self {
            Expr::SlotRef { .. } | Expr::Literal(_) => self.clone(),
            Expr::BinaryExpr { left, op, right } => {
                Expr::binary(left.substitute(smap), *op, right.substitute(smap))
            }
            Expr::IsNull { expr, negated } => Expr::is_null(expr.substitute(smap), *negated),
            Expr::Cast { expr, ty } => Expr::cast(expr.substitute(smap), *ty),
            Expr::FunctionCall { name, args } => Expr::function(
                name.clone(),
                args.iter().map(|a| a.substitute(smap)).collect(),
            ),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Joins the SQL text of a list of expressions with `", "`.
pub fn exprs_to_sql(exprs: &[Expr]) -> String {
    exprs.iter().map(Expr::to_sql).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DescriptorTableBuilder, SlotSpec};

    #[test]
    fn test_to_sql() {
        let a = Expr::slot_ref(SlotId::new(0), "t.a");
        let pred = Expr::binary(
            Expr::binary(a.clone(), BinaryOp::Plus, Expr::lit_i64(1)),
            BinaryOp::Gt,
            Expr::lit_i64(10),
        );
        assert_eq!(pred.to_sql(), "t.a + 1 > 10");
        assert_eq!(Expr::is_null(a.clone(), true).to_sql(), "t.a IS NOT NULL");
        assert_eq!(
            Expr::cast(a.clone(), ColumnType::String).to_sql(),
            "CAST(t.a AS STRING)"
        );
        assert_eq!(
            Expr::function("upper", vec![Expr::lit_str("it's")]).to_sql(),
            "upper('it''s')"
        );
        assert_eq!(
            exprs_to_sql(&[a, Expr::Literal(Literal::Null)]),
            "t.a, NULL"
        );
    }

    #[test]
    fn test_slot_ids_dedup_in_order() {
        let e = Expr::function(
            "coalesce",
            vec![
                Expr::slot_ref(SlotId::new(4), "x"),
                Expr::slot_ref(SlotId::new(2), "y"),
                Expr::slot_ref(SlotId::new(4), "x"),
            ],
        );
        assert_eq!(e.slot_ids(), vec![SlotId::new(4), SlotId::new(2)]);
        assert!(Expr::lit_i64(1).slot_ids().is_empty());
    }

    #[test]
    fn test_is_bound_by() {
        let mut builder = DescriptorTableBuilder::new();
        let t0 = builder.add_tuple(None);
        let t1 = builder.add_tuple(None);
        let a = builder
            .add_slot(t0, SlotSpec::computed("a", ColumnType::Int))
            .unwrap();
        let b = builder
            .add_slot(t1, SlotSpec::computed("b", ColumnType::Int))
            .unwrap();
        let desc_tbl = builder.build();

        let pred = Expr::binary(
            Expr::slot_ref(a, "a"),
            BinaryOp::Eq,
            Expr::slot_ref(b, "b"),
        );
        assert!(!pred.is_bound_by(&[t0], &desc_tbl).unwrap());
        assert!(pred.is_bound_by(&[t0, t1], &desc_tbl).unwrap());
        assert!(Expr::lit_i64(1).is_bound_by(&[], &desc_tbl).unwrap());

        let dangling = Expr::slot_ref(SlotId::new(77), "ghost");
        assert!(dangling.is_bound_by(&[t0], &desc_tbl).is_err());
    }
}
