//! Wire messages consumed by the execution runtime.
//!
//! These types carry the semantic field set of a serialized plan. They
//! derive `serde` traits; picking an encoding is up to the caller.
//!
//! A plan is flattened in pre-order: each node is followed by its children,
//! and `num_children` lets the receiver rebuild the tree. Expressions are
//! flattened the same way.

use serde::{Deserialize, Serialize};

use meridian_common::types::{PlanNodeId, SlotId, TupleId};

use crate::descriptor::ColumnType;
use crate::expr::{BinaryOp, Expr, Literal};
use crate::plan::ScanRangeLocations;

/// A flattened plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePlan {
    /// Nodes in pre-order.
    pub nodes: Vec<WirePlanNode>,
}

/// Operator discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireNodeType {
    /// Table scan.
    ScanNode,
    /// Sort or top-N.
    SortNode,
}

/// One plan node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePlanNode {
    /// Node id.
    pub node_id: PlanNodeId,
    /// Operator kind.
    pub node_type: WireNodeType,
    /// Number of children following this node.
    pub num_children: u32,
    /// Output tuple ids.
    pub tuple_ids: Vec<TupleId>,
    /// Conjuncts evaluated by the node.
    pub conjuncts: Vec<WireExpr>,
    /// Row limit, `-1` when unset.
    pub limit: i64,
    /// Estimated per-host memory in bytes.
    pub per_host_mem_cost: u64,
    /// Set for scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_node: Option<WireScanNode>,
    /// Set for sorts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_node: Option<WireSortNode>,
}

/// Scan payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireScanNode {
    /// Scanned tuple.
    pub tuple_id: TupleId,
    /// Scanned table.
    pub table_name: String,
    /// Scan ranges with their candidate hosts.
    pub scan_ranges: Vec<ScanRangeLocations>,
}

/// Ordering of a sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSortInfo {
    /// Ordering expressions.
    pub ordering_exprs: Vec<WireExpr>,
    /// Ascending flag per key.
    pub is_asc_order: Vec<bool>,
    /// Explicit nulls-first choice per key; `None` means the engine default.
    pub nulls_first: Vec<Option<bool>>,
    /// Source expressions of the materialized sort slots.
    pub sort_tuple_slot_exprs: Vec<WireExpr>,
}

/// Sort payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSortNode {
    /// Ordering.
    pub sort_info: WireSortInfo,
    /// True for a top-N.
    pub use_top_n: bool,
    /// Rows skipped before output starts.
    pub offset: u64,
    /// Size in bytes of one materialized sort tuple.
    pub sort_tuple_byte_size: u64,
}

/// A flattened expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireExpr {
    /// Expression nodes in pre-order.
    pub nodes: Vec<WireExprNode>,
}

/// One expression node. Children follow in pre-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireExprNode {
    /// Slot reference.
    SlotRef {
        /// Slot read.
        slot_id: SlotId,
    },
    /// Literal.
    Literal {
        /// Value.
        value: Literal,
    },
    /// Binary operation; two children.
    BinaryExpr {
        /// Operator.
        op: BinaryOp,
    },
    /// NULL check; one child.
    IsNull {
        /// True for `IS NOT NULL`.
        negated: bool,
    },
    /// Cast; one child.
    Cast {
        /// Target type.
        ty: ColumnType,
    },
    /// Function call; `num_args` children.
    FunctionCall {
        /// Function name.
        name: String,
        /// Argument count.
        num_args: u32,
    },
}

fn flatten(expr: &Expr, nodes: &mut Vec<WireExprNode>) {
    let node = match expr {
        Expr::SlotRef { slot_id, .. } => WireExprNode::SlotRef { slot_id: *slot_id },
        Expr::Literal(value) => WireExprNode::Literal {
            value: value.clone(),
        },
        Expr::BinaryExpr { op, .. } => WireExprNode::BinaryExpr { op: *op },
        Expr::IsNull { negated, .. } => WireExprNode::IsNull { negated: *negated },
        Expr::Cast { ty, .. } => WireExprNode::Cast { ty: *ty },
        Expr::FunctionCall { name, args } => WireExprNode::FunctionCall {
            name: name.clone(),
            num_args: u32::try_from(args.len()).unwrap_or(u32::MAX),
        },
    };
    nodes.push(node);
    for child in expr.children() {
        flatten(child, nodes);
    }
}

impl From<&Expr> for WireExpr {
    fn from(expr: &Expr) -> Self {
        let mut nodes = Vec::new();
        flatten(expr, &mut nodes);
        Self { nodes }
    }
}
