//! Plan node state and lifecycle.
//!
//! Every operator shares the same bookkeeping (identity, schema, conjuncts,
//! estimates, limit) and walks the same phases:
//!
//! ```text
//! Constructed --init--> Initialized --compute_costs--> CostsComputed
//! ```
//!
//! Operator-specific behavior lives in [`PlanNodeKind`] and is dispatched
//! with exhaustive `match`es. Calling a phase out of order is a programming
//! error and panics.

use std::fmt;

use meridian_common::config::{ExplainLevel, QueryOptions, RuntimeOptions};
use meridian_common::constants::UNKNOWN_CARDINALITY;
use meridian_common::error::PlannerResult;
use meridian_common::types::{PlanNodeId, TupleId};

use crate::analyzer::Analyzer;
use crate::expr::{exprs_to_sql, Expr, ExprSubstitutionMap};
use crate::wire::{WireExpr, WireNodeType, WirePlanNode, WireScanNode, WireSortInfo, WireSortNode};

use super::scan::ScanNode;
use super::sort::SortNode;

/// Position of a node inside its [`PlanTree`](super::PlanTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw arena index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle phase of a plan node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Built, not yet bound.
    Constructed,
    /// Conjuncts bound, stats and smaps computed.
    Initialized,
    /// Memory cost computed.
    CostsComputed,
}

/// Operator variants.
#[derive(Debug, Clone)]
pub enum PlanNodeKind {
    /// Table scan.
    Scan(ScanNode),
    /// Sort or top-N.
    Sort(SortNode),
}

/// A node of a physical plan.
#[derive(Debug, Clone)]
pub struct PlanNode {
    id: PlanNodeId,
    tuple_ids: Vec<TupleId>,
    pub(crate) children: Vec<NodeIndex>,
    conjuncts: Vec<Expr>,
    cardinality: i64,
    avg_row_size: f64,
    per_host_mem_cost: Option<u64>,
    num_nodes: u32,
    limit: Option<u64>,
    output_smap: ExprSubstitutionMap,
    base_tbl_smap: ExprSubstitutionMap,
    phase: Phase,
    kind: PlanNodeKind,
}

impl PlanNode {
    pub(crate) fn new(
        id: PlanNodeId,
        tuple_ids: Vec<TupleId>,
        children: Vec<NodeIndex>,
        kind: PlanNodeKind,
    ) -> Self {
        let output_smap = match &kind {
            PlanNodeKind::Scan(_) => ExprSubstitutionMap::new(),
            PlanNodeKind::Sort(sort) => sort.info().output_smap(),
        };
        Self {
            id,
            tuple_ids,
            children,
            conjuncts: Vec::new(),
            cardinality: UNKNOWN_CARDINALITY,
            avg_row_size: 0.0,
            per_host_mem_cost: None,
            num_nodes: 1,
            limit: None,
            output_smap,
            base_tbl_smap: ExprSubstitutionMap::new(),
            phase: Phase::Constructed,
            kind,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Node id.
    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    /// Output tuple ids.
    pub fn tuple_ids(&self) -> &[TupleId] {
        &self.tuple_ids
    }

    /// Children, in order.
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Conjuncts this node evaluates.
    pub fn conjuncts(&self) -> &[Expr] {
        &self.conjuncts
    }

    /// Estimated output rows, `-1` if unknown.
    pub fn cardinality(&self) -> i64 {
        self.cardinality
    }

    /// Estimated bytes per output row.
    pub fn avg_row_size(&self) -> f64 {
        self.avg_row_size
    }

    /// Estimated per-host memory, once costs are computed.
    pub fn per_host_mem_cost(&self) -> Option<u64> {
        self.per_host_mem_cost
    }

    /// Number of hosts the node runs on.
    pub fn num_nodes(&self) -> u32 {
        self.num_nodes
    }

    /// Row limit.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Maps expressions of the children's output onto this node's output.
    pub fn output_smap(&self) -> &ExprSubstitutionMap {
        &self.output_smap
    }

    /// Maps expressions of this node's output onto the base tables.
    pub fn base_tbl_smap(&self) -> &ExprSubstitutionMap {
        &self.base_tbl_smap
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Operator payload.
    pub fn kind(&self) -> &PlanNodeKind {
        &self.kind
    }

    /// Returns the scan payload, if this is a scan.
    pub fn as_scan(&self) -> Option<&ScanNode> {
        match &self.kind {
            PlanNodeKind::Scan(scan) => Some(scan),
            PlanNodeKind::Sort(_) => None,
        }
    }

    /// Returns the sort payload, if this is a sort.
    pub fn as_sort(&self) -> Option<&SortNode> {
        match &self.kind {
            PlanNodeKind::Sort(sort) => Some(sort),
            PlanNodeKind::Scan(_) => None,
        }
    }

    /// Name printed in explain headers.
    pub fn display_name(&self) -> &str {
        match &self.kind {
            PlanNodeKind::Scan(scan) => scan.source().display_name(),
            PlanNodeKind::Sort(sort) => sort.display_name(),
        }
    }

    /// Returns true if the node consumes its whole input before emitting a
    /// row. A top-N keeps a bounded working set and is not blocking.
    pub fn is_blocking_node(&self) -> bool {
        match &self.kind {
            PlanNodeKind::Scan(_) => false,
            PlanNodeKind::Sort(sort) => !sort.use_top_n(),
        }
    }

    // =========================================================================
    // Limit
    // =========================================================================

    /// Returns true if a row limit is set.
    pub fn has_limit(&self) -> bool {
        self.limit.is_some()
    }

    /// Sets the row limit, keeping the smaller one if a limit already exists.
    ///
    /// # Panics
    ///
    /// Panics if the node is already initialized.
    pub fn set_limit(&mut self, limit: u64) {
        assert_eq!(
            self.phase,
            Phase::Constructed,
            "limit of plan node {} set after init",
            self.id
        );
        self.limit = Some(self.limit.map_or(limit, |l| l.min(limit)));
    }

    /// Caps a cardinality at the limit. An unknown cardinality becomes the
    /// limit; limits beyond `i64::MAX` saturate.
    pub fn cap_at_limit(&self, cardinality: i64) -> i64 {
        match self.limit.map(limit_to_i64) {
            None => cardinality,
            Some(limit) if cardinality == UNKNOWN_CARDINALITY => limit,
            Some(limit) => cardinality.min(limit),
        }
    }

    /// Returns true once stats are computed and well-formed.
    pub fn has_valid_stats(&self) -> bool {
        self.phase >= Phase::Initialized
            && self.cardinality >= UNKNOWN_CARDINALITY
            && self.avg_row_size >= 0.0
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Binds conjuncts, computes the node's layout and stats, and builds its
    /// substitution maps. `children` must already be initialized.
    pub(crate) fn init(&mut self, children: &[&PlanNode], analyzer: &mut Analyzer) -> PlannerResult<()> {
        assert_eq!(
            self.phase,
            Phase::Constructed,
            "plan node {} initialized twice",
            self.id
        );
        assert!(
            children.iter().all(|c| c.phase >= Phase::Initialized),
            "children of plan node {} must be initialized first",
            self.id
        );

        let conjuncts = analyzer.assign_conjuncts(&self.tuple_ids)?;
        self.conjuncts.extend(conjuncts);

        if let PlanNodeKind::Sort(sort) = &mut self.kind {
            sort.compute_mem_layout();
        }
        self.compute_stats(children, analyzer)?;
        self.create_default_smap(children);

        if let PlanNodeKind::Sort(sort) = &mut self.kind {
            assert_eq!(
                self.tuple_ids.len(),
                1,
                "sort node {} must have exactly one output tuple",
                self.id
            );
            sort.resolve_tuple_exprs(&self.base_tbl_smap);
        }

        self.phase = Phase::Initialized;
        Ok(())
    }

    fn compute_stats(&mut self, children: &[&PlanNode], analyzer: &Analyzer) -> PlannerResult<()> {
        let mut avg_row_size = 0.0;
        for tuple_id in &self.tuple_ids {
            avg_row_size += analyzer.desc_tbl().tuple(*tuple_id)?.avg_serialized_size();
        }

        let (cardinality, num_nodes) = match &self.kind {
            PlanNodeKind::Scan(scan) => {
                let estimate = scan.estimate_cardinality(self.conjuncts.len());
                (self.cap_at_limit(estimate), scan.num_hosts()?)
            }
            PlanNodeKind::Sort(_) => {
                let child_cardinality = children
                    .first()
                    .map_or(UNKNOWN_CARDINALITY, |c| c.cardinality);
                let child_nodes = children.first().map_or(1, |c| c.num_nodes);
                (self.cap_at_limit(child_cardinality), child_nodes)
            }
        };

        self.avg_row_size = avg_row_size;
        self.cardinality = cardinality;
        self.num_nodes = num_nodes;
        Ok(())
    }

    fn create_default_smap(&mut self, children: &[&PlanNode]) {
        let mut combined_child_smap = ExprSubstitutionMap::new();
        let mut combined_base_tbl_smap = ExprSubstitutionMap::new();
        for child in children {
            combined_child_smap = ExprSubstitutionMap::combine(&combined_child_smap, &child.output_smap);
            combined_base_tbl_smap =
                ExprSubstitutionMap::combine(&combined_base_tbl_smap, &child.base_tbl_smap);
        }
        self.output_smap = ExprSubstitutionMap::compose(&self.output_smap, &combined_child_smap);
        self.base_tbl_smap = combined_base_tbl_smap;
    }

    /// Computes the per-host memory cost. Scans cost nothing here.
    ///
    /// Query options are accepted for operators that consult them; neither
    /// current operator does.
    pub(crate) fn compute_costs(
        &mut self,
        children: &[&PlanNode],
        runtime: &RuntimeOptions,
        _query: &QueryOptions,
    ) {
        assert!(
            self.has_valid_stats(),
            "plan node {} costed without valid stats",
            self.id
        );
        assert_eq!(
            self.phase,
            Phase::Initialized,
            "costs of plan node {} computed twice",
            self.id
        );

        let cost = match &self.kind {
            PlanNodeKind::Scan(_) => 0,
            PlanNodeKind::Sort(sort) => {
                let child_cardinality = children
                    .first()
                    .map_or(UNKNOWN_CARDINALITY, |c| c.cardinality);
                sort.mem_cost(self.cardinality, child_cardinality, self.avg_row_size, runtime)
            }
        };
        self.per_host_mem_cost = Some(cost);
        self.phase = Phase::CostsComputed;
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn header_detail(&self) -> String {
        match &self.kind {
            PlanNodeKind::Scan(scan) => format!(" [{}]", scan.table().name),
            PlanNodeKind::Sort(sort) => sort.header_detail(self.limit),
        }
    }

    /// Renders the header line and the operator's own detail lines.
    pub(crate) fn node_explain_string(
        &self,
        prefix: &str,
        detail_prefix: &str,
        level: ExplainLevel,
    ) -> String {
        let mut output = format!(
            "{}{}:{}{}\n",
            prefix,
            self.id,
            self.display_name(),
            self.header_detail()
        );
        if level >= ExplainLevel::Standard {
            match &self.kind {
                PlanNodeKind::Scan(scan) => output.push_str(&scan.source().explain_detail(detail_prefix)),
                PlanNodeKind::Sort(sort) => output.push_str(&sort.explain_detail(detail_prefix, level)),
            }
            if !self.conjuncts.is_empty() {
                output.push_str(&format!(
                    "{}predicates: {}\n",
                    detail_prefix,
                    exprs_to_sql(&self.conjuncts)
                ));
            }
        }
        if level >= ExplainLevel::Extended {
            if let PlanNodeKind::Scan(scan) = &self.kind {
                output.push_str(&scan.stats_explain_text(detail_prefix));
                output.push('\n');
            }
        }
        output
    }

    /// Single-line description for logs.
    pub fn debug_string(&self) -> String {
        let (name, fields) = match &self.kind {
            PlanNodeKind::Scan(scan) => ("ScanNode", scan.debug_fields()),
            PlanNodeKind::Sort(sort) => ("SortNode", sort.debug_fields()),
        };
        let tuple_ids: Vec<String> = self.tuple_ids.iter().map(ToString::to_string).collect();
        let limit = self.limit.map_or_else(|| "-1".to_string(), |l| l.to_string());
        let mem = self
            .per_host_mem_cost
            .map_or_else(|| "unset".to_string(), |m| m.to_string());
        format!(
            "{}{{id={} {} tuple_ids=[{}] limit={} cardinality={} avg_row_size={} per_host_mem_cost={} conjuncts=[{}]}}",
            name,
            self.id,
            fields,
            tuple_ids.join(" "),
            limit,
            self.cardinality,
            self.avg_row_size,
            mem,
            exprs_to_sql(&self.conjuncts)
        )
    }

    // =========================================================================
    // Wire
    // =========================================================================

    /// Builds the wire message for this node.
    ///
    /// # Panics
    ///
    /// Panics if costs have not been computed.
    pub fn to_wire(&self) -> PlannerResult<WirePlanNode> {
        let per_host_mem_cost = self
            .per_host_mem_cost
            .unwrap_or_else(|| panic!("plan node {} serialized before costs were computed", self.id));

        let (node_type, scan_node, sort_node) = match &self.kind {
            PlanNodeKind::Scan(scan) => (
                WireNodeType::ScanNode,
                Some(WireScanNode {
                    tuple_id: scan.tuple().id,
                    table_name: scan.table().name.clone(),
                    scan_ranges: scan.scan_range_locations()?,
                }),
                None,
            ),
            PlanNodeKind::Sort(sort) => {
                let info = sort.info();
                (
                    WireNodeType::SortNode,
                    None,
                    Some(WireSortNode {
                        sort_info: WireSortInfo {
                            ordering_exprs: info.ordering_exprs().iter().map(WireExpr::from).collect(),
                            is_asc_order: info.is_asc_order().to_vec(),
                            nulls_first: info.nulls_first_params().to_vec(),
                            sort_tuple_slot_exprs: sort
                                .base_tbl_materialized_tuple_exprs()
                                .iter()
                                .map(WireExpr::from)
                                .collect(),
                        },
                        use_top_n: sort.use_top_n(),
                        offset: sort.offset(),
                        sort_tuple_byte_size: sort
                            .sort_tuple_layout()
                            .map_or(0, |layout| layout.byte_size as u64),
                    }),
                )
            }
        };

        Ok(WirePlanNode {
            node_id: self.id,
            node_type,
            num_children: u32::try_from(self.children.len()).unwrap_or(u32::MAX),
            tuple_ids: self.tuple_ids.clone(),
            conjuncts: self.conjuncts.iter().map(WireExpr::from).collect(),
            limit: self.limit.map_or(-1, limit_to_i64),
            per_host_mem_cost,
            scan_node,
            sort_node,
        })
    }
}

fn limit_to_i64(limit: u64) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
