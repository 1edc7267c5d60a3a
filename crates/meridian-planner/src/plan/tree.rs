//! Arena holding the nodes of one plan.

use std::sync::Arc;

use meridian_common::config::{ExplainLevel, QueryOptions, RuntimeOptions};
use meridian_common::error::{PlannerError, PlannerResult};
use meridian_common::types::PlanNodeId;

use crate::analyzer::Analyzer;
use crate::descriptor::TupleDescriptor;
use crate::event::{PlanEvent, PlanEventSink, TracingSink};
use crate::wire::WirePlan;

use super::explain::{explain_subtree, print_bytes};
use super::node::{NodeIndex, PlanNode, PlanNodeKind};
use super::scan::{ScanNode, ScanRangeSource};
use super::sort::{SortInfo, SortNode};

/// A plan: nodes stored in an arena, linked by [`NodeIndex`].
///
/// Nodes are added bottom-up, so a child always sits at a lower index than
/// its parent. Each node has at most one parent. The most recently added
/// node is the root unless [`PlanTree::set_root`] says otherwise.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use meridian_common::{ExplainLevel, QueryOptions, RuntimeOptions};
/// use meridian_planner::analyzer::Analyzer;
/// use meridian_planner::descriptor::{ColumnType, DescriptorTableBuilder, SlotSpec, TableDescriptor};
/// use meridian_planner::expr::Expr;
/// use meridian_planner::plan::{FileScanSource, FileSplit, PlanTree, SortInfo};
///
/// let mut builder = DescriptorTableBuilder::new();
/// let scan_tuple = builder.add_tuple(Some(TableDescriptor::new("db.t", 1000)));
/// let c = builder.add_slot(scan_tuple, SlotSpec::column("c", ColumnType::Int)).unwrap();
/// let sort_tuple = builder.add_tuple(None);
/// let s = builder.add_slot(sort_tuple, SlotSpec::computed("c", ColumnType::Int)).unwrap();
/// let desc_tbl = builder.build();
///
/// let mut plan = PlanTree::new();
/// let source = FileScanSource::new(vec![FileSplit::new("/t/0", 0, 4000)]);
/// let scan = plan
///     .add_scan(Arc::clone(desc_tbl.tuple(scan_tuple).unwrap()), Arc::new(source))
///     .unwrap();
/// let info = SortInfo::new(
///     vec![Expr::slot_ref(s, "c")],
///     vec![true],
///     vec![None],
///     Arc::clone(desc_tbl.tuple(sort_tuple).unwrap()),
///     vec![Expr::slot_ref(c, "c")],
/// );
/// let sort = plan.add_sort(scan, info, true, 0);
/// plan.set_limit(sort, 10);
///
/// let mut analyzer = Analyzer::new(desc_tbl);
/// plan.init(&mut analyzer).unwrap();
/// plan.compute_costs(&RuntimeOptions::default(), &QueryOptions::default());
/// assert_eq!(plan.node(sort).per_host_mem_cost(), Some(40));
/// assert!(plan.explain(ExplainLevel::Minimal).starts_with("01:TOP-N [LIMIT=10]"));
/// ```
#[derive(Debug)]
pub struct PlanTree {
    nodes: Vec<PlanNode>,
    has_parent: Vec<bool>,
    root: Option<NodeIndex>,
    next_id: PlanNodeId,
    sink: Arc<dyn PlanEventSink>,
}

impl Default for PlanTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanTree {
    /// Creates an empty plan that reports events to `tracing`.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Creates an empty plan that reports events to `sink`.
    pub fn with_sink(sink: Arc<dyn PlanEventSink>) -> Self {
        Self {
            nodes: Vec::new(),
            has_parent: Vec::new(),
            root: None,
            next_id: PlanNodeId::FIRST,
            sink,
        }
    }

    // =========================================================================
    // Construction
    // =========================================================================

    fn add_node(
        &mut self,
        tuple_ids: Vec<meridian_common::types::TupleId>,
        children: Vec<NodeIndex>,
        kind: PlanNodeKind,
    ) -> NodeIndex {
        for child in &children {
            assert!(
                child.index() < self.nodes.len(),
                "child {} is not part of this plan",
                child
            );
            assert!(
                !self.has_parent[child.index()],
                "plan node {} already has a parent",
                self.nodes[child.index()].id()
            );
            self.has_parent[child.index()] = true;
        }

        let id = self.next_id;
        self.next_id = id.next();
        let index = NodeIndex::new(self.nodes.len());
        self.nodes.push(PlanNode::new(id, tuple_ids, children, kind));
        self.has_parent.push(false);
        self.root = Some(index);
        index
    }

    /// Adds a scan of `tuple`, which must be backed by a table.
    pub fn add_scan(
        &mut self,
        tuple: Arc<TupleDescriptor>,
        source: Arc<dyn ScanRangeSource>,
    ) -> PlannerResult<NodeIndex> {
        let table = tuple
            .table
            .clone()
            .ok_or_else(|| PlannerError::PlanningFailed {
                reason: format!("scan tuple {} is not backed by a table", tuple.id),
            })?;
        let tuple_ids = vec![tuple.id];
        Ok(self.add_node(
            tuple_ids,
            Vec::new(),
            PlanNodeKind::Scan(ScanNode::new(tuple, table, source)),
        ))
    }

    /// Adds a sort over `child`. Its only output tuple is the sort tuple.
    ///
    /// # Panics
    ///
    /// Panics if `child` already has a parent.
    pub fn add_sort(&mut self, child: NodeIndex, info: SortInfo, use_top_n: bool, offset: u64) -> NodeIndex {
        let tuple_ids = vec![info.sort_tuple().id];
        self.add_node(
            tuple_ids,
            vec![child],
            PlanNodeKind::Sort(SortNode::new(info, use_top_n, offset)),
        )
    }

    /// Sets the row limit of a node; see [`PlanNode::set_limit`].
    pub fn set_limit(&mut self, index: NodeIndex, limit: u64) {
        self.nodes[index.index()].set_limit(limit);
    }

    /// Makes `index` the root.
    ///
    /// # Panics
    ///
    /// Panics if the node has a parent.
    pub fn set_root(&mut self, index: NodeIndex) {
        assert!(
            !self.has_parent[index.index()],
            "plan node {} has a parent and cannot be the root",
            self.nodes[index.index()].id()
        );
        self.root = Some(index);
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// Returns the root, if any node was added.
    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    /// Returns a node.
    pub fn node(&self, index: NodeIndex) -> &PlanNode {
        &self.nodes[index.index()]
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the plan has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn require_root(&self) -> PlannerResult<NodeIndex> {
        self.root.ok_or_else(|| PlannerError::PlanningFailed {
            reason: "plan has no nodes".to_string(),
        })
    }

    fn collect_post_order(&self, index: NodeIndex, out: &mut Vec<NodeIndex>) {
        for child in self.node(index).children() {
            self.collect_post_order(*child, out);
        }
        out.push(index);
    }

    fn collect_pre_order(&self, index: NodeIndex, out: &mut Vec<NodeIndex>) {
        out.push(index);
        for child in self.node(index).children() {
            self.collect_pre_order(*child, out);
        }
    }

    /// Nodes reachable from the root, children before parents.
    pub fn post_order(&self) -> Vec<NodeIndex> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.root {
            self.collect_post_order(root, &mut out);
        }
        out
    }

    /// Nodes reachable from the root, parents before children.
    pub fn pre_order(&self) -> Vec<NodeIndex> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.root {
            self.collect_pre_order(root, &mut out);
        }
        out
    }

    /// Splits the arena so that the node at `index` can be borrowed mutably
    /// next to its children.
    fn with_children<R>(&mut self, index: NodeIndex, f: impl FnOnce(&mut PlanNode, &[&PlanNode]) -> R) -> R {
        let (before, rest) = self.nodes.split_at_mut(index.index());
        let node = &mut rest[0];
        let children: Vec<&PlanNode> = node.children.iter().map(|c| &before[c.index()]).collect();
        f(node, &children)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Initializes every node, children first, then checks that every
    /// conjunct found a node.
    pub fn init(&mut self, analyzer: &mut Analyzer) -> PlannerResult<()> {
        self.require_root()?;
        for index in self.post_order() {
            self.with_children(index, |node, children| node.init(children, analyzer))?;

            let node = self.node(index);
            self.sink.on_event(&PlanEvent::StatsComputed {
                node_id: node.id(),
                display_name: node.display_name().to_string(),
                cardinality: node.cardinality(),
                avg_row_size: node.avg_row_size(),
            });
            if let Some(scan) = node.as_scan() {
                if scan.is_table_missing_stats() {
                    self.sink.on_event(&PlanEvent::TableMissingStats {
                        node_id: node.id(),
                        table: scan.table().name.clone(),
                    });
                }
            }
        }
        analyzer.check_all_assigned()
    }

    /// Computes the memory cost of every node, children first.
    ///
    /// # Panics
    ///
    /// Panics if the plan has not been initialized.
    pub fn compute_costs(&mut self, runtime: &RuntimeOptions, query: &QueryOptions) {
        for index in self.post_order() {
            self.with_children(index, |node, children| {
                node.compute_costs(children, runtime, query);
            });
            let node = self.node(index);
            self.sink.on_event(&PlanEvent::CostsComputed {
                node_id: node.id(),
                display_name: node.display_name().to_string(),
                per_host_mem_cost: node.per_host_mem_cost().unwrap_or(0),
            });
        }
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Sum of the per-host memory of every node reachable from the root.
    pub fn per_host_mem_estimate(&self) -> u64 {
        self.post_order()
            .into_iter()
            .filter_map(|i| self.node(i).per_host_mem_cost())
            .sum()
    }

    /// Names of scanned tables with incomplete statistics, in plan order.
    pub fn tables_missing_stats(&self) -> Vec<String> {
        let mut tables: Vec<String> = Vec::new();
        for index in self.post_order() {
            if let Some(scan) = self.node(index).as_scan() {
                let name = &scan.table().name;
                if scan.is_table_missing_stats() && !tables.contains(name) {
                    tables.push(name.clone());
                }
            }
        }
        tables
    }

    /// Renders the plan.
    ///
    /// At standard level and above the tree is preceded by the plan-wide
    /// memory estimate and, when needed, a missing-stats warning.
    pub fn explain(&self, level: ExplainLevel) -> String {
        let mut output = String::new();
        if level >= ExplainLevel::Standard {
            output.push_str(&format!(
                "Estimated Per-Host Requirements: Memory={}\n",
                print_bytes(self.per_host_mem_estimate())
            ));
            let missing = self.tables_missing_stats();
            if !missing.is_empty() {
                output.push_str(
                    "WARNING: The following tables are missing relevant table and/or column statistics.\n",
                );
                output.push_str(&missing.join(", "));
                output.push('\n');
            }
            output.push('\n');
        }
        if let Some(root) = self.root {
            explain_subtree(self, root, "", "", level, &mut output);
        }
        output
    }

    /// Flattens the plan in pre-order.
    ///
    /// # Panics
    ///
    /// Panics if costs have not been computed.
    pub fn to_wire(&self) -> PlannerResult<WirePlan> {
        let nodes = self
            .pre_order()
            .into_iter()
            .map(|i| self.node(i).to_wire())
            .collect::<PlannerResult<Vec<_>>>()?;
        Ok(WirePlan { nodes })
    }
}
