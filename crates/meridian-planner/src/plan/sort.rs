//! Sort node: ORDER BY, optionally fused with LIMIT/OFFSET as a top-N.
//!
//! A sort materializes its input into a dedicated sort tuple. Whether it runs
//! as a bounded top-N or as an external two-phase merge sort is decided by
//! the caller; the node only costs the strategy it was built with.
//!
//! # Memory estimates
//!
//! - Top-N keeps `limit + offset` rows: `ceil((cardinality + offset) * row_size)`.
//! - External sort with block size `B` over `N = ceil(input_bytes / B)` blocks
//!   needs `B * ceil(sqrt(N))` bytes: `sqrt(N)` runs of `sqrt(N)` blocks, then
//!   a `sqrt(N)`-way merge with one block per run. Variable-length data lives
//!   in a second, interleaved block sequence, so `B` doubles when any
//!   materialized sort slot is variable-length.

use std::sync::Arc;

use meridian_common::config::{ExplainLevel, RuntimeOptions};

use crate::descriptor::{compute_mem_layout, TupleDescriptor, TupleLayout};
use crate::expr::{Expr, ExprSubstitutionMap};

/// Memory needed by a top-N holding `rows + offset` rows.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn top_n_mem_cost(rows: i64, offset: u64, avg_row_size: f64) -> u64 {
    let rows = rows.max(0) as f64 + offset as f64;
    (rows * avg_row_size).ceil() as u64
}

/// Memory needed by an external two-phase merge sort of `input_rows` rows.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn external_sort_mem_cost(
    input_rows: i64,
    avg_row_size: f64,
    block_size: u64,
    has_var_len_slots: bool,
) -> u64 {
    let block_size = if has_var_len_slots {
        block_size * 2
    } else {
        block_size
    };
    let full_input_size = input_rows.max(0) as f64 * avg_row_size;
    let num_input_blocks = (full_input_size / block_size as f64).ceil();
    block_size * num_input_blocks.sqrt().ceil() as u64
}

/// Ordering specification and sort tuple of a sort node.
#[derive(Debug, Clone)]
pub struct SortInfo {
    ordering_exprs: Vec<Expr>,
    is_asc_order: Vec<bool>,
    nulls_first_params: Vec<Option<bool>>,
    sort_tuple: Arc<TupleDescriptor>,
    sort_tuple_slot_exprs: Vec<Expr>,
}

impl SortInfo {
    /// Creates a sort info.
    ///
    /// `nulls_first_params` holds the explicit `NULLS FIRST/LAST` choice per
    /// key, `None` where the query did not specify one.
    /// `sort_tuple_slot_exprs[i]` populates the i-th slot of `sort_tuple`.
    ///
    /// # Panics
    ///
    /// Panics if the per-key lists have different lengths.
    pub fn new(
        ordering_exprs: Vec<Expr>,
        is_asc_order: Vec<bool>,
        nulls_first_params: Vec<Option<bool>>,
        sort_tuple: Arc<TupleDescriptor>,
        sort_tuple_slot_exprs: Vec<Expr>,
    ) -> Self {
        assert!(
            ordering_exprs.len() == is_asc_order.len()
                && ordering_exprs.len() == nulls_first_params.len(),
            "sort keys, directions and nulls-first params must have equal length"
        );
        Self {
            ordering_exprs,
            is_asc_order,
            nulls_first_params,
            sort_tuple,
            sort_tuple_slot_exprs,
        }
    }

    /// Ordering expressions, evaluated against the sort tuple.
    pub fn ordering_exprs(&self) -> &[Expr] {
        &self.ordering_exprs
    }

    /// Ascending flag per key.
    pub fn is_asc_order(&self) -> &[bool] {
        &self.is_asc_order
    }

    /// Explicit nulls-first choice per key.
    pub fn nulls_first_params(&self) -> &[Option<bool>] {
        &self.nulls_first_params
    }

    /// Effective nulls-first flag per key: NULLs sort last ascending and
    /// first descending unless the query says otherwise.
    pub fn nulls_first(&self) -> Vec<bool> {
        self.nulls_first_params
            .iter()
            .zip(&self.is_asc_order)
            .map(|(param, is_asc)| param.unwrap_or(!is_asc))
            .collect()
    }

    /// The materialized sort tuple.
    pub fn sort_tuple(&self) -> &Arc<TupleDescriptor> {
        &self.sort_tuple
    }

    /// Expressions populating each slot of the sort tuple.
    pub fn sort_tuple_slot_exprs(&self) -> &[Expr] {
        &self.sort_tuple_slot_exprs
    }

    /// Maps each source expression to a reference to the sort slot it fills.
    pub fn output_smap(&self) -> ExprSubstitutionMap {
        let mut smap = ExprSubstitutionMap::new();
        for (expr, slot) in self.sort_tuple_slot_exprs.iter().zip(&self.sort_tuple.slots) {
            smap.put(expr.clone(), Expr::slot_ref(slot.id, slot.label.clone()));
        }
        smap
    }
}

/// Operator payload of a sort.
#[derive(Debug, Clone)]
pub struct SortNode {
    info: SortInfo,
    use_top_n: bool,
    offset: u64,
    sort_tuple_layout: Option<TupleLayout>,
    base_tbl_materialized_tuple_exprs: Vec<Expr>,
}

impl SortNode {
    pub(crate) fn new(info: SortInfo, use_top_n: bool, offset: u64) -> Self {
        Self {
            info,
            use_top_n,
            offset,
            sort_tuple_layout: None,
            base_tbl_materialized_tuple_exprs: Vec::new(),
        }
    }

    /// Returns the sort info.
    pub fn info(&self) -> &SortInfo {
        &self.info
    }

    /// Returns true for a top-N.
    pub fn use_top_n(&self) -> bool {
        self.use_top_n
    }

    /// Rows skipped before output starts.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns true if rows are skipped before output starts.
    pub fn has_offset(&self) -> bool {
        self.offset > 0
    }

    /// Layout of the sort tuple, once initialized.
    pub fn sort_tuple_layout(&self) -> Option<&TupleLayout> {
        self.sort_tuple_layout.as_ref()
    }

    /// Source expressions of the materialized sort slots, rewritten against
    /// the base tables.
    pub fn base_tbl_materialized_tuple_exprs(&self) -> &[Expr] {
        &self.base_tbl_materialized_tuple_exprs
    }

    /// `TOP-N` or `SORT`.
    pub fn display_name(&self) -> &'static str {
        if self.use_top_n {
            "TOP-N"
        } else {
            "SORT"
        }
    }

    pub(crate) fn compute_mem_layout(&mut self) {
        self.sort_tuple_layout = Some(compute_mem_layout(&self.info.sort_tuple));
    }

    /// Rewrites the source expression of every materialized sort slot.
    pub(crate) fn resolve_tuple_exprs(&mut self, base_tbl_smap: &ExprSubstitutionMap) {
        let slots = &self.info.sort_tuple.slots;
        assert_eq!(
            slots.len(),
            self.info.sort_tuple_slot_exprs.len(),
            "sort tuple has {} slots but {} source exprs",
            slots.len(),
            self.info.sort_tuple_slot_exprs.len()
        );
        self.base_tbl_materialized_tuple_exprs = slots
            .iter()
            .zip(&self.info.sort_tuple_slot_exprs)
            .filter(|(slot, _)| slot.is_materialized)
            .map(|(_, expr)| expr.substitute(base_tbl_smap))
            .collect();
    }

    /// Per-host memory for this sort.
    pub fn mem_cost(
        &self,
        cardinality: i64,
        child_cardinality: i64,
        avg_row_size: f64,
        runtime: &RuntimeOptions,
    ) -> u64 {
        if self.use_top_n {
            top_n_mem_cost(cardinality, self.offset, avg_row_size)
        } else {
            external_sort_mem_cost(
                child_cardinality,
                avg_row_size,
                runtime.read_size(),
                self.info.sort_tuple.has_var_len_slots(),
            )
        }
    }

    /// Header suffix: ` [LIMIT=n]` or ` [LIMIT=n OFFSET=m]`.
    pub(crate) fn header_detail(&self, limit: Option<u64>) -> String {
        match limit {
            None => String::new(),
            Some(limit) if self.has_offset() => {
                format!(" [LIMIT={} OFFSET={}]", limit, self.offset)
            }
            Some(limit) => format!(" [LIMIT={}]", limit),
        }
    }

    pub(crate) fn explain_detail(&self, detail_prefix: &str, level: ExplainLevel) -> String {
        if level < ExplainLevel::Standard {
            return String::new();
        }
        let keys: Vec<String> = self
            .info
            .ordering_exprs
            .iter()
            .zip(&self.info.is_asc_order)
            .zip(&self.info.nulls_first_params)
            .map(|((expr, is_asc), nulls_first)| {
                let nulls = match nulls_first {
                    Some(true) => " NULLS FIRST",
                    Some(false) => " NULLS LAST",
                    None => "",
                };
                format!(
                    "{} {}{}",
                    expr.to_sql(),
                    if *is_asc { "ASC" } else { "DESC" },
                    nulls
                )
            })
            .collect();
        let mut output = format!("{}order by: {}\n", detail_prefix, keys.join(", "));
        if self.offset != 0 {
            output.push_str(&format!("{}offset: {}\n", detail_prefix, self.offset));
        }
        output
    }

    pub(crate) fn debug_fields(&self) -> String {
        let is_asc: Vec<&str> = self
            .info
            .is_asc_order
            .iter()
            .map(|a| if *a { "a" } else { "d" })
            .collect();
        let nulls_first: Vec<String> = self.info.nulls_first().iter().map(bool::to_string).collect();
        format!(
            "ordering_exprs=[{}] is_asc=[{}] nulls_first=[{}] offset={}",
            crate::expr::exprs_to_sql(&self.info.ordering_exprs),
            is_asc.join(" "),
            nulls_first.join(" "),
            self.offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColumnType, DescriptorTableBuilder, SlotSpec};
    use meridian_common::constants::MEGABYTE;
    use meridian_common::types::SlotId;

    fn sort_node(slot_types: &[(ColumnType, bool)], use_top_n: bool, offset: u64) -> SortNode {
        let mut builder = DescriptorTableBuilder::new();
        let tuple_id = builder.add_tuple(None);
        let mut ordering = Vec::new();
        let mut slot_exprs = Vec::new();
        for (i, (ty, materialized)) in slot_types.iter().enumerate() {
            let slot = builder
                .add_slot(
                    tuple_id,
                    SlotSpec::computed(format!("k{i}"), *ty).materialized(*materialized),
                )
                .unwrap();
            ordering.push(Expr::slot_ref(slot, format!("k{i}")));
            slot_exprs.push(Expr::slot_ref(SlotId::new(100 + i as u32), format!("src{i}")));
        }
        let desc_tbl = builder.build();
        let n = ordering.len();
        let info = SortInfo::new(
            ordering,
            vec![true; n],
            vec![None; n],
            Arc::clone(desc_tbl.tuple(tuple_id).unwrap()),
            slot_exprs,
        );
        SortNode::new(info, use_top_n, offset)
    }

    #[test]
    fn test_top_n_mem_cost() {
        assert_eq!(top_n_mem_cost(10, 5, 50.0), 750);
        assert_eq!(top_n_mem_cost(3, 0, 10.5), 32);
        assert_eq!(top_n_mem_cost(-1, 4, 2.0), 8);
    }

    #[test]
    fn test_external_sort_mem_cost() {
        let mb = MEGABYTE;
        // 100 MB over 8 MiB blocks: 12 blocks, ceil(sqrt(12)) = 4
        assert_eq!(
            external_sort_mem_cost(1_000_000, 100.0, 8 * mb, false),
            32 * mb
        );
        // doubled blocks: 6 blocks, ceil(sqrt(6)) = 3
        assert_eq!(
            external_sort_mem_cost(1_000_000, 100.0, 8 * mb, true),
            48 * mb
        );
        assert_eq!(external_sort_mem_cost(0, 100.0, 8 * mb, false), 0);
        assert_eq!(external_sort_mem_cost(1, 1.0, 8 * mb, false), 8 * mb);
    }

    #[test]
    fn test_mem_cost_picks_strategy() {
        let runtime = RuntimeOptions::default().with_read_size(1024);
        let top_n = sort_node(&[(ColumnType::BigInt, true)], true, 5);
        assert_eq!(top_n.mem_cost(10, 1000, 50.0, &runtime), 750);

        // pruned var-len slot does not double the block size
        let sort = sort_node(
            &[(ColumnType::BigInt, true), (ColumnType::String, false)],
            false,
            0,
        );
        assert_eq!(sort.mem_cost(1000, 1000, 50.0, &runtime), 1024 * 7);

        let var_len = sort_node(&[(ColumnType::String, true)], false, 0);
        assert_eq!(var_len.mem_cost(1000, 1000, 50.0, &runtime), 2048 * 5);
    }

    #[test]
    fn test_header_detail() {
        let sort = sort_node(&[(ColumnType::Int, true)], true, 5);
        assert!(sort.has_offset());
        assert_eq!(sort.header_detail(Some(10)), " [LIMIT=10 OFFSET=5]");
        assert_eq!(sort.header_detail(None), "");

        let sort = sort_node(&[(ColumnType::Int, true)], true, 0);
        assert!(!sort.has_offset());
        assert_eq!(sort.header_detail(Some(10)), " [LIMIT=10]");
    }

    #[test]
    fn test_resolve_skips_unmaterialized_slots() {
        let mut sort = sort_node(
            &[(ColumnType::Int, true), (ColumnType::Int, false), (ColumnType::Int, true)],
            false,
            0,
        );
        let smap = ExprSubstitutionMap::from_pairs(
            vec![Expr::slot_ref(SlotId::new(100), "src0")],
            vec![Expr::slot_ref(SlotId::new(7), "t.c0")],
        );
        sort.resolve_tuple_exprs(&smap);
        let resolved: Vec<String> = sort
            .base_tbl_materialized_tuple_exprs()
            .iter()
            .map(Expr::to_sql)
            .collect();
        assert_eq!(resolved, vec!["t.c0", "src2"]);
    }

    #[test]
    fn test_explain_detail_nulls() {
        let mut builder = DescriptorTableBuilder::new();
        let tuple_id = builder.add_tuple(None);
        let a = builder
            .add_slot(tuple_id, SlotSpec::computed("a", ColumnType::Int))
            .unwrap();
        let b = builder
            .add_slot(tuple_id, SlotSpec::computed("b", ColumnType::Int))
            .unwrap();
        let desc_tbl = builder.build();
        let info = SortInfo::new(
            vec![Expr::slot_ref(a, "a"), Expr::slot_ref(b, "b")],
            vec![true, false],
            vec![None, Some(false)],
            Arc::clone(desc_tbl.tuple(tuple_id).unwrap()),
            vec![Expr::lit_i64(1), Expr::lit_i64(2)],
        );
        assert_eq!(info.nulls_first(), vec![false, false]);
        let sort = SortNode::new(info, false, 3);
        assert_eq!(
            sort.explain_detail("|  ", ExplainLevel::Standard),
            "|  order by: a ASC, b DESC NULLS LAST\n|  offset: 3\n"
        );
        assert_eq!(sort.explain_detail("|  ", ExplainLevel::Minimal), "");
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn test_sort_info_key_mismatch() {
        let mut builder = DescriptorTableBuilder::new();
        let tuple_id = builder.add_tuple(None);
        let desc_tbl = builder.build();
        let _ = SortInfo::new(
            vec![Expr::lit_i64(1)],
            vec![],
            vec![None],
            Arc::clone(desc_tbl.tuple(tuple_id).unwrap()),
            vec![],
        );
    }

    #[test]
    #[should_panic(expected = "source exprs")]
    fn test_slot_expr_count_mismatch() {
        let mut builder = DescriptorTableBuilder::new();
        let tuple_id = builder.add_tuple(None);
        builder
            .add_slot(tuple_id, SlotSpec::computed("a", ColumnType::Int))
            .unwrap();
        let desc_tbl = builder.build();
        let info = SortInfo::new(
            vec![],
            vec![],
            vec![],
            Arc::clone(desc_tbl.tuple(tuple_id).unwrap()),
            vec![],
        );
        SortNode::new(info, false, 0).resolve_tuple_exprs(&ExprSubstitutionMap::new());
    }
}
