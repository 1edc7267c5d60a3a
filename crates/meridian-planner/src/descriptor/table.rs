//! Tuple, slot, and table descriptors.
//!
//! Analysis builds descriptors through [`DescriptorTableBuilder`] and then
//! freezes them into a [`DescriptorTable`]. Planning only ever sees the
//! frozen snapshot: every descriptor is reachable by shared reference and
//! none of them can be changed after `build()`.

use std::collections::BTreeMap;
use std::sync::Arc;

use meridian_common::constants::UNKNOWN_CARDINALITY;
use meridian_common::error::{PlannerError, PlannerResult};
use meridian_common::types::{SlotId, TupleId};

use super::stats::ColumnStats;
use super::types::ColumnType;

/// A base table and its table-level statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    /// Fully qualified name (`db.table`).
    pub name: String,
    /// Row count; `-1` when the table has not been analyzed.
    pub num_rows: i64,
}

impl TableDescriptor {
    /// Creates a table descriptor.
    pub fn new(name: impl Into<String>, num_rows: i64) -> Self {
        Self {
            name: name.into(),
            num_rows,
        }
    }

    /// Returns true if the row count is known.
    #[inline]
    pub fn has_row_count(&self) -> bool {
        self.num_rows != UNKNOWN_CARDINALITY
    }
}

/// One slot of a tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDescriptor {
    /// Slot id, unique across the query.
    pub id: SlotId,
    /// Tuple this slot belongs to.
    pub parent: TupleId,
    /// Base-table column name, if the slot is backed by one.
    pub column: Option<String>,
    /// Display label.
    pub label: String,
    /// Slot type.
    pub ty: ColumnType,
    /// False when the slot is pruned because nothing downstream reads it.
    pub is_materialized: bool,
    /// Whether the slot may hold NULL.
    pub is_nullable: bool,
    /// Column statistics.
    pub stats: ColumnStats,
}

impl SlotDescriptor {
    /// Returns the name used in diagnostics: the column name when present,
    /// otherwise the label.
    pub fn display_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.label)
    }
}

/// A row shape: an ordered list of slots, optionally backed by a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleDescriptor {
    /// Tuple id.
    pub id: TupleId,
    /// Slots in declaration order.
    pub slots: Vec<SlotDescriptor>,
    /// Base table, for tuples produced by a scan.
    pub table: Option<Arc<TableDescriptor>>,
}

impl TupleDescriptor {
    /// Returns the materialized slots.
    pub fn materialized_slots(&self) -> impl Iterator<Item = &SlotDescriptor> {
        self.slots.iter().filter(|s| s.is_materialized)
    }

    /// Returns true if any materialized slot holds variable-length data.
    pub fn has_var_len_slots(&self) -> bool {
        self.materialized_slots().any(|s| !s.ty.is_fixed_length())
    }

    /// Returns the estimated serialized size of one tuple in bytes.
    ///
    /// Slots with a known average size from column stats contribute that
    /// size; all others contribute their in-tuple slot size.
    pub fn avg_serialized_size(&self) -> f64 {
        self.materialized_slots()
            .map(|s| s.stats.known_avg_size().unwrap_or(s.ty.slot_size() as f64))
            .sum()
    }
}

/// Frozen snapshot of every tuple and slot of one query.
#[derive(Debug, Default)]
pub struct DescriptorTable {
    tuples: BTreeMap<TupleId, Arc<TupleDescriptor>>,
    slot_parents: BTreeMap<SlotId, TupleId>,
}

impl DescriptorTable {
    /// Looks up a tuple.
    pub fn tuple(&self, id: TupleId) -> PlannerResult<&Arc<TupleDescriptor>> {
        self.tuples
            .get(&id)
            .ok_or(PlannerError::TupleNotFound { tuple_id: id })
    }

    /// Looks up a slot.
    pub fn slot(&self, id: SlotId) -> PlannerResult<&SlotDescriptor> {
        let parent = self
            .slot_parents
            .get(&id)
            .ok_or(PlannerError::SlotNotFound { slot_id: id })?;
        self.tuples
            .get(parent)
            .and_then(|t| t.slots.iter().find(|s| s.id == id))
            .ok_or(PlannerError::SlotNotFound { slot_id: id })
    }

    /// Returns the tuple a slot belongs to.
    pub fn slot_parent(&self, id: SlotId) -> PlannerResult<TupleId> {
        self.slot_parents
            .get(&id)
            .copied()
            .ok_or(PlannerError::SlotNotFound { slot_id: id })
    }

    /// Returns all tuples in id order.
    pub fn tuples(&self) -> impl Iterator<Item = &Arc<TupleDescriptor>> {
        self.tuples.values()
    }
}

/// Describes a slot to add through [`DescriptorTableBuilder::add_slot`].
#[derive(Debug, Clone)]
pub struct SlotSpec {
    column: Option<String>,
    label: String,
    ty: ColumnType,
    is_materialized: bool,
    is_nullable: bool,
    stats: ColumnStats,
}

impl SlotSpec {
    /// A slot backed by a base-table column.
    pub fn column(name: impl Into<String>, ty: ColumnType) -> Self {
        let name = name.into();
        Self {
            column: Some(name.clone()),
            label: name,
            ty,
            is_materialized: true,
            is_nullable: true,
            stats: ColumnStats::unavailable(),
        }
    }

    /// A slot holding a computed value.
    pub fn computed(label: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            column: None,
            label: label.into(),
            ty,
            is_materialized: true,
            is_nullable: true,
            stats: ColumnStats::unavailable(),
        }
    }

    /// Sets column statistics.
    #[must_use]
    pub fn with_stats(mut self, stats: ColumnStats) -> Self {
        self.stats = stats;
        self
    }

    /// Marks the slot as pruned or materialized.
    #[must_use]
    pub fn materialized(mut self, is_materialized: bool) -> Self {
        self.is_materialized = is_materialized;
        self
    }

    /// Sets nullability.
    #[must_use]
    pub fn nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }
}

/// Mutable descriptor registry used during analysis.
///
/// # Example
///
/// ```rust
/// use meridian_planner::descriptor::{ColumnType, DescriptorTableBuilder, SlotSpec, TableDescriptor};
///
/// let mut builder = DescriptorTableBuilder::new();
/// let tuple = builder.add_tuple(Some(TableDescriptor::new("db.t", 100)));
/// let slot = builder.add_slot(tuple, SlotSpec::column("a", ColumnType::Int)).unwrap();
/// let desc_tbl = builder.build();
/// assert_eq!(desc_tbl.slot_parent(slot).unwrap(), tuple);
/// ```
#[derive(Debug, Default)]
pub struct DescriptorTableBuilder {
    tuples: BTreeMap<TupleId, TupleDescriptor>,
    slot_parents: BTreeMap<SlotId, TupleId>,
    next_tuple_id: u32,
    next_slot_id: u32,
}

impl DescriptorTableBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tuple, optionally backed by a table, and returns its id.
    pub fn add_tuple(&mut self, table: Option<TableDescriptor>) -> TupleId {
        let id = TupleId::new(self.next_tuple_id);
        self.next_tuple_id += 1;
        self.tuples.insert(
            id,
            TupleDescriptor {
                id,
                slots: Vec::new(),
                table: table.map(Arc::new),
            },
        );
        id
    }

    /// Appends a slot to a tuple and returns its id.
    pub fn add_slot(&mut self, tuple_id: TupleId, spec: SlotSpec) -> PlannerResult<SlotId> {
        let tuple = self
            .tuples
            .get_mut(&tuple_id)
            .ok_or(PlannerError::TupleNotFound { tuple_id })?;
        let id = SlotId::new(self.next_slot_id);
        self.next_slot_id += 1;
        tuple.slots.push(SlotDescriptor {
            id,
            parent: tuple_id,
            column: spec.column,
            label: spec.label,
            ty: spec.ty,
            is_materialized: spec.is_materialized,
            is_nullable: spec.is_nullable,
            stats: spec.stats,
        });
        self.slot_parents.insert(id, tuple_id);
        Ok(id)
    }

    /// Changes the materialization flag of an existing slot.
    pub fn set_materialized(&mut self, slot_id: SlotId, is_materialized: bool) -> PlannerResult<()> {
        let parent = self
            .slot_parents
            .get(&slot_id)
            .ok_or(PlannerError::SlotNotFound { slot_id })?;
        let slot = self
            .tuples
            .get_mut(parent)
            .and_then(|t| t.slots.iter_mut().find(|s| s.id == slot_id))
            .ok_or(PlannerError::SlotNotFound { slot_id })?;
        slot.is_materialized = is_materialized;
        Ok(())
    }

    /// Freezes the descriptors into an immutable snapshot.
    pub fn build(self) -> Arc<DescriptorTable> {
        Arc::new(DescriptorTable {
            tuples: self
                .tuples
                .into_iter()
                .map(|(id, t)| (id, Arc::new(t)))
                .collect(),
            slot_parents: self.slot_parents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_common::error::ErrorCode;

    fn lineitem() -> (Arc<DescriptorTable>, TupleId, Vec<SlotId>) {
        let mut builder = DescriptorTableBuilder::new();
        let tuple = builder.add_tuple(Some(TableDescriptor::new("tpch.lineitem", 6_001_215)));
        let slots = vec![
            builder
                .add_slot(
                    tuple,
                    SlotSpec::column("l_orderkey", ColumnType::BigInt)
                        .with_stats(ColumnStats::new(1_500_000, 8.0)),
                )
                .unwrap(),
            builder
                .add_slot(
                    tuple,
                    SlotSpec::column("l_comment", ColumnType::String)
                        .with_stats(ColumnStats::new(4_580_667, 26.5)),
                )
                .unwrap(),
            builder
                .add_slot(
                    tuple,
                    SlotSpec::column("l_shipmode", ColumnType::String).materialized(false),
                )
                .unwrap(),
        ];
        (builder.build(), tuple, slots)
    }

    #[test]
    fn test_lookup() {
        let (desc_tbl, tuple, slots) = lineitem();
        let desc = desc_tbl.tuple(tuple).unwrap();
        assert_eq!(desc.slots.len(), 3);
        assert_eq!(desc.table.as_ref().unwrap().num_rows, 6_001_215);
        assert_eq!(desc_tbl.slot(slots[1]).unwrap().display_name(), "l_comment");
        assert_eq!(desc_tbl.slot_parent(slots[2]).unwrap(), tuple);
    }

    #[test]
    fn test_missing_ids() {
        let (desc_tbl, _, _) = lineitem();
        let err = desc_tbl.tuple(TupleId::new(99)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TupleNotFound);
        let err = desc_tbl.slot(SlotId::new(99)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SlotNotFound);
    }

    #[test]
    fn test_avg_serialized_size_skips_pruned_slots() {
        let (desc_tbl, tuple, _) = lineitem();
        let desc = desc_tbl.tuple(tuple).unwrap();
        assert!((desc.avg_serialized_size() - 34.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_avg_serialized_size_falls_back_to_slot_size() {
        let mut builder = DescriptorTableBuilder::new();
        let tuple = builder.add_tuple(None);
        builder
            .add_slot(tuple, SlotSpec::computed("a", ColumnType::Int))
            .unwrap();
        builder
            .add_slot(tuple, SlotSpec::computed("b", ColumnType::String))
            .unwrap();
        let desc_tbl = builder.build();
        let desc = desc_tbl.tuple(tuple).unwrap();
        assert!((desc.avg_serialized_size() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_var_len_detection_ignores_pruned_slots() {
        let mut builder = DescriptorTableBuilder::new();
        let tuple = builder.add_tuple(None);
        builder
            .add_slot(tuple, SlotSpec::computed("k", ColumnType::BigInt))
            .unwrap();
        let s = builder
            .add_slot(tuple, SlotSpec::computed("v", ColumnType::String))
            .unwrap();
        builder.set_materialized(s, false).unwrap();
        let desc_tbl = builder.build();
        assert!(!desc_tbl.tuple(tuple).unwrap().has_var_len_slots());
    }

    #[test]
    fn test_add_slot_to_unknown_tuple() {
        let mut builder = DescriptorTableBuilder::new();
        let err = builder
            .add_slot(TupleId::new(3), SlotSpec::computed("x", ColumnType::Int))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TupleNotFound);
    }
}
