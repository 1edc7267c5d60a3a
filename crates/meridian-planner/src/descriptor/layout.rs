//! In-memory tuple layout.
//!
//! The layout is derived from a frozen [`TupleDescriptor`] and kept by the
//! plan node that materializes the tuple; descriptors are never mutated.
//!
//! A tuple starts with its null-indicator bytes, one bit per nullable
//! materialized slot. Materialized slots follow, largest first, each aligned
//! to its own size (capped at 8). Pruned slots take no space.

use std::collections::BTreeMap;

use meridian_common::constants::MAX_SLOT_ALIGNMENT;
use meridian_common::types::SlotId;

use super::table::TupleDescriptor;

/// Position of one materialized slot inside a tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPosition {
    /// Byte offset of the slot value.
    pub byte_offset: usize,
    /// Null indicator as (byte, bit), for nullable slots.
    pub null_indicator: Option<(usize, u8)>,
}

/// Computed memory layout of one tuple.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TupleLayout {
    /// Total tuple size in bytes.
    pub byte_size: usize,
    /// Number of leading null-indicator bytes.
    pub num_null_bytes: usize,
    /// Positions of materialized slots.
    pub positions: BTreeMap<SlotId, SlotPosition>,
}

impl TupleLayout {
    /// Returns the position of a slot, or `None` if it is pruned.
    pub fn position(&self, slot_id: SlotId) -> Option<&SlotPosition> {
        self.positions.get(&slot_id)
    }
}

fn alignment(size: usize) -> usize {
    if size.is_power_of_two() {
        size.min(MAX_SLOT_ALIGNMENT)
    } else {
        1
    }
}

/// Computes the memory layout of a tuple.
pub fn compute_mem_layout(tuple: &TupleDescriptor) -> TupleLayout {
    let mut slots: Vec<_> = tuple.materialized_slots().collect();
    // stable: equal sizes keep declaration order
    slots.sort_by(|a, b| b.ty.slot_size().cmp(&a.ty.slot_size()));

    let num_nullable = slots.iter().filter(|s| s.is_nullable).count();
    let num_null_bytes = num_nullable.div_ceil(8);

    let mut offset = num_null_bytes;
    let mut next_null_bit = 0usize;
    let mut positions = BTreeMap::new();
    for slot in slots {
        let size = slot.ty.slot_size();
        let align = alignment(size);
        offset = offset.div_ceil(align) * align;

        let null_indicator = slot.is_nullable.then(|| {
            let indicator = (next_null_bit / 8, (next_null_bit % 8) as u8);
            next_null_bit += 1;
            indicator
        });
        positions.insert(
            slot.id,
            SlotPosition {
                byte_offset: offset,
                null_indicator,
            },
        );
        offset += size;
    }

    TupleLayout {
        byte_size: offset,
        num_null_bytes,
        positions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColumnType, DescriptorTableBuilder, SlotSpec};

    #[test]
    fn test_empty_tuple() {
        let mut builder = DescriptorTableBuilder::new();
        let tuple = builder.add_tuple(None);
        let desc_tbl = builder.build();
        let layout = compute_mem_layout(desc_tbl.tuple(tuple).unwrap());
        assert_eq!(layout, TupleLayout::default());
    }

    #[test]
    fn test_largest_slots_first_after_null_bytes() {
        let mut builder = DescriptorTableBuilder::new();
        let tuple = builder.add_tuple(None);
        let a = builder
            .add_slot(tuple, SlotSpec::computed("a", ColumnType::Int))
            .unwrap();
        let b = builder
            .add_slot(tuple, SlotSpec::computed("b", ColumnType::String))
            .unwrap();
        let c = builder
            .add_slot(tuple, SlotSpec::computed("c", ColumnType::Boolean).nullable(false))
            .unwrap();
        let d = builder
            .add_slot(tuple, SlotSpec::computed("d", ColumnType::BigInt).materialized(false))
            .unwrap();
        let desc_tbl = builder.build();
        let layout = compute_mem_layout(desc_tbl.tuple(tuple).unwrap());

        // two nullable slots -> one null byte; b at 8 (aligned), a at 24, c at 28
        assert_eq!(layout.num_null_bytes, 1);
        assert_eq!(layout.position(b).unwrap().byte_offset, 8);
        assert_eq!(layout.position(a).unwrap().byte_offset, 24);
        assert_eq!(layout.position(c).unwrap().byte_offset, 28);
        assert_eq!(layout.position(c).unwrap().null_indicator, None);
        assert_eq!(layout.position(b).unwrap().null_indicator, Some((0, 0)));
        assert_eq!(layout.position(a).unwrap().null_indicator, Some((0, 1)));
        assert!(layout.position(d).is_none());
        assert_eq!(layout.byte_size, 29);
    }

    #[test]
    fn test_null_bytes_round_up() {
        let mut builder = DescriptorTableBuilder::new();
        let tuple = builder.add_tuple(None);
        for i in 0..9 {
            builder
                .add_slot(tuple, SlotSpec::computed(format!("s{i}"), ColumnType::TinyInt))
                .unwrap();
        }
        let desc_tbl = builder.build();
        let layout = compute_mem_layout(desc_tbl.tuple(tuple).unwrap());
        assert_eq!(layout.num_null_bytes, 2);
        assert_eq!(layout.byte_size, 11);
    }
}
