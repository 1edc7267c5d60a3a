//! Planning benchmarks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use meridian_common::config::{ExplainLevel, QueryOptions, RuntimeOptions};
use meridian_common::types::TupleId;
use meridian_planner::analyzer::Analyzer;
use meridian_planner::descriptor::{
    ColumnStats, ColumnType, DescriptorTable, DescriptorTableBuilder, SlotSpec, TableDescriptor,
};
use meridian_planner::event::RecordingSink;
use meridian_planner::expr::Expr;
use meridian_planner::plan::{
    external_sort_mem_cost, top_n_mem_cost, FileScanSource, FileSplit, PlanTree, SortInfo,
};

const NUM_COLUMNS: usize = 32;

fn descriptors() -> (Arc<DescriptorTable>, TupleId, TupleId, Vec<Expr>) {
    let mut builder = DescriptorTableBuilder::new();
    let scan_tuple = builder.add_tuple(Some(TableDescriptor::new("bench.wide", 10_000_000)));
    let sort_tuple = builder.add_tuple(None);
    let mut slot_exprs = Vec::new();
    for i in 0..NUM_COLUMNS {
        let ty = if i % 4 == 0 {
            ColumnType::String
        } else {
            ColumnType::BigInt
        };
        let stats = ColumnStats::new(1000, 10.0);
        let scan_slot = builder
            .add_slot(scan_tuple, SlotSpec::column(format!("c{i}"), ty).with_stats(stats))
            .unwrap();
        builder
            .add_slot(sort_tuple, SlotSpec::computed(format!("c{i}"), ty).with_stats(stats))
            .unwrap();
        slot_exprs.push(Expr::slot_ref(scan_slot, format!("c{i}")));
    }
    (builder.build(), scan_tuple, sort_tuple, slot_exprs)
}

fn plan(use_top_n: bool) -> PlanTree {
    let (desc_tbl, scan_tuple, sort_tuple, slot_exprs) = descriptors();
    let sort_desc = Arc::clone(desc_tbl.tuple(sort_tuple).unwrap());
    let ordering = vec![Expr::slot_ref(sort_desc.slots[1].id, "c1")];

    let mut plan = PlanTree::with_sink(Arc::new(RecordingSink::new()));
    let splits = (0..64)
        .map(|i| FileSplit::new(format!("/bench/{i}"), 0, 1 << 26).with_host(format!("dn-{}:22000", i % 8)))
        .collect();
    let scan = plan
        .add_scan(
            Arc::clone(desc_tbl.tuple(scan_tuple).unwrap()),
            Arc::new(FileScanSource::new(splits)),
        )
        .unwrap();
    let info = SortInfo::new(ordering, vec![true], vec![None], sort_desc, slot_exprs);
    let sort = plan.add_sort(scan, info, use_top_n, 0);
    if use_top_n {
        plan.set_limit(sort, 100);
    }
    let mut analyzer = Analyzer::new(desc_tbl);
    plan.init(&mut analyzer).unwrap();
    plan.compute_costs(&RuntimeOptions::default(), &QueryOptions::default());
    plan
}

fn cost_formula_benchmark(c: &mut Criterion) {
    c.bench_function("external_sort_mem_cost", |b| {
        b.iter(|| {
            external_sort_mem_cost(
                black_box(10_000_000),
                black_box(312.0),
                black_box(8 << 20),
                black_box(true),
            )
        })
    });
    c.bench_function("top_n_mem_cost", |b| {
        b.iter(|| top_n_mem_cost(black_box(100), black_box(20), black_box(312.0)))
    });
}

fn plan_benchmark(c: &mut Criterion) {
    c.bench_function("plan_external_sort_32_cols", |b| {
        b.iter(|| black_box(plan(false).per_host_mem_estimate()))
    });
}

fn explain_benchmark(c: &mut Criterion) {
    let plan = plan(true);
    c.bench_function("explain_extended", |b| {
        b.iter(|| black_box(plan.explain(ExplainLevel::Extended)))
    });
}

criterion_group!(benches, cost_formula_benchmark, plan_benchmark, explain_benchmark);
criterion_main!(benches);
