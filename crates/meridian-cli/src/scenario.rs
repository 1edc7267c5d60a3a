//! Plan scenario files.
//!
//! A scenario describes one scanned table and the sort on top of it:
//!
//! ```toml
//! limit = 10
//!
//! [table]
//! name = "tpch.orders"
//! num_rows = 1500000
//!
//! [[columns]]
//! name = "o_orderkey"
//! type = "bigint"
//! ndv = 1500000
//! avg_size = 8.0
//!
//! [[splits]]
//! path = "/warehouse/orders/0.parq"
//! length = 67108864
//! hosts = ["dn-1:22000"]
//!
//! [[predicates]]
//! column = "o_orderkey"
//! op = ">"
//! value = 100
//!
//! [[sort_keys]]
//! column = "o_orderkey"
//! asc = false
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use meridian_common::config::PlannerConfig;
use meridian_common::constants::UNKNOWN_CARDINALITY;
use meridian_common::types::SlotId;
use meridian_planner::analyzer::Analyzer;
use meridian_planner::descriptor::{
    ColumnStats, ColumnType, DescriptorTableBuilder, SlotSpec, TableDescriptor,
};
use meridian_planner::expr::{BinaryOp, Expr, Literal};
use meridian_planner::plan::{FileScanSource, FileSplit, PlanTree, SortInfo};

/// A plan scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Row limit on the sort.
    #[serde(default)]
    pub limit: Option<u64>,

    /// Rows skipped before output starts.
    #[serde(default)]
    pub offset: u64,

    /// Forces a top-N (`true`) or a full sort (`false`). When unset a
    /// limited sort becomes a top-N unless the query options disable it.
    #[serde(default)]
    pub top_n: Option<bool>,

    /// Scanned table.
    pub table: TableSpec,

    /// Table columns, in slot order.
    pub columns: Vec<ColumnSpec>,

    /// Scan splits.
    #[serde(default)]
    pub splits: Vec<FileSplit>,

    /// Predicates on the scanned table.
    #[serde(default)]
    pub predicates: Vec<PredicateSpec>,

    /// Ordering keys, most significant first.
    pub sort_keys: Vec<SortKeySpec>,
}

/// Scanned table.
#[derive(Debug, Clone, Deserialize)]
pub struct TableSpec {
    /// Qualified table name.
    pub name: String,
    /// Row count, `-1` when the table has never been analyzed.
    #[serde(default = "unknown")]
    pub num_rows: i64,
}

/// One table column.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Type name, e.g. `bigint` or `varchar(20)`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Number of distinct values.
    #[serde(default)]
    pub ndv: Option<i64>,
    /// Average serialized size in bytes.
    #[serde(default)]
    pub avg_size: Option<f64>,
    /// Whether the sort materializes the column.
    #[serde(default = "default_true")]
    pub materialized: bool,
}

/// A predicate `<column> <op> <value>`.
#[derive(Debug, Clone, Deserialize)]
pub struct PredicateSpec {
    /// Column the predicate reads.
    pub column: String,
    /// Comparison operator, or `is null` / `is not null`.
    pub op: String,
    /// Right-hand value; absent for null checks.
    #[serde(default)]
    pub value: Option<toml::Value>,
}

/// One ordering key.
#[derive(Debug, Clone, Deserialize)]
pub struct SortKeySpec {
    /// Column to order by.
    pub column: String,
    /// Ascending order.
    #[serde(default = "default_true")]
    pub asc: bool,
    /// Explicit NULL placement.
    #[serde(default)]
    pub nulls_first: Option<bool>,
}

fn unknown() -> i64 {
    UNKNOWN_CARDINALITY
}

fn default_true() -> bool {
    true
}

impl Scenario {
    /// Parses a scenario from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Loads a scenario file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid scenario {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            bail!("scenario has no columns");
        }
        if self.sort_keys.is_empty() {
            bail!("scenario has no sort keys");
        }
        if self.top_n == Some(true) && self.limit.is_none() {
            bail!("top_n requires a limit");
        }
        let mut seen = HashMap::new();
        for (i, column) in self.columns.iter().enumerate() {
            if seen.insert(column.name.as_str(), i).is_some() {
                bail!("duplicate column '{}'", column.name);
            }
        }
        for key in &self.sort_keys {
            if !seen.contains_key(key.column.as_str()) {
                bail!("sort key references unknown column '{}'", key.column);
            }
        }
        for predicate in &self.predicates {
            if !seen.contains_key(predicate.column.as_str()) {
                bail!("predicate references unknown column '{}'", predicate.column);
            }
        }
        Ok(())
    }

    /// Returns true if the sort should be planned as a top-N.
    pub fn use_top_n(&self, config: &PlannerConfig) -> bool {
        match self.top_n {
            Some(top_n) => top_n,
            None => self.limit.is_some() && !config.query.disable_outermost_topn,
        }
    }

    /// Builds, initializes and costs the plan.
    pub fn plan(&self, config: &PlannerConfig) -> Result<PlanTree> {
        let mut builder = DescriptorTableBuilder::new();
        let scan_tuple = builder.add_tuple(Some(TableDescriptor::new(
            self.table.name.clone(),
            self.table.num_rows,
        )));
        let sort_tuple = builder.add_tuple(None);

        let mut scan_slots: HashMap<&str, SlotId> = HashMap::new();
        let mut sort_slots: HashMap<&str, SlotId> = HashMap::new();
        let mut slot_exprs = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let ty: ColumnType = column
                .ty
                .parse()
                .with_context(|| format!("column '{}'", column.name))?;
            let stats = column_stats(column);

            let mut spec = SlotSpec::column(column.name.clone(), ty);
            let mut sort_spec =
                SlotSpec::computed(column.name.clone(), ty).materialized(column.materialized);
            if let Some(stats) = stats {
                spec = spec.with_stats(stats);
                sort_spec = sort_spec.with_stats(stats);
            }
            let scan_slot = builder.add_slot(scan_tuple, spec)?;
            let sort_slot = builder.add_slot(sort_tuple, sort_spec)?;

            slot_exprs.push(Expr::slot_ref(scan_slot, column.name.clone()));
            scan_slots.insert(column.name.as_str(), scan_slot);
            sort_slots.insert(column.name.as_str(), sort_slot);
        }
        let desc_tbl = builder.build();

        let mut ordering = Vec::with_capacity(self.sort_keys.len());
        let mut is_asc = Vec::with_capacity(self.sort_keys.len());
        let mut nulls_first = Vec::with_capacity(self.sort_keys.len());
        for key in &self.sort_keys {
            let slot = lookup(&sort_slots, &key.column)?;
            ordering.push(Expr::slot_ref(slot, key.column.clone()));
            is_asc.push(key.asc);
            nulls_first.push(key.nulls_first);
        }

        let mut analyzer = Analyzer::new(Arc::clone(&desc_tbl));
        for predicate in &self.predicates {
            let slot = lookup(&scan_slots, &predicate.column)?;
            analyzer.register_conjunct(predicate_expr(predicate, slot)?)?;
        }

        let use_top_n = self.use_top_n(config);
        debug!(
            "Planning sort on {} keys over {} ({} splits, top_n={})",
            self.sort_keys.len(),
            self.table.name,
            self.splits.len(),
            use_top_n
        );

        let mut plan = PlanTree::new();
        let scan = plan.add_scan(
            Arc::clone(desc_tbl.tuple(scan_tuple)?),
            Arc::new(FileScanSource::new(self.splits.clone())),
        )?;
        let info = SortInfo::new(
            ordering,
            is_asc,
            nulls_first,
            Arc::clone(desc_tbl.tuple(sort_tuple)?),
            slot_exprs,
        );
        let sort = plan.add_sort(scan, info, use_top_n, self.offset);
        if let Some(limit) = self.limit {
            plan.set_limit(sort, limit);
        }

        plan.init(&mut analyzer)?;
        plan.compute_costs(&config.runtime, &config.query);
        info!(
            "Planned {} nodes, per-host memory estimate {} bytes",
            plan.len(),
            plan.per_host_mem_estimate()
        );
        Ok(plan)
    }
}

fn column_stats(column: &ColumnSpec) -> Option<ColumnStats> {
    if column.ndv.is_none() && column.avg_size.is_none() {
        return None;
    }
    Some(ColumnStats::new(
        column.ndv.unwrap_or(-1),
        column.avg_size.unwrap_or(-1.0),
    ))
}

fn lookup(slots: &HashMap<&str, SlotId>, column: &str) -> Result<SlotId> {
    slots
        .get(column)
        .copied()
        .with_context(|| format!("unknown column '{column}'"))
}

fn predicate_expr(predicate: &PredicateSpec, slot: SlotId) -> Result<Expr> {
    let column = Expr::slot_ref(slot, predicate.column.clone());
    let op = predicate.op.trim().to_ascii_lowercase();
    match op.as_str() {
        "is null" => return Ok(Expr::is_null(column, false)),
        "is not null" => return Ok(Expr::is_null(column, true)),
        _ => {}
    }

    let op = match op.as_str() {
        "=" | "==" => BinaryOp::Eq,
        "!=" | "<>" => BinaryOp::NotEq,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::LtEq,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::GtEq,
        other => bail!("unsupported predicate operator '{other}'"),
    };
    let value = match &predicate.value {
        Some(toml::Value::Integer(v)) => Literal::Integer(*v),
        Some(toml::Value::Float(v)) => Literal::Float(*v),
        Some(toml::Value::Boolean(v)) => Literal::Boolean(*v),
        Some(toml::Value::String(v)) => Literal::String(v.clone()),
        Some(other) => bail!(
            "unsupported value {} for predicate on '{}'",
            other,
            predicate.column
        ),
        None => bail!("predicate on '{}' needs a value", predicate.column),
    };
    Ok(Expr::binary(column, op, Expr::Literal(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_common::config::ExplainLevel;

    const ORDERS: &str = r#"
limit = 10
offset = 5

[table]
name = "tpch.orders"
num_rows = 1000

[[columns]]
name = "o_orderkey"
type = "bigint"
ndv = 1000
avg_size = 8.0

[[columns]]
name = "o_comment"
type = "string"
ndv = 900
avg_size = 42.0

[[splits]]
path = "/warehouse/orders/0.parq"
length = 1048576
hosts = ["dn-1:22000"]

[[sort_keys]]
column = "o_orderkey"
asc = false
"#;

    #[test]
    fn test_parse_defaults() {
        let scenario = Scenario::from_toml_str(ORDERS).unwrap();
        assert_eq!(scenario.limit, Some(10));
        assert_eq!(scenario.offset, 5);
        assert_eq!(scenario.columns.len(), 2);
        assert!(scenario.columns[0].materialized);
        assert_eq!(scenario.splits[0].offset, 0);
        assert!(scenario.predicates.is_empty());
        assert!(!scenario.sort_keys[0].asc);
        assert_eq!(scenario.sort_keys[0].nulls_first, None);
    }

    #[test]
    fn test_top_n_follows_query_options() {
        let scenario = Scenario::from_toml_str(ORDERS).unwrap();
        let mut config = PlannerConfig::default();
        assert!(scenario.use_top_n(&config));

        config.query.disable_outermost_topn = true;
        assert!(!scenario.use_top_n(&config));
    }

    #[test]
    fn test_plan_top_n() {
        let scenario = Scenario::from_toml_str(ORDERS).unwrap();
        let plan = scenario.plan(&PlannerConfig::default()).unwrap();
        assert_eq!(plan.len(), 2);

        let root = plan.node(plan.root().unwrap());
        assert_eq!(root.display_name(), "TOP-N");
        assert_eq!(root.cardinality(), 10);
        // (10 + 5) rows of 50 bytes
        assert_eq!(root.per_host_mem_cost(), Some(750));

        let explain = plan.explain(ExplainLevel::Standard);
        assert!(explain.contains("01:TOP-N [LIMIT=10 OFFSET=5]"));
        assert!(explain.contains("order by: o_orderkey DESC"));
    }

    #[test]
    fn test_plan_with_predicate() {
        let content = format!(
            "{ORDERS}\n[[predicates]]\ncolumn = \"o_comment\"\nop = \"is not null\"\n"
        );
        let scenario = Scenario::from_toml_str(&content).unwrap();
        let plan = scenario.plan(&PlannerConfig::default()).unwrap();
        let explain = plan.explain(ExplainLevel::Standard);
        assert!(explain.contains("predicates: o_comment IS NOT NULL"));
    }

    #[test]
    fn test_unknown_sort_column() {
        let content = ORDERS.replace("column = \"o_orderkey\"", "column = \"o_custkey\"");
        let err = Scenario::from_toml_str(&content).unwrap_err();
        assert!(err.to_string().contains("o_custkey"));
    }

    #[test]
    fn test_bad_column_type() {
        let content = ORDERS.replace("type = \"string\"", "type = \"varchar\"");
        let scenario = Scenario::from_toml_str(&content).unwrap();
        assert!(scenario.plan(&PlannerConfig::default()).is_err());
    }

    #[test]
    fn test_predicate_needs_value() {
        let predicate = PredicateSpec {
            column: "o_orderkey".into(),
            op: ">".into(),
            value: None,
        };
        assert!(predicate_expr(&predicate, SlotId::new(0)).is_err());

        let predicate = PredicateSpec {
            value: Some(toml::Value::Integer(7)),
            ..predicate
        };
        let expr = predicate_expr(&predicate, SlotId::new(0)).unwrap();
        assert_eq!(expr.to_sql(), "o_orderkey > 7");
    }

    #[test]
    fn test_top_n_without_limit_rejected() {
        let content = ORDERS.replace("limit = 10\n", "top_n = true\n");
        assert!(Scenario::from_toml_str(&content).is_err());
    }
}
