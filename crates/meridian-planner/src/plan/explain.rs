//! Plan explain rendering.
//!
//! Each node prints a header line, `<prefix><id>:<name><detail>`, followed
//! by detail lines indented with a detail prefix. A node with children
//! continues a `|` rail down to its first child; additional children hang
//! off the rail with `|--`:
//!
//! ```text
//! 01:TOP-N [LIMIT=10]
//! |  order by: c ASC
//! |  tuple-ids=1
//! |
//! 00:SCAN FILE [db.t]
//!    splits=1 size=1.00KB
//!    tuple-ids=0
//! ```

use meridian_common::config::ExplainLevel;
use meridian_common::constants::{GIGABYTE, KILOBYTE, MEGABYTE, TERABYTE, UNKNOWN_CARDINALITY};

use super::node::{NodeIndex, PlanNodeKind};
use super::tree::PlanTree;

/// Formats a byte count with a binary unit suffix.
///
/// # Example
///
/// ```rust
/// use meridian_planner::plan::print_bytes;
///
/// assert_eq!(print_bytes(750), "750B");
/// assert_eq!(print_bytes(3 * 1024 * 1024 / 2), "1.50MB");
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn print_bytes(bytes: u64) -> String {
    let value = bytes as f64;
    if bytes >= TERABYTE {
        format!("{:.2}TB", value / TERABYTE as f64)
    } else if bytes >= GIGABYTE {
        format!("{:.2}GB", value / GIGABYTE as f64)
    } else if bytes >= MEGABYTE {
        format!("{:.2}MB", value / MEGABYTE as f64)
    } else if bytes >= KILOBYTE {
        format!("{:.2}KB", value / KILOBYTE as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Formats a cardinality, `unavailable` when unknown.
pub fn print_cardinality(cardinality: i64) -> String {
    if cardinality == UNKNOWN_CARDINALITY {
        "unavailable".to_string()
    } else {
        cardinality.to_string()
    }
}

/// Renders the subtree rooted at `index`.
///
/// `root_prefix` starts the header line; `prefix` starts every other line.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn explain_subtree(
    tree: &PlanTree,
    index: NodeIndex,
    root_prefix: &str,
    prefix: &str,
    level: ExplainLevel,
    output: &mut String,
) {
    let node = tree.node(index);
    let has_children = !node.children().is_empty();
    let (detail_prefix, filler) = if has_children {
        (format!("{}|  ", prefix), format!("{}|", prefix))
    } else {
        (format!("{}   ", prefix), prefix.to_string())
    };

    output.push_str(&node.node_explain_string(root_prefix, &detail_prefix, level));
    let tuple_ids: Vec<String> = node.tuple_ids().iter().map(ToString::to_string).collect();

    // extended prints the schema next to the row size
    if level < ExplainLevel::Extended {
        output.push_str(&format!("{}tuple-ids={}\n", detail_prefix, tuple_ids.join(",")));
    }

    // sorts print limit and offset in their header
    if level >= ExplainLevel::Standard && !matches!(node.kind(), PlanNodeKind::Sort(_)) {
        if let Some(limit) = node.limit() {
            output.push_str(&format!("{}limit: {}\n", detail_prefix, limit));
        }
    }

    if level >= ExplainLevel::Extended {
        let mem = node
            .per_host_mem_cost()
            .map_or_else(|| "unavailable".to_string(), print_bytes);
        output.push_str(&format!(
            "{}hosts={} per-host-mem={}\n",
            detail_prefix,
            node.num_nodes(),
            mem
        ));
        output.push_str(&format!(
            "{}tuple-ids={} row-size={} cardinality={}\n",
            detail_prefix,
            tuple_ids.join(","),
            print_bytes(node.avg_row_size().round() as u64),
            print_cardinality(node.cardinality())
        ));
    }

    if has_children {
        if level >= ExplainLevel::Standard {
            output.push_str(&filler);
            output.push('\n');
        }
        let children = node.children();
        let child_root_prefix = format!("{}|--", prefix);
        let child_prefix = format!("{}|  ", prefix);
        for child in children[1..].iter().rev() {
            explain_subtree(tree, *child, &child_root_prefix, &child_prefix, level, output);
            if level >= ExplainLevel::Standard {
                output.push_str(&filler);
                output.push('\n');
            }
        }
        explain_subtree(tree, children[0], prefix, prefix, level, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_bytes() {
        assert_eq!(print_bytes(0), "0B");
        assert_eq!(print_bytes(1023), "1023B");
        assert_eq!(print_bytes(1024), "1.00KB");
        assert_eq!(print_bytes(8 * MEGABYTE), "8.00MB");
        assert_eq!(print_bytes(48 * MEGABYTE), "48.00MB");
        assert_eq!(print_bytes(GIGABYTE + GIGABYTE / 4), "1.25GB");
        assert_eq!(print_bytes(2 * TERABYTE), "2.00TB");
    }

    #[test]
    fn test_print_cardinality() {
        assert_eq!(print_cardinality(-1), "unavailable");
        assert_eq!(print_cardinality(0), "0");
        assert_eq!(print_cardinality(6_001_215), "6001215");
    }
}
