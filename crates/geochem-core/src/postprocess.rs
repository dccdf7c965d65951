//! Table-wide rewrite passes applied after assembly: blank-column pruning,
//! duplicate-header disambiguation and column reordering. Each pass needs the
//! complete output of the previous one.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::table::{ColumnHeader, ColumnKind, FlatTable, TableColumn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessStats {
    pub pruned_columns: usize,
    pub renamed_columns: usize,
}

/// Runs prune, disambiguate and reorder in that order.
pub fn finalize(table: &mut FlatTable) -> PostProcessStats {
    let pruned_columns = prune_blank_columns(table);
    let renamed_columns = disambiguate_headers(table);
    reorder_columns(table);
    PostProcessStats {
        pruned_columns,
        renamed_columns,
    }
}

/// Drops analyte columns that are empty in every row. Returns how many were dropped.
pub fn prune_blank_columns(table: &mut FlatTable) -> usize {
    let columns = table.columns_mut();
    let before = columns.len();
    columns.retain(|column| !column.header.is_dynamic() || !column.is_blank());
    let pruned = before - columns.len();
    debug!(pruned, "Pruned blank analyte columns");
    pruned
}

/// Gives the n-th repeat of a header the suffix `n` on its analyte segment.
/// Returns how many headers were rewritten.
///
/// If a suffixed header would collide with a header already emitted, the
/// suffix is bumped until it is unique.
pub fn disambiguate_headers(table: &mut FlatTable) -> usize {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut emitted: HashSet<String> = HashSet::new();
    let mut renamed = 0;

    for column in table.columns_mut().iter_mut() {
        match &mut column.header {
            ColumnHeader::Analyte { key, occurrence } => {
                let count = seen.entry(key.header(0)).or_insert(0);
                let mut candidate = *count;
                while emitted.contains(&key.header(candidate)) {
                    candidate += 1;
                }
                *count += 1;
                *occurrence = candidate;
                if candidate > 0 {
                    renamed += 1;
                }
                emitted.insert(key.header(candidate));
            }
            other => {
                emitted.insert(other.render());
            }
        }
    }

    renamed
}

/// Fixed columns first, then publication columns, both in their original
/// order, then analyte columns sorted by method group, analyte, repeat
/// index, unit and size fraction.
pub fn reorder_columns(table: &mut FlatTable) {
    let columns = std::mem::take(table.columns_mut());
    let mut fixed = Vec::new();
    let mut publications = Vec::new();
    let mut analytes = Vec::new();
    for column in columns {
        match column.header.kind() {
            ColumnKind::Fixed => fixed.push(column),
            ColumnKind::Publication => publications.push(column),
            ColumnKind::Analyte => analytes.push(column),
        }
    }

    analytes.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let target = table.columns_mut();
    target.extend(fixed);
    target.extend(publications);
    target.extend(analytes);
}

fn sort_key(column: &TableColumn) -> (&str, &str, usize, &str, &str) {
    match &column.header {
        ColumnHeader::Analyte { key, occurrence } => (
            key.method_group.as_str(),
            key.analyte.as_str(),
            *occurrence,
            key.unit.as_str(),
            key.size_fraction.as_str(),
        ),
        _ => ("", "", 0, "", ""),
    }
}

/// A rendered analyte header split back into its segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnalyteHeader<'a> {
    /// Analyte name including any repeat suffix, e.g. `Au1`.
    pub analyte: &'a str,
    pub method_group: &'a str,
    pub unit: &'a str,
    pub size_fraction: &'a str,
}

/// Splits `<Analyte>[n]_<Method>_<Unit>_<Fraction>`: analyte up to the first
/// `_`, method up to the second, fraction after the last, unit in between.
pub fn parse_analyte_header(header: &str) -> Option<ParsedAnalyteHeader<'_>> {
    let (analyte, rest) = header.split_once('_')?;
    let (method_group, rest) = rest.split_once('_')?;
    let (unit, size_fraction) = rest.rsplit_once('_')?;
    Some(ParsedAnalyteHeader {
        analyte,
        method_group,
        unit,
        size_fraction,
    })
}
