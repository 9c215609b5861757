use serde::Serialize;
use std::io::{BufRead, BufReader};
use std::ops::RangeInclusive;
use std::path::Path;

use super::{open_or_missing, LoadError};
use crate::config::describe_variable;
use crate::logging::{obj, v_str, warn, Domain};

/// Per-timestep scalar metrics of one simulation run. Row `i` is timestep `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
    rows: usize,
}

/// One cell of a table in long format, as fed to a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time: usize,
    pub variable: String,
    pub value: f64,
    pub description: &'static str,
}

impl MetricTable {
    pub fn from_csv(path: &Path) -> Result<Self, LoadError> {
        let file = open_or_missing(path)?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            lines.push(line.map_err(|e| LoadError::malformed(path, e.to_string()))?);
        }
        Self::parse(lines.iter().map(String::as_str))
            .map_err(|msg| LoadError::malformed(path, msg))
    }

    /// Parse CSV text. A leading unnamed or `time` column is treated as the
    /// row index and dropped.
    pub fn parse<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Self, String> {
        let mut lines = lines
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        let header = lines.next().ok_or_else(|| "missing header".to_string())?;
        let mut columns: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();
        let has_index = columns
            .first()
            .map(|c| c.is_empty() || c.eq_ignore_ascii_case("time"))
            .unwrap_or(false);
        if has_index {
            columns.remove(0);
        }
        if columns.is_empty() {
            return Err("no metric columns".to_string());
        }

        let mut values = vec![Vec::new(); columns.len()];
        let mut rows = 0usize;
        for (lineno, line) in lines.enumerate() {
            let mut fields: Vec<&str> = line.split(',').collect();
            if has_index && !fields.is_empty() {
                fields.remove(0);
            }
            if fields.len() != columns.len() {
                warn(
                    Domain::Data,
                    "bad_row",
                    obj(&[(
                        "msg",
                        v_str(&format!(
                            "row {}: expected {} fields, got {}",
                            lineno + 2,
                            columns.len(),
                            fields.len()
                        )),
                    )]),
                );
                continue;
            }
            for (col, raw) in values.iter_mut().zip(fields) {
                col.push(parse_cell(raw));
            }
            rows += 1;
        }

        Ok(Self { columns, values, rows })
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
    }

    /// Attach or replace a column. The length must match the table.
    pub fn push_column(&mut self, name: &str, data: Vec<f64>) -> Result<(), String> {
        if data.len() != self.rows {
            return Err(format!(
                "column {} has {} values, table has {} rows",
                name,
                data.len(),
                self.rows
            ));
        }
        match self.columns.iter().position(|c| c == name) {
            Some(i) => self.values[i] = data,
            None => {
                self.columns.push(name.to_string());
                self.values.push(data);
            }
        }
        Ok(())
    }

    /// Long-format points for `columns` over the inclusive timestep range.
    /// Unknown columns are left out.
    pub fn melt(&self, columns: &[&str], range: RangeInclusive<usize>) -> Vec<SeriesPoint> {
        let mut out = Vec::new();
        if self.rows == 0 {
            return out;
        }
        let start = *range.start();
        let end = (*range.end()).min(self.rows - 1);
        for name in columns {
            let Some(data) = self.column(name) else {
                continue;
            };
            for t in start..=end {
                out.push(SeriesPoint {
                    time: t,
                    variable: name.to_string(),
                    value: data[t],
                    description: describe_variable(name),
                });
            }
        }
        out
    }

    /// Mean of the last `n` values of a column (all values if fewer).
    pub fn tail_mean(&self, name: &str, n: usize) -> Option<f64> {
        let data = self.column(name)?;
        if data.is_empty() {
            return None;
        }
        let tail = &data[data.len().saturating_sub(n)..];
        Some(tail.iter().sum::<f64>() / tail.len() as f64)
    }
}

fn parse_cell(raw: &str) -> f64 {
    let raw = raw.trim();
    match raw {
        "True" | "true" => 1.0,
        "False" | "false" => 0.0,
        _ => raw.parse().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> MetricTable {
        MetricTable::parse(text.lines()).unwrap()
    }

    #[test]
    fn test_parse_with_index_column() {
        let t = table(",ActiveProjects,Roi\n0,1,0.5\n1,2,0.7\n2,4,0.9\n");
        assert_eq!(t.len(), 3);
        assert_eq!(t.columns(), &["ActiveProjects".to_string(), "Roi".to_string()]);
        assert_eq!(t.column("ActiveProjects"), Some(&[1.0, 2.0, 4.0][..]));
    }

    #[test]
    fn test_parse_without_index_column() {
        let t = table("ActiveProjects,SuccessfulProjects\n3,0\n5,1\n");
        assert_eq!(t.column("SuccessfulProjects"), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let t = table("a,b\n1,2\n3\n4,5\n");
        assert_eq!(t.len(), 2);
        assert_eq!(t.column("a"), Some(&[1.0, 4.0][..]));
    }

    #[test]
    fn test_unparseable_cell_is_nan() {
        let t = table("a\nxyz\n");
        assert!(t.column("a").unwrap()[0].is_nan());
    }

    #[test]
    fn test_push_column_length_checked() {
        let mut t = table("a\n1\n2\n");
        assert!(t.push_column("Roi", vec![0.0]).is_err());
        t.push_column("Roi", vec![0.1, 0.2]).unwrap();
        t.push_column("Roi", vec![0.3, 0.4]).unwrap();
        assert_eq!(t.columns().len(), 2);
        assert_eq!(t.column("Roi"), Some(&[0.3, 0.4][..]));
    }

    #[test]
    fn test_melt_clamps_range_and_describes() {
        let t = table("ActiveProjects,Other\n1,9\n2,8\n3,7\n");
        let pts = t.melt(&["ActiveProjects", "Other", "Missing"], 1..=10);
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[0].time, 1);
        assert_eq!(pts[0].description, "Number of currently active projects.");
        assert_eq!(pts[3].variable, "Other");
        assert_eq!(pts[3].description, "(undefined)");
    }

    #[test]
    fn test_tail_mean() {
        let t = table("Roi\n1\n2\n3\n4\n");
        assert_eq!(t.tail_mean("Roi", 2), Some(3.5));
        assert_eq!(t.tail_mean("Roi", 25), Some(2.5));
        assert_eq!(t.tail_mean("Nope", 2), None);
    }
}
