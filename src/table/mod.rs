// src/table/mod.rs

pub mod infer;
pub mod value;

pub use infer::{column_type, ColumnType};
pub use value::Value;

use anyhow::{anyhow, bail, Result};
use rayon::prelude::*;
use tracing::debug;

/// An in-memory dataset: ordered columns, ordered rows.
///
/// `index` carries one label per row. Extractors number rows from zero;
/// filtering keeps the surviving labels (so gaps show what was dropped) and
/// [`Table::reset_index`] renumbers them contiguously. Sinks write the index
/// as a leading column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub index: Vec<u64>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from row-major cells; every row must match the header width.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != headers.len())
        {
            bail!(
                "row {} has {} cells but the table has {} columns",
                i,
                row.len(),
                headers.len()
            );
        }
        let index = (0..rows.len() as u64).collect();
        Ok(Table {
            headers,
            index,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Like [`Table::column_index`] but a missing column is an error.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| anyhow!("column `{}` not found in {:?}", name, self.headers))
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Replace every cell of `name` with `f(cell)`. Rows are processed in
    /// parallel; row order is untouched.
    pub fn map_column<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&Value) -> Value + Sync + Send,
    {
        let idx = self.require_column(name)?;
        self.rows.par_iter_mut().for_each(|row| {
            let next = f(&row[idx]);
            row[idx] = next;
        });
        Ok(())
    }

    /// Stable filter. Returns how many rows were removed.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[Value]) -> bool,
    {
        let before = self.rows.len();
        let rows = std::mem::take(&mut self.rows);
        let index = std::mem::take(&mut self.index);
        for (label, row) in index.into_iter().zip(rows) {
            if keep(&row) {
                self.index.push(label);
                self.rows.push(row);
            }
        }
        before - self.rows.len()
    }

    /// Drop rows holding a null in any of `subset`, or in any column when
    /// `subset` is `None`.
    pub fn drop_nulls(&mut self, subset: Option<&[&str]>) -> Result<usize> {
        let dropped = match subset {
            None => self.retain_rows(|row| row.iter().all(|v| !v.is_null())),
            Some(names) => {
                let idxs = names
                    .iter()
                    .map(|n| self.require_column(n))
                    .collect::<Result<Vec<_>>>()?;
                self.retain_rows(|row| idxs.iter().all(|&i| !row[i].is_null()))
            }
        };
        if dropped > 0 {
            debug!(dropped, subset = ?subset, "dropped rows with nulls");
        }
        Ok(dropped)
    }

    /// Remove the named columns. Names that are not present are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|h| !names.contains(&h.as_str()))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }
        let mut flags = keep.iter();
        self.headers.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    /// Replace nulls in one column with `value`. Returns how many cells were filled.
    pub fn fill_nulls(&mut self, name: &str, value: &Value) -> Result<usize> {
        let idx = self.require_column(name)?;
        let mut filled = 0;
        for row in &mut self.rows {
            if row[idx].is_null() {
                row[idx] = value.clone();
                filled += 1;
            }
        }
        Ok(filled)
    }

    /// Renumber the row labels `0..len`.
    pub fn reset_index(&mut self) {
        self.index = (0..self.rows.len() as u64).collect();
    }

    /// Stack tables vertically. Columns are the union of all headers in
    /// first-seen order; cells a table lacks become null.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let tables: Vec<Table> = tables.into_iter().collect();
        let mut headers: Vec<String> = Vec::new();
        for t in &tables {
            for h in &t.headers {
                if !headers.contains(h) {
                    headers.push(h.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(Table::len).sum());
        for t in tables {
            let positions: Vec<Option<usize>> =
                headers.iter().map(|h| t.column_index(h)).collect();
            for mut row in t.rows {
                let out = positions
                    .iter()
                    .map(|p| match p {
                        Some(i) => std::mem::take(&mut row[*i]),
                        None => Value::Null,
                    })
                    .collect();
                rows.push(out);
            }
        }

        let index = (0..rows.len() as u64).collect();
        Table {
            headers,
            index,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![Value::Int(1), Value::from("x"), Value::Null],
                vec![Value::Int(2), Value::Null, Value::from("keep")],
                vec![Value::Int(3), Value::from("z"), Value::from("keep")],
                vec![Value::Null, Value::from("w"), Value::from("keep")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = Table::from_rows(vec!["a".into()], vec![vec![Value::Null, Value::Null]]);
        assert!(err.is_err());
    }

    #[test]
    fn drop_nulls_is_a_stable_filter() -> Result<()> {
        let mut t = sample();
        let dropped = t.drop_nulls(None)?;
        assert_eq!(dropped, 3);
        assert_eq!(t.index, vec![2]);
        assert_eq!(t.rows[0][0], Value::Int(3));

        let mut t = sample();
        t.drop_nulls(Some(&["a"]))?;
        assert_eq!(t.index, vec![0, 1, 2]);
        assert!(t.drop_nulls(Some(&["missing"])).is_err());
        Ok(())
    }

    #[test]
    fn drop_columns_ignores_unknown_names() {
        let mut t = sample();
        t.drop_columns(&["b", "nope"]);
        assert_eq!(t.headers, vec!["a", "c"]);
        assert!(t.rows.iter().all(|r| r.len() == 2));
        t.drop_columns(&["nope"]);
        assert_eq!(t.width(), 2);
    }

    #[test]
    fn fill_and_reset() -> Result<()> {
        let mut t = sample();
        assert_eq!(t.fill_nulls("b", &Value::from("?"))?, 1);
        assert_eq!(t.rows[1][1], Value::from("?"));
        t.retain_rows(|r| r[0] != Value::Int(1));
        assert_eq!(t.index, vec![1, 2, 3]);
        t.reset_index();
        assert_eq!(t.index, vec![0, 1, 2]);
        Ok(())
    }

    #[test]
    fn map_column_keeps_order() -> Result<()> {
        let mut t = sample();
        t.map_column("a", |v| match v {
            Value::Int(i) => Value::Int(i * 10),
            other => other.clone(),
        })?;
        let col: Vec<Value> = t.column("a").unwrap().into_iter().cloned().collect();
        assert_eq!(
            col,
            vec![Value::Int(10), Value::Int(20), Value::Int(30), Value::Null]
        );
        Ok(())
    }

    #[test]
    fn concat_unions_columns() -> Result<()> {
        let left = Table::from_rows(vec!["a".into()], vec![vec![Value::Int(1)]])?;
        let right = Table::from_rows(
            vec!["b".into(), "a".into()],
            vec![vec![Value::from("x"), Value::Int(2)]],
        )?;
        let t = Table::concat([left, right]);
        assert_eq!(t.headers, vec!["a", "b"]);
        assert_eq!(t.rows[0], vec![Value::Int(1), Value::Null]);
        assert_eq!(t.rows[1], vec![Value::Int(2), Value::from("x")]);
        assert_eq!(t.index, vec![0, 1]);
        Ok(())
    }
}
