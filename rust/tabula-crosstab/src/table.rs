//! Row-major N-dimensional `f64` arrays with a per-cell mask.

use tabula_common::{Result, error::Error};

/// A dense array of `f64` cells, each of which may be masked (absent).
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedTable {
    shape: Vec<usize>,
    values: Vec<f64>,
    /// `true` where the cell is absent.
    mask: Vec<bool>,
}

impl MaskedTable {
    /// A table of `shape` with every cell masked.
    pub fn masked(shape: &[usize]) -> MaskedTable {
        let size = shape.iter().product();
        MaskedTable {
            shape: shape.to_vec(),
            values: vec![0.0; size],
            mask: vec![true; size],
        }
    }

    /// A table from row-major cells, `None` marking masked ones.
    pub fn from_cells(shape: &[usize], cells: Vec<Option<f64>>) -> Result<MaskedTable> {
        let size: usize = shape.iter().product();
        if cells.len() != size {
            return Err(Error::invalid_arg(
                "cells",
                format!("{} cells for shape {shape:?}", cells.len()),
            ));
        }
        let mask = cells.iter().map(Option::is_none).collect();
        let values = cells.into_iter().map(Option::unwrap_or_default).collect();
        Ok(MaskedTable {
            shape: shape.to_vec(),
            values,
            mask,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        Some(offset)
    }

    /// The cell at `index`, `None` when masked or out of range.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        let offset = self.offset(index)?;
        (!self.mask[offset]).then(|| self.values[offset])
    }

    /// Sets and unmasks the cell at `index`; `None` masks it.
    pub fn set(&mut self, index: &[usize], value: Option<f64>) -> Result<()> {
        let offset = self
            .offset(index)
            .ok_or_else(|| Error::invalid_arg("index", format!("{index:?} outside shape {:?}", self.shape)))?;
        self.mask[offset] = value.is_none();
        self.values[offset] = value.unwrap_or_default();
        Ok(())
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values
            .iter()
            .zip(&self.mask)
            .map(|(&v, &masked)| (!masked).then_some(v))
    }

    /// Sum of the unmasked cells.
    pub fn sum(&self) -> f64 {
        self.cells().flatten().sum()
    }

    /// Number of unmasked cells.
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }

    fn split(&self, axis: usize) -> (usize, usize, usize) {
        let outer = self.shape[..axis].iter().product();
        let inner = self.shape[axis + 1..].iter().product();
        (outer, self.shape[axis], inner)
    }

    /// Sums out `axis`. A result cell is masked only when every cell summed
    /// into it was masked.
    pub fn sum_axis(&self, axis: usize) -> Result<MaskedTable> {
        if axis >= self.shape.len() {
            return Err(Error::invalid_arg(
                "axis",
                format!("axis {axis} of a {}-d table", self.shape.len()),
            ));
        }
        let (outer, n, inner) = self.split(axis);
        let mut shape = self.shape.clone();
        shape.remove(axis);
        let mut out = MaskedTable::masked(&shape);
        for o in 0..outer {
            for i in 0..inner {
                let target = o * inner + i;
                for j in 0..n {
                    let source = (o * n + j) * inner + i;
                    if !self.mask[source] {
                        out.values[target] += self.values[source];
                        out.mask[target] = false;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Inserts a new axis of `size` at position `axis`, repeating the
    /// existing cells along it.
    pub fn replicate_axis(&self, axis: usize, size: usize) -> Result<MaskedTable> {
        if axis > self.shape.len() {
            return Err(Error::invalid_arg(
                "axis",
                format!("axis {axis} of a {}-d table", self.shape.len()),
            ));
        }
        let outer: usize = self.shape[..axis].iter().product();
        let block: usize = self.shape[axis..].iter().product();
        let mut shape = self.shape.clone();
        shape.insert(axis, size);
        let mut values = Vec::with_capacity(outer * size * block);
        let mut mask = Vec::with_capacity(outer * size * block);
        for o in 0..outer {
            let range = o * block..(o + 1) * block;
            for _ in 0..size {
                values.extend_from_slice(&self.values[range.clone()]);
                mask.extend_from_slice(&self.mask[range.clone()]);
            }
        }
        Ok(MaskedTable {
            shape,
            values,
            mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MaskedTable {
        // 2 x 3
        MaskedTable::from_cells(
            &[2, 3],
            vec![Some(1.0), None, Some(3.0), None, None, Some(6.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_get_set() {
        let mut t = table();
        assert_eq!(t.get(&[0, 2]), Some(3.0));
        assert_eq!(t.get(&[1, 0]), None);
        assert_eq!(t.get(&[2, 0]), None);
        t.set(&[1, 0], Some(4.0)).unwrap();
        assert_eq!(t.get(&[1, 0]), Some(4.0));
        assert!(t.set(&[0, 3], Some(1.0)).is_err());
        assert_eq!(t.count(), 4);
    }

    #[test]
    fn test_sum_axis() {
        let t = table();
        let rows = t.sum_axis(1).unwrap();
        assert_eq!(rows.shape(), &[2]);
        assert_eq!(rows.cells().collect::<Vec<_>>(), vec![Some(4.0), Some(6.0)]);
        let cols = t.sum_axis(0).unwrap();
        assert_eq!(
            cols.cells().collect::<Vec<_>>(),
            vec![Some(1.0), None, Some(9.0)]
        );
        assert_eq!(cols.sum(), t.sum());
        assert!(t.sum_axis(2).is_err());
    }

    #[test]
    fn test_replicate_axis() {
        let t = table();
        let r = t.replicate_axis(1, 2).unwrap();
        assert_eq!(r.shape(), &[2, 2, 3]);
        for k in 0..2 {
            for j in 0..3 {
                assert_eq!(r.get(&[0, k, j]), t.get(&[0, j]));
                assert_eq!(r.get(&[1, k, j]), t.get(&[1, j]));
            }
        }
        let front = t.replicate_axis(0, 3).unwrap();
        assert_eq!(front.shape(), &[3, 2, 3]);
        assert_eq!(front.get(&[2, 1, 2]), Some(6.0));
        assert_eq!(front.sum(), 3.0 * t.sum());
        let back = t.replicate_axis(2, 1).unwrap();
        assert_eq!(back.shape(), &[2, 3, 1]);
        assert_eq!(back.get(&[0, 2, 0]), Some(3.0));
    }
}
