//! Byte-range delineations derived from declared column widths.

use std::slice;

use serde::{Deserialize, Serialize};

use crate::{error::LoadError, schema::ColumnSpec};

/// Half-open byte range `[start, end)` occupied by one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delineation {
    pub column_name: String,
    pub start: usize,
    pub end: usize,
}

impl Delineation {
    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// Lazily maps column specs to contiguous delineations. Offsets accumulate,
/// so specs are consumed strictly in declaration order.
pub struct DelineationMapper<'a> {
    specs: slice::Iter<'a, ColumnSpec>,
    offset: usize,
    failed: bool,
}

impl<'a> DelineationMapper<'a> {
    pub fn new(specs: &'a [ColumnSpec]) -> Self {
        Self {
            specs: specs.iter(),
            offset: 0,
            failed: false,
        }
    }
}

impl Iterator for DelineationMapper<'_> {
    type Item = Result<Delineation, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let spec = self.specs.next()?;
        let start = self.offset;
        let Some(end) = start
            .checked_add(spec.width)
            .filter(|end| *end > start)
        else {
            self.failed = true;
            return Some(Err(LoadError::WidthOverflow {
                column: spec.column_name.clone(),
                start,
                width: spec.width,
            }));
        };
        self.offset = end;
        Some(Ok(Delineation {
            column_name: spec.column_name.clone(),
            start,
            end,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    fn spec(name: &str, width: usize) -> ColumnSpec {
        ColumnSpec {
            column_name: name.to_string(),
            width,
            data_type: DataType::Text,
        }
    }

    #[test]
    fn maps_widths_to_contiguous_ranges() {
        let specs = vec![spec("name", 10), spec("valid", 1), spec("count", 3)];
        let mapped = DelineationMapper::new(&specs)
            .collect::<Result<Vec<_>, _>>()
            .expect("delineations");
        let ranges = mapped.iter().map(|d| (d.start, d.end)).collect::<Vec<_>>();
        assert_eq!(ranges, vec![(0, 10), (10, 11), (11, 14)]);
        assert_eq!(mapped[1].column_name, "valid");
        assert_eq!(mapped[2].width(), 3);
    }

    #[test]
    fn is_lazy_and_stops_after_overflow() {
        let specs = vec![spec("a", usize::MAX), spec("b", 1), spec("c", 1)];
        let mut mapper = DelineationMapper::new(&specs);
        assert!(mapper.next().unwrap().is_ok());
        let err = mapper.next().unwrap().unwrap_err();
        match err {
            LoadError::WidthOverflow { column, start, width } => {
                assert_eq!(column, "b");
                assert_eq!(start, usize::MAX);
                assert_eq!(width, 1);
            }
            other => panic!("expected WidthOverflow, got {other:?}"),
        }
        assert!(mapper.next().is_none());
    }

    #[test]
    fn zero_width_spec_is_rejected() {
        let specs = vec![spec("a", 2), spec("b", 0)];
        let err = DelineationMapper::new(&specs)
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert!(matches!(err, LoadError::WidthOverflow { start: 2, width: 0, .. }));
    }

    #[test]
    fn empty_specs_yield_nothing() {
        assert_eq!(DelineationMapper::new(&[]).count(), 0);
    }
}
