//! Sort engine: stable ordering through caller-supplied comparators keyed by a closed field enum.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use fleetdeck_core::{FieldValue, Fields, SortDirection, SortField};
use rustc_hash::FxHashMap;
use tracing::warn;

/// Ascending comparison between two records.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

pub struct SortConfig<T: ?Sized, F: SortField> {
    pub default_field: F,
    pub default_direction: SortDirection,
    comparators: FxHashMap<F, Comparator<T>>,
}

impl<T: ?Sized, F: SortField> SortConfig<T, F> {
    /// Empty config; register comparators with [`SortConfig::comparator`].
    pub fn new(default_field: F, default_direction: SortDirection) -> Self {
        Self { default_field, default_direction, comparators: FxHashMap::default() }
    }

    /// One comparator per variant of `F`, produced by an exhaustive `match`.
    pub fn exhaustive(
        default_field: F,
        default_direction: SortDirection,
        mut make: impl FnMut(F) -> Comparator<T>,
    ) -> Self {
        let comparators = F::all().iter().map(|f| (*f, make(*f))).collect();
        Self { default_field, default_direction, comparators }
    }

    pub fn comparator(mut self, field: F, cmp: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        self.comparators.insert(field, Arc::new(cmp));
        self
    }

    pub fn get(&self, field: F) -> Option<&Comparator<T>> {
        self.comparators.get(&field)
    }

    pub fn has(&self, field: F) -> bool {
        self.comparators.contains_key(&field)
    }

    /// Sortable fields in declaration order.
    pub fn fields(&self) -> Vec<F> {
        F::all().iter().copied().filter(|f| self.has(*f)).collect()
    }
}

impl<T: ?Sized, F: SortField> Clone for SortConfig<T, F> {
    fn clone(&self) -> Self {
        Self {
            default_field: self.default_field,
            default_direction: self.default_direction,
            comparators: self.comparators.clone(),
        }
    }
}

impl<T: ?Sized, F: SortField> fmt::Debug for SortConfig<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortConfig")
            .field("default_field", &self.default_field)
            .field("default_direction", &self.default_direction)
            .field("fields", &self.fields())
            .finish()
    }
}

/// New vector ordered by `field`. Ties keep their input order in both directions.
/// A field without a comparator keeps input order and is reported.
pub fn sort_records<'a, T, F>(records: &[&'a T], field: F, direction: SortDirection, cfg: &SortConfig<T, F>) -> Vec<&'a T>
where
    T: ?Sized,
    F: SortField,
{
    let mut out = records.to_vec();
    let Some(cmp) = cfg.get(field) else {
        warn!(field = field.key(), "no comparator registered for sort field; keeping input order");
        metrics::counter!("card_sort_missing_comparator_total", 1u64);
        return out;
    };
    if out.len() > 1 {
        out.sort_by(|a, b| direction.apply(cmp(*a, *b)));
    }
    out
}

/// Case-insensitive text order, falling back to byte order so distinct strings never tie.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Order two field values: numbers numerically, text case-insensitively, absent values last.
pub fn compare_values(a: &FieldValue<'_>, b: &FieldValue<'_>) -> Ordering {
    use FieldValue::*;
    match (a, b) {
        (Absent, Absent) => Ordering::Equal,
        (Absent, _) => Ordering::Greater,
        (_, Absent) => Ordering::Less,
        (Int(x), Int(y)) => x.cmp(y),
        (Int(x), Float(y)) => (*x as f64).total_cmp(y),
        (Float(x), Int(y)) => x.total_cmp(&(*y as f64)),
        (Float(x), Float(y)) => x.total_cmp(y),
        (Bool(x), Bool(y)) => x.cmp(y),
        _ => compare_text(&a.search_text(), &b.search_text()),
    }
}

/// Comparator over a named field, for untyped records.
pub fn by_field<T: Fields + ?Sized>(name: impl Into<String>) -> Comparator<T> {
    let name = name.into();
    Arc::new(move |a: &T, b: &T| compare_values(&a.field(&name), &b.field(&name)))
}
