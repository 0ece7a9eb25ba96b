//! In-memory projections of result collections.
//!
//! A [`RecordTable`] is what a page renders: ordered rows with a selection
//! flag each. Tables are disposable; the persisted cache is the durable copy.

use pacstrack_model::{Category, FieldLookup, Record};
use parking_lot::RwLock;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: Cow<'static, str>,
    pub order: SortOrder,
}

/// Multi-key row ordering, applied after every insertion. Equal rows keep
/// their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    /// Keep rows in arrival order.
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn ascending(fields: &[&'static str]) -> Self {
        fields
            .iter()
            .fold(Self::default(), |spec, field| spec.then(*field, SortOrder::Ascending))
    }

    pub fn then(mut self, field: impl Into<Cow<'static, str>>, order: SortOrder) -> Self {
        self.keys.push(SortKey {
            field: field.into(),
            order,
        });
        self
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn compare<T: FieldLookup>(&self, a: &T, b: &T) -> Ordering {
        for key in &self.keys {
            let ordering = compare_values(a.field(&key.field), b.field(&key.field));
            let ordering = match key.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Missing and null sort first, then booleans, numbers, strings, and
/// composite values.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (
            Some(x @ (Value::Array(_) | Value::Object(_))),
            Some(y @ (Value::Array(_) | Value::Object(_))),
        ) => x.to_string().cmp(&y.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row<T> {
    pub item: T,
    pub selected: bool,
}

/// One live view.
#[derive(Debug, Clone)]
pub struct RecordTable<T> {
    name: String,
    rows: Vec<Row<T>>,
    sort: SortSpec,
}

impl<T: FieldLookup> RecordTable<T> {
    pub fn new(name: impl Into<String>, sort: SortSpec) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            sort,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Add rows unselected and re-sort the whole table.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        self.rows
            .extend(items.into_iter().map(|item| Row { item, selected: false }));
        let sort = &self.sort;
        self.rows.sort_by(|a, b| sort.compare(&a.item, &b.item));
    }

    /// Rebuild from scratch. Drops every selection.
    pub fn replace(&mut self, items: impl IntoIterator<Item = T>) {
        self.clear();
        self.extend(items);
    }

    pub fn rows(&self) -> &[Row<T>] {
        &self.rows
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.rows.iter().map(|row| &row.item)
    }

    pub fn get(&self, position: usize) -> Option<&T> {
        self.rows.get(position).map(|row| &row.item)
    }

    /// Returns false when `position` is out of range.
    pub fn select(&mut self, position: usize) -> bool {
        match self.rows.get_mut(position) {
            Some(row) => {
                row.selected = true;
                true
            }
            None => false,
        }
    }

    pub fn deselect(&mut self, position: usize) {
        if let Some(row) = self.rows.get_mut(position) {
            row.selected = false;
        }
    }

    pub fn deselect_all(&mut self) {
        for row in &mut self.rows {
            row.selected = false;
        }
    }

    pub fn select_all(&mut self) {
        for row in &mut self.rows {
            row.selected = true;
        }
    }

    pub fn is_selected(&self, position: usize) -> bool {
        self.rows.get(position).is_some_and(|row| row.selected)
    }

    pub fn selected_positions(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(position, row)| row.selected.then_some(position))
            .collect()
    }

    pub fn selected_items(&self) -> impl Iterator<Item = &T> {
        self.rows.iter().filter(|row| row.selected).map(|row| &row.item)
    }
}

/// The views one page repopulates per job, keyed by result category, plus
/// the count badge shown next to each.
#[derive(Debug, Clone, Default)]
pub struct CategoryViews {
    views: BTreeMap<Category, RecordTable<Record>>,
    badges: BTreeMap<Category, usize>,
}

pub type SharedViews = Arc<RwLock<CategoryViews>>;

impl CategoryViews {
    pub fn new(bindings: impl IntoIterator<Item = (Category, RecordTable<Record>)>) -> Self {
        let views: BTreeMap<_, _> = bindings.into_iter().collect();
        let badges = views.keys().map(|category| (*category, 0)).collect();
        Self { views, badges }
    }

    pub fn shared(self) -> SharedViews {
        Arc::new(RwLock::new(self))
    }

    pub fn categories(&self) -> Vec<Category> {
        self.views.keys().copied().collect()
    }

    pub fn view(&self, category: Category) -> Option<&RecordTable<Record>> {
        self.views.get(&category)
    }

    pub fn view_mut(&mut self, category: Category) -> Option<&mut RecordTable<Record>> {
        self.views.get_mut(&category)
    }

    pub fn badge(&self, category: Category) -> usize {
        self.badges.get(&category).copied().unwrap_or(0)
    }

    pub(crate) fn set_badge(&mut self, category: Category, count: usize) {
        if self.views.contains_key(&category) {
            self.badges.insert(category, count);
        }
    }

    /// Empty every view and zero every badge.
    pub fn clear_all(&mut self) {
        for view in self.views.values_mut() {
            view.clear();
        }
        for badge in self.badges.values_mut() {
            *badge = 0;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.views.values().all(RecordTable::is_empty)
    }

    pub fn row_count(&self, category: Category) -> usize {
        self.view(category).map_or(0, RecordTable::len)
    }
}
