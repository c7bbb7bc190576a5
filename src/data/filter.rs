use std::borrow::Cow;
use std::collections::BTreeSet;

use super::model::{CustomerRecord, Table};

// ---------------------------------------------------------------------------
// Observed values – what the filter widgets can offer
// ---------------------------------------------------------------------------

/// The sorted set of values seen in each filterable column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub geographies: BTreeSet<String>,
    pub genders: BTreeSet<String>,
    pub active: BTreeSet<bool>,
    pub products: BTreeSet<u32>,
    /// Youngest and oldest age, `None` for an empty table.
    pub age_bounds: Option<(u32, u32)>,
}

impl FilterOptions {
    pub fn from_table(table: &Table) -> Self {
        let mut options = FilterOptions::default();
        for r in &table.records {
            options.geographies.insert(r.geography.clone());
            options.genders.insert(r.gender.clone());
            options.active.insert(r.is_active_member);
            options.products.insert(r.num_of_products);
            options.age_bounds = Some(match options.age_bounds {
                Some((lo, hi)) => (lo.min(r.age), hi.max(r.age)),
                None => (r.age, r.age),
            });
        }
        options
    }
}

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per column
// ---------------------------------------------------------------------------

/// One of the five independent row predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Geography,
    Gender,
    AgeRange,
    ActiveMember,
    Products,
}

impl Predicate {
    pub const ALL: [Predicate; 5] = [
        Predicate::Geography,
        Predicate::Gender,
        Predicate::AgeRange,
        Predicate::ActiveMember,
        Predicate::Products,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Predicate::Geography => "Geography",
            Predicate::Gender => "Gender",
            Predicate::AgeRange => "Age Range",
            Predicate::ActiveMember => "Is Active Member",
            Predicate::Products => "Number of Products",
        }
    }

    /// Whether `record` passes this predicate under `spec`.
    pub fn matches(self, spec: &FilterSpec, record: &CustomerRecord) -> bool {
        match self {
            Predicate::Geography => spec.geography.contains(&record.geography),
            Predicate::Gender => spec.gender.contains(&record.gender),
            Predicate::AgeRange => {
                let (lo, hi) = spec.age_range;
                (lo..=hi).contains(&record.age)
            }
            Predicate::ActiveMember => spec.active.contains(&record.is_active_member),
            Predicate::Products => spec.products.contains(&record.num_of_products),
        }
    }
}

/// The user's current selection.  An empty set selects nothing; it is never
/// read as "no filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub geography: BTreeSet<String>,
    pub gender: BTreeSet<String>,
    /// Inclusive on both ends.
    pub age_range: (u32, u32),
    pub active: BTreeSet<bool>,
    pub products: BTreeSet<u32>,
}

impl FilterSpec {
    pub const DEFAULT_AGE_RANGE: (u32, u32) = (18, 60);

    /// Every observed value selected, ages limited to `age_range`.
    pub fn defaults(options: &FilterOptions, age_range: (u32, u32)) -> Self {
        FilterSpec {
            geography: options.geographies.clone(),
            gender: options.genders.clone(),
            age_range,
            active: options.active.clone(),
            products: options.products.clone(),
        }
    }

    /// Every observed value selected and the full observed age range.
    pub fn select_all(options: &FilterOptions) -> Self {
        let ages = options.age_bounds.unwrap_or(Self::DEFAULT_AGE_RANGE);
        Self::defaults(options, ages)
    }

    /// Conjunction of all five predicates.
    pub fn matches(&self, record: &CustomerRecord) -> bool {
        Predicate::ALL.iter().all(|p| p.matches(self, record))
    }

    /// Re-select every observed value for one predicate.
    pub fn select_all_for(&mut self, predicate: Predicate, options: &FilterOptions) {
        match predicate {
            Predicate::Geography => self.geography = options.geographies.clone(),
            Predicate::Gender => self.gender = options.genders.clone(),
            Predicate::AgeRange => {
                self.age_range = options.age_bounds.unwrap_or(Self::DEFAULT_AGE_RANGE)
            }
            Predicate::ActiveMember => self.active = options.active.clone(),
            Predicate::Products => self.products = options.products.clone(),
        }
    }

    /// Deselect everything for one predicate.  For the age range this leaves
    /// an interval no age can fall into.
    pub fn clear(&mut self, predicate: Predicate) {
        match predicate {
            Predicate::Geography => self.geography.clear(),
            Predicate::Gender => self.gender.clear(),
            Predicate::AgeRange => self.age_range = (1, 0),
            Predicate::ActiveMember => self.active.clear(),
            Predicate::Products => self.products.clear(),
        }
    }
}

/// Flip membership of `value` in a selection set.
pub fn toggle<T: Ord + Clone>(selected: &mut BTreeSet<T>, value: &T) {
    if !selected.remove(value) {
        selected.insert(value.clone());
    }
}

/// Return indices of records that pass every predicate.
pub fn filtered_indices(table: &Table, spec: &FilterSpec) -> Vec<usize> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| spec.matches(r))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Subset – a filtered view over the table
// ---------------------------------------------------------------------------

/// Rows of a [`Table`] selected by index.  Never copies records; the index
/// list is either owned or borrowed from cached state.
#[derive(Debug, Clone)]
pub struct Subset<'a> {
    table: &'a Table,
    indices: Cow<'a, [usize]>,
}

impl<'a> Subset<'a> {
    pub fn new(table: &'a Table, indices: impl Into<Cow<'a, [usize]>>) -> Self {
        Subset {
            table,
            indices: indices.into(),
        }
    }

    pub fn apply(table: &'a Table, spec: &FilterSpec) -> Self {
        Self::new(table, filtered_indices(table, spec))
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &'a CustomerRecord> + '_ {
        let table = self.table;
        self.indices.iter().map(move |&i| &table.records[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures;

    fn setup() -> (Table, FilterOptions) {
        let table = fixtures::sample_table();
        let options = FilterOptions::from_table(&table);
        (table, options)
    }

    #[test]
    fn options_collect_observed_values() {
        let (_, options) = setup();
        assert_eq!(options.geographies.len(), 3);
        assert_eq!(options.genders.len(), 2);
        assert_eq!(options.active, BTreeSet::from([false, true]));
        assert_eq!(options.products, BTreeSet::from([1, 2, 3, 4]));
        assert_eq!(options.age_bounds, Some((19, 62)));
    }

    #[test]
    fn select_all_keeps_every_row() {
        let (table, options) = setup();
        let spec = FilterSpec::select_all(&options);
        assert_eq!(filtered_indices(&table, &spec).len(), table.len());
    }

    #[test]
    fn defaults_limit_age_to_18_through_60() {
        let (table, options) = setup();
        let spec = FilterSpec::defaults(&options, FilterSpec::DEFAULT_AGE_RANGE);
        let subset = Subset::apply(&table, &spec);
        assert_eq!(subset.len(), table.len() - 1);
        assert!(subset.records().all(|r| r.age <= 60));
    }

    #[test]
    fn empty_selection_yields_no_rows() {
        let (table, options) = setup();
        for predicate in Predicate::ALL {
            let mut spec = FilterSpec::select_all(&options);
            spec.clear(predicate);
            assert!(
                filtered_indices(&table, &spec).is_empty(),
                "{} cleared should select nothing",
                predicate.label()
            );
        }
    }

    #[test]
    fn predicate_order_does_not_matter() {
        let (table, options) = setup();
        let mut spec = FilterSpec::select_all(&options);
        spec.geography.remove("Spain");
        spec.age_range = (20, 55);
        spec.products.remove(&3);

        let expected = filtered_indices(&table, &spec);
        let orders = [
            [0, 1, 2, 3, 4],
            [4, 3, 2, 1, 0],
            [2, 0, 4, 1, 3],
            [1, 3, 0, 4, 2],
        ];
        for order in orders {
            let got: Vec<usize> = table
                .records
                .iter()
                .enumerate()
                .filter(|(_, r)| order.iter().all(|&p| Predicate::ALL[p].matches(&spec, r)))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(got, expected);
        }
        assert_eq!(expected, vec![0, 2, 6, 7]);
    }

    #[test]
    fn age_range_is_inclusive() {
        let (table, options) = setup();
        let mut spec = FilterSpec::select_all(&options);
        spec.age_range = (25, 42);
        let ages: Vec<u32> = Subset::apply(&table, &spec).records().map(|r| r.age).collect();
        assert_eq!(ages, vec![42, 25, 30, 36]);
    }

    #[test]
    fn toggle_and_reselect() {
        let (table, options) = setup();
        let mut spec = FilterSpec::select_all(&options);
        toggle(&mut spec.active, &false);
        assert_eq!(filtered_indices(&table, &spec), vec![1, 4, 5, 6]);
        toggle(&mut spec.active, &false);
        assert_eq!(filtered_indices(&table, &spec).len(), table.len());

        spec.clear(Predicate::Gender);
        spec.select_all_for(Predicate::Gender, &options);
        assert_eq!(spec, FilterSpec::select_all(&options));
    }

    #[test]
    fn empty_table_yields_empty_subset() {
        let table = Table::new(fixtures::required_schema(), vec![]);
        let options = FilterOptions::from_table(&table);
        assert_eq!(options.age_bounds, None);
        let spec = FilterSpec::select_all(&options);
        assert!(Subset::apply(&table, &spec).is_empty());
    }
}
