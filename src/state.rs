use std::path::PathBuf;
use std::sync::Arc;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::error::ExportError;
use crate::data::export::to_csv_bytes;
use crate::data::filter::{filtered_indices, FilterOptions, FilterSpec, Predicate, Subset};
use crate::data::loader::DatasetCache;
use crate::data::model::Table;
use crate::data::stats::{DashboardReport, Insights};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Load-once store for the current data file.
    pub cache: DatasetCache,

    /// Loaded table with derived columns (None until a load succeeds).
    pub table: Option<Arc<Table>>,

    /// Values the filter widgets offer.
    pub options: FilterOptions,

    /// Current filter selections.
    pub filters: FilterSpec,

    /// Indices of records passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Aggregates over the visible records (cached).
    pub report: Option<DashboardReport>,
    pub insights: Option<Insights>,

    /// Bar colours for the geography chart.
    pub geography_colors: ColorMap,

    /// Error message shown in the UI.
    pub status_message: Option<String>,

    /// Informational message, e.g. where an export was written.
    pub notice: Option<String>,
}

impl AppState {
    /// Build the state and load the configured dataset.
    pub fn new(config: DashboardConfig) -> Self {
        let cache = DatasetCache::new(config.data_path.clone());
        let mut state = Self {
            config,
            cache,
            table: None,
            options: FilterOptions::default(),
            filters: FilterSpec::default(),
            visible_indices: Vec::new(),
            report: None,
            insights: None,
            geography_colors: ColorMap::new(Vec::<String>::new()),
            status_message: None,
            notice: None,
        };
        state.load();
        state
    }

    /// Fetch the table from the cache; reads the file only the first time.
    pub fn load(&mut self) {
        match self.cache.get_or_load() {
            Ok(table) => self.set_table(table),
            Err(e) => {
                log::error!("Failed to load {}: {e}", self.cache.path().display());
                self.clear_table();
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Discard the cached table and read the file again.
    pub fn reload(&mut self) {
        let path = self.cache.path().to_path_buf();
        self.open(path);
    }

    /// Switch to another data file.
    pub fn open(&mut self, path: PathBuf) {
        self.cache = DatasetCache::new(path);
        self.load();
    }

    /// Ingest a newly loaded table and reset filters to their defaults.
    pub fn set_table(&mut self, table: Arc<Table>) {
        self.options = FilterOptions::from_table(&table);
        self.filters = FilterSpec::defaults(&self.options, self.config.default_age_range);
        self.geography_colors = ColorMap::new(self.options.geographies.iter().cloned());
        self.table = Some(table);
        self.status_message = None;
        self.refilter();
    }

    fn clear_table(&mut self) {
        self.table = None;
        self.options = FilterOptions::default();
        self.filters = FilterSpec::default();
        self.visible_indices.clear();
        self.report = None;
        self.insights = None;
    }

    /// Re-run filtering and aggregation after a filter change.
    pub fn refilter(&mut self) {
        let Some(table) = &self.table else {
            return;
        };
        let indices = filtered_indices(table, &self.filters);
        let subset = Subset::new(table, indices.as_slice());
        let report = DashboardReport::compute(&subset, self.config.age_bins);
        self.insights = Some(Insights::from_report(&subset, &report));
        self.report = Some(report);
        self.visible_indices = indices;
    }

    /// The visible records as a view over the table.
    pub fn subset(&self) -> Option<Subset<'_>> {
        self.table
            .as_deref()
            .map(|t| Subset::new(t, self.visible_indices.as_slice()))
    }

    /// Apply an edit to the filters, refiltering only if something changed.
    pub fn update_filters(&mut self, edit: impl FnOnce(&mut FilterSpec)) {
        let before = self.filters.clone();
        edit(&mut self.filters);
        if self.filters != before {
            self.refilter();
        }
    }

    /// Select all values for one predicate.
    pub fn select_all(&mut self, predicate: Predicate) {
        let options = self.options.clone();
        self.update_filters(|f| f.select_all_for(predicate, &options));
    }

    /// Deselect all values for one predicate.
    pub fn select_none(&mut self, predicate: Predicate) {
        self.update_filters(|f| f.clear(predicate));
    }

    /// CSV bytes of the visible records, `None` without a table.
    pub fn export_csv(&self) -> Option<Result<Vec<u8>, ExportError>> {
        self.subset().map(|s| to_csv_bytes(&s))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::filter::toggle;

    const CSV: &str = "Geography,Gender,Age,Balance,NumOfProducts,IsActiveMember,Exited\n\
                       France,Female,42,0.0,1,1,1\n\
                       Spain,Male,30,120000.0,2,0,0\n\
                       Germany,Male,65,90000.0,1,0,1\n\
                       France,Male,18,500.0,3,1,0\n";

    fn state_for(path: &Path) -> AppState {
        AppState::new(DashboardConfig {
            data_path: path.to_path_buf(),
            ..DashboardConfig::default()
        })
    }

    #[test]
    fn loads_with_default_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn.csv");
        std::fs::write(&path, CSV).unwrap();

        let state = state_for(&path);
        assert!(state.status_message.is_none());
        assert_eq!(state.filters.age_range, (18, 60));
        assert_eq!(state.visible_indices, vec![0, 1, 3]);

        let report = state.report.as_ref().unwrap();
        assert_eq!(report.kpis.total, 3);
        assert_eq!(report.kpis.churned, 1);
    }

    #[test]
    fn filter_edits_recompute_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn.csv");
        std::fs::write(&path, CSV).unwrap();

        let mut state = state_for(&path);
        state.update_filters(|f| toggle(&mut f.gender, &"Male".to_string()));
        assert_eq!(state.visible_indices, vec![0]);
        assert_eq!(state.report.as_ref().unwrap().kpis.churn_rate, 100.0);

        state.select_none(Predicate::Geography);
        assert!(state.visible_indices.is_empty());
        assert_eq!(state.report.as_ref().unwrap().kpis.churn_rate, 0.0);

        state.select_all(Predicate::Geography);
        state.select_all(Predicate::Gender);
        state.select_all(Predicate::AgeRange);
        assert_eq!(state.visible_indices.len(), 4);

        let bytes = state.export_csv().unwrap().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().lines().count(), 5);
    }

    #[test]
    fn subset_views_the_cached_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn.csv");
        std::fs::write(&path, CSV).unwrap();

        let state = state_for(&path);
        let subset = state.subset().unwrap();
        assert_eq!(subset.indices(), [0, 1, 3]);
        assert!(std::ptr::eq(subset.indices(), state.visible_indices.as_slice()));
        assert!(std::ptr::eq(subset.table(), state.table.as_deref().unwrap()));
    }

    #[test]
    fn missing_file_reports_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_for(&dir.path().join("Churn_Modelling.csv"));

        assert!(state.table.is_none());
        assert!(state.report.is_none());
        assert!(state.export_csv().is_none());
        let msg = state.status_message.unwrap();
        assert!(msg.contains("not found"), "{msg}");
    }

    #[test]
    fn reload_picks_up_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn.csv");
        std::fs::write(&path, CSV).unwrap();
        let mut state = state_for(&path);

        std::fs::write(&path, &CSV[..CSV.len() - "France,Male,18,500.0,3,1,0\n".len()]).unwrap();
        state.load();
        assert_eq!(state.table.as_ref().unwrap().len(), 4, "cached table is reused");

        state.reload();
        assert_eq!(state.table.as_ref().unwrap().len(), 3);
    }
}
