//! Application state: loading status of both sheets and the derived data.

use std::sync::Arc;
use std::time::Instant;

use fm_data::{
    Dataset, DatasetBuilder, FlowTotals, Location, MissingLocationPolicy, RawFlow, RawLocation,
    ValidationPolicy, calc_flow_totals,
};
use fm_layers::{FlowMapColors, LayersData, LayersOptions, prepare_layers_data_with};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::report::duplicate_flows_message;
use crate::throttle::{Throttle, ThrottleConfig};
use crate::viewport::{ViewportProps, viewport_for_locations};
use crate::worker::{LayersRequest, LayersWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStatus {
    Loading,
    Done,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadingState<T> {
    pub status: LoadingStatus,
    pub data: Option<T>,
}

impl<T> LoadingState<T> {
    pub fn loading() -> Self {
        Self {
            status: LoadingStatus::Loading,
            data: None,
        }
    }

    pub fn done(data: T) -> Self {
        Self {
            status: LoadingStatus::Done,
            data: Some(data),
        }
    }

    pub fn error() -> Self {
        Self {
            status: LoadingStatus::Error,
            data: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == LoadingStatus::Done
    }
}

/// Holds the inputs and the derived layers data of one map.
///
/// Created once at startup; `reset` returns it to the initial state. Every
/// input change bumps a generation counter so late worker results for an
/// older state are discarded.
pub struct AppStore {
    config: Config,
    colors: Arc<FlowMapColors>,
    options: LayersOptions,
    missing_location: MissingLocationPolicy,

    locations: Option<LoadingState<Arc<[Location]>>>,
    flow_rows: Option<LoadingState<Arc<[RawFlow]>>>,
    dataset: Option<Arc<Dataset>>,
    layers_data: Option<LoadingState<Arc<LayersData>>>,
    flow_totals: Option<LoadingState<FlowTotals>>,
    duplicates_message: Option<String>,

    generation: u64,
    requested: Option<u64>,
    throttle: Throttle,
}

impl AppStore {
    pub fn new(config: Config, colors: FlowMapColors) -> Self {
        Self {
            config,
            colors: Arc::new(colors),
            options: LayersOptions::default(),
            missing_location: MissingLocationPolicy::default(),
            locations: None,
            flow_rows: None,
            dataset: None,
            layers_data: None,
            flow_totals: None,
            duplicates_message: None,
            generation: 0,
            requested: None,
            throttle: Throttle::default(),
        }
    }

    pub fn with_options(mut self, options: LayersOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_missing_location(mut self, policy: MissingLocationPolicy) -> Self {
        self.missing_location = policy;
        self
    }

    pub fn with_throttle(mut self, config: ThrottleConfig) -> Self {
        self.throttle = Throttle::new(config);
        self
    }

    /// Back to the state right after `new`. Config and colors are kept.
    pub fn reset(&mut self) {
        self.locations = None;
        self.flow_rows = None;
        self.dataset = None;
        self.layers_data = None;
        self.flow_totals = None;
        self.duplicates_message = None;
        self.requested = None;
        self.throttle.cancel();
        self.bump();
        tracing::debug!(generation = self.generation, "store reset");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn colors(&self) -> &FlowMapColors {
        &self.colors
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn locations(&self) -> Option<&LoadingState<Arc<[Location]>>> {
        self.locations.as_ref()
    }

    pub fn flows_status(&self) -> Option<LoadingStatus> {
        self.flow_rows.as_ref().map(|s| s.status)
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    pub fn layers_data(&self) -> Option<&LoadingState<Arc<LayersData>>> {
        self.layers_data.as_ref()
    }

    pub fn flow_totals(&self) -> Option<&LoadingState<FlowTotals>> {
        self.flow_totals.as_ref()
    }

    /// Warning about summed duplicate flows of the current dataset.
    pub fn duplicates_message(&self) -> Option<&str> {
        self.duplicates_message.as_deref()
    }

    /// Mark the locations sheet as being fetched.
    pub fn begin_loading(&mut self) {
        self.locations = Some(LoadingState::loading());
        self.flow_rows = Some(LoadingState::loading());
        self.layers_data = Some(LoadingState::loading());
        self.flow_totals = Some(LoadingState::loading());
        self.bump();
    }

    /// Parse the locations sheet. A malformed row puts locations into the
    /// error state and the error is returned.
    pub fn load_locations(&mut self, rows: &[RawLocation]) -> AppResult<()> {
        let parsed: Result<Vec<Location>, _> = rows
            .iter()
            .enumerate()
            .map(|(row, raw)| Location::from_raw(raw, row))
            .collect();
        match parsed {
            Ok(locations) => {
                tracing::debug!(count = locations.len(), "locations loaded");
                self.locations = Some(LoadingState::done(locations.into()));
                self.inputs_changed();
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load locations");
                self.locations_failed();
                Err(e.into())
            }
        }
    }

    /// The locations sheet could not be fetched.
    pub fn locations_failed(&mut self) {
        self.locations = Some(LoadingState::error());
        self.inputs_changed();
    }

    pub fn load_flows(&mut self, rows: Vec<RawFlow>) {
        tracing::debug!(count = rows.len(), "flows loaded");
        self.flow_rows = Some(LoadingState::done(rows.into()));
        self.inputs_changed();
    }

    /// The flows sheet could not be fetched.
    pub fn flows_failed(&mut self) {
        self.flow_rows = Some(LoadingState::error());
        self.inputs_changed();
    }

    /// Switch palettes. Layers data is stale until the next update.
    pub fn set_colors(&mut self, colors: FlowMapColors) {
        self.colors = Arc::new(colors);
        self.bump();
        if self.dataset.is_some() {
            self.layers_data = Some(LoadingState::loading());
        }
    }

    /// Rebuild layers data on the calling thread.
    pub fn update_layers_data(&mut self) {
        let generation = self.generation;
        self.layers_data = Some(match self.input_state() {
            Some(LoadingStatus::Done) => match &self.dataset {
                Some(dataset) => match prepare_layers_data_with(
                    dataset.locations(),
                    dataset.flows(),
                    &self.colors,
                    &self.options,
                ) {
                    Ok(data) => LoadingState::done(Arc::new(data)),
                    Err(e) => {
                        tracing::error!(generation, error = %e, "failed to prepare layers data");
                        LoadingState::error()
                    }
                },
                None => LoadingState::error(),
            },
            Some(LoadingStatus::Error) => LoadingState::error(),
            Some(LoadingStatus::Loading) | None => LoadingState::loading(),
        });
    }

    pub fn update_flow_totals(&mut self) {
        self.flow_totals = Some(match (self.input_state(), &self.dataset) {
            (Some(LoadingStatus::Done), Some(dataset)) => {
                LoadingState::done(calc_flow_totals(dataset.flows()))
            }
            (Some(LoadingStatus::Error), _) | (Some(LoadingStatus::Done), None) => {
                LoadingState::error()
            }
            _ => LoadingState::loading(),
        });
    }

    /// Viewport fitted to the loaded locations.
    pub fn viewport_for_locations(&self, dimensions: (u32, u32)) -> Option<ViewportProps> {
        let locations = self.locations.as_ref()?.data.as_ref()?;
        viewport_for_locations(&locations[..], dimensions)
    }

    /// Send the current state to the worker. Returns the generation requested.
    pub fn request_layers_data(&mut self, worker: &LayersWorker) -> AppResult<u64> {
        let dataset = self
            .dataset
            .clone()
            .ok_or(AppError::NotReady { what: "dataset" })?;
        worker.submit(LayersRequest {
            generation: self.generation,
            dataset,
            colors: Arc::clone(&self.colors),
            options: self.options,
        })?;
        self.requested = Some(self.generation);
        self.layers_data = Some(LoadingState::loading());
        Ok(self.generation)
    }

    /// Drain finished worker results. Results from older generations are
    /// discarded. Returns true when layers data was replaced.
    pub fn poll_layers_data(&mut self, worker: &LayersWorker) -> AppResult<bool> {
        let mut committed = false;
        while let Some(response) = worker.try_recv()? {
            if response.generation != self.generation {
                tracing::debug!(
                    stale = response.generation,
                    current = self.generation,
                    "discarding stale layers data"
                );
                continue;
            }
            self.requested = None;
            self.layers_data = Some(match response.result {
                Ok(data) => LoadingState::done(data),
                Err(e) => {
                    tracing::error!(error = %e, "failed to prepare layers data");
                    LoadingState::error()
                }
            });
            committed = true;
        }
        Ok(committed)
    }

    /// True while a request for the current generation is outstanding.
    pub fn is_computing(&self) -> bool {
        self.requested == Some(self.generation)
    }

    /// Report a burst-prone state change (pan, zoom, filter). Requests new
    /// layers data at most once per throttle interval.
    pub fn notify_changed(&mut self, now: Instant, worker: &LayersWorker) -> AppResult<bool> {
        self.bump();
        if self.throttle.call(now) {
            self.request_if_ready(worker)
        } else {
            Ok(false)
        }
    }

    /// Fire a due trailing request and collect results. Call once per frame.
    pub fn tick(&mut self, now: Instant, worker: &LayersWorker) -> AppResult<bool> {
        if self.throttle.poll(now) {
            self.request_if_ready(worker)?;
        }
        self.poll_layers_data(worker)
    }

    fn request_if_ready(&mut self, worker: &LayersWorker) -> AppResult<bool> {
        if self.dataset.is_none() {
            return Ok(false);
        }
        self.request_layers_data(worker)?;
        Ok(true)
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    /// Combined status of both sheets: error wins, then loading.
    fn input_state(&self) -> Option<LoadingStatus> {
        let locations = self.locations.as_ref()?.status;
        let flows = self.flow_rows.as_ref()?.status;
        Some(match (locations, flows) {
            (LoadingStatus::Error, _) | (_, LoadingStatus::Error) => LoadingStatus::Error,
            (LoadingStatus::Done, LoadingStatus::Done) => LoadingStatus::Done,
            _ => LoadingStatus::Loading,
        })
    }

    fn inputs_changed(&mut self) {
        self.bump();
        self.dataset = None;
        self.duplicates_message = None;

        if self.input_state() == Some(LoadingStatus::Done) {
            if let Err(e) = self.rebuild_dataset() {
                tracing::error!(error = %e, "failed to build dataset");
            }
        }
        self.update_flow_totals();
        self.update_layers_data();
    }

    fn rebuild_dataset(&mut self) -> AppResult<()> {
        let (Some(locations), Some(flows)) = (
            self.locations.as_ref().and_then(|s| s.data.clone()),
            self.flow_rows.as_ref().and_then(|s| s.data.clone()),
        ) else {
            return Err(AppError::NotReady { what: "sheets" });
        };

        let mut builder = DatasetBuilder::with_policy(ValidationPolicy {
            missing_location: self.missing_location,
            report_duplicates: !self.config.ignore_errors(),
        });
        for location in locations.iter() {
            builder.push_location(location.clone());
        }
        builder.add_raw_flows(&flows);
        let dataset = builder.build()?;

        self.duplicates_message = duplicate_flows_message(dataset.duplicates(), &self.config);
        if let Some(message) = &self.duplicates_message {
            tracing::warn!("{message}");
        }
        self.dataset = Some(Arc::new(dataset));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigProp;

    fn location_rows() -> Vec<RawLocation> {
        vec![
            RawLocation::new("A", "Alpha", "0", "0"),
            RawLocation::new("B", "Beta", "10", "5"),
            RawLocation::new("C", "Gamma", "-3", "2"),
        ]
    }

    fn flow_rows() -> Vec<RawFlow> {
        vec![
            RawFlow::new("A", "B", "3"),
            RawFlow::new("A", "B", "4"),
            RawFlow::new("B", "C", "2"),
            RawFlow::new("C", "C", "5"),
        ]
    }

    fn loaded_store(config: Config) -> AppStore {
        let mut store = AppStore::new(config, FlowMapColors::default());
        store.begin_loading();
        store.load_locations(&location_rows()).unwrap();
        store.load_flows(flow_rows());
        store
    }

    #[test]
    fn initial_state_is_empty() {
        let store = AppStore::new(Config::default(), FlowMapColors::default());
        assert!(store.layers_data().is_none());
        assert!(store.flow_totals().is_none());
        assert!(store.viewport_for_locations((800, 600)).is_none());
    }

    #[test]
    fn waits_for_both_sheets() {
        let mut store = AppStore::new(Config::default(), FlowMapColors::default());
        store.begin_loading();
        store.load_locations(&location_rows()).unwrap();
        assert_eq!(
            store.layers_data().map(|s| s.status),
            Some(LoadingStatus::Loading)
        );
        assert!(store.viewport_for_locations((800, 600)).is_some());

        store.load_flows(flow_rows());
        let layers = store.layers_data().unwrap();
        assert!(layers.is_done());
        assert_eq!(layers.data.as_ref().unwrap().line_attributes().length(), 2);
    }

    #[test]
    fn flow_totals_follow_dataset() {
        let store = loaded_store(Config::default());
        let totals = store.flow_totals().unwrap().data.unwrap();
        assert_eq!(totals.outgoing_count, 9.0);
        assert_eq!(totals.internal_count, 5.0);
    }

    #[test]
    fn duplicates_are_reported_unless_ignored() {
        let store = loaded_store(Config::default());
        assert!(store.duplicates_message().unwrap().contains("A → B"));

        let quiet = loaded_store(Config::from_props(&[ConfigProp::new("ignore.errors", "yes")]));
        assert_eq!(quiet.duplicates_message(), None);
        assert_eq!(quiet.dataset().unwrap().flows().len(), 3);
    }

    #[test]
    fn failed_sheet_fails_layers() {
        let mut store = AppStore::new(Config::default(), FlowMapColors::default());
        store.begin_loading();
        store.flows_failed();
        store.load_locations(&location_rows()).unwrap();
        assert_eq!(
            store.layers_data().map(|s| s.status),
            Some(LoadingStatus::Error)
        );
        assert_eq!(
            store.flow_totals().map(|s| s.status),
            Some(LoadingStatus::Error)
        );
    }

    #[test]
    fn malformed_location_row_is_an_error() {
        let mut store = AppStore::new(Config::default(), FlowMapColors::default());
        let err = store
            .load_locations(&[RawLocation::new("A", "A", "x", "0")])
            .unwrap_err();
        assert!(matches!(err, AppError::Data(_)));
        assert_eq!(
            store.locations().map(|s| s.status),
            Some(LoadingStatus::Error)
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = loaded_store(Config::default());
        let before = store.generation();
        store.reset();
        assert!(store.generation() > before);
        assert!(store.dataset().is_none());
        assert!(store.layers_data().is_none());
        assert!(store.duplicates_message().is_none());
    }

    #[test]
    fn set_colors_marks_layers_stale() {
        let mut store = loaded_store(Config::default());
        store.set_colors(FlowMapColors::default_diff());
        assert_eq!(
            store.layers_data().map(|s| s.status),
            Some(LoadingStatus::Loading)
        );
        store.update_layers_data();
        assert!(store.layers_data().unwrap().is_done());
        assert!(store.colors().is_diff());
    }
}
