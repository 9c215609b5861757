//! The dashboard: configuration, session, loaded run and persistence.

use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::data::catalog::{available_replicates, random_other_replicate};
use crate::data::loader::{load_comparison, load_models, ComparisonRun, LoadOptions, SimulationData};
use crate::data::DataLayout;
use crate::logging::{debug, info, log_frame, obj, v_str, warn, Domain};
use crate::network::Edge;
use crate::params::Parameters;
use crate::presets;
use crate::session::{Effect, Session};
use crate::storage::SessionStore;

pub type SharedApp = Arc<Mutex<App>>;

/// Outcome of one playback step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Moved forward one timestep; sleep this long before the next.
    Advanced(Duration),
    Finished,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkFrame {
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub timestep: usize,
    pub playing: bool,
    pub metrics: BTreeMap<String, f64>,
    pub network: Option<NetworkFrame>,
}

/// A pending run load, detached from the app so it can run off the lock.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    layout: DataLayout,
    params: Parameters,
    opts: LoadOptions,
}

impl LoadRequest {
    pub fn load(&self) -> SimulationData {
        load_models(&self.layout, &self.params, &self.opts)
    }
}

pub struct App {
    pub config: Config,
    pub layout: DataLayout,
    pub session: Session,
    pub data: SimulationData,
    store: Option<SessionStore>,
    comparison: Option<Vec<ComparisonRun>>,
    play_generation: u64,
}

impl App {
    pub fn new(config: Config, store: Option<SessionStore>) -> Self {
        let restored = store.as_ref().and_then(|s| match s.load() {
            Ok(session) => session,
            Err(err) => {
                warn(Domain::Session, "restore_failed", obj(&[("msg", v_str(&err.to_string()))]));
                None
            }
        });
        let session = restored.unwrap_or_else(|| Session::with_speed(config.default_speed));
        let layout = DataLayout::new(config.data_dir.clone());
        let mut app = Self {
            config,
            layout,
            session,
            data: SimulationData::default(),
            store,
            comparison: None,
            play_generation: 0,
        };
        let t = app.session.global_time;
        app.reload_data();
        app.session.global_time = t.min(app.last_timestep());
        app
    }

    pub fn shared(self) -> SharedApp {
        Arc::new(Mutex::new(self))
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            duration: self.config.duration,
            roi_window: self.config.roi_window,
            roi_look_back: self.config.roi_look_back,
            with_networks: true,
        }
    }

    pub fn last_timestep(&self) -> usize {
        self.config.last_timestep()
    }

    pub fn reload_data(&mut self) {
        self.session.data_load_complete = false;
        let request = self.load_request();
        let data = request.load();
        self.install(&request, data);
    }

    fn load_request(&self) -> LoadRequest {
        LoadRequest {
            layout: self.layout.clone(),
            params: self.session.params.clone(),
            opts: self.load_options(),
        }
    }

    /// Apply an effect, loading the new run in place when it asks for one.
    pub fn apply(&mut self, effect: Effect) {
        if let Some(request) = self.settle(effect) {
            let data = request.load();
            self.install(&request, data);
        }
    }

    /// Settle everything but the load itself; a reload is handed back to the caller.
    ///
    /// The playback generation only moves when the effect stopped playback, so a
    /// control that changed nothing leaves a running loop alone.
    pub fn settle(&mut self, effect: Effect) -> Option<LoadRequest> {
        if effect == Effect::Reload || !self.session.playing {
            self.play_generation += 1;
        }
        match effect {
            Effect::Reload => {
                self.session.data_load_complete = false;
                Some(self.load_request())
            }
            Effect::None => {
                self.persist();
                None
            }
        }
    }

    /// Install loaded data unless the session has since moved to another run.
    pub fn install(&mut self, request: &LoadRequest, data: SimulationData) -> bool {
        if request.params != self.session.params {
            return false;
        }
        self.data = data;
        self.session.data_load_complete = true;
        self.persist();
        true
    }

    pub fn persist(&mut self) {
        if let Some(store) = self.store.as_mut() {
            if let Err(err) = store.save(&self.session) {
                warn(Domain::Session, "persist_failed", obj(&[("msg", v_str(&err.to_string()))]));
            }
        }
    }

    /// Toggle playback; returns the generation a new playback loop must carry.
    pub fn toggle_play(&mut self) -> Result<Option<u64>, String> {
        let effect = self
            .session
            .handle_play_click(self.data.is_loaded(), self.last_timestep())?;
        self.play_generation += 1;
        self.apply(effect);
        Ok(self.session.playing.then_some(self.play_generation))
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.play_generation == generation
    }

    pub fn step(&mut self) -> Step {
        if !self.session.playing || self.session.global_time >= self.last_timestep() {
            self.session.playing = false;
            return Step::Finished;
        }
        self.session.global_time += 1;
        let t = self.session.global_time;
        if let Some(g) = self.data.network_at(t) {
            log_frame(t, g.node_count(), g.edge_count());
        }
        if t >= self.last_timestep() {
            self.session.playing = false;
            self.persist();
            info(Domain::Playback, "finished", obj(&[("timestep", json!(t))]));
            return Step::Finished;
        }
        Step::Advanced(self.session.frame_interval(self.config.frame_ms))
    }

    pub fn random_replicate(&mut self) -> Effect {
        let available = available_replicates(&self.layout, &self.session.params);
        match random_other_replicate(&available, self.session.params.replicate) {
            Some(r) => self.session.set_replicate(r),
            None => Effect::None,
        }
    }

    pub fn replicates(&self) -> Vec<u32> {
        available_replicates(&self.layout, &self.session.params)
    }

    pub fn comparison(&mut self) -> &[ComparisonRun] {
        if self.comparison.is_none() {
            let runs = load_comparison(&self.layout, &presets::all(), &self.load_options());
            self.comparison = Some(runs);
        }
        self.comparison.as_deref().unwrap_or(&[])
    }

    pub fn cached_comparison(&self) -> Option<&[ComparisonRun]> {
        self.comparison.as_deref()
    }

    pub fn set_comparison(&mut self, runs: Vec<ComparisonRun>) {
        self.comparison = Some(runs);
    }

    pub fn frame(&self, timestep: usize) -> Frame {
        let t = timestep.min(self.last_timestep());
        let metrics = self
            .data
            .model_vars
            .as_ref()
            .map(|table| {
                table
                    .columns()
                    .iter()
                    .filter_map(|c| {
                        let v = *table.column(c)?.get(t)?;
                        Some((c.clone(), v))
                    })
                    .collect()
            })
            .unwrap_or_default();
        let network = self.data.network_at(t).map(|g| NetworkFrame {
            nodes: g.nodes().cloned().collect(),
            edges: g.edges().collect(),
        });
        Frame {
            timestep: t,
            playing: self.session.playing,
            metrics,
            network,
        }
    }
}

/// Finish a reload handed back by [`App::settle`] on the blocking pool.
pub async fn apply_shared(app: &SharedApp, request: Option<LoadRequest>) {
    let Some(request) = request else { return };
    let params = request.params.clone();
    let (request, data) = match tokio::task::spawn_blocking(move || {
        let data = request.load();
        (request, data)
    })
    .await
    {
        Ok(loaded) => loaded,
        Err(err) => {
            warn(
                Domain::Data,
                "load_task_failed",
                obj(&[("batch", v_str(&params.batch_name())), ("msg", v_str(&err.to_string()))]),
            );
            return;
        }
    };
    let mut app = app.lock().await;
    if !app.install(&request, data) {
        debug(Domain::Data, "load_superseded", obj(&[("batch", v_str(&params.batch_name()))]));
    }
}

/// Cached comparison runs, loading them on the blocking pool on first use.
pub async fn comparison_shared(app: &SharedApp) -> Vec<ComparisonRun> {
    let (layout, opts) = {
        let app = app.lock().await;
        if let Some(runs) = app.cached_comparison() {
            return runs.to_vec();
        }
        (app.layout.clone(), app.load_options())
    };
    let loaded =
        tokio::task::spawn_blocking(move || load_comparison(&layout, &presets::all(), &opts)).await;
    match loaded {
        Ok(runs) => {
            app.lock().await.set_comparison(runs.clone());
            runs
        }
        Err(err) => {
            warn(Domain::Data, "load_task_failed", obj(&[("msg", v_str(&err.to_string()))]));
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_without_data() -> App {
        let config = Config {
            data_dir: "/nonexistent/superscript-data".into(),
            duration: 5,
            ..Config::default()
        };
        App::new(config, None)
    }

    #[test]
    fn test_missing_data_sets_notice() {
        let app = app_without_data();
        assert!(!app.data.is_loaded());
        assert!(app.session.data_load_complete);
        assert!(app.data.notice.as_deref().unwrap_or("").starts_with("Sorry"));
    }

    #[test]
    fn test_play_without_data_does_not_start() {
        let mut app = app_without_data();
        assert_eq!(app.toggle_play().unwrap(), None);
        assert!(!app.session.playing);
    }

    #[test]
    fn test_step_stops_at_last_timestep() {
        let mut app = app_without_data();
        app.session.playing = true;
        let mut steps = 0;
        while let Step::Advanced(_) = app.step() {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(app.session.global_time, 4);
        assert!(!app.session.playing);
    }

    #[test]
    fn test_frame_clamps_timestep() {
        let app = app_without_data();
        let f = app.frame(1000);
        assert_eq!(f.timestep, 4);
        assert!(f.metrics.is_empty());
        assert!(f.network.is_none());
    }

    #[test]
    fn test_noop_effect_keeps_playback_generation() {
        let mut app = app_without_data();
        app.session.playing = true;
        let generation = app.play_generation;
        assert_eq!(app.session.set_replicate(app.session.params.replicate), Effect::None);
        assert!(app.settle(Effect::None).is_none());
        assert!(app.is_current(generation));

        app.session.seek(2, app.last_timestep());
        app.settle(Effect::None);
        assert!(!app.is_current(generation));
    }

    #[test]
    fn test_superseded_load_is_dropped() {
        let mut app = app_without_data();
        let effect = app.session.set_replicate(3);
        let stale = app.settle(effect).unwrap();
        let effect = app.session.set_replicate(4);
        let current = app.settle(effect).unwrap();
        assert!(!app.install(&stale, SimulationData::default()));
        assert!(!app.session.data_load_complete);
        assert!(app.install(&current, stale.load()));
        assert!(app.session.data_load_complete);
    }
}
