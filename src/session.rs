//! Dashboard session state and the handlers behind each control.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::logging::{info, obj, v_str, Domain};
use crate::params::Parameters;
use crate::presets;
use serde_json::json;

pub const MIN_SPEED: u32 = 1;
pub const MAX_SPEED: u32 = 10;

/// What the caller must do after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Parameters or replicate changed: load the run again.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub params: Parameters,
    pub preset: Option<String>,
    pub preset_active: bool,
    pub playing: bool,
    pub global_time: usize,
    pub speed: u32,
    pub data_load_complete: bool,
    pub show_network: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            params: Parameters::default(),
            preset: None,
            preset_active: false,
            playing: false,
            global_time: 0,
            speed: 5,
            data_load_complete: false,
            show_network: false,
        }
    }
}

pub fn play_label(playing: bool) -> &'static str {
    if playing {
        "Stop simulation"
    } else {
        "Play simulation"
    }
}

pub fn network_label(show: bool) -> &'static str {
    if show {
        "Turn off social network"
    } else {
        "Turn on social network"
    }
}

impl Session {
    pub fn with_speed(speed: u32) -> Self {
        Self {
            speed: speed.clamp(MIN_SPEED, MAX_SPEED),
            ..Self::default()
        }
    }

    /// Button caption for a preset: `!` marks the active one.
    pub fn preset_label(&self, key: &str) -> String {
        match &self.preset {
            Some(p) if self.preset_active && p == key => "!".to_string(),
            _ => key.to_string(),
        }
    }

    pub fn active_preset(&self) -> Option<presets::Preset> {
        if !self.preset_active {
            return None;
        }
        self.preset.as_deref().and_then(presets::find)
    }

    /// Back to the first timestep of replicate 0.
    pub fn reload(&mut self) -> Effect {
        self.global_time = 0;
        self.params.replicate = 0;
        self.playing = false;
        self.data_load_complete = false;
        Effect::Reload
    }

    pub fn deactivate_preset(&mut self) {
        self.preset_active = false;
    }

    pub fn set_preset(&mut self, key: &str) -> Result<Effect, String> {
        let preset = presets::find(key).ok_or_else(|| format!("unknown preset: {}", key))?;
        self.preset = Some(preset.key.to_string());
        self.preset_active = true;
        self.params = preset.params.clone();
        info(
            Domain::Session,
            "preset_selected",
            obj(&[("preset", v_str(preset.key)), ("batch", v_str(&self.params.batch_name()))]),
        );
        Ok(self.reload())
    }

    /// Any manual parameter change leaves preset mode.
    pub fn set_parameters(&mut self, params: Parameters) -> Result<Effect, String> {
        params.validate()?;
        self.deactivate_preset();
        self.params = params;
        info(
            Domain::Session,
            "parameters_changed",
            obj(&[("batch", v_str(&self.params.batch_name()))]),
        );
        Ok(self.reload())
    }

    pub fn set_replicate(&mut self, replicate: u32) -> Effect {
        if replicate == self.params.replicate {
            return Effect::None;
        }
        self.params.replicate = replicate;
        self.global_time = 0;
        self.playing = false;
        self.data_load_complete = false;
        Effect::Reload
    }

    /// Toggle playback. At the final timestep the run restarts from zero.
    pub fn handle_play_click(&mut self, has_data: bool, last_timestep: usize) -> Result<Effect, String> {
        if !self.data_load_complete {
            return Err("Attempted to play simulation while model still loading! \
                        Please select another parameter combination and wait for model loading to complete."
                .to_string());
        }
        if has_data {
            self.playing = !self.playing;
        }
        if self.global_time >= last_timestep {
            self.global_time = 0;
            return Ok(Effect::None);
        }
        info(
            Domain::Session,
            "play_toggled",
            obj(&[("playing", json!(self.playing)), ("timestep", json!(self.global_time))]),
        );
        Ok(Effect::None)
    }

    pub fn handle_speed(&mut self, speed: u32) -> Result<(), String> {
        if !self.data_load_complete {
            return Err("Attempted to change simulation speed while model still loading! \
                        Please select another Preset and wait for data load to complete."
                .to_string());
        }
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(format!("speed must be between {} and {}", MIN_SPEED, MAX_SPEED));
        }
        self.speed = speed;
        Ok(())
    }

    pub fn toggle_network(&mut self) {
        self.show_network = !self.show_network;
    }

    /// Scrub to a timestep; stops playback.
    pub fn seek(&mut self, timestep: usize, last_timestep: usize) {
        self.playing = false;
        self.global_time = timestep.min(last_timestep);
    }

    pub fn frame_interval(&self, frame_ms: u64) -> Duration {
        Duration::from_millis(frame_ms) / self.speed.max(MIN_SPEED)
    }

    /// Page heading for the simulation page.
    pub fn heading(&self) -> (String, String) {
        match self.active_preset() {
            Some(p) => (
                format!("Using parameter preset {}: {}", p.key, p.name),
                p.blurb.to_string(),
            ),
            None => (
                "Simulation".to_string(),
                "Select a parameter preset (A-E), or explore the behaviour of the simulation \
                 by selecting your own parameter values. Click 'Play simulation' to run the \
                 agent-based model for your chosen parameter values."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TeamAllocation;

    fn loaded() -> Session {
        Session { data_load_complete: true, ..Session::default() }
    }

    #[test]
    fn test_play_label() {
        assert_eq!(play_label(true), "Stop simulation");
        assert_eq!(play_label(false), "Play simulation");
        assert_eq!(network_label(false), "Turn on social network");
    }

    #[test]
    fn test_play_toggles_only_with_data() {
        let mut s = loaded();
        s.handle_play_click(true, 99).unwrap();
        assert!(s.playing);
        s.handle_play_click(true, 99).unwrap();
        assert!(!s.playing);
        s.handle_play_click(false, 99).unwrap();
        assert!(!s.playing);
    }

    #[test]
    fn test_play_rejected_while_loading() {
        let mut s = Session::default();
        assert!(s.handle_play_click(true, 99).is_err());
        assert!(!s.playing);
    }

    #[test]
    fn test_play_at_end_restarts() {
        let mut s = loaded();
        s.global_time = 99;
        s.handle_play_click(true, 99).unwrap();
        assert_eq!(s.global_time, 0);
        assert!(s.playing);
    }

    #[test]
    fn test_preset_label_marks_active() {
        let mut s = loaded();
        s.set_preset("B").unwrap();
        assert_eq!(s.preset_label("B"), "!");
        assert_eq!(s.preset_label("A"), "A");
        s.deactivate_preset();
        assert_eq!(s.preset_label("B"), "B");
    }

    #[test]
    fn test_set_preset_applies_parameters_and_resets() {
        let mut s = loaded();
        s.global_time = 40;
        s.params.replicate = 3;
        assert_eq!(s.set_preset("C").unwrap(), Effect::Reload);
        assert_eq!(s.params.team_allocation, TeamAllocation::FlexibleStartTime);
        assert_eq!(s.global_time, 0);
        assert_eq!(s.params.replicate, 0);
        assert!(s.set_preset("Q").is_err());
    }

    #[test]
    fn test_manual_change_deactivates_preset() {
        let mut s = loaded();
        s.set_preset("A").unwrap();
        let p = Parameters { project_count: 10, ..s.params.clone() };
        s.set_parameters(p).unwrap();
        assert!(!s.preset_active);
        assert!(s.active_preset().is_none());
        assert_eq!(s.params.project_count, 10);
    }

    #[test]
    fn test_invalid_parameters_rejected_without_change() {
        let mut s = loaded();
        let before = s.clone();
        let p = Parameters { dept_workload: 0.2, ..Parameters::default() };
        assert!(s.set_parameters(p).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn test_speed_bounds_and_interval() {
        let mut s = loaded();
        assert!(s.handle_speed(0).is_err());
        assert!(s.handle_speed(11).is_err());
        s.handle_speed(4).unwrap();
        assert_eq!(s.frame_interval(200), Duration::from_millis(50));
    }

    #[test]
    fn test_seek_clamps_and_stops() {
        let mut s = loaded();
        s.playing = true;
        s.seek(500, 99);
        assert_eq!(s.global_time, 99);
        assert!(!s.playing);
    }
}
