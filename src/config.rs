//! Runtime configuration and the static chart catalogue.

use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub port: u16,
    /// Number of timesteps in every run.
    pub duration: usize,
    /// Frame interval at speed 1; the loop sleeps `frame_ms / speed`.
    pub frame_ms: u64,
    pub default_speed: u32,
    pub session_db: String,
    pub max_rep: u32,
    pub roi_window: usize,
    pub roi_look_back: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            bind_addr: "127.0.0.1".to_string(),
            port: 8501,
            duration: 100,
            frame_ms: 200,
            default_speed: 5,
            session_db: "./session.sqlite".to_string(),
            max_rep: 9,
            roi_window: 10,
            roi_look_back: 2,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.data_dir),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(d.bind_addr),
            port: env_parse("PORT").unwrap_or(d.port),
            duration: env_parse("DURATION").unwrap_or(d.duration),
            frame_ms: env_parse("FRAME_MS").unwrap_or(d.frame_ms),
            default_speed: env_parse("DEFAULT_SPEED").unwrap_or(d.default_speed),
            session_db: std::env::var("SESSION_DB").unwrap_or(d.session_db),
            max_rep: env_parse("MAX_REP").unwrap_or(d.max_rep),
            roi_window: env_parse("ROI_WINDOW").unwrap_or(d.roi_window),
            roi_look_back: d.roi_look_back,
        }
    }

    pub fn last_timestep(&self) -> usize {
        self.duration.saturating_sub(1)
    }
}

/// Descriptions of the coarse model variables shown as chart tooltips.
pub const SIMULATION_VARIABLES: &[(&str, &str)] = &[
    ("ActiveProjects", "Number of currently active projects."),
    ("SuccessfulProjects", "Number of successful projects that finished on this timestep."),
    ("FailedProjects", "Number of failed projects that finished on this timestep."),
    ("NullProjects", "Number of projects that could not be staffed on this timestep."),
    ("ProjectLoad", "Fraction of workforce capacity spent on project work."),
    ("TrainingLoad", "Fraction of workforce capacity spent in training."),
    ("DeptLoad", "Fraction of workforce capacity reserved for departmental workload."),
    ("Slack", "Fraction of workforce capacity left unused."),
    ("AverageWorkerOvr", "Mean overall rating (OVR) across all workers."),
    ("AverageTeamOvr", "Mean overall rating (OVR) of workers currently in teams."),
    ("Roi", "Return on investment (moving average over 10 timesteps)."),
];

pub fn describe_variable(name: &str) -> &'static str {
    SIMULATION_VARIABLES
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| *v)
        .unwrap_or("(undefined)")
}

#[derive(Debug, Clone, Serialize)]
pub struct PlotSpec {
    pub name: &'static str,
    pub column_names: &'static [&'static str],
    pub column_colours: &'static [&'static str],
    pub y_label: &'static str,
    pub info: &'static str,
    pub allow_x_axis_scrolling: bool,
}

pub const SIMULATION_PLOTS: &[PlotSpec] = &[
    PlotSpec {
        name: "Projects",
        column_names: &["ActiveProjects", "SuccessfulProjects", "FailedProjects"],
        column_colours: &["blue", "green", "red"],
        y_label: "count",
        info: "Active projects and the number of projects finishing each timestep.",
        allow_x_axis_scrolling: false,
    },
    PlotSpec {
        name: "Workload",
        column_names: &["ProjectLoad", "TrainingLoad", "DeptLoad", "Slack"],
        column_colours: &["blue", "orange", "green", "grey"],
        y_label: "fraction of capacity",
        info: "How the capacity of the workforce is divided between activities.",
        allow_x_axis_scrolling: false,
    },
    PlotSpec {
        name: "Worker skill",
        column_names: &["AverageWorkerOvr", "AverageTeamOvr"],
        column_colours: &["purple", "orange"],
        y_label: "OVR",
        info: "Mean worker skill across the organization and within teams.",
        allow_x_axis_scrolling: true,
    },
    PlotSpec {
        name: "Return on investment",
        column_names: &["Roi"],
        column_colours: &["black"],
        y_label: "ROI",
        info: "Smoothed return on investment of completed projects.",
        allow_x_axis_scrolling: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_ignores_bad_values() {
        std::env::set_var("SUPERSCRIPT_TEST_FRAME_MS", "250");
        assert_eq!(env_parse::<u64>("SUPERSCRIPT_TEST_FRAME_MS"), Some(250));
        std::env::set_var("SUPERSCRIPT_TEST_FRAME_MS", "fast");
        assert_eq!(env_parse::<u64>("SUPERSCRIPT_TEST_FRAME_MS"), None);
        assert_eq!(env_parse::<u64>("SUPERSCRIPT_TEST_UNSET"), None);
    }

    #[test]
    fn test_describe_known_and_unknown() {
        assert_eq!(describe_variable("ActiveProjects"), "Number of currently active projects.");
        assert_eq!(describe_variable("Nope"), "(undefined)");
    }

    #[test]
    fn test_plot_specs_are_consistent() {
        for plot in SIMULATION_PLOTS {
            assert_eq!(plot.column_names.len(), plot.column_colours.len(), "{}", plot.name);
        }
    }

    #[test]
    fn test_last_timestep() {
        let cfg = Config::default();
        assert_eq!(cfg.last_timestep(), 99);
    }
}
