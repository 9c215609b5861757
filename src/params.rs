//! Simulation parameter combinations and the directory names that encode them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PROJECT_COUNTS: [u32; 5] = [1, 2, 3, 5, 10];
pub const DEPT_WORKLOADS: [f64; 2] = [0.1, 0.3];
pub const SKILL_DECAYS: [f64; 3] = [0.95, 0.99, 0.995];
pub const TRAIN_LOADS: [f64; 4] = [0.0, 0.1, 0.3, 2.0];

/// Training-load selector value that encodes the "boost" scenario.
pub const TRAIN_BOOST: f64 = 2.0;

const BATCH_SUFFIX: &str = "010921_v1.1";
const PRESET_E_SUFFIX: &str = "251021_v1.1";

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn contains(options: &[f64], value: f64) -> bool {
    options.iter().any(|o| approx_eq(*o, value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamAllocation {
    Random,
    Optimised,
    FlexibleStartTime,
}

impl TeamAllocation {
    pub const ALL: [TeamAllocation; 3] = [
        TeamAllocation::Random,
        TeamAllocation::Optimised,
        TeamAllocation::FlexibleStartTime,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TeamAllocation::Random => "Random",
            TeamAllocation::Optimised => "Optimised",
            TeamAllocation::FlexibleStartTime => "Flexible start time",
        }
    }

    /// Sub-directory of a batch holding this allocation method's runs.
    pub fn dir_name(&self) -> &'static str {
        match self {
            TeamAllocation::Random => "Random",
            TeamAllocation::Optimised => "Basin",
            TeamAllocation::FlexibleStartTime => "Basin_w_flex",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            TeamAllocation::Random => "random",
            TeamAllocation::Optimised => "optimised",
            TeamAllocation::FlexibleStartTime => "flexible_start_time",
        }
    }
}

impl FromStr for TeamAllocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TeamAllocation::ALL
            .iter()
            .copied()
            .find(|a| {
                s.eq_ignore_ascii_case(a.key())
                    || s.eq_ignore_ascii_case(a.label())
                    || s.eq_ignore_ascii_case(a.dir_name())
            })
            .ok_or_else(|| format!("unknown team allocation: {}", s))
    }
}

impl fmt::Display for TeamAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Training settings derived from the single training-load selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingScenario {
    pub load: f64,
    pub flag: bool,
    pub boost: bool,
}

impl TrainingScenario {
    pub fn from_selector(train_load: f64) -> Self {
        let boost = approx_eq(train_load, TRAIN_BOOST);
        Self {
            load: if boost { 0.1 } else { train_load },
            flag: !approx_eq(train_load, 0.0),
            boost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub project_count: u32,
    pub dept_workload: f64,
    pub budget_func: bool,
    pub skill_decay: f64,
    pub train_load: f64,
    pub team_allocation: TeamAllocation,
    pub replicate: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            project_count: 3,
            dept_workload: 0.1,
            budget_func: true,
            skill_decay: 0.99,
            train_load: 0.1,
            team_allocation: TeamAllocation::Random,
            replicate: 0,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<(), String> {
        if !PROJECT_COUNTS.contains(&self.project_count) {
            return Err(format!(
                "project_count {} not in {:?}",
                self.project_count, PROJECT_COUNTS
            ));
        }
        if !contains(&DEPT_WORKLOADS, self.dept_workload) {
            return Err(format!(
                "dept_workload {} not in {:?}",
                self.dept_workload, DEPT_WORKLOADS
            ));
        }
        if !contains(&SKILL_DECAYS, self.skill_decay) {
            return Err(format!(
                "skill_decay {} not in {:?}",
                self.skill_decay, SKILL_DECAYS
            ));
        }
        if !contains(&TRAIN_LOADS, self.train_load) {
            return Err(format!(
                "train_load {} not in {:?}",
                self.train_load, TRAIN_LOADS
            ));
        }
        Ok(())
    }

    pub fn training(&self) -> TrainingScenario {
        TrainingScenario::from_selector(self.train_load)
    }

    /// Directory name of the simulation batch for this combination.
    pub fn batch_name(&self) -> String {
        let t = self.training();
        format!(
            "pps_{}_sd_{:.3}_dw_{:.1}_tl_{:.1}_tf_{}_tb_{}_bf_{}_{}",
            self.project_count,
            self.skill_decay,
            self.dept_workload,
            t.load,
            t.flag as u8,
            t.boost as u8,
            self.budget_func as u8,
            BATCH_SUFFIX
        )
    }

    /// Batch name used by the preset E skill-decay/training sweep.
    pub fn preset_e_batch_name(&self) -> String {
        let t = self.training();
        format!(
            "preset_E_sd_{:.3}_tl_{:.1}_tf_{}_tb_{}_{}",
            self.skill_decay, t.load, t.flag as u8, t.boost as u8, PRESET_E_SUFFIX
        )
    }

    /// Directory name used by the first data release (v1.0).
    pub fn legacy_batch_name(&self) -> String {
        format!(
            "pps_{}_dwl_{:.1}_budget_{}_sd_{:.3}_train_{:.1}",
            self.project_count,
            self.dept_workload,
            self.budget_func as u8,
            self.skill_decay,
            self.train_load
        )
    }

    /// Cartesian product of every selectable option, replicate 0, random allocation.
    pub fn all_combinations() -> Vec<Parameters> {
        let mut out = Vec::new();
        for &project_count in &PROJECT_COUNTS {
            for &skill_decay in &SKILL_DECAYS {
                for &dept_workload in &DEPT_WORKLOADS {
                    for &train_load in &TRAIN_LOADS {
                        for budget_func in [false, true] {
                            out.push(Parameters {
                                project_count,
                                dept_workload,
                                budget_func,
                                skill_decay,
                                train_load,
                                ..Parameters::default()
                            });
                        }
                    }
                }
            }
        }
        out
    }
}

pub fn format_skill_decay(value: f64) -> String {
    format!("{:.3}", value)
}

pub fn format_train_load(value: f64) -> String {
    if value < TRAIN_BOOST {
        format!("{:.1}", value)
    } else {
        "Boost".to_string()
    }
}

pub fn format_budget(on: bool) -> &'static str {
    if on {
        "On"
    } else {
        "Off"
    }
}
