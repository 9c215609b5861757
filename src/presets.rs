//! Named parameter bundles (A-E) used to pre-select a scenario.

use crate::params::{Parameters, TeamAllocation};

#[derive(Debug, Clone)]
pub struct Preset {
    pub key: &'static str,
    pub name: &'static str,
    pub blurb: &'static str,
    pub colour: &'static str,
    pub params: Parameters,
}

pub fn all() -> Vec<Preset> {
    let base = Parameters {
        project_count: 2,
        dept_workload: 0.1,
        budget_func: true,
        skill_decay: 0.99,
        train_load: 0.1,
        team_allocation: TeamAllocation::Random,
        replicate: 0,
    };
    vec![
        Preset {
            key: "A",
            name: "Random teams",
            blurb: "Teams are drawn at random from the available workers. \
                    This is the baseline against which the other strategies are compared.",
            colour: "blue",
            params: base.clone(),
        },
        Preset {
            key: "B",
            name: "Optimised teams",
            blurb: "Teams are chosen to maximise the probability of project success \
                    using a basin-hopping optimiser.",
            colour: "orange",
            params: Parameters { team_allocation: TeamAllocation::Optimised, ..base.clone() },
        },
        Preset {
            key: "C",
            name: "Flexible start time",
            blurb: "As for optimised teams, but projects may start later if that \
                    allows a stronger team to be assembled.",
            colour: "green",
            params: Parameters { team_allocation: TeamAllocation::FlexibleStartTime, ..base.clone() },
        },
        Preset {
            key: "D",
            name: "No training",
            blurb: "Optimised teams with training switched off: unused skills decay \
                    and are never recovered.",
            colour: "red",
            params: Parameters {
                team_allocation: TeamAllocation::Optimised,
                train_load: 0.0,
                ..base.clone()
            },
        },
        Preset {
            key: "E",
            name: "Training boost",
            blurb: "Optimised teams with slow skill decay and boosted training for \
                    the least skilled workers.",
            colour: "purple",
            params: Parameters {
                project_count: 3,
                skill_decay: 0.995,
                train_load: 2.0,
                team_allocation: TeamAllocation::Optimised,
                ..base
            },
        },
    ]
}

pub fn find(key: &str) -> Option<Preset> {
    all().into_iter().find(|p| p.key.eq_ignore_ascii_case(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid_combinations() {
        for preset in all() {
            assert!(preset.params.validate().is_ok(), "preset {}", preset.key);
        }
    }

    #[test]
    fn test_find_is_case_insensitive() {
        assert_eq!(find("c").map(|p| p.key), Some("C"));
        assert!(find("Z").is_none());
    }
}
