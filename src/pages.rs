//! HTML pages. Every page is rendered whole on each request; controls are plain
//! GET forms against the `/api` routes, which redirect back when `back` is set.

use std::fmt::Write;

use crate::app::App;
use crate::chart::{escape, render_network, Bar, BarChart, LineChart, ScatterChart, ScatterPoint};
use crate::config::{describe_variable, PlotSpec, SIMULATION_PLOTS};
use crate::data::catalog::available_allocations;
use crate::data::loader::{ComparisonRun, ROI_COLUMN};
use crate::data::table::SeriesPoint;
use crate::params::{
    format_budget, format_skill_decay, format_train_load, Parameters, TeamAllocation, DEPT_WORKLOADS,
    PROJECT_COUNTS, SKILL_DECAYS, TRAIN_LOADS,
};
use crate::presets;
use crate::session::{network_label, play_label, MAX_SPEED, MIN_SPEED};

/// Timesteps averaged for the terminal ROI bar chart.
pub const TERMINAL_WINDOW: usize = 25;

pub const HYPOTHESES: &[&str] = &[
    "a) High risk projects (high stake) attract talent (high OVR)",
    "b) Cognitively diverse teams have higher success rate than randomly selected teams",
    "c) Superstars emerge",
    "d) Timeline flexibility pays off",
    "...",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    About,
    Simulation,
    Comparison,
    Hypotheses,
}

impl Nav {
    const ALL: [Nav; 4] = [Nav::About, Nav::Simulation, Nav::Comparison, Nav::Hypotheses];

    fn title(&self) -> &'static str {
        match self {
            Nav::About => "About",
            Nav::Simulation => "Simulation",
            Nav::Comparison => "Comparison",
            Nav::Hypotheses => "Hypotheses",
        }
    }

    fn href(&self) -> &'static str {
        match self {
            Nav::About => "/",
            Nav::Simulation => "/simulation",
            Nav::Comparison => "/comparison",
            Nav::Hypotheses => "/hypotheses",
        }
    }
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  {{REFRESH}}
  <title>SuperScript: {{TITLE}}</title>
  <style>
    :root {
      --bg: #ffffff; --bg-raised: #f6f8fa; --fg: #24292f; --fg-muted: #57606a;
      --accent: #0969da; --border: #d0d7de; --warn-bg: #fff8c5; --warn-border: #d4a72c;
      --sans: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
      --radius: 6px;
    }
    * { box-sizing: border-box; }
    body { margin: 0; font-family: var(--sans); color: var(--fg); background: var(--bg); display: flex; min-height: 100vh; }
    aside { width: 300px; background: var(--bg-raised); border-right: 1px solid var(--border); padding: 1rem; }
    aside h3 { font-size: 0.85rem; color: var(--fg-muted); text-transform: uppercase; margin: 1.2rem 0 0.4rem; }
    aside label { display: block; font-size: 0.8rem; margin-top: 0.5rem; }
    aside select, aside input { width: 100%; }
    nav a { display: block; padding: 0.3rem 0.5rem; color: var(--fg); text-decoration: none; border-radius: var(--radius); }
    nav a.active { background: var(--accent); color: #fff; }
    main { flex: 1; padding: 1.5rem 2rem; max-width: 1100px; }
    .presets { display: flex; gap: 0.3rem; }
    .presets form { flex: 1; }
    .presets button { width: 100%; }
    button { padding: 0.35rem 0.6rem; border: 1px solid var(--border); border-radius: var(--radius); background: #fff; cursor: pointer; }
    button.primary { background: var(--accent); color: #fff; border-color: var(--accent); }
    .notice { background: var(--warn-bg); border: 1px solid var(--warn-border); border-radius: var(--radius); padding: 0.75rem 1rem; }
    .chart { margin: 1rem 0; }
    .chart p { color: var(--fg-muted); font-size: 0.8rem; margin: 0.2rem 0; }
    .timestep { font-family: monospace; color: var(--fg-muted); }
    details { border: 1px solid var(--border); border-radius: var(--radius); padding: 0.5rem 0.8rem; margin: 0.4rem 0; }
  </style>
</head>
<body>
<aside>
  <nav>{{NAV}}</nav>
  {{SIDEBAR}}
</aside>
<main>
{{BODY}}
</main>
</body>
</html>
"##;

fn shell(active: Nav, sidebar: &str, body: &str, refresh_secs: Option<f64>) -> String {
    let nav: String = Nav::ALL
        .iter()
        .map(|n| {
            format!(
                r#"<a href="{}"{}>{}</a>"#,
                n.href(),
                if *n == active { r#" class="active""# } else { "" },
                n.title()
            )
        })
        .collect();
    let refresh = refresh_secs
        .map(|s| format!(r#"<meta http-equiv="refresh" content="{:.2}">"#, s))
        .unwrap_or_default();
    TEMPLATE
        .replace("{{REFRESH}}", &refresh)
        .replace("{{TITLE}}", active.title())
        .replace("{{NAV}}", &nav)
        .replace("{{SIDEBAR}}", sidebar)
        .replace("{{BODY}}", body)
}

pub fn about_page() -> String {
    let body = r#"<h1>About</h1>
<h2>Welcome to SuperScript!</h2>
<p>Here you can explore our agent-based model of team formation. In this model, teams of workers are
assigned to projects on each timestep using an algorithm that attempts to maximise the probability of
project success. The properties of the organization emerge from the interactions of the workers, and
evolve through time via a combination of mechanisms (for example: project work, training, skill decay).
The skill level of individual workers is quantified by their 'Overall Rating' (OVR).</p>
<p>You can find the simulation code on <a href="https://github.com/Superscriptus/SuperScript">GitHub</a>
along with a <a href="https://github.com/Superscriptus/SuperScript/blob/master/documentation/model_specification.pdf">full
specification</a> of the model.</p>
<h3>Check out the following pages using the sidebar navigation:</h3>
<h3>Simulation</h3>
<p>Explore the simulation in real-time and see how the output metrics vary over time. Select from
pre-defined parameter presets or choose your own parameter values using the sidebar controls.</p>
<h3>Comparison</h3>
<p>Compare performance of the model across the five pre-selected parameter presets (A-E). Explore how the
emergent properties of the organization vary according these different organizational strategies.</p>"#;
    shell(Nav::About, "", body, None)
}

pub fn hypotheses_page(selected: usize, value: u32) -> String {
    let selected = selected.min(HYPOTHESES.len() - 1);
    let mut options = String::new();
    for (i, h) in HYPOTHESES.iter().enumerate() {
        let _ = write!(
            options,
            r#"<option value="{}"{}>{}</option>"#,
            i,
            if i == selected { " selected" } else { "" },
            escape(h)
        );
    }
    let sidebar = format!(
        r#"<h3>Hypotheses</h3><form method="get" action="/hypotheses">
<label>Select parameter value: <span>{v}</span><input type="range" name="value" min="0" max="100" value="{v}"></label>
<input type="hidden" name="h" value="{h}"><button type="submit">Apply</button></form>"#,
        v = value.min(100),
        h = selected
    );
    let body = format!(
        r#"<h1>Testing Initial Hypotheses</h1>
<p>This page will display plots for testing initial hypotheses...</p>
<form method="get" action="/hypotheses"><label>Select hypothesis to view:
<select name="h" onchange="this.form.submit()">{}</select></label>
<input type="hidden" name="value" value="{}"></form>
<p>To display: {}</p>"#,
        options,
        value.min(100),
        escape(HYPOTHESES[selected])
    );
    shell(Nav::Hypotheses, &sidebar, &body, None)
}

fn select(name: &str, label: &str, options: &[(String, String)], current: &str) -> String {
    let mut out = format!(r#"<label>{}<select name="{}">"#, escape(label), name);
    for (value, text) in options {
        let _ = write!(
            out,
            r#"<option value="{}"{}>{}</option>"#,
            escape(value),
            if value == current { " selected" } else { "" },
            escape(text)
        );
    }
    out.push_str("</select></label>");
    out
}

/// `on_disk` limits the allocation choices; when empty every allocation is offered.
fn parameter_form(p: &Parameters, on_disk: &[TeamAllocation]) -> String {
    let counts: Vec<(String, String)> = PROJECT_COUNTS.iter().map(|c| (c.to_string(), c.to_string())).collect();
    let workloads: Vec<(String, String)> = DEPT_WORKLOADS
        .iter()
        .map(|w| (format!("{:.1}", w), format!("{:.1}", w)))
        .collect();
    let budgets: Vec<(String, String)> = [true, false]
        .iter()
        .map(|b| ((*b as u8).to_string(), format_budget(*b).to_string()))
        .collect();
    let decays: Vec<(String, String)> = SKILL_DECAYS
        .iter()
        .map(|d| (format_skill_decay(*d), format_skill_decay(*d)))
        .collect();
    let loads: Vec<(String, String)> = TRAIN_LOADS
        .iter()
        .map(|l| (format!("{:.1}", l), format_train_load(*l)))
        .collect();
    let allocations: Vec<(String, String)> = TeamAllocation::ALL
        .iter()
        .filter(|a| on_disk.is_empty() || on_disk.contains(a) || **a == p.team_allocation)
        .map(|a| (a.key().to_string(), a.label().to_string()))
        .collect();

    let mut out = String::from(r#"<h3>Parameters</h3><form method="get" action="/api/params">"#);
    out.push_str(&select("project_count", "Projects per timestep", &counts, &p.project_count.to_string()));
    out.push_str(&select("dept_workload", "Department workload", &workloads, &format!("{:.1}", p.dept_workload)));
    out.push_str(&select("budget_func", "Budget constraint", &budgets, &(p.budget_func as u8).to_string()));
    out.push_str(&select("skill_decay", "Skill decay", &decays, &format_skill_decay(p.skill_decay)));
    out.push_str(&select("train_load", "Training load", &loads, &format!("{:.1}", p.train_load)));
    out.push_str(&select("team_allocation", "Team allocation", &allocations, p.team_allocation.key()));
    out.push_str(r#"<input type="hidden" name="back" value="1"><button type="submit">Apply</button></form>"#);
    out
}

fn simulation_sidebar(app: &App) -> String {
    let s = &app.session;
    let mut out = String::from(r#"<h3>Presets</h3><div class="presets">"#);
    for preset in presets::all() {
        let _ = write!(
            out,
            r#"<form method="get" action="/api/preset/{k}"><input type="hidden" name="back" value="1"><button type="submit" title="{n}">{l}</button></form>"#,
            k = preset.key,
            n = escape(preset.name),
            l = escape(&s.preset_label(preset.key))
        );
    }
    out.push_str("</div>");
    let on_disk = available_allocations(&app.layout, &s.params);
    out.push_str(&parameter_form(&s.params, &on_disk));

    let replicates = app.replicates();
    if replicates.len() > 1 {
        let options: Vec<(String, String)> = replicates.iter().map(|r| (r.to_string(), r.to_string())).collect();
        let _ = write!(
            out,
            r#"<h3>Replicate</h3><form method="get" action="/api/replicate">{}<input type="hidden" name="back" value="1"><button type="submit">Load</button></form>
<form method="get" action="/api/replicate"><input type="hidden" name="value" value="random"><input type="hidden" name="back" value="1"><button type="submit">Random replicate</button></form>"#,
            select("value", "Replicate", &options, &s.params.replicate.to_string())
        );
    }

    let _ = write!(
        out,
        r#"<h3>Playback</h3>
<form method="get" action="/api/play"><input type="hidden" name="back" value="1"><button class="primary" type="submit">{play}</button></form>
<form method="get" action="/api/speed"><label>Simulation speed: {speed}<input type="range" name="value" min="{min}" max="{max}" value="{speed}"></label><input type="hidden" name="back" value="1"><button type="submit">Set speed</button></form>
<form method="get" action="/api/network"><input type="hidden" name="back" value="1"><button type="submit">{net}</button></form>"#,
        play = play_label(s.playing),
        speed = s.speed,
        min = MIN_SPEED,
        max = MAX_SPEED,
        net = network_label(s.show_network)
    );
    out
}

/// One time-series chart, showing every timestep up to `t`.
pub fn render_plot(spec: &PlotSpec, app: &App, t: usize) -> String {
    let Some(table) = app.data.model_vars.as_ref() else {
        return String::new();
    };
    let points: Vec<SeriesPoint> = table.melt(spec.column_names, 0..=t);
    let chart = LineChart {
        title: spec.name.to_string(),
        x_label: "timestep".to_string(),
        y_label: spec.y_label.to_string(),
        series: spec
            .column_names
            .iter()
            .zip(spec.column_colours.iter())
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect(),
        x_domain: if spec.allow_x_axis_scrolling {
            None
        } else {
            Some((0.0, app.config.duration as f64))
        },
    };
    let descriptions: String = spec
        .column_names
        .iter()
        .map(|c| format!("<p><b>{}</b>: {}</p>", escape(c), escape(describe_variable(c))))
        .collect();
    format!(
        r#"<div class="chart"><h3>{}</h3><p>{}</p>{}{}</div>"#,
        escape(spec.name),
        escape(spec.info),
        chart.render(&points),
        descriptions
    )
}

pub fn simulation_page(app: &App) -> String {
    let s = &app.session;
    let (title, intro) = s.heading();
    let mut body = format!("<h1>{}</h1><p>{}</p>", escape(&title), escape(&intro));

    if let Some(notice) = &app.data.notice {
        let _ = write!(body, r#"<div class="notice">{}</div>"#, escape(notice));
    }

    if app.data.is_loaded() {
        let t = s.global_time.min(app.last_timestep());
        let _ = write!(
            body,
            r#"<p class="timestep">timestep {} / {} (replicate {})</p>
<form method="get" action="/api/seek"><input type="range" name="t" min="0" max="{}" value="{}"><input type="hidden" name="back" value="1"><button type="submit">Go</button></form>"#,
            t,
            app.last_timestep(),
            s.params.replicate,
            app.last_timestep(),
            t
        );
        for spec in SIMULATION_PLOTS {
            body.push_str(&render_plot(spec, app, t));
        }
        if s.show_network {
            match app.data.network_at(t) {
                Some(g) => {
                    let _ = write!(
                        body,
                        r#"<div class="chart"><h3>Social network</h3>{}</div>"#,
                        render_network(g, &format!("Collaboration network at timestep {}", t))
                    );
                }
                None => body.push_str("<p>No network data for this run.</p>"),
            }
        }
    }

    let refresh = s
        .playing
        .then(|| s.frame_interval(app.config.frame_ms).as_secs_f64());
    shell(Nav::Simulation, &simulation_sidebar(app), &body, refresh)
}

/// Per-preset bars of mean ROI over the final timesteps.
pub fn terminal_roi_bars(runs: &[ComparisonRun]) -> Vec<Bar> {
    runs.iter()
        .map(|run| Bar {
            label: run.preset.key.to_string(),
            value: run
                .data
                .model_vars
                .as_ref()
                .and_then(|t| t.tail_mean(ROI_COLUMN, TERMINAL_WINDOW))
                .unwrap_or(f64::NAN),
            colour: run.preset.colour.to_string(),
        })
        .collect()
}

pub fn comparison_page(runs: &[ComparisonRun], duration: usize) -> String {
    let mut body = String::from(
        "<h1>Comparison</h1><p>Here we compare the performance of the model when simulated using the following parameter presets:</p>",
    );
    for run in runs {
        let _ = write!(
            body,
            "<details><summary>{}: {}</summary><p>{}</p></details>",
            run.preset.key,
            escape(run.preset.name),
            escape(run.preset.blurb)
        );
    }
    for run in runs.iter().filter(|r| !r.data.is_loaded()) {
        if let Some(notice) = &run.data.notice {
            let _ = write!(body, r#"<div class="notice">Preset {}: {}</div>"#, run.preset.key, escape(notice));
        }
    }

    let mut points: Vec<SeriesPoint> = Vec::new();
    for run in runs {
        let Some(table) = run.data.model_vars.as_ref() else { continue };
        let Some(roi) = table.column(ROI_COLUMN) else { continue };
        points.extend(roi.iter().enumerate().map(|(t, v)| SeriesPoint {
            time: t,
            variable: run.preset.key.to_string(),
            value: *v,
            description: describe_variable(ROI_COLUMN),
        }));
    }
    let roi_chart = LineChart {
        title: "ROI Comparison".to_string(),
        x_label: "timestep".to_string(),
        y_label: "ROI".to_string(),
        series: runs
            .iter()
            .map(|r| (r.preset.key.to_string(), r.preset.colour.to_string()))
            .collect(),
        x_domain: Some((0.0, duration as f64)),
    };
    let _ = write!(body, r#"<div class="chart">{}</div>"#, roi_chart.render(&points));

    let bars = BarChart {
        title: format!("Mean ROI over final {} timesteps", TERMINAL_WINDOW),
        x_label: "preset".to_string(),
        y_label: "terminal ROI".to_string(),
    };
    let _ = write!(body, r#"<div class="chart">{}</div>"#, bars.render(&terminal_roi_bars(runs)));

    let scatter: Vec<ScatterPoint> = runs
        .iter()
        .filter_map(|run| {
            let table = run.data.model_vars.as_ref()?;
            Some(ScatterPoint {
                x: table.tail_mean("AverageTeamOvr", TERMINAL_WINDOW)?,
                y: table.tail_mean(ROI_COLUMN, TERMINAL_WINDOW)?,
                colour: run.preset.colour.to_string(),
                label: format!("{}: {}", run.preset.key, run.preset.name),
            })
        })
        .collect();
    if !scatter.is_empty() {
        let chart = ScatterChart {
            title: "Team OVR against ROI (final timesteps)".to_string(),
            x_label: "mean team OVR".to_string(),
            y_label: "mean ROI".to_string(),
        };
        let _ = write!(body, r#"<div class="chart">{}</div>"#, chart.render(&scatter));
    }

    shell(Nav::Comparison, "", &body, None)
}

pub fn not_found_page(target: &str) -> String {
    shell(
        Nav::About,
        "",
        &format!("<h1>Not found</h1><p>No page at <code>{}</code>.</p>", escape(target)),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::SimulationData;
    use crate::data::table::MetricTable;

    fn run_with_roi(key: &str, roi: &[f64]) -> ComparisonRun {
        let mut lines = vec![format!("time,{}", ROI_COLUMN)];
        lines.extend(roi.iter().enumerate().map(|(t, v)| format!("{},{}", t, v)));
        let table = MetricTable::parse(lines.iter().map(|l| l.as_str())).unwrap();
        ComparisonRun {
            preset: presets::find(key).unwrap(),
            data: SimulationData { model_vars: Some(table), ..SimulationData::default() },
        }
    }

    #[test]
    fn test_about_marks_active_nav() {
        let html = about_page();
        assert!(html.contains(r#"<a href="/" class="active">About</a>"#));
        assert!(html.contains("Welcome to SuperScript!"));
    }

    #[test]
    fn test_hypotheses_clamps_selection() {
        let html = hypotheses_page(42, 500);
        assert!(html.contains("To display: ..."));
        assert!(html.contains(r#"value="100""#));
    }

    #[test]
    fn test_parameter_form_offers_allocations_on_disk() {
        let p = Parameters::default();
        let html = parameter_form(&p, &[TeamAllocation::Optimised]);
        assert!(html.contains(">Optimised</option>"));
        // the current choice stays selectable even without data
        assert!(html.contains(">Random</option>"));
        assert!(!html.contains(">Flexible start time</option>"));

        let html = parameter_form(&p, &[]);
        assert!(html.contains(">Flexible start time</option>"));
    }

    #[test]
    fn test_terminal_roi_uses_final_window() {
        let mut roi = vec![0.0; 75];
        roi.extend(std::iter::repeat(2.0).take(25));
        let runs = vec![run_with_roi("A", &roi), run_with_roi("B", &[1.0, 3.0])];
        let bars = terminal_roi_bars(&runs);
        assert_eq!(bars[0].value, 2.0);
        assert_eq!(bars[1].value, 2.0);
        assert_eq!(bars[0].colour, "blue");
    }

    #[test]
    fn test_comparison_page_lists_presets_and_missing_runs() {
        let mut missing = run_with_roi("C", &[]);
        missing.data = SimulationData {
            notice: Some("Sorry, nothing here".to_string()),
            ..SimulationData::default()
        };
        let html = comparison_page(&[run_with_roi("A", &[1.0, 2.0]), missing], 100);
        assert!(html.contains("A: Random teams"));
        assert!(html.contains("Preset C: Sorry, nothing here"));
        assert!(html.contains("Mean ROI over final 25 timesteps"));
    }
}
