//! Server-side SVG charts: line, bar, scatter and network plots.

use std::f64::consts::PI;
use std::fmt::Write;

use crate::data::table::SeriesPoint;
use crate::network::Graph;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 320.0;
const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 120.0;
const MARGIN_TOP: f64 = 28.0;
const MARGIN_BOTTOM: f64 = 40.0;
const TICKS: usize = 5;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Linear map from a data interval onto a pixel interval.
#[derive(Debug, Clone, Copy)]
struct Scale {
    d0: f64,
    d1: f64,
    r0: f64,
    r1: f64,
}

impl Scale {
    fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        let (mut d0, mut d1) = domain;
        if !(d1 - d0).is_normal() {
            d0 -= 0.5;
            d1 += 0.5;
        }
        Self { d0, d1, r0: range.0, r1: range.1 }
    }

    fn map(&self, v: f64) -> f64 {
        self.r0 + (v - self.d0) / (self.d1 - self.d0) * (self.r1 - self.r0)
    }

    fn ticks(&self) -> Vec<f64> {
        (0..=TICKS)
            .map(|i| self.d0 + (self.d1 - self.d0) * i as f64 / TICKS as f64)
            .collect()
    }
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn fmt_tick(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{:.2}", v)
    }
}

fn open_svg(out: &mut String, title: &str) {
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="100%" font-family="sans-serif" font-size="11">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = write!(
        out,
        r#"<text x="{}" y="16" font-size="13" font-weight="bold">{}</text>"#,
        MARGIN_LEFT,
        escape(title)
    );
}

fn axes(out: &mut String, x: &Scale, y: &Scale, x_label: &str, y_label: &str) {
    let bottom = HEIGHT - MARGIN_BOTTOM;
    let right = WIDTH - MARGIN_RIGHT;
    let _ = write!(
        out,
        r##"<line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="#333"/><line x1="{l}" y1="{t}" x2="{l}" y2="{b}" stroke="#333"/>"##,
        l = MARGIN_LEFT,
        r = right,
        t = MARGIN_TOP,
        b = bottom
    );
    for v in x.ticks() {
        let px = x.map(v);
        let _ = write!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            px,
            bottom + 14.0,
            fmt_tick(v)
        );
    }
    for v in y.ticks() {
        let py = y.map(v);
        let _ = write!(
            out,
            r##"<line x1="{l}" y1="{py:.1}" x2="{r}" y2="{py:.1}" stroke="#eee"/><text x="{tx:.1}" y="{ty:.1}" text-anchor="end">{v}</text>"##,
            l = MARGIN_LEFT,
            r = right,
            py = py,
            tx = MARGIN_LEFT - 4.0,
            ty = py + 4.0,
            v = fmt_tick(v)
        );
    }
    let _ = write!(
        out,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
        (MARGIN_LEFT + right) / 2.0,
        HEIGHT - 6.0,
        escape(x_label)
    );
    let _ = write!(
        out,
        r#"<text transform="translate(14,{:.1}) rotate(-90)" text-anchor="middle">{}</text>"#,
        (MARGIN_TOP + bottom) / 2.0,
        escape(y_label)
    );
}

fn legend(out: &mut String, entries: &[(String, String)]) {
    let x = WIDTH - MARGIN_RIGHT + 12.0;
    for (i, (label, colour)) in entries.iter().enumerate() {
        let y = MARGIN_TOP + 14.0 * i as f64;
        let _ = write!(
            out,
            r#"<rect x="{x:.1}" y="{y:.1}" width="10" height="10" fill="{c}"/><text x="{tx:.1}" y="{ty:.1}">{l}</text>"#,
            x = x,
            y = y,
            c = escape(colour),
            tx = x + 14.0,
            ty = y + 9.0,
            l = escape(label)
        );
    }
}

#[derive(Debug, Clone)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Series name and colour, in legend order.
    pub series: Vec<(String, String)>,
    /// Fixed x domain; `None` scrolls with the data.
    pub x_domain: Option<(f64, f64)>,
}

impl LineChart {
    pub fn render(&self, points: &[SeriesPoint]) -> String {
        let mut out = String::new();
        open_svg(&mut out, &self.title);

        let x_ext = self
            .x_domain
            .or_else(|| extent(points.iter().map(|p| p.time as f64)))
            .unwrap_or((0.0, 1.0));
        let y_ext = extent(points.iter().map(|p| p.value)).unwrap_or((0.0, 1.0));
        let x = Scale::new(x_ext, (MARGIN_LEFT, WIDTH - MARGIN_RIGHT));
        let y = Scale::new(y_ext, (HEIGHT - MARGIN_BOTTOM, MARGIN_TOP));
        axes(&mut out, &x, &y, &self.x_label, &self.y_label);

        for (name, colour) in &self.series {
            let pts: Vec<&SeriesPoint> = points
                .iter()
                .filter(|p| &p.variable == name && p.value.is_finite())
                .collect();
            if pts.is_empty() {
                continue;
            }
            let path: Vec<String> = pts
                .iter()
                .map(|p| format!("{:.1},{:.1}", x.map(p.time as f64), y.map(p.value)))
                .collect();
            let _ = write!(
                out,
                r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
                escape(colour),
                path.join(" ")
            );
            for p in pts {
                let _ = write!(
                    out,
                    r#"<circle cx="{:.1}" cy="{:.1}" r="2.5" fill="{}"><title>{}: {} (t={})</title></circle>"#,
                    x.map(p.time as f64),
                    y.map(p.value),
                    escape(colour),
                    escape(p.description),
                    fmt_tick(p.value),
                    p.time
                );
            }
        }
        legend(&mut out, &self.series);
        out.push_str("</svg>");
        out
    }
}

#[derive(Debug, Clone)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub colour: String,
}

#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl BarChart {
    pub fn render(&self, bars: &[Bar]) -> String {
        let mut out = String::new();
        open_svg(&mut out, &self.title);

        let (lo, hi) = extent(bars.iter().map(|b| b.value)).unwrap_or((0.0, 1.0));
        let y = Scale::new((lo.min(0.0), hi.max(0.0)), (HEIGHT - MARGIN_BOTTOM, MARGIN_TOP));
        let x = Scale::new((0.0, bars.len().max(1) as f64), (MARGIN_LEFT, WIDTH - MARGIN_RIGHT));
        let bottom = HEIGHT - MARGIN_BOTTOM;
        let _ = write!(
            out,
            r##"<line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="#333"/>"##,
            l = MARGIN_LEFT,
            r = WIDTH - MARGIN_RIGHT,
            b = bottom
        );
        for v in y.ticks() {
            let _ = write!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
                MARGIN_LEFT - 4.0,
                y.map(v) + 4.0,
                fmt_tick(v)
            );
        }

        let slot = x.map(1.0) - x.map(0.0);
        let zero = y.map(0.0);
        for (i, bar) in bars.iter().enumerate() {
            let value = if bar.value.is_finite() { bar.value } else { 0.0 };
            let top = y.map(value);
            let _ = write!(
                out,
                r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {}</title></rect>"#,
                x.map(i as f64) + slot * 0.15,
                top.min(zero),
                slot * 0.7,
                (zero - top).abs(),
                escape(&bar.colour),
                escape(&bar.label),
                fmt_tick(value)
            );
            let _ = write!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                x.map(i as f64 + 0.5),
                bottom + 14.0,
                escape(&bar.label)
            );
        }
        let _ = write!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text><text transform="translate(14,{:.1}) rotate(-90)" text-anchor="middle">{}</text>"#,
            (MARGIN_LEFT + WIDTH - MARGIN_RIGHT) / 2.0,
            HEIGHT - 6.0,
            escape(&self.x_label),
            (MARGIN_TOP + bottom) / 2.0,
            escape(&self.y_label)
        );
        out.push_str("</svg>");
        out
    }
}

#[derive(Debug, Clone)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub colour: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl ScatterChart {
    pub fn render(&self, points: &[ScatterPoint]) -> String {
        let mut out = String::new();
        open_svg(&mut out, &self.title);
        let x = Scale::new(
            extent(points.iter().map(|p| p.x)).unwrap_or((0.0, 1.0)),
            (MARGIN_LEFT, WIDTH - MARGIN_RIGHT),
        );
        let y = Scale::new(
            extent(points.iter().map(|p| p.y)).unwrap_or((0.0, 1.0)),
            (HEIGHT - MARGIN_BOTTOM, MARGIN_TOP),
        );
        axes(&mut out, &x, &y, &self.x_label, &self.y_label);
        for p in points.iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
            let _ = write!(
                out,
                r#"<circle cx="{:.1}" cy="{:.1}" r="4" fill="{}" fill-opacity="0.7"><title>{}</title></circle>"#,
                x.map(p.x),
                y.map(p.y),
                escape(&p.colour),
                escape(&p.label)
            );
        }
        out.push_str("</svg>");
        out
    }
}

/// Nodes evenly spaced on the unit circle, in node order.
pub fn circular_layout(graph: &Graph) -> Vec<(String, f64, f64)> {
    let n = graph.node_count();
    graph
        .nodes()
        .enumerate()
        .map(|(i, id)| {
            if n == 1 {
                return (id.clone(), 0.0, 0.0);
            }
            let theta = 2.0 * PI * i as f64 / n as f64;
            (id.clone(), theta.cos(), theta.sin())
        })
        .collect()
}

pub fn render_network(graph: &Graph, title: &str) -> String {
    let mut out = String::new();
    open_svg(&mut out, title);
    if graph.is_empty() {
        let _ = write!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">No collaborations yet.</text></svg>"#,
            WIDTH / 2.0,
            HEIGHT / 2.0
        );
        return out;
    }

    let cx = WIDTH / 2.0;
    let cy = (HEIGHT + MARGIN_TOP) / 2.0;
    let radius = (HEIGHT - MARGIN_TOP) / 2.0 - 20.0;
    let positions: std::collections::HashMap<String, (f64, f64)> = circular_layout(graph)
        .into_iter()
        .map(|(id, x, y)| (id, (cx + x * radius, cy + y * radius)))
        .collect();
    let max_w = graph.edges().map(|e| e.weight).fold(1.0_f64, f64::max);

    for e in graph.edges() {
        let (Some(a), Some(b)) = (positions.get(&e.source), positions.get(&e.target)) else {
            continue;
        };
        let _ = write!(
            out,
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#888" stroke-width="{:.2}"/>"##,
            a.0,
            a.1,
            b.0,
            b.1,
            0.5 + 2.5 * e.weight / max_w
        );
    }
    for id in graph.nodes() {
        let Some((x, y)) = positions.get(id) else { continue };
        let _ = write!(
            out,
            r##"<circle cx="{:.1}" cy="{:.1}" r="5" fill="#1f77b4"><title>worker {} (degree {})</title></circle>"##,
            x,
            y,
            escape(id),
            graph.degree(id)
        );
    }
    out.push_str("</svg>");
    out
}
