//! Semantic drift chart.
//!
//! The drift analysis writes `semantic-drift.json`: for each tracked term, a
//! per-decade series of similarity-to-origin values with example citations.
//! This module maps a series onto plot coordinates and tracks which decade
//! the reader has selected.
//!
//! # Scales
//!
//! - x: sample index over `[0, N-1]` onto the plot width. A single sample
//!   sits on the left edge.
//! - y: similarity over `[min(observed, 0.7), 1.0]` onto the plot height,
//!   inverted so that higher similarity is drawn higher.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lower bound of the similarity axis unless the data dips below it.
pub const SIMILARITY_FLOOR: f64 = 0.7;

/// Top-level shape of `semantic-drift.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub terms: BTreeMap<String, TermDrift>,
    #[serde(default)]
    pub timeline: Vec<String>,
}

impl DriftReport {
    pub fn term(&self, term: &str) -> Option<&TermDrift> {
        self.terms.get(term)
    }
}

/// Drift series for one tracked term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermDrift {
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default)]
    pub total_contexts: usize,
    #[serde(default)]
    pub decades_covered: usize,
    #[serde(default)]
    pub drift: Vec<DriftSample>,
}

/// One period of a drift series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSample {
    /// Period label, e.g. `"1850s"`.
    pub decade: String,
    /// Cosine similarity to the first period, in `[0, 1]`.
    pub similarity_to_origin: f64,
    #[serde(default)]
    pub similarity_to_previous: Option<f64>,
    #[serde(default)]
    pub num_contexts: usize,
    #[serde(default)]
    pub examples: Vec<DriftExample>,
}

/// A citation illustrating how the term was used in a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftExample {
    pub text: String,
    pub year: i32,
    pub title: String,
    pub doc_id: String,
}

/// Chart dimensions in SVG user units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
            padding: 40.0,
        }
    }
}

impl ChartLayout {
    fn usable_width(&self) -> f64 {
        (self.width - 2.0 * self.padding).max(0.0)
    }

    fn usable_height(&self) -> f64 {
        (self.height - 2.0 * self.padding).max(0.0)
    }
}

/// Linear map from a domain interval onto a range interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Map `value` into the range. A degenerate domain maps to the range start.
    pub fn apply(&self, value: f64) -> f64 {
        let span = self.domain.1 - self.domain.0;
        if span.abs() < f64::EPSILON {
            return self.range.0;
        }
        let t = (value - self.domain.0) / span;
        self.range.0 + t * (self.range.1 - self.range.0)
    }
}

/// A plotted sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotPoint {
    pub decade: String,
    pub x: f64,
    pub y: f64,
    pub similarity: f64,
    pub num_contexts: usize,
}

/// Horizontal scale for `n` samples.
pub fn x_scale(n: usize, layout: &ChartLayout) -> LinearScale {
    let last = n.saturating_sub(1) as f64;
    LinearScale::new(
        (0.0, last),
        (layout.padding, layout.padding + layout.usable_width()),
    )
}

/// Vertical scale for `samples`, inverted.
pub fn y_scale(samples: &[DriftSample], layout: &ChartLayout) -> LinearScale {
    let observed_min = samples
        .iter()
        .map(|s| s.similarity_to_origin)
        .fold(f64::INFINITY, f64::min);
    let lower = observed_min.min(SIMILARITY_FLOOR);
    LinearScale::new(
        (lower, 1.0),
        (layout.padding + layout.usable_height(), layout.padding),
    )
}

/// Plot coordinates for each sample, in input order.
pub fn plot(samples: &[DriftSample], layout: &ChartLayout) -> Vec<PlotPoint> {
    let xs = x_scale(samples.len(), layout);
    let ys = y_scale(samples, layout);
    samples
        .iter()
        .enumerate()
        .map(|(i, s)| PlotPoint {
            decade: s.decade.clone(),
            x: xs.apply(i as f64),
            y: ys.apply(s.similarity_to_origin),
            similarity: s.similarity_to_origin,
            num_contexts: s.num_contexts,
        })
        .collect()
}

/// SVG path data (`M x y L x y …`) through `points`.
pub fn line_path(points: &[PlotPoint]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let cmd = if i == 0 { 'M' } else { 'L' };
            format!("{} {:.1} {:.1}", cmd, p.x, p.y)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Interactive chart state for one term.
///
/// Selecting a period only changes which examples are shown; the series
/// itself is never reloaded.
#[derive(Debug, Clone)]
pub struct DriftChart {
    term: String,
    samples: Vec<DriftSample>,
    layout: ChartLayout,
    selected: Option<String>,
}

impl DriftChart {
    pub fn new(term: impl Into<String>, series: &TermDrift, layout: ChartLayout) -> Self {
        Self {
            term: term.into(),
            samples: series.drift.clone(),
            layout,
            selected: None,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn points(&self) -> Vec<PlotPoint> {
        plot(&self.samples, &self.layout)
    }

    /// Select `decade`. Unknown labels clear the selection.
    pub fn select(&mut self, decade: &str) {
        self.selected = self
            .samples
            .iter()
            .any(|s| s.decade == decade)
            .then(|| decade.to_string());
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Examples for the selected period; empty when nothing is selected.
    pub fn selected_examples(&self) -> &[DriftExample] {
        self.selected
            .as_deref()
            .and_then(|d| self.samples.iter().find(|s| s.decade == d))
            .map(|s| s.examples.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(decade: &str, sim: f64) -> DriftSample {
        DriftSample {
            decade: decade.to_string(),
            similarity_to_origin: sim,
            similarity_to_previous: None,
            num_contexts: 10,
            examples: vec![DriftExample {
                text: format!("example from {}", decade),
                year: 1850,
                title: "T".to_string(),
                doc_id: "doc".to_string(),
            }],
        }
    }

    const LAYOUT: ChartLayout = ChartLayout {
        width: 500.0,
        height: 300.0,
        padding: 50.0,
    };

    #[test]
    fn test_single_sample_sits_on_left_edge() {
        let points = plot(&[sample("1850s", 1.0)], &LAYOUT);
        assert_eq!(points.len(), 1);
        assert!((points[0].x - 50.0).abs() < 1e-9);
        assert!(points[0].x.is_finite() && points[0].y.is_finite());
        // Similarity 1.0 is the top of the plot area.
        assert!((points[0].y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_scales_span_plot_area() {
        let samples = vec![sample("1850s", 1.0), sample("1860s", 0.85), sample("1870s", 0.7)];
        let points = plot(&samples, &LAYOUT);
        assert!((points[0].x - 50.0).abs() < 1e-9);
        assert!((points[1].x - 250.0).abs() < 1e-9);
        assert!((points[2].x - 450.0).abs() < 1e-9);
        assert!((points[0].y - 50.0).abs() < 1e-9);
        assert!((points[1].y - 150.0).abs() < 1e-9);
        assert!((points[2].y - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_floor_extends_below_observed_minimum() {
        let samples = vec![sample("1850s", 1.0), sample("1860s", 0.5)];
        let ys = y_scale(&samples, &LAYOUT);
        assert!((ys.domain.0 - 0.5).abs() < 1e-9);

        let high = vec![sample("1850s", 1.0), sample("1860s", 0.95)];
        let ys = y_scale(&high, &LAYOUT);
        assert!((ys.domain.0 - SIMILARITY_FLOOR).abs() < 1e-9);
    }

    #[test]
    fn test_selection_is_local_state() {
        let series = TermDrift {
            drift: vec![sample("1850s", 1.0), sample("1860s", 0.9)],
            ..Default::default()
        };
        let mut chart = DriftChart::new("engine", &series, LAYOUT);
        assert!(chart.selected_examples().is_empty());

        chart.select("1860s");
        assert_eq!(chart.selected(), Some("1860s"));
        assert_eq!(chart.selected_examples()[0].text, "example from 1860s");

        chart.select("1990s");
        assert_eq!(chart.selected(), None);
        assert_eq!(chart.points().len(), 2);
    }

    #[test]
    fn test_line_path() {
        let points = plot(&[sample("1850s", 1.0), sample("1860s", 0.7)], &LAYOUT);
        assert_eq!(line_path(&points), "M 50.0 50.0 L 450.0 250.0");
        assert_eq!(line_path(&[]), "");
    }

    #[test]
    fn test_parse_report() {
        let json = r#"{
            "model": "intfloat/multilingual-e5-small",
            "terms": {
                "automaton": {
                    "variants": ["automaton", "automate"],
                    "total_contexts": 42,
                    "decades_covered": 2,
                    "drift": [
                        {"decade": "1850s", "similarity_to_origin": 1.0,
                         "num_contexts": 20, "examples": []},
                        {"decade": "1860s", "similarity_to_origin": 0.91,
                         "similarity_to_previous": 0.91, "num_contexts": 22,
                         "examples": [{"text": "an automaton", "year": 1862,
                                       "title": "Automata", "doc_id": "d1"}]}
                    ]
                }
            },
            "timeline": ["1850s", "1860s"]
        }"#;
        let report: DriftReport = serde_json::from_str(json).unwrap();
        let term = report.term("automaton").unwrap();
        assert_eq!(term.drift.len(), 2);
        assert_eq!(term.drift[1].similarity_to_previous, Some(0.91));
        assert_eq!(term.drift[1].examples[0].doc_id, "d1");
    }
}
