//! Fixed chart styling. Built once, passed by reference into every renderer.

use crate::metrics::OutcomeCategory;
use serde::Serialize;

/// One colour per role: five outcome categories plus the two scenario lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub gain_more_than_5pct: &'static str,
    pub gain_less_than_5pct: &'static str,
    pub no_change:           &'static str,
    pub loss_less_than_5pct: &'static str,
    pub loss_more_than_5pct: &'static str,
    pub baseline:            &'static str,
    pub reform:              &'static str,
}

impl Palette {
    pub fn category(&self, category: OutcomeCategory) -> &'static str {
        match category {
            OutcomeCategory::GainMoreThan5Pct => self.gain_more_than_5pct,
            OutcomeCategory::GainLessThan5Pct => self.gain_less_than_5pct,
            OutcomeCategory::NoChange         => self.no_change,
            OutcomeCategory::LoseLessThan5Pct => self.loss_less_than_5pct,
            OutcomeCategory::LoseMoreThan5Pct => self.loss_more_than_5pct,
        }
    }

    pub fn all(&self) -> [&'static str; 7] {
        [
            self.gain_more_than_5pct,
            self.gain_less_than_5pct,
            self.no_change,
            self.loss_less_than_5pct,
            self.loss_more_than_5pct,
            self.baseline,
            self.reform,
        ]
    }
}

/// Logo placed just outside the bottom-right corner of the plot area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Watermark {
    pub source: &'static str,
    pub size:   f64,
    pub x:      f64,
    pub y:      f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartStyle {
    pub palette:     Palette,
    pub font_family: &'static str,
    pub font_color:  &'static str,
    pub watermark:   Watermark,
    pub plotly_src:  &'static str,
    pub font_css:    &'static str,
}

impl ChartStyle {
    pub fn policyengine() -> Self {
        Self {
            palette: Palette {
                gain_more_than_5pct: "#285E61",
                gain_less_than_5pct: "rgba(49, 151, 149, 0.6)",
                no_change:           "#E5E7EB",
                loss_less_than_5pct: "#9CA3AF",
                loss_more_than_5pct: "#4B5563",
                baseline:            "#000000",
                reform:              "#319795",
            },
            font_family: "Roboto Serif",
            font_color:  "#000000",
            watermark: Watermark {
                source: "https://policyengine.github.io/sc-h3492-eitc-calc/teal-square-transparent.png",
                size:   0.07,
                x:      1.05,
                y:      -0.18,
            },
            plotly_src: "https://cdn.plot.ly/plotly-2.27.0.min.js",
            font_css:   "https://fonts.googleapis.com/css2?family=Roboto+Serif:wght@400;500;600&display=swap",
        }
    }

    /// Plotly layout image entry for the watermark.
    pub fn watermark_image(&self, size: f64, y: f64) -> serde_json::Value {
        serde_json::json!({
            "source":  self.watermark.source,
            "xref":    "paper",
            "yref":    "paper",
            "x":       self.watermark.x,
            "y":       y,
            "sizex":   size,
            "sizey":   size,
            "xanchor": "right",
            "yanchor": "bottom",
        })
    }
}

impl Default for ChartStyle {
    fn default() -> Self { Self::policyengine() }
}
