//! SVG chart output
//!
//! Two self-contained SVG documents: a scatter of every subject's mean per
//! cohort with error bars and a line at each cohort's mean, and one bar chart
//! per sex comparing control against condition with significance markers.

use crate::analysis::{GroupSummary, SexComparison};
use crate::cohort::CohortKey;
use crate::inference::round2;

const WIDTH: f64 = 700.0;
const HEIGHT: f64 = 700.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 70.0;

/// Fixed palette per cohort
fn color(key: CohortKey) -> &'static str {
    match key {
        CohortKey::FemaleCondition => "pink",
        CohortKey::MaleCondition => "green",
        CohortKey::FemaleControl => "purple",
        CohortKey::MaleControl => "blue",
    }
}

/// Escape XML special characters
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Round an axis maximum up to a readable step
fn nice_ceiling(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(value.log10().floor());
    let step = if value / magnitude <= 2.0 {
        magnitude / 5.0
    } else {
        magnitude / 2.0
    };
    (value / step).ceil() * step
}

/// Maps data coordinates onto the plotting area
struct Frame {
    x_min: f64,
    x_max: f64,
    y_max: f64,
}

impl Frame {
    fn x(&self, value: f64) -> f64 {
        let span = (self.x_max - self.x_min).max(1.0);
        MARGIN_LEFT + (value - self.x_min) / span * (WIDTH - MARGIN_LEFT - MARGIN_RIGHT)
    }

    fn y(&self, value: f64) -> f64 {
        let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        HEIGHT - MARGIN_BOTTOM - (value / self.y_max).clamp(0.0, 1.0) * plot_height
    }
}

fn open_document(svg: &mut String, title: &str) {
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\">\n",
        w = WIDTH,
        h = HEIGHT
    ));
    svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "<text x=\"{}\" y=\"30\" text-anchor=\"middle\" font-size=\"16\">{}</text>\n",
        WIDTH / 2.0,
        escape_xml(title)
    ));
}

fn axes(svg: &mut String, frame: &Frame, x_label: &str, y_label: &str) {
    let left = MARGIN_LEFT;
    let bottom = HEIGHT - MARGIN_BOTTOM;
    svg.push_str(&format!(
        "<line x1=\"{left}\" y1=\"{bottom}\" x2=\"{}\" y2=\"{bottom}\" stroke=\"black\"/>\n",
        WIDTH - MARGIN_RIGHT
    ));
    svg.push_str(&format!(
        "<line x1=\"{left}\" y1=\"{MARGIN_TOP}\" x2=\"{left}\" y2=\"{bottom}\" stroke=\"black\"/>\n"
    ));

    for tick in 0..=5 {
        let value = frame.y_max * tick as f64 / 5.0;
        let y = frame.y(value);
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"11\">{}</text>\n",
            left - 6.0,
            y + 4.0,
            round2(value)
        ));
    }

    svg.push_str(&format!(
        "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"13\">{}</text>\n",
        WIDTH / 2.0,
        HEIGHT - 25.0,
        escape_xml(x_label)
    ));
    svg.push_str(&format!(
        "<text x=\"20\" y=\"{y}\" text-anchor=\"middle\" font-size=\"13\" transform=\"rotate(-90 20 {y})\">{}</text>\n",
        escape_xml(y_label),
        y = HEIGHT / 2.0
    ));
}

fn error_bar(svg: &mut String, frame: &Frame, x: f64, value: f64, error: f64, stroke: &str) {
    let px = frame.x(x);
    let top = frame.y(value + error);
    let bottom = frame.y((value - error).max(0.0));
    svg.push_str(&format!(
        "<line x1=\"{px:.1}\" y1=\"{top:.1}\" x2=\"{px:.1}\" y2=\"{bottom:.1}\" stroke=\"{stroke}\"/>\n"
    ));
    for cap in [top, bottom] {
        svg.push_str(&format!(
            "<line x1=\"{:.1}\" y1=\"{cap:.1}\" x2=\"{:.1}\" y2=\"{cap:.1}\" stroke=\"{stroke}\"/>\n",
            px - 4.0,
            px + 4.0
        ));
    }
}

/// Scatter of each subject's mean movement, grouped by cohort
pub fn render_scatter(groups: &[GroupSummary], condition_label: &str) -> String {
    let x_max = groups.iter().map(GroupSummary::len).max().unwrap_or(0).max(1) as f64;
    let y_top = groups
        .iter()
        .flat_map(|g| g.means.iter().zip(&g.row_standard_errors).map(|(m, e)| m + e))
        .fold(0.0, f64::max);
    let frame = Frame {
        x_min: 0.5,
        x_max: x_max + 0.5,
        y_max: nice_ceiling(y_top),
    };

    let mut svg = String::new();
    open_document(
        &mut svg,
        &format!(
            "Average Movement of Each Participant Based on Sex and {} Status",
            condition_label
        ),
    );
    axes(&mut svg, &frame, "Participants", "Movement");

    for group in groups {
        let stroke = color(group.key);
        if let Some(mean) = group.mean_of_means {
            let y = frame.y(mean);
            svg.push_str(&format!(
                "<line x1=\"{MARGIN_LEFT}\" y1=\"{y:.1}\" x2=\"{}\" y2=\"{y:.1}\" stroke=\"{stroke}\"/>\n",
                WIDTH - MARGIN_RIGHT
            ));
        }
        for (index, (&mean, &error)) in group.means.iter().zip(&group.row_standard_errors).enumerate() {
            let x = (index + 1) as f64;
            error_bar(&mut svg, &frame, x, mean, error, stroke);
            svg.push_str(&format!(
                "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\" fill=\"{stroke}\"/>\n",
                frame.x(x),
                frame.y(mean)
            ));
        }
    }

    // Legend
    for (row, group) in groups.iter().enumerate() {
        let y = MARGIN_TOP + 10.0 + row as f64 * 18.0;
        let x = WIDTH - MARGIN_RIGHT - 150.0;
        svg.push_str(&format!(
            "<circle cx=\"{x}\" cy=\"{y}\" r=\"5\" fill=\"{}\"/>\n<text x=\"{}\" y=\"{}\" font-size=\"12\">{}</text>\n",
            color(group.key),
            x + 10.0,
            y + 4.0,
            escape_xml(&group.key.label(condition_label))
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Control vs condition bar chart for one sex
pub fn render_bar_chart(comparison: &SexComparison, condition_label: &str) -> String {
    let bars = [&comparison.control, &comparison.condition];
    let y_top = bars
        .iter()
        .map(|g| g.mean_of_means.unwrap_or(0.0) + g.standard_error.unwrap_or(0.0))
        .fold(0.0, f64::max);
    let frame = Frame {
        x_min: 0.0,
        x_max: 2.0,
        y_max: nice_ceiling(y_top),
    };

    let mut svg = String::new();
    open_document(
        &mut svg,
        &format!(
            "Average Movement of All {} Participants Based on {} Status",
            comparison.sex.label(),
            condition_label
        ),
    );
    axes(&mut svg, &frame, "Group", "Average Movement");

    let marker = comparison.marker();
    let names = ["Control", condition_label];
    for (slot, (group, name)) in bars.iter().zip(names).enumerate() {
        let center = slot as f64 + 0.5;
        let label = format!("{}{}", name, marker);
        let stroke = color(group.key);

        if let Some(mean) = group.mean_of_means {
            let left = frame.x(center - 0.3);
            let right = frame.x(center + 0.3);
            let top = frame.y(mean);
            svg.push_str(&format!(
                "<rect x=\"{left:.1}\" y=\"{top:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{stroke}\"/>\n",
                right - left,
                frame.y(0.0) - top
            ));
            if let Some(error) = group.standard_error {
                error_bar(&mut svg, &frame, center, mean, error, "black");
            }
        }

        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{}\" text-anchor=\"middle\" font-size=\"14\">{}</text>\n",
            frame.x(center),
            HEIGHT - MARGIN_BOTTOM + 20.0,
            escape_xml(&label)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}
