//! Catalog diagrams.
//!
//! Plotly figures for the built-in ids are computed here so the browser only
//! has to hand them to `Plotly.newPlot`.

use serde_json::{json, Value};

use euclid_common::models::{VisualizationPayload, VisualizationType};

pub const NUMBER_LINE_ID: &str = "number_line_plotly";
pub const PARABOLA_ID: &str = "parabola_plotly";
const SVG_IDS: [&str; 2] = ["pythagorean_svg", "base_conversion_svg"];

pub fn plotly_number_line() -> Value {
    let xs: Vec<i32> = (-5..=5).collect();
    let labels: Vec<String> = xs.iter().map(|x| x.to_string()).collect();
    json!({
        "data": [{
            "x": xs,
            "y": vec![0; xs.len()],
            "mode": "lines+markers+text",
            "text": labels,
            "textposition": "top center",
            "line": {"color": "#2563EB"},
            "marker": {"size": 10},
        }],
        "layout": {
            "title": "Integer Number Line",
            "xaxis": {"showgrid": false, "zeroline": false},
            "yaxis": {"visible": false},
            "margin": {"l": 20, "r": 20, "t": 40, "b": 20},
            "height": 240,
        },
    })
}

/// y = x² − 2 sampled every 0.5 on [-5, 5].
pub fn plotly_parabola() -> Value {
    let xs: Vec<f64> = (-10..=10).map(|i| f64::from(i) / 2.0).collect();
    let ys: Vec<f64> = xs.iter().map(|x| x * x - 2.0).collect();
    json!({
        "data": [{
            "x": xs,
            "y": ys,
            "mode": "lines",
            "line": {"color": "#8B5CF6"},
        }],
        "layout": {
            "title": "Parabola: y = x^2 - 2",
            "xaxis": {"title": "x"},
            "yaxis": {"title": "y"},
            "margin": {"l": 40, "r": 20, "t": 40, "b": 40},
            "height": 300,
        },
    })
}

fn svg_url(viz_id: &str) -> Value {
    json!({ "url": format!("/visualizations/{viz_id}.svg") })
}

/// Turn a topic's catalog entry into a payload the UI can draw.
pub fn build_payload(topic_viz: Option<VisualizationPayload>) -> Option<VisualizationPayload> {
    let viz = topic_viz?;
    let data = match (viz.viz_id.as_str(), viz.viz_type) {
        (NUMBER_LINE_ID, _) => plotly_number_line(),
        (PARABOLA_ID, _) => plotly_parabola(),
        (id, VisualizationType::Svg) => svg_url(id),
        (_, VisualizationType::Manim) => {
            if viz.data.is_null() { json!({}) } else { viz.data.clone() }
        }
        (_, VisualizationType::Plotly) => return None,
    };
    let viz_type = match viz.viz_id.as_str() {
        NUMBER_LINE_ID | PARABOLA_ID => VisualizationType::Plotly,
        _ => viz.viz_type,
    };
    Some(VisualizationPayload { viz_id: viz.viz_id, viz_type, title: viz.title, data })
}

/// `{"viz_type", "data"}` for a catalog id, as served by the visualizations endpoint.
pub fn get_by_id(viz_id: &str) -> Option<Value> {
    match viz_id {
        NUMBER_LINE_ID => Some(json!({"viz_type": "plotly", "data": plotly_number_line()})),
        PARABOLA_ID => Some(json!({"viz_type": "plotly", "data": plotly_parabola()})),
        id if SVG_IDS.contains(&id) => Some(json!({"viz_type": "svg", "data": svg_url(id)})),
        _ => None,
    }
}
