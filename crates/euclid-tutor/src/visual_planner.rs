//! Deterministic visualization plans for common questions.
//!
//! Used whenever the model's own visualization is missing or fails. Every
//! plan carries a finished Plotly figure, so no external runtime is needed.

use std::f64::consts::PI;

use serde_json::{json, Map, Value};

use crate::planner::VisualizationPlan;

/// Phrases that mark a question as worth a picture even when none was asked for.
pub const VISUAL_TOPIC_TOKENS: &[&str] = &[
    "eigenvalue",
    "eigenvector",
    "parabola",
    "quadratic",
    "sine",
    "cosine",
    "trig",
    "derivative",
    "tangent",
    "fraction",
    "fractions",
    "system of equations",
    "systems of equations",
    "imaginary number",
    "imaginary numbers",
    "complex number",
    "complex numbers",
    "complex plane",
    "hamiltonian graph",
    "hamiltonian cycle",
    "graph theory",
    "number line",
    "polar coordinates",
    "taylor series",
    "maclaurin",
    "roots of unity",
    "fft",
    "dft",
    "fourier",
];

const REQUEST_TOKENS: [&str; 7] = ["visualization", "visualise", "visualize", "plot", "graph", "animate", "animation"];

fn mentions(q: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| q.contains(t))
}

pub fn is_visual_topic(question: &str) -> bool {
    mentions(&question.to_lowercase(), VISUAL_TOPIC_TOKENS)
}

/// Whether the question explicitly asks for a picture.
pub fn requests_visualization(question: &str) -> bool {
    mentions(&question.to_lowercase(), &REQUEST_TOKENS)
}

/// The first matching built-in plan, or `None` for topics without one.
pub fn plan(question: &str) -> Option<VisualizationPlan> {
    let q = question.to_lowercase();
    let (goal, parameters, figure) = if mentions(&q, &["hamiltonian graph", "hamiltonian cycle"]) {
        (
            "Hamiltonian cycle on a sample graph",
            json!({"nodes": 6, "cycle": [0, 1, 2, 3, 4, 5, 0]}),
            hamiltonian_figure(),
        )
    } else if mentions(&q, &["fraction", "fractions"]) {
        ("Fraction as parts of a whole", json!({"fraction": [3, 4]}), fraction_figure())
    } else if mentions(&q, &["system of equations", "systems of equations", "simultaneous equations"]) {
        (
            "Intersection point for a system of linear equations",
            json!({"equations": ["y=2x+1", "y=-x+4"]}),
            systems_figure(),
        )
    } else if mentions(
        &q,
        &["imaginary number", "imaginary numbers", "complex number", "complex numbers", "complex plane"],
    ) {
        (
            "Complex plane: real and imaginary axes",
            json!({"points": [[3, 2], [1, -1], [-2, 1]]}),
            complex_plane_figure(),
        )
    } else if mentions(&q, &["eigenvalue", "eigenvalues", "eigenvector", "eigenvectors"]) {
        (
            "Eigenvectors under a linear transformation",
            json!({"matrix": [[2, 0], [0, 1]], "vectors": [[1, 0], [1, 1]]}),
            eigen_figure(),
        )
    } else if mentions(&q, &["parabola", "quadratic"]) {
        ("Quadratic curve visualization", json!({"a": 1, "b": 0, "c": -2}), parabola_figure())
    } else if mentions(&q, &["sine", "cosine", "trig", "sin(", "cos("]) {
        ("Sine and cosine wave intuition", json!({"domain": [0, 6.28]}), trig_figure())
    } else if mentions(&q, &["derivative", "tangent"]) {
        (
            "Function with tangent line at a point",
            json!({"function": "x**2", "x0": 1.0}),
            tangent_figure(),
        )
    } else if q.contains("number line") {
        (
            "Integers on a number line",
            json!({"range": [-5, 5]}),
            euclid_catalog::visualizations::plotly_number_line(),
        )
    } else if q.contains("polar") {
        ("Cardioid in polar coordinates", json!({"r": "1 + cos(theta)"}), polar_figure())
    } else if mentions(&q, &["taylor", "maclaurin"]) {
        ("Taylor polynomials approaching sin(x)", json!({"function": "sin(x)", "degrees": [1, 3, 5]}), taylor_figure())
    } else if q.contains("roots of unity") {
        ("Sixth roots of unity on the unit circle", json!({"n": 6}), roots_of_unity_figure(6))
    } else if mentions(&q, &["fft", "dft", "fourier"]) {
        ("Signal and its discrete Fourier spectrum", json!({"samples": 64, "frequencies": [3, 7]}), dft_figure())
    } else {
        return None;
    };

    let mut plan = VisualizationPlan::plotly(goal, figure);
    plan.parameters = match parameters {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Some(plan)
}

// ── Figures ──────────────────────────────────────────────────────────────────

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// `i / step` for every `i` in `range`, rounded.
fn samples(range: std::ops::RangeInclusive<i32>, step: f64) -> Vec<f64> {
    range.map(|i| round4(f64::from(i) / step)).collect()
}

fn map_round(xs: &[f64], f: impl Fn(f64) -> f64) -> Vec<f64> {
    xs.iter().map(|&x| round4(f(x))).collect()
}

fn line(xs: &[f64], ys: &[f64], name: &str) -> Value {
    json!({"type": "scatter", "x": xs, "y": ys, "mode": "lines", "name": name})
}

fn segment(from: [f64; 2], to: [f64; 2], name: &str) -> Value {
    json!({
        "type": "scatter",
        "x": [from[0], to[0]],
        "y": [from[1], to[1]],
        "mode": "lines+markers",
        "name": name,
    })
}

fn eigen_figure() -> Value {
    let a = [[2.0, 0.0], [0.0, 1.0]];
    let matvec = |v: [f64; 2]| [a[0][0] * v[0] + a[0][1] * v[1], a[1][0] * v[0] + a[1][1] * v[1]];
    let (v1, v2) = ([1.0, 0.0], [1.0, 1.0]);
    let (w1, w2) = (matvec(v1), matvec(v2));
    json!({
        "data": [
            segment([0.0, 0.0], v1, "eigenvector v"),
            segment([0.0, 0.0], w1, "A v (same direction)"),
            segment([0.0, 0.0], v2, "vector u"),
            segment([0.0, 0.0], w2, "A u (direction changes)"),
        ],
        "layout": {
            "title": "Eigenvectors keep direction under A",
            "xaxis": {"scaleanchor": "y", "scaleratio": 1, "zeroline": true},
            "yaxis": {"zeroline": true},
            "legend": {"orientation": "h"},
        },
    })
}

fn parabola_figure() -> Value {
    let xs = samples(-40..=40, 10.0);
    let ys = map_round(&xs, |x| x * x - 2.0);
    json!({
        "data": [line(&xs, &ys, "y = x^2 - 2")],
        "layout": {"title": "Parabola", "xaxis": {"title": "x"}, "yaxis": {"title": "y"}},
    })
}

fn trig_figure() -> Value {
    let xs = samples(0..=314, 50.0);
    json!({
        "data": [
            line(&xs, &map_round(&xs, f64::sin), "sin(x)"),
            line(&xs, &map_round(&xs, f64::cos), "cos(x)"),
        ],
        "layout": {
            "title": "Sine and Cosine Waves",
            "xaxis": {"title": "x (radians)"},
            "yaxis": {"title": "value"},
        },
    })
}

fn tangent_figure() -> Value {
    let xs = samples(-40..=40, 20.0);
    let x0 = 1.0;
    let (m, y0) = (2.0 * x0, x0 * x0);
    json!({
        "data": [
            line(&xs, &map_round(&xs, |x| x * x), "f(x)=x^2"),
            line(&xs, &map_round(&xs, |x| m * (x - x0) + y0), "tangent at x=1"),
        ],
        "layout": {"title": "Derivative as tangent slope", "xaxis": {"title": "x"}, "yaxis": {"title": "y"}},
    })
}

fn fraction_figure() -> Value {
    json!({
        "data": [{
            "type": "pie",
            "labels": ["Shaded (3/4)", "Unshaded (1/4)"],
            "values": [3, 1],
            "hole": 0.35,
        }],
        "layout": {"title": "Fraction model: 3/4 as parts of a whole"},
    })
}

fn systems_figure() -> Value {
    let xs = samples(-20..=25, 5.0);
    json!({
        "data": [
            line(&xs, &map_round(&xs, |x| 2.0 * x + 1.0), "y = 2x + 1"),
            line(&xs, &map_round(&xs, |x| -x + 4.0), "y = -x + 4"),
            {
                "type": "scatter",
                "x": [1],
                "y": [3],
                "mode": "markers+text",
                "text": ["Intersection (1,3)"],
                "textposition": "top center",
                "name": "solution",
            },
        ],
        "layout": {
            "title": "System of equations as line intersection",
            "xaxis": {"title": "x"},
            "yaxis": {"title": "y"},
        },
    })
}

fn axis_line(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
    json!({
        "type": "line",
        "x0": x0, "y0": y0, "x1": x1, "y1": y1,
        "line": {"dash": "dash", "color": "#6b7280"},
    })
}

fn complex_plane_figure() -> Value {
    json!({
        "data": [{
            "type": "scatter",
            "x": [3, 1, -2],
            "y": [2, -1, 1],
            "mode": "markers+text",
            "text": ["3 + 2i", "1 - i", "-2 + i"],
            "textposition": "top center",
            "marker": {"size": 11},
            "name": "Complex numbers",
        }],
        "layout": {
            "title": "Complex Plane (Argand Diagram)",
            "xaxis": {"title": "Real part", "scaleanchor": "y", "scaleratio": 1},
            "yaxis": {"title": "Imaginary part"},
            "shapes": [axis_line(-4.0, 0.0, 4.0, 0.0), axis_line(0.0, -3.0, 0.0, 3.0)],
        },
    })
}

fn hamiltonian_figure() -> Value {
    let n = 6;
    let nodes: Vec<[f64; 2]> = (0..n)
        .map(|i| {
            let a = 2.0 * PI * f64::from(i) / f64::from(n);
            [round4(a.cos()), round4(a.sin())]
        })
        .collect();
    let cycle: Vec<(usize, usize)> = (0..6).map(|i| (i, (i + 1) % 6)).collect();
    let chords = [(0, 3), (1, 4), (2, 5)];

    let edge = |(u, v): (usize, usize), color: &str, width: u32| {
        json!({
            "type": "scatter",
            "x": [nodes[u][0], nodes[v][0]],
            "y": [nodes[u][1], nodes[v][1]],
            "mode": "lines",
            "line": {"color": color, "width": width},
            "hoverinfo": "skip",
            "showlegend": false,
        })
    };

    let mut data: Vec<Value> = chords.iter().map(|&e| edge(e, "#9ca3af", 2)).collect();
    data.extend(cycle.iter().map(|&e| edge(e, "#2563eb", 5)));
    data.push(json!({
        "type": "scatter",
        "x": nodes.iter().map(|p| p[0]).collect::<Vec<_>>(),
        "y": nodes.iter().map(|p| p[1]).collect::<Vec<_>>(),
        "mode": "markers+text",
        "text": (0..n).map(|i| format!("v{i}")).collect::<Vec<_>>(),
        "textposition": "top center",
        "marker": {"size": 14, "color": "#111827"},
        "name": "Vertices",
    }));

    json!({
        "data": data,
        "layout": {
            "title": "Hamiltonian Graph: highlighted cycle visits each vertex exactly once",
            "xaxis": {"visible": false, "scaleanchor": "y", "scaleratio": 1},
            "yaxis": {"visible": false},
        },
    })
}

fn polar_figure() -> Value {
    let theta: Vec<f64> = (0..=72).map(|i| f64::from(i * 5)).collect();
    let r = map_round(&theta, |deg| 1.0 + deg.to_radians().cos());
    json!({
        "data": [{
            "type": "scatterpolar",
            "r": r,
            "theta": theta,
            "mode": "lines",
            "name": "r = 1 + cos(θ)",
        }],
        "layout": {"title": "Polar coordinates: a cardioid", "polar": {"radialaxis": {"range": [0, 2.2]}}},
    })
}

fn taylor_figure() -> Value {
    let xs = samples(-63..=63, 10.0);
    let taylor = |x: f64, degree: u32| -> f64 {
        let mut term = x;
        let mut sum = x;
        let mut k = 1;
        while k + 2 <= degree {
            term *= -x * x / f64::from((k + 1) * (k + 2));
            sum += term;
            k += 2;
        }
        sum.clamp(-4.0, 4.0)
    };
    let mut data = vec![line(&xs, &map_round(&xs, f64::sin), "sin(x)")];
    for degree in [1, 3, 5] {
        data.push(line(&xs, &map_round(&xs, |x| taylor(x, degree)), &format!("degree {degree}")));
    }
    json!({
        "data": data,
        "layout": {
            "title": "Taylor series: polynomials hugging sin(x) near 0",
            "xaxis": {"title": "x"},
            "yaxis": {"title": "y", "range": [-2, 2]},
        },
    })
}

fn roots_of_unity_figure(n: u32) -> Value {
    let angles: Vec<f64> = (0..n).map(|k| 2.0 * PI * f64::from(k) / f64::from(n)).collect();
    let circle = samples(0..=100, 100.0 / (2.0 * PI));
    let mut xs = map_round(&angles, f64::cos);
    let mut ys = map_round(&angles, f64::sin);
    // close the polygon
    xs.push(1.0);
    ys.push(0.0);
    json!({
        "data": [
            line(&map_round(&circle, f64::cos), &map_round(&circle, f64::sin), "unit circle"),
            {
                "type": "scatter",
                "x": xs,
                "y": ys,
                "mode": "lines+markers+text",
                "text": (0..n).map(|k| format!("ω^{k}")).collect::<Vec<_>>(),
                "textposition": "top right",
                "marker": {"size": 10},
                "name": format!("z^{n} = 1"),
            },
        ],
        "layout": {
            "title": format!("The {n} roots of unity are evenly spaced on the unit circle"),
            "xaxis": {"title": "Re", "scaleanchor": "y", "scaleratio": 1},
            "yaxis": {"title": "Im"},
        },
    })
}

/// Magnitudes of the naive DFT, bins `0..n/2`.
fn dft_magnitudes(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    (0..n / 2)
        .map(|k| {
            let (re, im) = signal.iter().enumerate().fold((0.0, 0.0), |(re, im), (t, &x)| {
                let angle = -2.0 * PI * (k * t) as f64 / n as f64;
                (re + x * angle.cos(), im + x * angle.sin())
            });
            round4((re * re + im * im).sqrt() / n as f64)
        })
        .collect()
}

fn dft_figure() -> Value {
    let n = 64;
    let t: Vec<f64> = (0..n).map(|i| f64::from(i) / f64::from(n)).collect();
    let signal = map_round(&t, |t| (2.0 * PI * 3.0 * t).sin() + 0.5 * (2.0 * PI * 7.0 * t).sin());
    let spectrum = dft_magnitudes(&signal);
    let bins: Vec<usize> = (0..spectrum.len()).collect();
    json!({
        "data": [
            {"type": "scatter", "x": t, "y": signal, "mode": "lines", "name": "signal", "xaxis": "x", "yaxis": "y"},
            {"type": "bar", "x": bins, "y": spectrum, "name": "|X[k]|", "xaxis": "x2", "yaxis": "y2"},
        ],
        "layout": {
            "title": "DFT: a signal and the frequencies inside it",
            "xaxis": {"title": "time", "anchor": "y"},
            "yaxis": {"domain": [0.58, 1.0]},
            "xaxis2": {"title": "frequency bin", "anchor": "y2"},
            "yaxis2": {"domain": [0.0, 0.42]},
        },
    })
}
