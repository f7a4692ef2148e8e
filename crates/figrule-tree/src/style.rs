//! CSS-style extraction from raw design attributes.
//!
//! Covers what rules cannot express on their own because the value is
//! computed: layout (display, padding, size, grid), fills, strokes, effects
//! and text metrics. Values are CSS strings keyed by camelCase property name.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::raw::{RawNode, RawNodeType};

pub type Styles = BTreeMap<String, String>;

/// Extract the style map of `raw`.
///
/// `parent` is the nearest emitted ancestor. Groups are transparent, so a
/// node inside a group sees the group's parent.
pub fn extract_styles(raw: &RawNode, parent: Option<&RawNode>) -> Styles {
    let mut styles = Styles::new();
    layout(raw, parent, &mut styles);
    fills(raw, &mut styles);
    strokes(raw, &mut styles);
    effects(raw, &mut styles);
    text(raw, &mut styles);
    styles
}

// ============================================================================
// Helpers
// ============================================================================

fn num(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

/// Numeric attribute that is present and non-zero.
fn nonzero(value: &Value, key: &str) -> Option<f64> {
    num(value, key).filter(|n| *n != 0.0)
}

fn text_attr<'r>(raw: &'r RawNode, key: &str) -> Option<&'r str> {
    raw.extra.get(key).and_then(Value::as_str)
}

fn num_attr(raw: &RawNode, key: &str) -> Option<f64> {
    raw.extra.get(key).and_then(Value::as_f64)
}

fn nonzero_attr(raw: &RawNode, key: &str) -> Option<f64> {
    num_attr(raw, key).filter(|n| *n != 0.0)
}

fn is_visible(paint: &&Value) -> bool {
    paint.get("visible").and_then(Value::as_bool) != Some(false)
}

fn byte(channel: f64) -> i64 {
    (channel * 255.0).round() as i64
}

fn rgba(color: &Value, alpha: f64) -> Option<String> {
    let (r, g, b) = (num(color, "r")?, num(color, "g")?, num(color, "b")?);
    Some(format!("rgba({}, {}, {}, {alpha})", byte(r), byte(g), byte(b)))
}

/// CSS custom property name for a bound design variable id.
/// `VariableID:abc/12:34` becomes `var-12-34`.
fn css_variable(id: &str) -> String {
    let name = match id
        .strip_prefix("VariableID:")
        .and_then(|rest| rest.rfind('/').map(|i| &rest[i + 1..]))
    {
        Some(tail) => format!("var-{tail}"),
        None => id.to_string(),
    };
    name.replace(':', "-")
}

fn bound_variable<'r>(raw: &'r RawNode, kind: &str) -> Option<&'r str> {
    raw.extra
        .get("boundVariables")?
        .get(kind)?
        .get(0)?
        .get("id")?
        .as_str()
}

fn with_variable(raw: &RawNode, kind: &str, fallback: String) -> String {
    match bound_variable(raw, kind) {
        Some(id) => format!("var(--{}, {fallback})", css_variable(id)),
        None => fallback,
    }
}

fn paint_type(paint: &Value) -> Option<&str> {
    paint.get("type").and_then(Value::as_str)
}

fn paints<'r>(raw: &'r RawNode, key: &str) -> Vec<&'r Value> {
    raw.extra
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter(is_visible).collect())
        .unwrap_or_default()
}

// ============================================================================
// Layout
// ============================================================================

fn layout(raw: &RawNode, parent: Option<&RawNode>, styles: &mut Styles) {
    let mode = text_attr(raw, "layoutMode");

    if mode == Some("GRID") {
        let columns = text_attr(raw, "gridColumnsSizing")
            .map(str::to_string)
            .or_else(|| nonzero_attr(raw, "gridColumnCount").map(|n| format!("repeat({n}, 1fr)")));
        if let Some(columns) = columns {
            styles.insert("gridTemplateColumns".into(), columns);
        }
        let rows = text_attr(raw, "gridRowsSizing")
            .map(str::to_string)
            .or_else(|| nonzero_attr(raw, "gridRowCount").map(|n| format!("repeat({n}, 1fr)")));
        if let Some(rows) = rows {
            styles.insert("gridTemplateRows".into(), rows);
        }
    }

    if matches!(mode, Some("HORIZONTAL") | Some("VERTICAL")) {
        let parent_mode = parent.and_then(|p| text_attr(p, "layoutMode"));
        let display = if parent_mode == mode { "flex" } else { "inline-flex" };
        styles.insert("display".into(), display.into());
    }

    if text_attr(raw, "layoutPositioning") == Some("ABSOLUTE") {
        let parent_box = parent.and_then(|p| p.absolute_bounding_box);
        if let (Some(own), Some(outer)) = (raw.absolute_bounding_box, parent_box) {
            styles.insert("top".into(), format!("{}px", own.y - outer.y));
            styles.insert("left".into(), format!("{}px", own.x - outer.x));
        }
    }

    if let Some(span) = num_attr(raw, "gridRowSpan").filter(|n| *n > 1.0) {
        styles.insert("gridRowEnd".into(), format!("span {span}"));
    }
    if let Some(span) = num_attr(raw, "gridColumnSpan").filter(|n| *n > 1.0) {
        styles.insert("gridColumnEnd".into(), format!("span {span}"));
    }

    let side = |key: &str| nonzero_attr(raw, key);
    let sides = [
        side("paddingTop"),
        side("paddingRight"),
        side("paddingBottom"),
        side("paddingLeft"),
    ];
    if sides.iter().any(Option::is_some) {
        let [t, r, b, l] = sides.map(|s| s.unwrap_or(0.0));
        let padding = if t == b && l == r {
            if t == l {
                format!("{t}px")
            } else {
                format!("{t}px {r}px")
            }
        } else {
            format!("{t}px {r}px {b}px {l}px")
        };
        styles.insert("padding".into(), padding);
    }

    // Rotated nodes report the pre-rotation size in `size`; the bounding box
    // is the rotated envelope.
    let rotated_size = nonzero_attr(raw, "rotation")
        .and(raw.extra.get("size"))
        .and_then(|size| Some((num(size, "x")?, num(size, "y")?)));
    let size = rotated_size.or(raw.absolute_bounding_box.map(|b| (b.width, b.height)));
    if let Some((width, height)) = size {
        styles.insert("width".into(), format!("{width}px"));
        styles.insert("height".into(), format!("{height}px"));
    }
}

// ============================================================================
// Paint
// ============================================================================

fn fills(raw: &RawNode, styles: &mut Styles) {
    let visible = paints(raw, "fills");
    let Some(first) = visible.first() else {
        return;
    };
    let property = if raw.node_type == RawNodeType::Text {
        "color"
    } else {
        "background"
    };

    match paint_type(first) {
        Some("SOLID") => {
            let alpha = num(first, "opacity").unwrap_or(1.0);
            if let Some(color) = first.get("color").and_then(|c| rgba(c, alpha)) {
                styles.insert(property.into(), with_variable(raw, "fills", color));
            }
        }
        Some("GRADIENT_LINEAR") => {
            let Some(stops) = first.get("gradientStops").and_then(Value::as_array) else {
                return;
            };
            let stops: Vec<String> = stops
                .iter()
                .filter_map(|stop| {
                    let color = stop.get("color")?;
                    let rgba = rgba(color, num(color, "a").unwrap_or(1.0))?;
                    let position = (num(stop, "position").unwrap_or(0.0) * 100.0).round();
                    Some(format!("{rgba} {position}%"))
                })
                .collect();
            styles.insert(
                property.into(),
                format!("linear-gradient(180deg, {})", stops.join(", ")),
            );
        }
        Some("IMAGE") => {
            if let Some(image) = first.get("imageRef").and_then(Value::as_str) {
                styles.insert("backgroundImage".into(), format!("url({image})"));
                styles.insert("backgroundSize".into(), "cover".into());
            }
        }
        _ => {}
    }
}

fn strokes(raw: &RawNode, styles: &mut Styles) {
    let Some(stroke) = paints(raw, "strokes").into_iter().next() else {
        return;
    };
    let alpha = num(stroke, "opacity").unwrap_or(1.0);
    let Some(color) = stroke.get("color").and_then(|c| rgba(c, alpha)) else {
        return;
    };
    let weight = nonzero_attr(raw, "strokeWeight").unwrap_or(1.0);
    let color = with_variable(raw, "strokes", color);
    styles.insert("border".into(), format!("{weight}px solid {color}"));
}

fn effects(raw: &RawNode, styles: &mut Styles) {
    let visible = paints(raw, "effects");
    let black = serde_json::json!({ "r": 0, "g": 0, "b": 0 });

    let shadows: Vec<String> = visible
        .iter()
        .filter_map(|effect| {
            let inset = match paint_type(effect) {
                Some("DROP_SHADOW") => "",
                Some("INNER_SHADOW") => "inset ",
                _ => return None,
            };
            let color = effect.get("color").unwrap_or(&black);
            let color = rgba(color, num(color, "a").unwrap_or(1.0))?;
            let offset = effect.get("offset");
            let x = offset.and_then(|o| num(o, "x")).unwrap_or(0.0);
            let y = offset.and_then(|o| num(o, "y")).unwrap_or(0.0);
            let blur = num(effect, "radius").unwrap_or(0.0);
            let spread = num(effect, "spread").unwrap_or(0.0);
            Some(format!("{inset}{x}px {y}px {blur}px {spread}px {color}"))
        })
        .collect();
    if !shadows.is_empty() {
        styles.insert("boxShadow".into(), shadows.join(", "));
    }

    let blur = |wanted: &str| {
        visible
            .iter()
            .find(|effect| paint_type(effect) == Some(wanted))
            .and_then(|effect| nonzero(effect, "radius"))
    };
    if let Some(radius) = blur("LAYER_BLUR") {
        styles.insert("filter".into(), format!("blur({radius}px)"));
    }
    if let Some(radius) = blur("BACKGROUND_BLUR") {
        styles.insert("backdropFilter".into(), format!("blur({radius}px)"));
    }
}

// ============================================================================
// Text
// ============================================================================

fn text(raw: &RawNode, styles: &mut Styles) {
    if raw.node_type != RawNodeType::Text {
        return;
    }
    let Some(style) = raw.extra.get("style").filter(|s| s.is_object()) else {
        return;
    };

    if let Some(family) = style.get("fontFamily").and_then(Value::as_str) {
        styles.insert("fontFamily".into(), family.into());
    }

    let line_height = nonzero(style, "lineHeightPx")
        .map(|px| format!("{px}px"))
        .or_else(|| nonzero(style, "lineHeightPercent").map(|pct| format!("{pct}%")));
    if let Some(line_height) = line_height {
        styles.insert("lineHeight".into(), line_height);
    }

    let vertical = match style.get("textAlignVertical").and_then(Value::as_str) {
        Some("TOP") => Some("top"),
        Some("CENTER") => Some("middle"),
        Some("BOTTOM") => Some("bottom"),
        _ => None,
    };
    if let Some(vertical) = vertical {
        styles.insert("verticalAlign".into(), vertical.into());
    }

    if let Some(spacing) = nonzero(style, "paragraphSpacing") {
        styles.insert("marginBottom".into(), format!("{spacing}px"));
    }
    if let Some(indent) = nonzero(style, "paragraphIndent") {
        styles.insert("textIndent".into(), format!("{indent}px"));
    }

    let solid = paints(raw, "fills")
        .into_iter()
        .find(|fill| paint_type(fill) == Some("SOLID"));
    if let Some(fill) = solid {
        let alpha = num(fill, "opacity").unwrap_or(1.0);
        if let Some(color) = fill.get("color").and_then(|c| rgba(c, alpha)) {
            styles.insert("color".into(), color);
        }
    }
}
