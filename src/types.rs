//! Core types for form schema resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Scalar and container kinds a schema node may declare in `type`.
pub const KNOWN_TYPES: &[&str] = &[
    "string", "number", "integer", "boolean", "object", "array", "null",
];

/// Prefix marking an overlay key as addressing a property (`$name`).
pub const OVERLAY_KEY_PREFIX: char = '$';

/// Overlay key applying to every sibling at one nesting level.
pub const WILDCARD_KEY: &str = "*";

/// Overlay/descriptor slot addressing an array's items.
pub const ITEMS_KEY: &str = "$items";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Overlay key for a property name.
pub fn overlay_key(name: &str) -> String {
    format!("{OVERLAY_KEY_PREFIX}{name}")
}

/// Spatial arrangement of labels and controls across the whole form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Label and control side by side on a 24-unit grid.
    #[default]
    Horizontal,
    /// Label above control.
    Vertical,
    /// Fields flow on one line; grid hints are dropped.
    Inline,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Horizontal => "horizontal",
            Layout::Vertical => "vertical",
            Layout::Inline => "inline",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "horizontal" => Ok(Layout::Horizontal),
            "vertical" => Ok(Layout::Vertical),
            "inline" => Ok(Layout::Inline),
            other => Err(format!(
                "unknown layout \"{other}\": expected horizontal, vertical, or inline"
            )),
        }
    }
}

/// Global presentation options, immutable for one resolution call.
///
/// Deserializes from camelCase JSON with every field optional, so an
/// options file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormOptions {
    /// Partial descriptor applied to nodes declaring a given `format`.
    pub format_map: Map<String, Value>,
    /// Default size hint for every widget.
    pub size: Option<String>,
    /// Global default overlay fragment.
    pub ui: Map<String, Value>,
    pub live_validate: bool,
    /// Autofocus/validate the first field on first render.
    pub first_visual: bool,
    /// Force every descriptor into display-only mode.
    pub only_visual: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            format_map: default_format_map(),
            size: Some("default".to_string()),
            ui: Map::new(),
            live_validate: true,
            first_visual: false,
            only_visual: false,
        }
    }
}

fn default_format_map() -> Map<String, Value> {
    let map = json!({
        "date-time": { "widget": "date", "showTime": true, "format": "yyyy-MM-ddTHH:mm:ssZ" },
        "date": { "widget": "date", "format": "yyyy-MM-dd" },
        "full-date": { "widget": "date", "format": "yyyy-MM-dd" },
        "time": { "widget": "time", "format": "HH:mm:ss.SSS" },
        "full-time": { "widget": "time" },
        "week": { "widget": "date", "mode": "week", "format": "yyyy-ww" },
        "month": { "widget": "date", "mode": "month", "format": "yyyy-MM" },
        "uri": { "widget": "upload" },
        "uri-reference": { "widget": "string" },
        "email": { "widget": "autocomplete", "type": "email" },
        "color": { "widget": "string", "type": "color" },
        "uuid": { "widget": "string" },
        "ipv4": { "widget": "string" },
        "ipv6": { "widget": "string" },
        "hostname": { "widget": "string" },
        "regex": { "widget": "string" },
        "mobile": { "widget": "string" },
        "id-card": { "widget": "string" },
        "": { "widget": "string" }
    });
    match map {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Options for one resolution call.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Global presentation options.
    pub form: FormOptions,
    /// Active layout mode.
    pub layout: Layout,
    /// Partial form values conditionals are evaluated against.
    /// `Null` means only schema defaults are considered.
    pub form_data: Value,
}

impl ResolveOptions {
    /// Create options for a layout with default global options and no data.
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Replace the global presentation options.
    pub fn form_options(mut self, form: FormOptions) -> Self {
        self.form = form;
        self
    }

    /// Set the form data snapshot used for conditional branches.
    pub fn form_data(mut self, data: Value) -> Self {
        self.form_data = data;
        self
    }
}

/// A complete caller-facing resolution request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormRequest {
    pub options: FormOptions,
    pub schema: Value,
    /// Sparse UI overlay tree; `null` is treated as empty.
    pub ui: Value,
    pub form_data: Value,
    pub layout: Layout,
}

impl FormRequest {
    /// Split the request into the per-call resolve options.
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions::new(self.layout)
            .form_options(self.options.clone())
            .form_data(self.form_data.clone())
    }
}
