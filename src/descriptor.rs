//! Resolved UI descriptors and the partial overlay layers they are merged from.
//!
//! Overlays and embedded `ui` fragments are sparse JSON mappings ("layers").
//! A descriptor is built by merging an ordered list of layers field by
//! field, later layers winning, and then lifting the fields the engine
//! reasons about into typed slots. Widget-specific fields the engine does
//! not interpret are carried through untouched in [`UiDescriptor::extra`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::types::{json_type_name, overlay_key, OVERLAY_KEY_PREFIX, WILDCARD_KEY};

/// A sparse, partial descriptor as written by callers or embedded in schemas.
pub type UiLayer = Map<String, Value>;

/// Merge layers field by field; later layers override earlier ones.
///
/// Shallow: a field holding a mapping is replaced, not merged into.
pub fn merge_layers<'a, I>(layers: I) -> UiLayer
where
    I: IntoIterator<Item = &'a UiLayer>,
{
    let mut merged = UiLayer::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Fields of an overlay entry that describe the node itself, without the
/// `$child`, `$items` and `*` addressing keys.
pub fn plain_fields(layer: &UiLayer) -> UiLayer {
    layer
        .iter()
        .filter(|(key, _)| !key.starts_with(OVERLAY_KEY_PREFIX) && key.as_str() != WILDCARD_KEY)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Read an overlay entry that must be a mapping when present.
pub(crate) fn layer_at(value: Option<&Value>, path: &str) -> Result<UiLayer, ResolveError> {
    match value {
        None | Some(Value::Null) => Ok(UiLayer::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(ResolveError::InvalidOverlay {
            path: path.to_string(),
            expected: "object",
            actual: json_type_name(other).to_string(),
        }),
    }
}

/// Read an embedded `ui` fragment as a layer; a string is a widget name.
pub(crate) fn embedded_layer(value: Value, path: &str) -> Result<UiLayer, ResolveError> {
    match value {
        Value::Null => Ok(UiLayer::new()),
        Value::String(widget) => {
            let mut layer = UiLayer::new();
            layer.insert("widget".to_string(), Value::String(widget));
            Ok(layer)
        }
        Value::Object(map) => Ok(map),
        other => Err(ResolveError::InvalidOverlay {
            path: path.to_string(),
            expected: "string or object",
            actual: json_type_name(&other).to_string(),
        }),
    }
}

/// Sanitized HTML a renderer may inject without further escaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SafeHtml(String);

impl SafeHtml {
    /// Wrap markup that has already been vetted by a sanitizer.
    pub fn trusted(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Structured help shown next to a field label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionalHelp {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i18n: Option<String>,
    pub icon: String,
    pub placement: String,
    pub trigger: String,
    pub mouse_enter_delay: f64,
    pub mouse_leave_delay: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for OptionalHelp {
    fn default() -> Self {
        Self {
            text: String::new(),
            i18n: None,
            icon: "question-circle".to_string(),
            placement: "top".to_string(),
            trigger: "hover".to_string(),
            mouse_enter_delay: 0.15,
            mouse_leave_delay: 0.1,
            extra: Map::new(),
        }
    }
}

impl OptionalHelp {
    /// Normalize a raw `optionalHelp` value: a string is shorthand for
    /// `{ text }`, a mapping is filled in with defaults.
    pub fn from_value(value: Value, path: &str) -> Result<Option<Self>, ResolveError> {
        match value {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(Self {
                text,
                ..Self::default()
            })),
            Value::Object(map) => serde_json::from_value(Value::Object(map))
                .map(Some)
                .map_err(|e| ResolveError::InvalidOverlay {
                    path: path.to_string(),
                    expected: "optional help mapping",
                    actual: e.to_string(),
                }),
            other => Err(ResolveError::InvalidOverlay {
                path: path.to_string(),
                expected: "string or object",
                actual: json_type_name(&other).to_string(),
            }),
        }
    }
}

/// Fully resolved presentation decision for one schema node.
///
/// The tree of descriptors mirrors the resolved schema: object properties
/// appear under `$name` keys, array items under `$items`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_label: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_control: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_control: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_label_fixed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<Value>,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i18n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_i18n: Option<String>,
    /// Sibling property managed as the end of a date range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional_help: Option<OptionalHelp>,
    #[serde(rename = "_description", skip_serializing_if = "Option::is_none")]
    pub description_html: Option<SafeHtml>,
    /// Widget-specific fields passed through as given.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(rename = "$items", skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<UiDescriptor>>,
    /// Child descriptors keyed by overlay key (`$name`), in declaration order.
    #[serde(flatten)]
    pub children: IndexMap<String, UiDescriptor>,
}

impl UiDescriptor {
    /// Lift a merged layer into a descriptor.
    ///
    /// `hidden` resolves to `false` unless the layer holds a boolean.
    pub fn from_layer(mut layer: UiLayer, path: &str) -> Result<Self, ResolveError> {
        let mut descriptor = UiDescriptor {
            widget: take_string(&mut layer, "widget", path)?,
            span_label: take_span(&mut layer, "spanLabel", path)?,
            span_control: take_span(&mut layer, "spanControl", path)?,
            offset_control: take_span(&mut layer, "offsetControl", path)?,
            span_label_fixed: take_span(&mut layer, "spanLabelFixed", path)?,
            grid: take_present(&mut layer, "grid"),
            hidden: matches!(layer.shift_remove("hidden"), Some(Value::Bool(true))),
            acl: take_present(&mut layer, "acl"),
            i18n: take_string(&mut layer, "i18n", path)?,
            description_i18n: take_string(&mut layer, "descriptionI18n", path)?,
            end: take_string(&mut layer, "end", path)?,
            ..UiDescriptor::default()
        };
        if let Some(help) = layer.shift_remove("optionalHelp") {
            descriptor.optional_help =
                OptionalHelp::from_value(help, &format!("{path}/optionalHelp"))?;
        }
        layer.shift_remove("_description");
        descriptor.extra = layer;
        Ok(descriptor)
    }

    /// Descriptor of a direct child property.
    pub fn child(&self, name: &str) -> Option<&UiDescriptor> {
        self.children.get(&overlay_key(name))
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut UiDescriptor> {
        self.children.get_mut(&overlay_key(name))
    }

    /// Descriptor of an array's items.
    pub fn items(&self) -> Option<&UiDescriptor> {
        self.items.as_deref()
    }

    /// Depth-first visit of this descriptor and every nested one.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a UiDescriptor)) {
        visit(self);
        if let Some(items) = &self.items {
            items.walk(visit);
        }
        for child in self.children.values() {
            child.walk(visit);
        }
    }
}

fn take_present(layer: &mut UiLayer, key: &str) -> Option<Value> {
    layer.shift_remove(key).filter(|v| !v.is_null())
}

fn take_string(layer: &mut UiLayer, key: &str, path: &str) -> Result<Option<String>, ResolveError> {
    match layer.shift_remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(ResolveError::InvalidOverlay {
            path: format!("{path}/{key}"),
            expected: "string",
            actual: json_type_name(&other).to_string(),
        }),
    }
}

fn take_span(layer: &mut UiLayer, key: &str, path: &str) -> Result<Option<u32>, ResolveError> {
    match layer.shift_remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ResolveError::InvalidOverlay {
                path: format!("{path}/{key}"),
                expected: "non-negative integer",
                actual: n.to_string(),
            }),
        Some(other) => Err(ResolveError::InvalidOverlay {
            path: format!("{path}/{key}"),
            expected: "non-negative integer",
            actual: json_type_name(&other).to_string(),
        }),
    }
}
