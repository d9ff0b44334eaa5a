//! UI overlay merge engine - resolves a schema and a sparse UI overlay into
//! a pruned schema plus a descriptor tree mirroring it.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::conditions::resolve_within;
use crate::descriptor::{embedded_layer, layer_at, merge_layers, plain_fields, UiDescriptor, UiLayer};
use crate::error::ResolveError;
use crate::layout;
use crate::property::{display_path, retrieve_schema, Definitions};
use crate::services::Services;
use crate::types::{
    json_type_name, overlay_key, FormRequest, Layout, ResolveOptions, ITEMS_KEY, KNOWN_TYPES,
    WILDCARD_KEY,
};
use crate::visibility;

/// Output of a resolution call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    /// The schema with references expanded, conditionals folded, embedded
    /// `ui` fragments consumed and hidden fields pruned from `required`.
    pub schema: Value,
    /// Descriptor tree; the root descriptor's children are `$name` keyed.
    pub ui: UiDescriptor,
}

/// Resolve a schema and overlay with the default collaborators
/// (no access control, identity translation, authored descriptions trusted).
///
/// The inputs are never mutated; the returned schema is a fresh copy.
///
/// # Errors
///
/// Returns `ResolveError` for missing definitions, unknown types or
/// formats, malformed overlays and malformed conditionals. No partial
/// result is returned on error.
pub fn resolve(
    schema: &Value,
    overlay: &Value,
    options: &ResolveOptions,
) -> Result<Resolved, ResolveError> {
    resolve_with(schema, overlay, options, &Services::default())
}

/// Resolve a schema and overlay with explicit collaborators.
///
/// `overlay` may be `null` (treated as empty) or a mapping whose `$name`
/// keys address properties and whose `*` key seeds the default for every
/// property.
pub fn resolve_with(
    schema: &Value,
    overlay: &Value,
    options: &ResolveOptions,
    services: &Services<'_>,
) -> Result<Resolved, ResolveError> {
    let Value::Object(root) = schema else {
        return Err(ResolveError::InvalidSchema {
            message: format!("root schema must be an object, got {}", json_type_name(schema)),
        });
    };
    let overlay = layer_at(Some(overlay), "/")?;

    let mut engine = Engine {
        options,
        services,
        definitions: Definitions::from_schema(schema),
        active_refs: Vec::new(),
    };
    let mut root = root.clone();
    let ui = engine.resolve_root(&mut root, &overlay)?;

    Ok(Resolved {
        schema: Value::Object(root),
        ui,
    })
}

/// Caller-facing entry point taking a whole request.
pub fn cover(request: &FormRequest, services: &Services<'_>) -> Result<Resolved, ResolveError> {
    resolve_with(
        &request.schema,
        &request.ui,
        &request.resolve_options(),
        services,
    )
}

struct Engine<'a, 's> {
    options: &'a ResolveOptions,
    services: &'a Services<'s>,
    definitions: Definitions,
    /// References expanded on the path from the root to the current node.
    active_refs: Vec<String>,
}

impl Engine<'_, '_> {
    fn resolve_root(
        &mut self,
        root: &mut Map<String, Value>,
        overlay: &UiLayer,
    ) -> Result<UiDescriptor, ResolveError> {
        let options = self.options;
        let data = &options.form_data;
        resolve_within(root, data, &self.definitions, &mut self.active_refs, "")?;

        let embedded = match root.shift_remove("ui") {
            Some(value) => embedded_layer(value, "/ui")?,
            None => UiLayer::new(),
        };
        let wildcard = layer_at(overlay.get(WILDCARD_KEY), "/*")?;
        let mut defaults = merge_layers([
            &self.base_defaults(),
            &options.form.ui,
            &embedded,
            &wildcard,
        ]);
        if options.layout == Layout::Inline {
            defaults.shift_remove("grid");
        }

        let mut descriptor =
            UiDescriptor::from_layer(merge_layers([&defaults, &plain_fields(overlay)]), "")?;
        layout::propagate(&mut descriptor, &UiDescriptor::default(), options.layout);
        self.finish(root, &mut descriptor);

        self.descend(root, overlay, &defaults, &mut descriptor, data, "", "")?;
        Ok(descriptor)
    }

    /// Global options every node starts from.
    fn base_defaults(&self) -> UiLayer {
        let form = &self.options.form;
        let mut layer = UiLayer::new();
        layer.insert("onlyVisual".into(), Value::Bool(form.only_visual));
        if let Some(size) = &form.size {
            layer.insert("size".into(), Value::String(size.clone()));
        }
        layer.insert("liveValidate".into(), Value::Bool(form.live_validate));
        layer.insert("firstVisual".into(), Value::Bool(form.first_visual));
        layer
    }

    /// Resolve one property or items node. `entry` is the caller overlay
    /// addressed at this node, `defaults` the running default descriptor.
    #[allow(clippy::too_many_arguments)]
    fn resolve_node(
        &mut self,
        node: &mut Map<String, Value>,
        entry: &UiLayer,
        defaults: &UiLayer,
        parent: &UiDescriptor,
        data: &Value,
        path: &str,
        ui_path: &str,
    ) -> Result<UiDescriptor, ResolveError> {
        resolve_within(node, data, &self.definitions, &mut self.active_refs, path)?;

        let embedded = node.shift_remove("ui").filter(|v| !v.is_null());
        let has_ui = embedded.is_some();
        let (shorthand, fragment) = match embedded {
            Some(Value::String(widget)) => (Some(widget), UiLayer::new()),
            Some(value) => (None, plain_fields(&embedded_layer(value, &format!("{path}/ui"))?)),
            None => (None, UiLayer::new()),
        };

        let computed = self.computed_layer(node, shorthand, has_ui, path)?;
        let merged = merge_layers([&computed, defaults, &fragment, &plain_fields(entry)]);
        let mut descriptor = UiDescriptor::from_layer(merged, ui_path)?;

        layout::propagate(&mut descriptor, parent, self.options.layout);
        self.finish(node, &mut descriptor);
        visibility::gate(&mut descriptor, self.services.acl);
        debug!(
            path = display_path(path),
            widget = ?descriptor.widget,
            hidden = descriptor.hidden,
            "resolved node"
        );

        let child_defaults = match entry.get(WILDCARD_KEY) {
            Some(wildcard) => {
                let wildcard = layer_at(Some(wildcard), &format!("{ui_path}/*"))?;
                merge_layers([defaults, &wildcard])
            }
            None => defaults.clone(),
        };
        self.descend(node, entry, &child_defaults, &mut descriptor, data, path, ui_path)?;
        Ok(descriptor)
    }

    /// Layers 1-4: the widget implied by the node itself.
    fn computed_layer(
        &self,
        node: &Map<String, Value>,
        shorthand: Option<String>,
        has_ui: bool,
        path: &str,
    ) -> Result<UiLayer, ResolveError> {
        let mut layer = UiLayer::new();

        if let Some(kind) = node_type(node, path)? {
            layer.insert("widget".into(), Value::String(kind.to_string()));
        }

        let format = node.get("format").and_then(Value::as_str);
        if let Some(format) = format {
            let mapped = self.options.form.format_map.get(format).ok_or_else(|| {
                ResolveError::UnknownFormat {
                    path: path.to_string(),
                    format: format.to_string(),
                }
            })?;
            let Value::Object(mapped) = mapped else {
                return Err(ResolveError::InvalidSchema {
                    message: format!("formatMap entry \"{format}\" must be an object"),
                });
            };
            layer.extend(mapped.clone());
        }

        if let Some(widget) = shorthand {
            layer.insert("widget".into(), Value::String(widget));
        }

        let has_enum = node
            .get("enum")
            .and_then(Value::as_array)
            .is_some_and(|values| !values.is_empty());
        if format.is_none() && !has_ui && has_enum {
            layer.insert("widget".into(), Value::String("select".into()));
        }

        Ok(layer)
    }

    /// Post-merge adjustments shared by every node: forced display-only
    /// mode, help normalization and localization.
    fn finish(&self, node: &mut Map<String, Value>, descriptor: &mut UiDescriptor) {
        if self.options.form.only_visual {
            descriptor
                .extra
                .insert("onlyVisual".into(), Value::Bool(true));
        }

        let translator = self.services.translator;
        descriptor.optional_help = descriptor.optional_help.take().and_then(|mut help| {
            if let Some(key) = &help.i18n {
                help.text = translator.translate(key);
            }
            (!help.text.is_empty()).then_some(help)
        });

        if let Some(key) = &descriptor.i18n {
            node.insert("title".into(), Value::String(translator.translate(key)));
        }
        if let Some(key) = &descriptor.description_i18n {
            node.insert("description".into(), Value::String(translator.translate(key)));
        }
        if let Some(text) = node
            .get("description")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        {
            descriptor.description_html = Some(self.services.sanitizer.trust_html(text));
        }
    }

    /// Recurse into array items and object properties of a resolved node.
    #[allow(clippy::too_many_arguments)]
    fn descend(
        &mut self,
        node: &mut Map<String, Value>,
        entry: &UiLayer,
        defaults: &UiLayer,
        descriptor: &mut UiDescriptor,
        data: &Value,
        path: &str,
        ui_path: &str,
    ) -> Result<(), ResolveError> {
        if let Some(items) = node.get("items").filter(|items| items.is_object()) {
            let items_path = format!("{path}/items");
            let items_ui_path = format!("{ui_path}/{ITEMS_KEY}");
            let items_entry = layer_at(entry.get(ITEMS_KEY), &items_ui_path)?;

            let expanded = retrieve_schema(items, &self.definitions, &items_path)?;
            self.enter(&expanded.refs, &items_path)?;
            let mut items = expanded.node;
            let items_ui = self.resolve_node(
                &mut items,
                &items_entry,
                defaults,
                descriptor,
                &Value::Null,
                &items_path,
                &items_ui_path,
            )?;
            self.leave(&expanded.refs);

            node.insert("items".into(), Value::Object(items));
            descriptor.items = Some(Box::new(items_ui));
        }

        let Some(properties) = node.get_mut("properties").and_then(Value::as_object_mut) else {
            return Ok(());
        };

        let keys: Vec<String> = properties.keys().cloned().collect();
        let mut hidden: Vec<String> = Vec::new();

        for key in keys {
            let prop_path = format!("{path}/properties/{key}");
            let ui_key = overlay_key(&key);
            let child_ui_path = format!("{ui_path}/{ui_key}");
            let child_entry = layer_at(entry.get(&ui_key), &child_ui_path)?;

            let Some(raw) = properties.get(&key) else {
                continue;
            };
            let expanded = retrieve_schema(raw, &self.definitions, &prop_path)?;
            self.enter(&expanded.refs, &prop_path)?;
            let mut property = expanded.node;
            let child_data = data.get(&key).unwrap_or(&Value::Null);
            let mut child = self.resolve_node(
                &mut property,
                &child_entry,
                defaults,
                descriptor,
                child_data,
                &prop_path,
                &child_ui_path,
            )?;
            self.leave(&expanded.refs);

            if child.widget.as_deref() == Some("date") {
                if let Some(end) = child.end.clone() {
                    if end != key && properties.contains_key(&end) {
                        if let Some(resolved) = descriptor.child_mut(&end) {
                            // Declared before the start field: patch in place.
                            resolved.widget = child.widget.clone();
                            resolved.hidden = true;
                            hidden.push(end);
                        } else if let Some(Value::Object(end_node)) = properties.get_mut(&end) {
                            couple_date_end(end_node, &child, &prop_path)?;
                        }
                    } else {
                        warn!(
                            path = display_path(&prop_path),
                            end = end.as_str(),
                            "date range end field not found, clearing reference"
                        );
                        child.end = None;
                    }
                }
            }

            if child.hidden {
                hidden.push(key.clone());
            }
            properties.insert(key, Value::Object(property));
            descriptor.children.insert(ui_key, child);
        }

        let pruned = visibility::prune_required(node, &hidden);
        if pruned > 0 {
            debug!(path = display_path(path), pruned, "pruned hidden fields from required");
        }
        Ok(())
    }

    fn enter(&mut self, refs: &[String], path: &str) -> Result<(), ResolveError> {
        if let Some(reference) = refs.iter().find(|r| self.active_refs.contains(*r)) {
            return Err(ResolveError::CircularReference {
                path: path.to_string(),
                reference: reference.clone(),
            });
        }
        self.active_refs.extend(refs.iter().cloned());
        Ok(())
    }

    fn leave(&mut self, refs: &[String]) {
        let depth = self.active_refs.len().saturating_sub(refs.len());
        self.active_refs.truncate(depth);
    }
}

/// Make the end-of-range sibling a hidden date field managed by `start`.
fn couple_date_end(
    end_node: &mut Map<String, Value>,
    start: &UiDescriptor,
    path: &str,
) -> Result<(), ResolveError> {
    let mut layer = match end_node.shift_remove("ui") {
        Some(value) => embedded_layer(value, &format!("{path}/ui"))?,
        None => UiLayer::new(),
    };
    if let Some(widget) = &start.widget {
        layer.insert("widget".into(), Value::String(widget.clone()));
    }
    layer.insert("hidden".into(), Value::Bool(true));
    end_node.insert("ui".into(), Value::Object(layer));
    Ok(())
}

/// The node's declared `type`, validated. For a type list the first
/// non-`null` entry wins.
fn node_type<'n>(node: &'n Map<String, Value>, path: &str) -> Result<Option<&'n str>, ResolveError> {
    let unknown = |value: String| ResolveError::UnknownType {
        path: path.to_string(),
        value,
    };
    match node.get("type") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(kind)) => {
            if KNOWN_TYPES.contains(&kind.as_str()) {
                Ok(Some(kind.as_str()))
            } else {
                Err(unknown(kind.clone()))
            }
        }
        Some(Value::Array(kinds)) => {
            let mut chosen = None;
            for kind in kinds {
                let Some(kind) = kind.as_str().filter(|k| KNOWN_TYPES.contains(k)) else {
                    return Err(unknown(kind.to_string()));
                };
                if chosen.is_none() && kind != "null" {
                    chosen = Some(kind);
                }
            }
            Ok(chosen.or_else(|| kinds.first().and_then(Value::as_str)))
        }
        Some(other) => Err(unknown(json_type_name(other).to_string())),
    }
}
