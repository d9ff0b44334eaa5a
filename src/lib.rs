//! Schema Form Resolver
//!
//! Merges a JSON Schema form definition with a sparse UI overlay into a
//! fully resolved descriptor tree that a renderer can consume directly.
//!
//! Every property's widget and presentation settings come from a layered
//! merge of type-implied widgets, format mappings, global options, the
//! schema's embedded `ui` fragments and the caller's overlay. Along the
//! way references are expanded, `if`/`then`/`else` conditionals are folded
//! against the form data, layout spans are propagated and hidden fields are
//! pruned from `required`.
//!
//! # Example
//!
//! ```
//! use sf_schema::{resolve, Layout, ResolveOptions};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "name": { "type": "string" },
//!         "born": { "type": "string", "format": "date" },
//!         "notes": { "type": "string", "ui": { "hidden": true } }
//!     },
//!     "required": ["name", "notes"]
//! });
//! let overlay = json!({ "$name": { "widget": "autocomplete" } });
//!
//! let options = ResolveOptions::new(Layout::Horizontal);
//! let resolved = resolve(&schema, &overlay, &options).unwrap();
//!
//! let name = resolved.ui.child("name").unwrap();
//! assert_eq!(name.widget.as_deref(), Some("autocomplete"));
//! assert_eq!(resolved.ui.child("born").unwrap().widget.as_deref(), Some("date"));
//!
//! // Hidden fields are no longer required
//! assert_eq!(resolved.schema["required"], json!(["name"]));
//! ```
//!
//! # Precedence
//!
//! Lowest to highest, later layers overwrite earlier ones key by key:
//!
//! | Layer | Source |
//! |-------|--------|
//! | 1 | `{ widget: <type> }` |
//! | 2 | `formatMap[format]` |
//! | 3 | `ui: "<widget>"` shorthand |
//! | 4 | `select` for enums without format or embedded `ui` |
//! | 5 | running defaults (global options, `*` wildcards) |
//! | 6 | embedded `ui` fragment |
//! | 7 | caller overlay entry (`$name`) |

mod conditions;
mod descriptor;
mod error;
mod layout;
mod loader;
mod property;
mod readiness;
mod resolver;
mod services;
mod types;
mod validator;
mod visibility;

pub use conditions::{candidate_data, resolve_conditions};
pub use descriptor::{merge_layers, plain_fields, OptionalHelp, SafeHtml, UiDescriptor, UiLayer};
pub use error::{LoadError, ResolveError, SchemaError, ValidateError};
pub use layout::{propagate, DEFAULT_SPAN_CONTROL, DEFAULT_SPAN_LABEL};
pub use loader::{is_url, load_schema, load_schema_auto, load_schema_str, load_typed};
pub use property::{retrieve_schema, Definitions, Expanded};
pub use readiness::{LoadStatus, Notify, ReadinessTracker, ScriptLoader, ValidatorProvider};
pub use resolver::{cover, resolve, resolve_with, Resolved};
pub use services::{
    AccessControl, EscapeText, KeyTranslator, Sanitizer, Services, Translator, TrustAuthored,
};
pub use types::{
    overlay_key, FormOptions, FormRequest, Layout, ResolveOptions, ITEMS_KEY, WILDCARD_KEY,
};
pub use validator::{
    validate, validate_against_schema, validate_form, validate_with, BundledValidator,
};
pub use visibility::{gate, prune_required};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
