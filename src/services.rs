//! Collaborators consulted during resolution: access control, translation
//! and HTML sanitization.

use std::collections::HashMap;

use serde_json::Value;

use crate::descriptor::SafeHtml;

/// Access-control decision service.
pub trait AccessControl {
    /// Whether the current user satisfies the requirement `token`.
    fn can(&self, token: &Value) -> bool;
}

impl<F> AccessControl for F
where
    F: Fn(&Value) -> bool,
{
    fn can(&self, token: &Value) -> bool {
        self(token)
    }
}

/// Translation lookup.
pub trait Translator {
    fn translate(&self, key: &str) -> String;
}

/// Dictionary lookup; unknown keys translate to themselves.
impl Translator for HashMap<String, String> {
    fn translate(&self, key: &str) -> String {
        self.get(key).cloned().unwrap_or_else(|| key.to_string())
    }
}

/// Turns resolved description text into markup the renderer may inject.
pub trait Sanitizer {
    fn trust_html(&self, text: &str) -> SafeHtml;
}

/// Translator returning every key unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn translate(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Sanitizer that trusts schema descriptions as authored markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustAuthored;

impl Sanitizer for TrustAuthored {
    fn trust_html(&self, text: &str) -> SafeHtml {
        SafeHtml::trusted(text)
    }
}

/// Sanitizer that escapes descriptions so they render as plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscapeText;

impl Sanitizer for EscapeText {
    fn trust_html(&self, text: &str) -> SafeHtml {
        SafeHtml::trusted(v_htmlescape::escape(text).to_string())
    }
}

/// The collaborators for one resolution call.
///
/// Without an access-control service, `acl` requirements never hide a field.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub acl: Option<&'a dyn AccessControl>,
    pub translator: &'a dyn Translator,
    pub sanitizer: &'a dyn Sanitizer,
}

impl Default for Services<'static> {
    fn default() -> Self {
        Self {
            acl: None,
            translator: &KeyTranslator,
            sanitizer: &TrustAuthored,
        }
    }
}

impl<'a> Services<'a> {
    pub fn with_acl(mut self, acl: &'a dyn AccessControl) -> Self {
        self.acl = Some(acl);
        self
    }

    pub fn with_translator(mut self, translator: &'a dyn Translator) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: &'a dyn Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }
}

impl std::fmt::Debug for Services<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("acl", &self.acl.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn closure_acl() {
        let acl = |token: &Value| token == &json!("admin");
        assert!(acl.can(&json!("admin")));
        assert!(!acl.can(&json!("guest")));
    }

    #[test]
    fn dictionary_translator_falls_back_to_key() {
        let mut dict = HashMap::new();
        dict.insert("user.name".to_string(), "Name".to_string());
        assert_eq!(dict.translate("user.name"), "Name");
        assert_eq!(dict.translate("user.age"), "user.age");
    }

    #[test]
    fn escape_text_sanitizer() {
        let html = EscapeText.trust_html("<b>\"a\" & 'b'</b>");
        assert_eq!(
            html.as_str(),
            "&lt;b&gt;&quot;a&quot; &amp; &#x27;b&#x27;&lt;&#x2f;b&gt;"
        );
        assert_eq!(TrustAuthored.trust_html("<b>x</b>").as_str(), "<b>x</b>");
    }
}
