//! Confirmation and welcome email templates.
//!
//! Templates are compiled in. Placeholders use `{{key}}` and are filled from
//! the job's JSON data; values are HTML-escaped in the body and missing keys
//! render as empty strings.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use super::RenderedEmail;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    FounderApplicationReceived,
    InvestorApplicationReceived,
    CareerApplicationReceived,
    NewsletterWelcome,
    WaitlistWelcome,
}

impl TemplateId {
    pub const ALL: [TemplateId; 5] = [
        TemplateId::FounderApplicationReceived,
        TemplateId::InvestorApplicationReceived,
        TemplateId::CareerApplicationReceived,
        TemplateId::NewsletterWelcome,
        TemplateId::WaitlistWelcome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::FounderApplicationReceived => "founder_application_received",
            TemplateId::InvestorApplicationReceived => "investor_application_received",
            TemplateId::CareerApplicationReceived => "career_application_received",
            TemplateId::NewsletterWelcome => "newsletter_welcome",
            TemplateId::WaitlistWelcome => "waitlist_welcome",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateId::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TemplateError::Unknown(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown email template: {0}")]
    Unknown(String),
    #[error("template data must be a JSON object")]
    InvalidData,
}

#[derive(Debug, Clone)]
struct Template {
    subject: &'static str,
    html: &'static str,
}

const FOUNDER_HTML: &str = r#"<h1>Thanks for applying, {{name}}!</h1>
<p>We received the application for <strong>{{company}}</strong>. Our team reviews every submission and will reach out within two weeks.</p>
<p>The Investi team</p>"#;

const INVESTOR_HTML: &str = r#"<h1>Welcome to the Investi network, {{name}}</h1>
<p>Thank you for registering {{firm}} as an investor. We will share curated founder introductions that match your focus.</p>
<p>The Investi team</p>"#;

const CAREER_HTML: &str = r#"<h1>Thanks for applying, {{name}}</h1>
<p>We received your application for the <strong>{{position}}</strong> role and will be in touch if there is a fit.</p>
<p>The Investi team</p>"#;

const NEWSLETTER_HTML: &str = r#"<h1>You're subscribed{{name_suffix}}</h1>
<p>Expect a short update on African startups and the Investi community every month. You can unsubscribe at any time.</p>"#;

const WAITLIST_HTML: &str = r#"<h1>You're on the list</h1>
<p>Thanks for joining the Investi waitlist. We'll email you as soon as your spot opens up.</p>"#;

/// Lookup table from template id to subject/body source.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<TemplateId, Template>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            TemplateId::FounderApplicationReceived,
            Template { subject: "We received your application for {{company}}", html: FOUNDER_HTML },
        );
        templates.insert(
            TemplateId::InvestorApplicationReceived,
            Template { subject: "Welcome to the Investi investor network", html: INVESTOR_HTML },
        );
        templates.insert(
            TemplateId::CareerApplicationReceived,
            Template { subject: "Your application for {{position}}", html: CAREER_HTML },
        );
        templates.insert(
            TemplateId::NewsletterWelcome,
            Template { subject: "Welcome to the Investi newsletter", html: NEWSLETTER_HTML },
        );
        templates.insert(
            TemplateId::WaitlistWelcome,
            Template { subject: "You're on the Investi waitlist", html: WAITLIST_HTML },
        );
        Self { templates }
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `template` for `to` with `data`.
    pub fn render(&self, template: &str, to: &str, data: &Value) -> Result<RenderedEmail, TemplateError> {
        let id: TemplateId = template.parse()?;
        let source = self
            .templates
            .get(&id)
            .ok_or_else(|| TemplateError::Unknown(template.to_string()))?;
        let empty = serde_json::Map::new();
        let vars = match data {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(TemplateError::InvalidData),
        };

        let lookup = |key: &str| -> String {
            match (key, vars.get(key)) {
                (_, Some(v)) => value_text(v),
                // ", Ada" when a name was given, nothing otherwise
                ("name_suffix", None) => vars
                    .get("name")
                    .map(value_text)
                    .filter(|n| !n.is_empty())
                    .map(|n| format!(", {n}"))
                    .unwrap_or_default(),
                _ => String::new(),
            }
        };

        Ok(RenderedEmail {
            to: to.to_string(),
            subject: substitute(source.subject, |k| lookup(k).replace(['\r', '\n'], " ")),
            html: substitute(source.html, |k| escape_html(&lookup(k))),
        })
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace every `{{key}}` in `source`. An unterminated `{{` is kept verbatim.
fn substitute(source: &str, mut value: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                out.push_str(&value(after[..end].trim()));
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_template_id_round_trips_and_is_registered() {
        let registry = TemplateRegistry::new();
        for id in TemplateId::ALL {
            assert_eq!(id.as_str().parse::<TemplateId>().unwrap(), id);
            assert!(registry.render(id.as_str(), "a@example.com", &json!({})).is_ok());
        }
    }

    #[test]
    fn substitutes_and_escapes_body_values() {
        let email = TemplateRegistry::new()
            .render(
                "founder_application_received",
                "ada@example.com",
                &json!({"name": "Ada <script>", "company": "Acme & Co"}),
            )
            .unwrap();

        assert_eq!(email.to, "ada@example.com");
        assert_eq!(email.subject, "We received your application for Acme & Co");
        assert!(email.html.contains("Ada &lt;script&gt;"));
        assert!(email.html.contains("Acme &amp; Co"));
        assert!(!email.html.contains("{{"));
    }

    #[test]
    fn missing_keys_render_empty() {
        let email = TemplateRegistry::new()
            .render("career_application_received", "a@example.com", &json!({"name": "Ada"}))
            .unwrap();
        assert_eq!(email.subject, "Your application for ");
    }

    #[test]
    fn newsletter_greeting_uses_optional_name() {
        let registry = TemplateRegistry::new();
        let named = registry.render("newsletter_welcome", "a@example.com", &json!({"name": "Ada"})).unwrap();
        assert!(named.html.contains("You're subscribed, Ada"));
        let anon = registry.render("newsletter_welcome", "a@example.com", &json!({})).unwrap();
        assert!(anon.html.contains("You're subscribed</h1>"));
    }

    #[test]
    fn unknown_template_and_bad_data_are_errors() {
        let registry = TemplateRegistry::new();
        assert_eq!(
            registry.render("nope", "a@example.com", &json!({})).unwrap_err(),
            TemplateError::Unknown("nope".into())
        );
        assert_eq!(
            registry.render("waitlist_welcome", "a@example.com", &json!([1])).unwrap_err(),
            TemplateError::InvalidData
        );
    }

    #[test]
    fn unterminated_placeholder_is_left_alone() {
        assert_eq!(substitute("a {{b", |_| "x".into()), "a {{b");
        assert_eq!(substitute("{{ k }}!", |k| k.to_uppercase()), "K!");
    }
}
