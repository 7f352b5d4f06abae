//! `format` checkers.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use url::Url;

/// A named format assertion.
///
/// Only strings are checked by the built-in formats; other JSON types always
/// match.
pub trait Format: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, value: &Value) -> bool;
}

/// A string format backed by a plain function
pub struct StringFormat {
    name: String,
    check: fn(&str) -> bool,
}

impl StringFormat {
    pub fn new(name: impl Into<String>, check: fn(&str) -> bool) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl Format for StringFormat {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => (self.check)(s),
            _ => true,
        }
    }
}

#[derive(Default, Clone)]
pub struct FormatRegistry {
    formats: HashMap<String, Arc<dyn Format>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, fn(&str) -> bool); 19] = [
            ("date", is_date),
            ("time", is_time),
            ("date-time", is_date_time),
            ("duration", is_duration),
            ("uuid", is_uuid),
            ("uri", is_uri),
            ("uri-reference", is_uri_reference),
            ("iri", is_uri),
            ("iri-reference", is_uri_reference),
            ("uri-template", is_uri_template),
            ("ipv4", |s| s.parse::<Ipv4Addr>().is_ok()),
            ("ipv6", |s| s.parse::<Ipv6Addr>().is_ok()),
            ("email", is_email),
            ("idn-email", is_email),
            ("hostname", is_hostname),
            ("idn-hostname", is_idn_hostname),
            ("regex", |s| Regex::new(s).is_ok()),
            ("json-pointer", is_json_pointer),
            ("relative-json-pointer", is_relative_json_pointer),
        ];
        for (name, check) in builtins {
            registry.register(StringFormat::new(name, check));
        }
        registry
    }

    pub fn register(&mut self, format: impl Format + 'static) {
        self.formats
            .insert(format.name().to_string(), Arc::new(format));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Format>> {
        self.formats.get(name)
    }
}

fn time_regex() -> &'static Regex {
    static TIME: OnceLock<Regex> = OnceLock::new();
    TIME.get_or_init(|| {
        Regex::new(r"^(?i)\d{2}:\d{2}:\d{2}(\.\d+)?(z|[+-]\d{2}:\d{2})$")
            .expect("Failed to compile time regex")
    })
}

fn duration_regex() -> &'static Regex {
    static DURATION: OnceLock<Regex> = OnceLock::new();
    DURATION.get_or_init(|| {
        Regex::new(r"^P(?:\d+W|(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+S)?)?)$")
            .expect("Failed to compile duration regex")
    })
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+$").expect("Failed to compile email regex")
    })
}

fn hostname_label_regex() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .expect("Failed to compile hostname regex")
    })
}

fn is_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_time(s: &str) -> bool {
    time_regex().is_match(s) && DateTime::parse_from_rfc3339(&format!("1970-01-01T{}", s)).is_ok()
}

fn is_date_time(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_duration(s: &str) -> bool {
    if !duration_regex().is_match(s) || s == "P" || s.ends_with('T') {
        return false;
    }
    true
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36 && uuid::Uuid::parse_str(s).is_ok()
}

fn is_uri(s: &str) -> bool {
    Url::parse(s).is_ok()
}

fn is_uri_reference(s: &str) -> bool {
    if s.contains(|c: char| c.is_whitespace() || c == '\\') {
        return false;
    }
    Url::parse("https://example.invalid/")
        .map(|base| base.join(s).is_ok())
        .unwrap_or(false)
}

fn is_uri_template(s: &str) -> bool {
    let mut open = false;
    for c in s.chars() {
        match c {
            '{' if open => return false,
            '{' => open = true,
            '}' if !open => return false,
            '}' => open = false,
            _ => {}
        }
    }
    !open
}

fn is_email(s: &str) -> bool {
    email_regex().is_match(s)
}

fn is_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    !s.is_empty()
        && s.len() <= 253
        && s.split('.').all(|label| hostname_label_regex().is_match(label))
}

fn is_idn_hostname(s: &str) -> bool {
    if s.is_ascii() {
        return is_hostname(s);
    }
    !s.is_empty()
        && s.split('.').all(|label| {
            !label.is_empty()
                && label.chars().count() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

fn is_json_pointer(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    s.starts_with('/') && valid_pointer_escapes(s)
}

fn valid_pointer_escapes(s: &str) -> bool {
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0') | Some('1')) {
            return false;
        }
    }
    true
}

fn is_relative_json_pointer(s: &str) -> bool {
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || (digits > 1 && s.starts_with('0')) {
        return false;
    }
    let rest = &s[digits..];
    rest == "#" || is_json_pointer(rest)
}
