use std::sync::LazyLock;

use chrono::Utc;
use regex::{Captures, Regex};

use crate::error::{GeneratorError, GeneratorErrorKind};
use crate::job::JobId;
use crate::options::Options;

static RE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());

/// Placeholders every template may use regardless of `Options::vars`.
pub const BUILTIN_PLACEHOLDERS: &[&str] = &["id", "output_directory", "date"];

/// A command argument with `{name}` placeholders, rendered once per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTemplate {
    raw: String,
}

impl ArgTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        RE_PLACEHOLDER
            .captures_iter(&self.raw)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
    }

    /// Placeholders that are neither built in nor present in `options`.
    pub fn unknown_placeholders<'a>(&'a self, options: &'a Options) -> Vec<&'a str> {
        self.placeholders()
            .filter(|name| !BUILTIN_PLACEHOLDERS.contains(name) && options.var(name).is_none())
            .collect()
    }

    pub fn render(&self, id: &JobId, options: &Options) -> Result<String, GeneratorError> {
        let mut missing: Option<String> = None;
        let rendered = RE_PLACEHOLDER.replace_all(&self.raw, |caps: &Captures| {
            let name = &caps[1];
            match name {
                "id" => id.to_string(),
                "output_directory" => options.output_directory.display().to_string(),
                "date" => Utc::now().format("%Y-%m-%d").to_string(),
                _ => match options.var(name) {
                    Some(value) => value.to_string(),
                    None => {
                        missing.get_or_insert_with(|| name.to_string());
                        caps[0].to_string()
                    }
                },
            }
        });

        match missing {
            Some(name) => Err(GeneratorError::new(
                GeneratorErrorKind::Template,
                format!("unknown placeholder '{{{}}}' in '{}'", name, self.raw),
            )),
            None => Ok(rendered.into_owned()),
        }
    }
}
