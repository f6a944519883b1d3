use crate::core::models::CanonicalPath;
use crate::core::options::ProcessOption;
use crate::utils::{Logger, NeuterError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use thiserror::Error;

// `<%= expr %>` interpolates raw, `<%- expr %>` HTML-escapes
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<%([=-])([\s\S]*?)%>").unwrap());

static DOTTED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*|\.\d+)*$").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("{name} is not defined")]
    UnknownName { name: String },

    #[error("Unsupported template expression: {expression}")]
    UnsupportedExpression { expression: String },
}

/// Interpolate `values` into every placeholder of `template`.
///
/// Placeholders name a value by dotted path (`<%= app.version %>`). `<% %>`
/// evaluate blocks are not placeholders and are kept verbatim.
pub fn render(template: &str, values: &Map<String, Value>) -> std::result::Result<String, TemplateError> {
    let mut failure = None;

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        if failure.is_some() {
            return String::new();
        }
        match interpolate(&caps[2], values) {
            Ok(text) if &caps[1] == "-" => escape_html(&text),
            Ok(text) => text,
            Err(err) => {
                failure = Some(err);
                String::new()
            }
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(rendered.into_owned()),
    }
}

fn interpolate(expression: &str, values: &Map<String, Value>) -> std::result::Result<String, TemplateError> {
    let expression = expression.trim();
    if !DOTTED_NAME.is_match(expression) {
        return Err(TemplateError::UnsupportedExpression {
            expression: expression.to_string(),
        });
    }

    let mut segments = expression.split('.');
    let root = segments.next().unwrap_or_default();
    let mut value = values.get(root).ok_or_else(|| TemplateError::UnknownName {
        name: root.to_string(),
    })?;

    for segment in segments {
        value = match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(|| TemplateError::UnknownName {
            name: expression.to_string(),
        })?;
    }

    Ok(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Apply the configured processing to one module's text.
pub fn process_module(process: &ProcessOption, path: &CanonicalPath, content: &str) -> Result<String> {
    Logger::processing_module(path.as_str());

    match process {
        ProcessOption::Values(values) => {
            render(content, values).map_err(|err| NeuterError::processing(path.clone(), Box::new(err)))
        }
        ProcessOption::Function(processor) => processor
            .process(path, content)
            .map_err(|err| NeuterError::processing(path.clone(), err)),
    }
}
