//! Target templates.

use chunkrun_core::TaskDescriptor;
use chunkrun_engine::{Target, TargetResolver};
use thiserror::Error;

/// Errors in a target template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Unclosed '{{' in target template '{0}'")]
    Unclosed(String),

    #[error("Empty placeholder in target template '{0}'")]
    EmptyPlaceholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Id,
    Param(String),
}

/// Builds a target from a template such as
/// `http://localhost:8080/{id}/{id}_{locale}.html`.
///
/// `{id}` is the task id; any other `{name}` is looked up as a string in the
/// task's params.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    segments: Vec<Segment>,
}

impl TemplateResolver {
    /// Parse a template.
    pub fn new(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| TemplateError::Unclosed(template.to_string()))?;
            let name = after[..close].trim();
            segments.push(match name {
                "" => return Err(TemplateError::EmptyPlaceholder(template.to_string())),
                "id" => Segment::Id,
                other => Segment::Param(other.to_string()),
            });
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }
}

impl TargetResolver for TemplateResolver {
    fn resolve(&self, task: &TaskDescriptor) -> Result<Target, String> {
        let mut target = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => target.push_str(text),
                Segment::Id => target.push_str(task.id.as_str()),
                Segment::Param(name) => {
                    let value = task
                        .param(name)
                        .ok_or_else(|| format!("task '{}' has no parameter '{}'", task.id, name))?;
                    target.push_str(value);
                }
            }
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_and_params() {
        let resolver =
            TemplateResolver::new("http://localhost:8080/{id}/{id}_{locale}.html").unwrap();
        let task = TaskDescriptor::new("friction").with_params(json!({"locale": "en"}));

        assert_eq!(
            resolver.resolve(&task).unwrap(),
            "http://localhost:8080/friction/friction_en.html"
        );
    }

    #[test]
    fn test_plain_id() {
        let resolver = TemplateResolver::new("{id}").unwrap();
        assert_eq!(resolver.resolve(&TaskDescriptor::new("a")).unwrap(), "a");
    }

    #[test]
    fn test_missing_param() {
        let resolver = TemplateResolver::new("{id}?lang={locale}").unwrap();
        let err = resolver.resolve(&TaskDescriptor::new("a")).unwrap_err();
        assert!(err.contains("locale"));
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(
            TemplateResolver::new("http://x/{id"),
            Err(TemplateError::Unclosed(_))
        ));
        assert!(matches!(
            TemplateResolver::new("http://x/{}"),
            Err(TemplateError::EmptyPlaceholder(_))
        ));
    }
}
