use crate::error::NotifyError;
use crate::types::Event;

pub const DEFAULT_BODY: &str = "{\n  \"event\": \"{{.Event}}\",\n  \"configName\": \"{{.ConfigName}}\"\n}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Event,
    ConfigName,
}

/// Request body with `{{.Event}}` and `{{.ConfigName}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyTemplate {
    segments: Vec<Segment>,
}

impl BodyTemplate {
    pub fn parse(source: &str) -> Result<Self, NotifyError> {
        let mut segments = Vec::new();
        let mut rest = source;
        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let after = &rest[open + 2..];
            let close = after
                .find("}}")
                .ok_or_else(|| NotifyError::Template(format!("unterminated placeholder in {:?}", source)))?;
            segments.push(match after[..close].trim() {
                ".Event" => Segment::Event,
                ".ConfigName" => Segment::ConfigName,
                other => {
                    return Err(NotifyError::Template(format!(
                        "unknown placeholder {{{{{}}}}}; use {{{{.Event}}}} or {{{{.ConfigName}}}}",
                        other
                    )))
                }
            });
            rest = &after[close + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, event: Event, config_name: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Event => out.push_str(event.as_str()),
                Segment::ConfigName => out.push_str(config_name),
            }
        }
        out
    }
}

impl Default for BodyTemplate {
    fn default() -> Self {
        Self {
            segments: vec![
                Segment::Text("{\n  \"event\": \"".to_string()),
                Segment::Event,
                Segment::Text("\",\n  \"configName\": \"".to_string()),
                Segment::ConfigName,
                Segment::Text("\"\n}".to_string()),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_body_renders_json() {
        let body = BodyTemplate::default().render(Event::Failure, "home");
        assert_eq!(body, "{\n  \"event\": \"onFailure\",\n  \"configName\": \"home\"\n}");
        assert_eq!(BodyTemplate::parse(DEFAULT_BODY).expect("parse"), BodyTemplate::default());
    }

    #[test]
    fn placeholders_allow_inner_whitespace() {
        let tpl = BodyTemplate::parse("event={{ .Event }}&name={{.ConfigName  }}").expect("parse");
        assert_eq!(tpl.render(Event::Skip, "laptop"), "event=onSkip&name=laptop");
    }

    #[test]
    fn plain_text_passes_through() {
        let tpl = BodyTemplate::parse("no placeholders } here {").expect("parse");
        assert_eq!(tpl.render(Event::Start, "x"), "no placeholders } here {");
    }

    #[test]
    fn bad_templates_are_rejected() {
        assert!(matches!(
            BodyTemplate::parse("{{.Event"),
            Err(NotifyError::Template(_))
        ));
        assert!(matches!(
            BodyTemplate::parse("{{.Hostname}}"),
            Err(NotifyError::Template(_))
        ));
    }
}
