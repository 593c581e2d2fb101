use super::error::ClientError;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    fn parse(action: &str, source: &str) -> Result<Self, ClientError> {
        let malformed = |reason: &str| ClientError::MalformedTemplate {
            action: action.to_string(),
            reason: format!("{reason} in '{source}'"),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(malformed("unterminated placeholder")),
                            Some(ch) => name.push(ch),
                        }
                    }
                    if name.is_empty() {
                        return Err(malformed("empty placeholder"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name));
                }
                '}' => return Err(malformed("unmatched '}'")),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    fn render(&self, action: &str, fields: &BTreeMap<String, String>) -> Result<String, ClientError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = fields.get(name).ok_or_else(|| ClientError::MissingPlaceholder {
                        action: action.to_string(),
                        placeholder: name.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Named URL templates for one client instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSet {
    templates: BTreeMap<String, Template>,
}

impl EndpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, template: &str) -> Result<(), ClientError> {
        if self.templates.contains_key(name) {
            return Err(ClientError::DuplicateEndpoint(name.to_string()));
        }
        let parsed = Template::parse(name, template)?;
        self.templates.insert(name.to_string(), parsed);
        Ok(())
    }

    pub fn with(mut self, name: &str, template: &str) -> Result<Self, ClientError> {
        self.register(name, template)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn template(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(|t| t.source.as_str())
    }

    /// Placeholder names the template of `name` requires, in order of appearance.
    pub fn placeholders(&self, name: &str) -> Result<Vec<&str>, ClientError> {
        let template = self.lookup(name)?;
        Ok(template
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Field(field) => Some(field.as_str()),
                Segment::Literal(_) => None,
            })
            .collect())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn render(&self, name: &str, fields: &BTreeMap<String, String>) -> Result<String, ClientError> {
        self.lookup(name)?.render(name, fields)
    }

    fn lookup(&self, name: &str) -> Result<&Template, ClientError> {
        self.templates
            .get(name)
            .ok_or_else(|| ClientError::UnknownAction(name.to_string()))
    }
}
