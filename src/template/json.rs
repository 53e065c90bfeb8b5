//! JSON template documents, as exchanged with a template library service.

use serde::{Deserialize, Serialize};

use crate::dialect::rspql;
use crate::error::TemplateError;
use crate::parser::parse_query;
use crate::prefixes::PrefixMapping;
use crate::term::Term;

use super::registry::resolve_handle;
use super::{ArgumentDecl, Template};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    pub id: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDocument {
    pub var_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl TemplateDocument {
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        serde_json::from_str(json).map_err(|e| TemplateError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, TemplateError> {
        serde_json::to_string_pretty(self).map_err(|e| TemplateError::Json(e.to_string()))
    }

    /// Builds the template, resolving a short id against `namespace`.
    pub fn into_template(self, namespace: &str, prefixes: &PrefixMapping) -> Result<Template, TemplateError> {
        if self.id.trim().is_empty() {
            return Err(TemplateError::MissingField("id"));
        }
        if self.query.trim().is_empty() {
            return Err(TemplateError::MissingField("query"));
        }
        let handle = resolve_handle(&self.id, namespace, prefixes)?;
        let body = parse_query(&self.query)?;
        let mut template = Template::new(body, &handle)?;
        template.label = self.label;
        template.comment = self.comment;
        for parameter in self.parameters {
            template.add_argument_constraint_with(
                ArgumentDecl {
                    var_name: parameter.var_name,
                    value_type: parameter.value_type,
                    default_value: parameter.default_value,
                    optional: parameter.optional,
                    label: parameter.label,
                    comment: parameter.comment,
                },
                prefixes,
            )?;
        }
        Ok(template)
    }

    pub fn from_template(template: &Template) -> Result<Self, TemplateError> {
        let parameters = template
            .arguments()
            .iter()
            .map(|a| ParameterDocument {
                var_name: a.var_name.clone(),
                value_type: a.value_type.as_ref().map(|t| t.as_str().to_string()),
                default_value: a.default_value.as_ref().map(raw_value),
                optional: a.optional,
                label: a.label.clone(),
                comment: a.comment.clone(),
            })
            .collect();
        Ok(Self {
            id: template.handle().as_str().to_string(),
            query: rspql::to_native_string(template.body())?,
            label: template.label.clone(),
            comment: template.comment.clone(),
            parameters,
        })
    }
}

/// The raw string a default value was read from.
fn raw_value(term: &Term) -> String {
    match term {
        Term::Iri(n) => n.as_str().to_string(),
        Term::Literal(l) => l.value().to_string(),
        Term::Variable(v) => format!("?{}", v.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "id": "speeding",
        "query": "PREFIX ex: <http://ex.org/> SELECT ?car FROM NAMED WINDOW ex:w ON ex:traffic [RANGE ?range STEP PT1S] WHERE { WINDOW ex:w { ?car ex:speed ?v FILTER(?v > ?limit) } }",
        "label": "Speeding cars",
        "parameters": [
            { "varName": "range", "valueType": "xsd:duration", "defaultValue": "PT30S", "optional": true },
            { "varName": "limit", "valueType": "xsd:integer", "label": "Speed limit" }
        ]
    }"#;

    #[test]
    fn test_document_to_template() {
        let template = TemplateDocument::from_json(DOCUMENT)
            .unwrap()
            .into_template("http://ex.org/templates/", &PrefixMapping::with_defaults())
            .unwrap();
        assert_eq!(template.handle().as_str(), "http://ex.org/templates/speeding");
        assert_eq!(template.label(), Some("Speeding cars"));
        assert_eq!(template.arguments().len(), 2);
        assert_eq!(template.argument("limit").and_then(|a| a.label.as_deref()), Some("Speed limit"));
        assert!(!template.argument("limit").unwrap().optional);

        let exported = TemplateDocument::from_template(&template).unwrap();
        assert_eq!(exported.id, "http://ex.org/templates/speeding");
        assert_eq!(exported.parameters[1].default_value.as_deref(), Some("PT30S"));
        let reimported = TemplateDocument::from_json(&exported.to_json().unwrap())
            .unwrap()
            .into_template("http://other.org/", &PrefixMapping::with_defaults())
            .unwrap();
        assert_eq!(reimported, template);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            TemplateDocument::from_json("{\"query\": \"SELECT * WHERE {}\"}"),
            Err(TemplateError::Json(_))
        ));
        let doc = TemplateDocument::from_json(r#"{"id": "", "query": "SELECT * WHERE {}"}"#).unwrap();
        assert_eq!(
            doc.into_template("http://ex.org/", &PrefixMapping::new()),
            Err(TemplateError::MissingField("id"))
        );
        let doc = TemplateDocument::from_json(r#"{"id": "bad id!", "query": "SELECT * WHERE {}"}"#).unwrap();
        assert!(matches!(
            doc.into_template("http://ex.org/", &PrefixMapping::new()),
            Err(TemplateError::Construction(_))
        ));
    }
}
