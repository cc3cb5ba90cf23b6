//! Prompt templates.
//!
//! Templates use `{{variable}}` placeholders. String values are inserted
//! verbatim; any other JSON value is inserted in its compact JSON form.

use crate::error::PromptError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// A named prompt template with an optional system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Template name, used in errors and logs.
    pub name: String,
    /// Template content with placeholders.
    pub content: String,
    /// Optional system prompt template.
    pub system_prompt: Option<String>,
    /// Variable definitions (name -> definition).
    pub variables: HashMap<String, VariableDefinition>,
}

/// Definition of a template variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Description of what this variable is for.
    pub description: String,
    /// Whether this variable is required.
    pub required: bool,
    /// Default value if not provided.
    pub default: Option<JsonValue>,
}

impl VariableDefinition {
    /// Creates a required variable definition.
    #[must_use]
    pub fn required(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// Creates an optional variable definition.
    #[must_use]
    pub fn optional(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            required: false,
            default: None,
        }
    }

    /// Sets a default value.
    #[must_use]
    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }
}

fn value_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PromptTemplate {
    /// Creates a new prompt template.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            system_prompt: None,
            variables: HashMap::new(),
        }
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Adds a variable definition.
    #[must_use]
    pub fn with_variable(
        mut self,
        name: impl Into<String>,
        definition: VariableDefinition,
    ) -> Self {
        self.variables.insert(name.into(), definition);
        self
    }

    /// Single pass over `text`: substituted values are written out as-is and
    /// never scanned for placeholders. Unknown placeholders are kept.
    fn render_text(&self, text: &str, variables: &HashMap<String, JsonValue>) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                rest = &rest[start..];
                break;
            };
            let name = &after[..end];
            let value = variables
                .get(name)
                .or_else(|| self.variables.get(name).and_then(|d| d.default.as_ref()));
            match value {
                Some(value) => result.push_str(&value_text(value)),
                None => result.push_str(&rest[start..start + 2 + end + 2]),
            }
            rest = &after[end + 2..];
        }

        result.push_str(rest);
        result
    }

    /// Renders the template body with the given variables.
    #[must_use]
    pub fn render(&self, variables: &HashMap<String, JsonValue>) -> String {
        self.render_text(&self.content, variables)
    }

    /// Renders the system prompt with the given variables.
    #[must_use]
    pub fn render_system_prompt(&self, variables: &HashMap<String, JsonValue>) -> Option<String> {
        self.system_prompt
            .as_deref()
            .map(|template| self.render_text(template, variables))
    }

    /// Validates that all required variables are provided.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::MissingVariables`] naming every absent variable.
    pub fn validate_variables(
        &self,
        variables: &HashMap<String, JsonValue>,
    ) -> Result<(), PromptError> {
        let mut missing: Vec<String> = self
            .variables
            .iter()
            .filter(|(_, def)| def.required && def.default.is_none())
            .filter(|(name, _)| !variables.contains_key(*name))
            .map(|(name, _)| name.clone())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            missing.sort();
            Err(PromptError::MissingVariables {
                template: self.name.clone(),
                variables: missing,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, JsonValue)]) -> HashMap<String, JsonValue> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn renders_strings_verbatim_and_json_compactly() {
        let template = PromptTemplate::new("dashboard", "Contexto: {{context}}\nContatos: {{contacts}}");
        let rendered = template.render(&vars(&[
            ("context", serde_json::json!("Análise de leads")),
            ("contacts", serde_json::json!([{"id": "1"}])),
        ]));
        assert_eq!(rendered, "Contexto: Análise de leads\nContatos: [{\"id\":\"1\"}]");
    }

    #[test]
    fn applies_defaults_for_missing_variables() {
        let template = PromptTemplate::new("verify", "[Contexto]\n{{context}}")
            .with_variable(
                "context",
                VariableDefinition::optional("Conversation context")
                    .with_default(serde_json::json!("Verificação geral")),
            );
        assert_eq!(template.render(&HashMap::new()), "[Contexto]\nVerificação geral");
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let template = PromptTemplate::new(
            "verify",
            "[Contexto]\n{{context}}\n\n[Prompt]\n{{prompt}}",
        );
        let variables = vars(&[
            ("context", serde_json::json!("{{prompt}}")),
            ("prompt", serde_json::json!("faturamento de {{context}}")),
        ]);
        let expected = "[Contexto]\n{{prompt}}\n\n[Prompt]\nfaturamento de {{context}}";
        assert_eq!(template.render(&variables), expected);
    }

    #[test]
    fn unknown_and_unclosed_placeholders_are_kept() {
        let template = PromptTemplate::new("t", "{{missing}} e {{context}} {{aberto");
        let rendered = template.render(&vars(&[("context", serde_json::json!("vendas"))]));
        assert_eq!(rendered, "{{missing}} e vendas {{aberto");
    }

    #[test]
    fn supplied_value_beats_default() {
        let template = PromptTemplate::new("verify", "{{context}}").with_variable(
            "context",
            VariableDefinition::optional("ctx").with_default(serde_json::json!("padrão")),
        );
        let rendered = template.render(&vars(&[("context", serde_json::json!("vendas"))]));
        assert_eq!(rendered, "vendas");
    }

    #[test]
    fn system_prompt_is_rendered_too() {
        let template = PromptTemplate::new("dashboard", "{{prompt}}")
            .with_system_prompt("Notion: {{notion}}");
        let rendered = template
            .render_system_prompt(&vars(&[("notion", serde_json::json!("Adapta AI"))]))
            .expect("system prompt set");
        assert_eq!(rendered, "Notion: Adapta AI");
    }

    #[test]
    fn validation_reports_all_missing_required_variables() {
        let template = PromptTemplate::new("verify", "{{deals}} {{prompt}} {{context}}")
            .with_variable("deals", VariableDefinition::required("CRM deals"))
            .with_variable("prompt", VariableDefinition::required("User prompt"))
            .with_variable("context", VariableDefinition::optional("Context"));

        let err = template.validate_variables(&HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingVariables {
                template: "verify".to_string(),
                variables: vec!["deals".to_string(), "prompt".to_string()],
            }
        );

        let ok = template.validate_variables(&vars(&[
            ("deals", serde_json::json!("- a")),
            ("prompt", serde_json::json!("b")),
        ]));
        assert!(ok.is_ok());
    }
}
