//! Prompt parameter extraction from Templater documents.
//!
//! Templates declare their inputs with calls such as
//! `<% tp.user.promptArg("topic", "What to write about") %>`. The extractor
//! scans every tag, parses its script as an ES module, and collects the calls
//! whose callee is exactly `tp.user.promptArg` with string-literal arguments.

use once_cell::sync::Lazy;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Argument, CallExpression, Expression};
use oxc_ast::visit::walk;
use oxc_ast::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::mcp::contract::{ArgumentShape, Field, FieldKind};

static START_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<%[*+\-_]*").expect("invalid start tag regex"));
static END_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_]*%>").expect("invalid end tag regex"));

/// Deepest bracket nesting handed to the parser. Deeper scripts are skipped
/// rather than risking the stack.
const MAX_NESTING: usize = 32;

/// One declared template input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Absent means optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl PromptParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }
}

/// Why a tag's script was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("script nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("{0}")]
    Syntax(String),
}

/// Extract `tp.user.promptArg` parameters in document order.
///
/// Tags whose script fails to parse are logged and skipped. Duplicates are
/// kept.
pub fn parse_template_parameters(content: &str) -> Vec<PromptParameter> {
    let mut parameters = Vec::new();

    for part in START_TAG.split(content) {
        let Some(end) = END_TAG.find(part) else {
            continue;
        };
        let code = part[..end.start()].trim();

        match parse_script(code) {
            Ok(found) => parameters.extend(found),
            Err(e) => warn!(code = %code, "Error parsing template code: {}", e),
        }
    }

    parameters
}

/// Parse one tag body and collect its prompt parameters.
fn parse_script(code: &str) -> Result<Vec<PromptParameter>, ParseError> {
    if nesting_depth(code) > MAX_NESTING {
        return Err(ParseError::TooDeep(MAX_NESTING));
    }

    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, code, SourceType::default().with_module(true)).parse();
    if let Some(error) = parsed.errors.first() {
        return Err(ParseError::Syntax(error.to_string()));
    }
    if parsed.panicked {
        return Err(ParseError::Syntax("unrecoverable syntax error".into()));
    }

    let mut collector = PromptArgCollector::default();
    collector.visit_program(&parsed.program);
    Ok(collector.parameters)
}

/// Maximum depth of `(`, `[` and `{` in `code`. Stray closers are ignored.
fn nesting_depth(code: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    for c in code.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

#[derive(Default)]
struct PromptArgCollector {
    parameters: Vec<PromptParameter>,
}

impl<'a> Visit<'a> for PromptArgCollector {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Some(parameter) = prompt_parameter(call) {
            self.parameters.push(parameter);
        }
        walk::walk_call_expression(self, call);
    }
}

/// The parameter declared by `call`, if it is `tp.user.promptArg("name", ...)`
/// with only string-literal arguments.
fn prompt_parameter(call: &CallExpression<'_>) -> Option<PromptParameter> {
    let Expression::StaticMemberExpression(method) = &call.callee else {
        return None;
    };
    let Expression::StaticMemberExpression(namespace) = &method.object else {
        return None;
    };
    let Expression::Identifier(object) = &namespace.object else {
        return None;
    };
    if object.name.as_str() != "tp"
        || namespace.property.name.as_str() != "user"
        || method.property.name.as_str() != "promptArg"
    {
        return None;
    }

    let literals = call
        .arguments
        .iter()
        .map(|arg| match arg {
            Argument::StringLiteral(literal) => Some(literal.value.as_str()),
            _ => None,
        })
        .collect::<Option<Vec<&str>>>()?;
    let (name, rest) = literals.split_first()?;

    let mut parameter = PromptParameter::new(*name);
    if let Some(description) = rest.first().filter(|d| !d.is_empty()) {
        parameter.description = Some((*description).to_string());
    }
    Some(parameter)
}

/// Argument shape for a template's `arguments` record.
///
/// Every parameter is a string, optional unless marked required. A repeated
/// name keeps its last declaration.
pub fn build_template_arguments_shape(parameters: &[PromptParameter]) -> ArgumentShape {
    let mut fields: Vec<Field> = Vec::new();
    for parameter in parameters {
        let field = if parameter.is_required() {
            Field::required(parameter.name.clone(), FieldKind::string())
        } else {
            Field::optional(parameter.name.clone(), FieldKind::string())
        };
        match fields.iter_mut().find(|f| f.name == parameter.name) {
            Some(existing) => *existing = field,
            None => fields.push(field),
        }
    }
    fields.into_iter().fold(ArgumentShape::new(), ArgumentShape::with)
}
