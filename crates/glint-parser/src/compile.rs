//! Template compiler.
//!
//! Converts the temporary tree of a parsed file into finalized
//! [`TemplateElement`]s: attributes are split into plain, `set:`, `if`, `for`
//! and `for_join`; component invocations get their props bound and their
//! definition's body compiled in place.

use crate::ast::{Attribute, ComponentElement, Directives, TagElement, TemplateElement};
use crate::parser::{TempAttribute, TempElement, TempNode};
use crate::registry::{ComponentId, Registry};
use crate::ParseError;

/// Tags that render their body only.
const FRAGMENT_TAGS: &[&str] = &["text", "fragment", ""];

pub struct Compiler<'a> {
    registry: &'a Registry,
    keep_comment_prefix: &'a str,
    /// Components currently being expanded.
    stack: Vec<ComponentId>,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a Registry, keep_comment_prefix: &'a str) -> Self {
        Self {
            registry,
            keep_comment_prefix,
            stack: Vec::new(),
        }
    }

    /// Compile the nodes of `file`.
    pub fn compile(
        &mut self,
        nodes: &[TempNode],
        file: &str,
    ) -> Result<Vec<TemplateElement>, ParseError> {
        tracing::debug!(file, nodes = nodes.len(), "compiling template");
        self.compile_nodes(nodes, file)
    }

    fn compile_nodes(
        &mut self,
        nodes: &[TempNode],
        file: &str,
    ) -> Result<Vec<TemplateElement>, ParseError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                TempNode::Text(text) => out.push(TemplateElement::Text(text.clone())),
                TempNode::Clause(clause) => out.push(TemplateElement::Clause(clause.clone())),
                TempNode::Doctype(text) => out.push(TemplateElement::Doctype(text.clone())),
                TempNode::Comment(text) => {
                    if text.trim_start().starts_with(self.keep_comment_prefix) {
                        out.push(TemplateElement::Comment(text.clone()));
                    }
                }
                TempNode::Element(element) => out.push(self.compile_element(element, file)?),
            }
        }
        Ok(out)
    }

    fn compile_element(
        &mut self,
        element: &TempElement,
        file: &str,
    ) -> Result<TemplateElement, ParseError> {
        let error = |message: String| ParseError::new(message, file, element.loc);

        let fragment = element.component.is_none() && FRAGMENT_TAGS.contains(&element.name.as_str());
        let mut set_attributes = Vec::new();
        let mut attributes = Vec::new();
        let mut directives = Directives::default();

        for attr in &element.attributes {
            match attr {
                TempAttribute::Set { name, value } => set_attributes.push(Attribute {
                    name: name.clone(),
                    value: value.clone(),
                }),
                TempAttribute::If(clause) => {
                    if directives.if_clause.is_some() {
                        return Err(error(one_clause_message("if")));
                    }
                    directives.if_clause = Some(clause.clone());
                }
                TempAttribute::For { names, clause } => {
                    if directives.for_clause.is_some() {
                        return Err(error(one_clause_message("for")));
                    }
                    directives.for_clause = Some(clause.clone());
                    directives.for_names = names.clone();
                }
                TempAttribute::Plain { name, value } if name == "for_join" => {
                    directives.for_join = Some(value.clone());
                }
                TempAttribute::Plain { name, value } => {
                    if fragment {
                        return Err(error(format!(
                            "standard attributes (like \"{name}\") make no sense with <{}> elements",
                            element.name
                        )));
                    }
                    attributes.push(Attribute {
                        name: name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }

        let body = self.compile_nodes(&element.body, file)?;

        let Some(id) = element.component else {
            return Ok(TemplateElement::Tag(TagElement {
                name: element.name.clone(),
                loc: element.loc,
                fragment,
                self_closing: element.self_closing,
                attributes,
                set_attributes,
                body,
                directives,
            }));
        };

        let registry = self.registry;
        let Some(definition) = registry.definition(id) else {
            return Err(error(format!(
                "component reference \"{}\" was not resolved",
                element.name
            )));
        };
        if !set_attributes.is_empty() {
            return Err(error(
                "\"set:\" style attributes are not permitted on components".into(),
            ));
        }
        if self.stack.contains(&id) {
            return Err(error(format!(
                "component \"{}\" is used within its own body",
                element.name
            )));
        }

        let props = definition
            .props
            .iter()
            .map(|prop| {
                let value = attributes
                    .iter()
                    .find(|attr| attr.name == prop.name)
                    .map(|attr| attr.value.clone())
                    .or_else(|| prop.default.clone())
                    .ok_or_else(|| {
                        error(format!(
                            "required property \"{}\" omitted when calling {}",
                            prop.name, element.name
                        ))
                    })?;
                Ok(Attribute {
                    name: prop.name.clone(),
                    value,
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        self.stack.push(id);
        let component_body = self.compile_nodes(&definition.body, &definition.file);
        self.stack.pop();

        Ok(TemplateElement::Component(ComponentElement {
            name: element.name.clone(),
            loc: element.loc,
            props,
            directives,
            body: component_body?,
            children: if body.is_empty() { None } else { Some(body) },
            source_file: definition.file.clone(),
            source_loc: definition.loc,
        }))
    }
}

fn one_clause_message(attr: &str) -> String {
    format!("one clause is required as the value for \"{attr}\" attributes, found more than one")
}
