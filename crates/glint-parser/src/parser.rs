//! Template file parser for glint.
//!
//! Reads the markup events of one file (from `glint-lexer`) into a temporary
//! tree of [`TempNode`]s. Along the way it:
//!
//! - registers `<template name="...">` definitions and self-closing
//!   `<template name="..." path="..."/>` references in the shared [`Registry`],
//! - checks that capitalized tags name a known component,
//! - classifies attributes into plain, `set:`, `if:` and `for:` forms,
//! - builds a `Clause` for every bound attribute and `{{ ... }}` interpolation.
//!
//! Referenced components are resolved afterwards by the loader.

use glint_lexer::{Event, EventKind, Scanner};
use indexmap::IndexMap;

use crate::ast::{Clause, Location, Segment};
use crate::expr_parser::ExprParser;
use crate::registry::{ComponentEntry, ComponentId, Definition, PropDecl, Registry};
use crate::{ParseError, SyntaxError};

/// Attribute names that only make sense with a trailing colon.
const RESERVED_NAMES: &[&str] = &["set", "for", "if"];

/// A node of the temporary tree built while parsing one file.
#[derive(Debug, Clone, PartialEq)]
pub enum TempNode {
    Text(String),
    Clause(Clause),
    Comment(String),
    Doctype(String),
    Element(TempElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TempElement {
    pub name: String,
    pub loc: Location,
    pub self_closing: bool,
    pub attributes: Vec<TempAttribute>,
    pub body: Vec<TempNode>,
    /// Set when the tag invokes a component.
    pub component: Option<ComponentId>,
}

/// An attribute after classification by name.
#[derive(Debug, Clone, PartialEq)]
pub enum TempAttribute {
    /// `name="text {{ clause }}"` or `name:="clause"`
    Plain { name: String, value: Vec<Segment> },
    /// `set:name:="clause"`
    Set { name: String, value: Vec<Segment> },
    /// `if:="clause"`
    If(Clause),
    /// `for:="clause"`, `for:a:b:="clause"`
    For { names: Vec<String>, clause: Clause },
}

/// The result of parsing one file.
#[derive(Debug)]
pub struct ParsedFile {
    pub file: String,
    pub body: Vec<TempNode>,
    /// Components visible in this file, by name.
    pub components: IndexMap<String, ComponentId>,
}

enum Frame {
    Root(Vec<TempNode>),
    Element(TempElement),
    Definition(ComponentId, Vec<TempNode>),
    /// A self-closing `<template/>` waiting for its close event.
    Reference,
}

/// Parser state for a single template file.
pub struct FileParser<'r> {
    file: String,
    registry: &'r mut Registry,
    components: IndexMap<String, ComponentId>,
    frames: Vec<Frame>,
}

impl<'r> FileParser<'r> {
    pub fn new(file: impl Into<String>, registry: &'r mut Registry) -> Self {
        Self {
            file: file.into(),
            registry,
            components: IndexMap::new(),
            frames: vec![Frame::Root(Vec::new())],
        }
    }

    /// Parse the source of this file.
    pub fn parse(mut self, source: &str) -> Result<ParsedFile, ParseError> {
        tracing::debug!(file = %self.file, "parsing template file");

        let events = Scanner::scan(source).map_err(|e| ParseError {
            message: e.message,
            file: self.file.clone(),
            line: e.line,
            column: e.column,
        })?;

        for event in events {
            self.on_event(event)?;
        }

        match (self.frames.pop(), self.frames.is_empty()) {
            (Some(Frame::Root(body)), true) => Ok(ParsedFile {
                file: self.file,
                body,
                components: self.components,
            }),
            _ => Err(ParseError::new(
                "unclosed elements at end of file",
                self.file,
                Location::default(),
            )),
        }
    }

    fn on_event(&mut self, event: Event) -> Result<(), ParseError> {
        let loc = Location::new(event.span.line, event.span.column);
        match event.kind {
            EventKind::OpenTag {
                name,
                attributes,
                self_closing,
            } => self.on_open_tag(name, attributes, self_closing, loc),
            EventKind::CloseTag(_) => self.on_close_tag(loc),
            EventKind::Text(text) => {
                let segments = split_interpolations(&text).map_err(|e| self.syntax_error(e, loc))?;
                for segment in segments {
                    self.push_node(match segment {
                        Segment::Text(text) => TempNode::Text(text),
                        Segment::Clause(clause) => TempNode::Clause(clause),
                    });
                }
                Ok(())
            }
            EventKind::Comment(text) => {
                self.push_node(TempNode::Comment(text));
                Ok(())
            }
            EventKind::Doctype(text) => {
                self.push_node(TempNode::Doctype(text));
                Ok(())
            }
            // attributes arrive with the complete open tag
            EventKind::OpenTagStart(_) | EventKind::Attribute(_) => Ok(()),
        }
    }

    fn on_open_tag(
        &mut self,
        name: String,
        attributes: Vec<glint_lexer::Attribute>,
        self_closing: bool,
        loc: Location,
    ) -> Result<(), ParseError> {
        if name.eq_ignore_ascii_case("template") {
            return self.on_template(attributes, self_closing, loc);
        }

        let component = if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            let Some(&id) = self.components.get(&name) else {
                return Err(self.error(
                    format!(
                        "\"{name}\" appears to be a component and is not defined or imported in this file. \
                         Either define the component or, if you meant to refer to a standard HTML tag, \
                         use the lower case name."
                    ),
                    loc,
                ));
            };
            self.registry.mark_used(id);
            Some(id)
        } else {
            None
        };

        let attributes = attributes
            .into_iter()
            .map(|attr| self.prepare_attribute(attr, loc))
            .collect::<Result<Vec<_>, _>>()?;

        self.frames.push(Frame::Element(TempElement {
            name,
            loc,
            self_closing,
            attributes,
            body: Vec::new(),
            component,
        }));
        Ok(())
    }

    fn on_close_tag(&mut self, loc: Location) -> Result<(), ParseError> {
        match self.frames.pop() {
            Some(Frame::Element(element)) => self.push_node(TempNode::Element(element)),
            Some(Frame::Definition(id, body)) => self.registry.set_body(id, body),
            Some(Frame::Reference) => {}
            Some(root @ Frame::Root(_)) => {
                self.frames.push(root);
                return Err(self.error("no parent found, malformed markup", loc));
            }
            None => return Err(self.error("no parent found, malformed markup", loc)),
        }
        Ok(())
    }

    /// `<template>` defines a component, or references one when self-closing.
    fn on_template(
        &mut self,
        attributes: Vec<glint_lexer::Attribute>,
        self_closing: bool,
        loc: Location,
    ) -> Result<(), ParseError> {
        let mut component_name = None;
        let mut path = None;
        let mut props = Vec::new();

        for attr in attributes {
            match attr.name.as_str() {
                "name" | "id" => component_name = Some(attr.value),
                "path" => path = Some(attr.value),
                name => props.push(self.prepare_prop(name, attr.value, loc)?),
            }
        }

        let Some(name) = component_name else {
            return Err(self.error(
                "\"name\" or \"id\" is required for \"<template>\" elements when creating components",
                loc,
            ));
        };
        if !is_component_name(&name) {
            return Err(self.error(
                format!(
                    "invalid component name \"{name}\": component names must be CamelCase, \
                     start with a capital and contain only letters and numbers"
                ),
                loc,
            ));
        }
        if self.components.contains_key(&name) {
            return Err(self.error(format!("component \"{name}\" already defined"), loc));
        }

        if self_closing {
            let id = self.registry.insert(ComponentEntry::Reference { path, used: false });
            self.components.insert(name, id);
            self.frames.push(Frame::Reference);
        } else {
            let id = self.registry.insert(ComponentEntry::Definition(Definition {
                props,
                body: Vec::new(),
                file: self.file.clone(),
                loc,
            }));
            self.components.insert(name, id);
            self.frames.push(Frame::Definition(id, Vec::new()));
        }
        Ok(())
    }

    /// `title=""` is required, `title="x"` defaults to text, `title:="x"` defaults to a clause.
    fn prepare_prop(&self, name: &str, value: String, loc: Location) -> Result<PropDecl, ParseError> {
        let (prop_name, bound) = match name.strip_suffix(':') {
            Some(stripped) => (stripped, true),
            None => (name, false),
        };
        if prop_name.is_empty() || prop_name.contains(':') || RESERVED_NAMES.contains(&prop_name) {
            return Err(self.error(
                format!("\"{name}\" is not allowed as a component property name"),
                loc,
            ));
        }

        let default = if value.is_empty() {
            None
        } else if bound {
            Some(vec![Segment::Clause(self.build(&value, loc)?)])
        } else {
            Some(vec![Segment::Text(value)])
        };
        Ok(PropDecl {
            name: prop_name.to_string(),
            default,
        })
    }

    fn prepare_attribute(
        &self,
        attr: glint_lexer::Attribute,
        loc: Location,
    ) -> Result<TempAttribute, ParseError> {
        let glint_lexer::Attribute { name, value, .. } = attr;

        if !name.contains(':') {
            if RESERVED_NAMES.contains(&name.as_str()) {
                return Err(self.error(
                    format!(
                        "\"{name}\" is an illegal name, you might have missed a colon at the end of the name"
                    ),
                    loc,
                ));
            }
            let value = split_interpolations(&value).map_err(|e| self.syntax_error(e, loc))?;
            return Ok(TempAttribute::Plain { name, value });
        }

        if let Some(rest) = name.strip_prefix("set:") {
            let set_name = rest.trim_end_matches(':');
            if set_name.is_empty() || set_name.contains(':') {
                return Err(self.error(format!("invalid \"set:\" attribute name \"{name}\""), loc));
            }
            return Ok(TempAttribute::Set {
                name: set_name.to_string(),
                value: vec![Segment::Clause(self.build(&value, loc)?)],
            });
        }

        if name.starts_with("if:") {
            return Ok(TempAttribute::If(self.build(&value, loc)?));
        }

        if let Some(rest) = name.strip_prefix("for:") {
            let names: Vec<String> = if rest.is_empty() {
                vec!["item".to_string()]
            } else {
                rest.trim_end_matches(':').split(':').map(String::from).collect()
            };
            if names.iter().any(String::is_empty) {
                return Err(self.error(
                    format!("empty names are not allowed in \"for\" expressions, got {names:?}"),
                    loc,
                ));
            }
            return Ok(TempAttribute::For {
                names,
                clause: self.build(&value, loc)?,
            });
        }

        match name.strip_suffix(':') {
            Some("") => Err(self.error(format!("invalid attribute name \"{name}\""), loc)),
            Some(bound) => Ok(TempAttribute::Plain {
                name: bound.to_string(),
                value: vec![Segment::Clause(self.build(&value, loc)?)],
            }),
            // namespaced markup such as `xlink:href` stays literal
            None => {
                let value = split_interpolations(&value).map_err(|e| self.syntax_error(e, loc))?;
                Ok(TempAttribute::Plain { name, value })
            }
        }
    }

    fn build(&self, expression: &str, loc: Location) -> Result<Clause, ParseError> {
        ExprParser::parse(expression).map_err(|e| self.syntax_error(e, loc))
    }

    fn push_node(&mut self, node: TempNode) {
        match self.frames.last_mut() {
            Some(Frame::Root(body) | Frame::Definition(_, body)) => body.push(node),
            Some(Frame::Element(element)) => element.body.push(node),
            Some(Frame::Reference) | None => {}
        }
    }

    fn error(&self, message: impl Into<String>, loc: Location) -> ParseError {
        ParseError::new(message, self.file.clone(), loc)
    }

    fn syntax_error(&self, error: SyntaxError, loc: Location) -> ParseError {
        self.error(error.message, loc)
    }
}

/// Component names match `^[A-Z][a-zA-Z0-9]+$`.
pub fn is_component_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && name.len() > 1
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// Split text into literal runs and `{{ clause }}` interpolations.
///
/// Quoted strings inside an interpolation may contain `}}`.
pub fn split_interpolations(text: &str) -> Result<Vec<Segment>, SyntaxError> {
    let mut segments = Vec::new();
    let mut rest = 0;

    while let Some(offset) = text[rest..].find("{{") {
        let open = rest + offset;
        if open > rest {
            segments.push(Segment::Text(text[rest..open].to_string()));
        }

        let body = open + 2;
        let Some(close) = find_interpolation_end(&text[body..]) else {
            let position = text[..open].chars().count();
            return Err(SyntaxError {
                message: format!(
                    "\"{{{{\" at position {} is not closed with \"}}}}\"",
                    position + 1
                ),
                position,
            });
        };

        segments.push(Segment::Clause(ExprParser::parse(&text[body..body + close])?));
        rest = body + close + 2;
    }

    if rest < text.len() {
        segments.push(Segment::Text(text[rest..].to_string()));
    }
    Ok(segments)
}

/// Byte offset of the `}}` closing an interpolation, skipping quoted strings.
fn find_interpolation_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'}' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
                _ => {}
            },
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Var;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> (ParsedFile, Registry) {
        let mut registry = Registry::new();
        let parsed = FileParser::new("test.html", &mut registry).parse(source).unwrap();
        (parsed, registry)
    }

    fn parse_err(source: &str) -> ParseError {
        let mut registry = Registry::new();
        FileParser::new("test.html", &mut registry).parse(source).unwrap_err()
    }

    fn element(node: &TempNode) -> &TempElement {
        match node {
            TempNode::Element(element) => element,
            other => panic!("expected element, got {other:?}"),
        }
    }

    fn var(symbol: &str) -> Clause {
        Clause::Var(Var::new(symbol))
    }

    // ===================================================================
    // Interpolation
    // ===================================================================

    #[test]
    fn test_split_plain_text() {
        assert_eq!(
            split_interpolations("hello").unwrap(),
            vec![Segment::Text("hello".into())]
        );
        assert_eq!(split_interpolations("").unwrap(), vec![]);
    }

    #[test]
    fn test_split_interpolations() {
        assert_eq!(
            split_interpolations("hello {{ foo }}!").unwrap(),
            vec![
                Segment::Text("hello ".into()),
                Segment::Clause(var("foo")),
                Segment::Text("!".into()),
            ]
        );
        assert_eq!(
            split_interpolations("{{a}}{{b}}").unwrap(),
            vec![Segment::Clause(var("a")), Segment::Clause(var("b"))]
        );
    }

    #[test]
    fn test_split_braces_inside_string() {
        assert_eq!(
            split_interpolations("{{ '}}' }}").unwrap(),
            vec![Segment::Clause(Clause::Str("}}".into()))]
        );
        assert_eq!(
            split_interpolations(r#"{{ "a\"}}" }}"#).unwrap(),
            vec![Segment::Clause(Clause::Str("a\"}}".into()))]
        );
    }

    #[test]
    fn test_split_unclosed() {
        let err = split_interpolations("x {{ foo").unwrap_err();
        assert!(err.message.contains("not closed"), "{}", err.message);
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_split_bad_clause() {
        assert!(split_interpolations("{{ 1 + }}").is_err());
    }

    // ===================================================================
    // Elements and attributes
    // ===================================================================

    #[test]
    fn test_elements_and_text() {
        let (parsed, _) = parse("<div>hello {{ foo }}</div>");
        assert_eq!(parsed.body.len(), 1);
        let div = element(&parsed.body[0]);
        assert_eq!(div.name, "div");
        assert_eq!(div.loc, Location::new(1, 1));
        assert_eq!(
            div.body,
            vec![TempNode::Text("hello ".into()), TempNode::Clause(var("foo"))]
        );
    }

    #[test]
    fn test_multiple_roots() {
        let (parsed, _) = parse("<a></a><b/>");
        assert_eq!(parsed.body.len(), 2);
        assert!(element(&parsed.body[1]).self_closing);
    }

    #[test]
    fn test_attribute_kinds() {
        let (parsed, _) = parse(
            r#"<div class="x {{ y }}" title:="t" set:spam:="pie()" if:="ok" for:a:b:="items"></div>"#,
        );
        let div = element(&parsed.body[0]);
        assert_eq!(div.attributes.len(), 5);
        assert_eq!(
            div.attributes[0],
            TempAttribute::Plain {
                name: "class".into(),
                value: vec![Segment::Text("x ".into()), Segment::Clause(var("y"))],
            }
        );
        assert_eq!(
            div.attributes[1],
            TempAttribute::Plain {
                name: "title".into(),
                value: vec![Segment::Clause(var("t"))],
            }
        );
        assert!(matches!(&div.attributes[2], TempAttribute::Set { name, .. } if name == "spam"));
        assert_eq!(div.attributes[3], TempAttribute::If(var("ok")));
        assert_eq!(
            div.attributes[4],
            TempAttribute::For {
                names: vec!["a".into(), "b".into()],
                clause: var("items"),
            }
        );
    }

    #[test]
    fn test_for_names() {
        let (parsed, _) = parse(r#"<i for:="xs"></i><i for:key:value="obj"></i>"#);
        let names = |node: &TempNode| match &element(node).attributes[0] {
            TempAttribute::For { names, .. } => names.clone(),
            other => panic!("expected for, got {other:?}"),
        };
        assert_eq!(names(&parsed.body[0]), vec!["item".to_string()]);
        assert_eq!(names(&parsed.body[1]), vec!["key".to_string(), "value".to_string()]);
    }

    #[test]
    fn test_for_empty_name() {
        let err = parse_err(r#"<i for:a::b:="xs"></i>"#);
        assert!(err.message.contains("empty names"), "{}", err.message);
    }

    #[test]
    fn test_reserved_attribute_names() {
        let err = parse_err(r#"<div if="x"></div>"#);
        assert!(err.message.contains("missed a colon"), "{}", err.message);
        assert!(parse_err(r#"<div :="x"></div>"#).message.contains("invalid attribute name"));
    }

    #[test]
    fn test_namespaced_attribute_is_literal() {
        let (parsed, _) = parse(r##"<use xlink:href="#icon"/>"##);
        assert_eq!(
            element(&parsed.body[0]).attributes[0],
            TempAttribute::Plain {
                name: "xlink:href".into(),
                value: vec![Segment::Text("#icon".into())],
            }
        );
    }

    #[test]
    fn test_clause_error_carries_location() {
        let err = parse_err("<p>\n  <b if:=\"1 +\"></b></p>");
        assert_eq!(err.file, "test.html");
        assert_eq!((err.line, err.column), (2, 3));
    }

    #[test]
    fn test_markup_error_carries_location() {
        let err = parse_err("<div>\n<span></div>");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_comments_and_doctype() {
        let (parsed, _) = parse("<!DOCTYPE html><!-- note --><html></html>");
        assert_eq!(parsed.body[0], TempNode::Doctype(" html".into()));
        assert_eq!(parsed.body[1], TempNode::Comment(" note ".into()));
    }

    // ===================================================================
    // Components
    // ===================================================================

    #[test]
    fn test_component_definition() {
        let (parsed, registry) = parse(indoc! {r#"
            <template name="Card" title="" size="small" count:="1">
              <b>{{ title }}</b>
            </template>
            <Card title="x"/>
        "#});

        let id = parsed.components["Card"];
        let definition = registry.definition(id).unwrap();
        assert_eq!(definition.file, "test.html");
        assert_eq!(definition.loc, Location::new(1, 1));
        assert_eq!(
            definition.props,
            vec![
                PropDecl {
                    name: "title".into(),
                    default: None
                },
                PropDecl {
                    name: "size".into(),
                    default: Some(vec![Segment::Text("small".into())])
                },
                PropDecl {
                    name: "count".into(),
                    default: Some(vec![Segment::Clause(Clause::Num(1.0))])
                },
            ]
        );
        assert!(definition.body.iter().any(|n| matches!(n, TempNode::Element(e) if e.name == "b")));

        // the definition itself does not appear in the file body
        let invocations: Vec<_> = parsed
            .body
            .iter()
            .filter_map(|n| match n {
                TempNode::Element(e) => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].component, Some(id));
    }

    #[test]
    fn test_component_reference_marked_used() {
        let (parsed, registry) = parse(
            r#"<template name="Used" path="parts.html"/><template id="Unused"/><Used/>"#,
        );
        assert_eq!(
            registry.get(parsed.components["Used"]),
            Some(&ComponentEntry::Reference {
                path: Some("parts.html".into()),
                used: true
            })
        );
        assert_eq!(
            registry.get(parsed.components["Unused"]),
            Some(&ComponentEntry::Reference {
                path: None,
                used: false
            })
        );
    }

    #[test]
    fn test_undefined_component() {
        let err = parse_err("<Missing/>");
        assert!(err.message.contains("\"Missing\" appears to be a component"), "{}", err.message);
    }

    #[test]
    fn test_component_must_be_defined_first() {
        let err = parse_err(r#"<Later/><template name="Later"></template>"#);
        assert!(err.message.contains("not defined"));
    }

    #[test]
    fn test_duplicate_component() {
        let err = parse_err(r#"<template name="Dup"></template><template name="Dup"/>"#);
        assert!(err.message.contains("already defined"));
    }

    #[test]
    fn test_component_name_required() {
        let err = parse_err(r#"<template foo=""></template>"#);
        assert!(err.message.contains("\"name\" or \"id\" is required"));
    }

    #[test]
    fn test_component_name_case() {
        for name in ["card", "C", "My-Card", "My_Card"] {
            let err = parse_err(&format!(r#"<template name="{name}"></template>"#));
            assert!(err.message.contains("CamelCase"), "{name}: {}", err.message);
        }
        assert!(is_component_name("Card2"));
    }

    #[test]
    fn test_reserved_prop_names() {
        let err = parse_err(r#"<template name="Card" for=""></template>"#);
        assert!(err.message.contains("not allowed as a component property name"));
    }
}
