//! HTML renderer.
//!
//! Walks the compiled `TemplateElement` tree and produces the output string.
//! Every element receives its own copy of the context; `set:` bindings,
//! component props, `children` and loop variables only extend that copy.

use glint_lexer::is_void_element;
use glint_parser::ast::{ComponentElement, Directives, Location, Segment, TagElement, TemplateElement};

use crate::eval::Evaluator;
use crate::functions::Functions;
use crate::value::{Context, Map, Value};
use crate::EvalError;

pub struct Renderer<'f> {
    evaluator: Evaluator<'f>,
}

impl<'f> Renderer<'f> {
    pub fn new(functions: &'f Functions) -> Self {
        Self {
            evaluator: Evaluator::new(functions),
        }
    }

    /// Render a sequence of elements against `ctx`.
    pub fn render(&self, template: &[TemplateElement], ctx: &Context) -> Result<String, EvalError> {
        let mut out = String::new();
        for element in template {
            self.render_element(element, ctx, &mut out)?;
        }
        Ok(out)
    }

    fn render_element(
        &self,
        element: &TemplateElement,
        ctx: &Context,
        out: &mut String,
    ) -> Result<(), EvalError> {
        match element {
            TemplateElement::Text(text) => out.push_str(text),
            TemplateElement::Clause(clause) => {
                out.push_str(&self.evaluator.evaluate_as_str(clause, ctx)?)
            }
            TemplateElement::Comment(comment) => out.push_str(&format!("<!--{comment}-->")),
            TemplateElement::Doctype(doctype) => out.push_str(&format!("<!DOCTYPE{doctype}>")),
            TemplateElement::Tag(tag) => {
                self.render_directed(&tag.directives, tag.loc, ctx, out, |ctx, out| {
                    self.render_tag(tag, ctx, out)
                })?
            }
            TemplateElement::Component(component) => {
                self.render_directed(&component.directives, component.loc, ctx, out, |ctx, out| {
                    self.render_component(component, ctx, out)
                })?
            }
        }
        Ok(())
    }

    /// Apply `if` and `for` around `render`.
    fn render_directed<F>(
        &self,
        directives: &Directives,
        loc: Location,
        ctx: &Context,
        out: &mut String,
        render: F,
    ) -> Result<(), EvalError>
    where
        F: Fn(&Context, &mut String) -> Result<(), EvalError>,
    {
        if let Some(condition) = &directives.if_clause {
            if !self.evaluator.evaluate_as_bool(condition, ctx)? {
                return Ok(());
            }
        }

        let Some(for_clause) = &directives.for_clause else {
            return render(ctx, out);
        };

        let iterations = self
            .evaluator
            .evaluate_as_loop(for_clause, &directives.for_names, ctx)?;
        let count = iterations.len();
        let mut parts = Vec::with_capacity(count);

        for (i, bindings) in iterations.into_iter().enumerate() {
            let index = i + 1;
            tracing::trace!(index, count, "rendering loop iteration");

            let mut scope = ctx.clone();
            for (name, value) in bindings {
                scope.insert(name, value);
            }
            scope.insert("loop", loop_record(index, count));

            let mut part = String::new();
            render(&scope, &mut part)?;
            if !part.is_empty() {
                parts.push(part);
            }
        }

        let join = match &directives.for_join {
            Some(segments) => self.render_segments(segments, ctx)?,
            None => loop_indent(loc),
        };
        out.push_str(&parts.join(&join));
        Ok(())
    }

    fn render_tag(&self, tag: &TagElement, ctx: &Context, out: &mut String) -> Result<(), EvalError> {
        let mut scope = ctx.clone();
        for attr in &tag.set_attributes {
            scope.insert(attr.name.clone(), self.evaluate_binding(&attr.value, ctx)?);
        }

        if tag.fragment {
            out.push_str(&self.render(&tag.body, &scope)?);
            return Ok(());
        }

        out.push('<');
        out.push_str(&tag.name);
        for attr in &tag.attributes {
            let value = self.render_segments(&attr.value, ctx)?;
            out.push_str(&format!(" {}=\"{value}\"", attr.name));
        }

        if tag.self_closing {
            out.push_str("/>");
        } else if is_void_element(&tag.name) && tag.body.is_empty() {
            out.push('>');
        } else {
            out.push('>');
            out.push_str(&self.render(&tag.body, &scope)?);
            out.push_str(&format!("</{}>", tag.name));
        }
        Ok(())
    }

    fn render_component(
        &self,
        component: &ComponentElement,
        ctx: &Context,
        out: &mut String,
    ) -> Result<(), EvalError> {
        let mut scope = ctx.clone();
        for prop in &component.props {
            scope.insert(prop.name.clone(), self.evaluate_binding(&prop.value, ctx)?);
        }

        if let Some(children) = &component.children {
            let value = match children.as_slice() {
                [TemplateElement::Clause(clause)] => self.evaluator.evaluate(clause, &scope)?,
                _ => Value::String(self.render(children, &scope)?),
            };
            scope.insert("children", value);
        }

        tracing::trace!(component = %component.name, file = %component.source_file, "rendering component");
        out.push_str(&self.render(&component.body, &scope)?);
        Ok(())
    }

    /// A single clause binds its value; anything else binds the rendered text.
    fn evaluate_binding(&self, segments: &[Segment], ctx: &Context) -> Result<Value, EvalError> {
        match segments {
            [Segment::Clause(clause)] => self.evaluator.evaluate(clause, ctx),
            _ => self.render_segments(segments, ctx).map(Value::String),
        }
    }

    fn render_segments(&self, segments: &[Segment], ctx: &Context) -> Result<String, EvalError> {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Clause(clause) => out.push_str(&self.evaluator.evaluate_as_str(clause, ctx)?),
            }
        }
        Ok(out)
    }
}

fn loop_record(index: usize, count: usize) -> Value {
    let mut record = Map::new();
    record.insert("index".into(), Value::from(index));
    record.insert("first".into(), Value::Bool(index == 1));
    record.insert("last".into(), Value::Bool(index == count));
    Value::Map(record)
}

/// Default separator between loop iterations: a newline, then the tag's indentation.
fn loop_indent(loc: Location) -> String {
    format!("\n{}", " ".repeat(loc.col.saturating_sub(1)))
}
