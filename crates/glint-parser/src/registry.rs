//! Component registry.
//!
//! One arena of component entries is shared by every file parsed for a
//! template. Elements that invoke a component hold its [`ComponentId`]; when a
//! reference is resolved its slot is overwritten with the loaded definition,
//! so every invocation sees the resolved body.

use crate::ast::{Location, Segment};
use crate::parser::TempNode;

/// Handle to a slot in the [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(usize);

/// A declared component property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropDecl {
    pub name: String,
    /// `None` makes the prop required.
    pub default: Option<Vec<Segment>>,
}

/// A component defined with `<template name="...">...</template>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub props: Vec<PropDecl>,
    pub body: Vec<TempNode>,
    pub file: String,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentEntry {
    Definition(Definition),
    /// `<template name="..." path="..."/>`: defined in another file.
    Reference {
        path: Option<String>,
        /// Set once some tag invokes the component; only used references are loaded.
        used: bool,
    },
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<ComponentEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: ComponentEntry) -> ComponentId {
        self.entries.push(entry);
        ComponentId(self.entries.len() - 1)
    }

    pub fn get(&self, id: ComponentId) -> Option<&ComponentEntry> {
        self.entries.get(id.0)
    }

    pub fn definition(&self, id: ComponentId) -> Option<&Definition> {
        match self.get(id) {
            Some(ComponentEntry::Definition(definition)) => Some(definition),
            _ => None,
        }
    }

    pub fn mark_used(&mut self, id: ComponentId) {
        if let Some(ComponentEntry::Reference { used, .. }) = self.entries.get_mut(id.0) {
            *used = true;
        }
    }

    /// Store the body of a definition once its closing tag is reached.
    pub fn set_body(&mut self, id: ComponentId, body: Vec<TempNode>) {
        if let Some(ComponentEntry::Definition(definition)) = self.entries.get_mut(id.0) {
            definition.body = body;
        }
    }

    /// Replace a reference with the definition loaded for it.
    pub fn resolve(&mut self, id: ComponentId, definition: Definition) {
        if let Some(slot) = self.entries.get_mut(id.0) {
            *slot = ComponentEntry::Definition(definition);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
