//! Template loading.
//!
//! [`load_template`] parses a root file, then loads every file that holds a
//! component the root (or a loaded file) actually uses, and finally compiles
//! the root into `TemplateElement`s.

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::ast::TemplateElement;
use crate::compile::Compiler;
use crate::parser::{FileParser, ParsedFile};
use crate::registry::{ComponentEntry, ComponentId, Registry};
use crate::{LoadError, TemplateError};

/// Source of template files.
pub trait Loader {
    fn load(&self, path: &str) -> Result<Vec<u8>, LoadError>;
}

impl<F> Loader for F
where
    F: Fn(&str) -> Result<Vec<u8>, LoadError>,
{
    fn load(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        self(path)
    }
}

/// Loads files relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Loader for FileSystemLoader {
    fn load(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        std::fs::read(self.root.join(path)).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound { path: path.into() }
            } else {
                LoadError::Io {
                    path: path.into(),
                    source,
                }
            }
        })
    }
}

/// In-memory templates keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }
}

impl Loader for MemoryLoader {
    fn load(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        self.files
            .get(path)
            .map(|source| source.as_bytes().to_vec())
            .ok_or_else(|| LoadError::NotFound { path: path.into() })
    }
}

/// Options for loading and compiling templates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Appended to a component's name to find its file when a reference has no `path`.
    pub component_extension: String,
    /// Comments starting with this marker are kept in the output.
    pub keep_comment_prefix: String,
    /// Virtual path of a template rendered from a string.
    pub root_name: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            component_extension: ".html".into(),
            keep_comment_prefix: "keep:".into(),
            root_name: "template_string".into(),
        }
    }
}

/// Load, parse and compile the template at `root_path`.
pub fn load_template(
    root_path: &str,
    loader: &dyn Loader,
) -> Result<Vec<TemplateElement>, TemplateError> {
    load_template_with_options(root_path, loader, &LoadOptions::default())
}

/// [`load_template`] with explicit options.
pub fn load_template_with_options(
    root_path: &str,
    loader: &dyn Loader,
    options: &LoadOptions,
) -> Result<Vec<TemplateElement>, TemplateError> {
    let mut template_loader = TemplateLoader {
        loader,
        options,
        registry: Registry::new(),
        loading: Vec::new(),
    };
    let root = template_loader.parse_file(root_path)?;

    let mut compiler = Compiler::new(&template_loader.registry, &options.keep_comment_prefix);
    Ok(compiler.compile(&root.body, &root.file)?)
}

struct TemplateLoader<'a> {
    loader: &'a dyn Loader,
    options: &'a LoadOptions,
    registry: Registry,
    /// Files currently being parsed, outermost first.
    loading: Vec<String>,
}

impl TemplateLoader<'_> {
    fn parse_file(&mut self, path: &str) -> Result<ParsedFile, TemplateError> {
        if self.loading.iter().any(|p| p == path) {
            let chain = self
                .loading
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(path))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(LoadError::Cycle {
                path: path.into(),
                chain,
            }
            .into());
        }

        tracing::debug!(file = path, "loading template file");
        let bytes = self.loader.load(path)?;
        let source =
            String::from_utf8(bytes).map_err(|_| LoadError::InvalidUtf8 { path: path.into() })?;

        self.loading.push(path.to_string());
        let parsed = FileParser::new(path, &mut self.registry).parse(&source);
        let result = match parsed {
            Ok(parsed) => self.load_external_components(&parsed).map(|()| parsed),
            Err(e) => Err(e.into()),
        };
        self.loading.pop();
        result
    }

    /// Load the files holding every used component reference of `parsed`, one
    /// load per file, and store the loaded definitions in the referencing slots.
    fn load_external_components(&mut self, parsed: &ParsedFile) -> Result<(), TemplateError> {
        let mut files: IndexMap<String, Vec<(&str, ComponentId)>> = IndexMap::new();
        for (name, &id) in &parsed.components {
            if let Some(ComponentEntry::Reference { path, used: true }) = self.registry.get(id) {
                let path = path
                    .clone()
                    .unwrap_or_else(|| format!("{name}{}", self.options.component_extension));
                files.entry(path).or_default().push((name.as_str(), id));
            }
        }

        for (path, wanted) in files {
            tracing::debug!(
                file = %path,
                from = %parsed.file,
                components = wanted.len(),
                "resolving external components"
            );
            let imported = self.parse_file(&path)?;

            for (name, id) in wanted {
                let definition = imported
                    .components
                    .get(name)
                    .and_then(|&source| self.registry.definition(source))
                    .cloned()
                    .ok_or_else(|| LoadError::MissingComponent {
                        name: name.into(),
                        path: path.clone(),
                    })?;
                self.registry.resolve(id, definition);
            }
        }
        Ok(())
    }
}
