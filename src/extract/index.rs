use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use tree_sitter::Node;

use crate::intent::{FileDiagnostic, Locator};
use crate::syntax::{parse_file, ParsedSource};

use super::dialect::{class_hooks, dialect_for, HookDecl};
use super::vocab;

/// Guards ancestor walks against malformed hierarchies.
const MAX_LINEAGE: usize = 32;

/// Location of a method body inside one of the index's sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRef {
    pub source: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub name: String,
    pub source: usize,
    pub parent: Option<String>,
    /// Declaration order is kept so resolution output is stable.
    pub locators: Vec<(String, Locator)>,
    pub field_types: HashMap<String, String>,
    pub methods: HashMap<String, MethodRef>,
    pub hooks: Vec<HookDecl>,
}

/// Cross-file symbol table of classes, parents, locator fields and method
/// bodies. Built once, then shared read-only between extraction workers.
#[derive(Debug, Default)]
pub struct WorkspaceIndex {
    sources: Vec<Arc<ParsedSource>>,
    classes: HashMap<String, ClassEntry>,
    diagnostics: Vec<FileDiagnostic>,
}

impl WorkspaceIndex {
    /// Parse and index every file. Files that fail to parse are skipped and
    /// kept as diagnostics.
    pub fn build(files: &[PathBuf]) -> Self {
        let mut index = Self::default();
        for path in files {
            match parse_file(path) {
                Ok(parsed) => index.add_source(Arc::new(parsed)),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unparseable file");
                    index.diagnostics.push(FileDiagnostic {
                        path: path.display().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        debug!(
            files = files.len(),
            classes = index.classes.len(),
            skipped = index.diagnostics.len(),
            "workspace index built"
        );
        index
    }

    pub fn from_sources(sources: impl IntoIterator<Item = Arc<ParsedSource>>) -> Self {
        let mut index = Self::default();
        for source in sources {
            index.add_source(source);
        }
        index
    }

    fn add_source(&mut self, parsed: Arc<ParsedSource>) {
        let slot = self.sources.len();
        let dialect = dialect_for(parsed.language);
        let src = parsed.source.as_str();

        for class in dialect.classes(parsed.root(), src) {
            if self.classes.contains_key(&class.name) {
                debug!(class = %class.name, path = %parsed.display_path(), "duplicate class ignored");
                self.diagnostics.push(FileDiagnostic {
                    path: parsed.display_path(),
                    reason: format!("duplicate class {} ignored", class.name),
                });
                continue;
            }

            let methods = dialect
                .methods(&class, src)
                .into_iter()
                .filter_map(|m| {
                    let body = m.body?;
                    Some((
                        m.name,
                        MethodRef {
                            source: slot,
                            start: body.start_byte(),
                            end: body.end_byte(),
                        },
                    ))
                })
                .fold(HashMap::new(), |mut acc, (name, r)| {
                    // overloads: first declaration wins
                    acc.entry(name).or_insert(r);
                    acc
                });

            let entry = ClassEntry {
                name: class.name.clone(),
                source: slot,
                parent: class.parent.clone(),
                locators: dialect.locator_fields(&class, src),
                field_types: dialect.typed_fields(&class, src).into_iter().collect(),
                methods,
                hooks: class_hooks(dialect, &class, src),
            };
            self.classes.insert(class.name, entry);
        }
        self.sources.push(parsed);
    }

    pub fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class_file(&self, name: &str) -> Option<&Path> {
        let entry = self.classes.get(name)?;
        self.sources.get(entry.source).map(|s| s.path.as_path())
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.classes.get(name)?.parent.as_deref()
    }

    pub fn diagnostics(&self) -> &[FileDiagnostic] {
        &self.diagnostics
    }

    /// The class itself followed by its indexed ancestors, nearest first.
    pub fn lineage<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(name);
        while let Some(class) = current {
            if chain.len() >= MAX_LINEAGE || !seen.insert(class) {
                break;
            }
            let Some(entry) = self.classes.get(class) else {
                break;
            };
            chain.push(entry.name.as_str());
            current = entry.parent.as_deref();
        }
        chain
    }

    /// Locator declared on `class` or the nearest ancestor, with its owner.
    pub fn find_locator(&self, class: &str, field: &str) -> Option<(&str, &Locator)> {
        self.lineage(class).into_iter().find_map(|owner| {
            let entry = self.classes.get(owner)?;
            entry
                .locators
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, locator)| (entry.name.as_str(), locator))
        })
    }

    pub fn find_method(&self, class: &str, method: &str) -> Option<(&str, MethodRef)> {
        self.lineage(class).into_iter().find_map(|owner| {
            let entry = self.classes.get(owner)?;
            entry
                .methods
                .get(method)
                .map(|r| (entry.name.as_str(), *r))
        })
    }

    pub fn field_type(&self, class: &str, field: &str) -> Option<&str> {
        self.lineage(class).into_iter().find_map(|owner| {
            self.classes
                .get(owner)?
                .field_types
                .get(field)
                .map(String::as_str)
        })
    }

    /// Exact class name, or a folded match (`loginPage`, `login_page` -> `LoginPage`).
    pub fn match_class_name(&self, name: &str) -> Option<&str> {
        if let Some(entry) = self.classes.get(name) {
            return Some(entry.name.as_str());
        }
        let folded = vocab::fold(name);
        let mut matches = self
            .classes
            .keys()
            .filter(|k| vocab::fold(k) == folded)
            .map(String::as_str)
            .collect::<Vec<_>>();
        matches.sort_unstable();
        matches.into_iter().next()
    }

    /// Re-enter a stored method body.
    pub fn method_body(&self, method: MethodRef) -> Option<(&ParsedSource, Node<'_>)> {
        let parsed = self.sources.get(method.source)?;
        let dialect = dialect_for(parsed.language);
        let mut node = parsed
            .root()
            .descendant_for_byte_range(method.start, method.end)?;
        loop {
            if node.start_byte() == method.start
                && node.end_byte() == method.end
                && dialect.is_block(node)
            {
                return Some((parsed.as_ref(), node));
            }
            node = node.parent()?;
        }
    }
}
