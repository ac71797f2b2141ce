//! The immutable command table and its indices.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info, warn};

use crate::catalog::{
    CatalogError, CommandDefinition, HandlerRegistry, source::CommandSource,
};

/// In-memory command table built once at start-up.
///
/// Holds every [`CommandDefinition`] in load order together with a name index and
/// an alias index. Aliases always point at a canonical name, never at another
/// alias, so resolution is at most one indirection.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Definitions in load order.
    definitions: Vec<Arc<CommandDefinition>>,
    /// Canonical name to position in `definitions`.
    names: HashMap<String, usize>,
    /// Alias to canonical name.
    aliases: HashMap<String, String>,
}

impl Catalog {
    /// Loads every command source under `root`.
    ///
    /// `root` must contain one directory per category, each holding one YAML file
    /// per command. Directories and files are visited in sorted order so the
    /// resulting catalog order is stable between runs.
    ///
    /// # Arguments
    ///
    /// * `root` - The catalog directory
    /// * `handlers` - Handlers that source units may bind to
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found. Loading never returns a partial
    /// catalog.
    pub fn load(root: &Path, handlers: &HandlerRegistry) -> Result<Self, CatalogError> {
        let mut definitions = Vec::new();

        for entry in sorted_entries(root)? {
            if !entry.is_dir() {
                warn!(
                    "skipping {}: command sources must live in a category directory",
                    entry.display()
                );
                continue;
            }

            let Some(category) = entry.file_name().and_then(|name| name.to_str()) else {
                warn!("skipping category with a non UTF-8 name: {}", entry.display());
                continue;
            };

            for file in sorted_entries(&entry)? {
                if !is_source_file(&file) {
                    warn!("skipping {}: not a YAML command source", file.display());
                    continue;
                }

                let definition = CommandSource::read(&file)?.into_definition(category, handlers)?;
                debug!("loaded command {} from {}", definition.name, file.display());
                definitions.push(definition);
            }
        }

        let catalog = Self::from_definitions(definitions)?;
        info!(
            "loaded {} commands from {}",
            catalog.len(),
            root.display()
        );

        Ok(catalog)
    }

    /// Builds a catalog from already constructed definitions, keeping their order.
    ///
    /// # Errors
    ///
    /// * [`CatalogError::DuplicateName`] - a name collides with a name or an alias
    /// * [`CatalogError::AliasCollision`] - an alias collides with a name or an alias
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = CommandDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();

        for definition in definitions {
            if catalog.names.contains_key(&definition.name)
                || catalog.aliases.contains_key(&definition.name)
            {
                return Err(CatalogError::DuplicateName(definition.name));
            }

            for (position, alias) in definition.aliases.iter().enumerate() {
                let existing = catalog
                    .names
                    .get_key_value(alias)
                    .map(|(name, _)| name.clone())
                    .or_else(|| catalog.aliases.get(alias).cloned())
                    .or_else(|| (*alias == definition.name).then(|| definition.name.clone()))
                    .or_else(|| {
                        definition.aliases[..position]
                            .contains(alias)
                            .then(|| definition.name.clone())
                    });

                if let Some(existing) = existing {
                    return Err(CatalogError::AliasCollision {
                        alias: alias.clone(),
                        command: definition.name.clone(),
                        existing,
                    });
                }
            }

            for alias in &definition.aliases {
                catalog
                    .aliases
                    .insert(alias.clone(), definition.name.clone());
            }
            catalog
                .names
                .insert(definition.name.clone(), catalog.definitions.len());
            catalog.definitions.push(Arc::new(definition));
        }

        Ok(catalog)
    }

    /// Resolves a canonical name or an alias, ignoring case.
    pub fn resolve(&self, name_or_alias: &str) -> Option<Arc<CommandDefinition>> {
        let key = name_or_alias.to_ascii_lowercase();
        let name = self.aliases.get(&key).unwrap_or(&key);

        self.names
            .get(name)
            .map(|&index| Arc::clone(&self.definitions[index]))
    }

    /// Every definition reachable through the structured channel, in catalog order.
    ///
    /// The iterator is lazy and can be requested again to start over.
    pub fn all_structured_capable(&self) -> impl Iterator<Item = &CommandDefinition> + '_ {
        self.iter()
            .filter(|definition| definition.supports_structured)
    }

    /// Every definition in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandDefinition> + '_ {
        self.definitions.iter().map(AsRef::as_ref)
    }

    /// Definitions grouped by category, categories sorted by name.
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&CommandDefinition>> {
        let mut categories: BTreeMap<&str, Vec<&CommandDefinition>> = BTreeMap::new();
        for definition in self.iter() {
            categories
                .entry(definition.category.as_str())
                .or_default()
                .push(definition);
        }
        categories
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn sorted_entries(directory: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let io_error = |source| CatalogError::Io {
        path: directory.display().to_string(),
        source,
    };

    let mut entries = fs::read_dir(directory)
        .map_err(io_error)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;
    entries.sort();

    Ok(entries)
}

fn is_source_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml")
            })
}
