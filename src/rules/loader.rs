//! # KnowledgeBase Loader
//!
//! Compiles rule-definition resources from configured directories and
//! explicit file paths into one named, versioned KnowledgeBase.
//!
//! Directory scans are non-recursive, filter on the `.json` extension,
//! and sort entries lexicographically so rule order is reproducible
//! across loads. Any unreadable source, parse failure, compile failure,
//! or an all-sources total of zero resources fails the whole load.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::definition::RuleSetFile;
use super::errors::{LoadError, LoadResult};
use super::knowledge::{KnowledgeBase, Rule};

/// Extension a rule resource must carry to be picked up by a directory
/// scan. Explicit file paths are loaded regardless.
pub const RULE_EXTENSION: &str = "json";

/// Where rule resources come from.
#[derive(Debug, Clone, Default)]
pub struct RuleSources {
    /// Directories scanned non-recursively for `.json` resources
    pub dirs: Vec<PathBuf>,
    /// Explicit resource paths, loaded in this order after the dirs
    pub files: Vec<PathBuf>,
}

impl RuleSources {
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            dirs: vec![path.into()],
            files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// Load every configured resource into a fresh KnowledgeBase.
pub fn load_knowledge(
    sources: &RuleSources,
    name: &str,
    version: u64,
) -> LoadResult<KnowledgeBase> {
    let mut rules = Vec::new();
    let mut seen = HashSet::new();
    let mut resource_count = 0usize;

    for dir in &sources.dirs {
        for path in scan_dir(dir)? {
            load_resource(&path, &mut rules, &mut seen)?;
            resource_count += 1;
        }
    }

    for path in &sources.files {
        load_resource(path, &mut rules, &mut seen)?;
        resource_count += 1;
    }

    if resource_count == 0 {
        return Err(LoadError::NoRules);
    }

    Ok(KnowledgeBase::new(name, version, rules))
}

/// Non-recursive scan for rule resources, lexicographic order.
fn scan_dir(dir: &Path) -> LoadResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| LoadError::source_unreadable(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LoadError::source_unreadable(dir, e))?;
        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .map_or(false, |ext| ext == RULE_EXTENSION)
        {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

/// Parse and compile one resource, appending its rules.
fn load_resource(
    path: &Path,
    rules: &mut Vec<Rule>,
    seen: &mut HashSet<String>,
) -> LoadResult<()> {
    let content =
        fs::read_to_string(path).map_err(|e| LoadError::resource_unreadable(path, e))?;

    let resource: RuleSetFile =
        serde_json::from_str(&content).map_err(|e| LoadError::parse(path, e.to_string()))?;

    if resource.rules.is_empty() {
        return Err(LoadError::parse(path, "resource defines no rules"));
    }

    for def in resource.rules {
        def.validate()
            .map_err(|reason| LoadError::compile(path, def.name.clone(), reason))?;

        if !seen.insert(def.name.clone()) {
            return Err(LoadError::duplicate(path, def.name));
        }

        let mut keys = std::collections::BTreeSet::new();
        def.when.collect_attribute_keys(&mut keys);

        rules.push(Rule {
            name: def.name,
            description: def.description,
            condition: def.when,
            condition_keys: keys.into_iter().collect(),
            steps: def.then,
        });
    }

    debug!(path = %path.display(), "loaded rule resource");
    Ok(())
}
