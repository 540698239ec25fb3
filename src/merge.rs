use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::ini::IniDocument;

/// A default taken from a config file, with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValue {
    pub value: String,
    pub path: PathBuf,
    pub line: usize,
    pub section: String,
}

/// Config-file defaults keyed by lowercased option name.
pub type ConfigDefaults = BTreeMap<String, ConfigValue>;

/// Overlay `section` of `doc` on top of `base`. The overlay wins for colliding keys.
fn overlay_section(base: &mut ConfigDefaults, doc: &IniDocument, section: &str) {
    let Some(items) = doc.items(section) else {
        return;
    };
    for entry in items {
        base.insert(
            entry.key.clone(),
            ConfigValue {
                value: entry.value.clone(),
                path: doc.path.clone(),
                line: entry.line,
                section: section.to_string(),
            },
        );
    }
}

/// Merge the declared sections of every document into one defaults map.
///
/// `docs` is in priority-descending order. The first document wins per key;
/// within one document, a later-declared section overwrites an earlier one.
/// Missing sections contribute nothing.
pub fn merge_defaults(docs: &[IniDocument], sections: &[String]) -> ConfigDefaults {
    let mut merged = ConfigDefaults::new();
    for doc in docs.iter().rev() {
        for section in sections {
            overlay_section(&mut merged, doc, section);
        }
    }
    merged
}
