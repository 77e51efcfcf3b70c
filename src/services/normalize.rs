use crate::services::policy_doc::{is_truthy, GovernanceDoc, MetadataBlock};
use std::collections::BTreeMap;

const COMMON_DEFAULTS: &[(&str, &str)] = &[
    ("id", ""),
    ("status", "active"),
    ("severity", "warning"),
    ("auto_fix", "false"),
    ("updated", "false"),
    ("applies_to", "*"),
    ("enforcement", "active"),
    ("enabled", "true"),
    ("custom", "false"),
];

const LEGACY_SUFFIXES: &[&str] = &["_prefixes", "_suffixes", "_paths"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySchema {
    keys: Vec<String>,
    defaults: BTreeMap<String, Vec<String>>,
}

impl PolicySchema {
    pub fn common() -> Self {
        let mut schema = PolicySchema {
            keys: Vec::new(),
            defaults: BTreeMap::new(),
        };
        for (key, value) in COMMON_DEFAULTS {
            schema.keys.push(key.to_string());
            let values = if value.is_empty() {
                Vec::new()
            } else {
                vec![value.to_string()]
            };
            schema.defaults.insert(key.to_string(), values);
        }
        schema
    }

    fn from_block(block: &MetadataBlock) -> Self {
        let mut schema = PolicySchema {
            keys: Vec::new(),
            defaults: BTreeMap::new(),
        };
        for (key, values) in block.entries() {
            schema.keys.push(key.clone());
            schema.defaults.insert(key.clone(), values.clone());
        }
        for (key, value) in COMMON_DEFAULTS {
            if !schema.defaults.contains_key(*key) {
                schema.keys.push(key.to_string());
                let values = if value.is_empty() {
                    Vec::new()
                } else {
                    vec![value.to_string()]
                };
                schema.defaults.insert(key.to_string(), values);
            }
        }
        schema
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

#[derive(Debug, Clone)]
pub struct SchemaSet {
    by_id: BTreeMap<String, PolicySchema>,
    common: PolicySchema,
}

impl SchemaSet {
    pub fn from_template(template: &GovernanceDoc) -> Self {
        let by_id = template
            .sections()
            .into_iter()
            .map(|s| (s.id.clone(), PolicySchema::from_block(&s.block)))
            .collect();
        SchemaSet {
            by_id,
            common: PolicySchema::common(),
        }
    }

    pub fn for_id(&self, id: &str) -> &PolicySchema {
        self.by_id.get(id).unwrap_or(&self.common)
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn prefix_to_glob(prefix: &str) -> String {
    if prefix.ends_with('/') {
        format!("{}**", prefix)
    } else {
        format!("{}*", prefix)
    }
}

fn suffix_to_glob(suffix: &str) -> String {
    if suffix.starts_with('*') {
        suffix.to_string()
    } else {
        format!("*{}", suffix)
    }
}

fn is_glob(value: &str) -> bool {
    value.contains(['*', '?', '['])
}

/// Rewrites `<role>_prefixes`, `<role>_suffixes` and `<role>_paths` keys into
/// the `<role>_globs` / `<role>_files` / `<role>_dirs` triple and records the
/// role in `selector_roles`.
pub fn migrate_selectors(block: &mut MetadataBlock) -> bool {
    let legacy: Vec<(String, String, &str)> = block
        .keys()
        .filter_map(|key| {
            LEGACY_SUFFIXES.iter().find_map(|suffix| {
                key.strip_suffix(suffix)
                    .filter(|role| !role.is_empty())
                    .map(|role| (key.to_string(), role.to_string(), *suffix))
            })
        })
        .collect();
    if legacy.is_empty() {
        return false;
    }

    let mut roles: Vec<String> = block
        .get("selector_roles")
        .map(|v| v.to_vec())
        .unwrap_or_default();

    for (key, role, suffix) in legacy {
        let values = block.remove(&key).unwrap_or_default();
        let mut globs = block
            .get(&format!("{}_globs", role))
            .map(|v| v.to_vec())
            .unwrap_or_default();
        let mut files = block
            .get(&format!("{}_files", role))
            .map(|v| v.to_vec())
            .unwrap_or_default();
        let mut dirs = block
            .get(&format!("{}_dirs", role))
            .map(|v| v.to_vec())
            .unwrap_or_default();

        for value in values {
            match suffix {
                "_prefixes" => push_unique(&mut globs, prefix_to_glob(&value)),
                "_suffixes" => push_unique(&mut globs, suffix_to_glob(&value)),
                _ => {
                    if let Some(dir) = value.strip_suffix('/') {
                        push_unique(&mut dirs, dir.to_string());
                    } else if is_glob(&value) {
                        push_unique(&mut globs, value);
                    } else {
                        push_unique(&mut files, value);
                    }
                }
            }
        }

        block.set(&format!("{}_globs", role), globs);
        block.set(&format!("{}_files", role), files);
        block.set(&format!("{}_dirs", role), dirs);
        push_unique(&mut roles, role);
    }

    block.set("selector_roles", roles);
    true
}

pub fn normalize_block(block: &MetadataBlock, schema: &PolicySchema) -> MetadataBlock {
    let mut work = block.clone();

    if !work.contains("enabled") {
        if let Some(apply) = work.remove("apply") {
            work.set("enabled", apply);
        }
    } else {
        work.remove("apply");
    }
    migrate_selectors(&mut work);

    let mut out = MetadataBlock::default();
    for key in schema.keys() {
        let values = match work.get(key) {
            Some(v) => v.to_vec(),
            None => schema.defaults.get(key).cloned().unwrap_or_default(),
        };
        out.push(key.clone(), values);
    }
    for (key, values) in work.entries() {
        if !out.contains(key) {
            out.push(key.clone(), values.clone());
        }
    }
    out
}

pub fn normalize_doc(doc: &mut GovernanceDoc, schemas: &SchemaSet, touch_updated: bool) -> Vec<String> {
    let mut changed = Vec::new();
    for section in doc.sections() {
        let mut normalized = normalize_block(&section.block, schemas.for_id(&section.id));
        if normalized == section.block {
            continue;
        }
        if touch_updated {
            normalized.set_scalar("updated", "true");
        }
        doc.set_block(&section.id, &normalized);
        tracing::debug!(policy = %section.id, "normalized policy metadata");
        changed.push(section.id);
    }
    changed
}

pub fn overwrite_from_template(target: &mut GovernanceDoc, template: &GovernanceDoc) -> Vec<String> {
    let mut touched = Vec::new();
    let existing = target.ids();
    for section in template.sections() {
        if existing.contains(&section.id) {
            let Some(current) = target.block(&section.id) else {
                continue;
            };
            if current.first("custom").map(is_truthy).unwrap_or(false) {
                continue;
            }
            if target.set_block(&section.id, &section.block) {
                touched.push(section.id);
            }
        } else if section
            .block
            .first("status")
            .map(|v| v.eq_ignore_ascii_case("deleted"))
            .unwrap_or(false)
        {
            continue;
        } else if let Some(text) = template.section_text(&section.id) {
            target.append_section(&text);
            touched.push(section.id);
        }
    }
    touched
}
