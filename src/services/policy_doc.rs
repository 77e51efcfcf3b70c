//! Governance document model.
//!
//! A governance document is Markdown with one section per policy. Each
//! section carries a fenced `policy-def` block of `key: value` lines; keys
//! with several values list them on indented continuation lines:
//!
//! ```text
//! ## Policy: Changelog Coverage
//!
//! ```policy-def
//! id: changelog-coverage
//! status: active
//! changelog_globs:
//!   CHANGELOG.md
//!   docs/CHANGELOG.md
//! ```
//!
//! Free text description.
//!
//! ---
//! ```
//!
//! `MetadataBlock::parse` and `MetadataBlock::render` round-trip any block
//! the renderer produced. Everything outside the fences is kept verbatim.

use crate::domain::constants::{BLOCK_BEGIN, BLOCK_END, POLICY_FENCE};

const SEPARATOR: &str = "---";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBlock {
    entries: Vec<(String, Vec<String>)>,
}

impl MetadataBlock {
    pub fn parse(text: &str) -> Self {
        let mut block = MetadataBlock::default();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let indented = line.starts_with(' ') || line.starts_with('\t');
            if indented {
                if let Some((_, values)) = block.entries.last_mut() {
                    values.push(line.trim().to_string());
                }
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_string();
            let value = value.trim();
            let values = if value.is_empty() {
                Vec::new()
            } else {
                vec![value.to_string()]
            };
            block.remove(&key);
            block.entries.push((key, values));
        }
        block
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, values) in &self.entries {
            match values.as_slice() {
                [] => out.push_str(&format!("{}:\n", key)),
                [one] => out.push_str(&format!("{}: {}\n", key, one)),
                many => {
                    out.push_str(&format!("{}:\n", key));
                    for v in many {
                        out.push_str(&format!("  {}\n", v));
                    }
                }
            }
        }
        out
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn entries(&self) -> &[(String, Vec<String>)] {
        &self.entries
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, values: Vec<String>) {
        let values: Vec<String> = values.into_iter().filter(|v| !v.trim().is_empty()).collect();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = values,
            None => self.entries.push((key.to_string(), values)),
        }
    }

    pub fn set_scalar(&mut self, key: &str, value: &str) {
        self.set(key, vec![value.to_string()]);
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn push(&mut self, key: String, values: Vec<String>) {
        self.entries.push((key, values));
    }

    pub fn id(&self) -> Option<&str> {
        self.first("id")
    }
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1"
    )
}

pub fn policy_active(block: &MetadataBlock, state_override: Option<bool>) -> bool {
    if let Some(state) = state_override {
        return state;
    }
    if let Some(v) = block.first("enabled") {
        return is_truthy(v);
    }
    if let Some(v) = block.first("apply") {
        return is_truthy(v);
    }
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySection {
    pub id: String,
    pub start: usize,
    pub end: usize,
    pub fence_open: usize,
    pub fence_close: usize,
    pub block: MetadataBlock,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GovernanceDoc {
    lines: Vec<String>,
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn is_section_heading(line: &str) -> bool {
    line.starts_with("## ")
}

fn is_title(line: &str) -> bool {
    line.starts_with("# ")
}

fn is_separator(line: &str) -> bool {
    line.trim() == SEPARATOR
}

fn is_managed_marker(line: &str) -> bool {
    let t = line.trim();
    t == BLOCK_BEGIN || t == BLOCK_END
}

impl GovernanceDoc {
    pub fn parse(text: &str) -> Self {
        GovernanceDoc {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    pub fn render(&self) -> String {
        self.lines.concat()
    }

    pub fn sections(&self) -> Vec<PolicySection> {
        let mut out = Vec::new();
        let mut floor = 0usize;
        let mut i = 0usize;
        while i < self.lines.len() {
            if self.lines[i].trim() != POLICY_FENCE {
                if is_fence(&self.lines[i]) {
                    i = self.skip_fence(i);
                }
                i += 1;
                continue;
            }
            let fence_open = i;
            let Some(fence_close) = (fence_open + 1..self.lines.len()).find(|&j| is_fence(&self.lines[j]))
            else {
                break;
            };
            let start = (floor..fence_open)
                .rev()
                .take_while(|&j| {
                    let line = &self.lines[j];
                    !(is_separator(line) || is_managed_marker(line) || is_title(line))
                })
                .find(|&j| is_section_heading(&self.lines[j]))
                .unwrap_or(fence_open);
            let mut end = fence_close + 1;
            while end < self.lines.len() {
                let line = &self.lines[end];
                if is_section_heading(line)
                    || is_title(line)
                    || is_separator(line)
                    || is_managed_marker(line)
                {
                    break;
                }
                if line.trim() == POLICY_FENCE {
                    break;
                }
                if is_fence(line) {
                    end = self.skip_fence(end);
                }
                end += 1;
            }
            let end = end.min(self.lines.len());
            let block = MetadataBlock::parse(&self.lines[fence_open + 1..fence_close].concat());
            if let Some(id) = block.id().map(str::to_string) {
                out.push(PolicySection {
                    id,
                    start,
                    end,
                    fence_open,
                    fence_close,
                    block,
                });
            }
            floor = end;
            i = end;
        }
        out
    }

    fn skip_fence(&self, open: usize) -> usize {
        (open + 1..self.lines.len())
            .find(|&j| is_fence(&self.lines[j]))
            .unwrap_or(self.lines.len().saturating_sub(1))
    }

    pub fn ids(&self) -> Vec<String> {
        self.sections().into_iter().map(|s| s.id).collect()
    }

    pub fn section(&self, id: &str) -> Option<PolicySection> {
        self.sections().into_iter().find(|s| s.id == id)
    }

    pub fn block(&self, id: &str) -> Option<MetadataBlock> {
        self.section(id).map(|s| s.block)
    }

    pub fn section_text(&self, id: &str) -> Option<String> {
        let s = self.section(id)?;
        Some(self.lines[s.start..s.end].concat())
    }

    pub fn set_block(&mut self, id: &str, block: &MetadataBlock) -> bool {
        let Some(s) = self.section(id) else {
            return false;
        };
        let rendered: Vec<String> = block
            .render()
            .split_inclusive('\n')
            .map(str::to_string)
            .collect();
        if self.lines[s.fence_open + 1..s.fence_close] == rendered[..] {
            return false;
        }
        self.lines.splice(s.fence_open + 1..s.fence_close, rendered);
        true
    }

    pub fn remove_section(&mut self, id: &str) -> bool {
        let Some(s) = self.section(id) else {
            return false;
        };
        self.lines.drain(s.start..s.end);
        self.collapse_separators();
        true
    }

    pub fn append_section(&mut self, section_text: &str) {
        let at = self
            .lines
            .iter()
            .rposition(|l| l.trim() == BLOCK_END)
            .unwrap_or(self.lines.len());
        if at > 0 && !self.lines[at - 1].ends_with('\n') {
            self.lines[at - 1].push('\n');
        }
        let last_content = self.lines[..at].iter().rev().find(|l| !l.trim().is_empty());
        let mut added = Vec::new();
        if !last_content.map(|l| is_separator(l)).unwrap_or(false) {
            added.push("\n".to_string());
            added.push(format!("{}\n", SEPARATOR));
        }
        added.push("\n".to_string());
        for line in section_text.trim_end().split('\n') {
            added.push(format!("{}\n", line));
        }
        added.push("\n".to_string());
        added.push(format!("{}\n", SEPARATOR));
        self.lines.splice(at..at, added);
    }

    fn collapse_separators(&mut self) {
        let mut out: Vec<String> = Vec::with_capacity(self.lines.len());
        let mut last_separator: Option<usize> = None;
        let mut content_since = true;
        let mut in_fence = false;
        for line in self.lines.drain(..) {
            if is_fence(&line) {
                in_fence = !in_fence;
            }
            if !in_fence && is_separator(&line) {
                if !content_since {
                    if let Some(idx) = last_separator {
                        out.truncate(idx + 1);
                    }
                    continue;
                }
                last_separator = Some(out.len());
                content_since = false;
                out.push(line);
                continue;
            }
            if !line.trim().is_empty() {
                content_since = true;
            }
            out.push(line);
        }
        self.lines = out;
    }
}
