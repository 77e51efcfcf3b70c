use crate::domain::constants::{
    BLOCK_BEGIN, BLOCK_END, IGNORE_BEGIN, IGNORE_END, IGNORE_USER_BEGIN, IGNORE_USER_END,
};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockChange {
    Inserted,
    Replaced,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreStrip {
    Keep(String),
    Delete,
}

fn lines_of(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

fn payload_lines(payload: &str) -> Vec<String> {
    let body = payload.trim_end_matches('\n');
    if body.is_empty() {
        return Vec::new();
    }
    body.split('\n').map(|l| format!("{}\n", l)).collect()
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.trim() == marker
}

fn find_span(lines: &[String], begin: &str, end: &str) -> Option<(usize, usize)> {
    let start = lines.iter().position(|l| is_marker(l, begin))?;
    let stop = lines[start + 1..]
        .iter()
        .position(|l| is_marker(l, end))
        .map(|i| start + 1 + i)?;
    Some((start, stop))
}

fn is_top_heading(line: &str) -> bool {
    line.starts_with("# ") || line.trim_end() == "#"
}

/// Replaces the text between the markers, or inserts a marked block after the
/// first top-level heading (top of file when there is none).
pub fn inject_block(text: &str, payload: &str) -> (String, BlockChange) {
    inject_with(text, payload, BLOCK_BEGIN, BLOCK_END)
}

fn inject_with(text: &str, payload: &str, begin: &str, end: &str) -> (String, BlockChange) {
    let mut lines = lines_of(text);
    let body = payload_lines(payload);

    if let Some((start, stop)) = find_span(&lines, begin, end) {
        let mut out: Vec<String> = lines[..=start].to_vec();
        out.extend(body);
        out.extend_from_slice(&lines[stop..]);
        let rendered = out.concat();
        if rendered == text {
            return (rendered, BlockChange::Unchanged);
        }
        return (rendered, BlockChange::Replaced);
    }

    let mut block = vec![format!("{}\n", begin)];
    block.extend(body);
    block.push(format!("{}\n", end));

    let at = match lines.iter().position(|l| is_top_heading(l)) {
        Some(h) => {
            if !lines[h].ends_with('\n') {
                lines[h].push('\n');
            }
            h + 1
        }
        None => 0,
    };
    lines.splice(at..at, block);
    (lines.concat(), BlockChange::Inserted)
}

pub fn extract_block(text: &str) -> Option<String> {
    extract_with(text, BLOCK_BEGIN, BLOCK_END)
}

fn extract_with(text: &str, begin: &str, end: &str) -> Option<String> {
    let lines = lines_of(text);
    let (start, stop) = find_span(&lines, begin, end)?;
    Some(lines[start + 1..stop].concat())
}

pub fn strip_block(text: &str) -> (String, bool) {
    strip_with(text, BLOCK_BEGIN, BLOCK_END)
}

fn strip_with(text: &str, begin: &str, end: &str) -> (String, bool) {
    let mut lines = lines_of(text);
    match find_span(&lines, begin, end) {
        Some((start, stop)) => {
            lines.drain(start..=stop);
            (lines.concat(), true)
        }
        None => (text.to_string(), false),
    }
}

pub fn has_block(text: &str) -> bool {
    find_span(&lines_of(text), BLOCK_BEGIN, BLOCK_END).is_some()
}

pub fn has_ignore_block(text: &str) -> bool {
    find_span(&lines_of(text), IGNORE_BEGIN, IGNORE_END).is_some()
}

pub fn inject_block_file(path: &Path, payload: &str) -> anyhow::Result<BlockChange> {
    let text = if path.is_file() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };
    let (rendered, change) = inject_block(&text, payload);
    if change != BlockChange::Unchanged {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, rendered)?;
    }
    Ok(change)
}

pub fn strip_block_file(path: &Path) -> anyhow::Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let text = std::fs::read_to_string(path)?;
    let (rendered, stripped) = strip_block(&text);
    if stripped {
        std::fs::write(path, rendered)?;
    }
    Ok(stripped)
}

pub fn merge_ignore(existing: Option<&str>, template: &str) -> String {
    let managed = extract_with(template, IGNORE_BEGIN, IGNORE_END)
        .unwrap_or_else(|| template.to_string());

    let user = match existing {
        None => String::new(),
        Some(text) => match extract_with(text, IGNORE_USER_BEGIN, IGNORE_USER_END) {
            Some(section) => section,
            None => strip_with(text, IGNORE_BEGIN, IGNORE_END).0,
        },
    };

    let mut out = vec![format!("{}\n", IGNORE_BEGIN)];
    out.extend(payload_lines(&managed));
    out.push(format!("{}\n", IGNORE_END));
    out.push(format!("{}\n", IGNORE_USER_BEGIN));
    out.extend(lines_of(&user).into_iter().map(|l| {
        if l.ends_with('\n') {
            l
        } else {
            format!("{}\n", l)
        }
    }));
    out.push(format!("{}\n", IGNORE_USER_END));
    out.concat()
}

/// Removes the managed section, unwrapping the user section in place.
///
/// The file should be deleted only when the user section is empty and every
/// other remaining line also appears in the managed section.
pub fn strip_ignore(text: &str) -> IgnoreStrip {
    let lines = lines_of(text);
    let managed: Vec<String> = match find_span(&lines, IGNORE_BEGIN, IGNORE_END) {
        Some((start, stop)) => lines[start + 1..stop]
            .iter()
            .map(|l| l.trim().to_string())
            .collect(),
        None => Vec::new(),
    };
    let (remaining, _) = strip_with(text, IGNORE_BEGIN, IGNORE_END);
    let remaining_lines = lines_of(&remaining);

    let mut kept = Vec::new();
    let mut user_content = false;
    let mut foreign = false;
    let mut in_user = false;
    for line in remaining_lines {
        if is_marker(&line, IGNORE_USER_BEGIN) {
            in_user = true;
            continue;
        }
        if is_marker(&line, IGNORE_USER_END) {
            in_user = false;
            continue;
        }
        let trimmed = line.trim();
        if in_user {
            if !trimmed.is_empty() {
                user_content = true;
            }
        } else if !trimmed.is_empty() && !managed.iter().any(|m| m == trimmed) {
            foreign = true;
        }
        kept.push(line);
    }

    if !user_content && !foreign {
        return IgnoreStrip::Delete;
    }
    IgnoreStrip::Keep(kept.concat())
}
