use crate::domain::models::{JsonOut, LifecycleReport, Manifest, RemovalReport};
use serde::Serialize;

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

fn list(label: &str, items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(format!("{}: {}", label, items.join(", ")))
    }
}

pub fn lifecycle_text(r: &LifecycleReport) -> String {
    let mut lines = vec![format!("{} ok\t{}", r.verb, r.target)];
    if let Some(o) = &r.options {
        lines.push(format!(
            "modes: install={:?} docs={:?} config={:?} metadata={:?}",
            o.install_mode, o.docs_mode, o.config_mode, o.metadata_mode
        )
        .to_lowercase());
    }
    lines.extend(
        [
            list("written", &r.written),
            list("preserved", &r.preserved),
            list("doc blocks", &r.doc_blocks),
            list("migrated", &r.migrated),
            list("removed policies", &r.removed_policies),
            list("normalized", &r.normalized),
        ]
        .into_iter()
        .flatten(),
    );
    for n in &r.notifications {
        lines.push(format!("note: {}", n));
    }
    lines.push(format!("manifest: {}", r.manifest));
    lines.join("\n")
}

pub fn removal_text(r: &RemovalReport) -> String {
    let mut lines = vec![format!("{} ok\t{}", r.verb, r.target)];
    if !r.manifest_found {
        lines.push("no manifest found; used default paths".to_string());
    }
    lines.extend(
        [
            list("removed", &r.removed),
            list("restored", &r.restored),
            list("stripped", &r.stripped),
        ]
        .into_iter()
        .flatten(),
    );
    lines.join("\n")
}

pub fn manifest_text(m: &Option<Manifest>) -> String {
    let Some(m) = m else {
        return "no manifest recorded".to_string();
    };
    let mut lines = vec![
        format!("mode: {:?}", m.mode).to_lowercase(),
        format!("updated_at: {}", m.updated_at),
    ];
    lines.extend(
        [
            list("core", &m.installed.core),
            list("config", &m.installed.config),
            list("docs", &m.installed.docs),
            list("doc blocks", &m.doc_blocks),
        ]
        .into_iter()
        .flatten(),
    );
    for n in &m.notifications {
        lines.push(format!("{}\t{}", n.timestamp, n.message));
    }
    lines.join("\n")
}
