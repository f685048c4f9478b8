//! Text rendering for CLI output.
//!
//! Every renderer takes the Engine's structured result and returns the
//! full text block; the binary decides between these and JSON.

use crate::graph::{EntityInfo, GraphStats, Recipient, SearchHit, SharedEntry, TreeNode};
use crate::record::RESERVED_KEYS;

fn kind_tag(kind: &str) -> String {
    if kind.is_empty() || kind == "object" {
        String::new()
    } else {
        format!(" [{kind}]")
    }
}

fn push_recipient(out: &mut String, indent: &str, rec: &Recipient) {
    if rec.why.is_empty() {
        out.push_str(&format!("{indent}{}\n", rec.uid));
    } else {
        out.push_str(&format!("{indent}{}: {}\n", rec.uid, rec.why));
    }
}

/// Full entity snapshot: reserved description fields first, then extras,
/// then the imports / shared / exported-to sections (omitted when empty).
pub fn entity(info: &EntityInfo) -> String {
    let mut out = String::new();
    out.push_str(&format!("uid: {}\n", info.uid));
    for key in RESERVED_KEYS {
        out.push_str(&format!(
            "{key}: {}\n",
            info.description.get(key).unwrap_or_default()
        ));
    }
    for (key, value) in info.description.iter() {
        if !RESERVED_KEYS.contains(&key) {
            out.push_str(&format!("{key}: {value}\n"));
        }
    }

    if !info.imports.is_empty() {
        out.push_str("\nimports:\n");
        for edge in &info.imports {
            out.push_str(&format!("  {}\n", edge.to_line()));
        }
    }
    if !info.shared.is_empty() {
        out.push_str("\nshared:\n");
        for uid in &info.shared {
            out.push_str(&format!("  {uid}\n"));
        }
    }
    if !info.exported_to.is_empty() {
        out.push_str("\nexported to:\n");
        for rec in &info.exported_to {
            push_recipient(&mut out, "  ", rec);
        }
    }
    out
}

pub fn shared_entries(items: &[SharedEntry]) -> String {
    if items.is_empty() {
        return "no shared entities\n".to_string();
    }
    let mut out = String::new();
    for item in items {
        out.push_str(&format!("\n{}:\n", item.shared_uid));
        out.push_str(&format!("  description: {}\n", item.description));
        if !item.recipients.is_empty() {
            out.push_str("  imported by:\n");
            for rec in &item.recipients {
                push_recipient(&mut out, "    ", rec);
            }
        }
    }
    out
}

pub fn recipients(recs: &[Recipient]) -> String {
    if recs.is_empty() {
        return "no recipients\n".to_string();
    }
    let mut out = String::new();
    for rec in recs {
        push_recipient(&mut out, "", rec);
    }
    out
}

/// Traversal tree with box-drawing connectors. Cycle leaves are marked
/// with `↻` and never expanded; parent edges carry a `(why: …)` suffix.
pub fn tree(root: &TreeNode) -> String {
    let mut out = String::new();
    let why = root
        .why
        .as_deref()
        .map(|w| format!("  (why: {w})"))
        .unwrap_or_default();
    out.push_str(&format!(
        "{}{}: {}{}\n",
        root.uid,
        kind_tag(&root.kind),
        root.purpose,
        why
    ));
    for (i, child) in root.children.iter().enumerate() {
        subtree(&mut out, child, "", i == root.children.len() - 1);
    }
    out
}

fn subtree(out: &mut String, node: &TreeNode, prefix: &str, is_last: bool) {
    let conn = if is_last { "└── " } else { "├── " };
    let cycle_mark = if node.cycle { " ↻" } else { "" };
    let why = node
        .why
        .as_deref()
        .map(|w| format!("  (why: {w})"))
        .unwrap_or_default();
    out.push_str(&format!(
        "{prefix}{conn}{}{}{cycle_mark}: {}{why}\n",
        node.uid,
        kind_tag(&node.kind),
        node.purpose
    ));
    if node.cycle {
        return;
    }
    let ext = if is_last { "    " } else { "│   " };
    for (i, child) in node.children.iter().enumerate() {
        subtree(out, child, &format!("{prefix}{ext}"), i == node.children.len() - 1);
    }
}

pub fn path(uids: &[String]) -> String {
    format!("{}\n", uids.join(" -> "))
}

pub fn search_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "no matches\n".to_string();
    }
    let mut out = String::new();
    for hit in hits {
        out.push_str(&format!("{}  [{}] {}\n", hit.uid, hit.field, hit.matched));
    }
    out
}

pub fn toc(uids: &[String]) -> String {
    let mut out = String::new();
    for (i, uid) in uids.iter().enumerate() {
        let tag = if i == 0 { " [root]" } else { "" };
        out.push_str(&format!("{uid}{tag}\n"));
    }
    out
}

pub fn cycles(found: &[Vec<String>]) -> String {
    if found.is_empty() {
        return "no cycles detected\n".to_string();
    }
    let mut out = String::new();
    for (i, cycle) in found.iter().enumerate() {
        out.push_str(&format!("cycle {}: {}\n", i + 1, cycle.join(" -> ")));
    }
    out
}

pub fn orphans(uids: &[String]) -> String {
    if uids.is_empty() {
        return "no orphans\n".to_string();
    }
    let mut out = String::new();
    for uid in uids {
        out.push_str(&format!("{uid}\n"));
    }
    out
}

pub fn stats(s: &GraphStats) -> String {
    format!(
        "entities:  {}\n  objects:   {}\n  functions: {}\n  external:  {}\nimports:   {}\nshared:    {}\ncycles:    {}\norphans:   {}\n",
        s.entities, s.objects, s.functions, s.externals, s.imports, s.shared, s.cycles, s.orphans
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Description, ImportEdge};

    fn node(uid: &str, kind: &str, purpose: &str, children: Vec<TreeNode>) -> TreeNode {
        TreeNode {
            uid: uid.to_string(),
            kind: kind.to_string(),
            purpose: purpose.to_string(),
            why: None,
            cycle: false,
            children,
        }
    }

    #[test]
    fn entity_orders_reserved_fields_and_sections() {
        let mut desc = Description::new();
        desc.set("source", "src/a.rs");
        desc.set("kind", "object");
        desc.set("purpose", "holds things");
        desc.set("notes", "extra");
        let info = EntityInfo {
            uid: "obj-11111111".to_string(),
            description: desc,
            imports: vec![ImportEdge::via("obj-22222222", "obj-33333333")],
            shared: vec![],
            exported_to: vec![Recipient {
                uid: "obj-44444444".to_string(),
                why: String::new(),
            }],
        };
        let text = entity(&info);
        assert_eq!(
            text,
            "uid: obj-11111111\n\
             source: src/a.rs\n\
             kind: object\n\
             purpose: holds things\n\
             notes: extra\n\
             \nimports:\n  obj-22222222 via=obj-33333333\n\
             \nexported to:\n  obj-44444444\n"
        );
    }

    #[test]
    fn tree_draws_connectors_and_cycle_marks() {
        let mut leaf = node("obj-cccccccc", "object", "back edge", vec![]);
        leaf.cycle = true;
        let mid = node("func-bbbbbbbb", "function", "middle", vec![leaf]);
        let other = node("obj-dddddddd", "external", "a dep", vec![]);
        let root = node("obj-aaaaaaaa", "object", "the root", vec![mid, other]);

        let text = tree(&root);
        assert_eq!(
            text,
            "obj-aaaaaaaa: the root\n\
             ├── func-bbbbbbbb [function]: middle\n\
             │   └── obj-cccccccc ↻: back edge\n\
             └── obj-dddddddd [external]: a dep\n"
        );
    }

    #[test]
    fn tree_renders_parent_reasons() {
        let mut parent = node("obj-bbbbbbbb", "object", "uses it", vec![]);
        parent.why = Some("needs the parser".to_string());
        let root = node("obj-aaaaaaaa", "object", "the root", vec![parent]);
        let text = tree(&root);
        assert!(text.contains("└── obj-bbbbbbbb: uses it  (why: needs the parser)"));
    }

    #[test]
    fn empty_collections_render_placeholders() {
        assert_eq!(recipients(&[]), "no recipients\n");
        assert_eq!(shared_entries(&[]), "no shared entities\n");
        assert_eq!(search_hits(&[]), "no matches\n");
        assert_eq!(cycles(&[]), "no cycles detected\n");
        assert_eq!(orphans(&[]), "no orphans\n");
    }

    #[test]
    fn toc_tags_the_root_entry() {
        let uids = vec!["obj-11111111".to_string(), "func-22222222".to_string()];
        assert_eq!(toc(&uids), "obj-11111111 [root]\nfunc-22222222\n");
    }
}
