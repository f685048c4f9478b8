//! Engine query operations: lookups, traversals, and graph analyses.
//!
//! Queries never mutate the store. The reverse index is authoritative but
//! fallback-checked: `all_importers` merges three precedence-ordered
//! passes so that a partially written reverse index (a crash between the
//! two writes of one mutation) still yields a complete answer.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::engine::Engine;
use super::types::{EntityInfo, GraphStats, Recipient, SearchHit, SharedEntry, TreeNode};
use crate::error::{DspError, Result};
use crate::record::Description;

/// Node states for the cycle-detection DFS.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl Engine {
    /// Full snapshot of one entity: description, forward edges, shared
    /// list, and the complete computed importer set.
    pub fn get_entity(&self, uid: &str) -> Result<EntityInfo> {
        self.store.ensure_init()?;
        self.store.require_entity(uid)?;
        Ok(EntityInfo {
            uid: uid.to_string(),
            description: self.store.read_description(uid)?,
            imports: self.store.read_imports(uid)?,
            shared: self.store.read_shared(uid)?,
            exported_to: self.all_importers(uid)?,
        })
    }

    /// The entity's shared declarations with their descriptions and
    /// recipient lists.
    pub fn get_shared(&self, uid: &str) -> Result<Vec<SharedEntry>> {
        self.store.ensure_init()?;
        self.store.require_entity(uid)?;
        let mut entries = Vec::new();
        for shared_uid in self.store.read_shared(uid)? {
            let description = self.store.read_shared_export_desc(uid, &shared_uid)?;
            let recipients = self
                .store
                .read_shared_entry_recipients(uid, &shared_uid)?
                .into_iter()
                .map(|(uid, why)| Recipient { uid, why })
                .collect();
            entries.push(SharedEntry {
                shared_uid,
                description,
                recipients,
            });
        }
        Ok(entries)
    }

    /// Everyone who imports the entity, with reasons.
    pub fn get_recipients(&self, uid: &str) -> Result<Vec<Recipient>> {
        self.store.ensure_init()?;
        self.store.require_entity(uid)?;
        self.all_importers(uid)
    }

    /// Complete reverse-edge set for `uid`, de-duplicated by recipient
    /// (first occurrence wins), in three precedence-ordered passes:
    /// 1. direct records at uid's own export area;
    /// 2. recipients recorded under other entities' shared sub-collections
    ///    for uid;
    /// 3. a consistency scan over forward edges, added with empty reason.
    pub(crate) fn all_importers(&self, uid: &str) -> Result<Vec<Recipient>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut result: Vec<Recipient> = Vec::new();

        for (rec_uid, why) in self.store.read_direct_recipients(uid)? {
            if seen.insert(rec_uid.clone()) {
                result.push(Recipient { uid: rec_uid, why });
            }
        }

        let all_uids = self.store.all_uids()?;
        for other in &all_uids {
            if self.store.read_shared(other)?.iter().any(|s| s == uid) {
                for (rec_uid, why) in self.store.read_shared_entry_recipients(other, uid)? {
                    if seen.insert(rec_uid.clone()) {
                        result.push(Recipient { uid: rec_uid, why });
                    }
                }
            }
        }

        for other in &all_uids {
            if seen.contains(other) {
                continue;
            }
            if self.store.read_import_uids(other)?.iter().any(|u| u == uid) {
                seen.insert(other.clone());
                result.push(Recipient {
                    uid: other.clone(),
                    why: String::new(),
                });
            }
        }

        Ok(result)
    }

    /// Bounded-depth import tree below `uid`. A single visited set spans
    /// the whole traversal: any uid met a second time becomes a cycle
    /// leaf, so the walk terminates on cyclic graphs at any depth.
    pub fn get_children(&self, uid: &str, depth: usize) -> Result<TreeNode> {
        self.store.ensure_init()?;
        self.store.require_entity(uid)?;
        let mut visited: HashSet<String> = HashSet::new();
        self.walk_children(uid, depth, &mut visited)
    }

    fn walk_children(
        &self,
        uid: &str,
        depth: usize,
        visited: &mut HashSet<String>,
    ) -> Result<TreeNode> {
        let mut node = self.tree_node(uid)?;
        if visited.contains(uid) {
            node.cycle = true;
            return Ok(node);
        }
        visited.insert(uid.to_string());
        if depth > 0 {
            for edge in self.store.read_imports(uid)? {
                node.children
                    .push(self.walk_children(&edge.uid, depth - 1, visited)?);
            }
        }
        Ok(node)
    }

    /// Bounded-depth importer tree above `uid`. Parent edges carry the
    /// original reason text.
    pub fn get_parents(&self, uid: &str, depth: usize) -> Result<TreeNode> {
        self.store.ensure_init()?;
        self.store.require_entity(uid)?;
        let mut visited: HashSet<String> = HashSet::new();
        self.walk_parents(uid, depth, &mut visited)
    }

    fn walk_parents(
        &self,
        uid: &str,
        depth: usize,
        visited: &mut HashSet<String>,
    ) -> Result<TreeNode> {
        let mut node = self.tree_node(uid)?;
        if visited.contains(uid) {
            node.cycle = true;
            return Ok(node);
        }
        visited.insert(uid.to_string());
        if depth > 0 {
            for recipient in self.all_importers(uid)? {
                let mut child = self.walk_parents(&recipient.uid, depth - 1, visited)?;
                child.why = Some(recipient.why);
                node.children.push(child);
            }
        }
        Ok(node)
    }

    fn tree_node(&self, uid: &str) -> Result<TreeNode> {
        let desc = if self.store.entity_exists(uid) {
            self.store.read_description(uid)?
        } else {
            Description::new()
        };
        Ok(TreeNode {
            uid: uid.to_string(),
            kind: desc.get("kind").unwrap_or_default().to_string(),
            purpose: desc.get("purpose").unwrap_or_default().to_string(),
            why: None,
            cycle: false,
            children: Vec::new(),
        })
    }

    /// Breadth-first shortest path over the undirected union of import
    /// and computed-importer edges. Neighbors expand in lexicographic
    /// order, making results deterministic. Returns the uid sequence
    /// including both endpoints, or `None` if unreachable.
    pub fn get_path(&self, from: &str, to: &str) -> Result<Option<Vec<String>>> {
        self.store.ensure_init()?;
        self.store.require_entity(from)?;
        self.store.require_entity(to)?;
        if from == to {
            return Ok(Some(vec![from.to_string()]));
        }

        let mut visited: HashSet<String> = HashSet::from([from.to_string()]);
        let mut queue: VecDeque<(String, Vec<String>)> =
            VecDeque::from([(from.to_string(), vec![from.to_string()])]);

        while let Some((current, path)) = queue.pop_front() {
            let mut neighbors: BTreeSet<String> = BTreeSet::new();
            for edge in self.store.read_imports(&current)? {
                neighbors.insert(edge.uid);
            }
            for recipient in self.all_importers(&current)? {
                neighbors.insert(recipient.uid);
            }
            for neighbor in neighbors {
                if neighbor == to {
                    let mut found = path;
                    found.push(neighbor);
                    return Ok(Some(found));
                }
                if !visited.contains(&neighbor) && self.store.entity_exists(&neighbor) {
                    visited.insert(neighbor.clone());
                    let mut next = path.clone();
                    next.push(neighbor.clone());
                    queue.push_back((neighbor, next));
                }
            }
        }
        Ok(None)
    }

    /// Case-insensitive substring search across every description field
    /// value (first matching field wins per entity), falling back to
    /// export-area entry names.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.store.ensure_init()?;
        let needle = query.to_lowercase();
        let mut hits: Vec<SearchHit> = Vec::new();

        for uid in self.store.all_uids()? {
            let desc = self.store.read_description(&uid)?;
            let field_hit = desc
                .iter()
                .find(|(_, value)| value.to_lowercase().contains(&needle));
            if let Some((field, value)) = field_hit {
                hits.push(SearchHit {
                    uid,
                    field: field.to_string(),
                    matched: value.to_string(),
                });
                continue;
            }
            let entry_hit = self
                .store
                .export_entry_names(&uid)?
                .into_iter()
                .find(|name| name.to_lowercase().contains(&needle));
            if let Some(name) = entry_hit {
                hits.push(SearchHit {
                    uid,
                    field: "exports".to_string(),
                    matched: name,
                });
            }
        }
        Ok(hits)
    }

    /// Find entities whose `source` is the given path or a `path#symbol`
    /// under it. Case-sensitive; path separators normalized to `/`.
    pub fn find_by_source(&self, source_path: &str) -> Result<Vec<String>> {
        self.store.ensure_init()?;
        let normalized = source_path.replace('\\', "/");
        let prefix = format!("{}#", normalized);
        let mut found = Vec::new();
        for uid in self.store.all_uids()? {
            let desc = self.store.read_description(&uid)?;
            let source = desc.get("source").unwrap_or_default().replace('\\', "/");
            if source == normalized || source.starts_with(&prefix) {
                found.push(uid);
            }
        }
        Ok(found)
    }

    /// Ordered uid list of the addressed TOC; the first entry is the
    /// designated root.
    pub fn read_toc(&self, root_uid: Option<&str>) -> Result<Vec<String>> {
        self.store.ensure_init()?;
        let path = self.store.toc_path(root_uid);
        if !path.exists() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            return Err(DspError::TocNotFound(name));
        }
        self.store.read_lines(&path)
    }

    /// Three-color depth-first search over the import relation. Each time
    /// a gray node is re-encountered, the cycle is the suffix of the DFS
    /// stack from that node's first occurrence through the repeated node.
    /// Returns every distinct cycle found across the whole graph.
    pub fn detect_cycles(&self) -> Result<Vec<Vec<String>>> {
        self.store.ensure_init()?;
        let all_uids = self.store.all_uids()?;
        let mut colors: HashMap<String, Color> = all_uids
            .iter()
            .map(|u| (u.clone(), Color::White))
            .collect();
        let mut stack: Vec<String> = Vec::new();
        let mut cycles: Vec<Vec<String>> = Vec::new();

        for uid in &all_uids {
            if colors[uid] == Color::White {
                self.dfs_cycles(uid, &mut colors, &mut stack, &mut cycles)?;
            }
        }
        Ok(cycles)
    }

    fn dfs_cycles(
        &self,
        uid: &str,
        colors: &mut HashMap<String, Color>,
        stack: &mut Vec<String>,
        cycles: &mut Vec<Vec<String>>,
    ) -> Result<()> {
        colors.insert(uid.to_string(), Color::Gray);
        stack.push(uid.to_string());
        for imported in self.store.read_import_uids(uid)? {
            // Uids with no directory have no color entry; skip them.
            match colors.get(&imported) {
                Some(Color::Gray) => {
                    let start = stack
                        .iter()
                        .position(|u| *u == imported)
                        .expect("gray node is on the stack");
                    let mut cycle: Vec<String> = stack[start..].to_vec();
                    cycle.push(imported.clone());
                    cycles.push(cycle);
                }
                Some(Color::White) => {
                    self.dfs_cycles(&imported, colors, stack, cycles)?;
                }
                _ => {}
            }
        }
        stack.pop();
        colors.insert(uid.to_string(), Color::Black);
        Ok(())
    }

    /// Entities reachable neither as a TOC root, nor as the imported or
    /// via value of any edge, with an empty export area.
    pub fn get_orphans(&self) -> Result<Vec<String>> {
        self.store.ensure_init()?;

        let mut roots: HashSet<String> = HashSet::new();
        for toc in self.store.all_toc_paths()? {
            if let Some(first) = self.store.read_lines(&toc)?.first() {
                roots.insert(first.clone());
            }
        }

        let all_uids = self.store.all_uids()?;
        let mut referenced: HashSet<String> = HashSet::new();
        for uid in &all_uids {
            for edge in self.store.read_imports(uid)? {
                referenced.insert(edge.uid);
                if let Some(via) = edge.via {
                    referenced.insert(via);
                }
            }
        }

        let mut orphans = Vec::new();
        for uid in all_uids {
            if roots.contains(&uid) || referenced.contains(&uid) {
                continue;
            }
            if self.store.has_exports(&uid)? {
                continue;
            }
            orphans.push(uid);
        }
        Ok(orphans)
    }

    /// Aggregate counts over the whole graph. A read-only rollup of the
    /// other queries; entities with no `kind` count as objects.
    pub fn get_stats(&self) -> Result<GraphStats> {
        self.store.ensure_init()?;
        let all_uids = self.store.all_uids()?;
        let mut stats = GraphStats {
            entities: all_uids.len(),
            ..GraphStats::default()
        };
        for uid in &all_uids {
            let desc = self.store.read_description(uid)?;
            match desc.get("kind").unwrap_or("object") {
                "external" => stats.externals += 1,
                "function" => stats.functions += 1,
                _ => stats.objects += 1,
            }
            stats.imports += self.store.read_import_uids(uid)?.len();
            stats.shared += self.store.read_shared(uid)?.len();
        }
        stats.cycles = self.detect_cycles()?.len();
        stats.orphans = self.get_orphans()?.len();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ImportEdge;
    use crate::store::Store;
    use tempfile::tempdir;

    fn engine() -> (tempfile::TempDir, Engine) {
        let dir = tempdir().unwrap();
        let engine = Engine::new(Store::new(dir.path()));
        engine.init().unwrap();
        (dir, engine)
    }

    fn obj(engine: &Engine, purpose: &str) -> String {
        engine
            .create_object(&format!("src/{}.rs", purpose), purpose, "object", None)
            .unwrap()
    }

    #[test]
    fn get_entity_returns_merged_description() {
        let (_dir, engine) = engine();
        let a = obj(&engine, "alpha");
        let mut patch = Description::new();
        patch.set("notes", "some notes");
        engine.update_description(&a, &patch).unwrap();

        let info = engine.get_entity(&a).unwrap();
        assert_eq!(info.description.get("purpose"), Some("alpha"));
        assert_eq!(info.description.get("notes"), Some("some notes"));
        let keys: Vec<&str> = info.description.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["source", "kind", "purpose", "notes"]);
    }

    #[test]
    fn importer_passes_merge_with_precedence() {
        let (_dir, engine) = engine();
        let target = obj(&engine, "target");
        let direct = obj(&engine, "direct");
        let via_user = obj(&engine, "via_user");
        let exporter = obj(&engine, "exporter");
        let silent = obj(&engine, "silent");

        engine.add_import(&direct, &target, "direct reason", None).unwrap();
        engine.create_shared(&exporter, &[target.clone()]).unwrap();
        engine
            .add_import(&via_user, &target, "shared reason", Some(&exporter))
            .unwrap();
        // A forward edge with no reverse record: only the scan sees it.
        engine
            .store()
            .append_line_unique(
                &engine.store().imports_path(&silent),
                &ImportEdge::direct(&target).to_line(),
            )
            .unwrap();

        let recipients = engine.get_recipients(&target).unwrap();
        let uids: Vec<String> = recipients.iter().map(|r| r.uid.clone()).collect();
        assert_eq!(uids, vec![direct, via_user, silent]);
        assert_eq!(recipients[0].why, "direct reason");
        assert_eq!(recipients[1].why, "shared reason");
        assert_eq!(recipients[2].why, "");
    }

    #[test]
    fn first_occurrence_wins_across_passes() {
        let (_dir, engine) = engine();
        let target = obj(&engine, "target");
        let user = obj(&engine, "user");

        engine.add_import(&user, &target, "direct reason", None).unwrap();
        // The same user would also be found by the scan; it must appear
        // once, with the direct-record reason.
        let recipients = engine.get_recipients(&target).unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].why, "direct reason");
    }

    #[test]
    fn children_depth_zero_is_root_only() {
        let (_dir, engine) = engine();
        let a = obj(&engine, "a");
        let b = obj(&engine, "b");
        engine.add_import(&a, &b, "uses", None).unwrap();

        let tree = engine.get_children(&a, 0).unwrap();
        assert_eq!(tree.uid, a);
        assert!(tree.children.is_empty());
        assert!(!tree.cycle);
    }

    #[test]
    fn children_traversal_terminates_on_cycles() {
        let (_dir, engine) = engine();
        let a = obj(&engine, "a");
        let b = obj(&engine, "b");
        engine.add_import(&a, &b, "a uses b", None).unwrap();
        engine.add_import(&b, &a, "b uses a", None).unwrap();

        let tree = engine.get_children(&a, 5).unwrap();
        assert_eq!(tree.children.len(), 1);
        let b_node = &tree.children[0];
        assert_eq!(b_node.uid, b);
        assert!(!b_node.cycle);
        let a_again = &b_node.children[0];
        assert_eq!(a_again.uid, a);
        assert!(a_again.cycle, "second occurrence is a cycle leaf");
        assert!(a_again.children.is_empty());
    }

    #[test]
    fn parents_carry_reason_text() {
        let (_dir, engine) = engine();
        let lib = obj(&engine, "lib");
        let app = obj(&engine, "app");
        engine.add_import(&app, &lib, "app links lib", None).unwrap();

        let tree = engine.get_parents(&lib, 1).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].uid, app);
        assert_eq!(tree.children[0].why.as_deref(), Some("app links lib"));
    }

    #[test]
    fn path_follows_chain() {
        let (_dir, engine) = engine();
        let a = obj(&engine, "a");
        let b = obj(&engine, "b");
        let c = obj(&engine, "c");
        let d = obj(&engine, "d");
        engine.add_import(&a, &b, "", None).unwrap();
        engine.add_import(&b, &c, "", None).unwrap();
        engine.add_import(&c, &d, "", None).unwrap();

        let path = engine.get_path(&a, &d).unwrap().unwrap();
        assert_eq!(path, vec![a, b, c, d]);
    }

    #[test]
    fn path_traverses_edges_backwards_too() {
        let (_dir, engine) = engine();
        let a = obj(&engine, "a");
        let b = obj(&engine, "b");
        let c = obj(&engine, "c");
        // a -> b <- c : reachable only by walking c's edge in reverse.
        engine.add_import(&a, &b, "", None).unwrap();
        engine.add_import(&c, &b, "", None).unwrap();

        let path = engine.get_path(&a, &c).unwrap().unwrap();
        assert_eq!(path, vec![a, b, c]);
    }

    #[test]
    fn path_to_self_is_single_element() {
        let (_dir, engine) = engine();
        let a = obj(&engine, "a");
        assert_eq!(engine.get_path(&a, &a).unwrap(), Some(vec![a]));
    }

    #[test]
    fn disconnected_nodes_have_no_path() {
        let (_dir, engine) = engine();
        let a = obj(&engine, "a");
        let b = obj(&engine, "b");
        assert_eq!(engine.get_path(&a, &b).unwrap(), None);
    }

    #[test]
    fn search_matches_description_fields_first() {
        let (_dir, engine) = engine();
        let a = engine
            .create_object("src/auth.rs", "Handles Login flows", "object", None)
            .unwrap();
        let hits = engine.search("login").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].uid, a);
        assert_eq!(hits[0].field, "purpose");
    }

    #[test]
    fn search_falls_back_to_export_entries() {
        let (_dir, engine) = engine();
        let target = obj(&engine, "target");
        let importer = engine
            .create_object("src/member.rs", "nothing matching", "object", None)
            .unwrap();
        engine.add_import(&importer, &target, "why", None).unwrap();

        // Nothing in target's description contains the importer's uid, but
        // its export area has a file named after the importer.
        let hits = engine.search(&importer).unwrap();
        assert!(hits
            .iter()
            .any(|h| h.uid == target && h.field == "exports" && h.matched == importer));
    }

    #[test]
    fn find_by_source_matches_exact_and_symbol_suffix() {
        let (_dir, engine) = engine();
        let file = engine
            .create_object("src/codec.rs", "codec", "object", None)
            .unwrap();
        let sym = engine
            .create_function("src/codec.rs#parse", "parses", None, None)
            .unwrap();
        let other = engine
            .create_object("src/codec_extra.rs", "other", "object", None)
            .unwrap();

        let mut found = engine.find_by_source("src/codec.rs").unwrap();
        found.sort();
        let mut expected = vec![file, sym];
        expected.sort();
        assert_eq!(found, expected);
        assert!(!engine.find_by_source("src/codec.rs").unwrap().contains(&other));
    }

    #[test]
    fn find_by_source_normalizes_separators() {
        let (_dir, engine) = engine();
        let uid = engine
            .create_object("src\\win\\mod.rs", "windows path", "object", None)
            .unwrap();
        assert_eq!(engine.find_by_source("src/win/mod.rs").unwrap(), vec![uid]);
    }

    #[test]
    fn read_toc_reports_missing_file() {
        let (_dir, engine) = engine();
        assert!(matches!(
            engine.read_toc(None),
            Err(DspError::TocNotFound(_))
        ));
        let a = obj(&engine, "a");
        assert_eq!(engine.read_toc(None).unwrap(), vec![a]);
    }

    #[test]
    fn detect_cycles_finds_triangle_once() {
        let (_dir, engine) = engine();
        let a = obj(&engine, "a");
        let b = obj(&engine, "b");
        let c = obj(&engine, "c");
        engine.add_import(&a, &b, "", None).unwrap();
        engine.add_import(&b, &c, "", None).unwrap();
        engine.add_import(&c, &a, "", None).unwrap();

        let cycles = engine.detect_cycles().unwrap();
        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        assert_eq!(cycle.first(), cycle.last());
        let members: HashSet<&String> = cycle.iter().collect();
        assert!(members.contains(&a) && members.contains(&b) && members.contains(&c));
    }

    #[test]
    fn detect_cycles_on_dag_is_empty() {
        let (_dir, engine) = engine();
        let a = obj(&engine, "a");
        let b = obj(&engine, "b");
        let c = obj(&engine, "c");
        engine.add_import(&a, &b, "", None).unwrap();
        engine.add_import(&a, &c, "", None).unwrap();
        engine.add_import(&b, &c, "", None).unwrap();

        assert!(engine.detect_cycles().unwrap().is_empty());
    }

    #[test]
    fn orphan_scenario() {
        let (_dir, engine) = engine();
        // o1 is the default TOC root; o2 is unreferenced and exports
        // nothing.
        let _o1 = obj(&engine, "rooted");
        let o2 = obj(&engine, "loose");

        assert_eq!(engine.get_orphans().unwrap(), vec![o2]);
    }

    #[test]
    fn exporting_entities_are_not_orphans() {
        let (_dir, engine) = engine();
        let _root = obj(&engine, "root");
        let target = obj(&engine, "target");
        let user = obj(&engine, "user");
        engine.add_import(&user, &target, "", None).unwrap();

        // target gained an export record, so it is not an orphan even
        // though it is also referenced. Importing something does not
        // protect user itself.
        assert_eq!(engine.get_orphans().unwrap(), vec![user]);
    }

    #[test]
    fn stats_roll_up_counts() {
        let (_dir, engine) = engine();
        let a = obj(&engine, "a");
        let b = obj(&engine, "b");
        let f = engine
            .create_function("src/f.rs", "fn", None, None)
            .unwrap();
        let _ext = engine
            .create_object("vendor/x", "external dep", "external", None)
            .unwrap();
        engine.add_import(&a, &b, "", None).unwrap();
        engine.add_import(&b, &a, "", None).unwrap();
        engine.create_shared(&a, &[f.clone()]).unwrap();

        let stats = engine.get_stats().unwrap();
        assert_eq!(stats.entities, 4);
        assert_eq!(stats.objects, 2);
        assert_eq!(stats.functions, 1);
        assert_eq!(stats.externals, 1);
        assert_eq!(stats.imports, 2);
        assert_eq!(stats.shared, 1);
        assert_eq!(stats.cycles, 1);
    }
}
