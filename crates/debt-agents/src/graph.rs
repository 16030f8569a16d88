//! Dependency-graph analysis for the Architect.
//!
//! Imports are extracted with language-dependent text patterns (no real
//! parsing), assembled into a petgraph digraph, and checked for cycles and
//! layer violations. Cycle findings carry confidence 0.95, layer
//! violations 0.8; both are emitted alongside the Architect's LLM findings.

use std::collections::{BTreeSet, HashMap};

use adjudication::config::LayerPattern;
use adjudication::finding::{DebtType, Finding, Severity};
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;
use tracing::{debug, warn};

const CYCLE_CONFIDENCE: f64 = 0.95;
const LAYER_VIOLATION_CONFIDENCE: f64 = 0.8;

/// Builds the import graph and reports structural findings.
pub struct DependencyAnalyzer {
    import_patterns: Vec<Regex>,
    layers: Vec<(Regex, u32, String)>,
}

impl DependencyAnalyzer {
    pub fn new(layer_patterns: &[LayerPattern]) -> Self {
        let import_patterns = [
            // ES modules and TypeScript.
            r#"(?m)^\s*import\s+(?:[\w${}\s,*]+\s+from\s+)?['"]([^'"]+)['"]"#,
            r#"require\(\s*['"]([^'"]+)['"]\s*\)"#,
            // Python.
            r"(?m)^\s*from\s+([\w.]+)\s+import\b",
            r"(?m)^\s*import\s+([\w.]+)\s*$",
            // Rust paths rooted in the crate.
            r"(?m)^\s*use\s+crate::([\w:]+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

        let layers = layer_patterns
            .iter()
            .filter_map(|lp| match Regex::new(&lp.pattern) {
                Ok(re) => Some((re, lp.level, lp.name.clone())),
                Err(e) => {
                    warn!(pattern = %lp.pattern, error = %e, "invalid layer pattern skipped");
                    None
                }
            })
            .collect();

        Self {
            import_patterns,
            layers,
        }
    }

    /// Analyze `(path, content)` pairs and emit structural findings.
    pub fn analyze(&self, files: &[(String, String)]) -> Vec<Finding> {
        let modules: HashMap<String, &str> = files
            .iter()
            .map(|(path, _)| (module_key(path), path.as_str()))
            .collect();

        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let mut node_of = |graph: &mut DiGraph<String, ()>, path: &str| -> NodeIndex {
            *nodes
                .entry(path.to_string())
                .or_insert_with(|| graph.add_node(path.to_string()))
        };

        for (path, content) in files {
            let from = node_of(&mut graph, path);
            for spec in self.extract_imports(content) {
                if let Some(target) = resolve_import(&spec, path, &modules) {
                    if target != *path {
                        let to = node_of(&mut graph, &target);
                        graph.update_edge(from, to, ());
                    }
                }
            }
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "dependency graph assembled"
        );

        let mut findings = self.cycle_findings(&graph);
        findings.extend(self.layer_findings(&graph));
        findings
    }

    fn extract_imports(&self, content: &str) -> Vec<String> {
        let mut specs = Vec::new();
        for pattern in &self.import_patterns {
            for captures in pattern.captures_iter(content) {
                if let Some(m) = captures.get(1) {
                    specs.push(m.as_str().to_string());
                }
            }
        }
        specs
    }

    /// Iterative DFS with an explicit recursion stack. A back edge to an
    /// on-stack node closes a cycle; cycles are deduplicated by node set.
    fn cycle_findings(&self, graph: &DiGraph<String, ()>) -> Vec<Finding> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Gray,
            Black,
        }

        let mut marks = vec![Mark::White; graph.node_count()];
        let mut seen_cycles: BTreeSet<Vec<String>> = BTreeSet::new();
        let mut findings = Vec::new();

        let mut roots: Vec<NodeIndex> = graph.node_indices().collect();
        roots.sort_by(|a, b| graph[*a].cmp(&graph[*b]));

        for root in roots {
            if marks[root.index()] != Mark::White {
                continue;
            }
            // Stack of (node, neighbor iterator position); path mirrors the
            // gray chain.
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
            let mut path: Vec<NodeIndex> = Vec::new();

            marks[root.index()] = Mark::Gray;
            path.push(root);
            stack.push((root, sorted_neighbors(graph, root), 0));

            while let Some((node, neighbors, cursor)) = stack.last_mut() {
                if *cursor >= neighbors.len() {
                    marks[node.index()] = Mark::Black;
                    path.pop();
                    stack.pop();
                    continue;
                }
                let next = neighbors[*cursor];
                *cursor += 1;
                match marks[next.index()] {
                    Mark::White => {
                        marks[next.index()] = Mark::Gray;
                        path.push(next);
                        stack.push((next, sorted_neighbors(graph, next), 0));
                    }
                    Mark::Gray => {
                        let start = path.iter().position(|n| *n == next).unwrap_or(0);
                        let cycle: Vec<String> =
                            path[start..].iter().map(|n| graph[*n].clone()).collect();
                        let mut key = cycle.clone();
                        key.sort();
                        if seen_cycles.insert(key) {
                            findings.push(cycle_finding(&cycle));
                        }
                    }
                    Mark::Black => {}
                }
            }
        }
        findings
    }

    fn layer_findings(&self, graph: &DiGraph<String, ()>) -> Vec<Finding> {
        if self.layers.is_empty() {
            return Vec::new();
        }
        let mut findings = Vec::new();
        let mut edges: Vec<_> = graph
            .edge_indices()
            .filter_map(|e| graph.edge_endpoints(e))
            .collect();
        edges.sort_by(|a, b| (&graph[a.0], &graph[a.1]).cmp(&(&graph[b.0], &graph[b.1])));

        for (from, to) in edges {
            let importer = &graph[from];
            let importee = &graph[to];
            let (Some((from_level, from_layer)), Some((to_level, to_layer))) =
                (self.layer_of(importer), self.layer_of(importee))
            else {
                continue;
            };
            // Lower layers must not reach up into higher ones.
            if from_level < to_level {
                findings.push(
                    Finding::new(
                        DebtType::LayerViolation,
                        Severity::Medium,
                        LAYER_VIOLATION_CONFIDENCE,
                        format!("Layer violation: {from_layer} imports {to_layer}"),
                        format!(
                            "{importer} (layer {from_layer}, level {from_level}) depends on \
                             {importee} (layer {to_layer}, level {to_level})"
                        ),
                        importer.clone(),
                        None,
                        None,
                    )
                    .with_evidence(vec![format!("{importer} -> {importee}")]),
                );
            }
        }
        findings
    }

    fn layer_of(&self, path: &str) -> Option<(u32, &str)> {
        self.layers
            .iter()
            .find(|(re, _, _)| re.is_match(path))
            .map(|(_, level, name)| (*level, name.as_str()))
    }
}

fn sorted_neighbors(graph: &DiGraph<String, ()>, node: NodeIndex) -> Vec<NodeIndex> {
    let mut neighbors: Vec<NodeIndex> = graph.neighbors(node).collect();
    neighbors.sort_by(|a, b| graph[*a].cmp(&graph[*b]));
    neighbors
}

fn cycle_finding(cycle: &[String]) -> Finding {
    // Rotate so the lexicographically smallest module leads; keeps the
    // finding deterministic regardless of DFS entry point.
    let pivot = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let rotated: Vec<&str> = cycle[pivot..]
        .iter()
        .chain(cycle[..pivot].iter())
        .map(String::as_str)
        .collect();
    let path_text = format!("{} -> {}", rotated.join(" -> "), rotated[0]);

    Finding::new(
        DebtType::CircularDependency,
        Severity::High,
        CYCLE_CONFIDENCE,
        format!("Circular dependency: {path_text}"),
        format!(
            "{} modules form an import cycle; none can be changed or tested in isolation",
            rotated.len()
        ),
        rotated[0],
        None,
        None,
    )
    .with_evidence(vec![path_text])
}

fn module_key(path: &str) -> String {
    let without_ext = match path.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => path,
    };
    without_ext.trim_start_matches("./").to_string()
}

/// Map an import specifier back to a repository file, best effort.
fn resolve_import(
    spec: &str,
    importer: &str,
    modules: &HashMap<String, &str>,
) -> Option<String> {
    let key = if spec.starts_with('.') {
        let dir = importer.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        normalize_path(dir, spec)
    } else {
        spec.replace("::", "/").replace('.', "/")
    };
    modules.get(&key).map(|path| (*path).to_string())
}

/// Join `dir` and a relative specifier, resolving `.` and `..` segments.
fn normalize_path(dir: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(path: &str, imports: &[&str]) -> (String, String) {
        let body = imports
            .iter()
            .map(|i| format!("import {{ x }} from '{i}';"))
            .collect::<Vec<_>>()
            .join("\n");
        (path.to_string(), body)
    }

    #[test]
    fn three_module_cycle_yields_one_finding() {
        let analyzer = DependencyAnalyzer::new(&[]);
        let files = vec![
            ts("a.ts", &["./b"]),
            ts("b.ts", &["./c"]),
            ts("c.ts", &["./a"]),
        ];
        let findings = analyzer.analyze(&files);
        let cycles: Vec<_> = findings
            .iter()
            .filter(|f| f.debt_type == DebtType::CircularDependency)
            .collect();
        assert_eq!(cycles.len(), 1);
        let cycle = cycles[0];
        assert_eq!(cycle.severity, Severity::High);
        assert!((cycle.confidence - 0.95).abs() < 1e-9);
        assert_eq!(cycle.file_path, "a.ts");
        assert!(cycle.title.contains("a.ts -> b.ts -> c.ts -> a.ts"));
    }

    #[test]
    fn acyclic_graph_yields_no_cycle_findings() {
        let analyzer = DependencyAnalyzer::new(&[]);
        let files = vec![ts("a.ts", &["./b"]), ts("b.ts", &["./c"]), ts("c.ts", &[])];
        assert!(analyzer.analyze(&files).is_empty());
    }

    #[test]
    fn self_import_is_ignored() {
        let analyzer = DependencyAnalyzer::new(&[]);
        let files = vec![ts("a.ts", &["./a"])];
        assert!(analyzer.analyze(&files).is_empty());
    }

    #[test]
    fn two_member_cycle_detected_once() {
        let analyzer = DependencyAnalyzer::new(&[]);
        let files = vec![ts("a.ts", &["./b"]), ts("b.ts", &["./a"])];
        let findings = analyzer.analyze(&files);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn relative_imports_resolve_through_directories() {
        let analyzer = DependencyAnalyzer::new(&[]);
        let files = vec![
            ts("src/ui/view.ts", &["../core/model"]),
            ts("src/core/model.ts", &["../ui/view"]),
        ];
        let findings = analyzer.analyze(&files);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].debt_type, DebtType::CircularDependency);
    }

    #[test]
    fn layer_violation_when_lower_level_reaches_up() {
        let layers = vec![
            LayerPattern {
                pattern: "^src/domain/".into(),
                level: 1,
                name: "domain".into(),
            },
            LayerPattern {
                pattern: "^src/ui/".into(),
                level: 3,
                name: "ui".into(),
            },
        ];
        let analyzer = DependencyAnalyzer::new(&layers);
        let files = vec![
            ts("src/domain/order.ts", &["../ui/dialog"]),
            ts("src/ui/dialog.ts", &[]),
        ];
        let findings = analyzer.analyze(&files);
        assert_eq!(findings.len(), 1);
        let violation = &findings[0];
        assert_eq!(violation.debt_type, DebtType::LayerViolation);
        assert!((violation.confidence - 0.8).abs() < 1e-9);
        assert_eq!(violation.file_path, "src/domain/order.ts");
        assert!(violation.title.contains("domain imports ui"));
    }

    #[test]
    fn downward_dependencies_are_fine() {
        let layers = vec![
            LayerPattern {
                pattern: "^src/domain/".into(),
                level: 1,
                name: "domain".into(),
            },
            LayerPattern {
                pattern: "^src/ui/".into(),
                level: 3,
                name: "ui".into(),
            },
        ];
        let analyzer = DependencyAnalyzer::new(&layers);
        let files = vec![
            ts("src/ui/dialog.ts", &["../domain/order"]),
            ts("src/domain/order.ts", &[]),
        ];
        assert!(analyzer.analyze(&files).is_empty());
    }

    #[test]
    fn python_and_require_imports_are_extracted() {
        let analyzer = DependencyAnalyzer::new(&[]);
        let files = vec![
            (
                "pkg/first.py".to_string(),
                "from pkg.second import thing\n".to_string(),
            ),
            (
                "pkg/second.py".to_string(),
                "import pkg.first\n".to_string(),
            ),
        ];
        let findings = analyzer.analyze(&files);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].debt_type, DebtType::CircularDependency);
    }
}
