//! log command - Display the hierarchy as a tree
//!
//! Walks down from the root. Boss-less admins are shown directly under the
//! root, since that is who they report to. Nodes the walk cannot reach
//! (because of broken boss links) are listed separately.

use std::collections::{HashMap, HashSet};

use anyhow::Result;

use crate::cli::Context;
use crate::core::graph::OrgGraph;
use crate::core::node::Node;
use crate::core::types::{NodeId, Role};

/// Display the hierarchy.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `long` - Include node ids and worker counts
pub async fn log(ctx: &Context, long: bool) -> Result<()> {
    let manager = ctx.open_initialized().await?;
    let root_id = manager.registry().root_id()?;
    let nodes = manager.snapshot().await?;

    let lines = render_tree(&nodes, root_id, long);
    for line in &lines.tree {
        println!("{}", line);
    }

    if !lines.unreachable.is_empty() {
        println!();
        println!("Unreachable from root:");
        for line in &lines.unreachable {
            println!("  {}", line);
        }
        if !ctx.quiet {
            eprintln!();
            eprintln!("Run 'orgtree doctor' for details.");
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct TreeLines {
    tree: Vec<String>,
    unreachable: Vec<String>,
}

fn label(node: &Node, long: bool) -> String {
    let mut out = node.username.to_string();
    if node.role == Role::Admin {
        out.push_str(" [admin]");
    }
    if long {
        out.push_str(&format!(" ({}, {} worker(s))", node.id.short(), node.count_of_workers));
    }
    out
}

/// Workers of `id` sorted by username. The root also gets boss-less admins.
fn workers_of<'a>(
    graph: &OrgGraph,
    by_id: &HashMap<NodeId, &'a Node>,
    root_id: NodeId,
    id: NodeId,
) -> Vec<&'a Node> {
    let mut ids = graph.sorted_children(&id);
    if id == root_id {
        ids.extend(graph.tops().into_iter().filter(|top| *top != root_id));
    }
    let mut out: Vec<&'a Node> = ids.iter().filter_map(|id| by_id.get(id).copied()).collect();
    out.sort_by(|a, b| a.username.as_str().cmp(b.username.as_str()));
    out
}

/// Push workers so the first one is popped first.
fn push_workers<'a>(stack: &mut Vec<(&'a Node, String, bool)>, workers: Vec<&'a Node>, prefix: String) {
    let last = workers.len().saturating_sub(1);
    for (i, worker) in workers.into_iter().enumerate().rev() {
        stack.push((worker, prefix.clone(), i == last));
    }
}

fn render_tree(nodes: &[Node], root_id: NodeId, long: bool) -> TreeLines {
    let by_id: HashMap<NodeId, &Node> = nodes.iter().map(|n| (n.id, n)).collect();
    let graph = OrgGraph::from_nodes(nodes);

    let mut lines = TreeLines::default();
    let mut seen: HashSet<NodeId> = HashSet::new();

    let Some(root) = by_id.get(&root_id) else {
        lines.unreachable = nodes.iter().map(|n| label(n, long)).collect();
        return lines;
    };
    lines.tree.push(label(root, long));
    seen.insert(root_id);

    // (node, prefix of its line, whether it is the last worker of its boss)
    let mut stack: Vec<(&Node, String, bool)> = Vec::new();
    push_workers(
        &mut stack,
        workers_of(&graph, &by_id, root_id, root_id),
        String::new(),
    );
    while let Some((node, prefix, is_last)) = stack.pop() {
        if !seen.insert(node.id) {
            continue;
        }
        let (connector, indent) = if is_last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        lines
            .tree
            .push(format!("{}{}{}", prefix, connector, label(node, long)));
        push_workers(
            &mut stack,
            workers_of(&graph, &by_id, root_id, node.id),
            format!("{}{}", prefix, indent),
        );
    }

    lines.unreachable = nodes
        .iter()
        .filter(|n| !seen.contains(&n.id))
        .map(|n| label(n, long))
        .collect();
    lines
}
