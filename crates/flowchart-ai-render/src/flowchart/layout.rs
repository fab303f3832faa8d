//! Layered (Sugiyama-style) layout for flowcharts.
//!
//! 1. break cycles by reversing DFS back edges
//! 2. longest-path ranking, honoring each edge's minimum length
//! 3. barycenter sweeps to reduce crossings, then keep subgraph members contiguous
//! 4. coordinate assignment along the rank axis and the cross axis
//! 5. orthogonal edge routes, edge labels and subgraph boxes
//! 6. translation so the diagram starts at `diagramPadding`

use super::node::node_dimensions;
use crate::model::{
    Bounds, FlowchartLayout, LayoutCluster, LayoutEdge, LayoutLabel, LayoutNode, LayoutPoint,
};
use crate::text::{TextMeasurer, TextMetrics, TextStyle};
use crate::{Error, Result};
use flowchart_ai_core::{Direction, Flowchart, FlowchartConfig};
use rustc_hash::FxHashMap;

const MAX_ORDERING_SWEEPS: usize = 8;
const EDGE_LABEL_PADDING: f64 = 4.0;
const SELF_LOOP_REACH: f64 = 24.0;

#[derive(Debug, Clone, Copy)]
struct RankEdge {
    from: usize,
    to: usize,
    length: usize,
}

/// Rank/cross coordinates: `r` grows along the flow, `c` across it.
#[derive(Debug, Clone, Copy)]
struct FlowPoint {
    r: f64,
    c: f64,
}

struct Placement {
    /// Center of each node along the flow.
    r: Vec<f64>,
    /// Center of each node across the flow.
    c: Vec<f64>,
    /// Node extent along the flow.
    er: Vec<f64>,
    /// Node extent across the flow.
    ec: Vec<f64>,
    /// Start and end of every rank band along the flow.
    bands: Vec<(f64, f64)>,
    rank_spacing: f64,
}

impl Placement {
    /// Middle of the gap following rank `rank`.
    fn gap_after(&self, rank: usize) -> f64 {
        let end = self.bands[rank].1;
        match self.bands.get(rank + 1) {
            Some((next_start, _)) => (end + next_start) / 2.0,
            None => end + self.rank_spacing / 2.0,
        }
    }
}

fn to_xy(direction: Direction, p: FlowPoint) -> (f64, f64) {
    match direction {
        Direction::TB => (p.c, p.r),
        Direction::BT => (p.c, -p.r),
        Direction::LR => (p.r, p.c),
        Direction::RL => (-p.r, p.c),
    }
}

/// Lays out `flowchart` using the sizes and spacing from `config`.
pub fn layout_flowchart(
    flowchart: &Flowchart,
    config: &FlowchartConfig,
    measurer: &dyn TextMeasurer,
) -> Result<FlowchartLayout> {
    let direction = flowchart.direction;
    let horizontal = direction.is_horizontal();
    let n = flowchart.nodes.len();

    let index: FxHashMap<&str, usize> = flowchart
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();
    if index.len() != n {
        let mut seen = FxHashMap::default();
        let duplicate = flowchart
            .nodes
            .iter()
            .find(|node| seen.insert(node.id.as_str(), ()).is_some())
            .map(|node| node.id.as_str())
            .unwrap_or_default();
        return Err(Error::InvalidModel {
            message: format!("node id `{duplicate}` is declared more than once"),
        });
    }

    let mut endpoints = Vec::with_capacity(flowchart.edges.len());
    for edge in &flowchart.edges {
        let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        else {
            return Err(Error::InvalidModel {
                message: format!(
                    "edge `{}` references an unknown node ({} -> {})",
                    edge.id, edge.from, edge.to
                ),
            });
        };
        endpoints.push((from, to));
    }

    let style = TextStyle {
        font_family: Some(config.font_family.clone()),
        font_size: config.font_size,
        font_weight: None,
    };

    let sizes: Vec<(f64, f64)> = flowchart
        .nodes
        .iter()
        .map(|node| {
            let metrics = measurer.measure(&node.label, &style);
            node_dimensions(node.shape, metrics, config.node_padding)
        })
        .collect();

    let label_metrics: Vec<Option<TextMetrics>> = flowchart
        .edges
        .iter()
        .map(|edge| edge.label.as_deref().map(|l| measurer.measure(l, &style)))
        .collect();

    // 1 + 2: ranks
    let rank_edges: Vec<RankEdge> = acyclic_rank_edges(n, &endpoints, flowchart);
    let ranks = assign_ranks(n, &rank_edges);
    let num_ranks = ranks.iter().copied().max().map_or(0, |m| m + 1);

    // 3: ordering, over real nodes plus one virtual node per rank crossed by a long edge
    let (er, ec): (Vec<f64>, Vec<f64>) = sizes
        .iter()
        .map(|&(w, h)| if horizontal { (w, h) } else { (h, w) })
        .unzip();
    let mut graph = LayerGraph {
        rank: ranks.clone(),
        er,
        ec,
        paths: cluster_paths(flowchart, &index),
        preds: vec![Vec::new(); n],
        succs: vec![Vec::new(); n],
    };
    let chains = graph.split_long_edges(&endpoints);

    let mut rank_order = vec![Vec::new(); num_ranks];
    for (v, &r) in graph.rank.iter().enumerate() {
        rank_order[r].push(v);
    }
    minimize_crossings(&mut rank_order, &graph.preds, &graph.succs, graph.len());
    for rank in &mut rank_order {
        *rank = group_contiguous(rank, 0, &graph.paths);
    }

    // 4: coordinates
    let title_height = measurer.measure("X", &style).height;
    let mut label_gap = vec![0.0_f64; num_ranks];
    for (i, &(from, to)) in endpoints.iter().enumerate() {
        if let Some(m) = label_metrics[i] {
            if from != to && ranks[from] < ranks[to] {
                let along = if horizontal { m.width } else { m.height };
                let r = ranks[from];
                label_gap[r] = label_gap[r].max(along + 2.0 * EDGE_LABEL_PADDING);
            }
        }
    }
    let mut cluster_gap_before = vec![0.0_f64; num_ranks];
    let mut cluster_gap_after = vec![0.0_f64; num_ranks];
    for (min_rank, max_rank) in cluster_rank_spans(flowchart, &index, &ranks) {
        cluster_gap_before[min_rank] += config.cluster_padding + title_height;
        cluster_gap_after[max_rank] += config.cluster_padding;
    }

    let mut bands = Vec::with_capacity(num_ranks);
    let mut r_center = vec![0.0; graph.len()];
    let mut cursor = 0.0;
    for (r, rank_nodes) in rank_order.iter().enumerate() {
        cursor += cluster_gap_before[r];
        let thickness = rank_nodes.iter().map(|&v| graph.er[v]).fold(0.0, f64::max);
        for &v in rank_nodes {
            r_center[v] = cursor + thickness / 2.0;
        }
        bands.push((cursor, cursor + thickness));
        cursor += thickness + config.rank_spacing.max(label_gap[r]) + cluster_gap_after[r];
    }

    let cluster_gap = 2.0 * config.cluster_padding + title_height;
    let mut c_center =
        assign_cross_coordinates(&rank_order, &graph, config.node_spacing, cluster_gap);
    let extents = cluster_extents(flowchart, config, measurer, &style, horizontal);
    separate_clusters(
        &rank_order,
        &graph,
        &mut c_center,
        &extents,
        config.node_spacing,
    );

    let placement = Placement {
        r: r_center,
        c: c_center,
        er: graph.er,
        ec: graph.ec,
        bands,
        rank_spacing: config.rank_spacing,
    };

    let mut nodes: Vec<LayoutNode> = flowchart
        .nodes
        .iter()
        .enumerate()
        .map(|(v, node)| {
            let (x, y) = to_xy(
                direction,
                FlowPoint {
                    r: placement.r[v],
                    c: placement.c[v],
                },
            );
            LayoutNode {
                id: node.id.clone(),
                shape: node.shape,
                x,
                y,
                width: sizes[v].0,
                height: sizes[v].1,
                rank: ranks[v],
            }
        })
        .collect();

    // 5: edges and clusters
    let mut edges: Vec<LayoutEdge> = flowchart
        .edges
        .iter()
        .enumerate()
        .map(|(i, edge)| {
            let (from, to) = endpoints[i];
            let (route, label_at) =
                route_edge(&placement, &ranks, from, to, &chains[i], config.node_spacing);
            let points = route
                .into_iter()
                .map(|p| {
                    let (x, y) = to_xy(direction, p);
                    LayoutPoint { x, y }
                })
                .collect();
            let label = label_metrics[i].map(|m| {
                let (x, y) = to_xy(direction, label_at);
                LayoutLabel {
                    x,
                    y,
                    width: m.width + 2.0 * EDGE_LABEL_PADDING,
                    height: m.height + 2.0 * EDGE_LABEL_PADDING,
                }
            });
            LayoutEdge {
                id: edge.id.clone(),
                from: edge.from.clone(),
                to: edge.to.clone(),
                points,
                label,
            }
        })
        .collect();

    let mut clusters = layout_clusters(flowchart, &nodes, config, measurer, &style);

    // 6: normalize
    let bounds = content_bounds(&nodes, &edges, &clusters);
    let pad = config.diagram_padding;
    let (dx, dy, width, height) = match bounds {
        Some(b) => (
            pad - b.min_x,
            pad - b.min_y,
            b.width() + 2.0 * pad,
            b.height() + 2.0 * pad,
        ),
        None => (pad, pad, 2.0 * pad, 2.0 * pad),
    };
    for node in &mut nodes {
        node.x += dx;
        node.y += dy;
    }
    for edge in &mut edges {
        for p in &mut edge.points {
            p.x += dx;
            p.y += dy;
        }
        if let Some(label) = &mut edge.label {
            label.x += dx;
            label.y += dy;
        }
    }
    for cluster in &mut clusters {
        cluster.x += dx;
        cluster.y += dy;
        cluster.title_label.x += dx;
        cluster.title_label.y += dy;
    }

    tracing::debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        clusters = clusters.len(),
        ranks = num_ranks,
        width,
        height,
        "flowchart layout"
    );

    Ok(FlowchartLayout {
        direction,
        nodes,
        edges,
        clusters,
        width: width.max(1.0),
        height: height.max(1.0),
    })
}

/// Ordering graph: the flowchart nodes (indices `0..n`) followed by virtual nodes that split
/// every forward edge spanning more than one rank into unit-length segments.
struct LayerGraph {
    rank: Vec<usize>,
    /// Extent along the flow; zero for virtual nodes.
    er: Vec<f64>,
    /// Extent across the flow; zero for virtual nodes.
    ec: Vec<f64>,
    /// Enclosing subgraphs, outermost first.
    paths: Vec<Vec<usize>>,
    preds: Vec<Vec<usize>>,
    succs: Vec<Vec<usize>>,
}

impl LayerGraph {
    fn len(&self) -> usize {
        self.rank.len()
    }

    fn link(&mut self, from: usize, to: usize) {
        self.succs[from].push(to);
        self.preds[to].push(from);
    }

    fn add_virtual(&mut self, rank: usize, path: Vec<usize>) -> usize {
        self.rank.push(rank);
        self.er.push(0.0);
        self.ec.push(0.0);
        self.paths.push(path);
        self.preds.push(Vec::new());
        self.succs.push(Vec::new());
        self.rank.len() - 1
    }

    /// Links every edge into the graph and returns the virtual nodes created for each edge.
    ///
    /// Edges running against the flow only take part in ordering when they span one rank.
    fn split_long_edges(&mut self, endpoints: &[(usize, usize)]) -> Vec<Vec<usize>> {
        let mut chains = vec![Vec::new(); endpoints.len()];
        for (i, &(from, to)) in endpoints.iter().enumerate() {
            if from == to {
                continue;
            }
            let (rf, rt) = (self.rank[from], self.rank[to]);
            if rf > rt {
                if rf - rt == 1 {
                    self.link(to, from);
                }
                continue;
            }
            let shared: Vec<usize> = self.paths[from]
                .iter()
                .zip(&self.paths[to])
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect();
            let mut prev = from;
            for r in (rf + 1)..rt {
                let v = self.add_virtual(r, shared.clone());
                self.link(prev, v);
                chains[i].push(v);
                prev = v;
            }
            self.link(prev, to);
        }
        chains
    }
}

/// Returns the ranking constraints with DFS back edges reversed; self-loops are dropped.
fn acyclic_rank_edges(n: usize, endpoints: &[(usize, usize)], flowchart: &Flowchart) -> Vec<RankEdge> {
    let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, &(from, to)) in endpoints.iter().enumerate() {
        if from != to {
            out_edges[from].push(i);
        }
    }

    // 0 = unvisited, 1 = on the DFS stack, 2 = finished
    let mut state = vec![0u8; n];
    let mut reversed = vec![false; endpoints.len()];
    for root in 0..n {
        if state[root] != 0 {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        state[root] = 1;
        while let Some(frame) = stack.last_mut() {
            let (u, next) = *frame;
            if let Some(&e) = out_edges[u].get(next) {
                frame.1 += 1;
                let v = endpoints[e].1;
                match state[v] {
                    0 => {
                        state[v] = 1;
                        stack.push((v, 0));
                    }
                    1 => reversed[e] = true,
                    _ => {}
                }
            } else {
                state[u] = 2;
                stack.pop();
            }
        }
    }

    endpoints
        .iter()
        .enumerate()
        .filter(|(_, (from, to))| from != to)
        .map(|(i, &(from, to))| {
            let length = flowchart.edges[i].length.max(1);
            if reversed[i] {
                RankEdge {
                    from: to,
                    to: from,
                    length,
                }
            } else {
                RankEdge { from, to, length }
            }
        })
        .collect()
}

/// Longest-path layering over an acyclic constraint set.
///
/// Sources are then pulled down next to their nearest successor so that a lone `A --> Z` does
/// not leave `A` stranded at the top of a deep diagram.
fn assign_ranks(n: usize, edges: &[RankEdge]) -> Vec<usize> {
    let mut out: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for e in edges {
        out[e.from].push((e.to, e.length));
        in_degree[e.to] += 1;
    }
    let is_source: Vec<bool> = in_degree.iter().map(|&d| d == 0).collect();

    let mut queue: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    let mut ranks = vec![0usize; n];
    let mut head = 0;
    while head < queue.len() {
        let u = queue[head];
        head += 1;
        for &(v, len) in &out[u] {
            ranks[v] = ranks[v].max(ranks[u] + len);
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push(v);
            }
        }
    }

    for &u in queue.iter().rev() {
        if !is_source[u] || out[u].is_empty() {
            continue;
        }
        if let Some(tight) = out[u]
            .iter()
            .map(|&(v, len)| ranks[v].saturating_sub(len))
            .min()
        {
            ranks[u] = ranks[u].max(tight);
        }
    }

    ranks
}

fn barycenter(order: &[usize], neighbors: &[usize], fallback: f64) -> f64 {
    let positions: Vec<f64> = neighbors
        .iter()
        .filter_map(|nb| order.iter().position(|x| x == nb))
        .map(|p| p as f64)
        .collect();
    if positions.is_empty() {
        fallback
    } else {
        positions.iter().sum::<f64>() / positions.len() as f64
    }
}

fn sweep(rank_order: &mut [Vec<usize>], r: usize, reference: usize, neighbors: &[Vec<usize>]) {
    let fixed = rank_order[reference].clone();
    let mut scored: Vec<(usize, f64, usize)> = rank_order[r]
        .iter()
        .enumerate()
        .map(|(i, &v)| (v, barycenter(&fixed, &neighbors[v], i as f64), i))
        .collect();
    scored.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.2.cmp(&b.2))
    });
    rank_order[r] = scored.into_iter().map(|(v, _, _)| v).collect();
}

fn count_crossings(upper: &[usize], lower: &[usize], succs: &[Vec<usize>], n: usize) -> usize {
    let mut pos_lower = vec![usize::MAX; n];
    for (i, &v) in lower.iter().enumerate() {
        pos_lower[v] = i;
    }
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for (i, &u) in upper.iter().enumerate() {
        for &v in &succs[u] {
            if pos_lower[v] != usize::MAX {
                pairs.push((i, pos_lower[v]));
            }
        }
    }
    let mut crossings = 0;
    for i in 0..pairs.len() {
        for j in (i + 1)..pairs.len() {
            let (a1, b1) = pairs[i];
            let (a2, b2) = pairs[j];
            if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                crossings += 1;
            }
        }
    }
    crossings
}

fn total_crossings(rank_order: &[Vec<usize>], succs: &[Vec<usize>], n: usize) -> usize {
    rank_order
        .windows(2)
        .map(|w| count_crossings(&w[0], &w[1], succs, n))
        .sum()
}

/// Alternating down/up barycenter sweeps; keeps the best ordering seen.
fn minimize_crossings(
    rank_order: &mut Vec<Vec<usize>>,
    preds: &[Vec<usize>],
    succs: &[Vec<usize>],
    n: usize,
) {
    if rank_order.len() <= 1 {
        return;
    }
    let mut best = total_crossings(rank_order, succs, n);
    let mut best_order = rank_order.clone();

    for _ in 0..MAX_ORDERING_SWEEPS {
        if best == 0 {
            break;
        }
        for r in 1..rank_order.len() {
            sweep(rank_order, r, r - 1, preds);
        }
        for r in (0..rank_order.len() - 1).rev() {
            sweep(rank_order, r, r + 1, succs);
        }
        let crossings = total_crossings(rank_order, succs, n);
        if crossings < best {
            best = crossings;
            best_order = rank_order.clone();
        } else {
            break;
        }
    }
    *rank_order = best_order;
}

/// For every node, the subgraph indices enclosing it, outermost first.
fn cluster_paths(flowchart: &Flowchart, index: &FxHashMap<&str, usize>) -> Vec<Vec<usize>> {
    let sg_index: FxHashMap<&str, usize> = flowchart
        .subgraphs
        .iter()
        .enumerate()
        .map(|(i, sg)| (sg.id.as_str(), i))
        .collect();
    let mut parent: Vec<Option<usize>> = vec![None; flowchart.subgraphs.len()];
    for (i, sg) in flowchart.subgraphs.iter().enumerate() {
        for child in &sg.children {
            if let Some(&c) = sg_index.get(child.as_str()) {
                parent[c] = Some(i);
            }
        }
    }

    let mut paths = vec![Vec::new(); index.len()];
    for (i, sg) in flowchart.subgraphs.iter().enumerate() {
        let mut chain = vec![i];
        let mut cur = i;
        while let Some(p) = parent[cur] {
            if chain.contains(&p) {
                break;
            }
            chain.push(p);
            cur = p;
        }
        chain.reverse();
        for member in &sg.nodes {
            if let Some(&v) = index.get(member.as_str()) {
                paths[v] = chain.clone();
            }
        }
    }
    paths
}

/// Reorders a rank so members of the same subgraph sit next to each other.
///
/// Groups keep the position of their first member; order inside a group is preserved.
fn group_contiguous(order: &[usize], depth: usize, paths: &[Vec<usize>]) -> Vec<usize> {
    let mut groups: Vec<(Option<usize>, Vec<usize>)> = Vec::new();
    for &v in order {
        match paths[v].get(depth) {
            Some(&cluster) => match groups.iter_mut().find(|(c, _)| *c == Some(cluster)) {
                Some((_, members)) => members.push(v),
                None => groups.push((Some(cluster), vec![v])),
            },
            None => groups.push((None, vec![v])),
        }
    }
    groups
        .into_iter()
        .flat_map(|(cluster, members)| match cluster {
            Some(_) => group_contiguous(&members, depth + 1, paths),
            None => members,
        })
        .collect()
}

/// Minimum and maximum rank covered by each subgraph, including nested ones.
fn cluster_rank_spans(
    flowchart: &Flowchart,
    index: &FxHashMap<&str, usize>,
    ranks: &[usize],
) -> Vec<(usize, usize)> {
    let mut spans: FxHashMap<&str, (usize, usize)> = FxHashMap::default();
    let mut out = Vec::new();
    for sg in &flowchart.subgraphs {
        let mut span: Option<(usize, usize)> = None;
        let member_ranks = sg
            .nodes
            .iter()
            .filter_map(|id| index.get(id.as_str()).map(|&v| (ranks[v], ranks[v])));
        let child_spans = sg
            .children
            .iter()
            .filter_map(|child| spans.get(child.as_str()).copied());
        for (lo, hi) in member_ranks.chain(child_spans) {
            span = Some(match span {
                Some((a, b)) => (a.min(lo), b.max(hi)),
                None => (lo, hi),
            });
        }
        if let Some(s) = span {
            spans.insert(sg.id.as_str(), s);
            out.push(s);
        }
    }
    out
}

/// Places nodes across the flow: packed per rank, then pulled toward their neighbours.
fn assign_cross_coordinates(
    rank_order: &[Vec<usize>],
    graph: &LayerGraph,
    node_spacing: f64,
    cluster_gap: f64,
) -> Vec<f64> {
    let LayerGraph {
        ec,
        paths,
        preds,
        succs,
        ..
    } = graph;
    let mut c = vec![0.0; ec.len()];
    let separation = |a: usize, b: usize| {
        let gap = if paths[a] == paths[b] {
            node_spacing
        } else {
            node_spacing + cluster_gap
        };
        (ec[a] + ec[b]) / 2.0 + gap
    };

    let place = |c: &mut Vec<f64>, rank: &[usize], desired: &[f64]| {
        let mut prev: Option<usize> = None;
        for (i, &v) in rank.iter().enumerate() {
            let mut pos = desired[i];
            if let Some(p) = prev {
                pos = pos.max(c[p] + separation(p, v));
            }
            c[v] = pos;
            prev = Some(v);
        }
        let shift = rank
            .iter()
            .zip(desired)
            .map(|(&v, d)| c[v] - d)
            .sum::<f64>()
            / rank.len().max(1) as f64;
        for &v in rank {
            c[v] -= shift;
        }
    };

    for rank in rank_order {
        let mut cursor = 0.0;
        let mut prev: Option<usize> = None;
        for &v in rank {
            if let Some(p) = prev {
                cursor += separation(p, v);
            }
            c[v] = cursor;
            prev = Some(v);
        }
        let span = cursor;
        for &v in rank {
            c[v] -= span / 2.0;
        }
    }

    let mean_of = |c: &[f64], nbs: &[usize]| {
        if nbs.is_empty() {
            None
        } else {
            Some(nbs.iter().map(|&u| c[u]).sum::<f64>() / nbs.len() as f64)
        }
    };

    for rank in rank_order.iter().skip(1) {
        let desired: Vec<f64> = rank
            .iter()
            .map(|&v| mean_of(&c, &preds[v]).unwrap_or(c[v]))
            .collect();
        place(&mut c, rank, &desired);
    }
    for rank in rank_order.iter().rev().skip(1) {
        if rank.iter().all(|&v| !preds[v].is_empty()) {
            continue;
        }
        let desired: Vec<f64> = rank
            .iter()
            .map(|&v| {
                if preds[v].is_empty() {
                    mean_of(&c, &succs[v]).unwrap_or(c[v])
                } else {
                    c[v]
                }
            })
            .collect();
        place(&mut c, rank, &desired);
    }

    c
}

/// Cross-axis room a subgraph box takes beyond its members: `(margin, min_width)`.
fn cluster_extents(
    flowchart: &Flowchart,
    config: &FlowchartConfig,
    measurer: &dyn TextMeasurer,
    style: &TextStyle,
    horizontal: bool,
) -> Vec<(f64, f64)> {
    let title_height = measurer.measure("X", style).height;
    let per_level = if horizontal {
        config.cluster_padding + title_height
    } else {
        config.cluster_padding
    };

    let mut depth: FxHashMap<&str, usize> = FxHashMap::default();
    let mut out = Vec::with_capacity(flowchart.subgraphs.len());
    for sg in &flowchart.subgraphs {
        let below = sg
            .children
            .iter()
            .filter_map(|child| depth.get(child.as_str()).map(|d| d + 1))
            .max()
            .unwrap_or(0);
        depth.insert(sg.id.as_str(), below);
        let min_width = if horizontal {
            0.0
        } else {
            measurer.measure(&sg.title, style).width + 2.0 * config.cluster_padding
        };
        out.push((per_level * (below + 1) as f64, min_width));
    }
    out
}

/// Moves nodes that do not belong to a subgraph out of its box, innermost subgraph first.
///
/// Within every rank the subgraph's members are contiguous, so the nodes before the member block
/// shift towards the low side and the nodes after it towards the high side.
fn separate_clusters(
    rank_order: &[Vec<usize>],
    graph: &LayerGraph,
    c: &mut [f64],
    extents: &[(f64, f64)],
    node_spacing: f64,
) {
    let gap = node_spacing / 2.0;
    for (k, &(margin, min_width)) in extents.iter().enumerate() {
        let is_member = |v: usize| graph.paths[v].contains(&k);

        let mut lo = f64::MAX;
        let mut hi = f64::MIN;
        let mut rank_span: Option<(usize, usize)> = None;
        for v in (0..graph.len()).filter(|&v| is_member(v)) {
            lo = lo.min(c[v] - graph.ec[v] / 2.0);
            hi = hi.max(c[v] + graph.ec[v] / 2.0);
            let r = graph.rank[v];
            rank_span = Some(match rank_span {
                Some((a, b)) => (a.min(r), b.max(r)),
                None => (r, r),
            });
        }
        let Some((first_rank, last_rank)) = rank_span else {
            continue;
        };
        lo -= margin;
        hi += margin;
        if hi - lo < min_width {
            let grow = (min_width - (hi - lo)) / 2.0;
            lo -= grow;
            hi += grow;
        }
        let center = (lo + hi) / 2.0;

        for rank in &rank_order[first_rank..=last_rank] {
            let split = match (
                rank.iter().position(|&v| is_member(v)),
                rank.iter().rposition(|&v| is_member(v)),
            ) {
                (Some(first), Some(last)) => (first, last + 1),
                _ => {
                    let at = rank
                        .iter()
                        .position(|&v| c[v] >= center)
                        .unwrap_or(rank.len());
                    (at, at)
                }
            };
            let (before, after) = (&rank[..split.0], &rank[split.1..]);

            if let Some(right) = before
                .iter()
                .map(|&v| c[v] + graph.ec[v] / 2.0)
                .reduce(f64::max)
            {
                let overlap = right - (lo - gap);
                if overlap > 0.0 {
                    for &v in before {
                        c[v] -= overlap;
                    }
                }
            }
            if let Some(left) = after
                .iter()
                .map(|&v| c[v] - graph.ec[v] / 2.0)
                .reduce(f64::min)
            {
                let overlap = (hi + gap) - left;
                if overlap > 0.0 {
                    for &v in after {
                        c[v] += overlap;
                    }
                }
            }
        }
    }
}

/// Orthogonal route between two nodes plus the anchor for the edge label.
fn route_edge(
    p: &Placement,
    ranks: &[usize],
    from: usize,
    to: usize,
    chain: &[usize],
    node_spacing: f64,
) -> (Vec<FlowPoint>, FlowPoint) {
    let fp = |r: f64, c: f64| FlowPoint { r, c };

    if from == to {
        let side = p.c[from] + p.ec[from] / 2.0;
        let quarter = p.er[from] / 4.0;
        let reach = side + SELF_LOOP_REACH;
        let route = vec![
            fp(p.r[from] - quarter, side),
            fp(p.r[from] - quarter, reach),
            fp(p.r[from] + quarter, reach),
            fp(p.r[from] + quarter, side),
        ];
        return (route, fp(p.r[from], reach));
    }

    if ranks[to] > ranks[from] {
        // One column per crossed rank; the route jogs sideways in the gap between two ranks.
        let columns: Vec<f64> = std::iter::once(p.c[from])
            .chain(chain.iter().map(|&d| p.c[d]))
            .chain(std::iter::once(p.c[to]))
            .collect();
        let mut route = vec![fp(p.r[from] + p.er[from] / 2.0, p.c[from])];
        for (step, pair) in columns.windows(2).enumerate() {
            if (pair[0] - pair[1]).abs() >= 0.5 {
                let bend = p.gap_after(ranks[from] + step);
                route.push(fp(bend, pair[0]));
                route.push(fp(bend, pair[1]));
            }
        }
        route.push(fp(p.r[to] - p.er[to] / 2.0, p.c[to]));
        let label_at = fp(
            p.gap_after(ranks[from]),
            (columns[0] + columns[1]) / 2.0,
        );
        return (route, label_at);
    }

    // Edges running against the flow leave and enter on the far side.
    let (lo, hi) = (p.r[to], p.r[from]);
    let side = (0..p.r.len())
        .filter(|&v| p.r[v] >= lo && p.r[v] <= hi)
        .map(|v| p.c[v] + p.ec[v] / 2.0)
        .fold(f64::MIN, f64::max)
        + node_spacing / 2.0;
    let route = vec![
        fp(p.r[from], p.c[from] + p.ec[from] / 2.0),
        fp(p.r[from], side),
        fp(p.r[to], side),
        fp(p.r[to], p.c[to] + p.ec[to] / 2.0),
    ];
    (route, fp((p.r[from] + p.r[to]) / 2.0, side))
}

fn layout_clusters(
    flowchart: &Flowchart,
    nodes: &[LayoutNode],
    config: &FlowchartConfig,
    measurer: &dyn TextMeasurer,
    style: &TextStyle,
) -> Vec<LayoutCluster> {
    let pad = config.cluster_padding;
    let mut boxes: FxHashMap<&str, Bounds> = FxHashMap::default();
    let mut out = Vec::new();

    for sg in &flowchart.subgraphs {
        let mut corners: Vec<(f64, f64)> = Vec::new();
        for member in &sg.nodes {
            if let Some(n) = nodes.iter().find(|n| &n.id == member) {
                corners.push((n.left(), n.top()));
                corners.push((n.right(), n.bottom()));
            }
        }
        for child in &sg.children {
            if let Some(b) = boxes.get(child.as_str()) {
                corners.push((b.min_x, b.min_y));
                corners.push((b.max_x, b.max_y));
            }
        }
        let Some(inner) = Bounds::from_points(corners) else {
            tracing::debug!(subgraph = %sg.id, "skipping empty subgraph");
            continue;
        };

        let title = measurer.measure(&sg.title, style);
        let mut min_x = inner.min_x - pad;
        let mut max_x = inner.max_x + pad;
        let needed = title.width + 2.0 * pad;
        if max_x - min_x < needed {
            let grow = (needed - (max_x - min_x)) / 2.0;
            min_x -= grow;
            max_x += grow;
        }
        let min_y = inner.min_y - pad - title.height;
        let max_y = inner.max_y + pad;

        boxes.insert(
            sg.id.as_str(),
            Bounds {
                min_x,
                min_y,
                max_x,
                max_y,
            },
        );
        out.push(LayoutCluster {
            id: sg.id.clone(),
            title: sg.title.clone(),
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
            title_label: LayoutLabel {
                x: (min_x + max_x) / 2.0,
                y: min_y + pad / 2.0 + title.height / 2.0,
                width: title.width,
                height: title.height,
            },
        });
    }
    out
}

fn content_bounds(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    clusters: &[LayoutCluster],
) -> Option<Bounds> {
    let mut pts: Vec<(f64, f64)> = Vec::new();
    for n in nodes {
        pts.push((n.left(), n.top()));
        pts.push((n.right(), n.bottom()));
    }
    for e in edges {
        pts.extend(e.points.iter().map(|p| (p.x, p.y)));
        if let Some(l) = &e.label {
            pts.push((l.x - l.width / 2.0, l.y - l.height / 2.0));
            pts.push((l.x + l.width / 2.0, l.y + l.height / 2.0));
        }
    }
    for c in clusters {
        pts.push((c.x, c.y));
        pts.push((c.x + c.width, c.y + c.height));
    }
    Bounds::from_points(pts)
}
