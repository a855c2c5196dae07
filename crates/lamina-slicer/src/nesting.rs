//! Parent/child nesting of contours.

use lamina_geom::{point_in_polygon, Containment, ContainmentFn, Polyline};

/// Nesting record of one contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NestNode {
    /// Smallest larger contour containing this one's start point.
    pub parent: Option<usize>,
    /// Number of ancestors.
    pub depth: usize,
    /// Absolute area.
    pub area: f64,
}

/// Containment forest over a contour set, kept beside the contours as a
/// parallel array of [`NestNode`]s.
#[derive(Debug, Clone, Default)]
pub struct NestingForest {
    /// One node per input contour, same order.
    pub nodes: Vec<NestNode>,
}

impl NestingForest {
    /// Build the forest with the default point-in-polygon test.
    pub fn build(polys: &[Polyline]) -> Self {
        Self::build_with(polys, point_in_polygon)
    }

    /// Build the forest with an explicit point-in-polygon test.
    ///
    /// Contours are visited from the smallest area up; a contour's parent
    /// is the first larger one that strictly contains its start point.
    pub fn build_with(polys: &[Polyline], locate: ContainmentFn) -> Self {
        let mut nodes: Vec<NestNode> = polys
            .iter()
            .map(|p| NestNode {
                parent: None,
                depth: 0,
                area: p.area(),
            })
            .collect();

        let mut order: Vec<usize> = (0..polys.len()).collect();
        order.sort_by(|&a, &b| nodes[a].area.total_cmp(&nodes[b].area));
        for (k, &i) in order.iter().enumerate() {
            let Some(start) = polys[i].start() else {
                continue;
            };
            nodes[i].parent = order[k + 1..]
                .iter()
                .copied()
                .find(|&j| locate(start, &polys[j]) == Containment::Inside);
        }

        // Parents always come later in `order`, so chains are finite.
        for i in 0..nodes.len() {
            let mut depth = 0;
            let mut at = nodes[i].parent;
            while let Some(p) = at {
                depth += 1;
                at = nodes[p].parent;
            }
            nodes[i].depth = depth;
        }
        Self { nodes }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indices of contours without a parent.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Direct children of `i`.
    pub fn children(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(i))
            .map(|(j, _)| j)
    }

    /// Depth-first order, every parent before its children.
    pub fn flatten(&self) -> Vec<usize> {
        let mut kids: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (i, n) in self.nodes.iter().enumerate() {
            if let Some(p) = n.parent {
                kids[p].push(i);
            }
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots().collect();
        stack.reverse();
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(kids[i].iter().rev());
        }
        out
    }

    /// Indices sorted by depth, deepest first; ties keep input order reversed.
    pub fn deepest_first(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.nodes.len()).rev().collect();
        order.sort_by(|&a, &b| self.nodes[b].depth.cmp(&self.nodes[a].depth));
        order
    }
}
