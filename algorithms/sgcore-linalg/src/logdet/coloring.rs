//! Greedy graph coloring of sparsity patterns
//!
//! Two vertices of the pattern graph of `A^p` that share a color never couple, so a sample vector
//! that is constant (up to sign) on each color class recovers the diagonal of a function of `A`
//! from the entries that decay fastest.
use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use sgcore::object::{ParameterKind, ParameterType, ParameterValue, PrimitiveType};
use sprs::CsMat;

/// Order in which the greedy coloring visits vertices
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingVariant {
    Natural,
    /// Vertices with many neighbours first
    LargestFirst,
}

/// Which vertices must receive distinct colors
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColoringVariant {
    /// Adjacent vertices
    DistanceOne,
    /// Vertices connected by a path of at most two edges
    DistanceTwo,
}

macro_rules! index_parameter {
    ($ty:ty, [$($variant:expr),+]) => {
        impl ParameterType for $ty {
            const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Int);

            fn into_value(self) -> ParameterValue {
                let all = [$($variant),+];
                ParameterValue::Int(all.iter().position(|v| *v == self).unwrap_or(0) as i64)
            }

            fn from_value(value: ParameterValue) -> Option<Self> {
                let all = [$($variant),+];
                match value {
                    ParameterValue::Int(v) if v >= 0 => all.get(v as usize).copied(),
                    _ => None,
                }
            }
        }
    };
}

index_parameter!(
    OrderingVariant,
    [OrderingVariant::Natural, OrderingVariant::LargestFirst]
);
index_parameter!(
    ColoringVariant,
    [ColoringVariant::DistanceOne, ColoringVariant::DistanceTwo]
);

/// Symmetrised adjacency lists of the pattern, without self loops
pub fn adjacency<F>(pattern: &CsMat<F>) -> Vec<Vec<usize>> {
    let n = pattern.rows().max(pattern.cols());
    let mut adjacency = vec![Vec::new(); n];
    for (outer, vector) in pattern.outer_iterator().enumerate() {
        for (inner, _) in vector.iter() {
            if inner != outer {
                adjacency[outer].push(inner);
                adjacency[inner].push(outer);
            }
        }
    }
    for neighbours in adjacency.iter_mut() {
        neighbours.sort_unstable();
        neighbours.dedup();
    }

    adjacency
}

/// Vertices reachable from `start` in at most `hops` steps, `start` excluded
fn within(
    adjacency: &[Vec<usize>],
    start: usize,
    hops: usize,
    seen: &mut [usize],
    stamp: usize,
) -> Vec<usize> {
    let mut reached = Vec::new();
    let mut queue = VecDeque::new();
    seen[start] = stamp;
    queue.push_back((start, 0));

    while let Some((vertex, depth)) = queue.pop_front() {
        if depth == hops {
            continue;
        }
        for &next in &adjacency[vertex] {
            if seen[next] != stamp {
                seen[next] = stamp;
                reached.push(next);
                queue.push_back((next, depth + 1));
            }
        }
    }

    reached
}

/// Greedy coloring of the pattern graph of `A^power`
///
/// Returns the color of every vertex and the number of colors. Colors are assigned in visiting
/// order, each vertex receives the smallest color unused in its neighbourhood.
pub fn greedy_coloring<F>(
    pattern: &CsMat<F>,
    power: usize,
    ordering: OrderingVariant,
    coloring: ColoringVariant,
) -> (Vec<usize>, usize) {
    let adjacency = adjacency(pattern);
    let n = adjacency.len();
    let hops = match coloring {
        ColoringVariant::DistanceOne => power.max(1),
        ColoringVariant::DistanceTwo => 2 * power.max(1),
    };

    let mut order: Vec<usize> = (0..n).collect();
    if ordering == OrderingVariant::LargestFirst {
        order.sort_by(|a, b| adjacency[*b].len().cmp(&adjacency[*a].len()));
    }

    let mut colors = vec![usize::MAX; n];
    let mut num_colors = 0;
    let mut seen = vec![usize::MAX; n];
    let mut forbidden = vec![usize::MAX; n + 1];

    for (step, &vertex) in order.iter().enumerate() {
        for neighbour in within(&adjacency, vertex, hops, &mut seen, step) {
            if colors[neighbour] != usize::MAX {
                forbidden[colors[neighbour]] = step;
            }
        }

        let color = (0..=n).find(|c| forbidden[*c] != step).unwrap_or(n);
        colors[vertex] = color;
        num_colors = num_colors.max(color + 1);
    }

    (colors, num_colors)
}

/// Whether no two vertices within `hops` steps share a color
pub fn is_valid_coloring(adjacency: &[Vec<usize>], colors: &[usize], hops: usize) -> bool {
    let mut seen = vec![usize::MAX; adjacency.len()];
    (0..adjacency.len()).all(|vertex| {
        within(adjacency, vertex, hops, &mut seen, vertex)
            .into_iter()
            .all(|other| colors[other] != colors[vertex])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    fn path(n: usize) -> CsMat<f64> {
        let mut tri = TriMat::new((n, n));
        for i in 0..n {
            tri.add_triplet(i, i, 2.0);
            if i + 1 < n {
                tri.add_triplet(i, i + 1, -1.0);
                tri.add_triplet(i + 1, i, -1.0);
            }
        }
        tri.to_csr()
    }

    #[test]
    fn path_graph_colors() {
        let pattern = path(10);
        let (colors, n) = greedy_coloring(
            &pattern,
            1,
            OrderingVariant::Natural,
            ColoringVariant::DistanceOne,
        );
        assert_eq!(n, 2);
        assert!(is_valid_coloring(&adjacency(&pattern), &colors, 1));

        let (colors, n) = greedy_coloring(
            &pattern,
            1,
            OrderingVariant::Natural,
            ColoringVariant::DistanceTwo,
        );
        assert_eq!(n, 3);
        assert_eq!(&colors[..6], &[0, 1, 2, 0, 1, 2]);
        assert!(is_valid_coloring(&adjacency(&pattern), &colors, 2));
    }

    #[test]
    fn diagonal_pattern_needs_one_color() {
        let mut tri = TriMat::new((5, 5));
        for i in 0..5 {
            tri.add_triplet(i, i, 1.0);
        }
        let (colors, n) = greedy_coloring(
            &tri.to_csc(),
            3,
            OrderingVariant::LargestFirst,
            ColoringVariant::DistanceTwo,
        );
        assert_eq!(n, 1);
        assert!(colors.iter().all(|c| *c == 0));
    }

    #[test]
    fn largest_first_on_a_star() {
        let n = 6;
        let mut tri = TriMat::new((n, n));
        for i in 1..n {
            tri.add_triplet(0, i, 1.0);
        }
        let pattern = tri.to_csr();
        let (colors, num_colors) = greedy_coloring(
            &pattern,
            1,
            OrderingVariant::LargestFirst,
            ColoringVariant::DistanceOne,
        );

        assert_eq!(num_colors, 2);
        assert_eq!(colors[0], 0);
        assert!(is_valid_coloring(&adjacency(&pattern), &colors, 1));
    }

    #[test]
    fn power_widens_the_neighbourhood() {
        let pattern = path(12);
        let (colors, n) = greedy_coloring(
            &pattern,
            2,
            OrderingVariant::Natural,
            ColoringVariant::DistanceOne,
        );
        assert_eq!(n, 3);
        assert!(is_valid_coloring(&adjacency(&pattern), &colors, 2));
    }
}
