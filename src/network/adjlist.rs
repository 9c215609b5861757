//! Reader for multiline adjacency lists.
//!
//! ```text
//! # comment
//! <node> <degree>
//! <neighbour> {'weight': 2}
//! <neighbour> {}
//! ```
//!
//! Each header line is followed by exactly `degree` neighbour lines.

use std::path::Path;

use super::graph::Graph;

pub fn parse(text: &str) -> Result<Graph, String> {
    let mut graph = Graph::new();
    let mut lines = text
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty());

    while let Some(header) = lines.next() {
        let mut parts = header.split_whitespace();
        let node = parts.next().ok_or_else(|| format!("bad header: {}", header))?;
        let degree: usize = parts
            .next()
            .ok_or_else(|| format!("missing degree for node {}", node))?
            .parse()
            .map_err(|e| format!("bad degree for node {}: {}", node, e))?;
        graph.add_node(node);

        for _ in 0..degree {
            let line = lines
                .next()
                .ok_or_else(|| format!("node {} lists {} neighbours, file ended early", node, degree))?;
            let (neighbour, attrs) = match line.split_once(char::is_whitespace) {
                Some((n, rest)) => (n, rest.trim()),
                None => (line, ""),
            };
            let weight = parse_weight(attrs)?.unwrap_or(1.0);
            graph.set_edge(node, neighbour, weight);
        }
    }
    Ok(graph)
}

pub fn read(path: &Path) -> Result<Graph, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    parse(&text).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Extracts `weight` from an attribute dict such as `{'weight': 3, 'n': 1}`.
fn parse_weight(attrs: &str) -> Result<Option<f64>, String> {
    if attrs.is_empty() || attrs == "{}" {
        return Ok(None);
    }
    let Some(pos) = attrs.find("weight") else {
        return Ok(None);
    };
    let rest = &attrs[pos + "weight".len()..];
    let rest = rest.trim_start_matches(['\'', '"']).trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| format!("bad attribute dict: {}", attrs))?
        .trim_start();
    let end = rest.find([',', '}']).unwrap_or(rest.len());
    rest[..end]
        .trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|e| format!("bad weight in {}: {}", attrs, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let text = "# generated\n0 2\n1 {'weight': 3}\n2 {}\n1 1\n2 {}\n2 0\n";
        let g = parse(text).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.weight("0", "1"), Some(3.0));
        assert_eq!(g.weight("0", "2"), Some(1.0));
        assert_eq!(g.weight("2", "1"), Some(1.0));
    }

    #[test]
    fn test_isolated_nodes_kept() {
        let g = parse("7 0\n8 0\n").unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_truncated_file_is_error() {
        assert!(parse("0 2\n1 {}\n").is_err());
    }

    #[test]
    fn test_bad_degree_is_error() {
        assert!(parse("0 two\n").is_err());
    }

    #[test]
    fn test_weight_with_other_attributes() {
        assert_eq!(parse_weight("{'n': 1, 'weight': 2.5}").unwrap(), Some(2.5));
        assert_eq!(parse_weight("{\"weight\": 4}").unwrap(), Some(4.0));
        assert_eq!(parse_weight("{'n': 1}").unwrap(), None);
    }
}
