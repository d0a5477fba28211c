//! Reticulate-Newick parser and writer.
//!
//! Extends the standard Newick grammar with `#Hk` hybridization tags and
//! bracketed info fields:
//!
//! ```text
//! tree     = subtree ';'
//! subtree  = '(' children ')' spec | spec
//! children = subtree (',' subtree)*
//! spec     = label? ('#H' int)? (':' weight)? ('[' info ']')?
//! ```
//!
//! A `#Hk` tag appearing on several specs denotes one reticulate node
//! with multiple parents: the occurrence carrying descendants becomes the
//! canonical node and every other occurrence's in-edge is redirected to
//! it. Parse errors carry the character range that triggered them.

use crate::network::{EdgeId, NodeId, RootedNetwork, DEFAULT_WEIGHT, MAX_TREE_DEPTH};
use reticulum_core::{ReticulumError, Result};
use std::collections::HashMap;

/// Parse a reticulate-Newick string into a [`RootedNetwork`].
pub fn parse(input: &str) -> Result<RootedNetwork> {
    let mut parser = Parser::new(input)?;
    parser.run()
}

/// Serialize a network to a reticulate-Newick string.
///
/// Fresh `#Hk` tags are assigned the first time a node with in-degree > 1
/// is reached during the depth-first walk; later edges into that node
/// print only the tag.
pub fn write(net: &RootedNetwork) -> String {
    let mut writer = Writer {
        net,
        buf: String::new(),
        tags: HashMap::new(),
        next_tag: 1,
    };
    writer.subtree(net.root(), None);
    writer.buf.push(';');
    writer.buf
}

struct Parser<'a> {
    bytes: &'a [u8],
    /// `[` offset → matching `]` offset.
    square: HashMap<usize, usize>,
    /// `(` offset → matching `)` offset.
    paren: HashMap<usize, usize>,
    /// End of tree content (offset of the terminal semicolon).
    semi: usize,
    net: RootedNetwork,
    /// tag → occurrences as (node, in-edge, spec span).
    hybrids: HashMap<u64, Vec<(NodeId, Option<EdgeId>, (usize, usize))>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self> {
        let bytes = input.as_bytes();
        let square = match_square_brackets(bytes)?;
        let semi = find_terminal_semicolon(bytes, &square)?;
        reject_stray_whitespace(bytes, &square, semi)?;
        let paren = match_parens(bytes, &square, semi)?;
        Ok(Self {
            bytes,
            square,
            paren,
            semi,
            net: RootedNetwork::new(),
            hybrids: HashMap::new(),
        })
    }

    fn run(&mut self) -> Result<RootedNetwork> {
        if self.semi == 0 {
            return Err(ReticulumError::parse("empty tree", 0, 1));
        }
        let root = self.net.root();
        self.subtree(0, self.semi, root, None)?;
        self.merge_hybrids()?;
        Ok(std::mem::take(&mut self.net))
    }

    /// Parse `start..end` into the already-allocated node `v`.
    fn subtree(
        &mut self,
        start: usize,
        end: usize,
        v: NodeId,
        in_edge: Option<EdgeId>,
    ) -> Result<()> {
        let spec_start = if self.bytes.get(start) == Some(&b'(') {
            let close = self.paren[&start];
            if close >= end {
                return Err(ReticulumError::parse("unmatched '('", start, start + 1));
            }
            for (child_start, child_end) in self.split_children(start + 1, close) {
                if child_start == child_end {
                    return Err(ReticulumError::parse(
                        "empty child specification",
                        child_start,
                        child_start + 1,
                    ));
                }
                let child = self.net.new_node();
                let edge = self.net.new_edge(v, child)?;
                self.subtree(child_start, child_end, child, Some(edge))?;
            }
            close + 1
        } else {
            start
        };
        self.spec(spec_start, end, v, in_edge)
    }

    /// Ranges of the top-level comma-separated children in `start..end`.
    fn split_children(&self, start: usize, end: usize) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let mut depth = 0usize;
        let mut piece_start = start;
        let mut i = start;
        while i < end {
            match self.bytes[i] {
                b'[' => i = self.square[&i],
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => {
                    ranges.push((piece_start, i));
                    piece_start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }
        ranges.push((piece_start, end));
        ranges
    }

    /// Parse one `label #Hk :weight [info]` suffix into node `v`.
    fn spec(&mut self, start: usize, end: usize, v: NodeId, in_edge: Option<EdgeId>) -> Result<()> {
        let mut i = start;

        let label_start = i;
        while i < end && !matches!(self.bytes[i], b'#' | b':' | b'[') {
            let b = self.bytes[i];
            if matches!(b, b'(' | b')' | b',' | b';') {
                return Err(ReticulumError::parse(
                    format!("reserved character '{}' in label", b as char),
                    i,
                    i + 1,
                ));
            }
            i += 1;
        }
        if i > label_start {
            let label = std::str::from_utf8(&self.bytes[label_start..i])
                .map_err(|_| ReticulumError::parse("label is not valid UTF-8", label_start, i))?;
            self.net.set_label(v, Some(label.to_string()))?;
        }

        if i < end && self.bytes[i] == b'#' {
            let tag_start = i;
            i += 1;
            if self.bytes.get(i) != Some(&b'H') {
                return Err(ReticulumError::parse(
                    "malformed hybridization tag: expected '#H'",
                    tag_start,
                    i + 1,
                ));
            }
            i += 1;
            let digits_start = i;
            while i < end && self.bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i == digits_start {
                return Err(ReticulumError::parse(
                    "malformed hybridization tag: expected a number after '#H'",
                    tag_start,
                    i,
                ));
            }
            let k: u64 = std::str::from_utf8(&self.bytes[digits_start..i])
                .unwrap()
                .parse()
                .map_err(|_| {
                    ReticulumError::parse("hybridization tag out of range", digits_start, i)
                })?;
            self.hybrids
                .entry(k)
                .or_default()
                .push((v, in_edge, (start, end)));
        }

        if i < end && self.bytes[i] == b':' {
            i += 1;
            let num_start = i;
            while i < end
                && matches!(self.bytes[i], b'0'..=b'9' | b'.' | b'-' | b'+' | b'e' | b'E')
            {
                i += 1;
            }
            let weight: f64 = std::str::from_utf8(&self.bytes[num_start..i])
                .unwrap()
                .parse()
                .map_err(|_| ReticulumError::parse("invalid edge weight", num_start, i.max(num_start + 1)))?;
            if let Some(e) = in_edge {
                self.net.edge_mut(e)?.weight = weight;
            }
        }

        if i < end && self.bytes[i] == b'[' {
            let close = self.square[&i];
            let info = std::str::from_utf8(&self.bytes[i + 1..close])
                .map_err(|_| ReticulumError::parse("info is not valid UTF-8", i + 1, close))?
                .to_string();
            match in_edge {
                Some(e) => self.net.edge_mut(e)?.info = Some(info),
                None => self.net.node_mut(v)?.info = Some(info),
            }
            i = close + 1;
        }

        if i != end {
            return Err(ReticulumError::parse(
                format!("unexpected character '{}'", self.bytes[i] as char),
                i,
                i + 1,
            ));
        }
        Ok(())
    }

    /// Splice every non-canonical occurrence of each `#Hk` tag into the
    /// canonical node, merging labels and redirecting in-edges.
    fn merge_hybrids(&mut self) -> Result<()> {
        let tags: Vec<u64> = {
            let mut t: Vec<u64> = self.hybrids.keys().copied().collect();
            t.sort_unstable();
            t
        };
        for k in tags {
            let occurrences = self.hybrids[&k].clone();
            let with_children: Vec<_> = occurrences
                .iter()
                .filter(|(v, _, _)| self.net.out_degree(*v).unwrap_or(0) > 0)
                .collect();
            if with_children.len() > 1 {
                let (_, _, span) = with_children[1];
                return Err(ReticulumError::parse(
                    format!("reticulation #H{k} defined with descendants more than once"),
                    span.0,
                    span.1,
                ));
            }
            let canonical = with_children
                .first()
                .map(|(v, _, _)| *v)
                .unwrap_or(occurrences[0].0);
            for &(v, in_edge, span) in &occurrences {
                if v == canonical {
                    continue;
                }
                let e = in_edge.ok_or_else(|| {
                    ReticulumError::parse(
                        format!("hybridization tag #H{k} on the root"),
                        span.0,
                        span.1,
                    )
                })?;
                let (parent, weight, label, info) = {
                    let edge = self.net.edge(e)?;
                    (
                        edge.source(),
                        edge.weight,
                        edge.label.clone(),
                        edge.info.clone(),
                    )
                };
                if self.net.label(canonical)?.is_none() {
                    let merged = self.net.label(v)?.map(String::from);
                    self.net.set_label(canonical, merged)?;
                }
                self.net.delete_node(v)?;
                let redirected = self.net.new_edge(parent, canonical)?;
                let edge = self.net.edge_mut(redirected)?;
                edge.weight = weight;
                edge.label = label;
                edge.info = info;
            }
        }
        Ok(())
    }
}

fn match_square_brackets(bytes: &[u8]) -> Result<HashMap<usize, usize>> {
    let mut map = HashMap::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != b']' {
                    j += 1;
                }
                if j == bytes.len() {
                    return Err(ReticulumError::parse("unmatched '['", i, i + 1));
                }
                map.insert(i, j);
                i = j + 1;
            }
            b']' => {
                return Err(ReticulumError::parse("unmatched ']'", i, i + 1));
            }
            _ => i += 1,
        }
    }
    Ok(map)
}

fn find_terminal_semicolon(bytes: &[u8], square: &HashMap<usize, usize>) -> Result<usize> {
    let in_square = |i: usize| square.iter().any(|(&s, &e)| i > s && i < e);
    let mut i = bytes.len();
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    if i == 0 || bytes[i - 1] != b';' || in_square(i - 1) {
        return Err(ReticulumError::parse(
            "missing terminal ';'",
            bytes.len(),
            bytes.len() + 1,
        ));
    }
    Ok(i - 1)
}

fn reject_stray_whitespace(
    bytes: &[u8],
    square: &HashMap<usize, usize>,
    semi: usize,
) -> Result<()> {
    let mut i = 0;
    while i < semi {
        if let Some(&close) = square.get(&i) {
            i = close + 1;
            continue;
        }
        if bytes[i].is_ascii_whitespace() {
            return Err(ReticulumError::parse("stray whitespace", i, i + 1));
        }
        i += 1;
    }
    Ok(())
}

fn match_parens(
    bytes: &[u8],
    square: &HashMap<usize, usize>,
    semi: usize,
) -> Result<HashMap<usize, usize>> {
    let mut map = HashMap::new();
    let mut stack = Vec::new();
    let mut i = 0;
    while i < semi {
        if let Some(&close) = square.get(&i) {
            i = close + 1;
            continue;
        }
        match bytes[i] {
            b'(' => {
                stack.push(i);
                if stack.len() > MAX_TREE_DEPTH {
                    return Err(ReticulumError::parse("nesting too deep", i, i + 1));
                }
            }
            b')' => {
                let open = stack
                    .pop()
                    .ok_or_else(|| ReticulumError::parse("unmatched ')'", i, i + 1))?;
                map.insert(open, i);
            }
            _ => {}
        }
        i += 1;
    }
    if let Some(open) = stack.pop() {
        return Err(ReticulumError::parse("unmatched '('", open, open + 1));
    }
    Ok(map)
}

struct Writer<'a> {
    net: &'a RootedNetwork,
    buf: String,
    tags: HashMap<NodeId, usize>,
    next_tag: usize,
}

impl<'a> Writer<'a> {
    fn subtree(&mut self, v: NodeId, in_edge: Option<EdgeId>) {
        let node = self.net.node(v).expect("writer walks live nodes");
        let already_tagged = self.tags.contains_key(&v);

        if !node.is_leaf() && !already_tagged {
            self.buf.push('(');
            for (i, &e) in node.out_edges().iter().enumerate() {
                if i > 0 {
                    self.buf.push(',');
                }
                let target = self.net.edge(e).expect("writer walks live edges").target();
                self.subtree(target, Some(e));
            }
            self.buf.push(')');
        }

        if let Some(label) = &node.label {
            self.buf.push_str(label);
        }

        if node.is_reticulate() {
            let tag = *self.tags.entry(v).or_insert_with(|| {
                let t = self.next_tag;
                self.next_tag += 1;
                t
            });
            self.buf.push_str(&format!("#H{tag}"));
        }

        if let Some(e) = in_edge {
            let edge = self.net.edge(e).expect("writer walks live edges");
            if (edge.weight - DEFAULT_WEIGHT).abs() > f64::EPSILON {
                self.buf.push(':');
                self.buf.push_str(&format_weight(edge.weight));
            }
            if let Some(info) = &edge.info {
                self.buf.push('[');
                self.buf.push_str(info);
                self.buf.push(']');
            }
        } else if let Some(info) = &node.info {
            self.buf.push('[');
            self.buf.push_str(info);
            self.buf.push(']');
        }
    }
}

/// Format a weight with enough precision but no trailing zeros.
fn format_weight(w: f64) -> String {
    let s = format!("{w:.10}");
    let s = s.trim_end_matches('0');
    let s = s.trim_end_matches('.');
    s.to_string()
}
