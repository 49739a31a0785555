//! Text renderings of the tree: export, Mermaid chart, raw node fields.
//!
//! Export and chart visit nodes in pre-order, left to right.

use std::io::{BufRead, Write};

use crate::common::{Error, Key, PageId, RecordId, Result};
use crate::storage::BlockStore;

use super::internal::InternalNode;
use super::leaf::LeafNode;
use super::node::Node;
use super::tree::BPlusTree;

const BREAK: &str = "<br/>";

impl<S: BlockStore> BPlusTree<S> {
    /// Write each node as two lines: its size, then its keys (separators
    /// for internal nodes, stored keys for leaves).
    pub fn export<W: Write>(&self, out: &mut W) -> Result<()> {
        self.export_node(self.root(), out)
    }

    fn export_node<W: Write>(&self, page_id: PageId, out: &mut W) -> Result<()> {
        let node = self.nodes().load(page_id)?;
        writeln!(out, "{}", node.size())?;
        match &node {
            Node::Leaf(leaf) => write_keys(out, leaf.entries().keys().copied())?,
            Node::Internal(internal) => {
                write_keys(out, internal.keys().iter().copied())?;
                for &child in internal.children() {
                    self.export_node(child, out)?;
                }
            }
        }
        Ok(())
    }

    /// Write the tree as a Mermaid flowchart, labelling each edge with the
    /// key range routed through it.
    pub fn chart<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "graph TD")?;
        self.chart_node(self.root(), out)
    }

    fn chart_node<W: Write>(&self, page_id: PageId, out: &mut W) -> Result<()> {
        let id = chart_id(page_id);
        match self.nodes().load(page_id)? {
            Node::Leaf(leaf) => {
                let mut label = format!("{id}{BREAK}size: {}{BREAK}", leaf.size());
                for key in leaf.entries().keys() {
                    label.push_str(&format!("{key} "));
                }
                writeln!(out, "{id}[{label}]")?;
            }
            Node::Internal(internal) => {
                writeln!(out, "{id}[{id}{BREAK}size: {}{BREAK}]", internal.size())?;
                let keys = internal.keys();
                let last = internal.size() - 1;
                for (i, &child) in internal.children().iter().enumerate() {
                    self.chart_node(child, out)?;
                    let range = match i {
                        0 if last == 0 => "x".to_string(),
                        0 => format!("x <= {}", keys[0]),
                        i if i == last => format!("{} < x", keys[i - 1]),
                        i => format!("{} < x <= {}", keys[i - 1], keys[i]),
                    };
                    writeln!(out, "{id}-->|{range}|{}", chart_id(child))?;
                }
            }
        }
        Ok(())
    }
}

fn chart_id(page_id: PageId) -> String {
    format!("p{}", page_id.0)
}

fn write_keys<W: Write>(out: &mut W, keys: impl Iterator<Item = Key>) -> Result<()> {
    for key in keys {
        write!(out, "{} ", key)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Write a node's raw fields.
///
/// ```text
/// leaf <size>              internal <size>
/// <key> <record>           <child> <key> <child> ... <child>
/// ...
/// <next leaf | ->
/// ```
pub fn write_node<W: Write>(node: &Node, out: &mut W) -> Result<()> {
    match node {
        Node::Leaf(leaf) => {
            writeln!(out, "leaf {}", leaf.size())?;
            for (key, record) in leaf.entries() {
                writeln!(out, "{} {}", key, record)?;
            }
            match leaf.next_leaf() {
                Some(next) => writeln!(out, "{}", next.0)?,
                None => writeln!(out, "-")?,
            }
        }
        Node::Internal(internal) => {
            writeln!(out, "internal {}", internal.size())?;
            for (i, child) in internal.children().iter().enumerate() {
                if i > 0 {
                    write!(out, "{} ", internal.keys()[i - 1])?;
                }
                write!(out, "{}", child.0)?;
                if i + 1 < internal.size() {
                    write!(out, " ")?;
                }
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Parse the form produced by [`write_node`] into the node at `page_id`.
///
/// Fails with [`Error::Corruption`] on an unknown kind, a count that does not
/// match the fields, or a token that does not parse.
pub fn read_node<R: BufRead>(page_id: PageId, input: R) -> Result<Node> {
    let mut text = String::new();
    for line in input.lines() {
        text.push_str(&line?);
        text.push('\n');
    }
    let mut tokens = text.split_whitespace();

    let kind = tokens.next().ok_or_else(|| malformed(page_id, "empty input"))?;
    let size: usize = parse(page_id, tokens.next(), "size")?;

    let node = match kind {
        "leaf" => {
            let mut entries = std::collections::BTreeMap::new();
            for _ in 0..size {
                let key: Key = parse(page_id, tokens.next(), "key")?;
                let record: RecordId = parse(page_id, tokens.next(), "record")?;
                entries.insert(key, record);
            }
            if entries.len() != size {
                return Err(malformed(page_id, "duplicate keys"));
            }
            let next = match tokens.next() {
                Some("-") => None,
                token => Some(PageId::new(parse(page_id, token, "next leaf")?)),
            };
            Node::Leaf(LeafNode::from_parts(page_id, entries, next))
        }
        "internal" => {
            if size == 0 {
                return Err(malformed(page_id, "internal node with no children"));
            }
            let mut children = Vec::with_capacity(size);
            let mut keys = Vec::with_capacity(size - 1);
            for i in 0..size {
                if i > 0 {
                    keys.push(parse(page_id, tokens.next(), "key")?);
                }
                children.push(PageId::new(parse(page_id, tokens.next(), "child")?));
            }
            Node::Internal(InternalNode::from_parts(page_id, children, keys))
        }
        other => return Err(malformed(page_id, &format!("unknown node kind {:?}", other))),
    };

    if tokens.next().is_some() {
        return Err(malformed(page_id, "trailing fields"));
    }
    Ok(node)
}

fn parse<T: std::str::FromStr>(page_id: PageId, token: Option<&str>, field: &str) -> Result<T> {
    token
        .ok_or_else(|| malformed(page_id, &format!("missing {}", field)))?
        .parse()
        .map_err(|_| malformed(page_id, &format!("bad {}", field)))
}

fn malformed(page_id: PageId, detail: &str) -> Error {
    Error::Corruption(format!("node text for {}: {}", page_id, detail))
}
