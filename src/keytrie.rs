use crate::action::ExtensionHandler;
use crate::key::{to_notation, KeyStroke};
use crate::mode::MappingModes;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

// ── Trie ────────────────────────────────────────────────────────────────────

struct Node<T> {
    value: Option<T>,
    children: HashMap<KeyStroke, Node<T>>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            value: None,
            children: HashMap::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    fn collect<'a>(&'a self, path: &mut Vec<KeyStroke>, out: &mut Vec<(Vec<KeyStroke>, &'a T)>) {
        if let Some(v) = &self.value {
            out.push((path.clone(), v));
        }
        for (key, child) in &self.children {
            path.push(*key);
            child.collect(path, out);
            path.pop();
        }
    }

    fn retain(&mut self, keep: &mut impl FnMut(&T) -> bool) -> usize {
        let mut removed = 0;
        if self.value.as_ref().is_some_and(|v| !keep(v)) {
            self.value = None;
            removed += 1;
        }
        for child in self.children.values_mut() {
            removed += child.retain(keep);
        }
        self.children.retain(|_, c| !c.is_empty());
        removed
    }
}

/// Result of looking up a pressed-key buffer.
#[derive(Debug, PartialEq)]
pub enum TrieMatch<'a, T> {
    NoMatch,
    /// The buffer continues to longer sequences. Carries the entry when the
    /// buffer is itself complete, which a timeout resolves to.
    AmbiguousPrefix(Option<&'a T>),
    Match(&'a T),
}

/// Prefix tree from key sequences to values.
pub struct KeyTrie<T> {
    root: Node<T>,
}

impl<T> Default for KeyTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KeyTrie<T> {
    pub fn new() -> Self {
        Self { root: Node::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Stores `value` under `keys`, returning the value it replaced.
    pub fn insert(&mut self, keys: &[KeyStroke], value: T) -> Option<T> {
        let mut node = &mut self.root;
        for key in keys {
            node = node.children.entry(*key).or_insert_with(Node::new);
        }
        node.value.replace(value)
    }

    pub fn remove(&mut self, keys: &[KeyStroke]) -> Option<T> {
        fn walk<T>(node: &mut Node<T>, keys: &[KeyStroke]) -> Option<T> {
            let Some((first, rest)) = keys.split_first() else {
                return node.value.take();
            };
            let child = node.children.get_mut(first)?;
            let removed = walk(child, rest);
            if child.is_empty() {
                node.children.remove(first);
            }
            removed
        }
        walk(&mut self.root, keys)
    }

    /// Drops every value `keep` rejects and prunes empty branches.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        self.root.retain(&mut keep)
    }

    pub fn get(&self, keys: &[KeyStroke]) -> Option<&T> {
        self.node(keys).and_then(|n| n.value.as_ref())
    }

    fn node(&self, keys: &[KeyStroke]) -> Option<&Node<T>> {
        let mut node = &self.root;
        for key in keys {
            node = node.children.get(key)?;
        }
        Some(node)
    }

    pub fn lookup(&self, pressed: &[KeyStroke]) -> TrieMatch<'_, T> {
        if pressed.is_empty() {
            return TrieMatch::NoMatch;
        }
        match self.node(pressed) {
            None => TrieMatch::NoMatch,
            Some(node) if node.children.is_empty() => match &node.value {
                Some(v) => TrieMatch::Match(v),
                None => TrieMatch::NoMatch,
            },
            Some(node) => TrieMatch::AmbiguousPrefix(node.value.as_ref()),
        }
    }

    pub fn entries(&self) -> Vec<(Vec<KeyStroke>, &T)> {
        let mut out = Vec::new();
        self.root.collect(&mut Vec::new(), &mut out);
        out
    }
}

// ── Mappings ────────────────────────────────────────────────────────────────

pub enum MappingTarget {
    Keys(Vec<KeyStroke>),
    Handler(Rc<dyn ExtensionHandler>),
}

pub struct MappingEntry {
    pub from: Vec<KeyStroke>,
    pub target: MappingTarget,
    /// `map` vs `noremap`: whether the produced keys are mapped again.
    pub recursive: bool,
    pub owner: String,
}

impl fmt::Debug for MappingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let to = match &self.target {
            MappingTarget::Keys(keys) => to_notation(keys),
            MappingTarget::Handler(h) => format!("<handler:{}>", h.id()),
        };
        f.debug_struct("MappingEntry")
            .field("from", &to_notation(&self.from))
            .field("to", &to)
            .field("recursive", &self.recursive)
            .field("owner", &self.owner)
            .finish()
    }
}

const BUCKETS: [MappingModes; 6] = [
    MappingModes::NORMAL,
    MappingModes::VISUAL,
    MappingModes::SELECT,
    MappingModes::OP_PENDING,
    MappingModes::INSERT,
    MappingModes::CMD_LINE,
];

pub(crate) fn buckets(modes: MappingModes) -> impl Iterator<Item = MappingModes> {
    BUCKETS.into_iter().filter(move |b| modes.contains(*b))
}

/// User and extension mappings, one trie per mode bucket.
#[derive(Default)]
pub struct KeyMappings {
    tries: HashMap<MappingModes, KeyTrie<Rc<MappingEntry>>>,
}

impl KeyMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mapping(
        &mut self,
        modes: MappingModes,
        from: Vec<KeyStroke>,
        owner: &str,
        target: MappingTarget,
        recursive: bool,
    ) {
        if from.is_empty() {
            return;
        }
        let entry = Rc::new(MappingEntry {
            from,
            target,
            recursive,
            owner: owner.to_string(),
        });
        for bucket in buckets(modes) {
            self.tries
                .entry(bucket)
                .or_default()
                .insert(&entry.from, Rc::clone(&entry));
        }
    }

    /// Removes every mapping registered by `owner`.
    pub fn remove_owner(&mut self, owner: &str) -> usize {
        self.tries
            .values_mut()
            .map(|t| t.retain(|e| e.owner != owner))
            .sum()
    }

    pub fn remove(&mut self, modes: MappingModes, from: &[KeyStroke]) -> bool {
        let mut removed = false;
        for bucket in buckets(modes) {
            if let Some(trie) = self.tries.get_mut(&bucket) {
                removed |= trie.remove(from).is_some();
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        self.tries.clear();
    }

    pub fn lookup(&self, bucket: MappingModes, pressed: &[KeyStroke]) -> TrieMatch<'_, Rc<MappingEntry>> {
        match self.tries.get(&bucket) {
            Some(trie) => trie.lookup(pressed),
            None => TrieMatch::NoMatch,
        }
    }

    pub fn get(&self, bucket: MappingModes, keys: &[KeyStroke]) -> Option<&Rc<MappingEntry>> {
        self.tries.get(&bucket).and_then(|t| t.get(keys))
    }

    pub fn has_mappings(&self, bucket: MappingModes) -> bool {
        self.tries.get(&bucket).is_some_and(|t| !t.is_empty())
    }

    pub fn entries(&self, bucket: MappingModes) -> Vec<Rc<MappingEntry>> {
        let Some(trie) = self.tries.get(&bucket) else {
            return Vec::new();
        };
        let mut out: Vec<Rc<MappingEntry>> = trie.entries().into_iter().map(|(_, e)| Rc::clone(e)).collect();
        out.sort_by_key(|e| to_notation(&e.from));
        out
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::parse_keys;

    fn keys(s: &str) -> Vec<KeyStroke> {
        parse_keys(s).unwrap()
    }

    #[test]
    fn test_lookup_outcomes() {
        let mut trie = KeyTrie::new();
        trie.insert(&keys("gg"), "A");
        trie.insert(&keys("ggg"), "B");
        trie.insert(&keys("x"), "X");

        assert_eq!(trie.lookup(&keys("g")), TrieMatch::AmbiguousPrefix(None));
        assert_eq!(trie.lookup(&keys("gg")), TrieMatch::AmbiguousPrefix(Some(&"A")));
        assert_eq!(trie.lookup(&keys("ggg")), TrieMatch::Match(&"B"));
        assert_eq!(trie.lookup(&keys("x")), TrieMatch::Match(&"X"));
        assert_eq!(trie.lookup(&keys("gx")), TrieMatch::NoMatch);
        assert_eq!(trie.lookup(&[]), TrieMatch::NoMatch);
    }

    #[test]
    fn test_remove_prunes_branches() {
        let mut trie = KeyTrie::new();
        trie.insert(&keys("abc"), 1);
        assert_eq!(trie.remove(&keys("abc")), Some(1));
        assert!(trie.is_empty());
        assert_eq!(trie.lookup(&keys("a")), TrieMatch::NoMatch);
    }

    #[test]
    fn test_mappings_by_owner() {
        let mut maps = KeyMappings::new();
        maps.add_mapping(
            MappingModes::NVO,
            keys("Q"),
            "plugin",
            MappingTarget::Keys(keys("gq")),
            false,
        );
        maps.add_mapping(
            MappingModes::NORMAL,
            keys("Y"),
            "user",
            MappingTarget::Keys(keys("y$")),
            false,
        );
        assert!(maps.get(MappingModes::OP_PENDING, &keys("Q")).is_some());
        assert_eq!(maps.remove_owner("plugin"), 4);
        assert!(maps.get(MappingModes::NORMAL, &keys("Q")).is_none());
        assert!(maps.get(MappingModes::NORMAL, &keys("Y")).is_some());
    }

    #[test]
    fn test_remove_by_mode() {
        let mut maps = KeyMappings::new();
        maps.add_mapping(MappingModes::NV, keys("j"), "user", MappingTarget::Keys(keys("gj")), false);
        assert!(maps.remove(MappingModes::X, &keys("j")));
        assert!(maps.get(MappingModes::VISUAL, &keys("j")).is_none());
        assert!(maps.get(MappingModes::NORMAL, &keys("j")).is_some());
    }
}
