use crate::task::types::TaskId;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}]+").expect("word pattern is a valid regex")
});

/// Split text into lowercase words of letters and digits
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Words worth indexing: tokens strictly longer than `min_len` characters
pub fn index_words(text: &str, min_len: usize) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|w| w.chars().count() > min_len)
        .collect()
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    /// Tasks whose indexed word ends exactly here
    terminal_for: HashSet<TaskId>,
    /// Every task with an indexed word passing through this node
    task_ids: HashSet<TaskId>,
}

impl TrieNode {
    fn is_end_of_word(&self) -> bool {
        !self.terminal_for.is_empty()
    }

    fn is_prunable(&self) -> bool {
        self.task_ids.is_empty() && self.children.is_empty() && !self.is_end_of_word()
    }

    /// Remove `task_id` along `chars`; returns true when the caller should
    /// drop this node from its parent.
    fn remove(&mut self, chars: &[char], task_id: &TaskId) -> bool {
        match chars.split_first() {
            None => {
                self.terminal_for.remove(task_id);
            }
            Some((c, rest)) => {
                let prune_child = match self.children.get_mut(c) {
                    Some(child) => child.remove(rest, task_id),
                    None => false,
                };
                if prune_child {
                    self.children.remove(c);
                }
            }
        }

        // A task keeps its id on a shared prefix while another of its words
        // still passes through this node.
        let still_reachable = self.terminal_for.contains(task_id)
            || self.children.values().any(|c| c.task_ids.contains(task_id));
        if !still_reachable {
            self.task_ids.remove(task_id);
        }

        self.is_prunable()
    }
}

/// Prefix index from lowercase words to the tasks that contain them.
///
/// Each task contributes a word at most once; callers index the distinct
/// words of a task and remove the same set before re-indexing.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    root: TrieNode,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: &str, task_id: &TaskId) {
        let word = word.to_lowercase();
        if word.is_empty() {
            return;
        }

        let mut node = &mut self.root;
        for c in word.chars() {
            node = node.children.entry(c).or_default();
            node.task_ids.insert(task_id.clone());
        }
        node.terminal_for.insert(task_id.clone());
    }

    /// Tasks having an indexed word that starts with `prefix`
    pub fn search(&self, prefix: &str) -> HashSet<TaskId> {
        let prefix = prefix.to_lowercase();
        if prefix.is_empty() {
            return HashSet::new();
        }

        let mut node = &self.root;
        for c in prefix.chars() {
            match node.children.get(&c) {
                Some(child) => node = child,
                None => return HashSet::new(),
            }
        }
        node.task_ids.clone()
    }

    pub fn delete(&mut self, word: &str, task_id: &TaskId) {
        let chars: Vec<char> = word.to_lowercase().chars().collect();
        if chars.is_empty() {
            return;
        }

        let (first, rest) = (chars[0], &chars[1..]);
        let prune = match self.root.children.get_mut(&first) {
            Some(child) => child.remove(rest, task_id),
            None => false,
        };
        if prune {
            self.root.children.remove(&first);
        }
    }

    /// Whether `word` is currently indexed for any task
    pub fn contains_word(&self, word: &str) -> bool {
        let mut node = &self.root;
        for c in word.to_lowercase().chars() {
            match node.children.get(&c) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.is_end_of_word()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Number of trie nodes below the root
    pub fn node_count(&self) -> usize {
        fn count(node: &TrieNode) -> usize {
            node.children.values().map(|c| 1 + count(c)).sum()
        }
        count(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    fn id(s: &str) -> TaskId {
        TaskId::from(s)
    }

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("Design Database-Schema, v2!"),
            vec!["design", "database", "schema", "v2"]
        );
        assert_eq!(index_words("an API to fix db", 2), vec!["api", "fix"]);
    }

    #[test]
    fn test_prefix_search_is_case_insensitive() {
        let mut index = SearchIndex::new();
        index.insert("Design", &id("a"));
        index.insert("database", &id("b"));

        assert_eq!(index.search("DESI"), HashSet::from([id("a")]));
        assert_eq!(index.search("d"), HashSet::from([id("a"), id("b")]));
        assert!(index.search("x").is_empty());
        assert!(index.search("").is_empty());
    }

    #[test]
    fn test_delete_prunes_unique_suffix() {
        let mut index = SearchIndex::new();
        index.insert("design", &id("a"));
        index.insert("desk", &id("b"));

        index.delete("design", &id("a"));

        assert!(index.search("desi").is_empty());
        assert_eq!(index.search("des"), HashSet::from([id("b")]));
        assert!(!index.contains_word("design"));
        assert!(index.contains_word("desk"));
        // d-e-s-k remains
        assert_eq!(index.node_count(), 4);
    }

    #[test]
    fn test_delete_keeps_word_shared_by_other_task() {
        let mut index = SearchIndex::new();
        index.insert("schema", &id("a"));
        index.insert("schema", &id("b"));

        index.delete("schema", &id("a"));

        assert_eq!(index.search("sch"), HashSet::from([id("b")]));
        assert!(index.contains_word("schema"));
    }

    #[test]
    fn test_delete_keeps_prefix_word_of_same_task() {
        let mut index = SearchIndex::new();
        index.insert("test", &id("a"));
        index.insert("testing", &id("a"));

        index.delete("testing", &id("a"));

        assert_eq!(index.search("tes"), HashSet::from([id("a")]));
        assert!(index.search("testi").is_empty());
        assert!(index.contains_word("test"));
    }

    #[test]
    fn test_delete_everything_leaves_empty_trie() {
        let mut index = SearchIndex::new();
        index.insert("alpha", &id("a"));
        index.insert("alps", &id("a"));
        index.insert("beta", &id("b"));

        index.delete("alpha", &id("a"));
        index.delete("alps", &id("a"));
        index.delete("beta", &id("b"));
        index.delete("never", &id("c"));

        assert!(index.is_empty());
        assert_eq!(index.node_count(), 0);
    }

    #[test]
    fn test_random_index_matches_brute_force() {
        let vocabulary = [
            "alpha", "alps", "alpine", "beta", "bet", "better", "gamma", "game", "gamut",
        ];
        let tasks: Vec<TaskId> = (0..6).map(|i| id(&format!("t{}", i))).collect();
        let mut rng = StdRng::seed_from_u64(11);
        let mut index = SearchIndex::new();
        let mut live: BTreeSet<(String, TaskId)> = BTreeSet::new();

        for _ in 0..500 {
            let word = vocabulary[rng.random_range(0..vocabulary.len())].to_string();
            let task = tasks[rng.random_range(0..tasks.len())].clone();
            let pair = (word.clone(), task.clone());
            if live.contains(&pair) {
                index.delete(&word, &task);
                live.remove(&pair);
            } else {
                index.insert(&word, &task);
                live.insert(pair);
            }

            for prefix in ["a", "al", "alp", "b", "bet", "g", "gam", "gamu", "z"] {
                let expected: HashSet<TaskId> = live
                    .iter()
                    .filter(|(w, _)| w.starts_with(prefix))
                    .map(|(_, t)| t.clone())
                    .collect();
                assert_eq!(index.search(prefix), expected, "prefix {}", prefix);
            }
        }
    }
}
