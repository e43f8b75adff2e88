use std::collections::VecDeque;

use indexmap::IndexSet;
use itertools::Itertools;

use crate::{
    solver::knowledge::KnowledgeBase,
    util::{self, Loc},
};

/// A connected group of unknown squares and the numbered squares that watch them.
/// Both lists are sorted row-major.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Frontier {
    pub unknowns: Vec<Loc>,
    pub numbered: Vec<Loc>,
}

impl Frontier {
    pub fn len(&self) -> usize {
        self.unknowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unknowns.is_empty()
    }
}

/// Splits the unknown squares next to numbers into frontiers. Two unknowns
/// share a frontier when a chain of numbered squares links them.
pub fn build(kb: &KnowledgeBase) -> Vec<Frontier> {
    let mut visited = IndexSet::new();
    let mut frontiers = vec![];
    for start in util::all_locs(kb.dims()) {
        if visited.contains(&start) || !kb.is_unknown(start) || !kb.touches_number(start) {
            continue;
        }

        let mut unknowns = vec![];
        let mut numbered = IndexSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);
        while let Some(unknown) = queue.pop_front() {
            unknowns.push(unknown);
            for watcher in kb.neighbours(unknown).filter(|&l| kb.number(l).is_some()) {
                if !numbered.insert(watcher) {
                    continue;
                }
                for next in kb.neighbours(watcher).filter(|&l| kb.is_unknown(l)) {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        unknowns.sort();
        let numbered = numbered.into_iter().sorted().collect();
        frontiers.push(Frontier { unknowns, numbered });
    }
    frontiers
}

/// Unknown squares with no numbered neighbour, row-major.
pub fn outside(kb: &KnowledgeBase) -> Vec<Loc> {
    kb.unknowns().filter(|&loc| !kb.touches_number(loc)).collect()
}
