use log::{trace, warn};

use crate::{
    solver::{frontier::Frontier, knowledge::KnowledgeBase, region::Region, SolverError},
    util::Loc,
};

/// Assignments are stored as bit masks, one bit per frontier square.
pub const MAX_FRONTIER: usize = 64;
pub const MAX_SOLUTIONS: usize = 1 << 20;
/// Search nodes visited before a frontier is given up on.
pub const MAX_STEPS: usize = 1 << 22;

/// "Exactly `remaining` of the squares in `vars` are mines."
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Constraint {
    pub origin: Loc,
    pub remaining: usize,
    /// Bit `i` stands for `frontier.unknowns[i]`.
    pub vars: u64,
}

impl Constraint {
    pub fn size(&self) -> usize {
        self.vars.count_ones() as usize
    }
}

/// Every mine placement a frontier allows, or `None` when the frontier was
/// too large to enumerate.
#[derive(Debug, Clone)]
pub struct PartialSolutions {
    pub index: usize,
    pub frontier: Frontier,
    pub constraints: Vec<Constraint>,
    pub masks: Option<Vec<u64>>,
}

impl PartialSolutions {
    pub fn is_enumerated(&self) -> bool {
        self.masks.is_some()
    }
}

/// Enumerates the frontier. Solutions placing more than `budget` mines are dropped.
pub fn enumerate(
    kb: &KnowledgeBase,
    index: usize,
    frontier: Frontier,
    budget: usize,
    cap: usize,
) -> Result<PartialSolutions, SolverError> {
    let constraints = constraints(kb, &frontier)?;
    let k = frontier.len();
    let masks = if k > cap.min(MAX_FRONTIER) {
        warn!("frontier {} has {} squares, estimating instead of enumerating", index, k);
        None
    } else {
        let order = order(k, &constraints);
        let masks = Search::new(k, &constraints, budget).run(&order);
        if masks.is_none() {
            warn!("frontier {} with {} squares has too many placements, estimating instead", index, k);
        }
        masks
    };

    if let Some(masks) = &masks {
        trace!("frontier {}: {} squares, {} constraints, {} placements", index, k, constraints.len(), masks.len());
        if masks.is_empty() {
            return Err(SolverError::NoSolutions { index, anchor: frontier.unknowns[0] });
        }
    }

    Ok(PartialSolutions { index, frontier, constraints, masks })
}

fn constraints(kb: &KnowledgeBase, frontier: &Frontier) -> Result<Vec<Constraint>, SolverError> {
    let mut constraints = vec![];
    for &origin in &frontier.numbered {
        let region = match Region::around(kb, origin)? {
            Some(region) => region,
            None => continue,
        };
        let vars = frontier.unknowns
            .iter()
            .enumerate()
            .filter(|(_, loc)| region.hidden.contains(*loc))
            .fold(0u64, |vars, (i, _)| vars | 1 << i);
        constraints.push(Constraint { origin, remaining: region.mines, vars });
    }
    Ok(constraints)
}

/// Orders variables so constraints close as early as possible: repeatedly
/// take the constraint with the fewest squares not yet ordered.
fn order(k: usize, constraints: &[Constraint]) -> Vec<usize> {
    let all = if k == 64 { u64::MAX } else { (1u64 << k) - 1 };
    let mut placed = 0u64;
    let mut order = Vec::with_capacity(k);
    while placed != all {
        let next = constraints
            .iter()
            .map(|c| c.vars & !placed)
            .filter(|&open| open != 0)
            .min_by_key(|open| open.count_ones())
            .unwrap_or(all & !placed);
        order.extend(bits(next));
        placed |= next;
    }
    order
}

fn bits(mut mask: u64) -> impl Iterator<Item = usize> {
    std::iter::from_fn(move || {
        if mask == 0 {
            return None;
        }
        let bit = mask.trailing_zeros() as usize;
        mask &= mask - 1;
        Some(bit)
    })
}

/// Backtracking state. Counters are kept per constraint so every assignment
/// is checked in time proportional to the constraints it touches.
struct Search<'a> {
    constraints: &'a [Constraint],
    /// Constraints touching each variable.
    watchers: Vec<Vec<usize>>,
    mines: Vec<usize>,
    open: Vec<usize>,
    mask: u64,
    placed: usize,
    budget: usize,
}

impl<'a> Search<'a> {
    fn new(k: usize, constraints: &'a [Constraint], budget: usize) -> Self {
        let mut watchers = vec![vec![]; k];
        for (c, constraint) in constraints.iter().enumerate() {
            for var in bits(constraint.vars) {
                watchers[var].push(c);
            }
        }
        Self {
            constraints,
            watchers,
            mines: vec![0; constraints.len()],
            open: constraints.iter().map(Constraint::size).collect(),
            mask: 0,
            placed: 0,
            budget,
        }
    }

    /// Assigns `var` and reports whether every constraint it touches can still be met.
    fn assign(&mut self, var: usize, mine: bool) -> bool {
        if mine {
            self.mask |= 1 << var;
            self.placed += 1;
        }
        let mut ok = true;
        for &c in &self.watchers[var] {
            self.open[c] -= 1;
            if mine {
                self.mines[c] += 1;
            }
            let remaining = self.constraints[c].remaining;
            ok &= self.mines[c] <= remaining && self.mines[c] + self.open[c] >= remaining;
        }
        ok
    }

    fn undo(&mut self, var: usize, mine: bool) {
        if mine {
            self.mask &= !(1 << var);
            self.placed -= 1;
        }
        for &c in &self.watchers[var] {
            self.open[c] += 1;
            if mine {
                self.mines[c] -= 1;
            }
        }
    }

    /// Depth first over `order` with an explicit stack. `tried[d]` counts the
    /// values attempted at depth `d`: safe first, then mine.
    fn run(mut self, order: &[usize]) -> Option<Vec<u64>> {
        let k = order.len();
        let mut solutions = vec![];
        let mut tried = vec![0u8; k + 1];
        let mut depth = 0;
        let mut steps = 0;
        loop {
            steps += 1;
            if steps > MAX_STEPS {
                return None;
            }

            if depth == k {
                solutions.push(self.mask);
                if solutions.len() > MAX_SOLUTIONS {
                    return None;
                }
                if k == 0 {
                    break;
                }
                depth -= 1;
                self.undo(order[depth], tried[depth] == 2);
                continue;
            }

            let var = order[depth];
            if tried[depth] == 2 {
                tried[depth] = 0;
                if depth == 0 {
                    break;
                }
                depth -= 1;
                self.undo(order[depth], tried[depth] == 2);
                continue;
            }

            tried[depth] += 1;
            let mine = tried[depth] == 2;
            if mine && self.placed >= self.budget {
                continue;
            }
            if self.assign(var, mine) {
                depth += 1;
            } else {
                self.undo(var, mine);
            }
        }
        Some(solutions)
    }
}
