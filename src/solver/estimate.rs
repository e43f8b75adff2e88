use itertools::Itertools;

use crate::{
    solver::{
        enumerate::PartialSolutions,
        frontier,
        knowledge::KnowledgeBase,
        Deduction,
        Rule,
        SolverError,
    },
    util::Loc,
};

/// Probabilities that differ by less than this are treated as equal.
pub const EPSILON: f64 = 1e-9;

/// Mine statistics for one frontier.
#[derive(Debug, Clone)]
pub struct FrontierEstimate {
    pub index: usize,
    pub unknowns: Vec<Loc>,
    pub probabilities: Vec<f64>,
    /// `None` for frontiers that were too large to enumerate.
    pub solutions: Option<usize>,
    pub expected: f64,
    pub min: usize,
    pub max: usize,
}

impl FrontierEstimate {
    pub fn new(partial: &PartialSolutions) -> Self {
        match &partial.masks {
            Some(masks) => Self::enumerated(partial, masks),
            None => Self::approximate(partial),
        }
    }

    fn enumerated(partial: &PartialSolutions, masks: &[u64]) -> Self {
        let k = partial.frontier.len();
        let total = masks.len();
        let mut counts = vec![0usize; k];
        let mines_sum = masks.iter().map(|m| m.count_ones() as usize).sum::<usize>();
        let (min, max) = masks.iter()
            .map(|m| m.count_ones() as usize)
            .minmax()
            .into_option()
            .unwrap_or((0, 0));
        for &mask in masks {
            for (i, count) in counts.iter_mut().enumerate() {
                if mask & (1 << i) != 0 {
                    *count += 1;
                }
            }
        }

        Self {
            index: partial.index,
            unknowns: partial.frontier.unknowns.clone(),
            probabilities: counts.iter().map(|&c| c as f64 / total as f64).collect(),
            solutions: Some(total),
            expected: mines_sum as f64 / total as f64,
            min,
            max,
        }
    }

    /// Each square gets the mean density of the numbers watching it. The
    /// bounds stay valid: some single number needs all of its remaining mines,
    /// and no more than every number's remaining count can be placed.
    fn approximate(partial: &PartialSolutions) -> Self {
        let k = partial.frontier.len();
        let probabilities = (0..k)
            .map(|i| {
                let densities = partial.constraints
                    .iter()
                    .filter(|c| c.vars & (1 << i) != 0)
                    .map(|c| c.remaining as f64 / c.size() as f64)
                    .collect::<Vec<_>>();
                if densities.is_empty() {
                    0.5
                } else {
                    densities.iter().sum::<f64>() / densities.len() as f64
                }
            })
            .collect::<Vec<_>>();
        let min = partial.constraints.iter().map(|c| c.remaining).max().unwrap_or(0);
        let max = partial.constraints.iter().map(|c| c.remaining).sum::<usize>().min(k);

        Self {
            index: partial.index,
            unknowns: partial.frontier.unknowns.clone(),
            expected: probabilities.iter().sum(),
            probabilities,
            solutions: None,
            min,
            max,
        }
    }

    /// Squares every placement agrees on.
    pub fn certainties(&self) -> Vec<Deduction> {
        let solutions = match self.solutions {
            Some(solutions) => solutions,
            None => return vec![],
        };
        let rule = Rule::Enumerated { frontier: self.index, solutions };
        self.unknowns
            .iter()
            .zip(&self.probabilities)
            .filter_map(|(&loc, &p)| {
                if p == 0.0 {
                    Some(Deduction::safe(loc, rule))
                } else if p == 1.0 {
                    Some(Deduction::mine(loc, rule))
                } else {
                    None
                }
            })
            .collect()
    }
}

/// What the global mine count says about unknowns outside every frontier.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Outside {
    /// There are no such squares.
    Empty,
    Safe,
    Mines,
    /// Mine probability of each square, assuming frontiers and the rest
    /// of the board are independent.
    Uncertain(f64),
}

/// Aggregate over every frontier.
#[derive(Debug, Clone)]
pub struct Estimate {
    pub frontiers: Vec<FrontierEstimate>,
    pub total_expected: f64,
    pub total_min: usize,
    pub total_max: usize,
    pub budget: usize,
    pub outside: Vec<Loc>,
    pub verdict: Outside,
}

impl Estimate {
    pub fn new(kb: &KnowledgeBase, partials: Vec<PartialSolutions>) -> Result<Self, SolverError> {
        let frontiers = partials.iter().map(FrontierEstimate::new).collect::<Vec<_>>();
        let total_expected = frontiers.iter().map(|f| f.expected).sum::<f64>();
        let total_min = frontiers.iter().map(|f| f.min).sum::<usize>();
        let total_max = frontiers.iter().map(|f| f.max).sum::<usize>();
        let budget = kb.budget();
        let outside = frontier::outside(kb);
        let r = outside.len();

        if budget < total_min || budget > total_max + r {
            return Err(SolverError::Conservation { budget, min: total_min, max: total_max + r });
        }

        let verdict = if r == 0 {
            Outside::Empty
        } else if budget == total_min {
            Outside::Safe
        } else if budget - total_max.min(budget) == r {
            Outside::Mines
        } else {
            let p = (budget as f64 - total_expected) / r as f64;
            Outside::Uncertain(p.max(0.0).min(1.0))
        };

        Ok(Self { frontiers, total_expected, total_min, total_max, budget, outside, verdict })
    }

    /// Everything the estimate proves: frontier squares all placements agree
    /// on, and the outside squares when the global count settles them.
    pub fn certainties(&self) -> Vec<Deduction> {
        let mut found = self.frontiers.iter().flat_map(FrontierEstimate::certainties).collect::<Vec<_>>();
        match self.verdict {
            Outside::Safe => {
                let rule = Rule::FrontierMinimum { budget: self.budget };
                found.extend(self.outside.iter().map(|&loc| Deduction::safe(loc, rule)));
            }
            Outside::Mines => {
                let rule = Rule::FrontierMaximum { budget: self.budget, outside: self.outside.len() };
                found.extend(self.outside.iter().map(|&loc| Deduction::mine(loc, rule)));
            }
            Outside::Empty | Outside::Uncertain(_) => (),
        }
        found
    }

    pub fn outside_probability(&self) -> Option<f64> {
        match self.verdict {
            Outside::Empty => None,
            Outside::Safe => Some(0.0),
            Outside::Mines => Some(1.0),
            Outside::Uncertain(p) => Some(p),
        }
    }

    /// The lowest frontier probability and every square that reaches it.
    pub fn safest_frontier(&self) -> Option<(f64, Vec<Loc>)> {
        let lowest = self.frontiers
            .iter()
            .flat_map(|f| f.probabilities.iter().copied())
            .fold(None, |lowest: Option<f64>, p| Some(lowest.map_or(p, |l| l.min(p))))?;
        let locs = self.frontiers
            .iter()
            .flat_map(|f| f.unknowns.iter().zip(&f.probabilities))
            .filter(|&(_, &p)| p - lowest < EPSILON)
            .map(|(&loc, _)| loc)
            .collect();
        Some((lowest, locs))
    }

    pub fn probability(&self, loc: Loc) -> Option<f64> {
        for f in &self.frontiers {
            if let Some(i) = f.unknowns.iter().position(|&l| l == loc) {
                return Some(f.probabilities[i]);
            }
        }
        if self.outside.contains(&loc) {
            return self.outside_probability();
        }
        None
    }
}
