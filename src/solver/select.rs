use log::trace;
use rand::{seq::SliceRandom, Rng};

use crate::{
    solver::{estimate::Estimate, frontier, knowledge::KnowledgeBase},
    util::{self, Loc},
};

/// Picks the next square to reveal, in order of preference:
/// a proven safe square, the safest frontier square when it beats the rest
/// of the board, then an unexplored corner, edge or any other square.
pub fn choose<R: Rng + ?Sized>(kb: &KnowledgeBase, estimate: Option<&Estimate>, rng: &mut R) -> Option<Loc> {
    if let Some(&safe) = kb.safe().iter().min() {
        trace!("revealing proven safe square {:?}", safe);
        return Some(safe);
    }

    if !kb.has_numbered() {
        let unknowns = kb.unknowns().collect::<Vec<_>>();
        return pick_unexplored(kb.dims(), &unknowns, rng);
    }

    let estimate = match estimate {
        Some(estimate) => estimate,
        None => {
            let pool = frontier::outside(kb);
            let fallback = kb.unknowns().collect::<Vec<_>>();
            return pick_unexplored(kb.dims(), &pool, rng)
                .or_else(|| pick_unexplored(kb.dims(), &fallback, rng));
        }
    };

    let safest = estimate.safest_frontier();
    if let Some((p, locs)) = &safest {
        let beats_outside = estimate.outside_probability().map_or(true, |outside| *p < outside);
        if beats_outside {
            trace!("frontier square at {:.3} beats {:?} outside", p, estimate.outside_probability());
            return locs.choose(rng).copied();
        }
    }

    pick_unexplored(kb.dims(), &estimate.outside, rng)
        .or_else(|| safest.and_then(|(_, locs)| locs.choose(rng).copied()))
}

/// Uniform choice among the corners of `pool`, else its edges, else all of it.
pub fn pick_unexplored<R: Rng + ?Sized>(dims: (usize, usize), pool: &[Loc], rng: &mut R) -> Option<Loc> {
    let corners = pool.iter().copied().filter(|&l| util::is_corner(dims, l)).collect::<Vec<_>>();
    if let Some(&loc) = corners.choose(rng) {
        return Some(loc);
    }
    let edges = pool.iter().copied().filter(|&l| util::is_edge(dims, l)).collect::<Vec<_>>();
    if let Some(&loc) = edges.choose(rng) {
        return Some(loc);
    }
    pool.choose(rng).copied()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;
    use crate::{
        board::Board,
        solver::{enumerate, GameView},
    };

    fn estimate(kb: &KnowledgeBase) -> Estimate {
        let partials = frontier::build(kb)
            .into_iter()
            .enumerate()
            .map(|(i, f)| enumerate::enumerate(kb, i, f, kb.budget(), 24))
            .collect::<Result<Vec<_>, _>>()
            .expect("a consistent board.");
        Estimate::new(kb, partials).expect("a consistent board.")
    }

    fn synced(board: &Board) -> KnowledgeBase {
        let mut kb = KnowledgeBase::new(board.dims(), board.total_mines());
        kb.sync(board).expect("a consistent board.");
        kb
    }

    #[test]
    fn blank_board_opens_in_a_corner() {
        let kb = KnowledgeBase::new((7, 9), 10);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        for _ in 0..20 {
            let loc = choose(&kb, None, &mut rng).expect("a move.");
            assert!(util::is_corner(kb.dims(), loc));
        }
    }

    #[test]
    fn lowest_safe_square_comes_first() {
        let mut kb = KnowledgeBase::new((4, 4), 2);
        kb.mark_safe((3, 1)).expect("an unknown square.");
        kb.mark_safe((1, 2)).expect("an unknown square.");
        kb.mark_safe((1, 0)).expect("an unknown square.");
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        assert_eq!(choose(&kb, None, &mut rng), Some((1, 0)));
    }

    #[test]
    fn safer_frontier_beats_outside() {
        // Each island square is 1/8, the rest of the board is 4/17.
        let board = Board::from_save(b"xHHHHHx\nH.HHHHH\nHHHHHHH\nHHHHH.H\nxxxHHHx\n").expect("a valid fixture.");
        let kb = synced(&board);
        let estimate = estimate(&kb);
        assert!(estimate.outside_probability().expect("outside squares.") > 0.125);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let loc = choose(&kb, Some(&estimate), &mut rng).expect("a move.");
        assert_eq!(estimate.probability(loc), Some(0.125));
    }

    #[test]
    fn safer_outside_prefers_corners() {
        // The 2 needs both mines, so the rest of the board is clear.
        let board = Board::from_save(b"HHHHH\nHHHHH\nHHHHH\nx.xHH\nHHHHH\n").expect("a valid fixture.");
        let kb = synced(&board);
        let estimate = estimate(&kb);
        let (p, _) = estimate.safest_frontier().expect("a frontier.");
        assert!(estimate.outside_probability().expect("outside squares.") < p);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        for _ in 0..10 {
            let loc = choose(&kb, Some(&estimate), &mut rng).expect("a move.");
            assert!(util::is_corner(kb.dims(), loc));
            assert!(estimate.outside.contains(&loc));
        }
    }

    #[test]
    fn unexplored_tiers() {
        let dims = (5, 5);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        assert_eq!(pick_unexplored(dims, &[(2, 2), (0, 3), (4, 4)], &mut rng), Some((4, 4)));
        assert_eq!(pick_unexplored(dims, &[(2, 2), (0, 3)], &mut rng), Some((0, 3)));
        assert_eq!(pick_unexplored(dims, &[(2, 2)], &mut rng), Some((2, 2)));
        assert_eq!(pick_unexplored(dims, &[], &mut rng), None);
    }
}
