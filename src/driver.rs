use std::{
    fmt,
    io,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use log::{debug, info};
use rand::Rng;

use crate::{
    board::{self, Board, CellState},
    opts::{GameConfig, Layout},
    solver::{Fact, Solver},
    util::Pos,
};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct GameOutcome {
    pub won: bool,
    pub moves: usize,
    pub elapsed: Duration,
}

/// Totals across a run of games.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct Stats {
    pub games: usize,
    pub wins: usize,
    pub moves: usize,
    pub elapsed: Duration,
}

impl Stats {
    pub fn record(&mut self, outcome: &GameOutcome) {
        self.games += 1;
        if outcome.won {
            self.wins += 1;
        }
        self.moves += outcome.moves;
        self.elapsed += outcome.elapsed;
    }

    pub fn losses(&self) -> usize {
        self.games - self.wins
    }

    pub fn win_percentage(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.wins as f64 / self.games as f64 * 100.0
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Games completed")?;
        writeln!(f, "Wins: {}", self.wins)?;
        writeln!(f, "Losses: {}", self.losses())?;
        writeln!(f, "Win Percentage: {:.2}", self.win_percentage())?;
        writeln!(f, "Total time: {:.6} seconds", self.elapsed.as_secs_f64())?;
        write!(f, "Total moves: {}", self.moves)
    }
}

/// Where per-game output goes. Quiet printers only log.
#[derive(Debug, Copy, Clone)]
pub struct Printer {
    quiet: bool,
    colour: bool,
}

impl Printer {
    pub fn new(quiet: bool) -> Self {
        Self { quiet, colour: termion::is_tty(&io::stdout()) }
    }

    pub fn quiet() -> Self {
        Self { quiet: true, colour: false }
    }

    fn line(&self, text: &str) {
        if !self.quiet {
            println!("{}", text);
        }
    }

    fn board(&self, board: &Board, reveal_mines: bool) {
        if !self.quiet {
            println!("{}", board.render(reveal_mines, self.colour));
        }
    }
}

/// Plays one game to the end. A solver error aborts the game instead of counting as a loss.
pub fn play_game(solver: &mut dyn Solver, board: &mut Board, printer: &Printer) -> anyhow::Result<GameOutcome> {
    let start = Instant::now();
    solver.new_game(&*board);

    let mut moves = 0;
    loop {
        let analysis = solver.analyze_board(&*board)
            .with_context(|| format!("analysing the board after move {}", moves))?;
        debug!(
            "move {}: {} safe and {} mines found over {} frontiers",
            moves,
            analysis.safe().count(),
            analysis.mines().count(),
            analysis.frontiers,
        );
        for deduction in &analysis.deductions {
            info!("{}", deduction);
            if deduction.fact == Fact::Mine && board.cell(deduction.loc).state == CellState::Hidden {
                board.mark(deduction.loc)?;
            }
        }
        if !board.in_progress() {
            break;
        }
        printer.board(board, false);

        let loc = solver.determine_move(&*board)
            .ok_or_else(|| anyhow!("the {} solver found no square to reveal", solver.name()))?;
        moves += 1;
        match board.reveal(loc) {
            Ok(uncovered) => debug!("move {}: revealed {} squares from {}", moves, uncovered.len(), Pos(loc)),
            Err(board::Error::Dead(_)) => {
                info!("move {}: {} held a mine", moves, Pos(loc));
                break;
            }
            Err(e) => return Err(e).with_context(|| format!("move {} chose {}", moves, Pos(loc))),
        }
    }

    let elapsed = start.elapsed();
    let outcome = GameOutcome { won: board.is_won(), moves, elapsed };
    info!("game {} after {} moves", if outcome.won { "won" } else { "lost" }, moves);
    printer.board(board, true);
    printer.line(&format!("\nCompletion time: \n\t{:.6} seconds", elapsed.as_secs_f64()));
    printer.line(&format!("Number of moves: \n\t{}\n", moves));
    Ok(outcome)
}

/// Plays `config.games` games, each on the fixed layout or on a random one.
pub fn play_games<R: Rng>(
    config: &GameConfig,
    solver: &mut dyn Solver,
    rng: &mut R,
    printer: &Printer,
) -> anyhow::Result<Stats> {
    let mut stats = Stats::default();
    for game in 1..=config.games {
        let layout = config.layout.unwrap_or_else(|| random_layout(rng));
        printer.line(&format!("Starting game {}\n", game));
        printer.line(&format!("Rows: {}\nColumns: {}\nMines: {}\n", layout.rows, layout.cols, layout.mines));
        info!("game {}: {}x{} with {} mines, {} solver", game, layout.rows, layout.cols, layout.mines, solver.name());

        let mut board = Board::new(layout.rows, layout.cols, layout.mines, rng)
            .with_context(|| format!("setting up game {}", game))?;
        let outcome = play_game(solver, &mut board, printer)
            .with_context(|| format!("playing game {}", game))?;
        stats.record(&outcome);
        debug!("{} of {} games won so far", stats.wins, stats.games);
    }
    Ok(stats)
}

/// Rows and columns uniform in 1..=100 (never 1x1), mines uniform in 1..rows*cols.
pub fn random_layout<R: Rng + ?Sized>(rng: &mut R) -> Layout {
    loop {
        let rows = rng.gen_range(1, 101);
        let cols = rng.gen_range(1, 101);
        if rows * cols < 2 {
            continue;
        }
        let mines = rng.gen_range(1, rows * cols);
        return Layout { rows, cols, mines };
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;
    use crate::{
        opts::Strategy,
        solver::{InferenceSolver, RandomSolver},
    };

    fn config(games: usize, layout: Option<Layout>) -> GameConfig {
        GameConfig {
            games,
            layout,
            seed: Some(0),
            strategy: Strategy::Inference,
            frontier_cap: 24,
            quiet: true,
        }
    }

    #[test]
    fn inference_plays_many_games_without_errors() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1234);
        let mut solver = InferenceSolver::new(Xoshiro256PlusPlus::seed_from_u64(5678));
        let layout = Layout { rows: 9, cols: 9, mines: 10 };
        let stats = play_games(&config(30, Some(layout)), &mut solver, &mut rng, &Printer::quiet())
            .expect("no solver errors.");
        assert_eq!(stats.games, 30);
        assert_eq!(stats.wins + stats.losses(), 30);
        // Beginner boards are mostly won with deduction and careful guessing.
        assert!(stats.wins >= 10, "only {} wins", stats.wins);
        assert!(stats.moves >= 30);
    }

    #[test]
    fn random_layouts_play_to_completion() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(77);
        let mut solver = InferenceSolver::new(Xoshiro256PlusPlus::seed_from_u64(78));
        let small = config(1, None);
        for _ in 0..5 {
            let layout = Layout { rows: rng.gen_range(2, 12), cols: rng.gen_range(2, 12), mines: 1 };
            let stats = play_games(&GameConfig { layout: Some(layout), ..small }, &mut solver, &mut rng, &Printer::quiet())
                .expect("no solver errors.");
            assert_eq!(stats.games, 1);
        }
    }

    #[test]
    fn random_solver_uses_the_same_driver() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        let mut solver = RandomSolver::new(Xoshiro256PlusPlus::seed_from_u64(10));
        let layout = Layout { rows: 5, cols: 5, mines: 3 };
        let stats = play_games(&config(10, Some(layout)), &mut solver, &mut rng, &Printer::quiet())
            .expect("no solver errors.");
        assert_eq!(stats.games, 10);
    }

    #[test]
    fn two_square_board_ends_after_one_move() {
        let mut board = Board::new_fixed((1, 2), vec![(0, 0)]).expect("board to be created.");
        let mut solver = InferenceSolver::new(Xoshiro256PlusPlus::seed_from_u64(3));
        // Both squares are corners, so the only guess decides the game.
        let outcome = play_game(&mut solver, &mut board, &Printer::quiet()).expect("no solver errors.");
        assert_eq!(outcome.moves, 1);
        assert_eq!(outcome.won, board.is_won());
        assert!(!board.in_progress());
    }

    #[test]
    fn confirmed_mines_are_flagged() {
        let mut board = Board::from_save(b"xH.\n...\n").expect("a valid fixture.");
        let mut solver = InferenceSolver::new(Xoshiro256PlusPlus::seed_from_u64(4));
        let outcome = play_game(&mut solver, &mut board, &Printer::quiet()).expect("no solver errors.");
        assert_eq!(board.cell((0, 0)).state, CellState::Marked);
        assert!(outcome.won);
        assert_eq!(outcome.moves, 1);
    }

    #[test]
    fn random_layouts_are_valid() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(31);
        for _ in 0..1000 {
            let Layout { rows, cols, mines } = random_layout(&mut rng);
            assert!((1..=100).contains(&rows));
            assert!((1..=100).contains(&cols));
            assert!(rows * cols > 1);
            assert!(mines >= 1 && mines < rows * cols);
        }
    }

    #[test]
    fn stats_summarise_games() {
        let mut stats = Stats::default();
        stats.record(&GameOutcome { won: true, moves: 4, elapsed: Duration::from_millis(500) });
        stats.record(&GameOutcome { won: false, moves: 2, elapsed: Duration::from_millis(250) });
        assert_eq!((stats.games, stats.wins, stats.losses(), stats.moves), (2, 1, 1, 6));
        assert_eq!(
            stats.to_string(),
            "Games completed\nWins: 1\nLosses: 1\nWin Percentage: 50.00\nTotal time: 0.750000 seconds\nTotal moves: 6",
        );
    }
}
