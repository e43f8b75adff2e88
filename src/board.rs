use rand::{seq::index, Rng};
use termion::{color, style};
use thiserror::Error;

use crate::{
    solver::GameView,
    util::{self, Loc},
};

#[derive(Debug, Error, PartialEq, Eq, Copy, Clone)]
pub enum Error {
    #[error("square {0:?} is off the board")]
    OutOfBounds(Loc),
    #[error("square {0:?} is already revealed")]
    Revealed(Loc),
    #[error("square {0:?} is flagged")]
    Marked(Loc),
    #[error("the game is already over")]
    Finished,
    #[error("cannot place {mines} mines on {squares} squares")]
    Crowded { mines: usize, squares: usize },
    #[error("square {0:?} held a mine")]
    Dead(Loc),
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum CellCategory {
    Mine,
    Empty(u8),
}

impl Default for CellCategory {
    fn default() -> Self {
        Self::Empty(0)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum CellState {
    Hidden,
    Marked,
    Visible,
}

impl Default for CellState {
    fn default() -> Self {
        Self::Hidden
    }
}

#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct Cell {
    pub state: CellState,
    pub category: CellCategory,
}

impl Cell {
    fn to_char(&self, reveal_mines: bool) -> char {
        match (self.state, self.category) {
            (CellState::Visible, CellCategory::Mine) => '*',
            (_, CellCategory::Mine) if reveal_mines => '*',
            (CellState::Hidden, _) => '?',
            (CellState::Marked, _) => 'F',
            (CellState::Visible, CellCategory::Empty(0)) => ' ',
            (CellState::Visible, CellCategory::Empty(n)) => (b'0' + n) as char,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

pub struct Board {
    cells: Box<[Box<[Cell]>]>,
    dims: (usize, usize),
    mines: usize,
    revealed: usize,
    state: GameState,
}

// Helpers
impl Board {
    pub fn is_loc(&self, (row, col): Loc) -> bool {
        row < self.dims.0 && col < self.dims.1
    }

    pub fn cell(&self, (row, col): Loc) -> &Cell {
        &self.cells[row][col]
    }

    pub fn rows(&self) -> usize {
        self.dims.0
    }

    pub fn cols(&self) -> usize {
        self.dims.1
    }

    pub fn mines(&self) -> usize {
        self.mines
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn in_progress(&self) -> bool {
        self.state == GameState::Playing
    }

    pub fn is_won(&self) -> bool {
        self.state == GameState::Won
    }
}

// Constructors
impl Board {
    pub fn new<R: Rng + ?Sized>(rows: usize, cols: usize, mines: usize, rng: &mut R) -> Result<Self, Error> {
        let squares = rows * cols;
        if mines >= squares {
            return Err(Error::Crowded { mines, squares });
        }
        let locs = index::sample(rng, squares, mines)
            .into_iter()
            .map(|i| (i / cols, i % cols))
            .collect::<Vec<_>>();

        Self::new_fixed((rows, cols), locs)
    }

    pub fn new_fixed<I>(dims: (usize, usize), locs: I) -> Result<Self, Error> where I: IntoIterator<Item = Loc> {
        let (rows, cols) = dims;
        let mut cells = vec![vec![Cell::default(); cols]; rows]
            .into_iter()
            .map(|v| v.into_boxed_slice())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        for loc in locs.into_iter() {
            if loc.0 >= rows || loc.1 >= cols {
                return Err(Error::OutOfBounds(loc));
            }
            cells[loc.0][loc.1].category = CellCategory::Mine;
        }

        Self::from_cells(cells)
    }

    /// Parses a fixture board: `x` is a hidden mine, `H` a hidden safe square
    /// and `.` a revealed safe square. Rows end with a newline.
    #[cfg(test)]
    pub fn from_save(cells: &[u8]) -> Result<Self, ()> {
        let mut board = vec![];
        let mut row = vec![];
        for cell in cells {
            let state = match cell {
                b'\n' => {
                    if !row.is_empty() {
                        board.push(std::mem::take(&mut row).into_boxed_slice());
                    }
                    continue;
                }
                b'\r' => continue,
                b'x' | b'H' => CellState::Hidden,
                b'.' => CellState::Visible,
                _ => return Err(()),
            };
            let category = if *cell == b'x' { CellCategory::Mine } else { CellCategory::Empty(0) };
            row.push(Cell { state, category });
        }
        if !row.is_empty() {
            board.push(row.into_boxed_slice())
        }

        // Validate board size.
        let w = board.first().map_or(0, |v| v.len());
        if w == 0 || board.iter().any(|row| row.len() != w) {
            return Err(());
        }

        let mut board = Self::from_cells(board.into_boxed_slice()).map_err(|_| ())?;
        board.revealed = util::all_locs(board.dims)
            .filter(|&loc| board.cell(loc).state == CellState::Visible)
            .count();
        board.update_state();
        Ok(board)
    }

    pub fn from_cells(cells: Box<[Box<[Cell]>]>) -> Result<Self, Error> {
        let rows = cells.len();
        let cols = cells.first().map_or(0, |v| v.len());
        let mut board = Self {
            cells,
            dims: (rows, cols),
            mines: 0,
            revealed: 0,
            state: GameState::Playing,
        };

        for loc in util::all_locs(board.dims) {
            if board.cell(loc).category == CellCategory::Mine {
                board.mines += 1;
                continue
            }
            let nearby_bombs = util::surroundings(board.dims, loc)
                .filter(|&l| board.cell(l).category == CellCategory::Mine)
                .count() as u8;
            board.cells[loc.0][loc.1].category = CellCategory::Empty(nearby_bombs);
        }

        if board.mines >= rows * cols {
            return Err(Error::Crowded { mines: board.mines, squares: rows * cols });
        }

        Ok(board)
    }
}

// Marking and revealing.
impl Board {
    pub fn mark(&mut self, loc: Loc) -> Result<(), Error> {
        if !self.is_loc(loc) {
            return Err(Error::OutOfBounds(loc));
        }

        let cell = &mut self.cells[loc.0][loc.1];
        cell.state = match cell.state {
            CellState::Hidden => CellState::Marked,
            CellState::Marked => CellState::Hidden,
            CellState::Visible => CellState::Visible,
        };
        Ok(())
    }

    /// Reveals `loc`, flood filling outward from squares with no adjacent
    /// mines. Returns every square that became visible.
    pub fn reveal(&mut self, loc: Loc) -> Result<Vec<Loc>, Error> {
        if self.state != GameState::Playing {
            return Err(Error::Finished);
        }
        if !self.is_loc(loc) {
            return Err(Error::OutOfBounds(loc));
        }
        let cell = &mut self.cells[loc.0][loc.1];
        match cell.state {
            CellState::Visible => return Err(Error::Revealed(loc)),
            CellState::Marked => return Err(Error::Marked(loc)),
            CellState::Hidden => (),
        }
        if cell.category == CellCategory::Mine {
            cell.state = CellState::Visible;
            self.state = GameState::Lost;
            return Err(Error::Dead(loc));
        }

        let mut uncovered = vec![];
        let mut scanning_locs = vec![loc];
        while let Some(scan) = scanning_locs.pop() {
            let cell = &mut self.cells[scan.0][scan.1];
            if cell.state == CellState::Visible {
                continue;
            }
            cell.state = CellState::Visible;
            let category = cell.category;
            self.revealed += 1;
            uncovered.push(scan);
            if category != CellCategory::Empty(0) {
                continue;
            }
            // No mines nearby, so every neighbour is safe to open.
            for next in util::surroundings(self.dims, scan) {
                let next_cell = self.cell(next);
                if next_cell.state != CellState::Visible && next_cell.category != CellCategory::Mine {
                    scanning_locs.push(next);
                }
            }
        }

        self.update_state();
        Ok(uncovered)
    }

    fn update_state(&mut self) {
        if self.state == GameState::Playing && self.revealed == self.dims.0 * self.dims.1 - self.mines {
            self.state = GameState::Won;
        }
    }
}

impl GameView for Board {
    fn dims(&self) -> (usize, usize) {
        self.dims
    }

    fn number(&self, loc: Loc) -> Option<u8> {
        match *self.cell(loc) {
            Cell { state: CellState::Visible, category: CellCategory::Empty(n) } => Some(n),
            _ => None,
        }
    }

    fn total_mines(&self) -> usize {
        self.mines
    }

    fn revealed_count(&self) -> usize {
        self.revealed
    }
}

// Text output.
impl Board {
    /// Renders the board with 1-based row and column headings. Mines are shown
    /// once `reveal_mines` is set; `colour` adds terminal colours.
    pub fn render(&self, reveal_mines: bool, colour: bool) -> String {
        let mut out = String::from("    ");
        for col in 0..self.dims.1 {
            out.push_str(&format!("{:>3}", col + 1));
        }
        out.push('\n');
        for (row, cells) in self.cells.iter().enumerate() {
            out.push_str(&format!("{:>3} ", row + 1));
            for cell in cells.iter() {
                let c = cell.to_char(reveal_mines);
                if colour {
                    out.push_str(&format!("  {}", paint(c)));
                } else {
                    out.push_str(&format!("  {}", c));
                }
            }
            out.push('\n');
        }
        out
    }
}

fn paint(c: char) -> String {
    let fg = match c {
        '*' | 'F' => format!("{}{}", style::Bold, color::Fg(color::Red)),
        '1' => format!("{}", color::Fg(color::Blue)),
        '2' => format!("{}", color::Fg(color::Green)),
        '3' => format!("{}", color::Fg(color::LightRed)),
        '4'..='8' => format!("{}", color::Fg(color::Magenta)),
        '?' => format!("{}", color::Fg(color::LightBlack)),
        _ => String::new(),
    };
    format!("{}{}{}", fg, c, style::Reset)
}
