// Copyright 2023 Tobin Edwards
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

//! Chess board enforcing the rules of a two-player game
//!
//! A _board_ owns the state of a game in progress and is the only way
//! to change it. A front end asks the board which squares a piece may
//! move to, then commits one of them. The following features are
//! supported:
//!
//! [x] Movement rules for all six pieces
//! [x] Castling (inferred from occupancy, no castling rights)
//! [x] En passant (only immediately after the two-square advance)
//! [x] Promotion (always to a queen)
//! [x] Moves that would leave one's own king attacked are filtered out
//! [x] Checkmate and king capture end the game
//! [ ] Stalemate, repetition and the fifty-move rule
//! [ ] Under-promotion
//!
//! Some of the key abstractions include:
//!
//! * A `Square` represents the coordinates for a single square
//!   on an 8-by-8 board, built from a `File` (`FileA` .. `FileH`) and a
//!   `Rank` (`Rank1` .. `Rank8`). Front ends that work with integer
//!   coordinates use `Square::from_coords`, which rejects anything off
//!   the board.
//!
//! * A `Mask` is a 64-bit (u64) value in which each bit maps to a
//!   square on the board. Move destinations are reported as masks.
//!   Masks can be combined or modified using bitwise `|`, `|=`, `&`,
//!   `&=` and `!` operators and iterate in a fixed square order.
//!
//! * `Material` represents a piece of a specific color. A `Piece` has
//!   six variants: `King`, `Queen`, `Rook`, `Bishop`, `Knight` and `Pawn`.
//!   `Color` is either `White` or `Black`.
//!
//! * A `Position` is the set of pieces on the board. Each piece has a
//!   `PieceId` that survives moves, so a view layer can follow it from
//!   square to square. A promoted pawn is replaced by a new piece with a
//!   new id.
//!
//! * `Candidates` generates the raw moves of a piece, `SpecialMoves` tags
//!   them with castling, en passant and promotion and `Checks` removes
//!   the ones that expose the mover's king.
//!
//! * `PlayState` holds the position together with the move history, the
//!   captured pieces and whose turn it is. `Board` wraps it for front
//!   ends: invalid input never fails loudly, it simply selects nothing
//!   or applies nothing.
//!

use anyhow::Result;
use log::trace;

mod check;
mod material;
mod moves;
mod play;
mod position;
mod special;
mod square;

pub use check::*;
pub use material::*;
pub use moves::*;
pub use play::*;
pub use position::*;
pub use special::*;
pub use square::*;

pub trait Turn {
    fn turn(&self) -> Color;
}

#[derive(Debug, Clone, Default)]
pub struct Board {
    state: PlayState,
}

impl Board {
    pub fn standard() -> Self {
        Self::default()
    }

    /// A game starting from an arbitrary position with `turn` to move.
    pub fn from_position(position: Position, turn: Color) -> Self {
        Self {
            state: PlayState::new(position, turn),
        }
    }

    /// Reconstruct a standard game by replaying a sequence of moves.
    pub fn replay(moves: &[Move]) -> Result<Self> {
        let mut board = Self::standard();
        for mv in moves {
            board.submit_move(*mv)?;
        }
        Ok(board)
    }

    /// Legal destinations for the piece on `from`. Empty if the square is
    /// empty, holds the other side's piece or the game is over.
    pub fn legal_moves(&self, from: Square) -> MoveSet<SpecialMove> {
        self.state.legal_moves(from).unwrap_or_default()
    }

    /// Selects the piece on `from` and returns where it may go.
    pub fn select_piece(&mut self, from: Square) -> Mask {
        match self.state.select(from) {
            Ok(moves) => moves.destinations(),
            Err(e) => {
                trace!("select {}: {}", from, e);
                Mask::empty()
            }
        }
    }

    pub fn select_coords(&mut self, file: i32, rank: i32) -> Mask {
        match Square::from_coords(file, rank) {
            Some(square) => self.select_piece(square),
            None => {
                trace!("select ({}, {}): {}", file, rank, MoveError::OutOfBounds);
                self.state.release();
                Mask::empty()
            }
        }
    }

    pub fn submit_move(&mut self, mv: Move) -> Result<MoveOutcome> {
        self.state.submit_move(mv)
    }

    /// Moves the piece on `from` to `to` if that is legal. Anything else
    /// leaves the game untouched and reports `applied == false`.
    pub fn commit_move(&mut self, from: Square, to: Square) -> MoveOutcome {
        let mv = Move::new(from, to);
        match self.state.submit_move(mv) {
            Ok(outcome) => outcome,
            Err(e) => {
                trace!("commit {}: {}", mv, e);
                MoveOutcome::rejected()
            }
        }
    }

    pub fn commit_coords(&mut self, from: (i32, i32), to: (i32, i32)) -> MoveOutcome {
        let squares = Square::from_coords(from.0, from.1).zip(Square::from_coords(to.0, to.1));
        match squares {
            Some((from, to)) => self.commit_move(from, to),
            None => {
                trace!("commit {:?} -> {:?}: {}", from, to, MoveError::OutOfBounds);
                self.state.release();
                MoveOutcome::rejected()
            }
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Every piece on the board, for rebuilding a view.
    pub fn snapshot(&self) -> Vec<(Square, Material)> {
        self.position().snapshot()
    }

    pub fn position(&self) -> &Position {
        self.state.as_ref()
    }

    /// Pieces of `color` that have been captured, in capture order.
    pub fn captured(&self, color: Color) -> &[Material] {
        self.state.captured(color)
    }

    pub fn history(&self) -> &[Move] {
        self.state.history()
    }

    pub fn board_result(&self) -> Option<BoardResult> {
        self.state.board_result()
    }

    pub fn phase(&self) -> &Phase {
        self.state.phase()
    }

    pub fn is_check(&self) -> bool {
        self.state.is_check()
    }
}

impl Turn for Board {
    #[inline]
    fn turn(&self) -> Color {
        self.state.turn()
    }
}

impl AsRef<Position> for Board {
    fn as_ref(&self) -> &Position {
        self.state.as_ref()
    }
}
