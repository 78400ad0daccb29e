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

use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::check::{is_checkmate_after, Checks};
use super::material::{Color, Material, Pair};
use super::moves::{Candidates, Move, MoveError, MoveSet};
use super::position::Position;
use super::special::{resolve, SpecialMove, SpecialMoves};
use super::square::Square;
use super::Turn;

use MoveError::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardResult {
    CheckMate(Color),
    KingCaptured(Color),
}

impl BoardResult {
    pub fn winner(&self) -> Color {
        match *self {
            BoardResult::CheckMate(color) | BoardResult::KingCaptured(color) => color,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Selecting {
        from: Square,
        moves: MoveSet<SpecialMove>,
    },
    GameOver(BoardResult),
}

/// What happened when a move was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub applied: bool,
    pub captured: Option<Material>,
    pub special: SpecialMove,
    pub game_over: Option<Color>,
}

impl MoveOutcome {
    pub fn rejected() -> Self {
        Self {
            applied: false,
            captured: None,
            special: SpecialMove::None,
            game_over: None,
        }
    }
}

/// Authoritative game state: the position, the move history, whose turn
/// it is and the captured pieces. Nothing else mutates the position.
#[derive(Debug, Clone)]
pub struct PlayState {
    position: Position,
    history: Vec<Move>,
    turn: Color,
    captured: Pair<Vec<Material>>,
    phase: Phase,
}

impl Default for PlayState {
    fn default() -> Self {
        Self::new(Position::standard(), Color::White)
    }
}

impl Turn for PlayState {
    fn turn(&self) -> Color {
        self.turn
    }
}

impl AsRef<Position> for PlayState {
    fn as_ref(&self) -> &Position {
        &self.position
    }
}

impl PlayState {
    pub fn new(position: Position, turn: Color) -> Self {
        Self {
            position,
            history: Vec::new(),
            turn,
            captured: Pair::default(),
            phase: Phase::Idle,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
        debug!("game reset");
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn captured(&self, color: Color) -> &[Material] {
        &self.captured[color]
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn board_result(&self) -> Option<BoardResult> {
        match self.phase {
            Phase::GameOver(result) => Some(result),
            _ => None,
        }
    }

    /// Legal destinations for the piece on `from`, each tagged with the
    /// special move it would trigger. Does not change any state.
    pub fn legal_moves(&self, from: Square) -> Result<MoveSet<SpecialMove>> {
        if self.board_result().is_some() {
            return Err(GameOver.into());
        }
        match self.position.contents(from) {
            Some(material) if material.color() == self.turn => {}
            _ => return Err(InvalidSelection.into()),
        }
        let candidates = self.position.candidate_moves(from);
        let moves = self.position.special_moves(&self.history, from, candidates);
        Ok(self.position.legal_moves(from, moves))
    }

    /// Picks up the piece on `from`. An invalid selection drops whatever
    /// was held before.
    pub fn select(&mut self, from: Square) -> Result<MoveSet<SpecialMove>> {
        match self.legal_moves(from) {
            Ok(moves) => {
                self.phase = Phase::Selecting {
                    from,
                    moves: moves.clone(),
                };
                Ok(moves)
            }
            Err(e) => {
                self.release();
                Err(e)
            }
        }
    }

    /// Drops the selected piece, if any.
    pub fn release(&mut self) {
        if let Phase::Selecting { .. } = self.phase {
            self.phase = Phase::Idle;
        }
    }

    pub fn submit_move(&mut self, mv: Move) -> Result<MoveOutcome> {
        let special = self
            .legal_moves(mv.from)
            .and_then(|moves| moves.get(mv.to).ok_or_else(|| IllegalDestination.into()));
        let special = match special {
            Ok(special) => special,
            Err(e) => {
                self.release();
                return Err(e);
            }
        };
        let mover = self.turn;

        let mut captured = self.position.relocate(mv.from, mv.to);
        self.history.push(mv);
        self.turn = !self.turn;
        if let Some(unit) = resolve(&mut self.position, mv, special) {
            captured = Some(unit);
        }
        debug_assert!(self.position.is_consistent());
        debug!("{} plays {} ({})", mover, mv, special);

        let captured = captured.map(|unit| unit.material());
        if let Some(material) = captured {
            self.captured[material.color()].push(material);
        }
        let result = if captured.is_some_and(|m| m.piece().is_king()) {
            Some(BoardResult::KingCaptured(mover))
        } else if is_checkmate_after(&self.position, &self.history) {
            Some(BoardResult::CheckMate(mover))
        } else {
            None
        };
        self.phase = match result {
            Some(result) => {
                info!("game over: {:?}", result);
                Phase::GameOver(result)
            }
            None => Phase::Idle,
        };
        Ok(MoveOutcome {
            applied: true,
            captured,
            special,
            game_over: result.map(|r| r.winner()),
        })
    }

    /// True if the side to move is in check.
    pub fn is_check(&self) -> bool {
        self.position.is_check(self.turn)
    }
}
