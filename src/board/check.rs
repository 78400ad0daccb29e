// Copyright 2026 Tobin Edwards
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

use super::material::Color;
use super::moves::{Candidates, Move, MoveSet};
use super::position::Position;
use super::square::Square;

/// Check detection by simulation.
///
/// Every query that needs to know what happens after a move works on a
/// scratch copy of the position; the receiver is never modified.
pub trait Checks: Candidates {
    /// True if the king of `color` stands on a square that some opposing
    /// piece could move to. A side without a king is never in check.
    fn is_check(&self, color: Color) -> bool {
        let pos: &Position = self.as_ref();
        match pos.king(color) {
            Some(king) => self.attacked_by(!color).contains(king),
            None => false,
        }
    }

    /// True if moving the piece on `from` to `to` would leave its own
    /// king attacked. Whatever stands on `to` is treated as captured.
    fn exposes_king(&self, from: Square, to: Square) -> bool {
        let pos: &Position = self.as_ref();
        let Some(mover) = pos.contents(from) else {
            return false;
        };
        let mut scratch = pos.clone();
        scratch.relocate(from, to);
        scratch.is_check(mover.color())
    }

    /// Drops every destination that would leave the mover's king attacked.
    fn legal_moves<T: Copy>(&self, from: Square, mut moves: MoveSet<T>) -> MoveSet<T> {
        moves.retain(|to, _| !self.exposes_king(from, to));
        moves
    }

    /// True if `defender` is in check and no piece of theirs has a move
    /// that gets them out of it.
    fn is_checkmate(&self, defender: Color) -> bool {
        if !self.is_check(defender) {
            return false;
        }
        let pos: &Position = self.as_ref();
        pos.units_of(defender).all(|unit| {
            let from = unit.square();
            self.candidate_moves(from)
                .iter()
                .all(|to| self.exposes_king(from, to))
        })
    }
}

impl Checks for Position {}

/// Checkmate test for the side that did not make the last move in
/// `history`. The defending side is the opponent of whichever piece now
/// stands on the last move's destination.
pub fn is_checkmate_after(pos: &Position, history: &[Move]) -> bool {
    let Some(last) = history.last() else {
        return false;
    };
    match pos.contents(last.to) {
        Some(mover) => pos.is_checkmate(!mover.color()),
        None => false,
    }
}
