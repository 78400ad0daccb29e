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

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::material::{Color, Material, Piece};
use super::moves::{Move, MoveSet};
use super::position::{Position, Unit};
use super::square::{Direction, File, Mask, Rank, Square};

use File::*;
use Piece::*;

#[derive(Debug, Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpecialMove {
    #[default]
    None,
    EnPassant,
    Castling,
    Promotion,
}

/// Where the king and rook start and finish for one castling wing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Castle {
    rook_src: File,
    king_dest: File,
    rook_dest: File,
}

const KING_HOME: File = FileE;

const CASTLES: [Castle; 2] = [
    Castle {
        rook_src: FileH,
        king_dest: FileG,
        rook_dest: FileF,
    },
    Castle {
        rook_src: FileA,
        king_dest: FileC,
        rook_dest: FileD,
    },
];

impl Castle {
    fn by_king_dest(file: File) -> Option<Self> {
        CASTLES.into_iter().find(|castle| castle.king_dest == file)
    }
}

impl MoveSet<SpecialMove> {
    /// The special move this selection offers, if any. At most one kind
    /// applies to a single piece.
    pub fn special(&self) -> SpecialMove {
        self.iter()
            .map(|(_, special)| special)
            .find(|special| *special != SpecialMove::None)
            .unwrap_or_default()
    }
}

pub trait SpecialMoves: AsRef<Position> {
    /// Tags each candidate destination of the piece on `from` and adds
    /// the en passant and castling destinations that raw generation
    /// never produces.
    fn special_moves(&self, history: &[Move], from: Square, candidates: Mask) -> MoveSet<SpecialMove> {
        let mut result = MoveSet::new();
        let pos: &Position = self.as_ref();
        let Some(material) = pos.contents(from) else {
            return result;
        };
        let color = material.color();
        for dest in candidates.iter() {
            result.insert(dest, SpecialMove::None);
        }
        match material.piece() {
            Pawn => {
                if from.rank() == Rank::promoting_rank(color) {
                    for dest in candidates.iter() {
                        result.insert(dest, SpecialMove::Promotion);
                    }
                } else if let Some(dest) = self.en_passant_target(history, from, color) {
                    result.insert(dest, SpecialMove::EnPassant);
                }
            }
            King => result |= self.castle_moves(from, color),
            _ => {}
        }
        result
    }

    /// The square a pawn of `color` on `from` lands on when taking en
    /// passant, if the last move in `history` allows it.
    fn en_passant_target(&self, history: &[Move], from: Square, color: Color) -> Option<Square> {
        let pos: &Position = self.as_ref();
        let last = history.last()?;
        let victim = pos.contents(last.to)?;
        if !victim.piece().is_pawn() || victim.color() == color {
            return None;
        }
        if (last.to.rank() - last.from.rank()).abs() != 2 {
            return None;
        }
        if last.to.rank() != from.rank() || (last.to.file() - from.file()).abs() != 1 {
            return None;
        }
        last.to + Direction::forward(color)
    }

    /// Castling is inferred from occupancy alone: a king on its home
    /// square, an own rook in the corner and nothing in between.
    fn castle_moves(&self, from: Square, color: Color) -> MoveSet<SpecialMove> {
        let mut result = MoveSet::new();
        let pos: &Position = self.as_ref();
        let rank = Rank::back_rank(color);
        if from != Square::new(KING_HOME, rank) {
            return result;
        }
        for castle in CASTLES {
            let rook_src = Square::new(castle.rook_src, rank);
            if pos.contents(rook_src) != Some(Material::new(color, Rook)) {
                continue;
            }
            let lane_clear = File::between(KING_HOME, castle.rook_src)
                .all(|file| pos.is_vacant(Square::new(file, rank)));
            if lane_clear {
                result.insert(Square::new(castle.king_dest, rank), SpecialMove::Castling);
            }
        }
        result
    }
}

impl SpecialMoves for Position {}

/// Applies the side effects of a special move after the mover has
/// already been relocated to `mv.to`. Returns the piece captured en
/// passant, if any.
pub(crate) fn resolve(pos: &mut Position, mv: Move, special: SpecialMove) -> Option<Unit> {
    let mover = pos.contents(mv.to)?;
    let color = mover.color();
    match special {
        SpecialMove::None => None,
        SpecialMove::EnPassant => {
            let target = Square::new(mv.to.file(), mv.from.rank());
            match pos.contents(target) {
                Some(victim) if victim.piece().is_pawn() && victim.color() != color => {
                    pos.remove(target)
                }
                _ => None,
            }
        }
        SpecialMove::Castling => {
            let castle = Castle::by_king_dest(mv.to.file())?;
            let rank = mv.to.rank();
            let rook_src = Square::new(castle.rook_src, rank);
            let rook_dest = Square::new(castle.rook_dest, rank);
            if mover.piece().is_king() && pos.contents(rook_src) == Some(Material::new(color, Rook)) {
                pos.relocate(rook_src, rook_dest);
            }
            None
        }
        SpecialMove::Promotion => {
            if mover.piece().is_pawn() && mv.to.rank().is_back_rank(!color) {
                pos.promote(mv.to, Queen);
            }
            None
        }
    }
}
