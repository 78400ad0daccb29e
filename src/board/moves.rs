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

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOrAssign;
use strum::IntoEnumIterator;
use thiserror::Error;

use super::material::{Color, Piece};
use super::position::Position;
use super::square::{Direction, Mask, Offset, Rank, Square};

use Piece::*;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("No piece of the side to move on that square")]
    InvalidSelection,
    #[error("Not a legal move")]
    IllegalDestination,
    #[error("Square is off the board")]
    OutOfBounds,
    #[error("The game is over")]
    GameOver,
}

/// A committed move, as recorded in the move history.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

/// Raw movement rules for each piece.
///
/// These know nothing about turns or checks: a destination is included
/// if the piece can physically get there and the square is either empty
/// or held by the other side.
pub trait Candidates: AsRef<Position> {
    fn candidate_moves(&self, from: Square) -> Mask {
        let pos: &Position = self.as_ref();
        let Some(material) = pos.contents(from) else {
            return Mask::empty();
        };
        let color = material.color();
        match material.piece() {
            King => self.king_moves(from, color),
            Queen => self.queen_moves(from, color),
            Rook => self.rook_moves(from, color),
            Bishop => self.bishop_moves(from, color),
            Knight => self.knight_moves(from, color),
            Pawn => self.pawn_moves(from, color),
        }
    }

    /// Every square reachable by some piece of `color`.
    fn attacked_by(&self, color: Color) -> Mask {
        let pos: &Position = self.as_ref();
        let mut mask = Mask::empty();
        for unit in pos.units_of(color) {
            mask |= self.candidate_moves(unit.square());
        }
        mask
    }

    fn king_moves(&self, from: Square, color: Color) -> Mask {
        let pos: &Position = self.as_ref();
        KING_MOVES[from] - pos.occupied_by(color)
    }

    fn queen_moves(&self, from: Square, color: Color) -> Mask {
        self.line_moves(from, color, Direction::iter())
    }

    fn rook_moves(&self, from: Square, color: Color) -> Mask {
        self.line_moves(from, color, Direction::horizontals())
    }

    fn bishop_moves(&self, from: Square, color: Color) -> Mask {
        self.line_moves(from, color, Direction::diagonals())
    }

    fn line_moves<I>(&self, from: Square, color: Color, directions: I) -> Mask
    where
        I: Iterator<Item = Direction>,
    {
        let pos: &Position = self.as_ref();
        let mut mask = Mask::empty();
        for dir in directions {
            let mut next = from + dir;
            while let Some(square) = next {
                match pos.contents(square) {
                    None => mask |= square,
                    Some(material) => {
                        if material.color() != color {
                            mask |= square;
                        }
                        break;
                    }
                }
                next = square + dir;
            }
        }
        mask
    }

    fn knight_moves(&self, from: Square, color: Color) -> Mask {
        let pos: &Position = self.as_ref();
        KNIGHT_MOVES[from] - pos.occupied_by(color)
    }

    fn pawn_moves(&self, from: Square, color: Color) -> Mask {
        let pos: &Position = self.as_ref();
        let forward = Direction::forward(color);
        let mut mask = Mask::empty();
        let Some(ahead) = from + forward else {
            return mask;
        };
        if pos.is_vacant(ahead) {
            mask |= ahead;
            if from.rank() == Rank::pawn_rank(color) {
                if let Some(double) = ahead + forward {
                    if pos.is_vacant(double) {
                        mask |= double;
                    }
                }
            }
        }
        // captures only; an empty diagonal is never a candidate
        let theirs = pos.occupied_by(!color);
        for side in [Direction::Left, Direction::Right] {
            if let Some(target) = ahead + side {
                if theirs.contains(target) {
                    mask |= target;
                }
            }
        }
        mask
    }
}

impl AsRef<Position> for Position {
    fn as_ref(&self) -> &Position {
        self
    }
}

impl Candidates for Position {}

/// Destinations for one piece, each tagged with a value of type `T`.
#[derive(Debug, Clone)]
pub struct MoveSet<T> {
    destinations: Mask,
    map: HashMap<Square, T>,
}

impl<T: Copy> MoveSet<T> {
    pub fn new() -> Self {
        Self {
            destinations: Mask::empty(),
            map: HashMap::new(),
        }
    }
    pub fn insert(&mut self, dest: Square, mv: T) {
        self.destinations |= dest;
        self.map.insert(dest, mv);
    }
    pub fn remove(&mut self, dest: Square) -> Option<T> {
        self.destinations.reset(dest);
        self.map.remove(&dest)
    }
    pub fn destinations(&self) -> Mask {
        self.destinations
    }
    pub fn get(&self, dest: Square) -> Option<T> {
        self.map.get(&dest).copied()
    }
    pub fn contains(&self, dest: Square) -> bool {
        self.destinations.contains(dest)
    }
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
    pub fn len(&self) -> usize {
        self.destinations.len()
    }
    /// Entries in destination order.
    pub fn iter(&self) -> impl Iterator<Item = (Square, T)> + '_ {
        self.destinations
            .iter()
            .filter_map(|dest| self.get(dest).map(|value| (dest, value)))
    }
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(Square, T) -> bool,
    {
        for (dest, value) in self.iter().collect::<Vec<_>>() {
            if !keep(dest, value) {
                self.remove(dest);
            }
        }
    }
}

impl<T: Copy> Default for MoveSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> BitOrAssign for MoveSet<T> {
    fn bitor_assign(&mut self, rhs: Self) {
        for (dest, value) in rhs.iter() {
            self.insert(dest, value);
        }
    }
}

impl<T: Copy + PartialEq> PartialEq for MoveSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.destinations == other.destinations && self.iter().eq(other.iter())
    }
}

static KING_MOVES: Lazy<[Mask; 64]> = Lazy::new(|| {
    let mut array = [Mask::default(); 64];
    for square in Square::iter() {
        array[square] = Mask::from_squares(Direction::iter().filter_map(|dir| square + dir));
    }
    array
});

static KNIGHT_MOVES: Lazy<[Mask; 64]> = Lazy::new(|| {
    const OFFSETS: [Offset; 8] = [
        Offset::new(-2, -1),
        Offset::new(-2, 1),
        Offset::new(2, -1),
        Offset::new(2, 1),
        Offset::new(-1, -2),
        Offset::new(-1, 2),
        Offset::new(1, -2),
        Offset::new(1, 2),
    ];
    let mut array = [Mask::default(); 64];
    for square in Square::iter() {
        array[square] =
            Mask::from_squares(OFFSETS.into_iter().filter_map(|offset| square + offset));
    }
    array
});

#[cfg(test)]
mod tests {
    use crate::*;
    use strum::IntoEnumIterator;
    use Square::*;

    fn ranks(a: Rank, b: Rank) -> Mask {
        Square::iter()
            .filter(|square| square.rank() == a || square.rank() == b)
            .collect()
    }

    #[test]
    fn test_white_pawn_advance() {
        let position = Position::default();
        let destinations = position.candidate_moves(E2);
        assert_eq!(destinations, Mask::from_squares([E3, E4]));
    }
    #[test]
    fn test_black_pawn_advance() {
        let position = Position::default();
        let destinations = position.candidate_moves(E7);
        assert_eq!(destinations, Mask::from_squares([E6, E5]));
    }
    #[test]
    fn test_pawn_ignores_turn() {
        // generation is turn agnostic; Black's pawns move before White's
        let position = Position::default();
        assert!(!position.candidate_moves(A7).is_empty());
    }
    #[test]
    fn test_white_pawn_advance_blocked() {
        let position = Position::default().set_contents(E3, Some(Material::BB));
        let destinations = position.candidate_moves(E2);
        assert!(!destinations.contains(E3));
        assert!(!destinations.contains(E4));
    }
    #[test]
    fn test_black_pawn_advance_blocked() {
        let position = Position::default().set_contents(E6, Some(Material::WB));
        let destinations = position.candidate_moves(E7);
        assert!(!destinations.contains(E6));
        assert!(!destinations.contains(E5));
    }
    #[test]
    fn test_white_pawn_double_advance_blocked() {
        let position = Position::default().set_contents(E4, Some(Material::BB));
        let destinations = position.candidate_moves(E2);
        assert!(destinations.contains(E3));
        assert!(!destinations.contains(E4));
    }
    #[test]
    fn test_pawn_double_advance_only_from_start() {
        let position = Position::empty().set_contents(E3, Some(Material::WP));
        assert_eq!(position.candidate_moves(E3), Mask::from_squares([E4]));
        let position = Position::empty().set_contents(D6, Some(Material::BP));
        assert_eq!(position.candidate_moves(D6), Mask::from_squares([D5]));
    }
    #[test]
    fn test_white_pawn_capture() {
        let position = Position::default()
            .set_contents(D3, Some(Material::BB))
            .set_contents(F3, Some(Material::WN));
        let destinations = position.candidate_moves(E2);
        assert!(destinations.contains(D3));
        assert!(!destinations.contains(F3));
        let destinations = position.candidate_moves(C2);
        assert!(destinations.contains(D3));
        assert!(!destinations.contains(B3));
    }
    #[test]
    fn test_black_pawn_capture() {
        let position = Position::default()
            .set_contents(D6, Some(Material::WB))
            .set_contents(F6, Some(Material::BN));
        let destinations = position.candidate_moves(E7);
        assert!(destinations.contains(D6));
        assert!(!destinations.contains(F6));
    }
    #[test]
    fn test_pawn_capture_on_edge_files() {
        let position = Position::empty()
            .set_contents(A4, Some(Material::WP))
            .set_contents(B5, Some(Material::BP))
            .set_contents(H4, Some(Material::WP))
            .set_contents(G5, Some(Material::BP));
        assert_eq!(position.candidate_moves(A4), Mask::from_squares([A5, B5]));
        assert_eq!(position.candidate_moves(H4), Mask::from_squares([H5, G5]));
        assert_eq!(position.candidate_moves(B5), Mask::from_squares([B4, A4]));
    }
    #[test]
    fn test_pawn_on_last_rank_has_no_moves() {
        let position = Position::empty()
            .set_contents(C8, Some(Material::WP))
            .set_contents(C1, Some(Material::BP));
        assert!(position.candidate_moves(C8).is_empty());
        assert!(position.candidate_moves(C1).is_empty());
    }
    #[test]
    fn test_king_blocked() {
        let position = Position::default();
        assert!(position.candidate_moves(E1).is_empty());
    }
    #[test]
    fn test_king_in_corner() {
        let position = Position::empty()
            .set_contents(A1, Some(Material::WK))
            .set_contents(B2, Some(Material::BP))
            .set_contents(A2, Some(Material::WP));
        assert_eq!(position.candidate_moves(A1), Mask::from_squares([B1, B2]));
    }
    #[test]
    fn test_king_moves_one_square() {
        let position = Position::empty().set_contents(D4, Some(Material::BK));
        let destinations = position.candidate_moves(D4);
        assert_eq!(destinations.len(), 8);
        assert!(destinations.contains(C5));
        assert!(destinations.contains(E3));
        assert!(!destinations.contains(D6));
    }
    #[test]
    fn test_queen_destinations() {
        let position = Position::default()
            .set_contents(C1, None)
            .set_contents(C2, None)
            .set_contents(D2, None);
        let destinations = position.candidate_moves(D1);
        assert_eq!(destinations.len(), 10);
        assert!(destinations.contains(C1));
        assert!(!destinations.contains(B1));
        assert!(destinations.contains(B3));
        assert!(destinations.contains(D6));
        assert!(destinations.contains(D7));
        assert!(!destinations.contains(D8));
        assert!(!destinations.contains(E2));
    }
    #[test]
    fn test_queen_blocked() {
        let position = Position::default();
        assert!(position.candidate_moves(D1).is_empty());
    }
    #[test]
    fn test_knight_destinations() {
        let position = Position::default();
        let destinations = position.candidate_moves(G1);
        assert_eq!(destinations, Mask::from_squares([F3, H3]));
    }
    #[test]
    fn test_knight_blocked() {
        let position = Position::default()
            .set_contents(F3, Some(Material::WP))
            .set_contents(H3, Some(Material::WP));
        assert_eq!(position.candidate_moves(G1), Mask::empty());
    }
    #[test]
    fn test_knight_in_center() {
        let position = Position::empty()
            .set_contents(D4, Some(Material::WN))
            .set_contents(E6, Some(Material::BP))
            .set_contents(C6, Some(Material::WP));
        let destinations = position.candidate_moves(D4);
        assert_eq!(destinations.len(), 7);
        assert!(destinations.contains(E6));
        assert!(!destinations.contains(C6));
    }
    #[test]
    fn test_rook_destinations() {
        let position = Position::default()
            .set_contents(A2, None)
            .set_contents(B1, None);
        let destinations = position.candidate_moves(A1);
        assert_eq!(destinations.len(), 7);
        assert!(destinations.contains(B1));
        assert!(!destinations.contains(B2));
        assert!(destinations.contains(A3));
        assert!(destinations.contains(A7));
        assert!(!destinations.contains(A8));
    }
    #[test]
    fn test_rook_blocked() {
        let position = Position::default();
        assert_eq!(position.candidate_moves(A1), Mask::empty());
    }
    #[test]
    fn test_bishop_destinations() {
        let position = Position::default()
            .set_contents(C2, None)
            .set_contents(D2, None);
        let destinations = position.candidate_moves(C1);
        assert_eq!(destinations.len(), 5);
        assert!(!destinations.contains(B2));
        assert!(!destinations.contains(C2));
        assert!(destinations.contains(D2));
        assert!(destinations.contains(E3));
        assert!(destinations.contains(H6));
    }
    #[test]
    fn test_bishop_blocked() {
        let position = Position::default();
        assert_eq!(position.candidate_moves(C1), Mask::empty());
    }
    #[test]
    fn test_empty_square_has_no_moves() {
        let position = Position::default();
        assert!(position.candidate_moves(E4).is_empty());
    }
    #[test]
    fn test_attacked_by_at_start() {
        let position = Position::default();
        let attacked = position.attacked_by(Color::White);
        assert_eq!(attacked, ranks(Rank::Rank3, Rank::Rank4));
        let attacked = position.attacked_by(Color::Black);
        assert_eq!(attacked, ranks(Rank::Rank6, Rank::Rank5));
    }
    #[test]
    fn test_move_set_retain_keeps_order() {
        let mut set = MoveSet::new();
        set.insert(H1, 1);
        set.insert(A8, 2);
        set.insert(E4, 3);
        set.retain(|dest, _| dest != E4);
        let entries: Vec<(Square, i32)> = set.iter().collect();
        assert_eq!(entries, vec![(A8, 2), (H1, 1)]);
        assert_eq!(set.len(), 2);
        assert!(!set.contains(E4));
    }
}
