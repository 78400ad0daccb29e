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

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use strum::IntoEnumIterator;

use super::material::{Color, Material, Pair, Piece};
use super::square::{File, Mask, Rank, Square};

use Color::*;
use Piece::*;

/// Identifies one piece for as long as it stays on the board. Ids are
/// never reused within a position, so a promoted pawn's replacement gets
/// a fresh one.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceId(u64);

impl PieceId {
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A live piece and the square it stands on.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Unit {
    id: PieceId,
    material: Material,
    square: Square,
}

impl Unit {
    #[inline]
    pub fn id(&self) -> PieceId {
        self.id
    }
    #[inline]
    pub fn material(&self) -> Material {
        self.material
    }
    #[inline]
    pub fn color(&self) -> Color {
        self.material.color()
    }
    #[inline]
    pub fn piece(&self) -> Piece {
        self.material.piece()
    }
    #[inline]
    pub fn square(&self) -> Square {
        self.square
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Grid([Option<usize>; 64]);

impl Index<Square> for Grid {
    type Output = Option<usize>;
    fn index(&self, index: Square) -> &Self::Output {
        &self.0[index.to_index()]
    }
}

impl IndexMut<Square> for Grid {
    fn index_mut(&mut self, index: Square) -> &mut Self::Output {
        &mut self.0[index.to_index()]
    }
}

/// The contents of the board.
///
/// Pieces live in arena slots and the grid stores slot indices. A
/// vacated slot is filled by the next piece created, so the arena never
/// outgrows the board. Both sides of that relation, along with the
/// per-color occupancy masks, are updated together by `spawn`, `remove`,
/// `relocate` and `promote`, which are the only ways to change a position.
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    units: Vec<Option<Unit>>,
    grid: Grid,
    occupancy: Pair<Mask>,
    next_id: u64,
}

impl Default for Position {
    fn default() -> Self {
        Self::standard()
    }
}

impl Position {
    pub fn empty() -> Self {
        Self {
            units: Vec::with_capacity(32),
            grid: Grid([None; 64]),
            occupancy: Pair::new(Mask::empty(), Mask::empty()),
            next_id: 0,
        }
    }

    /// The standard starting position: 32 pieces, White on ranks 1 and 2.
    pub fn standard() -> Self {
        const BACK_RANK: [Piece; 8] = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];
        let mut position = Self::empty();
        for color in Color::iter() {
            for file in File::iter() {
                let square = Square::new(file, Rank::back_rank(color));
                position.spawn(square, Material::new(color, BACK_RANK[file.to_index()]));
                let square = Square::new(file, Rank::pawn_rank(color));
                position.spawn(square, Material::new(color, Pawn));
            }
        }
        position
    }

    /// Builder used to stage custom positions. `None` clears the square.
    pub fn set_contents(mut self, square: Square, value: Option<Material>) -> Self {
        match value {
            Some(material) => {
                self.spawn(square, material);
            }
            None => {
                self.remove(square);
            }
        }
        self
    }

    #[inline]
    pub fn contents(&self, square: Square) -> Option<Material> {
        self.unit_at(square).map(|unit| unit.material)
    }

    #[inline]
    pub fn unit_at(&self, square: Square) -> Option<&Unit> {
        self.grid[square].and_then(|slot| self.units.get(slot)?.as_ref())
    }

    pub fn unit(&self, id: PieceId) -> Option<&Unit> {
        self.units().find(|unit| unit.id == id)
    }

    /// Live pieces in arena order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.units.iter().flatten()
    }

    pub fn units_of(&self, color: Color) -> impl Iterator<Item = &Unit> + '_ {
        self.units().filter(move |unit| unit.color() == color)
    }

    /// Occupied squares and their contents, ordered from a8 to h1.
    pub fn snapshot(&self) -> Vec<(Square, Material)> {
        self.occupied()
            .iter()
            .filter_map(|square| self.contents(square).map(|material| (square, material)))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.occupied().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied().is_empty()
    }

    #[inline]
    pub fn occupied_by(&self, color: Color) -> Mask {
        self.occupancy[color]
    }

    #[inline]
    pub fn occupied(&self) -> Mask {
        self.occupancy[White] | self.occupancy[Black]
    }

    #[inline]
    pub fn is_vacant(&self, square: Square) -> bool {
        self.grid[square].is_none()
    }

    pub fn king(&self, color: Color) -> Option<Square> {
        self.units_of(color)
            .find(|unit| unit.piece().is_king())
            .map(|unit| unit.square)
    }

    /// True if the grid and the arena agree about every piece.
    pub fn is_consistent(&self) -> bool {
        let mut ids = Vec::with_capacity(self.units.len());
        for (slot, entry) in self.units.iter().enumerate() {
            let Some(unit) = entry else { continue };
            ids.push(unit.id);
            if self.grid[unit.square] != Some(slot) {
                return false;
            }
            if !self.occupancy[unit.color()].contains(unit.square) {
                return false;
            }
        }
        for square in Square::iter() {
            if let Some(slot) = self.grid[square] {
                match self.units.get(slot) {
                    Some(Some(unit)) if unit.square == square => {}
                    _ => return false,
                }
            }
        }
        let live = ids.len();
        ids.sort_unstable();
        ids.dedup();
        let overlap = self.occupancy[White] & self.occupancy[Black];
        ids.len() == live && overlap.is_empty() && self.occupied().len() == live
    }

    /// Creates a piece on `square`, returning whatever was displaced.
    pub(crate) fn spawn(&mut self, square: Square, material: Material) -> Option<Unit> {
        let displaced = self.remove(square);
        let unit = Some(Unit {
            id: PieceId(self.next_id),
            material,
            square,
        });
        self.next_id += 1;
        let slot = match self.units.iter().position(Option::is_none) {
            Some(slot) => {
                self.units[slot] = unit;
                slot
            }
            None => {
                self.units.push(unit);
                self.units.len() - 1
            }
        };
        self.grid[square] = Some(slot);
        self.occupancy[material.color()] |= square;
        displaced
    }

    /// Takes the piece on `square` off the board.
    pub(crate) fn remove(&mut self, square: Square) -> Option<Unit> {
        let slot = self.grid[square].take()?;
        let unit = self.units.get_mut(slot)?.take()?;
        self.occupancy[unit.color()].reset(square);
        Some(unit)
    }

    /// Moves the piece on `from` to `to`, returning the piece that stood
    /// on `to`, if any. Does nothing when `from` is vacant.
    pub(crate) fn relocate(&mut self, from: Square, to: Square) -> Option<Unit> {
        if from == to {
            return None;
        }
        let slot = self.grid[from]?;
        let captured = self.remove(to);
        let Some(Some(unit)) = self.units.get_mut(slot) else {
            return captured;
        };
        unit.square = to;
        let color = unit.color();
        self.grid[from] = None;
        self.grid[to] = Some(slot);
        self.occupancy[color].reset(from);
        self.occupancy[color] |= to;
        captured
    }

    /// Replaces the piece on `square` with a new piece of the same color,
    /// returning the piece that was destroyed.
    pub(crate) fn promote(&mut self, square: Square, piece: Piece) -> Option<Unit> {
        let old = self.remove(square)?;
        self.spawn(square, Material::new(old.color(), piece));
        Some(old)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::iter() {
            for file in File::iter() {
                let square = Square::new(file, rank);
                let c = self.contents(square).map_or('.', |m| m.symbol());
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Square::*;

    #[test]
    fn test_standard_setup() {
        let position = Position::standard();
        assert_eq!(position.len(), 32);
        assert!(position.is_consistent());
        assert_eq!(position.contents(E1), Some(Material::WK));
        assert_eq!(position.contents(D1), Some(Material::WQ));
        assert_eq!(position.contents(E8), Some(Material::BK));
        assert_eq!(position.contents(D8), Some(Material::BQ));
        assert_eq!(position.contents(A8), Some(Material::BR));
        assert_eq!(position.contents(G1), Some(Material::WN));
        assert_eq!(position.contents(C8), Some(Material::BB));
        for file in File::iter() {
            assert_eq!(position.contents(Square::new(file, Rank::Rank2)), Some(Material::WP));
            assert_eq!(position.contents(Square::new(file, Rank::Rank7)), Some(Material::BP));
        }
        assert_eq!(position.occupied_by(White).len(), 16);
        assert_eq!(position.occupied_by(Black).len(), 16);
    }
    #[test]
    fn test_units_know_their_square() {
        let position = Position::standard();
        for unit in position.units() {
            assert_eq!(position.unit_at(unit.square()), Some(unit));
        }
    }
    #[test]
    fn test_king_lookup() {
        let position = Position::standard();
        assert_eq!(position.king(White), Some(E1));
        assert_eq!(position.king(Black), Some(E8));
        let position = position.set_contents(E8, None);
        assert_eq!(position.king(Black), None);
    }
    #[test]
    fn test_relocate_captures() {
        let mut position = Position::standard();
        let captured = position.relocate(A2, A7);
        assert_eq!(captured.map(|u| u.material()), Some(Material::BP));
        assert_eq!(position.contents(A7), Some(Material::WP));
        assert_eq!(position.contents(A2), None);
        assert_eq!(position.len(), 31);
        assert!(position.is_consistent());
    }
    #[test]
    fn test_relocate_keeps_id() {
        let mut position = Position::standard();
        let id = position.unit_at(G1).map(|u| u.id());
        assert!(position.relocate(G1, F3).is_none());
        assert_eq!(position.unit_at(F3).map(|u| u.id()), id);
        assert_eq!(position.unit_at(F3).map(|u| u.square()), Some(F3));
        assert!(position.is_consistent());
    }
    #[test]
    fn test_relocate_from_vacant_square() {
        let mut position = Position::standard();
        assert!(position.relocate(E4, E5).is_none());
        assert_eq!(position.len(), 32);
        assert!(position.is_consistent());
    }
    #[test]
    fn test_promote_creates_new_piece() {
        let mut position = Position::empty().set_contents(B8, Some(Material::WP));
        let old_id = position.unit_at(B8).map(|u| u.id());
        let old = position.promote(B8, Queen);
        assert_eq!(old.map(|u| u.id()), old_id);
        assert_eq!(position.contents(B8), Some(Material::WQ));
        assert_ne!(position.unit_at(B8).map(|u| u.id()), old_id);
        assert_eq!(position.len(), 1);
        assert!(position.is_consistent());
    }
    #[test]
    fn test_set_contents_replaces() {
        let position = Position::standard()
            .set_contents(E2, Some(Material::BQ))
            .set_contents(D2, None);
        assert_eq!(position.contents(E2), Some(Material::BQ));
        assert_eq!(position.contents(D2), None);
        assert_eq!(position.occupied_by(White).len(), 14);
        assert_eq!(position.occupied_by(Black).len(), 17);
        assert!(position.is_consistent());
    }
    #[test]
    fn test_replacing_pieces_reuses_slots() {
        let mut position = Position::empty().set_contents(A1, Some(Material::WK));
        let king = position.unit_at(A1).map(|u| u.id());
        for i in 0..70_000 {
            let material = if i % 2 == 0 { Material::BQ } else { Material::BR };
            position = position.set_contents(H8, Some(material));
        }
        assert_eq!(position.contents(A1), Some(Material::WK));
        assert_eq!(position.unit_at(A1).map(|u| u.id()), king);
        assert_eq!(position.contents(H8), Some(Material::BR));
        assert_eq!(position.units.len(), 2);
        assert_eq!(position.len(), 2);
        assert!(position.is_consistent());
    }
    #[test]
    fn test_ids_stay_unique_when_slots_are_reused() {
        let position = Position::standard();
        let pawn = position.unit_at(A2).map(|u| u.id());
        let mut position = position
            .set_contents(A2, None)
            .set_contents(A2, Some(Material::WQ));
        let queen = position.unit_at(A2).map(|u| u.id());
        assert_ne!(queen, pawn);
        assert!(pawn.and_then(|id| position.unit(id)).is_none());
        assert_eq!(position.units.len(), 32);

        let before = position.unit_at(B2).map(|u| u.id());
        position.promote(B2, Queen);
        let after = position.unit_at(B2).map(|u| u.id());
        assert_ne!(after, before);
        assert_ne!(after, queen);
        assert_eq!(position.units.len(), 32);
        assert!(position.is_consistent());
    }
    #[test]
    fn test_snapshot_order() {
        let position = Position::empty()
            .set_contents(H1, Some(Material::WK))
            .set_contents(A8, Some(Material::BK));
        assert_eq!(
            position.snapshot(),
            vec![(A8, Material::BK), (H1, Material::WK)]
        );
    }
}
