//! Walkability grid, breadth-first pathfinding, and deploy-tile reservations
//!
//! The field is a fixed 16x16 tile grid. Level construction marks the cells
//! covered by obstacles, water and animated geometry as non-walkable; after
//! that the grid is read-only for the rest of the level. Layered on top is
//! the mutable reservation set of tiles a Sapper may still commit to as its
//! deploy target: reserving removes a tile, death or a field sweep returns
//! it.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::{GRID_TILES, TILE_SIZE};

/// A tile coordinate. May lie outside the grid (spawn positions sit one tile
/// off-field), but only in-grid tiles are walkable or reservable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn in_grid(&self) -> bool {
        self.x >= 0 && self.x < GRID_TILES && self.y >= 0 && self.y < GRID_TILES
    }

    /// Pixel position of this tile's center.
    #[inline]
    pub fn center_px(&self) -> Vec2 {
        Vec2::new(
            (self.x * TILE_SIZE + TILE_SIZE / 2) as f32,
            (self.y * TILE_SIZE + TILE_SIZE / 2) as f32,
        )
    }

    /// Pixel position of this tile's top-left corner.
    #[inline]
    pub fn topleft_px(&self) -> (i32, i32) {
        (self.x * TILE_SIZE, self.y * TILE_SIZE)
    }
}

/// 16x16 walkability matrix. Cells start walkable; level construction blocks
/// the covered ones and the grid is immutable during play.
#[derive(Debug, Clone)]
pub struct WalkGrid {
    cells: [[bool; GRID_TILES as usize]; GRID_TILES as usize],
}

impl Default for WalkGrid {
    fn default() -> Self {
        Self {
            cells: [[true; GRID_TILES as usize]; GRID_TILES as usize],
        }
    }
}

impl WalkGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a cell non-walkable. Off-grid tiles are ignored.
    pub fn block(&mut self, tile: Tile) {
        if tile.in_grid() {
            self.cells[tile.y as usize][tile.x as usize] = false;
        }
    }

    /// Off-grid tiles are not walkable.
    #[inline]
    pub fn is_walkable(&self, tile: Tile) -> bool {
        tile.in_grid() && self.cells[tile.y as usize][tile.x as usize]
    }

    /// Shortest path from `start` to `end` over walkable cells (4-neighbor
    /// breadth-first search). The returned path includes both endpoints.
    pub fn find_path(&self, start: Tile, end: Tile) -> Option<Vec<Tile>> {
        if !self.is_walkable(start) || !self.is_walkable(end) {
            return None;
        }

        let idx = |t: Tile| (t.y * GRID_TILES + t.x) as usize;
        let mut came_from: Vec<Option<Tile>> = vec![None; (GRID_TILES * GRID_TILES) as usize];
        let mut visited = [[false; GRID_TILES as usize]; GRID_TILES as usize];
        let mut queue = VecDeque::new();

        visited[start.y as usize][start.x as usize] = true;
        queue.push_back(start);

        while let Some(tile) = queue.pop_front() {
            if tile == end {
                let mut path = vec![tile];
                let mut current = tile;
                while let Some(prev) = came_from[idx(current)] {
                    path.push(prev);
                    current = prev;
                }
                path.reverse();
                return Some(path);
            }

            let neighbors = [
                Tile::new(tile.x, tile.y - 1),
                Tile::new(tile.x + 1, tile.y),
                Tile::new(tile.x, tile.y + 1),
                Tile::new(tile.x - 1, tile.y),
            ];
            for next in neighbors {
                if self.is_walkable(next) && !visited[next.y as usize][next.x as usize] {
                    visited[next.y as usize][next.x as usize] = true;
                    came_from[idx(next)] = Some(tile);
                    queue.push_back(next);
                }
            }
        }

        None
    }
}

/// The mutable set of tiles a Sapper may still pick as its deploy target.
///
/// A tile is in the set iff no live, non-despawned Sapper currently targets
/// or occupies it and the tile was not covered by static geometry at level
/// load.
#[derive(Debug, Clone, Default)]
pub struct DeployTiles {
    tiles: Vec<Tile>,
}

impl DeployTiles {
    /// All grid tiles, to be narrowed down by level construction.
    pub fn full_grid() -> Self {
        let mut tiles = Vec::with_capacity((GRID_TILES * GRID_TILES) as usize);
        for y in 0..GRID_TILES {
            for x in 0..GRID_TILES {
                tiles.push(Tile::new(x, y));
            }
        }
        Self { tiles }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, tile: Tile) -> bool {
        self.tiles.contains(&tile)
    }

    /// Remove a tile (level construction, for covered cells). A tile already
    /// absent is fine: several geometry categories can cover the same cell.
    pub fn remove(&mut self, tile: Tile) {
        self.tiles.retain(|&t| t != tile);
    }

    /// Reserve a uniformly random tile, removing it from the set. `None`
    /// when no tile is available.
    pub fn take_random(&mut self, rng: &mut Pcg32) -> Option<Tile> {
        if self.tiles.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.tiles.len());
        Some(self.tiles.swap_remove(index))
    }

    /// Return a previously reserved tile to the set.
    pub fn release(&mut self, tile: Tile) {
        assert!(
            !self.contains(tile),
            "deploy tile released while still in the set"
        );
        self.tiles.push(tile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_find_path_straight_line() {
        let grid = WalkGrid::new();
        let path = grid
            .find_path(Tile::new(0, 0), Tile::new(3, 0))
            .expect("open grid is connected");
        assert_eq!(path.first(), Some(&Tile::new(0, 0)));
        assert_eq!(path.last(), Some(&Tile::new(3, 0)));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_find_path_routes_around_wall() {
        let mut grid = WalkGrid::new();
        // Vertical wall at x=2 with a gap at y=15
        for y in 0..15 {
            grid.block(Tile::new(2, y));
        }
        let path = grid
            .find_path(Tile::new(0, 0), Tile::new(4, 0))
            .expect("gap keeps the grid connected");
        // Must detour through the gap row
        assert!(path.iter().any(|t| t.y == 15));
        for pair in path.windows(2) {
            let dist = (pair[0].x - pair[1].x).abs() + (pair[0].y - pair[1].y).abs();
            assert_eq!(dist, 1, "path steps one tile at a time");
        }
    }

    #[test]
    fn test_find_path_unreachable() {
        let mut grid = WalkGrid::new();
        for y in 0..GRID_TILES {
            grid.block(Tile::new(2, y));
        }
        assert!(grid.find_path(Tile::new(0, 0), Tile::new(4, 0)).is_none());
    }

    #[test]
    fn test_find_path_rejects_blocked_endpoints() {
        let mut grid = WalkGrid::new();
        grid.block(Tile::new(5, 5));
        assert!(grid.find_path(Tile::new(5, 5), Tile::new(0, 0)).is_none());
        assert!(grid.find_path(Tile::new(0, 0), Tile::new(5, 5)).is_none());
        assert!(grid.find_path(Tile::new(-1, 0), Tile::new(0, 0)).is_none());
    }

    #[test]
    fn test_deploy_reserve_release_roundtrip() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut deploy = DeployTiles::full_grid();
        assert_eq!(deploy.len(), 256);

        let tile = deploy.take_random(&mut rng).unwrap();
        assert_eq!(deploy.len(), 255);
        assert!(!deploy.contains(tile));

        deploy.release(tile);
        assert_eq!(deploy.len(), 256);
        assert!(deploy.contains(tile));
    }

    #[test]
    fn test_deploy_take_random_drains() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut deploy = DeployTiles::full_grid();
        for _ in 0..256 {
            assert!(deploy.take_random(&mut rng).is_some());
        }
        assert!(deploy.take_random(&mut rng).is_none());
    }

    #[test]
    #[should_panic]
    fn test_release_unreserved_tile_panics() {
        let mut deploy = DeployTiles::full_grid();
        deploy.release(Tile::new(0, 0));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut deploy = DeployTiles::full_grid();
        deploy.remove(Tile::new(3, 3));
        deploy.remove(Tile::new(3, 3));
        assert_eq!(deploy.len(), 255);
    }
}
