//! World grid model: cells, cell groups, world identifiers and the canonical
//! hexagonal layout the orchestrator resolves reward and occlusion ids against.

use crate::error::{ProtocolError, Result};
use crate::types::{Coordinates, Location2};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_WORLD_CONFIGURATION: &str = "hexagonal";
pub const DEFAULT_WORLD_IMPLEMENTATION: &str = "canonical";
pub const DEFAULT_OCCLUSIONS: &str = "21_05";

/// Cells from the centre to the rim of the canonical arena.
pub const DEFAULT_WORLD_RADIUS: i32 = 10;

/// Largest radius the hexagon builder accepts (197 377 cells).
pub const MAX_WORLD_RADIUS: i32 = 256;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cell {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub coordinates: Coordinates,
    #[serde(default)]
    pub location: Location2,
    /// Single source of truth for visibility masking.
    #[serde(default)]
    pub occluded: bool,
}

/// Ordered cell sequence. Clients index rewards and occlusions by position,
/// so order is preserved through every operation here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CellGroup {
    #[serde(default, alias = "cell_locations")]
    pub cells: Vec<Cell>,
}

impl CellGroup {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn get(&self, id: i32) -> Option<&Cell> {
        // Ids are dense indices for generated layouts; fall back to a scan.
        usize::try_from(id)
            .ok()
            .and_then(|i| self.cells.get(i))
            .filter(|c| c.id == id)
            .or_else(|| self.cells.iter().find(|c| c.id == id))
    }

    pub fn find_by_coordinates(&self, coordinates: Coordinates) -> Option<&Cell> {
        self.cells.iter().find(|c| c.coordinates == coordinates)
    }

    pub fn occluded_ids(&self) -> Vec<i32> {
        self.cells
            .iter()
            .filter(|c| c.occluded)
            .map(|c| c.id)
            .collect()
    }

    pub fn free_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| !c.occluded)
    }

    /// Mark exactly `ids` as occluded. Unknown ids are skipped with a warning.
    pub fn apply_occlusions(&mut self, ids: &[i32]) {
        for cell in &mut self.cells {
            cell.occluded = false;
        }
        for &id in ids {
            match self.cells.iter_mut().find(|c| c.id == id) {
                Some(cell) => cell.occluded = true,
                None => warn!("Occlusion references unknown cell {}", id),
            }
        }
    }

    /// Ordered subset; fails on the first id that is not in the group.
    pub fn select(&self, ids: &[i32]) -> Result<CellGroup> {
        let cells = ids
            .iter()
            .map(|&id| self.get(id).cloned().ok_or(ProtocolError::UnknownCell(id)))
            .collect::<Result<Vec<_>>>()?;
        Ok(CellGroup { cells })
    }
}

// ---------------------------------------------------------------------------
// World identifiers
// ---------------------------------------------------------------------------

/// Names the grid topology, implementation variant and occlusion mask.
/// Not validated here; world generation decides what the names mean.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorldInfo {
    pub world_configuration: String,
    pub world_implementation: String,
    pub occlusions: String,
}

impl Default for WorldInfo {
    fn default() -> Self {
        Self {
            world_configuration: DEFAULT_WORLD_CONFIGURATION.into(),
            world_implementation: DEFAULT_WORLD_IMPLEMENTATION.into(),
            occlusions: DEFAULT_OCCLUSIONS.into(),
        }
    }
}

impl std::fmt::Display for WorldInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.world_configuration, self.world_implementation, self.occlusions
        )
    }
}

// ---------------------------------------------------------------------------
// World implementation geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Transformation {
    #[serde(default)]
    pub size: f32,
    /// Degrees.
    #[serde(default)]
    pub rotation: f32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shape {
    #[serde(default)]
    pub sides: i32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Space {
    #[serde(default)]
    pub center: Location2,
    #[serde(default)]
    pub shape: Shape,
    #[serde(default)]
    pub transformation: Transformation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorldImplementation {
    #[serde(default)]
    pub cell_locations: Vec<Location2>,
    #[serde(default)]
    pub space: Space,
    #[serde(default)]
    pub cell_transformation: Transformation,
}

impl WorldImplementation {
    /// Canonical hexagonal arena: unit-size hexagon centred at (0.5, 0.5),
    /// cells on a doubled-width lattice with hex distance `<= radius` from
    /// the centre, ordered row by row. `radius` is clamped to
    /// `0..=MAX_WORLD_RADIUS`.
    pub fn canonical_hexagon(radius: i32) -> (Self, Vec<Coordinates>) {
        if radius > MAX_WORLD_RADIUS {
            warn!(
                "World radius {} exceeds {}, clamping",
                radius, MAX_WORLD_RADIUS
            );
        }
        let radius = radius.clamp(0, MAX_WORLD_RADIUS);
        let space = Space {
            center: Location2::new(0.5, 0.5),
            shape: Shape { sides: 6 },
            transformation: Transformation {
                size: 1.0,
                rotation: 0.0,
            },
        };
        let spacing = space.transformation.size / (2 * radius + 1) as f32;
        let row_height = spacing * 3f32.sqrt() / 2.0;

        let mut coordinates = Vec::new();
        let mut cell_locations = Vec::new();
        for y in -radius..=radius {
            for x in -2 * radius..=2 * radius {
                if (x + y).rem_euclid(2) != 0 || hex_distance(x, y) > radius {
                    continue;
                }
                coordinates.push(Coordinates::new(x, y));
                cell_locations.push(Location2::new(
                    space.center.x + x as f32 * spacing / 2.0,
                    space.center.y + y as f32 * row_height,
                ));
            }
        }

        let implementation = Self {
            cell_locations,
            space,
            cell_transformation: Transformation {
                size: spacing,
                rotation: 0.0,
            },
        };
        (implementation, coordinates)
    }
}

fn hex_distance(x: i32, y: i32) -> i32 {
    let dy = y.abs();
    dy + ((x.abs() - dy).max(0) / 2)
}

// ---------------------------------------------------------------------------
// World layout
// ---------------------------------------------------------------------------

/// Resolved grid: implementation geometry plus the cell list built from it.
#[derive(Debug, Clone)]
pub struct WorldLayout {
    pub implementation: WorldImplementation,
    pub cells: CellGroup,
}

impl WorldLayout {
    pub fn hexagonal(radius: i32) -> Self {
        let (implementation, coordinates) = WorldImplementation::canonical_hexagon(radius);
        let cells = coordinates
            .into_iter()
            .zip(implementation.cell_locations.iter().copied())
            .enumerate()
            .map(|(i, (coordinates, location))| Cell {
                id: i as i32,
                coordinates,
                location,
                occluded: false,
            })
            .collect();
        Self {
            implementation,
            cells: CellGroup::new(cells),
        }
    }

    /// Copy of the cell list with `occlusions` applied.
    pub fn with_occlusions(&self, occlusions: &[i32]) -> CellGroup {
        let mut cells = self.cells.clone();
        cells.apply_occlusions(occlusions);
        cells
    }

    /// Where the subject enters: smallest x, lowest id on ties.
    pub fn entrance(&self) -> Option<&Cell> {
        self.cells.iter().min_by(|a, b| {
            a.location
                .x
                .total_cmp(&b.location.x)
                .then(a.id.cmp(&b.id))
        })
    }

    /// Free cell farthest from the entrance; lowest id on ties.
    pub fn predator_spawn(&self, cells: &CellGroup) -> Option<Location2> {
        let entrance = self.entrance()?.location;
        cells
            .free_cells()
            .max_by(|a, b| {
                a.location
                    .distance(&entrance)
                    .total_cmp(&b.location.distance(&entrance))
                    .then(b.id.cmp(&a.id))
            })
            .map(|c| c.location)
    }
}

impl Default for WorldLayout {
    fn default() -> Self {
        Self::hexagonal(DEFAULT_WORLD_RADIUS)
    }
}

// ---------------------------------------------------------------------------
// Occlusion catalog
// ---------------------------------------------------------------------------

/// Named occlusion masks, e.g. `"21_05"` → the cell ids blocked in that set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OcclusionCatalog {
    sets: HashMap<String, Vec<i32>>,
}

impl OcclusionCatalog {
    pub fn new(sets: HashMap<String, Vec<i32>>) -> Self {
        Self { sets }
    }

    pub fn insert(&mut self, name: impl Into<String>, ids: Vec<i32>) {
        self.sets.insert(name.into(), ids);
    }

    /// Unknown names resolve to an empty mask.
    pub fn resolve(&self, name: &str) -> Vec<i32> {
        match self.sets.get(name) {
            Some(ids) => ids.clone(),
            None => {
                warn!("Unknown occlusion set '{}', using an empty mask", name);
                Vec::new()
            }
        }
    }
}
