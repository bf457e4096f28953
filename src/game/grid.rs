//! Egocentric ASCII grid views
//!
//! The world is downscaled onto a fixed-width character grid whose height
//! follows the world aspect ratio. Each agent gets its own view: its own cell
//! is marked distinctly, and other agents are drawn or left out depending on
//! the variant's visibility policy.

use std::fmt;

use crate::config::{EnemyVisibility, GridConfig};
use crate::game::state::World;
use crate::util::vec2::Vec2;

/// A rendered view, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<char>,
}

impl Grid {
    pub fn new(width: usize, height: usize, fill: char) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, col: usize, row: usize) -> Option<char> {
        (col < self.width && row < self.height).then(|| self.cells[row * self.width + col])
    }

    /// Mark a cell; coordinates off the grid are ignored
    fn mark(&mut self, cell: Option<(usize, usize)>, marker: char) {
        if let Some((col, row)) = cell {
            self.cells[row * self.width + col] = marker;
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.chunks(self.width.max(1)).enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            for c in row {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

/// Grid rows for a world: `floor(width * world_height / world_width)`
pub fn grid_height(width: usize, world: &World) -> usize {
    (width as f32 * (world.bounds.height / world.bounds.width)).floor() as usize
}

/// Floored grid cell for a world position, or `None` when it falls off the grid
fn scale_to_grid(position: Vec2, world: &World, width: usize, height: usize) -> Option<(usize, usize)> {
    let col = ((position.x / world.bounds.width) * width as f32).floor();
    let row = ((position.y / world.bounds.height) * height as f32).floor();

    let in_range = col >= 0.0 && row >= 0.0 && (col as usize) < width && (row as usize) < height;
    in_range.then(|| (col as usize, row as usize))
}

/// Render the world as seen by `viewer`. Unknown viewers get a view with no
/// self marker.
pub fn render_grid(world: &World, viewer: &str, config: &GridConfig) -> Grid {
    let width = config.width;
    let height = grid_height(width, world);
    let mut grid = Grid::new(width, height, config.empty);

    for pickup in &world.pickups {
        grid.mark(scale_to_grid(pickup.position, world, width, height), config.pickup);
    }

    if config.enemies == EnemyVisibility::Shown {
        for agent in world.agents().iter().filter(|a| a.id != viewer) {
            grid.mark(scale_to_grid(agent.position, world, width, height), config.enemy);
        }
    }

    // Drawn last so the viewer is never hidden by a pickup or another agent
    if let Some(me) = world.get_agent(viewer) {
        grid.mark(scale_to_grid(me.position, world, width, height), config.own);
    }

    grid
}
