//! Shape registry: the owner of every shape placed on a sheet.
//!
//! Insertion order is z-order, except that columns and shutters are always
//! kept after all other kinds so they draw on top. The registry knows nothing
//! about size indices; callers release those before removing shapes.

use serde::{Deserialize, Serialize};

use rackplan_core::ShapeId;

use crate::model::{LayoutRules, Shape};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRegistry {
    shapes: Vec<Shape>,
    next_id: ShapeId,
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            next_id: 1,
        }
    }

    pub fn generate_id(&mut self) -> ShapeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn next_id(&self) -> ShapeId {
        self.next_id
    }

    /// Adds a shape under a fresh id and returns the id.
    pub fn add(&mut self, mut shape: Shape) -> ShapeId {
        shape.id = self.generate_id();
        let id = shape.id;
        self.insert_ordered(shape);
        id
    }

    /// Adds a shape keeping its id. Returns `false` (and drops nothing) when
    /// the id is zero or already taken.
    pub fn restore(&mut self, shape: Shape) -> bool {
        if shape.id == 0 || self.contains(shape.id) {
            return false;
        }
        self.next_id = self.next_id.max(shape.id + 1);
        self.insert_ordered(shape);
        true
    }

    fn insert_ordered(&mut self, shape: Shape) {
        if shape.draws_on_top() {
            self.shapes.push(shape);
        } else {
            let at = self
                .shapes
                .iter()
                .position(|s| s.draws_on_top())
                .unwrap_or(self.shapes.len());
            self.shapes.insert(at, shape);
        }
    }

    /// Removes the given shapes, returning them in registry order. Unknown
    /// ids are ignored.
    pub fn remove(&mut self, ids: &[ShapeId]) -> Vec<Shape> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.shapes.len());
        for shape in self.shapes.drain(..) {
            if ids.contains(&shape.id) {
                removed.push(shape);
            } else {
                kept.push(shape);
            }
        }
        self.shapes = kept;
        removed
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id == id)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.get(id).is_some()
    }

    pub fn all(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Shape> {
        self.shapes.iter_mut()
    }

    /// Committed racks in registry order.
    pub fn racks(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter().filter(|s| s.is_rack() && s.initialized)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
