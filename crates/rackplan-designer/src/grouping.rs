//! Rack grouping: rows (horizontal racks) and columns (vertical racks).
//!
//! Racks join a group when they share orientation, depth and cross offset
//! and their run-axis gap is within the adjacency tolerance. The first rack of
//! a group in spatial order is its master (M) rack and carries the frame
//! offset at its leading edge; the others are subordinate (A) racks.
//!
//! Gaps are measured on the structural footprint, i.e. an A rack counts from
//! `run_start - frame_offset`, so converting between M and A never changes
//! which group a rack ends up in.

use serde::{Deserialize, Serialize};

use rackplan_core::ShapeId;
use rackplan_settings::LayoutSettings;

use crate::geometry::Rotation;
use crate::model::Shape;
use crate::registry::ShapeRegistry;

/// An ordered run of adjacent racks. Index 0 is the master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RackGroup {
    pub orientation: Rotation,
    pub racks: Vec<ShapeId>,
}

impl RackGroup {
    pub fn master(&self) -> Option<ShapeId> {
        self.racks.first().copied()
    }

    pub fn len(&self) -> usize {
        self.racks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.racks.is_empty()
    }

    pub fn contains(&self, rack: ShapeId) -> bool {
        self.racks.contains(&rack)
    }
}

#[derive(Debug, Clone, Copy)]
struct Member {
    id: ShapeId,
    start: f64,
    end: f64,
    cross_start: f64,
    depth: f64,
}

impl Member {
    fn from_shape(shape: &Shape, frame_offset: f64) -> Option<Self> {
        let rack = shape.as_rack()?;
        let start = if rack.is_master() {
            shape.run_start()
        } else {
            shape.run_start() - frame_offset
        };
        Some(Self {
            id: shape.id,
            start,
            end: shape.run_end(),
            cross_start: shape.cross_start(),
            depth: shape.width,
        })
    }
}

struct Building {
    orientation: Rotation,
    members: Vec<Member>,
}

impl Building {
    fn first(&self) -> &Member {
        &self.members[0]
    }

    fn last(&self) -> &Member {
        &self.members[self.members.len() - 1]
    }

    fn compatible(&self, orientation: Rotation, member: &Member, settings: &LayoutSettings) -> bool {
        let reference = self.first();
        self.orientation == orientation
            && (reference.cross_start - member.cross_start).abs() <= settings.alignment_tolerance
            && (reference.depth - member.depth).abs() <= settings.alignment_tolerance
    }
}

fn adjacent(gap: f64, settings: &LayoutSettings) -> bool {
    gap >= -settings.overlap_epsilon && gap <= settings.adjacency_tolerance
}

/// Joins `b` onto `a` when their facing ends are adjacent.
fn try_merge(a: &mut Building, b: &mut Building, settings: &LayoutSettings) -> bool {
    if b.members.is_empty() || !a.compatible(b.orientation, b.first(), settings) {
        return false;
    }
    if adjacent(b.first().start - a.last().end, settings) {
        a.members.append(&mut b.members);
        true
    } else if adjacent(a.first().start - b.last().end, settings) {
        b.members.append(&mut a.members);
        std::mem::swap(&mut a.members, &mut b.members);
        true
    } else {
        false
    }
}

fn merge_to_fixed_point(groups: &mut Vec<Building>, settings: &LayoutSettings) {
    loop {
        let mut merged = false;
        'outer: for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                let (head, tail) = groups.split_at_mut(j);
                if try_merge(&mut head[i], &mut tail[0], settings) {
                    groups.remove(j);
                    merged = true;
                    break 'outer;
                }
            }
        }
        if !merged {
            break;
        }
    }
}

/// Groups the given racks.
///
/// Racks are visited in the order given (registry order); each joins the
/// first compatible group it is adjacent to, at the back or the front, and
/// groups that became adjacent are merged. The result is ordered spatially.
pub fn group(racks: &[&Shape], frame_offset: f64, settings: &LayoutSettings) -> Vec<RackGroup> {
    let mut groups: Vec<Building> = Vec::new();

    for shape in racks {
        let Some(member) = Member::from_shape(shape, frame_offset) else {
            continue;
        };
        let orientation = shape.rotation;

        let slot = groups.iter_mut().find_map(|g| {
            if !g.compatible(orientation, &member, settings) {
                None
            } else if adjacent(member.start - g.last().end, settings) {
                Some((g, true))
            } else if adjacent(g.first().start - member.end, settings) {
                Some((g, false))
            } else {
                None
            }
        });

        match slot {
            Some((g, true)) => g.members.push(member),
            Some((g, false)) => g.members.insert(0, member),
            None => groups.push(Building {
                orientation,
                members: vec![member],
            }),
        }
        merge_to_fixed_point(&mut groups, settings);
    }

    groups.sort_by(|a, b| {
        let key = |g: &Building| {
            (
                g.orientation == Rotation::Vertical,
                g.first().cross_start,
                g.first().start,
            )
        };
        let (ka, kb) = (key(a), key(b));
        ka.0.cmp(&kb.0)
            .then(ka.1.total_cmp(&kb.1))
            .then(ka.2.total_cmp(&kb.2))
    });

    groups
        .into_iter()
        .map(|g| RackGroup {
            orientation: g.orientation,
            racks: g.members.iter().map(|m| m.id).collect(),
        })
        .collect()
}

/// A rack whose master flag flipped while applying groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub rack: ShapeId,
    /// Became a master, so its footprint grew by the frame offset.
    pub grew: bool,
}

/// Converts a rack between master and subordinate, keeping its trailing edge.
pub fn set_master(shape: &mut Shape, master: bool, frame_offset: f64) -> bool {
    let axis = shape.run_axis();
    let start = shape.run_start();
    let Some(rack) = shape.as_rack_mut() else {
        return false;
    };
    if rack.is_first_in_row_column == master {
        return false;
    }
    rack.is_first_in_row_column = master;
    let delta = if master { frame_offset } else { -frame_offset };
    shape.length += delta;
    shape.top_left.set_along(axis, start - delta);
    true
}

/// Writes group membership and master flags back onto the racks.
pub fn apply_groups(
    shapes: &mut ShapeRegistry,
    groups: &[RackGroup],
    frame_offset: f64,
) -> Vec<Conversion> {
    for shape in shapes.iter_mut() {
        if let Some(rack) = shape.as_rack_mut() {
            rack.group = None;
        }
    }

    let mut conversions = Vec::new();
    for (index, group) in groups.iter().enumerate() {
        for (position, id) in group.racks.iter().enumerate() {
            let Some(shape) = shapes.get_mut(*id) else {
                continue;
            };
            let master = position == 0;
            if set_master(shape, master, frame_offset) {
                conversions.push(Conversion {
                    rack: *id,
                    grew: master,
                });
            }
            if let Some(rack) = shape.as_rack_mut() {
                rack.group = Some(index);
            }
        }
    }
    conversions
}
