use glam::Vec2;

use crate::Slot;
use crate::from_polar;

/// The minimum distance between two consecutive rings of a cluster.
pub const MIN_DELTA_RING: f32 = 0.22;

/// The minimum arc length between two adjacent slots on a ring.
pub const MIN_DELTA_SLOT: f32 = 0.22;

// Compensates for rounding when the radius is an exact multiple of the ring distance.
const EPSILON: f32 = 1e-4;

/// The concentric rings of slots on the top disk of a cluster. Ring zero is
/// the single slot in the centre.
#[derive(Clone, Debug, PartialEq)]
pub struct RingLayout {
    delta_ring: f32,
    num_ring_slots: Vec<usize>,
}

impl RingLayout {
    /// Creates the rings for a disk with the given radius.
    pub fn new(top_radius: f32) -> RingLayout {
        let top_radius = if top_radius.is_finite() { top_radius.max(0.0) } else { 0.0 };

        let num_rings = 1 + (top_radius / MIN_DELTA_RING + EPSILON).floor() as usize;
        let delta_ring = if num_rings > 1 {
            top_radius / (num_rings - 1) as f32
        } else {
            1.0
        };

        let num_ring_slots = (0..num_rings)
            .map(|ring| {
                let num_slots = (2.0 * std::f32::consts::PI * ring as f32 * delta_ring / MIN_DELTA_SLOT + EPSILON).floor();
                (num_slots as usize).max(1)
            })
            .collect();

        RingLayout {
            delta_ring,
            num_ring_slots,
        }
    }

    /// Returns the smallest radius, a multiple of the ring distance, whose
    /// rings provide at least the given number of slots.
    pub fn radius_for(num_states: usize) -> f32 {
        let mut rings = 0;
        loop {
            let radius = rings as f32 * MIN_DELTA_RING;
            if RingLayout::new(radius).total_slots() >= num_states {
                return radius;
            }

            rings += 1;
        }
    }

    pub fn num_rings(&self) -> usize {
        self.num_ring_slots.len()
    }

    /// The distance between two consecutive rings.
    pub fn delta_ring(&self) -> f32 {
        self.delta_ring
    }

    pub fn num_slots(&self, ring: usize) -> usize {
        self.num_ring_slots[ring]
    }

    pub fn total_slots(&self) -> usize {
        self.num_ring_slots.iter().sum()
    }

    pub fn ring_radius(&self, ring: usize) -> f32 {
        ring as f32 * self.delta_ring
    }

    /// The angle in degrees of the given slot.
    pub fn slot_angle(&self, slot: Slot) -> f32 {
        360.0 / self.num_ring_slots[slot.ring] as f32 * slot.slot as f32
    }

    /// The position of the given slot in the frame of the cluster.
    pub fn slot_position(&self, slot: Slot) -> Vec2 {
        from_polar(self.slot_angle(slot), self.ring_radius(slot.ring))
    }

    /// Iterates over all slots, from the centre outwards.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.num_ring_slots
            .iter()
            .enumerate()
            .flat_map(|(ring, num_slots)| (0..*num_slots).map(move |slot| Slot { ring, slot }))
    }
}
