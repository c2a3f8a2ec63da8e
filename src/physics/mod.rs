//! Physics world collaborator
//!
//! The simulation core talks to physics only through [`PhysicsWorld`]:
//! create/destroy bodies, push forces, step, and receive contact-begin
//! events. [`RapierWorld`] backs it with rapier2d.
//!
//! Contacts are delivered to a [`ContactListener`] synchronously inside
//! `step`. Listeners never see the world, so they cannot create or destroy
//! bodies mid-step.

pub mod world;

pub use world::RapierWorld;

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;

/// Generational body handle. A destroyed handle is never reissued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) RigidBodyHandle);

/// User data that round-trips through a collider's `u128` tag
pub trait BodyTag: Copy {
    fn to_bits(self) -> u128;

    /// `None` for bits this type never produced
    fn from_bits(bits: u128) -> Option<Self>;
}

/// How a body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Immovable; infinite mass
    Static,
    /// Moved by forces and contacts
    Dynamic,
}

/// Category/mask pair deciding which bodies may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    pub category: u16,
    pub mask: u16,
}

impl CollisionFilter {
    pub const fn new(category: u16, mask: u16) -> Self {
        Self { category, mask }
    }

    /// Both sides must accept each other
    #[inline]
    pub fn accepts(&self, other: &CollisionFilter) -> bool {
        self.category & other.mask != 0 && other.category & self.mask != 0
    }
}

/// Everything needed to create a circular body
#[derive(Debug, Clone)]
pub struct BodyDesc<T> {
    pub kind: BodyKind,
    pub position: Vec2,
    pub radius: f32,
    pub density: f32,
    pub linear_damping: f32,
    pub restitution: f32,
    pub filter: CollisionFilter,
    /// Returned verbatim in contact events
    pub user_data: T,
}

/// Receives contact-begin events during a physics step
pub trait ContactListener<T> {
    fn begin_contact(&mut self, a: T, b: T);
}

impl<T, F: FnMut(T, T)> ContactListener<T> for F {
    fn begin_contact(&mut self, a: T, b: T) {
        self(a, b)
    }
}

/// Narrow interface the simulation core needs from a physics engine
pub trait PhysicsWorld<T: BodyTag> {
    fn create_body(&mut self, desc: BodyDesc<T>) -> BodyHandle;

    /// Destroy a body. Returns false if the handle was not live.
    fn destroy_body(&mut self, handle: BodyHandle) -> bool;

    /// Advance the world, reporting newly started contacts to `listener`
    fn step(
        &mut self,
        dt: f32,
        velocity_iterations: u32,
        position_iterations: u32,
        listener: &mut dyn ContactListener<T>,
    );

    /// Live bodies in creation order
    fn bodies(&self) -> Vec<BodyHandle>;

    fn contains(&self, handle: BodyHandle) -> bool;

    fn position(&self, handle: BodyHandle) -> Option<Vec2>;

    fn velocity(&self, handle: BodyHandle) -> Option<Vec2>;

    /// Accumulate a force at the body's centre until the next step
    fn apply_force(&mut self, handle: BodyHandle, force: Vec2);

    /// Inactive bodies neither move nor collide
    fn set_active(&mut self, handle: BodyHandle, active: bool);
}
