//! rapier2d-backed physics world
//!
//! Every body is a single ball collider. Category/mask filters become
//! rapier interaction groups, and each collider carries its owner's
//! [`BodyTag`] bits in `user_data` so contact events map straight back to
//! simulation entities.
//!
//! rapier has no per-step translation cap, so linear velocity is clamped
//! after each step to keep fast bullets from tunnelling through enemies.

use std::marker::PhantomData;
use std::num::NonZeroUsize;

use glam::Vec2;
use rapier2d::prelude::*;

use super::{BodyDesc, BodyHandle, BodyKind, BodyTag, ContactListener, PhysicsWorld};

pub struct RapierWorld<T> {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Creation order; rapier's arena reuses slots so its iteration order
    /// is not stable across removals
    order: Vec<RigidBodyHandle>,
    max_translation: f32,
    _tag: PhantomData<fn() -> T>,
}

impl<T: BodyTag> RapierWorld<T> {
    /// Top-down world with no gravity
    pub fn new(max_translation: f32) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, 0.0],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            order: Vec::new(),
            max_translation,
            _tag: PhantomData,
        }
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Post-step housekeeping: drop accumulated forces and cap speed
    fn settle(&mut self, dt: f32) {
        let max_speed = self.max_translation / dt;
        for &handle in &self.order {
            let Some(rb) = self.rigid_body_set.get_mut(handle) else {
                continue;
            };
            if !rb.is_dynamic() {
                continue;
            }
            rb.reset_forces(false);
            let vel = *rb.linvel();
            let speed = vel.norm();
            if speed > max_speed {
                rb.set_linvel(vel * (max_speed / speed), false);
            }
        }
    }

    fn tag_of(&self, collider: ColliderHandle) -> Option<T> {
        self.collider_set.get(collider).and_then(|c| T::from_bits(c.user_data))
    }
}

impl<T: BodyTag> PhysicsWorld<T> for RapierWorld<T> {
    fn create_body(&mut self, desc: BodyDesc<T>) -> BodyHandle {
        let translation = vector![desc.position.x, desc.position.y];
        let rb = match desc.kind {
            BodyKind::Static => RigidBodyBuilder::fixed().translation(translation).build(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic()
                .translation(translation)
                .linear_damping(desc.linear_damping)
                .can_sleep(false)
                .build(),
        };
        let body_handle = self.rigid_body_set.insert(rb);

        let groups = InteractionGroups::new(
            Group::from_bits_truncate(u32::from(desc.filter.category)),
            Group::from_bits_truncate(u32::from(desc.filter.mask)),
        );
        let collider = ColliderBuilder::ball(desc.radius)
            .density(desc.density)
            .restitution(desc.restitution)
            .collision_groups(groups)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(desc.user_data.to_bits())
            .build();
        self.collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);

        self.order.push(body_handle);
        BodyHandle(body_handle)
    }

    fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        let removed = self.rigid_body_set.remove(
            handle.0,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        if removed.is_none() {
            return false;
        }
        self.order.retain(|&h| h != handle.0);
        true
    }

    fn step(
        &mut self,
        dt: f32,
        velocity_iterations: u32,
        position_iterations: u32,
        listener: &mut dyn ContactListener<T>,
    ) {
        self.integration_params.dt = dt;
        self.integration_params.num_solver_iterations =
            NonZeroUsize::new(velocity_iterations as usize).unwrap_or(NonZeroUsize::MIN);
        self.integration_params.num_internal_stabilization_iterations = position_iterations as usize;

        let (collision_send, collision_recv) = rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) = rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );
        self.settle(dt);

        let mut started = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _) = event {
                match (self.tag_of(h1), self.tag_of(h2)) {
                    (Some(a), Some(b)) => started.push((a, b)),
                    _ => log::warn!("Contact between untagged colliders {h1:?} and {h2:?}"),
                }
            }
        }
        // Channel order is not guaranteed; report pairs in a stable order
        started.sort_by_key(|&(a, b)| {
            let (a, b) = (a.to_bits(), b.to_bits());
            (a.min(b), a.max(b))
        });
        for (a, b) in started {
            listener.begin_contact(a, b);
        }
    }

    fn bodies(&self) -> Vec<BodyHandle> {
        self.order.iter().map(|&h| BodyHandle(h)).collect()
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.rigid_body_set.contains(handle.0)
    }

    fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.rigid_body_set.get(handle.0).map(|rb| {
            let t = rb.translation();
            Vec2::new(t.x, t.y)
        })
    }

    fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.rigid_body_set.get(handle.0).map(|rb| {
            let v = rb.linvel();
            Vec2::new(v.x, v.y)
        })
    }

    fn apply_force(&mut self, handle: BodyHandle, force: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle.0) {
            rb.add_force(vector![force.x, force.y], true);
        }
    }

    fn set_active(&mut self, handle: BodyHandle, active: bool) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle.0) {
            rb.set_enabled(active);
        }
    }
}
