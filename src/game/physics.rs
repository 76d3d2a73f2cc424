//! Physics world wrapper
//!
//! Owns every rapier set and pipeline behind one synchronous `step`.
//! Bodies carry the owning entity's packed id as user data so contact
//! events and ray hits resolve back to registry keys - matching is
//! always by `EntityId`, never by pointer identity.
//!
//! Positions on the game side are screen pixels; rapier runs in meters.
//! The conversion helpers at the bottom are the only place the two
//! unit systems meet.

use macroquad::prelude::Vec2;
use rapier2d::prelude::*;
use std::sync::Mutex;

use super::entity::EntityId;

/// Display multiplier: one physics meter on screen.
pub const PIXELS_PER_METER: f32 = 50.0;
/// Fixed physics substep, seconds.
pub const FIXED_DT: f32 = 1.0 / 60.0;
/// Downward gravity, m/s^2 (screen y grows downward).
const GRAVITY: f32 = 20.0;
/// Ray fractions at or below this are self-intersections and ignored.
const RAY_EPSILON: f32 = 1e-3;

/// Collision filter categories.
pub mod groups {
    use rapier2d::prelude::Group;

    /// Static arena geometry.
    pub const WORLD: Group = Group::GROUP_1;
    /// Player bodies.
    pub const GUNMAN: Group = Group::GROUP_2;
    /// Props shattered by player contact.
    pub const FRAGILE: Group = Group::GROUP_3;
    /// Bullet rays. A fixture is hittable iff its filter includes this.
    pub const BULLET: Group = Group::GROUP_4;
}

/// Result of a bullet ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Registry key of the struck entity, if the fixture carried one.
    pub entity: Option<EntityId>,
    /// Surface normal at the hit.
    pub normal: Vec2,
    /// Hit distance in pixels; the full range on a miss.
    pub distance: f32,
}

/// Begin-contact accumulator. Fills during `step`, drained by the scene
/// afterwards - the physics engine must never see entities removed while
/// it is mid-iteration.
#[derive(Default)]
struct ContactQueue {
    hits: Mutex<Vec<EntityId>>,
}

impl EventHandler for ContactQueue {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(h1, h2, _) = event {
            let Some(a) = colliders.get(h1) else { return };
            let Some(b) = colliders.get(h2) else { return };
            let mut hits = self.hits.lock().unwrap();
            // A fragile fixture shatters when a gunman runs into it;
            // settling onto scenery is not a hit.
            for (fragile, other) in [(a, b), (b, a)] {
                if fragile.collision_groups().memberships.intersects(groups::FRAGILE)
                    && other.collision_groups().memberships.intersects(groups::GUNMAN)
                {
                    if let Some(id) = EntityId::unpack(fragile.user_data) {
                        hits.push(id);
                    }
                }
            }
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

pub struct PhysicsWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    contacts: ContactQueue,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            gravity: vector![0.0, GRAVITY],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            contacts: ContactQueue::default(),
        }
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the world by one fixed substep. Synchronous: on return
    /// all transforms are updated and contact events are collected.
    pub fn step(&mut self) {
        self.integration_parameters.dt = FIXED_DT;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.contacts,
        );
    }

    /// Entities whose fragile fixtures began a contact since the last
    /// drain. Clears the accumulator.
    pub fn drain_hits(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut *self.contacts.hits.lock().unwrap())
    }

    /// Dynamic capsule for a player. Rotation is locked; cowboys stay
    /// upright.
    pub fn add_player_body(&mut self, id: EntityId, pos: Vec2, size: Vec2) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_sim(pos))
            .lock_rotations()
            .linear_damping(0.5)
            .user_data(id.pack())
            .build();
        let handle = self.bodies.insert(body);
        let half_height = (size.y / 2.0 - size.x / 2.0).max(0.01) / PIXELS_PER_METER;
        let radius = (size.x / 2.0) / PIXELS_PER_METER;
        let collider = ColliderBuilder::capsule_y(half_height, radius)
            .friction(0.2)
            .collision_groups(InteractionGroups::new(
                groups::GUNMAN,
                groups::WORLD | groups::GUNMAN | groups::BULLET,
            ))
            .user_data(id.pack())
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Static cuboid for a platform segment.
    pub fn add_platform_body(&mut self, id: EntityId, pos: Vec2, size: Vec2) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(to_sim(pos))
            .user_data(id.pack())
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(
            size.x / 2.0 / PIXELS_PER_METER,
            size.y / 2.0 / PIXELS_PER_METER,
        )
        .collision_groups(InteractionGroups::new(
            groups::WORLD,
            groups::GUNMAN | groups::FRAGILE | groups::BULLET,
        ))
        .user_data(id.pack())
        .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Dynamic cuboid that shatters when a gunman touches it.
    pub fn add_fragile_body(&mut self, id: EntityId, pos: Vec2, size: Vec2) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_sim(pos))
            .user_data(id.pack())
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(
            size.x / 2.0 / PIXELS_PER_METER,
            size.y / 2.0 / PIXELS_PER_METER,
        )
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .collision_groups(InteractionGroups::new(
            groups::FRAGILE,
            groups::WORLD | groups::GUNMAN | groups::FRAGILE | groups::BULLET,
        ))
        .user_data(id.pack())
        .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Release a body and its fixtures back to the world.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Body transform as (pixel position, radians).
    pub fn body_transform(&self, handle: RigidBodyHandle) -> Option<(Vec2, f32)> {
        let body = self.bodies.get(handle)?;
        Some((from_sim(*body.translation()), body.rotation().angle()))
    }

    /// Linear velocity in m/s (the animation thresholds live in m/s).
    pub fn linvel(&self, handle: RigidBodyHandle) -> Vec2 {
        self.bodies
            .get(handle)
            .map(|b| Vec2::new(b.linvel().x, b.linvel().y))
            .unwrap_or(Vec2::ZERO)
    }

    /// Set horizontal speed, preserving vertical motion.
    pub fn drive_horizontal(&mut self, handle: RigidBodyHandle, speed: f32) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let vy = body.linvel().y;
            body.set_linvel(vector![speed, vy], true);
        }
    }

    /// Launch upward at `speed` m/s.
    pub fn jump(&mut self, handle: RigidBodyHandle, speed: f32) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let vx = body.linvel().x;
            body.set_linvel(vector![vx, -speed], true);
        }
    }

    /// Drop a body at a new position with its motion cleared. Used for
    /// respawns.
    pub fn teleport(&mut self, handle: RigidBodyHandle, pos: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(to_sim(pos), true);
            body.set_linvel(vector![0.0, 0.0], true);
        }
    }

    /// A body is resting when its speed is negligible.
    pub fn at_rest(&self, handle: RigidBodyHandle) -> bool {
        self.linvel(handle).length_squared() < 0.01
    }

    /// Cast a bullet ray of `range_px` pixels from `origin`.
    ///
    /// Every fixture whose filter accepts bullets is considered, except
    /// the shooter's own body; the closest fraction strictly above the
    /// self-intersection epsilon wins. A miss reports the full range
    /// and no entity (a full-length trail into empty space).
    ///
    /// Returns `None` for a zero-length direction - that is a caller
    /// bug, guarded here before rapier ever sees the ray.
    pub fn fire_ray(
        &mut self,
        origin: Vec2,
        dir: Vec2,
        range_px: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Option<RayHit> {
        if dir.length_squared() <= f32::EPSILON {
            return None;
        }
        let dir = dir.normalize();
        self.query_pipeline.update(&self.colliders);

        let ray = Ray::new(to_sim_point(origin), dir_to_sim(dir));
        let max_toi = range_px / PIXELS_PER_METER;
        let mut filter = QueryFilter::default().groups(InteractionGroups::new(
            groups::BULLET,
            groups::WORLD | groups::GUNMAN | groups::FRAGILE,
        ));
        if let Some(handle) = exclude {
            filter = filter.exclude_rigid_body(handle);
        }

        let mut best: Option<(Real, Vector<Real>, u128)> = None;
        let colliders = &self.colliders;
        self.query_pipeline.intersections_with_ray(
            &self.bodies,
            colliders,
            &ray,
            max_toi,
            true,
            filter,
            |handle, hit| {
                let closer = best.map_or(true, |(t, _, _)| hit.time_of_impact < t);
                if hit.time_of_impact > RAY_EPSILON && closer {
                    best = Some((hit.time_of_impact, hit.normal, colliders[handle].user_data));
                }
                true
            },
        );

        Some(match best {
            Some((toi, normal, user_data)) => RayHit {
                entity: EntityId::unpack(user_data),
                normal: dir_from_sim(normal),
                distance: toi * PIXELS_PER_METER,
            },
            None => RayHit {
                entity: None,
                normal: Vec2::ZERO,
                distance: range_px,
            },
        })
    }
}

// Unit/type bridges between the game's pixel vectors and rapier's
// meter-based nalgebra types.

fn to_sim(v: Vec2) -> Vector<Real> {
    vector![v.x / PIXELS_PER_METER, v.y / PIXELS_PER_METER]
}

fn to_sim_point(v: Vec2) -> Point<Real> {
    point![v.x / PIXELS_PER_METER, v.y / PIXELS_PER_METER]
}

fn from_sim(v: Vector<Real>) -> Vec2 {
    Vec2::new(v.x * PIXELS_PER_METER, v.y * PIXELS_PER_METER)
}

fn dir_to_sim(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn dir_from_sim(v: Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_picks_closest_of_two() {
        let mut world = PhysicsWorld::new();
        let near = EntityId::new("ground", 0);
        let far = EntityId::new("ground", 1);
        // Two platforms straight down the ray at 250px and 500px.
        world.add_platform_body(near, Vec2::new(250.0, 0.0), Vec2::new(20.0, 200.0));
        world.add_platform_body(far, Vec2::new(500.0, 0.0), Vec2::new(20.0, 200.0));

        let hit = world
            .fire_ray(Vec2::ZERO, Vec2::new(1.0, 0.0), 1000.0, None)
            .unwrap();
        assert_eq!(hit.entity, Some(near));
        assert!((hit.distance - 240.0).abs() < 1.0, "distance {}", hit.distance);
        assert!(hit.normal.x < 0.0, "normal faces the shooter");
    }

    #[test]
    fn test_ray_miss_reports_full_range() {
        let mut world = PhysicsWorld::new();
        let hit = world
            .fire_ray(Vec2::ZERO, Vec2::new(0.0, -1.0), 800.0, None)
            .unwrap();
        assert_eq!(hit.entity, None);
        assert_eq!(hit.distance, 800.0);
    }

    #[test]
    fn test_zero_direction_is_rejected() {
        let mut world = PhysicsWorld::new();
        assert!(world.fire_ray(Vec2::ZERO, Vec2::ZERO, 500.0, None).is_none());
    }

    #[test]
    fn test_ray_excludes_shooter() {
        let mut world = PhysicsWorld::new();
        let shooter = EntityId::new("gunman", 0);
        let target = EntityId::new("gunman", 1);
        let shooter_body = world.add_player_body(shooter, Vec2::new(0.0, 0.0), Vec2::new(24.0, 48.0));
        world.add_player_body(target, Vec2::new(300.0, 0.0), Vec2::new(24.0, 48.0));

        let hit = world
            .fire_ray(Vec2::ZERO, Vec2::new(1.0, 0.0), 1000.0, Some(shooter_body))
            .unwrap();
        assert_eq!(hit.entity, Some(target));
    }

    #[test]
    fn test_fragile_contact_lands_in_hit_list() {
        let mut world = PhysicsWorld::new();
        let floor = EntityId::new("ground", 0);
        let gunman = EntityId::new("gunman", 0);
        let bottle = EntityId::new("bottle", 0);
        world.add_platform_body(floor, Vec2::new(0.0, 100.0), Vec2::new(400.0, 20.0));
        world.add_player_body(gunman, Vec2::new(0.0, 60.0), Vec2::new(28.0, 56.0));
        // Drop a bottle onto the gunman's head.
        world.add_fragile_body(bottle, Vec2::new(0.0, -40.0), Vec2::new(12.0, 18.0));

        let mut seen = Vec::new();
        for _ in 0..240 {
            world.step();
            seen.extend(world.drain_hits());
            if !seen.is_empty() {
                break;
            }
        }
        assert!(seen.contains(&bottle));
        // Settling onto the floor did not queue the gunman or floor.
        assert!(!seen.contains(&gunman));
        assert!(!seen.contains(&floor));
        // The drain cleared the accumulator.
        assert!(world.drain_hits().is_empty());
    }

    #[test]
    fn test_transform_sync_after_steps() {
        let mut world = PhysicsWorld::new();
        let id = EntityId::new("bottle", 1);
        let handle = world.add_fragile_body(id, Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        for _ in 0..30 {
            world.step();
        }
        let (pos, _rot) = world.body_transform(handle).unwrap();
        assert!(pos.y > 0.0, "gravity pulled the body down-screen");
    }

    #[test]
    fn test_remove_body_forgets_transform() {
        let mut world = PhysicsWorld::new();
        let id = EntityId::new("bottle", 2);
        let handle = world.add_fragile_body(id, Vec2::ZERO, Vec2::new(10.0, 10.0));
        world.remove_body(handle);
        assert!(world.body_transform(handle).is_none());
    }
}
