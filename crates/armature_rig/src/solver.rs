//! Weighted multi-parent constraint solver.
//!
//! A multi parent element's parent space is a per-channel blend of the
//! global transforms of its contributing parents:
//!
//! ```text
//! global = blend(parents) * offset * pose
//! ```
//!
//! Location, rotation and scale are blended independently, so a channel may be
//! driven by a different set of parents than the others. A constraint
//! contributes to a channel when its weight on that channel is above
//! [`SMALL_NUMBER`]. Channels without contributors take the identity.
//!
//! Parent globals are provided by a callback so the solver stays independent
//! of the storage; each parent is evaluated at most once per solve.

use armature_core::{ElementWeight, SMALL_NUMBER, Transform, TransformType};
use glam::{Quat, Vec3, Vec4};

use crate::element::ParentConstraint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Location,
    Rotation,
    Scale,
}

impl Channel {
    #[inline]
    fn weight(self, weight: &ElementWeight) -> f32 {
        match self {
            Channel::Location => weight.location,
            Channel::Rotation => weight.rotation,
            Channel::Scale => weight.scale,
        }
    }
}

/// Contributors of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ChannelStats {
    pub count: usize,
    pub total_weight: f32,
    pub first: Option<usize>,
    pub second: Option<usize>,
}

impl ChannelStats {
    fn record(&mut self, constraint: usize, weight: f32) {
        if weight <= SMALL_NUMBER {
            return;
        }
        match self.count {
            0 => self.first = Some(constraint),
            1 => self.second = Some(constraint),
            _ => {}
        }
        self.count += 1;
        self.total_weight += weight;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct WeightStats {
    pub location: ChannelStats,
    pub rotation: ChannelStats,
    pub scale: ChannelStats,
}

impl WeightStats {
    fn channel(&self, channel: Channel) -> &ChannelStats {
        match channel {
            Channel::Location => &self.location,
            Channel::Rotation => &self.rotation,
            Channel::Scale => &self.scale,
        }
    }

    /// The constraint that alone drives all three channels, if any.
    pub fn single_contributor(&self) -> Option<usize> {
        if self.location.count == 1 && self.rotation.count == 1 && self.scale.count == 1 {
            let first = self.location.first;
            if first == self.rotation.first && first == self.scale.first {
                return first;
            }
        }
        None
    }
}

/// Scans the constraints once for the weights of `initial` or current pose and
/// resets the per-solve parent memo.
pub(crate) fn compute_weight_stats(constraints: &mut [ParentConstraint], initial: bool) -> WeightStats {
    let mut stats = WeightStats::default();
    for (i, constraint) in constraints.iter_mut().enumerate() {
        constraint.cache_is_dirty = true;
        let weight = constraint.weight_for(initial);
        stats.location.record(i, weight.location);
        stats.rotation.record(i, weight.rotation);
        stats.scale.record(i, weight.scale);
    }
    stats
}

fn resolve_parent<F>(constraint: &mut ParentConstraint, ty: TransformType, parent_global: &mut F) -> Transform
where
    F: FnMut(usize, TransformType) -> Transform,
{
    if constraint.cache_is_dirty {
        constraint.cached_global_transform = parent_global(constraint.parent, ty.make_global());
        constraint.cache_is_dirty = false;
    }
    constraint.cached_global_transform
}

/// Computes a global transform from weighted parents.
///
/// `local_offset` and `local_pose` are appended after the blended parent
/// space when their `apply_*` flag is set.
pub fn solve<F>(
    constraints: &mut [ParentConstraint],
    ty: TransformType,
    local_offset: &Transform,
    apply_offset: bool,
    local_pose: &Transform,
    apply_pose: bool,
    parent_global: &mut F,
) -> Transform
where
    F: FnMut(usize, TransformType) -> Transform,
{
    let stats = compute_weight_stats(constraints, ty.is_initial());
    let offset = if apply_offset { *local_offset } else { Transform::IDENTITY };
    let pose = if apply_pose { *local_pose } else { Transform::IDENTITY };

    if let Some(single) = stats.single_contributor() {
        let parent = resolve_parent(&mut constraints[single], ty, parent_global);
        return (parent * offset * pose).normalized();
    }

    let space = blend_parents(constraints, &stats, ty, parent_global);
    (space * offset * pose).normalized()
}

/// Recovers the local pose that [`solve`] maps to `global`.
///
/// `global` is expressed relative to the blended parent space followed by
/// `local_offset`.
pub fn inverse_solve<F>(
    global: &Transform,
    constraints: &mut [ParentConstraint],
    ty: TransformType,
    local_offset: &Transform,
    parent_global: &mut F,
) -> Transform
where
    F: FnMut(usize, TransformType) -> Transform,
{
    let stats = compute_weight_stats(constraints, ty.is_initial());

    if let Some(single) = stats.single_contributor() {
        let parent = resolve_parent(&mut constraints[single], ty, parent_global);
        return global.relative_to(&(parent * *local_offset)).normalized();
    }

    let space = blend_parents(constraints, &stats, ty, parent_global);
    global.relative_to(&(space * *local_offset)).normalized()
}

/// Blends the contributing parent globals channel by channel.
fn blend_parents<F>(
    constraints: &mut [ParentConstraint],
    stats: &WeightStats,
    ty: TransformType,
    parent_global: &mut F,
) -> Transform
where
    F: FnMut(usize, TransformType) -> Transform,
{
    let initial = ty.is_initial();

    let translation = blend_vec3(constraints, stats, Channel::Location, ty, parent_global, |t| t.translation)
        .unwrap_or(Vec3::ZERO);
    let scale = blend_vec3(constraints, stats, Channel::Scale, ty, parent_global, |t| t.scale)
        .unwrap_or(Vec3::ONE);

    let rotation = {
        let channel = stats.channel(Channel::Rotation);
        match (channel.count, channel.first, channel.second) {
            (0, ..) => Quat::IDENTITY,
            (1, Some(a), _) => resolve_parent(&mut constraints[a], ty, parent_global).rotation,
            (2, Some(a), Some(b)) => {
                let wa = constraints[a].weight_for(initial).rotation;
                let wb = constraints[b].weight_for(initial).rotation;
                let qa = resolve_parent(&mut constraints[a], ty, parent_global).rotation;
                let qb = resolve_parent(&mut constraints[b], ty, parent_global).rotation;
                qa.slerp(qb, wb / (wa + wb))
            }
            _ => {
                let mut sum = Vec4::ZERO;
                let mut reference: Option<Vec4> = None;
                for constraint in constraints.iter_mut() {
                    let weight = constraint.weight_for(initial).rotation;
                    if weight <= SMALL_NUMBER {
                        continue;
                    }
                    let q = Vec4::from(resolve_parent(constraint, ty, parent_global).rotation);
                    let q = match reference {
                        None => {
                            reference = Some(q);
                            q
                        }
                        Some(first) if first.dot(q) < 0.0 => -q,
                        Some(_) => q,
                    };
                    sum += q * weight;
                }
                if sum.length_squared() > SMALL_NUMBER {
                    Quat::from_vec4(sum).normalize()
                } else {
                    Quat::IDENTITY
                }
            }
        }
    };

    Transform::new(translation, rotation, scale)
}

fn blend_vec3<F>(
    constraints: &mut [ParentConstraint],
    stats: &WeightStats,
    channel: Channel,
    ty: TransformType,
    parent_global: &mut F,
    extract: impl Fn(&Transform) -> Vec3,
) -> Option<Vec3>
where
    F: FnMut(usize, TransformType) -> Transform,
{
    let initial = ty.is_initial();
    let channel_stats = stats.channel(channel);

    match (channel_stats.count, channel_stats.first, channel_stats.second) {
        (0, ..) => None,
        (1, Some(a), _) => Some(extract(&resolve_parent(&mut constraints[a], ty, parent_global))),
        (2, Some(a), Some(b)) => {
            let wa = channel.weight(&constraints[a].weight_for(initial));
            let wb = channel.weight(&constraints[b].weight_for(initial));
            let va = extract(&resolve_parent(&mut constraints[a], ty, parent_global));
            let vb = extract(&resolve_parent(&mut constraints[b], ty, parent_global));
            Some(va.lerp(vb, wb / (wa + wb)))
        }
        _ => {
            let mut sum = Vec3::ZERO;
            for constraint in constraints.iter_mut() {
                let weight = channel.weight(&constraint.weight_for(initial));
                if weight <= SMALL_NUMBER {
                    continue;
                }
                sum += extract(&resolve_parent(constraint, ty, parent_global)) * weight;
            }
            Some(sum / channel_stats.total_weight)
        }
    }
}
