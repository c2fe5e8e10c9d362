use armature_core::{
    ElementKey, ElementType, ElementWeight, Symbol, Transform, TransformAspect, TransformType,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Indices of the four cached variants of one transform, plus their dirty flags.
///
/// Both arrays are indexed by [`TransformType::index`] and point into the
/// hierarchy's shared arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSlots {
    pub(crate) transforms: [usize; 4],
    pub(crate) dirty: [usize; 4],
}

impl TransformSlots {
    #[inline]
    #[must_use]
    pub fn transform_slot(&self, ty: TransformType) -> usize {
        self.transforms[ty.index()]
    }

    #[inline]
    #[must_use]
    pub fn dirty_slot(&self, ty: TransformType) -> usize {
        self.dirty[ty.index()]
    }
}

/// A weighted link from a multi parent element to one of its parents.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentConstraint {
    /// Index of the parent element. A relation, never ownership.
    pub parent: usize,
    pub weight: ElementWeight,
    pub initial_weight: ElementWeight,
    pub display_label: Option<Symbol>,
    /// Parent global memoized for the duration of one solve.
    pub(crate) cached_global_transform: Transform,
    pub(crate) cache_is_dirty: bool,
}

impl ParentConstraint {
    #[must_use]
    pub fn new(parent: usize, weight: ElementWeight) -> Self {
        Self {
            parent,
            weight,
            initial_weight: weight,
            display_label: None,
            cached_global_transform: Transform::IDENTITY,
            cache_is_dirty: true,
        }
    }

    /// Weight used when evaluating the initial or the current pose.
    #[inline]
    #[must_use]
    pub fn weight_for(&self, initial: bool) -> ElementWeight {
        if initial {
            self.initial_weight
        } else {
            self.weight
        }
    }

    #[inline]
    pub(crate) fn weight_for_mut(&mut self, initial: bool) -> &mut ElementWeight {
        if initial {
            &mut self.initial_weight
        } else {
            &mut self.weight
        }
    }
}

/// Ordered parent constraints of a null or a control.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiParent {
    pub(crate) constraints: SmallVec<[ParentConstraint; 2]>,
    /// Parent key to constraint index.
    pub(crate) index_lookup: FxHashMap<ElementKey, usize>,
}

impl MultiParent {
    #[inline]
    #[must_use]
    pub fn constraints(&self) -> &[ParentConstraint] {
        &self.constraints
    }

    #[must_use]
    pub fn constraint_index(&self, parent: &ElementKey) -> Option<usize> {
        self.index_lookup.get(parent).copied()
    }
}

/// Parent relationship of an element. An element is exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentModel {
    /// Curves and connectors: no parent, no dependents.
    None,
    /// Bones, references and sockets.
    Single(Option<usize>),
    /// Nulls and controls.
    Multi(MultiParent),
}

impl ParentModel {
    /// Every parent index, in constraint order, regardless of weight.
    pub fn parent_indices(&self) -> SmallVec<[usize; 2]> {
        match self {
            ParentModel::None | ParentModel::Single(None) => SmallVec::new(),
            ParentModel::Single(Some(parent)) => smallvec::smallvec![*parent],
            ParentModel::Multi(multi) => multi.constraints.iter().map(|c| c.parent).collect(),
        }
    }

    #[must_use]
    pub fn as_multi(&self) -> Option<&MultiParent> {
        match self {
            ParentModel::Multi(multi) => Some(multi),
            _ => None,
        }
    }

    pub(crate) fn as_multi_mut(&mut self) -> Option<&mut MultiParent> {
        match self {
            ParentModel::Multi(multi) => Some(multi),
            _ => None,
        }
    }
}

/// Control-only settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlSettings {
    pub display_name: Option<String>,
    /// When set, the control may only switch between parents it already has.
    pub restrict_space_switching: bool,
}

/// Additional transforms carried by a control.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlAspects {
    pub(crate) offset: TransformSlots,
    pub(crate) shape: TransformSlots,
    pub settings: ControlSettings,
}

/// Scalar value of a curve element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CurveValue {
    pub value: f32,
    /// False until the value is written explicitly.
    pub is_set: bool,
}

/// A node of the rig hierarchy.
///
/// # Identity
///
/// - `key`: (type, name), unique within the hierarchy
/// - `index`: position in the hierarchy's element array, shifts on removal
/// - `sub_index`: position among the elements of the same type
///
/// # Capabilities
///
/// Which optional parts are present is fixed by the element type:
///
/// | Type                       | Parents  | Pose | Offset / Shape | Curve |
/// |----------------------------|----------|------|----------------|-------|
/// | Bone, Reference, Socket    | single   | yes  |                |       |
/// | Null                       | multi    | yes  |                |       |
/// | Control                    | multi    | yes  | yes            |       |
/// | Curve                      |          |      |                | yes   |
/// | Connector                  |          |      |                |       |
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub(crate) key: ElementKey,
    pub(crate) index: usize,
    pub(crate) sub_index: usize,
    pub(crate) parents: ParentModel,
    pub(crate) pose: Option<TransformSlots>,
    pub(crate) control: Option<ControlAspects>,
    pub(crate) curve: Option<CurveValue>,
    /// Elements that read this element's global transform: the transpose of
    /// the parent links, one entry per referencing constraint.
    pub(crate) elements_to_dirty: SmallVec<[usize; 4]>,
}

impl Element {
    pub(crate) fn new(key: ElementKey, index: usize, sub_index: usize) -> Self {
        let parents = if key.ty.is_single_parent() {
            ParentModel::Single(None)
        } else if key.ty.is_multi_parent() {
            ParentModel::Multi(MultiParent::default())
        } else {
            ParentModel::None
        };

        Self {
            key,
            index,
            sub_index,
            parents,
            pose: None,
            control: None,
            curve: (key.ty == ElementType::Curve).then(CurveValue::default),
            elements_to_dirty: SmallVec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> ElementKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    #[must_use]
    pub fn sub_index(&self) -> usize {
        self.sub_index
    }

    #[inline]
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.key.ty
    }

    #[inline]
    #[must_use]
    pub fn parents(&self) -> &ParentModel {
        &self.parents
    }

    #[inline]
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.control.is_some()
    }

    #[inline]
    #[must_use]
    pub fn control_settings(&self) -> Option<&ControlSettings> {
        self.control.as_ref().map(|c| &c.settings)
    }

    /// Slots of the requested aspect, if this element carries it.
    #[must_use]
    pub fn slots(&self, aspect: TransformAspect) -> Option<TransformSlots> {
        match aspect {
            TransformAspect::Pose => self.pose,
            TransformAspect::Offset => self.control.as_ref().map(|c| c.offset),
            TransformAspect::Shape => self.control.as_ref().map(|c| c.shape),
        }
    }

    /// Every slot set of this element, with its aspect.
    pub(crate) fn all_slots(&self) -> SmallVec<[(TransformAspect, TransformSlots); 3]> {
        let mut out = SmallVec::new();
        if let Some(pose) = self.pose {
            out.push((TransformAspect::Pose, pose));
        }
        if let Some(control) = &self.control {
            out.push((TransformAspect::Offset, control.offset));
            out.push((TransformAspect::Shape, control.shape));
        }
        out
    }

    pub(crate) fn all_slots_mut(&mut self) -> SmallVec<[&mut TransformSlots; 3]> {
        let mut out = SmallVec::new();
        if let Some(pose) = self.pose.as_mut() {
            out.push(pose);
        }
        if let Some(control) = self.control.as_mut() {
            out.push(&mut control.offset);
            out.push(&mut control.shape);
        }
        out
    }
}
