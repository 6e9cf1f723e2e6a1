//! Scene graph and hierarchical scene organization.
//!
//! Entities live in a [`Scene`] arena and refer to each other through
//! [`EntityId`]s. Every entity has at most one parent; an entity without a
//! parent is a root. Roots, children and components all keep their insertion
//! order, which is also the order in which they are updated and rendered.

use slotmap::SlotMap;

use crate::{
    data_structures::{
        component::{Component, ComponentKind, MeshComponent},
        model::Material,
    },
    error::SceneError,
    math::{Matrix, Vector3f},
};

slotmap::new_key_type! {
    /// Handle of an entity in a [`Scene`].
    pub struct EntityId;
}

/// Position, Euler rotation in radians and scale of an entity relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3f,
    pub rotation: Vector3f,
    pub scale: Vector3f,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3f::new(0.0, 0.0, 0.0),
            rotation: Vector3f::new(0.0, 0.0, 0.0),
            scale: Vector3f::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn from_position(position: Vector3f) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Local model matrix.
    pub fn matrix(&self) -> Matrix {
        Matrix::model(self.position, self.rotation, self.scale)
    }
}

#[derive(Debug, Default)]
pub struct Entity {
    pub name: String,
    pub transform: Transform,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    components: Vec<Component>,
}

impl Entity {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn add_component(&mut self, component: Component) {
        self.components.push(component);
    }

    /// Removes the first component of `kind`.
    pub fn remove_component(&mut self, kind: ComponentKind) -> Option<Component> {
        let index = self.components.iter().position(|c| c.kind() == kind)?;
        Some(self.components.remove(index))
    }

    /// First component of `kind`.
    pub fn get_component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.iter().find(|c| c.kind() == kind)
    }

    pub fn get_component_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.kind() == kind)
    }

    pub fn has_component(&self, kind: ComponentKind) -> bool {
        self.get_component(kind).is_some()
    }

    pub fn mesh(&self) -> Option<&MeshComponent> {
        match self.get_component(ComponentKind::Mesh)? {
            Component::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn material(&self) -> Option<&Material> {
        match self.get_component(ComponentKind::Material)? {
            Component::Material(material) => Some(&material.material),
            _ => None,
        }
    }

    /// Update every component in insertion order.
    fn update_components(&mut self, dt: f32) {
        let Entity {
            transform,
            components,
            ..
        } = self;
        for component in components.iter_mut() {
            component.update(transform, dt);
        }
    }
}

/// Arena of entities forming a forest.
#[derive(Debug, Default)]
pub struct Scene {
    entities: SlotMap<EntityId, Entity>,
    roots: Vec<EntityId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entity` as a new root. Hierarchy links already set on it are discarded.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        entity.parent = None;
        entity.children.clear();
        let id = self.entities.insert(entity);
        self.roots.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    pub fn parent_of(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(id)?.parent
    }

    pub fn children_of(&self, id: EntityId) -> &[EntityId] {
        self.entities.get(id).map_or(&[], |e| e.children())
    }

    pub fn add_component(&mut self, id: EntityId, component: Component) -> Result<(), SceneError> {
        self.entities
            .get_mut(id)
            .ok_or(SceneError::UnknownEntity)?
            .add_component(component);
        Ok(())
    }

    pub fn remove_component(&mut self, id: EntityId, kind: ComponentKind) -> Option<Component> {
        self.entities.get_mut(id)?.remove_component(kind)
    }

    /// True if `ancestor` is `id` itself or any entity above it.
    fn is_ancestor_or_self(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.entities.get(node).and_then(|e| e.parent);
        }
        false
    }

    /// Unlink `id` from its parent (or the root list). `id` must exist.
    fn detach(&mut self, id: EntityId) {
        match self.entities[id].parent.take() {
            Some(parent) => {
                if let Some(parent) = self.entities.get_mut(parent) {
                    parent.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
    }

    /// Make `child` the last child of `parent`, moving it away from its previous parent.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<(), SceneError> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(SceneError::UnknownEntity);
        }
        if parent == child {
            return Err(SceneError::SelfParent);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::Cycle);
        }
        self.detach(child);
        self.entities[child].parent = Some(parent);
        self.entities[parent].children.push(child);
        Ok(())
    }

    /// Turn `child` back into a root. Returns false if it was not a child of `parent`.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        match self.entities.get(child) {
            Some(entity) if entity.parent == Some(parent) => {
                self.detach(child);
                self.roots.push(child);
                true
            }
            _ => false,
        }
    }

    /// Remove one entity. Its children become roots.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        if !self.contains(id) {
            return None;
        }
        self.detach(id);
        let mut entity = self.entities.remove(id)?;
        for child in entity.children.drain(..) {
            if let Some(child_entity) = self.entities.get_mut(child) {
                child_entity.parent = None;
                self.roots.push(child);
            }
        }
        Some(entity)
    }

    /// Remove an entity with its whole subtree. Returns the number of removed entities.
    pub fn despawn_recursive(&mut self, id: EntityId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        self.detach(id);
        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(entity) = self.entities.remove(next) {
                stack.extend(entity.children);
                removed += 1;
            }
        }
        removed
    }

    /// Depth-first update of the subtree at `id`: the entity's components
    /// first, then each child subtree in insertion order.
    pub fn update(&mut self, id: EntityId, dt: f32) -> Result<(), SceneError> {
        let entity = self.entities.get_mut(id).ok_or(SceneError::UnknownEntity)?;
        entity.update_components(dt);
        let children = entity.children.clone();
        for child in children {
            self.update(child, dt)?;
        }
        Ok(())
    }

    /// Update all roots in insertion order.
    pub fn update_all(&mut self, dt: f32) {
        let roots = self.roots.clone();
        for root in roots {
            if let Err(err) = self.update(root, dt) {
                log::warn!("Skipping update of {:?}: {}", root, err);
            }
        }
    }

    /// Parent world matrix multiplied by the local matrix.
    pub fn world_matrix(&self, id: EntityId) -> Option<Matrix> {
        let mut matrix = self.entities.get(id)?.transform.matrix();
        let mut current = self.entities.get(id)?.parent;
        while let Some(parent) = current {
            let parent = self.entities.get(parent)?;
            matrix = parent.transform.matrix() * matrix;
            current = parent.parent;
        }
        Some(matrix)
    }

    /// All entities in update order, each with the world matrix of its parent.
    pub fn iter_depth_first(&self) -> DepthFirst<'_> {
        let stack = self
            .roots
            .iter()
            .rev()
            .map(|id| (*id, Matrix::identity()))
            .collect();
        DepthFirst { scene: self, stack }
    }
}

/// Iterator returned by [`Scene::iter_depth_first`].
pub struct DepthFirst<'a> {
    scene: &'a Scene,
    stack: Vec<(EntityId, Matrix)>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (EntityId, &'a Entity, Matrix);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, parent_world) = self.stack.pop()?;
            let Some(entity) = self.scene.entities.get(id) else {
                continue;
            };
            let world = parent_world * entity.transform.matrix();
            self.stack
                .extend(entity.children.iter().rev().map(|child| (*child, world)));
            return Some((id, entity, parent_world));
        }
    }
}
