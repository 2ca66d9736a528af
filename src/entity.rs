use crate::{canvas::Canvas, math::Rect};

/// A movable, drawable game object owned by the game's entity list.
///
/// Entities are mutated only during the update phase and read only during
/// the draw phase. An entity may request its own removal through the
/// [FrameContext]; the removal is applied after the update pass completes.
pub trait Entity {
    fn update(&mut self, delta_ms: f64, ctx: &mut FrameContext);
    fn draw(&self, canvas: &mut Canvas);
}

/// Stable handle into the entity arena. A removed entity's slot may be
/// reused, but the generation makes stale ids harmless.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityId {
    index: usize,
    generation: u32,
}

/// Per-update-pass state handed to each entity: the window rectangle and
/// the deferred-despawn queue.
pub struct FrameContext {
    /// Cached window rectangle the entities bounce inside.
    pub bounds: Rect,
    current: EntityId,
    despawns: Vec<EntityId>,
}

impl FrameContext {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            current: EntityId {
                index: 0,
                generation: 0,
            },
            despawns: Vec::new(),
        }
    }

    /// The id of the entity currently being updated.
    pub fn current(&self) -> EntityId {
        self.current
    }

    /// Queue any entity for removal once the update pass finishes.
    pub fn despawn(&mut self, id: EntityId) {
        self.despawns.push(id);
    }

    /// Queue the entity currently being updated for removal.
    pub fn despawn_self(&mut self) {
        self.despawns.push(self.current);
    }

    /// Ids queued for removal so far this pass.
    pub fn pending_despawns(&self) -> &[EntityId] {
        &self.despawns
    }
}

struct Slot {
    generation: u32,
    entity: Option<Box<dyn Entity>>,
}

/// Arena of owned entities with stable ids and deferred removal.
///
/// The collection's structure is never mutated while an update or draw
/// iteration is in progress; despawn requests collected during
/// [Entities::update_all] are applied in a compaction step afterwards.
#[derive(Default)]
pub struct Entities {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `entity` and return its id.
    pub fn add(&mut self, entity: Box<dyn Entity>) -> EntityId {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.entity = Some(entity);
            EntityId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                entity: Some(entity),
            });
            EntityId {
                index: self.slots.len() - 1,
                generation: 0,
            }
        }
    }

    /// Remove and return the entity behind `id`; [None] for stale ids.
    pub fn remove(&mut self, id: EntityId) -> Option<Box<dyn Entity>> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation || slot.entity.is_none() {
            return None;
        }

        let entity = slot.entity.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;

        entity
    }

    pub fn get(&self, id: EntityId) -> Option<&dyn Entity> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entity.as_deref()
    }

    // `+ 'static` spelled out: unlike `get`, the mutable reference is
    // invariant over the trait object's lifetime.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut (dyn Entity + 'static)> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entity.as_deref_mut()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Drop every entity. Outstanding ids are invalidated, not recycled:
    /// the slots stay and their generations are bumped.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entity.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(index);
        }
        self.live = 0;
    }

    /// Update every live entity in slot order, then apply the despawns the
    /// pass requested.
    pub fn update_all(&mut self, delta_ms: f64, bounds: Rect) {
        let mut ctx = FrameContext::new(bounds);

        for index in 0..self.slots.len() {
            let generation = self.slots[index].generation;
            if let Some(entity) = self.slots[index].entity.as_deref_mut() {
                ctx.current = EntityId { index, generation };
                entity.update(delta_ms, &mut ctx);
            }
        }

        for id in ctx.despawns {
            self.remove(id);
        }
    }

    /// Draw every live entity in slot order.
    pub fn draw_all(&self, canvas: &mut Canvas) {
        for slot in &self.slots {
            if let Some(entity) = slot.entity.as_deref() {
                entity.draw(canvas);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, rc::Rc};

    struct Probe {
        updates: Rc<Cell<u32>>,
        despawn_after: Option<u32>,
        seen: u32,
    }

    impl Probe {
        fn new(updates: Rc<Cell<u32>>) -> Self {
            Self {
                updates,
                despawn_after: None,
                seen: 0,
            }
        }

        fn despawning_after(updates: Rc<Cell<u32>>, count: u32) -> Self {
            Self {
                updates,
                despawn_after: Some(count),
                seen: 0,
            }
        }
    }

    impl Entity for Probe {
        fn update(&mut self, _delta_ms: f64, ctx: &mut FrameContext) {
            self.updates.set(self.updates.get() + 1);
            self.seen += 1;
            if Some(self.seen) == self.despawn_after {
                ctx.despawn_self();
            }
        }

        fn draw(&self, _canvas: &mut Canvas) {}
    }

    fn bounds() -> Rect {
        Rect::with_size(640, 480)
    }

    #[test]
    fn add_remove_round_trip() {
        let counter = Rc::new(Cell::new(0));
        let mut entities = Entities::new();

        let id = entities.add(Box::new(Probe::new(counter.clone())));
        assert_eq!(entities.len(), 1);
        assert!(entities.contains(id));

        assert!(entities.remove(id).is_some());
        assert_eq!(entities.len(), 0);
        assert!(!entities.contains(id));
        // second removal of the same id is a no-op
        assert!(entities.remove(id).is_none());
    }

    #[test]
    fn stale_id_does_not_reach_reused_slot() {
        let counter = Rc::new(Cell::new(0));
        let mut entities = Entities::new();

        let first = entities.add(Box::new(Probe::new(counter.clone())));
        entities.remove(first);
        let second = entities.add(Box::new(Probe::new(counter.clone())));

        assert!(entities.get(first).is_none());
        assert!(entities.get(second).is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn update_all_visits_every_live_entity_once() {
        let counter = Rc::new(Cell::new(0));
        let mut entities = Entities::new();
        for _ in 0..5 {
            entities.add(Box::new(Probe::new(counter.clone())));
        }

        entities.update_all(16.0, bounds());
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn self_despawn_is_deferred_to_end_of_pass() {
        let counter = Rc::new(Cell::new(0));
        let mut entities = Entities::new();

        entities.add(Box::new(Probe::despawning_after(counter.clone(), 1)));
        entities.add(Box::new(Probe::new(counter.clone())));
        entities.add(Box::new(Probe::new(counter.clone())));

        entities.update_all(16.0, bounds());
        // all three still ran this pass, including the self-despawner
        assert_eq!(counter.get(), 3);
        assert_eq!(entities.len(), 2);

        entities.update_all(16.0, bounds());
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn get_mut_reaches_live_entity_only() {
        let counter = Rc::new(Cell::new(0));
        let mut entities = Entities::new();
        let id = entities.add(Box::new(Probe::new(counter.clone())));

        let mut ctx = FrameContext::new(bounds());
        entities.get_mut(id).unwrap().update(16.0, &mut ctx);
        assert_eq!(counter.get(), 1);

        let out_of_range = EntityId {
            index: 99,
            generation: 0,
        };
        assert!(entities.get_mut(out_of_range).is_none());
    }

    #[test]
    fn clear_invalidates_outstanding_ids() {
        let counter = Rc::new(Cell::new(0));
        let mut entities = Entities::new();
        let before = entities.add(Box::new(Probe::new(counter.clone())));

        entities.clear();
        let after = entities.add(Box::new(Probe::new(counter.clone())));

        // the pre-clear id must not alias whatever reused its slot
        assert!(entities.get(before).is_none());
        assert!(entities.get(after).is_some());
        assert_ne!(before, after);
    }

    #[test]
    fn clear_drops_everything() {
        let counter = Rc::new(Cell::new(0));
        let mut entities = Entities::new();
        entities.add(Box::new(Probe::new(counter.clone())));
        entities.add(Box::new(Probe::new(counter.clone())));

        entities.clear();
        assert!(entities.is_empty());

        entities.update_all(16.0, bounds());
        assert_eq!(counter.get(), 0);
    }
}
