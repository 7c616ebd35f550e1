//! Listener bookkeeping.
//!
//! Every subscription the surface holds on a host entity is recorded here
//! so that registration is symmetric and can be checked: binding twice or
//! unbinding something never bound is reported instead of silently
//! corrupting the set of live subscriptions.

use std::collections::BTreeMap;

use super::Error;
use crate::model::EntityId;

/// The role of a subscription, i.e. what is refreshed when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Listener {
    /// Bus list structure & host focus.
    Mixer,
    /// A bus displayed on a grid column.
    Column,
    /// Structural changes of the focused bus.
    FocusedBus,
    /// State of the focused device.
    FocusedDevice,
    /// A parameter mapped to one or more knobs.
    Knob,
}

#[derive(Debug)]
struct Binding {
    refs: u32,
    shared: bool,
}

#[derive(Debug, Default)]
pub struct Registry {
    bindings: BTreeMap<(EntityId, Listener), Binding>,
    firing: Option<EntityId>,
}

impl Registry {
    fn check_reentrancy(&self, entity: EntityId) -> Result<(), Error> {
        if self.firing == Some(entity) {
            return Err(Error::ReentrantBinding(entity));
        }

        Ok(())
    }

    /// Binds `listener` to `entity`, which must not be bound yet.
    pub fn bind(&mut self, entity: EntityId, listener: Listener) -> Result<(), Error> {
        self.check_reentrancy(entity)?;

        if self.bindings.contains_key(&(entity, listener)) {
            return Err(Error::DuplicateBinding { entity, listener });
        }

        log::trace!("Binding {listener:?} to {entity}");
        self.bindings.insert(
            (entity, listener),
            Binding {
                refs: 1,
                shared: false,
            },
        );

        Ok(())
    }

    pub fn unbind(&mut self, entity: EntityId, listener: Listener) -> Result<(), Error> {
        self.check_reentrancy(entity)?;

        match self.bindings.get(&(entity, listener)) {
            Some(binding) if !binding.shared => {
                log::trace!("Unbinding {listener:?} from {entity}");
                self.bindings.remove(&(entity, listener));
                Ok(())
            }
            _ => Err(Error::UnknownBinding { entity, listener }),
        }
    }

    /// Adds a reference to a shared binding, subscribing on first reference.
    ///
    /// Returns `true` if the binding was created.
    pub fn acquire(&mut self, entity: EntityId, listener: Listener) -> Result<bool, Error> {
        self.check_reentrancy(entity)?;

        match self.bindings.get_mut(&(entity, listener)) {
            Some(binding) if binding.shared => {
                binding.refs += 1;
                Ok(false)
            }
            Some(_) => Err(Error::DuplicateBinding { entity, listener }),
            None => {
                log::trace!("Binding shared {listener:?} to {entity}");
                self.bindings.insert(
                    (entity, listener),
                    Binding {
                        refs: 1,
                        shared: true,
                    },
                );
                Ok(true)
            }
        }
    }

    /// Removes a reference to a shared binding, unsubscribing on last reference.
    ///
    /// Returns `true` if the binding was removed.
    pub fn release(&mut self, entity: EntityId, listener: Listener) -> Result<bool, Error> {
        self.check_reentrancy(entity)?;

        match self.bindings.get_mut(&(entity, listener)) {
            Some(binding) if binding.shared && binding.refs > 1 => {
                binding.refs -= 1;
                Ok(false)
            }
            Some(binding) if binding.shared => {
                log::trace!("Unbinding shared {listener:?} from {entity}");
                self.bindings.remove(&(entity, listener));
                Ok(true)
            }
            _ => Err(Error::UnknownBinding { entity, listener }),
        }
    }

    /// Removes every binding on `entity`, returning how many were removed.
    pub fn unbind_all(&mut self, entity: EntityId) -> Result<usize, Error> {
        self.check_reentrancy(entity)?;

        let before = self.bindings.len();
        self.bindings.retain(|(bound, _), _| *bound != entity);

        Ok(before - self.bindings.len())
    }

    pub fn is_bound(&self, entity: EntityId, listener: Listener) -> bool {
        self.bindings.contains_key(&(entity, listener))
    }

    pub fn refs(&self, entity: EntityId, listener: Listener) -> u32 {
        self.bindings
            .get(&(entity, listener))
            .map_or(0, |binding| binding.refs)
    }

    pub fn listeners(&self, entity: EntityId) -> Vec<Listener> {
        self.bindings
            .keys()
            .filter(|(bound, _)| *bound == entity)
            .map(|(_, listener)| *listener)
            .collect()
    }

    pub fn entities(&self) -> Vec<EntityId> {
        let mut entities: Vec<EntityId> = self.bindings.keys().map(|(entity, _)| *entity).collect();
        entities.dedup();
        entities
    }

    /// Number of live bindings, shared bindings counting once.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Marks `entity` as firing and returns its listeners.
    ///
    /// Until [`Registry::end_firing`], any attempt to rebind `entity` fails.
    pub fn begin_firing(&mut self, entity: EntityId) -> Vec<Listener> {
        debug_assert!(self.firing.is_none(), "nested firing on {entity}");
        self.firing = Some(entity);
        self.listeners(entity)
    }

    pub fn end_firing(&mut self) {
        self.firing = None;
    }
}
