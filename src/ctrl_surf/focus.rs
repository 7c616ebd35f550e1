//! Tracks the bus & device the surface currently displays.

use super::{
    registry::{Listener, Registry},
    Error,
};
use crate::model::{Bus, BusId, Change, DeviceId, DeviceKind, EntityId, Host};

/// Marks an entity as being displayed by the surface.
///
/// Only a [`FocusCursor`] can acquire or release one, which guarantees that
/// increments & decrements of the host attention count are paired.
#[must_use]
#[derive(Debug)]
pub struct AttentionToken {
    entity: Option<EntityId>,
}

impl AttentionToken {
    fn acquire(host: &mut dyn Host, entity: EntityId) -> Self {
        host.add_attention(entity);
        Self {
            entity: Some(entity),
        }
    }

    fn release(mut self, host: &mut dyn Host) -> Result<(), Error> {
        match self.entity.take() {
            Some(entity) if !host.remove_attention(entity) => {
                Err(Error::AttentionUnderflow(entity))
            }
            _ => Ok(()),
        }
    }
}

impl Drop for AttentionToken {
    fn drop(&mut self) {
        if let Some(entity) = self.entity {
            log::error!("Attention token on {entity} dropped without being released");
        }
    }
}

/// Holds at most one entity along with its attention token.
#[derive(Debug)]
pub struct FocusCursor<T> {
    cur: Option<(T, AttentionToken)>,
}

impl<T> Default for FocusCursor<T> {
    fn default() -> Self {
        Self { cur: None }
    }
}

impl<T: Copy + PartialEq + Into<EntityId>> FocusCursor<T> {
    pub fn get(&self) -> Option<T> {
        self.cur.as_ref().map(|(target, _)| *target)
    }

    /// Moves the cursor, releasing the previous entity first.
    ///
    /// Returns `false` if `target` was already the current entity.
    pub fn set(&mut self, host: &mut dyn Host, target: Option<T>) -> bool {
        if self.get() == target {
            return false;
        }

        self.release(host);
        self.cur = target.map(|target| (target, AttentionToken::acquire(host, target.into())));

        true
    }

    pub fn release(&mut self, host: &mut dyn Host) {
        if let Some((_, token)) = self.cur.take() {
            if let Err(err) = token.release(host) {
                err.report();
            }
        }
    }
}

/// Outcome of a focus change, to be notified exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Focused {
    pub bus: Option<BusId>,
    pub device: Option<DeviceId>,
}

#[derive(Debug, Default)]
pub struct FocusTracker {
    bus: FocusCursor<BusId>,
    device: FocusCursor<DeviceId>,
}

fn report(res: Result<(), Error>) {
    if let Err(err) = res {
        err.report();
    }
}

impl FocusTracker {
    pub fn bus(&self) -> Option<BusId> {
        self.bus.get()
    }

    pub fn device(&self) -> Option<DeviceId> {
        self.device.get()
    }

    fn focused(&self) -> Focused {
        Focused {
            bus: self.bus.get(),
            device: self.device.get(),
        }
    }

    /// The device selected when a bus gets focus.
    pub fn default_device(bus: &Bus) -> Option<DeviceId> {
        bus.focused_pattern().or_else(|| bus.effects.first().copied())
    }

    /// Re-derives the focused bus from the host focus state.
    pub fn refresh(&mut self, host: &mut dyn Host, registry: &mut Registry) -> Option<Focused> {
        let index = host.focus().effective_index();
        let target = host.bus_or_master(index).map(|bus| bus.id);

        if target == self.bus.get() {
            return None;
        }

        log::debug!("Focusing bus {target:?} at index {index}");

        self.set_device(host, registry, None);

        if let Some(prev) = self.bus.get() {
            report(registry.unbind(prev.into(), Listener::FocusedBus));
        }
        self.bus.set(host, target);
        if let Some(bus) = target {
            report(registry.bind(bus.into(), Listener::FocusedBus));
        }

        let device = target
            .and_then(|bus| host.bus(bus))
            .and_then(Self::default_device);
        self.set_device(host, registry, device);

        Some(self.focused())
    }

    fn set_device(
        &mut self,
        host: &mut dyn Host,
        registry: &mut Registry,
        device: Option<DeviceId>,
    ) -> bool {
        let prev = self.device.get();
        if !self.device.set(host, device) {
            return false;
        }

        if let Some(prev) = prev {
            report(registry.unbind(prev.into(), Listener::FocusedDevice));
        }
        if let Some(device) = device {
            report(registry.bind(device.into(), Listener::FocusedDevice));
        }

        true
    }

    /// Focuses `device` if it belongs to the focused bus.
    pub fn select_device(
        &mut self,
        host: &mut dyn Host,
        registry: &mut Registry,
        device: Option<DeviceId>,
    ) -> Option<Focused> {
        if let Some(device) = device {
            let bus = host.device(device)?.bus;
            if Some(bus) != self.bus.get() {
                return None;
            }
        }

        self.set_device(host, registry, device)
            .then(|| self.focused())
    }

    fn step_device(
        &mut self,
        host: &mut dyn Host,
        registry: &mut Registry,
        forward: bool,
    ) -> Option<Focused> {
        let seq = host.bus(self.bus.get()?)?.device_sequence();

        let target = match self.device.get() {
            Some(cur) => {
                let pos = seq.iter().position(|device| *device == cur)?;
                if forward {
                    seq.get(pos + 1).copied()?
                } else {
                    seq.get(pos.checked_sub(1)?).copied()?
                }
            }
            None if forward => seq.first().copied()?,
            None => return None,
        };

        self.select_device(host, registry, Some(target))
    }

    /// Moves within `[focused pattern, effect0, effect1, ...]`, no wrapping.
    pub fn previous_device(&mut self, host: &mut dyn Host, registry: &mut Registry) -> Option<Focused> {
        self.step_device(host, registry, false)
    }

    pub fn next_device(&mut self, host: &mut dyn Host, registry: &mut Registry) -> Option<Focused> {
        self.step_device(host, registry, true)
    }

    /// Handles a structural change of the focused bus.
    pub fn bus_changed(
        &mut self,
        host: &mut dyn Host,
        registry: &mut Registry,
        change: Change,
    ) -> Option<Focused> {
        use Change::*;

        let bus = host.bus(self.bus.get()?)?;
        let cur = self.device.get();

        let target = match change {
            PatternRemoved { device, .. } | EffectRemoved { device, .. } if Some(device) == cur => {
                log::debug!("Focused device #{} removed", device.0);
                Self::default_device(bus)
            }
            PatternAdded { .. } | EffectAdded { .. } if cur.is_none() => Self::default_device(bus),
            Patterns(_) => {
                let is_pattern = cur
                    .and_then(|device| host.device(device))
                    .map_or(false, |device| matches!(device.kind, DeviceKind::Pattern { .. }));
                if !is_pattern {
                    return None;
                }
                bus.focused_pattern()
            }
            _ => return None,
        };

        self.set_device(host, registry, target)
            .then(|| self.focused())
    }

    /// Releases every attention token & binding held by the tracker.
    pub fn release(&mut self, host: &mut dyn Host, registry: &mut Registry) {
        self.set_device(host, registry, None);

        if let Some(bus) = self.bus.get() {
            report(registry.unbind(bus.into(), Listener::FocusedBus));
        }
        self.bus.release(host);
    }
}
