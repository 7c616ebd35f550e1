use std::collections::BTreeMap;

use super::*;

/// In-memory host mixer.
///
/// Drives the surface in the standalone binary and in tests: structural
/// operations mimic what the host application would do on its own, while
/// [`Command`]s are what the surface requests.
#[derive(Debug)]
pub struct Mixer {
    buses: Vec<Bus>,
    master: Bus,
    devices: BTreeMap<DeviceId, Device>,
    params: BTreeMap<ParamId, Parameter>,
    focus: Focus,
    focused_clip: Option<DeviceId>,
    attention: BTreeMap<EntityId, u32>,
    transport: Vec<Transport>,
    changes: Vec<Change>,
    next_id: u32,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            buses: Vec::new(),
            master: Bus {
                id: BusId(0),
                index: 0,
                kind: BusKind::Master,
                flags: BusFlags::ENABLED,
                crossfade: CrossfadeGroup::Bypass,
                level: 1f64,
                effects: Vec::new(),
                clips: Vec::new(),
            },
            devices: BTreeMap::new(),
            params: BTreeMap::new(),
            focus: Focus::default(),
            focused_clip: None,
            attention: BTreeMap::new(),
            transport: Vec::new(),
            changes: Vec::new(),
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn reindex(&mut self) {
        for (index, bus) in self.buses.iter_mut().enumerate() {
            bus.index = index;
        }
        self.master.index = self.buses.len();
    }

    fn bus_mut(&mut self, id: BusId) -> Option<&mut Bus> {
        if self.master.id == id {
            return Some(&mut self.master);
        }
        self.buses.iter_mut().find(|bus| bus.id == id)
    }

    fn reindex_devices(&mut self, bus: BusId) {
        let Some(bus) = self.bus(bus).cloned() else {
            return;
        };

        let patterns = bus.lane().map(|lane| lane.patterns.as_slice()).unwrap_or(&[]);
        let slots = bus
            .clips
            .iter()
            .enumerate()
            .filter_map(|(slot, clip)| clip.map(|clip| (slot, clip)));

        for (index, id) in patterns
            .iter()
            .copied()
            .enumerate()
            .chain(bus.effects.iter().copied().enumerate())
            .chain(slots)
        {
            if let Some(device) = self.devices.get_mut(&id) {
                device.index = index;
            }
        }
    }

    pub fn add_bus(&mut self, kind: BusKind) -> BusId {
        let id = BusId(self.next_id());
        self.buses.push(Bus {
            id,
            index: self.buses.len(),
            kind,
            flags: BusFlags::ENABLED,
            crossfade: CrossfadeGroup::Bypass,
            level: 1f64,
            effects: Vec::new(),
            clips: Vec::new(),
        });
        self.reindex();
        self.changes.push(Change::BusAdded(id));

        id
    }

    pub fn add_regular_bus(&mut self) -> BusId {
        self.add_bus(BusKind::Regular(PatternLane::new(CompositeMode::Playlist)))
    }

    pub fn remove_bus(&mut self, id: BusId) -> bool {
        let Some(pos) = self.buses.iter().position(|bus| bus.id == id) else {
            return false;
        };

        let bus = self.buses.remove(pos);
        let owned = bus
            .lane()
            .map(|lane| lane.patterns.clone())
            .unwrap_or_default()
            .into_iter()
            .chain(bus.effects.iter().copied())
            .chain(bus.clips.iter().copied().flatten());
        for device in owned.collect::<Vec<_>>() {
            self.drop_device(device);
        }

        self.reindex();
        self.changes.push(Change::BusRemoved(id));

        let count = self.buses.len();
        if self.focus.primary > count || self.focus.aux > count {
            self.focus.primary = self.focus.primary.min(count);
            self.focus.aux = self.focus.aux.min(count);
            self.changes.push(Change::Focus);
        }

        true
    }

    pub fn move_bus(&mut self, id: BusId, index: usize) -> bool {
        let Some(pos) = self.buses.iter().position(|bus| bus.id == id) else {
            return false;
        };

        let bus = self.buses.remove(pos);
        let index = index.min(self.buses.len());
        self.buses.insert(index, bus);
        self.reindex();
        self.changes.push(Change::BusMoved(id));

        true
    }

    fn drop_device(&mut self, id: DeviceId) {
        if let Some(device) = self.devices.remove(&id) {
            for param in device.remote_controls {
                self.params.remove(&param);
            }
        }
        if self.focused_clip == Some(id) {
            self.focused_clip = None;
        }
    }

    pub fn add_pattern(&mut self, bus_id: BusId) -> Option<DeviceId> {
        let id = DeviceId(self.next_id());
        let bus = self.bus_mut(bus_id)?;
        let lane = bus.lane_mut()?;

        let index = lane.patterns.len();
        lane.patterns.push(id);
        if lane.active.is_none() {
            lane.active = Some(index);
        }
        if lane.focused.is_none() {
            lane.focused = Some(index);
        }

        self.devices.insert(
            id,
            Device {
                id,
                bus: bus_id,
                index,
                kind: DeviceKind::Pattern { enabled: false },
                remote_controls: Vec::new(),
            },
        );
        self.changes.push(Change::PatternAdded { bus: bus_id, device: id });

        Some(id)
    }

    pub fn remove_pattern(&mut self, id: DeviceId) -> bool {
        let Some(bus_id) = self.devices.get(&id).map(|device| device.bus) else {
            return false;
        };
        let Some(lane) = self.bus_mut(bus_id).and_then(Bus::lane_mut) else {
            return false;
        };
        let Some(pos) = lane.patterns.iter().position(|pattern| *pattern == id) else {
            return false;
        };

        lane.patterns.remove(pos);
        let len = lane.patterns.len();
        let shift = |index: Option<usize>| match index {
            _ if len == 0 => None,
            Some(index) if index > pos => Some(index - 1),
            Some(index) if index == pos => Some(index.min(len - 1)),
            other => other,
        };
        lane.active = shift(lane.active);
        lane.focused = shift(lane.focused);
        lane.next = match lane.next {
            Some(next) if next == pos => None,
            next => shift(next),
        };

        self.drop_device(id);
        self.reindex_devices(bus_id);
        self.changes.push(Change::PatternRemoved { bus: bus_id, device: id });

        true
    }

    pub fn add_effect(&mut self, bus_id: BusId) -> Option<DeviceId> {
        let id = DeviceId(self.next_id());
        let bus = self.bus_mut(bus_id)?;

        let index = bus.effects.len();
        bus.effects.push(id);

        self.devices.insert(
            id,
            Device {
                id,
                bus: bus_id,
                index,
                kind: DeviceKind::Effect { enabled: true },
                remote_controls: Vec::new(),
            },
        );
        self.changes.push(Change::EffectAdded { bus: bus_id, device: id });

        Some(id)
    }

    pub fn remove_effect(&mut self, id: DeviceId) -> bool {
        let Some(bus_id) = self.devices.get(&id).map(|device| device.bus) else {
            return false;
        };
        let Some(bus) = self.bus_mut(bus_id) else {
            return false;
        };
        let Some(pos) = bus.effects.iter().position(|effect| *effect == id) else {
            return false;
        };

        bus.effects.remove(pos);
        self.drop_device(id);
        self.reindex_devices(bus_id);
        self.changes.push(Change::EffectRemoved { bus: bus_id, device: id });

        true
    }

    pub fn add_parameter(
        &mut self,
        device: DeviceId,
        label: impl Into<String>,
        kind: ParamKind,
    ) -> Option<ParamId> {
        let id = ParamId(self.next_id());
        self.devices.get_mut(&device)?.remote_controls.push(id);
        self.params.insert(
            id,
            Parameter {
                id,
                label: label.into(),
                kind,
            },
        );

        Some(id)
    }

    /// Maps one more remote control to an already registered parameter.
    pub fn map_remote_control(&mut self, device: DeviceId, param: ParamId) -> bool {
        if !self.params.contains_key(&param) {
            return false;
        }

        match self.devices.get_mut(&device) {
            Some(device) => {
                device.remote_controls.push(param);
                true
            }
            None => false,
        }
    }

    pub fn set_focus(&mut self, focus: Focus) {
        if self.focus != focus {
            self.focus = focus;
            self.changes.push(Change::Focus);
        }
    }

    pub fn set_focused_pattern(&mut self, bus_id: BusId, index: usize) -> bool {
        match self.bus_mut(bus_id).and_then(Bus::lane_mut) {
            Some(lane) if index < lane.patterns.len() => {
                lane.focused = Some(index);
                self.changes.push(Change::Patterns(bus_id));
                true
            }
            _ => false,
        }
    }

    pub fn set_composite(&mut self, bus_id: BusId, composite: CompositeMode) -> bool {
        match self.bus_mut(bus_id).and_then(Bus::lane_mut) {
            Some(lane) => {
                lane.composite = composite;
                self.changes.push(Change::BusState(bus_id));
                true
            }
            None => false,
        }
    }

    /// Starts a transition which completes with [`Mixer::finish_transition`].
    pub fn begin_transition(&mut self, bus_id: BusId, index: usize) -> bool {
        match self.bus_mut(bus_id).and_then(Bus::lane_mut) {
            Some(lane) if index < lane.patterns.len() => {
                lane.next = Some(index);
                self.changes.push(Change::Patterns(bus_id));
                true
            }
            _ => false,
        }
    }

    pub fn finish_transition(&mut self, bus_id: BusId) {
        if let Some(lane) = self.bus_mut(bus_id).and_then(Bus::lane_mut) {
            if let Some(next) = lane.next.take() {
                lane.active = Some(next);
                self.changes.push(Change::Patterns(bus_id));
            }
        }
    }

    pub fn focused_clip(&self) -> Option<DeviceId> {
        self.focused_clip
    }

    pub fn transport_log(&self) -> &[Transport] {
        &self.transport
    }

    pub fn total_attention(&self) -> u32 {
        self.attention.values().sum()
    }

    fn set_clip_running(&mut self, id: DeviceId, is_running: bool) -> Option<BusId> {
        let device = self.devices.get_mut(&id)?;
        match &mut device.kind {
            DeviceKind::Clip { running, .. } if *running != is_running => {
                *running = is_running;
                Some(device.bus)
            }
            _ => None,
        }
    }
}

impl Host for Mixer {
    fn bus_count(&self) -> usize {
        self.buses.len()
    }

    fn bus_at(&self, index: usize) -> Option<&Bus> {
        self.buses.get(index)
    }

    fn bus(&self, id: BusId) -> Option<&Bus> {
        if self.master.id == id {
            return Some(&self.master);
        }
        self.buses.iter().find(|bus| bus.id == id)
    }

    fn master(&self) -> &Bus {
        &self.master
    }

    fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    fn parameter(&self, id: ParamId) -> Option<&Parameter> {
        self.params.get(&id)
    }

    fn focus(&self) -> Focus {
        self.focus
    }

    fn apply(&mut self, cmd: Command) {
        use Command::*;

        match cmd {
            GoPattern { bus, index } => {
                if let Some(lane) = self.bus_mut(bus).and_then(Bus::lane_mut) {
                    if index < lane.patterns.len() {
                        lane.active = Some(index);
                        lane.next = None;
                        self.changes.push(Change::Patterns(bus));
                    }
                }
            }
            FocusPattern { bus, index } => {
                self.set_focused_pattern(bus, index);
            }
            SetDeviceEnabled { device, enabled } => {
                if let Some(device) = self.devices.get_mut(&device) {
                    match &mut device.kind {
                        DeviceKind::Pattern { enabled: cur } => {
                            *cur = enabled;
                            // patterns state is part of the bus pattern list
                            self.changes.push(Change::DeviceState(device.id));
                            self.changes.push(Change::Patterns(device.bus));
                        }
                        DeviceKind::Effect { enabled: cur } => {
                            *cur = enabled;
                            self.changes.push(Change::DeviceState(device.id));
                        }
                        DeviceKind::Clip { .. } => (),
                    }
                }
            }
            SetBusFlag { bus, flag, on } => {
                if let Some(target) = self.bus_mut(bus) {
                    target.flags.set(flag, on);
                    self.changes.push(Change::BusState(bus));
                }
            }
            SetCrossfade { bus, group } => {
                if let Some(target) = self.bus_mut(bus) {
                    target.crossfade = group;
                    self.changes.push(Change::BusState(bus));
                }
            }
            SetLevel { bus, level } => {
                if let Some(target) = self.bus_mut(bus) {
                    target.level = level.clamp(0f64, 1f64);
                    self.changes.push(Change::BusState(bus));
                }
            }
            CreateClip { bus, slot, looping } => {
                let id = DeviceId(self.next_id());
                let Some(target) = self.bus_mut(bus) else {
                    return;
                };
                if target.clip(slot).is_some() {
                    return;
                }
                if target.clips.len() <= slot {
                    target.clips.resize(slot + 1, None);
                }
                target.clips[slot] = Some(id);

                self.devices.insert(
                    id,
                    Device {
                        id,
                        bus,
                        index: slot,
                        kind: DeviceKind::Clip {
                            running: false,
                            looping,
                        },
                        remote_controls: Vec::new(),
                    },
                );
                self.changes.push(Change::Clips(bus));
            }
            TriggerClip(id) => {
                if let Some(bus) = self.set_clip_running(id, true) {
                    self.changes.push(Change::Clips(bus));
                }
            }
            StopClip(id) => {
                if let Some(bus) = self.set_clip_running(id, false) {
                    self.changes.push(Change::Clips(bus));
                }
            }
            StopClips(bus) => {
                let clips: Vec<DeviceId> = self
                    .bus(bus)
                    .map(|target| target.clips.iter().copied().flatten().collect())
                    .unwrap_or_default();

                let mut changed = false;
                for clip in clips {
                    changed |= self.set_clip_running(clip, false).is_some();
                }
                if changed {
                    self.changes.push(Change::Clips(bus));
                }
            }
            FocusClip(id) => {
                if self.devices.contains_key(&id) {
                    self.focused_clip = Some(id);
                }
            }
            FocusBus(index) => {
                let index = index.min(self.buses.len());
                let mut focus = self.focus;
                if focus.is_aux_active() {
                    focus.aux = index;
                } else {
                    focus.primary = index;
                }
                self.set_focus(focus);
            }
            SetParameter { param, normalized } => {
                if let Some(target) = self.params.get_mut(&param) {
                    target.set_normalized(normalized);
                    self.changes.push(Change::Parameter(param));
                }
            }
            Transport(transport) => self.transport.push(transport),
        }
    }

    fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    fn attention(&self, entity: EntityId) -> u32 {
        self.attention.get(&entity).copied().unwrap_or(0)
    }

    fn add_attention(&mut self, entity: EntityId) {
        *self.attention.entry(entity).or_insert(0) += 1;
    }

    fn remove_attention(&mut self, entity: EntityId) -> bool {
        match self.attention.get_mut(&entity) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.attention.remove(&entity);
                true
            }
            None => false,
        }
    }
}
