//! Boundary with the host mixing engine.
//!
//! The surface never owns any of these entities: it reads them through
//! [`Host`], mutates them with [`Command`]s and learns about mutations
//! by draining [`Change`] notifications.

use std::fmt;

mod mixer;
pub use mixer::Mixer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub u32);

/// Anything a listener can be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Mixer,
    Bus(BusId),
    Device(DeviceId),
    Param(ParamId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Mixer => f.write_str("mixer"),
            EntityId::Bus(id) => write!(f, "bus #{}", id.0),
            EntityId::Device(id) => write!(f, "device #{}", id.0),
            EntityId::Param(id) => write!(f, "param #{}", id.0),
        }
    }
}

impl From<BusId> for EntityId {
    fn from(id: BusId) -> Self {
        EntityId::Bus(id)
    }
}

impl From<DeviceId> for EntityId {
    fn from(id: DeviceId) -> Self {
        EntityId::Device(id)
    }
}

impl From<ParamId> for EntityId {
    fn from(id: ParamId) -> Self {
        EntityId::Param(id)
    }
}

bitflags::bitflags! {
    pub struct BusFlags: u8 {
        const ENABLED = 0b001;
        const ARMED = 0b010;
        const CUE = 0b100;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossfadeGroup {
    Bypass,
    A,
    B,
}

impl CrossfadeGroup {
    pub fn next(self) -> Self {
        use CrossfadeGroup::*;
        match self {
            Bypass => A,
            A => B,
            B => Bypass,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeMode {
    /// One pattern at a time, with transitions.
    Playlist,
    /// Patterns combine additively, each with its own enabled flag.
    Blend,
}

/// Patterns hosted by a [`Bus`] which supports them.
#[derive(Clone, Debug)]
pub struct PatternLane {
    pub patterns: Vec<DeviceId>,
    pub active: Option<usize>,
    /// Pending transition target.
    pub next: Option<usize>,
    pub focused: Option<usize>,
    pub composite: CompositeMode,
}

impl PatternLane {
    pub fn new(composite: CompositeMode) -> Self {
        Self {
            patterns: Vec::new(),
            active: None,
            next: None,
            focused: None,
            composite,
        }
    }
}

#[derive(Clone, Debug)]
pub enum BusKind {
    Regular(PatternLane),
    Group(PatternLane),
    Master,
}

#[derive(Clone, Debug)]
pub struct Bus {
    pub id: BusId,
    /// Position assigned by the mixer, `bus_count` for the master bus.
    pub index: usize,
    pub kind: BusKind,
    pub flags: BusFlags,
    pub crossfade: CrossfadeGroup,
    pub level: f64,
    pub effects: Vec<DeviceId>,
    pub clips: Vec<Option<DeviceId>>,
}

impl Bus {
    pub fn lane(&self) -> Option<&PatternLane> {
        match &self.kind {
            BusKind::Regular(lane) | BusKind::Group(lane) => Some(lane),
            BusKind::Master => None,
        }
    }

    pub fn lane_mut(&mut self) -> Option<&mut PatternLane> {
        match &mut self.kind {
            BusKind::Regular(lane) | BusKind::Group(lane) => Some(lane),
            BusKind::Master => None,
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(self.kind, BusKind::Master)
    }

    pub fn focused_pattern(&self) -> Option<DeviceId> {
        let lane = self.lane()?;
        lane.patterns.get(lane.focused?).copied()
    }

    pub fn clip(&self, slot: usize) -> Option<DeviceId> {
        self.clips.get(slot).copied().flatten()
    }

    /// The flat device sequence: `[focused pattern, effect0, effect1, ...]`.
    pub fn device_sequence(&self) -> Vec<DeviceId> {
        self.focused_pattern()
            .into_iter()
            .chain(self.effects.iter().copied())
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    Pattern { enabled: bool },
    Effect { enabled: bool },
    Clip { running: bool, looping: bool },
}

#[derive(Clone, Debug)]
pub struct Device {
    pub id: DeviceId,
    pub bus: BusId,
    pub index: usize,
    pub kind: DeviceKind,
    /// Parameters exposed to knobs, the same parameter may appear more than once.
    pub remote_controls: Vec<ParamId>,
}

impl Device {
    pub fn is_enabled(&self) -> bool {
        match self.kind {
            DeviceKind::Pattern { enabled } | DeviceKind::Effect { enabled } => enabled,
            DeviceKind::Clip { running, .. } => running,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamKind {
    Continuous { value: f64 },
    Discrete {
        value: i32,
        min: i32,
        max: i32,
        /// The value semantically wraps around, e.g. a hue.
        wrappable: bool,
    },
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub id: ParamId,
    pub label: String,
    pub kind: ParamKind,
}

impl Parameter {
    pub fn normalized(&self) -> f64 {
        match self.kind {
            ParamKind::Continuous { value } => value,
            ParamKind::Discrete { value, min, max, .. } if max > min => {
                (value - min) as f64 / (max - min) as f64
            }
            ParamKind::Discrete { .. } => 0f64,
        }
    }

    /// Sets the value from a normalized `[0, 1]` position.
    pub fn set_normalized(&mut self, normalized: f64) {
        let normalized = normalized.clamp(0f64, 1f64);
        match &mut self.kind {
            ParamKind::Continuous { value } => *value = normalized,
            ParamKind::Discrete {
                value, min, max, ..
            } => {
                let range = (*max - *min + 1) as f64;
                *value = (*min + (normalized * range).floor() as i32).min(*max);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Focus {
    pub primary: usize,
    pub aux: usize,
    pub aux_sticky: bool,
    pub performance: bool,
}

impl Focus {
    pub fn is_aux_active(&self) -> bool {
        self.aux_sticky || self.performance
    }

    /// The index of the effectively focused bus, `bus_count` designates Master.
    pub fn effective_index(&self) -> usize {
        if self.is_aux_active() {
            self.aux
        } else {
            self.primary
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Play,
    Stop,
    Record,
    TapTempo,
    NudgeUp,
    NudgeDown,
}

/// Mutations requested by the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Transition to the pattern at `index`, possibly asynchronous on the host side.
    GoPattern { bus: BusId, index: usize },
    FocusPattern { bus: BusId, index: usize },
    SetDeviceEnabled { device: DeviceId, enabled: bool },
    SetBusFlag { bus: BusId, flag: BusFlags, on: bool },
    SetCrossfade { bus: BusId, group: CrossfadeGroup },
    SetLevel { bus: BusId, level: f64 },
    CreateClip { bus: BusId, slot: usize, looping: bool },
    TriggerClip(DeviceId),
    StopClip(DeviceId),
    StopClips(BusId),
    FocusClip(DeviceId),
    FocusBus(usize),
    SetParameter { param: ParamId, normalized: f64 },
    Transport(Transport),
}

/// Notifications emitted by the host after a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    BusAdded(BusId),
    BusRemoved(BusId),
    BusMoved(BusId),
    BusState(BusId),
    Patterns(BusId),
    PatternAdded { bus: BusId, device: DeviceId },
    PatternRemoved { bus: BusId, device: DeviceId },
    EffectAdded { bus: BusId, device: DeviceId },
    EffectRemoved { bus: BusId, device: DeviceId },
    Clips(BusId),
    DeviceState(DeviceId),
    Parameter(ParamId),
    Focus,
}

impl Change {
    /// The entity whose listeners are notified.
    pub fn entity(&self) -> EntityId {
        use Change::*;
        match *self {
            BusAdded(_) | BusRemoved(_) | BusMoved(_) | Focus => EntityId::Mixer,
            BusState(bus)
            | Patterns(bus)
            | PatternAdded { bus, .. }
            | PatternRemoved { bus, .. }
            | EffectAdded { bus, .. }
            | EffectRemoved { bus, .. }
            | Clips(bus) => EntityId::Bus(bus),
            DeviceState(device) => EntityId::Device(device),
            Parameter(param) => EntityId::Param(param),
        }
    }
}

/// The host mixing engine as seen from a control surface.
pub trait Host {
    /// Number of regular & group buses, i.e. the index of the master bus.
    fn bus_count(&self) -> usize;
    fn bus_at(&self, index: usize) -> Option<&Bus>;
    fn bus(&self, id: BusId) -> Option<&Bus>;
    fn master(&self) -> &Bus;
    fn device(&self, id: DeviceId) -> Option<&Device>;
    fn parameter(&self, id: ParamId) -> Option<&Parameter>;
    fn focus(&self) -> Focus;

    /// Applies `cmd`, recording the resulting [`Change`]s.
    fn apply(&mut self, cmd: Command);
    fn take_changes(&mut self) -> Vec<Change>;

    fn attention(&self, entity: EntityId) -> u32;
    fn add_attention(&mut self, entity: EntityId);
    /// Returns `false` if `entity` had no outstanding attention.
    fn remove_attention(&mut self, entity: EntityId) -> bool;

    /// Resolves the bus at `index`, `bus_count` being the master bus.
    fn bus_or_master(&self, index: usize) -> Option<&Bus> {
        if index == self.bus_count() {
            Some(self.master())
        } else {
            self.bus_at(index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_normalized() {
        let mut param = Parameter {
            id: ParamId(0),
            label: "hue".into(),
            kind: ParamKind::Discrete {
                value: 0,
                min: 0,
                max: 3,
                wrappable: true,
            },
        };

        param.set_normalized(1.0);
        assert!(matches!(param.kind, ParamKind::Discrete { value: 3, .. }));
        assert_eq!(param.normalized(), 1.0);

        param.set_normalized(0.4);
        assert!(matches!(param.kind, ParamKind::Discrete { value: 1, .. }));

        param.set_normalized(0.0);
        assert!(matches!(param.kind, ParamKind::Discrete { value: 0, .. }));
    }

    #[test]
    fn effective_focus() {
        let mut focus = Focus {
            primary: 1,
            aux: 3,
            ..Focus::default()
        };
        assert_eq!(focus.effective_index(), 1);

        focus.performance = true;
        assert_eq!(focus.effective_index(), 3);

        focus.performance = false;
        focus.aux_sticky = true;
        assert_eq!(focus.effective_index(), 3);
    }

    #[test]
    fn crossfade_cycle() {
        let group = CrossfadeGroup::Bypass;
        assert_eq!(group.next(), CrossfadeGroup::A);
        assert_eq!(group.next().next(), CrossfadeGroup::B);
        assert_eq!(group.next().next().next(), CrossfadeGroup::Bypass);
    }
}
