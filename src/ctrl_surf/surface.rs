use std::collections::{BTreeMap, BTreeSet};

use super::{
    dispatch::{self, Action, Control, GridMode},
    focus::{FocusTracker, Focused},
    grid::{self, GridWindow},
    knob,
    profile::Profile,
    registry::{Listener, Registry},
    Color, ControlSurface, Error,
};
use crate::{
    midi::{self, MsgList},
    model::{
        BusFlags, BusId, Change, Command, CompositeMode, CrossfadeGroup, DeviceKind, EntityId,
        Host, ParamId,
    },
};

/// Clip slots reachable by scrolling the clip grid.
const MAX_CLIP_SLOTS: usize = 128;

fn report(res: Result<impl Sized, Error>) {
    if let Err(err) = res {
        err.report();
    }
}

fn discard_changes(host: &mut dyn Host, when: &str) {
    let changes = host.take_changes();
    if !changes.is_empty() {
        log::trace!("Discarding {} host changes {when}", changes.len());
    }
}

/// Outgoing messages, dropped while the surface is disabled.
#[derive(Debug, Default)]
struct Output {
    is_enabled: bool,
    list: MsgList,
}

impl Output {
    fn push(&mut self, msg: Option<midi::Msg>) {
        match msg {
            Some(msg) if self.is_enabled => self.list.push(msg),
            Some(msg) => log::trace!("Surface disabled, dropping {}", msg.display()),
            None => (),
        }
    }

    fn take(&mut self) -> MsgList {
        std::mem::take(&mut self.list)
    }
}

/// Binds a device [`Profile`] to a host mixer.
pub struct Surface {
    profile: &'static Profile,
    output: Output,
    registry: Registry,
    focus: FocusTracker,
    state: dispatch::State,
    column_offset: usize,
    columns: Vec<Option<BusId>>,
    pattern_windows: BTreeMap<BusId, GridWindow>,
    clip_window: GridWindow,
    knobs: Vec<Option<ParamId>>,
}

impl Surface {
    pub fn new(profile: &'static Profile) -> Self {
        Self {
            profile,
            output: Output::default(),
            registry: Registry::default(),
            focus: FocusTracker::default(),
            state: dispatch::State::default(),
            column_offset: 0,
            columns: vec![None; profile.columns],
            pattern_windows: BTreeMap::new(),
            clip_window: GridWindow::new(profile.rows),
            knobs: vec![None; profile.knobs.device_count],
        }
    }

    pub fn profile(&self) -> &'static Profile {
        self.profile
    }

    pub fn state(&self) -> dispatch::State {
        self.state
    }

    pub fn column_offset(&self) -> usize {
        self.column_offset
    }

    pub fn focus(&self) -> &FocusTracker {
        &self.focus
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn pattern_window(&self, bus: BusId) -> Option<&GridWindow> {
        self.pattern_windows.get(&bus)
    }

    pub fn clip_window(&self) -> &GridWindow {
        &self.clip_window
    }

    fn column_bus(&self, column: usize) -> Option<BusId> {
        self.columns.get(column).copied().flatten()
    }

    fn column_of(&self, bus: BusId) -> Option<usize> {
        self.columns.iter().position(|col| *col == Some(bus))
    }

    /// Renders the whole surface state.
    pub fn refresh(&mut self, host: &dyn Host) -> MsgList {
        self.render_all(host);
        self.output.take()
    }
}

/// Listener lifecycle.
impl Surface {
    fn rebind_columns(&mut self, host: &dyn Host) {
        let wanted: Vec<Option<BusId>> = (0..self.profile.columns)
            .map(|col| host.bus_at(self.column_offset + col).map(|bus| bus.id))
            .collect();

        let prev: BTreeSet<BusId> = self.columns.iter().flatten().copied().collect();
        let next: BTreeSet<BusId> = wanted.iter().flatten().copied().collect();

        for bus in prev.difference(&next) {
            report(self.registry.unbind((*bus).into(), Listener::Column));
        }
        for bus in next.difference(&prev) {
            report(self.registry.bind((*bus).into(), Listener::Column));
        }

        self.columns = wanted;

        let rows = self.profile.rows;
        for bus in next {
            let window = self
                .pattern_windows
                .entry(bus)
                .or_insert_with(|| GridWindow::new(rows));
            if let Some(focused) = host.bus(bus).and_then(|bus| bus.lane()?.focused) {
                window.follow(focused);
            }
        }
    }

    fn unbind_columns(&mut self) {
        for bus in self.columns.iter_mut() {
            if let Some(bus) = bus.take() {
                report(self.registry.unbind(bus.into(), Listener::Column));
            }
        }
    }

    fn rebind_knobs(&mut self, host: &dyn Host) {
        self.unbind_knobs();

        let params = self
            .focus
            .device()
            .and_then(|device| host.device(device))
            .map(|device| device.remote_controls.clone())
            .unwrap_or_default();

        for (slot, param) in self.knobs.iter_mut().zip(params) {
            report(self.registry.acquire(param.into(), Listener::Knob));
            *slot = Some(param);
        }
    }

    fn unbind_knobs(&mut self) {
        for slot in self.knobs.iter_mut() {
            if let Some(param) = slot.take() {
                report(self.registry.release(param.into(), Listener::Knob));
            }
        }
    }

    /// Drains & fires host changes until the host is stable.
    fn process_changes(&mut self, host: &mut dyn Host) {
        loop {
            let changes = host.take_changes();
            if changes.is_empty() {
                break;
            }

            for change in changes {
                self.fire(host, change);
            }
        }
    }

    fn fire(&mut self, host: &mut dyn Host, change: Change) {
        let entity = change.entity();
        let listeners = self.registry.begin_firing(entity);

        for listener in listeners {
            log::trace!("Firing {listener:?} for {change:?}");
            match listener {
                Listener::Mixer => self.mixer_changed(host, change),
                Listener::Column => self.column_changed(host, change),
                Listener::FocusedBus => {
                    if let Some(focused) = self.focus.bus_changed(host, &mut self.registry, change) {
                        self.focus_changed(host, focused);
                    }
                }
                Listener::FocusedDevice => self.render_device(host),
                Listener::Knob => {
                    if let EntityId::Param(param) = entity {
                        self.render_knobs_for(host, param);
                    }
                }
            }
        }

        self.registry.end_firing();
    }

    fn mixer_changed(&mut self, host: &mut dyn Host, change: Change) {
        match change {
            Change::BusAdded(_) | Change::BusRemoved(_) | Change::BusMoved(_) => {
                if let Change::BusRemoved(bus) = change {
                    self.pattern_windows.remove(&bus);
                }

                let max_offset = host.bus_count().saturating_sub(self.profile.columns);
                self.column_offset = self.column_offset.min(max_offset);
                self.rebind_columns(host);

                if let Some(focused) = self.focus.refresh(host, &mut self.registry) {
                    self.focus_changed(host, focused);
                }

                self.render_columns(host);
                self.render_focus(host);
            }
            Change::Focus => {
                if let Some(focused) = self.focus.refresh(host, &mut self.registry) {
                    self.focus_changed(host, focused);
                }
            }
            _ => (),
        }
    }

    fn column_changed(&mut self, host: &mut dyn Host, change: Change) {
        let bus = match change.entity() {
            EntityId::Bus(bus) => bus,
            _ => return,
        };
        let Some(column) = self.column_of(bus) else {
            return;
        };

        match change {
            Change::BusState(_) => {
                self.render_strip(host, column);
                self.render_grid_column(host, column);
            }
            Change::Patterns(_) | Change::PatternAdded { .. } | Change::PatternRemoved { .. } => {
                let focused = host.bus(bus).and_then(|bus| bus.lane()?.focused);
                if let (Some(window), Some(focused)) = (self.pattern_windows.get_mut(&bus), focused)
                {
                    window.follow(focused);
                }
                self.render_grid_column(host, column);
            }
            Change::Clips(_) => self.render_grid_column(host, column),
            _ => (),
        }
    }

    /// Reacts to the focused bus or device moving.
    fn focus_changed(&mut self, host: &dyn Host, focused: Focused) {
        log::debug!("Focus changed to {focused:?}");

        self.rebind_knobs(host);
        self.render_focus(host);
        self.render_device(host);
        self.render_knobs(host);
    }
}

/// Rendering.
impl Surface {
    fn led(&mut self, control: Control, color: Color) {
        self.output.push(self.profile.led(control, color));
    }

    fn on_off(&mut self, control: Control, is_on: bool) {
        self.led(control, if is_on { Color::On } else { Color::Off });
    }

    fn render_all(&mut self, host: &dyn Host) {
        self.render_columns(host);
        self.render_focus(host);
        self.render_device(host);
        self.render_knobs(host);
        self.on_off(Control::GridMode, self.state.grid_mode == GridMode::Clip);
        self.on_off(Control::Shift, self.state.shift.is_shifted());
    }

    fn render_columns(&mut self, host: &dyn Host) {
        for column in 0..self.profile.columns {
            self.render_strip(host, column);
            self.render_grid_column(host, column);
        }
    }

    fn render_strip(&mut self, host: &dyn Host, column: usize) {
        let bus = self.column_bus(column).and_then(|bus| host.bus(bus));

        let flag = |flag: BusFlags| bus.map_or(false, |bus| bus.flags.contains(flag));
        let (enabled, cue, armed) = (
            flag(BusFlags::ENABLED),
            flag(BusFlags::CUE),
            flag(BusFlags::ARMED),
        );
        let crossfade = match bus.map(|bus| bus.crossfade) {
            Some(CrossfadeGroup::A) => Color::CrossfadeA,
            Some(CrossfadeGroup::B) => Color::CrossfadeB,
            _ => Color::Off,
        };

        self.on_off(Control::Activate(column), enabled);
        self.on_off(Control::Cue(column), cue);
        self.on_off(Control::Arm(column), armed);
        self.led(Control::Crossfade(column), crossfade);
    }

    /// Colors of the grid column, as computed from the model.
    pub fn grid_column(&self, host: &dyn Host, column: usize) -> Vec<Color> {
        let rows = self.profile.rows;
        let Some(bus) = self.column_bus(column).and_then(|bus| host.bus(bus)) else {
            return vec![Color::Off; rows];
        };

        match self.state.grid_mode {
            GridMode::Pattern => {
                let window = self
                    .pattern_windows
                    .get(&bus.id)
                    .copied()
                    .unwrap_or_else(|| GridWindow::new(rows));
                grid::pattern_column(host, bus, &window, self.profile.blend_rule)
            }
            GridMode::Clip => grid::clip_column(host, bus, &self.clip_window),
        }
    }

    fn render_grid_column(&mut self, host: &dyn Host, column: usize) {
        for (row, color) in self.grid_column(host, column).into_iter().enumerate() {
            self.led(Control::Grid { column, row }, color);
        }
    }

    fn render_grid(&mut self, host: &dyn Host) {
        for column in 0..self.profile.columns {
            self.render_grid_column(host, column);
        }
    }

    fn render_focus(&mut self, host: &dyn Host) {
        let focused = self.focus.bus();

        for column in 0..self.profile.columns {
            let is_focused = focused.is_some() && self.column_bus(column) == focused;
            self.on_off(Control::Select(column), is_focused);
        }

        let is_master = focused
            .and_then(|bus| host.bus(bus))
            .map_or(false, |bus| bus.is_master());
        self.on_off(Control::MasterSelect, is_master);
    }

    fn render_device(&mut self, host: &dyn Host) {
        let is_enabled = self
            .focus
            .device()
            .and_then(|device| host.device(device))
            .map_or(false, |device| device.is_enabled());

        self.on_off(Control::DeviceOn, is_enabled);
    }

    fn render_knobs(&mut self, host: &dyn Host) {
        for idx in 0..self.knobs.len() {
            let value = self.knobs[idx]
                .and_then(|param| host.parameter(param))
                .map_or(0, knob::to_device);
            self.output.push(self.profile.ring(idx, value));
        }
    }

    fn render_knobs_for(&mut self, host: &dyn Host, param: ParamId) {
        let value = host.parameter(param).map_or(0, knob::to_device);

        for idx in 0..self.knobs.len() {
            if self.knobs[idx] == Some(param) {
                self.output.push(self.profile.ring(idx, value));
            }
        }
    }
}

/// Hardware actions.
impl Surface {
    fn act(&mut self, host: &mut dyn Host, action: Action) {
        use Action::*;

        match action {
            Transport(transport) => host.apply(Command::Transport(transport)),
            ShiftChanged => (),
            GridModeChanged => {
                log::debug!("Grid mode {:?}", self.state.grid_mode);
                self.on_off(Control::GridMode, self.state.grid_mode == GridMode::Clip);
                self.render_grid(host);
            }
            ScrollColumns(delta) => {
                let max_offset = host.bus_count().saturating_sub(self.profile.columns);
                let offset = self
                    .column_offset
                    .saturating_add_signed(delta)
                    .min(max_offset);
                if offset != self.column_offset {
                    self.column_offset = offset;
                    self.rebind_columns(host);
                    self.render_columns(host);
                    self.render_focus(host);
                }
            }
            ScrollRows { delta, pages } => self.scroll_rows(host, delta, pages),
            PreviousDevice => {
                if let Some(focused) = self.focus.previous_device(host, &mut self.registry) {
                    self.focus_changed(host, focused);
                }
            }
            NextDevice => {
                if let Some(focused) = self.focus.next_device(host, &mut self.registry) {
                    self.focus_changed(host, focused);
                }
            }
            ToggleDeviceEnabled => {
                let device = self.focus.device().and_then(|device| host.device(device));
                let cmd = device.and_then(|device| match device.kind {
                    DeviceKind::Pattern { enabled } | DeviceKind::Effect { enabled } => {
                        Some(Command::SetDeviceEnabled {
                            device: device.id,
                            enabled: !enabled,
                        })
                    }
                    DeviceKind::Clip { .. } => None,
                });
                if let Some(cmd) = cmd {
                    host.apply(cmd);
                }
            }
            ToggleBusFlag { column, flag } => {
                if let Some(bus) = self.column_bus(column).and_then(|bus| host.bus(bus)) {
                    let cmd = Command::SetBusFlag {
                        bus: bus.id,
                        flag,
                        on: !bus.flags.contains(flag),
                    };
                    host.apply(cmd);
                }
            }
            CycleCrossfade(column) => {
                if let Some(bus) = self.column_bus(column).and_then(|bus| host.bus(bus)) {
                    let cmd = Command::SetCrossfade {
                        bus: bus.id,
                        group: bus.crossfade.next(),
                    };
                    host.apply(cmd);
                }
            }
            FocusColumn(column) => {
                let index = self
                    .column_bus(column)
                    .and_then(|bus| host.bus(bus))
                    .map(|bus| bus.index);
                if let Some(index) = index {
                    host.apply(Command::FocusBus(index));
                }
            }
            FocusMaster => {
                let index = host.bus_count();
                host.apply(Command::FocusBus(index));
            }
            StopClips(column) => {
                if let Some(bus) = self.column_bus(column) {
                    host.apply(Command::StopClips(bus));
                }
            }
            LaunchPattern { column, row } => self.launch_pattern(host, column, row),
            FocusPattern { column, row } => {
                if let Some((bus, index)) = self.pattern_at(host, column, row) {
                    host.apply(Command::FocusPattern { bus, index });
                }
            }
            LaunchClip {
                column,
                row,
                looping,
            } => self.launch_clip(host, column, row, looping),
            DeviceKnob { knob: idx, value } => {
                let param = self
                    .knobs
                    .get(idx)
                    .copied()
                    .flatten()
                    .and_then(|param| host.parameter(param));
                if let Some(param) = param {
                    let cmd = Command::SetParameter {
                        param: param.id,
                        normalized: knob::from_device(value, param),
                    };
                    host.apply(cmd);
                }
            }
            Fader { column, value } => {
                if let Some(bus) = self.column_bus(column) {
                    self.set_level(host, bus, value);
                }
            }
            MasterFader(value) => {
                let bus = host.master().id;
                self.set_level(host, bus, value);
            }
        }
    }

    fn set_level(&mut self, host: &mut dyn Host, bus: BusId, value: u8) {
        match midi::normalized_f64::from_u7(value) {
            Ok(level) => host.apply(Command::SetLevel { bus, level }),
            Err(err) => log::warn!("Fader value: {err}"),
        }
    }

    fn scroll_rows(&mut self, host: &dyn Host, delta: isize, pages: bool) {
        let rows = self.profile.rows;
        let delta = if pages { delta * rows as isize } else { delta };

        match self.state.grid_mode {
            GridMode::Pattern => {
                for bus in self.columns.iter().flatten() {
                    let count = host
                        .bus(*bus)
                        .and_then(|bus| bus.lane())
                        .map_or(0, |lane| lane.patterns.len());
                    if let Some(window) = self.pattern_windows.get_mut(bus) {
                        window.scroll(delta, count.saturating_sub(rows));
                    }
                }
            }
            GridMode::Clip => {
                self.clip_window
                    .scroll(delta, MAX_CLIP_SLOTS.saturating_sub(rows));
            }
        }

        self.render_grid(host);
    }

    /// Bus & pattern index displayed at `column`, `row`, if any.
    fn pattern_at(&self, host: &dyn Host, column: usize, row: usize) -> Option<(BusId, usize)> {
        let bus = host.bus(self.column_bus(column)?)?;
        let index = self.pattern_windows.get(&bus.id)?.index(row);

        (index < bus.lane()?.patterns.len()).then_some((bus.id, index))
    }

    fn launch_pattern(&mut self, host: &mut dyn Host, column: usize, row: usize) {
        let Some((bus_id, index)) = self.pattern_at(host, column, row) else {
            return;
        };
        let Some(lane) = host.bus(bus_id).and_then(|bus| bus.lane()) else {
            return;
        };

        let cmd = match lane.composite {
            CompositeMode::Playlist => Command::GoPattern { bus: bus_id, index },
            CompositeMode::Blend => {
                let pattern = lane.patterns[index];
                let enabled = host
                    .device(pattern)
                    .map_or(false, |device| device.is_enabled());
                Command::SetDeviceEnabled {
                    device: pattern,
                    enabled: !enabled,
                }
            }
        };

        host.apply(cmd);
    }

    fn launch_clip(&mut self, host: &mut dyn Host, column: usize, row: usize, looping: bool) {
        let Some(bus) = self.column_bus(column).and_then(|bus| host.bus(bus)) else {
            return;
        };
        let slot = self.clip_window.index(row);

        let clip = bus.clip(slot).and_then(|clip| host.device(clip));
        let cmds = match clip.map(|clip| (clip.id, clip.kind)) {
            None => vec![Command::CreateClip {
                bus: bus.id,
                slot,
                looping,
            }],
            Some((clip, DeviceKind::Clip { running: true, .. })) => vec![Command::StopClip(clip)],
            Some((clip, _)) => vec![Command::TriggerClip(clip), Command::FocusClip(clip)],
        };

        for cmd in cmds {
            host.apply(cmd);
        }
    }
}

impl ControlSurface for Surface {
    fn name(&self) -> &'static str {
        self.profile.name
    }

    fn enable(&mut self, host: &mut dyn Host) -> MsgList {
        if self.output.is_enabled {
            log::debug!("{} already enabled", self.profile.name);
            return MsgList::none();
        }

        log::info!("Enabling {}", self.profile.name);
        self.output.is_enabled = true;
        self.output
            .push(self.profile.enable_sysex.map(midi::Msg::new_sysex));

        // Changes recorded before enabling are reflected by the initial render.
        discard_changes(host, "before enabling");

        report(self.registry.bind(EntityId::Mixer, Listener::Mixer));
        self.rebind_columns(host);
        if self.focus.refresh(host, &mut self.registry).is_some() {
            self.rebind_knobs(host);
        }

        self.render_all(host);
        self.output.take()
    }

    fn disable(&mut self, host: &mut dyn Host) -> MsgList {
        if !self.output.is_enabled {
            return MsgList::none();
        }

        log::info!("Disabling {}", self.profile.name);

        self.unbind_knobs();
        self.focus.release(host, &mut self.registry);
        self.unbind_columns();
        report(self.registry.unbind(EntityId::Mixer, Listener::Mixer));

        if !self.registry.is_empty() {
            for entity in self.registry.entities() {
                log::error!("Leaked binding on {entity}");
                report(self.registry.unbind_all(entity));
            }
            debug_assert!(self.registry.is_empty());
        }

        self.state = dispatch::State::default();
        self.column_offset = 0;
        self.pattern_windows.clear();
        self.clip_window = GridWindow::new(self.profile.rows);

        // Switch LEDs off & restore generic mode before muting the output.
        self.render_all(host);
        self.output
            .push(self.profile.disable_sysex.map(midi::Msg::new_sysex));
        let list = self.output.take();
        self.output.is_enabled = false;

        list
    }

    fn is_enabled(&self) -> bool {
        self.output.is_enabled
    }

    fn msg_from_device(&mut self, host: &mut dyn Host, msg: midi::Msg) -> MsgList {
        if !self.output.is_enabled {
            log::debug!("Ignoring device msg: {} disabled", self.profile.name);
            return MsgList::none();
        }

        let event = msg.event();
        if let midi::Event::SysEx(_) = event {
            log::debug!("Ignoring device sysex {}", msg.display());
            return MsgList::none();
        }

        let Some((control, input)) = self.profile.decode(event) else {
            log::warn!("Unmapped device msg {}", msg.display());
            return MsgList::none();
        };

        let dispatched = dispatch::dispatch(&mut self.state, control, input);
        if let Some((control, is_on)) = dispatched.echo {
            self.on_off(control, is_on);
        }
        if let Some(action) = dispatched.action {
            self.act(host, action);
            self.process_changes(host);
        }

        self.output.take()
    }

    fn host_changed(&mut self, host: &mut dyn Host) -> MsgList {
        if !self.output.is_enabled {
            discard_changes(host, "while disabled");
            return MsgList::none();
        }

        self.process_changes(host);
        self.output.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ctrl_surf::device::{apc40_mk2::button, APC40_MK2},
        midi::{Channel, Msg},
        model::{Focus, Mixer, ParamKind},
    };

    fn press(chan: u8, note: u8) -> Msg {
        Msg::note_on(Channel::from(chan), note, 0x7f)
    }

    fn release(chan: u8, note: u8) -> Msg {
        Msg::note_on(Channel::from(chan), note, 0)
    }

    fn device_knob(idx: u8, value: u8) -> Msg {
        Msg::control_change(Channel::from(0), 16 + idx, value)
    }

    fn contains(list: &MsgList, msg: &Msg) -> bool {
        list.iter().any(|cur| cur == msg)
    }

    /// Three regular buses, the third one with 3 patterns.
    fn scenario() -> (Mixer, Vec<BusId>) {
        let mut mixer = Mixer::new();
        let buses = (0..3).map(|_| mixer.add_regular_bus()).collect::<Vec<_>>();
        for _ in 0..3 {
            mixer.add_pattern(buses[2]).unwrap();
        }
        mixer.set_focused_pattern(buses[2], 1);
        mixer.take_changes();

        (mixer, buses)
    }

    #[test]
    fn enable_renders_playlist_column() {
        let (mut mixer, _) = scenario();
        let mut surface = Surface::new(&APC40_MK2);

        let out = surface.enable(&mut mixer);
        assert_eq!(out.iter().next(), Some(&Msg::new_sysex(&[
            0x47, 0x7f, 0x29, 0x60, 0x00, 0x04, 0x42, 0x09, 0x07, 0x01
        ])));

        assert_eq!(
            surface.grid_column(&mixer, 2),
            vec![
                Color::Active,
                Color::Focused,
                Color::Present,
                Color::Off,
                Color::Off
            ],
        );

        let chan = Channel::from(0);
        for (row, velocity) in [21, 45, 3, 0, 0].into_iter().enumerate() {
            let note = (4 - row as u8) * 8 + 2;
            assert!(contains(&out, &Msg::note_on(chan, note, velocity)));
        }
    }

    #[test]
    fn master_select() {
        let (mut mixer, _) = scenario();
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        let out = surface.msg_from_device(&mut mixer, press(0, button::MASTER_SELECT));
        assert_eq!(mixer.focus().primary, mixer.bus_count());
        assert_eq!(surface.focus().bus(), Some(mixer.master().id));

        assert!(contains(
            &out,
            &Msg::note_on(Channel::from(0), button::MASTER_SELECT, 1)
        ));
        for column in 0..8 {
            assert!(contains(
                &out,
                &Msg::note_on(Channel::from(column), button::SELECT, 0)
            ));
        }

        // Select the bus on column 1.
        surface.msg_from_device(&mut mixer, press(1, button::SELECT));
        assert_eq!(mixer.focus().primary, 1);
        assert_eq!(surface.focus().bus(), mixer.bus_at(1).map(|bus| bus.id));
    }

    #[test]
    fn shift_bank_right_selects_next_device() {
        let (mut mixer, buses) = scenario();
        let effect = mixer.add_effect(buses[0]).unwrap();
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        // No pattern on bus 0: the effect is the default device.
        assert_eq!(surface.focus().device(), Some(effect));

        mixer.set_focus(Focus {
            primary: 2,
            ..mixer.focus()
        });
        surface.host_changed(&mut mixer);
        let pattern = mixer.bus(buses[2]).unwrap().focused_pattern();
        assert_eq!(surface.focus().device(), pattern);

        let effect = mixer.add_effect(buses[2]).unwrap();
        surface.host_changed(&mut mixer);

        surface.msg_from_device(&mut mixer, press(0, button::SHIFT));
        surface.msg_from_device(&mut mixer, press(0, button::BANK_RIGHT));
        assert_eq!(surface.focus().device(), Some(effect));
        assert_eq!(surface.column_offset(), 0);

        // No wrapping.
        surface.msg_from_device(&mut mixer, press(0, button::BANK_RIGHT));
        assert_eq!(surface.focus().device(), Some(effect));

        surface.msg_from_device(&mut mixer, release(0, button::SHIFT));
        surface.msg_from_device(&mut mixer, press(0, button::BANK_LEFT));
        assert_eq!(surface.focus().device(), Some(effect));
    }

    #[test]
    fn blend_toggle() {
        let (mut mixer, buses) = scenario();
        mixer.set_composite(buses[2], CompositeMode::Blend);
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        let pattern = mixer.bus(buses[2]).unwrap().lane().unwrap().patterns[2];
        // column 2, row 2
        let note = 2 * 8 + 2;

        surface.msg_from_device(&mut mixer, press(0, note));
        assert!(mixer.device(pattern).unwrap().is_enabled());
        assert_eq!(surface.grid_column(&mixer, 2)[2], Color::Enabled);

        surface.msg_from_device(&mut mixer, release(0, note));
        assert!(mixer.device(pattern).unwrap().is_enabled());

        surface.msg_from_device(&mut mixer, press(0, note));
        assert!(!mixer.device(pattern).unwrap().is_enabled());
        assert_eq!(surface.grid_column(&mixer, 2)[2], Color::Present);

        // Beyond the pattern count.
        surface.msg_from_device(&mut mixer, press(0, 2));
        assert_eq!(mixer.bus(buses[2]).unwrap().lane().unwrap().patterns.len(), 3);
    }

    #[test]
    fn playlist_launch_and_focus() {
        let (mut mixer, buses) = scenario();
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        surface.msg_from_device(&mut mixer, press(0, 2 * 8 + 2));
        let lane = mixer.bus(buses[2]).unwrap().lane().unwrap();
        assert_eq!(lane.active, Some(2));

        surface.msg_from_device(&mut mixer, press(0, button::SHIFT));
        surface.msg_from_device(&mut mixer, press(0, 4 * 8 + 2));
        let lane = mixer.bus(buses[2]).unwrap().lane().unwrap();
        assert_eq!(lane.focused, Some(0));
        assert_eq!(lane.active, Some(2));
    }

    #[test]
    fn wrappable_knob() {
        let (mut mixer, buses) = scenario();
        let effect = mixer.add_effect(buses[0]).unwrap();
        let hue = mixer
            .add_parameter(
                effect,
                "Hue",
                ParamKind::Discrete {
                    value: 2,
                    min: 0,
                    max: 3,
                    wrappable: true,
                },
            )
            .unwrap();
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        surface.msg_from_device(&mut mixer, device_knob(0, 0x7f));
        assert!(matches!(
            mixer.parameter(hue).unwrap().kind,
            ParamKind::Discrete { value: 0, .. }
        ));

        let out = surface.msg_from_device(&mut mixer, device_knob(0, 0));
        assert!(matches!(
            mixer.parameter(hue).unwrap().kind,
            ParamKind::Discrete { value: 3, .. }
        ));
        let ring = knob::to_device(mixer.parameter(hue).unwrap());
        assert!(contains(&out, &device_knob(0, ring)));
    }

    #[test]
    fn shared_parameter_is_bound_once() {
        let (mut mixer, buses) = scenario();
        let effect = mixer.add_effect(buses[0]).unwrap();
        let param = mixer
            .add_parameter(effect, "Level", ParamKind::Continuous { value: 0.5 })
            .unwrap();
        assert!(mixer.map_remote_control(effect, param));
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        assert_eq!(surface.registry().refs(param.into(), Listener::Knob), 2);
        assert_eq!(surface.registry().listeners(param.into()), vec![Listener::Knob]);

        let out = surface.msg_from_device(&mut mixer, device_knob(1, 0x7f));
        assert!(contains(&out, &device_knob(0, 0x7f)));
        assert!(contains(&out, &device_knob(1, 0x7f)));
    }

    #[test]
    fn fader_sets_level() {
        let (mut mixer, buses) = scenario();
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        let fader = Msg::control_change(Channel::from(1), 7, 0);
        surface.msg_from_device(&mut mixer, fader);
        assert_eq!(mixer.bus(buses[1]).unwrap().level, 0f64);

        let master = Msg::control_change(Channel::from(0), 14, 0);
        surface.msg_from_device(&mut mixer, master);
        assert_eq!(mixer.master().level, 0f64);
    }

    #[test]
    fn clip_launch_cycle() {
        let (mut mixer, buses) = scenario();
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        surface.msg_from_device(&mut mixer, press(0, button::SESSION));
        assert_eq!(surface.state().grid_mode, GridMode::Clip);

        // column 1, row 0
        let note = 4 * 8 + 1;
        surface.msg_from_device(&mut mixer, press(0, note));
        let clip = mixer.bus(buses[1]).unwrap().clip(0).unwrap();
        assert_eq!(surface.grid_column(&mixer, 1)[0], Color::Inactive);

        surface.msg_from_device(&mut mixer, press(0, note));
        assert_eq!(mixer.focused_clip(), Some(clip));
        assert_eq!(surface.grid_column(&mixer, 1)[0], Color::Play);

        surface.msg_from_device(&mut mixer, press(0, note));
        assert_eq!(surface.grid_column(&mixer, 1)[0], Color::Inactive);
    }

    #[test]
    fn scrolling() {
        let mut mixer = Mixer::new();
        let buses = (0..10).map(|_| mixer.add_regular_bus()).collect::<Vec<_>>();
        for _ in 0..7 {
            mixer.add_pattern(buses[0]).unwrap();
        }
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        surface.msg_from_device(&mut mixer, press(0, button::BANK_RIGHT));
        surface.msg_from_device(&mut mixer, press(0, button::BANK_RIGHT));
        surface.msg_from_device(&mut mixer, press(0, button::BANK_RIGHT));
        assert_eq!(surface.column_offset(), 2);
        assert!(!surface.registry().is_bound(buses[0].into(), Listener::Column));
        assert!(surface.registry().is_bound(buses[9].into(), Listener::Column));

        surface.msg_from_device(&mut mixer, press(0, button::BANK_LEFT));
        surface.msg_from_device(&mut mixer, press(0, button::BANK_LEFT));
        assert_eq!(surface.column_offset(), 0);

        surface.msg_from_device(&mut mixer, press(0, button::BANK_DOWN));
        surface.msg_from_device(&mut mixer, press(0, button::BANK_DOWN));
        surface.msg_from_device(&mut mixer, press(0, button::BANK_DOWN));
        assert_eq!(surface.pattern_window(buses[0]).unwrap().base(), 2);
    }

    #[test]
    fn refresh_is_idempotent() {
        let (mut mixer, _) = scenario();
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        let first = surface.refresh(&mixer).into_iter().collect::<Vec<_>>();
        let second = surface.refresh(&mixer).into_iter().collect::<Vec<_>>();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn disabled_surface_is_silent() {
        let (mut mixer, buses) = scenario();
        let mut surface = Surface::new(&APC40_MK2);

        assert!(surface
            .msg_from_device(&mut mixer, press(0, button::PLAY))
            .is_empty());
        assert!(mixer.transport_log().is_empty());

        mixer.add_pattern(buses[0]);
        assert!(surface.host_changed(&mut mixer).is_empty());
        assert!(mixer.take_changes().is_empty());
        assert!(surface.disable(&mut mixer).is_empty());
    }

    #[test]
    fn asynchronous_transition() {
        let (mut mixer, buses) = scenario();
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        assert!(mixer.begin_transition(buses[2], 2));
        let out = surface.host_changed(&mut mixer);
        assert_eq!(
            surface.grid_column(&mixer, 2)[..3],
            [Color::Active, Color::Focused, Color::Transitioning],
        );
        // column 2, row 2
        assert!(contains(&out, &Msg::note_on(Channel::from(0), 2 * 8 + 2, 13)));

        mixer.finish_transition(buses[2]);
        surface.host_changed(&mut mixer);
        assert_eq!(
            surface.grid_column(&mixer, 2)[..3],
            [Color::Present, Color::Focused, Color::Active],
        );
    }

    #[test]
    fn unmapped_input_is_ignored() {
        let (mut mixer, _) = scenario();
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);
        let state = surface.state();

        let out = surface.msg_from_device(&mut mixer, Msg::control_change(Channel::from(5), 99, 3));
        assert!(out.is_empty());
        assert_eq!(surface.state(), state);

        let out = surface.msg_from_device(&mut mixer, Msg::new_sysex(&[0x47, 0x7f]));
        assert!(out.is_empty());
    }

    #[test]
    fn teardown_releases_everything() {
        let (mut mixer, buses) = scenario();
        let effect = mixer.add_effect(buses[2]).unwrap();
        let param = mixer
            .add_parameter(effect, "Gain", ParamKind::Continuous { value: 0.2 })
            .unwrap();
        mixer.map_remote_control(effect, param);
        let mut surface = Surface::new(&APC40_MK2);
        surface.enable(&mut mixer);

        mixer.set_focus(Focus {
            primary: 2,
            ..mixer.focus()
        });
        surface.host_changed(&mut mixer);
        surface.msg_from_device(&mut mixer, press(0, button::DEVICE_RIGHT));
        assert_eq!(surface.focus().device(), Some(effect));
        assert!(mixer.total_attention() > 0);

        let extra = mixer.add_regular_bus();
        mixer.add_pattern(extra);
        surface.host_changed(&mut mixer);
        mixer.remove_effect(effect);
        surface.host_changed(&mut mixer);
        assert_ne!(surface.focus().device(), Some(effect));
        mixer.remove_bus(buses[0]);
        surface.host_changed(&mut mixer);
        surface.msg_from_device(&mut mixer, press(0, button::MASTER_SELECT));

        let out = surface.disable(&mut mixer);
        assert!(!surface.is_enabled());
        assert!(surface.registry().is_empty());
        assert_eq!(mixer.total_attention(), 0);
        assert_eq!(
            out.iter().last(),
            Some(&Msg::new_sysex(&[
                0x47, 0x7f, 0x29, 0x60, 0x00, 0x04, 0x40, 0x09, 0x07, 0x01
            ]))
        );

        // Idempotent
        assert!(surface.disable(&mut mixer).is_empty());
    }

    /// Deterministic pseudo-random sequence of operations.
    struct Ops(u64);

    impl Ops {
        fn pick(&mut self, bound: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((self.0 >> 33) as usize) % bound.max(1)
        }
    }

    #[test]
    fn teardown_after_any_sequence() {
        for seed in 0..200 {
            let mut ops = Ops(seed);
            let mut mixer = Mixer::new();
            for _ in 0..3 {
                let bus = mixer.add_regular_bus();
                mixer.add_pattern(bus);
            }
            let mut surface = Surface::new(&APC40_MK2);
            surface.enable(&mut mixer);

            for _ in 0..60 {
                let count = mixer.bus_count();
                let some_bus = mixer.bus_at(ops.pick(count)).map(|bus| bus.id);

                match ops.pick(14) {
                    0 => {
                        let bus = mixer.add_regular_bus();
                        mixer.add_pattern(bus);
                    }
                    1 if count > 1 => {
                        if let Some(bus) = some_bus {
                            mixer.remove_bus(bus);
                        }
                    }
                    2 => {
                        let index = ops.pick(count);
                        if let Some(bus) = some_bus {
                            mixer.move_bus(bus, index);
                        }
                    }
                    3 => {
                        if let Some(bus) = some_bus {
                            mixer.add_pattern(bus);
                        }
                    }
                    4 => {
                        let device = surface
                            .focus()
                            .device()
                            .and_then(|device| mixer.device(device))
                            .map(|device| (device.id, device.kind));
                        match device {
                            Some((id, DeviceKind::Pattern { .. })) => {
                                mixer.remove_pattern(id);
                            }
                            Some((id, _)) => {
                                mixer.remove_effect(id);
                            }
                            None => (),
                        }
                    }
                    5 => {
                        let effect = some_bus.and_then(|bus| mixer.add_effect(bus));
                        if let Some(effect) = effect {
                            let kind = ParamKind::Continuous { value: 0.5 };
                            if let Some(param) = mixer.add_parameter(effect, "Mix", kind) {
                                if ops.pick(2) == 0 {
                                    mixer.map_remote_control(effect, param);
                                }
                            }
                        }
                    }
                    6 => mixer.set_focus(Focus {
                        primary: ops.pick(count + 1),
                        aux: ops.pick(count + 1),
                        aux_sticky: ops.pick(3) == 0,
                        performance: ops.pick(3) == 0,
                    }),
                    7 => {
                        let column = ops.pick(8) as u8;
                        surface.msg_from_device(&mut mixer, press(column, button::SELECT));
                    }
                    8 => {
                        surface.msg_from_device(&mut mixer, press(0, button::MASTER_SELECT));
                    }
                    9 => {
                        let bank = [
                            button::BANK_LEFT,
                            button::BANK_RIGHT,
                            button::BANK_UP,
                            button::BANK_DOWN,
                        ];
                        let note = bank[ops.pick(4)];
                        surface.msg_from_device(&mut mixer, press(0, note));
                    }
                    10 => {
                        let note = ops.pick(40) as u8;
                        surface.msg_from_device(&mut mixer, press(0, note));
                    }
                    11 => {
                        let note = [button::SHIFT, button::SESSION][ops.pick(2)];
                        if ops.pick(2) == 0 {
                            surface.msg_from_device(&mut mixer, press(0, note));
                        } else {
                            surface.msg_from_device(&mut mixer, release(0, note));
                        }
                    }
                    12 => {
                        let note = [button::DEVICE_LEFT, button::DEVICE_RIGHT][ops.pick(2)];
                        surface.msg_from_device(&mut mixer, press(0, note));
                    }
                    _ => {
                        let idx = ops.pick(8) as u8;
                        let value = ops.pick(128) as u8;
                        surface.msg_from_device(&mut mixer, device_knob(idx, value));
                    }
                }

                surface.host_changed(&mut mixer);

                let focused = mixer.bus_or_master(mixer.focus().effective_index());
                assert_eq!(surface.focus().bus(), focused.map(|bus| bus.id), "seed {seed}");
            }

            surface.disable(&mut mixer);
            assert!(surface.registry().is_empty(), "seed {seed}");
            assert_eq!(mixer.total_attention(), 0, "seed {seed}");
        }
    }
}
