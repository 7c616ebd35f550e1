//! Statically declared device address tables.

use super::{dispatch::Control, grid::BlendRule, Color};
use crate::midi::{self, Channel, Event};

/// Arithmetic of the grid notes: `note = base + row * stride + column`.
#[derive(Clone, Copy, Debug)]
pub struct GridLayout {
    pub chan: u8,
    pub base: u8,
    pub stride: u8,
    /// Rows are numbered from the top when `true`, from the bottom otherwise.
    pub top_row_first: bool,
}

/// Notes of the buttons found on every column, sent on the column's channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColumnButtons {
    pub activate: Option<u8>,
    pub cue: Option<u8>,
    pub arm: Option<u8>,
    pub select: Option<u8>,
    pub crossfade: Option<u8>,
    pub clip_stop: Option<u8>,
}

/// Notes of the buttons sent on the global channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalButtons {
    pub shift: Option<u8>,
    pub bank_up: Option<u8>,
    pub bank_down: Option<u8>,
    pub bank_left: Option<u8>,
    pub bank_right: Option<u8>,
    pub play: Option<u8>,
    pub stop: Option<u8>,
    pub record: Option<u8>,
    pub tap_tempo: Option<u8>,
    pub nudge_up: Option<u8>,
    pub nudge_down: Option<u8>,
    pub device_on: Option<u8>,
    pub device_left: Option<u8>,
    pub device_right: Option<u8>,
    pub master_select: Option<u8>,
    pub grid_mode: Option<u8>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Knobs {
    /// First of the consecutive device control CCs, on the global channel.
    pub device_base: Option<u8>,
    pub device_count: usize,
    /// Fader CC, on the column's channel.
    pub fader: Option<u8>,
    /// Master fader CC, on the global channel.
    pub master_fader: Option<u8>,
}

#[derive(Debug)]
pub struct Profile {
    pub name: &'static str,
    pub columns: usize,
    pub rows: usize,
    pub global_chan: u8,
    pub grid: GridLayout,
    pub column_buttons: ColumnButtons,
    pub buttons: GlobalButtons,
    pub knobs: Knobs,
    pub blend_rule: BlendRule,
    pub palette: fn(Color) -> u8,
    /// Switches the device to its bidirectional mode, without sysex framing.
    pub enable_sysex: Option<&'static [u8]>,
    /// Restores the device generic mode.
    pub disable_sysex: Option<&'static [u8]>,
}

/// Physical interaction decoded from an incoming message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Press,
    Release,
    Value(u8),
}

impl Profile {
    fn global_chan(&self) -> Channel {
        Channel::from(self.global_chan)
    }

    fn global_button(&self, note: u8) -> Option<Control> {
        use Control::*;

        let b = &self.buttons;
        [
            (b.shift, Shift),
            (b.bank_up, BankUp),
            (b.bank_down, BankDown),
            (b.bank_left, BankLeft),
            (b.bank_right, BankRight),
            (b.play, Play),
            (b.stop, Stop),
            (b.record, Record),
            (b.tap_tempo, TapTempo),
            (b.nudge_up, NudgeUp),
            (b.nudge_down, NudgeDown),
            (b.device_on, DeviceOn),
            (b.device_left, DeviceLeft),
            (b.device_right, DeviceRight),
            (b.master_select, MasterSelect),
            (b.grid_mode, GridMode),
        ]
        .into_iter()
        .find_map(|(addr, control)| (addr == Some(note)).then_some(control))
    }

    fn column_button(&self, column: usize, note: u8) -> Option<Control> {
        use Control::*;

        if column >= self.columns {
            return None;
        }

        let b = &self.column_buttons;
        [
            (b.activate, Activate(column)),
            (b.cue, Cue(column)),
            (b.arm, Arm(column)),
            (b.select, Select(column)),
            (b.crossfade, Crossfade(column)),
            (b.clip_stop, ClipStop(column)),
        ]
        .into_iter()
        .find_map(|(addr, control)| (addr == Some(note)).then_some(control))
    }

    fn grid_cell(&self, chan: Channel, note: u8) -> Option<Control> {
        if chan != Channel::from(self.grid.chan) {
            return None;
        }

        let rel = note.checked_sub(self.grid.base)?;
        let (row, column) = (
            (rel / self.grid.stride) as usize,
            (rel % self.grid.stride) as usize,
        );
        if row >= self.rows || column >= self.columns {
            return None;
        }

        let row = if self.grid.top_row_first {
            row
        } else {
            self.rows - 1 - row
        };

        Some(Control::Grid { column, row })
    }

    fn grid_note(&self, column: usize, row: usize) -> u8 {
        let row = if self.grid.top_row_first {
            row
        } else {
            self.rows - 1 - row
        };

        self.grid.base + row as u8 * self.grid.stride + column as u8
    }

    /// Decodes the control & interaction `event` designates.
    pub fn decode(&self, event: Event) -> Option<(Control, Input)> {
        match event {
            Event::NoteOn { chan, note, .. } | Event::NoteOff { chan, note, .. } => {
                let input = if matches!(event, Event::NoteOn { .. }) {
                    Input::Press
                } else {
                    Input::Release
                };

                let control = (chan == self.global_chan())
                    .then(|| self.global_button(note))
                    .flatten()
                    .or_else(|| self.column_button(chan.idx(), note))
                    .or_else(|| self.grid_cell(chan, note))?;

                Some((control, input))
            }
            Event::ControlChange {
                chan,
                controller,
                value,
            } => {
                let k = &self.knobs;

                let control = if chan == self.global_chan() && k.master_fader == Some(controller) {
                    Control::MasterFader
                } else if k.fader == Some(controller) && chan.idx() < self.columns {
                    Control::Fader(chan.idx())
                } else {
                    match k.device_base {
                        Some(base) if chan == self.global_chan() => {
                            let idx = controller.checked_sub(base)? as usize;
                            if idx >= k.device_count {
                                return None;
                            }
                            Control::DeviceKnob(idx)
                        }
                        _ => return None,
                    }
                };

                Some((control, Input::Value(value)))
            }
            Event::SysEx(_) | Event::Other(_) => None,
        }
    }

    /// Channel & note (or CC) of the LED or ring which displays `control`.
    pub fn address(&self, control: Control) -> Option<(Channel, u8)> {
        use Control::*;

        let (b, cb) = (&self.buttons, &self.column_buttons);
        let global = |addr: Option<u8>| addr.map(|addr| (self.global_chan(), addr));
        let column = |column: usize, addr: Option<u8>| {
            (column < self.columns)
                .then_some(addr)
                .flatten()
                .map(|addr| (Channel::from(column as u8), addr))
        };

        match control {
            Shift => global(b.shift),
            BankUp => global(b.bank_up),
            BankDown => global(b.bank_down),
            BankLeft => global(b.bank_left),
            BankRight => global(b.bank_right),
            Play => global(b.play),
            Stop => global(b.stop),
            Record => global(b.record),
            TapTempo => global(b.tap_tempo),
            NudgeUp => global(b.nudge_up),
            NudgeDown => global(b.nudge_down),
            DeviceOn => global(b.device_on),
            DeviceLeft => global(b.device_left),
            DeviceRight => global(b.device_right),
            MasterSelect => global(b.master_select),
            GridMode => global(b.grid_mode),
            Activate(col) => column(col, cb.activate),
            Cue(col) => column(col, cb.cue),
            Arm(col) => column(col, cb.arm),
            Select(col) => column(col, cb.select),
            Crossfade(col) => column(col, cb.crossfade),
            ClipStop(col) => column(col, cb.clip_stop),
            Grid { column, row } if column < self.columns && row < self.rows => Some((
                Channel::from(self.grid.chan),
                self.grid_note(column, row),
            )),
            Grid { .. } => None,
            DeviceKnob(idx) if idx < self.knobs.device_count => self
                .knobs
                .device_base
                .map(|base| (self.global_chan(), base + idx as u8)),
            DeviceKnob(_) | Fader(_) | MasterFader => None,
        }
    }

    /// LED message displaying `control` with `color`.
    pub fn led(&self, control: Control, color: Color) -> Option<midi::Msg> {
        let (chan, addr) = self.address(control)?;
        let value = (self.palette)(color);

        Some(match control {
            Control::DeviceKnob(_) => midi::Msg::control_change(chan, addr, value),
            _ => midi::Msg::note_on(chan, addr, value),
        })
    }

    /// Knob ring message displaying `value`.
    pub fn ring(&self, knob: usize, value: u8) -> Option<midi::Msg> {
        let (chan, addr) = self.address(Control::DeviceKnob(knob))?;
        Some(midi::Msg::control_change(chan, addr, value))
    }
}
