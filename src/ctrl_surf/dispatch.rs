//! Hardware input state machine.
//!
//! Turns decoded controls into surface actions, depending on the shift
//! modifier, the grid mode and whether the control is momentary or toggle.

use super::profile::Input;
use crate::model::{BusFlags, Transport};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    Shift,
    BankUp,
    BankDown,
    BankLeft,
    BankRight,
    Play,
    Stop,
    Record,
    TapTempo,
    NudgeUp,
    NudgeDown,
    DeviceOn,
    DeviceLeft,
    DeviceRight,
    MasterSelect,
    GridMode,
    Activate(usize),
    Cue(usize),
    Arm(usize),
    Select(usize),
    Crossfade(usize),
    ClipStop(usize),
    Grid { column: usize, row: usize },
    DeviceKnob(usize),
    Fader(usize),
    MasterFader,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlClass {
    /// Acts on press, the LED echoes both press & release.
    Momentary,
    /// Acts on press, release is ignored: state lives in the model.
    Toggle,
    /// Knobs & faders.
    Continuous,
}

impl Control {
    pub fn class(self) -> ControlClass {
        use Control::*;

        match self {
            Shift | BankUp | BankDown | BankLeft | BankRight | Play | Stop | Record | TapTempo
            | NudgeUp | NudgeDown | DeviceLeft | DeviceRight | ClipStop(_) => ControlClass::Momentary,
            DeviceOn | MasterSelect | GridMode | Activate(_) | Cue(_) | Arm(_) | Select(_)
            | Crossfade(_) | Grid { .. } => ControlClass::Toggle,
            DeviceKnob(_) | Fader(_) | MasterFader => ControlClass::Continuous,
        }
    }

    fn transport(self) -> Option<Transport> {
        use Control::*;

        Some(match self {
            Play => Transport::Play,
            Stop => Transport::Stop,
            Record => Transport::Record,
            TapTempo => Transport::TapTempo,
            NudgeUp => Transport::NudgeUp,
            NudgeDown => Transport::NudgeDown,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Shift {
    #[default]
    Unshifted,
    Shifted,
}

impl Shift {
    pub fn is_shifted(self) -> bool {
        matches!(self, Shift::Shifted)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GridMode {
    #[default]
    Pattern,
    Clip,
}

/// Surface-local dispatch state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct State {
    pub shift: Shift,
    pub grid_mode: GridMode,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    Transport(Transport),
    ShiftChanged,
    GridModeChanged,
    ScrollColumns(isize),
    /// Scroll by rows, or by pages when `pages` is `true`.
    ScrollRows { delta: isize, pages: bool },
    PreviousDevice,
    NextDevice,
    ToggleDeviceEnabled,
    ToggleBusFlag { column: usize, flag: BusFlags },
    CycleCrossfade(usize),
    FocusColumn(usize),
    FocusMaster,
    StopClips(usize),
    LaunchPattern { column: usize, row: usize },
    FocusPattern { column: usize, row: usize },
    LaunchClip { column: usize, row: usize, looping: bool },
    DeviceKnob { knob: usize, value: u8 },
    Fader { column: usize, value: u8 },
    MasterFader(u8),
}

/// Result of dispatching one hardware interaction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dispatched {
    /// LED to light (`true`) or switch off for momentary controls.
    pub echo: Option<(Control, bool)>,
    pub action: Option<Action>,
}

pub fn dispatch(state: &mut State, control: Control, input: Input) -> Dispatched {
    let class = control.class();
    let is_press = match (class, input) {
        (ControlClass::Continuous, Input::Value(_)) => true,
        (ControlClass::Continuous, _) | (_, Input::Value(_)) => {
            log::warn!("Unexpected {input:?} for {control:?}");
            return Dispatched::default();
        }
        (_, input) => input == Input::Press,
    };

    let echo = (class == ControlClass::Momentary).then_some((control, is_press));

    // Modifier & transport act regardless of shift state.
    if control == Control::Shift {
        state.shift = if is_press {
            Shift::Shifted
        } else {
            Shift::Unshifted
        };

        return Dispatched {
            echo,
            action: Some(Action::ShiftChanged),
        };
    }

    if !is_press {
        return Dispatched { echo, action: None };
    }

    if let Some(transport) = control.transport() {
        return Dispatched {
            echo,
            action: Some(Action::Transport(transport)),
        };
    }

    use Action::*;
    use Control as C;

    let shifted = state.shift.is_shifted();
    let action = match (control, input) {
        (C::BankLeft, _) if shifted => PreviousDevice,
        (C::BankRight, _) if shifted => NextDevice,
        (C::BankLeft, _) => ScrollColumns(-1),
        (C::BankRight, _) => ScrollColumns(1),
        (C::BankUp, _) => ScrollRows {
            delta: -1,
            pages: shifted,
        },
        (C::BankDown, _) => ScrollRows {
            delta: 1,
            pages: shifted,
        },
        (C::DeviceLeft, _) => PreviousDevice,
        (C::DeviceRight, _) => NextDevice,
        (C::DeviceOn, _) => ToggleDeviceEnabled,
        (C::GridMode, _) => {
            state.grid_mode = match state.grid_mode {
                GridMode::Pattern => GridMode::Clip,
                GridMode::Clip => GridMode::Pattern,
            };
            GridModeChanged
        }
        (C::MasterSelect, _) => FocusMaster,
        (C::Activate(column), _) => ToggleBusFlag {
            column,
            flag: BusFlags::ENABLED,
        },
        (C::Cue(column), _) => ToggleBusFlag {
            column,
            flag: BusFlags::CUE,
        },
        (C::Arm(column), _) => ToggleBusFlag {
            column,
            flag: BusFlags::ARMED,
        },
        (C::Select(column), _) => FocusColumn(column),
        (C::Crossfade(column), _) => CycleCrossfade(column),
        (C::ClipStop(column), _) => StopClips(column),
        (C::Grid { column, row }, _) => match state.grid_mode {
            GridMode::Pattern if shifted => FocusPattern { column, row },
            GridMode::Pattern => LaunchPattern { column, row },
            GridMode::Clip => LaunchClip {
                column,
                row,
                looping: shifted,
            },
        },
        (C::DeviceKnob(knob), Input::Value(value)) => DeviceKnob { knob, value },
        (C::Fader(column), Input::Value(value)) => Fader { column, value },
        (C::MasterFader, Input::Value(value)) => MasterFader(value),
        (C::Shift | C::Play | C::Stop | C::Record | C::TapTempo | C::NudgeUp | C::NudgeDown, _)
        | (C::DeviceKnob(_) | C::Fader(_) | C::MasterFader, _) => {
            return Dispatched { echo, action: None }
        }
    };

    Dispatched {
        echo,
        action: Some(action),
    }
}
