use crate::ctrl_surf::{
    grid::BlendRule,
    profile::{ColumnButtons, GlobalButtons, GridLayout, Knobs, Profile},
    Color,
};

// Side buttons are the 9th column of the X-Y note layout.
pub mod button {
    pub const BANK_UP: u8 = 8;
    pub const BANK_DOWN: u8 = 24;
    pub const BANK_LEFT: u8 = 40;
    pub const BANK_RIGHT: u8 = 56;
    pub const PLAY: u8 = 72;
    pub const DEVICE_ON: u8 = 88;
    pub const GRID_MODE: u8 = 104;
    pub const SHIFT: u8 = 120;
}

/// Two LEDs (red & green) with 4 brightness levels each.
fn led(red: u8, green: u8) -> u8 {
    0x0c | (red & 0x03) | ((green & 0x03) << 4)
}

fn palette(color: Color) -> u8 {
    use Color::*;

    match color {
        Off => led(0, 0),
        On | Present | CrossfadeA => led(1, 1),
        CrossfadeB => led(1, 0),
        Active | Play => led(0, 3),
        Transitioning => led(3, 3),
        Focused => led(3, 2),
        FocusedDisabled => led(2, 1),
        Enabled => led(0, 2),
        Arm => led(3, 0),
        Inactive => led(1, 0),
    }
}

pub static GRID_8X8: Profile = Profile {
    name: "Grid 8x8",
    columns: 8,
    rows: 8,
    global_chan: 0,
    grid: GridLayout {
        chan: 0,
        base: 0,
        stride: 16,
        top_row_first: true,
    },
    column_buttons: ColumnButtons {
        activate: None,
        cue: None,
        arm: None,
        select: None,
        crossfade: None,
        clip_stop: None,
    },
    buttons: GlobalButtons {
        shift: Some(button::SHIFT),
        bank_up: Some(button::BANK_UP),
        bank_down: Some(button::BANK_DOWN),
        bank_left: Some(button::BANK_LEFT),
        bank_right: Some(button::BANK_RIGHT),
        play: Some(button::PLAY),
        stop: None,
        record: None,
        tap_tempo: None,
        nudge_up: None,
        nudge_down: None,
        device_on: Some(button::DEVICE_ON),
        device_left: None,
        device_right: None,
        master_select: None,
        grid_mode: Some(button::GRID_MODE),
    },
    knobs: Knobs {
        device_base: None,
        device_count: 0,
        fader: None,
        master_fader: None,
    },
    blend_rule: BlendRule::FocusedOverEnabled,
    palette,
    enable_sysex: None,
    disable_sysex: None,
};
