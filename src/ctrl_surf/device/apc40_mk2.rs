use crate::ctrl_surf::{
    grid::BlendRule,
    profile::{ColumnButtons, GlobalButtons, GridLayout, Knobs, Profile},
    Color,
};

mod sysex {
    const HEADER: [u8; 6] = [0x47, 0x7f, 0x29, 0x60, 0x00, 0x04];

    const fn mode(mode: u8) -> [u8; 10] {
        [
            HEADER[0], HEADER[1], HEADER[2], HEADER[3], HEADER[4], HEADER[5], mode, 0x09, 0x07,
            0x01,
        ]
    }

    pub const GENERIC_MODE: [u8; 10] = mode(0x40);
    pub const ALT_LIVE_MODE: [u8; 10] = mode(0x42);
}

pub mod button {
    pub const ARM: u8 = 48;
    pub const SOLO: u8 = 49;
    pub const ACTIVATOR: u8 = 50;
    pub const SELECT: u8 = 51;
    pub const CLIP_STOP: u8 = 52;
    pub const CROSSFADE: u8 = 66;

    pub const DEVICE_ON: u8 = 62;
    pub const DEVICE_LEFT: u8 = 58;
    pub const DEVICE_RIGHT: u8 = 59;
    pub const MASTER_SELECT: u8 = 80;
    pub const PLAY: u8 = 91;
    pub const RECORD: u8 = 93;
    pub const STOP_ALL_CLIPS: u8 = 81;
    pub const BANK_UP: u8 = 94;
    pub const BANK_DOWN: u8 = 95;
    pub const BANK_RIGHT: u8 = 96;
    pub const BANK_LEFT: u8 = 97;
    pub const SHIFT: u8 = 98;
    pub const TAP_TEMPO: u8 = 99;
    pub const NUDGE_MINUS: u8 = 100;
    pub const NUDGE_PLUS: u8 = 101;
    pub const SESSION: u8 = 102;
}

mod knob {
    pub const FADER: u8 = 7;
    pub const MASTER_FADER: u8 = 14;
    pub const DEVICE_CONTROL: u8 = 16;
}

mod rgb {
    pub const OFF: u8 = 0;
    pub const DIM_WHITE: u8 = 1;
    pub const WHITE: u8 = 3;
    pub const RED: u8 = 5;
    pub const ORANGE: u8 = 9;
    pub const YELLOW: u8 = 13;
    pub const GREEN: u8 = 21;
    pub const DIM_BLUE: u8 = 47;
    pub const BLUE: u8 = 45;
}

fn palette(color: Color) -> u8 {
    use Color::*;

    match color {
        Off => rgb::OFF,
        On | CrossfadeA => 1,
        CrossfadeB => 2,
        Active | Play => rgb::GREEN,
        Transitioning => rgb::YELLOW,
        Focused => rgb::BLUE,
        FocusedDisabled => rgb::DIM_BLUE,
        Enabled => rgb::ORANGE,
        Present => rgb::WHITE,
        Arm => rgb::RED,
        Inactive => rgb::DIM_WHITE,
    }
}

pub static APC40_MK2: Profile = Profile {
    name: "APC40 mkII",
    columns: 8,
    rows: 5,
    global_chan: 0,
    grid: GridLayout {
        chan: 0,
        base: 0,
        stride: 8,
        top_row_first: false,
    },
    column_buttons: ColumnButtons {
        activate: Some(button::ACTIVATOR),
        cue: Some(button::SOLO),
        arm: Some(button::ARM),
        select: Some(button::SELECT),
        crossfade: Some(button::CROSSFADE),
        clip_stop: Some(button::CLIP_STOP),
    },
    buttons: GlobalButtons {
        shift: Some(button::SHIFT),
        bank_up: Some(button::BANK_UP),
        bank_down: Some(button::BANK_DOWN),
        bank_left: Some(button::BANK_LEFT),
        bank_right: Some(button::BANK_RIGHT),
        play: Some(button::PLAY),
        stop: Some(button::STOP_ALL_CLIPS),
        record: Some(button::RECORD),
        tap_tempo: Some(button::TAP_TEMPO),
        nudge_up: Some(button::NUDGE_PLUS),
        nudge_down: Some(button::NUDGE_MINUS),
        device_on: Some(button::DEVICE_ON),
        device_left: Some(button::DEVICE_LEFT),
        device_right: Some(button::DEVICE_RIGHT),
        master_select: Some(button::MASTER_SELECT),
        grid_mode: Some(button::SESSION),
    },
    knobs: Knobs {
        device_base: Some(knob::DEVICE_CONTROL),
        device_count: 8,
        fader: Some(knob::FADER),
        master_fader: Some(knob::MASTER_FADER),
    },
    blend_rule: BlendRule::EnabledOverFocused,
    palette,
    enable_sysex: Some(&sysex::ALT_LIVE_MODE),
    disable_sysex: Some(&sysex::GENERIC_MODE),
};
