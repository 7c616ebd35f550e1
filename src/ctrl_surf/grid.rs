//! Maps scrollable model lists onto fixed hardware rows.

use super::Color;
use crate::model::{Bus, BusFlags, DeviceKind, Host, PatternLane};

/// The sub-range of a list currently mapped onto the grid rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridWindow {
    base: usize,
    len: usize,
}

impl GridWindow {
    pub fn new(len: usize) -> Self {
        Self { base: 0, len }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.base..self.base + self.len).contains(&index)
    }

    /// List index displayed on `row`.
    pub fn index(&self, row: usize) -> usize {
        self.base + row
    }

    /// Scrolls as little as possible so that `focused` is visible.
    ///
    /// Returns `true` if the window moved.
    pub fn follow(&mut self, focused: usize) -> bool {
        let base = if focused < self.base {
            focused
        } else if focused >= self.base + self.len {
            focused + 1 - self.len
        } else {
            return false;
        };

        self.base = base;
        true
    }

    /// Scrolls by `delta` rows, never before the list start nor past `max_base`.
    pub fn scroll(&mut self, delta: isize, max_base: usize) -> bool {
        let base = self
            .base
            .saturating_add_signed(delta)
            .min(max_base.max(self.base));
        if base == self.base {
            return false;
        }

        self.base = base;
        true
    }
}

/// How blend-mode pattern cells weigh the enabled flag against focus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendRule {
    /// An enabled pattern always shows as enabled.
    EnabledOverFocused,
    /// The focused pattern always shows as focused.
    FocusedOverEnabled,
}

/// What a pattern cell rendering depends on.
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternCell {
    pub index: usize,
    pub count: usize,
    pub active: Option<usize>,
    pub next: Option<usize>,
    pub focused: Option<usize>,
    pub enabled: bool,
}

impl PatternCell {
    fn is_active(&self) -> bool {
        self.active == Some(self.index)
    }

    fn is_transitioning(&self) -> bool {
        self.next == Some(self.index) && self.next != self.active
    }

    fn is_focused(&self) -> bool {
        self.focused == Some(self.index)
    }

    fn is_present(&self) -> bool {
        self.index < self.count
    }
}

/// Playlist precedence: active, transition target, focused, present, off.
pub fn playlist_rule(cell: &PatternCell) -> Color {
    if cell.is_active() {
        Color::Active
    } else if cell.is_transitioning() {
        Color::Transitioning
    } else if cell.is_focused() {
        Color::Focused
    } else if cell.is_present() {
        Color::Present
    } else {
        Color::Off
    }
}

/// Blend precedence: enabled, focused-but-disabled, present, off.
pub fn blend_enabled_first_rule(cell: &PatternCell) -> Color {
    if !cell.is_present() {
        Color::Off
    } else if cell.enabled {
        Color::Enabled
    } else if cell.is_focused() {
        Color::FocusedDisabled
    } else {
        Color::Present
    }
}

/// Blend precedence: focused, enabled, present, off.
pub fn blend_focused_first_rule(cell: &PatternCell) -> Color {
    if !cell.is_present() {
        Color::Off
    } else if cell.is_focused() && cell.enabled {
        Color::Focused
    } else if cell.is_focused() {
        Color::FocusedDisabled
    } else if cell.enabled {
        Color::Enabled
    } else {
        Color::Present
    }
}

fn pattern_enabled(host: &dyn Host, lane: &PatternLane, index: usize) -> bool {
    lane.patterns
        .get(index)
        .and_then(|id| host.device(*id))
        .map_or(false, |device| {
            matches!(device.kind, DeviceKind::Pattern { enabled: true })
        })
}

/// Colors of a pattern column, one per window row.
pub fn pattern_column(
    host: &dyn Host,
    bus: &Bus,
    window: &GridWindow,
    blend_rule: BlendRule,
) -> Vec<Color> {
    let lane = match bus.lane() {
        Some(lane) => lane,
        None => return vec![Color::Off; window.len()],
    };

    (0..window.len())
        .map(|row| {
            let cell = PatternCell {
                index: window.index(row),
                count: lane.patterns.len(),
                active: lane.active,
                next: lane.next,
                focused: lane.focused,
                enabled: pattern_enabled(host, lane, window.index(row)),
            };

            use crate::model::CompositeMode::*;
            match (lane.composite, blend_rule) {
                (Playlist, _) => playlist_rule(&cell),
                (Blend, BlendRule::EnabledOverFocused) => blend_enabled_first_rule(&cell),
                (Blend, BlendRule::FocusedOverEnabled) => blend_focused_first_rule(&cell),
            }
        })
        .collect()
}

pub fn clip_color(host: &dyn Host, bus: &Bus, slot: usize) -> Color {
    let running = match bus.clip(slot).and_then(|clip| host.device(clip)) {
        Some(clip) => matches!(clip.kind, DeviceKind::Clip { running: true, .. }),
        None => return Color::Off,
    };

    if running {
        Color::Play
    } else if bus.flags.contains(BusFlags::ARMED) {
        Color::Arm
    } else {
        Color::Inactive
    }
}

/// Colors of a clip column, one per window row.
pub fn clip_column(host: &dyn Host, bus: &Bus, window: &GridWindow) -> Vec<Color> {
    (0..window.len())
        .map(|row| clip_color(host, bus, window.index(row)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Command, CompositeMode, Mixer};

    #[test]
    fn minimal_scroll() {
        let mut window = GridWindow::new(5);

        assert!(!window.follow(4));
        assert_eq!(window.base(), 0);

        assert!(window.follow(7));
        assert_eq!(window.base(), 3);
        assert!(window.contains(7));

        assert!(!window.follow(3));
        assert!(window.follow(1));
        assert_eq!(window.base(), 1);
    }

    #[test]
    fn follow_keeps_focus_visible() {
        let mut window = GridWindow::new(4);

        for focused in [0, 9, 3, 12, 11, 2, 2, 30, 0] {
            let prev = window.base();
            window.follow(focused);

            assert!(window.base() <= focused && focused < window.base() + window.len());
            let base = window.base();
            assert!(
                base == prev || base == focused || base + window.len() == focused + 1,
                "unexpected base {base} for {focused}"
            );
        }
    }

    #[test]
    fn scroll_bounds() {
        let mut window = GridWindow::new(5);
        assert!(!window.scroll(-1, 10));
        assert!(window.scroll(3, 10));
        assert_eq!(window.base(), 3);
        assert!(!window.scroll(20, 3));
        assert!(window.scroll(-20, 10));
        assert_eq!(window.base(), 0);
    }

    #[test]
    fn playlist_precedence() {
        let cell = |index| PatternCell {
            index,
            count: 3,
            active: Some(0),
            next: Some(2),
            focused: Some(0),
            enabled: false,
        };

        assert_eq!(playlist_rule(&cell(0)), Color::Active);
        assert_eq!(playlist_rule(&cell(1)), Color::Present);
        assert_eq!(playlist_rule(&cell(2)), Color::Transitioning);
        assert_eq!(playlist_rule(&cell(3)), Color::Off);
    }

    #[test]
    fn blend_rules_differ() {
        let focused_enabled = PatternCell {
            index: 1,
            count: 3,
            focused: Some(1),
            enabled: true,
            ..PatternCell::default()
        };
        assert_eq!(blend_enabled_first_rule(&focused_enabled), Color::Enabled);
        assert_eq!(blend_focused_first_rule(&focused_enabled), Color::Focused);

        let focused_disabled = PatternCell {
            enabled: false,
            ..focused_enabled
        };
        assert_eq!(
            blend_enabled_first_rule(&focused_disabled),
            Color::FocusedDisabled
        );
        assert_eq!(
            blend_focused_first_rule(&focused_disabled),
            Color::FocusedDisabled
        );

        let other = PatternCell {
            index: 2,
            ..focused_enabled
        };
        assert_eq!(blend_enabled_first_rule(&other), Color::Enabled);
        assert_eq!(blend_focused_first_rule(&other), Color::Enabled);
    }

    #[test]
    fn pattern_column_render() {
        let mut mixer = Mixer::new();
        let bus = mixer.add_regular_bus();
        for _ in 0..3 {
            mixer.add_pattern(bus);
        }
        mixer.set_focused_pattern(bus, 1);

        let window = GridWindow::new(5);
        let render = |mixer: &Mixer| {
            pattern_column(
                mixer,
                mixer.bus(bus).unwrap(),
                &window,
                BlendRule::EnabledOverFocused,
            )
        };

        let colors = render(&mixer);
        assert_eq!(
            colors,
            vec![
                Color::Active,
                Color::Focused,
                Color::Present,
                Color::Off,
                Color::Off
            ]
        );
        assert_eq!(render(&mixer), colors);

        mixer.set_composite(bus, CompositeMode::Blend);
        let pattern = mixer.bus(bus).unwrap().lane().unwrap().patterns[0];
        mixer.apply(Command::SetDeviceEnabled {
            device: pattern,
            enabled: true,
        });
        assert_eq!(
            render(&mixer),
            vec![
                Color::Enabled,
                Color::FocusedDisabled,
                Color::Present,
                Color::Off,
                Color::Off
            ]
        );
    }

    #[test]
    fn clip_colors() {
        let mut mixer = Mixer::new();
        let bus = mixer.add_regular_bus();
        mixer.apply(Command::CreateClip {
            bus,
            slot: 1,
            looping: false,
        });
        mixer.apply(Command::CreateClip {
            bus,
            slot: 2,
            looping: false,
        });
        let running = mixer.bus(bus).unwrap().clip(2).unwrap();
        mixer.apply(Command::TriggerClip(running));

        let window = GridWindow::new(4);
        assert_eq!(
            clip_column(&mixer, mixer.bus(bus).unwrap(), &window),
            vec![Color::Off, Color::Inactive, Color::Play, Color::Off]
        );

        mixer.apply(Command::SetBusFlag {
            bus,
            flag: BusFlags::ARMED,
            on: true,
        });
        assert_eq!(
            clip_column(&mixer, mixer.bus(bus).unwrap(), &window),
            vec![Color::Off, Color::Arm, Color::Play, Color::Off]
        );
    }
}
