pub mod device;

pub mod dispatch;

pub mod error;
pub use error::Error;

mod factory;
pub use factory::{Factory, FACTORY};

pub mod focus;
pub mod grid;
pub mod knob;
pub mod profile;
pub mod registry;

mod surface;
pub use surface::Surface;

use crate::{midi, model::Host};

/// Symbolic LED colors, translated to device values by each profile palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Off,
    On,
    Active,
    Transitioning,
    Focused,
    FocusedDisabled,
    Enabled,
    Present,
    Play,
    Arm,
    Inactive,
    CrossfadeA,
    CrossfadeB,
}

pub trait ControlSurface: Send + 'static {
    fn name(&self) -> &'static str;

    /// Binds the surface to `host`, returning the mode handshake & initial LED state.
    fn enable(&mut self, host: &mut dyn Host) -> midi::MsgList;

    /// Releases everything held on `host` and restores the device generic mode.
    fn disable(&mut self, host: &mut dyn Host) -> midi::MsgList;

    fn is_enabled(&self) -> bool;

    fn msg_from_device(&mut self, host: &mut dyn Host, msg: midi::Msg) -> midi::MsgList;

    /// Processes the changes `host` recorded since last call.
    fn host_changed(&mut self, host: &mut dyn Host) -> midi::MsgList;
}
