use crate::model::EntityId;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Listener {listener:?} already bound to {entity}")]
    DuplicateBinding {
        entity: EntityId,
        listener: super::registry::Listener,
    },

    #[error("Listener {listener:?} not bound to {entity}")]
    UnknownBinding {
        entity: EntityId,
        listener: super::registry::Listener,
    },

    #[error("Attempt to rebind {} while its listeners are firing", .0)]
    ReentrantBinding(EntityId),

    #[error("Released attention on {} which had none outstanding", .0)]
    AttentionUnderflow(EntityId),

    #[error("Unknown control surface profile {}", .0)]
    UnknownProfile(String),
}

impl Error {
    /// Reports an internal consistency violation.
    ///
    /// These denote a leak or a double free of tracking state:
    /// fatal in debug builds, logged and ignored otherwise.
    pub fn report(self) {
        log::error!("{self}");
        debug_assert!(false, "{self}");
    }
}
