use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use super::{device, profile::Profile, ControlSurface, Error, Surface};

pub static FACTORY: Lazy<Factory> = Lazy::new(|| {
    Factory::default()
        .with(&device::APC40_MK2)
        .with(&device::GRID_8X8)
});

#[derive(Default)]
pub struct Factory(BTreeMap<&'static str, &'static Profile>);

impl Factory {
    pub(super) fn with(mut self, profile: &'static Profile) -> Self {
        self.0.insert(profile.name, profile);
        self
    }

    pub fn list(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn build(&self, name: &str) -> Result<Box<dyn ControlSurface>, Error> {
        self.0
            .get(name)
            .copied()
            .map(|profile| Box::new(Surface::new(profile)) as Box<dyn ControlSurface>)
            .ok_or_else(|| Error::UnknownProfile(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_by_name() {
        assert_eq!(
            FACTORY.list().collect::<Vec<_>>(),
            vec!["APC40 mkII", "Grid 8x8"]
        );

        let surface = FACTORY.build("APC40 mkII").unwrap();
        assert_eq!(surface.name(), "APC40 mkII");
        assert!(!surface.is_enabled());

        assert!(matches!(
            FACTORY.build("Launchpad"),
            Err(Error::UnknownProfile(_))
        ));
    }
}
