use anyhow::Context;
use crossbeam_channel as channel;
use std::{path::PathBuf, time::Duration};

use mixer_ctrl_surf::{
    ctrl_surf::FACTORY,
    midi,
    model::{Host, Mixer},
    Config, ControlSurface,
};

/// Period at which the host is polled for changes it made on its own.
const HOST_POLL: Duration = Duration::from_millis(50);

fn demo_mixer(config: &Config) -> Mixer {
    let mut mixer = Mixer::new();

    for _ in 0..config.buses {
        let bus = mixer.add_regular_bus();
        for _ in 0..config.patterns_per_bus {
            mixer.add_pattern(bus);
        }
        mixer.add_effect(bus);
    }
    mixer.take_changes();

    mixer
}

fn send(ports: &mut midi::Ports, list: midi::MsgList) {
    for msg in list {
        if let Err(err) = ports.send(&msg) {
            log::error!("Couldn't send {}: {err}", msg.display());
        }
    }
}

/// Feeds device messages & host changes to `surface` until shutdown is requested.
///
/// The surface is left enabled: disabling it is the caller's disposal step.
fn run_loop(
    surface: &mut dyn ControlSurface,
    host: &mut dyn Host,
    msg_rx: &channel::Receiver<midi::Msg>,
    shutdown_rx: &channel::Receiver<()>,
    mut output: impl FnMut(midi::MsgList),
) {
    let ticker = channel::tick(HOST_POLL);

    loop {
        channel::select! {
            recv(msg_rx) -> msg => {
                match msg {
                    Ok(msg) => {
                        log::trace!("Device msg {}", msg.display());
                        output(surface.msg_from_device(host, msg));
                    }
                    Err(err) => {
                        log::error!("Error MIDI msg channel: {err}");
                        break;
                    }
                }
            }
            recv(ticker) -> _ => {
                output(surface.host_changed(host));
            }
            recv(shutdown_rx) -> _ => {
                log::info!("Shutdown requested");
                break;
            }
        }
    }

    log::debug!("Shutting down surface loop");
}

fn run(config: Config) -> anyhow::Result<()> {
    log::info!("Available profiles: {:?}", FACTORY.list().collect::<Vec<_>>());
    let mut surface = FACTORY
        .build(&config.profile)
        .with_context(|| format!("Building surface for {}", config.profile))?;

    let (shutdown_tx, shutdown_rx) = channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .context("Installing the Ctrl-C handler")?;

    let mut ports = midi::Ports::new(config.client_name.as_str());
    match ports.list() {
        Ok(list) => log::debug!("MIDI ports: {list:?}"),
        Err(err) => log::warn!("Couldn't list MIDI ports: {err}"),
    }

    let (msg_tx, msg_rx) = channel::unbounded();
    let port = ports
        .connect(&config.port, msg_tx)
        .with_context(|| format!("Connecting to {}", config.port))?;
    log::info!("Connected to {port}");

    let mut mixer = demo_mixer(&config);

    let list = surface.enable(&mut mixer);
    send(&mut ports, list);

    run_loop(
        surface.as_mut(),
        &mut mixer,
        &msg_rx,
        &shutdown_rx,
        |list| send(&mut ports, list),
    );

    // Restores the device generic mode & releases everything held on the host.
    let list = surface.disable(&mut mixer);
    send(&mut ports, list);
    ports.disconnect();

    log::info!("Exiting");

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::load(path.as_deref()).context("Loading configuration")?;

    env_logger::Builder::new()
        .filter_level(config.log_level)
        .init();

    run(config).map_err(|err| {
        log::error!("{err:#}");
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_ends_loop_with_device_connected() {
        let config = Config::load(None).unwrap();
        let mut mixer = demo_mixer(&config);
        let mut surface = FACTORY.build(&config.profile).unwrap();
        assert!(!surface.enable(&mut mixer).is_empty());

        // The sender stays alive, as it does when owned by the MIDI input.
        let (_msg_tx, msg_rx) = channel::unbounded();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        shutdown_tx.send(()).unwrap();

        let mut sent = Vec::new();
        run_loop(surface.as_mut(), &mut mixer, &msg_rx, &shutdown_rx, |list| {
            sent.extend(list)
        });

        assert!(surface.is_enabled());
        assert!(mixer.total_attention() > 0);

        let out = surface.disable(&mut mixer);
        assert!(!surface.is_enabled());
        assert_eq!(mixer.total_attention(), 0);
        assert_eq!(
            out.into_iter().last(),
            Some(midi::Msg::new_sysex(&[
                0x47, 0x7f, 0x29, 0x60, 0x00, 0x04, 0x40, 0x09, 0x07, 0x01
            ]))
        );
    }
}
