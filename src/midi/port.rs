use crossbeam_channel as channel;
use std::sync::Arc;

use super::{Error, Msg};

fn connection_failed(port: &Arc<str>, err: impl std::fmt::Display) -> Error {
    log::error!("Connecting to {port}: {err}");
    Error::Connection(port.clone())
}

/// Input & output connections to a control surface.
///
/// Incoming buffers are forwarded to a channel so that the surface state
/// is only ever touched from the thread which consumes that channel.
pub struct Ports {
    client_name: Arc<str>,
    input: Option<midir::MidiInputConnection<channel::Sender<Msg>>>,
    output: Option<midir::MidiOutputConnection>,
    cur: Option<Arc<str>>,
}

impl Ports {
    pub fn new(client_name: impl Into<Arc<str>>) -> Self {
        Self {
            client_name: client_name.into(),
            input: None,
            output: None,
            cur: None,
        }
    }

    /// Lists the input ports which don't belong to this client.
    pub fn list(&self) -> Result<Vec<Arc<str>>, Error> {
        let midi_in = midir::MidiInput::new(&format!("{} list ports", self.client_name))?;

        let mut list = Vec::new();
        for port in midi_in.ports().iter() {
            let name = midi_in.port_name(port)?;
            if !name.starts_with(self.client_name.as_ref()) {
                list.push(name.into());
            }
        }

        Ok(list)
    }

    /// Connects input & output ports whose name contains `pattern`.
    pub fn connect(
        &mut self,
        pattern: &str,
        msg_tx: channel::Sender<Msg>,
    ) -> Result<Arc<str>, Error> {
        self.disconnect();

        let midi_in = midir::MidiInput::new(&self.client_name)?;
        let in_port = midi_in
            .ports()
            .into_iter()
            .find(|port| self.matches(midi_in.port_name(port), pattern))
            .ok_or_else(|| Error::PortNotFound(pattern.into()))?;
        let in_name: Arc<str> = midi_in.port_name(&in_port)?.into();

        let midi_out = midir::MidiOutput::new(&self.client_name)?;
        let out_port = midi_out
            .ports()
            .into_iter()
            .find(|port| self.matches(midi_out.port_name(port), pattern))
            .ok_or_else(|| Error::PortNotFound(pattern.into()))?;

        let input = midi_in
            .connect(
                &in_port,
                &self.client_name,
                |_ts, buf, msg_tx| {
                    let _ = msg_tx.send(Msg::from(buf));
                },
                msg_tx,
            )
            .map_err(|err| connection_failed(&in_name, err))?;

        let out_name: Arc<str> = midi_out.port_name(&out_port)?.into();
        let output = midi_out
            .connect(&out_port, &self.client_name)
            .map_err(|err| connection_failed(&out_name, err))?;

        log::info!("Connected to {in_name}");

        self.input = Some(input);
        self.output = Some(output);
        self.cur = Some(in_name.clone());

        Ok(in_name)
    }

    fn matches(&self, name: Result<String, midir::PortInfoError>, pattern: &str) -> bool {
        match name {
            Ok(name) => !name.starts_with(self.client_name.as_ref()) && name.contains(pattern),
            Err(err) => {
                log::warn!("Skipping MIDI port: {err}");
                false
            }
        }
    }

    pub fn send(&mut self, msg: &Msg) -> Result<(), Error> {
        let output = self.output.as_mut().ok_or(Error::NotConnected)?;

        output.send(msg).map_err(|err| {
            log::error!("Failed to send MIDI msg {}: {err}", msg.display());
            err
        })?;

        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(input) = self.input.take() {
            let _ = input.close();
        }

        if let Some(output) = self.output.take() {
            let _ = output.close();
        }

        if let Some(cur) = self.cur.take() {
            log::debug!("Disconnected from {cur}");
        }
    }
}

impl Drop for Ports {
    fn drop(&mut self) {
        self.disconnect();
    }
}
