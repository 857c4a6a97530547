//! PCM playback via rodio.
//!
//! Plays tutor audio through the default output device. The rodio output
//! stream is not `Send`, so a dedicated worker thread owns it and the
//! handle talks to it over a channel. Queued audio can be cancelled at
//! any time, which is how the session silences pending speech output when
//! a call ends or the far side interrupts itself.

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Sender};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use std::thread;

enum PlaybackCommand {
    Enqueue { samples: Vec<f32>, sample_rate: u32 },
    Cancel,
    SetVolume(f32),
}

pub struct Playback {
    commands: Option<Sender<PlaybackCommand>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Playback {
    /// Open the default audio output device on a worker thread.
    pub fn new() -> Result<Self> {
        let (commands, command_rx) = unbounded::<PlaybackCommand>();
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);

        let worker = thread::spawn(move || {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(parts) => parts,
                Err(err) => {
                    let _ = ready_tx.send(Err(format!("failed to open audio output: {err}")));
                    return;
                }
            };
            let sink = match Sink::try_new(&handle) {
                Ok(sink) => sink,
                Err(err) => {
                    let _ = ready_tx.send(Err(format!("failed to create audio sink: {err}")));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            // The stream must stay alive for the sink to produce sound.
            let _stream = stream;

            for command in command_rx {
                match command {
                    PlaybackCommand::Enqueue {
                        samples,
                        sample_rate,
                    } => {
                        if !samples.is_empty() {
                            sink.append(SamplesBuffer::new(1, sample_rate, samples));
                        }
                    }
                    PlaybackCommand::Cancel => sink.stop(),
                    PlaybackCommand::SetVolume(volume) => {
                        sink.set_volume(volume.clamp(0.0, 1.0))
                    }
                }
            }
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands: Some(commands),
                worker: Some(worker),
            }),
            Ok(Err(message)) => {
                let _ = worker.join();
                Err(anyhow!(message))
            }
            Err(_) => {
                let _ = worker.join();
                Err(anyhow!("audio output worker died during startup"))
            }
        }
    }

    fn send(&self, command: PlaybackCommand) {
        if let Some(commands) = &self.commands {
            let _ = commands.send(command);
        }
    }

    /// Queue mono f32 samples for playback without blocking.
    pub fn enqueue(&self, samples: &[f32], sample_rate: u32) {
        self.send(PlaybackCommand::Enqueue {
            samples: samples.to_vec(),
            sample_rate,
        });
    }

    /// Drop everything queued and stop the current source immediately.
    pub fn cancel(&self) {
        self.send(PlaybackCommand::Cancel);
    }

    /// Set playback volume (0.0 = silent, 1.0 = full volume).
    pub fn set_volume(&self, volume: f32) {
        self.send(PlaybackCommand::SetVolume(volume));
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.commands = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
