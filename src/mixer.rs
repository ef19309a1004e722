//! ALSA mixer access and change notification

use crate::error::{AppError, AppResult};
use alsa::mixer::{Mixer, Selem, SelemChannelId, SelemId};
use alsa::poll::{Descriptors, pollfd};
use std::os::fd::{AsRawFd, RawFd};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tracing::debug;

/// Something that can report the current playback volume
pub trait VolumeSource {
    /// Current volume of every playback channel, in percent
    fn volume_percent(&self) -> AppResult<Vec<u8>>;
}

/// A simple mixer control on an ALSA device
pub struct AlsaMixer {
    mixer: Mixer,
    device: String,
    control: String,
}

impl AlsaMixer {
    /// Open `device` and make sure `control` exists on it
    pub fn open(device: &str, control: &str) -> AppResult<Self> {
        let mixer = Mixer::new(device, false)
            .map_err(|e| AppError::Mixer(format!("Failed to open mixer {}: {}", device, e)))?;
        let alsa_mixer = Self {
            mixer,
            device: device.to_string(),
            control: control.to_string(),
        };

        let range = {
            let selem = alsa_mixer.selem()?;
            if !selem.has_playback_volume() {
                return Err(AppError::Mixer(format!(
                    "Control '{}' on {} has no playback volume",
                    control, device
                )));
            }
            selem.get_playback_volume_range()
        };
        debug!(device, control, ?range, "mixer opened");

        Ok(alsa_mixer)
    }

    fn selem(&self) -> AppResult<Selem<'_>> {
        self.mixer
            .find_selem(&SelemId::new(&self.control, 0))
            .ok_or_else(|| {
                AppError::Mixer(format!(
                    "Control '{}' not found on {}",
                    self.control, self.device
                ))
            })
    }

    /// Descriptors that become readable when the mixer changes
    pub fn poll_descriptors(&self) -> AppResult<Vec<pollfd>> {
        Ok(Descriptors::get(&self.mixer)?)
    }

    /// Acknowledge pending mixer events
    pub fn handle_events(&self) -> AppResult<u32> {
        Ok(self.mixer.handle_events()?)
    }
}

impl VolumeSource for AlsaMixer {
    fn volume_percent(&self) -> AppResult<Vec<u8>> {
        let selem = self.selem()?;
        let (min, max) = selem.get_playback_volume_range();

        let mut levels = Vec::new();
        for &channel in SelemChannelId::all() {
            if selem.has_playback_channel(channel) {
                let raw = selem.get_playback_volume(channel)?;
                levels.push(raw_to_percent(raw, min, max));
            }
        }

        if levels.is_empty() {
            return Err(AppError::Mixer(format!(
                "Control '{}' has no playback channels",
                self.control
            )));
        }
        Ok(levels)
    }
}

/// Scale a raw mixer value into 0..=100
pub fn raw_to_percent(raw: i64, min: i64, max: i64) -> u8 {
    if max <= min {
        return 0;
    }
    let ratio = (raw - min) as f64 / (max - min) as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Names of all controls on `device` that have a playback volume
pub fn control_names(device: &str) -> AppResult<Vec<String>> {
    let mixer = Mixer::new(device, false)
        .map_err(|e| AppError::Mixer(format!("Failed to open mixer {}: {}", device, e)))?;

    let mut names = Vec::new();
    for elem in mixer.iter() {
        let Some(selem) = Selem::new(elem) else {
            continue;
        };
        if !selem.has_playback_volume() {
            continue;
        }
        names.push(selem.get_id().get_name()?.to_string());
    }
    Ok(names)
}

/// Raw mixer descriptor, owned by alsa-lib
struct MixerFd(RawFd);

impl AsRawFd for MixerFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

/// Waits for volume changes on an [`AlsaMixer`]
pub struct MixerWatcher {
    fd: AsyncFd<MixerFd>,
}

impl MixerWatcher {
    /// Register the mixer's first poll descriptor with the runtime
    pub fn new(mixer: &AlsaMixer) -> AppResult<Self> {
        let descriptors = mixer.poll_descriptors()?;
        let first = descriptors
            .first()
            .ok_or_else(|| AppError::Mixer("Mixer exposes no poll descriptors".to_string()))?;

        let fd = AsyncFd::with_interest(MixerFd(first.fd), Interest::READABLE)?;
        Ok(Self { fd })
    }

    /// Block until the mixer reports a change, then drain its events
    pub async fn changed(&self, mixer: &AlsaMixer) -> AppResult<()> {
        let mut guard = self.fd.readable().await?;
        // Clear before draining so an event landing mid-drain re-arms the wait.
        guard.clear_ready();
        let handled = mixer.handle_events()?;
        debug!(handled, "mixer events");
        Ok(())
    }
}
