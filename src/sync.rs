//! Mixer to CamillaDSP volume synchronization

use crate::curve;
use crate::dsp::DspControl;
use crate::error::{AppError, AppResult, DspResult};
use crate::mixer::VolumeSource;
use crate::state::FallbackRecord;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// What a single sync computed and managed to apply
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncOutcome {
    pub percent: u8,
    pub db: f64,
    pub mute: bool,
    pub state_written: bool,
    pub remote_applied: bool,
}

/// Pushes the mixer volume to the DSP, one sync at a time
pub struct Synchronizer<M, D> {
    mixer: M,
    dsp: D,
    range_db: f64,
    state_file: PathBuf,
}

impl<M: VolumeSource, D: DspControl> Synchronizer<M, D> {
    pub fn new(mixer: M, dsp: D, range_db: f64, state_file: PathBuf) -> Self {
        Self {
            mixer,
            dsp,
            range_db,
            state_file,
        }
    }

    pub fn mixer(&self) -> &M {
        &self.mixer
    }

    /// Read the mixer, persist the result and forward it to the DSP
    ///
    /// Only a failure to read the mixer is returned. State file and DSP
    /// failures are logged and the next sync is relied on to catch up.
    pub async fn sync(&mut self) -> AppResult<SyncOutcome> {
        // Channels are assumed to be equal
        let percent = self
            .mixer
            .volume_percent()?
            .first()
            .copied()
            .ok_or_else(|| AppError::Mixer("Mixer reported no channels".to_string()))?;

        let db = curve::percent_to_db(percent, self.range_db);
        let mute = curve::is_muted(db, self.range_db);

        let state_written = self.write_state(FallbackRecord::new(db, mute));

        let remote_applied = match self.apply_remote(db, mute).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "setting CamillaDSP volume failed");
                false
            }
        };

        info!(percent, mute, "volume {:.1} dB", db);

        Ok(SyncOutcome {
            percent,
            db,
            mute,
            state_written,
            remote_applied,
        })
    }

    fn write_state(&self, record: FallbackRecord) -> bool {
        let path = self.state_file.display();
        match record.write(&self.state_file) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(%path, "couldn't create state file, its directory probably doesn't exist");
                false
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                warn!(%path, "couldn't write state file, check the owner of its directory");
                false
            }
            Err(e) => {
                error!(%path, error = %e, "writing state file failed");
                false
            }
        }
    }

    async fn apply_remote(&mut self, db: f64, mute: bool) -> DspResult<()> {
        if !self.dsp.is_connected() {
            self.dsp.connect().await?;
        }

        self.dsp.set_volume(db).await?;

        if self.dsp.get_mute().await? != mute {
            self.dsp.set_mute(mute).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DspError;
    use std::path::Path;

    struct FakeMixer {
        levels: Option<Vec<u8>>,
    }

    impl FakeMixer {
        fn at(percent: u8) -> Self {
            Self {
                levels: Some(vec![percent, percent]),
            }
        }
    }

    impl VolumeSource for FakeMixer {
        fn volume_percent(&self) -> AppResult<Vec<u8>> {
            self.levels
                .clone()
                .ok_or_else(|| AppError::Mixer("device unplugged".to_string()))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Connect,
        SetVolume(f64),
        GetMute,
        SetMute(bool),
    }

    #[derive(Default)]
    struct FakeDsp {
        connected: bool,
        refuse_connect: bool,
        fail_set_volume: bool,
        fail_get_mute: bool,
        fail_set_mute: bool,
        muted: bool,
        calls: Vec<Call>,
    }

    impl DspControl for FakeDsp {
        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn connect(&mut self) -> DspResult<()> {
            self.calls.push(Call::Connect);
            if self.refuse_connect {
                return Err(DspError::Connect("connection refused".to_string()));
            }
            self.connected = true;
            Ok(())
        }

        async fn set_volume(&mut self, db: f64) -> DspResult<()> {
            self.calls.push(Call::SetVolume(db));
            if self.fail_set_volume {
                return Err(DspError::Timeout(5000));
            }
            Ok(())
        }

        async fn get_mute(&mut self) -> DspResult<bool> {
            self.calls.push(Call::GetMute);
            if self.fail_get_mute {
                return Err(DspError::Protocol("GetMute returned None".to_string()));
            }
            Ok(self.muted)
        }

        async fn set_mute(&mut self, mute: bool) -> DspResult<()> {
            self.calls.push(Call::SetMute(mute));
            if self.fail_set_mute {
                return Err(DspError::Rejected {
                    command: "SetMute".to_string(),
                    message: "Error".to_string(),
                });
            }
            self.muted = mute;
            Ok(())
        }
    }

    fn synchronizer(
        mixer: FakeMixer,
        dsp: FakeDsp,
        state_file: &Path,
    ) -> Synchronizer<FakeMixer, FakeDsp> {
        Synchronizer::new(mixer, dsp, 60.0, state_file.to_path_buf())
    }

    #[tokio::test]
    async fn test_half_volume() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("camilladsp_volume_state");
        let mut sync = synchronizer(FakeMixer::at(50), FakeDsp::default(), &state_file);

        let outcome = sync.sync().await.unwrap();
        assert_eq!(outcome.percent, 50);
        assert!((outcome.db + 30.0).abs() < 1e-9);
        assert!(!outcome.mute);
        assert!(outcome.state_written);
        assert!(outcome.remote_applied);

        assert_eq!(
            sync.dsp.calls,
            vec![Call::Connect, Call::SetVolume(outcome.db), Call::GetMute]
        );

        let record = FallbackRecord::read(&state_file).unwrap();
        assert_eq!(record, FallbackRecord::new(outcome.db, false));
    }

    #[tokio::test]
    async fn test_zero_volume_mutes_once() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("camilladsp_volume_state");
        let mut sync = synchronizer(FakeMixer::at(0), FakeDsp::default(), &state_file);

        let outcome = sync.sync().await.unwrap();
        assert!((outcome.db + 60.0).abs() < 1e-4);
        assert!(outcome.mute);
        assert_eq!(std::fs::read_to_string(&state_file).unwrap(), "-60 1");

        sync.sync().await.unwrap();

        assert_eq!(
            sync.dsp.calls,
            vec![
                Call::Connect,
                Call::SetVolume(-60.0),
                Call::GetMute,
                Call::SetMute(true),
                Call::SetVolume(-60.0),
                Call::GetMute,
            ]
        );
    }

    #[tokio::test]
    async fn test_raising_volume_unmutes() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("camilladsp_volume_state");
        let dsp = FakeDsp {
            connected: true,
            muted: true,
            ..FakeDsp::default()
        };
        let mut sync = synchronizer(FakeMixer::at(100), dsp, &state_file);

        let outcome = sync.sync().await.unwrap();
        assert_eq!(outcome.db, 0.0);
        assert!(!outcome.mute);
        assert_eq!(
            sync.dsp.calls,
            vec![Call::SetVolume(0.0), Call::GetMute, Call::SetMute(false)]
        );
        assert!(!sync.dsp.muted);
    }

    #[tokio::test]
    async fn test_connect_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("camilladsp_volume_state");
        let dsp = FakeDsp {
            refuse_connect: true,
            ..FakeDsp::default()
        };
        let mut sync = synchronizer(FakeMixer::at(75), dsp, &state_file);

        let outcome = sync.sync().await.unwrap();
        assert!(outcome.state_written);
        assert!(!outcome.remote_applied);
        assert_eq!(sync.dsp.calls, vec![Call::Connect]);
        assert!(state_file.exists());

        // Retried on the next sync, nothing in between
        sync.dsp.refuse_connect = false;
        let outcome = sync.sync().await.unwrap();
        assert!(outcome.remote_applied);
        assert_eq!(sync.dsp.calls[1], Call::Connect);
    }

    /// Run one sync at `percent` against `dsp`, checking that the failure was
    /// swallowed after the state file was written.
    async fn sync_with_failing_dsp(percent: u8, dsp: FakeDsp) -> Vec<Call> {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("camilladsp_volume_state");
        let mut sync = synchronizer(FakeMixer::at(percent), dsp, &state_file);

        let outcome = sync.sync().await.unwrap();
        assert!(outcome.state_written);
        assert!(!outcome.remote_applied);
        assert!(state_file.exists());
        sync.dsp.calls
    }

    #[tokio::test]
    async fn test_set_volume_failure_is_swallowed() {
        let dsp = FakeDsp {
            fail_set_volume: true,
            ..FakeDsp::default()
        };
        let calls = sync_with_failing_dsp(0, dsp).await;
        // Mute is neither queried nor set once the volume push failed
        assert_eq!(calls, vec![Call::Connect, Call::SetVolume(-60.0)]);
    }

    #[tokio::test]
    async fn test_get_mute_failure_is_swallowed() {
        let dsp = FakeDsp {
            fail_get_mute: true,
            ..FakeDsp::default()
        };
        let calls = sync_with_failing_dsp(0, dsp).await;
        assert_eq!(
            calls,
            vec![Call::Connect, Call::SetVolume(-60.0), Call::GetMute]
        );
    }

    #[tokio::test]
    async fn test_set_mute_failure_is_swallowed() {
        let dsp = FakeDsp {
            fail_set_mute: true,
            ..FakeDsp::default()
        };
        let calls = sync_with_failing_dsp(0, dsp).await;
        assert_eq!(
            calls,
            vec![
                Call::Connect,
                Call::SetVolume(-60.0),
                Call::GetMute,
                Call::SetMute(true),
            ]
        );
    }

    #[tokio::test]
    async fn test_unexpected_state_file_error_is_not_fatal() {
        // A directory in place of the file fails with neither NotFound nor
        // PermissionDenied
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("camilladsp_volume_state");
        std::fs::create_dir(&state_file).unwrap();
        let mut sync = synchronizer(FakeMixer::at(30), FakeDsp::default(), &state_file);

        let err = FallbackRecord::new(-40.0, false).write(&state_file).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::NotFound);
        assert_ne!(err.kind(), ErrorKind::PermissionDenied);

        let outcome = sync.sync().await.unwrap();
        assert!(!outcome.state_written);
        assert!(outcome.remote_applied);
        assert!(state_file.is_dir());
    }

    #[tokio::test]
    async fn test_missing_state_directory_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("cdsp").join("camilladsp_volume_state");
        let mut sync = synchronizer(FakeMixer::at(30), FakeDsp::default(), &state_file);

        let outcome = sync.sync().await.unwrap();
        assert!(!outcome.state_written);
        assert!(outcome.remote_applied);
    }

    #[tokio::test]
    async fn test_mixer_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("camilladsp_volume_state");
        let mixer = FakeMixer { levels: None };
        let mut sync = synchronizer(mixer, FakeDsp::default(), &state_file);

        let err = sync.sync().await.unwrap_err();
        assert!(matches!(err, AppError::Mixer(_)));
        assert!(sync.dsp.calls.is_empty());
        assert!(!state_file.exists());
    }

    #[tokio::test]
    async fn test_empty_channel_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("camilladsp_volume_state");
        let mixer = FakeMixer {
            levels: Some(Vec::new()),
        };
        let mut sync = synchronizer(mixer, FakeDsp::default(), &state_file);

        assert!(sync.sync().await.is_err());
    }
}
