//! Spoken feedback. Cues are scheduled relative to "now" and played by an
//! external audio player; a failed cue is logged and otherwise ignored.

use actix_rt::task::JoinHandle;
use async_trait::async_trait;
use log::{debug, warn};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::config::VoiceSettings;
use crate::error::SpeechError;
use crate::game::voice::Cue;

#[async_trait]
pub trait Speaker: Send + Sync {
    async fn play(&self, cue: &str) -> Result<(), SpeechError>;
}

/// Runs `<command> <args..> <audio_dir>/<cue>.mp3` for every cue.
pub struct CommandSpeaker {
    command: String,
    args: Vec<String>,
    audio_dir: PathBuf,
}

impl CommandSpeaker {
    pub fn new(settings: &VoiceSettings) -> Self {
        Self {
            command: settings.command.clone(),
            args: settings.args.clone(),
            audio_dir: settings.audio_dir.clone(),
        }
    }

    pub fn clip_path(&self, cue: &str) -> PathBuf {
        self.audio_dir.join(format!("{}.mp3", cue))
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn play(&self, cue: &str) -> Result<(), SpeechError> {
        let status = Command::new(&self.command)
            .args(&self.args)
            .arg(self.clip_path(cue))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| SpeechError::Spawn {
                command: self.command.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Status(status))
        }
    }
}

/// Cues waiting for their moment. Cancelling drops every cue not yet
/// started.
pub struct SpeechQueue {
    speaker: Arc<dyn Speaker>,
    pending: Vec<JoinHandle<()>>,
}

impl SpeechQueue {
    pub fn new(speaker: Arc<dyn Speaker>) -> Self {
        Self {
            speaker,
            pending: Vec::new(),
        }
    }

    pub fn schedule(&mut self, cue: Cue) {
        self.pending.retain(|task| !task.is_finished());
        let speaker = Arc::clone(&self.speaker);
        self.pending.push(actix_rt::spawn(async move {
            actix_rt::time::sleep(Duration::from_millis(cue.delay_ms)).await;
            debug!("speaking {}", cue.name);
            if let Err(e) = speaker.play(&cue.name).await {
                warn!("cannot play cue {}: {}", cue.name, e);
            }
        }));
    }

    pub fn cancel_all(&mut self) {
        for task in self.pending.drain(..) {
            task.abort();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.iter().filter(|task| !task.is_finished()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        played: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Speaker for Recorder {
        async fn play(&self, cue: &str) -> Result<(), SpeechError> {
            self.played.lock().unwrap().push(cue.to_string());
            Ok(())
        }
    }

    #[test]
    fn clip_path_uses_audio_dir() {
        let speaker = CommandSpeaker::new(&VoiceSettings::default());
        assert_eq!(speaker.clip_path("good-luck"), PathBuf::from("audio/good-luck.mp3"));
    }

    #[actix_rt::test]
    async fn plays_cues_in_delay_order() {
        let recorder = Arc::new(Recorder::default());
        let mut queue = SpeechQueue::new(recorder.clone());
        queue.schedule(Cue::new("e", 60));
        queue.schedule(Cue::new("ok", 0));
        actix_rt::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*recorder.played.lock().unwrap(), ["ok", "e"]);
        assert_eq!(queue.pending(), 0);
    }

    #[actix_rt::test]
    async fn cancel_drops_waiting_cues() {
        let recorder = Arc::new(Recorder::default());
        let mut queue = SpeechQueue::new(recorder.clone());
        queue.schedule(Cue::new("good-luck", 100));
        queue.cancel_all();
        actix_rt::time::sleep(Duration::from_millis(200)).await;
        assert!(recorder.played.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn failing_player_is_not_fatal() {
        let settings = VoiceSettings {
            command: "/nonexistent/audio-player".to_string(),
            ..VoiceSettings::default()
        };
        let speaker = CommandSpeaker::new(&settings);
        assert!(matches!(
            speaker.play("ok").await,
            Err(SpeechError::Spawn { .. })
        ));
    }
}
