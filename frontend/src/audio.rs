use agate_core::gba::AUDIO_SAMPLE_RATE;
use sdl2::audio::{AudioQueue, AudioSpecDesired};

/// SDL audio output fed from the core's sample ring. The emulator thread
/// pushes whole frames of samples; SDL drains the queue on its own thread.
pub struct AudioOutput {
    queue: AudioQueue<i16>,
}

impl AudioOutput {
    pub fn queue(&self, samples: &[i16]) {
        if let Err(e) = self.queue.queue_audio(samples) {
            log::warn!("audio queue rejected samples: {e}");
        }
    }

    /// Bytes currently queued; the frame loop paces against this.
    pub fn queued_bytes(&self) -> u32 {
        self.queue.size()
    }
}

/// Open a stereo queue at the APU's native 32768 Hz output rate.
pub fn init(subsystem: &sdl2::AudioSubsystem) -> Option<AudioOutput> {
    let desired = AudioSpecDesired {
        freq: Some(AUDIO_SAMPLE_RATE as i32),
        channels: Some(2),
        samples: Some(1024),
    };

    match subsystem.open_queue::<i16, _>(None, &desired) {
        Ok(queue) => {
            queue.resume();
            log::info!("audio initialized: {AUDIO_SAMPLE_RATE} Hz stereo");
            Some(AudioOutput { queue })
        }
        Err(e) => {
            log::warn!("audio device unavailable: {e}");
            None
        }
    }
}
