/// Sound engine: procedural sound effects via rodio, keyed by the core's
/// audio tags (`Sound`).
///
/// All buffers are generated as in-memory WAV at init time. Playback is
/// fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely (the stub
/// SoundEngine does nothing).

use crate::sim::event::GameEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use crate::sim::event::Sound;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        cues: Vec<(Sound, Arc<Vec<u8>>)>,
        sfx_die: Arc<Vec<u8>>,
        sfx_clear: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            let cues = vec![
                (Sound::RockFall, Arc::new(make_wav(&gen_thud(90.0, 0.16)))),
                (Sound::DiamondFall, Arc::new(make_wav(&gen_tink()))),
                (Sound::Move, Arc::new(make_wav(&gen_step()))),
                (Sound::Diamond, Arc::new(make_wav(&gen_pickup()))),
                (Sound::Push, Arc::new(make_wav(&gen_scrape()))),
                (Sound::Explode, Arc::new(make_wav(&gen_pop()))),
            ];

            Some(SoundEngine {
                _stream: stream,
                handle,
                cues,
                sfx_die: Arc::new(make_wav(&gen_die())),
                sfx_clear: Arc::new(make_wav(&gen_clear())),
            })
        }

        fn play_buf(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play(&self, cue: Sound) {
            if let Some((_, buf)) = self.cues.iter().find(|(s, _)| *s == cue) {
                self.play_buf(buf);
            }
        }

        pub fn play_die(&self) { self.play_buf(&self.sfx_die); }
        pub fn play_clear(&self) { self.play_buf(&self.sfx_clear); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn samples(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Cheap LCG noise in [-1, 1].
    fn noise(state: &mut u32) -> f32 {
        *state = state.wrapping_mul(1103515245).wrapping_add(12345);
        (*state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    /// Rock landing: low sine with a noisy attack.
    fn gen_thud(freq: f32, duration: f32) -> Vec<f32> {
        let n = samples(duration);
        let mut rng: u32 = 4242;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * freq * (1.0 - t * 0.4) * TAU).sin();
                let attack = if t < 0.15 { noise(&mut rng) * (1.0 - t / 0.15) } else { 0.0 };
                (tone * 0.7 + attack * 0.5) * (1.0 - t).powf(1.5) * 0.35
            })
            .collect()
    }

    /// Diamond landing: short bright ping.
    fn gen_tink() -> Vec<f32> {
        let n = samples(0.08);
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let wave = (ti * 2093.0 * TAU).sin() * 0.6 + (ti * 3136.0 * TAU).sin() * 0.4;
                wave * (1.0 - t).powf(2.0) * 0.2
            })
            .collect()
    }

    /// Footstep: very short filtered click.
    fn gen_step() -> Vec<f32> {
        let n = samples(0.025);
        let mut rng: u32 = 777;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                noise(&mut rng) * (1.0 - t) * 0.08
            })
            .collect()
    }

    /// Diamond pickup: quick ascending arpeggio C6→E6→G6
    fn gen_pickup() -> Vec<f32> {
        let notes = [1047.0_f32, 1319.0, 1568.0];
        let mut out = Vec::new();
        for &freq in &notes {
            let n = samples(0.045);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                // Sine + 3rd harmonic for a retro edge
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                out.push(wave * env * 0.25);
            }
        }
        out
    }

    /// Push: grinding noise under a low drone.
    fn gen_scrape() -> Vec<f32> {
        let n = samples(0.14);
        let mut rng: u32 = 31337;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let drone = (ti * 140.0 * TAU).sin();
                (drone * 0.4 + noise(&mut rng) * 0.6) * (1.0 - t).powf(0.7) * 0.22
            })
            .collect()
    }

    /// Balloon burst: noise burst with a falling tone.
    fn gen_pop() -> Vec<f32> {
        let n = samples(0.3);
        let mut rng: u32 = 9001;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * (500.0 - t * 350.0) * TAU).sin();
                (noise(&mut rng) * 0.7 + tone * 0.3) * (1.0 - t).powf(2.5) * 0.4
            })
            .collect()
    }

    /// Life lost: descending tone A4→F#4→Eb4→C4
    fn gen_die() -> Vec<f32> {
        let notes = [440.0_f32, 370.0, 311.0, 261.0];
        let mut out = Vec::new();
        for &freq in &notes {
            let n = samples(0.12);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                out.push((t * freq * TAU).sin() * env * 0.3);
            }
        }
        let fade_len = out.len() / 4;
        let total = out.len();
        for i in (total - fade_len)..total {
            out[i] *= (total - i) as f32 / fade_len as f32;
        }
        out
    }

    /// Level clear: ascending fanfare C5→E5→G5→C6, last note held.
    fn gen_clear() -> Vec<f32> {
        let notes = [523.0_f32, 659.0, 784.0, 1047.0];
        let mut out = Vec::new();
        for &freq in &notes {
            let n = samples(0.1);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = (t * freq * TAU).sin() * 0.6
                    + (t * freq * 2.0 * TAU).sin() * 0.3
                    + (t * freq * 3.0 * TAU).sin() * 0.1;
                out.push(wave * env * 0.3);
            }
        }
        let n = samples(0.25);
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            out.push((t * 1047.0 * TAU).sin() * env * 0.3);
        }
        out
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_sizes() {
            let wav = make_wav(&gen_tink());
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]) as usize;
            assert_eq!(wav.len(), 44 + data_size);
        }

        #[test]
        fn generators_stay_in_range() {
            for buf in [gen_thud(90.0, 0.16), gen_scrape(), gen_pop(), gen_die(), gen_clear()] {
                assert!(!buf.is_empty());
                assert!(buf.iter().all(|s| s.abs() <= 1.0));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API — compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: crate::sim::event::Sound) {}
    pub fn play_die(&self) {}
    pub fn play_clear(&self) {}
}

/// Play whatever a batch of step events calls for.
pub fn play_events(engine: &SoundEngine, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::Sound(cue) => engine.play(*cue),
            GameEvent::LifeLost => engine.play_die(),
            GameEvent::LevelComplete => engine.play_clear(),
            _ => {}
        }
    }
}
