/// Sound engine: procedural sound effects via rodio, one per game event.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum Sfx {
        Step,
        Bump,
        StairsDown,
        StairsUp,
        Discover,
        Teleport,
        Push,
        Ride,
        Undo,
        Reset,
        Win,
    }

    const ALL_SFX: [Sfx; 11] = [
        Sfx::Step, Sfx::Bump, Sfx::StairsDown, Sfx::StairsUp, Sfx::Discover,
        Sfx::Teleport, Sfx::Push, Sfx::Ride, Sfx::Undo, Sfx::Reset, Sfx::Win,
    ];

    /// Pre-generated WAV buffers, indexed by `Sfx as usize`.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: Vec<Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("no audio output, sound disabled: {e}");
                    return None;
                }
            };
            let buffers = ALL_SFX.iter()
                .map(|&sfx| Arc::new(make_wav(&generate(sfx))))
                .collect();
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let buf = match self.buffers.get(sfx as usize) {
                Some(b) => b,
                None => return,
            };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn generate(sfx: Sfx) -> Vec<f32> {
        match sfx {
            Sfx::Step => sweep(520.0, 480.0, 0.03, 0.12),
            Sfx::Bump => thud(0.07),
            Sfx::StairsDown => notes(&[659.0, 523.0, 440.0, 349.0], 0.06, 0.22),
            Sfx::StairsUp => notes(&[349.0, 440.0, 523.0, 659.0], 0.06, 0.22),
            Sfx::Discover => notes(&[784.0, 988.0, 1175.0], 0.09, 0.25),
            Sfx::Teleport => warble(0.18),
            Sfx::Push => {
                let mut s = thud(0.05);
                s.extend(sweep(180.0, 140.0, 0.06, 0.2));
                s
            }
            Sfx::Ride => sweep(220.0, 260.0, 0.08, 0.18),
            Sfx::Undo => sweep(700.0, 400.0, 0.06, 0.15),
            Sfx::Reset => notes(&[523.0, 392.0, 262.0], 0.07, 0.2),
            Sfx::Win => {
                let mut s = notes(&[523.0, 659.0, 784.0, 1047.0], 0.1, 0.28);
                s.extend(sweep(1047.0, 1047.0, 0.25, 0.28));
                s
            }
        }
    }

    /// Sine tone gliding from `f0` to `f1` with a linear fade out.
    fn sweep(f0: f32, f1: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = f0 + (f1 - f0) * t;
                phase += freq / SAMPLE_RATE as f32;
                (phase * TAU).sin() * (1.0 - t) * volume
            })
            .collect()
    }

    /// Short arpeggio, sine plus a touch of the octave.
    fn notes(freqs: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * note_dur) as usize;
        let mut samples = Vec::with_capacity(n * freqs.len());
        for &freq in freqs {
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.7);
                let wave = (t * freq * TAU).sin() * 0.75 + (t * freq * 2.0 * TAU).sin() * 0.25;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Low noise burst.
    fn thud(duration: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 0x5EED;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                let tone = (i as f32 / SAMPLE_RATE as f32 * 90.0 * TAU).sin();
                (tone * 0.6 + noise * 0.4) * (1.0 - t).powi(2) * 0.35
            })
            .collect()
    }

    /// Vibrato tone for the portal.
    fn warble(duration: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let secs = i as f32 / SAMPLE_RATE as f32;
                let freq = 600.0 + (secs * 30.0 * TAU).sin() * 150.0 + t * 300.0;
                phase += freq / SAMPLE_RATE as f32;
                (phase * TAU).sin() * (1.0 - t) * 0.2
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit mono PCM
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        const CHANNELS: u16 = 1;
        const BITS: u16 = 16;
        let byte_rate = SAMPLE_RATE * CHANNELS as u32 * BITS as u32 / 8;
        let block_align = CHANNELS * BITS / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&CHANNELS.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&BITS.to_le_bytes());

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
        fn every_effect_is_audible_and_in_range() {
            for sfx in ALL_SFX {
                let s = generate(sfx);
                assert!(!s.is_empty(), "{sfx:?} is empty");
                assert!(s.iter().all(|v| v.abs() <= 1.0), "{sfx:?} clips");
            }
        }

        #[test]
        fn wav_header_matches_payload() {
            let wav = make_wav(&[0.0, 0.5, -0.5]);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + 6);
            assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 6);
        }

        #[test]
        fn buffer_order_matches_enum() {
            for (i, sfx) in ALL_SFX.iter().enumerate() {
                assert_eq!(*sfx as usize, i);
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::{Sfx, SoundEngine};

#[cfg(not(feature = "sound"))]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Step,
    Bump,
    StairsDown,
    StairsUp,
    Discover,
    Teleport,
    Push,
    Ride,
    Undo,
    Reset,
    Win,
}

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}

/// Effect for an event. Some events are covered by a louder sibling
/// emitted in the same batch and stay silent.
pub fn sfx_for(event: &GameEvent) -> Option<Sfx> {
    match event {
        GameEvent::Stepped { .. } => Some(Sfx::Step),
        GameEvent::Bumped { .. } => Some(Sfx::Bump),
        GameEvent::Stairs { from_layer, to_layer } => {
            Some(if to_layer > from_layer { Sfx::StairsDown } else { Sfx::StairsUp })
        }
        GameEvent::LayerDiscovered { .. } => Some(Sfx::Discover),
        GameEvent::Teleported { .. } => Some(Sfx::Teleport),
        GameEvent::CratePushed { .. } => Some(Sfx::Push),
        GameEvent::Rode { .. } => Some(Sfx::Ride),
        GameEvent::Undone => Some(Sfx::Undo),
        GameEvent::Reset => Some(Sfx::Reset),
        GameEvent::Won => Some(Sfx::Win),
    }
}

/// The most significant effect of one batch of events.
pub fn pick_sfx(events: &[GameEvent]) -> Option<Sfx> {
    events.iter().filter_map(sfx_for).max_by_key(|s| priority(*s))
}

fn priority(sfx: Sfx) -> u8 {
    match sfx {
        Sfx::Win => 9,
        Sfx::Discover => 8,
        Sfx::StairsDown | Sfx::StairsUp => 7,
        Sfx::Teleport => 6,
        Sfx::Push => 5,
        Sfx::Ride => 4,
        Sfx::Reset | Sfx::Undo => 3,
        Sfx::Bump => 2,
        Sfx::Step => 1,
    }
}
