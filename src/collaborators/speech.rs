//! Speech synthesis and transcription seams.
//!
//! Real deployments plug a cloud TTS/STT service in behind these traits.
//! The defaults here keep the voice round trip functional without
//! credentials: synthesis produces a LINEAR16 PCM tone whose length tracks
//! the text, and transcription accepts audio without ever finalizing (text
//! frames from the client are already finalized transcripts).

use async_trait::async_trait;

use super::{SpeechSynthesizer, Transcriber};
use crate::types::Result;

/// Samples per second of generated audio, matching the 16 kHz LINEAR16
/// stream the browser client expects.
const SAMPLE_RATE_HZ: usize = 16_000;

/// Seconds of audio generated per word of response text.
const SECONDS_PER_WORD: f32 = 0.35;

/// Synthesizer producing a soft 440 Hz LINEAR16 tone sized to the text.
#[derive(Default)]
pub struct PcmToneSynthesizer;

#[async_trait]
impl SpeechSynthesizer for PcmToneSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let words = text.split_whitespace().count().max(1);
        let samples = (words as f32 * SECONDS_PER_WORD * SAMPLE_RATE_HZ as f32) as usize;

        let mut audio = Vec::with_capacity(samples * 2);
        for i in 0..samples {
            let t = i as f32 / SAMPLE_RATE_HZ as f32;
            let amplitude = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.2;
            let sample = (amplitude * i16::MAX as f32) as i16;
            audio.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(audio)
    }
}

/// Transcriber that consumes audio chunks but never finalizes a transcript.
///
/// Used when no STT backend is configured: voice input still works through
/// text frames, and binary audio is accepted and discarded.
#[derive(Default)]
pub struct NullTranscriber;

#[async_trait]
impl Transcriber for NullTranscriber {
    async fn accept_chunk(&self, _chunk: &[u8]) -> Result<Option<String>> {
        Ok(None)
    }
}
