//! Synthetic voices
//!
//! Builds a complete half-phone voice on disk: unit file, feature file,
//! LPC audio timeline, basename timeline and a voice config. Phone
//! sequences are a pure function of the sentence and position, so tests
//! can predict every query result.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use phonix_core::{PhonixResult, UnitFile};
use phonix_datagram::{Codec, Datagram, LpcCodec, LpcFrame, Payload};
use phonix_features::{ContinuousFeature, DiscreteFeature, FeatureDefinition, FeatureFile, FeatureFileWriter};
use phonix_select::{PhoneCart, Voice, VoiceConfig};
use phonix_timeline::TimelineWriter;

/// Phone inventory of synthetic voices
pub const INVENTORY: [&str; 8] = ["a", "e", "i", "o", "t", "k", "s", "n"];

pub const CONFIG_FILE: &str = "voice.config";

// ============================================================================
// SHAPE
// ============================================================================

/// Shape of a synthetic voice
#[derive(Clone, Debug)]
pub struct VoiceShape {
    pub name: String,
    pub sentences: usize,
    pub phones_per_sentence: usize,
    pub sample_rate: i32,
    /// Duration of each half-phone in samples
    pub half_phone_samples: i64,
    /// Duration of each audio frame in samples
    pub frame_samples: i64,
    pub lpc_order: usize,
    /// Time index interval of both timelines, in samples
    pub idx_interval: i32,
}

impl Default for VoiceShape {
    fn default() -> Self {
        VoiceShape {
            name: "synth".into(),
            sentences: 12,
            phones_per_sentence: 9,
            sample_rate: 16000,
            half_phone_samples: 640,
            frame_samples: 80,
            lpc_order: 16,
            idx_interval: 1600,
        }
    }
}

impl VoiceShape {
    /// A voice small enough for unit tests
    pub fn small() -> Self {
        VoiceShape {
            sentences: 3,
            phones_per_sentence: 5,
            ..Default::default()
        }
    }

    /// A voice sized for benchmarks
    pub fn large() -> Self {
        VoiceShape {
            sentences: 400,
            phones_per_sentence: 24,
            ..Default::default()
        }
    }
}

/// Phone at position `j` of sentence `k`
pub fn phone_at(k: usize, j: usize) -> &'static str {
    INVENTORY[(k * 5 + j * 3 + j * j / 2) % INVENTORY.len()]
}

/// Recording name of sentence `k`
pub fn basename_of(k: usize) -> String {
    format!("synth_{:04}", k)
}

// ============================================================================
// VOICE
// ============================================================================

/// A synthetic voice living in a temporary directory
#[derive(Debug)]
pub struct SyntheticVoice {
    dir: TempDir,
    shape: VoiceShape,
}

impl SyntheticVoice {
    /// Write every voice file under a fresh temporary directory.
    pub fn build(shape: VoiceShape) -> PhonixResult<Self> {
        let dir = tempfile::tempdir()?;
        let voice = SyntheticVoice { dir, shape };
        voice.write_units()?;
        voice.write_features()?;
        voice.write_audio()?;
        voice.write_basenames()?;
        voice.write_config()?;
        tracing::debug!(
            "synthetic voice {} in {}: {} units",
            voice.shape.name,
            voice.dir.path().display(),
            voice.num_units()
        );
        Ok(voice)
    }

    pub fn shape(&self) -> &VoiceShape {
        &self.shape
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }

    pub fn config_path(&self) -> PathBuf {
        self.path(CONFIG_FILE)
    }

    /// Units per sentence: two edges plus two halves per phone
    pub fn units_per_sentence(&self) -> usize {
        2 + 2 * self.shape.phones_per_sentence
    }

    pub fn num_units(&self) -> usize {
        self.shape.sentences * self.units_per_sentence()
    }

    pub fn sentence_samples(&self) -> i64 {
        2 * self.shape.phones_per_sentence as i64 * self.shape.half_phone_samples
    }

    pub fn total_samples(&self) -> i64 {
        self.shape.sentences as i64 * self.sentence_samples()
    }

    /// Sentence a unit belongs to
    pub fn sentence_of(&self, unit_index: usize) -> usize {
        unit_index / self.units_per_sentence()
    }

    /// Syllables span phone pairs; an odd last phone is a syllable of its own.
    pub fn expected_syllables(&self) -> usize {
        self.shape.sentences * self.shape.phones_per_sentence.div_ceil(2)
    }

    /// Adjacent `(left, right)` phone pairs within sentences, as the index
    /// of the right half of the left phone.
    pub fn diphone_occurrences(&self, left: &str, right: &str) -> Vec<usize> {
        let mut found = Vec::new();
        for k in 0..self.shape.sentences {
            let base = k * self.units_per_sentence();
            for j in 0..self.shape.phones_per_sentence.saturating_sub(1) {
                if phone_at(k, j) == left && phone_at(k, j + 1) == right {
                    // edge, then L/R per phone
                    found.push(base + 2 + 2 * j);
                }
            }
        }
        found
    }

    pub fn config(&self) -> PhonixResult<VoiceConfig> {
        VoiceConfig::load(self.config_path())
    }

    /// Load the voice with a phone CART built from its own features.
    pub fn load(&self, try_memory_map: bool) -> PhonixResult<Voice> {
        let mut config = self.config()?;
        config.try_memory_map = try_memory_map;
        let features = FeatureFile::load(&config.features)?;
        let cart = PhoneCart::from_features(&features)?;
        Voice::load(&config, Box::new(cart))
    }

    fn schema() -> PhonixResult<FeatureDefinition> {
        let mut phones = vec!["0", "_"];
        phones.extend(INVENTORY);
        FeatureDefinition::new(
            vec![
                DiscreteFeature::new("phone", phones).with_weight(2.0),
                DiscreteFeature::new("halfphone_lr", ["0", "L", "R"]),
                DiscreteFeature::new("segs_from_syl_start", ["0", "1"]),
                DiscreteFeature::new("segs_from_syl_end", ["0", "1"]),
            ],
            vec![DiscreteFeature::new("sentence", (0..4).map(|q| format!("q{}", q)))],
            vec![ContinuousFeature::new("unit_duration")],
        )
    }

    fn write_units(&self) -> PhonixResult<()> {
        let half = self.shape.half_phone_samples;
        let mut spans = Vec::with_capacity(self.num_units());
        let mut time = 0;
        for _ in 0..self.shape.sentences {
            spans.push((time, 0));
            for _ in 0..2 * self.shape.phones_per_sentence {
                spans.push((time, half));
                time += half;
            }
            spans.push((time, 0));
        }
        UnitFile::new(self.shape.sample_rate, &spans)?.save(self.path("halfphoneUnits.mry"))
    }

    fn write_features(&self) -> PhonixResult<()> {
        let mut writer = FeatureFileWriter::new(Self::schema()?, true);
        let n = self.shape.phones_per_sentence;
        let duration = (self.shape.half_phone_samples as f32 / self.shape.sample_rate as f32).to_string();
        for k in 0..self.shape.sentences {
            let quarter = format!("q{}", k % 4);
            writer.push_values(&[("sentence", quarter.as_str())])?;
            for j in 0..n {
                let start = if j % 2 == 0 { "0" } else { "1" };
                let end = if j % 2 == 1 || j + 1 == n { "0" } else { "1" };
                for side in ["L", "R"] {
                    writer.push_values(&[
                        ("phone", phone_at(k, j)),
                        ("halfphone_lr", side),
                        ("segs_from_syl_start", start),
                        ("segs_from_syl_end", end),
                        ("sentence", quarter.as_str()),
                        ("unit_duration", duration.as_str()),
                    ])?;
                }
            }
            writer.push_values(&[("sentence", quarter.as_str())])?;
        }
        writer.save(self.path("halfphoneFeatures.mry"))?;
        Ok(())
    }

    fn write_audio(&self) -> PhonixResult<()> {
        let codec = Codec::Lpc(LpcCodec::new(self.shape.lpc_order, -2.0, 4.0)?);
        let mut writer = TimelineWriter::create(
            self.path("timeline_waveforms.mry"),
            self.shape.sample_rate,
            self.shape.idx_interval,
            &codec,
        )?;
        let total = self.total_samples();
        let mut time = 0;
        while time < total {
            let duration = self.shape.frame_samples.min(total - time);
            let frame = LpcFrame {
                coeffs: (0..self.shape.lpc_order)
                    .map(|i| ((time / self.shape.frame_samples + i as i64) % 7) as f32 * 0.25 - 0.75)
                    .collect(),
                residual: (0..duration).map(|s| ((time + s) % 200 - 100) as i16 * 50).collect(),
            };
            writer.feed_payload(duration, &Payload::Lpc(frame))?;
            time += duration;
        }
        writer.finish()?;
        Ok(())
    }

    fn write_basenames(&self) -> PhonixResult<()> {
        let mut writer = TimelineWriter::create(
            self.path("timeline_basenames.mry"),
            self.shape.sample_rate,
            self.shape.idx_interval,
            &Codec::Raw,
        )?;
        for k in 0..self.shape.sentences {
            writer.feed(&Datagram::new(self.sentence_samples(), basename_of(k).into_bytes()))?;
        }
        writer.finish()?;
        Ok(())
    }

    fn write_config(&self) -> PhonixResult<()> {
        let mut file = fs::File::create(self.config_path())?;
        writeln!(file, "# synthetic voice, generated")?;
        writeln!(file, "voice.name = {}", self.shape.name)?;
        writeln!(file, "voice.units = halfphoneUnits.mry")?;
        writeln!(file, "voice.features = halfphoneFeatures.mry")?;
        writeln!(file, "voice.audioTimeline = timeline_waveforms.mry")?;
        writeln!(file, "voice.basenameTimeline = timeline_basenames.mry")?;
        Ok(())
    }
}
