//! Voice configuration and loading
//!
//! A voice config is key=value text:
//!
//! ```text
//! voice.name = arctic
//! voice.units = halfphoneUnits.mry
//! voice.features = halfphoneFeatures.mry
//! voice.audioTimeline = timeline_waveforms.mry
//! voice.basenameTimeline = timeline_basenames.mry
//! voice.leafSizeLimit = 500
//! timeline.memoryMap = true
//! timeline.bufferSize = 65536
//! ```
//!
//! Relative paths resolve against the directory holding the config.

use std::path::{Path, PathBuf};

use phonix_core::{PhonixError, PhonixResult, Properties, UnitFile};
use phonix_features::FeatureFile;
use phonix_timeline::{TimelineConfig, TimelineReader, DEFAULT_BUFFER_SIZE};

use crate::{
    DiphoneUnitDatabase, PreselectionCart, SyllableIterator, UnitDatabase, UnitDatabaseConfig,
    DEFAULT_LEAF_SIZE_LIMIT,
};

/// Where a voice's files live and how to read them
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceConfig {
    pub name: String,
    pub units: PathBuf,
    pub features: PathBuf,
    pub audio_timeline: PathBuf,
    pub basename_timeline: Option<PathBuf>,
    pub leaf_size_limit: usize,
    pub try_memory_map: bool,
    pub buffer_size: usize,
}

impl VoiceConfig {
    /// Config with default reader settings for files under `dir`.
    pub fn new(name: impl Into<String>, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        VoiceConfig {
            name: name.into(),
            units: dir.join("halfphoneUnits.mry"),
            features: dir.join("halfphoneFeatures.mry"),
            audio_timeline: dir.join("timeline_waveforms.mry"),
            basename_timeline: None,
            leaf_size_limit: DEFAULT_LEAF_SIZE_LIMIT,
            try_memory_map: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Read a config file; relative paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> PhonixResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, base)
    }

    pub fn parse(text: &str, base_dir: impl AsRef<Path>) -> PhonixResult<Self> {
        Self::from_properties(&Properties::parse(text)?, base_dir)
    }

    pub fn from_properties(props: &Properties, base_dir: impl AsRef<Path>) -> PhonixResult<Self> {
        let base = base_dir.as_ref();
        let path = |key: &str| -> PhonixResult<PathBuf> { Ok(base.join(props.require(key)?)) };
        let leaf_size_limit: usize = props.parse_or("voice.leafSizeLimit", DEFAULT_LEAF_SIZE_LIMIT)?;
        if leaf_size_limit == 0 {
            return Err(PhonixError::InvalidArgument(
                "voice.leafSizeLimit must be positive".into(),
            ));
        }
        let buffer_size: usize = props.parse_or("timeline.bufferSize", DEFAULT_BUFFER_SIZE)?;
        if buffer_size == 0 {
            return Err(PhonixError::InvalidArgument(
                "timeline.bufferSize must be positive".into(),
            ));
        }
        Ok(VoiceConfig {
            name: props.require("voice.name")?.to_string(),
            units: path("voice.units")?,
            features: path("voice.features")?,
            audio_timeline: path("voice.audioTimeline")?,
            basename_timeline: props
                .get("voice.basenameTimeline")
                .map(|p| base.join(p)),
            leaf_size_limit,
            try_memory_map: props.parse_or("timeline.memoryMap", true)?,
            buffer_size,
        })
    }

    /// Properties that parse back to this config. Paths are written as
    /// given.
    pub fn to_properties(&self) -> Properties {
        let mut props = Properties::new()
            .with("voice.name", &self.name)
            .with("voice.units", self.units.display())
            .with("voice.features", self.features.display())
            .with("voice.audioTimeline", self.audio_timeline.display())
            .with("voice.leafSizeLimit", self.leaf_size_limit)
            .with("timeline.memoryMap", self.try_memory_map)
            .with("timeline.bufferSize", self.buffer_size);
        if let Some(basenames) = &self.basename_timeline {
            props.set("voice.basenameTimeline", basenames.display());
        }
        props
    }

    pub fn timeline_config(&self) -> TimelineConfig {
        TimelineConfig {
            try_memory_map: self.try_memory_map,
            buffer_size: self.buffer_size,
        }
    }

    pub fn database_config(&self) -> UnitDatabaseConfig {
        UnitDatabaseConfig {
            leaf_size_limit: self.leaf_size_limit,
        }
    }
}

/// A loaded unit-selection voice
#[derive(Debug)]
pub struct Voice {
    name: String,
    database: DiphoneUnitDatabase,
}

impl Voice {
    /// Open every file the config names. Any unreadable or inconsistent
    /// file fails the whole load.
    pub fn load(config: &VoiceConfig, cart: Box<dyn PreselectionCart>) -> PhonixResult<Self> {
        let timeline_config = config.timeline_config();
        let units = UnitFile::load(&config.units)?;
        let features = FeatureFile::load(&config.features)?;
        let audio = TimelineReader::open_with_config(&config.audio_timeline, &timeline_config)?;
        let basenames = config
            .basename_timeline
            .as_ref()
            .map(|p| TimelineReader::open_with_config(p, &timeline_config))
            .transpose()?;

        let base = UnitDatabase::new(config.database_config(), units, features, cart, audio, basenames)?;
        let database = DiphoneUnitDatabase::new(base)?;
        tracing::info!(
            "voice {} ready: {} units at {} Hz",
            config.name,
            database.base().len(),
            database.base().sample_rate()
        );
        Ok(Voice {
            name: config.name.clone(),
            database,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &DiphoneUnitDatabase {
        &self.database
    }

    /// Syllables within units `from..=to`
    pub fn syllables(&self, from: usize, to: usize) -> PhonixResult<SyllableIterator<'_>> {
        SyllableIterator::new(self.database.base().features(), from, to)
    }
}
