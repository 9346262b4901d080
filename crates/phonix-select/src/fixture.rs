//! Small half-phone voice for unit tests
//!
//! Two recordings at 16 kHz, 800 samples per half-phone:
//!
//! | units | recording    | half-phones            |
//! |-------|--------------|------------------------|
//! | 0-7   | arctic_a0001 | edge a a t t a a edge  |
//! | 8-13  | arctic_b0002 | edge a a t t edge      |
//!
//! Syllables: `[1, 4]` and `[5, 6]` in the first recording, `[9, 12]` in the
//! second.

use std::io::Cursor;

use phonix_core::UnitFile;
use phonix_datagram::{Codec, Datagram};
use phonix_features::{DiscreteFeature, FeatureDefinition, FeatureFile, FeatureFileWriter};
use phonix_timeline::{TimelineReader, TimelineWriter};

use crate::{PhoneCart, UnitDatabase, UnitDatabaseConfig};

pub(crate) const SAMPLE_RATE: i32 = 16000;
pub(crate) const HALF_PHONE: i64 = 800;

/// `(phone, side, segs_from_syl_start, segs_from_syl_end)` per unit
type Row = (&'static str, &'static str, &'static str, &'static str);

const EDGE: Row = ("0", "0", "0", "0");

pub(crate) const SENTENCES: [(&str, &[Row]); 2] = [
    (
        "arctic_a0001",
        &[
            EDGE,
            ("a", "L", "0", "1"),
            ("a", "R", "0", "1"),
            ("t", "L", "1", "0"),
            ("t", "R", "1", "0"),
            ("a", "L", "0", "0"),
            ("a", "R", "0", "0"),
            EDGE,
        ],
    ),
    (
        "arctic_b0002",
        &[
            EDGE,
            ("a", "L", "0", "1"),
            ("a", "R", "0", "1"),
            ("t", "L", "1", "0"),
            ("t", "R", "1", "0"),
            EDGE,
        ],
    ),
];

pub(crate) fn schema() -> FeatureDefinition {
    FeatureDefinition::new(
        vec![
            DiscreteFeature::new("phone", ["0", "_", "a", "t"]),
            DiscreteFeature::new("halfphone_lr", ["0", "L", "R"]),
            DiscreteFeature::new("segs_from_syl_start", ["0", "1", "2"]),
            DiscreteFeature::new("segs_from_syl_end", ["0", "1", "2"]),
        ],
        vec![],
        vec![],
    )
    .unwrap()
}

fn is_edge(row: &Row) -> bool {
    row.0 == "0"
}

pub(crate) fn units_for(sentences: &[(&str, &[Row])]) -> UnitFile {
    let mut spans = Vec::new();
    let mut time = 0;
    for (_, rows) in sentences {
        for row in rows.iter() {
            let duration = if is_edge(row) { 0 } else { HALF_PHONE };
            spans.push((time, duration));
            time += duration;
        }
    }
    UnitFile::new(SAMPLE_RATE, &spans).unwrap()
}

pub(crate) fn features_for(sentences: &[(&str, &[Row])]) -> FeatureFile {
    let mut writer = FeatureFileWriter::new(schema(), true);
    for (_, rows) in sentences {
        for &(phone, side, start, end) in rows.iter() {
            writer
                .push_values(&[
                    ("phone", phone),
                    ("halfphone_lr", side),
                    ("segs_from_syl_start", start),
                    ("segs_from_syl_end", end),
                ])
                .unwrap();
        }
    }
    writer.finish()
}

/// Raw audio timeline of 400-sample datagrams covering `total` samples
pub(crate) fn audio_timeline(sample_rate: i32, total: i64) -> TimelineReader {
    let mut writer = TimelineWriter::new(Cursor::new(Vec::new()), sample_rate, 1000, &Codec::Raw).unwrap();
    let mut time = 0;
    while time < total {
        let duration = 400i64.min(total - time);
        writer
            .feed(&Datagram::new(duration, (time as u32).to_be_bytes().to_vec()))
            .unwrap();
        time += duration;
    }
    TimelineReader::from_bytes(writer.finish().unwrap().into_inner().into()).unwrap()
}

pub(crate) fn basename_timeline(sentences: &[(&str, &[Row])]) -> TimelineReader {
    let mut writer = TimelineWriter::new(Cursor::new(Vec::new()), SAMPLE_RATE, 1000, &Codec::Raw).unwrap();
    for (name, rows) in sentences {
        let duration = rows.iter().filter(|r| !is_edge(r)).count() as i64 * HALF_PHONE;
        writer.feed(&Datagram::new(duration, name.as_bytes().to_vec())).unwrap();
    }
    TimelineReader::from_bytes(writer.finish().unwrap().into_inner().into()).unwrap()
}

fn total_samples() -> i64 {
    SENTENCES
        .iter()
        .flat_map(|(_, rows)| rows.iter())
        .filter(|r| !is_edge(r))
        .count() as i64
        * HALF_PHONE
}

pub(crate) fn parts() -> (UnitFile, FeatureFile, TimelineReader, TimelineReader) {
    (
        units_for(&SENTENCES),
        features_for(&SENTENCES),
        audio_timeline(SAMPLE_RATE, total_samples()),
        basename_timeline(&SENTENCES),
    )
}

pub(crate) fn database(with_basenames: bool) -> UnitDatabase {
    let (units, features, audio, basenames) = parts();
    let cart = PhoneCart::from_features(&features).unwrap();
    UnitDatabase::new(
        UnitDatabaseConfig::default(),
        units,
        features,
        Box::new(cart),
        audio,
        with_basenames.then_some(basenames),
    )
    .unwrap()
}
