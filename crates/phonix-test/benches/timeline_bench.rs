//! Benchmarks for Phonix timeline access

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use phonix_test::{VoiceShape, SyntheticVoice};
use phonix_timeline::{Extent, TimelineConfig, TimelineReader};

fn open(synth: &SyntheticVoice, config: &TimelineConfig) -> TimelineReader {
    TimelineReader::open_with_config(synth.path("timeline_waveforms.mry"), config).unwrap()
}

fn bench_datagram_lookup(c: &mut Criterion) {
    let synth = SyntheticVoice::build(VoiceShape::large()).unwrap();
    let total = synth.total_samples();

    for (name, config) in [
        ("datagram_lookup_mapped", TimelineConfig::default()),
        ("datagram_lookup_piecewise", TimelineConfig::piecewise()),
    ] {
        let reader = open(&synth, &config);
        c.bench_function(name, |b| {
            let mut t = 0i64;
            b.iter(|| {
                t = (t + 7919) % total;
                black_box(reader.get_datagram(black_box(t)).unwrap())
            })
        });
    }
}

fn bench_span_read(c: &mut Criterion) {
    let synth = SyntheticVoice::build(VoiceShape::large()).unwrap();
    let reader = open(&synth, &TimelineConfig::default());
    let total = synth.total_samples();

    c.bench_function("span_read_100ms", |b| {
        let mut t = 0i64;
        b.iter(|| {
            t = (t + 104_729) % total;
            black_box(
                reader
                    .get_datagram_span(black_box(t), Extent::Span(1600), 16000)
                    .unwrap(),
            )
        })
    });
}

fn bench_unit_audio(c: &mut Criterion) {
    let synth = SyntheticVoice::build(VoiceShape::large()).unwrap();
    let voice = synth.load(true).unwrap();
    let db = voice.database().base();
    let units = db.units();

    c.bench_function("unit_datagrams", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 31) % units.len();
            black_box(db.unit_datagrams(&units[i]).unwrap())
        })
    });
}

criterion_group!(benches, bench_datagram_lookup, bench_span_read, bench_unit_audio);
criterion_main!(benches);
