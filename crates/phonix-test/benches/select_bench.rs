//! Benchmarks for Phonix candidate retrieval

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use phonix_select::{DiphoneTarget, HalfPhone, MarkupContext, Target, BLACKLIST_ATTRIBUTE};
use phonix_test::{basename_of, VoiceShape, SyntheticVoice, INVENTORY};

fn bench_half_phone_candidates(c: &mut Criterion) {
    let synth = SyntheticVoice::build(VoiceShape::large()).unwrap();
    let voice = synth.load(true).unwrap();
    let targets: Vec<Target> = INVENTORY
        .iter()
        .map(|p| Target::half_phone(*p, HalfPhone::Left))
        .collect();

    c.bench_function("half_phone_candidates", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % targets.len();
            black_box(voice.database().get_candidates(&targets[i]).unwrap().len())
        })
    });
}

fn bench_diphone_candidates(c: &mut Criterion) {
    let synth = SyntheticVoice::build(VoiceShape::large()).unwrap();
    let voice = synth.load(true).unwrap();
    let mut targets = Vec::new();
    for left in INVENTORY {
        for right in INVENTORY {
            targets.push(DiphoneTarget::new(
                Target::half_phone(left, HalfPhone::Right),
                Target::half_phone(right, HalfPhone::Left),
            ));
        }
    }

    c.bench_function("diphone_candidates", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % targets.len();
            black_box(voice.database().get_diphone_candidates(&targets[i]).unwrap().len())
        })
    });
}

fn bench_blacklisted_candidates(c: &mut Criterion) {
    let synth = SyntheticVoice::build(VoiceShape::large()).unwrap();
    let voice = synth.load(true).unwrap();
    let context = Arc::new(
        MarkupContext::new().with_attribute(BLACKLIST_ATTRIBUTE, format!("{} {}", basename_of(3), basename_of(17))),
    );
    let target = Target::new("a").with_context(context);

    c.bench_function("blacklisted_candidates", |b| {
        b.iter(|| black_box(voice.database().base().get_candidates(&target).unwrap().len()))
    });
}

fn bench_syllables(c: &mut Criterion) {
    let synth = SyntheticVoice::build(VoiceShape::large()).unwrap();
    let voice = synth.load(true).unwrap();
    let last = synth.num_units() - 1;

    c.bench_function("syllable_iteration", |b| {
        b.iter(|| black_box(voice.syllables(0, last).unwrap().count()))
    });
}

criterion_group!(
    benches,
    bench_half_phone_candidates,
    bench_diphone_candidates,
    bench_blacklisted_candidates,
    bench_syllables,
);
criterion_main!(benches);
