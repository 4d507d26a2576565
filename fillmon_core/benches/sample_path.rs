use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use fillmon_core::mocks::NullSink;
use fillmon_core::{
    AutonomyMode, Engine, Format, InboundEvent, MetricsAccumulator, ProcessOrder, TankId,
    ToleranceBand,
};

// Synthetic unit weights around `nominal`, spread over roughly ±3t.
fn synth_weights(n: usize, nominal: f64, seed: u32) -> Vec<f64> {
    // tiny PRNG
    let mut state = seed.max(1);
    let mut next_f64 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    let spread = nominal * 0.06;
    (0..n)
        .map(|_| nominal + (next_f64() * 2.0 - 1.0) * spread)
        .collect()
}

fn order() -> ProcessOrder {
    ProcessOrder {
        of: "OF-B".into(),
        legajo: "1".into(),
        orden_envasado: "OE-B".into(),
        material: "M".into(),
        description: String::new(),
        format: Format::TwentyFiveKg,
        autonomy: AutonomyMode::CountBased {
            target_units: 1_000_000,
            rate_units_per_min: 30.0,
        },
    }
}

pub fn bench_classify(c: &mut Criterion) {
    let weights = synth_weights(4096, 25.0, 0xC0FFEE);
    let band = ToleranceBand::default();
    c.bench_function("classify_and_accumulate_4k", |b| {
        b.iter(|| {
            let mut acc = MetricsAccumulator::new();
            for &w in &weights {
                acc.record(band.classify(black_box(w), 25.0), w);
            }
            black_box(acc.result())
        });
    });
}

pub fn bench_engine_unit_path(c: &mut Criterion) {
    let weights = synth_weights(4096, 25.0, 42);
    c.bench_function("engine_unit_samples_4k", |b| {
        b.iter_batched(
            || {
                let mut engine = Engine::builder()
                    .with_sink(NullSink)
                    .build()
                    .expect("default engine");
                engine.start(TankId(5), order()).expect("idle tank");
                engine
            },
            |mut engine| {
                for &w in &weights {
                    black_box(engine.handle(InboundEvent::UnitSample {
                        tank: TankId(5),
                        weight_kg: w,
                        unit_index: None,
                    }));
                }
                engine
            },
            BatchSize::SmallInput,
        );
    });
}

pub fn bench_decode(c: &mut Criterion) {
    let payload = br#"{"weight":25.04,"unitIndex":1832}"#;
    c.bench_function("decode_unit_message", |b| {
        b.iter(|| black_box(InboundEvent::decode("tank", black_box("tank/tk5/unit"), payload)));
    });
}

criterion_group!(benches, bench_classify, bench_engine_unit_path, bench_decode);
criterion_main!(benches);
