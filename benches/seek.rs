//! Performance benchmarks for seeking and composition.
//!
//! Run with: `cargo bench --bench seek`
//!
//! ## What is measured
//!
//! | Operation | Notes |
//! |-----------|-------|
//! | Open | Backward scan for the last record marker |
//! | Fetch by index | Linear in the index: skip, then parse one record |
//! | Compose | Signal plus N pileup records |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use event_overlay::{
    AsciiWriter, AttributeValue, Event, EventComposer, EventSeeker, EventWriter, FourVector,
};

/// One vertex, two beams in, `n_out` particles out.
fn make_event(number: i64, n_out: usize) -> Event {
    let mut evt = Event::new(number);
    let v = evt.add_vertex(FourVector::zero(), 0).unwrap();
    for pz in [6500.0, -6500.0] {
        let beam = evt.add_particle(FourVector::new(0.0, 0.0, pz, 6500.0), 2212, 4).unwrap();
        evt.attach_incoming(beam, v).unwrap();
    }
    for i in 0..n_out {
        let p = evt.add_particle(FourVector::new(i as f64, 1.0, 2.0, 10.0), 211, 1).unwrap();
        evt.attach_outgoing(p, v).unwrap();
    }
    evt.weights_mut().push(1.0);
    evt
}

fn make_signal() -> Event {
    let mut evt = make_event(0, 20);
    for (name, text) in [
        ("signal_process_id", "101"),
        ("signal_process_vertex", "1"),
        ("event_scale", "91.1876"),
        ("alphaQCD", "0.118"),
        ("alphaQED", "0.0078125"),
        ("mpi", "3"),
        ("GenCrossSection", "1.25 0.01 100 120"),
        ("GenPdfInfo", "21 21 0.01 0.02 91.1876 0.5 0.6 230000 230000"),
    ] {
        evt.set_attribute(name, AttributeValue::Text(text.to_string()));
    }
    evt
}

fn write_log(dir: &TempDir, records: usize) -> std::path::PathBuf {
    let path = dir.path().join(format!("bench_{}.hepmc3", records));
    let mut writer = AsciiWriter::create(&path).unwrap();
    for i in 0..records {
        writer.write_event(&make_event(i as i64, 20)).unwrap();
    }
    writer.close().unwrap();
    path
}

/// Benchmark opening a log (backward scan).
fn bench_open(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut group = c.benchmark_group("open");

    for records in [10, 100, 1000] {
        let path = write_log(&dir, records);
        group.bench_with_input(BenchmarkId::new("records", records), &path, |b, path| {
            b.iter(|| EventSeeker::open(black_box(path)).unwrap().total_count())
        });
    }

    group.finish();
}

/// Benchmark fetching the last record of logs of growing size.
fn bench_fetch_by_index(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut group = c.benchmark_group("fetch_by_index");

    for records in [10, 100, 1000] {
        let seeker = EventSeeker::open(write_log(&dir, records)).unwrap();
        group.throughput(Throughput::Elements(records as u64));
        group.bench_with_input(BenchmarkId::new("last_of", records), &seeker, |b, seeker| {
            b.iter(|| seeker.fetch_by_index(black_box(records - 1)).unwrap())
        });
    }

    group.finish();
}

/// Benchmark composing a signal with a growing number of pileup records.
fn bench_compose(c: &mut Criterion) {
    let signal = make_signal();
    let pileup: Vec<Event> = (1..=200).map(|i| make_event(i, 20)).collect();
    let mut group = c.benchmark_group("compose");

    for n in [0, 20, 50, 200] {
        group.throughput(Throughput::Elements(n as u64 + 1));
        group.bench_with_input(BenchmarkId::new("pileup", n), &n, |b, &n| {
            b.iter(|| {
                let mut composer = EventComposer::new(black_box(&signal)).unwrap();
                for evt in &pileup[..n] {
                    composer.add_event(evt).unwrap();
                }
                composer.into_event()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_open, bench_fetch_by_index, bench_compose);
criterion_main!(benches);
