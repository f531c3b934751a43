use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use memory_scan::memory::scanner::{ScalarComparer, ScanPredicate, VectorScanner};
use memory_scan::memory::snapshot::{ReadGroup, RegionView};
use memory_scan::{Address, Constraint, ConstraintKind, DataType, MemoryValue, ValueType};

const BUFFER_SIZE: usize = 1 << 20;

fn sample_group() -> ReadGroup {
    let previous: Vec<u8> = (0..BUFFER_SIZE).map(|i| (i * 31 % 251) as u8).collect();
    let mut current = previous.clone();
    for (i, byte) in current.iter_mut().enumerate() {
        if i % 97 == 0 {
            *byte = byte.wrapping_add(1);
        }
    }
    ReadGroup::from_values(Address::new(0x1000_0000), current, previous).unwrap()
}

fn benchmark_variants(c: &mut Criterion) {
    let group = sample_group();
    let view = RegionView::whole(0, &group);

    let changed = ScanPredicate::compile(
        &Constraint::leaf(ConstraintKind::Changed),
        DataType::new(ValueType::U32),
    )
    .unwrap();
    let equal = ScanPredicate::compile(
        &Constraint::with_value(ConstraintKind::Equal, MemoryValue::U8(7)),
        DataType::new(ValueType::U8),
    )
    .unwrap();

    let mut bench = c.benchmark_group("vector_scan");
    bench.throughput(Throughput::Bytes(BUFFER_SIZE as u64));

    for (name, predicate, alignment) in [
        ("dense_u32", &changed, 4),
        ("staggered_u32", &changed, 1),
        ("sparse_u8", &equal, 4),
    ] {
        bench.bench_with_input(BenchmarkId::new(name, alignment), &alignment, |b, &alignment| {
            b.iter(|| VectorScanner::scan_region(black_box(&view), predicate, alignment).unwrap());
        });
    }
    bench.finish();

    c.bench_function("scalar_scan_dense_u32", |b| {
        b.iter(|| ScalarComparer::scan_region(black_box(&view), &changed, 4));
    });
}

fn benchmark_compound_predicate(c: &mut Criterion) {
    let group = sample_group();
    let view = RegionView::whole(0, &group);
    let constraint = Constraint::leaf(ConstraintKind::Increased).and(Constraint::with_value(
        ConstraintKind::LessThan,
        MemoryValue::U16(0x4000),
    ));
    let predicate = ScanPredicate::compile(&constraint, DataType::new(ValueType::U16)).unwrap();

    c.bench_function("vector_scan_and_u16", |b| {
        b.iter(|| VectorScanner::scan_region(black_box(&view), &predicate, 2).unwrap());
    });
}

criterion_group!(benches, benchmark_variants, benchmark_compound_predicate);
criterion_main!(benches);
