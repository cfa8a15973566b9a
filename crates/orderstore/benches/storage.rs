use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use orderstore::OrderStore;
use tempfile::TempDir;

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("put_1kb", |b| {
        let dir = TempDir::new().unwrap();
        let db = OrderStore::open(dir.path()).unwrap();
        let data = vec![b'x'; 1024];

        let mut counter = 0u64;
        b.iter(|| {
            db.put(&format!("order-{}", counter), &data).unwrap();
            counter += 1;
        });
    });
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_1kb", |b| {
        let dir = TempDir::new().unwrap();
        let db = OrderStore::open(dir.path()).unwrap();
        let data = vec![b'x'; 1024];

        let keys: Vec<String> = (0..100).map(|i| format!("order-{}", i)).collect();
        for key in &keys {
            db.put(key, &data).unwrap();
        }

        let mut counter = 0;
        b.iter(|| {
            black_box(db.get(&keys[counter % 100]).unwrap());
            counter += 1;
        });
    });
    group.finish();
}

criterion_group!(benches, bench_put, bench_get);
criterion_main!(benches);
