//! Benchmarks for pawtrack-query using criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pawtrack_core::schema::TableBuilder;
use pawtrack_core::{DataType, Row, Value};
use pawtrack_query::{range_by_owner_and_time, SortOrder, Window};
use pawtrack_storage::RowStore;

fn populated(owners: usize, per_owner: usize) -> RowStore {
    let schema = TableBuilder::new("incidents")
        .unwrap()
        .add_column("id", DataType::String)
        .unwrap()
        .add_column("dogId", DataType::String)
        .unwrap()
        .add_column("timestamp", DataType::String)
        .unwrap()
        .add_primary_key(&["id"])
        .unwrap()
        .add_index("dogId_timestamp", &["dogId", "timestamp"], false)
        .unwrap()
        .build()
        .unwrap();
    let mut store = RowStore::new(schema).unwrap();
    for t in 0..per_owner {
        for o in 0..owners {
            store
                .insert(Row::create(vec![
                    Value::String(format!("{o}-{t}")),
                    Value::String(format!("dog-{o}")),
                    Value::String(format!("2024-01-01T00:00:{t:08}Z")),
                ]))
                .unwrap();
        }
    }
    store
}

fn range_page_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_first_page");
    let store = populated(4, 10000);
    let owner = Value::from("dog-2");
    let start = Value::from("2024-01-01T00:00:00000000Z");

    for page in [20usize, 200, 2000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(page), page, |b, &page| {
            b.iter(|| {
                black_box(
                    range_by_owner_and_time(
                        &store,
                        "dogId_timestamp",
                        &owner,
                        &start,
                        &Value::from("2024-01-01T00:00:99999999Z"),
                        SortOrder::Descending,
                        Some(Window::first(page)),
                    )
                    .unwrap(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, range_page_benchmark);
criterion_main!(benches);
