use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use keyseal::{
    api_key_pipeline, CanonicalUri, FilterError, QueryString, ResourceAction,
    ResourceDataRequest, ResourceDataResult, ResourceKind,
};
use serde_json::{json, Value};

fn benchmark_collection_decoration(c: &mut Criterion) {
    let mut group = c.benchmark_group("apikey_list_read");

    for items in [1usize, 25, 100] {
        // Payload built once; the terminal clones it per call like a decoder would.
        let payload = json!({
            "items": (0..items).map(|i| json!({ "id": format!("k{i}") })).collect::<Vec<_>>()
        });
        let pipeline = api_key_pipeline(
            move |_request: ResourceDataRequest| -> Result<ResourceDataResult, FilterError> {
                Ok(ResourceDataResult::from_value(payload.clone()).unwrap_or_default())
            },
        );

        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, _| {
            b.iter(|| {
                let request = ResourceDataRequest::new(
                    ResourceAction::Read,
                    CanonicalUri::new("/apiKeys", None).unwrap(),
                    ResourceKind::ApiKeyList,
                    None,
                );
                pipeline.execute(black_box(request)).unwrap()
            });
        });
    }

    group.finish();
}

fn benchmark_pass_through(c: &mut Criterion) {
    let pipeline = api_key_pipeline(
        |_request: ResourceDataRequest| -> Result<ResourceDataResult, FilterError> {
            Ok(ResourceDataResult::from_value(Value::Object(Default::default())).unwrap_or_default())
        },
    );
    let query: QueryString = [("limit", "25")].into_iter().collect();

    c.bench_function("account_read_pass_through", |b| {
        b.iter(|| {
            let request = ResourceDataRequest::new(
                ResourceAction::Read,
                CanonicalUri::new("/accounts", Some(query.clone())).unwrap(),
                ResourceKind::other("AccountList"),
                None,
            );
            pipeline.execute(black_box(request)).unwrap()
        });
    });
}

criterion_group!(benches, benchmark_collection_decoration, benchmark_pass_through);
criterion_main!(benches);
