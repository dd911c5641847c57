use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use cnplite::{AttributePolicy, Backend, Node, Value, XmlParser, XmlSerializer};

const RESPONSE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cnpOnlineResponse version="12.0" xmlns="http://www.vantivcnp.com/schema" response="0" message="Valid Format">
  <authorizationResponse id="1" reportGroup="Web">
    <cnpTxnId>82924701437133501</cnpTxnId>
    <orderId>1</orderId>
    <response>000</response>
    <message>Approved</message>
    <fraudResult><avsResult>01</avsResult></fraudResult>
  </authorizationResponse>
</cnpOnlineResponse>"#;

fn request() -> Value {
    let sale = |n: i64| {
        Value::Node(
            Node::new()
                .with("id", n)
                .with("reportGroup", "Web")
                .with("orderId", format!("order-{n}"))
                .with("amount", 10_000 + n)
                .with("orderSource", "ecommerce")
                .with(
                    "card",
                    Node::new()
                        .with("type", "VI")
                        .with("number", "4457010000000009")
                        .with("expDate", "0121"),
                ),
        )
    };
    Value::Node(
        Node::new()
            .with("merchantId", "default")
            .with("sale", (0..20).map(sale).collect::<Vec<_>>()),
    )
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_response");
    for backend in Backend::ALL {
        let parser = backend.parser();
        group.bench_function(BenchmarkId::from_parameter(backend), |b| {
            b.iter(|| parser.parse(black_box(RESPONSE_XML)))
        });
    }
    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let value = request();
    let mut group = c.benchmark_group("serialize_batch");
    for backend in Backend::ALL {
        let serializer = backend.serializer(AttributePolicy::default());
        group.bench_function(BenchmarkId::from_parameter(backend), |b| {
            b.iter(|| serializer.serialize(black_box(&value), "batchRequest"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_serialize);
criterion_main!(benches);
