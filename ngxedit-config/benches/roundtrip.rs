use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ngxedit_config::{format, parse};
use ngxedit_core::{Document, HostPort, Location, ProxyTarget, Server, Upstream};

/// Canonical text with one pool of `servers` targets and `servers` servers
fn large_config(servers: usize) -> String {
    let mut pool = Upstream::named("backend")
        .with_method("least_conn")
        .with_after("# pool end");
    for i in 0..servers {
        pool.add_host_port(HostPort::new(format!("10.0.{}.{}", i / 250, i % 250), 8080));
    }

    let mut doc = Document::new();
    doc.add_upstream(pool);
    for i in 0..servers {
        let location = Location::new("/", ProxyTarget::new("http", "backend"))
            .with_after("proxy_set_header Host $host;");
        doc.add_server(Server::named(format!("worker{:04}", i)).with_location(location));
    }
    doc.to_string()
}

fn bench_roundtrip(c: &mut Criterion) {
    let source = large_config(500);

    c.bench_function("parse 500 servers", |b| {
        b.iter(|| parse(black_box(&source)).unwrap())
    });

    let doc = parse(&source).unwrap();
    c.bench_function("format 500 servers", |b| b.iter(|| format(black_box(&doc))));
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
