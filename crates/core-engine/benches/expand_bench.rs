//! Criterion benchmarks for expansion and edit propagation.

use core_config::Config;
use core_engine::Session;
use core_registry::Registry;
use core_snippet::SnippetOptions;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

fn registry() -> Registry {
    let mut registry = Registry::new();
    let snippets = [
        ("m", "[ ${1:first} ${2:sec} ]"),
        ("fn", "fn ${1:name}(${2:args}) {\n\t$0\n}\n// $1"),
        ("up", "${1:text} ${1/(\\w+)/\\u$1/g}"),
    ];
    for (trigger, body) in snippets {
        registry
            .add_snippet(trigger, body, "", SnippetOptions::empty())
            .unwrap_or_else(|e| panic!("bad bench snippet {trigger}: {e}"));
    }
    for i in 0..200 {
        registry
            .add_snippet(&format!("filler{i}"), "x $1 y", "", SnippetOptions::empty())
            .unwrap_or_else(|e| panic!("bad filler snippet: {e}"));
    }
    registry
}

fn custom_criterion() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_secs(1))
}

fn bench_expand(c: &mut Criterion) {
    let config = Config::default();
    c.bench_function("expand_with_mirror", |b| {
        b.iter(|| {
            let mut s = Session::new(&config, registry()).unwrap();
            s.feed(black_box("fn<Tab>main<C-j>argc<C-j>body")).unwrap();
            s.text()
        })
    });
}

fn bench_nested(c: &mut Criterion) {
    let config = Config::default();
    c.bench_function("nested_four_deep", |b| {
        b.iter(|| {
            let mut s = Session::new(&config, registry()).unwrap();
            s.feed(black_box("m<Tab>m<Tab>m<Tab>m<Tab>a<C-j>b<C-j><C-j><C-j>end"))
                .unwrap();
            s.text()
        })
    });
}

fn bench_transform_typing(c: &mut Criterion) {
    let config = Config::default();
    let typed = "lorem ipsum dolor sit amet ".repeat(4);
    c.bench_function("transform_per_keystroke", |b| {
        b.iter(|| {
            let mut s = Session::new(&config, registry()).unwrap();
            s.feed("up<Tab>").unwrap();
            s.feed(black_box(&typed)).unwrap();
            s.text()
        })
    });
}

criterion_group! {
    name = benches;
    config = custom_criterion();
    targets = bench_expand, bench_nested, bench_transform_typing
}
criterion_main!(benches);
