//! Parse / compile / run micro-benchmarks over a small script corpus.

use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};
use helena::{Compiler, Scope};

const COUNT_LOOP: &str = "set i 0\nset acc 0\nwhile {$i < 100} {set i [+ $i 1]\nset acc [+ $acc $i]}\nget acc";

const WORD_SOUP: &str =
    "set name world\nidem \"hello, $name\"\nset t (a b c)\nlist ($*t) foreach e {idem $e}\ncatch {error boom} error e {idem $e}";

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse/count_loop", |b| {
        b.iter(|| helena::parse(black_box(COUNT_LOOP)).unwrap());
    });
    c.bench_function("parse/word_soup", |b| {
        b.iter(|| helena::parse(black_box(WORD_SOUP)).unwrap());
    });
}

fn bench_compile(c: &mut Criterion) {
    let script = helena::parse(COUNT_LOOP).unwrap();
    c.bench_function("compile/count_loop", |b| {
        b.iter(|| Compiler::compile_script(black_box(&script), None).unwrap());
    });
}

fn bench_run(c: &mut Criterion) {
    let script = helena::parse(COUNT_LOOP).unwrap();
    c.bench_function("run/count_loop", |b| {
        b.iter(|| {
            let scope = Scope::new_root();
            let program = Compiler::compile_script(&script, Some(Rc::from(COUNT_LOOP))).unwrap();
            let mut process = scope.prepare_process(program);
            black_box(process.run())
        });
    });
}

criterion_group!(benches, bench_parse, bench_compile, bench_run);
criterion_main!(benches);
