use criterion::{Criterion, black_box, criterion_group, criterion_main};
use onigex::{Options, Pattern, Rules, Target, translate, translate_to_details};

fn es2018() -> Options {
    Options {
        target: Some(Target::Es2018),
        ..Options::default()
    }
}

fn bench_translate_plain(c: &mut Criterion) {
    let options = es2018();
    c.bench_function("translate_plain", |b| {
        b.iter(|| translate_to_details(black_box(r"hello\s+\w+"), &options))
    });
}

fn bench_translate_atomic(c: &mut Criterion) {
    let options = es2018();
    c.bench_function("translate_atomic", |b| {
        b.iter(|| translate_to_details(black_box(r"(?>a|ab)(?<n>c)++\k<n>"), &options))
    });
}

fn bench_translate_recursion(c: &mut Criterion) {
    let options = Options {
        rules: Rules {
            recursion_limit: 20,
            ..Rules::default()
        },
        ..es2018()
    };
    c.bench_function("translate_recursion", |b| {
        b.iter(|| translate_to_details(black_box(r"\((?<p>[^()]|\(\g<p>*\))*\)"), &options))
    });
}

fn bench_translate_classes(c: &mut Criterion) {
    let options = Options {
        target: Some(Target::Es2024),
        ..Options::default()
    };
    c.bench_function("translate_classes", |b| {
        b.iter(|| translate_to_details(black_box(r"[[:alpha:]&&[^aeiou]]+\p{Greek}\h"), &options))
    });
}

fn bench_native_match(c: &mut Criterion) {
    let pattern = translate(r"[a-zA-Z_][a-zA-Z0-9_]*", &es2018()).unwrap();
    let input = "let x = 42; function_name(); var123 + y";

    c.bench_function("native_find_all", |b| {
        b.iter(|| black_box(pattern.find_all(black_box(input))))
    });
}

fn bench_emulated_match(c: &mut Criterion) {
    let pattern = translate(r"(?<key>\w++)=(?<value>\d++)", &es2018()).unwrap();
    let input = "alpha=1 beta=22 gamma=333 delta=4444";

    c.bench_function("emulated_find_all", |b| {
        b.iter(|| black_box(pattern.find_all(black_box(input))))
    });
}

criterion_group!(
    benches,
    bench_translate_plain,
    bench_translate_atomic,
    bench_translate_recursion,
    bench_translate_classes,
    bench_native_match,
    bench_emulated_match,
);

criterion_main!(benches);
