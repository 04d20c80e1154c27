use criterion::{Criterion, black_box, criterion_group, criterion_main};
use html::{Tokenizer, parse};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 5_000;

fn make_blocks(count: usize) -> String {
    let mut out = String::from("<!doctype html><html><head><title>bench</title></head><body>");
    for i in 0..count {
        out.push_str("<div class=box><span>hello &amp; world</span><img src=x");
        out.push_str(&i.to_string());
        out.push_str(".png></div>");
    }
    out.push_str("</body></html>");
    out
}

fn make_rawtext_adversarial(bytes: usize) -> String {
    let mut body = String::with_capacity(bytes + 32);
    body.push_str("<script>");
    while body.len() < bytes {
        body.push_str("</scri<pt");
    }
    body.push_str("</script>");
    body
}

fn bench_tokenize_small(c: &mut Criterion) {
    let input = make_blocks(SMALL_BLOCKS);
    c.bench_function("bench_tokenize_small", |b| {
        b.iter(|| {
            let count = Tokenizer::new(black_box(&input)).count();
            black_box(count);
        });
    });
}

fn bench_tokenize_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_tokenize_large", |b| {
        b.iter(|| {
            let count = Tokenizer::new(black_box(&input)).count();
            black_box(count);
        });
    });
}

fn bench_parse_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_parse_large", |b| {
        b.iter(|| {
            let doc = parse(black_box(&input));
            black_box(doc.len());
        });
    });
}

fn bench_parse_rawtext_adversarial(c: &mut Criterion) {
    let input = make_rawtext_adversarial(256 * 1024);
    c.bench_function("bench_parse_rawtext_adversarial", |b| {
        b.iter(|| {
            let doc = parse(black_box(&input));
            black_box(doc.len());
        });
    });
}

criterion_group!(
    benches,
    bench_tokenize_small,
    bench_tokenize_large,
    bench_parse_large,
    bench_parse_rawtext_adversarial
);
criterion_main!(benches);
