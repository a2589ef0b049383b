//! Benchmarks for the conversion pipeline.

#![allow(clippy::format_push_string)] // Benchmark setup code, performance not critical

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use wr_core::{ConvertRequest, Converter};
use wr_xdom::Syntax;

/// Generate xwiki/2.0 content with the given structure.
fn generate_xwiki(headings: usize, paragraphs_per_section: usize) -> String {
    let mut text = String::with_capacity(headings * 50 + headings * paragraphs_per_section * 200);
    text.push_str("= Document Title =\n\n");

    for i in 0..headings {
        text.push_str(&format!("== Section {i} ==\n\n"));
        for j in 0..paragraphs_per_section {
            text.push_str(&format!(
                "Paragraph {j} in section {i} with **bold**, //italic// and a [[link>>Main.Page{j}]].\n\n"
            ));
        }
        text.push_str("* first\n** nested\n* second\n\n");
        text.push_str("{{info}}Remember section {{get name=\"who\" default=\"x\"/}}{{/info}}\n\n");
    }
    text
}

fn bench_convert_simple(c: &mut Criterion) {
    let converter = Converter::new();

    c.bench_function("convert_simple_to_xhtml", |b| {
        b.iter(|| converter.convert("= Hello =\n\nSimple **content**.", &Syntax::XWIKI_2_0, &Syntax::XHTML_1_0));
    });
}

fn bench_convert_by_target(c: &mut Criterion) {
    let converter = Converter::new();
    let text = generate_xwiki(20, 3);

    let mut group = c.benchmark_group("convert_by_target");
    group.throughput(Throughput::Bytes(text.len() as u64));
    for target in [Syntax::XHTML_1_0, Syntax::PLAIN_1_0, Syntax::XWIKI_2_0, Syntax::EVENT_1_0] {
        group.bench_with_input(BenchmarkId::from_parameter(target.id()), &target, |b, target| {
            b.iter(|| converter.convert(&text, &Syntax::XWIKI_2_0, target));
        });
    }
    group.finish();
}

fn bench_convert_varying_sizes(c: &mut Criterion) {
    let converter = Converter::new();

    let mut group = c.benchmark_group("convert_by_size");
    for (headings, paragraphs) in [(5, 2), (20, 3), (50, 5)] {
        let text = generate_xwiki(headings, paragraphs);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("xwiki", format!("{headings}h_{paragraphs}p")),
            &text,
            |b, text| b.iter(|| converter.convert(text, &Syntax::XWIKI_2_0, &Syntax::XHTML_1_0)),
        );
    }
    group.finish();
}

fn bench_convert_batch(c: &mut Criterion) {
    let converter = Converter::new();
    let requests: Vec<ConvertRequest> = (0..64)
        .map(|_| ConvertRequest::new(generate_xwiki(5, 2), Syntax::XWIKI_2_0, Syntax::XHTML_1_0))
        .collect();

    c.bench_function("convert_batch_64", |b| {
        b.iter(|| converter.convert_batch(&requests));
    });
}

criterion_group!(
    benches,
    bench_convert_simple,
    bench_convert_by_target,
    bench_convert_varying_sizes,
    bench_convert_batch,
);
criterion_main!(benches);
