use criterion::{Criterion, black_box, criterion_group, criterion_main};
use bug_vision::analysis::{AnalysisSource, extract_json_payload, parse_model_response};

fn model_output(cases: usize) -> String {
    let test_cases: Vec<String> = (1..=cases)
        .map(|n| {
            format!(
                r#"{{"id":"TC-{:03}","title":"Verify {{braces}} in \"quoted\" title {}","preconditions":"User is logged in","steps":["Open the page","Click Submit"],"expectedResult":"Form is sent","actualResult":"Nothing happens","priority":"High","severity":"Major"}}"#,
                n, n
            )
        })
        .collect();
    format!(
        "Sure! Here is the analysis:\n```json\n{{\"bugTitle\":\"Submit does nothing\",\"testCases\":[{}]}}\n```\nLet me know if you need more.",
        test_cases.join(",")
    )
}

fn benchmark_extract(c: &mut Criterion) {
    let small = model_output(3);
    let large = model_output(100);

    c.bench_function("extract_json_payload_small", |b| {
        b.iter(|| {
            let json = extract_json_payload(black_box(&small));
            assert!(json.is_some());
        })
    });

    c.bench_function("parse_model_response_large", |b| {
        b.iter(|| {
            let analysis = parse_model_response(black_box(&large), AnalysisSource::Text, None);
            assert_eq!(analysis.test_cases.len(), 100);
        })
    });
}

criterion_group!(benches, benchmark_extract);
criterion_main!(benches);
