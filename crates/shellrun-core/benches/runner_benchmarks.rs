use criterion::{criterion_group, criterion_main, Criterion};
use shellrun_core::{diff_outputs, Client};
use shellrun_runtime::{parse_output, CancelToken};
use shellrun_schema::{Action, ClientConfig, CommandConfig, OutputMap};
use std::fmt::Write as _;

fn output_text(pairs: usize) -> String {
    let mut text = String::new();
    for i in 0..pairs {
        let _ = writeln!(text, "key_{i}=value={i}");
    }
    text
}

fn bench_parse_output(c: &mut Criterion) {
    let text = output_text(1000);
    c.bench_function("parse_output_1000_lines", |b| {
        b.iter(|| parse_output(&text).unwrap());
    });
}

fn bench_diff_outputs(c: &mut Criterion) {
    let previous: OutputMap = parse_output(&output_text(1000)).unwrap();
    let mut current = previous.clone();
    current.insert("key_500".to_owned(), "changed".to_owned());
    current.remove("key_10");
    c.bench_function("diff_outputs_1000_keys", |b| {
        b.iter(|| diff_outputs(&previous, &current));
    });
}

fn bench_execute(c: &mut Criterion) {
    let client = Client::new(ClientConfig::default()).unwrap();
    let command = CommandConfig::new(Action::Read, "echo id=1; echo name=bench").unwrap();
    c.bench_function("client_execute_echo", |b| {
        b.iter(|| client.execute(&command, &CancelToken::new()).unwrap());
    });
}

criterion_group!(
    benches,
    bench_parse_output,
    bench_diff_outputs,
    bench_execute
);
criterion_main!(benches);
