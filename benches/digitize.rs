use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ecg_scan::config::PipelineConfig;
use ecg_scan::digitizer::{digitize_lead, digitize_leads};
use ecg_scan::models::Condition;
use ecg_scan::segmentation::segment;
use ecg_scan::synthetic::{demo_artifacts, render_condition};
use ecg_scan::utils::grayscale::normalize;
use ecg_scan::{Pipeline, diagnose_batch};

fn bench_digitize_single_lead(c: &mut Criterion) {
    let cfg = PipelineConfig::default();
    let sheet = render_condition(1106, 786, Condition::Normal).expect("render failed");
    let gray = normalize(&sheet).expect("normalize failed");
    let regions = segment(&gray, &cfg.layout);
    c.bench_function("digitize_lead_II", |b| {
        b.iter(|| digitize_lead(black_box(&regions[4]), black_box(&cfg.digitizer)))
    });
    c.bench_function("digitize_rhythm_strip", |b| {
        b.iter(|| digitize_lead(black_box(&regions[12]), black_box(&cfg.digitizer)))
    });
}

fn bench_digitize_sheet(c: &mut Criterion) {
    let cfg = PipelineConfig::default();
    let sheet = render_condition(1106, 786, Condition::Normal).expect("render failed");
    let gray = normalize(&sheet).expect("normalize failed");
    let regions = segment(&gray, &cfg.layout);
    c.bench_function("digitize_leads_1106x786", |b| {
        b.iter(|| digitize_leads(black_box(&regions), black_box(&cfg.digitizer)))
    });
}

fn bench_end_to_end(c: &mut Criterion) {
    let artifacts =
        demo_artifacts(PipelineConfig::default(), 1106, 786).expect("artifacts failed");
    let sheet =
        render_condition(1106, 786, Condition::MyocardialInfarction).expect("render failed");
    let pipeline = Pipeline::new(&artifacts);
    c.bench_function("pipeline_run_1106x786", |b| {
        b.iter(|| pipeline.run(black_box(&sheet)))
    });

    let batch: Vec<_> = Condition::ALL
        .iter()
        .map(|&cond| render_condition(1106, 786, cond).expect("render failed"))
        .collect();
    c.bench_function("diagnose_batch_4x1106x786", |b| {
        b.iter(|| diagnose_batch(black_box(&artifacts), black_box(&batch)))
    });
}

criterion_group!(
    benches,
    bench_digitize_single_lead,
    bench_digitize_sheet,
    bench_end_to_end
);
criterion_main!(benches);
