use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ecg_scan::models::GrayscaleImage;
use ecg_scan::utils::binarization::{
    TraceBinarization, binarize_for_trace, otsu_binarize, threshold_binarize,
};

/// Paper-coloured lead image with a diagonal ink stroke
fn lead_image(width: usize, height: usize) -> GrayscaleImage {
    let mut img = GrayscaleImage::filled(width, height, 240);
    for x in 0..width {
        let y = (x * (height - 1)) / width;
        for dy in 0..3usize.min(height - y) {
            img.set(x, y + dy, 20);
        }
    }
    img
}

fn bench_otsu_binarize_short_lead(c: &mut Criterion) {
    let img = lead_image(450, 300);
    c.bench_function("otsu_binarize_450x300", |b| {
        b.iter(|| otsu_binarize(black_box(img.as_bytes()), black_box(450), black_box(300)))
    });
}

fn bench_otsu_binarize_rhythm(c: &mut Criterion) {
    let img = lead_image(2250, 300);
    c.bench_function("otsu_binarize_2250x300", |b| {
        b.iter(|| otsu_binarize(black_box(img.as_bytes()), black_box(2250), black_box(300)))
    });
}

fn bench_threshold_binarize_short_lead(c: &mut Criterion) {
    let img = lead_image(450, 300);
    c.bench_function("threshold_binarize_450x300", |b| {
        b.iter(|| {
            threshold_binarize(
                black_box(img.as_bytes()),
                black_box(450),
                black_box(300),
                black_box(128),
            )
        })
    });
}

fn bench_binarize_for_trace_short_lead(c: &mut Criterion) {
    let img = lead_image(450, 300);
    let params = TraceBinarization::default();
    c.bench_function("binarize_for_trace_450x300", |b| {
        b.iter(|| binarize_for_trace(black_box(&img), black_box(&params)))
    });
}

criterion_group!(
    benches,
    bench_otsu_binarize_short_lead,
    bench_otsu_binarize_rhythm,
    bench_threshold_binarize_short_lead,
    bench_binarize_for_trace_short_lead
);
criterion_main!(benches);
