use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use ndarray::Array1;
use occipital::classifier::{postprocess, preprocess};
use occipital::{BuiltinModel, Classifier, ModelManager, RuntimeConfig};

fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Preprocessing");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    for (name, width, height) in [("small", 64, 64), ("square", 224, 224), ("photo", 1280, 960)] {
        let image = gradient_image(width, height);
        group.bench_function(format!("resize_{}", name), |b| {
            b.iter(|| preprocess(black_box(&image), (224, 224)))
        });
    }

    group.finish();
}

fn bench_postprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Postprocessing");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    for &count in &[10usize, 1000, 21843] {
        let logits = Array1::from_shape_fn(count, |i| ((i * 7919) % 1000) as f32 / 100.0);
        let labels: Vec<String> = (0..count).map(|i| format!("class_{}", i)).collect();
        group.bench_function(format!("classes_{}", count), |b| {
            b.iter(|| postprocess(black_box(logits.view()), &labels, 10).unwrap())
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let manager = ModelManager::new_default().unwrap();
    if !manager.is_model_downloaded(BuiltinModel::SqueezeNet) {
        eprintln!("SqueezeNet is not downloaded, skipping prediction benchmarks");
        return;
    }

    let mut group = c.benchmark_group("Prediction");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    // Test different runtime configurations
    let configs = vec![
        ("single_thread", RuntimeConfig {
            inter_threads: 1,
            intra_threads: 1,
            optimization_level: RuntimeConfig::optimization_level_from(1),
        }),
        ("multi_thread", RuntimeConfig {
            inter_threads: 2,
            intra_threads: 2,
            optimization_level: RuntimeConfig::optimization_level_from(2),
        }),
        ("optimized", RuntimeConfig::default()),
    ];

    let image = gradient_image(640, 480);
    for (name, config) in configs {
        let classifier = Classifier::builder()
            .with_runtime_config(config)
            .with_managed_model(&manager, BuiltinModel::SqueezeNet)
            .unwrap()
            .build()
            .unwrap();

        group.bench_function(format!("predict_{}", name), |b| {
            b.iter(|| classifier.predict_default(black_box(&image)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_preprocessing,
    bench_postprocessing,
    bench_prediction
);
criterion_main!(benches);
