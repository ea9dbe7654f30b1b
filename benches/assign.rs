use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::Rgb;
use rmosaic::{Assignment, AssignmentEngine, CubeRoot, PaletteColor, Photo};

fn palette(colors: usize, capacity: usize) -> Vec<PaletteColor> {
    (0..colors)
        .map(|i| PaletteColor {
            index: i,
            color: Rgb([(i * 37) as u8, (i * 91) as u8, (i * 13) as u8]),
            capacity,
        })
        .collect()
}

fn photos(n: usize) -> Vec<Photo> {
    (0..n)
        .map(|i| {
            Photo::new(
                format!("cache/{i}.jpg"),
                Rgb([(i * 7) as u8, (i * 3) as u8, (i * 11) as u8]),
            )
        })
        .collect()
}

fn assign(palette: &[PaletteColor], photos: &[Photo]) -> Assignment {
    AssignmentEngine::new(palette, CubeRoot).assign(photos)
}

fn criterion_benchmark(c: &mut Criterion) {
    let palette = palette(128, 8);
    let photos = photos(2000);

    c.bench_function("assign 2000 photos to 128x8", |b| {
        b.iter(|| assign(black_box(&palette), black_box(&photos)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
