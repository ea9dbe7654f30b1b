use clap::ValueEnum;
use image::Rgb;
use std::iter;

/// Scores how alike two colors are. Lower is closer.
///
/// The engine only depends on the ordering the score induces, so any monotonic
/// transform of the same distance yields identical assignments. Absolute values
/// matter only for `max_closeness` thresholds.
pub trait Closeness {
    fn closeness(&self, a: Rgb<u8>, b: Rgb<u8>) -> f64;
}

impl<F> Closeness for F
where
    F: Fn(Rgb<u8>, Rgb<u8>) -> f64,
{
    fn closeness(&self, a: Rgb<u8>, b: Rgb<u8>) -> f64 {
        self(a, b)
    }
}

fn squared_distance(a: Rgb<u8>, b: Rgb<u8>) -> f64 {
    iter::zip(a.0, b.0)
        .map(|(a, b)| {
            let d = f64::from(a) - f64::from(b);
            d * d
        })
        .sum()
}

/// Sum of squared channel differences raised to 1/3.
///
/// Not a metric: it breaks the triangle inequality and its scale drifts with
/// magnitude. The exponent was probably meant to be 1/2, see [`Euclidean`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CubeRoot;

impl Closeness for CubeRoot {
    fn closeness(&self, a: Rgb<u8>, b: Rgb<u8>) -> f64 {
        squared_distance(a, b).cbrt()
    }
}

/// Plain euclidean distance in sRGB.
#[derive(Debug, Default, Clone, Copy)]
pub struct Euclidean;

impl Closeness for Euclidean {
    fn closeness(&self, a: Rgb<u8>, b: Rgb<u8>) -> f64 {
        squared_distance(a, b).sqrt()
    }
}

/// Scoring function selectable from the command line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClosenessKind {
    #[default]
    CubeRoot,
    Euclidean,
}

impl Closeness for ClosenessKind {
    #[inline]
    fn closeness(&self, a: Rgb<u8>, b: Rgb<u8>) -> f64 {
        match self {
            ClosenessKind::CubeRoot => CubeRoot.closeness(a, b),
            ClosenessKind::Euclidean => Euclidean.closeness(a, b),
        }
    }
}
