//! Greedy capacity-bounded assignment of photos to palette colors.
//!
//! Every photo goes to the closest palette color whose bucket has room. A full
//! bucket admits a photo only if it is strictly closer than the bucket's worst
//! occupant, in which case that occupant is evicted and placed again from
//! scratch. Evictions are driven from a work-list, never by recursion.
//!
//! The result is not globally optimal and, with a closeness limit, not
//! guaranteed to fill every bucket. [`Assignment::validate`] must pass before
//! the assignment is rendered.

use crate::color::Closeness;
use crate::error::{MosaicError, Result, Shortfall};
use crate::quantizer::PaletteColor;
use crate::sampler::Photo;
use ordered_float::OrderedFloat;
use std::collections::{BinaryHeap, VecDeque};

/// Heap entry of a bucket. The greatest entry is the worst fit; on equal
/// scores the photo fed later is considered worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Occupant {
    score: OrderedFloat<f64>,
    photo: usize,
}

/// Photos assigned to one palette color, with O(log n) access to the worst.
#[derive(Debug, Clone)]
pub struct Bucket {
    capacity: usize,
    occupants: BinaryHeap<Occupant>,
}

impl Bucket {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            occupants: BinaryHeap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Score and photo of the least close occupant.
    pub fn worst(&self) -> Option<(f64, usize)> {
        self.occupants.peek().map(|o| (o.score.0, o.photo))
    }

    fn insert(&mut self, photo: usize, score: f64) {
        debug_assert!(!self.is_full());
        self.occupants.push(Occupant {
            score: OrderedFloat(score),
            photo,
        });
    }

    fn evict_worst(&mut self) -> Option<usize> {
        self.occupants.pop().map(|o| o.photo)
    }

    /// Occupants from closest to least close.
    pub fn photos(&self) -> Vec<usize> {
        let mut occupants: Vec<_> = self.occupants.iter().copied().collect();
        occupants.sort();
        occupants.into_iter().map(|o| o.photo).collect()
    }

    /// Removes one occupant for rendering.
    pub fn take(&mut self) -> Option<usize> {
        self.occupants.pop().map(|o| o.photo)
    }
}

/// Counters describing how an assignment was reached.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AssignStats {
    /// Bucket insertions, re-placements of evicted photos included.
    pub placements: usize,
    pub evictions: usize,
    /// Most evictions triggered by feeding a single photo.
    pub longest_chain: usize,
}

/// Buckets for every palette color plus the photos that fit nowhere.
#[derive(Debug, Clone)]
pub struct Assignment {
    palette: Vec<PaletteColor>,
    buckets: Vec<Bucket>,
    dropped: Vec<usize>,
    stats: AssignStats,
}

impl Assignment {
    fn new(palette: &[PaletteColor]) -> Self {
        Self {
            palette: palette.to_vec(),
            buckets: palette.iter().map(|c| Bucket::new(c.capacity)).collect(),
            dropped: Vec::new(),
            stats: AssignStats::default(),
        }
    }

    fn slot(&self, palette_index: usize) -> Option<usize> {
        self.palette.iter().position(|c| c.index == palette_index)
    }

    pub fn palette(&self) -> &[PaletteColor] {
        &self.palette
    }

    /// Bucket of the palette color with index `palette_index`.
    pub fn bucket(&self, palette_index: usize) -> Option<&Bucket> {
        self.slot(palette_index).map(|slot| &self.buckets[slot])
    }

    /// Removes one photo from the bucket of `palette_index`.
    pub fn take(&mut self, palette_index: usize) -> Option<usize> {
        let slot = self.slot(palette_index)?;
        self.buckets[slot].take()
    }

    /// Photos that could not be placed, in the order they were dropped.
    pub fn dropped(&self) -> &[usize] {
        &self.dropped
    }

    pub fn stats(&self) -> AssignStats {
        self.stats
    }

    pub fn placed(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    /// Checks that every bucket reached its capacity.
    pub fn validate(&self) -> Result<()> {
        let shortfalls: Vec<_> = self
            .palette
            .iter()
            .zip(&self.buckets)
            .filter(|(_, bucket)| !bucket.is_full())
            .map(|(color, bucket)| Shortfall {
                index: color.index,
                color: color.color,
                capacity: color.capacity,
                filled: bucket.len(),
            })
            .collect();
        if shortfalls.is_empty() {
            Ok(())
        } else {
            Err(MosaicError::BucketExhausted { shortfalls })
        }
    }
}

/// Refuses to start when the pool cannot cover every cell.
pub fn check_supply(cells: usize, photos: usize) -> Result<()> {
    if cells > photos {
        return Err(MosaicError::InsufficientCandidates { cells, photos });
    }
    Ok(())
}

enum Placement {
    Placed,
    Displaced(usize),
    Dropped,
}

pub struct AssignmentEngine<'a, C> {
    palette: &'a [PaletteColor],
    closeness: C,
    max_closeness: Option<f64>,
}

impl<'a, C: Closeness> AssignmentEngine<'a, C> {
    pub fn new(palette: &'a [PaletteColor], closeness: C) -> Self {
        Self {
            palette,
            closeness,
            max_closeness: None,
        }
    }

    /// Palette colors scoring above `limit` are never offered to a photo.
    pub fn max_closeness(mut self, limit: Option<f64>) -> Self {
        self.max_closeness = limit;
        self
    }

    /// Buckets eligible for `photo`, closest first, ties by palette index.
    fn rank(&self, photo: &Photo) -> Vec<(OrderedFloat<f64>, usize)> {
        let mut ranked: Vec<_> = self
            .palette
            .iter()
            .enumerate()
            .map(|(slot, c)| (OrderedFloat(self.closeness.closeness(photo.color, c.color)), slot))
            .filter(|(score, _)| self.max_closeness.map_or(true, |limit| score.0 <= limit))
            .collect();
        ranked.sort_by_key(|&(score, slot)| (score, self.palette[slot].index));
        ranked
    }

    fn place(&self, assignment: &mut Assignment, photos: &[Photo], photo: usize) -> Placement {
        for (score, slot) in self.rank(&photos[photo]) {
            let bucket = &mut assignment.buckets[slot];
            if !bucket.is_full() {
                bucket.insert(photo, score.0);
                assignment.stats.placements += 1;
                return Placement::Placed;
            }
            let Some((worst_score, _)) = bucket.worst() else {
                // zero capacity
                continue;
            };
            if score.0 < worst_score {
                let Some(evicted) = bucket.evict_worst() else {
                    continue;
                };
                bucket.insert(photo, score.0);
                assignment.stats.placements += 1;
                assignment.stats.evictions += 1;
                tracing::debug!(
                    photo = %photos[photo].path.display(),
                    evicted = %photos[evicted].path.display(),
                    color = self.palette[slot].index,
                    "Displaced photo"
                );
                return Placement::Displaced(evicted);
            }
        }
        Placement::Dropped
    }

    /// Feeds `photos` in slice order. Indices in the result refer to `photos`.
    pub fn assign(&self, photos: &[Photo]) -> Assignment {
        let mut assignment = Assignment::new(self.palette);
        let mut pending = VecDeque::new();
        for photo in 0..photos.len() {
            pending.push_back(photo);
            let mut chain = 0;
            while let Some(photo) = pending.pop_front() {
                match self.place(&mut assignment, photos, photo) {
                    Placement::Placed => {}
                    Placement::Displaced(evicted) => {
                        chain += 1;
                        pending.push_back(evicted);
                    }
                    Placement::Dropped => assignment.dropped.push(photo),
                }
            }
            assignment.stats.longest_chain = assignment.stats.longest_chain.max(chain);
        }
        tracing::info!(
            placed = assignment.placed(),
            dropped = assignment.dropped.len(),
            evictions = assignment.stats.evictions,
            "Assigned photos"
        );
        assignment
    }
}
