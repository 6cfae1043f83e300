//! Algorithms for uniform random sampling from containers of known length. These are written
//! against [`RandomSource`] rather than `rand::Rng` so that scripted sources can drive them in
//! tests.

use crate::random::RandomSource;

/// Draws `requested` distinct indexes from `0..length` uniformly without replacement, using a
/// partial Fisher-Yates shuffle. Asking for more than `length` yields all of them. The result
/// is in draw order and consumes exactly `min(requested, length)` draws.
pub fn sample_indexes<R>(rng: &mut R, length: usize, requested: usize) -> Vec<usize>
where
    R: RandomSource + ?Sized,
{
    let requested = requested.min(length);
    let mut pool: Vec<usize> = (0..length).collect();
    for i in 0..requested {
        let j = i + rng.index(length - i);
        pool.swap(i, j);
    }
    pool.truncate(requested);
    pool
}

/// Sample multiple random elements uniformly without replacement from a container of known
/// length. If more samples are requested than are in the container, every element is returned.
///
/// We do not assume the container is randomly indexable, only that it can be iterated over.
/// The selected elements come back in container order.
pub fn sample_multiple_from_known_length<R, I, T>(rng: &mut R, iter: I, requested: usize) -> Vec<T>
where
    R: RandomSource + ?Sized,
    I: ExactSizeIterator<Item = T>,
{
    let mut indexes = sample_indexes(rng, iter.len(), requested);
    if indexes.is_empty() {
        return Vec::new();
    }
    indexes.sort_unstable();
    let mut index_iterator = indexes.into_iter().peekable();
    let mut selected = Vec::with_capacity(index_iterator.len());

    for (idx, item) in iter.enumerate() {
        if index_iterator.peek() == Some(&idx) {
            selected.push(item);
            index_iterator.next();
            if index_iterator.peek().is_none() {
                break;
            }
        }
    }

    selected
}
