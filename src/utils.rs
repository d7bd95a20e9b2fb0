use rand::{rngs::StdRng, Rng};

/// Samples an index with probability proportional to its weight.
///
/// # Parameters
/// - `weights`: non-negative weights; they do not need to sum to 1.
/// - `rng`: the random number generator, seeded for reproducible sampling.
///
/// # Returns
/// The sampled index, or `None` if every weight is zero.
pub fn sample(weights: &[f64], rng: &mut StdRng) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if total <= 0. {
        return None;
    }

    let mut random: f64 = rng.random::<f64>() * total;

    weights
        .iter()
        .position(|&x| {
            random -= x;
            x > 0. && random <= 0.
        })
        .or_else(|| weights.iter().rposition(|&x| x > 0.))
}

/// Indices of every element equal to the maximum, in order.
pub fn argmax_all<T: PartialOrd + Copy>(values: &[T]) -> Vec<usize> {
    let mut best: Vec<usize> = Vec::new();

    for (index, &value) in values.iter().enumerate() {
        match best.first().map(|&b| values[b]) {
            Some(max) if value < max => {}
            Some(max) if value == max => best.push(index),
            _ => {
                best.clear();
                best.push(index);
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_sample_single_weight() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..20 {
            assert_eq!(sample(&[0., 0., 3., 0.], &mut rng), Some(2));
        }
    }

    #[test]
    fn test_sample_zero_weights() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sample(&[0., 0.], &mut rng), None);
        assert_eq!(sample(&[], &mut rng), None);
    }

    #[test]
    fn test_sample_distribution() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0; 3];
        for _ in 0..10_000 {
            counts[sample(&[1., 0., 3.], &mut rng).unwrap()] += 1;
        }

        assert_eq!(counts[1], 0);
        assert!(counts[2] > counts[0] * 2);
    }

    #[test]
    fn test_argmax_all() {
        assert_eq!(argmax_all(&[1, 3, 2, 3]), vec![1, 3]);
        assert_eq!(argmax_all(&[5]), vec![0]);
        assert_eq!(argmax_all::<u32>(&[]), Vec::<usize>::new());
        assert_eq!(argmax_all(&[0, 0, 0]), vec![0, 1, 2]);
    }
}
