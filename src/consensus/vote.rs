use std::collections::HashMap;
use std::hash::Hash;

/// Most frequent present value; ties go to the value encountered first.
///
/// Runs once over a complete batch. Returns `None` when every sample is absent.
pub fn majority_vote<T, I>(samples: I) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = Option<T>>,
{
    let mut order: Vec<(T, usize)> = Vec::new();
    let mut index: HashMap<T, usize> = HashMap::new();

    for value in samples.into_iter().flatten() {
        match index.get(&value) {
            Some(&slot) => order[slot].1 += 1,
            None => {
                index.insert(value.clone(), order.len());
                order.push((value, 1));
            }
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in order {
        if best.as_ref().map_or(true, |(_, top)| count > *top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// String flavour of [`majority_vote`]: empty samples count as absent.
pub fn majority_vote_str<S: AsRef<str>>(samples: &[S]) -> Option<String> {
    majority_vote(samples.iter().map(|sample| {
        let sample = sample.as_ref();
        (!sample.is_empty()).then(|| sample.to_string())
    }))
}
