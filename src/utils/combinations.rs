use std::collections::HashMap;

use crate::error::{Result, ZeroError};

/// Largest input accepted by [`OrderedSubsets`].
pub const ELEMENT_LIMIT: usize = 80;

/// Largest number of subsets generated for one size.
pub const SUBSET_LIMIT: usize = 100_000;

/// Binomial coefficient `C(n, size)`, `None` on overflow.
pub fn subset_count(n: usize, size: usize) -> Option<usize> {
    if size > n {
        return Some(0);
    }
    let size = size.min(n - size);
    let mut count: u128 = 1;
    for i in 0..size {
        // exact: count * (n - i) is divisible by i + 1 at every step
        count = count.checked_mul((n - i) as u128)? / (i as u128 + 1);
    }
    usize::try_from(count).ok()
}

/// Fails with `CapacityExceeded` when `n` elements exceed [`ELEMENT_LIMIT`]
/// or their size-`size` subsets exceed [`SUBSET_LIMIT`].
pub fn check_capacity(n: usize, size: usize) -> Result<()> {
    if n > ELEMENT_LIMIT {
        return Err(ZeroError::CapacityExceeded {
            size: n,
            limit: ELEMENT_LIMIT,
        });
    }
    let count = subset_count(n, size).unwrap_or(usize::MAX);
    if count > SUBSET_LIMIT {
        return Err(ZeroError::CapacityExceeded {
            size: count,
            limit: SUBSET_LIMIT,
        });
    }
    Ok(())
}

/// Fixed-size subsets of an ordered list, generated on request and cached per size.
///
/// Subsets keep the input order of their elements and are listed in the order
/// produced by "pick the first element, recurse on the remainder".
#[derive(Debug, Clone)]
pub struct OrderedSubsets<E> {
    elements: Vec<E>,
    cache: HashMap<usize, Vec<Vec<E>>>,
}

impl<E: Clone> OrderedSubsets<E> {
    pub fn new(elements: Vec<E>) -> Result<Self> {
        if elements.len() > ELEMENT_LIMIT {
            return Err(ZeroError::CapacityExceeded {
                size: elements.len(),
                limit: ELEMENT_LIMIT,
            });
        }
        Ok(Self {
            elements,
            cache: HashMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All subsets of `size` elements.
    pub fn subsets(&mut self, size: usize) -> Result<&[Vec<E>]> {
        let n = self.elements.len();
        if size < 1 || size > n {
            return Err(ZeroError::Configuration(format!(
                "subset size must be between 1 and {}, got {}",
                n, size
            )));
        }
        check_capacity(n, size)?;
        let elements = &self.elements;
        let list = self
            .cache
            .entry(size)
            .or_insert_with(|| combinations(elements, size));
        Ok(list.as_slice())
    }
}

fn combinations<E: Clone>(elements: &[E], size: usize) -> Vec<Vec<E>> {
    if size == elements.len() {
        return vec![elements.to_vec()];
    }
    if size == 1 {
        return elements.iter().map(|e| vec![e.clone()]).collect();
    }

    let mut list = Vec::new();
    for i in 0..=elements.len() - size {
        for rest in combinations(&elements[i + 1..], size - 1) {
            let mut subset = Vec::with_capacity(size);
            subset.push(elements[i].clone());
            subset.extend(rest);
            list.push(subset);
        }
    }
    list
}
