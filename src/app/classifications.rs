//! Classification combination enumerator
//!
//! Expands the classifications of a table into every concrete combination of
//! one category per classification, so each combination can be requested
//! (and cached) separately. The aggregate total category "0" is never
//! produced: not filtering on a classification already yields it.

use crate::app::models::{ClassificationMetadata, Classifications};

/// Enumerate every category combination across `classifications`
///
/// Combinations are produced depth-first in input order: the first
/// classification varies slowest and the last one fastest. Each yielded map
/// is an owned snapshot holding one single-element category list per
/// classification.
///
/// An empty input, or any classification with no concrete category, yields
/// nothing.
pub fn unnest(classifications: &[ClassificationMetadata]) -> Combinations {
    let axes: Vec<(String, Vec<String>)> = classifications
        .iter()
        .map(|classification| {
            let categories = classification
                .categories
                .iter()
                .filter(|category| !category.is_total())
                .map(|category| category.id.clone())
                .collect();
            (classification.id.clone(), categories)
        })
        .collect();

    let exhausted = axes.is_empty() || axes.iter().any(|(_, categories)| categories.is_empty());

    Combinations {
        cursor: vec![0; axes.len()],
        axes,
        exhausted,
    }
}

/// Lazy iterator returned by [`unnest`]
#[derive(Debug, Clone)]
pub struct Combinations {
    axes: Vec<(String, Vec<String>)>,
    cursor: Vec<usize>,
    exhausted: bool,
}

impl Combinations {
    /// Total number of combinations, product of concrete category counts
    pub fn total(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes
            .iter()
            .map(|(_, categories)| categories.len())
            .product()
    }

    fn snapshot(&self) -> Classifications {
        self.axes
            .iter()
            .zip(&self.cursor)
            .map(|((id, categories), &i)| (id.clone(), vec![categories[i].clone()]))
            .collect()
    }

    /// Advance the rightmost axis, carrying into the ones before it
    fn advance(&mut self) {
        for axis in (0..self.axes.len()).rev() {
            self.cursor[axis] += 1;
            if self.cursor[axis] < self.axes[axis].1.len() {
                return;
            }
            self.cursor[axis] = 0;
        }
        self.exhausted = true;
    }
}

impl Iterator for Combinations {
    type Item = Classifications;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let combination = self.snapshot();
        self.advance();
        Some(combination)
    }
}
