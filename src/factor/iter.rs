//! Mixed-radix walk over the configurations of a scope, keeping one index per operand table in
//! step.
//!
//! Every operation that combines `Factor`s visits the configurations of a result scope in order
//! (first variable fastest). Each step increments the lowest digit that does not overflow and
//! resets the digits below it; for every operand, the index moves by that operand's accumulated
//! offset for the incremented digit. No configuration is ever materialized.

use super::Factor;
use crate::variable::Variable;

/// Accumulated offsets for a walk over `dims`, given each digit's stride in some table.
///
/// Incrementing digit `i` resets digits `0..i` from their maximum back to zero, so the index
/// moves by `strides[i] - sum_{j < i} (dims[j] - 1) * strides[j]`.
pub(crate) fn accumulate(strides: &[usize], dims: &[usize]) -> Vec<isize> {
    let mut acc = Vec::with_capacity(strides.len());
    let mut wrapped: isize = 0;
    for (&s, &d) in strides.iter().zip(dims.iter()) {
        acc.push(s as isize - wrapped);
        wrapped += (d as isize - 1) * s as isize;
    }
    acc
}


pub(crate) struct AlignedIter {
    dims: Vec<usize>,
    coordinate: Vec<usize>,

    /// `accumulated[k][i]`: the move of operand `k` when digit `i` increments
    accumulated: Vec<Vec<isize>>,

    positions: Vec<isize>
}

impl AlignedIter {

    /// Walk the configurations of `scope`, tracking an index into each of `operands`
    pub(crate) fn new(scope: &[Variable], operands: &[&Factor]) -> AlignedIter {
        let dims: Vec<usize> = scope.iter().map(|v| v.cardinality()).collect();
        let accumulated = operands.iter().map(|f| f.accumulated_offsets(scope)).collect();
        AlignedIter::build(dims, accumulated)
    }

    /// Walk `dims`, tracking one index per entry of `strides` (the stride of each digit in that
    /// table, zero where the table does not depend on the digit)
    pub(crate) fn from_strides(dims: Vec<usize>, strides: Vec<Vec<usize>>) -> AlignedIter {
        let accumulated = strides.iter().map(|s| accumulate(s, &dims)).collect();
        AlignedIter::build(dims, accumulated)
    }

    fn build(dims: Vec<usize>, accumulated: Vec<Vec<isize>>) -> AlignedIter {
        AlignedIter {
            coordinate: vec![0; dims.len()],
            positions: vec![0; accumulated.len()],
            dims,
            accumulated
        }
    }

    /// Shift the index of operand `k` by `base`
    pub(crate) fn seed(&mut self, k: usize, base: usize) {
        self.positions[k] += base as isize;
    }

    /// The number of configurations of the walked scope
    pub(crate) fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// The current index into operand `k`
    #[inline]
    pub(crate) fn position(&self, k: usize) -> usize {
        self.positions[k] as usize
    }

    /// The current configuration
    #[inline]
    pub(crate) fn coordinate(&self) -> &[usize] {
        &self.coordinate
    }

    /// Step to the next configuration. Returns the digit that was incremented, or `None` once
    /// every configuration has been visited (the indices are then left untouched).
    #[inline]
    pub(crate) fn advance(&mut self) -> Option<usize> {
        let mut digit = None;
        for (i, c) in self.coordinate.iter_mut().enumerate() {
            *c += 1;
            if *c < self.dims[i] {
                digit = Some(i);
                break;
            }
            *c = 0;
        }

        if let Some(i) = digit {
            for (p, acc) in self.positions.iter_mut().zip(self.accumulated.iter()) {
                *p += acc[i];
            }
        }

        digit
    }

}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::factor::Role;

    #[test]
    fn accumulate_strides() {
        assert_eq!(vec![1, 1, 1], accumulate(&[1, 2, 6], &[2, 3, 4]));
        assert_eq!(vec![3, -2, -5], accumulate(&[3, 1, 0], &[2, 3, 4]));
    }

    #[test]
    fn walk_tracks_operands() {
        let a = Variable::binary();
        let b = Variable::discrete(3);
        let c = Variable::binary();

        let ab = Factor::new(vec![a.clone(), b.clone()], Role::Utility).unwrap();
        let cb = Factor::new(vec![c.clone(), b.clone()], Role::Utility).unwrap();

        let scope = vec![a.clone(), b.clone(), c.clone()];
        let mut walk = AlignedIter::new(&scope, &[&ab, &cb]);
        assert_eq!(12, walk.len());

        for _ in 0..walk.len() {
            let coord = walk.coordinate().to_vec();
            assert_eq!(ab.position(&[coord[0], coord[1]]), walk.position(0));
            assert_eq!(cb.position(&[coord[2], coord[1]]), walk.position(1));
            walk.advance();
        }

        // wrapped around
        assert_eq!(&[0, 0, 0], walk.coordinate());
    }

    #[test]
    fn empty_scope_visits_once() {
        let mut walk = AlignedIter::new(&[], &[]);
        assert_eq!(1, walk.len());
        assert_eq!(None, walk.advance());
    }

}
