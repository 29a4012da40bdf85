//! Work-efficient (Blelloch-style) prefix sums used to build the block start
//! bit offset table.
//!
//! The scan runs in two phases over a power-of-two working array; entries past
//! the logical end are zero.
//!
//! * **Reduce**: each level halves the previous one, `out[i] = in[2i] + in[2i+1]`,
//!   until two nodes remain. The single root is never materialised; its
//!   exclusive prefix is zero by definition, so the sweep starts from an
//!   implicit `[0]`.
//! * **Sweep**: walking back down, a left child inherits its parent's prefix
//!   and a right child adds its left sibling's reduced value. At the leaf level
//!   the inclusive variant also adds the node itself.
//!
//! Every node within one level is independent, so with `Execution::Parallel`
//! large levels are processed on rayon. Levels are strictly ordered: a level
//! starts only after the previous one has been fully written, and the sweep
//! starts only after the reduce phase has finished.
//!
//! The serial running-sum functions are the reference the tree is validated
//! against.

use num_traits::PrimInt;
use rayon::prelude::*;

use crate::config::Execution;
use crate::error::EliasgError;
use crate::utils::padded_pow2;

/// Levels shorter than this are processed serially even in parallel mode.
pub const PARALLEL_LEVEL_THRESHOLD: usize = 1 << 12;

/// Integer types the scan can run over.
pub trait ScanValue: PrimInt + Send + Sync {}

impl<T: PrimInt + Send + Sync> ScanValue for T {}

/// Which prefix a sweep produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    /// Entry `i` sums `a[0..i]`.
    Exclusive,
    /// Entry `i` sums `a[0..=i]`.
    Inclusive,
}

//==================================================================================
// 1. Reduce Phase
//==================================================================================

/// One reduce level: `output[i] = input[2i] + input[2i + 1]`.
fn reduce_level<T: ScanValue>(input: &[T], output: &mut [T], execution: Execution) {
    let pair_sum = |(i, out): (usize, &mut T)| *out = input[2 * i] + input[2 * i + 1];
    if execution == Execution::Parallel && output.len() >= PARALLEL_LEVEL_THRESHOLD {
        output.par_iter_mut().enumerate().for_each(pair_sum);
    } else {
        output.iter_mut().enumerate().for_each(pair_sum);
    }
}

/// Halves `input` by summing adjacent pairs.
///
/// # Errors
/// `ScanError` if `input` has odd length, or a pair sum overflows `T`.
pub fn reduce<T: ScanValue>(input: &[T]) -> Result<Vec<T>, EliasgError> {
    if input.len() % 2 != 0 {
        return Err(EliasgError::ScanError(format!(
            "reduce needs an even-length input, got {}",
            input.len()
        )));
    }
    input
        .chunks_exact(2)
        .map(|pair| {
            pair[0].checked_add(&pair[1]).ok_or_else(|| {
                EliasgError::ScanError("pair sum overflows the scan value type".to_string())
            })
        })
        .collect()
}

/// Checked sum of `values`. Every node of a reduction tree is bounded by this
/// total, so a successful call rules out overflow anywhere in the scan.
pub fn checked_total<T: ScanValue>(values: &[T]) -> Result<T, EliasgError> {
    values.iter().try_fold(T::zero(), |acc, &v| {
        acc.checked_add(&v).ok_or_else(|| {
            EliasgError::ScanError("total overflows the scan value type".to_string())
        })
    })
}

/// The levels produced by the reduce phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionTree<T> {
    /// `levels[0]` holds the zero-padded leaves; each later level is half as long.
    levels: Vec<Vec<T>>,
    len: usize,
}

impl<T: ScanValue> ReductionTree<T> {
    pub fn build(values: &[T], execution: Execution) -> Result<Self, EliasgError> {
        checked_total(values)?;

        let mut leaves = values.to_vec();
        leaves.resize(padded_pow2(values.len()), T::zero());

        let mut levels = vec![leaves];
        while let Some(prev) = levels.last().filter(|level| level.len() > 2) {
            let mut next = vec![T::zero(); prev.len() / 2];
            reduce_level(prev, &mut next, execution);
            levels.push(next);
        }

        Ok(Self {
            levels,
            len: values.len(),
        })
    }

    /// Number of materialised levels, leaves included.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, index: usize) -> Option<&[T]> {
        self.levels.get(index).map(Vec::as_slice)
    }

    /// Sum of every input value.
    pub fn total(&self) -> T {
        self.levels
            .last()
            .map(|top| top.iter().fold(T::zero(), |acc, &v| acc + v))
            .unwrap_or_else(T::zero)
    }

    /// Runs the sweep phase and returns the first `len` scanned values.
    pub fn sweep(&self, kind: ScanKind, execution: Execution) -> Vec<T> {
        // Exclusive prefix of the implicit root.
        let mut parent = vec![T::zero()];

        for (depth, level) in self.levels.iter().enumerate().rev() {
            let include_self = depth == 0 && kind == ScanKind::Inclusive;
            let mut next = vec![T::zero(); level.len()];
            sweep_level(&parent, level, &mut next, include_self, execution);
            parent = next;
        }

        parent.truncate(self.len);
        parent
    }
}

//==================================================================================
// 2. Sweep Phase
//==================================================================================

/// One sweep level: a child's prefix is its parent's prefix plus, for a right
/// child, the reduced value of its left sibling.
fn sweep_level<T: ScanValue>(
    parent: &[T],
    level: &[T],
    out: &mut [T],
    include_self: bool,
    execution: Execution,
) {
    let node = |(i, slot): (usize, &mut T)| {
        let mut prefix = parent[i / 2];
        if i % 2 == 1 {
            prefix = prefix + level[i - 1];
        }
        if include_self {
            prefix = prefix + level[i];
        }
        *slot = prefix;
    };
    if execution == Execution::Parallel && out.len() >= PARALLEL_LEVEL_THRESHOLD {
        out.par_iter_mut().enumerate().for_each(node);
    } else {
        out.iter_mut().enumerate().for_each(node);
    }
}

//==================================================================================
// 3. Public API
//==================================================================================

/// Exclusive prefix sum via the reduction tree (parallel levels).
pub fn exclusive_scan<T: ScanValue>(values: &[T]) -> Result<Vec<T>, EliasgError> {
    scan_with(values, ScanKind::Exclusive, Execution::Parallel)
}

/// Inclusive prefix sum via the reduction tree (parallel levels).
pub fn inclusive_scan<T: ScanValue>(values: &[T]) -> Result<Vec<T>, EliasgError> {
    scan_with(values, ScanKind::Inclusive, Execution::Parallel)
}

/// Tree scan with an explicit kind and execution mode.
pub fn scan_with<T: ScanValue>(
    values: &[T],
    kind: ScanKind,
    execution: Execution,
) -> Result<Vec<T>, EliasgError> {
    if values.is_empty() {
        return Ok(Vec::new());
    }
    let tree = ReductionTree::build(values, execution)?;
    Ok(tree.sweep(kind, execution))
}

/// Straight running-sum exclusive scan.
pub fn serial_exclusive_scan<T: ScanValue>(values: &[T]) -> Result<Vec<T>, EliasgError> {
    let mut out = Vec::with_capacity(values.len());
    let mut acc = T::zero();
    for &v in values {
        out.push(acc);
        acc = acc.checked_add(&v).ok_or_else(|| {
            EliasgError::ScanError("running sum overflows the scan value type".to_string())
        })?;
    }
    Ok(out)
}

/// Straight running-sum inclusive scan.
pub fn serial_inclusive_scan<T: ScanValue>(values: &[T]) -> Result<Vec<T>, EliasgError> {
    let mut out = Vec::with_capacity(values.len());
    let mut acc = T::zero();
    for &v in values {
        acc = acc.checked_add(&v).ok_or_else(|| {
            EliasgError::ScanError("running sum overflows the scan value type".to_string())
        })?;
        out.push(acc);
    }
    Ok(out)
}

/// Checks that `offsets` is the exclusive scan of `lengths` and that the
/// lengths add up to `total`.
pub fn check_exclusive<T: ScanValue + std::fmt::Debug>(
    lengths: &[T],
    offsets: &[T],
    total: T,
) -> Result<(), EliasgError> {
    if lengths.len() != offsets.len() {
        return Err(EliasgError::OffsetTableError(format!(
            "{} lengths but {} offsets",
            lengths.len(),
            offsets.len()
        )));
    }
    let mut expected = T::zero();
    for (i, (&len, &offset)) in lengths.iter().zip(offsets).enumerate() {
        if offset != expected {
            return Err(EliasgError::OffsetTableError(format!(
                "entry {} is {:?}, expected {:?}",
                i, offset, expected
            )));
        }
        expected = expected.checked_add(&len).ok_or_else(|| {
            EliasgError::OffsetTableError("offset overflows the table type".to_string())
        })?;
    }
    if expected != total {
        return Err(EliasgError::OffsetTableError(format!(
            "lengths sum to {:?}, expected {:?}",
            expected, total
        )));
    }
    Ok(())
}
