use thiserror::Error;

use crate::matrix::Weight;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FwError {
    #[error("Invalid tiling: size {size} is not a positive multiple of block size {block}")]
    InvalidTiling { size: usize, block: usize },

    #[error("Invalid recursion: size {size} does not reduce to base case {block} by halving")]
    InvalidRecursion { size: usize, block: usize },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Allocation of {elements} matrix cells failed")]
    Allocation { elements: usize },

    #[error("Task pool exhausted: capacity {capacity}, requested slot {requested}")]
    PoolExhausted { capacity: usize, requested: usize },

    #[error("Task is still queued or running and cannot be recycled")]
    TaskBusy,

    #[error("Result mismatch at ({row}, {col}): expected {expected}, got {actual}")]
    Mismatch {
        row: usize,
        col: usize,
        expected: Weight,
        actual: Weight,
    },

    #[error("Matrix size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

pub type FwResult<T> = Result<T, FwError>;
