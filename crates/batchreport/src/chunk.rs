use std::iter::Enumerate;
use std::slice;

use crate::error::ChunkError;
use crate::job::JobId;

pub const DEFAULT_CHUNK_SIZE: usize = 25;

/// A bounded slice of job ids submitted together to one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk within its stage.
    pub index: usize,
    pub ids: Vec<JobId>,
}

impl Chunk {
    pub fn first_id(&self) -> Option<&JobId> {
        self.ids.first()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Lazy iterator over the chunks of an id sequence.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    inner: Enumerate<slice::Chunks<'a, JobId>>,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        self.inner.next().map(|(index, ids)| Chunk {
            index,
            ids: ids.to_vec(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Chunks<'_> {}

/// Splits `ids` into consecutive chunks of at most `size` ids, in order.
pub fn chunks(ids: &[JobId], size: usize) -> Result<Chunks<'_>, ChunkError> {
    if size == 0 {
        return Err(ChunkError::InvalidSize(size));
    }
    Ok(Chunks {
        inner: ids.chunks(size).enumerate(),
    })
}
