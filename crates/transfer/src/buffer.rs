use std::collections::BTreeMap;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use streamfs_protocol::DataChunk;

use crate::TransferError;

/// Pending data chunks for one file, written to a sink in block order.
///
/// The capacity only decides *when* a flush is due. A flush writes the
/// contiguous run starting at the next expected block and keeps anything
/// beyond a gap pending, so output is ascending by block for any arrival
/// order and any capacity.
#[derive(Debug)]
pub struct ChunkBuffer {
    pending: BTreeMap<u32, Vec<u8>>,
    capacity: usize,
    next_block: u32,
}

impl ChunkBuffer {
    /// Creates a buffer that asks for a flush once `capacity` chunks are
    /// pending. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: BTreeMap::new(),
            capacity: capacity.max(1),
            next_block: 1,
        }
    }

    /// Adds a data chunk.
    ///
    /// Fails for a block that is already pending or that precedes blocks
    /// already written.
    pub fn add(&mut self, chunk: DataChunk) -> Result<(), TransferError> {
        if chunk.block < self.next_block {
            return Err(TransferError::LateBlock {
                block: chunk.block,
                expected: self.next_block,
            });
        }
        if self.pending.contains_key(&chunk.block) {
            return Err(TransferError::DuplicateBlock(chunk.block));
        }
        self.pending.insert(chunk.block, chunk.content);
        Ok(())
    }

    /// Returns `true` when the pending count has reached the capacity.
    pub fn should_flush(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Bytes held by pending chunks.
    pub fn pending_bytes(&self) -> u64 {
        self.pending.values().map(|c| c.len() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Block number the next write must start with.
    pub fn next_block(&self) -> u32 {
        self.next_block
    }

    /// Writes the contiguous run of pending chunks to `sink` and returns the
    /// number of bytes written. Chunks after a gap stay pending.
    ///
    /// The sink is flushed before returning.
    pub async fn flush<W>(&mut self, sink: &mut W) -> Result<u64, TransferError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0u64;
        while let Some(content) = self.pending.remove(&self.next_block) {
            sink.write_all(&content).await?;
            written += content.len() as u64;
            self.next_block = self
                .next_block
                .checked_add(1)
                .ok_or(TransferError::TooManyChunks)?;
        }
        sink.flush().await?;
        Ok(written)
    }

    /// Flushes the last chunks of a file and resets numbering for the next
    /// one. Fails if a gap leaves chunks pending.
    pub async fn finish<W>(&mut self, sink: &mut W) -> Result<u64, TransferError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let written = self.flush(sink).await?;
        if !self.pending.is_empty() {
            let err = TransferError::MissingBlock {
                expected: self.next_block,
                pending: self.pending.len(),
            };
            self.discard();
            return Err(err);
        }
        self.next_block = 1;
        Ok(written)
    }

    /// Drops all pending chunks without writing them and resets numbering.
    pub fn discard(&mut self) {
        self.pending.clear();
        self.next_block = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn split(data: &[u8], chunk_size: usize) -> Vec<DataChunk> {
        data.chunks(chunk_size)
            .enumerate()
            .map(|(i, c)| DataChunk::new(i as u32 + 1, c.to_vec()))
            .collect()
    }

    /// Feeds `chunks` in the given order, flushing whenever the buffer asks
    /// and finishing at the end (the end-of-file trigger).
    async fn reassemble(chunks: Vec<DataChunk>, capacity: usize) -> Vec<u8> {
        let mut buffer = ChunkBuffer::new(capacity);
        let mut sink = Vec::new();
        for chunk in chunks {
            buffer.add(chunk).unwrap();
            if buffer.should_flush() {
                buffer.flush(&mut sink).await.unwrap();
            }
        }
        buffer.finish(&mut sink).await.unwrap();
        sink
    }

    fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.r#gen()).collect()
    }

    #[test]
    fn should_flush_at_capacity() {
        let mut buffer = ChunkBuffer::new(2);
        assert!(!buffer.should_flush());
        buffer.add(DataChunk::new(1, vec![1])).unwrap();
        assert!(!buffer.should_flush());
        buffer.add(DataChunk::new(2, vec![2])).unwrap();
        assert!(buffer.should_flush());
        assert_eq!(buffer.pending_count(), 2);
        assert_eq!(buffer.pending_bytes(), 2);
    }

    #[test]
    fn zero_capacity_behaves_like_one() {
        let mut buffer = ChunkBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.add(DataChunk::new(1, vec![])).unwrap();
        assert!(buffer.should_flush());
    }

    #[tokio::test]
    async fn flush_sorts_by_block() {
        let mut buffer = ChunkBuffer::new(10);
        buffer.add(DataChunk::new(3, b"C".to_vec())).unwrap();
        buffer.add(DataChunk::new(1, b"A".to_vec())).unwrap();
        buffer.add(DataChunk::new(2, b"B".to_vec())).unwrap();

        let mut sink = Vec::new();
        let written = buffer.flush(&mut sink).await.unwrap();
        assert_eq!(written, 3);
        assert_eq!(sink, b"ABC");
        assert!(buffer.is_empty());
        assert_eq!(buffer.next_block(), 4);
    }

    #[tokio::test]
    async fn flush_empty_buffer_writes_nothing() {
        let mut buffer = ChunkBuffer::new(4);
        let mut sink = Vec::new();
        assert_eq!(buffer.flush(&mut sink).await.unwrap(), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn flush_holds_chunks_after_a_gap() {
        let mut buffer = ChunkBuffer::new(2);
        let mut sink = Vec::new();
        buffer.add(DataChunk::new(2, b"B".to_vec())).unwrap();
        buffer.add(DataChunk::new(3, b"C".to_vec())).unwrap();
        assert!(buffer.should_flush());
        assert_eq!(buffer.flush(&mut sink).await.unwrap(), 0);
        assert_eq!(buffer.pending_count(), 2);

        buffer.add(DataChunk::new(1, b"A".to_vec())).unwrap();
        buffer.flush(&mut sink).await.unwrap();
        assert_eq!(sink, b"ABC");
    }

    #[tokio::test]
    async fn late_block_after_write_is_rejected() {
        let mut buffer = ChunkBuffer::new(1);
        let mut sink = Vec::new();
        buffer.add(DataChunk::new(1, b"A".to_vec())).unwrap();
        buffer.flush(&mut sink).await.unwrap();

        let err = buffer.add(DataChunk::new(1, b"A".to_vec())).unwrap_err();
        assert!(matches!(
            err,
            TransferError::LateBlock {
                block: 1,
                expected: 2
            }
        ));
        assert_eq!(sink, b"A");
    }

    #[test]
    fn duplicate_pending_block_is_rejected() {
        let mut buffer = ChunkBuffer::new(8);
        buffer.add(DataChunk::new(1, b"A".to_vec())).unwrap();
        let err = buffer.add(DataChunk::new(1, b"A".to_vec())).unwrap_err();
        assert!(matches!(err, TransferError::DuplicateBlock(1)));
        assert_eq!(buffer.pending_count(), 1);
    }

    #[tokio::test]
    async fn finish_with_gap_is_rejected() {
        let mut buffer = ChunkBuffer::new(8);
        buffer.add(DataChunk::new(1, b"A".to_vec())).unwrap();
        buffer.add(DataChunk::new(3, b"C".to_vec())).unwrap();

        let mut sink = Vec::new();
        let err = buffer.finish(&mut sink).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::MissingBlock {
                expected: 2,
                pending: 1
            }
        ));
        assert_eq!(sink, b"A");
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn finish_restarts_numbering() {
        let mut buffer = ChunkBuffer::new(4);
        let mut first = Vec::new();
        buffer.add(DataChunk::new(1, b"one".to_vec())).unwrap();
        buffer.finish(&mut first).await.unwrap();
        assert_eq!(buffer.next_block(), 1);

        let mut second = Vec::new();
        buffer.add(DataChunk::new(1, b"two".to_vec())).unwrap();
        buffer.finish(&mut second).await.unwrap();
        assert_eq!(first, b"one");
        assert_eq!(second, b"two");
    }

    #[tokio::test]
    async fn discard_drops_pending() {
        let mut buffer = ChunkBuffer::new(4);
        buffer.add(DataChunk::new(1, b"lost".to_vec())).unwrap();
        buffer.discard();
        let mut sink = Vec::new();
        buffer.flush(&mut sink).await.unwrap();
        assert!(sink.is_empty());
        assert_eq!(buffer.next_block(), 1);
    }

    #[tokio::test]
    async fn output_independent_of_capacity() {
        let data = random_bytes(10_000, 7);
        for capacity in [1, 2, 7, 1000] {
            let out = reassemble(split(&data, 333), capacity).await;
            assert_eq!(out, data, "capacity {capacity}");
        }
    }

    #[tokio::test]
    async fn reverse_order_within_one_flush() {
        let data = random_bytes(4096, 11);
        let mut chunks = split(&data, 100);
        chunks.reverse();
        let out = reassemble(chunks, 1000).await;
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn shuffled_order_with_any_capacity() {
        let data = random_bytes(8192, 13);
        let mut rng = rand::rngs::StdRng::seed_from_u64(99);
        for capacity in [1, 2, 7, 1000] {
            let mut chunks = split(&data, 64);
            chunks.shuffle(&mut rng);
            let out = reassemble(chunks, capacity).await;
            assert_eq!(out, data, "capacity {capacity}");
        }
    }

    #[tokio::test]
    async fn reverse_order_with_small_capacity() {
        let data = random_bytes(3000, 19);
        let mut chunks = split(&data, 100);
        chunks.reverse();
        let out = reassemble(chunks, 2).await;
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn interleaved_producers_stay_independent() {
        let a = random_bytes(3000, 21);
        let b = random_bytes(2500, 22);

        let mut chunks_a = split(&a, 97).into_iter();
        let mut chunks_b = split(&b, 89).into_iter();
        let mut buf_a = ChunkBuffer::new(3);
        let mut buf_b = ChunkBuffer::new(5);
        let mut sink_a = Vec::new();
        let mut sink_b = Vec::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);

        loop {
            let pick_a = rng.gen_bool(0.5);
            let (next, buffer, sink) = if pick_a {
                (chunks_a.next(), &mut buf_a, &mut sink_a)
            } else {
                (chunks_b.next(), &mut buf_b, &mut sink_b)
            };
            match next {
                Some(chunk) => {
                    buffer.add(chunk).unwrap();
                    if buffer.should_flush() {
                        buffer.flush(sink).await.unwrap();
                    }
                }
                None if chunks_a.len() == 0 && chunks_b.len() == 0 => break,
                None => {}
            }
        }
        buf_a.finish(&mut sink_a).await.unwrap();
        buf_b.finish(&mut sink_b).await.unwrap();

        assert_eq!(sink_a, a);
        assert_eq!(sink_b, b);
    }

    #[tokio::test]
    async fn capacity_one_flushes_every_chunk() {
        let mut buffer = ChunkBuffer::new(1);
        let mut sink = Vec::new();
        for (i, part) in [b"ab", b"cd", b"ef"].iter().enumerate() {
            buffer.add(DataChunk::new(i as u32 + 1, part.to_vec())).unwrap();
            assert!(buffer.should_flush());
            buffer.flush(&mut sink).await.unwrap();
            assert!(buffer.is_empty());
        }
        assert_eq!(sink, b"abcdef");
    }
}
