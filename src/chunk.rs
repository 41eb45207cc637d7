/// Splits `items` into consecutive chunks of at most `chunk_size` elements.
///
/// Order is preserved inside and across chunks. A `chunk_size` of zero is
/// treated as one.
pub fn split_to_chunks<T: Clone>(items: &[T], chunk_size: usize) -> Vec<Vec<T>> {
    items
        .chunks(chunk_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}
