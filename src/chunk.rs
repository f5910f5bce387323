//! Splitting payloads that exceed a single frame.

/// Splits `payload` into in-order chunks of at most `max` bytes, the last one
/// flagged as final.
///
/// An empty payload yields exactly one empty final chunk, so operations that
/// must send at least one frame still terminate. The iterator borrows the
/// payload and can be recomputed from the same inputs; actually transmitting
/// the chunks is not idempotent.
pub fn chunks(payload: &[u8], max: usize) -> Chunks<'_> {
    assert!(max > 0, "chunk size must be positive");
    Chunks {
        rest: Some(payload),
        max,
    }
}

pub struct Chunks<'a> {
    rest: Option<&'a [u8]>,
    max: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = (&'a [u8], bool);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest.take()?;
        if rest.len() <= self.max {
            Some((rest, true))
        } else {
            let (head, tail) = rest.split_at(self.max);
            self.rest = Some(tail);
            Some((head, false))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(payload: &[u8], max: usize) -> Vec<(Vec<u8>, bool)> {
        chunks(payload, max)
            .map(|(chunk, last)| (chunk.to_vec(), last))
            .collect()
    }

    #[test]
    fn concatenation_restores_the_payload() {
        for len in [0usize, 1, 7, 8, 9, 229, 230, 231, 460, 461, 1000] {
            let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let parts = collect(&payload, 230);
            let expected_count = if len == 0 { 1 } else { len.div_ceil(230) };
            assert_eq!(parts.len(), expected_count, "len {}", len);

            let rebuilt: Vec<u8> = parts.iter().flat_map(|(c, _)| c.clone()).collect();
            assert_eq!(rebuilt, payload);

            let finals: Vec<bool> = parts.iter().map(|(_, last)| *last).collect();
            assert_eq!(finals.iter().filter(|l| **l).count(), 1);
            assert_eq!(finals.last(), Some(&true));
        }
    }

    #[test]
    fn empty_payload_yields_one_empty_final_chunk() {
        assert_eq!(collect(&[], 230), vec![(vec![], true)]);
    }

    #[test]
    fn exact_multiple_has_a_full_final_chunk() {
        let payload = vec![0xAB; 8];
        let parts = collect(&payload, 4);
        assert_eq!(
            parts,
            vec![(vec![0xAB; 4], false), (vec![0xAB; 4], true)]
        );
    }

    #[test]
    fn restartable_from_the_same_inputs() {
        let payload = vec![1, 2, 3, 4, 5];
        let first: Vec<_> = collect(&payload, 2);
        let second: Vec<_> = collect(&payload, 2);
        assert_eq!(first, second);
    }
}
