//! Work payloads handed to task units after their wait.

use rand::Rng;

use crate::error::PayloadError;

pub trait PayloadSource {
    fn payload(&mut self) -> Result<Vec<u32>, PayloadError>;
}

/// `len` independent values drawn from `0..=max`.
pub struct RandomPayload {
    len: usize,
    max: u32,
}

impl RandomPayload {
    pub fn new(len: usize, max: u32) -> Self {
        Self { len, max }
    }
}

impl PayloadSource for RandomPayload {
    fn payload(&mut self) -> Result<Vec<u32>, PayloadError> {
        if self.len == 0 {
            return Err(PayloadError::Empty);
        }
        let mut rng = rand::thread_rng();
        Ok((0..self.len).map(|_| rng.gen_range(0..=self.max)).collect())
    }
}

/// Replays a fixed list of payloads, wrapping around at the end.
#[cfg(test)]
pub struct FixedPayload {
    payloads: Vec<Vec<u32>>,
    next: usize,
}

#[cfg(test)]
impl FixedPayload {
    pub fn new(payloads: Vec<Vec<u32>>) -> Self {
        Self { payloads, next: 0 }
    }
}

#[cfg(test)]
impl PayloadSource for FixedPayload {
    fn payload(&mut self) -> Result<Vec<u32>, PayloadError> {
        if self.payloads.is_empty() {
            return Err(PayloadError::Empty);
        }
        let payload = self.payloads[self.next % self.payloads.len()].clone();
        self.next += 1;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_payload_respects_length_and_range() {
        let mut source = RandomPayload::new(2, 50);
        for _ in 0..200 {
            let payload = source.payload().expect("payload");
            assert_eq!(payload.len(), 2);
            assert!(payload.iter().all(|v| *v <= 50));
        }
    }

    #[test]
    fn zero_length_is_an_error() {
        let mut source = RandomPayload::new(0, 50);
        assert_eq!(source.payload(), Err(PayloadError::Empty));
    }

    #[test]
    fn fixed_payload_wraps() {
        let mut source = FixedPayload::new(vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(source.payload(), Ok(vec![1, 2]));
        assert_eq!(source.payload(), Ok(vec![3, 4]));
        assert_eq!(source.payload(), Ok(vec![1, 2]));
    }
}
