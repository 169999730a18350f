//! Shamir secret sharing over GF(256)
//!
//! Every byte of the secret is the constant term of its own random polynomial
//! of degree `threshold - 1`. A share holds the evaluations of all of those
//! polynomials at one x-coordinate, followed by the x-coordinate itself:
//!
//! ```text
//! [ y_0, y_1, ..., y_{n-1} ][ x ]
//! ```
//!
//! x-coordinates are a random permutation of `1..=parts`; `0` is never handed
//! out because the polynomial's value there is the secret.
//!
//! [`combine`] does not know the threshold a share set was produced with. Any
//! two or more distinct shares interpolate to *some* byte string, and fewer than
//! the original threshold silently produce a wrong one. Callers must detect that
//! downstream, which the keyring does through authenticated decryption.

use rand::seq::SliceRandom;

use super::gf256;
use crate::error::ErrorKind;

/// Largest number of shares a single split can produce
pub const MAX_SHARES: usize = 255;
/// Smallest useful threshold
pub const MIN_THRESHOLD: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShamirError {
    #[error("parts ({parts}) cannot be less than threshold ({threshold})")]
    PartsBelowThreshold { parts: usize, threshold: usize },
    #[error("parts cannot exceed {MAX_SHARES}")]
    TooManyParts,
    #[error("threshold must be at least {MIN_THRESHOLD}")]
    ThresholdTooSmall,
    #[error("cannot split an empty secret")]
    EmptySecret,
    #[error("less than two shares cannot be used to reconstruct the secret")]
    TooFewShares,
    #[error("shares must be at least two bytes")]
    ShareTooShort,
    #[error("all shares must be the same length")]
    LengthMismatch,
    #[error("duplicate share detected")]
    DuplicateShare,
    #[error("failed to generate random coefficients: {0}")]
    Randomness(String),
}

impl ShamirError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShamirError::DuplicateShare => ErrorKind::Conflict,
            ShamirError::Randomness(_) => ErrorKind::Storage,
            _ => ErrorKind::Validation,
        }
    }
}

/// A polynomial over GF(256), coefficients in ascending degree
struct Polynomial {
    coefficients: Vec<u8>,
}

impl Polynomial {
    /// Random polynomial of the given degree with a fixed intercept
    fn random(intercept: u8, degree: usize) -> Result<Self, ShamirError> {
        let mut coefficients = vec![0u8; degree + 1];
        coefficients[0] = intercept;
        getrandom::getrandom(&mut coefficients[1..])
            .map_err(|e| ShamirError::Randomness(e.to_string()))?;
        Ok(Self { coefficients })
    }

    /// Horner evaluation at `x`
    fn evaluate(&self, x: u8) -> u8 {
        self.coefficients
            .iter()
            .rev()
            .fold(0u8, |acc, coefficient| {
                gf256::add(gf256::mul(acc, x), *coefficient)
            })
    }
}

impl Drop for Polynomial {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.coefficients);
    }
}

/// Lagrange interpolation of the samples, evaluated at `x`
fn interpolate(x_samples: &[u8], y_samples: &[u8], x: u8) -> u8 {
    let mut result = 0u8;
    for (i, (xi, yi)) in x_samples.iter().zip(y_samples).enumerate() {
        let mut basis = 1u8;
        for (j, xj) in x_samples.iter().enumerate() {
            if i == j {
                continue;
            }
            let num = gf256::add(x, *xj);
            let denom = gf256::add(*xi, *xj);
            basis = gf256::mul(basis, gf256::div(num, denom));
        }
        result = gf256::add(result, gf256::mul(*yi, basis));
    }
    result
}

/// Split `secret` into `parts` shares, any `threshold` of which reconstruct it.
///
/// Each share is `secret.len() + 1` bytes long.
pub fn split(secret: &[u8], parts: usize, threshold: usize) -> Result<Vec<Vec<u8>>, ShamirError> {
    if parts < threshold {
        return Err(ShamirError::PartsBelowThreshold { parts, threshold });
    }
    if parts > MAX_SHARES {
        return Err(ShamirError::TooManyParts);
    }
    if threshold < MIN_THRESHOLD {
        return Err(ShamirError::ThresholdTooSmall);
    }
    if secret.is_empty() {
        return Err(ShamirError::EmptySecret);
    }

    // parts <= 255 was checked above
    let mut x_coordinates: Vec<u8> = (1..=parts as u8).collect();
    x_coordinates.shuffle(&mut rand::rng());

    let mut shares: Vec<Vec<u8>> = x_coordinates
        .iter()
        .map(|x| {
            let mut share = vec![0u8; secret.len() + 1];
            share[secret.len()] = *x;
            share
        })
        .collect();

    for (idx, byte) in secret.iter().enumerate() {
        let polynomial = Polynomial::random(*byte, threshold - 1)?;
        for (share, x) in shares.iter_mut().zip(&x_coordinates) {
            share[idx] = polynomial.evaluate(*x);
        }
    }

    Ok(shares)
}

/// Reconstruct a secret from shares produced by [`split`].
///
/// Shares must share one length and carry pairwise distinct x-coordinates.
pub fn combine<T: AsRef<[u8]>>(shares: &[T]) -> Result<Vec<u8>, ShamirError> {
    if shares.len() < 2 {
        return Err(ShamirError::TooFewShares);
    }

    let share_len = shares[0].as_ref().len();
    if share_len < 2 {
        return Err(ShamirError::ShareTooShort);
    }
    if shares.iter().any(|share| share.as_ref().len() != share_len) {
        return Err(ShamirError::LengthMismatch);
    }

    let mut seen = [false; 256];
    let mut x_samples = Vec::with_capacity(shares.len());
    for share in shares {
        let x = share.as_ref()[share_len - 1];
        if seen[x as usize] {
            return Err(ShamirError::DuplicateShare);
        }
        seen[x as usize] = true;
        x_samples.push(x);
    }

    let mut y_samples = vec![0u8; shares.len()];
    let secret = (0..share_len - 1)
        .map(|idx| {
            for (y, share) in y_samples.iter_mut().zip(shares) {
                *y = share.as_ref()[idx];
            }
            interpolate(&x_samples, &y_samples, 0)
        })
        .collect();

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"correct horse battery staple, 32";

    #[test]
    fn test_split_shape() {
        let shares = split(SECRET, 5, 3).unwrap();
        assert_eq!(shares.len(), 5);

        let mut tags: Vec<u8> = shares
            .iter()
            .map(|share| {
                assert_eq!(share.len(), SECRET.len() + 1);
                share[SECRET.len()]
            })
            .collect();
        tags.sort_unstable();
        assert_eq!(tags, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_combine_every_threshold_subset() {
        let shares = split(SECRET, 5, 3).unwrap();
        for a in 0..5 {
            for b in (a + 1)..5 {
                for c in (b + 1)..5 {
                    let subset = [&shares[a], &shares[b], &shares[c]];
                    assert_eq!(combine(&subset).unwrap(), SECRET);
                }
            }
        }
    }

    #[test]
    fn test_combine_with_all_shares() {
        let shares = split(SECRET, 7, 4).unwrap();
        assert_eq!(combine(&shares).unwrap(), SECRET);
    }

    #[test]
    fn test_threshold_equal_to_parts() {
        let shares = split(&[0xab], 2, 2).unwrap();
        assert_eq!(combine(&shares).unwrap(), vec![0xab]);
    }

    #[test]
    fn test_maximum_parts() {
        let shares = split(SECRET, 255, 2).unwrap();
        assert_eq!(combine(&shares[100..102]).unwrap(), SECRET);
    }

    #[test]
    fn test_below_threshold_reconstructs_wrong_secret() {
        let shares = split(SECRET, 5, 3).unwrap();
        // two shares interpolate a line through the wrong polynomial
        let wrong = combine(&shares[..2]).unwrap();
        assert_eq!(wrong.len(), SECRET.len());
        assert_ne!(wrong, SECRET);
    }

    #[test]
    fn test_split_rejects_bad_parameters() {
        assert_eq!(
            split(SECRET, 2, 3),
            Err(ShamirError::PartsBelowThreshold {
                parts: 2,
                threshold: 3
            })
        );
        assert_eq!(split(SECRET, 256, 3), Err(ShamirError::TooManyParts));
        assert_eq!(split(SECRET, 5, 1), Err(ShamirError::ThresholdTooSmall));
        assert_eq!(split(&[], 5, 3), Err(ShamirError::EmptySecret));
    }

    #[test]
    fn test_combine_rejects_duplicate_tags() {
        let shares = split(SECRET, 3, 2).unwrap();
        let mut forged = shares[1].clone();
        let last = forged.len() - 1;
        forged[last] = shares[0][last];
        assert_eq!(
            combine(&[shares[0].clone(), forged]),
            Err(ShamirError::DuplicateShare)
        );
        assert_eq!(
            combine(&[shares[0].clone(), shares[0].clone()]),
            Err(ShamirError::DuplicateShare)
        );
    }

    #[test]
    fn test_combine_rejects_malformed_input() {
        let shares = split(SECRET, 3, 2).unwrap();
        assert_eq!(combine(&shares[..1]), Err(ShamirError::TooFewShares));
        assert_eq!(
            combine(&[vec![1u8], vec![2u8]]),
            Err(ShamirError::ShareTooShort)
        );
        let truncated = shares[1][1..].to_vec();
        assert_eq!(
            combine(&[shares[0].clone(), truncated]),
            Err(ShamirError::LengthMismatch)
        );
    }

    #[test]
    fn test_polynomial_evaluation() {
        // 3 + 2x + x^2 at x = 2 in GF(256): 3 ^ mul(2,2) ^ mul(1,4) = 3 ^ 4 ^ 4
        let polynomial = Polynomial {
            coefficients: vec![3, 2, 1],
        };
        assert_eq!(polynomial.evaluate(0), 3);
        assert_eq!(polynomial.evaluate(2), 3);
        assert_eq!(polynomial.evaluate(1), 3 ^ 2 ^ 1);
    }
}
