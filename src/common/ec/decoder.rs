use tracing::trace;

use super::galois::{eval_poly, G};
use crate::common::error::{QRError, QRResult};

// Rectifier
//------------------------------------------------------------------------------

/// Corrects a received block in place. The last `ec_len` bytes are the error
/// correction codewords. Returns the number of corrected symbols.
///
/// Polynomials below are stored lowest degree first, whereas the block itself holds the
/// highest degree coefficient at index 0.
pub fn rectify(block: &mut [u8], ec_len: usize) -> QRResult<usize> {
    debug_assert!(ec_len < block.len(), "Block {} too short for {ec_len} ecc", block.len());

    let synd = match syndromes(block, ec_len) {
        None => return Ok(0),
        Some(s) => s,
    };

    let sig = berlekamp_massey(&synd);
    let err_count = sig.len() - 1;
    if err_count * 2 > ec_len {
        return Err(QRError::TooManyErrors);
    }

    let err_loc = chien_search(&sig, block.len());
    if err_loc.len() != err_count {
        return Err(QRError::TooManyErrors);
    }

    let omg = omega(&synd, &sig);
    let dsig = derivative(&sig);
    let n = block.len();
    for &k in err_loc.iter() {
        let x = G::gen_pow((n - 1 - k) as i32);
        let xinv = x.inv();
        let denom = eval_poly(&dsig, xinv);
        if denom == G::ZERO {
            return Err(QRError::TooManyErrors);
        }
        let mag = x * eval_poly(&omg, xinv) / denom;
        block[k] ^= mag.0;
    }

    match syndromes(block, ec_len) {
        None => {
            trace!(corrected = err_count, "Rectified block");
            Ok(err_count)
        }
        Some(_) => Err(QRError::TooManyErrors),
    }
}

// Returns None when every syndrome is zero
fn syndromes(block: &[u8], ec_len: usize) -> Option<Vec<G>> {
    let synd = (0..ec_len)
        .map(|j| {
            let x = G::gen_pow(j as i32);
            block.iter().fold(G::ZERO, |acc, &b| acc * x + G(b))
        })
        .collect::<Vec<_>>();

    if synd.iter().all(|&s| s == G::ZERO) {
        None
    } else {
        Some(synd)
    }
}

// Error locator polynomial, sigma
fn berlekamp_massey(synd: &[G]) -> Vec<G> {
    let mut c = vec![G::ONE];
    let mut b = vec![G::ONE];
    let mut l = 0usize;
    let mut m = 1usize;
    let mut last_d = G::ONE;

    for n in 0..synd.len() {
        let mut d = synd[n];
        for i in 1..=l.min(c.len() - 1) {
            d += c[i] * synd[n - i];
        }

        if d == G::ZERO {
            m += 1;
            continue;
        }

        let scale = d / last_d;
        let prev = c.clone();
        if c.len() < b.len() + m {
            c.resize(b.len() + m, G::ZERO);
        }
        for (i, &bi) in b.iter().enumerate() {
            c[i + m] += scale * bi;
        }

        if 2 * l <= n {
            l = n + 1 - l;
            b = prev;
            last_d = d;
            m = 1;
        } else {
            m += 1;
        }
    }

    c.truncate(l + 1);
    c
}

// Indices into the block whose locator root vanishes
fn chien_search(sig: &[G], n: usize) -> Vec<usize> {
    (0..n).filter(|&k| eval_poly(sig, G::gen_pow(-((n - 1 - k) as i32))) == G::ZERO).collect()
}

// Error evaluator, S(x) * sigma(x) mod x^ec_len
fn omega(synd: &[G], sig: &[G]) -> Vec<G> {
    let mut omg = vec![G::ZERO; synd.len()];
    for (i, &s) in synd.iter().enumerate() {
        for (j, &c) in sig.iter().enumerate() {
            if i + j < synd.len() {
                omg[i + j] += s * c;
            }
        }
    }
    omg
}

// Formal derivative; even powers vanish in characteristic 2
fn derivative(poly: &[G]) -> Vec<G> {
    poly.iter().enumerate().skip(1).map(|(i, &c)| if i & 1 == 1 { c } else { G::ZERO }).collect()
}
