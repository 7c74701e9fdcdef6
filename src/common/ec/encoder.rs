use super::galois::G;

// Error correction codeword generator
//------------------------------------------------------------------------------

/// Generator polynomial (x - α^0)(x - α^1)...(x - α^(ec_len-1)), highest degree first.
pub(crate) fn generator_poly(ec_len: usize) -> Vec<G> {
    let mut gen = vec![G::ONE];
    for i in 0..ec_len {
        let root = G::gen_pow(i as i32);
        let mut next = vec![G::ZERO; gen.len() + 1];
        for (j, &c) in gen.iter().enumerate() {
            next[j] += c;
            next[j + 1] += c * root;
        }
        gen = next;
    }
    gen
}

/// Computes `ec_len` Reed-Solomon codewords for `data` by polynomial long division.
pub fn ecc(data: &[u8], ec_len: usize) -> Vec<u8> {
    let gen = generator_poly(ec_len);
    let mut rem = data.iter().map(|&b| G(b)).collect::<Vec<_>>();
    rem.resize(data.len() + ec_len, G::ZERO);

    for i in 0..data.len() {
        let coef = rem[i];
        if coef == G::ZERO {
            continue;
        }
        for (j, &g) in gen.iter().enumerate().skip(1) {
            rem[i + j] += g * coef;
        }
    }

    rem[data.len()..].iter().map(|&g| g.into()).collect()
}

#[cfg(test)]
mod ec_encoder_tests {
    use test_case::test_case;

    use super::{ecc, generator_poly};
    use crate::common::ec::galois::G;

    #[test]
    fn test_generator_poly() {
        // (x - 1)(x - 2) = x^2 + 3x + 2
        assert_eq!(generator_poly(2), vec![G(1), G(3), G(2)]);
        assert_eq!(generator_poly(7)[1..], [G(127), G(122), G(154), G(164), G(11), G(68), G(117)]);
    }

    #[test_case(
        b" [\x0bx\xd1r\xdcMC@\xec\x11\xec\x11\xec\x11",
        10,
        b"\xc4#'w\xeb\xd7\xe7\xe2]\x17"
    )]
    #[test_case(b" [\x0bx\xd1r\xdcMC@\xec\x11\xec", 13, b"\xa8H\x16R\xd96\x9c\x00.\x0f\xb4z\x10")]
    #[test_case(
        b"CUF\x86W&U\xc2w2\x06\x12\x06g&",
        18,
        b"\xd5\xc7\x0b-s\xf7\xf1\xdf\xe5\xf8\x9au\x9aoV\xa1o'"
    )]
    #[test_case(
        b"\xf6\xf6B\x07v\x86\xf2\x07&V\x16\xc6\xc7\x92\x06",
        18,
        b"W\xcc`<\xca\xb6|\x9d\xc8\x86\x1b\x81\xd1\x11\xa3\xa3x\x85"
    )]
    fn test_ecc(data: &[u8], ec_len: usize, exp_ecc: &[u8]) {
        let ecc = ecc(data, ec_len);
        assert_eq!(ecc, exp_ecc, "Ecc mismatch: Computed {ecc:?}, Expected {exp_ecc:?}");
    }
}
