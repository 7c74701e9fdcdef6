use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

// Galois field element
//------------------------------------------------------------------------------

/// Element of GF(256) built over the primitive polynomial x^8 + x^4 + x^3 + x^2 + 1.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub struct G(pub u8);

impl G {
    pub const ZERO: G = G(0);
    pub const ONE: G = G(1);

    /// Generator raised to `pow`, i.e. α^pow. Negative and large exponents wrap mod 255.
    pub fn gen_pow(pow: i32) -> Self {
        G(EXP_TABLE[pow.rem_euclid(255) as usize])
    }

    pub fn log(self) -> usize {
        debug_assert!(self.0 != 0, "Log of zero is undefined");
        LOG_TABLE[self.0 as usize] as usize
    }

    pub fn inv(self) -> Self {
        debug_assert!(self.0 != 0, "Zero has no inverse");
        G(EXP_TABLE[255 - self.log()])
    }
}

impl From<G> for u8 {
    fn from(g: G) -> Self {
        g.0
    }
}

impl Add for G {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        G(self.0 ^ rhs.0)
    }
}

impl AddAssign for G {
    fn add_assign(&mut self, rhs: Self) {
        self.0 ^= rhs.0;
    }
}

impl Sub for G {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        G(self.0 ^ rhs.0)
    }
}

impl Mul for G {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        if self.0 == 0 || rhs.0 == 0 {
            return G(0);
        }
        G(EXP_TABLE[(self.log() + rhs.log()) % 255])
    }
}

impl MulAssign for G {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Div for G {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        debug_assert!(rhs.0 != 0, "Division by zero");
        if self.0 == 0 {
            return G(0);
        }
        G(EXP_TABLE[(self.log() + 255 - rhs.log()) % 255])
    }
}

/// Evaluates a polynomial given lowest degree coefficient first.
pub fn eval_poly(poly: &[G], x: G) -> G {
    poly.iter().rev().fold(G(0), |acc, &c| acc * x + c)
}


// Global constants
//------------------------------------------------------------------------------

const PRIMITIVE: u16 = 0x11d;

const fn build_exp_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 256 {
        table[i] = x as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE;
        }
        i += 1;
    }
    table
}

const fn build_log_table(exp: &[u8; 256]) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 255 {
        table[exp[i] as usize] = i as u8;
        i += 1;
    }
    table
}

const EXP: [u8; 256] = build_exp_table();

pub static EXP_TABLE: [u8; 256] = EXP;

pub static LOG_TABLE: [u8; 256] = build_log_table(&EXP);
