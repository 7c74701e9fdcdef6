mod decoder;
mod encoder;
mod galois;

pub use decoder::rectify;
pub use encoder::ecc;
