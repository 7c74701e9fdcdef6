use std::time::{Duration, Instant};

use qrcodec::{decode, DecodeHints, ECLevel, QRBuilder};

const ITERATIONS: u32 = 20;

fn time<T>(mut f: impl FnMut() -> T) -> Duration {
    let start = Instant::now();
    for _ in 0..ITERATIONS {
        std::hint::black_box(f());
    }
    start.elapsed() / ITERATIONS
}

fn print_row(label: &str, encode: Duration, decode: Duration) {
    println!("| {label:<24}| {:>12.2?} | {:>12.2?} |", encode, decode);
}

fn main() {
    println!("Running qrcodec benchmarks ({ITERATIONS} iterations each)");
    let divider = "-".repeat(58);
    println!("{divider}");
    println!("| {:<24}| {:>12} | {:>12} |", "Payload", "Encode", "Decode");
    println!("{divider}");

    let payloads = [
        ("numeric 40", "1234567890".repeat(4), ECLevel::M),
        ("alphanumeric 200", "HELLO WORLD 0123456789 ".repeat(9), ECLevel::Q),
        ("byte 500", "The quick brown fox jumps over the lazy dog. ".repeat(11), ECLevel::L),
        ("byte 1200 at H", "Error correction heavy payload. ".repeat(37), ECLevel::H),
    ];

    for (label, data, ecl) in payloads.iter() {
        let encode_time = time(|| QRBuilder::new(data).ec_level(*ecl).build());

        let img = match QRBuilder::new(data).ec_level(*ecl).build() {
            Ok(qr) => qr.to_image(3),
            Err(e) => {
                eprintln!("Failed to encode {label}: {e}");
                continue;
            }
        };
        let hints = DecodeHints::default();
        let decode_time = time(|| decode(&img, &hints));
        print_row(label, encode_time, decode_time);
    }
    println!("{divider}");
}
