mod charset;
mod decoder;
mod encoder;
mod types;

pub use charset::*;
pub use decoder::*;
pub use encoder::*;
pub use types::*;

// Codec proptesting
//------------------------------------------------------------------------------

#[cfg(test)]
mod codec_proptests {
    use proptest::prelude::*;

    use super::{decode, encode, EncodeOptions};
    use crate::common::metadata::ECLevel;

    pub fn ec_level_strategy() -> BoxedStrategy<ECLevel> {
        prop_oneof![Just(ECLevel::L), Just(ECLevel::M), Just(ECLevel::Q), Just(ECLevel::H)].boxed()
    }

    proptest! {
        #[test]
        fn proptest_codec_ascii(data in "[ -~]{1,300}", ecl in ec_level_strategy()) {
            let encoded = encode(&data, ecl, &EncodeOptions::default()).unwrap();
            let decoded = decode(encoded.data.data(), encoded.version, ecl, None).unwrap();
            prop_assert_eq!(data, decoded.text);
        }

        #[test]
        fn proptest_codec_numeric(data in "[0-9]{1,500}", ecl in ec_level_strategy()) {
            let encoded = encode(&data, ecl, &EncodeOptions::default()).unwrap();
            let decoded = decode(encoded.data.data(), encoded.version, ecl, None).unwrap();
            prop_assert_eq!(data, decoded.text);
        }

        #[test]
        fn proptest_codec_unicode(data in "[α-ωА-я가-힣]{1,80}", ecl in ec_level_strategy()) {
            // Outside ISO-8859-1 so the segment carries a UTF-8 designator
            let encoded = encode(&data, ecl, &EncodeOptions::default()).unwrap();
            let decoded = decode(encoded.data.data(), encoded.version, ecl, None).unwrap();
            prop_assert_eq!(data, decoded.text);
        }
    }
}
