//! Single-frame DICOM decoding
//!
//! Only the first frame of a multi-frame object is kept.

use dicom::dictionary_std::tags;
use dicom::object::from_reader;
use dicom::pixeldata::PixelDecoder;

use super::{Components, ImageBuffer};
use crate::error::{Result, ViewerError};

/// Length of the DICOM file preamble preceding the magic code
const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8] = b"DICM";

/// Locate the `DICM` magic, with or without the 128-byte preamble
fn file_body(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.len() >= PREAMBLE_LEN + MAGIC.len()
        && &bytes[PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()] == MAGIC
    {
        Some(&bytes[PREAMBLE_LEN..])
    } else if bytes.starts_with(MAGIC) {
        Some(bytes)
    } else {
        None
    }
}

pub fn decode_dicom(bytes: &[u8]) -> Result<ImageBuffer> {
    let body = file_body(bytes)
        .ok_or_else(|| ViewerError::Decode("missing DICM magic code".into()))?;
    let obj = from_reader(body).map_err(|e| ViewerError::Decode(e.to_string()))?;

    let samples_per_pixel = obj
        .element(tags::SAMPLES_PER_PIXEL)
        .ok()
        .and_then(|e| e.to_int::<u16>().ok())
        .unwrap_or(1);
    // Reject before paying for the pixel decode
    Components::from_count(samples_per_pixel)?;

    let pixels = obj
        .decode_pixel_data()
        .map_err(|e| ViewerError::Decode(format!("pixel data: {}", e)))?;
    if pixels.number_of_frames() > 1 {
        log::debug!(
            "DICOM object has {} frames, using the first",
            pixels.number_of_frames()
        );
    }

    // Modality rescale (slope/intercept) is applied by the conversion
    let samples = pixels
        .to_vec_frame::<f32>(0)
        .map_err(|e| ViewerError::Decode(format!("pixel conversion: {}", e)))?;

    ImageBuffer::new(pixels.columns(), pixels.rows(), samples_per_pixel, samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, ImageFormat, ValueRange};
    use dicom::core::{DataElement, PrimitiveValue, VR};
    use dicom::dictionary_std::uids;
    use dicom::object::{FileMetaTableBuilder, InMemDicomObject};

    /// 2x2 MONOCHROME2 16-bit file, preamble included
    fn dicom_file(samples_per_pixel: u16, pixels: &[u16]) -> Vec<u8> {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from(uids::SECONDARY_CAPTURE_IMAGE_STORAGE),
        ));
        obj.put(DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from("2.25.1")));
        obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(2_u16)));
        obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(2_u16)));
        obj.put(DataElement::new(
            tags::SAMPLES_PER_PIXEL,
            VR::US,
            PrimitiveValue::from(samples_per_pixel),
        ));
        obj.put(DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from("MONOCHROME2"),
        ));
        obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)));
        obj.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(16_u16)));
        obj.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15_u16)));
        obj.put(DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0_u16)));
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::U16(pixels.iter().copied().collect()),
        ));

        let file = obj
            .with_meta(FileMetaTableBuilder::new().transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN))
            .unwrap();
        let mut out = Vec::new();
        file.write_all(&mut out).unwrap();
        out
    }

    #[test]
    fn test_decodes_grayscale_frame() {
        let bytes = dicom_file(1, &[10, 105, 105, 200]);
        let image = decode(&bytes, ImageFormat::Volumetric).unwrap();
        assert_eq!((image.width(), image.height()), (2, 2));
        assert_eq!(image.components(), Components::Gray);
        assert_eq!(image.value_range(), Some(ValueRange { min: 10.0, max: 200.0 }));
        assert_eq!(image.samples(), &[10.0, 105.0, 105.0, 200.0]);
    }

    #[test]
    fn test_decodes_without_preamble() {
        let bytes = dicom_file(1, &[10, 105, 105, 200]);
        let image = decode_dicom(&bytes[PREAMBLE_LEN..]).unwrap();
        assert_eq!(image.value_range(), Some(ValueRange { min: 10.0, max: 200.0 }));
    }

    #[test]
    fn test_unsupported_samples_per_pixel() {
        let bytes = dicom_file(4, &[0; 16]);
        let err = decode(&bytes, ImageFormat::Volumetric).unwrap_err();
        assert_eq!(err, ViewerError::UnsupportedFormat { components: 4 });
        let err = decode_dicom(&bytes[PREAMBLE_LEN..]).unwrap_err();
        assert_eq!(err, ViewerError::UnsupportedFormat { components: 4 });
    }

    #[test]
    fn test_file_body_with_preamble() {
        let mut bytes = vec![0u8; PREAMBLE_LEN];
        bytes.extend_from_slice(b"DICMrest");
        assert_eq!(file_body(&bytes), Some(&b"DICMrest"[..]));
    }

    #[test]
    fn test_file_body_without_preamble() {
        assert_eq!(file_body(b"DICMrest"), Some(&b"DICMrest"[..]));
        assert_eq!(file_body(b"PNG...."), None);
    }

    #[test]
    fn test_missing_magic_is_decode_error() {
        let err = decode_dicom(&[0u8; 64]).unwrap_err();
        assert!(matches!(err, ViewerError::Decode(_)));
    }

    #[test]
    fn test_garbage_after_magic_is_decode_error() {
        let mut bytes = vec![0u8; PREAMBLE_LEN];
        bytes.extend_from_slice(b"DICM");
        bytes.extend_from_slice(&[0xFF; 32]);
        let err = decode_dicom(&bytes).unwrap_err();
        assert!(matches!(err, ViewerError::Decode(_)));
    }
}
