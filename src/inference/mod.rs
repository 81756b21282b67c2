use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::DynamicImage;
use image::imageops::FilterType;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::{INPUT_SIDE, ModelHolder};

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predicted_class: usize,
}

/// The per-request pipeline: extract -> decode -> normalize -> predict ->
/// argmax. Each stage returns its own error kind; the handler boundary turns
/// them into the JSON envelope. No state survives a call.
pub fn run(model: &ModelHolder, body: &[u8]) -> Result<usize, ApiError> {
    let encoded = extract(body)?;
    let image = decode(&encoded)?;
    let tensor = normalize(&image);
    let output = model.predict(&tensor)?;
    Ok(argmax(&output))
}

/// Reads the `image` field out of the JSON request body.
pub fn extract(body: &[u8]) -> Result<String, ApiError> {
    let request: PredictRequest =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedRequest(e.to_string()))?;
    Ok(request.image)
}

/// Base64-decodes the payload and parses the bytes as a raster image.
pub fn decode(encoded: &str) -> Result<DynamicImage, ApiError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| ApiError::Decode(format!("invalid base64: {}", e)))?;
    image::load_from_memory(&bytes)
        .map_err(|e| ApiError::Decode(format!("unreadable image: {}", e)))
}

/// Grayscale, resample to exactly 28x28, scale to [0,1], and shape as a
/// single-example batch. Deterministic for identical input bytes.
pub fn normalize(image: &DynamicImage) -> Array3<f32> {
    let gray = image.to_luma8();
    let resized = image::imageops::resize(
        &gray,
        INPUT_SIDE as u32,
        INPUT_SIDE as u32,
        FilterType::Triangle,
    );
    Array3::from_shape_fn((1, INPUT_SIDE, INPUT_SIDE), |(_, y, x)| {
        f32::from(resized.get_pixel(x as u32, y as u32)[0]) / 255.0
    })
}

/// Index of the maximum value; exact ties go to the lowest index.
pub fn argmax(output: &[f32]) -> usize {
    let mut best = 0;
    for (index, &value) in output.iter().enumerate() {
        if value > output[best] {
            best = index;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NUM_CLASSES;
    use crate::model::network::DenseNetwork;
    use image::{GenericImageView, GrayImage, ImageFormat, Luma, RgbImage};
    use std::io::Cursor;

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        let image = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(image)
    }

    #[test]
    fn argmax_picks_the_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[5.0]), 0);
    }

    #[test]
    fn argmax_breaks_ties_towards_the_lowest_index() {
        assert_eq!(argmax(&[0.5, 0.5, 0.1]), 0);
        assert_eq!(argmax(&[0.0, 0.3, 0.3, 0.3]), 1);
    }

    #[test]
    fn normalize_always_yields_a_28x28_batch_in_unit_range() {
        for (width, height) in [(28, 28), (640, 480), (3, 300), (100, 1)] {
            let tensor = normalize(&gradient_image(width, height));
            assert_eq!(tensor.shape(), &[1, INPUT_SIDE, INPUT_SIDE]);
            assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn normalize_is_deterministic() {
        let image = gradient_image(64, 40);
        assert_eq!(normalize(&image), normalize(&image));
    }

    #[test]
    fn extract_rejects_a_missing_image_field() {
        let err = extract(b"{}").unwrap_err();
        assert!(matches!(err, ApiError::MalformedRequest(_)));
    }

    #[test]
    fn extract_rejects_an_unparseable_body() {
        let err = extract(b"not json at all").unwrap_err();
        assert!(matches!(err, ApiError::MalformedRequest(_)));
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        let err = decode("@@not-base64@@").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn decode_rejects_bytes_that_are_not_an_image() {
        let encoded = BASE64.encode(b"definitely not a PNG");
        let err = decode(&encoded).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn decode_roundtrips_a_png() {
        let gray = GrayImage::from_pixel(10, 7, Luma([200u8]));
        let encoded = BASE64.encode(png_bytes(DynamicImage::ImageLuma8(gray)));
        let image = decode(&encoded).unwrap();
        assert_eq!(image.dimensions(), (10, 7));
    }

    #[test]
    fn run_reports_the_argmax_of_the_model_output() {
        let mut biases = vec![0.0; NUM_CLASSES];
        biases[7] = 4.0;
        let holder = crate::model::ModelHolder::from_network(DenseNetwork::with_output_biases(
            INPUT_SIDE * INPUT_SIDE,
            biases,
        ));

        let encoded = BASE64.encode(png_bytes(gradient_image(90, 120)));
        let body = serde_json::json!({ "image": encoded }).to_string();
        let predicted = run(&holder, body.as_bytes()).unwrap();
        assert_eq!(predicted, 7);
    }
}
