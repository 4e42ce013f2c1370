use std::{io::Cursor, sync::Arc, time::Duration};

use epaint::ColorImage;
use image::AnimationDecoder as _;

use crate::{
    animation::{AnimatedImage, EmojiImage},
    error::{EmojiError, Result},
    host::ImageDecoder,
    rendering::FidelityPolicy,
};

/// Decodes GIF animations and still images with the [`image`] crate.
///
/// A GIF that fails to decode as an animation is retried as a still image.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCrateDecoder;

/// Load a still image with the [`image`] crate.
///
/// # Errors
/// On invalid image or unsupported image format.
pub fn load_image_bytes(image_bytes: &[u8]) -> Result<ColorImage> {
    let image =
        image::load_from_memory(image_bytes).map_err(|err| EmojiError::Decode(err.to_string()))?;
    let size = [image.width() as _, image.height() as _];
    let image_buffer = image.to_rgba8();
    let pixels = image_buffer.as_flat_samples();
    Ok(ColorImage::from_rgba_unmultiplied(size, pixels.as_slice()))
}

fn is_gif(bytes: &[u8]) -> bool {
    bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")
}

fn decode_gif(bytes: &[u8], policy: FidelityPolicy) -> Result<AnimatedImage> {
    let decode_error = |err: image::ImageError| EmojiError::Decode(err.to_string());
    let decoder = image::codecs::gif::GifDecoder::new(Cursor::new(bytes)).map_err(decode_error)?;

    let mut frames = vec![];
    for frame in decoder.into_frames() {
        let frame = frame.map_err(decode_error)?;
        let delay: Duration = frame.delay().into();
        let img = frame.buffer();
        let pixels = img.as_flat_samples();
        frames.push((
            Arc::new(ColorImage::from_rgba_unmultiplied(
                [img.width() as usize, img.height() as usize],
                pixels.as_slice(),
            )),
            delay,
        ));
    }
    AnimatedImage::new(frames, policy)
}

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8], policy: FidelityPolicy) -> Result<EmojiImage> {
        if is_gif(bytes) {
            match decode_gif(bytes, policy) {
                Ok(animation) if animation.len() == 1 => {
                    return Ok(EmojiImage::Static(animation.get_image(0)));
                }
                Ok(animation) => return Ok(EmojiImage::Animated(Arc::new(animation))),
                Err(err) => log::debug!("{err}; trying as a still image"),
            }
        }
        load_image_bytes(bytes).map(|image| EmojiImage::Static(Arc::new(image)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{codecs::gif::GifEncoder, Delay, Frame, ImageFormat, Rgba, RgbaImage};

    fn gif(frame_count: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            let frames = (0..frame_count).map(|i| {
                let buffer = RgbaImage::from_pixel(2, 2, Rgba([i * 40, 0, 0, 255]));
                Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(50, 1))
            });
            encoder.encode_frames(frames).unwrap();
        }
        bytes
    }

    fn png() -> Vec<u8> {
        let mut bytes = Vec::new();
        let image = RgbaImage::from_pixel(3, 2, Rgba([0, 200, 0, 255]));
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_animated_gif() {
        let image = ImageCrateDecoder
            .decode(&gif(4), FidelityPolicy::NO_FRAME_SKIPPING)
            .unwrap();
        let EmojiImage::Animated(animation) = image else {
            panic!("expected an animation");
        };
        assert_eq!(animation.len(), 4);
        assert_eq!(animation.total_duration(), Duration::from_millis(200));
    }

    #[test]
    fn frame_skipping_follows_the_policy() {
        let image = ImageCrateDecoder
            .decode(&gif(4), FidelityPolicy::MANY_ANIMATIONS)
            .unwrap();
        let EmojiImage::Animated(animation) = image else {
            panic!("expected an animation");
        };
        assert_eq!(animation.len(), 2);
        assert_eq!(animation.total_duration(), Duration::from_millis(200));
    }

    #[test]
    fn single_frame_gif_is_static() {
        let image = ImageCrateDecoder
            .decode(&gif(1), FidelityPolicy::DEFAULT)
            .unwrap();
        assert!(matches!(image, EmojiImage::Static(_)));
    }

    #[test]
    fn decodes_still_png() {
        let image = ImageCrateDecoder
            .decode(&png(), FidelityPolicy::DEFAULT)
            .unwrap();
        let EmojiImage::Static(image) = image else {
            panic!("expected a still image");
        };
        assert_eq!(image.size, [3, 2]);
    }

    #[test]
    fn corrupt_animation_asset_falls_back_to_the_still_one() {
        use crate::{
            loaders::{FileAssetStore, Loaders},
            EmojiRendering, EmojiSource, HandleState, RenderCache,
        };

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("party.gif"), b"GIF89a corrupt").unwrap();
        std::fs::write(dir.path().join("party.png"), png()).unwrap();

        let loaders = Loaders::default()
            .with_assets(FileAssetStore::new(dir.path()))
            .with_decoder(ImageCrateDecoder);
        let cache = RenderCache::new(loaders, 16);
        let party = cache
            .get_or_create(&EmojiSource::ImageAsset("party".to_owned()), EmojiRendering::HIGH)
            .unwrap();
        cache.poll();

        assert_eq!(party.state(), HandleState::Ready);
        assert_eq!(party.current_frame().unwrap().size, [3, 2]);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(ImageCrateDecoder
            .decode(b"GIF89a but not really", FidelityPolicy::DEFAULT)
            .is_err());
        assert!(ImageCrateDecoder
            .decode(b"", FidelityPolicy::DEFAULT)
            .is_err());
    }
}
