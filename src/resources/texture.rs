use image::{GrayImage, ImageFormat, Luma, Rgb32FImage};

/// Horizontal resolution class of an equirectangular environment map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvironmentResolution {
    Low,
    High,
}

/// Decoded equirectangular HDR image.
#[derive(Clone, Debug)]
pub struct EnvironmentMap {
    pub width: u32,
    pub height: u32,
    pub texels: Rgb32FImage,
}

pub fn decode_environment(bytes: &[u8]) -> anyhow::Result<EnvironmentMap> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Hdr)?;
    let texels = img.into_rgb32f();
    if texels.width() != texels.height() * 2 {
        log::warn!(
            "Environment map is {}x{}, expected a 2:1 equirectangular image",
            texels.width(),
            texels.height()
        );
    }
    Ok(EnvironmentMap {
        width: texels.width(),
        height: texels.height(),
        texels,
    })
}

/// Mid-grey noise used as the displacement map: every texel is drawn from
/// `[64, 192)` so the surface moves both up and down around its rest height.
pub fn generate_noise_texture(size: u32, seed: u32) -> GrayImage {
    let mut state = seed.max(1);
    GrayImage::from_fn(size, size, |_, _| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        Luma([64 + ((state >> 24) % 128) as u8])
    })
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window available"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("window has no origin"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

/// Reads `file_name` from `./assets` natively, or fetches it relative to the
/// page origin on the web.
pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(path).await?
    };

    Ok(data)
}
