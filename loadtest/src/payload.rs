//! Synthesizes request bodies matching each function image's input contract.

use std::fmt;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;

/// Image tag of the echo function.
pub const ECHO_IMAGE: &str = "hyperfaas-echo:latest";
/// Image tag of the BFS function.
pub const BFS_JSON_IMAGE: &str = "hyperfaas-bfs-json:latest";
/// Image tag of the thumbnailer function.
pub const THUMBNAILER_JSON_IMAGE: &str = "hyperfaas-thumbnailer-json:latest";

const THUMBNAILER_IMAGE_URL: &str = "http://picsum.photos/1920/1080";

/// A source of request bodies for one function image.
///
/// Every variant is safe to share across call tasks.
#[derive(Debug)]
pub enum DataProvider {
    /// Random binary payloads for [`ECHO_IMAGE`].
    Echo(EchoProvider),
    /// `{"Size": n}` payloads for [`BFS_JSON_IMAGE`].
    BfsJson(BfsJsonProvider),
    /// Image resize requests for [`THUMBNAILER_JSON_IMAGE`].
    ThumbnailerJson(ThumbnailerJsonProvider),
}

impl DataProvider {
    /// Builds the provider matching a known image tag.
    ///
    /// The thumbnailer provider downloads its source image here; a failed
    /// download is a startup failure. An unrecognized tag is a configuration
    /// error.
    pub async fn for_image_tag(image_tag: &str, seed: u64) -> Result<Self> {
        Ok(match image_tag {
            ECHO_IMAGE => Self::Echo(EchoProvider::new(256, 1024, seed)),
            BFS_JSON_IMAGE => Self::BfsJson(BfsJsonProvider::new(100, 250, seed)),
            THUMBNAILER_JSON_IMAGE => {
                Self::ThumbnailerJson(ThumbnailerJsonProvider::fetch(seed).await?)
            }
            tag => bail!("no payload provider for image tag {tag}"),
        })
    }

    /// Synthesizes one request body.
    pub fn get_data(&self) -> Vec<u8> {
        match self {
            Self::Echo(provider) => provider.get_data(),
            Self::BfsJson(provider) => provider.get_data(),
            Self::ThumbnailerJson(provider) => provider.get_data(),
        }
    }
}

/// Random binary payloads, sized in multiples of 8 bytes.
///
/// Payload bytes come from a pre-generated pool sampled at a random offset,
/// so per-call work is a bounds draw and a copy.
pub struct EchoProvider {
    min_size: usize,
    max_size: usize,
    pool: Vec<u8>,
    rng: Mutex<SmallRng>,
}

const ECHO_POOL_SIZE: usize = 1024;

impl EchoProvider {
    /// Creates a provider emitting payloads of `min_size..=max_size` bytes.
    pub fn new(min_size: usize, max_size: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut pool = vec![0; ECHO_POOL_SIZE];
        rng.fill_bytes(&mut pool);

        Self {
            min_size,
            max_size,
            pool,
            rng: Mutex::new(rng),
        }
    }

    fn get_data(&self) -> Vec<u8> {
        let min = self.min_size.max(8);
        let max = self.max_size.max(min);

        let mut rng = self.rng.lock().unwrap();
        // Floored to a multiple of 8, which is what the echo handler expects.
        let size = ((rng.random_range(min..=max) & !7).max(8)).min(self.pool.len());
        let max_offset = self.pool.len().saturating_sub(size).max(1);
        let offset = rng.random_range(0..max_offset);

        self.pool[offset..offset + size].to_vec()
    }
}

impl fmt::Debug for EchoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EchoProvider")
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .field("pool_size", &self.pool.len())
            .finish()
    }
}

#[derive(Serialize)]
struct BfsInput {
    #[serde(rename = "Size")]
    size: i64,
}

/// `{"Size": n}` payloads with a uniformly drawn size.
#[derive(Debug)]
pub struct BfsJsonProvider {
    min_size: i64,
    max_size: i64,
    rng: Mutex<SmallRng>,
}

impl BfsJsonProvider {
    /// Creates a provider drawing sizes from `min_size..=max_size`.
    pub fn new(min_size: i64, max_size: i64, seed: u64) -> Self {
        Self {
            min_size,
            max_size,
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    fn get_data(&self) -> Vec<u8> {
        let size = self
            .rng
            .lock()
            .unwrap()
            .random_range(self.min_size..=self.max_size);
        serde_json::to_vec(&BfsInput { size }).unwrap()
    }
}

#[derive(Serialize)]
struct ThumbnailerInput<'a> {
    image: &'a str,
    width: u32,
    height: u32,
}

/// Resize requests carrying one base64 source image and random target
/// dimensions.
pub struct ThumbnailerJsonProvider {
    image: String,
    rng: Mutex<SmallRng>,
}

impl ThumbnailerJsonProvider {
    /// Downloads the source image; the same bytes back every payload.
    pub async fn fetch(seed: u64) -> Result<Self> {
        let response = reqwest::get(THUMBNAILER_IMAGE_URL)
            .await
            .context("failed to fetch thumbnailer source image")?
            .error_for_status()
            .context("thumbnailer source image request failed")?;
        let image = response
            .bytes()
            .await
            .context("failed to read thumbnailer source image")?;
        Ok(Self::from_image(&image, seed))
    }

    fn from_image(image: &[u8], seed: u64) -> Self {
        Self {
            image: BASE64.encode(image),
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    fn get_data(&self) -> Vec<u8> {
        let (width, height) = {
            let mut rng = self.rng.lock().unwrap();
            (rng.random_range(1..=1440), rng.random_range(1..=900))
        };

        serde_json::to_vec(&ThumbnailerInput {
            image: &self.image,
            width,
            height,
        })
        .unwrap()
    }
}

impl fmt::Debug for ThumbnailerJsonProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailerJsonProvider")
            .field("image_b64_len", &self.image.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_payloads_are_bounded_multiples_of_8() {
        let provider = EchoProvider::new(256, 1024, 7);
        for _ in 0..100 {
            let data = provider.get_data();
            assert_eq!(data.len() % 8, 0);
            assert!((256..=1024).contains(&data.len()), "{}", data.len());
        }
    }

    #[test]
    fn echo_small_bounds_are_coerced() {
        let provider = EchoProvider::new(1, 16, 3);
        for _ in 0..100 {
            let data = provider.get_data();
            assert!(data.len() == 8 || data.len() == 16, "{}", data.len());
        }
    }

    #[test]
    fn bfs_payloads_carry_a_size_in_range() {
        let provider = BfsJsonProvider::new(100, 250, 5);
        for _ in 0..100 {
            let value: serde_json::Value =
                serde_json::from_slice(&provider.get_data()).unwrap();
            let size = value["Size"].as_i64().unwrap();
            assert!((100..=250).contains(&size), "{size}");
        }
    }

    #[test]
    fn thumbnailer_payloads_embed_the_image() {
        let image = b"\xff\xd8\xff\xe0 not actually a jpeg";
        let provider = ThumbnailerJsonProvider::from_image(image, 11);
        for _ in 0..100 {
            let value: serde_json::Value =
                serde_json::from_slice(&provider.get_data()).unwrap();
            assert_eq!(value["image"].as_str().unwrap(), BASE64.encode(image));
            let width = value["width"].as_u64().unwrap();
            let height = value["height"].as_u64().unwrap();
            assert!((1..=1440).contains(&width), "{width}");
            assert!((1..=900).contains(&height), "{height}");
        }
    }

    #[tokio::test]
    async fn unknown_image_tag_is_an_error() {
        let error = DataProvider::for_image_tag("mystery-function:latest", 0)
            .await
            .unwrap_err()
            .to_string();
        assert!(error.contains("mystery-function"), "{error}");
    }
}
