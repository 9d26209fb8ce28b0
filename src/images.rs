//! Optional download of an article's primary image.
//!
//! The image travels through the oracle like everything else: the reply must
//! carry the bytes as base64 inside a fenced `base64` block. The file type is
//! sniffed from the decoded bytes and the file gets a random name under the
//! store's `images/` directory.

use crate::error::ImageError;
use crate::extract::extract_fenced_block;
use crate::oracle::{Instruction, Oracle};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const NAME_LEN: usize = 16;

/// Fetch `image_url` through the oracle and store it in `image_dir`.
///
/// # Arguments
///
/// * `oracle` - Backend asked with the image instruction
/// * `image_url` - Absolute URL of the image
/// * `image_dir` - Directory receiving the file, created if missing
///
/// # Returns
///
/// Path of the written file, named `<16 random alphanumerics>.<ext>` where
/// the extension is sniffed from the bytes (`jpg` when unknown).
///
/// # Errors
///
/// Any [`ImageError`]; the caller keeps the article without an image.
#[instrument(level = "info", skip_all, fields(%image_url))]
pub async fn download_image<O: Oracle>(
    oracle: &O,
    image_url: &str,
    image_dir: &Path,
) -> Result<PathBuf, ImageError> {
    let reply = oracle
        .fetch_and_instruct(image_url, &Instruction::download_image())
        .await?;
    let bytes = decode_image_block(&reply)?;

    fs::create_dir_all(image_dir).await?;
    let path = image_dir.join(format!("{}.{}", random_name(), extension_for(&bytes)));
    fs::write(&path, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Stored image");
    Ok(path)
}

/// Decode the fenced base64 block of an image reply.
pub fn decode_image_block(reply: &str) -> Result<Vec<u8>, ImageError> {
    let block = extract_fenced_block(reply, "base64").ok_or(ImageError::MissingBlock)?;
    let compact: String = block.split_whitespace().collect();
    let bytes = STANDARD.decode(compact)?;
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    Ok(bytes)
}

fn extension_for(bytes: &[u8]) -> &'static str {
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => kind.extension(),
        _ => "jpg",
    }
}

fn random_name() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::InstructionKind;
    use crate::testing::ScriptedOracle;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn test_decode_wrapped_base64() {
        let encoded = STANDARD.encode(PNG_HEADER);
        let (a, b) = encoded.split_at(6);
        let reply = format!("Here it is:\n```base64\n{a}\n{b}\n```");
        assert_eq!(decode_image_block(&reply).unwrap(), PNG_HEADER);
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_image_block("I could not download that image."),
            Err(ImageError::MissingBlock)
        ));
        assert!(matches!(
            decode_image_block("```base64\n***not base64***\n```"),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn test_extension_sniffing() {
        assert_eq!(extension_for(PNG_HEADER), "png");
        assert_eq!(extension_for(b"plain text"), "jpg");
    }

    #[tokio::test]
    async fn test_download_image_writes_random_file() {
        let tmp = tempfile::tempdir().unwrap();
        let image_dir = tmp.path().join("images");
        let reply = format!("```base64\n{}\n```", STANDARD.encode(PNG_HEADER));
        let oracle = ScriptedOracle::new().reply(
            InstructionKind::DownloadImage,
            "https://site/img/maize.png",
            &reply,
        );

        let path = download_image(&oracle, "https://site/img/maize.png", &image_dir)
            .await
            .unwrap();
        assert_eq!(path.parent().unwrap(), image_dir);
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(path.file_stem().unwrap().len(), NAME_LEN);
        assert_eq!(std::fs::read(&path).unwrap(), PNG_HEADER);
    }

    #[tokio::test]
    async fn test_download_image_oracle_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::new();
        let err = download_image(&oracle, "https://site/img/x.jpg", tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Oracle(_)));
    }
}
