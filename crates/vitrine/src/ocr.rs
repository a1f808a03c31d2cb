use std::future::Future;
use std::io::{self, Cursor};
use std::process::Stdio;

use image::ImageFormat;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::OcrConfig;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),
    #[error("OCR engine failed: {0}")]
    Engine(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &[u8]) -> impl Future<Output = Result<String, OcrError>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct TesseractOcr {
    config: OcrConfig,
}

impl TesseractOcr {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.config.language.clone(),
        ];
        if let Some(whitelist) = &self.config.whitelist {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={}", whitelist));
        }
        args
    }
}

pub fn prepare_image(bytes: &[u8]) -> Result<Vec<u8>, OcrError> {
    let decoded = image::load_from_memory(bytes)?;
    let gray = image::DynamicImage::ImageLuma8(decoded.to_luma8());

    let mut png = Vec::new();
    gray.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

pub fn is_image(bytes: &[u8]) -> bool {
    image::guess_format(bytes).is_ok()
}

impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let png = prepare_image(image)?;

        log::debug!(
            "Running {} on {} byte image ({})",
            self.config.program,
            png.len(),
            self.config.language
        );

        let mut child = Command::new(&self.config.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => OcrError::Unavailable(format!(
                    "'{}' not found in PATH",
                    self.config.program
                )),
                _ => OcrError::Io(e),
            })?;

        let stdin = child.stdin.take();
        let run = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&png).await?;
            }
            child.wait_with_output().await
        };

        // Dropping `run` on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.config.timeout, run)
            .await
            .map_err(|_| {
                OcrError::Engine(format!(
                    "{} timed out after {:?}",
                    self.config.program, self.config.timeout
                ))
            })??;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl<O: OcrEngine> OcrEngine for Option<O> {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        match self {
            Some(engine) => engine.recognize(image).await,
            None => Err(OcrError::Unavailable("OCR disabled".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 30, 30]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_prepare_image_outputs_grayscale_png() {
        let png = prepare_image(&tiny_png()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn test_prepare_image_rejects_garbage() {
        let err = prepare_image(b"%PDF-1.4 not an image").unwrap_err();
        assert!(matches!(err, OcrError::Decode(_)));
    }

    #[test]
    fn test_tesseract_args() {
        let ocr = TesseractOcr::default();
        let args = ocr.args();
        assert_eq!(&args[..4], ["stdin", "stdout", "-l", "por"]);
        assert_eq!(args[5], "tessedit_char_whitelist=0123456789R$US.,");

        let ocr = TesseractOcr::new(OcrConfig {
            whitelist: None,
            ..Default::default()
        });
        assert_eq!(ocr.args().len(), 4);
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let ocr = TesseractOcr::new(OcrConfig {
            program: "tesseract-binary-that-does-not-exist".to_string(),
            ..Default::default()
        });
        let err = ocr.recognize(&tiny_png()).await.unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(&tiny_png()));
        assert!(is_image(b"P3\n1 1\n255\n0 0 0\n"));
        assert!(!is_image("10x R$ 150,00\nà vista R$ 1.400,00".as_bytes()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_engine_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-tesseract");
        std::fs::write(&script, "#!/bin/sh\ncat >/dev/null\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let ocr = TesseractOcr::new(OcrConfig {
            program: script.to_string_lossy().into_owned(),
            timeout: Duration::from_millis(300),
            ..Default::default()
        });

        let start = std::time::Instant::now();
        let err = ocr.recognize(&tiny_png()).await.unwrap_err();

        assert!(matches!(err, OcrError::Engine(_)), "got {err:?}");
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_disabled_ocr() {
        let err = None::<TesseractOcr>
            .recognize(&tiny_png())
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }
}
