use base64::Engine;
use bytes::Bytes;
use image::ImageFormat;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const MAX_IMAGES: usize = 5;
const ACCEPTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Producto,
    Servicio,
    Logo,
    #[default]
    Unclassified,
}

#[derive(Debug, Error, PartialEq)]
pub enum GalleryError {
    #[error("máximo 5 imágenes")] Full,
    #[error("tipo de archivo no soportado: {0}")] UnsupportedType(String),
    #[error("el archivo no es una imagen válida")] NotAnImage,
    #[error("imagen no encontrada: {0}")] NotFound(Uuid),
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub id: Uuid,
    pub file_name: String,
    pub bytes: Bytes,
    pub kind: ImageKind,
    mime: &'static str,
}

impl UploadedImage {
    /// `data:` URL the page can use as an `<img src>`.
    pub fn preview_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, base64::engine::general_purpose::STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageSummary {
    pub id: Uuid,
    pub file_name: String,
    pub kind: ImageKind,
    pub size: usize,
    pub preview_url: String,
}

#[derive(Debug, Default)]
pub struct ImageGallery {
    images: Vec<UploadedImage>,
}

impl ImageGallery {
    pub fn new() -> Self { Self::default() }

    pub fn images(&self) -> &[UploadedImage] { &self.images }
    pub fn is_full(&self) -> bool { self.images.len() >= MAX_IMAGES }

    pub fn add(&mut self, file_name: &str, bytes: Bytes) -> Result<Uuid, GalleryError> {
        if self.is_full() {
            return Err(GalleryError::Full);
        }
        let ext = file_name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()).unwrap_or_default();
        if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(GalleryError::UnsupportedType(file_name.to_string()));
        }
        let format = image::guess_format(&bytes).map_err(|_| GalleryError::NotAnImage)?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP) {
            return Err(GalleryError::NotAnImage);
        }
        let id = Uuid::new_v4();
        info!("🖼️ Image added: {} ({} bytes, {:?})", file_name, bytes.len(), format);
        self.images.push(UploadedImage {
            id,
            file_name: file_name.to_string(),
            bytes,
            kind: ImageKind::Unclassified,
            mime: format.to_mime_type(),
        });
        Ok(id)
    }

    pub fn classify(&mut self, id: Uuid, kind: ImageKind) -> Result<(), GalleryError> {
        let img = self.images.iter_mut().find(|i| i.id == id).ok_or(GalleryError::NotFound(id))?;
        img.kind = kind;
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Result<UploadedImage, GalleryError> {
        let pos = self.images.iter().position(|i| i.id == id).ok_or(GalleryError::NotFound(id))?;
        Ok(self.images.remove(pos))
    }

    pub fn classified_count(&self) -> usize {
        self.images.iter().filter(|i| i.kind != ImageKind::Unclassified).count()
    }

    pub fn summaries(&self) -> Vec<ImageSummary> {
        self.images
            .iter()
            .map(|i| ImageSummary {
                id: i.id,
                file_name: i.file_name.clone(),
                kind: i.kind,
                size: i.bytes.len(),
                preview_url: i.preview_url(),
            })
            .collect()
    }
}
