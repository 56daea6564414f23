//! Source page images.
//!
//! Pages are decoded once per session on a background thread, in parallel,
//! and handed to the main loop as they finish. A page that has not arrived
//! yet, or failed to decode, is simply absent from the store.

use super::canvas::Rgba;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use thiserror::Error;

/// Errors that can occur while decoding a page image.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("failed to decode page {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// A decoded page bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl PageImage {
    /// Wraps raw RGBA8 bytes. Returns None if the length does not match.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }
        let pixels = data
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]])
            .collect();
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// A single-color page, mostly useful for previews and tests.
    pub fn solid(width: u32, height: u32, color: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Decodes an image file (PNG or JPEG).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PageError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| PageError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba.pixels().map(|p| p.0).collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at (x, y). Coordinates must be inside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

/// Decoded pages indexed by page number.
#[derive(Debug, Clone, Default)]
pub struct PageImages {
    pages: Vec<Option<Arc<PageImage>>>,
}

impl PageImages {
    /// Creates a store with `count` empty slots.
    pub fn with_len(count: usize) -> Self {
        Self {
            pages: vec![None; count],
        }
    }

    /// Stores a decoded page, growing the store if needed.
    pub fn insert(&mut self, index: usize, page: PageImage) {
        if index >= self.pages.len() {
            self.pages.resize(index + 1, None);
        }
        self.pages[index] = Some(Arc::new(page));
    }

    /// Returns the page if it has been decoded.
    pub fn get(&self, index: usize) -> Option<&PageImage> {
        self.pages.get(index)?.as_deref()
    }

}

/// Snapshot of background decoding progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: usize,
    pub failed: usize,
    pub total: usize,
    /// True only on the poll that received the last outstanding page.
    pub newly_complete: bool,
}

impl LoadProgress {
    pub fn is_complete(&self) -> bool {
        self.loaded + self.failed >= self.total
    }
}

/// Decodes page images in the background.
pub struct PageLoader {
    rx: Receiver<(usize, Result<PageImage, PageError>)>,
    loaded: usize,
    failed: usize,
    total: usize,
}

impl PageLoader {
    /// Starts decoding `paths`; page `i` is `paths[i]`.
    pub fn spawn(paths: Vec<PathBuf>) -> Self {
        let total = paths.len();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            paths
                .into_par_iter()
                .enumerate()
                .for_each_with(tx, |tx, (index, path)| {
                    // The receiver may already be gone if the session was replaced
                    let _ = tx.send((index, PageImage::open(&path)));
                });
        });

        Self {
            rx,
            loaded: 0,
            failed: 0,
            total,
        }
    }

    /// Moves every finished page into `pages` without blocking.
    pub fn poll(&mut self, pages: &mut PageImages) -> LoadProgress {
        let was_complete = self.loaded + self.failed >= self.total;
        loop {
            match self.rx.try_recv() {
                Ok((index, Ok(page))) => {
                    tracing::debug!("page {} decoded ({}x{})", index, page.width(), page.height());
                    pages.insert(index, page);
                    self.loaded += 1;
                }
                Ok((index, Err(e))) => {
                    tracing::warn!("page {} unavailable: {}", index, e);
                    self.failed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        let progress = LoadProgress {
            loaded: self.loaded,
            failed: self.failed,
            total: self.total,
            newly_complete: false,
        };
        LoadProgress {
            newly_complete: !was_complete && progress.is_complete(),
            ..progress
        }
    }
}
