//! Pooled RGBA canvases for compositing.
//!
//! Each job needs one full-size working canvas. Instead of allocating a fresh
//! buffer per job, canvases are kept on a shared free list and handed out
//! through [`PooledCanvas`], a guard that returns the buffer when dropped,
//! including on early returns and panics that unwind through the job.
//!
//! ## Design
//!
//! - **Exclusive checkout**: a canvas is owned by exactly one guard at a time,
//!   so its pixels need no locking. Only the free list is behind a mutex.
//! - **Always cleared**: buffers are zeroed (fully transparent) on checkout,
//!   never assumed clean from a previous job.
//! - **Lazy growth**: the pool allocates only when the free list is empty, so
//!   it settles at one canvas per concurrently running job.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use image::RgbaImage;

/// A free list of square RGBA canvases of one fixed size.
#[derive(Debug)]
pub struct CanvasPool {
    size: u32,
    free: Mutex<Vec<RgbaImage>>,
    allocated: AtomicUsize,
}

impl CanvasPool {
    /// Creates an empty pool of `size` x `size` canvases.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            free: Mutex::new(Vec::new()),
            allocated: AtomicUsize::new(0),
        }
    }

    /// Edge length of every canvas in the pool.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Checks out a cleared canvas.
    pub fn checkout(&self) -> PooledCanvas<'_> {
        let recycled = self.free.lock().unwrap_or_else(PoisonError::into_inner).pop();

        let image = match recycled {
            Some(mut image) => {
                // Clear to transparent; the previous job left its pixels behind.
                image.fill(0);
                image
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                RgbaImage::new(self.size, self.size)
            }
        };

        PooledCanvas {
            pool: self,
            image: Some(image),
        }
    }

    /// Number of canvases currently waiting on the free list.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Total canvases ever allocated by this pool.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    fn give_back(&self, image: RgbaImage) {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(image);
    }
}

/// Exclusive access to one pooled canvas.
///
/// Dereferences to [`RgbaImage`]. The canvas goes back to its pool on drop.
#[derive(Debug)]
pub struct PooledCanvas<'a> {
    pool: &'a CanvasPool,
    image: Option<RgbaImage>,
}

impl Deref for PooledCanvas<'_> {
    type Target = RgbaImage;

    fn deref(&self) -> &RgbaImage {
        // Only `drop` takes the image out.
        self.image.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledCanvas<'_> {
    fn deref_mut(&mut self) -> &mut RgbaImage {
        self.image.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledCanvas<'_> {
    fn drop(&mut self) {
        if let Some(image) = self.image.take() {
            self.pool.give_back(image);
        }
    }
}
