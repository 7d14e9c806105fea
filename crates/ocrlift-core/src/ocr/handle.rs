//! Lazily created, explicitly released OCR engine.

use image::DynamicImage;
use tracing::{debug, error, info};

use super::{BackendFactory, OcrBackend};
use crate::error::OcrError;

enum EngineState<B> {
    Uninitialized,
    Ready(B),
    Failed(String),
    Released,
}

/// Owner of the one OCR engine a pipeline uses.
///
/// The engine is created on first [`acquire`](Self::acquire). If creation
/// fails, the failure is logged and every later call answers
/// [`OcrError::EngineNotReady`] until [`retry_initialization`](Self::retry_initialization)
/// is requested. [`release`](Self::release) drops the engine; it may be called
/// any number of times, and the handle stays unusable afterwards. Dropping the
/// handle releases it.
pub struct EngineHandle<F: BackendFactory> {
    factory: F,
    state: EngineState<F::Backend>,
}

impl<F: BackendFactory> EngineHandle<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            state: EngineState::Uninitialized,
        }
    }

    /// Start the engine if it is not running yet.
    pub fn initialize(&mut self) -> Result<(), OcrError> {
        match &self.state {
            EngineState::Ready(_) => Ok(()),
            EngineState::Failed(_) => Err(OcrError::EngineNotReady),
            EngineState::Released => Err(OcrError::Released),
            EngineState::Uninitialized => match self.factory.create() {
                Ok(backend) => {
                    info!("OCR engine initialized");
                    self.state = EngineState::Ready(backend);
                    Ok(())
                }
                Err(e) => {
                    error!("Failed to initialize OCR engine: {}", e);
                    self.state = EngineState::Failed(e.to_string());
                    Err(e)
                }
            },
        }
    }

    /// Borrow the running engine, starting it if needed.
    pub fn acquire(&mut self) -> Result<&mut F::Backend, OcrError> {
        self.initialize()?;
        match &mut self.state {
            EngineState::Ready(backend) => Ok(backend),
            EngineState::Released => Err(OcrError::Released),
            EngineState::Uninitialized | EngineState::Failed(_) => Err(OcrError::EngineNotReady),
        }
    }

    /// Recognize text with the engine, starting it if needed.
    pub fn recognize(&mut self, image: &DynamicImage) -> Result<String, OcrError> {
        self.acquire()?.recognize(image)
    }

    /// Allow another initialization attempt after a failure.
    pub fn retry_initialization(&mut self) {
        if let EngineState::Failed(reason) = &self.state {
            debug!("Clearing previous OCR engine failure: {}", reason);
            self.state = EngineState::Uninitialized;
        }
    }

    /// Drop the engine. Safe to call repeatedly or before initialization.
    pub fn release(&mut self) {
        match std::mem::replace(&mut self.state, EngineState::Released) {
            EngineState::Ready(backend) => {
                drop(backend);
                info!("OCR engine released");
            }
            EngineState::Released => {}
            EngineState::Uninitialized | EngineState::Failed(_) => {
                debug!("OCR engine released before it was running");
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    pub fn is_released(&self) -> bool {
        matches!(self.state, EngineState::Released)
    }

    /// The reason initialization failed, while it stays failed.
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            EngineState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl<F: BackendFactory> Drop for EngineHandle<F> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counting {
        drops: Rc<Cell<u32>>,
    }

    impl OcrBackend for Counting {
        fn recognize(&mut self, _image: &DynamicImage) -> Result<String, OcrError> {
            Ok("text".to_string())
        }
    }

    impl Drop for Counting {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn image() -> DynamicImage {
        DynamicImage::new_luma8(4, 4)
    }

    #[test]
    fn test_lazy_single_initialization() {
        let created = Rc::new(Cell::new(0));
        let drops = Rc::new(Cell::new(0));
        let (c, d) = (created.clone(), drops.clone());
        let mut handle = EngineHandle::new(move || {
            c.set(c.get() + 1);
            Ok::<_, OcrError>(Counting { drops: d.clone() })
        });

        assert_eq!(created.get(), 0);
        assert!(!handle.is_ready());

        handle.recognize(&image()).unwrap();
        handle.recognize(&image()).unwrap();
        handle.initialize().unwrap();

        assert_eq!(created.get(), 1);
        assert!(handle.is_ready());
        assert_eq!(drops.get(), 0);
    }

    #[test]
    fn test_release_twice() {
        let drops = Rc::new(Cell::new(0));
        let d = drops.clone();
        let mut handle = EngineHandle::new(move || Ok::<_, OcrError>(Counting { drops: d.clone() }));
        handle.initialize().unwrap();

        handle.release();
        assert!(handle.is_released());
        assert!(matches!(handle.recognize(&image()), Err(OcrError::Released)));

        handle.release();
        assert!(handle.is_released());
        assert!(matches!(handle.recognize(&image()), Err(OcrError::Released)));

        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_release_never_initialized() {
        let mut handle = EngineHandle::new(|| Err::<Counting, _>(OcrError::EngineInit("x".into())));
        handle.release();
        handle.release();
        assert!(handle.is_released());
        assert!(matches!(handle.initialize(), Err(OcrError::Released)));
    }

    #[test]
    fn test_drop_releases_engine() {
        let drops = Rc::new(Cell::new(0));
        let d = drops.clone();
        {
            let mut handle = EngineHandle::new(move || Ok::<_, OcrError>(Counting { drops: d.clone() }));
            handle.initialize().unwrap();
        }
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_failed_init_disables_until_retry() {
        let attempts = Rc::new(Cell::new(0));
        let drops = Rc::new(Cell::new(0));
        let (a, d) = (attempts.clone(), drops.clone());
        let mut handle = EngineHandle::new(move || {
            a.set(a.get() + 1);
            if a.get() == 1 {
                Err(OcrError::EngineInit("models missing".into()))
            } else {
                Ok(Counting { drops: d.clone() })
            }
        });

        assert!(matches!(handle.acquire(), Err(OcrError::EngineInit(_))));
        assert_eq!(handle.failure(), Some("failed to initialize OCR engine: models missing"));

        assert!(matches!(handle.acquire(), Err(OcrError::EngineNotReady)));
        assert!(matches!(handle.recognize(&image()), Err(OcrError::EngineNotReady)));
        assert_eq!(attempts.get(), 1);

        handle.retry_initialization();
        assert_eq!(handle.recognize(&image()).unwrap(), "text");
        assert_eq!(attempts.get(), 2);
    }
}
