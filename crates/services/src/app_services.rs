use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::completion_service::CompletionService;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::gate::LessonGate;
use crate::lesson_service::LessonService;
use crate::video_service::VideoService;

/// Assembles the engine's services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    enrollments: Arc<EnrollmentService>,
    lessons: Arc<LessonService>,
    videos: Arc<VideoService>,
    completions: Arc<CompletionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, migrating on startup.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Sqlite` if the pool cannot be opened or
    /// migrations fail.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over the in-memory backend, for tests and
    /// prototyping.
    #[must_use]
    pub fn new_in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let gate = LessonGate::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.completions),
        );

        let catalog = Arc::new(CatalogService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
        ));
        let enrollments = Arc::new(EnrollmentService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.completions),
            Arc::clone(&storage.progress),
        ));
        let lessons = Arc::new(LessonService::new(
            gate,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.watch),
            Arc::clone(&storage.completions),
        ));
        let videos = Arc::new(VideoService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.watch),
        ));
        let completions = Arc::new(CompletionService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.progress),
        ));

        Self {
            catalog,
            enrollments,
            lessons,
            videos,
            completions,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonService> {
        Arc::clone(&self.lessons)
    }

    #[must_use]
    pub fn videos(&self) -> Arc<VideoService> {
        Arc::clone(&self.videos)
    }

    #[must_use]
    pub fn completions(&self) -> Arc<CompletionService> {
        Arc::clone(&self.completions)
    }
}
