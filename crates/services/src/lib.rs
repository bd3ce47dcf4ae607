#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod completion_service;
pub mod enrollment_service;
pub mod error;
pub mod gate;
pub mod lesson_service;
pub mod video_service;
pub mod views;

pub use lms_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use completion_service::CompletionService;
pub use enrollment_service::EnrollmentService;
pub use error::{
    AppServicesError, CatalogServiceError, CompletionServiceError, EnrollmentServiceError,
    GateError, LessonServiceError, VideoServiceError,
};
pub use gate::LessonGate;
pub use lesson_service::LessonService;
pub use video_service::VideoService;
pub use views::{
    CatalogEntry, CourseProgressView, CourseSummary, EnrollmentOverlay, LessonDetail,
    LessonOverview, LessonProgressView,
};
