mod completion;
mod course;
mod enrollment;
mod ids;
mod lesson;
mod user;
mod watch;

pub use ids::{CourseId, EnrollmentId, LessonId, ParseIdError, UserId};

pub use completion::LessonCompletion;
pub use course::{Course, CourseError, MAX_TITLE_LEN};
pub use enrollment::{Enrollment, EnrollmentError, EnrollmentProgress, EnrollmentStatus};
pub use lesson::{Lesson, LessonDraft, LessonError, ValidatedLesson, VideoRef};
pub use user::{AuthenticatedUser, Capability, Role, RoleError};
pub use watch::{VideoProgress, WatchError, WatchEvent};
