use chrono::Duration;
use lms_core::model::{AuthenticatedUser, EnrollmentStatus, LessonDraft, Role, UserId};
use lms_core::time::fixed_now;
use services::{AppServices, Clock, EnrollmentServiceError};

fn admin() -> AuthenticatedUser {
    AuthenticatedUser::new(UserId::new(1), Role::Admin)
}

fn learner() -> AuthenticatedUser {
    AuthenticatedUser::new(UserId::new(2), Role::Employee)
}

#[tokio::test]
async fn catalog_shows_public_and_enrolled_courses_with_overlay() {
    let app = AppServices::new_in_memory(Clock::fixed(fixed_now()));
    let learner = learner();
    let catalog = app.catalog();

    let public_id = catalog
        .create_course(&admin(), "Open Course".into(), None, false, None, true)
        .await
        .unwrap();
    let private_id = catalog
        .create_course(&admin(), "Mandatory Training".into(), None, true, None, false)
        .await
        .unwrap();

    let visible = catalog.catalog(&learner).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].course.id, public_id);
    assert!(visible[0].enrollment.is_none());

    app.enrollments()
        .assign(&admin(), learner.id, private_id)
        .await
        .unwrap();

    // newest course first, the assigned one now visible with its overlay
    let visible = catalog.catalog(&learner).await.unwrap();
    assert_eq!(visible.len(), 2);
    assert_eq!(visible[0].course.id, private_id);
    let overlay = visible[0].enrollment.unwrap();
    assert_eq!(overlay.status, EnrollmentStatus::Assigned);
    assert_eq!(overlay.progress_percent, 0);
}

#[tokio::test]
async fn assignment_applies_the_course_deadline_window() {
    let app = AppServices::new_in_memory(Clock::fixed(fixed_now()));
    let learner = learner();

    let course_id = app
        .catalog()
        .create_course(&admin(), "Compliance".into(), None, true, Some(30), false)
        .await
        .unwrap();
    app.enrollments()
        .assign(&admin(), learner.id, course_id)
        .await
        .unwrap();

    let entries = app.enrollments().my_courses(&learner).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].deadline_at,
        Some(fixed_now() + Duration::days(30))
    );
    assert_eq!(entries[0].status, EnrollmentStatus::Assigned);
}

#[tokio::test]
async fn assignment_is_admin_only_and_single_shot() {
    let app = AppServices::new_in_memory(Clock::fixed(fixed_now()));
    let learner = learner();
    let enrollments = app.enrollments();

    let course_id = app
        .catalog()
        .create_course(&admin(), "Course".into(), None, false, None, true)
        .await
        .unwrap();

    let err = enrollments
        .assign(&learner, UserId::new(9), course_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentServiceError::Forbidden));

    enrollments
        .assign(&admin(), learner.id, course_id)
        .await
        .unwrap();
    let err = enrollments
        .assign(&admin(), learner.id, course_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentServiceError::AlreadyAssigned));
}

#[tokio::test]
async fn self_enrollment_needs_a_public_course() {
    let app = AppServices::new_in_memory(Clock::fixed(fixed_now()));
    let learner = learner();
    let enrollments = app.enrollments();

    let private_id = app
        .catalog()
        .create_course(&admin(), "Internal Only".into(), None, false, None, false)
        .await
        .unwrap();
    let err = enrollments.enroll(&learner, private_id).await.unwrap_err();
    assert!(matches!(err, EnrollmentServiceError::NotPublic));

    // once assigned, opening the course is allowed and starts it
    enrollments
        .assign(&admin(), learner.id, private_id)
        .await
        .unwrap();
    enrollments.enroll(&learner, private_id).await.unwrap();

    let entries = enrollments.my_courses(&learner).await.unwrap();
    assert_eq!(entries[0].status, EnrollmentStatus::InProgress);
}

#[tokio::test]
async fn course_lessons_lists_structure_in_order() {
    let app = AppServices::new_in_memory(Clock::fixed(fixed_now()));
    let catalog = app.catalog();

    let course_id = catalog
        .create_course(&admin(), "Course".into(), None, false, None, true)
        .await
        .unwrap();
    for (order, video) in [(2, None), (1, Some("https://videos.example.com/1.mp4"))] {
        catalog
            .add_lesson(
                &admin(),
                LessonDraft {
                    course_id,
                    order,
                    title: format!("Lesson {order}"),
                    video_url: video.map(str::to_owned),
                    content: None,
                },
            )
            .await
            .unwrap();
    }

    let listing = catalog.course_lessons(&learner(), course_id).await.unwrap();
    let orders: Vec<u32> = listing.iter().map(|l| l.order).collect();
    assert_eq!(orders, vec![1, 2]);
    assert!(listing[0].has_video);
    assert!(!listing[1].has_video);
}
