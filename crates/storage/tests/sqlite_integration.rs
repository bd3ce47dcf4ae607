use chrono::{Duration, Utc};
use lms_core::model::{CourseId, EnrollmentStatus, LessonId, UserId, WatchEvent};
use lms_core::time::fixed_now;
use storage::repository::{
    CatalogRepository, CompletionRepository, EnrollmentRepository, NewCourseRecord,
    NewEnrollmentRecord, NewLessonRecord, ProgressPersistence, StorageError, WatchRepository,
};
use storage::sqlite::SqliteRepository;

fn course_record(title: &str, deadline_days: Option<u32>) -> NewCourseRecord {
    NewCourseRecord {
        title: title.to_string(),
        description: Some("integration fixture".to_string()),
        is_mandatory: false,
        deadline_days,
        is_public: true,
        created_at: fixed_now(),
    }
}

fn lesson_record(course_id: CourseId, order: u32) -> NewLessonRecord {
    NewLessonRecord {
        course_id,
        order,
        title: format!("Lesson {order}"),
        video_url: Some(format!("https://videos.example.com/{order:02}.mp4")),
        content: None,
    }
}

fn enrollment_record(user_id: UserId, course_id: CourseId) -> NewEnrollmentRecord {
    NewEnrollmentRecord {
        user_id,
        course_id,
        status: EnrollmentStatus::Assigned,
        deadline_at: None,
        started_at: fixed_now(),
    }
}

async fn seed_course(
    repo: &SqliteRepository,
    lessons: u32,
) -> (CourseId, Vec<LessonId>) {
    let course_id = repo
        .insert_new_course(course_record("Course", None))
        .await
        .expect("insert course");
    let mut lesson_ids = Vec::new();
    for order in 1..=lessons {
        lesson_ids.push(
            repo.insert_new_lesson(lesson_record(course_id, order))
                .await
                .expect("insert lesson"),
        );
    }
    (course_id, lesson_ids)
}

#[tokio::test]
async fn sqlite_roundtrip_persists_catalog_and_enrollment() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let course_id = repo
        .insert_new_course(course_record("Security Basics", Some(14)))
        .await
        .unwrap();
    let lesson_id = repo
        .insert_new_lesson(lesson_record(course_id, 1))
        .await
        .unwrap();

    let course = repo.get_course(course_id).await.unwrap().expect("course");
    assert_eq!(course.title(), "Security Basics");
    assert_eq!(course.deadline_days(), Some(14));
    assert!(course.is_public());

    let lesson = repo.get_lesson(lesson_id).await.unwrap().expect("lesson");
    assert_eq!(lesson.course_id, course_id);
    assert_eq!(lesson.order, 1);
    assert_eq!(
        lesson.video.as_ref().map(|v| v.as_str()),
        Some("https://videos.example.com/01.mp4")
    );
    assert_eq!(repo.lesson_count(course_id).await.unwrap(), 1);

    let user = UserId::new(7);
    let deadline_at = fixed_now() + Duration::days(14);
    repo.insert_new_enrollment(NewEnrollmentRecord {
        deadline_at: Some(deadline_at),
        ..enrollment_record(user, course_id)
    })
    .await
    .unwrap();

    let enrollment = repo
        .get_enrollment(user, course_id)
        .await
        .unwrap()
        .expect("enrollment");
    assert_eq!(enrollment.status(), EnrollmentStatus::Assigned);
    assert_eq!(enrollment.progress_percent(), 0);
    assert_eq!(enrollment.deadline_at(), Some(deadline_at));
    assert_eq!(enrollment.completed_at(), None);
}

#[tokio::test]
async fn sqlite_insert_conflicts_on_unique_keys() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_conflicts?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let (course_id, _) = seed_course(&repo, 1).await;

    let err = repo
        .insert_new_lesson(lesson_record(course_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let user = UserId::new(1);
    repo.insert_new_enrollment(enrollment_record(user, course_id))
        .await
        .unwrap();
    let err = repo
        .insert_new_enrollment(enrollment_record(user, course_id))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_watch_upsert_is_monotonic() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_watch?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let (_, lesson_ids) = seed_course(&repo, 1).await;
    let lesson_id = lesson_ids[0];
    let user = UserId::new(3);
    let now = fixed_now();

    // first sample is stored verbatim
    let stored = repo
        .upsert_watch(user, lesson_id, WatchEvent::new(42, 55).unwrap(), now)
        .await
        .unwrap();
    assert_eq!(stored.position_sec, 42);
    assert_eq!(stored.watched_percent, 55);

    // a rewind overwrites position but cannot lower the percent
    let later = now + Duration::minutes(5);
    let stored = repo
        .upsert_watch(user, lesson_id, WatchEvent::new(10, 30).unwrap(), later)
        .await
        .unwrap();
    assert_eq!(stored.position_sec, 10);
    assert_eq!(stored.watched_percent, 55);
    assert_eq!(stored.updated_at, later);

    let fetched = repo.get_watch(user, lesson_id).await.unwrap().expect("row");
    assert_eq!(fetched.watched_percent, 55);
}

#[tokio::test]
async fn sqlite_apply_completion_walks_course_to_completed() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_walkthrough?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let (course_id, lesson_ids) = seed_course(&repo, 3).await;
    let user = UserId::new(5);
    repo.insert_new_enrollment(enrollment_record(user, course_id))
        .await
        .unwrap();

    let now = fixed_now();
    let expectations = [
        (33, EnrollmentStatus::InProgress),
        (66, EnrollmentStatus::InProgress),
        (100, EnrollmentStatus::Completed),
    ];
    for (lesson_id, (percent, status)) in lesson_ids.iter().zip(expectations) {
        let lesson = repo.get_lesson(*lesson_id).await.unwrap().expect("lesson");
        let outcome = repo.apply_completion(user, &lesson, true, now).await.unwrap();
        assert_eq!(outcome.percent, percent);
        assert_eq!(outcome.status, status);
    }

    let enrollment = repo
        .get_enrollment(user, course_id)
        .await
        .unwrap()
        .expect("enrollment");
    assert_eq!(enrollment.progress_percent(), 100);
    assert_eq!(enrollment.status(), EnrollmentStatus::Completed);
    assert_eq!(enrollment.completed_at(), Some(now));

    // the record is closed: no further ledger mutation allowed
    let lesson = repo
        .get_lesson(lesson_ids[0])
        .await
        .unwrap()
        .expect("lesson");
    let err = repo
        .apply_completion(user, &lesson, false, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_duplicate_completion_is_absorbed() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_duplicate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let (course_id, lesson_ids) = seed_course(&repo, 2).await;
    let user = UserId::new(9);
    repo.insert_new_enrollment(enrollment_record(user, course_id))
        .await
        .unwrap();

    let now = fixed_now();
    let lesson = repo
        .get_lesson(lesson_ids[0])
        .await
        .unwrap()
        .expect("lesson");
    let first = repo.apply_completion(user, &lesson, true, now).await.unwrap();
    let second = repo.apply_completion(user, &lesson, true, now).await.unwrap();
    assert_eq!(first, second);

    assert_eq!(repo.completed_count(user, course_id).await.unwrap(), 1);
    assert!(repo.completion_exists(user, lesson_ids[0]).await.unwrap());
    assert_eq!(
        repo.completed_lessons(user).await.unwrap(),
        vec![lesson_ids[0]]
    );
}

#[tokio::test]
async fn sqlite_unmark_recomputes_percent_down() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_unmark?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let (course_id, lesson_ids) = seed_course(&repo, 2).await;
    let user = UserId::new(4);
    repo.insert_new_enrollment(enrollment_record(user, course_id))
        .await
        .unwrap();

    let now = fixed_now();
    let lesson = repo
        .get_lesson(lesson_ids[0])
        .await
        .unwrap()
        .expect("lesson");
    repo.apply_completion(user, &lesson, true, now).await.unwrap();

    let outcome = repo
        .apply_completion(user, &lesson, false, now)
        .await
        .unwrap();
    assert_eq!(outcome.percent, 0);
    // percent drops but the status stays where it was
    assert_eq!(outcome.status, EnrollmentStatus::InProgress);
}

#[tokio::test]
async fn sqlite_reconcile_heals_after_catalog_change() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_reconcile?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let (course_id, lesson_ids) = seed_course(&repo, 2).await;
    let user = UserId::new(2);
    repo.insert_new_enrollment(enrollment_record(user, course_id))
        .await
        .unwrap();

    let now = fixed_now();
    let lesson = repo
        .get_lesson(lesson_ids[0])
        .await
        .unwrap()
        .expect("lesson");
    let outcome = repo.apply_completion(user, &lesson, true, now).await.unwrap();
    assert_eq!(outcome.percent, 50);

    // course grows after the fact; the stored 50 is now stale
    repo.insert_new_lesson(lesson_record(course_id, 3))
        .await
        .unwrap();

    let healed = repo.reconcile(user, course_id, now).await.unwrap();
    assert_eq!(healed.percent, 33);
    assert_eq!(healed.status, EnrollmentStatus::InProgress);

    // idempotent: a second pass changes nothing
    let again = repo.reconcile(user, course_id, now).await.unwrap();
    assert_eq!(again, healed);

    let err = repo
        .reconcile(UserId::new(99), course_id, now)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_mark_started_advances_only_assigned() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_started?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let (course_id, _) = seed_course(&repo, 1).await;
    let user = UserId::new(6);
    repo.insert_new_enrollment(enrollment_record(user, course_id))
        .await
        .unwrap();

    repo.mark_started(user, course_id).await.unwrap();
    let enrollment = repo
        .get_enrollment(user, course_id)
        .await
        .unwrap()
        .expect("enrollment");
    assert_eq!(enrollment.status(), EnrollmentStatus::InProgress);

    // repeat call is a no-op, not an error
    repo.mark_started(user, course_id).await.unwrap();

    let err = repo
        .mark_started(user, CourseId::new(999))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}
