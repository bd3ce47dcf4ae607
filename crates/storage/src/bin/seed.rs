use std::fmt;

use chrono::{DateTime, Duration, Utc};
use lms_core::model::{Course, CourseId, EnrollmentStatus, LessonDraft, UserId};
use storage::repository::{NewCourseRecord, NewEnrollmentRecord, NewLessonRecord, Storage};
use tracing::info;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    title: String,
    description: Option<String>,
    lessons: u32,
    user_id: UserId,
    deadline_days: Option<u32>,
    mandatory: bool,
    public: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLessons { raw: String },
    InvalidUserId { raw: String },
    InvalidDeadlineDays { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLessons { raw } => write!(f, "invalid --lessons value: {raw}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidDeadlineDays { raw } => {
                write!(f, "invalid --deadline-days value: {raw}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LMS_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut title =
            std::env::var("LMS_COURSE_TITLE").unwrap_or_else(|_| "Onboarding Basics".into());
        let mut description = std::env::var("LMS_COURSE_DESC").ok();
        let mut lessons = std::env::var("LMS_LESSONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
        let mut user_id = std::env::var("LMS_USER_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| UserId::new(1), UserId::new);
        let mut deadline_days: Option<u32> = None;
        let mut mandatory = false;
        let mut public = true;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--title" => {
                    let value = require_value(&mut args, "--title")?;
                    title = value;
                }
                "--desc" => {
                    let value = require_value(&mut args, "--desc")?;
                    description = Some(value);
                }
                "--lessons" => {
                    let value = require_value(&mut args, "--lessons")?;
                    lessons = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLessons { raw: value.clone() })?;
                }
                "--user-id" => {
                    let value = require_value(&mut args, "--user-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    user_id = UserId::new(parsed);
                }
                "--deadline-days" => {
                    let value = require_value(&mut args, "--deadline-days")?;
                    let parsed: u32 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidDeadlineDays { raw: value.clone() })?;
                    deadline_days = Some(parsed);
                }
                "--mandatory" => {
                    mandatory = true;
                }
                "--private" => {
                    public = false;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            title,
            description,
            lessons,
            user_id,
            deadline_days,
            mandatory,
            public,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --title <name>            Course title (default: Onboarding Basics)");
    eprintln!("  --desc <text>             Optional course description");
    eprintln!("  --lessons <n>             Number of lessons to create (default: 3)");
    eprintln!("  --user-id <id>            User to enroll in the course (default: 1)");
    eprintln!("  --deadline-days <n>       Completion window in days (default: none)");
    eprintln!("  --mandatory               Mark the course as mandatory");
    eprintln!("  --private                 Hide the course from the public catalog");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LMS_DB_URL, LMS_COURSE_TITLE, LMS_COURSE_DESC, LMS_LESSONS, LMS_USER_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let draft = Course::new(
        CourseId::new(1),
        args.title.clone(),
        args.description.clone(),
        args.mandatory,
        args.deadline_days,
        args.public,
        now,
    )?;
    let course_id = storage
        .catalog
        .insert_new_course(NewCourseRecord::from_course(&draft))
        .await?;
    info!("created course {} ({})", course_id, args.title);

    let samples = [
        ("Welcome", "Why this course exists and what to expect."),
        ("Getting set up", "Accounts, tools, and access you will need."),
        ("First tasks", "A guided walk through the first assignments."),
        ("Working with the team", "Rituals, reviews, and who to ask."),
        ("Wrapping up", "Checklist before you mark yourself done."),
    ];
    for i in 0..args.lessons {
        let idx = (i as usize) % samples.len();
        let (lesson_title, body) = samples[idx];
        let order = i + 1;
        let validated = LessonDraft {
            course_id,
            order,
            title: lesson_title.to_string(),
            video_url: Some(format!(
                "https://videos.example.com/onboarding/{order:02}.mp4"
            )),
            content: Some(body.to_string()),
        }
        .validate()?;
        storage
            .catalog
            .insert_new_lesson(NewLessonRecord::from_validated(&validated))
            .await?;
    }
    info!("created {} lessons", args.lessons);

    let deadline_at = args
        .deadline_days
        .map(|days| now + Duration::days(i64::from(days)));
    storage
        .enrollments
        .insert_new_enrollment(NewEnrollmentRecord {
            user_id: args.user_id,
            course_id,
            status: EnrollmentStatus::Assigned,
            deadline_at,
            started_at: now,
        })
        .await?;
    info!("enrolled user {}", args.user_id);

    println!(
        "Seeded course {} with {} lessons and enrolled user {} into {}",
        course_id.value(),
        args.lessons,
        args.user_id.value(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
