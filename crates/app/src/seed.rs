use anyhow::{Context, Result};
use quest_core::model::{Grade, GradeLevel, TopicCategory, TopicDraft, UserDraft};
use services::AppServices;
use tracing::info;

struct SeedTopic {
    title: &'static str,
    description: &'static str,
    category: TopicCategory,
    grade: Option<u8>,
    xp: u32,
    /// Indexes into `TOPICS` of earlier entries.
    requires: &'static [usize],
}

const TOPICS: &[SeedTopic] = &[
    SeedTopic {
        title: "Counting & Place Value",
        description: "Ones, tens and hundreds.",
        category: TopicCategory::Arithmetic,
        grade: None,
        xp: 100,
        requires: &[],
    },
    SeedTopic {
        title: "Addition & Subtraction",
        description: "Adding and taking away with carrying and borrowing.",
        category: TopicCategory::Arithmetic,
        grade: None,
        xp: 150,
        requires: &[0],
    },
    SeedTopic {
        title: "Multiplication & Division",
        description: "Times tables and sharing equally.",
        category: TopicCategory::Arithmetic,
        grade: None,
        xp: 200,
        requires: &[1],
    },
    SeedTopic {
        title: "Shapes & Perimeter",
        description: "Polygons and the distance around them.",
        category: TopicCategory::Geometry,
        grade: None,
        xp: 150,
        requires: &[0],
    },
    SeedTopic {
        title: "Units of Measure",
        description: "Lengths, masses and time.",
        category: TopicCategory::Measurement,
        grade: None,
        xp: 150,
        requires: &[1],
    },
    SeedTopic {
        title: "Fractions",
        description: "Equivalent fractions, adding and comparing.",
        category: TopicCategory::Fractions,
        grade: Some(4),
        xp: 250,
        requires: &[2],
    },
    SeedTopic {
        title: "Area",
        description: "Rectangles and triangles.",
        category: TopicCategory::Geometry,
        grade: Some(5),
        xp: 250,
        requires: &[2, 3],
    },
    SeedTopic {
        title: "Data & Averages",
        description: "Mean, median and mode.",
        category: TopicCategory::Statistics,
        grade: Some(5),
        xp: 250,
        requires: &[2],
    },
    SeedTopic {
        title: "First Equations",
        description: "Finding the unknown.",
        category: TopicCategory::Algebra,
        grade: Some(5),
        xp: 300,
        requires: &[2, 7],
    },
];

const STUDENTS: &[(&str, u8)] = &[("Ada", 4), ("Ben", 4), ("Cleo", 5)];

/// Populate an empty database with a teacher, students, the topic map and a
/// classroom. Does nothing if any user exists.
///
/// # Errors
///
/// Returns an error if any service call fails.
pub async fn seed(services: &AppServices) -> Result<()> {
    let users = services.users();
    if !users.list_users().await?.is_empty() {
        println!("Database already has users; skipping seed.");
        return Ok(());
    }

    let teacher = users
        .register(UserDraft::teacher("Ms Rivera"))
        .await
        .context("register teacher")?;
    println!("teacher  {:>3}  {}", teacher.id(), teacher.name());

    let mut students = Vec::with_capacity(STUDENTS.len());
    for (name, grade) in STUDENTS {
        let student = users
            .register(UserDraft::student(*name, Some(Grade::new(*grade)?)))
            .await
            .with_context(|| format!("register {name}"))?;
        println!("student  {:>3}  {} (grade {grade})", student.id(), student.name());
        students.push(student);
    }

    let topic_service = services.topics();
    let mut topic_ids = Vec::with_capacity(TOPICS.len());
    for seed in TOPICS {
        let level = match seed.grade {
            Some(g) => GradeLevel::Grade(Grade::new(g)?),
            None => GradeLevel::Any,
        };
        let prerequisites = seed
            .requires
            .iter()
            .map(|i| topic_ids.get(*i).copied().context("seed prerequisite out of order"))
            .collect::<Result<Vec<_>>>()?;
        let topic = topic_service
            .create_topic(
                teacher.id(),
                TopicDraft::new(seed.title, seed.category)
                    .with_description(seed.description)
                    .with_level(level)
                    .with_xp_reward(seed.xp)
                    .with_prerequisites(prerequisites),
            )
            .await
            .with_context(|| format!("create topic {}", seed.title))?;
        println!("topic    {:>3}  {} [{}]", topic.id(), topic.title(), topic.level());
        topic_ids.push(topic.id());
    }

    let classrooms = services.classrooms();
    let classroom = classrooms
        .create_classroom(teacher.id(), "Year 4".into())
        .await
        .context("create classroom")?;
    for topic in topic_ids.iter().take(6) {
        classrooms
            .assign_topic(teacher.id(), classroom.id(), *topic)
            .await?;
    }
    for student in students.iter().filter(|s| s.grade().map(Grade::value) == Some(4)) {
        classrooms
            .join_by_code(student.id(), classroom.join_code().as_str())
            .await?;
    }
    println!(
        "class    {:>3}  {} (join code {})",
        classroom.id(),
        classroom.name(),
        classroom.join_code()
    );

    info!(
        users = STUDENTS.len() + 1,
        topics = topic_ids.len(),
        "seeded demo data"
    );
    Ok(())
}
